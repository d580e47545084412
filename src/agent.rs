use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as TurnMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::actions::{ActionRegistry, DispatchOutcome};
use crate::api::response::{extract_text, parse_function_calls};
use crate::api::{ChatModel, ChatSession, GenerateContentResponse, GenerationError};
use crate::config::Config;
use crate::error::Result;
use crate::hass::HomeAssistant;
use crate::models::{
    Content, ConversationInput, ConversationResult, ErrorCode, GenerationConfig, IntentResponse,
    Part, Session, ROLE_FUNCTION,
};
use crate::prompt::PromptRenderer;
use crate::session::{install_prompt, new_conversation_id, trim_conversation_history, SessionStore};

/// Per-agent settings that stay fixed across turns.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub chat_model: String,
    pub prompt: String,
    pub generation: GenerationConfig,
    pub dispatch_timeout: Duration,
    pub max_turns: Option<usize>,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chat_model: config.chat_model.clone(),
            prompt: config.prompt.clone(),
            generation: config.generation.clone(),
            dispatch_timeout: Duration::from_secs(config.actions.dispatch_timeout_secs),
            max_turns: config.session.max_turns,
        }
    }
}

/// Everything one turn produced: the reply handed back to the caller and the
/// service call it triggered, if any.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub result: ConversationResult,
    pub dispatched: Option<DispatchOutcome>,
}

/// Voice-assistant conversation agent: prompt, remote model, one Home Assistant
/// action per turn, and a stored transcript per conversation id.
pub struct ConversationAgent {
    model: Arc<dyn ChatModel>,
    host: Arc<dyn HomeAssistant>,
    store: Arc<dyn SessionStore>,
    registry: ActionRegistry,
    settings: AgentSettings,
    turn_locks: Mutex<HashMap<String, Arc<TurnMutex<()>>>>,
}

/// Holds a conversation's turn lock; the table entry is pruned on drop once no
/// other turn is waiting for it.
struct TurnGuard<'a> {
    table: &'a Mutex<HashMap<String, Arc<TurnMutex<()>>>>,
    conversation_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Ok(mut table) = self.table.lock() {
            let idle = table
                .get(&self.conversation_id)
                .map_or(false, |lock| Arc::strong_count(lock) == 1);
            if idle {
                table.remove(&self.conversation_id);
            }
        }
    }
}

impl ConversationAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        host: Arc<dyn HomeAssistant>,
        store: Arc<dyn SessionStore>,
        registry: ActionRegistry,
        settings: AgentSettings,
    ) -> Self {
        Self {
            model,
            host,
            store,
            registry,
            settings,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(
        config: &Config,
        model: Arc<dyn ChatModel>,
        host: Arc<dyn HomeAssistant>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::new(
            model,
            host,
            store,
            ActionRegistry::from_config(&config.actions),
            AgentSettings::from_config(config),
        )
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Process one user utterance and return the reply with the conversation id
    /// to use for the next turn.
    pub async fn process_turn(&self, input: ConversationInput) -> Result<ConversationResult> {
        Ok(self.run_turn(input).await?.result)
    }

    pub async fn run_turn(&self, input: ConversationInput) -> Result<TurnOutcome> {
        let ConversationInput {
            text,
            conversation_id,
            language,
        } = input;

        let (conversation_id, history, _turn) = self.resolve_session(conversation_id).await?;
        debug!(conversation_id = %conversation_id, turns = history.len(), "resolved session");

        let rendered = match PromptRenderer::new(self.host.as_ref())
            .render(&self.settings.prompt)
            .await
        {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(conversation_id = %conversation_id, "prompt rendering failed: {}", e);
                return Ok(error_outcome(
                    &language,
                    format!("Sorry, I had a problem with my template: {}", e),
                    conversation_id,
                ));
            }
        };

        let mut history = history;
        install_prompt(&mut history, &rendered);

        let mut chat = ChatSession::new(
            self.model.as_ref(),
            self.settings.chat_model.clone(),
            self.registry.tools(),
            Some(self.settings.generation.clone()),
            history,
        );

        let exchange = self.exchange(&mut chat, &conversation_id, text).await;
        let (speech, dispatched) = match exchange {
            Ok(done) => done,
            Err(e) => {
                warn!(conversation_id = %conversation_id, "generation failed: {}", e);
                return Ok(error_outcome(
                    &language,
                    format!("Sorry, I had a problem talking to Google Generative AI: {}", e),
                    conversation_id,
                ));
            }
        };

        let mut history = chat.into_history();
        if let Some(max_turns) = self.settings.max_turns {
            trim_conversation_history(&mut history, max_turns);
        }
        if let Err(e) = self.store.save(&Session::new(conversation_id.clone(), history)) {
            warn!(conversation_id = %conversation_id, "failed to store session: {}", e);
        }

        Ok(TurnOutcome {
            result: ConversationResult {
                response: IntentResponse::speech(&language, speech),
                conversation_id,
            },
            dispatched,
        })
    }

    /// Send the user text and, when the model asks for it, run the first
    /// function call and send its outcome back. Returns the final reply text.
    async fn exchange(
        &self,
        chat: &mut ChatSession<'_>,
        conversation_id: &str,
        text: String,
    ) -> std::result::Result<(String, Option<DispatchOutcome>), GenerationError> {
        let response = chat.send_message(Content::user_text(text)).await?;
        let calls = parse_function_calls(&response)?;

        let Some(call) = calls.first() else {
            return Ok((final_text(&response)?, None));
        };

        info!(
            conversation_id,
            function = %call.name,
            extra_calls = calls.len() - 1,
            "model requested a function call"
        );
        let outcome = self
            .registry
            .dispatch(self.host.as_ref(), call, self.settings.dispatch_timeout)
            .await;

        let mut parts = vec![Part::function_response(
            call.name.clone(),
            outcome.to_response_payload(),
        )];
        for skipped in &calls[1..] {
            parts.push(Part::function_response(
                skipped.name.clone(),
                DispatchOutcome::Skipped.to_response_payload(),
            ));
        }

        let follow_up = chat.send_message(Content::new(ROLE_FUNCTION, parts)).await?;
        if !parse_function_calls(&follow_up)?.is_empty() {
            return Err(GenerationError::InvalidArgument(
                "model requested another function call after the function response".to_string(),
            ));
        }
        Ok((final_text(&follow_up)?, Some(outcome)))
    }

    /// Reuse the stored history of a live conversation, or start a new one.
    /// The returned guard serializes turns of the same conversation.
    async fn resolve_session(
        &self,
        conversation_id: Option<String>,
    ) -> Result<(String, Vec<Content>, TurnGuard<'_>)> {
        if let Some(id) = conversation_id {
            let guard = self.lock_conversation(&id).await;
            if let Some(session) = self.store.get(&id)? {
                return Ok((id, session.history, guard));
            }
            debug!(conversation_id = %id, "unknown or expired conversation, starting a new one");
        }

        let id = new_conversation_id();
        let guard = self.lock_conversation(&id).await;
        Ok((id, Vec::new(), guard))
    }

    async fn lock_conversation(&self, conversation_id: &str) -> TurnGuard<'_> {
        let lock = {
            let mut table = self
                .turn_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            table
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(TurnMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        TurnGuard {
            table: &self.turn_locks,
            conversation_id: conversation_id.to_string(),
            guard: Some(guard),
        }
    }
}

/// A turn has to end in spoken text; a reply without any is treated as a
/// generation failure so nothing gets stored.
fn final_text(
    response: &GenerateContentResponse,
) -> std::result::Result<String, GenerationError> {
    let text = extract_text(response)?;
    if text.trim().is_empty() {
        return Err(GenerationError::InvalidArgument(
            "response contained no text".to_string(),
        ));
    }
    Ok(text)
}

fn error_outcome(language: &str, message: String, conversation_id: String) -> TurnOutcome {
    TurnOutcome {
        result: ConversationResult {
            response: IntentResponse::error(language, ErrorCode::Unknown, message),
            conversation_id,
        },
        dispatched: None,
    }
}
