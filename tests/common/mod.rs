#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gemini_fc::agent::{AgentSettings, ConversationAgent};
use gemini_fc::actions::ActionRegistry;
use gemini_fc::api::{ChatModel, GenerateContentResponse, GenerateRequest, GenerationError};
use gemini_fc::config::ActionsConfig;
use gemini_fc::error::{GeminiFcError, Result};
use gemini_fc::hass::HomeAssistant;
use gemini_fc::models::GenerationConfig;
use gemini_fc::session::InMemorySessionStore;

pub const LIGHT: &str = "light.1234567890";
pub const THERMOSTAT: &str = "climate.thermostat";
pub const PROMPT: &str = "You are the voice of {{ ha_name }}.";

/// Chat model that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<std::result::Result<GenerateContentResponse, GenerationError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    latency: Mutex<Option<Duration>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: std::result::Result<GenerateContentResponse, GenerationError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_json(&self, body: Value) {
        self.push(Ok(serde_json::from_value(body).unwrap()));
    }

    pub fn push_text(&self, text: &str) {
        self.push_json(text_response(text));
    }

    pub fn push_call(&self, name: &str, args: Value) {
        self.push_json(call_response(&[(name, args)]));
    }

    /// Make every call yield to the runtime for `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateContentResponse, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Transport("no scripted response".to_string())))
    }
}

pub fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn call_response(calls: &[(&str, Value)]) -> Value {
    let parts: Vec<Value> = calls
        .iter()
        .map(|(name, args)| json!({"functionCall": {"name": name, "args": args}}))
        .collect();
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": parts},
            "finishReason": "STOP"
        }]
    })
}

/// Home Assistant stand-in that records service calls.
pub struct FakeHome {
    pub calls: Mutex<Vec<(String, String, Value)>>,
    pub fail_services: AtomicBool,
    pub fail_location: AtomicBool,
    pub service_delay: Option<Duration>,
    pub states: HashMap<String, String>,
}

impl FakeHome {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_services: AtomicBool::new(false),
            fail_location: AtomicBool::new(false),
            service_delay: None,
            states: HashMap::new(),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            service_delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HomeAssistant for FakeHome {
    async fn call_service(&self, domain: &str, service: &str, data: &Value) -> Result<Value> {
        if let Some(delay) = self.service_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push((domain.to_string(), service.to_string(), data.clone()));
        if self.fail_services.load(Ordering::SeqCst) {
            return Err(GeminiFcError::ApiError {
                status: 500,
                message: "service unavailable".to_string(),
            });
        }
        Ok(json!([{"entity_id": data["entity_id"], "state": "on"}]))
    }

    async fn get_state(&self, entity_id: &str) -> Result<Option<String>> {
        Ok(self.states.get(entity_id).cloned())
    }

    async fn location_name(&self) -> Result<String> {
        if self.fail_location.load(Ordering::SeqCst) {
            return Err(GeminiFcError::Other("host unreachable".to_string()));
        }
        Ok("Maple House".to_string())
    }
}

pub fn settings() -> AgentSettings {
    AgentSettings {
        chat_model: "models/gemini-2.0-flash".to_string(),
        prompt: PROMPT.to_string(),
        generation: GenerationConfig::default(),
        dispatch_timeout: Duration::from_secs(10),
        max_turns: None,
    }
}

pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub home: Arc<FakeHome>,
    pub store: Arc<InMemorySessionStore>,
    pub agent: ConversationAgent,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeHome::new(), settings())
    }

    pub fn with(home: FakeHome, settings: AgentSettings) -> Self {
        let model = Arc::new(ScriptedModel::new());
        let home = Arc::new(home);
        let store = Arc::new(InMemorySessionStore::new(30, 256));
        let agent = ConversationAgent::new(
            model.clone(),
            home.clone(),
            store.clone(),
            ActionRegistry::from_config(&ActionsConfig::default()),
            settings,
        );
        Self {
            model,
            home,
            store,
            agent,
        }
    }
}
