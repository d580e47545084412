mod common;

use chrono::Local;
use serde_json::json;
use std::time::Duration;

use common::*;
use gemini_fc::actions::DispatchOutcome;
use gemini_fc::api::GenerationError;
use gemini_fc::models::{Content, ConversationInput, Session, ROLE_FUNCTION, ROLE_MODEL, ROLE_USER};
use gemini_fc::session::SessionStore;

fn input(text: &str, conversation_id: Option<&str>) -> ConversationInput {
    ConversationInput::new(text, conversation_id.map(str::to_string), "en")
}

fn stored_history(harness: &Harness, conversation_id: &str) -> Vec<Content> {
    harness
        .store
        .get(conversation_id)
        .unwrap()
        .expect("session stored")
        .history
}

#[tokio::test]
async fn test_new_conversation_stores_prompt_then_exchange() {
    let h = Harness::new();
    h.model.push_text("Hello there");

    let result = h.agent.process_turn(input("hi", None)).await.unwrap();
    assert!(!result.response.is_error());
    assert_eq!(result.response.speech, "Hello there");
    assert_eq!(result.response.language, "en");
    assert!(!result.conversation_id.is_empty());

    let history = stored_history(&h, &result.conversation_id);
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, ROLE_USER);
    assert_eq!(history[0].text(), "You are the voice of Maple House.");
    assert_eq!(history[1].role, ROLE_MODEL);
    assert_eq!(history[1].text(), "Ok");
    assert_eq!(history[2].text(), "hi");
    assert_eq!(history[3].text(), "Hello there");

    let requests = h.model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].contents.len(), 3);
    assert_eq!(requests[0].tools[0].function_declarations.len(), 2);
    assert!(requests[0].generation_config.is_some());
}

#[tokio::test]
async fn test_start_light_turns_on_configured_light() {
    let h = Harness::new();
    h.model.push_call("control_light", json!({"command": "turn_on"}));
    h.model.push_text("The light is on.");

    let outcome = h.agent.run_turn(input("start light", None)).await.unwrap();
    let result = outcome.result;
    assert!(!result.response.is_error());
    assert_eq!(result.response.speech, "The light is on.");
    assert!(!result.conversation_id.is_empty());

    assert_eq!(
        h.home.calls(),
        vec![(
            "homeassistant".to_string(),
            "turn_on".to_string(),
            json!({"entity_id": LIGHT})
        )]
    );
    assert!(matches!(outcome.dispatched, Some(DispatchOutcome::Success { .. })));

    let requests = h.model.requests();
    assert_eq!(requests.len(), 2);
    let reply = requests[1].contents.last().unwrap();
    assert_eq!(reply.role, ROLE_FUNCTION);
    let response = reply.parts[0].function_response.as_ref().unwrap();
    assert_eq!(response.name, "control_light");
    assert_eq!(response.response["status"], "success");

    assert_eq!(stored_history(&h, &result.conversation_id).len(), 6);
}

#[tokio::test]
async fn test_thermostat_maps_temperatures() {
    let h = Harness::new();
    h.model
        .push_call("set_heating_and_cooling", json!({"cool_temp": 77, "heat_temp": 74}));
    h.model.push_text("Done.");

    h.agent.process_turn(input("heat to 74", None)).await.unwrap();

    assert_eq!(
        h.home.calls(),
        vec![(
            "climate".to_string(),
            "set_temperature".to_string(),
            json!({
                "entity_id": THERMOSTAT,
                "target_temp_low": 74,
                "target_temp_high": 77
            })
        )]
    );
}

#[tokio::test]
async fn test_remote_failure_keeps_id_and_history() {
    let h = Harness::new();
    h.model.push_text("First answer");
    let first = h.agent.process_turn(input("one", None)).await.unwrap();
    let before = stored_history(&h, &first.conversation_id);

    h.model
        .push(Err(GenerationError::Transport("connection reset".to_string())));
    let second = h
        .agent
        .process_turn(input("two", Some(&first.conversation_id)))
        .await
        .unwrap();

    assert!(second.response.is_error());
    assert!(second
        .response
        .speech
        .starts_with("Sorry, I had a problem talking to Google Generative AI:"));
    assert!(second.response.speech.contains("connection reset"));
    assert_eq!(second.conversation_id, first.conversation_id);
    assert_eq!(stored_history(&h, &first.conversation_id), before);
}

#[tokio::test]
async fn test_blocked_prompt_on_new_conversation_stores_nothing() {
    let h = Harness::new();
    h.model
        .push_json(json!({"promptFeedback": {"blockReason": "SAFETY"}}));

    let result = h.agent.process_turn(input("something rude", None)).await.unwrap();
    assert!(result.response.is_error());
    assert!(result.response.speech.contains("prompt was blocked: SAFETY"));
    assert!(!result.conversation_id.is_empty());
    assert!(h.store.get(&result.conversation_id).unwrap().is_none());
}

#[tokio::test]
async fn test_stopped_candidate_is_a_remote_failure() {
    let h = Harness::new();
    h.model.push_json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "partial"}]},
            "finishReason": "SAFETY"
        }]
    }));

    let result = h.agent.process_turn(input("hi", None)).await.unwrap();
    assert!(result.response.is_error());
    assert!(result.response.speech.contains("generation stopped early: SAFETY"));
}

#[tokio::test]
async fn test_follow_up_failure_leaves_history_unchanged() {
    let h = Harness::new();
    h.model.push_text("Hi");
    let first = h.agent.process_turn(input("hello", None)).await.unwrap();
    let before = stored_history(&h, &first.conversation_id);

    h.model.push_call("control_light", json!({"command": "turn_off"}));
    h.model
        .push(Err(GenerationError::InvalidArgument("bad request".to_string())));
    let second = h
        .agent
        .process_turn(input("lights off", Some(&first.conversation_id)))
        .await
        .unwrap();

    assert!(second.response.is_error());
    assert_eq!(h.home.calls().len(), 1);
    assert_eq!(stored_history(&h, &first.conversation_id), before);
}

#[tokio::test]
async fn test_function_call_in_follow_up_is_a_remote_failure() {
    let h = Harness::new();
    h.model.push_text("Hi");
    let first = h.agent.process_turn(input("hello", None)).await.unwrap();
    let before = stored_history(&h, &first.conversation_id);

    h.model.push_call("control_light", json!({"command": "turn_on"}));
    h.model.push_call("control_light", json!({"command": "turn_off"}));
    let second = h
        .agent
        .process_turn(input("lights on", Some(&first.conversation_id)))
        .await
        .unwrap();

    assert!(second.response.is_error());
    assert!(second
        .response
        .speech
        .starts_with("Sorry, I had a problem talking to Google Generative AI:"));
    assert_eq!(h.home.calls().len(), 1);
    assert_eq!(stored_history(&h, &first.conversation_id), before);
}

#[tokio::test]
async fn test_reply_without_content_is_a_remote_failure() {
    let h = Harness::new();
    h.model.push_text("Hi");
    let first = h.agent.process_turn(input("hello", None)).await.unwrap();
    let before = stored_history(&h, &first.conversation_id);

    h.model.push_json(json!({
        "candidates": [{"content": {"role": "model"}, "finishReason": "MAX_TOKENS"}]
    }));
    let second = h
        .agent
        .process_turn(input("tell me a long story", Some(&first.conversation_id)))
        .await
        .unwrap();

    assert!(second.response.is_error());
    assert!(second.response.speech.contains("response candidate had no content"));
    assert_eq!(stored_history(&h, &first.conversation_id), before);
}

#[tokio::test]
async fn test_follow_up_without_text_stores_nothing() {
    let h = Harness::new();
    h.model.push_call("control_light", json!({"command": "turn_on"}));
    h.model.push_json(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": " "}]}, "finishReason": "STOP"}]
    }));

    let result = h.agent.process_turn(input("lights on", None)).await.unwrap();
    assert!(result.response.is_error());
    assert!(result.response.speech.contains("response contained no text"));
    assert!(h.store.get(&result.conversation_id).unwrap().is_none());
}

#[tokio::test]
async fn test_template_error_skips_remote_call() {
    let mut settings = settings();
    settings.prompt = "Hello {{ ha_name".to_string();
    let h = Harness::with(FakeHome::new(), settings);

    let result = h.agent.process_turn(input("hi", None)).await.unwrap();
    assert!(result.response.is_error());
    assert!(result
        .response
        .speech
        .starts_with("Sorry, I had a problem with my template:"));
    assert_eq!(h.model.request_count(), 0);
}

#[tokio::test]
async fn test_host_failure_while_rendering_keeps_id() {
    let h = Harness::new();
    h.model.push_text("Hi");
    let first = h.agent.process_turn(input("hello", None)).await.unwrap();

    h.home
        .fail_location
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let second = h
        .agent
        .process_turn(input("again", Some(&first.conversation_id)))
        .await
        .unwrap();

    assert!(second.response.is_error());
    assert!(second.response.speech.contains("host unreachable"));
    assert_eq!(second.conversation_id, first.conversation_id);
    assert_eq!(h.model.request_count(), 1);
}

#[tokio::test]
async fn test_round_trip_grows_history() {
    let h = Harness::new();
    let mut conversation_id: Option<String> = None;
    let mut lengths = Vec::new();

    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        h.model.push_text(&format!("answer {}", i));
        let result = h
            .agent
            .process_turn(input(text, conversation_id.as_deref()))
            .await
            .unwrap();
        if let Some(previous) = &conversation_id {
            assert_eq!(&result.conversation_id, previous);
        }
        lengths.push(stored_history(&h, &result.conversation_id).len());
        conversation_id = Some(result.conversation_id);
    }

    assert_eq!(lengths, vec![4, 6, 8]);

    // Each request replays the stored transcript
    let requests = h.model.requests();
    assert_eq!(requests[2].contents.len(), 7);
    assert_eq!(requests[2].contents[2].text(), "one");
    assert_eq!(requests[2].contents[4].text(), "two");
}

#[tokio::test]
async fn test_same_script_gives_same_result() {
    let run = || async {
        let h = Harness::new();
        h.model.push_call("control_light", json!({"command": "turn_on"}));
        h.model.push_text("Light on");
        let result = h.agent.process_turn(input("start light", None)).await.unwrap();
        (h.home.calls(), result.response.speech)
    };

    let (calls_a, speech_a) = run().await;
    let (calls_b, speech_b) = run().await;
    assert_eq!(calls_a, calls_b);
    assert_eq!(speech_a, speech_b);
}

#[tokio::test]
async fn test_unknown_function_is_not_dispatched() {
    let h = Harness::new();
    h.model.push_call("open_garage", json!({}));
    h.model.push_text("I can't do that.");

    let outcome = h.agent.run_turn(input("open the garage", None)).await.unwrap();
    assert!(!outcome.result.response.is_error());
    assert!(h.home.calls().is_empty());
    assert!(matches!(outcome.dispatched, Some(DispatchOutcome::Rejected { .. })));

    let requests = h.model.requests();
    let payload = &requests[1].contents.last().unwrap().parts[0]
        .function_response
        .as_ref()
        .unwrap()
        .response;
    assert_eq!(payload["status"], "error");
    assert!(payload["error"].as_str().unwrap().contains("Unknown function"));
}

#[tokio::test]
async fn test_invalid_arguments_are_not_dispatched() {
    let h = Harness::new();
    h.model.push_call("control_light", json!({"command": "dim"}));
    h.model.push_text("Sorry.");

    h.agent.process_turn(input("dim the light", None)).await.unwrap();
    assert!(h.home.calls().is_empty());

    let requests = h.model.requests();
    let payload = &requests[1].contents.last().unwrap().parts[0]
        .function_response
        .as_ref()
        .unwrap()
        .response;
    assert_eq!(payload["status"], "error");
}

#[tokio::test]
async fn test_dispatch_failure_is_reported_to_model() {
    let h = Harness::new();
    h.home
        .fail_services
        .store(true, std::sync::atomic::Ordering::SeqCst);
    h.model.push_call("control_light", json!({"command": "turn_on"}));
    h.model.push_text("The light did not respond.");

    let result = h.agent.process_turn(input("light on", None)).await.unwrap();
    assert!(!result.response.is_error());
    assert_eq!(result.response.speech, "The light did not respond.");
    assert_eq!(h.home.calls().len(), 1);

    let requests = h.model.requests();
    let payload = &requests[1].contents.last().unwrap().parts[0]
        .function_response
        .as_ref()
        .unwrap()
        .response;
    assert_eq!(payload["status"], "error");
    assert!(payload["error"].as_str().unwrap().contains("service unavailable"));
}

#[tokio::test]
async fn test_slow_dispatch_times_out() {
    let mut settings = settings();
    settings.dispatch_timeout = Duration::from_millis(50);
    let h = Harness::with(FakeHome::slow(Duration::from_millis(500)), settings);
    h.model.push_call("control_light", json!({"command": "turn_on"}));
    h.model.push_text("Still waiting on the light.");

    let outcome = h.agent.run_turn(input("light on", None)).await.unwrap();
    assert!(matches!(outcome.dispatched, Some(DispatchOutcome::TimedOut { .. })));

    let requests = h.model.requests();
    let payload = &requests[1].contents.last().unwrap().parts[0]
        .function_response
        .as_ref()
        .unwrap()
        .response;
    assert_eq!(payload["status"], "timeout");
}

#[tokio::test]
async fn test_only_first_call_runs_others_skipped() {
    let h = Harness::new();
    h.model.push_json(call_response(&[
        ("control_light", json!({"command": "turn_on"})),
        ("control_light", json!({"command": "turn_off"})),
    ]));
    h.model.push_text("Light on.");

    h.agent.process_turn(input("flicker", None)).await.unwrap();

    let calls = h.home.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "turn_on");

    let requests = h.model.requests();
    let reply = requests[1].contents.last().unwrap();
    assert_eq!(reply.parts.len(), 2);
    let statuses: Vec<_> = reply
        .parts
        .iter()
        .map(|p| p.function_response.as_ref().unwrap().response["status"].clone())
        .collect();
    assert_eq!(statuses, vec![json!("success"), json!("skipped")]);
}

#[tokio::test]
async fn test_unknown_or_expired_id_gets_new_id() {
    let h = Harness::new();
    h.store
        .save(&Session {
            conversation_id: "stale".to_string(),
            last_updated: Local::now() - chrono::Duration::minutes(90),
            history: vec![Content::user_text("old prompt"), Content::model_text("Ok")],
        })
        .unwrap();

    h.model.push_text("Hi");
    let result = h.agent.process_turn(input("hello", Some("stale"))).await.unwrap();
    assert_ne!(result.conversation_id, "stale");
    assert_eq!(stored_history(&h, &result.conversation_id).len(), 4);

    h.model.push_text("Hi again");
    let result = h
        .agent
        .process_turn(input("hello", Some("never-seen")))
        .await
        .unwrap();
    assert_ne!(result.conversation_id, "never-seen");
}

#[tokio::test]
async fn test_max_turns_trims_oldest_exchanges() {
    let mut settings = settings();
    settings.max_turns = Some(1);
    let h = Harness::with(FakeHome::new(), settings);

    h.model.push_text("a1");
    let first = h.agent.process_turn(input("q1", None)).await.unwrap();
    h.model.push_text("a2");
    h.agent
        .process_turn(input("q2", Some(&first.conversation_id)))
        .await
        .unwrap();

    let history = stored_history(&h, &first.conversation_id);
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].text(), "You are the voice of Maple House.");
    assert_eq!(history[2].text(), "q2");
    assert_eq!(history[3].text(), "a2");
}

#[tokio::test]
async fn test_concurrent_turns_on_one_conversation_are_serialized() {
    let h = Harness::new();
    h.model.push_text("first");
    let first = h.agent.process_turn(input("one", None)).await.unwrap();
    let id = first.conversation_id.clone();

    h.model.set_latency(Duration::from_millis(20));
    h.model.push_text("second");
    h.model.push_text("third");
    let (a, b) = tokio::join!(
        h.agent.process_turn(input("two", Some(&id))),
        h.agent.process_turn(input("three", Some(&id)))
    );
    assert_eq!(a.unwrap().conversation_id, id);
    assert_eq!(b.unwrap().conversation_id, id);

    // The later turn starts from the transcript the earlier one stored
    let requests = h.model.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].contents.len(), 5);
    assert_eq!(requests[2].contents.len(), 7);
    assert_eq!(requests[2].contents[4].text(), "two");
    assert_eq!(requests[2].contents[5].text(), "second");

    assert_eq!(stored_history(&h, &id).len(), 8);
}
