use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use super::registry::{ActionRegistry, ServiceCall};
use crate::hass::HomeAssistant;
use crate::models::FunctionCall;

/// What happened when a function call was handed to Home Assistant.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Success { call: ServiceCall, result: Value },
    /// The call never reached the host: unknown function or bad arguments.
    Rejected { reason: String },
    Failed { call: ServiceCall, error: String },
    TimedOut { call: ServiceCall, after: Duration },
    /// Only one call is executed per model reply; the rest are reported back as skipped.
    Skipped,
}

impl DispatchOutcome {
    /// The body of the function response sent back to the model.
    pub fn to_response_payload(&self) -> Value {
        match self {
            DispatchOutcome::Success { call, result } => json!({
                "status": "success",
                "result": {
                    "service": call.qualified_name(),
                    "data": call.data,
                    "changed_entities": changed_entities(result),
                },
            }),
            DispatchOutcome::Rejected { reason } => json!({
                "status": "error",
                "error": reason,
            }),
            DispatchOutcome::Failed { call, error } => json!({
                "status": "error",
                "service": call.qualified_name(),
                "error": error,
            }),
            DispatchOutcome::TimedOut { call, after } => json!({
                "status": "timeout",
                "service": call.qualified_name(),
                "error": format!("Home Assistant did not respond within {}s", after.as_secs()),
            }),
            DispatchOutcome::Skipped => json!({
                "status": "skipped",
                "error": "Only one function call is executed per reply",
            }),
        }
    }
}

/// Home Assistant answers a service call with the list of states it changed.
fn changed_entities(result: &Value) -> Vec<String> {
    result
        .as_array()
        .map(|states| {
            states
                .iter()
                .filter_map(|s| s.get("entity_id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl ActionRegistry {
    /// Resolve `call` and run it against `host`, bounded by `timeout`.
    /// Failures come back as an outcome, never as an error.
    pub async fn dispatch(
        &self,
        host: &dyn HomeAssistant,
        call: &FunctionCall,
        timeout: Duration,
    ) -> DispatchOutcome {
        let service_call = match self.resolve(call) {
            Ok(service_call) => service_call,
            Err(reason) => {
                warn!(function = %call.name, "rejected function call: {}", reason);
                return DispatchOutcome::Rejected { reason };
            }
        };

        info!(
            function = %call.name,
            service = %service_call.qualified_name(),
            "dispatching service call"
        );

        let pending = host.call_service(
            &service_call.domain,
            &service_call.service,
            &service_call.data,
        );
        match tokio::time::timeout(timeout, pending).await {
            Ok(Ok(result)) => DispatchOutcome::Success {
                call: service_call,
                result,
            },
            Ok(Err(e)) => {
                warn!(service = %service_call.qualified_name(), "service call failed: {}", e);
                DispatchOutcome::Failed {
                    call: service_call,
                    error: e.to_string(),
                }
            }
            Err(_) => {
                warn!(service = %service_call.qualified_name(), "service call timed out");
                DispatchOutcome::TimedOut {
                    call: service_call,
                    after: timeout,
                }
            }
        }
    }
}
