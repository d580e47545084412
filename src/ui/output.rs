use colored::*;

use crate::actions::DispatchOutcome;
use crate::models::ConversationResult;

/// Display the assistant's reply, or its error message in red
pub fn display_result(result: &ConversationResult) {
    if result.response.is_error() {
        eprintln!("{}", result.response.speech.red());
    } else {
        println!("{}", result.response.speech);
    }
}

/// Display the service call a turn triggered
pub fn display_action(outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Success { call, .. } => {
            eprintln!(
                "{}",
                format!("[action] {} {}", call.qualified_name(), call.data).cyan()
            );
        }
        DispatchOutcome::Rejected { reason } => {
            eprintln!("{}", format!("[action] rejected: {}", reason).yellow());
        }
        DispatchOutcome::Failed { call, error } => {
            eprintln!(
                "{}",
                format!("[action] {} failed: {}", call.qualified_name(), error).red()
            );
        }
        DispatchOutcome::TimedOut { call, after } => {
            eprintln!(
                "{}",
                format!(
                    "[action] {} timed out after {}s",
                    call.qualified_name(),
                    after.as_secs()
                )
                .red()
            );
        }
        DispatchOutcome::Skipped => {}
    }
}

pub fn display_conversation_id(conversation_id: &str) {
    eprintln!("{}", format!("[conversation] {}", conversation_id).dimmed());
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", "Error:".red(), message);
}
