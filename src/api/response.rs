use crate::api::{Candidate, GenerateContentResponse, GenerationError};
use crate::models::FunctionCall;

const ACCEPTED_FINISH_REASONS: [&str; 3] = ["FINISH_REASON_UNSPECIFIED", "STOP", "MAX_TOKENS"];

/// Reject blocked prompts and candidates that stopped for a reason other than
/// finishing or running out of tokens.
pub fn classify_response(response: &GenerateContentResponse) -> Result<(), GenerationError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(GenerationError::BlockedPrompt(reason.to_string()));
    }

    let candidate = first_candidate(response)?;
    match candidate.finish_reason.as_deref() {
        None => Ok(()),
        Some(reason) if ACCEPTED_FINISH_REASONS.contains(&reason) => Ok(()),
        Some(reason) => Err(GenerationError::StoppedCandidate(reason.to_string())),
    }
}

pub fn first_candidate(response: &GenerateContentResponse) -> Result<&Candidate, GenerationError> {
    response
        .candidates
        .first()
        .ok_or_else(|| GenerationError::InvalidArgument("response contained no candidates".to_string()))
}

/// All function calls of the first candidate, in part order.
pub fn parse_function_calls(
    response: &GenerateContentResponse,
) -> Result<Vec<FunctionCall>, GenerationError> {
    Ok(first_candidate(response)?
        .content
        .function_calls()
        .cloned()
        .collect())
}

pub fn first_function_call(
    response: &GenerateContentResponse,
) -> Result<Option<FunctionCall>, GenerationError> {
    Ok(parse_function_calls(response)?.into_iter().next())
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(response: &GenerateContentResponse) -> Result<String, GenerationError> {
    Ok(first_candidate(response)?.content.text())
}
