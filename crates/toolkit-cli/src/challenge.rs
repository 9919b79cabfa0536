//! MFA prompt on the controlling terminal

use dialoguer::{Input, theme::ColorfulTheme};
use toolkit_core::credentials::challenge::{
    ChallengeContext, ChallengeResponse, InteractiveChallengeHandler,
};
use tracing::debug;

/// Asks for MFA codes with a dialoguer prompt
///
/// An empty answer or a terminal error counts as cancellation.
#[derive(Debug, Default)]
pub struct TerminalChallengeHandler;

fn is_token_code(input: &str) -> bool {
    input.is_empty() || (input.len() == 6 && input.chars().all(|c| c.is_ascii_digit()))
}

impl InteractiveChallengeHandler for TerminalChallengeHandler {
    fn challenge(&self, context: &ChallengeContext) -> ChallengeResponse {
        let answer = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(context.prompt_text())
            .allow_empty(true)
            .validate_with(|input: &String| -> Result<(), &str> {
                if is_token_code(input.trim()) {
                    Ok(())
                } else {
                    Err("MFA codes are six digits")
                }
            })
            .interact_text();

        match answer {
            Ok(code) if !code.trim().is_empty() => ChallengeResponse::Code(code.trim().to_string()),
            Ok(_) => ChallengeResponse::Cancelled,
            Err(e) => {
                debug!(error = %e, "MFA prompt failed");
                ChallengeResponse::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_code_shape() {
        assert!(is_token_code("123456"));
        assert!(is_token_code(""));
        assert!(!is_token_code("12345"));
        assert!(!is_token_code("12345a"));
    }
}
