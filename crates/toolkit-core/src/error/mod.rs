//! Error types for the toolkit
//!
//! All fallible operations return [`ToolkitResult`]. The error enum is
//! `Clone` because single-flight operations hand the same failure to every
//! waiter.

mod constructors;
mod types;

pub use types::{FactoryFailure, ToolkitError, ToolkitResult};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_configuration_error_names_profile_and_field() {
        let err = ToolkitError::configuration_field("dev", "role_arn", "must be an ARN");
        let text = err.to_string();
        assert!(text.contains("'dev'"));
        assert!(text.contains("field 'role_arn'"));
        assert!(text.contains("must be an ARN"));
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_no_credentials_aggregates_reasons() {
        let err = ToolkitError::no_credentials(
            "dev",
            vec![
                FactoryFailure::new("profile", "profile 'dev' not found"),
                FactoryFailure::new("environment", "AWS_ACCESS_KEY_ID is not set"),
            ],
        );
        let text = err.to_string();
        assert!(text.contains("profile: profile 'dev' not found"));
        assert!(text.contains("environment: AWS_ACCESS_KEY_ID is not set"));
        assert_eq!(err.error_code(), "TOOLKIT_NO_CREDENTIALS");
    }

    #[test]
    fn test_no_credentials_without_sources() {
        let err = ToolkitError::no_credentials("dev", Vec::new());
        assert!(err.to_string().contains("no credential sources are registered"));
    }

    #[test]
    fn test_retry_classification() {
        assert!(ToolkitError::transient("sts:AssumeRole", "throttled").is_retryable());
        assert!(!ToolkitError::challenge_cancelled("dev").is_retryable());
        assert!(!ToolkitError::challenge_cancelled("dev").is_fatal());
    }

    #[test]
    fn test_profile_parse_display() {
        let err = ToolkitError::profile_parse(Path::new("/tmp/credentials"), 7, "expected '='");
        assert_eq!(err.to_string(), "Failed to parse /tmp/credentials:7: expected '='");
    }
}
