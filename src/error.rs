use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    RemoteCreate(String),

    #[error("{0}")]
    Widget(String),

    #[error("Timeout waiting for webhook after {attempts} attempt(s)")]
    PollTimeout { attempts: u32 },

    #[error("Could not load verification result: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            FlowError::PollTimeout { attempts: 3 }.to_string(),
            "Timeout waiting for webhook after 3 attempt(s)"
        );
        assert_eq!(
            FlowError::RemoteCreate("applicant rejected".into()).to_string(),
            "applicant rejected"
        );
    }
}
