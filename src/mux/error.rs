// Errors
use std::error::Error;

/// Why one attempt against one provider came up empty.
///
/// These never escape an `execute` call on their own, they get recovered by
/// retrying the next candidate and only surface inside `AllProvidersExhausted`.
#[derive(Debug, Clone)]
pub enum AttemptError {
    ProviderUnavailable(String),
    UpstreamRequestFailed(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AttemptError::ProviderUnavailable(reason) => {
                write!(f, "provider unavailable: {}", reason)
            }
            AttemptError::UpstreamRequestFailed(reason) => {
                write!(f, "upstream request failed: {}", reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub provider: String,
    pub error: AttemptError,
}

impl std::fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

#[derive(Debug)]
pub enum MuxError {
    AllProvidersExhausted(Vec<FailedAttempt>),
    InvalidNetworkSelection(String),
}

impl std::fmt::Display for MuxError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MuxError::AllProvidersExhausted(failures) => {
                let causes = failures
                    .iter()
                    .map(|failure| failure.to_string())
                    .collect::<Vec<String>>()
                    .join("; ");
                write!(f, "All providers exhausted: {}", causes)
            }
            MuxError::InvalidNetworkSelection(network) => {
                write!(f, "Invalid network selection: {}", network)
            }
        }
    }
}

impl Error for MuxError {}
