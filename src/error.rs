use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The profile JSON could not be parsed: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Inconsistent profile tables in thread {thread_index}: {reason}")]
    InvalidProfile {
        thread_index: usize,
        reason: &'static str,
    },
}
