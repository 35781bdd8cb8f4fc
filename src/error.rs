use thiserror::Error;

/// Failures talking to the NHL web API. Both variants are recoverable at the
/// poll-cycle boundary: the caller logs them and waits for the next cycle.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure, timeout, or non-success HTTP status.
    #[error("network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// The response arrived but did not have the expected shape.
    #[error("unexpected response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl ApiError {
    pub fn network(url: &str, reason: impl ToString) -> Self {
        ApiError::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(url: &str, reason: impl ToString) -> Self {
        ApiError::Parse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A goal alert could not be handed to the outbound channel.
#[derive(Debug, Error)]
#[error("failed to send via {channel}: {reason}")]
pub struct SendError {
    pub channel: String,
    pub reason: String,
}

impl SendError {
    pub fn new(channel: &str, reason: impl ToString) -> Self {
        SendError {
            channel: channel.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The interactive terminal could not be set up. Fatal for the scoreboard.
#[derive(Debug, Error)]
#[error("cannot initialise terminal: {0} (try --plain for line-by-line output)")]
pub struct DisplayInitError(#[from] pub std::io::Error);

pub type ApiResult<T> = std::result::Result<T, ApiError>;
