
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Connection or bus-level failure
    #[error("transport error: {0}")]
    Transport(String),

    // A bounded wait on the session was exceeded
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    // The response did not match the expected grammar, usually a firmware mismatch
    #[error("protocol error: {0}")]
    Protocol(String),

    // One named field of a response failed to parse
    #[error("unable to parse {field} from {value:?}")]
    Parse { field: &'static str, value: String },

    // A caller-supplied value is outside the instrument's declared bounds
    #[error("{what} {value} not within {min}..{max}")]
    Range { what: &'static str, value: f64, min: f64, max: f64 },

    // The operation is not valid in the instrument's current mode
    #[error("invalid instrument state: {0}")]
    InvalidState(String),

    // No instrument backend is installed on this machine at all
    #[error("no instrument backend available: {0}")]
    BackendMissing(String),
}

pub type Result<T> = std::result::Result<T, Error>;
