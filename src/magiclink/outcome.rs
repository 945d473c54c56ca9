use crate::magiclink::client::ClientError;
use std::fmt;

/// Success sentinel returned by the Mideye Server once the user approves.
pub const TOUCH_ACCEPTED: &str = "TOUCH_ACCEPTED";

/// Text shown when the Mideye Server answered with something that is not `{"code": "..."}`.
pub const PARSE_ERROR: &str = "PARSE_ERROR";

/// Result of one authentication attempt, classified at the client boundary.
///
/// Everything downstream of [`crate::magiclink::client::MideyeClient`] matches
/// on this instead of on raw response codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted,
    /// Any non-empty code other than [`TOUCH_ACCEPTED`], e.g. `TOUCH_REJECTED`.
    Rejected(String),
    /// The call never produced a response body (network, timeout, TLS, HTTP status).
    TransportError(String),
    /// The body could not be read as `{"code": "<string>"}`, or the code was empty.
    ParseError,
}

impl AuthOutcome {
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            TOUCH_ACCEPTED => Self::Accepted,
            "" => Self::ParseError,
            other => Self::Rejected(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Raw code as returned by the server, if the server returned one.
    #[must_use]
    pub fn response_code(&self) -> Option<&str> {
        match self {
            Self::Accepted => Some(TOUCH_ACCEPTED),
            Self::Rejected(code) => Some(code),
            Self::TransportError(_) | Self::ParseError => None,
        }
    }
}

impl From<Result<String, ClientError>> for AuthOutcome {
    fn from(result: Result<String, ClientError>) -> Self {
        match result {
            Ok(code) => Self::from_code(&code),
            Err(ClientError::Parse(_)) => Self::ParseError,
            Err(err) => Self::TransportError(err.to_string()),
        }
    }
}

/// The text presented to the user for this outcome.
impl fmt::Display for AuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str(TOUCH_ACCEPTED),
            Self::Rejected(code) => f.write_str(code),
            Self::TransportError(details) => write!(f, "ERROR: {details}"),
            Self::ParseError => f.write_str(PARSE_ERROR),
        }
    }
}
