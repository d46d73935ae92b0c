use thiserror::Error;

use super::flow::FlowStep;
use crate::ErrorCategory;

/// Where a client failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientCategory {
    /// The server answered with an error envelope.
    Server(ErrorCategory),
    /// The request never got an answer (timeout, refused connection).
    Transport,
    /// Rejected locally before anything was sent.
    Local,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{code}: {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("session cache: {0}")]
    Storage(String),
    #[error("a request for this step is already in flight")]
    Busy,
    #[error("not allowed at step {0:?}")]
    InvalidStep(FlowStep),
}

impl ClientError {
    #[must_use]
    pub fn category(&self) -> ClientCategory {
        match self {
            Self::Transport(_) => ClientCategory::Transport,
            Self::Rejected { code, .. } => ClientCategory::Server(ErrorCategory::from_code(code)),
            Self::Decode(_) => ClientCategory::Server(ErrorCategory::Internal),
            Self::InvalidUrl(_) | Self::Storage(_) | Self::Busy | Self::InvalidStep(_) => {
                ClientCategory::Local
            }
        }
    }

    /// Machine code of a server rejection.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
