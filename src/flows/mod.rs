//! User-facing operations: each one calls the backend, then refreshes the
//! affected cache in the [`Store`](crate::store::Store).

pub mod auth;
pub mod board;
pub mod contacts;

use thiserror::Error;

use crate::api::{ApiError, ErrorContext};
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),
}

impl FlowError {
    pub fn user_messages(&self, context: ErrorContext) -> Vec<String> {
        match self {
            Self::Api(e) => e.user_messages(context),
            other => vec![other.to_string()],
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_auth_failure())
    }
}
