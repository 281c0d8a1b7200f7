//! Error types surfaced by the transport.

use thiserror::Error;

/// Which backend operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListDocuments,
    UploadDocuments,
    SubmitQuery,
    ClearAll,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::ListDocuments => "list documents",
            Operation::UploadDocuments => "upload documents",
            Operation::SubmitQuery => "submit query",
            Operation::ClearAll => "clear",
        };
        f.write_str(name)
    }
}

/// The only failure kind the client distinguishes.
///
/// Connection errors, timeouts, non-2xx statuses and undecodable bodies all
/// land here; error bodies from the backend are not decoded.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("backend unreachable ({operation}): {reason}")]
    BackendUnreachable {
        operation: Operation,
        reason: String,
    },
}

impl ClientError {
    pub fn unreachable(operation: Operation, reason: impl ToString) -> Self {
        ClientError::BackendUnreachable {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            ClientError::BackendUnreachable { operation, .. } => *operation,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
