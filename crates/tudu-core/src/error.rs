use std::fmt;

/// Which remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Subscribe,
    Create,
    Delete,
    Patch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Subscribe => "subscribe",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Patch => "patch",
        })
    }
}

/// The single error class: a remote operation failed. Network, permission
/// and decoding failures all collapse into this.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("remote {op} failed: {detail}")]
pub struct RemoteError {
    pub op: Operation,
    pub detail: String,
}

impl RemoteError {
    pub fn new(op: Operation, detail: impl fmt::Display) -> Self {
        Self {
            op,
            detail: detail.to_string(),
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
