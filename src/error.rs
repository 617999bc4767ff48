//! Error types for node bridging, descriptor import and the sync worker
//!
//! Connectivity and decode failures are `NodeError`s; they degrade the
//! status surface but are fatal inside the worker's phases.

use thiserror::Error;

/// Failures talking to (or understanding) the full node
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Bitcoin Core is unreachable: {0}")]
    Unreachable(String),

    #[error("RPC `{method}` failed: {reason}")]
    Rpc { method: &'static str, reason: String },

    #[error("Unable to parse {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid response from node: {0}")]
    InvalidResponse(String),
}

impl NodeError {
    /// Create an RPC failure for the named method
    pub fn rpc(method: &'static str, reason: impl ToString) -> Self {
        Self::Rpc {
            method,
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid descriptor ({descriptor}): {source}")]
    InvalidDescriptor {
        descriptor: String,
        #[source]
        source: NodeError,
    },

    #[error("Failed to derive address ({descriptor} - #{depth}): {source}")]
    AddressDerivationFailed {
        descriptor: String,
        depth: u32,
        #[source]
        source: NodeError,
    },

    #[error("Failed to get address info ({address} from {descriptor} - #{depth}): {source}")]
    AddressInfoFailed {
        address: String,
        descriptor: String,
        depth: u32,
        #[source]
        source: NodeError,
    },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("Checkpoint storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for BridgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
