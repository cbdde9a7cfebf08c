//! IPC layer for slotkeeperd
//!
//! Provides:
//! - Unix domain socket server speaking newline-delimited JSON
//! - A matching async client and event stream
//! - Role assignment from peer credentials

mod client;
mod server;

pub use client::*;
pub use server::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Server error: {0}")]
    ServerError(String),
}

pub type IpcResult<T> = Result<T, IpcError>;
