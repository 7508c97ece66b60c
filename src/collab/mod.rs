//! External collaborators: formatter and import-sorter subprocesses, plus
//! an optional LLM commentary backend.
//!
//! Collaborators are best-effort by contract. Every failure mode (missing
//! binary, non-zero exit, timeout, bad API response) surfaces as a
//! [`CollabError`] that the pipeline downgrades to a finding; a failed
//! collaborator never blocks or corrupts the repaired output.

pub mod semantic;
pub mod tools;

use thiserror::Error;

pub use semantic::{LlmBackend, SemanticClient};
pub use tools::ExternalTool;

pub type CollabResult<T> = Result<T, CollabError>;

#[derive(Error, Debug)]
pub enum CollabError {
    #[error("failed to launch '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("missing API key: set {env_var}")]
    MissingApiKey { env_var: String },

    #[error("unknown semantic backend '{0}'")]
    UnknownBackend(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse API response: {0}")]
    Parse(String),
}
