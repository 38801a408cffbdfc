//! Subcommand implementations.
//!
//! Each command runs against one [`AppContext`] and reports through
//! `tracing`, so output follows `RUST_LOG` and `WONDER_LOG_FORMAT` like
//! every other log line.

pub mod chat;
pub mod featured;
pub mod notify;
pub mod orders;
pub mod reset;
pub mod user;
pub mod watch;

use thiserror::Error;
use wonder_state::StateError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A state operation failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// An argument was well-formed but unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Shorthand for command results.
pub type CommandResult<T = ()> = Result<T, CommandError>;
