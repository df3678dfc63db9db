//! Uniform command execution: local subprocess or remote shell service,
//! one `Response` contract, redacted history.

pub mod command;
pub mod dispatcher;
pub mod history;
pub mod local;
pub mod remote;

pub use command::{Response, ShellCommand, ShellCommandBuilder, Target, TransportStatus};
pub use dispatcher::Dispatcher;
pub use history::{HistoryEntry, ShellHistory};
pub use local::{Executor, LocalExecutor};
pub use remote::RemoteExecutor;
