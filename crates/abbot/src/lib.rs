//! Abbot chat bot.
//!
//! Commands are declared once with a [`registry::CommandDescriptor`] and bound
//! from chat messages by [`binder::bind`]. The [`dispatcher::Dispatcher`] runs
//! the checks in order and records usage statistics along the way.

pub mod binder;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod permissions;
pub mod registry;
pub mod response;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use dispatcher::{AppContext, DispatchOutcome, Dispatcher};
pub use error::{AppError, AppResult, CommandError};
pub use registry::CommandRegistry;
