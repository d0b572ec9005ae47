//! Library to help implementing gerrit-to-X connectors.
//!
//! The pipeline has three stages: a [`Manager`] keeps a session to the
//! Gerrit server alive and reconnects with a fixed delay when it drops, an
//! [`EventStream`] decodes the `gerrit stream-events` output line by line
//! into typed [`Event`]s, and a [`Dispatcher`] routes every event to the
//! registered [`Handler`]s in order. Handlers implement only the event kinds
//! they care about; see [`redmine::RedmineHandler`] for a complete connector.
//!
//! [`Manager`]: manager::Manager
//! [`EventStream`]: stream::EventStream
//! [`Event`]: event::Event
//! [`Dispatcher`]: dispatch::Dispatcher
//! [`Handler`]: dispatch::Handler

pub mod connection;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod manager;
pub mod object;
pub mod redmine;
pub mod stream;

pub use crate::connection::{ConnectOptions, Connection, EventSource, SshEventSource};
pub use crate::dispatch::{Dispatcher, Handler};
pub use crate::error::{ConnectionError, DecodeError};
pub use crate::event::Event;
pub use crate::manager::{Manager, Mode};
pub use crate::stream::EventStream;
