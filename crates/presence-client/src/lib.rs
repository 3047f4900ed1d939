//! # presence-client
//!
//! Client side of the presence subsystem. A [`Reconciler`] drives the push
//! channel and the HTTP polling fallback side by side and folds whatever either
//! of them reports into one [`ClientState`].

pub mod config;
pub mod error;
pub mod reconciler;
pub mod state;
pub mod transport;

pub use config::{ClientConfig, ClientConfigError};
pub use error::{ClientError, ClientResult};
pub use reconciler::Reconciler;
pub use state::{ClientState, ConnectionMode, SendFailure, StateStore};
pub use transport::{PollingTransport, PresenceTransport, PushTransport, TransportEvent, TransportKind};
