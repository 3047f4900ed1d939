//! Repository implementations
//!
//! In-process implementations of the repository traits defined in presence-core.

mod message;

pub use message::MemoryMessageRepository;
