//! Business logic services
//!
//! Both transports call into these services, so a change made over the push
//! channel and one made over the HTTP fallback take the same path.

pub mod context;
pub mod error;
pub mod presence;
pub mod relay;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use presence::PresenceService;
pub use relay::MessageRelay;
