//! Value objects - immutable types that represent domain concepts

mod user_id;

pub use user_id::{UserId, UserIdError};
