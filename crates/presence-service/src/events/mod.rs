//! Event distribution

mod bus;

pub use bus::EventBus;
