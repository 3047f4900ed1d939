//! Domain events emitted when presence or message state changes

mod presence_event;

pub use presence_event::PresenceEvent;
