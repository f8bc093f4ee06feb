//! Ordered, reentrancy-safe pub/sub events.
//!
//! An [`Event`] owns its hooks in subscription order. Firing one runs every
//! surviving hook in order and folds the results according to the event's
//! [`ReturnMode`]. Hooks may add or remove other hooks (or even themselves)
//! from inside a call without corrupting the in-flight iteration — see
//! [`Event::fire`].

mod bus;
mod error;
mod event;
mod macros;

pub use bus::EventBus;
pub use error::Error;
pub use event::{
    Event, EventCtl, EventFlags, EventResult, Hook, HookId, HookReturn, ReturnMode, Sentinel,
    Verdict,
};
