//! Bounded channel and its element type.
//!
//! ## Contents
//! - [`BoundedChannel`] fixed-capacity FIFO with fair blocking and timed operations
//! - [`Message`] element type: a payload or the shutdown sentinel
//!
//! ## Quick reference
//! - **Writers**: producers (`offer`), the shutdown coordinator (`put(Message::Shutdown)`),
//!   consumers relaying the sentinel (`put`).
//! - **Readers**: consumers (`take`), the auto-scaler and dashboard (`size`/`capacity`).

mod bounded;
mod message;

pub use bounded::BoundedChannel;
pub use message::Message;
