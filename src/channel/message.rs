//! # Channel element: payload or shutdown sentinel.
//!
//! The sentinel travels through the same channel as data. Keeping it as its own
//! variant makes every consumer match on it explicitly instead of comparing
//! against a magic value.
//!
//! ```rust
//! use queuevisor::Message;
//!
//! let m: Message<u32> = 7.into();
//! assert_eq!(m.into_payload(), Some(7));
//! assert!(Message::<u32>::Shutdown.is_shutdown());
//! ```

use std::fmt;

/// Element carried by a [`BoundedChannel`](crate::BoundedChannel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// Ordinary item.
    Payload(T),
    /// Shutdown sentinel. Exactly one is inserted per shutdown sequence.
    Shutdown,
}

impl<T> Message<T> {
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Message::Shutdown)
    }

    /// Returns the payload, or `None` for the sentinel.
    #[inline]
    pub fn into_payload(self) -> Option<T> {
        match self {
            Message::Payload(item) => Some(item),
            Message::Shutdown => None,
        }
    }
}

impl<T> From<T> for Message<T> {
    fn from(item: T) -> Self {
        Message::Payload(item)
    }
}

impl<T: fmt::Display> fmt::Display for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Payload(item) => item.fmt(f),
            Message::Shutdown => f.write_str("POISON_PILL"),
        }
    }
}
