//! Strongly-typed identifiers.
//!
//! Each id is a 64-bit integer newtype so that action ids, reaction ids,
//! session ids and user-chosen reaction handles cannot be mixed up at call
//! sites. [`SequenceNumber`] generates monotonic ids; within a session it
//! guarantees no two reactions ever share a [`ReactionId`].

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[inline]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id_type!(
    /// Identifier of a session, assigned by the server.
    SessionId
);
define_id_type!(
    /// Identifier of an action instance, chosen by the caller and unique
    /// within a session. Removed ids are never recycled.
    ActionInstanceId
);
define_id_type!(
    /// Identifier of a reaction, assigned by the session from a monotonic
    /// counter.
    ReactionId
);
define_id_type!(
    /// User-chosen tag for a reaction, used to address its callback. Must
    /// be unique within a session.
    ReactionHandle
);

/// Atomic monotonic counter for generating unique sequence numbers.
///
/// No two calls to [`next`](Self::next) on the same instance return the
/// same value, even across threads, short of overflowing the counter.
#[derive(Debug, Default)]
pub struct SequenceNumber {
    word: AtomicI64,
}

impl SequenceNumber {
    pub const fn new() -> Self {
        Self {
            word: AtomicI64::new(0),
        }
    }

    /// Returns the value one greater than the previous call, starting at 0.
    #[inline]
    pub fn next(&self) -> i64 {
        self.word.fetch_add(1, Ordering::Relaxed)
    }
}
