//! NetLens Common - Shared types for live traffic classification
//!
//! This crate provides compact, comparable primitives for:
//! - Hardware (MAC) addresses packed into a single integer
//! - IPv4/IPv6 addresses as a tagged union with family-aware identity
//! - Direction-agnostic flow keys (IP pair, 4-tuple)
//! - Capture timestamps and traffic direction
//! - Error handling
//!
//! Nothing here allocates on the hot path; every type is `Copy` and usable
//! directly as a hash map key.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod flow;
pub mod ip;
pub mod mac;

pub use error::*;
pub use flow::{FourTuple, IpPair};
pub use ip::IpAddress;
pub use mac::{MacAddr, MacClass};

use serde::Serialize;

/// Capture timestamp in microseconds.
///
/// Supplied by the packet source; the engine never reads the wall clock for
/// per-frame accounting so that replayed captures aggregate identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp from microseconds
    #[inline(always)]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Microseconds value
    #[inline(always)]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Microseconds elapsed from `earlier` to `self`, saturating at zero.
    #[inline(always)]
    pub const fn micros_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Which way a frame crossed the local interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Sent by the local host
    Transmitted,
    /// Received by the local host
    Received,
}

impl Direction {
    /// Infer direction from the frame's source MAC and the local interface MAC.
    #[inline]
    pub fn infer(src: MacAddr, local: MacAddr) -> Self {
        if src == local {
            Self::Transmitted
        } else {
            Self::Received
        }
    }

    /// Pick the remote side of a `(source, destination)` pair.
    #[inline(always)]
    pub fn peer<T>(self, src: T, dst: T) -> T {
        match self {
            Self::Transmitted => dst,
            Self::Received => src,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_since() {
        let syn = Timestamp::from_micros(100);
        let ack = Timestamp::from_micros(150);
        assert_eq!(ack.micros_since(syn), 50);
        assert_eq!(syn.micros_since(ack), 0);
    }

    #[test]
    fn test_direction_peer() {
        assert_eq!(Direction::Transmitted.peer("local", "remote"), "remote");
        assert_eq!(Direction::Received.peer("remote", "local"), "remote");
    }

    #[test]
    fn test_direction_infer() {
        let local = MacAddr::new([0x00, 0x1b, 0x44, 0x11, 0x3a, 0xb7]);
        let other = MacAddr::new([0x00, 0x1b, 0x44, 0x11, 0x3a, 0xb8]);
        assert_eq!(Direction::infer(local, local), Direction::Transmitted);
        assert_eq!(Direction::infer(other, local), Direction::Received);
    }
}
