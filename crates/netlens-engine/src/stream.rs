//! TCP Stream Analyzer
//!
//! Tracks the first three segments of each flow to detect a three-way
//! handshake and record its round-trip time. Only the opening segments are
//! examined: retransmitted SYNs, reordering and key reuse are not handled.
//!
//! ```text
//!   Empty --SYN--> AwaitingSynAck --SYN+ACK--> AwaitingAck --ACK--> Established
//!     |                  |                          |
//!     +------ anything else at that position -------+----------> Aborted
//! ```

use crate::frame::TcpFlags;
use crate::stats::{StreamSnapshot, StreamStats};
use netlens_common::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;

/// One observed TCP segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TcpSegment {
    pub flags: u8,
    pub seq: u32,
    pub ack: u32,
    pub timestamp: Timestamp,
    /// Bytes counted toward the flow (wire length of the frame)
    pub len: u32,
}

/// Handshake detection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum HandshakeState {
    /// No segment seen yet
    #[default]
    Empty,
    /// Saw a bare SYN
    AwaitingSynAck { syn_at: Timestamp },
    /// Saw SYN, then SYN+ACK
    AwaitingAck { syn_at: Timestamp },
    /// Handshake completed
    Established { rtt_us: u64 },
    /// Opening segments did not form a handshake
    Aborted,
}

impl HandshakeState {
    /// Feed the next segment. Returns the new state and the RTT if this
    /// segment completed the handshake.
    pub fn advance(self, segment: &TcpSegment) -> (Self, Option<u64>) {
        let flags = TcpFlags::new(segment.flags);
        match self {
            Self::Empty if segment.flags == TcpFlags::SYN => (
                Self::AwaitingSynAck {
                    syn_at: segment.timestamp,
                },
                None,
            ),
            Self::AwaitingSynAck { syn_at } if flags.has(TcpFlags::SYN | TcpFlags::ACK) => {
                (Self::AwaitingAck { syn_at }, None)
            }
            Self::AwaitingAck { syn_at } if flags.has(TcpFlags::ACK) => {
                let rtt_us = segment.timestamp.micros_since(syn_at);
                (Self::Established { rtt_us }, Some(rtt_us))
            }
            Self::Empty | Self::AwaitingSynAck { .. } | Self::AwaitingAck { .. } => {
                (Self::Aborted, None)
            }
            terminal => (terminal, None),
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Established { .. } | Self::Aborted)
    }
}

#[derive(Debug, Default)]
struct StreamInner {
    state: HandshakeState,
    segments: Vec<TcpSegment>,
}

/// Per-flow segment log and statistics
#[derive(Debug)]
pub struct TcpStream {
    stats: StreamStats,
    inner: Mutex<StreamInner>,
    max_segments: usize,
}

impl TcpStream {
    /// Empty stream keeping at most `max_segments` segments
    pub fn new(max_segments: usize) -> Self {
        Self {
            stats: StreamStats::new(),
            inner: Mutex::new(StreamInner::default()),
            max_segments,
        }
    }

    /// Record a segment. Returns the handshake RTT when this segment
    /// completes one.
    pub fn observe(&self, segment: TcpSegment) -> Option<u64> {
        self.stats.record_segment(segment.len as u64);

        let rtt = {
            let mut inner = self.inner.lock();
            let (state, rtt) = inner.state.advance(&segment);
            inner.state = state;
            if inner.segments.len() < self.max_segments {
                inner.segments.push(segment);
            }
            rtt
        };

        if let Some(rtt_us) = rtt {
            self.stats.record_handshake(rtt_us);
        }
        rtt
    }

    pub fn stats(&self) -> StreamSnapshot {
        self.stats.snapshot()
    }

    pub fn state(&self) -> HandshakeState {
        self.inner.lock().state
    }

    /// Retained segments, oldest first
    pub fn segments(&self) -> Vec<TcpSegment> {
        self.inner.lock().segments.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYN: u8 = TcpFlags::SYN;
    const SYN_ACK: u8 = TcpFlags::SYN | TcpFlags::ACK;
    const ACK: u8 = TcpFlags::ACK;

    fn seg(flags: u8, at: u64) -> TcpSegment {
        TcpSegment {
            flags,
            seq: 0,
            ack: 0,
            timestamp: Timestamp::from_micros(at),
            len: 60,
        }
    }

    fn replay(stream: &TcpStream, segments: &[(u8, u64)]) {
        for &(flags, at) in segments {
            stream.observe(seg(flags, at));
        }
    }

    #[test]
    fn test_handshake_rtt() {
        let stream = TcpStream::new(64);
        replay(&stream, &[(SYN, 100), (SYN_ACK, 140), (ACK, 150)]);

        let stats = stream.stats();
        assert_eq!(stats.handshakes, 1);
        assert_eq!(stats.rtt_sum_us, 50);
        assert_eq!(stats.rtt_min_us, Some(50));
        assert_eq!(stats.segments, 3);
        assert_eq!(stats.bytes, 180);
        assert_eq!(stream.state(), HandshakeState::Established { rtt_us: 50 });
    }

    #[test]
    fn test_missing_syn_ack_aborts() {
        let stream = TcpStream::new(64);
        replay(&stream, &[(SYN, 100), (ACK, 140), (ACK, 150)]);

        let stats = stream.stats();
        assert_eq!(stats.handshakes, 0);
        assert_eq!(stats.segments, 3);
        assert_eq!(stream.state(), HandshakeState::Aborted);
    }

    #[test]
    fn test_mid_capture_flow() {
        let stream = TcpStream::new(64);
        replay(&stream, &[(ACK, 100), (SYN, 110), (SYN_ACK, 120), (ACK, 130)]);
        assert_eq!(stream.stats().handshakes, 0);
        assert_eq!(stream.state(), HandshakeState::Aborted);
    }

    #[test]
    fn test_first_segment_must_be_bare_syn() {
        let (state, _) = HandshakeState::Empty.advance(&seg(SYN_ACK, 0));
        assert_eq!(state, HandshakeState::Aborted);
        let (state, _) = HandshakeState::Empty.advance(&seg(SYN, 0));
        assert!(matches!(state, HandshakeState::AwaitingSynAck { .. }));
    }

    #[test]
    fn test_later_segments_do_not_rehandshake() {
        let stream = TcpStream::new(64);
        replay(
            &stream,
            &[(SYN, 0), (SYN_ACK, 10), (ACK, 20), (SYN, 30), (SYN_ACK, 40), (ACK, 50)],
        );
        assert_eq!(stream.stats().handshakes, 1);
        assert_eq!(stream.stats().segments, 6);
    }

    #[test]
    fn test_segment_cap() {
        let stream = TcpStream::new(2);
        replay(&stream, &[(SYN, 100), (SYN_ACK, 140), (ACK, 150), (ACK, 160)]);

        assert_eq!(stream.segments().len(), 2);
        assert_eq!(stream.segments()[1].timestamp, Timestamp::from_micros(140));
        // Statistics and handshake detection continue past the cap
        assert_eq!(stream.stats().segments, 4);
        assert_eq!(stream.stats().handshakes, 1);
    }
}
