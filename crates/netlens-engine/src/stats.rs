//! Traffic Counters
//!
//! Lock-free accumulation records mutated by the classification pipeline and
//! read by the display through `snapshot()`.

use netlens_common::{Direction, Timestamp};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Directional packet/byte counters for one MAC, IP, conversation or port
#[derive(Debug)]
pub struct TrafficCounters {
    tx_packets: AtomicU64,
    rx_packets: AtomicU64,
    tx_bytes: AtomicU64,
    rx_bytes: AtomicU64,
    first_seen: AtomicU64,
    last_activity: AtomicU64,
}

impl TrafficCounters {
    /// Empty counters, first seen at `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            tx_packets: AtomicU64::new(0),
            rx_packets: AtomicU64::new(0),
            tx_bytes: AtomicU64::new(0),
            rx_bytes: AtomicU64::new(0),
            first_seen: AtomicU64::new(now.as_micros()),
            last_activity: AtomicU64::new(now.as_micros()),
        }
    }

    /// Counters already holding their first packet
    pub fn with_first(direction: Direction, bytes: u64, now: Timestamp) -> Self {
        let counters = Self::new(now);
        counters.record(direction, bytes, now);
        counters
    }

    /// Count one packet of `bytes` and overwrite the last-activity time
    #[inline(always)]
    pub fn record(&self, direction: Direction, bytes: u64, now: Timestamp) {
        match direction {
            Direction::Transmitted => {
                self.tx_packets.fetch_add(1, Ordering::Relaxed);
                self.tx_bytes.fetch_add(bytes, Ordering::Relaxed);
            }
            Direction::Received => {
                self.rx_packets.fetch_add(1, Ordering::Relaxed);
                self.rx_bytes.fetch_add(bytes, Ordering::Relaxed);
            }
        }
        self.last_activity.store(now.as_micros(), Ordering::Relaxed);
    }

    /// Total packets, both directions
    pub fn packets(&self) -> u64 {
        self.tx_packets.load(Ordering::Relaxed) + self.rx_packets.load(Ordering::Relaxed)
    }

    /// Total bytes, both directions
    pub fn bytes(&self) -> u64 {
        self.tx_bytes.load(Ordering::Relaxed) + self.rx_bytes.load(Ordering::Relaxed)
    }

    /// Last time a packet was recorded
    pub fn last_activity(&self) -> Timestamp {
        Timestamp::from_micros(self.last_activity.load(Ordering::Relaxed))
    }

    /// True if a packet was seen within `window_us` of `now` (used to
    /// highlight recently active rows)
    pub fn is_active_within(&self, now: Timestamp, window_us: u64) -> bool {
        now.micros_since(self.last_activity()) <= window_us
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            tx_packets: self.tx_packets.load(Ordering::Relaxed),
            rx_packets: self.rx_packets.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            first_seen: self.first_seen.load(Ordering::Relaxed),
            last_activity: self.last_activity.load(Ordering::Relaxed),
        }
    }
}

/// Stats snapshot (non-atomic)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrafficSnapshot {
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub first_seen: u64,
    pub last_activity: u64,
}

impl TrafficSnapshot {
    pub fn packets(&self) -> u64 {
        self.tx_packets + self.rx_packets
    }

    pub fn bytes(&self) -> u64 {
        self.tx_bytes + self.rx_bytes
    }
}

/// Packets/bytes for one EtherType or IP protocol number
#[derive(Debug, Default)]
pub struct ProtocolCounters {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl ProtocolCounters {
    /// Counters already holding their first packet
    pub fn with_first(bytes: u64) -> Self {
        Self {
            packets: AtomicU64::new(1),
            bytes: AtomicU64::new(bytes),
        }
    }

    #[inline(always)]
    pub fn record(&self, bytes: u64) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProtocolSnapshot {
        ProtocolSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolSnapshot {
    pub packets: u64,
    pub bytes: u64,
}

/// Per-flow TCP statistics
#[derive(Debug)]
pub struct StreamStats {
    handshakes: AtomicU64,
    rtt_sum_us: AtomicU64,
    rtt_min_us: AtomicU64,
    rtt_max_us: AtomicU64,
    segments: AtomicU64,
    bytes: AtomicU64,
}

impl StreamStats {
    pub const fn new() -> Self {
        Self {
            handshakes: AtomicU64::new(0),
            rtt_sum_us: AtomicU64::new(0),
            rtt_min_us: AtomicU64::new(u64::MAX),
            rtt_max_us: AtomicU64::new(0),
            segments: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn record_segment(&self, bytes: u64) {
        self.segments.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Fold one handshake round-trip time (microseconds)
    pub fn record_handshake(&self, rtt_us: u64) {
        // Update min/max
        loop {
            let current_min = self.rtt_min_us.load(Ordering::Relaxed);
            if rtt_us >= current_min {
                break;
            }
            if self
                .rtt_min_us
                .compare_exchange_weak(current_min, rtt_us, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        loop {
            let current_max = self.rtt_max_us.load(Ordering::Relaxed);
            if rtt_us <= current_max {
                break;
            }
            if self
                .rtt_max_us
                .compare_exchange_weak(current_max, rtt_us, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        // Published last: a reader that sees the count also sees min/max
        self.rtt_sum_us.fetch_add(rtt_us, Ordering::Relaxed);
        self.handshakes.fetch_add(1, Ordering::Release);
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        let handshakes = self.handshakes.load(Ordering::Acquire);
        let seen = handshakes > 0;
        StreamSnapshot {
            handshakes,
            rtt_sum_us: self.rtt_sum_us.load(Ordering::Relaxed),
            rtt_min_us: seen.then(|| self.rtt_min_us.load(Ordering::Relaxed)),
            rtt_max_us: seen.then(|| self.rtt_max_us.load(Ordering::Relaxed)),
            segments: self.segments.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSnapshot {
    pub handshakes: u64,
    pub rtt_sum_us: u64,
    pub rtt_min_us: Option<u64>,
    pub rtt_max_us: Option<u64>,
    pub segments: u64,
    pub bytes: u64,
}

impl StreamSnapshot {
    /// Mean handshake RTT in microseconds
    pub fn average_rtt_us(&self) -> Option<f64> {
        if self.handshakes == 0 {
            return None;
        }
        Some(self.rtt_sum_us as f64 / self.handshakes as f64)
    }
}

/// Engine-wide frame accounting (cache-line aligned)
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct EngineStats {
    pub frames: AtomicU64,
    pub bytes: AtomicU64,
    pub dropped: AtomicU64,
}

impl EngineStats {
    #[inline(always)]
    pub fn record_frame(&self, bytes: u64) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.frames.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatsSnapshot {
    pub frames: u64,
    pub bytes: u64,
    pub dropped: u64,
}
