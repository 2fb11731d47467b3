//! NetLens Traffic Engine
//!
//! Live classification of captured link-layer frames into concurrently
//! readable aggregates for a live-updating display.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        TRAFFIC ENGINE                            │
//! │                                                                  │
//! │  packet source ──► Frame ──► ParsedFrame::parse (validate all)   │
//! │                                  │                               │
//! │                     malformed ◄──┴──► Pipeline                   │
//! │                   (dropped++)          │                         │
//! │         ┌─────────────┬────────────────┼──────────────┐          │
//! │         ▼             ▼                ▼              ▼          │
//! │   ┌──────────┐  ┌───────────┐   ┌───────────┐  ┌───────────┐     │
//! │   │ L2: MACs │  │ L3: IPs   │   │ L4: ports │  │ TCP       │     │
//! │   │ EtherType│  │ IP pairs  │   │           │  │ streams   │     │
//! │   │          │  │ IP proto  │   │           │  │ (RTT)     │     │
//! │   └────┬─────┘  └─────┬─────┘   └─────┬─────┘  └─────┬─────┘     │
//! │        └──────────────┴───────┬───────┴──────────────┘           │
//! │                               ▼                                  │
//! │                 IndexedAggregate<K, V> (DashMap +                │
//! │                 append-only order list, atomic values)           │
//! │                               │                                  │
//! │                  display ◄────┘ len() / get_by_index()           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! Any number of threads may call [`TrafficEngine::process`] while others
//! page through the aggregates. No global lock is taken on the hot path:
//! key lookup uses shard locks, counters are atomics, and the order list is
//! written only when a key is seen for the first time.

#![warn(clippy::all)]

pub mod aggregate;
pub mod config;
pub mod core;
pub mod frame;
pub mod names;
pub mod pipeline;
pub mod stats;
pub mod stream;

#[cfg(test)]
mod testutil;

pub use crate::core::{Aggregates, TrafficEngine};
pub use aggregate::{IndexedAggregate, IndexedEntry};
pub use config::{ConfigError, EngineConfig};
pub use frame::{Frame, ParsedFrame, TcpFlags};
pub use names::{NameTables, OuiTable, StaticNames};
pub use pipeline::{Pipeline, Stage};
pub use stats::{ProtocolCounters, StreamStats, TrafficCounters};
pub use stream::{HandshakeState, TcpSegment, TcpStream};

pub use netlens_common::{
    Direction, FourTuple, IpAddress, IpPair, MacAddr, MacClass, NetLensError, NetLensResult,
    ParseError, Timestamp,
};
