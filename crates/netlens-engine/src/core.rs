//! Traffic Engine
//!
//! Owns every aggregate and runs captured frames through the classification
//! pipeline. Shared between producers (`process`) and the display (`len`,
//! `get_by_index`) behind an `Arc`.

use crate::aggregate::IndexedAggregate;
use crate::config::EngineConfig;
use crate::frame::{Frame, ParsedFrame};
use crate::names::{label, NameTables, StaticNames};
use crate::pipeline::{FrameContext, Pipeline};
use crate::stats::{EngineStats, EngineStatsSnapshot, ProtocolCounters, TrafficCounters};
use crate::stream::TcpStream;
use netlens_common::{
    FourTuple, IpAddress, IpPair, MacAddr, MacClass, NetLensResult, ParseError,
};
use std::path::Path;
use tracing::{info, trace};

pub type MacTable = IndexedAggregate<MacAddr, TrafficCounters>;
pub type IpTable = IndexedAggregate<IpAddress, TrafficCounters>;
pub type ConversationTable = IndexedAggregate<IpPair, TrafficCounters>;
pub type PortTable = IndexedAggregate<u16, TrafficCounters>;
pub type EtherTypeTable = IndexedAggregate<u16, ProtocolCounters>;
pub type IpProtocolTable = IndexedAggregate<u8, ProtocolCounters>;
pub type StreamTable = IndexedAggregate<FourTuple, TcpStream>;

/// Every aggregate the pipeline writes to
#[derive(Default)]
pub struct Aggregates {
    /// Keyed by the remote MAC
    pub macs: MacTable,
    /// Keyed by the remote IP
    pub ips: IpTable,
    pub conversations: ConversationTable,
    /// Keyed by the peer-facing port
    pub ports: PortTable,
    pub ether_types: EtherTypeTable,
    pub ip_protocols: IpProtocolTable,
    pub streams: StreamTable,
}

impl Aggregates {
    pub fn clear(&self) {
        self.macs.clear();
        self.ips.clear();
        self.conversations.clear();
        self.ports.clear();
        self.ether_types.clear();
        self.ip_protocols.clear();
        self.streams.clear();
    }
}

/// Live traffic classification engine
pub struct TrafficEngine {
    config: EngineConfig,
    pipeline: Pipeline,
    aggregates: Aggregates,
    stats: EngineStats,
    names: Box<dyn NameTables>,
}

impl TrafficEngine {
    /// Create an engine using the built-in name tables
    pub fn new(config: EngineConfig) -> Self {
        Self::with_names(config, Box::new(StaticNames))
    }

    /// Create an engine resolving display names through `names`
    pub fn with_names(config: EngineConfig, names: Box<dyn NameTables>) -> Self {
        let pipeline = Pipeline::from_config(&config);
        info!(stages = ?pipeline.stage_names(), "Traffic engine created");
        Self {
            config,
            pipeline,
            aggregates: Aggregates::default(),
            stats: EngineStats::default(),
            names,
        }
    }

    /// Create an engine from a JSON configuration file
    pub fn from_config_file(path: impl AsRef<Path>) -> NetLensResult<Self> {
        let config = EngineConfig::load(path)?;
        Ok(Self::new(config))
    }

    /// Classify one frame.
    ///
    /// A malformed frame is counted as dropped and leaves every aggregate
    /// untouched.
    pub fn process(&self, frame: &Frame<'_>) -> Result<(), ParseError> {
        self.stats.record_frame(frame.wire_len as u64);
        metrics::counter!("netlens_frames_total").increment(1);

        let parsed = match ParsedFrame::parse(frame.data) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.stats.record_drop();
                metrics::counter!("netlens_frames_dropped_total").increment(1);
                trace!(error = %err, len = frame.data.len(), "Dropping malformed frame");
                return Err(err);
            }
        };

        let ctx = FrameContext {
            frame,
            parsed: &parsed,
        };
        self.pipeline.process(&ctx, &self.aggregates);
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    pub fn macs(&self) -> &MacTable {
        &self.aggregates.macs
    }

    pub fn ips(&self) -> &IpTable {
        &self.aggregates.ips
    }

    pub fn conversations(&self) -> &ConversationTable {
        &self.aggregates.conversations
    }

    pub fn ports(&self) -> &PortTable {
        &self.aggregates.ports
    }

    pub fn ether_types(&self) -> &EtherTypeTable {
        &self.aggregates.ether_types
    }

    pub fn ip_protocols(&self) -> &IpProtocolTable {
        &self.aggregates.ip_protocols
    }

    pub fn streams(&self) -> &StreamTable {
        &self.aggregates.streams
    }

    /// Drop every aggregate and zero the statistics
    pub fn reset(&self) {
        let before = self.stats();
        self.aggregates.clear();
        self.stats.reset();
        info!(
            frames = before.frames,
            dropped = before.dropped,
            "Traffic engine reset"
        );
    }

    /// Class and vendor annotation for a MAC, e.g. `"unicast, QEMU"`
    pub fn describe_mac(&self, mac: MacAddr) -> String {
        let class = mac.class();
        match (class, self.names.vendor(mac.oui())) {
            (MacClass::Unicast, Some(vendor)) => format!("{}, {}", class, vendor),
            (MacClass::Unicast, None) => format!("{}, {}", class, label(None)),
            _ => class.to_string(),
        }
    }

    pub fn ether_type_label(&self, ether_type: u16) -> &str {
        label(self.names.ether_type_name(ether_type))
    }

    pub fn ip_protocol_label(&self, protocol: u8) -> &str {
        label(self.names.ip_protocol_name(protocol))
    }
}

impl Default for TrafficEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
