//! Classification Pipeline
//!
//! Parse → L2 → L3 → L4 → TCP streams
//!
//! Each stage reads the already-validated headers and upserts into the
//! shared aggregates. Stages are enabled per layer by `EngineConfig`.

use crate::config::EngineConfig;
use crate::core::Aggregates;
use crate::frame::{Frame, ParsedFrame, TransportHeader};
use crate::stats::{ProtocolCounters, TrafficCounters};
use crate::stream::{TcpSegment, TcpStream};
use netlens_common::{Direction, FourTuple, IpPair};
use tracing::debug;

/// Stage result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageResult {
    /// Continue to next stage
    Continue,
    /// Nothing further to classify (e.g. non-IP frame)
    Done,
}

/// Per-frame context handed to every stage
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub frame: &'a Frame<'a>,
    pub parsed: &'a ParsedFrame,
}

impl FrameContext<'_> {
    #[inline(always)]
    fn bytes(&self) -> u64 {
        self.frame.wire_len as u64
    }

    #[inline(always)]
    fn direction(&self) -> Direction {
        self.frame.direction
    }
}

/// Pipeline stage trait
pub trait Stage: Send + Sync {
    fn process(&self, ctx: &FrameContext<'_>, aggregates: &Aggregates) -> StageResult;
    fn name(&self) -> &'static str;
}

/// Ordered list of enabled stages
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Pipeline with the stages `config` enables
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut p = Self::new();
        if config.layer2 {
            p.add_stage(Box::new(LinkStage));
        }
        // Later stages need a network header even when L3 accounting is off
        p.add_stage(Box::new(NetworkStage {
            enabled: config.layer3,
        }));
        if config.layer4 {
            p.add_stage(Box::new(TransportStage {
                well_known_port_limit: config.well_known_port_limit,
            }));
        }
        if config.streams {
            p.add_stage(Box::new(StreamStage {
                max_segments: config.max_segments_per_stream,
            }));
        }
        p
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    #[inline]
    pub fn process(&self, ctx: &FrameContext<'_>, aggregates: &Aggregates) {
        for stage in &self.stages {
            if stage.process(ctx, aggregates) == StageResult::Done {
                return;
            }
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Choose the port a conversation is filed under.
///
/// A port below `limit` identifies the service when only one side has one;
/// otherwise the remote side's port is used.
#[inline]
pub fn peer_facing_port(direction: Direction, src_port: u16, dst_port: u16, limit: u16) -> u16 {
    match (src_port < limit, dst_port < limit) {
        (true, false) => src_port,
        (false, true) => dst_port,
        _ => direction.peer(src_port, dst_port),
    }
}

// ============================================================================
// Stage 1: Link (per-MAC counters, EtherType distribution)
// ============================================================================

pub struct LinkStage;

impl Stage for LinkStage {
    fn process(&self, ctx: &FrameContext<'_>, aggregates: &Aggregates) -> StageResult {
        let link = &ctx.parsed.link;
        let (direction, bytes, now) = (ctx.direction(), ctx.bytes(), ctx.frame.timestamp);

        let peer = direction.peer(link.src, link.dst);
        aggregates.macs.upsert(
            peer,
            || TrafficCounters::with_first(direction, bytes, now),
            |c| c.record(direction, bytes, now),
        );

        aggregates.ether_types.upsert(
            link.ether_type,
            || ProtocolCounters::with_first(bytes),
            |c| c.record(bytes),
        );

        StageResult::Continue
    }

    fn name(&self) -> &'static str {
        "link"
    }
}

// ============================================================================
// Stage 2: Network (per-IP and per-conversation counters, IP protocols)
// ============================================================================

pub struct NetworkStage {
    enabled: bool,
}

impl Stage for NetworkStage {
    fn process(&self, ctx: &FrameContext<'_>, aggregates: &Aggregates) -> StageResult {
        let Some(net) = ctx.parsed.network else {
            return StageResult::Done;
        };
        if !self.enabled {
            return StageResult::Continue;
        }

        let (direction, bytes, now) = (ctx.direction(), ctx.bytes(), ctx.frame.timestamp);

        let peer = direction.peer(net.src, net.dst);
        aggregates.ips.upsert(
            peer,
            || TrafficCounters::with_first(direction, bytes, now),
            |c| c.record(direction, bytes, now),
        );

        aggregates.conversations.upsert(
            IpPair::new(net.src, net.dst),
            || TrafficCounters::with_first(direction, bytes, now),
            |c| c.record(direction, bytes, now),
        );

        aggregates.ip_protocols.upsert(
            net.protocol,
            || ProtocolCounters::with_first(bytes),
            |c| c.record(bytes),
        );

        StageResult::Continue
    }

    fn name(&self) -> &'static str {
        "network"
    }
}

// ============================================================================
// Stage 3: Transport (per-port counters)
// ============================================================================

pub struct TransportStage {
    well_known_port_limit: u16,
}

impl Stage for TransportStage {
    fn process(&self, ctx: &FrameContext<'_>, aggregates: &Aggregates) -> StageResult {
        let Some(transport) = ctx.parsed.transport else {
            return StageResult::Done;
        };

        let (direction, bytes, now) = (ctx.direction(), ctx.bytes(), ctx.frame.timestamp);
        let (src_port, dst_port) = transport.ports();
        let port = peer_facing_port(direction, src_port, dst_port, self.well_known_port_limit);

        aggregates.ports.upsert(
            port,
            || TrafficCounters::with_first(direction, bytes, now),
            |c| c.record(direction, bytes, now),
        );

        StageResult::Continue
    }

    fn name(&self) -> &'static str {
        "transport"
    }
}

// ============================================================================
// Stage 4: TCP streams (handshake RTT, segment log)
// ============================================================================

pub struct StreamStage {
    max_segments: usize,
}

impl Stage for StreamStage {
    fn process(&self, ctx: &FrameContext<'_>, aggregates: &Aggregates) -> StageResult {
        let (Some(net), Some(TransportHeader::Tcp(tcp))) =
            (ctx.parsed.network, ctx.parsed.transport)
        else {
            return StageResult::Done;
        };

        let key = FourTuple::new(net.src, tcp.src_port, net.dst, tcp.dst_port);
        let segment = TcpSegment {
            flags: tcp.flags.bits(),
            seq: tcp.seq,
            ack: tcp.ack,
            timestamp: ctx.frame.timestamp,
            len: ctx.frame.wire_len,
        };

        let max_segments = self.max_segments;
        let stream = aggregates.streams.upsert(
            key,
            || {
                debug!(flow = %key, "new TCP stream");
                TcpStream::new(max_segments)
            },
            |_| {},
        );
        if let Some(rtt_us) = stream.observe(segment) {
            debug!(flow = %key, rtt_us, "handshake");
        }

        StageResult::Continue
    }

    fn name(&self) -> &'static str {
        "streams"
    }
}
