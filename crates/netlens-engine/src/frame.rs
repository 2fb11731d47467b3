//! Captured frames and header parsing
//!
//! `ParsedFrame::parse` walks Ethernet, IPv4/IPv6 and TCP/UDP headers from
//! fixed offsets and validates every declared layer up front. The pipeline
//! only touches aggregates once parsing has succeeded, so a malformed frame
//! never leaves partial updates behind.

use netlens_common::{Direction, IpAddress, Layer, MacAddr, ParseError, Timestamp};

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const VLAN_TAG_LEN: usize = 4;
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;
pub const TCP_MIN_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_QINQ: u16 = 0x88A8;

pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

/// One captured link-layer frame as delivered by the packet source
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Captured bytes, starting at the Ethernet header
    pub data: &'a [u8],
    /// Length on the wire (may exceed `data.len()` when the capture snaps)
    pub wire_len: u32,
    pub timestamp: Timestamp,
    pub direction: Direction,
}

impl<'a> Frame<'a> {
    /// Frame whose wire length equals the captured length
    pub fn new(data: &'a [u8], timestamp: Timestamp, direction: Direction) -> Self {
        Self {
            data,
            wire_len: data.len() as u32,
            timestamp,
            direction,
        }
    }

    /// Override the wire length
    pub fn with_wire_len(mut self, wire_len: u32) -> Self {
        self.wire_len = wire_len;
        self
    }
}

/// TCP control bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const FIN: u8 = 1 << 0;
    pub const SYN: u8 = 1 << 1;
    pub const RST: u8 = 1 << 2;
    pub const PSH: u8 = 1 << 3;
    pub const ACK: u8 = 1 << 4;
    pub const URG: u8 = 1 << 5;
    pub const ECE: u8 = 1 << 6;
    pub const CWR: u8 = 1 << 7;

    #[inline(always)]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Check if every bit of `flag` is set
    #[inline(always)]
    pub const fn has(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    #[inline(always)]
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

/// Ethernet header with VLAN tags stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHeader {
    pub src: MacAddr,
    pub dst: MacAddr,
    /// Innermost EtherType
    pub ether_type: u16,
    /// Outermost VLAN ID, if tagged
    pub vlan: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkHeader {
    pub src: IpAddress,
    pub dst: IpAddress,
    /// IPv4 protocol or final IPv6 next header
    pub protocol: u8,
    /// TTL or hop limit
    pub ttl: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    /// Payload bytes following the header
    pub payload_len: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHeader {
    Tcp(TcpHeader),
    Udp { src_port: u16, dst_port: u16 },
}

impl TransportHeader {
    #[inline]
    pub fn ports(&self) -> (u16, u16) {
        match self {
            Self::Tcp(tcp) => (tcp.src_port, tcp.dst_port),
            Self::Udp { src_port, dst_port } => (*src_port, *dst_port),
        }
    }
}

/// Validated header view of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame {
    pub link: LinkHeader,
    /// Present for IPv4/IPv6 EtherTypes
    pub network: Option<NetworkHeader>,
    /// Present for TCP/UDP in the first (or only) fragment
    pub transport: Option<TransportHeader>,
}

#[inline(always)]
fn require(layer: Layer, data: &[u8], needed: usize) -> Result<(), ParseError> {
    if data.len() < needed {
        return Err(ParseError::Truncated {
            layer,
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

#[inline(always)]
fn be16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

#[inline(always)]
fn be32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl ParsedFrame {
    /// Parse and validate an Ethernet frame
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        require(Layer::Link, data, ETHERNET_HEADER_LEN)?;

        let dst = MacAddr::new([data[0], data[1], data[2], data[3], data[4], data[5]]);
        let src = MacAddr::new([data[6], data[7], data[8], data[9], data[10], data[11]]);
        let mut ether_type = be16(data, 12);
        let mut offset = ETHERNET_HEADER_LEN;
        let mut vlan = None;

        while ether_type == ETHERTYPE_VLAN || ether_type == ETHERTYPE_QINQ {
            require(Layer::Link, data, offset + VLAN_TAG_LEN)?;
            vlan.get_or_insert(be16(data, offset) & 0x0FFF);
            ether_type = be16(data, offset + 2);
            offset += VLAN_TAG_LEN;
        }

        let link = LinkHeader {
            src,
            dst,
            ether_type,
            vlan,
        };
        let payload = &data[offset..];

        let (network, l4) = match ether_type {
            ETHERTYPE_IPV4 => {
                let (header, l4) = parse_ipv4(payload)?;
                (Some(header), l4)
            }
            ETHERTYPE_IPV6 => {
                let (header, l4) = parse_ipv6(payload)?;
                (Some(header), l4)
            }
            _ => (None, None),
        };

        let transport = match (network, l4) {
            (Some(net), Some(segment)) => parse_transport(net.protocol, segment)?,
            _ => None,
        };

        Ok(Self {
            link,
            network,
            transport,
        })
    }

    #[inline]
    pub fn tcp(&self) -> Option<&TcpHeader> {
        match &self.transport {
            Some(TransportHeader::Tcp(tcp)) => Some(tcp),
            _ => None,
        }
    }
}

/// Returns the header and, unless this is a non-first fragment, the L4 bytes
fn parse_ipv4(data: &[u8]) -> Result<(NetworkHeader, Option<&[u8]>), ParseError> {
    require(Layer::Network, data, IPV4_MIN_HEADER_LEN)?;

    let version = data[0] >> 4;
    if version != 4 {
        return Err(ParseError::UnsupportedIpVersion(version));
    }
    let ihl = ((data[0] & 0x0F) as usize) * 4;
    if ihl < IPV4_MIN_HEADER_LEN {
        return Err(ParseError::InvalidHeaderLength(ihl));
    }
    require(Layer::Network, data, ihl)?;

    let header = NetworkHeader {
        src: IpAddress::V4(be32(data, 12)),
        dst: IpAddress::V4(be32(data, 16)),
        protocol: data[9],
        ttl: data[8],
    };

    // Ethernet pads short frames; trust the IP total length when it fits
    let total_len = be16(data, 2) as usize;
    let end = if (ihl..=data.len()).contains(&total_len) {
        total_len
    } else {
        data.len()
    };

    let fragment_offset = be16(data, 6) & 0x1FFF;
    let l4 = (fragment_offset == 0).then(|| &data[ihl..end]);
    Ok((header, l4))
}

fn parse_ipv6(data: &[u8]) -> Result<(NetworkHeader, Option<&[u8]>), ParseError> {
    require(Layer::Network, data, IPV6_HEADER_LEN)?;

    let version = data[0] >> 4;
    if version != 6 {
        return Err(ParseError::UnsupportedIpVersion(version));
    }

    let src = u128::from_be_bytes(data[8..24].try_into().unwrap_or([0; 16]));
    let dst = u128::from_be_bytes(data[24..40].try_into().unwrap_or([0; 16]));
    let ttl = data[7];

    let mut next_header = data[6];
    let mut offset = IPV6_HEADER_LEN;
    let mut first_fragment = true;

    loop {
        match next_header {
            // Hop-by-hop, routing, destination options
            0 | 43 | 60 => {
                require(Layer::Network, data, offset + 8)?;
                let len = (data[offset + 1] as usize + 1) * 8;
                require(Layer::Network, data, offset + len)?;
                next_header = data[offset];
                offset += len;
            }
            // Fragment
            44 => {
                require(Layer::Network, data, offset + 8)?;
                first_fragment = be16(data, offset + 2) >> 3 == 0;
                next_header = data[offset];
                offset += 8;
            }
            _ => break,
        }
    }

    // Zero payload length: jumbogram or segmentation-offload capture
    let payload_len = be16(data, 4) as usize;
    let declared_end = IPV6_HEADER_LEN + payload_len;
    let end = if payload_len == 0 || declared_end < offset {
        data.len()
    } else {
        declared_end.min(data.len())
    };

    let header = NetworkHeader {
        src: IpAddress::V6(src),
        dst: IpAddress::V6(dst),
        protocol: next_header,
        ttl,
    };
    let l4 = first_fragment.then(|| &data[offset..end]);
    Ok((header, l4))
}

fn parse_transport(protocol: u8, data: &[u8]) -> Result<Option<TransportHeader>, ParseError> {
    match protocol {
        IPPROTO_TCP => {
            require(Layer::Transport, data, TCP_MIN_HEADER_LEN)?;
            let data_offset = ((data[12] >> 4) as usize) * 4;
            if data_offset < TCP_MIN_HEADER_LEN {
                return Err(ParseError::InvalidHeaderLength(data_offset));
            }
            require(Layer::Transport, data, data_offset)?;

            Ok(Some(TransportHeader::Tcp(TcpHeader {
                src_port: be16(data, 0),
                dst_port: be16(data, 2),
                seq: be32(data, 4),
                ack: be32(data, 8),
                flags: TcpFlags::new(data[13]),
                payload_len: (data.len() - data_offset) as u32,
            })))
        }
        IPPROTO_UDP => {
            require(Layer::Transport, data, UDP_HEADER_LEN)?;
            Ok(Some(TransportHeader::Udp {
                src_port: be16(data, 0),
                dst_port: be16(data, 2),
            }))
        }
        _ => Ok(None),
    }
}
