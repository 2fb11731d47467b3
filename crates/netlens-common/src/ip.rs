//! IPv4/IPv6 address as a tagged union
//!
//! Both families are stored as plain integers in network bit order, so
//! prefix predicates are mask-and-compare. The discriminant takes part in
//! equality, ordering and hashing: `V4(1)` and `V6(1)` are different keys.

use crate::AddrError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Compact IP address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpAddress {
    /// IPv4, first octet most significant
    V4(u32),
    /// IPv6, first octet most significant
    V6(u128),
}

/// True when `addr` falls inside `prefix/len` (IPv4)
#[inline(always)]
const fn in_v4(addr: u32, prefix: u32, len: u32) -> bool {
    let mask = if len == 0 { 0 } else { u32::MAX << (32 - len) };
    addr & mask == prefix
}

/// True when `addr` falls inside `prefix/len` (IPv6)
#[inline(always)]
const fn in_v6(addr: u128, prefix: u128, len: u32) -> bool {
    let mask = if len == 0 { 0 } else { u128::MAX << (128 - len) };
    addr & mask == prefix
}

impl IpAddress {
    /// Create from a raw byte span: 4 bytes for IPv4, 16 for IPv6
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddrError> {
        match bytes.len() {
            4 => Ok(Self::V4(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))),
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                Ok(Self::V6(u128::from_be_bytes(octets)))
            }
            actual => Err(AddrError::InvalidLength {
                kind: "IP",
                expected: "4 or 16",
                actual,
            }),
        }
    }

    /// IPv4 from octets
    #[inline(always)]
    pub const fn v4(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self::V4(u32::from_be_bytes([a, b, c, d]))
    }

    /// Network-order bytes (4 or 16 of them)
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::V4(v) => v.to_be_bytes().to_vec(),
            Self::V6(v) => v.to_be_bytes().to_vec(),
        }
    }

    /// True for IPv4
    #[inline(always)]
    pub const fn is_ipv4(&self) -> bool {
        matches!(self, Self::V4(_))
    }

    /// True for IPv6
    #[inline(always)]
    pub const fn is_ipv6(&self) -> bool {
        matches!(self, Self::V6(_))
    }

    /// 255.255.255.255 (IPv6 has no broadcast)
    #[inline]
    pub const fn is_broadcast(&self) -> bool {
        matches!(self, Self::V4(u32::MAX))
    }

    /// 224.0.0.0/4 or ff00::/8
    #[inline]
    pub const fn is_multicast(&self) -> bool {
        match *self {
            Self::V4(v) => v >> 28 == 0b1110,
            Self::V6(v) => v >> 120 == 0xff,
        }
    }

    /// 127.0.0.0/8 or ::1
    #[inline]
    pub const fn is_loopback(&self) -> bool {
        match *self {
            Self::V4(v) => v >> 24 == 127,
            Self::V6(v) => v == 1,
        }
    }

    /// 0.0.0.0 or ::
    #[inline]
    pub const fn is_unspecified(&self) -> bool {
        match *self {
            Self::V4(v) => v == 0,
            Self::V6(v) => v == 0,
        }
    }

    /// 169.254.0.0/16 (APIPA)
    #[inline]
    pub const fn is_apipa(&self) -> bool {
        match *self {
            Self::V4(v) => in_v4(v, 0xA9FE_0000, 16),
            Self::V6(_) => false,
        }
    }

    /// RFC 1918: 10/8, 172.16/12, 192.168/16
    #[inline]
    pub const fn is_private(&self) -> bool {
        match *self {
            Self::V4(v) => {
                in_v4(v, 0x0A00_0000, 8) || in_v4(v, 0xAC10_0000, 12) || in_v4(v, 0xC0A8_0000, 16)
            }
            Self::V6(_) => false,
        }
    }

    /// fe80::/10
    #[inline]
    pub const fn is_link_local(&self) -> bool {
        match *self {
            Self::V4(_) => false,
            Self::V6(v) => in_v6(v, 0xfe80u128 << 112, 10),
        }
    }

    /// fc00::/7
    #[inline]
    pub const fn is_unique_local(&self) -> bool {
        match *self {
            Self::V4(_) => false,
            Self::V6(v) => in_v6(v, 0xfc00u128 << 112, 7),
        }
    }

    /// fec0::/10 (deprecated by RFC 3879)
    #[inline]
    pub const fn is_site_local(&self) -> bool {
        match *self {
            Self::V4(_) => false,
            Self::V6(v) => in_v6(v, 0xfec0u128 << 112, 10),
        }
    }

    /// 2001::/32
    #[inline]
    pub const fn is_teredo(&self) -> bool {
        match *self {
            Self::V4(_) => false,
            Self::V6(v) => in_v6(v, 0x2001u128 << 112, 32),
        }
    }

    /// ::ffff:0:0/96
    #[inline]
    pub const fn is_ipv4_mapped(&self) -> bool {
        match *self {
            Self::V4(_) => false,
            Self::V6(v) => in_v6(v, 0xffffu128 << 32, 96),
        }
    }

    /// Embedded IPv4 address of an IPv4-mapped IPv6 address
    pub const fn to_ipv4_mapped(&self) -> Option<Self> {
        match *self {
            Self::V6(v) if self.is_ipv4_mapped() => Some(Self::V4(v as u32)),
            _ => None,
        }
    }
}

/// Writes the RFC 5952 form of an IPv6 address without allocating.
fn fmt_v6(value: u128, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut groups = [0u16; 8];
    for (i, group) in groups.iter_mut().enumerate() {
        *group = (value >> (112 - 16 * i)) as u16;
    }

    // longest zero run, leftmost on ties, single zero groups are not compressed
    let (mut best_start, mut best_len) = (0usize, 0usize);
    let mut i = 0;
    while i < 8 {
        if groups[i] == 0 {
            let start = i;
            while i < 8 && groups[i] == 0 {
                i += 1;
            }
            if i - start > best_len {
                best_start = start;
                best_len = i - start;
            }
        } else {
            i += 1;
        }
    }

    if best_len < 2 {
        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:x}", group)?;
        }
        return Ok(());
    }

    for (i, group) in groups[..best_start].iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{:x}", group)?;
    }
    f.write_str("::")?;
    for (i, group) in groups[best_start + best_len..].iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{:x}", group)?;
    }
    Ok(())
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::V4(v) => {
                let o = v.to_be_bytes();
                write!(f, "{}.{}.{}.{}", o[0], o[1], o[2], o[3])
            }
            Self::V6(v) => fmt_v6(v, f),
        }
    }
}

impl Serialize for IpAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self::V4(u32::from(addr))
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(addr: Ipv6Addr) -> Self {
        Self::V6(u128::from(addr))
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl From<IpAddress> for IpAddr {
    fn from(addr: IpAddress) -> Self {
        match addr {
            IpAddress::V4(v) => IpAddr::V4(Ipv4Addr::from(v)),
            IpAddress::V6(v) => IpAddr::V6(Ipv6Addr::from(v)),
        }
    }
}

impl TryFrom<&[u8]> for IpAddress {
    type Error = AddrError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}
