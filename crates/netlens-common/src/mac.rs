//! Hardware (MAC) address packed into a single integer
//!
//! The six octets live in the low 48 bits of a `u64` (first octet most
//! significant), so equality, hashing and prefix tests are plain integer ops.

use crate::AddrError;
use serde::{Serialize, Serializer};
use std::fmt;

const MAC_MASK: u64 = 0xFFFF_FFFF_FFFF;
/// I/G bit of the first octet
const GROUP_BIT: u64 = 0x01 << 40;
/// U/L bit of the first octet
const LOCAL_BIT: u64 = 0x02 << 40;

/// IEEE 802.1 reserved group addresses (STP, LLDP, pause frames)
const IEEE_RESERVED_PREFIX: u64 = 0x0180_C2;
/// IPv4 multicast mapping, RFC 1112 (top bit of the 4th octet clear)
const IPV4_MULTICAST_PREFIX: u64 = 0x0100_5E00_0000;
const IPV4_MULTICAST_MASK: u64 = 0xFFFF_FF80_0000;
/// IPv6 multicast mapping, RFC 2464
const IPV6_MULTICAST_PREFIX: u64 = 0x3333;
/// Cisco CDP/VTP/PVST group addresses
const CISCO_MULTICAST_PREFIX: u64 = 0x0100_0C;

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MacAddr(u64);

/// Coarse classification of a MAC address for display annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MacClass {
    /// ff:ff:ff:ff:ff:ff
    Broadcast,
    /// 01:80:c2 IEEE 802.1 reserved range
    IeeeReserved,
    /// 01:00:5e mapped IPv4 multicast
    Ipv4Multicast,
    /// 33:33 mapped IPv6 multicast
    Ipv6Multicast,
    /// 01:00:0c Cisco protocol multicast
    CiscoMulticast,
    /// Any other group address
    Multicast,
    /// Individual address
    Unicast,
}

impl MacAddr {
    /// All-ones broadcast address
    pub const BROADCAST: Self = Self(MAC_MASK);

    /// Create from six octets
    #[inline(always)]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(
            (octets[0] as u64) << 40
                | (octets[1] as u64) << 32
                | (octets[2] as u64) << 24
                | (octets[3] as u64) << 16
                | (octets[4] as u64) << 8
                | octets[5] as u64,
        )
    }

    /// Create from a raw byte span, which must be exactly 6 bytes long
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddrError> {
        let octets: [u8; 6] = bytes.try_into().map_err(|_| AddrError::InvalidLength {
            kind: "MAC",
            expected: "6",
            actual: bytes.len(),
        })?;
        Ok(Self::new(octets))
    }

    /// Packed 48-bit value
    #[inline(always)]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The six octets, first octet first
    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }

    /// Organizationally unique identifier (first three octets)
    #[inline]
    pub const fn oui(&self) -> [u8; 3] {
        let o = self.octets();
        [o[0], o[1], o[2]]
    }

    /// True iff all 48 bits are set
    #[inline(always)]
    pub const fn is_broadcast(&self) -> bool {
        self.0 == MAC_MASK
    }

    /// True iff bit 0 of the first octet is set (broadcast included)
    #[inline(always)]
    pub const fn is_multicast(&self) -> bool {
        self.0 & GROUP_BIT != 0
    }

    /// True for individual addresses
    #[inline(always)]
    pub const fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }

    /// True iff bit 1 of the first octet is set
    #[inline(always)]
    pub const fn is_locally_administered(&self) -> bool {
        self.0 & LOCAL_BIT != 0
    }

    /// 01:80:c2:xx:xx:xx
    #[inline(always)]
    pub const fn is_ieee_reserved_multicast(&self) -> bool {
        self.0 >> 24 == IEEE_RESERVED_PREFIX
    }

    /// 01:00:5e:00:00:00 - 01:00:5e:7f:ff:ff
    #[inline(always)]
    pub const fn is_ipv4_multicast(&self) -> bool {
        self.0 & IPV4_MULTICAST_MASK == IPV4_MULTICAST_PREFIX
    }

    /// 33:33:xx:xx:xx:xx
    #[inline(always)]
    pub const fn is_ipv6_multicast(&self) -> bool {
        self.0 >> 32 == IPV6_MULTICAST_PREFIX
    }

    /// 01:00:0c:xx:xx:xx
    #[inline(always)]
    pub const fn is_cisco_multicast(&self) -> bool {
        self.0 >> 24 == CISCO_MULTICAST_PREFIX
    }

    /// Most specific classification that applies
    pub const fn class(&self) -> MacClass {
        if self.is_broadcast() {
            MacClass::Broadcast
        } else if self.is_ieee_reserved_multicast() {
            MacClass::IeeeReserved
        } else if self.is_ipv4_multicast() {
            MacClass::Ipv4Multicast
        } else if self.is_ipv6_multicast() {
            MacClass::Ipv6Multicast
        } else if self.is_cisco_multicast() {
            MacClass::CiscoMulticast
        } else if self.is_multicast() {
            MacClass::Multicast
        } else {
            MacClass::Unicast
        }
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self::new(octets)
    }
}

impl TryFrom<&[u8]> for MacAddr {
    type Error = AddrError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.octets();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for MacClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Broadcast => "broadcast",
            Self::IeeeReserved => "ieee-802.1",
            Self::Ipv4Multicast => "ipv4-multicast",
            Self::Ipv6Multicast => "ipv6-multicast",
            Self::CiscoMulticast => "cisco-multicast",
            Self::Multicast => "multicast",
            Self::Unicast => "unicast",
        };
        f.write_str(label)
    }
}
