//! Direction-agnostic flow keys
//!
//! A conversation is observed in both directions, so both keys store their
//! endpoints in canonical order (smaller endpoint first). `key(A, B)` and
//! `key(B, A)` are the same value, and the derived `Eq`/`Hash` agree by
//! construction.

use crate::IpAddress;
use serde::Serialize;
use std::fmt;

/// Unordered pair of IP addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IpPair {
    a: IpAddress,
    b: IpAddress,
}

impl IpPair {
    /// Create from the two observed addresses, in either order
    #[inline]
    pub fn new(src: IpAddress, dst: IpAddress) -> Self {
        if src <= dst {
            Self { a: src, b: dst }
        } else {
            Self { a: dst, b: src }
        }
    }

    /// Endpoints in canonical order
    #[inline(always)]
    pub fn endpoints(&self) -> (IpAddress, IpAddress) {
        (self.a, self.b)
    }

    /// True if `ip` is one of the two endpoints
    #[inline]
    pub fn contains(&self, ip: IpAddress) -> bool {
        self.a == ip || self.b == ip
    }

    /// The endpoint opposite `ip`, if `ip` is part of the pair
    #[inline]
    pub fn peer_of(&self, ip: IpAddress) -> Option<IpAddress> {
        if self.a == ip {
            Some(self.b)
        } else if self.b == ip {
            Some(self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for IpPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

/// Unordered pair of `(IP, port)` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FourTuple {
    a: (IpAddress, u16),
    b: (IpAddress, u16),
}

impl FourTuple {
    /// Create from the observed source and destination endpoints
    #[inline]
    pub fn new(src_ip: IpAddress, src_port: u16, dst_ip: IpAddress, dst_port: u16) -> Self {
        let src = (src_ip, src_port);
        let dst = (dst_ip, dst_port);
        if src <= dst {
            Self { a: src, b: dst }
        } else {
            Self { a: dst, b: src }
        }
    }

    /// Endpoints in canonical order
    #[inline(always)]
    pub fn endpoints(&self) -> ((IpAddress, u16), (IpAddress, u16)) {
        (self.a, self.b)
    }

    /// The address pair, without ports
    #[inline]
    pub fn ip_pair(&self) -> IpPair {
        IpPair::new(self.a.0, self.b.0)
    }

    /// True if `(ip, port)` is one of the two endpoints
    #[inline]
    pub fn contains(&self, ip: IpAddress, port: u16) -> bool {
        self.a == (ip, port) || self.b == (ip, port)
    }

    /// The endpoint opposite `(ip, port)`
    #[inline]
    pub fn peer_of(&self, ip: IpAddress, port: u16) -> Option<(IpAddress, u16)> {
        if self.a == (ip, port) {
            Some(self.b)
        } else if self.b == (ip, port) {
            Some(self.a)
        } else {
            None
        }
    }
}

fn fmt_endpoint(f: &mut fmt::Formatter<'_>, (ip, port): (IpAddress, u16)) -> fmt::Result {
    match ip {
        IpAddress::V4(_) => write!(f, "{}:{}", ip, port),
        IpAddress::V6(_) => write!(f, "[{}]:{}", ip, port),
    }
}

impl fmt::Display for FourTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_endpoint(f, self.a)?;
        f.write_str(" <-> ")?;
        fmt_endpoint(f, self.b)
    }
}
