//! Error types for NetLens

use thiserror::Error;

/// Address construction error
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrError {
    /// Raw byte span has the wrong length for the address family
    #[error("invalid {kind} address length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Address kind ("MAC", "IP")
        kind: &'static str,
        /// Accepted length(s)
        expected: &'static str,
        /// Length supplied
        actual: usize,
    },
}

/// Protocol layer a parse error was raised at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Ethernet II header (and VLAN tags)
    Link,
    /// IPv4 / IPv6 header
    Network,
    /// TCP / UDP header
    Transport,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Link => f.write_str("link"),
            Self::Network => f.write_str("network"),
            Self::Transport => f.write_str("transport"),
        }
    }
}

/// Malformed frame error
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Frame ends before the declared header does
    #[error("{layer} header truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Layer being parsed
        layer: Layer,
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// EtherType says IP but the version nibble disagrees
    #[error("unsupported IP version {0}")]
    UnsupportedIpVersion(u8),

    /// IPv4 IHL below the 20-byte minimum
    #[error("invalid IPv4 header length {0}")]
    InvalidHeaderLength(usize),
}

/// NetLens error type
#[derive(Error, Debug)]
pub enum NetLensError {
    /// Address construction failed
    #[error(transparent)]
    Addr(#[from] AddrError),

    /// Frame could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for NetLens
pub type NetLensResult<T> = Result<T, NetLensError>;
