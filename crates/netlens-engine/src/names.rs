//! Protocol and vendor name lookup
//!
//! The engine only ever stores raw identifiers; names are resolved at display
//! time through a [`NameTables`] implementation.

/// Placeholder rendered when a table has no entry
pub const UNKNOWN_LABEL: &str = "-";

/// Lookup tables consumed by the display helpers
pub trait NameTables: Send + Sync {
    /// Name of an EtherType (`0x0800` -> "IPv4")
    fn ether_type_name(&self, ether_type: u16) -> Option<&str>;

    /// Name of an IP protocol number (`6` -> "TCP")
    fn ip_protocol_name(&self, protocol: u8) -> Option<&str>;

    /// Vendor registered for an OUI
    fn vendor(&self, oui: [u8; 3]) -> Option<&str>;
}

/// Render a lookup result, falling back to [`UNKNOWN_LABEL`]
#[inline]
pub fn label(name: Option<&str>) -> &str {
    name.unwrap_or(UNKNOWN_LABEL)
}

static ETHER_TYPES: &[(u16, &str)] = &[
    (0x0800, "IPv4"),
    (0x0806, "ARP"),
    (0x0842, "Wake-on-LAN"),
    (0x22F0, "AVTP"),
    (0x22F3, "TRILL"),
    (0x6003, "DECnet"),
    (0x8035, "RARP"),
    (0x809B, "AppleTalk"),
    (0x80F3, "AARP"),
    (0x8100, "802.1Q"),
    (0x8137, "IPX"),
    (0x8204, "QNX Qnet"),
    (0x86DD, "IPv6"),
    (0x8808, "Ethernet flow control"),
    (0x8809, "Slow protocols"),
    (0x8847, "MPLS unicast"),
    (0x8848, "MPLS multicast"),
    (0x8863, "PPPoE discovery"),
    (0x8864, "PPPoE session"),
    (0x887B, "HomePlug"),
    (0x888E, "EAPOL"),
    (0x8892, "PROFINET"),
    (0x889A, "HyperSCSI"),
    (0x88A2, "ATA over Ethernet"),
    (0x88A4, "EtherCAT"),
    (0x88A8, "802.1ad"),
    (0x88AB, "Ethernet Powerlink"),
    (0x88B8, "GOOSE"),
    (0x88CC, "LLDP"),
    (0x88CD, "SERCOS III"),
    (0x88E5, "MACsec"),
    (0x88E7, "PBB"),
    (0x88F7, "PTP"),
    (0x88FB, "PRP"),
    (0x8902, "CFM"),
    (0x8906, "FCoE"),
    (0x8914, "FCoE init"),
    (0x8915, "RoCE"),
    (0x891D, "TTEthernet"),
    (0x892F, "HSR"),
    (0x893A, "IEEE 1905.1"),
    (0x9000, "Loopback"),
];

static IP_PROTOCOLS: &[(u8, &str)] = &[
    (0, "HOPOPT"),
    (1, "ICMP"),
    (2, "IGMP"),
    (4, "IP-in-IP"),
    (6, "TCP"),
    (8, "EGP"),
    (9, "IGP"),
    (17, "UDP"),
    (27, "RDP"),
    (33, "DCCP"),
    (41, "IPv6"),
    (43, "IPv6-Route"),
    (44, "IPv6-Frag"),
    (46, "RSVP"),
    (47, "GRE"),
    (50, "ESP"),
    (51, "AH"),
    (58, "ICMPv6"),
    (59, "IPv6-NoNxt"),
    (60, "IPv6-Opts"),
    (88, "EIGRP"),
    (89, "OSPF"),
    (94, "IPIP"),
    (97, "ETHERIP"),
    (103, "PIM"),
    (112, "VRRP"),
    (115, "L2TP"),
    (132, "SCTP"),
    (136, "UDPLite"),
    (137, "MPLS-in-IP"),
];

/// Small built-in vendor table, ascending by OUI
static VENDORS: &[([u8; 3], &str)] = &[
    ([0x00, 0x00, 0x0C], "Cisco"),
    ([0x00, 0x03, 0x93], "Apple"),
    ([0x00, 0x05, 0x02], "Apple"),
    ([0x00, 0x0C, 0x29], "VMware"),
    ([0x00, 0x1B, 0x21], "Intel"),
    ([0x00, 0x50, 0x56], "VMware"),
    ([0x08, 0x00, 0x27], "PCS Systemtechnik"),
    ([0x3C, 0x5A, 0xB4], "Google"),
    ([0x52, 0x54, 0x00], "QEMU"),
    ([0xB8, 0x27, 0xEB], "Raspberry Pi Foundation"),
    ([0xDC, 0xA6, 0x32], "Raspberry Pi Trading"),
    ([0xF4, 0xF5, 0xD8], "Google"),
];

/// Built-in tables compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticNames;

impl NameTables for StaticNames {
    fn ether_type_name(&self, ether_type: u16) -> Option<&str> {
        ETHER_TYPES
            .binary_search_by_key(&ether_type, |(value, _)| *value)
            .ok()
            .map(|i| ETHER_TYPES[i].1)
    }

    fn ip_protocol_name(&self, protocol: u8) -> Option<&str> {
        IP_PROTOCOLS
            .binary_search_by_key(&protocol, |(value, _)| *value)
            .ok()
            .map(|i| IP_PROTOCOLS[i].1)
    }

    fn vendor(&self, oui: [u8; 3]) -> Option<&str> {
        VENDORS
            .binary_search_by_key(&oui, |(prefix, _)| *prefix)
            .ok()
            .map(|i| VENDORS[i].1)
    }
}

/// Vendor table loaded at runtime from `manuf`-style text
///
/// Each non-comment line starts with an OUI (`00:00:0C`, `00-00-0C` or
/// `00000C`) followed by whitespace and the vendor name. Unparseable lines
/// are skipped. Protocol names fall back to [`StaticNames`].
#[derive(Debug, Default, Clone)]
pub struct OuiTable {
    entries: Vec<([u8; 3], String)>,
}

impl OuiTable {
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<([u8; 3], String)> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let mut fields = line.splitn(2, char::is_whitespace);
                let oui = parse_oui(fields.next()?)?;
                let name = fields.next()?.trim();
                if name.is_empty() {
                    return None;
                }
                Some((oui, name.to_string()))
            })
            .collect();

        // Binary search needs ascending order; first entry wins on duplicates
        entries.sort_by_key(|(oui, _)| *oui);
        entries.dedup_by_key(|(oui, _)| *oui);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NameTables for OuiTable {
    fn ether_type_name(&self, ether_type: u16) -> Option<&str> {
        StaticNames.ether_type_name(ether_type)
    }

    fn ip_protocol_name(&self, protocol: u8) -> Option<&str> {
        StaticNames.ip_protocol_name(protocol)
    }

    fn vendor(&self, oui: [u8; 3]) -> Option<&str> {
        self.entries
            .binary_search_by_key(&oui, |(prefix, _)| *prefix)
            .ok()
            .map(|i| self.entries[i].1.as_str())
    }
}

fn parse_oui(field: &str) -> Option<[u8; 3]> {
    let hex: String = field.chars().filter(|c| *c != ':' && *c != '-').collect();
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(&hex, 16).ok()?;
    let [_, a, b, c] = value.to_be_bytes();
    Some([a, b, c])
}
