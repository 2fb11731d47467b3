//! Hand-built frames for unit tests

use crate::frame::TcpFlags;

pub const LOCAL_MAC: [u8; 6] = [0x00, 0x1b, 0x44, 0x11, 0x3a, 0xb7];
pub const GATEWAY_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

pub fn ethernet(src: [u8; 6], dst: [u8; 6], ether_type: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&dst);
    buf.extend_from_slice(&src);
    buf.extend_from_slice(&ether_type.to_be_bytes());
    buf
}

/// 20-byte IPv4 header, no options; total length covers `payload_len`
pub fn push_ipv4(
    buf: &mut Vec<u8>,
    src: [u8; 4],
    dst: [u8; 4],
    protocol: u8,
    payload_len: usize,
) {
    let total = (20 + payload_len) as u16;
    buf.extend_from_slice(&[0x45, 0x00]);
    buf.extend_from_slice(&total.to_be_bytes());
    buf.extend_from_slice(&[0x12, 0x34, 0x40, 0x00, 64, protocol, 0x00, 0x00]);
    buf.extend_from_slice(&src);
    buf.extend_from_slice(&dst);
}

pub fn push_ipv6(
    buf: &mut Vec<u8>,
    src: [u8; 16],
    dst: [u8; 16],
    next_header: u8,
    payload_len: usize,
) {
    buf.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
    buf.extend_from_slice(&(payload_len as u16).to_be_bytes());
    buf.extend_from_slice(&[next_header, 64]);
    buf.extend_from_slice(&src);
    buf.extend_from_slice(&dst);
}

pub fn push_tcp(buf: &mut Vec<u8>, src_port: u16, dst_port: u16, flags: u8, seq: u32) {
    buf.extend_from_slice(&src_port.to_be_bytes());
    buf.extend_from_slice(&dst_port.to_be_bytes());
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&[0x50, flags, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00]);
}

pub fn push_udp(buf: &mut Vec<u8>, src_port: u16, dst_port: u16, payload_len: usize) {
    buf.extend_from_slice(&src_port.to_be_bytes());
    buf.extend_from_slice(&dst_port.to_be_bytes());
    buf.extend_from_slice(&((8 + payload_len) as u16).to_be_bytes());
    buf.extend_from_slice(&[0x00, 0x00]);
}

/// Ethernet + IPv4 + TCP with `payload_len` zero bytes
#[allow(clippy::too_many_arguments)]
pub fn tcp_v4(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    flags: u8,
    payload_len: usize,
) -> Vec<u8> {
    let mut buf = ethernet(src_mac, dst_mac, 0x0800);
    push_ipv4(&mut buf, src_ip, dst_ip, 6, 20 + payload_len);
    push_tcp(&mut buf, src_port, dst_port, flags, 1000);
    buf.resize(buf.len() + payload_len, 0);
    buf
}

/// Ethernet + IPv4 + UDP with `payload_len` zero bytes
pub fn udp_v4(
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload_len: usize,
) -> Vec<u8> {
    let mut buf = ethernet(LOCAL_MAC, GATEWAY_MAC, 0x0800);
    push_ipv4(&mut buf, src_ip, dst_ip, 17, 8 + payload_len);
    push_udp(&mut buf, src_port, dst_port, payload_len);
    buf.resize(buf.len() + payload_len, 0);
    buf
}

/// Outbound SYN from 192.168.1.10:51000 to 93.184.216.34:443
pub fn https_syn() -> Vec<u8> {
    tcp_v4(
        LOCAL_MAC,
        GATEWAY_MAC,
        [192, 168, 1, 10],
        [93, 184, 216, 34],
        51000,
        443,
        TcpFlags::SYN,
        0,
    )
}
