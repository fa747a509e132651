//! Fixed-layout decoding of the first bytes received from a probed peer.
//!
//! The bytes are application data, not a captured TCP header; decoding them
//! with the TCP header layout yields a stable per-endpoint signature.

use serde::Serialize;
use thiserror::Error;

/// Size of the fixed part of the header.
pub const HEADER_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("segment too short: {len} bytes, need at least {HEADER_LEN}")]
    TooShort { len: usize },
}

/// Flag bit masks of byte 13.
pub struct TcpFlags;

impl TcpFlags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence_number: u32,
    pub ack_number: u32,
    /// Header length in bytes (top nibble of byte 12, times 4)
    pub data_offset: usize,
    pub flags: u8,
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
}

impl SegmentHeader {
    pub fn has_flag(&self, mask: u8) -> bool {
        self.flags & mask != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SackBlock {
    pub left_edge: u32,
    pub right_edge: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "data")]
pub enum OptionValue {
    End,
    Nop,
    Mss(u16),
    WindowScale(u8),
    SackPermitted,
    Sack(Vec<SackBlock>),
    Timestamps { value: u32, echo: u32 },
    Unknown(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TcpOption {
    pub kind: u8,
    /// Bytes consumed from the option area
    pub length: usize,
    pub value: OptionValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub header: SegmentHeader,
    pub options: Vec<TcpOption>,
    /// The option area ran past the received bytes or held a malformed option
    pub options_truncated: bool,
}

pub mod kind {
    pub const END: u8 = 0;
    pub const NOP: u8 = 1;
    pub const MSS: u8 = 2;
    pub const WINDOW_SCALE: u8 = 3;
    pub const SACK_PERMITTED: u8 = 4;
    pub const SACK: u8 = 5;
    pub const TIMESTAMPS: u8 = 8;
}

/// Decodes `buf` as a 20-byte header followed by options.
///
/// Option problems never fail the decode; they stop the walk and set
/// [`Segment::options_truncated`].
pub fn decode(buf: &[u8]) -> Result<Segment, DecodeError> {
    let header = decode_header(buf)?;

    let (options, options_truncated) = if header.data_offset > HEADER_LEN {
        let end = header.data_offset.min(buf.len());
        let clamped = end < header.data_offset;
        let (options, malformed) = walk_options(buf.get(HEADER_LEN..end).unwrap_or_default());
        (options, clamped || malformed)
    } else {
        (Vec::new(), false)
    };

    Ok(Segment { header, options, options_truncated })
}

pub fn decode_header(buf: &[u8]) -> Result<SegmentHeader, DecodeError> {
    let Some(fixed) = buf.get(..HEADER_LEN) else {
        return Err(DecodeError::TooShort { len: buf.len() });
    };

    let u16_at = |i: usize| u16::from_be_bytes([fixed[i], fixed[i + 1]]);
    let u32_at =
        |i: usize| u32::from_be_bytes([fixed[i], fixed[i + 1], fixed[i + 2], fixed[i + 3]]);

    let flags = fixed[13];
    let set = |mask: u8| flags & mask != 0;

    Ok(SegmentHeader {
        source_port: u16_at(0),
        destination_port: u16_at(2),
        sequence_number: u32_at(4),
        ack_number: u32_at(8),
        data_offset: usize::from(fixed[12] >> 4) * 4,
        flags,
        fin: set(TcpFlags::FIN),
        syn: set(TcpFlags::SYN),
        rst: set(TcpFlags::RST),
        psh: set(TcpFlags::PSH),
        ack: set(TcpFlags::ACK),
        urg: set(TcpFlags::URG),
        ece: set(TcpFlags::ECE),
        cwr: set(TcpFlags::CWR),
        window_size: u16_at(14),
        checksum: u16_at(16),
        urgent_pointer: u16_at(18),
    })
}

/// Walks the option area. The flag is set when the walk stopped early.
fn walk_options(area: &[u8]) -> (Vec<TcpOption>, bool) {
    let mut options = Vec::new();
    let mut pos = 0;

    while let Some(&kind) = area.get(pos) {
        let Some((value, length)) = decode_option(kind, &area[pos..]) else {
            return (options, true);
        };
        options.push(TcpOption { kind, length, value });
        pos += length;
    }

    (options, false)
}

/// Decodes the option starting at `bytes[0]`, returning it with the number of
/// bytes it occupies, or `None` when it does not fit.
fn decode_option(kind: u8, bytes: &[u8]) -> Option<(OptionValue, usize)> {
    match kind {
        kind::END => Some((OptionValue::End, 1)),
        kind::NOP => Some((OptionValue::Nop, 1)),
        kind::MSS => {
            let b = bytes.get(..4)?;
            Some((OptionValue::Mss(u16::from_be_bytes([b[2], b[3]])), 4))
        }
        kind::WINDOW_SCALE => {
            let b = bytes.get(..3)?;
            Some((OptionValue::WindowScale(b[2]), 3))
        }
        kind::SACK_PERMITTED => {
            bytes.get(..2)?;
            Some((OptionValue::SackPermitted, 2))
        }
        kind::SACK => {
            let body = declared(bytes)?;
            let blocks = body
                .chunks_exact(8)
                .map(|c| SackBlock {
                    left_edge: u32::from_be_bytes([c[0], c[1], c[2], c[3]]),
                    right_edge: u32::from_be_bytes([c[4], c[5], c[6], c[7]]),
                })
                .collect();
            Some((OptionValue::Sack(blocks), body.len() + 2))
        }
        kind::TIMESTAMPS => {
            let b = bytes.get(..10)?;
            Some((
                OptionValue::Timestamps {
                    value: u32::from_be_bytes([b[2], b[3], b[4], b[5]]),
                    echo: u32::from_be_bytes([b[6], b[7], b[8], b[9]]),
                },
                10,
            ))
        }
        _ => {
            let body = declared(bytes)?;
            Some((OptionValue::Unknown(body.to_vec()), body.len() + 2))
        }
    }
}

/// Payload of a kind-length-value option; `None` if the length byte is
/// missing, below 2, or runs past `bytes`.
fn declared(bytes: &[u8]) -> Option<&[u8]> {
    let len = usize::from(*bytes.get(1)?);
    if len < 2 {
        return None;
    }
    bytes.get(2..len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with_offset(words: u8) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[12] = words << 4;
        buf
    }

    #[test]
    fn test_walk_mss_nop_wscale() {
        let (opts, truncated) = walk_options(&[2, 4, 0x05, 0xb4, 1, 3, 3, 7]);
        assert!(!truncated);
        assert_eq!(
            opts.iter().map(|o| &o.value).collect::<Vec<_>>(),
            vec![&OptionValue::Mss(1460), &OptionValue::Nop, &OptionValue::WindowScale(7)]
        );
    }

    #[test]
    fn test_walk_continues_past_end_of_list() {
        let (opts, truncated) = walk_options(&[0, 1, 4, 2]);
        assert!(!truncated);
        assert_eq!(opts.len(), 3);
        assert_eq!(opts[2].value, OptionValue::SackPermitted);
    }

    #[test]
    fn test_walk_stops_on_zero_length_unknown_option() {
        let (opts, truncated) = walk_options(&[1, 30, 0, 1, 1]);
        assert!(truncated);
        assert_eq!(opts.len(), 1);
    }

    #[test]
    fn test_sack_blocks() {
        let area = [5, 10, 0, 0, 0, 1, 0, 0, 0, 9];
        let (opts, truncated) = walk_options(&area);
        assert!(!truncated);
        assert_eq!(
            opts[0].value,
            OptionValue::Sack(vec![SackBlock { left_edge: 1, right_edge: 9 }])
        );
        assert_eq!(opts[0].length, 10);
    }

    #[test]
    fn test_data_offset_clamped_to_buffer() -> Result<(), DecodeError> {
        let mut buf = header_with_offset(8);
        buf.extend_from_slice(&[1, 1, 1, 1]);
        let segment = decode(&buf)?;
        assert_eq!(segment.header.data_offset, 32);
        assert_eq!(segment.options.len(), 4);
        assert!(segment.options_truncated);
        Ok(())
    }

    #[test]
    fn test_small_data_offset_has_no_options() -> Result<(), DecodeError> {
        let mut buf = header_with_offset(2);
        buf.extend_from_slice(&[2, 4, 0, 0]);
        let segment = decode(&buf)?;
        assert_eq!(segment.header.data_offset, 8);
        assert!(segment.options.is_empty());
        assert!(!segment.options_truncated);
        Ok(())
    }
}
