//! I/O signature chunk parsing.
//!
//! Signature chunks (`ISGN`, `OSGN`, `PCSG` and their newer siblings) share a
//! layout: a header of `u32 param_count` + `u32 param_offset`, a table of
//! fixed-size entries, and a string table of NUL-terminated semantic names
//! referenced by chunk-relative offsets.
//!
//! Three entry layouts exist across container generations:
//!
//! - 24 bytes (`ISGN`/`OSGN`/`PCSG`): name offset, semantic index, system
//!   value, component type, register, then mask / read-write mask / stream /
//!   min-precision packed as four bytes.
//! - 28 bytes (`OSG5`): a leading `u32` stream id before the 24-byte body.
//! - 32 bytes (`ISG1`/`OSG1`/`PSG1`): the 28-byte form plus a trailing `u32`
//!   min-precision.

use crate::{read_cstr, DxbcError, FourCC};

/// Entry layout generation of a signature chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureLayout {
    /// 24-byte entries; stream/min-precision packed into the trailing bytes.
    Legacy,
    /// 28-byte entries with a leading 32-bit stream id (`OSG5`).
    Stream,
    /// 32-byte entries with leading stream and trailing min-precision
    /// (`ISG1`/`OSG1`/`PSG1`).
    Full,
}

impl SignatureLayout {
    pub fn for_tag(tag: FourCC) -> SignatureLayout {
        match tag {
            FourCC::OSG5 => SignatureLayout::Stream,
            FourCC::ISG1 | FourCC::OSG1 | FourCC::PSG1 => SignatureLayout::Full,
            _ => SignatureLayout::Legacy,
        }
    }

    fn entry_size(self) -> usize {
        match self {
            SignatureLayout::Legacy => 24,
            SignatureLayout::Stream => 28,
            SignatureLayout::Full => 32,
        }
    }
}

/// One signature element record, normalized across layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub system_value_type: u32,
    pub component_type: u32,
    pub register: u32,
    pub mask: u8,
    pub read_write_mask: u8,
    /// `None` when the layout has no stream field at all (never the case for
    /// the layouts we parse; legacy entries carry it as a packed byte).
    pub stream: Option<u8>,
    pub min_precision: u32,
}

/// A parsed signature chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureChunk {
    pub layout: SignatureLayout,
    pub entries: Vec<SignatureEntry>,
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

/// Parses a signature chunk assuming the legacy 24-byte entry layout.
pub fn parse_signature_chunk(bytes: &[u8]) -> Result<SignatureChunk, DxbcError> {
    parse_signature_chunk_ex(bytes, SignatureLayout::Legacy)
}

/// Parses a signature chunk with an explicit entry layout.
pub fn parse_signature_chunk_ex(
    bytes: &[u8],
    layout: SignatureLayout,
) -> Result<SignatureChunk, DxbcError> {
    if bytes.len() < 8 {
        return Err(DxbcError::InvalidChunk {
            context: format!("signature header needs 8 bytes, got {}", bytes.len()),
        });
    }
    let param_count = read_u32(bytes, 0) as usize;
    let param_offset = read_u32(bytes, 4) as usize;

    let mut entries = Vec::new();
    if param_count == 0 {
        // Shaders may legitimately have empty signatures (e.g. no patch
        // constants); accept count==0 with any in-bounds offset.
        return Ok(SignatureChunk { layout, entries });
    }

    let entry_size = layout.entry_size();
    let table_end = param_offset
        .checked_add(param_count.checked_mul(entry_size).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);
    if param_offset < 8 || table_end > bytes.len() {
        return Err(DxbcError::InvalidChunk {
            context: format!(
                "signature table [{param_offset}, {table_end}) for {param_count} entries lies outside chunk of {} bytes",
                bytes.len()
            ),
        });
    }

    entries.reserve(param_count);
    for i in 0..param_count {
        let at = param_offset + i * entry_size;
        let (stream_lead, body) = match layout {
            SignatureLayout::Legacy => (None, at),
            SignatureLayout::Stream | SignatureLayout::Full => {
                (Some(read_u32(bytes, at)), at + 4)
            }
        };

        let name_offset = read_u32(bytes, body) as usize;
        // A name offset pointing into the header or entry table is bogus even
        // when it is technically in bounds.
        if name_offset < table_end {
            return Err(DxbcError::InvalidChunk {
                context: format!(
                    "entry {i} semantic_name offset {name_offset} points into signature table"
                ),
            });
        }
        let semantic_name = read_cstr(bytes, name_offset, "semantic_name")?;

        let semantic_index = read_u32(bytes, body + 4);
        let system_value_type = read_u32(bytes, body + 8);
        let component_type = read_u32(bytes, body + 12);
        let register = read_u32(bytes, body + 16);
        let mask = bytes[body + 20];
        let read_write_mask = bytes[body + 21];

        let (stream, min_precision) = match layout {
            SignatureLayout::Legacy => {
                (Some(bytes[body + 22]), bytes[body + 23] as u32)
            }
            SignatureLayout::Stream => (stream_lead.map(|s| s as u8), 0),
            SignatureLayout::Full => (
                stream_lead.map(|s| s as u8),
                read_u32(bytes, body + 24),
            ),
        };

        entries.push(SignatureEntry {
            semantic_name,
            semantic_index,
            system_value_type,
            component_type,
            register,
            mask,
            read_write_mask,
            stream,
            min_precision,
        });
    }

    Ok(SignatureChunk { layout, entries })
}

impl SignatureChunk {
    /// Serializes the chunk back into blob form using its own layout.
    ///
    /// Semantic names are deduplicated the way the toolchain emits them (one
    /// string table entry per distinct name).
    pub fn to_bytes(&self) -> Vec<u8> {
        let entry_size = self.layout.entry_size();
        let table_start = 8usize;
        let strings_start = table_start + self.entries.len() * entry_size;

        // Assign string-table offsets, first occurrence wins.
        let mut strings: Vec<&str> = Vec::new();
        for e in &self.entries {
            if !strings.contains(&e.semantic_name.as_str()) {
                strings.push(&e.semantic_name);
            }
        }
        let mut offsets = std::collections::HashMap::new();
        let mut at = strings_start;
        for s in &strings {
            offsets.insert(*s, at as u32);
            at += s.len() + 1;
        }

        let mut out = Vec::with_capacity(at);
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&(table_start as u32).to_le_bytes());
        for e in &self.entries {
            if matches!(self.layout, SignatureLayout::Stream | SignatureLayout::Full) {
                out.extend_from_slice(&u32::from(e.stream.unwrap_or(0)).to_le_bytes());
            }
            out.extend_from_slice(&offsets[e.semantic_name.as_str()].to_le_bytes());
            out.extend_from_slice(&e.semantic_index.to_le_bytes());
            out.extend_from_slice(&e.system_value_type.to_le_bytes());
            out.extend_from_slice(&e.component_type.to_le_bytes());
            out.extend_from_slice(&e.register.to_le_bytes());
            match self.layout {
                SignatureLayout::Legacy => {
                    out.push(e.mask);
                    out.push(e.read_write_mask);
                    out.push(e.stream.unwrap_or(0));
                    out.push(e.min_precision as u8);
                }
                SignatureLayout::Stream => {
                    out.push(e.mask);
                    out.push(e.read_write_mask);
                    out.extend_from_slice(&[0, 0]);
                }
                SignatureLayout::Full => {
                    out.push(e.mask);
                    out.push(e.read_write_mask);
                    out.extend_from_slice(&[0, 0]);
                    out.extend_from_slice(&e.min_precision.to_le_bytes());
                }
            }
        }
        for s in &strings {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out
    }
}
