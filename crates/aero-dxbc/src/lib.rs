//! Parsing and assembly of DXBC shader containers.
//!
//! A DXBC container is a flat blob: a fixed header (magic, checksum, version,
//! total size, chunk count), a table of chunk offsets, then the chunks
//! themselves, each introduced by a FourCC tag and a byte length. Everything
//! here is bounds-checked against the header's declared `total_size` before
//! any inner pointer is followed; the declared size is authoritative even if
//! the caller hands us a longer buffer.
//!
//! The crate also understands the container payloads the shader pipeline
//! needs: I/O signature chunks ([`parse_signature_chunk`]) and the SM4/SM5
//! shader token stream ([`sm4::Sm4Program`], [`sm4::decode`]).

use std::fmt;

use thiserror::Error;

pub mod comp;
pub mod hash;
pub mod signature;
pub mod sm4;
pub mod write;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use comp::{CompMask, Swizzle};
pub use signature::{parse_signature_chunk, SignatureChunk, SignatureEntry, SignatureLayout};
pub use write::ContainerBuilder;

/// Four-character chunk tag, stored in file byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const DXBC: FourCC = FourCC(*b"DXBC");
    pub const SHDR: FourCC = FourCC(*b"SHDR");
    pub const SHEX: FourCC = FourCC(*b"SHEX");
    pub const ISGN: FourCC = FourCC(*b"ISGN");
    pub const ISG1: FourCC = FourCC(*b"ISG1");
    pub const OSGN: FourCC = FourCC(*b"OSGN");
    pub const OSG5: FourCC = FourCC(*b"OSG5");
    pub const OSG1: FourCC = FourCC(*b"OSG1");
    pub const PCSG: FourCC = FourCC(*b"PCSG");
    pub const PSG1: FourCC = FourCC(*b"PSG1");
    pub const RTS0: FourCC = FourCC(*b"RTS0");
    pub const SFI0: FourCC = FourCC(*b"SFI0");
    pub const PSV0: FourCC = FourCC(*b"PSV0");
    pub const DXIL: FourCC = FourCC(*b"DXIL");

    pub fn as_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

/// Errors produced while parsing a DXBC container or one of its chunks.
#[derive(Debug, Error)]
pub enum DxbcError {
    #[error("malformed DXBC header: {context}")]
    MalformedHeader { context: String },
    #[error("malformed DXBC chunk offset table: {context}")]
    MalformedOffsets { context: String },
    #[error("DXBC range out of bounds: {context}")]
    OutOfBounds { context: String },
    #[error("invalid DXBC chunk: {context}")]
    InvalidChunk { context: String },
    #[error("DXBC checksum mismatch: {context}")]
    ChecksumMismatch { context: String },
    #[error("DXBC container too large: {context}")]
    TooLarge { context: String },
}

impl DxbcError {
    /// Free-form detail describing exactly what failed; useful for matching in
    /// tests and for surfacing in caller diagnostics.
    pub fn context(&self) -> &str {
        match self {
            DxbcError::MalformedHeader { context }
            | DxbcError::MalformedOffsets { context }
            | DxbcError::OutOfBounds { context }
            | DxbcError::InvalidChunk { context }
            | DxbcError::ChecksumMismatch { context }
            | DxbcError::TooLarge { context } => context,
        }
    }
}

/// Size of the fixed DXBC header up to (and excluding) the chunk offset table.
pub const HEADER_SIZE: usize = 4 + 16 + 4 + 4 + 4;

/// Bytes covered by the container checksum: everything after the checksum
/// field itself.
pub const HASHED_RANGE_START: usize = 20;

/// Upper bound on `chunk_count` we are willing to parse. Real containers have
/// single-digit chunk counts; this bound keeps the offset-table arithmetic
/// comfortably inside `usize` on all targets.
pub const MAX_CHUNK_COUNT: u32 = 4096;

/// Parsed fixed-size container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DxbcHeader {
    pub magic: FourCC,
    pub checksum: [u8; 16],
    pub reserved: u32,
    pub total_size: u32,
    pub chunk_count: u32,
}

/// A single chunk: tag plus payload slice borrowed from the container.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub fourcc: FourCC,
    pub data: &'a [u8],
}

/// A parsed, bounds-validated view over a DXBC container.
///
/// Parsing validates every chunk header and payload once, so accessors never
/// fail; a chunk that is simply absent is reported as `None`, which callers
/// must distinguish from a malformed container (an `Err` from [`parse`]).
///
/// [`parse`]: DxbcFile::parse
#[derive(Debug)]
pub struct DxbcFile<'a> {
    bytes: &'a [u8],
    header: DxbcHeader,
    /// (fourcc, payload offset, payload length) per chunk, in table order.
    chunks: Vec<(FourCC, usize, usize)>,
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

impl<'a> DxbcFile<'a> {
    /// Parses and validates the container structure.
    ///
    /// The declared `total_size` is the authoritative bound: every chunk
    /// header and payload must fall inside it. The checksum field is *not*
    /// verified here; call [`verify_checksum`](Self::verify_checksum) when
    /// integrity matters.
    pub fn parse(bytes: &'a [u8]) -> Result<DxbcFile<'a>, DxbcError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DxbcError::MalformedHeader {
                context: format!(
                    "need at least {HEADER_SIZE} bytes for the DXBC header, got {}",
                    bytes.len()
                ),
            });
        }

        let magic = FourCC(bytes[0..4].try_into().unwrap());
        if magic != FourCC::DXBC {
            return Err(DxbcError::MalformedHeader {
                context: format!("bad magic {magic}"),
            });
        }

        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&bytes[4..20]);
        let reserved = read_u32(bytes, 20);
        let total_size = read_u32(bytes, 24);
        let chunk_count = read_u32(bytes, 28);

        if (total_size as usize) < HEADER_SIZE {
            return Err(DxbcError::MalformedHeader {
                context: format!("total_size {total_size} is smaller than header"),
            });
        }
        if total_size as usize > bytes.len() {
            return Err(DxbcError::OutOfBounds {
                context: format!(
                    "total_size {total_size} exceeds buffer length {}",
                    bytes.len()
                ),
            });
        }
        if chunk_count > MAX_CHUNK_COUNT {
            return Err(DxbcError::MalformedHeader {
                context: format!("chunk_count {chunk_count} exceeds limit {MAX_CHUNK_COUNT}"),
            });
        }

        let total = total_size as usize;
        let table_end = HEADER_SIZE + chunk_count as usize * 4;
        if table_end > total {
            return Err(DxbcError::MalformedOffsets {
                context: format!(
                    "chunk offset table ends at {table_end}, outside total_size {total}"
                ),
            });
        }

        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for i in 0..chunk_count as usize {
            let offset = read_u32(bytes, HEADER_SIZE + i * 4) as usize;

            // Chunk headers live after the offset table; an offset pointing
            // into the container header is corrupt even if it is in bounds.
            if offset < table_end {
                return Err(DxbcError::MalformedOffsets {
                    context: format!(
                        "chunk {i} offset {offset} points into the header/offset table"
                    ),
                });
            }

            // Chunk header: fourcc + u32 byte length.
            let Some(header_end) = offset.checked_add(8) else {
                return Err(DxbcError::MalformedOffsets {
                    context: format!("chunk {i} offset {offset} overflows"),
                });
            };
            if header_end > total {
                return Err(DxbcError::OutOfBounds {
                    context: format!(
                        "chunk {i} header at {offset} lies outside total_size {total}"
                    ),
                });
            }

            let fourcc = FourCC(bytes[offset..offset + 4].try_into().unwrap());
            let len = read_u32(bytes, offset + 4) as usize;
            let data_start = header_end;
            let Some(data_end) = data_start.checked_add(len) else {
                return Err(DxbcError::OutOfBounds {
                    context: format!("chunk {i} ({fourcc}) length {len} overflows"),
                });
            };
            if data_end > total {
                return Err(DxbcError::OutOfBounds {
                    context: format!(
                        "chunk {i} ({fourcc}) payload [{data_start}, {data_end}) lies outside total_size {total}"
                    ),
                });
            }

            chunks.push((fourcc, data_start, len));
        }

        Ok(DxbcFile {
            bytes,
            header: DxbcHeader {
                magic,
                checksum,
                reserved,
                total_size,
                chunk_count,
            },
            chunks,
        })
    }

    pub fn header(&self) -> &DxbcHeader {
        &self.header
    }

    /// The container bytes covered by `total_size`.
    pub fn bytes(&self) -> &'a [u8] {
        &self.bytes[..self.header.total_size as usize]
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, index: usize) -> Option<Chunk<'a>> {
        let &(fourcc, start, len) = self.chunks.get(index)?;
        Some(Chunk {
            fourcc,
            data: &self.bytes[start..start + len],
        })
    }

    pub fn chunks(&self) -> impl Iterator<Item = Chunk<'a>> + '_ {
        (0..self.chunks.len()).map(|i| self.chunk(i).unwrap())
    }

    /// First chunk with the given tag, or `None` if the container has none.
    pub fn get_chunk(&self, fourcc: FourCC) -> Option<Chunk<'a>> {
        self.find_first_chunk(fourcc).map(|i| self.chunk(i).unwrap())
    }

    /// All chunks with the given tag, in container order.
    pub fn get_chunks(&self, fourcc: FourCC) -> impl Iterator<Item = Chunk<'a>> + '_ {
        self.chunks().filter(move |c| c.fourcc == fourcc)
    }

    /// Index of the first chunk with the given tag. `None` means "absent",
    /// which is part of the contract: callers distinguish a missing chunk
    /// from a malformed container.
    pub fn find_first_chunk(&self, fourcc: FourCC) -> Option<usize> {
        self.chunks.iter().position(|&(fc, _, _)| fc == fourcc)
    }

    /// The shader-code chunk, preferring the extended `SHEX` form over the
    /// legacy `SHDR` form when both are present.
    pub fn find_first_shader_chunk(&self) -> Option<Chunk<'a>> {
        self.get_chunk(FourCC::SHEX)
            .or_else(|| self.get_chunk(FourCC::SHDR))
    }

    /// Parses the signature chunk with the given tag, trying the sibling tags
    /// of the same signature kind when the exact tag is absent (`ISGN`⇄`ISG1`,
    /// `OSGN`/`OSG5`/`OSG1`, `PCSG`⇄`PSG1`). Different generations carry
    /// different entry layouts; the layout is chosen by the tag that was
    /// actually found.
    pub fn get_signature(
        &self,
        fourcc: FourCC,
    ) -> Option<Result<SignatureChunk, DxbcError>> {
        let candidates: &[FourCC] = match fourcc {
            FourCC::ISGN | FourCC::ISG1 => &[FourCC::ISGN, FourCC::ISG1],
            FourCC::OSGN | FourCC::OSG5 | FourCC::OSG1 => {
                &[FourCC::OSGN, FourCC::OSG5, FourCC::OSG1]
            }
            FourCC::PCSG | FourCC::PSG1 => &[FourCC::PCSG, FourCC::PSG1],
            other => {
                return self
                    .get_chunk(other)
                    .map(|c| parse_signature_chunk(c.data));
            }
        };
        for &tag in candidates {
            if let Some(chunk) = self.get_chunk(tag) {
                return Some(signature::parse_signature_chunk_ex(
                    chunk.data,
                    SignatureLayout::for_tag(tag),
                ));
            }
        }
        None
    }

    /// Recomputes the container checksum and compares it to the header field.
    pub fn verify_checksum(&self) -> Result<(), DxbcError> {
        let computed = hash::dxbc_checksum(&self.bytes()[HASHED_RANGE_START..]);
        if computed != self.header.checksum {
            return Err(DxbcError::ChecksumMismatch {
                context: format!(
                    "header {:02x?} != computed {:02x?}",
                    self.header.checksum, computed
                ),
            });
        }
        Ok(())
    }

    /// One-line-per-chunk summary for logs and error reports.
    pub fn debug_summary(&self) -> String {
        use fmt::Write;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "DXBC total_size={} chunks={}",
            self.header.total_size, self.header.chunk_count
        );
        for (i, chunk) in self.chunks().enumerate() {
            let _ = writeln!(out, "  [{i}] {} ({} bytes)", chunk.fourcc, chunk.data.len());
        }
        out
    }
}

/// Reads a NUL-terminated UTF-8 string starting at `offset` within `bytes`.
///
/// The scan never leaves `bytes`; a string that runs past the end of the
/// buffer is malformed.
pub(crate) fn read_cstr(bytes: &[u8], offset: usize, what: &str) -> Result<String, DxbcError> {
    let tail = bytes.get(offset..).ok_or_else(|| DxbcError::InvalidChunk {
        context: format!("{what} offset {offset} is out of bounds"),
    })?;
    let nul = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| DxbcError::InvalidChunk {
            context: format!("{what} at offset {offset} has no null terminator"),
        })?;
    let s = std::str::from_utf8(&tail[..nul]).map_err(|_| DxbcError::InvalidChunk {
        context: format!("{what} at offset {offset} is not valid UTF-8"),
    })?;
    Ok(s.to_owned())
}
