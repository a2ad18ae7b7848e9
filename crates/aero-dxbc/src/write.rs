//! Container assembly.
//!
//! [`ContainerBuilder`] is the write-side counterpart of [`DxbcFile`]: parts
//! are appended in order, `build()` lays out the offset table, fills
//! `total_size`, and stamps the container checksum over the hashed range.

use crate::{hash, DxbcError, FourCC, HASHED_RANGE_START, HEADER_SIZE};

/// Accumulates `(FourCC, payload)` parts and assembles a DXBC container.
#[derive(Default)]
pub struct ContainerBuilder {
    parts: Vec<(FourCC, Vec<u8>)>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_part(&mut self, fourcc: FourCC, payload: Vec<u8>) -> &mut Self {
        self.parts.push((fourcc, payload));
        self
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn has_part(&self, fourcc: FourCC) -> bool {
        self.parts.iter().any(|(fc, _)| *fc == fourcc)
    }

    /// Assembles the container and stamps its checksum.
    ///
    /// Fails with [`DxbcError::TooLarge`] when the assembled container would
    /// not fit the format's 32-bit size fields.
    pub fn build(&self) -> Result<Vec<u8>, DxbcError> {
        let mut total = HEADER_SIZE + self.parts.len() * 4;
        for (fourcc, payload) in &self.parts {
            total = total
                .checked_add(8)
                .and_then(|t| t.checked_add(payload.len()))
                .ok_or_else(|| DxbcError::TooLarge {
                    context: format!("part {fourcc} overflows container size"),
                })?;
        }
        let total_size = u32::try_from(total).map_err(|_| DxbcError::TooLarge {
            context: format!("container of {total} bytes exceeds u32 size field"),
        })?;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&FourCC::DXBC.0);
        out.extend_from_slice(&[0u8; 16]); // checksum, stamped below
        out.extend_from_slice(&1u32.to_le_bytes()); // format version
        out.extend_from_slice(&total_size.to_le_bytes());
        out.extend_from_slice(&(self.parts.len() as u32).to_le_bytes());

        // Offset table, then chunks.
        let mut offset = HEADER_SIZE + self.parts.len() * 4;
        for (_, payload) in &self.parts {
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            offset += 8 + payload.len();
        }
        for (fourcc, payload) in &self.parts {
            out.extend_from_slice(&fourcc.0);
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(payload);
        }
        debug_assert_eq!(out.len(), total);

        let checksum = hash::dxbc_checksum(&out[HASHED_RANGE_START..]);
        out[4..20].copy_from_slice(&checksum);

        Ok(out)
    }
}

/// Pads `bytes` in place with zero bytes to a 4-byte boundary.
pub fn pad4(bytes: &mut Vec<u8>) {
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DxbcFile;

    #[test]
    fn built_container_parses_and_checksums() {
        let mut builder = ContainerBuilder::new();
        builder.push_part(FourCC::SHEX, vec![1, 2, 3, 4]);
        builder.push_part(FourCC(*b"JUNK"), vec![9]);
        let bytes = builder.build().expect("build");

        let file = DxbcFile::parse(&bytes).expect("parse");
        assert_eq!(file.chunk_count(), 2);
        assert_eq!(file.get_chunk(FourCC::SHEX).unwrap().data, &[1, 2, 3, 4]);
        file.verify_checksum().expect("checksum should match");
    }

    #[test]
    fn tampering_breaks_the_checksum() {
        let mut builder = ContainerBuilder::new();
        builder.push_part(FourCC::SHEX, vec![1, 2, 3, 4]);
        let mut bytes = builder.build().expect("build");
        *bytes.last_mut().unwrap() ^= 0xff;

        let file = DxbcFile::parse(&bytes).expect("parse");
        assert!(file.verify_checksum().is_err());
    }
}
