//! The `DXIL` container part layout.
//!
//! The part payload is a program header (shader kind/model and bitcode
//! framing) followed by the serialized module:
//!
//! ```text
//! u32 program_version   (kind << 16) | (major << 4) | minor
//! u32 size_in_uint32    whole part size, in DWORDs
//! u32 dxil_magic        "DXIL"
//! u32 dxil_version      (major << 8) | minor of the IR dialect
//! u32 bitcode_offset    from the dxil_magic field to the payload
//! u32 bitcode_size      payload bytes
//! ...                   payload, zero-padded to a DWORD boundary
//! ```

use crate::module::{Module, ShaderKind};

pub const DXIL_MAGIC: u32 = u32::from_le_bytes(*b"DXIL");
/// IR dialect version written into the header (DXIL 1.0).
pub const DXIL_VERSION: u32 = 1 << 8;
/// Offset from the `dxil_magic` field to the bitcode payload.
const BITCODE_OFFSET: u32 = 16;

/// Wraps serialized bitcode in the `DXIL` program header.
pub fn write_dxil_part(
    shader_kind: ShaderKind,
    shader_model: (u8, u8),
    bitcode: &[u8],
) -> Vec<u8> {
    let payload_padded = bitcode.len().div_ceil(4) * 4;
    let total = 24 + payload_padded;

    let mut out = Vec::with_capacity(total);
    let program_version = (shader_kind.program_kind() << 16)
        | ((shader_model.0 as u32) << 4)
        | shader_model.1 as u32;
    out.extend_from_slice(&program_version.to_le_bytes());
    out.extend_from_slice(&((total / 4) as u32).to_le_bytes());
    out.extend_from_slice(&DXIL_MAGIC.to_le_bytes());
    out.extend_from_slice(&DXIL_VERSION.to_le_bytes());
    out.extend_from_slice(&BITCODE_OFFSET.to_le_bytes());
    out.extend_from_slice(&(bitcode.len() as u32).to_le_bytes());
    out.extend_from_slice(bitcode);
    out.resize(total, 0);
    out
}

/// Serializes a module and wraps it in the part header.
pub fn module_to_dxil_part(module: &Module) -> Vec<u8> {
    let bitcode = crate::bitcode::serialize(module);
    write_dxil_part(
        module.shader_kind.unwrap_or(ShaderKind::Vertex),
        module.shader_model,
        &bitcode,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_header_frames_bitcode() {
        let part = write_dxil_part(ShaderKind::Pixel, (6, 0), &[1, 2, 3, 4, 5]);
        assert_eq!(part.len() % 4, 0);
        let program_version = u32::from_le_bytes(part[0..4].try_into().unwrap());
        assert_eq!(program_version, 0x60); // pixel kind 0, model 6.0
        assert_eq!(&part[8..12], b"DXIL");
        let size = u32::from_le_bytes(part[20..24].try_into().unwrap());
        assert_eq!(size, 5);
    }
}
