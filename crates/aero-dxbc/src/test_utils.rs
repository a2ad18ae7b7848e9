//! Test-only builders for containers and SM4/SM5 token streams.
//!
//! Enabled through the `test-utils` feature so the converter's integration
//! tests can assemble minimal shaders without a compiler toolchain.

use crate::comp::{CompMask, Swizzle};
use crate::sm4::decode::*;
use crate::sm4::opcode::OPCODE_LEN_SHIFT;
use crate::sm4::ShaderStage;
use crate::FourCC;

/// Builds a minimal `DXBC` container containing the provided chunks.
///
/// The resulting blob has:
/// - a valid `DXBC` header (`DXBC` magic + checksum + reserved + `total_size` + chunk count),
/// - a correct chunk offset table,
/// - and a correct `total_size`.
///
/// The checksum field is **not** computed; it is set to all zeros. This is
/// intentional: parsing does not require checksum correctness, and most tests
/// only need a structurally-valid container. Use [`build_container_hashed`]
/// when the test exercises checksum verification.
pub fn build_container(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let header_size = 4 + 16 + 4 + 4 + 4 + (4 * chunks.len());
    let chunk_bytes = chunks.iter().map(|(_, data)| 8 + data.len()).sum::<usize>();

    let mut out = Vec::with_capacity(header_size + chunk_bytes);

    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]); // checksum
    out.extend_from_slice(&1u32.to_le_bytes()); // reserved
    out.extend_from_slice(&0u32.to_le_bytes()); // total_size placeholder

    let chunk_count = u32::try_from(chunks.len()).expect("DXBC chunk_count does not fit in u32");
    out.extend_from_slice(&chunk_count.to_le_bytes());

    // Reserve space for the chunk offset table and fill it in once we know the offsets.
    let offsets_pos = out.len();
    out.resize(out.len() + 4 * chunks.len(), 0);

    let mut offsets = Vec::with_capacity(chunks.len());
    for (fourcc, data) in chunks {
        let offset = u32::try_from(out.len()).expect("DXBC chunk offset does not fit in u32");
        offsets.push(offset);

        let chunk_size = u32::try_from(data.len()).expect("DXBC chunk size does not fit in u32");
        out.extend_from_slice(&fourcc.0);
        out.extend_from_slice(&chunk_size.to_le_bytes());
        out.extend_from_slice(data);
    }

    // Fill offsets.
    for (i, offset) in offsets.iter().enumerate() {
        let pos = offsets_pos + i * 4;
        out[pos..pos + 4].copy_from_slice(&offset.to_le_bytes());
    }

    // Fill total_size.
    let total_size = u32::try_from(out.len()).expect("DXBC total_size does not fit in u32");
    let total_size_pos = 4 + 16 + 4;
    out[total_size_pos..total_size_pos + 4].copy_from_slice(&total_size.to_le_bytes());

    out
}

/// Like [`build_container`], but with a valid checksum stamped in.
pub fn build_container_hashed(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let mut out = build_container(chunks);
    let checksum = crate::hash::dxbc_checksum(&out[crate::HASHED_RANGE_START..]);
    out[4..20].copy_from_slice(&checksum);
    out
}

pub fn tokens_to_bytes(tokens: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(tokens.len() * 4);
    for &t in tokens {
        bytes.extend_from_slice(&t.to_le_bytes());
    }
    bytes
}

/// Wraps body tokens in a program header for the given stage and model.
pub fn make_program_tokens(stage: ShaderStage, major: u8, minor: u8, body: &[u32]) -> Vec<u32> {
    let version = (stage.program_type() << 16) | ((major as u32) << 4) | (minor as u32);
    let total = 2 + body.len();
    let mut tokens = Vec::with_capacity(total);
    tokens.push(version);
    tokens.push(total as u32);
    tokens.extend_from_slice(body);
    tokens
}

pub fn opcode_token(opcode: u32, len: u32) -> u32 {
    opcode | (len << OPCODE_LEN_SHIFT)
}

pub fn opcode_token_sat(opcode: u32, len: u32) -> u32 {
    opcode_token(opcode, len) | crate::sm4::opcode::INSTRUCTION_SATURATE_BIT
}

/// Raw operand token 0 with all-immediate index representations.
pub fn operand_token(
    kind: u32,
    num_components: u32,
    selection_mode: u32,
    component_sel: u32,
    index_dim: u32,
    extended: bool,
) -> u32 {
    let mut token = 0u32;
    token |= num_components & OPERAND_NUM_COMPONENTS_MASK;
    token |= (selection_mode & OPERAND_SELECTION_MODE_MASK) << OPERAND_SELECTION_MODE_SHIFT;
    token |=
        (component_sel & OPERAND_COMPONENT_SELECTION_MASK) << OPERAND_COMPONENT_SELECTION_SHIFT;
    token |= (kind & OPERAND_TYPE_MASK) << OPERAND_TYPE_SHIFT;
    token |= (index_dim & OPERAND_INDEX_DIMENSION_MASK) << OPERAND_INDEX_DIMENSION_SHIFT;
    token |= OPERAND_INDEX_REP_IMMEDIATE32 << OPERAND_INDEX0_REP_SHIFT;
    token |= OPERAND_INDEX_REP_IMMEDIATE32 << OPERAND_INDEX1_REP_SHIFT;
    token |= OPERAND_INDEX_REP_IMMEDIATE32 << OPERAND_INDEX2_REP_SHIFT;
    if extended {
        token |= OPERAND_EXTENDED_BIT;
    }
    token
}

/// Destination register operand (`r#`, `o#`, ...) with a write mask.
pub fn reg_dst(kind: u32, indices: &[u32], mask: CompMask) -> Vec<u32> {
    let mut out = vec![operand_token(
        kind,
        2,
        OPERAND_SEL_MASK,
        mask.0 as u32,
        indices.len() as u32,
        false,
    )];
    out.extend_from_slice(indices);
    out
}

/// Source register operand with a swizzle and optional modifier.
pub fn reg_src(
    kind: u32,
    indices: &[u32],
    swizzle: Swizzle,
    modifier: OperandModifier,
) -> Vec<u32> {
    let needs_ext = !matches!(modifier, OperandModifier::None);
    let object_like = matches!(kind, 6 | 7 | 30); // sampler/resource/uav
    let num_components = if object_like { 0 } else { 2 };
    let selection_mode = if object_like {
        OPERAND_SEL_MASK
    } else {
        OPERAND_SEL_SWIZZLE
    };
    let token = operand_token(
        kind,
        num_components,
        selection_mode,
        if object_like { 0xf } else { swizzle.to_bits() },
        indices.len() as u32,
        needs_ext,
    );
    let mut out = vec![token];
    if needs_ext {
        let mod_bits: u32 = match modifier {
            OperandModifier::None => 0,
            OperandModifier::Neg => 1,
            OperandModifier::Abs => 2,
            OperandModifier::AbsNeg => 3,
        };
        out.push((mod_bits << OPERAND_MODIFIER_SHIFT) | EXTENDED_OPERAND_MODIFIER);
    }
    out.extend_from_slice(indices);
    out
}

/// Special-register operand without indices (`oDepth`, `vThreadID`, ...).
pub fn special_dst(kind: u32, mask: CompMask) -> Vec<u32> {
    vec![operand_token(kind, 2, OPERAND_SEL_MASK, mask.0 as u32, 0, false)]
}

pub fn special_src(kind: u32, swizzle: Swizzle) -> Vec<u32> {
    vec![operand_token(
        kind,
        2,
        OPERAND_SEL_SWIZZLE,
        swizzle.to_bits(),
        0,
        false,
    )]
}

/// Four-lane 32-bit immediate.
pub fn imm32_vec4(values: [u32; 4]) -> Vec<u32> {
    let mut out = vec![operand_token(
        4,
        2,
        OPERAND_SEL_SWIZZLE,
        Swizzle::XYZW.to_bits(),
        0,
        false,
    )];
    out.extend_from_slice(&values);
    out
}

/// Scalar 32-bit immediate.
pub fn imm32_scalar(value: u32) -> Vec<u32> {
    vec![operand_token(4, 1, OPERAND_SEL_SELECT1, 0, 0, false), value]
}
