//! SM4/SM5 instruction decoding.
//!
//! [`decode_program`] walks the token stream after the program header and
//! produces one [`Instruction`] record per instruction or declaration. The
//! decoder is deliberately uninterpreted: declarations keep their payload
//! DWORDs in [`Instruction::extra`] for the analysis pass to interpret, and
//! operands are decoded structurally (kind, selection, modifiers, indices)
//! without assigning meaning to them.

use crate::comp::{CompMask, Swizzle};
use crate::sm4::opcode::*;
use crate::sm4::{Opcode, OpcodeClass, Sm4Program};

// Operand token 0 field layout.
pub const OPERAND_NUM_COMPONENTS_MASK: u32 = 0x3;
pub const OPERAND_SELECTION_MODE_SHIFT: u32 = 2;
pub const OPERAND_SELECTION_MODE_MASK: u32 = 0x3;
pub const OPERAND_COMPONENT_SELECTION_SHIFT: u32 = 4;
pub const OPERAND_COMPONENT_SELECTION_MASK: u32 = 0xff;
pub const OPERAND_TYPE_SHIFT: u32 = 12;
pub const OPERAND_TYPE_MASK: u32 = 0xff;
pub const OPERAND_INDEX_DIMENSION_SHIFT: u32 = 20;
pub const OPERAND_INDEX_DIMENSION_MASK: u32 = 0x3;
pub const OPERAND_INDEX0_REP_SHIFT: u32 = 22;
pub const OPERAND_INDEX1_REP_SHIFT: u32 = 25;
pub const OPERAND_INDEX2_REP_SHIFT: u32 = 28;
pub const OPERAND_INDEX_REP_MASK: u32 = 0x7;
pub const OPERAND_EXTENDED_BIT: u32 = 1 << 31;

pub const OPERAND_SEL_MASK: u32 = 0;
pub const OPERAND_SEL_SWIZZLE: u32 = 1;
pub const OPERAND_SEL_SELECT1: u32 = 2;

pub const OPERAND_INDEX_REP_IMMEDIATE32: u32 = 0;
pub const OPERAND_INDEX_REP_IMMEDIATE64: u32 = 1;
pub const OPERAND_INDEX_REP_RELATIVE: u32 = 2;
pub const OPERAND_INDEX_REP_IMMEDIATE32_PLUS_RELATIVE: u32 = 3;
pub const OPERAND_INDEX_REP_IMMEDIATE64_PLUS_RELATIVE: u32 = 4;

pub const OPERAND_INDEX_DIMENSION_0D: u32 = 0;
pub const OPERAND_INDEX_DIMENSION_1D: u32 = 1;
pub const OPERAND_INDEX_DIMENSION_2D: u32 = 2;
pub const OPERAND_INDEX_DIMENSION_3D: u32 = 3;

// Extended operand token fields.
pub const EXTENDED_OPERAND_TYPE_MASK: u32 = 0x3f;
pub const EXTENDED_OPERAND_MODIFIER: u32 = 1;
pub const OPERAND_MODIFIER_SHIFT: u32 = 6;
pub const OPERAND_MODIFIER_MASK: u32 = 0xff;
pub const OPERAND_MIN_PRECISION_SHIFT: u32 = 14;
pub const OPERAND_MIN_PRECISION_MASK: u32 = 0x7;
pub const OPERAND_NON_UNIFORM_BIT: u32 = 1 << 17;

/// Register-file / special-value kind of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum OperandKind {
    Temp = 0,
    Input = 1,
    Output = 2,
    IndexableTemp = 3,
    Imm32 = 4,
    Imm64 = 5,
    Sampler = 6,
    Resource = 7,
    ConstantBuffer = 8,
    ImmediateConstantBuffer = 9,
    Label = 10,
    InputPrimitiveId = 11,
    OutputDepth = 12,
    Null = 13,
    Rasterizer = 14,
    OutputCoverageMask = 15,
    Stream = 16,
    FunctionBody = 17,
    FunctionTable = 18,
    Interface = 19,
    FunctionInput = 20,
    FunctionOutput = 21,
    OutputControlPointId = 22,
    InputForkInstanceId = 23,
    InputJoinInstanceId = 24,
    InputControlPoint = 25,
    OutputControlPoint = 26,
    InputPatchConstant = 27,
    InputDomainPoint = 28,
    ThisPointer = 29,
    UnorderedAccessView = 30,
    ThreadGroupSharedMemory = 31,
    InputThreadId = 32,
    InputThreadGroupId = 33,
    InputThreadIdInGroup = 34,
    InputCoverageMask = 35,
    InputThreadIdInGroupFlattened = 36,
    InputGsInstanceId = 37,
    OutputDepthGreaterEqual = 38,
    OutputDepthLessEqual = 39,
    CycleCounter = 40,
    OutputStencilRef = 41,
    InnerCoverage = 42,
}

impl OperandKind {
    pub fn from_u32(v: u32) -> Option<OperandKind> {
        (v <= 42).then(|| unsafe { std::mem::transmute::<u32, OperandKind>(v) })
    }
}

/// Source operand modifier, applied after load: `abs` first, then `neg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperandModifier {
    #[default]
    None,
    Neg,
    Abs,
    AbsNeg,
}

impl OperandModifier {
    pub fn has_abs(self) -> bool {
        matches!(self, OperandModifier::Abs | OperandModifier::AbsNeg)
    }

    pub fn has_neg(self) -> bool {
        matches!(self, OperandModifier::Neg | OperandModifier::AbsNeg)
    }
}

/// Declared minimum precision of an operand (SM5 `min16float` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinPrecision {
    #[default]
    Default,
    Float16,
    Float2_8,
    Sint16,
    Uint16,
}

impl MinPrecision {
    fn from_bits(bits: u32) -> MinPrecision {
        match bits {
            1 => MinPrecision::Float16,
            2 => MinPrecision::Float2_8,
            4 => MinPrecision::Sint16,
            5 => MinPrecision::Uint16,
            _ => MinPrecision::Default,
        }
    }
}

/// Per-lane selection carried by an operand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompSelection {
    /// 0-component operands (resource/sampler object forms).
    None,
    Mask(CompMask),
    Swizzle(Swizzle),
    Select1(u8),
}

impl CompSelection {
    /// The operand read as a swizzle: masks become identity, select1 becomes
    /// a splat.
    pub fn as_swizzle(self) -> Swizzle {
        match self {
            CompSelection::None | CompSelection::Mask(_) => Swizzle::XYZW,
            CompSelection::Swizzle(s) => s,
            CompSelection::Select1(c) => Swizzle::splat(c),
        }
    }

    /// The operand written as a mask: swizzles/selects cover their lanes.
    pub fn as_mask(self) -> CompMask {
        match self {
            CompSelection::None => CompMask::ALL,
            CompSelection::Mask(m) => m,
            CompSelection::Swizzle(_) => CompMask::ALL,
            CompSelection::Select1(c) => CompMask::for_comp(c),
        }
    }
}

/// One dimension of an operand's register index.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandIndex {
    Imm32(u32),
    Imm64(u64),
    /// `r[r1.x]`-style pure relative index.
    Relative(Box<Operand>),
    /// `cb0[r1.x + 4]`-style biased relative index.
    Imm32PlusRelative(u32, Box<Operand>),
}

impl OperandIndex {
    /// The immediate value, if the index has no relative part.
    pub fn as_imm(&self) -> Option<u32> {
        match *self {
            OperandIndex::Imm32(v) => Some(v),
            OperandIndex::Imm64(v) => u32::try_from(v).ok(),
            _ => None,
        }
    }
}

/// A fully decoded operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub kind: OperandKind,
    /// 0, 1, or 4 components.
    pub num_components: u8,
    pub selection: CompSelection,
    pub modifier: OperandModifier,
    pub min_precision: MinPrecision,
    pub non_uniform: bool,
    pub indices: Vec<OperandIndex>,
    /// Raw immediate payload for `Imm32`/`Imm64` operands, per lane.
    pub imm: [u32; 4],
    pub imm64: [u64; 2],
}

impl Operand {
    pub fn index_dim(&self) -> usize {
        self.indices.len()
    }

    /// First index as an immediate; most operands (r#, v#, o#, t#, s#) are
    /// 1D-indexed with an immediate register number.
    pub fn reg_imm(&self) -> Option<u32> {
        self.indices.first().and_then(|i| i.as_imm())
    }

    pub fn write_mask(&self) -> CompMask {
        self.selection.as_mask()
    }

    pub fn swizzle(&self) -> Swizzle {
        self.selection.as_swizzle()
    }

    pub fn is_null(&self) -> bool {
        self.kind == OperandKind::Null
    }
}

/// Non-executable custom-data block.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomData {
    pub class: u32,
    pub payload: Vec<u32>,
}

/// `resinfo` return-type modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResInfoReturnType {
    #[default]
    Float,
    RcpFloat,
    UInt,
}

/// Resource dimension from declarations and extended opcode tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDim {
    Unknown,
    Buffer,
    Texture1D,
    Texture2D,
    Texture2DMS,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    Texture2DMSArray,
    TextureCubeArray,
    RawBuffer,
    StructuredBuffer,
}

impl ResourceDim {
    pub fn from_bits(bits: u32) -> ResourceDim {
        match bits {
            1 => ResourceDim::Buffer,
            2 => ResourceDim::Texture1D,
            3 => ResourceDim::Texture2D,
            4 => ResourceDim::Texture2DMS,
            5 => ResourceDim::Texture3D,
            6 => ResourceDim::TextureCube,
            7 => ResourceDim::Texture1DArray,
            8 => ResourceDim::Texture2DArray,
            9 => ResourceDim::Texture2DMSArray,
            10 => ResourceDim::TextureCubeArray,
            11 => ResourceDim::RawBuffer,
            12 => ResourceDim::StructuredBuffer,
            _ => ResourceDim::Unknown,
        }
    }
}

/// One decoded instruction or declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// The full leading token, for opcode-specific control fields.
    pub token0: u32,
    pub saturate: bool,
    /// Boolean test polarity of conditional forms (`if_nz` vs `if_z`).
    pub test_nonzero: bool,
    /// SM5 per-component precise mask.
    pub precise_mask: CompMask,
    pub resinfo_return: ResInfoReturnType,
    /// Embedded `aoffimmi` texel offsets from a sample-controls token.
    pub sample_offsets: [i8; 3],
    /// Resource dimension (and structure stride) from an extended token.
    pub extended_resource_dim: Option<ResourceDim>,
    pub extended_resource_stride: u32,
    /// Resource return type token from an extended token (4 × 4 bits).
    pub extended_return_type: Option<u32>,
    pub operands: Vec<Operand>,
    pub custom: Option<CustomData>,
    /// Trailing declaration payload DWORDs (counts, strides, system values).
    pub extra: Vec<u32>,
    /// Offset of the instruction's first token within the program token
    /// stream (header included); stable identity for labels/diagnostics.
    pub token_offset: usize,
}

impl Instruction {
    pub fn dst(&self, idx: usize) -> &Operand {
        &self.operands[idx]
    }

    pub fn src(&self, idx: usize) -> &Operand {
        &self.operands[idx]
    }

    /// Control field helpers over `token0`.
    pub fn global_flags(&self) -> u32 {
        (self.token0 >> GLOBAL_FLAGS_SHIFT) & GLOBAL_FLAGS_MASK
    }

    pub fn resource_dim_control(&self) -> ResourceDim {
        ResourceDim::from_bits((self.token0 >> RESOURCE_DIM_SHIFT) & RESOURCE_DIM_MASK)
    }

    pub fn resource_sample_count(&self) -> u32 {
        (self.token0 >> RESOURCE_SAMPLE_COUNT_SHIFT) & RESOURCE_SAMPLE_COUNT_MASK
    }

    pub fn interpolation_mode(&self) -> u32 {
        (self.token0 >> INTERPOLATION_MODE_SHIFT) & INTERPOLATION_MODE_MASK
    }

    pub fn sampler_mode(&self) -> u32 {
        (self.token0 >> SAMPLER_MODE_SHIFT) & SAMPLER_MODE_MASK
    }

    pub fn sync_flags(&self) -> u32 {
        self.token0 & (SYNC_THREADS_IN_GROUP | SYNC_TGSM_MEMORY | SYNC_UAV_MEMORY_GROUP | SYNC_UAV_MEMORY_GLOBAL)
    }
}

/// Structural decode failure; surfaces from the converter as malformed
/// bytecode.
#[derive(Debug, thiserror::Error)]
#[error("decode error at token {token_offset}: {kind:?}")]
pub struct DecodeError {
    pub token_offset: usize,
    pub kind: DecodeErrorKind,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    UnknownOpcode { raw: u32 },
    TruncatedInstruction { declared: usize, available: usize },
    ZeroLengthInstruction,
    BadOperandCount { expected: u8, got: u8 },
    UnknownOperandKind { raw: u32 },
    UnsupportedIndexRepresentation { rep: u32 },
    BadIndexDimension { dim: u32 },
    TruncatedOperand,
    BadCustomData,
}

struct Cursor<'a> {
    tokens: &'a [u32],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Result<u32, DecodeErrorKind> {
        let t = *self
            .tokens
            .get(self.pos)
            .ok_or(DecodeErrorKind::TruncatedOperand)?;
        self.pos += 1;
        Ok(t)
    }

    fn done(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

fn decode_operand(cur: &mut Cursor<'_>) -> Result<Operand, DecodeErrorKind> {
    let token0 = cur.next()?;

    let num_components = match token0 & OPERAND_NUM_COMPONENTS_MASK {
        0 => 0u8,
        1 => 1,
        2 => 4,
        other => {
            // N-component operands are not part of SM4/SM5.
            return Err(DecodeErrorKind::UnknownOperandKind { raw: other });
        }
    };

    let kind_raw = (token0 >> OPERAND_TYPE_SHIFT) & OPERAND_TYPE_MASK;
    let kind = OperandKind::from_u32(kind_raw)
        .ok_or(DecodeErrorKind::UnknownOperandKind { raw: kind_raw })?;

    let sel_bits = (token0 >> OPERAND_COMPONENT_SELECTION_SHIFT) & OPERAND_COMPONENT_SELECTION_MASK;
    let selection = if num_components == 0 {
        CompSelection::None
    } else if num_components == 1 {
        CompSelection::Select1(0)
    } else {
        match (token0 >> OPERAND_SELECTION_MODE_SHIFT) & OPERAND_SELECTION_MODE_MASK {
            OPERAND_SEL_MASK => CompSelection::Mask(CompMask::from_bits(sel_bits)),
            OPERAND_SEL_SWIZZLE => CompSelection::Swizzle(Swizzle::from_bits(sel_bits)),
            OPERAND_SEL_SELECT1 => CompSelection::Select1((sel_bits & 0x3) as u8),
            other => return Err(DecodeErrorKind::UnknownOperandKind { raw: other }),
        }
    };

    let index_dim = (token0 >> OPERAND_INDEX_DIMENSION_SHIFT) & OPERAND_INDEX_DIMENSION_MASK;
    if index_dim > 3 {
        return Err(DecodeErrorKind::BadIndexDimension { dim: index_dim });
    }

    // Extended operand tokens: modifiers, min precision, non-uniform.
    let mut modifier = OperandModifier::None;
    let mut min_precision = MinPrecision::Default;
    let mut non_uniform = false;
    let mut extended = token0 & OPERAND_EXTENDED_BIT != 0;
    while extended {
        let ext = cur.next()?;
        if ext & EXTENDED_OPERAND_TYPE_MASK == EXTENDED_OPERAND_MODIFIER {
            modifier = match (ext >> OPERAND_MODIFIER_SHIFT) & OPERAND_MODIFIER_MASK {
                0 => OperandModifier::None,
                1 => OperandModifier::Neg,
                2 => OperandModifier::Abs,
                3 => OperandModifier::AbsNeg,
                _ => OperandModifier::None,
            };
            min_precision = MinPrecision::from_bits(
                (ext >> OPERAND_MIN_PRECISION_SHIFT) & OPERAND_MIN_PRECISION_MASK,
            );
            non_uniform = ext & OPERAND_NON_UNIFORM_BIT != 0;
        }
        extended = ext & OPERAND_EXTENDED_BIT != 0;
    }

    // Immediate payloads.
    let mut imm = [0u32; 4];
    let mut imm64 = [0u64; 2];
    match kind {
        OperandKind::Imm32 => {
            let lanes = if num_components == 1 { 1 } else { 4 };
            for slot in imm.iter_mut().take(lanes) {
                *slot = cur.next()?;
            }
            if lanes == 1 {
                imm = [imm[0]; 4];
            }
        }
        OperandKind::Imm64 => {
            let lanes = if num_components == 1 { 1 } else { 2 };
            for slot in imm64.iter_mut().take(lanes) {
                let hi = cur.next()?;
                let lo = cur.next()?;
                *slot = ((hi as u64) << 32) | lo as u64;
            }
            if lanes == 1 {
                imm64 = [imm64[0]; 2];
            }
        }
        _ => {}
    }

    // Register indices.
    let reps = [
        (token0 >> OPERAND_INDEX0_REP_SHIFT) & OPERAND_INDEX_REP_MASK,
        (token0 >> OPERAND_INDEX1_REP_SHIFT) & OPERAND_INDEX_REP_MASK,
        (token0 >> OPERAND_INDEX2_REP_SHIFT) & OPERAND_INDEX_REP_MASK,
    ];
    let mut indices = Vec::with_capacity(index_dim as usize);
    for &rep in reps.iter().take(index_dim as usize) {
        let index = match rep {
            OPERAND_INDEX_REP_IMMEDIATE32 => OperandIndex::Imm32(cur.next()?),
            OPERAND_INDEX_REP_IMMEDIATE64 => {
                let hi = cur.next()?;
                let lo = cur.next()?;
                OperandIndex::Imm64(((hi as u64) << 32) | lo as u64)
            }
            OPERAND_INDEX_REP_RELATIVE => {
                OperandIndex::Relative(Box::new(decode_operand(cur)?))
            }
            OPERAND_INDEX_REP_IMMEDIATE32_PLUS_RELATIVE => {
                let base = cur.next()?;
                OperandIndex::Imm32PlusRelative(base, Box::new(decode_operand(cur)?))
            }
            other => return Err(DecodeErrorKind::UnsupportedIndexRepresentation { rep: other }),
        };
        indices.push(index);
    }

    Ok(Operand {
        kind,
        num_components,
        selection,
        modifier,
        min_precision,
        non_uniform,
        indices,
        imm,
        imm64,
    })
}

/// Decodes the whole program body.
pub fn decode_program(program: &Sm4Program) -> Result<Vec<Instruction>, DecodeError> {
    let tokens = &program.tokens;
    let mut pos = 2usize; // skip version + length header
    let mut out = Vec::new();

    while pos < tokens.len() {
        let token_offset = pos;
        let err = |kind| DecodeError { token_offset, kind };

        let token0 = tokens[pos];
        let raw_opcode = token0 & OPCODE_MASK;
        let opcode = Opcode::from_u32(raw_opcode)
            .ok_or_else(|| err(DecodeErrorKind::UnknownOpcode { raw: raw_opcode }))?;

        // Custom-data blocks carry their full length in the second token.
        if opcode.class() == OpcodeClass::CustomData {
            let class = token0 >> 11;
            let len = *tokens
                .get(pos + 1)
                .ok_or_else(|| err(DecodeErrorKind::BadCustomData))? as usize;
            if len < 2 || pos + len > tokens.len() {
                return Err(err(DecodeErrorKind::BadCustomData));
            }
            out.push(Instruction {
                opcode,
                token0,
                saturate: false,
                test_nonzero: false,
                precise_mask: CompMask::NONE,
                resinfo_return: ResInfoReturnType::Float,
                sample_offsets: [0; 3],
                extended_resource_dim: None,
                extended_resource_stride: 0,
                extended_return_type: None,
                operands: Vec::new(),
                custom: Some(CustomData {
                    class,
                    payload: tokens[pos + 2..pos + len].to_vec(),
                }),
                extra: Vec::new(),
                token_offset,
            });
            pos += len;
            continue;
        }

        let declared_len = ((token0 >> OPCODE_LEN_SHIFT) & OPCODE_LEN_MASK) as usize;
        if declared_len == 0 {
            return Err(err(DecodeErrorKind::ZeroLengthInstruction));
        }
        if pos + declared_len > tokens.len() {
            return Err(err(DecodeErrorKind::TruncatedInstruction {
                declared: declared_len,
                available: tokens.len() - pos,
            }));
        }

        let inst_tokens = &tokens[pos..pos + declared_len];
        let mut cur = Cursor {
            tokens: inst_tokens,
            pos: 1,
        };

        // Extended opcode tokens.
        let mut sample_offsets = [0i8; 3];
        let mut extended_resource_dim = None;
        let mut extended_resource_stride = 0;
        let mut extended_return_type = None;
        let mut extended = token0 & OPCODE_EXTENDED_BIT != 0;
        while extended {
            let ext = cur.next().map_err(err)?;
            match ext & 0x3f {
                EXTENDED_OPCODE_SAMPLE_CONTROLS => {
                    // 4-bit signed immediate offsets, u/v/w.
                    let field = |shift: u32| -> i8 {
                        let v = ((ext >> shift) & 0xf) as i8;
                        if v >= 8 {
                            v - 16
                        } else {
                            v
                        }
                    };
                    sample_offsets = [field(9), field(13), field(17)];
                }
                EXTENDED_OPCODE_RESOURCE_DIM => {
                    extended_resource_dim = Some(ResourceDim::from_bits((ext >> 6) & 0x1f));
                    extended_resource_stride = (ext >> 11) & 0xfff;
                }
                EXTENDED_OPCODE_RESOURCE_RETURN_TYPE => {
                    extended_return_type = Some((ext >> 6) & 0xffff);
                }
                _ => {}
            }
            extended = ext & OPCODE_EXTENDED_BIT != 0;
        }

        // Operands: fixed count for instruction forms; declarations carry a
        // leading operand where their form has one, with everything after it
        // stashed as payload.
        let mut operands = Vec::new();
        let mut extra = Vec::new();
        match opcode.info().operands {
            Some(count) => {
                for _ in 0..count {
                    if cur.done() {
                        return Err(err(DecodeErrorKind::BadOperandCount {
                            expected: count,
                            got: operands.len() as u8,
                        }));
                    }
                    operands.push(decode_operand(&mut cur).map_err(err)?);
                }
                // Tolerate trailing tokens (forward-compat controls).
                while !cur.done() {
                    extra.push(cur.next().map_err(err)?);
                }
            }
            None => {
                if decl_has_leading_operand(opcode) && !cur.done() {
                    operands.push(decode_operand(&mut cur).map_err(err)?);
                }
                while !cur.done() {
                    extra.push(cur.next().map_err(err)?);
                }
            }
        }

        out.push(Instruction {
            opcode,
            token0,
            saturate: token0 & INSTRUCTION_SATURATE_BIT != 0,
            test_nonzero: token0 & INSTRUCTION_TEST_NONZERO_BIT != 0,
            precise_mask: CompMask::from_bits(
                (token0 >> INSTRUCTION_PRECISE_SHIFT) & INSTRUCTION_PRECISE_MASK,
            ),
            resinfo_return: match (token0 >> RESINFO_RETURN_TYPE_SHIFT) & RESINFO_RETURN_TYPE_MASK
            {
                1 => ResInfoReturnType::RcpFloat,
                2 => ResInfoReturnType::UInt,
                _ => ResInfoReturnType::Float,
            },
            sample_offsets,
            extended_resource_dim,
            extended_resource_stride,
            extended_return_type,
            operands,
            custom: None,
            extra,
            token_offset,
        });
        pos += declared_len;
    }

    Ok(out)
}

/// Whether a declaration opcode's first token after the header is an operand
/// (as opposed to raw payload DWORDs).
fn decl_has_leading_operand(opcode: Opcode) -> bool {
    use Opcode::*;
    matches!(
        opcode,
        DclResource
            | DclConstantBuffer
            | DclSampler
            | DclIndexRange
            | DclInput
            | DclInputSgv
            | DclInputSiv
            | DclInputPs
            | DclInputPsSgv
            | DclInputPsSiv
            | DclOutput
            | DclOutputSgv
            | DclOutputSiv
            | DclStream
            | DclUavTyped
            | DclUavRaw
            | DclUavStructured
            | DclTgsmRaw
            | DclTgsmStructured
            | DclResourceRaw
            | DclResourceStructured
    )
}
