//! SM4/SM5 shader program token stream.
//!
//! The shader code chunk (`SHDR`/`SHEX`) is a stream of little-endian DWORD
//! tokens. The first token encodes program type and shader model, the second
//! the total declared length in DWORDs; everything after that is the
//! declaration and instruction stream decoded by [`decode`].

use thiserror::Error;

use crate::{DxbcFile, FourCC};

pub mod decode;
pub mod disasm;
pub mod opcode;

pub use decode::{
    decode_program, CustomData, DecodeError, DecodeErrorKind, Instruction, Operand, OperandIndex,
    OperandKind, OperandModifier,
};
pub use disasm::disassemble;
pub use opcode::{Opcode, OpcodeClass, OpcodeInfo};

/// Shader pipeline stage, from the version token's program-type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Pixel,
    Vertex,
    Geometry,
    Hull,
    Domain,
    Compute,
}

impl ShaderStage {
    pub fn from_program_type(ty: u32) -> Option<ShaderStage> {
        match ty {
            0 => Some(ShaderStage::Pixel),
            1 => Some(ShaderStage::Vertex),
            2 => Some(ShaderStage::Geometry),
            3 => Some(ShaderStage::Hull),
            4 => Some(ShaderStage::Domain),
            5 => Some(ShaderStage::Compute),
            _ => None,
        }
    }

    pub fn program_type(self) -> u32 {
        match self {
            ShaderStage::Pixel => 0,
            ShaderStage::Vertex => 1,
            ShaderStage::Geometry => 2,
            ShaderStage::Hull => 3,
            ShaderStage::Domain => 4,
            ShaderStage::Compute => 5,
        }
    }
}

/// Shader model version, e.g. 5.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}

impl ShaderModel {
    /// SM 5.1 switched resource declarations to explicit range-ID + bounds +
    /// register-space form; several converter paths key off this.
    pub fn is_51_plus(self) -> bool {
        self >= ShaderModel { major: 5, minor: 1 }
    }
}

/// Errors produced while locating and framing the token stream.
#[derive(Debug, Error)]
pub enum Sm4Error {
    #[error("container has no SHDR/SHEX chunk")]
    MissingShaderChunk,
    #[error("shader chunk length {len} is not a whole number of DWORD tokens")]
    MisalignedTokens { len: usize },
    #[error("token stream has {dwords} DWORDs; need at least 2 for the program header")]
    TooShort { dwords: usize },
    #[error("declared length {declared} DWORDs exceeds the {available} available")]
    DeclaredLengthOutOfBounds { declared: usize, available: usize },
    #[error("declared length {declared} DWORDs cannot hold the program header")]
    DeclaredLengthTooSmall { declared: usize },
    #[error("unknown program type {program_type} in version token")]
    UnknownProgramType { program_type: u32 },
    #[error("shader model {major}.{minor} is outside the supported 4.0-5.1 range")]
    UnsupportedModel { major: u8, minor: u8 },
    #[error("failed to reserve {bytes} bytes for the token stream")]
    OutOfMemory { bytes: usize },
}

/// A framed shader program: stage, model, and the full token stream
/// (including the two header DWORDs, which instruction offsets are relative
/// to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sm4Program {
    pub stage: ShaderStage,
    pub model: ShaderModel,
    pub tokens: Vec<u32>,
}

impl Sm4Program {
    /// Extracts the program from a parsed container, preferring `SHEX` over
    /// `SHDR`.
    pub fn parse_from_dxbc(dxbc: &DxbcFile<'_>) -> Result<Sm4Program, Sm4Error> {
        let chunk = dxbc
            .find_first_shader_chunk()
            .ok_or(Sm4Error::MissingShaderChunk)?;
        Self::parse_program_tokens(chunk.data)
    }

    /// Frames a raw shader-code blob (the payload of a `SHDR`/`SHEX` chunk,
    /// or the raw token array handed over by a driver).
    ///
    /// The declared length truncates any trailing bytes; a declared length
    /// past the end of the blob is an error.
    pub fn parse_program_tokens(bytes: &[u8]) -> Result<Sm4Program, Sm4Error> {
        if bytes.len() % 4 != 0 {
            return Err(Sm4Error::MisalignedTokens { len: bytes.len() });
        }
        let available = bytes.len() / 4;
        if available < 2 {
            return Err(Sm4Error::TooShort { dwords: available });
        }

        let version = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let declared = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        if declared < 2 {
            return Err(Sm4Error::DeclaredLengthTooSmall { declared });
        }
        if declared > available {
            return Err(Sm4Error::DeclaredLengthOutOfBounds {
                declared,
                available,
            });
        }

        let program_type = version >> 16;
        let stage = ShaderStage::from_program_type(program_type)
            .ok_or(Sm4Error::UnknownProgramType { program_type })?;
        let model = ShaderModel {
            major: ((version >> 4) & 0xf) as u8,
            minor: (version & 0xf) as u8,
        };
        if model < (ShaderModel { major: 4, minor: 0 })
            || model > (ShaderModel { major: 5, minor: 1 })
        {
            return Err(Sm4Error::UnsupportedModel {
                major: model.major,
                minor: model.minor,
            });
        }

        // The declared length is attacker-controlled; reserve fallibly so a
        // hostile header cannot abort the process.
        let mut tokens = Vec::new();
        tokens
            .try_reserve_exact(declared)
            .map_err(|_| Sm4Error::OutOfMemory {
                bytes: declared * 4,
            })?;
        for i in 0..declared {
            tokens.push(u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap()));
        }
        Ok(Sm4Program {
            stage,
            model,
            tokens,
        })
    }

    /// Frames a driver-supplied DWORD array whose second token carries the
    /// total size in DWORDs.
    pub fn parse_token_slice(tokens: &[u32]) -> Result<Sm4Program, Sm4Error> {
        if tokens.len() < 2 {
            return Err(Sm4Error::TooShort {
                dwords: tokens.len(),
            });
        }
        let mut bytes = Vec::with_capacity(tokens.len() * 4);
        for &t in tokens {
            bytes.extend_from_slice(&t.to_le_bytes());
        }
        Self::parse_program_tokens(&bytes)
    }

    /// Body tokens after the two-DWORD program header.
    pub fn body(&self) -> &[u32] {
        &self.tokens[2..]
    }

    pub fn code_chunk_fourcc(&self) -> FourCC {
        if self.model.major >= 5 {
            FourCC::SHEX
        } else {
            FourCC::SHDR
        }
    }
}
