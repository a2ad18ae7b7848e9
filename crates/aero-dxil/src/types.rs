//! IR types.
//!
//! Besides scalars, pointers, and arrays, the type system carries the fixed
//! aggregate shapes that dx ops return: `ResRet` (resource load/sample
//! results plus a status word), `CBufRet` (one legacy constant-buffer row),
//! `Dimensions`, `SplitDouble`, and the two-output/carry arithmetic pairs.

use crate::module::AddressSpace;

/// Scalar value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    I1,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl ScalarType {
    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F16 | ScalarType::F32 | ScalarType::F64)
    }

    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    pub fn bit_width(self) -> u32 {
        match self {
            ScalarType::I1 => 1,
            ScalarType::I8 => 8,
            ScalarType::I16 | ScalarType::F16 => 16,
            ScalarType::I32 | ScalarType::F32 => 32,
            ScalarType::I64 | ScalarType::F64 => 64,
        }
    }

    /// Name fragment used in overloaded intrinsic names (`.f32`, `.i32`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            ScalarType::I1 => "i1",
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::F16 => "f16",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        }
    }
}

/// Full type of an IR value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Scalar(ScalarType),
    /// Opaque resource handle.
    Handle,
    Ptr(Box<Type>, AddressSpace),
    Array(Box<Type>, u32),
    /// `{ T, T, T, T, i32 status }` — resource load/sample result.
    ResRet(ScalarType),
    /// `{ T, T, T, T }` — one legacy constant-buffer row.
    CBufRet(ScalarType),
    /// `{ i32, i32, i32, i32 }` — GetDimensions result.
    Dimensions,
    /// `{ i32 lo, i32 hi }` — SplitDouble result.
    SplitDouble,
    /// `{ T, T }` — two-output arithmetic (imul/umul/udiv).
    Pair(ScalarType),
    /// `{ i32, i1 }` — add/sub with carry/borrow.
    Carry,
    /// `{ f32, f32 }` — sample position.
    SamplePos,
}

impl Type {
    pub const I1: Type = Type::Scalar(ScalarType::I1);
    pub const I8: Type = Type::Scalar(ScalarType::I8);
    pub const I16: Type = Type::Scalar(ScalarType::I16);
    pub const I32: Type = Type::Scalar(ScalarType::I32);
    pub const I64: Type = Type::Scalar(ScalarType::I64);
    pub const F16: Type = Type::Scalar(ScalarType::F16);
    pub const F32: Type = Type::Scalar(ScalarType::F32);
    pub const F64: Type = Type::Scalar(ScalarType::F64);

    pub fn ptr(elem: Type, space: AddressSpace) -> Type {
        Type::Ptr(Box::new(elem), space)
    }

    pub fn array(elem: Type, count: u32) -> Type {
        Type::Array(Box::new(elem), count)
    }

    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            Type::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn is_float(&self) -> bool {
        self.as_scalar().is_some_and(ScalarType::is_float)
    }

    pub fn is_integer(&self) -> bool {
        self.as_scalar().is_some_and(ScalarType::is_integer)
    }

    /// Element type at `index` of an aggregate, for `extractvalue` typing.
    pub fn aggregate_elem(&self, index: u32) -> Option<Type> {
        match self {
            Type::ResRet(s) => Some(if index < 4 {
                Type::Scalar(*s)
            } else if index == 4 {
                Type::I32
            } else {
                return None;
            }),
            Type::CBufRet(s) => (index < 4).then(|| Type::Scalar(*s)),
            Type::Dimensions => (index < 4).then_some(Type::I32),
            Type::SplitDouble => (index < 2).then_some(Type::I32),
            Type::Pair(s) => (index < 2).then(|| Type::Scalar(*s)),
            Type::Carry => match index {
                0 => Some(Type::I32),
                1 => Some(Type::I1),
                _ => None,
            },
            Type::SamplePos => (index < 2).then_some(Type::F32),
            Type::Array(elem, count) => (index < *count).then(|| (**elem).clone()),
            _ => None,
        }
    }
}
