//! The dx op intrinsic set and its compile-time property table.
//!
//! Every shader-level primitive the converter emits is a call to one of
//! these operations. The table records, per op: the stable opcode number
//! (DXIL 1.0 numbering), the intrinsic name fragment, a coarse class, the
//! argument count after the leading opcode immediate, the permitted overload
//! scalar types, and the memory attribute.

use crate::types::ScalarType;

/// Overload mask bits.
pub const OV_NONE: u16 = 0;
pub const OV_I1: u16 = 1 << 0;
pub const OV_I8: u16 = 1 << 1;
pub const OV_I16: u16 = 1 << 2;
pub const OV_I32: u16 = 1 << 3;
pub const OV_I64: u16 = 1 << 4;
pub const OV_F16: u16 = 1 << 5;
pub const OV_F32: u16 = 1 << 6;
pub const OV_F64: u16 = 1 << 7;

pub const OV_INTS: u16 = OV_I16 | OV_I32;
pub const OV_FLOATS: u16 = OV_F16 | OV_F32;

pub fn overload_bit(scalar: ScalarType) -> u16 {
    match scalar {
        ScalarType::I1 => OV_I1,
        ScalarType::I8 => OV_I8,
        ScalarType::I16 => OV_I16,
        ScalarType::I32 => OV_I32,
        ScalarType::I64 => OV_I64,
        ScalarType::F16 => OV_F16,
        ScalarType::F32 => OV_F32,
        ScalarType::F64 => OV_F64,
    }
}

/// Coarse operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxOpClass {
    TempReg,
    LoadInput,
    StoreOutput,
    Unary,
    UnaryBits,
    IsSpecialFloat,
    Binary,
    BinaryWithTwoOuts,
    BinaryWithCarry,
    Tertiary,
    Quaternary,
    Dot,
    Handle,
    CBuffer,
    Sample,
    ResourceLoad,
    ResourceStore,
    ResourceQuery,
    Gather,
    Atomic,
    Sync,
    Pixel,
    Derivative,
    Eval,
    SvValue,
    GsStream,
    Double,
    HullDomain,
    Wave,
    Quad,
    Bitcast,
    LegacyConv,
}

/// Memory behavior attribute of the op's declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxOpAttr {
    ReadNone,
    ReadOnly,
    None,
}

macro_rules! dxops {
    ($(($variant:ident, $value:expr, $name:expr, $class:ident, $arity:expr, $overloads:expr, $attr:ident),)+) => {
        /// DXIL operation, numbered per DXIL 1.0.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum DxOp {
            $($variant = $value,)+
        }

        impl DxOp {
            pub fn from_u32(v: u32) -> Option<DxOp> {
                match v {
                    $($value => Some(DxOp::$variant),)+
                    _ => None,
                }
            }

            /// Intrinsic name fragment (`dx.op.<name>[.<overload>]`).
            pub fn name(self) -> &'static str {
                match self {
                    $(DxOp::$variant => $name,)+
                }
            }

            pub fn class(self) -> DxOpClass {
                match self {
                    $(DxOp::$variant => DxOpClass::$class,)+
                }
            }

            /// Argument count, excluding the leading opcode immediate.
            pub fn arity(self) -> usize {
                match self {
                    $(DxOp::$variant => $arity,)+
                }
            }

            /// Permitted overload scalar types; `OV_NONE` for non-overloaded
            /// ops.
            pub fn overloads(self) -> u16 {
                match self {
                    $(DxOp::$variant => $overloads,)+
                }
            }

            pub fn attr(self) -> DxOpAttr {
                match self {
                    $(DxOp::$variant => DxOpAttr::$attr,)+
                }
            }
        }
    };
}

dxops! {
    (TempRegLoad, 0, "tempRegLoad", TempReg, 1, OV_F16 | OV_F32 | OV_I16 | OV_I32, ReadOnly),
    (TempRegStore, 1, "tempRegStore", TempReg, 2, OV_F16 | OV_F32 | OV_I16 | OV_I32, None),
    (MinPrecXRegLoad, 2, "minPrecXRegLoad", TempReg, 3, OV_F16 | OV_I16, ReadOnly),
    (MinPrecXRegStore, 3, "minPrecXRegStore", TempReg, 4, OV_F16 | OV_I16, None),
    (LoadInput, 4, "loadInput", LoadInput, 4, OV_F16 | OV_F32 | OV_I16 | OV_I32, ReadNone),
    (StoreOutput, 5, "storeOutput", StoreOutput, 4, OV_F16 | OV_F32 | OV_I16 | OV_I32, None),
    (FAbs, 6, "fAbs", Unary, 1, OV_FLOATS | OV_F64, ReadNone),
    (Saturate, 7, "saturate", Unary, 1, OV_FLOATS | OV_F64, ReadNone),
    (IsNaN, 8, "isNaN", IsSpecialFloat, 1, OV_FLOATS, ReadNone),
    (IsInf, 9, "isInf", IsSpecialFloat, 1, OV_FLOATS, ReadNone),
    (IsFinite, 10, "isFinite", IsSpecialFloat, 1, OV_FLOATS, ReadNone),
    (IsNormal, 11, "isNormal", IsSpecialFloat, 1, OV_FLOATS, ReadNone),
    (Cos, 12, "cos", Unary, 1, OV_FLOATS, ReadNone),
    (Sin, 13, "sin", Unary, 1, OV_FLOATS, ReadNone),
    (Tan, 14, "tan", Unary, 1, OV_FLOATS, ReadNone),
    (Acos, 15, "acos", Unary, 1, OV_FLOATS, ReadNone),
    (Asin, 16, "asin", Unary, 1, OV_FLOATS, ReadNone),
    (Atan, 17, "atan", Unary, 1, OV_FLOATS, ReadNone),
    (Hcos, 18, "hcos", Unary, 1, OV_FLOATS, ReadNone),
    (Hsin, 19, "hsin", Unary, 1, OV_FLOATS, ReadNone),
    (Htan, 20, "htan", Unary, 1, OV_FLOATS, ReadNone),
    (Exp, 21, "exp", Unary, 1, OV_FLOATS, ReadNone),
    (Frc, 22, "frc", Unary, 1, OV_FLOATS, ReadNone),
    (Log, 23, "log", Unary, 1, OV_FLOATS, ReadNone),
    (Sqrt, 24, "sqrt", Unary, 1, OV_FLOATS, ReadNone),
    (Rsqrt, 25, "rsqrt", Unary, 1, OV_FLOATS, ReadNone),
    (RoundNe, 26, "round_ne", Unary, 1, OV_FLOATS, ReadNone),
    (RoundNi, 27, "round_ni", Unary, 1, OV_FLOATS, ReadNone),
    (RoundPz, 28, "round_pz", Unary, 1, OV_FLOATS, ReadNone),
    (RoundZ, 29, "round_z", Unary, 1, OV_FLOATS, ReadNone),
    (Bfrev, 30, "bfrev", UnaryBits, 1, OV_INTS | OV_I64, ReadNone),
    (Countbits, 31, "countbits", UnaryBits, 1, OV_INTS | OV_I64, ReadNone),
    (FirstbitLo, 32, "firstbitLo", UnaryBits, 1, OV_INTS | OV_I64, ReadNone),
    (FirstbitHi, 33, "firstbitHi", UnaryBits, 1, OV_INTS | OV_I64, ReadNone),
    (FirstbitSHi, 34, "firstbitSHi", UnaryBits, 1, OV_INTS | OV_I64, ReadNone),
    (FMax, 35, "fMax", Binary, 2, OV_FLOATS | OV_F64, ReadNone),
    (FMin, 36, "fMin", Binary, 2, OV_FLOATS | OV_F64, ReadNone),
    (IMax, 37, "iMax", Binary, 2, OV_INTS | OV_I64, ReadNone),
    (IMin, 38, "iMin", Binary, 2, OV_INTS | OV_I64, ReadNone),
    (UMax, 39, "uMax", Binary, 2, OV_INTS | OV_I64, ReadNone),
    (UMin, 40, "uMin", Binary, 2, OV_INTS | OV_I64, ReadNone),
    (IMul, 41, "iMul", BinaryWithTwoOuts, 2, OV_I32, ReadNone),
    (UMul, 42, "uMul", BinaryWithTwoOuts, 2, OV_I32, ReadNone),
    (UDiv, 43, "uDiv", BinaryWithTwoOuts, 2, OV_I32, ReadNone),
    (UAddc, 44, "uAddc", BinaryWithCarry, 2, OV_I32, ReadNone),
    (USubb, 45, "uSubb", BinaryWithCarry, 2, OV_I32, ReadNone),
    (FMad, 46, "fMad", Tertiary, 3, OV_FLOATS | OV_F64, ReadNone),
    (Fma, 47, "fma", Tertiary, 3, OV_F64, ReadNone),
    (IMad, 48, "iMad", Tertiary, 3, OV_INTS | OV_I64, ReadNone),
    (UMad, 49, "uMad", Tertiary, 3, OV_INTS | OV_I64, ReadNone),
    (Msad, 50, "msad", Tertiary, 3, OV_I32, ReadNone),
    (Ibfe, 51, "ibfe", Tertiary, 3, OV_I32, ReadNone),
    (Ubfe, 52, "ubfe", Tertiary, 3, OV_I32, ReadNone),
    (Bfi, 53, "bfi", Quaternary, 4, OV_I32, ReadNone),
    (Dot2, 54, "dot2", Dot, 4, OV_FLOATS, ReadNone),
    (Dot3, 55, "dot3", Dot, 6, OV_FLOATS, ReadNone),
    (Dot4, 56, "dot4", Dot, 8, OV_FLOATS, ReadNone),
    (CreateHandle, 57, "createHandle", Handle, 4, OV_NONE, ReadOnly),
    (CBufferLoad, 58, "cbufferLoad", CBuffer, 3, OV_FLOATS | OV_F64 | OV_INTS | OV_I64, ReadOnly),
    (CBufferLoadLegacy, 59, "cbufferLoadLegacy", CBuffer, 2, OV_F32 | OV_F64 | OV_I32, ReadOnly),
    (Sample, 60, "sample", Sample, 10, OV_FLOATS, ReadOnly),
    (SampleBias, 61, "sampleBias", Sample, 11, OV_FLOATS, ReadOnly),
    (SampleLevel, 62, "sampleLevel", Sample, 10, OV_FLOATS, ReadOnly),
    (SampleGrad, 63, "sampleGrad", Sample, 16, OV_FLOATS, ReadOnly),
    (SampleCmp, 64, "sampleCmp", Sample, 11, OV_FLOATS, ReadOnly),
    (SampleCmpLevelZero, 65, "sampleCmpLevelZero", Sample, 10, OV_FLOATS, ReadOnly),
    (TextureLoad, 66, "textureLoad", ResourceLoad, 8, OV_FLOATS | OV_INTS, ReadOnly),
    (TextureStore, 67, "textureStore", ResourceStore, 9, OV_FLOATS | OV_INTS, None),
    (BufferLoad, 68, "bufferLoad", ResourceLoad, 3, OV_FLOATS | OV_INTS, ReadOnly),
    (BufferStore, 69, "bufferStore", ResourceStore, 8, OV_FLOATS | OV_INTS, None),
    (BufferUpdateCounter, 70, "bufferUpdateCounter", Atomic, 2, OV_NONE, None),
    (CheckAccessFullyMapped, 71, "checkAccessFullyMapped", ResourceQuery, 1, OV_I32, ReadOnly),
    (GetDimensions, 72, "getDimensions", ResourceQuery, 2, OV_NONE, ReadOnly),
    (TextureGather, 73, "textureGather", Gather, 9, OV_FLOATS | OV_INTS, ReadOnly),
    (TextureGatherCmp, 74, "textureGatherCmp", Gather, 10, OV_FLOATS | OV_INTS, ReadOnly),
    (Texture2DMSGetSamplePosition, 75, "texture2DMSGetSamplePosition", ResourceQuery, 2, OV_NONE, ReadOnly),
    (RenderTargetGetSamplePosition, 76, "renderTargetGetSamplePosition", ResourceQuery, 1, OV_NONE, ReadOnly),
    (RenderTargetGetSampleCount, 77, "renderTargetGetSampleCount", ResourceQuery, 0, OV_NONE, ReadOnly),
    (AtomicBinOp, 78, "atomicBinOp", Atomic, 6, OV_I32, None),
    (AtomicCompareExchange, 79, "atomicCompareExchange", Atomic, 6, OV_I32, None),
    (Barrier, 80, "barrier", Sync, 1, OV_NONE, None),
    (CalculateLOD, 81, "calculateLOD", Pixel, 6, OV_F32, ReadOnly),
    (Discard, 82, "discard", Pixel, 1, OV_NONE, None),
    (DerivCoarseX, 83, "derivCoarseX", Derivative, 1, OV_FLOATS, ReadNone),
    (DerivCoarseY, 84, "derivCoarseY", Derivative, 1, OV_FLOATS, ReadNone),
    (DerivFineX, 85, "derivFineX", Derivative, 1, OV_FLOATS, ReadNone),
    (DerivFineY, 86, "derivFineY", Derivative, 1, OV_FLOATS, ReadNone),
    (EvalSnapped, 87, "evalSnapped", Eval, 5, OV_FLOATS, ReadNone),
    (EvalSampleIndex, 88, "evalSampleIndex", Eval, 4, OV_FLOATS, ReadNone),
    (EvalCentroid, 89, "evalCentroid", Eval, 3, OV_FLOATS, ReadNone),
    (SampleIndex, 90, "sampleIndex", SvValue, 0, OV_I32, ReadNone),
    (Coverage, 91, "coverage", SvValue, 0, OV_I32, ReadNone),
    (InnerCoverage, 92, "innerCoverage", SvValue, 0, OV_I32, ReadNone),
    (ThreadId, 93, "threadId", SvValue, 1, OV_I32, ReadNone),
    (GroupId, 94, "groupId", SvValue, 1, OV_I32, ReadNone),
    (ThreadIdInGroup, 95, "threadIdInGroup", SvValue, 1, OV_I32, ReadNone),
    (FlattenedThreadIdInGroup, 96, "flattenedThreadIdInGroup", SvValue, 0, OV_I32, ReadNone),
    (EmitStream, 97, "emitStream", GsStream, 1, OV_NONE, None),
    (CutStream, 98, "cutStream", GsStream, 1, OV_NONE, None),
    (EmitThenCutStream, 99, "emitThenCutStream", GsStream, 1, OV_NONE, None),
    (GSInstanceID, 100, "gsInstanceID", SvValue, 0, OV_I32, ReadNone),
    (MakeDouble, 101, "makeDouble", Double, 2, OV_F64, ReadNone),
    (SplitDouble, 102, "splitDouble", Double, 1, OV_F64, ReadNone),
    (LoadOutputControlPoint, 103, "loadOutputControlPoint", HullDomain, 4, OV_FLOATS | OV_INTS, ReadNone),
    (LoadPatchConstant, 104, "loadPatchConstant", HullDomain, 3, OV_FLOATS | OV_INTS, ReadNone),
    (DomainLocation, 105, "domainLocation", HullDomain, 1, OV_F32, ReadNone),
    (StorePatchConstant, 106, "storePatchConstant", HullDomain, 4, OV_FLOATS | OV_INTS, None),
    (OutputControlPointID, 107, "outputControlPointID", SvValue, 0, OV_I32, ReadNone),
    (PrimitiveID, 108, "primitiveID", SvValue, 0, OV_I32, ReadNone),
    (CycleCounterLegacy, 109, "cycleCounterLegacy", SvValue, 0, OV_NONE, None),
    (WaveIsFirstLane, 110, "waveIsFirstLane", Wave, 0, OV_NONE, None),
    (WaveGetLaneIndex, 111, "waveGetLaneIndex", Wave, 0, OV_NONE, None),
    (WaveGetLaneCount, 112, "waveGetLaneCount", Wave, 0, OV_NONE, None),
    (WaveAnyTrue, 113, "waveAnyTrue", Wave, 1, OV_NONE, None),
    (WaveAllTrue, 114, "waveAllTrue", Wave, 1, OV_NONE, None),
    (WaveActiveAllEqual, 115, "waveActiveAllEqual", Wave, 1, OV_FLOATS | OV_INTS | OV_I64 | OV_F64 | OV_I1, None),
    (WaveActiveBallot, 116, "waveActiveBallot", Wave, 1, OV_NONE, None),
    (WaveReadLaneAt, 117, "waveReadLaneAt", Wave, 2, OV_FLOATS | OV_INTS | OV_I64 | OV_F64 | OV_I1, None),
    (WaveReadLaneFirst, 118, "waveReadLaneFirst", Wave, 1, OV_FLOATS | OV_INTS | OV_I64 | OV_F64 | OV_I1, None),
    (WaveActiveOp, 119, "waveActiveOp", Wave, 3, OV_FLOATS | OV_INTS | OV_I64 | OV_F64 | OV_I1, None),
    (WaveActiveBit, 120, "waveActiveBit", Wave, 2, OV_INTS | OV_I64, None),
    (WavePrefixOp, 121, "wavePrefixOp", Wave, 3, OV_FLOATS | OV_INTS | OV_I64 | OV_F64, None),
    (QuadReadLaneAt, 122, "quadReadLaneAt", Quad, 2, OV_FLOATS | OV_INTS | OV_I64 | OV_F64 | OV_I1, None),
    (QuadOp, 123, "quadOp", Quad, 2, OV_FLOATS | OV_INTS | OV_I64 | OV_F64, None),
    (BitcastI16toF16, 124, "bitcastI16toF16", Bitcast, 1, OV_NONE, ReadNone),
    (BitcastF16toI16, 125, "bitcastF16toI16", Bitcast, 1, OV_NONE, ReadNone),
    (BitcastI32toF32, 126, "bitcastI32toF32", Bitcast, 1, OV_NONE, ReadNone),
    (BitcastF32toI32, 127, "bitcastF32toI32", Bitcast, 1, OV_NONE, ReadNone),
    (BitcastI64toF64, 128, "bitcastI64toF64", Bitcast, 1, OV_NONE, ReadNone),
    (BitcastF64toI64, 129, "bitcastF64toI64", Bitcast, 1, OV_NONE, ReadNone),
    (LegacyF32ToF16, 130, "legacyF32ToF16", LegacyConv, 1, OV_NONE, ReadNone),
    (LegacyF16ToF32, 131, "legacyF16ToF32", LegacyConv, 1, OV_NONE, ReadNone),
    (LegacyDoubleToFloat, 132, "legacyDoubleToFloat", LegacyConv, 1, OV_NONE, ReadNone),
    (LegacyDoubleToSInt32, 133, "legacyDoubleToSInt32", LegacyConv, 1, OV_NONE, ReadNone),
    (LegacyDoubleToUInt32, 134, "legacyDoubleToUInt32", LegacyConv, 1, OV_NONE, ReadNone),
}

/// Atomic operation selector immediates for [`DxOp::AtomicBinOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AtomicBinOpCode {
    Add = 0,
    And = 1,
    Or = 2,
    Xor = 3,
    IMin = 4,
    IMax = 5,
    UMin = 6,
    UMax = 7,
    Exchange = 8,
}

/// Barrier mode bits composed by `sync` lowering.
pub mod barrier_mode {
    pub const SYNC_THREAD_GROUP: u32 = 1 << 0;
    pub const UAV_FENCE_GLOBAL: u32 = 1 << 1;
    pub const UAV_FENCE_THREAD_GROUP: u32 = 1 << 2;
    pub const TGSM_FENCE: u32 = 1 << 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_is_dense_through_134() {
        for v in 0..=134u32 {
            let op = DxOp::from_u32(v).expect("dx op table has a hole");
            assert_eq!(op as u32, v);
        }
        assert!(DxOp::from_u32(135).is_none());
    }

    #[test]
    fn sample_family_shapes() {
        assert_eq!(DxOp::Sample.arity(), 10);
        assert_eq!(DxOp::SampleGrad.arity(), 16);
        assert_eq!(DxOp::Dot4.arity(), 8);
        assert_eq!(DxOp::CreateHandle.attr(), DxOpAttr::ReadOnly);
        assert_eq!(DxOp::TempRegStore.attr(), DxOpAttr::None);
    }
}
