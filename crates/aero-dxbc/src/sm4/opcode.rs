//! SM4/SM5 opcode numbering, token field layout, and the static opcode
//! property table.
//!
//! Token layout reference (all in the leading opcode token):
//!
//! - bits 0..=10: opcode
//! - bits 11..=23: opcode-specific controls (saturate, boolean test, precise
//!   mask, resinfo return type, sync flags, resource dimension, ...)
//! - bits 24..=30: instruction length in DWORDs, including all tokens
//! - bit 31: an extended opcode token follows

/// Shift of the instruction length field in the opcode token.
pub const OPCODE_LEN_SHIFT: u32 = 24;
pub const OPCODE_LEN_MASK: u32 = 0x7f;
/// "Another opcode token follows" bit.
pub const OPCODE_EXTENDED_BIT: u32 = 1 << 31;
pub const OPCODE_MASK: u32 = 0x7ff;

/// Saturate result modifier (arithmetic instructions).
pub const INSTRUCTION_SATURATE_BIT: u32 = 1 << 13;
/// Boolean test polarity for conditional instructions: set = test nonzero.
pub const INSTRUCTION_TEST_NONZERO_BIT: u32 = 1 << 18;
/// Per-component precise mask (SM5), bits 19..=22.
pub const INSTRUCTION_PRECISE_SHIFT: u32 = 19;
pub const INSTRUCTION_PRECISE_MASK: u32 = 0xf;

/// `resinfo` return type modifier, bits 11..=12.
pub const RESINFO_RETURN_TYPE_SHIFT: u32 = 11;
pub const RESINFO_RETURN_TYPE_MASK: u32 = 0x3;

/// `sync` flags, bits 11..=14.
pub const SYNC_THREADS_IN_GROUP: u32 = 1 << 11;
pub const SYNC_TGSM_MEMORY: u32 = 1 << 12;
pub const SYNC_UAV_MEMORY_GROUP: u32 = 1 << 13;
pub const SYNC_UAV_MEMORY_GLOBAL: u32 = 1 << 14;

/// Resource dimension for `dcl_resource*`/`dcl_uav*`, bits 11..=15.
pub const RESOURCE_DIM_SHIFT: u32 = 11;
pub const RESOURCE_DIM_MASK: u32 = 0x1f;
/// Multisample count for Texture2DMS declarations, bits 16..=22.
pub const RESOURCE_SAMPLE_COUNT_SHIFT: u32 = 16;
pub const RESOURCE_SAMPLE_COUNT_MASK: u32 = 0x7f;

/// Interpolation mode for `dcl_input_ps*`, bits 11..=14.
pub const INTERPOLATION_MODE_SHIFT: u32 = 11;
pub const INTERPOLATION_MODE_MASK: u32 = 0xf;

/// Sampler mode for `dcl_sampler`, bits 11..=14.
pub const SAMPLER_MODE_SHIFT: u32 = 11;
pub const SAMPLER_MODE_MASK: u32 = 0xf;

/// Global flags declaration carries its flags in bits 11..=23.
pub const GLOBAL_FLAGS_SHIFT: u32 = 11;
pub const GLOBAL_FLAGS_MASK: u32 = 0x1fff;

/// `dcl_constantbuffer` access pattern bit: set = dynamically indexed.
pub const CB_ACCESS_PATTERN_DYNAMIC_BIT: u32 = 1 << 11;

/// UAV declaration flag bits.
pub const UAV_GLOBALLY_COHERENT_BIT: u32 = 1 << 16;
pub const UAV_RASTERIZER_ORDERED_BIT: u32 = 1 << 17;
pub const UAV_HAS_COUNTER_BIT: u32 = 1 << 23;

/// `dcl_interface` dynamically-indexed bit.
pub const INTERFACE_DYNAMIC_INDEXED_BIT: u32 = 1 << 11;

/// Tessellator domain/partitioning/output primitive, bits 11..=13 / 11..=14.
pub const TESS_DOMAIN_SHIFT: u32 = 11;
pub const TESS_DOMAIN_MASK: u32 = 0x3;
pub const TESS_PARTITIONING_SHIFT: u32 = 11;
pub const TESS_PARTITIONING_MASK: u32 = 0x7;
pub const TESS_OUTPUT_PRIMITIVE_SHIFT: u32 = 11;
pub const TESS_OUTPUT_PRIMITIVE_MASK: u32 = 0x7;
/// Control point counts, bits 11..=16.
pub const CONTROL_POINT_COUNT_SHIFT: u32 = 11;
pub const CONTROL_POINT_COUNT_MASK: u32 = 0x3f;
/// GS input primitive / output topology, bits 11..=16.
pub const GS_PRIMITIVE_SHIFT: u32 = 11;
pub const GS_PRIMITIVE_MASK: u32 = 0x3f;

/// Extended opcode token types (bits 0..=5 of the extension token).
pub const EXTENDED_OPCODE_EMPTY: u32 = 0;
pub const EXTENDED_OPCODE_SAMPLE_CONTROLS: u32 = 1;
pub const EXTENDED_OPCODE_RESOURCE_DIM: u32 = 2;
pub const EXTENDED_OPCODE_RESOURCE_RETURN_TYPE: u32 = 3;

/// Custom-data class tokens (second DWORD of a `customdata` block).
pub const CUSTOMDATA_CLASS_COMMENT: u32 = 0;
pub const CUSTOMDATA_CLASS_DEBUG_INFO: u32 = 1;
pub const CUSTOMDATA_CLASS_OPAQUE: u32 = 2;
pub const CUSTOMDATA_CLASS_IMMEDIATE_CONSTANT_BUFFER: u32 = 3;
pub const CUSTOMDATA_CLASS_SHADER_MESSAGE: u32 = 4;

macro_rules! opcodes {
    ($(($variant:ident, $value:expr, $name:expr, $class:expr),)+) => {
        /// Every SM 4.0-5.1 opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum Opcode {
            $($variant = $value,)+
        }

        impl Opcode {
            pub fn from_u32(v: u32) -> Option<Opcode> {
                match v {
                    $($value => Some(Opcode::$variant),)+
                    _ => None,
                }
            }

            /// Mnemonic as it appears in disassembly.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)+
                }
            }

            pub fn class(self) -> OpcodeClass {
                match self {
                    $(Opcode::$variant => $class,)+
                }
            }
        }
    };
}

/// Coarse grouping used by the decoder and the analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeClass {
    /// Arithmetic, logic, conversion, comparison, resource access.
    Normal,
    /// Structured control flow and call/ret.
    Flow,
    /// Declaration; consumed by the analysis pass, never lowered directly.
    Decl,
    /// Custom-data block with its own length framing.
    CustomData,
}

use OpcodeClass::{CustomData as CD, Decl, Flow, Normal};

opcodes! {
    (Add, 0, "add", Normal),
    (And, 1, "and", Normal),
    (Break, 2, "break", Flow),
    (Breakc, 3, "breakc", Flow),
    (Call, 4, "call", Flow),
    (Callc, 5, "callc", Flow),
    (Case, 6, "case", Flow),
    (Continue, 7, "continue", Flow),
    (Continuec, 8, "continuec", Flow),
    (Cut, 9, "cut", Normal),
    (Default, 10, "default", Flow),
    (DerivRtx, 11, "deriv_rtx", Normal),
    (DerivRty, 12, "deriv_rty", Normal),
    (Discard, 13, "discard", Normal),
    (Div, 14, "div", Normal),
    (Dp2, 15, "dp2", Normal),
    (Dp3, 16, "dp3", Normal),
    (Dp4, 17, "dp4", Normal),
    (Else, 18, "else", Flow),
    (Emit, 19, "emit", Normal),
    (EmitThenCut, 20, "emitthencut", Normal),
    (EndIf, 21, "endif", Flow),
    (EndLoop, 22, "endloop", Flow),
    (EndSwitch, 23, "endswitch", Flow),
    (Eq, 24, "eq", Normal),
    (Exp, 25, "exp", Normal),
    (Frc, 26, "frc", Normal),
    (Ftoi, 27, "ftoi", Normal),
    (Ftou, 28, "ftou", Normal),
    (Ge, 29, "ge", Normal),
    (IAdd, 30, "iadd", Normal),
    (If, 31, "if", Flow),
    (IEq, 32, "ieq", Normal),
    (IGe, 33, "ige", Normal),
    (ILt, 34, "ilt", Normal),
    (IMad, 35, "imad", Normal),
    (IMax, 36, "imax", Normal),
    (IMin, 37, "imin", Normal),
    (IMul, 38, "imul", Normal),
    (INe, 39, "ine", Normal),
    (INeg, 40, "ineg", Normal),
    (IShl, 41, "ishl", Normal),
    (IShr, 42, "ishr", Normal),
    (Itof, 43, "itof", Normal),
    (Label, 44, "label", Flow),
    (Ld, 45, "ld", Normal),
    (LdMs, 46, "ld_ms", Normal),
    (Log, 47, "log", Normal),
    (Loop, 48, "loop", Flow),
    (Lt, 49, "lt", Normal),
    (Mad, 50, "mad", Normal),
    (Min, 51, "min", Normal),
    (Max, 52, "max", Normal),
    (CustomData, 53, "customdata", CD),
    (Mov, 54, "mov", Normal),
    (Movc, 55, "movc", Normal),
    (Mul, 56, "mul", Normal),
    (Ne, 57, "ne", Normal),
    (Nop, 58, "nop", Normal),
    (Not, 59, "not", Normal),
    (Or, 60, "or", Normal),
    (ResInfo, 61, "resinfo", Normal),
    (Ret, 62, "ret", Flow),
    (Retc, 63, "retc", Flow),
    (RoundNe, 64, "round_ne", Normal),
    (RoundNi, 65, "round_ni", Normal),
    (RoundPi, 66, "round_pi", Normal),
    (RoundZ, 67, "round_z", Normal),
    (Rsq, 68, "rsq", Normal),
    (Sample, 69, "sample", Normal),
    (SampleC, 70, "sample_c", Normal),
    (SampleCLz, 71, "sample_c_lz", Normal),
    (SampleL, 72, "sample_l", Normal),
    (SampleD, 73, "sample_d", Normal),
    (SampleB, 74, "sample_b", Normal),
    (Sqrt, 75, "sqrt", Normal),
    (Switch, 76, "switch", Flow),
    (SinCos, 77, "sincos", Normal),
    (UDiv, 78, "udiv", Normal),
    (ULt, 79, "ult", Normal),
    (UGe, 80, "uge", Normal),
    (UMul, 81, "umul", Normal),
    (UMad, 82, "umad", Normal),
    (UMax, 83, "umax", Normal),
    (UMin, 84, "umin", Normal),
    (UShr, 85, "ushr", Normal),
    (Utof, 86, "utof", Normal),
    (Xor, 87, "xor", Normal),
    (DclResource, 88, "dcl_resource", Decl),
    (DclConstantBuffer, 89, "dcl_constantbuffer", Decl),
    (DclSampler, 90, "dcl_sampler", Decl),
    (DclIndexRange, 91, "dcl_indexrange", Decl),
    (DclGsOutputPrimitiveTopology, 92, "dcl_outputtopology", Decl),
    (DclGsInputPrimitive, 93, "dcl_inputprimitive", Decl),
    (DclMaxOutputVertexCount, 94, "dcl_maxout", Decl),
    (DclInput, 95, "dcl_input", Decl),
    (DclInputSgv, 96, "dcl_input_sgv", Decl),
    (DclInputSiv, 97, "dcl_input_siv", Decl),
    (DclInputPs, 98, "dcl_input_ps", Decl),
    (DclInputPsSgv, 99, "dcl_input_ps_sgv", Decl),
    (DclInputPsSiv, 100, "dcl_input_ps_siv", Decl),
    (DclOutput, 101, "dcl_output", Decl),
    (DclOutputSgv, 102, "dcl_output_sgv", Decl),
    (DclOutputSiv, 103, "dcl_output_siv", Decl),
    (DclTemps, 104, "dcl_temps", Decl),
    (DclIndexableTemp, 105, "dcl_indexableTemp", Decl),
    (DclGlobalFlags, 106, "dcl_globalFlags", Decl),
    (Lod, 108, "lod", Normal),
    (Gather4, 109, "gather4", Normal),
    (SamplePos, 110, "sample_pos", Normal),
    (SampleInfo, 111, "sample_info", Normal),
    (HsDecls, 113, "hs_decls", Flow),
    (HsControlPointPhase, 114, "hs_control_point_phase", Flow),
    (HsForkPhase, 115, "hs_fork_phase", Flow),
    (HsJoinPhase, 116, "hs_join_phase", Flow),
    (EmitStream, 117, "emit_stream", Normal),
    (CutStream, 118, "cut_stream", Normal),
    (EmitThenCutStream, 119, "emitthencut_stream", Normal),
    (InterfaceCall, 120, "fcall", Flow),
    (BufInfo, 121, "bufinfo", Normal),
    (DerivRtxCoarse, 122, "deriv_rtx_coarse", Normal),
    (DerivRtxFine, 123, "deriv_rtx_fine", Normal),
    (DerivRtyCoarse, 124, "deriv_rty_coarse", Normal),
    (DerivRtyFine, 125, "deriv_rty_fine", Normal),
    (Gather4C, 126, "gather4_c", Normal),
    (Gather4Po, 127, "gather4_po", Normal),
    (Gather4PoC, 128, "gather4_po_c", Normal),
    (Rcp, 129, "rcp", Normal),
    (F32ToF16, 130, "f32tof16", Normal),
    (F16ToF32, 131, "f16tof32", Normal),
    (UAddc, 132, "uaddc", Normal),
    (USubb, 133, "usubb", Normal),
    (CountBits, 134, "countbits", Normal),
    (FirstBitHi, 135, "firstbit_hi", Normal),
    (FirstBitLo, 136, "firstbit_lo", Normal),
    (FirstBitShi, 137, "firstbit_shi", Normal),
    (UBfe, 138, "ubfe", Normal),
    (IBfe, 139, "ibfe", Normal),
    (Bfi, 140, "bfi", Normal),
    (BfRev, 141, "bfrev", Normal),
    (Swapc, 142, "swapc", Normal),
    (DclStream, 143, "dcl_stream", Decl),
    (DclFunctionBody, 144, "dcl_function_body", Decl),
    (DclFunctionTable, 145, "dcl_function_table", Decl),
    (DclInterface, 146, "dcl_interface", Decl),
    (DclInputControlPointCount, 147, "dcl_input_control_point_count", Decl),
    (DclOutputControlPointCount, 148, "dcl_output_control_point_count", Decl),
    (DclTessDomain, 149, "dcl_tessellator_domain", Decl),
    (DclTessPartitioning, 150, "dcl_tessellator_partitioning", Decl),
    (DclTessOutputPrimitive, 151, "dcl_tessellator_output_primitive", Decl),
    (DclHsMaxTessFactor, 152, "dcl_hs_max_tessfactor", Decl),
    (DclHsForkPhaseInstanceCount, 153, "dcl_hs_fork_phase_instance_count", Decl),
    (DclHsJoinPhaseInstanceCount, 154, "dcl_hs_join_phase_instance_count", Decl),
    (DclThreadGroup, 155, "dcl_thread_group", Decl),
    (DclUavTyped, 156, "dcl_uav_typed", Decl),
    (DclUavRaw, 157, "dcl_uav_raw", Decl),
    (DclUavStructured, 158, "dcl_uav_structured", Decl),
    (DclTgsmRaw, 159, "dcl_tgsm_raw", Decl),
    (DclTgsmStructured, 160, "dcl_tgsm_structured", Decl),
    (DclResourceRaw, 161, "dcl_resource_raw", Decl),
    (DclResourceStructured, 162, "dcl_resource_structured", Decl),
    (LdUavTyped, 163, "ld_uav_typed", Normal),
    (StoreUavTyped, 164, "store_uav_typed", Normal),
    (LdRaw, 165, "ld_raw", Normal),
    (StoreRaw, 166, "store_raw", Normal),
    (LdStructured, 167, "ld_structured", Normal),
    (StoreStructured, 168, "store_structured", Normal),
    (AtomicAnd, 169, "atomic_and", Normal),
    (AtomicOr, 170, "atomic_or", Normal),
    (AtomicXor, 171, "atomic_xor", Normal),
    (AtomicCmpStore, 172, "atomic_cmp_store", Normal),
    (AtomicIAdd, 173, "atomic_iadd", Normal),
    (AtomicIMax, 174, "atomic_imax", Normal),
    (AtomicIMin, 175, "atomic_imin", Normal),
    (AtomicUMax, 176, "atomic_umax", Normal),
    (AtomicUMin, 177, "atomic_umin", Normal),
    (ImmAtomicAlloc, 178, "imm_atomic_alloc", Normal),
    (ImmAtomicConsume, 179, "imm_atomic_consume", Normal),
    (ImmAtomicIAdd, 180, "imm_atomic_iadd", Normal),
    (ImmAtomicAnd, 181, "imm_atomic_and", Normal),
    (ImmAtomicOr, 182, "imm_atomic_or", Normal),
    (ImmAtomicXor, 183, "imm_atomic_xor", Normal),
    (ImmAtomicExch, 184, "imm_atomic_exch", Normal),
    (ImmAtomicCmpExch, 185, "imm_atomic_cmp_exch", Normal),
    (ImmAtomicIMax, 186, "imm_atomic_imax", Normal),
    (ImmAtomicIMin, 187, "imm_atomic_imin", Normal),
    (ImmAtomicUMax, 188, "imm_atomic_umax", Normal),
    (ImmAtomicUMin, 189, "imm_atomic_umin", Normal),
    (Sync, 190, "sync", Normal),
    (DAdd, 191, "dadd", Normal),
    (DMax, 192, "dmax", Normal),
    (DMin, 193, "dmin", Normal),
    (DMul, 194, "dmul", Normal),
    (DEq, 195, "deq", Normal),
    (DGe, 196, "dge", Normal),
    (DLt, 197, "dlt", Normal),
    (DNe, 198, "dne", Normal),
    (DMov, 199, "dmov", Normal),
    (DMovc, 200, "dmovc", Normal),
    (DtoF, 201, "dtof", Normal),
    (FtoD, 202, "ftod", Normal),
    (EvalSnapped, 203, "eval_snapped", Normal),
    (EvalSampleIndex, 204, "eval_sample_index", Normal),
    (EvalCentroid, 205, "eval_centroid", Normal),
    (DclGsInstanceCount, 206, "dcl_gsinstancecount", Decl),
    (Abort, 207, "abort", Normal),
    (DebugBreak, 208, "debug_break", Normal),
    (DDiv, 210, "ddiv", Normal),
    (DFma, 211, "dfma", Normal),
    (DRcp, 212, "drcp", Normal),
    (Msad, 213, "msad", Normal),
    (DtoI, 214, "dtoi", Normal),
    (DtoU, 215, "dtou", Normal),
    (ItoD, 216, "itod", Normal),
    (UtoD, 217, "utod", Normal),
    (Gather4Feedback, 219, "gather4_s", Normal),
    (Gather4CFeedback, 220, "gather4_c_s", Normal),
    (Gather4PoFeedback, 221, "gather4_po_s", Normal),
    (Gather4PoCFeedback, 222, "gather4_po_c_s", Normal),
    (LdFeedback, 223, "ld_s", Normal),
    (LdMsFeedback, 224, "ld_ms_s", Normal),
    (LdUavTypedFeedback, 225, "ld_uav_typed_s", Normal),
    (LdRawFeedback, 226, "ld_raw_s", Normal),
    (LdStructuredFeedback, 227, "ld_structured_s", Normal),
    (SampleLFeedback, 228, "sample_l_s", Normal),
    (SampleCLzFeedback, 229, "sample_c_lz_s", Normal),
    (SampleClampFeedback, 230, "sample_cl_s", Normal),
    (SampleBClampFeedback, 231, "sample_b_cl_s", Normal),
    (SampleDClampFeedback, 232, "sample_d_cl_s", Normal),
    (SampleCClampFeedback, 233, "sample_c_cl_s", Normal),
    (CheckAccessFullyMapped, 234, "check_access_fully_mapped", Normal),
}

/// Entry in the static opcode property table.
///
/// This table is the only process-wide state in the transpiler; everything
/// else lives on a per-conversion instance.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub opcode: Opcode,
    pub class: OpcodeClass,
    /// Number of operand tokens the instruction form carries, where fixed;
    /// `None` for variable-operand forms (custom data, declarations with
    /// trailing payload DWORDs).
    pub operands: Option<u8>,
}

impl Opcode {
    pub fn info(self) -> OpcodeInfo {
        OpcodeInfo {
            opcode: self,
            class: self.class(),
            operands: self.fixed_operand_count(),
        }
    }

    pub fn is_decl(self) -> bool {
        self.class() == OpcodeClass::Decl
    }

    fn fixed_operand_count(self) -> Option<u8> {
        use Opcode::*;
        Some(match self {
            Nop | Break | Continue | Cut | Default | Else | EmitThenCut | Emit | EndIf
            | EndLoop | EndSwitch | Loop | Ret | Abort | DebugBreak | Sync | HsDecls
            | HsControlPointPhase | HsForkPhase | HsJoinPhase => 0,
            Breakc | Continuec | Case | Discard | If | Label | Retc | Switch | EmitStream
            | CutStream | EmitThenCutStream | InterfaceCall | Call => 1,
            Callc => 2,
            Mov | DMov | INeg | Not | Exp | Frc | Ftoi | Ftou | Itof | Utof | Log | Rsq | Rcp
            | RoundNe | RoundNi | RoundPi | RoundZ | Sqrt | DerivRtx | DerivRty
            | DerivRtxCoarse | DerivRtxFine | DerivRtyCoarse | DerivRtyFine | CountBits
            | FirstBitHi | FirstBitLo | FirstBitShi | BfRev | F32ToF16 | F16ToF32 | DtoF
            | FtoD | DtoI | DtoU | ItoD | UtoD | DRcp | BufInfo | SampleInfo
            | ImmAtomicAlloc | ImmAtomicConsume | EvalCentroid | CheckAccessFullyMapped => 2,
            Add | And | Div | Dp2 | Dp3 | Dp4 | Eq | Ge | IAdd | IEq | IGe | ILt | IMax | IMin
            | INe | IShl | IShr | Lt | Min | Max | Mul | Ne | Or | UGe | ULt | UMax | UMin
            | UShr | Xor | DAdd | DMax | DMin | DMul | DEq | DGe | DLt | DNe | ResInfo
            | SinCos | SamplePos | LdRaw | AtomicIAdd | AtomicAnd | AtomicOr | AtomicXor
            | AtomicIMax | AtomicIMin | AtomicUMax | AtomicUMin | StoreRaw | Ld
            | LdUavTyped | StoreUavTyped | DDiv | EvalSnapped | EvalSampleIndex => 3,
            Mad | IMad | UMad | Movc | DMovc | IMul | UMul | UDiv | UAddc | USubb | Lod
            | UBfe | IBfe | DFma | Msad | Sample | LdStructured | LdMs | AtomicCmpStore
            | StoreStructured | ImmAtomicIAdd | ImmAtomicAnd | ImmAtomicOr | ImmAtomicXor
            | ImmAtomicExch | ImmAtomicIMax | ImmAtomicIMin | ImmAtomicUMax | ImmAtomicUMin
            | Gather4 | LdFeedback | LdUavTypedFeedback | LdRawFeedback => 4,
            SampleC | SampleCLz | SampleL | SampleB | Bfi | Gather4C | Gather4Po | Swapc
            | ImmAtomicCmpExch | Gather4Feedback | LdMsFeedback | LdStructuredFeedback => 5,
            SampleD | Gather4PoC | Gather4CFeedback | Gather4PoFeedback | SampleLFeedback
            | SampleCLzFeedback | SampleClampFeedback => 6,
            Gather4PoCFeedback | SampleBClampFeedback | SampleCClampFeedback => 7,
            SampleDClampFeedback => 8,
            CustomData | DclResource | DclConstantBuffer | DclSampler | DclIndexRange
            | DclGsOutputPrimitiveTopology | DclGsInputPrimitive | DclMaxOutputVertexCount
            | DclInput | DclInputSgv | DclInputSiv | DclInputPs | DclInputPsSgv
            | DclInputPsSiv | DclOutput | DclOutputSgv | DclOutputSiv | DclTemps
            | DclIndexableTemp | DclGlobalFlags | DclStream | DclFunctionBody
            | DclFunctionTable | DclInterface | DclInputControlPointCount
            | DclOutputControlPointCount | DclTessDomain | DclTessPartitioning
            | DclTessOutputPrimitive | DclHsMaxTessFactor | DclHsForkPhaseInstanceCount
            | DclHsJoinPhaseInstanceCount | DclThreadGroup | DclUavTyped | DclUavRaw
            | DclUavStructured | DclTgsmRaw | DclTgsmStructured | DclResourceRaw
            | DclResourceStructured | DclGsInstanceCount => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_round_trips() {
        for v in 0..=217u32 {
            if let Some(op) = Opcode::from_u32(v) {
                assert_eq!(op as u32, v);
            }
        }
        // Reserved slots have no opcode.
        assert!(Opcode::from_u32(107).is_none());
        assert!(Opcode::from_u32(112).is_none());
        assert!(Opcode::from_u32(209).is_none());
        assert!(Opcode::from_u32(0x7ff).is_none());
    }

    #[test]
    fn classes_are_consistent() {
        assert!(Opcode::DclTemps.is_decl());
        assert!(!Opcode::Mov.is_decl());
        assert_eq!(Opcode::CustomData.class(), OpcodeClass::CustomData);
        assert_eq!(Opcode::If.class(), OpcodeClass::Flow);
    }
}
