//! Per-opcode lowering.
//!
//! One handler per source opcode, grouped by shape; each group funnels
//! through a small set of helpers parameterized by intrinsic id, element
//! type, and operand indices. Control-flow opcodes drive the scope stack;
//! everything else loads operands through the operand value model, emits IR,
//! and stores back.

mod alu;
mod doubles;
mod geometry;
mod hull;
mod interfaces;
mod mem;
mod pixel;

use aero_dxbc::comp::CompMask;
use aero_dxbc::sm4::decode::{Instruction, OperandKind};
use aero_dxbc::sm4::{Opcode, OpcodeClass, ShaderStage};
use aero_dxil::{
    BinOp, CastOp, CmpPred, DxOp, FuncId, Function, ScalarType, Terminator, Type, Value,
};
use tracing::trace;

use crate::conv::Conversion;
use crate::error::{ConvertError, Result};
use crate::operands::OperandValue;
use crate::scopes::Scope;

impl Conversion {
    /// Lowers the whole instruction stream into the module.
    pub(crate) fn convert_instructions(&mut self) -> Result<()> {
        let instructions = std::mem::take(&mut self.instructions);

        self.begin_function("main", true);
        self.scopes.push(Scope::Function { ret_count: 0 });
        self.declare_indexable_temps(false);
        self.insert_sm50_resource_handles()?;

        for inst in &instructions {
            trace!(opcode = inst.opcode.name(), "lower");
            self.convert_instruction(inst)?;
        }

        self.finish_stream()?;
        Ok(())
    }

    fn convert_instruction(&mut self, inst: &Instruction) -> Result<()> {
        use Opcode::*;

        // Declarations were consumed by analysis; custom data is
        // non-executable.
        match inst.opcode.class() {
            OpcodeClass::Decl | OpcodeClass::CustomData => return Ok(()),
            _ => {}
        }

        match inst.opcode {
            Nop | Abort | DebugBreak => Ok(()),

            // Move family ---------------------------------------------------
            Mov => self.convert_mov(inst),
            Movc => self.convert_movc(inst),
            Swapc => self.convert_swapc(inst),
            DMov => self.convert_dmov(inst),
            DMovc => self.convert_dmovc(inst),

            // FP arithmetic -------------------------------------------------
            Add => self.convert_fp_binary(inst, BinOp::FAdd, ScalarType::F32),
            Mul => self.convert_fp_binary(inst, BinOp::FMul, ScalarType::F32),
            Div => self.convert_fp_binary(inst, BinOp::FDiv, ScalarType::F32),
            Mad => self.convert_tertiary(inst, DxOp::FMad, ScalarType::F32),
            Min => self.convert_binary_intrinsic(inst, DxOp::FMin, ScalarType::F32),
            Max => self.convert_binary_intrinsic(inst, DxOp::FMax, ScalarType::F32),
            Frc => self.convert_unary_intrinsic(inst, DxOp::Frc, ScalarType::F32),
            Exp => self.convert_unary_intrinsic(inst, DxOp::Exp, ScalarType::F32),
            Log => self.convert_unary_intrinsic(inst, DxOp::Log, ScalarType::F32),
            Rsq => self.convert_unary_intrinsic(inst, DxOp::Rsqrt, ScalarType::F32),
            Sqrt => self.convert_unary_intrinsic(inst, DxOp::Sqrt, ScalarType::F32),
            RoundNe => self.convert_unary_intrinsic(inst, DxOp::RoundNe, ScalarType::F32),
            RoundNi => self.convert_unary_intrinsic(inst, DxOp::RoundNi, ScalarType::F32),
            RoundPi => self.convert_unary_intrinsic(inst, DxOp::RoundPz, ScalarType::F32),
            RoundZ => self.convert_unary_intrinsic(inst, DxOp::RoundZ, ScalarType::F32),
            Rcp => self.convert_rcp(inst, ScalarType::F32),
            SinCos => self.convert_sincos(inst),
            Dp2 => self.convert_dot(inst, DxOp::Dot2, 2),
            Dp3 => self.convert_dot(inst, DxOp::Dot3, 3),
            Dp4 => self.convert_dot(inst, DxOp::Dot4, 4),

            // Integer arithmetic --------------------------------------------
            IAdd => self.convert_int_binary(inst, BinOp::Add),
            INeg => self.convert_ineg(inst),
            And => self.convert_int_binary(inst, BinOp::And),
            Or => self.convert_int_binary(inst, BinOp::Or),
            Xor => self.convert_int_binary(inst, BinOp::Xor),
            Not => self.convert_not(inst),
            IShl => self.convert_shift(inst, BinOp::Shl),
            IShr => self.convert_shift(inst, BinOp::AShr),
            UShr => self.convert_shift(inst, BinOp::LShr),
            IMin => self.convert_binary_intrinsic(inst, DxOp::IMin, ScalarType::I32),
            IMax => self.convert_binary_intrinsic(inst, DxOp::IMax, ScalarType::I32),
            UMin => self.convert_binary_intrinsic(inst, DxOp::UMin, ScalarType::I32),
            UMax => self.convert_binary_intrinsic(inst, DxOp::UMax, ScalarType::I32),
            IMad => self.convert_tertiary(inst, DxOp::IMad, ScalarType::I32),
            UMad => self.convert_tertiary(inst, DxOp::UMad, ScalarType::I32),
            Msad => self.convert_tertiary_at(inst, DxOp::Msad, ScalarType::I32, 0, 1, 2, 3),
            IMul => self.convert_binary_two_outs(inst, DxOp::IMul),
            UMul => self.convert_binary_two_outs(inst, DxOp::UMul),
            UDiv => self.convert_binary_two_outs(inst, DxOp::UDiv),
            UAddc => self.convert_binary_with_carry(inst, DxOp::UAddc),
            USubb => self.convert_binary_with_carry(inst, DxOp::USubb),
            CountBits => self.convert_unary_bits(inst, DxOp::Countbits),
            BfRev => self.convert_unary_bits(inst, DxOp::Bfrev),
            FirstBitHi => self.convert_unary_bits(inst, DxOp::FirstbitHi),
            FirstBitLo => self.convert_unary_bits(inst, DxOp::FirstbitLo),
            FirstBitShi => self.convert_unary_bits(inst, DxOp::FirstbitSHi),
            UBfe => self.convert_tertiary_at(inst, DxOp::Ubfe, ScalarType::I32, 0, 1, 2, 3),
            IBfe => self.convert_tertiary_at(inst, DxOp::Ibfe, ScalarType::I32, 0, 1, 2, 3),
            Bfi => self.convert_bfi(inst),

            // Comparisons ---------------------------------------------------
            Eq => self.convert_comparison(inst, CmpPred::FOeq, ScalarType::F32),
            Ne => self.convert_comparison(inst, CmpPred::FUne, ScalarType::F32),
            Lt => self.convert_comparison(inst, CmpPred::FOlt, ScalarType::F32),
            Ge => self.convert_comparison(inst, CmpPred::FOge, ScalarType::F32),
            IEq => self.convert_comparison(inst, CmpPred::Eq, ScalarType::I32),
            INe => self.convert_comparison(inst, CmpPred::Ne, ScalarType::I32),
            ILt => self.convert_comparison(inst, CmpPred::Slt, ScalarType::I32),
            IGe => self.convert_comparison(inst, CmpPred::Sge, ScalarType::I32),
            ULt => self.convert_comparison(inst, CmpPred::Ult, ScalarType::I32),
            UGe => self.convert_comparison(inst, CmpPred::Uge, ScalarType::I32),

            // Conversions ---------------------------------------------------
            Itof => self.convert_cast(inst, CastOp::SIToFP, ScalarType::I32, ScalarType::F32),
            Utof => self.convert_cast(inst, CastOp::UIToFP, ScalarType::I32, ScalarType::F32),
            Ftoi => self.convert_cast(inst, CastOp::FPToSI, ScalarType::F32, ScalarType::I32),
            Ftou => self.convert_cast(inst, CastOp::FPToUI, ScalarType::F32, ScalarType::I32),
            F32ToF16 => self.convert_f32tof16(inst),
            F16ToF32 => self.convert_f16tof32(inst),

            // Double-precision suite ----------------------------------------
            DAdd => self.convert_double_binary(inst, BinOp::FAdd),
            DMul => self.convert_double_binary(inst, BinOp::FMul),
            DDiv => self.convert_double_binary(inst, BinOp::FDiv),
            DMin => self.convert_double_intrinsic(inst, DxOp::FMin),
            DMax => self.convert_double_intrinsic(inst, DxOp::FMax),
            DFma => self.convert_dfma(inst),
            DRcp => self.convert_drcp(inst),
            DEq => self.convert_double_comparison(inst, CmpPred::FOeq),
            DNe => self.convert_double_comparison(inst, CmpPred::FUne),
            DLt => self.convert_double_comparison(inst, CmpPred::FOlt),
            DGe => self.convert_double_comparison(inst, CmpPred::FOge),
            DtoF => self.convert_from_double(inst, DxOp::LegacyDoubleToFloat, ScalarType::F32),
            DtoI => self.convert_from_double(inst, DxOp::LegacyDoubleToSInt32, ScalarType::I32),
            DtoU => self.convert_from_double(inst, DxOp::LegacyDoubleToUInt32, ScalarType::I32),
            FtoD => self.convert_to_double(inst, CastOp::FPExt, ScalarType::F32),
            ItoD => self.convert_to_double(inst, CastOp::SIToFP, ScalarType::I32),
            UtoD => self.convert_to_double(inst, CastOp::UIToFP, ScalarType::I32),

            // Resources -----------------------------------------------------
            Sample | SampleB | SampleL | SampleD | SampleC | SampleCLz => {
                self.convert_sample(inst, false)
            }
            SampleLFeedback | SampleCLzFeedback | SampleClampFeedback
            | SampleBClampFeedback | SampleDClampFeedback | SampleCClampFeedback => {
                self.convert_sample(inst, true)
            }
            Ld | LdMs => self.convert_ld(inst, false),
            LdFeedback | LdMsFeedback => self.convert_ld(inst, true),
            LdUavTyped => self.convert_ld_uav_typed(inst, false),
            LdUavTypedFeedback => self.convert_ld_uav_typed(inst, true),
            StoreUavTyped => self.convert_store_uav_typed(inst),
            LdRaw => self.convert_ld_raw(inst, false),
            LdRawFeedback => self.convert_ld_raw(inst, true),
            StoreRaw => self.convert_store_raw(inst),
            LdStructured => self.convert_ld_structured(inst, false),
            LdStructuredFeedback => self.convert_ld_structured(inst, true),
            StoreStructured => self.convert_store_structured(inst),
            Gather4 | Gather4C | Gather4Po | Gather4PoC => self.convert_gather(inst, false),
            Gather4Feedback | Gather4CFeedback | Gather4PoFeedback | Gather4PoCFeedback => {
                self.convert_gather(inst, true)
            }
            ResInfo => self.convert_resinfo(inst),
            SampleInfo => self.convert_sample_info(inst),
            SamplePos => self.convert_sample_pos(inst),
            BufInfo => self.convert_bufinfo(inst),
            CheckAccessFullyMapped => self.convert_check_access(inst),

            // Atomics -------------------------------------------------------
            AtomicAnd | AtomicOr | AtomicXor | AtomicIAdd | AtomicIMax | AtomicIMin
            | AtomicUMax | AtomicUMin | AtomicCmpStore => self.convert_atomic(inst, false),
            ImmAtomicIAdd | ImmAtomicAnd | ImmAtomicOr | ImmAtomicXor | ImmAtomicExch
            | ImmAtomicIMax | ImmAtomicIMin | ImmAtomicUMax | ImmAtomicUMin
            | ImmAtomicCmpExch => self.convert_atomic(inst, true),
            ImmAtomicAlloc => self.convert_counter(inst, 1),
            ImmAtomicConsume => self.convert_counter(inst, -1),

            Sync => self.convert_sync(inst),

            // Pixel-shader specials -----------------------------------------
            Discard => self.convert_discard(inst),
            DerivRtx | DerivRtxCoarse => {
                self.convert_unary_intrinsic(inst, DxOp::DerivCoarseX, ScalarType::F32)
            }
            DerivRty | DerivRtyCoarse => {
                self.convert_unary_intrinsic(inst, DxOp::DerivCoarseY, ScalarType::F32)
            }
            DerivRtxFine => {
                self.convert_unary_intrinsic(inst, DxOp::DerivFineX, ScalarType::F32)
            }
            DerivRtyFine => {
                self.convert_unary_intrinsic(inst, DxOp::DerivFineY, ScalarType::F32)
            }
            Lod => self.convert_lod(inst),
            EvalSnapped => self.convert_eval(inst, DxOp::EvalSnapped),
            EvalSampleIndex => self.convert_eval(inst, DxOp::EvalSampleIndex),
            EvalCentroid => self.convert_eval(inst, DxOp::EvalCentroid),

            // Geometry shader -----------------------------------------------
            Emit | EmitStream => self.convert_emit_stream(inst, EmitKind::Emit),
            Cut | CutStream => self.convert_emit_stream(inst, EmitKind::Cut),
            EmitThenCut | EmitThenCutStream => {
                self.convert_emit_stream(inst, EmitKind::EmitThenCut)
            }

            // Structured control flow ---------------------------------------
            If => self.convert_if(inst),
            Else => self.convert_else(),
            EndIf => self.convert_endif(),
            Loop => self.convert_loop(),
            EndLoop => self.convert_endloop(),
            Break => self.convert_break(None),
            Breakc => {
                let cond = self.load_znz_condition(inst, 0)?;
                self.convert_break(Some(cond))
            }
            Continue => self.convert_continue(None),
            Continuec => {
                let cond = self.load_znz_condition(inst, 0)?;
                self.convert_continue(Some(cond))
            }
            Switch => self.convert_switch(inst),
            Case => self.convert_case(inst),
            Default => self.convert_default(),
            EndSwitch => self.convert_endswitch(),
            Ret => self.convert_ret(None),
            Retc => {
                let cond = self.load_znz_condition(inst, 0)?;
                self.convert_ret(Some(cond))
            }
            Label => self.convert_label(inst),
            Call => self.convert_call(inst, None),
            Callc => {
                let cond = self.load_znz_condition(inst, 0)?;
                self.convert_call(inst, Some(cond))
            }
            InterfaceCall => self.convert_fcall(inst),

            // Hull-shader phase markers -------------------------------------
            HsDecls => Ok(()),
            HsControlPointPhase => self.convert_hs_control_point_phase(),
            HsForkPhase | HsJoinPhase => self.convert_hs_fork_join_phase(inst),

            other => Err(ConvertError::MalformedBytecode(format!(
                "unhandled opcode {}",
                other.name()
            ))),
        }
    }

    // Shared helpers --------------------------------------------------------

    /// Loads a conditional operand as an `i1` under the instruction's boolean
    /// test polarity (`_nz` vs `_z`).
    pub(crate) fn load_znz_condition(
        &mut self,
        inst: &Instruction,
        idx: usize,
    ) -> Result<Value> {
        let value = self.load_operand(inst, idx, CompMask::X, ScalarType::I32)?;
        let scalar = value.get(0);
        let zero = self.const_i32(0);
        let pred = if inst.test_nonzero {
            CmpPred::Ne
        } else {
            CmpPred::Eq
        };
        Ok(self.builder().icmp(pred, scalar, zero))
    }

    /// Destination write mask of operand `idx`.
    pub(crate) fn dst_mask(&self, inst: &Instruction, idx: usize) -> CompMask {
        inst.operands
            .get(idx)
            .map(|op| op.write_mask())
            .unwrap_or(CompMask::NONE)
    }

    /// Infers the element type the move family operates in: integer unless
    /// modifiers or saturation force FP, with signature-backed destinations
    /// taking their element's type.
    pub(crate) fn infer_move_type(&self, inst: &Instruction) -> ScalarType {
        if inst.saturate {
            return ScalarType::F32;
        }
        for op in &inst.operands {
            if op.modifier.has_abs() || op.modifier.has_neg() {
                return ScalarType::F32;
            }
        }
        if let Some(dst) = inst.operands.first() {
            match dst.kind {
                OperandKind::Output => {
                    let reg = dst.reg_imm().unwrap_or(0);
                    let comp = dst.write_mask().first().unwrap_or(0) as u32;
                    let sig = if self.in_patch_constant_phase {
                        &self.patch_sig
                    } else {
                        &self.output_sig
                    };
                    if let Some((e, _, _)) = sig.get(reg, comp, self.current_stream_for_sig()) {
                        return e.comp_type;
                    }
                }
                OperandKind::OutputDepth
                | OperandKind::OutputDepthGreaterEqual
                | OperandKind::OutputDepthLessEqual => return ScalarType::F32,
                _ => {}
            }
        }
        ScalarType::I32
    }

    fn current_stream_for_sig(&self) -> u32 {
        if self.stage == ShaderStage::Geometry {
            self.current_stream
        } else {
            0
        }
    }

    // Move family -----------------------------------------------------------

    fn convert_mov(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let ty = self.infer_move_type(inst);
        let value = self.load_operand(inst, 1, mask, ty)?;
        let value = self.apply_instruction_modifiers(inst, mask, ty, value);
        self.mark_precise_lanes(inst, mask, &value);
        self.store_operand(inst, 0, mask, ty, value)
    }

    fn convert_movc(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let ty = self.infer_move_type(inst);
        let cond = self.load_operand(inst, 1, mask, ScalarType::I32)?;
        let a = self.load_operand(inst, 2, mask, ty)?;
        let b = self.load_operand(inst, 3, mask, ty)?;
        let zero = self.const_i32(0);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let is_set = self.builder().icmp(CmpPred::Ne, cond.get(c), zero);
            let v = self.builder().select(is_set, a.get(c), b.get(c));
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ty, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    fn convert_swapc(&mut self, inst: &Instruction) -> Result<()> {
        // swapc dst0, dst1, cond, a, b:
        //   dst0 = cond ? b : a
        //   dst1 = cond ? a : b
        let ty = self.infer_move_type(inst);
        let zero = self.const_i32(0);
        for (dst_idx, true_idx, false_idx) in [(0usize, 4usize, 3usize), (1, 3, 4)] {
            let mask = self.dst_mask(inst, dst_idx);
            if mask.is_empty() {
                continue;
            }
            let cond = self.load_operand(inst, 2, mask, ScalarType::I32)?;
            let on_true = self.load_operand(inst, true_idx, mask, ty)?;
            let on_false = self.load_operand(inst, false_idx, mask, ty)?;
            let mut out = OperandValue::default();
            for c in mask.comps() {
                let is_set = self.builder().icmp(CmpPred::Ne, cond.get(c), zero);
                let v = self
                    .builder()
                    .select(is_set, on_true.get(c), on_false.get(c));
                out.set(c, v);
            }
            let out = self.apply_instruction_modifiers(inst, mask, ty, out);
            self.store_operand(inst, dst_idx, mask, ty, out)?;
        }
        Ok(())
    }

    // Structured control flow ----------------------------------------------

    fn convert_if(&mut self, inst: &Instruction) -> Result<()> {
        let cond = self.load_znz_condition(inst, 0)?;
        let n = self.scopes.if_count;
        let pre = self.block;
        let then_bb = self.add_block(format!("if{n}.then"));
        let end_bb = self.add_block(format!("if{n}.end"));
        self.builder().terminate(Terminator::CondBr {
            cond,
            then_bb,
            else_bb: end_bb,
        });
        self.scopes.push(Scope::If { pre, end_bb });
        self.block = then_bb;
        Ok(())
    }

    fn convert_else(&mut self) -> Result<()> {
        let (pre, end_bb) = match self.scopes.top_mut() {
            Some(Scope::If { pre, end_bb, .. }) => (*pre, *end_bb),
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "else without matching if".into(),
                ))
            }
        };
        // Seal the then-side and retarget the if's false edge.
        if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Br { target: end_bb });
        }
        let else_bb = self.add_block(format!("if{}.else", self.scopes.if_count - 1));
        let func = self.func;
        if let Some(Terminator::CondBr { else_bb: fe, .. }) = self
            .module
            .func_mut(func)
            .block_mut(pre)
            .terminator
            .as_mut()
        {
            *fe = else_bb;
        }
        self.block = else_bb;
        Ok(())
    }

    fn convert_endif(&mut self) -> Result<()> {
        let end_bb = match self.scopes.pop() {
            Some(Scope::If { end_bb, .. }) => end_bb,
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "endif without matching if".into(),
                ))
            }
        };
        if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Br { target: end_bb });
        }
        self.block = end_bb;
        Ok(())
    }

    fn convert_loop(&mut self) -> Result<()> {
        let n = self.scopes.loop_count;
        let body = self.add_block(format!("loop{n}.body"));
        let exit = self.add_block(format!("loop{n}.end"));
        self.builder().terminate(Terminator::Br { target: body });
        self.scopes.push(Scope::Loop {
            body,
            exit,
            continue_count: 0,
            break_count: 0,
        });
        self.block = body;
        Ok(())
    }

    fn convert_endloop(&mut self) -> Result<()> {
        let (body, exit) = match self.scopes.pop() {
            Some(Scope::Loop { body, exit, .. }) => (body, exit),
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "endloop without matching loop".into(),
                ))
            }
        };
        if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Br { target: body });
        }
        self.block = exit;
        Ok(())
    }

    fn convert_break(&mut self, cond: Option<Value>) -> Result<()> {
        let (target, label) = match self.scopes.parent_breakable_mut() {
            Some(Scope::Loop {
                exit, break_count, ..
            }) => {
                *break_count += 1;
                (*exit, format!("loop.break{}", *break_count))
            }
            Some(Scope::Switch {
                end_bb,
                break_count,
                ..
            }) => {
                *break_count += 1;
                (*end_bb, format!("switch.break{}", *break_count))
            }
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "break outside loop or switch".into(),
                ))
            }
        };
        self.branch_and_continue(target, cond, label)
    }

    fn convert_continue(&mut self, cond: Option<Value>) -> Result<()> {
        let (target, label) = match self.scopes.parent_loop_mut() {
            Some(Scope::Loop {
                body,
                continue_count,
                ..
            }) => {
                *continue_count += 1;
                (*body, format!("loop.continue{}", *continue_count))
            }
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "continue outside loop".into(),
                ))
            }
        };
        self.branch_and_continue(target, cond, label)
    }

    /// Branches (conditionally) to `target` and opens a fresh block for the
    /// instructions that follow. The fresh block is unreachable after an
    /// unconditional transfer and is removed during finalization.
    fn branch_and_continue(
        &mut self,
        target: aero_dxil::BlockId,
        cond: Option<Value>,
        label: String,
    ) -> Result<()> {
        let next = self.add_block(label);
        match cond {
            Some(cond) => self.builder().terminate(Terminator::CondBr {
                cond,
                then_bb: target,
                else_bb: next,
            }),
            None => self.builder().terminate(Terminator::Br { target }),
        }
        self.block = next;
        Ok(())
    }

    fn convert_switch(&mut self, inst: &Instruction) -> Result<()> {
        let selector = self.load_operand(inst, 0, CompMask::X, ScalarType::I32)?;
        let n = self.scopes.switch_count;
        let pre = self.block;
        let end_bb = self.add_block(format!("switch{n}.end"));
        self.scopes.push(Scope::Switch {
            pre,
            selector: selector.get(0),
            end_bb,
            default_bb: None,
            cases: Vec::new(),
            current_case: None,
            case_count: 0,
            break_count: 0,
        });
        // The pre-block's terminator is materialized at endswitch; until the
        // first case, translation has no live block, so park in a scratch
        // block that only a fallthrough-free switch leaves empty.
        let scratch = self.add_block(format!("switch{n}.scratch"));
        self.block = scratch;
        Ok(())
    }

    fn convert_case(&mut self, inst: &Instruction) -> Result<()> {
        let value = inst
            .operands
            .first()
            .map(|op| op.imm[0])
            .ok_or_else(|| ConvertError::MalformedBytecode("case without value".into()))?;

        let current_is_empty = {
            let block = self.module.func(self.func).block(self.block);
            block.insts.is_empty() && block.terminator.is_none()
        };
        let current_block = self.block;

        let case_bb = match self.scopes.top_mut() {
            Some(Scope::Switch {
                current_case,
                case_count,
                ..
            }) => {
                if *current_case == Some(current_block) && current_is_empty {
                    // Stacked case labels share one group block.
                    None
                } else {
                    *case_count += 1;
                    Some(*case_count)
                }
            }
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "case outside switch".into(),
                ))
            }
        };

        let target = match case_bb {
            None => self.block,
            Some(count) => {
                let bb = self.add_block(format!(
                    "switch{}.case{}",
                    self.scopes.switch_count - 1,
                    count
                ));
                // C-style fallthrough from the previous case group.
                if !self.current_block_terminated() {
                    self.builder().terminate(Terminator::Br { target: bb });
                }
                self.block = bb;
                bb
            }
        };

        if let Some(Scope::Switch {
            cases,
            current_case,
            ..
        }) = self.scopes.top_mut()
        {
            cases.push((value, target));
            *current_case = Some(target);
        }
        Ok(())
    }

    fn convert_default(&mut self) -> Result<()> {
        let count = match self.scopes.top_mut() {
            Some(Scope::Switch { case_count, .. }) => {
                *case_count += 1;
                *case_count
            }
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "default outside switch".into(),
                ))
            }
        };
        let bb = self.add_block(format!(
            "switch{}.default",
            self.scopes.switch_count - 1
        ));
        if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Br { target: bb });
        }
        self.block = bb;
        if let Some(Scope::Switch {
            default_bb,
            current_case,
            ..
        }) = self.scopes.top_mut()
        {
            *default_bb = Some(bb);
            *current_case = Some(bb);
        }
        Ok(())
    }

    fn convert_endswitch(&mut self) -> Result<()> {
        let (pre, selector, end_bb, default_bb, mut cases) = match self.scopes.pop() {
            Some(Scope::Switch {
                pre,
                selector,
                end_bb,
                default_bb,
                cases,
                ..
            }) => (pre, selector, end_bb, default_bb, cases),
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "endswitch without matching switch".into(),
                ))
            }
        };

        // Seal the last open case group.
        if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Br { target: end_bb });
        }

        // Deduplicate case values (first occurrence wins, matching source
        // order).
        let mut seen = std::collections::BTreeSet::new();
        cases.retain(|(value, _)| seen.insert(*value));

        let func = self.func;
        self.module.func_mut(func).block_mut(pre).terminator = Some(Terminator::Switch {
            value: selector,
            default: default_bb.unwrap_or(end_bb),
            cases,
        });
        self.block = end_bb;
        Ok(())
    }

    fn convert_ret(&mut self, cond: Option<Value>) -> Result<()> {
        // Inside a hull loop, `ret` ends the current instance: control joins
        // the loop latch instead of leaving the function.
        if let Some(Scope::HullLoop { latch, .. }) = self.scopes.parent_hull_loop() {
            let latch = *latch;
            return self.branch_and_continue(latch, cond, "hull.ret".into());
        }

        match cond {
            None => {
                if !self.current_block_terminated() {
                    self.builder().terminate(Terminator::Ret { value: None });
                }
                // Instructions may follow (else-branches, subsequent labels);
                // park them in a block finalization will drop if it stays
                // unreachable.
                let count = match self.scopes.parent_function_mut() {
                    Some(Scope::Function { ret_count, .. }) => {
                        *ret_count += 1;
                        *ret_count
                    }
                    Some(_) => unreachable!("parent_function_mut only returns Scope::Function"),
                    None => 0,
                };
                let next = self.add_block(format!("after_ret{count}"));
                self.block = next;
                Ok(())
            }
            Some(cond) => {
                let count = match self.scopes.parent_function_mut() {
                    Some(Scope::Function { ret_count, .. }) => {
                        *ret_count += 1;
                        *ret_count
                    }
                    Some(_) => unreachable!("parent_function_mut only returns Scope::Function"),
                    None => 0,
                };
                let ret_bb = self.add_block(format!("ret{count}"));
                let cont = self.add_block(format!("ret{count}.cont"));
                self.builder().terminate(Terminator::CondBr {
                    cond,
                    then_bb: ret_bb,
                    else_bb: cont,
                });
                self.block = ret_bb;
                self.builder().terminate(Terminator::Ret { value: None });
                self.block = cont;
                Ok(())
            }
        }
    }

    // Subroutines -----------------------------------------------------------

    /// Function for a `label`-introduced body, created on first reference so
    /// forward calls resolve.
    pub(crate) fn label_function(&mut self, id: u32, body: bool) -> FuncId {
        let table = if body {
            &mut self.function_bodies
        } else {
            &mut self.labels
        };
        if let Some(&f) = table.get(&id) {
            return f;
        }
        let name = if body {
            format!("fb{id}")
        } else {
            format!("label{id}")
        };
        let mut func = Function::new(name, Type::Void);
        func.add_block("entry");
        let f = self.module.add_function(func);
        if body {
            self.function_bodies.insert(id, f);
        } else {
            self.labels.insert(id, f);
        }
        f
    }

    fn convert_label(&mut self, inst: &Instruction) -> Result<()> {
        let op = inst
            .operands
            .first()
            .ok_or_else(|| ConvertError::MalformedBytecode("label without operand".into()))?;
        let id = op.reg_imm().unwrap_or(0);
        let body = op.kind == OperandKind::FunctionBody;

        // Seal whatever was being translated before the label.
        self.finish_open_blocks();
        self.scopes = Default::default();

        let func = self.label_function(id, body);
        self.func = func;
        self.block = aero_dxil::BlockId(0);
        self.scopes.push(Scope::Function { ret_count: 0 });
        self.insert_sm50_resource_handles()?;
        Ok(())
    }

    fn convert_call(&mut self, inst: &Instruction, cond: Option<Value>) -> Result<()> {
        let label_idx = if cond.is_some() { 1 } else { 0 };
        let op = inst.operands.get(label_idx).ok_or_else(|| {
            ConvertError::MalformedBytecode("call without label operand".into())
        })?;
        let id = op.reg_imm().unwrap_or(0);
        let callee = self.label_function(id, op.kind == OperandKind::FunctionBody);

        match cond {
            None => {
                self.builder().call_function(callee, Vec::new(), Type::Void);
                Ok(())
            }
            Some(cond) => {
                let call_bb = self.add_block("callc.then".into());
                let cont = self.add_block("callc.end".into());
                self.builder().terminate(Terminator::CondBr {
                    cond,
                    then_bb: call_bb,
                    else_bb: cont,
                });
                self.block = call_bb;
                self.builder().call_function(callee, Vec::new(), Type::Void);
                self.builder().terminate(Terminator::Br { target: cont });
                self.block = cont;
                Ok(())
            }
        }
    }

    // Finalization ----------------------------------------------------------

    /// Seals any block left open at a function boundary.
    fn finish_open_blocks(&mut self) {
        if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Ret { value: None });
        }
    }

    /// End-of-stream handling: close a trailing hull phase, seal open blocks,
    /// and make every function well formed.
    fn finish_stream(&mut self) -> Result<()> {
        if self.scopes.in_hull_loop() {
            self.finish_hull_phase()?;
        }
        self.finish_open_blocks();

        // Functions created for forward references but never defined get a
        // trivial body rather than leaving the module unverifiable.
        for func in &mut self.module.functions {
            for block in &mut func.blocks {
                if block.terminator.is_none() && block.insts.is_empty() {
                    block.terminator = Some(Terminator::Ret { value: None });
                }
            }
        }
        Ok(())
    }
}

/// Emit/cut flavors share one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EmitKind {
    Emit,
    Cut,
    EmitThenCut,
}
