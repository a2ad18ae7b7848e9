//! Arithmetic, logic, comparison, and conversion lowering.

use aero_dxbc::comp::CompMask;
use aero_dxbc::sm4::decode::{Instruction, OperandKind};
use aero_dxil::{BinOp, CastOp, CmpPred, DxOp, ScalarType, Type};

use crate::conv::Conversion;
use crate::error::{ConvertError, Result};
use crate::operands::OperandValue;

impl Conversion {
    /// Unary intrinsic over the destination mask.
    pub(crate) fn convert_unary_intrinsic(
        &mut self,
        inst: &Instruction,
        op: DxOp,
        ty: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.dxop_scalar(op, ty, vec![src.get(c)]);
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ty, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    /// Integer bit-manipulation intrinsics; result type is i32 regardless of
    /// the (unsigned) operand interpretation.
    pub(crate) fn convert_unary_bits(&mut self, inst: &Instruction, op: DxOp) -> Result<()> {
        self.convert_unary_intrinsic(inst, op, ScalarType::I32)
    }

    /// Native binary IR operator over the destination mask.
    pub(crate) fn convert_fp_binary(
        &mut self,
        inst: &Instruction,
        op: BinOp,
        ty: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ty)?;
        let b = self.load_operand(inst, 2, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.builder().binary(op, a.get(c), b.get(c));
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ty, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    pub(crate) fn convert_int_binary(&mut self, inst: &Instruction, op: BinOp) -> Result<()> {
        let ty = ScalarType::I32;
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ty)?;
        let b = self.load_operand(inst, 2, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.builder().binary(op, a.get(c), b.get(c));
            out.set(c, v);
        }
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    /// Binary intrinsic call (min/max families).
    pub(crate) fn convert_binary_intrinsic(
        &mut self,
        inst: &Instruction,
        op: DxOp,
        ty: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ty)?;
        let b = self.load_operand(inst, 2, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.dxop_scalar(op, ty, vec![a.get(c), b.get(c)]);
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ty, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    /// Tertiary intrinsic (mad families) with default operand positions.
    pub(crate) fn convert_tertiary(
        &mut self,
        inst: &Instruction,
        op: DxOp,
        ty: ScalarType,
    ) -> Result<()> {
        self.convert_tertiary_at(inst, op, ty, 0, 1, 2, 3)
    }

    pub(crate) fn convert_tertiary_at(
        &mut self,
        inst: &Instruction,
        op: DxOp,
        ty: ScalarType,
        dst: usize,
        s1: usize,
        s2: usize,
        s3: usize,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, dst);
        let a = self.load_operand(inst, s1, mask, ty)?;
        let b = self.load_operand(inst, s2, mask, ty)?;
        let c_val = self.load_operand(inst, s3, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.dxop_scalar(op, ty, vec![a.get(c), b.get(c), c_val.get(c)]);
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ty, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, dst, mask, ty, out)
    }

    /// `bfi dst, width, offset, insert, base`.
    pub(crate) fn convert_bfi(&mut self, inst: &Instruction) -> Result<()> {
        let ty = ScalarType::I32;
        let mask = self.dst_mask(inst, 0);
        let width = self.load_operand(inst, 1, mask, ty)?;
        let offset = self.load_operand(inst, 2, mask, ty)?;
        let insert = self.load_operand(inst, 3, mask, ty)?;
        let base = self.load_operand(inst, 4, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.dxop_scalar(
                DxOp::Bfi,
                ty,
                vec![width.get(c), offset.get(c), insert.get(c), base.get(c)],
            );
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ty, out)
    }

    pub(crate) fn convert_ineg(&mut self, inst: &Instruction) -> Result<()> {
        let ty = ScalarType::I32;
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.negate(src.get(c), ty);
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ty, out)
    }

    pub(crate) fn convert_not(&mut self, inst: &Instruction) -> Result<()> {
        let ty = ScalarType::I32;
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, mask, ty)?;
        let ones = self.const_i32(u32::MAX);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.builder().binary(BinOp::Xor, src.get(c), ones);
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ty, out)
    }

    /// Shifts mask their amount to 5 bits.
    pub(crate) fn convert_shift(&mut self, inst: &Instruction, op: BinOp) -> Result<()> {
        let ty = ScalarType::I32;
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ty)?;
        let b = self.load_operand(inst, 2, mask, ty)?;
        let thirty_one = self.const_i32(31);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let amount = self.builder().binary(BinOp::And, b.get(c), thirty_one);
            let v = self.builder().binary(op, a.get(c), amount);
            out.set(c, v);
        }
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    /// `imul`/`umul`/`udiv`: one intrinsic returning a pair; the destinations
    /// take (hi, lo) for the multiplies and (quotient, remainder) for udiv.
    pub(crate) fn convert_binary_two_outs(
        &mut self,
        inst: &Instruction,
        op: DxOp,
    ) -> Result<()> {
        let ty = ScalarType::I32;
        let mask0 = self.dst_mask(inst, 0);
        let mask1 = self.dst_mask(inst, 1);
        let union = mask0.union(mask1);
        let a = self.load_operand(inst, 2, union, ty)?;
        let b = self.load_operand(inst, 3, union, ty)?;

        let mut out0 = OperandValue::default();
        let mut out1 = OperandValue::default();
        for c in union.comps() {
            let pair = self.dxop(
                op,
                Type::I32,
                vec![a.get(c), b.get(c)],
                Type::Pair(ScalarType::I32),
            );
            // Pair layout: element 0 is the primary output (hi for the
            // multiplies, quotient for udiv); element 1 the secondary.
            if mask0.contains(c) {
                let v = self.builder().extract_value(pair, 0);
                out0.set(c, v);
            }
            if mask1.contains(c) {
                let v = self.builder().extract_value(pair, 1);
                out1.set(c, v);
            }
        }
        if !mask0.is_empty() && !inst.operands[0].is_null() {
            self.store_operand(inst, 0, mask0, ty, out0)?;
        }
        if !mask1.is_empty() && !inst.operands[1].is_null() {
            self.store_operand(inst, 1, mask1, ty, out1)?;
        }
        Ok(())
    }

    /// `uaddc`/`usubb`: the carry/borrow lane zero-extends to i32.
    pub(crate) fn convert_binary_with_carry(
        &mut self,
        inst: &Instruction,
        op: DxOp,
    ) -> Result<()> {
        let ty = ScalarType::I32;
        let mask0 = self.dst_mask(inst, 0);
        let mask1 = self.dst_mask(inst, 1);
        let union = mask0.union(mask1);
        let a = self.load_operand(inst, 2, union, ty)?;
        let b = self.load_operand(inst, 3, union, ty)?;

        let mut out0 = OperandValue::default();
        let mut out1 = OperandValue::default();
        for c in union.comps() {
            let pair = self.dxop(op, Type::I32, vec![a.get(c), b.get(c)], Type::Carry);
            if mask0.contains(c) {
                let v = self.builder().extract_value(pair, 0);
                out0.set(c, v);
            }
            if mask1.contains(c) {
                let carry = self.builder().extract_value(pair, 1);
                let wide = self.builder().cast(CastOp::ZExt, carry, Type::I32);
                out1.set(c, wide);
            }
        }
        if !mask0.is_empty() && !inst.operands[0].is_null() {
            self.store_operand(inst, 0, mask0, ty, out0)?;
        }
        if !mask1.is_empty() && !inst.operands[1].is_null() {
            self.store_operand(inst, 1, mask1, ty, out1)?;
        }
        Ok(())
    }

    /// `sincos dst_sin, dst_cos, src`.
    pub(crate) fn convert_sincos(&mut self, inst: &Instruction) -> Result<()> {
        let ty = ScalarType::F32;
        for (dst_idx, op) in [(0usize, DxOp::Sin), (1usize, DxOp::Cos)] {
            if inst.operands[dst_idx].is_null() {
                continue;
            }
            let mask = self.dst_mask(inst, dst_idx);
            if mask.is_empty() {
                continue;
            }
            let src = self.load_operand(inst, 2, mask, ty)?;
            let mut out = OperandValue::default();
            for c in mask.comps() {
                let v = self.dxop_scalar(op, ty, vec![src.get(c)]);
                self.builder().apply_fast_math(v);
                out.set(c, v);
            }
            let out = self.apply_instruction_modifiers(inst, mask, ty, out);
            self.mark_precise_lanes(inst, mask, &out);
            self.store_operand(inst, dst_idx, mask, ty, out)?;
        }
        Ok(())
    }

    /// `rcp` has no dedicated dx op; it lowers to a reciprocal divide.
    pub(crate) fn convert_rcp(&mut self, inst: &Instruction, ty: ScalarType) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, mask, ty)?;
        let one = match ty {
            ScalarType::F64 => self
                .module
                .const_value(aero_dxil::Constant::F64(1.0f64.to_bits())),
            _ => self.const_f32(1.0),
        };
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.builder().binary(BinOp::FDiv, one, src.get(c));
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ty, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    /// Dot products pair the first N lanes of both sources; the scalar result
    /// broadcasts into every written lane.
    pub(crate) fn convert_dot(
        &mut self,
        inst: &Instruction,
        op: DxOp,
        lanes: u8,
    ) -> Result<()> {
        let ty = ScalarType::F32;
        let mask = self.dst_mask(inst, 0);
        let load_mask = CompMask::first_n(lanes);
        let a = self.load_operand(inst, 1, load_mask, ty)?;
        let b = self.load_operand(inst, 2, load_mask, ty)?;

        let mut args = Vec::with_capacity(lanes as usize * 2);
        for c in 0..lanes {
            args.push(a.get(c));
        }
        for c in 0..lanes {
            args.push(b.get(c));
        }
        let dot = self.dxop_scalar(op, ty, args);
        self.builder().apply_fast_math(dot);

        let mut out = OperandValue::default();
        for c in mask.comps() {
            out.set(c, dot);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ty, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ty, out)
    }

    /// Comparison: i1 result per lane, widened on store.
    pub(crate) fn convert_comparison(
        &mut self,
        inst: &Instruction,
        pred: CmpPred,
        ty: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ty)?;
        let b = self.load_operand(inst, 2, mask, ty)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = if pred.is_float() {
                self.builder().fcmp(pred, a.get(c), b.get(c))
            } else {
                self.builder().icmp(pred, a.get(c), b.get(c))
            };
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::I1, out)
    }

    /// Explicit numeric conversions, with compile-time folding for constant
    /// operands (including the saturation rules for out-of-range values).
    pub(crate) fn convert_cast(
        &mut self,
        inst: &Instruction,
        op: CastOp,
        from: ScalarType,
        to: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);

        // Constant fold when the source is a literal.
        if let Some(src_op) = inst.operands.get(1) {
            if src_op.kind == OperandKind::Imm32
                && matches!(op, CastOp::FPToSI | CastOp::FPToUI)
                && src_op.modifier == aero_dxbc::sm4::decode::OperandModifier::None
            {
                let swz = src_op.swizzle();
                let imm = src_op.imm;
                let mut out = OperandValue::default();
                for c in mask.comps() {
                    let bits = imm[swz.lane(c) as usize];
                    let folded = fold_float_to_int(f32::from_bits(bits), op == CastOp::FPToSI);
                    let v = self.const_i32(folded);
                    out.set(c, v);
                }
                return self.store_operand(inst, 0, mask, to, out);
            }
        }

        let src = self.load_operand(inst, 1, mask, from)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.builder().cast(op, src.get(c), Type::Scalar(to));
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, to, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, to, out)
    }

    /// `f32tof16` packs through the legacy conversion op.
    pub(crate) fn convert_f32tof16(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, mask, ScalarType::F32)?;
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = self.dxop(
                DxOp::LegacyF32ToF16,
                Type::Void,
                vec![src.get(c)],
                Type::I32,
            );
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::I32, out)
    }

    /// `f16tof32`: abs/neg source modifiers re-apply to the *result* of the
    /// conversion, so the operand is loaded unmodified first.
    pub(crate) fn convert_f16tof32(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src_op = inst.operands.get(1).cloned().ok_or_else(|| {
            ConvertError::MalformedBytecode("f16tof32 without source".into())
        })?;
        let modifier = src_op.modifier;
        let mut stripped = src_op;
        stripped.modifier = aero_dxbc::sm4::decode::OperandModifier::None;

        let mut out = OperandValue::default();
        for c in mask.comps() {
            let lane = stripped.swizzle().lane(c);
            let loaded = self.load_operand_lane_i32(&stripped, lane)?;
            let v = self.dxop(
                DxOp::LegacyF16ToF32,
                Type::Void,
                vec![loaded],
                Type::F32,
            );
            out.set(c, v);
        }
        if modifier.has_abs() {
            out = out.map(mask, |_, v| {
                self.dxop_scalar(DxOp::FAbs, ScalarType::F32, vec![v])
            });
        }
        if modifier.has_neg() {
            out = out.map(mask, |_, v| self.negate(v, ScalarType::F32));
        }
        let out = self.apply_instruction_modifiers(inst, mask, ScalarType::F32, out);
        self.store_operand(inst, 0, mask, ScalarType::F32, out)
    }
}

/// Constant-folds a float-to-int conversion under the fixed saturation
/// policy: out-of-range negatives clamp to signed-min / zero, positives to
/// signed-max / u32-max, and NaN produces the integer failure pattern.
fn fold_float_to_int(value: f32, signed: bool) -> u32 {
    if value.is_nan() {
        return 0xFEFE_FEFE;
    }
    if signed {
        if value <= i32::MIN as f32 {
            i32::MIN as u32
        } else if value >= i32::MAX as f32 {
            i32::MAX as u32
        } else {
            (value as i32) as u32
        }
    } else if value <= 0.0 {
        0
    } else if value >= u32::MAX as f32 {
        u32::MAX
    } else {
        value as u32
    }
}

#[cfg(test)]
mod tests {
    use super::fold_float_to_int;

    #[test]
    fn float_to_int_folding_saturates() {
        assert_eq!(fold_float_to_int(1.5, true), 1);
        assert_eq!(fold_float_to_int(-2.5, true), (-2i32) as u32);
        assert_eq!(fold_float_to_int(1e30, true), i32::MAX as u32);
        assert_eq!(fold_float_to_int(-1e30, true), i32::MIN as u32);
        assert_eq!(fold_float_to_int(2.5, false), 2);
        assert_eq!(fold_float_to_int(-1.0, false), 0);
        assert_eq!(fold_float_to_int(1e30, false), u32::MAX);
        assert_eq!(fold_float_to_int(f32::NAN, false), 0xFEFE_FEFE);
    }
}
