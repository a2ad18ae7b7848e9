//! Double-precision suite.
//!
//! Doubles occupy register lane pairs: `.xy` is the first double, `.zw` the
//! second. The operand model assembles (`MakeDouble`) and splits
//! (`SplitDouble`) the halves; handlers here work on the assembled lanes 0
//! and 2.

use aero_dxbc::comp::CompMask;
use aero_dxbc::sm4::decode::Instruction;
use aero_dxil::{BinOp, CastOp, CmpPred, DxOp, ScalarType, Type};

use crate::conv::Conversion;
use crate::error::Result;
use crate::operands::OperandValue;

/// Lanes holding assembled doubles for a pair mask.
fn double_lanes(mask: CompMask) -> Vec<u8> {
    let mut out = Vec::with_capacity(2);
    if mask.contains(0) || mask.contains(1) {
        out.push(0);
    }
    if mask.contains(2) || mask.contains(3) {
        out.push(2);
    }
    out
}

impl Conversion {
    pub(crate) fn convert_dmov(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let value = self.load_operand(inst, 1, mask, ScalarType::F64)?;
        self.store_operand(inst, 0, mask, ScalarType::F64, value)
    }

    pub(crate) fn convert_dmovc(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let cond = self.load_operand(inst, 1, mask, ScalarType::I32)?;
        let a = self.load_operand(inst, 2, mask, ScalarType::F64)?;
        let b = self.load_operand(inst, 3, mask, ScalarType::F64)?;
        let zero = self.const_i32(0);
        let mut out = OperandValue::default();
        for c in double_lanes(mask) {
            let is_set = self.builder().icmp(CmpPred::Ne, cond.get(c), zero);
            let v = self.builder().select(is_set, a.get(c), b.get(c));
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::F64, out)
    }

    pub(crate) fn convert_double_binary(&mut self, inst: &Instruction, op: BinOp) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ScalarType::F64)?;
        let b = self.load_operand(inst, 2, mask, ScalarType::F64)?;
        let mut out = OperandValue::default();
        for c in double_lanes(mask) {
            let v = self.builder().binary(op, a.get(c), b.get(c));
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ScalarType::F64, out)
    }

    pub(crate) fn convert_double_intrinsic(
        &mut self,
        inst: &Instruction,
        op: DxOp,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ScalarType::F64)?;
        let b = self.load_operand(inst, 2, mask, ScalarType::F64)?;
        let mut out = OperandValue::default();
        for c in double_lanes(mask) {
            let v = self.dxop_scalar(op, ScalarType::F64, vec![a.get(c), b.get(c)]);
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::F64, out)
    }

    pub(crate) fn convert_dfma(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let a = self.load_operand(inst, 1, mask, ScalarType::F64)?;
        let b = self.load_operand(inst, 2, mask, ScalarType::F64)?;
        let c_val = self.load_operand(inst, 3, mask, ScalarType::F64)?;
        let mut out = OperandValue::default();
        for c in double_lanes(mask) {
            let v = self.dxop_scalar(
                DxOp::Fma,
                ScalarType::F64,
                vec![a.get(c), b.get(c), c_val.get(c)],
            );
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::F64, out)
    }

    pub(crate) fn convert_drcp(&mut self, inst: &Instruction) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, mask, ScalarType::F64)?;
        let one = self
            .module
            .const_value(aero_dxil::Constant::F64(1.0f64.to_bits()));
        let mut out = OperandValue::default();
        for c in double_lanes(mask) {
            let v = self.builder().binary(BinOp::FDiv, one, src.get(c));
            self.builder().apply_fast_math(v);
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::F64, out)
    }

    /// Double comparisons iterate the source lane pairs; the i-th compared
    /// pair lands in the i-th lane of the 32-bit destination mask.
    pub(crate) fn convert_double_comparison(
        &mut self,
        inst: &Instruction,
        pred: CmpPred,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src_mask = CompMask::ALL;
        let a = self.load_operand(inst, 1, src_mask, ScalarType::F64)?;
        let b = self.load_operand(inst, 2, src_mask, ScalarType::F64)?;

        let dst_lanes: Vec<u8> = mask.comps().collect();
        let mut out = OperandValue::default();
        for (i, &dst_lane) in dst_lanes.iter().enumerate().take(2) {
            let src_lane = (i * 2) as u8;
            let v = self.builder().fcmp(pred, a.get(src_lane), b.get(src_lane));
            out.set(dst_lane, v);
        }
        let out_mask = CompMask(
            dst_lanes
                .iter()
                .take(2)
                .fold(0u8, |acc, &l| acc | (1 << l)),
        );
        self.store_operand(inst, 0, out_mask, ScalarType::I1, out)
    }

    /// `dtof`/`dtoi`/`dtou` through the legacy conversion ops.
    pub(crate) fn convert_from_double(
        &mut self,
        inst: &Instruction,
        op: DxOp,
        to: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, CompMask::ALL, ScalarType::F64)?;

        let dst_lanes: Vec<u8> = mask.comps().collect();
        let mut out = OperandValue::default();
        let mut out_mask = CompMask::NONE;
        for (i, &dst_lane) in dst_lanes.iter().enumerate().take(2) {
            let src_lane = (i * 2) as u8;
            let v = self.dxop(
                op,
                Type::Void,
                vec![src.get(src_lane)],
                Type::Scalar(to),
            );
            out.set(dst_lane, v);
            out_mask = out_mask.union(CompMask::for_comp(dst_lane));
        }
        self.store_operand(inst, 0, out_mask, to, out)
    }

    /// `ftod`/`itod`/`utod`: each 32-bit source lane pair i produces the
    /// double in destination lanes (2i, 2i+1).
    pub(crate) fn convert_to_double(
        &mut self,
        inst: &Instruction,
        op: CastOp,
        from: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, 0);
        let src = self.load_operand(inst, 1, CompMask::XY, from)?;

        let mut out = OperandValue::default();
        for (i, c) in double_lanes(mask).into_iter().enumerate() {
            let v = self.builder().cast(op, src.get(i as u8), Type::F64);
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::F64, out)
    }
}
