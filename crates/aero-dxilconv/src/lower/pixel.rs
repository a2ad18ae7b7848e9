//! Pixel-shader specials: discard, LOD queries, and attribute evaluation.

use aero_dxbc::comp::CompMask;
use aero_dxbc::sm4::decode::{Instruction, OperandKind};
use aero_dxil::{DxOp, ResourceClass, ScalarType, Type};

use crate::conv::Conversion;
use crate::error::{ConvertError, Result};
use crate::operands::OperandValue;

impl Conversion {
    pub(crate) fn convert_discard(&mut self, inst: &Instruction) -> Result<()> {
        let cond = self.load_znz_condition(inst, 0)?;
        self.dxop_void(DxOp::Discard, Type::Void, vec![cond]);
        Ok(())
    }

    /// `lod` produces both the clamped and unclamped level; the resource
    /// swizzle routes them into the destination (x selects clamped, y
    /// unclamped).
    pub(crate) fn convert_lod(&mut self, inst: &Instruction) -> Result<()> {
        let res_op = inst.operands[2].clone();
        let info = self.resource_info(&res_op, ResourceClass::Srv)?;
        let srv = self.handle_for_operand(&res_op, ResourceClass::Srv)?;
        let samp_op = inst.operands[3].clone();
        let sampler = self.handle_for_operand(&samp_op, ResourceClass::Sampler)?;

        let coord_mask = CompMask::first_n(info.kind.coord_count().min(3) as u8);
        let coords = self.load_operand(inst, 1, coord_mask, ScalarType::F32)?;
        let mut coord_args = Vec::with_capacity(3);
        for c in 0..3u8 {
            if coord_mask.contains(c) {
                coord_args.push(coords.get(c));
            } else {
                coord_args.push(self.undef_f32());
            }
        }

        let mut variants = [None, None];
        for (slot, clamped) in [(0usize, true), (1usize, false)] {
            let clamped_flag = self.const_bool(clamped);
            let mut args = vec![srv, sampler];
            args.extend(coord_args.iter().copied());
            args.push(clamped_flag);
            variants[slot] = Some(self.dxop(
                DxOp::CalculateLOD,
                Type::F32,
                args,
                Type::F32,
            ));
        }

        let mask = self.dst_mask(inst, 0);
        let swz = res_op.swizzle();
        let zero = self.const_f32(0.0);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = match swz.lane(c) {
                0 => variants[0].unwrap(),
                1 => variants[1].unwrap(),
                _ => zero,
            };
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::F32, out)
    }

    /// `eval_snapped` / `eval_sample_index` / `eval_centroid`: resolve the
    /// source input element and pass its (element, row, col) plus the
    /// evaluator-specific arguments.
    pub(crate) fn convert_eval(&mut self, inst: &Instruction, op: DxOp) -> Result<()> {
        let src_op = inst.operands[1].clone();
        if src_op.kind != OperandKind::Input {
            return Err(ConvertError::MalformedBytecode(format!(
                "{} requires an input register source",
                inst.opcode.name()
            )));
        }
        let reg = src_op.reg_imm().ok_or_else(|| {
            ConvertError::MalformedBytecode("eval with relative input register".into())
        })?;

        // Extra arguments evaluate once, not per lane.
        let extra: Vec<aero_dxil::Value> = match op {
            DxOp::EvalSnapped => {
                let offsets = self.load_operand(inst, 2, CompMask::XY, ScalarType::I32)?;
                vec![offsets.get(0), offsets.get(1)]
            }
            DxOp::EvalSampleIndex => {
                let index = self.load_operand(inst, 2, CompMask::X, ScalarType::I32)?;
                vec![index.get(0)]
            }
            _ => Vec::new(),
        };

        let mask = self.dst_mask(inst, 0);
        let swz = src_op.swizzle();
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let lane = swz.lane(c) as u32;
            let (elem, row, col) = self
                .input_sig
                .get(reg, lane, 0)
                .map(|(e, r, col)| (e.id, r, col))
                .ok_or_else(|| {
                    ConvertError::MalformedBytecode(format!(
                        "eval of unallocated input v{reg}.{lane}"
                    ))
                })?;
            let elem_id = self.const_i32(elem);
            let row = self.const_i32(row);
            let col = self.const_i8(col as i8);
            let mut args = vec![elem_id, row, col];
            args.extend(extra.iter().copied());
            let v = self.dxop_scalar(op, ScalarType::F32, args);
            out.set(c, v);
        }
        let out = self.apply_instruction_modifiers(inst, mask, ScalarType::F32, out);
        self.mark_precise_lanes(inst, mask, &out);
        self.store_operand(inst, 0, mask, ScalarType::F32, out)
    }
}
