//! Geometry-shader stream handling.
//!
//! Single-stream shaders write outputs directly. With more than one declared
//! stream, output-register writes are buffered into shadow temp registers and
//! flushed into the real output signature at every emit point, so the values
//! observed by `EmitStream` are exactly those written since the last emit.

use aero_dxbc::sm4::decode::{Instruction, OperandKind};
use aero_dxil::{DxOp, ScalarType, Type};

use super::EmitKind;
use crate::conv::Conversion;
use crate::error::Result;

impl Conversion {
    pub(crate) fn convert_emit_stream(
        &mut self,
        inst: &Instruction,
        kind: EmitKind,
    ) -> Result<()> {
        // The stream id comes from the `m#` operand on the _stream forms;
        // plain emit/cut address stream 0.
        let stream = inst
            .operands
            .first()
            .filter(|op| op.kind == OperandKind::Stream)
            .and_then(|op| op.reg_imm())
            .unwrap_or(0);
        self.current_stream = stream;

        if kind != EmitKind::Cut && self.analysis.multi_stream() {
            self.flush_gs_shadow_outputs(stream)?;
        }

        let op = match kind {
            EmitKind::Emit => DxOp::EmitStream,
            EmitKind::Cut => DxOp::CutStream,
            EmitKind::EmitThenCut => DxOp::EmitThenCutStream,
        };
        let stream_imm = self.const_i8(stream as i8);
        self.dxop_void(op, Type::Void, vec![stream_imm]);
        Ok(())
    }

    /// Copies the shadow temp registers of `stream`'s output elements into
    /// the real output signature.
    fn flush_gs_shadow_outputs(&mut self, stream: u32) -> Result<()> {
        let elements: Vec<_> = self
            .output_sig
            .elements
            .iter()
            .filter(|e| e.stream == stream && e.start_row.is_some())
            .map(|e| {
                (
                    e.id,
                    e.start_row.unwrap(),
                    e.start_col.unwrap(),
                    e.rows,
                    e.cols,
                    e.comp_type,
                )
            })
            .collect();

        for (elem_id, start_row, start_col, rows, cols, comp_type) in elements {
            for r in 0..rows {
                for c in 0..cols {
                    let shadow_reg = self.gs_shadow_base + start_row + r;
                    let flat = shadow_reg * 4 + start_col + c;
                    let index = self.const_i32(flat);
                    let loaded = self.dxop_scalar(
                        DxOp::TempRegLoad,
                        load_type(comp_type),
                        vec![index],
                    );
                    let elem = self.const_i32(elem_id);
                    let row = self.const_i32(r);
                    let col = self.const_i8(c as i8);
                    self.dxop_void(
                        DxOp::StoreOutput,
                        Type::Scalar(load_type(comp_type)),
                        vec![elem, row, col, loaded],
                    );
                }
            }
        }
        Ok(())
    }
}

fn load_type(ty: ScalarType) -> ScalarType {
    match ty {
        ScalarType::I1 => ScalarType::I32,
        other => other,
    }
}
