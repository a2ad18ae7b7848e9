//! Interface (`fcall`) lowering.
//!
//! Class-instance method calls are resolved at runtime through a selection
//! integer stored in the reserved interface-data constant buffer (space 0,
//! slot 14). The selection picks a function table; the call site index picks
//! the method within it. Lowering emits a switch over every table the
//! interface can bind, with a direct call to the table's body in each case.

use aero_dxbc::sm4::decode::{Instruction, OperandIndex};
use aero_dxil::{DxOp, ScalarType, Terminator, Type, Value};

use crate::conv::Conversion;
use crate::error::{ConvertError, Result};

impl Conversion {
    pub(crate) fn convert_fcall(&mut self, inst: &Instruction) -> Result<()> {
        let op = inst
            .operands
            .first()
            .cloned()
            .ok_or_else(|| ConvertError::MalformedBytecode("fcall without operand".into()))?;

        // fp<iface>[array_index][call_site]
        let iface_id = self.static_index(&op, 0)?;
        let (array_base, array_dynamic) = match op.indices.get(1) {
            Some(OperandIndex::Imm32(v)) => (*v, None),
            Some(OperandIndex::Imm32PlusRelative(base, rel)) => {
                (*base, Some(OperandIndex::Relative(rel.clone())))
            }
            Some(OperandIndex::Relative(rel)) => {
                (0, Some(OperandIndex::Relative(rel.clone())))
            }
            _ => (0, None),
        };
        let call_site = op
            .indices
            .get(2)
            .and_then(|i| i.as_imm())
            .unwrap_or(0) as usize;

        let iface = self
            .analysis
            .interfaces
            .get(&iface_id)
            .cloned()
            .ok_or_else(|| {
                ConvertError::MalformedBytecode(format!(
                    "fcall references undeclared interface fp{iface_id}"
                ))
            })?;

        // Selection integer: interface-data CB at the interface's flat slot.
        let handle = self.interface_data_handle()?;
        let flat = self.const_i32(iface_id + array_base);
        let flat = match array_dynamic {
            Some(index) => {
                let dynamic = self.load_index(&index)?;
                self.builder().add(flat, dynamic)
            }
            None => flat,
        };
        let four = self.const_i32(4);
        let byte_offset = self.builder().mul(flat, four);
        let align = self.const_i32(4);
        let selection = self.dxop(
            DxOp::CBufferLoad,
            Type::I32,
            vec![handle, byte_offset, align],
            Type::I32,
        );

        // Switch over the viable tables, statically calling each table's
        // body for this call site.
        let end = self.add_block(format!("fcall{}.end", iface_id));
        let mut cases = Vec::with_capacity(iface.tables.len());
        let pre = self.block;
        for &table_id in &iface.tables {
            let body_id = self
                .analysis
                .function_tables
                .get(&table_id)
                .and_then(|bodies| bodies.get(call_site))
                .copied()
                .ok_or_else(|| {
                    ConvertError::MalformedBytecode(format!(
                        "function table ft{table_id} has no body for call site {call_site}"
                    ))
                })?;
            let case_bb = self.add_block(format!("fcall{}.ft{}", iface_id, table_id));
            self.block = case_bb;
            let callee = self.label_function(body_id, true);
            self.builder().call_function(callee, Vec::new(), Type::Void);
            self.builder().terminate(Terminator::Br { target: end });
            cases.push((table_id, case_bb));
        }

        self.block = pre;
        self.builder().terminate(Terminator::Switch {
            value: selection,
            default: end,
            cases,
        });
        self.block = end;
        Ok(())
    }

    /// A `this`-pointer read: class-instance data from the interface-data
    /// constant buffer at `NumIfaces + iface_array_index`.
    pub(crate) fn load_this_pointer_lane(
        &mut self,
        op: &aero_dxbc::sm4::decode::Operand,
        _lane: u8,
        ty: ScalarType,
    ) -> Result<Value> {
        let num_ifaces = self.analysis.interfaces.len() as u32;
        let array_index = op
            .indices
            .first()
            .and_then(|i| i.as_imm())
            .unwrap_or(0);
        let handle = self.interface_data_handle()?;
        let flat = self.const_i32(num_ifaces + array_index);
        let four = self.const_i32(4);
        let byte_offset = self.builder().mul(flat, four);
        let align = self.const_i32(4);
        let value = self.dxop(
            DxOp::CBufferLoad,
            Type::I32,
            vec![handle, byte_offset, align],
            Type::I32,
        );
        self.cast_value(value, ScalarType::I32, ty)
    }
}
