//! Hull-shader phase structure.
//!
//! The control-point phase lowers into `main`. Every fork/join phase body is
//! appended to a single `pc_main` function, wrapped in a synthesized loop
//! that runs the body once per declared phase instance; the fork/join
//! instance-id operand reads the loop's induction variable. A `ret` inside a
//! phase ends only the current instance.

use aero_dxbc::sm4::decode::Instruction;
use aero_dxil::{BlockId, CmpPred, FuncId, Function, Terminator, Type, Value};

use crate::conv::Conversion;
use crate::error::{ConvertError, Result};
use crate::scopes::Scope;

impl Conversion {
    /// `hs_control_point_phase`: translation (re-)enters `main`.
    pub(crate) fn convert_hs_control_point_phase(&mut self) -> Result<()> {
        self.in_patch_constant_phase = false;
        Ok(())
    }

    /// `hs_fork_phase` / `hs_join_phase`: close the previous phase and open a
    /// hull loop for this one in `pc_main`.
    pub(crate) fn convert_hs_fork_join_phase(&mut self, _inst: &Instruction) -> Result<()> {
        // Close the preceding phase: either the control-point entry or an
        // earlier fork/join loop.
        if self.scopes.in_hull_loop() {
            self.finish_hull_phase()?;
        } else if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Ret { value: None });
        }

        // Fork/join phases are consumed in stream order; the analysis pass
        // recorded them the same way.
        let instance_count = {
            let fork_join: Vec<u32> = self
                .analysis
                .hull_phases
                .iter()
                .filter(|p| p.kind != crate::analyze::HullPhaseKind::ControlPoint)
                .map(|p| p.instance_count)
                .collect();
            let count = fork_join
                .get(self.hull_phase_cursor)
                .copied()
                .unwrap_or(1)
                .max(1);
            self.hull_phase_cursor += 1;
            count
        };

        let pc_func = self.patch_constant_function();
        self.in_patch_constant_phase = true;

        // First phase in pc_main: move to its entry and declare the
        // patch-constant indexable temps.
        if self.func != pc_func {
            self.func = pc_func;
            self.block = BlockId(0);
            self.scopes = Default::default();
            self.scopes.push(Scope::Function { ret_count: 0 });
            self.declare_indexable_temps(true);
            self.insert_sm50_resource_handles()?;
        }

        let n = self.scopes.hull_count;
        let body = self.add_block(format!("hull{n}.body"));
        let latch = self.add_block(format!("hull{n}.latch"));
        let exit = self.add_block(format!("hull{n}.end"));

        // Induction storage is allocated on the first fork/join opcode and
        // reset per phase.
        let induction = self.hull_induction_storage();
        let zero = self.const_i32(0);
        self.builder().store(induction, zero);
        self.builder().terminate(Terminator::Br { target: body });

        self.scopes.push(Scope::HullLoop {
            body,
            latch,
            exit,
            induction,
            trip_count: instance_count,
        });
        self.block = body;
        Ok(())
    }

    /// Seals the open hull loop: the latch increments the induction variable
    /// and re-enters the body until the trip count is reached.
    pub(crate) fn finish_hull_phase(&mut self) -> Result<()> {
        // Unwind any scopes the phase left open down to its hull loop.
        let (body, latch, exit, induction, trip_count) = loop {
            match self.scopes.pop() {
                Some(Scope::HullLoop {
                    body,
                    latch,
                    exit,
                    induction,
                    trip_count,
                }) => break (body, latch, exit, induction, trip_count),
                Some(_) => continue,
                None => {
                    return Err(ConvertError::MalformedBytecode(
                        "hull phase ended without an open phase loop".into(),
                    ))
                }
            }
        };

        if !self.current_block_terminated() {
            self.builder().terminate(Terminator::Br { target: latch });
        }

        self.block = latch;
        let current = self.builder().load(induction);
        let one = self.const_i32(1);
        let next = self.builder().add(current, one);
        self.builder().store(induction, next);
        let count = self.const_i32(trip_count);
        let done = self.builder().icmp(CmpPred::Eq, next, count);
        self.builder().terminate(Terminator::CondBr {
            cond: done,
            then_bb: exit,
            else_bb: body,
        });

        self.block = exit;
        Ok(())
    }

    /// The current fork/join instance id: the hull loop's induction value.
    pub(crate) fn hull_instance_id(&mut self) -> Result<Value> {
        let induction = match self.scopes.parent_hull_loop() {
            Some(Scope::HullLoop { induction, .. }) => *induction,
            _ => {
                return Err(ConvertError::MalformedBytecode(
                    "fork/join instance id read outside a phase".into(),
                ))
            }
        };
        Ok(self.builder().load(induction))
    }

    fn hull_induction_storage(&mut self) -> Value {
        if let Some(v) = self.hull_induction {
            return v;
        }
        // Allocate in the entry block of pc_main so every phase loop can
        // share it.
        let saved = self.block;
        self.block = BlockId(0);
        let storage = self.builder().alloca(Type::I32, 1);
        self.block = saved;
        self.hull_induction = Some(storage);
        storage
    }

    /// The `pc_main` function, created on first fork/join phase.
    fn patch_constant_function(&mut self) -> FuncId {
        if let Some(f) = self.module.patch_constant_entry {
            return f;
        }
        let mut func = Function::new("pc_main", Type::Void);
        func.is_entry = true;
        func.add_block("entry");
        let f = self.module.add_function(func);
        self.module.patch_constant_entry = Some(f);
        f
    }
}
