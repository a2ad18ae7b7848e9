//! Module serialization and the cleanup-pass seam.
//!
//! [`serialize`] produces the byte payload embedded in the `DXIL` container
//! part. The writer walks the module in a fixed order (constants, globals,
//! metadata, functions in id order, instructions in block order), so the
//! output is a pure function of module contents — two structurally equal
//! modules serialize identically, which the in-driver equivalence contract
//! depends on.
//!
//! The external IR cleanup pass plugs in through [`ModulePass`]; the
//! converter treats it as an opaque in-place transform.

use thiserror::Error;

use crate::inst::{Callee, InstKind, Terminator};
use crate::module::{Constant, Module, Value};
use crate::types::{ScalarType, Type};

/// Failure reported by a [`ModulePass`].
#[derive(Debug, Error)]
#[error("pass {pass}: {message}")]
pub struct PassError {
    pub pass: String,
    pub message: String,
}

/// An in-place module transform run after lowering (IR cleanup,
/// optimization). Implementations live outside the converter core.
pub trait ModulePass {
    fn name(&self) -> &str;
    fn run(&self, module: &mut Module) -> Result<(), PassError>;
}

/// Serialized-stream magic: `BC` + the DXIL dialect marker.
const MAGIC: u32 = 0x4344_5842; // "BXDC"
const VERSION: u32 = 1;

struct Writer {
    out: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, v: u8) {
        self.out.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.out.extend_from_slice(s.as_bytes());
    }

    fn ty(&mut self, ty: &Type) {
        match ty {
            Type::Void => self.u8(0),
            Type::Scalar(s) => {
                self.u8(1);
                self.u8(scalar_code(*s));
            }
            Type::Handle => self.u8(2),
            Type::Ptr(elem, space) => {
                self.u8(3);
                self.u8(*space as u8);
                self.ty(elem);
            }
            Type::Array(elem, count) => {
                self.u8(4);
                self.u32(*count);
                self.ty(elem);
            }
            Type::ResRet(s) => {
                self.u8(5);
                self.u8(scalar_code(*s));
            }
            Type::CBufRet(s) => {
                self.u8(6);
                self.u8(scalar_code(*s));
            }
            Type::Dimensions => self.u8(7),
            Type::SplitDouble => self.u8(8),
            Type::Pair(s) => {
                self.u8(9);
                self.u8(scalar_code(*s));
            }
            Type::Carry => self.u8(10),
            Type::SamplePos => self.u8(11),
        }
    }

    fn value(&mut self, v: Value) {
        match v {
            Value::Inst(id) => {
                self.u8(0);
                self.u32(id.0);
            }
            Value::Const(id) => {
                self.u8(1);
                self.u32(id.0);
            }
            Value::Global(id) => {
                self.u8(2);
                self.u32(id.0);
            }
        }
    }
}

fn scalar_code(s: ScalarType) -> u8 {
    match s {
        ScalarType::I1 => 0,
        ScalarType::I8 => 1,
        ScalarType::I16 => 2,
        ScalarType::I32 => 3,
        ScalarType::I64 => 4,
        ScalarType::F16 => 5,
        ScalarType::F32 => 6,
        ScalarType::F64 => 7,
    }
}

/// Serializes a module into its bitcode payload.
pub fn serialize(module: &Module) -> Vec<u8> {
    let mut w = Writer { out: Vec::new() };
    w.u32(MAGIC);
    w.u32(VERSION);
    w.str(&module.name);
    w.u8(module.shader_kind.map_or(0xff, |k| k.program_kind() as u8));
    w.u8(module.shader_model.0);
    w.u8(module.shader_model.1);
    w.u32(module.global_flags);

    w.u32(module.constants.len() as u32);
    for c in &module.constants {
        match c {
            Constant::I1(v) => {
                w.u8(0);
                w.u8(*v as u8);
            }
            Constant::I8(v) => {
                w.u8(1);
                w.u8(*v as u8);
            }
            Constant::I16(v) => {
                w.u8(2);
                w.u32(*v as u32);
            }
            Constant::I32(v) => {
                w.u8(3);
                w.u32(*v);
            }
            Constant::I64(v) => {
                w.u8(4);
                w.u64(*v);
            }
            Constant::F16(v) => {
                w.u8(5);
                w.u32(*v as u32);
            }
            Constant::F32(v) => {
                w.u8(6);
                w.u32(*v);
            }
            Constant::F64(v) => {
                w.u8(7);
                w.u64(*v);
            }
            Constant::Undef(ty) => {
                w.u8(8);
                w.ty(ty);
            }
            Constant::ZeroInit(ty) => {
                w.u8(9);
                w.ty(ty);
            }
            Constant::F32Array(values) => {
                w.u8(10);
                w.u32(values.len() as u32);
                for v in values {
                    w.u32(*v);
                }
            }
        }
    }

    w.u32(module.globals.len() as u32);
    for g in &module.globals {
        w.str(&g.name);
        w.u8(g.address_space as u8);
        w.u8(g.constant as u8);
        w.u32(g.align);
        w.ty(&g.ty);
        match &g.initializer {
            None => w.u8(0),
            Some(Constant::ZeroInit(_)) => w.u8(1),
            Some(Constant::F32Array(values)) => {
                w.u8(2);
                w.u32(values.len() as u32);
                for v in values {
                    w.u32(*v);
                }
            }
            Some(_) => w.u8(3),
        }
    }

    // Resource + signature metadata participate in the payload so the PSV
    // and reflection stay consistent with the code.
    w.u32(module.resources.len() as u32);
    for r in &module.resources {
        w.u8(match r.class {
            crate::module::ResourceClass::Srv => 0,
            crate::module::ResourceClass::Uav => 1,
            crate::module::ResourceClass::CBuffer => 2,
            crate::module::ResourceClass::Sampler => 3,
        });
        w.u32(r.id);
        w.str(&r.name);
        w.u32(r.space);
        w.u32(r.lower_bound);
        w.u32(r.range_size);
        w.u8(r.kind as u8);
        w.u8(r.elem_type.map_or(0xff, scalar_code));
        w.u32(r.stride);
        w.u8(match r.sampler_kind {
            None => 0xff,
            Some(crate::module::SamplerKind::Default) => 0,
            Some(crate::module::SamplerKind::Comparison) => 1,
        });
        w.u8(r.uav_flags.bits());
        w.u32(r.sample_count);
    }

    for sig in [
        &module.input_signature,
        &module.output_signature,
        &module.patch_constant_signature,
    ] {
        w.u32(sig.len() as u32);
        for e in sig {
            w.u32(e.id);
            w.str(&e.semantic_name);
            w.u32(e.semantic_indices.len() as u32);
            for i in &e.semantic_indices {
                w.u32(*i);
            }
            w.u32(e.system_value);
            w.u8(scalar_code(e.comp_type));
            w.u32(e.rows);
            w.u32(e.cols);
            w.u32(e.start_row.map_or(u32::MAX, |v| v));
            w.u32(e.start_col.map_or(u32::MAX, |v| v));
            w.u8(e.interpolation as u8);
            w.u32(e.stream);
        }
    }

    w.u32(module.functions.len() as u32);
    w.u32(module.entry.map_or(u32::MAX, |f| f.0));
    w.u32(module.patch_constant_entry.map_or(u32::MAX, |f| f.0));
    for func in &module.functions {
        w.str(&func.name);
        w.u8(func.is_entry as u8);
        w.ty(&func.ret_ty);
        w.u32(func.insts.len() as u32);
        for inst in &func.insts {
            w.ty(&inst.ty);
            w.u8(inst.precise as u8);
            w.u8(inst.fast_math.bits());
            match &inst.kind {
                InstKind::Binary { op, lhs, rhs } => {
                    w.u8(0);
                    w.u8(*op as u8);
                    w.value(*lhs);
                    w.value(*rhs);
                }
                InstKind::Cmp { pred, lhs, rhs } => {
                    w.u8(1);
                    w.u8(*pred as u8);
                    w.value(*lhs);
                    w.value(*rhs);
                }
                InstKind::Cast { op, value } => {
                    w.u8(2);
                    w.u8(*op as u8);
                    w.value(*value);
                }
                InstKind::Select {
                    cond,
                    on_true,
                    on_false,
                } => {
                    w.u8(3);
                    w.value(*cond);
                    w.value(*on_true);
                    w.value(*on_false);
                }
                InstKind::Call { callee, args } => {
                    w.u8(4);
                    match callee {
                        Callee::DxOp(op, overload) => {
                            w.u8(0);
                            w.u32(*op as u32);
                            w.ty(overload);
                        }
                        Callee::Function(f) => {
                            w.u8(1);
                            w.u32(f.0);
                        }
                    }
                    w.u32(args.len() as u32);
                    for a in args {
                        w.value(*a);
                    }
                }
                InstKind::ExtractValue { value, index } => {
                    w.u8(5);
                    w.value(*value);
                    w.u32(*index);
                }
                InstKind::Load { ptr } => {
                    w.u8(6);
                    w.value(*ptr);
                }
                InstKind::Store { ptr, value } => {
                    w.u8(7);
                    w.value(*ptr);
                    w.value(*value);
                }
                InstKind::Gep { base, indices } => {
                    w.u8(8);
                    w.value(*base);
                    w.u32(indices.len() as u32);
                    for i in indices {
                        w.value(*i);
                    }
                }
                InstKind::Alloca { elem, count } => {
                    w.u8(9);
                    w.ty(elem);
                    w.u32(*count);
                }
                InstKind::AtomicRmw { op, ptr, value } => {
                    w.u8(10);
                    w.u8(*op as u8);
                    w.value(*ptr);
                    w.value(*value);
                }
                InstKind::AtomicCmpXchg {
                    ptr,
                    expected,
                    replacement,
                } => {
                    w.u8(11);
                    w.value(*ptr);
                    w.value(*expected);
                    w.value(*replacement);
                }
            }
        }
        w.u32(func.blocks.len() as u32);
        for block in &func.blocks {
            w.str(&block.name);
            w.u32(block.insts.len() as u32);
            for inst in &block.insts {
                w.u32(inst.0);
            }
            match block.terminator.as_ref() {
                None => w.u8(0xff),
                Some(Terminator::Ret { value }) => {
                    w.u8(0);
                    match value {
                        None => w.u8(0),
                        Some(v) => {
                            w.u8(1);
                            w.value(*v);
                        }
                    }
                }
                Some(Terminator::Br { target }) => {
                    w.u8(1);
                    w.u32(target.0);
                }
                Some(Terminator::CondBr {
                    cond,
                    then_bb,
                    else_bb,
                }) => {
                    w.u8(2);
                    w.value(*cond);
                    w.u32(then_bb.0);
                    w.u32(else_bb.0);
                }
                Some(Terminator::Switch {
                    value,
                    default,
                    cases,
                }) => {
                    w.u8(3);
                    w.value(*value);
                    w.u32(default.0);
                    w.u32(cases.len() as u32);
                    for (v, bb) in cases {
                        w.u32(*v);
                        w.u32(bb.0);
                    }
                }
                Some(Terminator::Unreachable) => w.u8(4),
            }
        }
    }

    w.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IrBuilder;
    use crate::module::Function;

    fn tiny_module() -> Module {
        let mut module = Module::new("t");
        let mut f = Function::new("main", Type::Void);
        f.is_entry = true;
        let entry = f.add_block("entry");
        let id = module.add_function(f);
        module.entry = Some(id);
        let mut b = IrBuilder::new(&mut module, id, entry);
        let one = b.module().const_f32(1.0);
        let two = b.module().const_f32(2.0);
        let sum = b.binary(crate::inst::BinOp::FAdd, one, two);
        b.apply_fast_math(sum);
        b.terminate(Terminator::Ret { value: None });
        module
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = serialize(&tiny_module());
        let b = serialize(&tiny_module());
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn serialization_reflects_content_changes() {
        let base = serialize(&tiny_module());
        let mut changed = tiny_module();
        changed.global_flags = 1;
        assert_ne!(base, serialize(&changed));
    }
}
