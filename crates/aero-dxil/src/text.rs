//! Textual IR writer.
//!
//! Produces an LLVM-flavoured listing for the CLI's `/emit-llvm` mode and for
//! test failure output. The listing is purely informational; nothing parses
//! it back.

use std::fmt::Write;

use crate::inst::{Callee, InstKind, Terminator};
use crate::module::{Constant, Function, Module, Value};
use crate::types::Type;

pub fn write_module(module: &Module) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "; module: {}", module.name);
    if let Some(kind) = module.shader_kind {
        let _ = writeln!(
            out,
            "; shader: {:?} {}.{}",
            kind, module.shader_model.0, module.shader_model.1
        );
    }
    for r in &module.resources {
        let _ = writeln!(
            out,
            "; resource {:?} id={} \"{}\" space={} lb={} size={} kind={:?}",
            r.class, r.id, r.name, r.space, r.lower_bound, r.range_size, r.kind
        );
    }
    for g in &module.globals {
        let _ = writeln!(
            out,
            "@{} = addrspace({}) global {}",
            g.name,
            g.address_space as u32,
            type_name(&g.ty)
        );
    }
    for func in &module.functions {
        out.push('\n');
        write_function(&mut out, module, func);
    }
    out
}

fn write_function(out: &mut String, module: &Module, func: &Function) {
    let _ = writeln!(out, "define {} @{}() {{", type_name(&func.ret_ty), func.name);
    for block in &func.blocks {
        let _ = writeln!(out, "{}:", block.name);
        for &inst_id in &block.insts {
            let inst = func.inst(inst_id);
            let mut line = String::new();
            if inst.ty != Type::Void {
                let _ = write!(line, "  %{} = ", inst_id.0);
            } else {
                line.push_str("  ");
            }
            match &inst.kind {
                InstKind::Binary { op, lhs, rhs } => {
                    let _ = write!(
                        line,
                        "{:?} {} {}, {}",
                        op,
                        type_name(&inst.ty),
                        value_name(module, *lhs),
                        value_name(module, *rhs)
                    );
                }
                InstKind::Cmp { pred, lhs, rhs } => {
                    let _ = write!(
                        line,
                        "cmp {:?} {}, {}",
                        pred,
                        value_name(module, *lhs),
                        value_name(module, *rhs)
                    );
                }
                InstKind::Cast { op, value } => {
                    let _ = write!(
                        line,
                        "{:?} {} to {}",
                        op,
                        value_name(module, *value),
                        type_name(&inst.ty)
                    );
                }
                InstKind::Select {
                    cond,
                    on_true,
                    on_false,
                } => {
                    let _ = write!(
                        line,
                        "select {}, {}, {}",
                        value_name(module, *cond),
                        value_name(module, *on_true),
                        value_name(module, *on_false)
                    );
                }
                InstKind::Call { callee, args } => {
                    let callee_name = match callee {
                        Callee::DxOp(op, overload) => {
                            let suffix = overload
                                .as_scalar()
                                .map(|s| format!(".{}", s.suffix()))
                                .unwrap_or_default();
                            format!("dx.op.{}{}", op.name(), suffix)
                        }
                        Callee::Function(f) => module.func(*f).name.clone(),
                    };
                    let _ = write!(line, "call {} @{}(", type_name(&inst.ty), callee_name);
                    if let Callee::DxOp(op, _) = callee {
                        let _ = write!(line, "i32 {}", *op as u32);
                        if !args.is_empty() {
                            line.push_str(", ");
                        }
                    }
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            line.push_str(", ");
                        }
                        line.push_str(&value_name(module, *a));
                    }
                    line.push(')');
                }
                InstKind::ExtractValue { value, index } => {
                    let _ = write!(
                        line,
                        "extractvalue {}, {}",
                        value_name(module, *value),
                        index
                    );
                }
                InstKind::Load { ptr } => {
                    let _ = write!(
                        line,
                        "load {}, {}",
                        type_name(&inst.ty),
                        value_name(module, *ptr)
                    );
                }
                InstKind::Store { ptr, value } => {
                    let _ = write!(
                        line,
                        "store {}, {}",
                        value_name(module, *value),
                        value_name(module, *ptr)
                    );
                }
                InstKind::Gep { base, indices } => {
                    let _ = write!(line, "getelementptr {}", value_name(module, *base));
                    for i in indices {
                        let _ = write!(line, ", {}", value_name(module, *i));
                    }
                }
                InstKind::Alloca { elem, count } => {
                    let _ = write!(line, "alloca {} x {}", count, type_name(elem));
                }
                InstKind::AtomicRmw { op, ptr, value } => {
                    let _ = write!(
                        line,
                        "atomicrmw {:?} {}, {} monotonic",
                        op,
                        value_name(module, *ptr),
                        value_name(module, *value)
                    );
                }
                InstKind::AtomicCmpXchg {
                    ptr,
                    expected,
                    replacement,
                } => {
                    let _ = write!(
                        line,
                        "cmpxchg {}, {}, {} monotonic",
                        value_name(module, *ptr),
                        value_name(module, *expected),
                        value_name(module, *replacement)
                    );
                }
            }
            if inst.precise {
                line.push_str(" !precise");
            }
            let _ = writeln!(out, "{line}");
        }
        match block.terminator.as_ref() {
            None => {
                let _ = writeln!(out, "  ; <missing terminator>");
            }
            Some(Terminator::Ret { value: None }) => {
                let _ = writeln!(out, "  ret void");
            }
            Some(Terminator::Ret { value: Some(v) }) => {
                let _ = writeln!(out, "  ret {}", value_name(module, *v));
            }
            Some(Terminator::Br { target }) => {
                let _ = writeln!(out, "  br label %{}", func.block(*target).name);
            }
            Some(Terminator::CondBr {
                cond,
                then_bb,
                else_bb,
            }) => {
                let _ = writeln!(
                    out,
                    "  br {}, label %{}, label %{}",
                    value_name(module, *cond),
                    func.block(*then_bb).name,
                    func.block(*else_bb).name
                );
            }
            Some(Terminator::Switch {
                value,
                default,
                cases,
            }) => {
                let _ = writeln!(
                    out,
                    "  switch {}, label %{} [",
                    value_name(module, *value),
                    func.block(*default).name
                );
                for (v, bb) in cases {
                    let _ = writeln!(out, "    i32 {}, label %{}", v, func.block(*bb).name);
                }
                let _ = writeln!(out, "  ]");
            }
            Some(Terminator::Unreachable) => {
                let _ = writeln!(out, "  unreachable");
            }
        }
    }
    let _ = writeln!(out, "}}");
}

fn value_name(module: &Module, value: Value) -> String {
    match value {
        Value::Inst(id) => format!("%{}", id.0),
        Value::Global(id) => format!("@{}", module.global(id).name),
        Value::Const(id) => match &module.constants[id.index()] {
            Constant::I1(v) => format!("i1 {}", *v as u8),
            Constant::I8(v) => format!("i8 {v}"),
            Constant::I16(v) => format!("i16 {v}"),
            Constant::I32(v) => format!("i32 {}", *v as i32),
            Constant::I64(v) => format!("i64 {}", *v as i64),
            Constant::F16(v) => format!("half 0x{v:04x}"),
            Constant::F32(v) => format!("float {}", f32::from_bits(*v)),
            Constant::F64(v) => format!("double {}", f64::from_bits(*v)),
            Constant::Undef(ty) => format!("{} undef", type_name(ty)),
            Constant::ZeroInit(ty) => format!("{} zeroinitializer", type_name(ty)),
            Constant::F32Array(values) => format!("[{} x float] <icb>", values.len()),
        },
    }
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Void => "void".into(),
        Type::Scalar(s) => match s.suffix() {
            "f16" => "half".into(),
            "f32" => "float".into(),
            "f64" => "double".into(),
            other => other.into(),
        },
        Type::Handle => "%dx.types.Handle".into(),
        Type::Ptr(elem, space) => format!("{} addrspace({})*", type_name(elem), *space as u32),
        Type::Array(elem, count) => format!("[{} x {}]", count, type_name(elem)),
        Type::ResRet(s) => format!("%dx.types.ResRet.{}", s.suffix()),
        Type::CBufRet(s) => format!("%dx.types.CBufRet.{}", s.suffix()),
        Type::Dimensions => "%dx.types.Dimensions".into(),
        Type::SplitDouble => "%dx.types.splitdouble".into(),
        Type::Pair(s) => format!("%dx.types.twin.{}", s.suffix()),
        Type::Carry => "%dx.types.i32c".into(),
        Type::SamplePos => "%dx.types.SamplePos".into(),
    }
}
