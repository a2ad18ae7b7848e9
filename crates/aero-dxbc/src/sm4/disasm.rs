//! Token-level disassembly.
//!
//! A readable listing of a decoded program for inspection and debugging; not
//! a round-trippable assembly syntax.

use std::fmt::Write;

use crate::comp::CompMask;
use crate::sm4::decode::{
    CompSelection, Instruction, Operand, OperandIndex, OperandKind, OperandModifier,
};
use crate::sm4::{decode_program, Sm4Program};

/// Disassembles a whole program, one instruction per line.
pub fn disassemble(program: &Sm4Program) -> Result<String, crate::sm4::DecodeError> {
    let instructions = decode_program(program)?;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "// {:?} shader model {}.{}, {} tokens",
        program.stage,
        program.model.major,
        program.model.minor,
        program.tokens.len()
    );
    let mut indent = 0usize;
    for inst in &instructions {
        use crate::sm4::Opcode::*;
        if matches!(
            inst.opcode,
            Else | EndIf | EndLoop | EndSwitch | Case | Default
        ) {
            indent = indent.saturating_sub(1);
        }
        let _ = writeln!(out, "{}{}", "  ".repeat(indent), format_instruction(inst));
        if matches!(
            inst.opcode,
            If | Else | Loop | Switch | Case | Default
        ) {
            indent += 1;
        }
    }
    Ok(out)
}

fn format_instruction(inst: &Instruction) -> String {
    let mut line = String::new();
    line.push_str(inst.opcode.name());
    if inst.saturate {
        line.push_str("_sat");
    }
    if let Some(custom) = &inst.custom {
        let _ = write!(
            line,
            " class={} ({} dwords)",
            custom.class,
            custom.payload.len()
        );
        return line;
    }
    for (i, op) in inst.operands.iter().enumerate() {
        line.push_str(if i == 0 { " " } else { ", " });
        line.push_str(&format_operand(op));
    }
    if !inst.extra.is_empty() {
        let _ = write!(line, " ; payload {:?}", inst.extra);
    }
    line
}

fn register_prefix(kind: OperandKind) -> &'static str {
    match kind {
        OperandKind::Temp => "r",
        OperandKind::Input => "v",
        OperandKind::Output => "o",
        OperandKind::IndexableTemp => "x",
        OperandKind::Sampler => "s",
        OperandKind::Resource => "t",
        OperandKind::ConstantBuffer => "cb",
        OperandKind::ImmediateConstantBuffer => "icb",
        OperandKind::UnorderedAccessView => "u",
        OperandKind::ThreadGroupSharedMemory => "g",
        OperandKind::Label => "l",
        OperandKind::FunctionBody => "fb",
        OperandKind::FunctionTable => "ft",
        OperandKind::Interface => "fp",
        OperandKind::Stream => "m",
        OperandKind::InputControlPoint => "vicp",
        OperandKind::OutputControlPoint => "vocp",
        OperandKind::InputPatchConstant => "vpc",
        OperandKind::OutputDepth => "oDepth",
        OperandKind::OutputDepthGreaterEqual => "oDepthGE",
        OperandKind::OutputDepthLessEqual => "oDepthLE",
        OperandKind::OutputStencilRef => "oStencilRef",
        OperandKind::OutputCoverageMask => "oMask",
        OperandKind::InputCoverageMask => "vCoverage",
        OperandKind::InnerCoverage => "vInnerCoverage",
        OperandKind::InputThreadId => "vThreadID",
        OperandKind::InputThreadGroupId => "vThreadGroupID",
        OperandKind::InputThreadIdInGroup => "vThreadIDInGroup",
        OperandKind::InputThreadIdInGroupFlattened => "vThreadIDInGroupFlattened",
        OperandKind::InputPrimitiveId => "vPrim",
        OperandKind::InputGsInstanceId => "vGSInstanceID",
        OperandKind::InputForkInstanceId => "vForkInstanceID",
        OperandKind::InputJoinInstanceId => "vJoinInstanceID",
        OperandKind::InputDomainPoint => "vDomain",
        OperandKind::OutputControlPointId => "vOutputControlPointID",
        OperandKind::CycleCounter => "vCycleCounter",
        OperandKind::ThisPointer => "this",
        OperandKind::Rasterizer => "rasterizer",
        OperandKind::Null => "null",
        OperandKind::Imm32 | OperandKind::Imm64 => "l",
        OperandKind::FunctionInput => "vFuncIn",
        OperandKind::FunctionOutput => "vFuncOut",
    }
}

fn format_operand(op: &Operand) -> String {
    let mut out = String::new();

    if op.modifier.has_neg() {
        out.push('-');
    }
    if op.modifier.has_abs() {
        out.push('|');
    }

    match op.kind {
        OperandKind::Imm32 => {
            let lanes = if op.num_components == 1 { 1 } else { 4 };
            out.push_str("l(");
            for (i, v) in op.imm.iter().take(lanes).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let f = f32::from_bits(*v);
                if f.is_finite() && f.abs() < 1e16 && (f != 0.0 || *v == 0) {
                    let _ = write!(out, "{f}");
                } else {
                    let _ = write!(out, "0x{v:08x}");
                }
            }
            out.push(')');
        }
        OperandKind::Imm64 => {
            let lanes = if op.num_components == 1 { 1 } else { 2 };
            out.push_str("d(");
            for (i, v) in op.imm64.iter().take(lanes).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}", f64::from_bits(*v));
            }
            out.push(')');
        }
        kind => {
            out.push_str(register_prefix(kind));
            for (i, index) in op.indices.iter().enumerate() {
                if i == 0 {
                    if let OperandIndex::Imm32(v) = index {
                        let _ = write!(out, "{v}");
                        continue;
                    }
                }
                let _ = write!(out, "[{}]", format_index(index));
            }
            match op.selection {
                CompSelection::None => {}
                CompSelection::Mask(mask) => {
                    if mask != CompMask::ALL && !mask.is_empty() {
                        out.push('.');
                        for c in mask.comps() {
                            out.push(comp_name(c));
                        }
                    }
                }
                CompSelection::Swizzle(swz) => {
                    if swz != crate::comp::Swizzle::XYZW {
                        out.push('.');
                        for c in 0..4u8 {
                            out.push(comp_name(swz.lane(c)));
                        }
                    }
                }
                CompSelection::Select1(c) => {
                    out.push('.');
                    out.push(comp_name(c));
                }
            }
        }
    }

    if op.modifier.has_abs() {
        out.push('|');
    }
    debug_assert!(matches!(
        op.modifier,
        OperandModifier::None
            | OperandModifier::Neg
            | OperandModifier::Abs
            | OperandModifier::AbsNeg
    ));
    out
}

fn format_index(index: &OperandIndex) -> String {
    match index {
        OperandIndex::Imm32(v) => format!("{v}"),
        OperandIndex::Imm64(v) => format!("{v}"),
        OperandIndex::Relative(op) => format_operand(op),
        OperandIndex::Imm32PlusRelative(base, op) => {
            format!("{} + {}", format_operand(op), base)
        }
    }
}

fn comp_name(c: u8) -> char {
    ['x', 'y', 'z', 'w'][c as usize & 3]
}
