//! Shared builders and module-inspection helpers for the converter tests.
//!
//! Shaders are hand-assembled from tokens (no compiler toolchain in the
//! loop): signature chunks through `aero-dxbc`'s writer, token bodies through
//! its `test-utils` builders, the whole container checksummed so the default
//! hash check passes.

#![allow(dead_code)]

use aero_dxbc::sm4::ShaderStage;
use aero_dxbc::test_utils::{build_container_hashed, make_program_tokens, tokens_to_bytes};
use aero_dxbc::{FourCC, SignatureChunk, SignatureEntry, SignatureLayout};
use aero_dxil::{Callee, DxOp, Function, InstKind, Module, Value};

/// Signature element shorthand: (name, semantic index, system value,
/// component type, register, mask).
pub fn sig_entry(
    name: &str,
    semantic_index: u32,
    system_value: u32,
    component_type: u32,
    register: u32,
    mask: u8,
) -> SignatureEntry {
    SignatureEntry {
        semantic_name: name.to_owned(),
        semantic_index,
        system_value_type: system_value,
        component_type,
        register,
        mask,
        read_write_mask: mask,
        stream: Some(0),
        min_precision: 0,
    }
}

pub fn sig_bytes(entries: Vec<SignatureEntry>) -> Vec<u8> {
    SignatureChunk {
        layout: SignatureLayout::Legacy,
        entries,
    }
    .to_bytes()
}

/// Assembles a checksummed container with code + signatures.
pub fn shader_container(
    stage: ShaderStage,
    body: &[u32],
    isgn: Vec<SignatureEntry>,
    osgn: Vec<SignatureEntry>,
    pcsg: Option<Vec<SignatureEntry>>,
) -> Vec<u8> {
    let tokens = make_program_tokens(stage, 5, 0, body);
    let code = tokens_to_bytes(&tokens);
    let isgn = sig_bytes(isgn);
    let osgn = sig_bytes(osgn);

    let mut chunks: Vec<(FourCC, &[u8])> = vec![
        (FourCC::ISGN, &isgn),
        (FourCC::OSGN, &osgn),
        (FourCC::SHEX, &code),
    ];
    let pcsg_bytes = pcsg.map(sig_bytes);
    if let Some(bytes) = &pcsg_bytes {
        chunks.push((FourCC::PCSG, bytes));
    }
    build_container_hashed(&chunks)
}

/// The module's entry function.
pub fn entry_function(module: &Module) -> &Function {
    let id = module.entry.expect("module has no entry function");
    module.func(id)
}

/// All dx op calls in a function, in emission order.
pub fn dxop_calls(func: &Function) -> Vec<(DxOp, Vec<Value>)> {
    func.insts
        .iter()
        .filter_map(|inst| match &inst.kind {
            InstKind::Call {
                callee: Callee::DxOp(op, _),
                args,
            } => Some((*op, args.clone())),
            _ => None,
        })
        .collect()
}

pub fn count_dxop(func: &Function, op: DxOp) -> usize {
    dxop_calls(func).iter().filter(|(o, _)| *o == op).count()
}

/// Resolves a value to its interned constant, when it is one.
pub fn const_of(module: &Module, value: Value) -> Option<&aero_dxil::Constant> {
    match value {
        Value::Const(id) => Some(&module.constants[id.index()]),
        _ => None,
    }
}
