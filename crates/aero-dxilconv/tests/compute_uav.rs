//! Compute-shader resource paths: structured UAV stores, raw loads, atomics,
//! and barriers.

mod common;

use aero_dxbc::comp::{CompMask, Swizzle};
use aero_dxbc::sm4::decode::OperandModifier;
use aero_dxbc::sm4::opcode::{SYNC_TGSM_MEMORY, SYNC_THREADS_IN_GROUP};
use aero_dxbc::sm4::{Opcode, ShaderStage};
use aero_dxbc::test_utils::*;
use aero_dxil::{Constant, DxOp, InstKind, ResourceClass, ResourceKind};
use aero_dxilconv::Converter;
use common::*;

const OP_TEMP: u32 = 0;
const OP_UAV: u32 = 30;
const OP_TGSM: u32 = 31;

fn uav_structured_decl(slot: u32, stride: u32) -> Vec<u32> {
    let operand = reg_src(OP_UAV, &[slot], Swizzle::XYZW, OperandModifier::None);
    let mut out = vec![opcode_token(
        Opcode::DclUavStructured as u32,
        (1 + operand.len() + 1) as u32,
    )];
    out.extend_from_slice(&operand);
    out.push(stride);
    out
}

fn thread_group_decl() -> Vec<u32> {
    vec![opcode_token(Opcode::DclThreadGroup as u32, 4), 8, 8, 1]
}

#[test]
fn store_structured_lowers_to_buffer_store_with_mask() {
    // cs_5_0:
    //   dcl_uav_structured u0, 16
    //   store_structured u0.xyz, r1.x, l(0), r2.xyzw
    //   ret
    let mut body = Vec::new();
    body.extend_from_slice(&thread_group_decl());
    body.extend_from_slice(&uav_structured_decl(0, 16));

    let offset = imm32_scalar(0);
    let value = reg_src(OP_TEMP, &[2], Swizzle::XYZW, OperandModifier::None);
    let index = reg_src(OP_TEMP, &[1], Swizzle::XXXX, OperandModifier::None);
    let dst = reg_dst(OP_UAV, &[0], CompMask::XYZ);
    let len = 1 + dst.len() + index.len() + offset.len() + value.len();
    let mut store = vec![opcode_token(Opcode::StoreStructured as u32, len as u32)];
    store.extend_from_slice(&dst);
    store.extend_from_slice(&index);
    store.extend_from_slice(&offset);
    store.extend_from_slice(&value);
    body.extend_from_slice(&store);

    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Compute, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let uav = module
        .resource(ResourceClass::Uav, 0)
        .expect("UAV record present");
    assert_eq!(uav.kind, ResourceKind::StructuredBuffer);
    assert_eq!(uav.stride, 16);

    let main = entry_function(&module);
    let stores = dxop_calls(main)
        .into_iter()
        .filter(|(op, _)| *op == DxOp::BufferStore)
        .collect::<Vec<_>>();
    assert_eq!(stores.len(), 1);

    let (_, args) = &stores[0];
    // (handle, index, offset, v0..v3, mask): offset is the literal 0, the
    // mask byte selects xyz, and the w slot is undef.
    assert_eq!(const_of(&module, args[2]), Some(&Constant::I32(0)));
    assert!(matches!(
        const_of(&module, args[6]),
        Some(Constant::Undef(_))
    ));
    assert_eq!(const_of(&module, args[7]), Some(&Constant::I8(0x7)));
}

#[test]
fn raw_tgsm_roundtrip_uses_pointer_path() {
    // cs_5_0 with a raw g0: store_raw g0.x, l(0), r0.x; ld_raw r1.x, l(0), g0
    let mut body = Vec::new();
    body.extend_from_slice(&thread_group_decl());

    let tgsm_operand = reg_src(OP_TGSM, &[0], Swizzle::XYZW, OperandModifier::None);
    let mut tgsm_decl = vec![opcode_token(
        Opcode::DclTgsmRaw as u32,
        (1 + tgsm_operand.len() + 1) as u32,
    )];
    tgsm_decl.extend_from_slice(&tgsm_operand);
    tgsm_decl.push(64); // byte count
    body.extend_from_slice(&tgsm_decl);

    let offset = imm32_scalar(0);
    let value = reg_src(OP_TEMP, &[0], Swizzle::XXXX, OperandModifier::None);
    let dst = reg_dst(OP_TGSM, &[0], CompMask::X);
    let len = 1 + dst.len() + offset.len() + value.len();
    let mut store = vec![opcode_token(Opcode::StoreRaw as u32, len as u32)];
    store.extend_from_slice(&dst);
    store.extend_from_slice(&offset);
    store.extend_from_slice(&value);
    body.extend_from_slice(&store);

    let sync = opcode_token(Opcode::Sync as u32, 1) | SYNC_THREADS_IN_GROUP | SYNC_TGSM_MEMORY;
    body.push(sync);

    let src = reg_src(OP_TGSM, &[0], Swizzle::XXXX, OperandModifier::None);
    let offset2 = imm32_scalar(0);
    let dst2 = reg_dst(OP_TEMP, &[1], CompMask::X);
    let len = 1 + dst2.len() + offset2.len() + src.len();
    let mut load = vec![opcode_token(Opcode::LdRaw as u32, len as u32)];
    load.extend_from_slice(&dst2);
    load.extend_from_slice(&offset2);
    load.extend_from_slice(&src);
    body.extend_from_slice(&load);

    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Compute, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    // The TGSM block is a group-shared global, not a resource binding.
    assert!(module.resources.is_empty());
    assert_eq!(module.globals.len(), 1);
    assert_eq!(
        module.globals[0].address_space,
        aero_dxil::AddressSpace::Tgsm
    );

    let main = entry_function(&module);
    let loads = main
        .insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::Load { .. }))
        .count();
    let stores = main
        .insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::Store { .. }))
        .count();
    assert_eq!(loads, 1);
    assert_eq!(stores, 1);

    // The barrier composes group sync + TGSM fence.
    let barriers = dxop_calls(main)
        .into_iter()
        .filter(|(op, _)| *op == DxOp::Barrier)
        .collect::<Vec<_>>();
    assert_eq!(barriers.len(), 1);
    let mode = const_of(&module, barriers[0].1[0]);
    assert_eq!(mode, Some(&Constant::I32(1 | 8)));
}

#[test]
fn tgsm_atomics_take_the_native_path_and_uav_atomics_the_intrinsic() {
    let mut body = Vec::new();
    body.extend_from_slice(&thread_group_decl());
    body.extend_from_slice(&uav_structured_decl(0, 4));

    let tgsm_operand = reg_src(OP_TGSM, &[0], Swizzle::XYZW, OperandModifier::None);
    let mut tgsm_decl = vec![opcode_token(
        Opcode::DclTgsmRaw as u32,
        (1 + tgsm_operand.len() + 1) as u32,
    )];
    tgsm_decl.extend_from_slice(&tgsm_operand);
    tgsm_decl.push(16);
    body.extend_from_slice(&tgsm_decl);

    // atomic_iadd g0, l(0), r0.x
    let addr = imm32_scalar(0);
    let value = reg_src(OP_TEMP, &[0], Swizzle::XXXX, OperandModifier::None);
    let dst = reg_dst(OP_TGSM, &[0], CompMask::X);
    let len = 1 + dst.len() + addr.len() + value.len();
    let mut atomic = vec![opcode_token(Opcode::AtomicIAdd as u32, len as u32)];
    atomic.extend_from_slice(&atomic_args(&dst, &addr, &value));
    body.extend_from_slice(&atomic);

    // atomic_iadd u0, vec2(l(0), l(0)), r0.x  (structured: index + offset)
    let addr2 = imm32_vec4([0, 0, 0, 0]);
    let dst2 = reg_dst(OP_UAV, &[0], CompMask::X);
    let len = 1 + dst2.len() + addr2.len() + value.len();
    let mut atomic2 = vec![opcode_token(Opcode::AtomicIAdd as u32, len as u32)];
    atomic2.extend_from_slice(&atomic_args(&dst2, &addr2, &value));
    body.extend_from_slice(&atomic2);

    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Compute, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    let native_atomics = main
        .insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::AtomicRmw { .. }))
        .count();
    assert_eq!(native_atomics, 1, "TGSM atomic is a native RMW");
    assert_eq!(count_dxop(main, DxOp::AtomicBinOp), 1, "UAV atomic is a dx op");
}

fn atomic_args(dst: &[u32], addr: &[u32], value: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    out.extend_from_slice(dst);
    out.extend_from_slice(addr);
    out.extend_from_slice(value);
    out
}

#[test]
fn counter_ops_mark_the_uav_and_return_the_count() {
    let mut body = Vec::new();
    body.extend_from_slice(&thread_group_decl());
    body.extend_from_slice(&uav_structured_decl(0, 4));

    // imm_atomic_alloc r0.x, u0
    let dst = reg_dst(OP_TEMP, &[0], CompMask::X);
    let uav = reg_src(OP_UAV, &[0], Swizzle::XYZW, OperandModifier::None);
    let len = 1 + dst.len() + uav.len();
    let mut alloc = vec![opcode_token(Opcode::ImmAtomicAlloc as u32, len as u32)];
    alloc.extend_from_slice(&dst);
    alloc.extend_from_slice(&uav);
    body.extend_from_slice(&alloc);

    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Compute, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let uav = module.resource(ResourceClass::Uav, 0).expect("UAV record");
    assert!(uav.uav_flags.contains(aero_dxil::UavFlags::HAS_COUNTER));

    let main = entry_function(&module);
    assert_eq!(count_dxop(main, DxOp::BufferUpdateCounter), 1);
    assert_eq!(count_dxop(main, DxOp::TempRegStore), 1);
}
