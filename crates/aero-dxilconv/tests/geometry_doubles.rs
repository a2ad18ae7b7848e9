//! Geometry-shader stream ops and the double-precision lane-pair model.

mod common;

use aero_dxbc::comp::{CompMask, Swizzle};
use aero_dxbc::sm4::decode::OperandModifier;
use aero_dxbc::sm4::{Opcode, ShaderStage};
use aero_dxbc::test_utils::*;
use aero_dxil::DxOp;
use aero_dxilconv::Converter;
use common::*;

const OP_TEMP: u32 = 0;
const OP_STREAM: u32 = 16;

#[test]
fn gs_emit_and_cut_lower_to_stream_ops() {
    // gs_5_0: dcl_stream m0; emit_stream m0; cut_stream m0; ret
    let mut body = Vec::new();

    let stream = reg_src(OP_STREAM, &[0], Swizzle::XYZW, OperandModifier::None);
    body.push(opcode_token(
        Opcode::DclStream as u32,
        (1 + stream.len()) as u32,
    ));
    body.extend_from_slice(&stream);

    body.push(opcode_token(
        Opcode::EmitStream as u32,
        (1 + stream.len()) as u32,
    ));
    body.extend_from_slice(&stream);
    body.push(opcode_token(
        Opcode::CutStream as u32,
        (1 + stream.len()) as u32,
    ));
    body.extend_from_slice(&stream);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Geometry, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    assert_eq!(count_dxop(main, DxOp::EmitStream), 1);
    assert_eq!(count_dxop(main, DxOp::CutStream), 1);

    let calls = dxop_calls(main);
    let (_, emit_args) = calls
        .iter()
        .find(|(op, _)| *op == DxOp::EmitStream)
        .unwrap();
    assert_eq!(
        const_of(&module, emit_args[0]),
        Some(&aero_dxil::Constant::I8(0))
    );
}

#[test]
fn dadd_assembles_and_splits_lane_pairs() {
    // ps_5_0: dadd r0.xy, r1.xyxy, r2.xyxy; ret
    let mut body = Vec::new();
    let mut dadd = vec![opcode_token(Opcode::DAdd as u32, 1 + 2 + 2 + 2)];
    dadd.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::XY));
    dadd.extend_from_slice(&reg_src(
        OP_TEMP,
        &[1],
        Swizzle([0, 1, 0, 1]),
        OperandModifier::None,
    ));
    dadd.extend_from_slice(&reg_src(
        OP_TEMP,
        &[2],
        Swizzle([0, 1, 0, 1]),
        OperandModifier::None,
    ));
    body.extend_from_slice(&dadd);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    // Each source assembles one double from two 32-bit halves; the result
    // splits back into halves for the two stored lanes.
    assert_eq!(count_dxop(main, DxOp::MakeDouble), 2);
    assert_eq!(count_dxop(main, DxOp::SplitDouble), 1);
    // Four TempRegLoads (two per source), two TempRegStores (lo/hi halves).
    assert_eq!(count_dxop(main, DxOp::TempRegLoad), 4);
    assert_eq!(count_dxop(main, DxOp::TempRegStore), 2);
}

#[test]
fn f16tof32_reapplies_modifiers_to_the_result() {
    // mov-style: f16tof32 r0.x, -r1.x
    let mut body = Vec::new();
    let src = reg_src(OP_TEMP, &[1], Swizzle::XXXX, OperandModifier::Neg);
    let len = 1 + 2 + src.len();
    let mut conv = vec![opcode_token(Opcode::F16ToF32 as u32, len as u32)];
    conv.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::X));
    conv.extend_from_slice(&src);
    body.extend_from_slice(&conv);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    assert_eq!(count_dxop(main, DxOp::LegacyF16ToF32), 1);

    // The negate must appear *after* the conversion in emission order.
    let mut conv_pos = None;
    let mut neg_pos = None;
    for (i, inst) in main.insts.iter().enumerate() {
        match &inst.kind {
            aero_dxil::InstKind::Call {
                callee: aero_dxil::Callee::DxOp(DxOp::LegacyF16ToF32, _),
                ..
            } => conv_pos = Some(i),
            aero_dxil::InstKind::Binary {
                op: aero_dxil::BinOp::FSub,
                ..
            } => neg_pos = Some(i),
            _ => {}
        }
    }
    let conv_pos = conv_pos.expect("conversion emitted");
    let neg_pos = neg_pos.expect("negate emitted");
    assert!(neg_pos > conv_pos, "modifier applies to the converted result");
}
