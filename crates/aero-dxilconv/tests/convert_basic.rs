//! End-to-end conversions of minimal shaders: the null pixel shader, scalar
//! moves, and the texture-sample shape.

mod common;

use aero_dxbc::comp::{CompMask, Swizzle};
use aero_dxbc::sm4::decode::OperandModifier;
use aero_dxbc::sm4::{Opcode, ShaderStage};
use aero_dxbc::test_utils::*;
use aero_dxbc::{DxbcFile, FourCC};
use aero_dxil::{Constant, DxOp, Terminator};
use aero_dxilconv::Converter;
use common::*;

const OP_TEMP: u32 = 0;
const OP_INPUT: u32 = 1;
const OP_OUTPUT: u32 = 2;
const OP_SAMPLER: u32 = 6;
const OP_RESOURCE: u32 = 7;

#[test]
fn null_pixel_shader_produces_single_empty_main() {
    let body = vec![opcode_token(Opcode::Ret as u32, 1)];
    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);

    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    assert!(module.resources.is_empty());
    let main = entry_function(&module);
    assert_eq!(main.name, "main");
    assert_eq!(main.blocks.len(), 1);
    assert_eq!(
        main.blocks[0].terminator,
        Some(Terminator::Ret { value: None })
    );
    assert!(main.blocks[0].insts.is_empty());

    // Container output: PSV0 PS fields (depth output, sample frequency) are
    // both zero.
    let converted = Converter::new().convert(&container, "").expect("convert");
    let out = DxbcFile::parse(&converted.container).expect("output parses");
    let psv = out.get_chunk(FourCC::PSV0).expect("PSV0 present");
    let info_start = 4;
    assert_eq!(psv.data[info_start], 0, "PS depth-output field");
    assert_eq!(psv.data[info_start + 4], 0, "PS sample-frequency field");
    assert!(out.get_chunk(FourCC::DXIL).is_some());
}

#[test]
fn scalar_mov_lowers_to_a_single_temp_reg_store() {
    // vs_5_0: mov r0.x, l(1.0); ret
    let imm = imm32_scalar(1.0f32.to_bits());
    let mut body = Vec::new();
    let mut mov = vec![opcode_token(Opcode::Mov as u32, (1 + 2 + imm.len()) as u32)];
    mov.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::X));
    mov.extend_from_slice(&imm);
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Vertex, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    let stores = dxop_calls(main)
        .into_iter()
        .filter(|(op, _)| *op == DxOp::TempRegStore)
        .collect::<Vec<_>>();
    assert_eq!(stores.len(), 1, "exactly one lane is written");

    let (_, args) = &stores[0];
    // Flattened register index: r0.x = 0.
    assert_eq!(const_of(&module, args[0]), Some(&Constant::I32(0)));
    // The stored value carries the bit pattern of 1.0.
    assert_eq!(
        const_of(&module, args[1]),
        Some(&Constant::I32(1.0f32.to_bits()))
    );

    // Nothing else: no inputs read, no outputs written.
    assert_eq!(count_dxop(main, DxOp::LoadInput), 0);
    assert_eq!(count_dxop(main, DxOp::StoreOutput), 0);
}

#[test]
fn texture_sample_emits_handles_loads_one_sample_and_four_stores() {
    // ps_5_0:
    //   dcl_resource_texture2d t0
    //   dcl_sampler s0
    //   sample r0.xyzw, v0.xyxx, t0.xyzw, s0
    //   mov o0.xyzw, r0.xyzw
    //   ret
    let mut body = Vec::new();

    // dcl_resource (texture2d dim = 3), return type token f32 everywhere.
    let tex_decl = reg_src(OP_RESOURCE, &[0], Swizzle::XYZW, OperandModifier::None);
    body.push(
        opcode_token(Opcode::DclResource as u32, (1 + tex_decl.len() + 1) as u32)
            | (3 << aero_dxbc::sm4::opcode::RESOURCE_DIM_SHIFT),
    );
    body.extend_from_slice(&tex_decl);
    body.push(0x5555); // 4 x float return type

    let samp_decl = reg_src(OP_SAMPLER, &[0], Swizzle::XYZW, OperandModifier::None);
    body.push(opcode_token(
        Opcode::DclSampler as u32,
        (1 + samp_decl.len()) as u32,
    ));
    body.extend_from_slice(&samp_decl);

    let mut sample = vec![opcode_token(Opcode::Sample as u32, 1 + 2 + 2 + 2 + 2)];
    sample.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::ALL));
    sample.extend_from_slice(&reg_src(
        OP_INPUT,
        &[0],
        Swizzle([0, 1, 0, 0]),
        OperandModifier::None,
    ));
    sample.extend_from_slice(&reg_src(
        OP_RESOURCE,
        &[0],
        Swizzle::XYZW,
        OperandModifier::None,
    ));
    sample.extend_from_slice(&reg_src(
        OP_SAMPLER,
        &[0],
        Swizzle::XYZW,
        OperandModifier::None,
    ));
    body.extend_from_slice(&sample);

    let mut mov = vec![opcode_token(Opcode::Mov as u32, 1 + 2 + 2)];
    mov.extend_from_slice(&reg_dst(OP_OUTPUT, &[0], CompMask::ALL));
    mov.extend_from_slice(&reg_src(OP_TEMP, &[0], Swizzle::XYZW, OperandModifier::None));
    body.extend_from_slice(&mov);

    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(
        ShaderStage::Pixel,
        &body,
        vec![sig_entry("TEXCOORD", 0, 0, 3, 0, 0x3)],
        vec![sig_entry("SV_Target", 0, 64, 3, 0, 0xF)],
        None,
    );
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    // One SRV and one sampler record.
    assert_eq!(module.resources.len(), 2);

    let main = entry_function(&module);
    assert_eq!(count_dxop(main, DxOp::CreateHandle), 2);
    assert_eq!(count_dxop(main, DxOp::LoadInput), 2, "one per used lane");
    assert_eq!(count_dxop(main, DxOp::Sample), 1);
    assert_eq!(count_dxop(main, DxOp::StoreOutput), 4);

    // P3: every register/component the shader touches resolves to an
    // allocated signature element covering it.
    for (reg, comp) in [(0u32, 0u32), (0, 1)] {
        let e = module
            .input_signature
            .iter()
            .find(|e| {
                e.start_row.is_some_and(|r| r <= reg && reg < r + e.rows)
                    && e.start_col.is_some_and(|c| c <= comp && comp < c + e.cols)
            })
            .expect("covered by an allocated element");
        assert_eq!(e.semantic_name, "TEXCOORD");
    }
}

#[test]
fn sm50_handles_are_created_once_per_binding() {
    // Two samples from the same t0/s0 pair must reuse the cached handles.
    let mut body = Vec::new();

    let tex_decl = reg_src(OP_RESOURCE, &[0], Swizzle::XYZW, OperandModifier::None);
    body.push(
        opcode_token(Opcode::DclResource as u32, (1 + tex_decl.len() + 1) as u32)
            | (3 << aero_dxbc::sm4::opcode::RESOURCE_DIM_SHIFT),
    );
    body.extend_from_slice(&tex_decl);
    body.push(0x5555);

    let samp_decl = reg_src(OP_SAMPLER, &[0], Swizzle::XYZW, OperandModifier::None);
    body.push(opcode_token(
        Opcode::DclSampler as u32,
        (1 + samp_decl.len()) as u32,
    ));
    body.extend_from_slice(&samp_decl);

    for dst in 0..2u32 {
        let mut sample = vec![opcode_token(Opcode::Sample as u32, 1 + 2 + 2 + 2 + 2)];
        sample.extend_from_slice(&reg_dst(OP_TEMP, &[dst], CompMask::ALL));
        sample.extend_from_slice(&reg_src(
            OP_INPUT,
            &[0],
            Swizzle([0, 1, 0, 0]),
            OperandModifier::None,
        ));
        sample.extend_from_slice(&reg_src(
            OP_RESOURCE,
            &[0],
            Swizzle::XYZW,
            OperandModifier::None,
        ));
        sample.extend_from_slice(&reg_src(
            OP_SAMPLER,
            &[0],
            Swizzle::XYZW,
            OperandModifier::None,
        ));
        body.extend_from_slice(&sample);
    }
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(
        ShaderStage::Pixel,
        &body,
        vec![sig_entry("TEXCOORD", 0, 0, 3, 0, 0x3)],
        vec![],
        None,
    );
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    // P2: one handle per (class, lower bound) for SM <= 5.0.
    let main = entry_function(&module);
    assert_eq!(count_dxop(main, DxOp::CreateHandle), 2);
    assert_eq!(count_dxop(main, DxOp::Sample), 2);
}
