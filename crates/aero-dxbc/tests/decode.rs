use aero_dxbc::comp::{CompMask, Swizzle};
use aero_dxbc::sm4::decode::{
    CompSelection, DecodeErrorKind, OperandIndex, OperandKind, OperandModifier,
    OPERAND_INDEX1_REP_SHIFT, OPERAND_SEL_SWIZZLE,
};
use aero_dxbc::sm4::{decode_program, Opcode, ShaderStage, Sm4Program};
use aero_dxbc::test_utils::*;

const OP_TEMP: u32 = OperandKind::Temp as u32;
const OP_INPUT: u32 = OperandKind::Input as u32;
const OP_OUTPUT: u32 = OperandKind::Output as u32;
const OP_RESOURCE: u32 = OperandKind::Resource as u32;
const OP_SAMPLER: u32 = OperandKind::Sampler as u32;

fn program(stage: ShaderStage, body: &[u32]) -> Sm4Program {
    Sm4Program::parse_token_slice(&make_program_tokens(stage, 5, 0, body)).expect("frame")
}

#[test]
fn decodes_mov_with_dst_mask_and_src_swizzle() {
    let mut body = Vec::new();
    let mut mov = vec![opcode_token(Opcode::Mov as u32, 1 + 2 + 2)];
    mov.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::XY));
    mov.extend_from_slice(&reg_src(
        OP_INPUT,
        &[3],
        Swizzle([1, 0, 2, 3]),
        OperandModifier::None,
    ));
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Vertex, &body)).expect("decode");
    assert_eq!(instructions.len(), 2);

    let mov = &instructions[0];
    assert_eq!(mov.opcode, Opcode::Mov);
    assert_eq!(mov.operands.len(), 2);
    assert_eq!(mov.operands[0].kind, OperandKind::Temp);
    assert_eq!(mov.operands[0].write_mask(), CompMask::XY);
    assert_eq!(mov.operands[0].reg_imm(), Some(0));
    assert_eq!(mov.operands[1].kind, OperandKind::Input);
    assert_eq!(mov.operands[1].swizzle(), Swizzle([1, 0, 2, 3]));
    assert_eq!(mov.operands[1].reg_imm(), Some(3));

    assert_eq!(instructions[1].opcode, Opcode::Ret);
}

#[test]
fn decodes_saturate_and_precise_controls() {
    let mut body = Vec::new();
    let mut add = vec![
        opcode_token_sat(Opcode::Add as u32, 1 + 2 + 2 + 2)
            | (0b0001 << aero_dxbc::sm4::opcode::INSTRUCTION_PRECISE_SHIFT),
    ];
    add.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::ALL));
    add.extend_from_slice(&reg_src(OP_TEMP, &[1], Swizzle::XYZW, OperandModifier::None));
    add.extend_from_slice(&reg_src(OP_TEMP, &[2], Swizzle::XYZW, OperandModifier::None));
    body.extend_from_slice(&add);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Pixel, &body)).expect("decode");
    let add = &instructions[0];
    assert!(add.saturate);
    assert_eq!(add.precise_mask, CompMask::X);
}

#[test]
fn decodes_operand_modifiers_from_extended_tokens() {
    let mut body = Vec::new();
    let mut mov = vec![opcode_token(Opcode::Mov as u32, 1 + 2 + 3)];
    mov.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::ALL));
    mov.extend_from_slice(&reg_src(
        OP_TEMP,
        &[1],
        Swizzle::XYZW,
        OperandModifier::AbsNeg,
    ));
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Pixel, &body)).expect("decode");
    assert_eq!(instructions[0].operands[1].modifier, OperandModifier::AbsNeg);
}

#[test]
fn decodes_immediates_scalar_and_vector() {
    let mut body = Vec::new();
    let imm = imm32_vec4([1, 2, 3, 4]);
    let mut mov = vec![opcode_token(Opcode::Mov as u32, (1 + 2 + imm.len()) as u32)];
    mov.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::ALL));
    mov.extend_from_slice(&imm);
    body.extend_from_slice(&mov);

    let imm1 = imm32_scalar(7);
    let mut mov1 = vec![opcode_token(Opcode::Mov as u32, (1 + 2 + imm1.len()) as u32)];
    mov1.extend_from_slice(&reg_dst(OP_TEMP, &[1], CompMask::X));
    mov1.extend_from_slice(&imm1);
    body.extend_from_slice(&mov1);

    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Pixel, &body)).expect("decode");
    assert_eq!(instructions[0].operands[1].imm, [1, 2, 3, 4]);
    // Scalar immediates splat their value.
    assert_eq!(instructions[1].operands[1].imm, [7, 7, 7, 7]);
    assert!(matches!(
        instructions[1].operands[1].selection,
        CompSelection::Select1(0)
    ));
}

#[test]
fn decodes_two_dimensional_gs_input() {
    // mov r0, v0[1]
    let mut body = Vec::new();
    let mut mov = vec![opcode_token(Opcode::Mov as u32, 1 + 2 + 3)];
    mov.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::ALL));
    mov.extend_from_slice(&reg_src(
        OP_INPUT,
        &[1, 0],
        Swizzle::XYZW,
        OperandModifier::None,
    ));
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Geometry, &body)).expect("decode");
    let src = &instructions[0].operands[1];
    assert_eq!(src.index_dim(), 2);
    assert_eq!(src.indices[0], OperandIndex::Imm32(1));
    assert_eq!(src.indices[1], OperandIndex::Imm32(0));
}

#[test]
fn decodes_relative_register_index() {
    // mov o[r0.x + 2], r1
    let rel = reg_src(OP_TEMP, &[0], Swizzle::XXXX, OperandModifier::None);
    let mut dst_tok = operand_token(
        OP_OUTPUT,
        2,
        aero_dxbc::sm4::decode::OPERAND_SEL_MASK,
        0xF,
        1,
        false,
    );
    // index0 representation: imm32 + relative (3).
    dst_tok |= 3 << aero_dxbc::sm4::decode::OPERAND_INDEX0_REP_SHIFT;

    let mut body = Vec::new();
    let len = 1 + (1 + 1 + rel.len()) + 2;
    let mut mov = vec![opcode_token(Opcode::Mov as u32, len as u32)];
    mov.push(dst_tok);
    mov.push(2); // immediate base
    mov.extend_from_slice(&rel);
    mov.extend_from_slice(&reg_src(OP_TEMP, &[1], Swizzle::XYZW, OperandModifier::None));
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Vertex, &body)).expect("decode");
    let dst = &instructions[0].operands[0];
    match &dst.indices[0] {
        OperandIndex::Imm32PlusRelative(2, rel) => {
            assert_eq!(rel.kind, OperandKind::Temp);
            assert_eq!(rel.swizzle(), Swizzle::XXXX);
        }
        other => panic!("unexpected index {other:?}"),
    }
}

#[test]
fn rejects_unsupported_index_representation() {
    // imm64+relative (4) is never emitted by the toolchains we consume.
    let mut src_tok = operand_token(OP_INPUT, 2, OPERAND_SEL_SWIZZLE, 0xE4, 2, false);
    src_tok |= 5 << OPERAND_INDEX1_REP_SHIFT; // out-of-range representation

    let mut body = Vec::new();
    let mut mov = vec![opcode_token(Opcode::Mov as u32, 1 + 2 + 2)];
    mov.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::ALL));
    mov.push(src_tok);
    mov.push(0);
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let err = decode_program(&program(ShaderStage::Geometry, &body)).unwrap_err();
    assert!(matches!(
        err.kind,
        DecodeErrorKind::UnsupportedIndexRepresentation { rep: 5 }
    ));
}

#[test]
fn rejects_unknown_opcode() {
    let body = vec![opcode_token(0x7fe, 1)];
    let err = decode_program(&program(ShaderStage::Pixel, &body)).unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { raw: 0x7fe }));
}

#[test]
fn rejects_truncated_instruction() {
    // Declared length 5, but only 2 tokens remain.
    let body = vec![opcode_token(Opcode::Mov as u32, 5), 0];
    let err = decode_program(&program(ShaderStage::Pixel, &body)).unwrap_err();
    assert!(matches!(
        err.kind,
        DecodeErrorKind::TruncatedInstruction {
            declared: 5,
            available: 2
        }
    ));
}

#[test]
fn rejects_zero_length_instruction() {
    let body = vec![opcode_token(Opcode::Mov as u32, 0)];
    let err = decode_program(&program(ShaderStage::Pixel, &body)).unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::ZeroLengthInstruction));
}

#[test]
fn captures_declarations_with_payload() {
    let mut body = Vec::new();

    // dcl_globalFlags with refactoring-allowed (bit 11).
    body.push(opcode_token(Opcode::DclGlobalFlags as u32, 1) | (1 << 11));
    // dcl_temps 4
    body.extend_from_slice(&[opcode_token(Opcode::DclTemps as u32, 2), 4]);
    // dcl_indexableTemp x0[8], 4
    body.extend_from_slice(&[opcode_token(Opcode::DclIndexableTemp as u32, 4), 0, 8, 4]);
    // dcl_thread_group 8, 8, 1
    body.extend_from_slice(&[opcode_token(Opcode::DclThreadGroup as u32, 4), 8, 8, 1]);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Compute, &body)).expect("decode");
    assert_eq!(instructions[0].global_flags(), 1);
    assert_eq!(instructions[1].extra, vec![4]);
    assert_eq!(instructions[2].extra, vec![0, 8, 4]);
    assert_eq!(instructions[3].extra, vec![8, 8, 1]);
}

#[test]
fn captures_immediate_constant_buffer_custom_data() {
    let mut body = Vec::new();
    body.extend_from_slice(&[
        opcode_token(Opcode::CustomData as u32, 0)
            | (aero_dxbc::sm4::opcode::CUSTOMDATA_CLASS_IMMEDIATE_CONSTANT_BUFFER << 11),
        5, // total length in DWORDs, including both header tokens
        0x1111_1111,
        0x2222_2222,
        0x3333_3333,
    ]);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Vertex, &body)).expect("decode");
    let custom = instructions[0].custom.as_ref().expect("custom data");
    assert_eq!(
        custom.class,
        aero_dxbc::sm4::opcode::CUSTOMDATA_CLASS_IMMEDIATE_CONSTANT_BUFFER
    );
    assert_eq!(custom.payload, vec![0x1111_1111, 0x2222_2222, 0x3333_3333]);
    assert_eq!(instructions[1].opcode, Opcode::Ret);
}

#[test]
fn decodes_sample_operand_group() {
    let mut body = Vec::new();
    let mut sample = vec![opcode_token(Opcode::Sample as u32, 1 + 2 + 2 + 2 + 2)];
    sample.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::ALL));
    sample.extend_from_slice(&reg_src(OP_INPUT, &[0], Swizzle::XYZW, OperandModifier::None));
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
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let instructions = decode_program(&program(ShaderStage::Pixel, &body)).expect("decode");
    let sample = &instructions[0];
    assert_eq!(sample.operands.len(), 4);
    assert_eq!(sample.operands[2].kind, OperandKind::Resource);
    assert_eq!(sample.operands[3].kind, OperandKind::Sampler);
    // Object operands carry no component data.
    assert_eq!(sample.operands[2].num_components, 0);
}
