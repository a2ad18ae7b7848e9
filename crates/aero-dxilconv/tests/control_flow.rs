//! Structured control-flow reconstruction: if/else, loops with break, switch
//! lowering, and precise-flag propagation.

mod common;

use aero_dxbc::comp::{CompMask, Swizzle};
use aero_dxbc::sm4::decode::OperandModifier;
use aero_dxbc::sm4::opcode::{INSTRUCTION_PRECISE_SHIFT, INSTRUCTION_TEST_NONZERO_BIT};
use aero_dxbc::sm4::{Opcode, ShaderStage};
use aero_dxbc::test_utils::*;
use aero_dxil::{is_reducible, BinOp, FastMath, InstKind, Terminator};
use aero_dxilconv::Converter;
use common::*;

const OP_TEMP: u32 = 0;

fn mov_imm(reg: u32, value: u32) -> Vec<u32> {
    let imm = imm32_scalar(value);
    let mut mov = vec![opcode_token(Opcode::Mov as u32, (1 + 2 + imm.len()) as u32)];
    mov.extend_from_slice(&reg_dst(OP_TEMP, &[reg], CompMask::X));
    mov.extend_from_slice(&imm);
    mov
}

fn temp_src(reg: u32) -> Vec<u32> {
    reg_src(OP_TEMP, &[reg], Swizzle::XXXX, OperandModifier::None)
}

#[test]
fn if_else_produces_three_way_diamond() {
    // if_nz r0.x / mov r1, l(1) / else / mov r1, l(2) / endif / ret
    let mut body = Vec::new();
    let cond = temp_src(0);
    body.push(
        opcode_token(Opcode::If as u32, (1 + cond.len()) as u32) | INSTRUCTION_TEST_NONZERO_BIT,
    );
    body.extend_from_slice(&cond);
    body.extend_from_slice(&mov_imm(1, 1));
    body.push(opcode_token(Opcode::Else as u32, 1));
    body.extend_from_slice(&mov_imm(1, 2));
    body.push(opcode_token(Opcode::EndIf as u32, 1));
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    // entry, then, else, end (the post-ret continuation block is removed
    // during finalization).
    assert_eq!(main.blocks.len(), 4);
    assert!(is_reducible(main));

    // Entry ends in a conditional branch on icmp ne 0.
    let entry = &main.blocks[0];
    assert!(matches!(
        entry.terminator,
        Some(Terminator::CondBr { .. })
    ));
    let has_icmp_ne = main.insts.iter().any(|i| {
        matches!(
            i.kind,
            InstKind::Cmp {
                pred: aero_dxil::CmpPred::Ne,
                ..
            }
        )
    });
    assert!(has_icmp_ne, "condition compares against zero");

    // P5: every block has exactly one terminator.
    for block in &main.blocks {
        assert!(block.terminator.is_some());
    }

    // Both sides write r1 through TempRegStore, so later reads observe
    // whichever side executed.
    assert_eq!(count_dxop(main, aero_dxil::DxOp::TempRegStore), 2);
}

#[test]
fn loop_with_conditional_break_is_reducible() {
    // loop / breakc_nz r0.x / endloop / ret
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::Loop as u32, 1));
    let cond = temp_src(0);
    body.push(
        opcode_token(Opcode::Breakc as u32, (1 + cond.len()) as u32)
            | INSTRUCTION_TEST_NONZERO_BIT,
    );
    body.extend_from_slice(&cond);
    body.push(opcode_token(Opcode::EndLoop as u32, 1));
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    assert!(is_reducible(main));

    // The loop body has a back edge.
    let back_edges = main
        .blocks
        .iter()
        .enumerate()
        .filter(|(i, b)| {
            b.terminator
                .as_ref()
                .map(|t| t.successors().iter().any(|s| s.index() <= *i))
                .unwrap_or(false)
        })
        .count();
    assert!(back_edges >= 1, "loop produces a back edge");
}

#[test]
fn switch_lowers_to_switch_terminator_with_deduped_cases() {
    // switch r0.x / case 1 / mov r1, l(10) / break / case 2 / default /
    // mov r1, l(20) / break / endswitch / ret
    let mut body = Vec::new();
    let sel = temp_src(0);
    body.push(opcode_token(Opcode::Switch as u32, (1 + sel.len()) as u32));
    body.extend_from_slice(&sel);

    let case1 = imm32_scalar(1);
    body.push(opcode_token(Opcode::Case as u32, (1 + case1.len()) as u32));
    body.extend_from_slice(&case1);
    body.extend_from_slice(&mov_imm(1, 10));
    body.push(opcode_token(Opcode::Break as u32, 1));

    let case2 = imm32_scalar(2);
    body.push(opcode_token(Opcode::Case as u32, (1 + case2.len()) as u32));
    body.extend_from_slice(&case2);
    body.push(opcode_token(Opcode::Default as u32, 1));
    body.extend_from_slice(&mov_imm(1, 20));
    body.push(opcode_token(Opcode::Break as u32, 1));

    body.push(opcode_token(Opcode::EndSwitch as u32, 1));
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    assert!(is_reducible(main));

    let switch = main
        .blocks
        .iter()
        .find_map(|b| match &b.terminator {
            Some(Terminator::Switch { cases, .. }) => Some(cases.clone()),
            _ => None,
        })
        .expect("switch terminator");
    assert_eq!(switch.len(), 2);
    assert_eq!(switch[0].0, 1);
    assert_eq!(switch[1].0, 2);
}

#[test]
fn precise_mask_clears_fast_math_on_fp_math_and_only_there() {
    // add r0.xy, r1, r2 with precise on .x only.
    let mut body = Vec::new();
    let mut add = vec![
        opcode_token(Opcode::Add as u32, 1 + 2 + 2 + 2)
            | (0b0001 << INSTRUCTION_PRECISE_SHIFT),
    ];
    add.extend_from_slice(&reg_dst(OP_TEMP, &[0], CompMask::XY));
    add.extend_from_slice(&reg_src(OP_TEMP, &[1], Swizzle::XYZW, OperandModifier::None));
    add.extend_from_slice(&reg_src(OP_TEMP, &[2], Swizzle::XYZW, OperandModifier::None));
    body.extend_from_slice(&add);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let main = entry_function(&module);
    let fadds: Vec<&aero_dxil::Inst> = main
        .insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::Binary { op: BinOp::FAdd, .. }))
        .collect();
    assert_eq!(fadds.len(), 2);

    // P6: the precise lane is an FP math operator, so its fast-math flags
    // are cleared rather than tagged with metadata.
    let cleared = fadds.iter().filter(|i| i.fast_math.is_empty()).count();
    let fast = fadds
        .iter()
        .filter(|i| i.fast_math.contains(FastMath::FAST))
        .count();
    assert_eq!(cleared, 1);
    assert_eq!(fast, 1);
}

#[test]
fn irreducible_input_cannot_be_constructed_from_structured_tokens() {
    // Sanity for P4: a nest of structured constructs always verifies
    // reducible.
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::Loop as u32, 1));
    let cond = temp_src(0);
    body.push(
        opcode_token(Opcode::If as u32, (1 + cond.len()) as u32) | INSTRUCTION_TEST_NONZERO_BIT,
    );
    body.extend_from_slice(&cond);
    body.push(opcode_token(Opcode::Break as u32, 1));
    body.push(opcode_token(Opcode::EndIf as u32, 1));
    let cond2 = temp_src(1);
    body.push(
        opcode_token(Opcode::Continuec as u32, (1 + cond2.len()) as u32)
            | INSTRUCTION_TEST_NONZERO_BIT,
    );
    body.extend_from_slice(&cond2);
    body.push(opcode_token(Opcode::EndLoop as u32, 1));
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(ShaderStage::Pixel, &body, vec![], vec![], None);
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");
    assert!(is_reducible(entry_function(&module)));
}
