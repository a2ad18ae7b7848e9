//! Hull-shader phase lowering: the control-point phase becomes `main`,
//! fork/join phases land in `pc_main` wrapped in per-phase instance loops.

mod common;

use aero_dxbc::comp::CompMask;
use aero_dxbc::sm4::opcode::CONTROL_POINT_COUNT_SHIFT;
use aero_dxbc::sm4::{Opcode, ShaderStage};
use aero_dxbc::test_utils::*;
use aero_dxil::{InstKind, Terminator};
use aero_dxilconv::Converter;
use common::*;

const OP_OUTPUT: u32 = 2;

#[test]
fn fork_phase_with_instance_count_three_builds_a_hull_loop() {
    // hs_5_0:
    //   hs_decls; dcl_input/output_control_point_count 3
    //   hs_control_point_phase
    //     ret
    //   hs_fork_phase
    //     dcl_hs_fork_phase_instance_count 3
    //     dcl_output_siv o0.x, finalTriEdgeTessFactor
    //     mov o0.x, l(1.0)
    //     ret
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::HsDecls as u32, 1));
    body.push(
        opcode_token(Opcode::DclInputControlPointCount as u32, 1)
            | (3 << CONTROL_POINT_COUNT_SHIFT),
    );
    body.push(
        opcode_token(Opcode::DclOutputControlPointCount as u32, 1)
            | (3 << CONTROL_POINT_COUNT_SHIFT),
    );

    body.push(opcode_token(Opcode::HsControlPointPhase as u32, 1));
    body.push(opcode_token(Opcode::Ret as u32, 1));

    body.push(opcode_token(Opcode::HsForkPhase as u32, 1));
    body.extend_from_slice(&[
        opcode_token(Opcode::DclHsForkPhaseInstanceCount as u32, 2),
        3,
    ]);
    let dcl_out = reg_dst(OP_OUTPUT, &[0], CompMask::X);
    body.push(opcode_token(
        Opcode::DclOutputSiv as u32,
        (1 + dcl_out.len() + 1) as u32,
    ));
    body.extend_from_slice(&dcl_out);
    body.push(13); // finalTriEdgeTessFactor

    let imm = imm32_scalar(1.0f32.to_bits());
    let mut mov = vec![opcode_token(Opcode::Mov as u32, (1 + 2 + imm.len()) as u32)];
    mov.extend_from_slice(&reg_dst(OP_OUTPUT, &[0], CompMask::X));
    mov.extend_from_slice(&imm);
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));

    let container = shader_container(
        ShaderStage::Hull,
        &body,
        vec![],
        vec![],
        Some(vec![sig_entry("SV_TessFactor", 0, 13, 3, 0, 0x1)]),
    );
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    // Control-point phase entry plus the patch-constant entry.
    let pc = module.patch_constant_entry.expect("pc_main exists");
    let pc_main = module.func(pc);
    assert_eq!(pc_main.name, "pc_main");

    // One hull loop: entry -> body; body joins the latch; the latch
    // increments the induction variable and tests against the declared trip
    // count of 3.
    let latch = pc_main
        .blocks
        .iter()
        .position(|b| b.name.contains("latch"))
        .expect("latch block");
    let latch_block = &pc_main.blocks[latch];
    assert!(matches!(
        latch_block.terminator,
        Some(Terminator::CondBr { .. })
    ));

    let has_trip_count_compare = pc_main.insts.iter().any(|inst| {
        if let InstKind::Cmp { rhs, .. } = &inst.kind {
            const_of(&module, *rhs) == Some(&aero_dxil::Constant::I32(3))
        } else {
            false
        }
    });
    assert!(has_trip_count_compare, "latch compares against trip count 3");

    // The phase body's `ret` falls through to the latch (a plain branch),
    // not to a function return: pc_main has exactly one Ret terminator, in
    // the loop's exit block.
    let ret_blocks = pc_main
        .blocks
        .iter()
        .filter(|b| matches!(b.terminator, Some(Terminator::Ret { .. })))
        .count();
    assert_eq!(ret_blocks, 1);

    // The phase writes its output through the patch-constant path.
    assert_eq!(count_dxop(pc_main, aero_dxil::DxOp::StorePatchConstant), 1);

    // The induction variable lives in an alloca shared across the function.
    let allocas = pc_main
        .insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::Alloca { .. }))
        .count();
    assert_eq!(allocas, 1);
}

#[test]
fn two_phases_reuse_one_induction_variable() {
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::HsControlPointPhase as u32, 1));
    body.push(opcode_token(Opcode::Ret as u32, 1));

    for count in [2u32, 4u32] {
        body.push(opcode_token(Opcode::HsForkPhase as u32, 1));
        body.extend_from_slice(&[
            opcode_token(Opcode::DclHsForkPhaseInstanceCount as u32, 2),
            count,
        ]);
        body.push(opcode_token(Opcode::Ret as u32, 1));
    }

    let container = shader_container(ShaderStage::Hull, &body, vec![], vec![], Some(vec![]));
    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("convert");

    let pc = module.patch_constant_entry.expect("pc_main exists");
    let pc_main = module.func(pc);

    let allocas = pc_main
        .insts
        .iter()
        .filter(|i| matches!(i.kind, InstKind::Alloca { .. }))
        .count();
    assert_eq!(allocas, 1, "phases share the induction storage");

    let latches = pc_main
        .blocks
        .iter()
        .filter(|b| b.name.contains("latch"))
        .count();
    assert_eq!(latches, 2, "one loop per fork phase");

    // Both trip counts appear as compare operands.
    for count in [2u32, 4u32] {
        let found = pc_main.insts.iter().any(|inst| {
            if let InstKind::Cmp { rhs, .. } = &inst.kind {
                const_of(&module, *rhs) == Some(&aero_dxil::Constant::I32(count))
            } else {
                false
            }
        });
        assert!(found, "trip count {count} compare present");
    }
}
