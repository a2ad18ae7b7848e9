//! CLI surface tests: option plumbing, mode exclusivity, exit codes.

use assert_cmd::Command;
use predicates::prelude::*;

use aero_dxbc::sm4::ShaderStage;
use aero_dxbc::test_utils::{
    build_container_hashed, make_program_tokens, opcode_token, tokens_to_bytes,
};
use aero_dxbc::FourCC;

fn minimal_ps() -> Vec<u8> {
    // ps_5_0 with just `ret` and empty signatures.
    let empty_sig = [0u8; 8];
    let body = vec![opcode_token(aero_dxbc::sm4::Opcode::Ret as u32, 1)];
    let code = tokens_to_bytes(&make_program_tokens(ShaderStage::Pixel, 5, 0, &body));
    build_container_hashed(&[
        (FourCC::ISGN, &empty_sig),
        (FourCC::OSGN, &empty_sig),
        (FourCC::SHEX, &code),
    ])
}

#[test]
fn requires_an_output_in_default_mode() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.dxbc");
    std::fs::write(&input, minimal_ps()).unwrap();

    Command::cargo_bin("dxbc2dxil")
        .unwrap()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("output"));
}

#[test]
fn converts_to_a_container_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.dxbc");
    let output = dir.path().join("shader.dxil");
    std::fs::write(&input, minimal_ps()).unwrap();

    Command::cargo_bin("dxbc2dxil")
        .unwrap()
        .arg(&input)
        .args(["/o"])
        .arg(&output)
        .assert()
        .success();

    let bytes = std::fs::read(&output).unwrap();
    let file = aero_dxbc::DxbcFile::parse(&bytes).expect("output is a container");
    assert!(file.get_chunk(FourCC::DXIL).is_some());
}

#[test]
fn disasm_mode_prints_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.dxbc");
    std::fs::write(&input, minimal_ps()).unwrap();

    Command::cargo_bin("dxbc2dxil")
        .unwrap()
        .arg(&input)
        .arg("/disasm-dxbc")
        .assert()
        .success()
        .stdout(predicate::str::contains("ret"));
}

#[test]
fn emit_modes_are_mutually_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.dxbc");
    std::fs::write(&input, minimal_ps()).unwrap();

    Command::cargo_bin("dxbc2dxil")
        .unwrap()
        .arg(&input)
        .args(["/disasm-dxbc", "/emit-llvm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mutually exclusive"));
}

#[test]
fn malformed_input_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("garbage.dxbc");
    let output = dir.path().join("out.dxil");
    std::fs::write(&input, b"not a container").unwrap();

    Command::cargo_bin("dxbc2dxil")
        .unwrap()
        .arg(&input)
        .args(["/o"])
        .arg(&output)
        .assert()
        .failure();
    assert!(!output.exists());
}
