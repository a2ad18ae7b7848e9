//! Container-level contracts: part copying (P1), output part set, and the
//! in-driver equivalence of the two entry points (P7).

mod common;

use aero_dxbc::comp::{CompMask, Swizzle};
use aero_dxbc::sm4::decode::OperandModifier;
use aero_dxbc::sm4::{Opcode, ShaderStage};
use aero_dxbc::test_utils::*;
use aero_dxbc::{DxbcFile, FourCC};
use aero_dxilconv::{Converter, DdiSignatureEntry};
use common::*;

const OP_TEMP: u32 = 0;
const OP_INPUT: u32 = 1;
const OP_OUTPUT: u32 = 2;

/// vs_5_0: mov o0.xyzw, v0.xyzw; ret — with one arbitrary input and one
/// SV_Position-free output so both signature paths stay trivial.
fn passthrough_vs_body() -> Vec<u32> {
    let mut body = Vec::new();
    let mut mov = vec![opcode_token(Opcode::Mov as u32, 1 + 2 + 2)];
    mov.extend_from_slice(&reg_dst(OP_OUTPUT, &[0], CompMask::ALL));
    mov.extend_from_slice(&reg_src(
        OP_INPUT,
        &[0],
        Swizzle::XYZW,
        OperandModifier::None,
    ));
    body.extend_from_slice(&mov);
    body.push(opcode_token(Opcode::Ret as u32, 1));
    body
}

fn pad4(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
}

#[test]
fn signature_and_auxiliary_parts_round_trip_byte_identical() {
    // ARB semantics keep the two signature sources (blob vs DDI) aligned.
    let isgn = sig_bytes(vec![sig_entry("ARB", 0, 0, 3, 0, 0xF)]);
    let osgn = sig_bytes(vec![sig_entry("ARB", 0, 0, 3, 0, 0xF)]);
    let code = tokens_to_bytes(&make_program_tokens(
        ShaderStage::Vertex,
        5,
        0,
        &passthrough_vs_body(),
    ));
    let rts0 = vec![0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04];
    let sfi0 = vec![0x11, 0, 0, 0, 0, 0, 0, 0];

    let input = build_container_hashed(&[
        (FourCC::ISGN, &isgn),
        (FourCC::OSGN, &osgn),
        (FourCC::SHEX, &code),
        (FourCC::RTS0, &rts0),
        (FourCC::SFI0, &sfi0),
    ]);

    let converted = Converter::new().convert(&input, "").expect("convert");
    let out = DxbcFile::parse(&converted.container).expect("output parses");
    out.verify_checksum().expect("output is checksummed");

    // P1: signature parts byte-identical up to 4-byte padding; RTS0 and SFI0
    // byte-identical.
    assert_eq!(
        out.get_chunk(FourCC::ISGN).expect("ISGN").data,
        pad4(isgn.clone())
    );
    assert_eq!(
        out.get_chunk(FourCC::OSGN).expect("OSGN").data,
        pad4(osgn.clone())
    );
    assert_eq!(out.get_chunk(FourCC::RTS0).expect("RTS0").data, &rts0[..]);
    assert_eq!(out.get_chunk(FourCC::SFI0).expect("SFI0").data, &sfi0[..]);

    // Mandatory parts.
    assert!(out.get_chunk(FourCC::PSV0).is_some());
    assert!(out.get_chunk(FourCC::DXIL).is_some());
    // The legacy code chunk is not carried into the output.
    assert!(out.get_chunk(FourCC::SHEX).is_none());
}

#[test]
fn absent_feature_info_becomes_a_zero_part() {
    let isgn = sig_bytes(vec![]);
    let osgn = sig_bytes(vec![]);
    let body = vec![opcode_token(Opcode::Ret as u32, 1)];
    let code = tokens_to_bytes(&make_program_tokens(ShaderStage::Pixel, 5, 0, &body));
    let input = build_container_hashed(&[
        (FourCC::ISGN, &isgn),
        (FourCC::OSGN, &osgn),
        (FourCC::SHEX, &code),
    ]);

    let converted = Converter::new().convert(&input, "").expect("convert");
    let out = DxbcFile::parse(&converted.container).expect("output parses");
    let sfi0 = out.get_chunk(FourCC::SFI0).expect("SFI0 synthesized");
    assert_eq!(sfi0.data, &[0u8; 8]);
    assert!(out.get_chunk(FourCC::RTS0).is_none());
}

#[test]
fn hash_check_gates_tampered_containers() {
    let isgn = sig_bytes(vec![]);
    let osgn = sig_bytes(vec![]);
    let body = vec![opcode_token(Opcode::Ret as u32, 1)];
    let code = tokens_to_bytes(&make_program_tokens(ShaderStage::Pixel, 5, 0, &body));
    let mut input = build_container_hashed(&[
        (FourCC::ISGN, &isgn),
        (FourCC::OSGN, &osgn),
        (FourCC::SHEX, &code),
    ]);
    // Flip a bit in the hashed-but-unvalidated reserved field so only the
    // checksum notices.
    input[20] ^= 0x01;

    // Default: rejected.
    assert!(Converter::new().convert(&input, "").is_err());
    // Opt-out accepted.
    Converter::new()
        .convert(&input, "-disableHashCheck")
        .expect("hash check disabled");
}

#[test]
fn in_driver_conversion_matches_the_container_path() {
    let isgn_entries = vec![sig_entry("ARB", 0, 0, 3, 0, 0xF)];
    let osgn_entries = vec![sig_entry("ARB", 0, 0, 3, 0, 0xF)];
    let isgn = sig_bytes(isgn_entries);
    let osgn = sig_bytes(osgn_entries);
    let tokens = make_program_tokens(ShaderStage::Vertex, 5, 0, &passthrough_vs_body());
    let code = tokens_to_bytes(&tokens);

    let container = build_container_hashed(&[
        (FourCC::ISGN, &isgn),
        (FourCC::OSGN, &osgn),
        (FourCC::SHEX, &code),
    ]);

    let module = Converter::new()
        .convert_to_module(&container, "")
        .expect("container path");
    let container_bitcode = aero_dxil::serialize(&module);

    let ddi = |register: u32| DdiSignatureEntry {
        system_value: 0,
        register,
        mask: 0xF,
        stream: 0,
        _pad: [0; 2],
        component_type: 3,
        min_precision: 0,
    };
    let driver = Converter::new()
        .convert_in_driver(&tokens, &[ddi(0)], &[ddi(0)], &[], "")
        .expect("driver path");

    // P7: the two entry points produce identical bitcode once container
    // wrapping is out of the picture.
    assert_eq!(driver.bitcode, container_bitcode);
}

#[test]
fn conversion_failures_surface_stable_codes() {
    let err = Converter::new().convert(b"not a container", "").unwrap_err();
    assert_eq!(err.code(), 1, "malformed container");

    // Structurally valid container, garbage opcode stream.
    let isgn = sig_bytes(vec![]);
    let osgn = sig_bytes(vec![]);
    let body = vec![opcode_token(0x7fe, 1)];
    let code = tokens_to_bytes(&make_program_tokens(ShaderStage::Pixel, 5, 0, &body));
    let input = build_container_hashed(&[
        (FourCC::ISGN, &isgn),
        (FourCC::OSGN, &osgn),
        (FourCC::SHEX, &code),
    ]);
    let err = Converter::new().convert(&input, "").unwrap_err();
    assert_eq!(err.code(), 2, "malformed bytecode");
}
