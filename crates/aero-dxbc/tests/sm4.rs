use aero_dxbc::sm4::{ShaderModel, ShaderStage, Sm4Error, Sm4Program};
use aero_dxbc::test_utils::{build_container, make_program_tokens, tokens_to_bytes};
use aero_dxbc::{DxbcFile, FourCC};

#[test]
fn parses_shdr_and_decodes_stage_and_model() {
    // Vertex shader model 4.0.
    let tokens = make_program_tokens(ShaderStage::Vertex, 4, 0, &[]);
    let shdr = tokens_to_bytes(&tokens);
    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr)]);

    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");
    let program = Sm4Program::parse_from_dxbc(&dxbc).expect("SM4 parse");

    assert_eq!(program.stage, ShaderStage::Vertex);
    assert_eq!(program.model, ShaderModel { major: 4, minor: 0 });
    assert_eq!(program.tokens.len(), 2);
}

#[test]
fn parse_from_dxbc_prefers_shex_over_shdr() {
    let shdr = tokens_to_bytes(&make_program_tokens(ShaderStage::Vertex, 4, 0, &[]));
    let shex = tokens_to_bytes(&make_program_tokens(ShaderStage::Pixel, 5, 0, &[]));
    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr), (FourCC(*b"SHEX"), &shex)]);

    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");
    let program = Sm4Program::parse_from_dxbc(&dxbc).expect("SM parse");

    assert_eq!(program.stage, ShaderStage::Pixel);
    assert_eq!(program.model.major, 5);
}

#[test]
fn rejects_misaligned_token_stream() {
    let bytes = build_container(&[(FourCC(*b"SHDR"), &[0u8; 5])]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::MisalignedTokens { len: 5 }));
}

#[test]
fn rejects_too_short_token_stream() {
    // Only 1 DWORD.
    let bytes = build_container(&[(FourCC(*b"SHDR"), &[0u8; 4])]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::TooShort { dwords: 1 }));
}

#[test]
fn rejects_declared_length_out_of_bounds() {
    // Two DWORDs provided, but declared length is 3.
    let mut tokens = make_program_tokens(ShaderStage::Pixel, 4, 0, &[]);
    tokens[1] = 3;
    let shdr = tokens_to_bytes(&tokens);
    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr)]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(
        err,
        Sm4Error::DeclaredLengthOutOfBounds {
            declared: 3,
            available: 2
        }
    ));
}

#[test]
fn declared_length_too_small_is_error() {
    // Declared length 1 cannot hold the version+length header.
    let mut tokens = make_program_tokens(ShaderStage::Pixel, 4, 0, &[]);
    tokens[1] = 1;
    let shdr = tokens_to_bytes(&tokens);
    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr)]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::DeclaredLengthTooSmall { declared: 1 }));
}

#[test]
fn declared_length_truncates_trailing_bytes() {
    // Provide extra DWORDs beyond the declared length; they should be
    // ignored.
    let mut tokens = make_program_tokens(ShaderStage::Vertex, 4, 0, &[]);
    let header = [tokens[0], tokens[1]];
    tokens.push(0xDEAD_BEEF);
    tokens.push(0x1234_5678);
    let shdr = tokens_to_bytes(&tokens);

    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr)]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");
    let program = Sm4Program::parse_from_dxbc(&dxbc).expect("SM4 parse");

    assert_eq!(program.tokens.len(), 2);
    assert_eq!(program.tokens[0], header[0]);
    assert_eq!(program.tokens[1], header[1]);
}

#[test]
fn missing_shader_chunk_is_error() {
    let bytes = build_container(&[(FourCC(*b"JUNK"), &[1, 2, 3, 4])]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::MissingShaderChunk));
}

#[test]
fn rejects_models_outside_the_supported_range() {
    // SM 3.0 is the legacy D3D9 format, not a token stream this crate
    // understands.
    let version = (1u32 << 16) | (3 << 4);
    let shdr = tokens_to_bytes(&[version, 2]);
    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr)]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(
        err,
        Sm4Error::UnsupportedModel { major: 3, minor: 0 }
    ));
}

#[test]
fn rejects_unknown_program_type() {
    let version = (7u32 << 16) | (5 << 4);
    let shdr = tokens_to_bytes(&[version, 2]);
    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr)]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(
        err,
        Sm4Error::UnknownProgramType { program_type: 7 }
    ));
}

#[test]
fn driver_token_slices_frame_the_same_way() {
    let tokens = make_program_tokens(ShaderStage::Compute, 5, 0, &[]);
    let program = Sm4Program::parse_token_slice(&tokens).expect("parse");
    assert_eq!(program.stage, ShaderStage::Compute);
    assert_eq!(program.model, ShaderModel { major: 5, minor: 0 });
}

#[test]
fn sm51_flag_tracks_the_binding_model_switch() {
    assert!(!ShaderModel { major: 5, minor: 0 }.is_51_plus());
    assert!(ShaderModel { major: 5, minor: 1 }.is_51_plus());
}
