use aero_dxbc::test_utils::{build_container, build_container_hashed};
use aero_dxbc::{DxbcError, DxbcFile, FourCC};

#[test]
fn parse_minimal_dxbc_and_iterate_chunks() {
    let bytes = build_container(&[
        (FourCC(*b"SHDR"), &[1, 2, 3, 4]),
        (FourCC(*b"JUNK"), &[0xaa, 0xbb]),
    ]);

    let file = DxbcFile::parse(&bytes).expect("parse should succeed");
    assert_eq!(file.header().magic, FourCC(*b"DXBC"));
    assert_eq!(file.header().total_size as usize, bytes.len());
    assert_eq!(file.header().chunk_count, 2);

    let chunks: Vec<_> = file.chunks().collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].fourcc, FourCC(*b"SHDR"));
    assert_eq!(chunks[0].data, &[1, 2, 3, 4]);
    assert_eq!(chunks[1].fourcc, FourCC(*b"JUNK"));
    assert_eq!(chunks[1].data, &[0xaa, 0xbb]);

    let shdr = file.get_chunk(FourCC(*b"SHDR")).expect("missing SHDR");
    assert_eq!(shdr.data, &[1, 2, 3, 4]);

    let junks: Vec<_> = file.get_chunks(FourCC(*b"JUNK")).collect();
    assert_eq!(junks.len(), 1);
    assert_eq!(junks[0].data, &[0xaa, 0xbb]);

    assert_eq!(
        file.find_first_shader_chunk().unwrap().fourcc,
        FourCC(*b"SHDR")
    );

    let summary = file.debug_summary();
    assert!(summary.contains("SHDR"));
    assert!(summary.contains("JUNK"));
}

#[test]
fn parse_allows_misaligned_chunk_offsets() {
    // Some real-world DXBC containers (and fuzzed inputs) may not maintain
    // strict 4-byte alignment for chunk starts. The parser should handle this
    // safely.
    let bytes = build_container(&[
        (FourCC(*b"SHDR"), &[1]),    // chunk 1 will start at an unaligned offset
        (FourCC(*b"JUNK"), &[2, 3]), // also make total_size non-4-aligned
    ]);

    let offset_table_pos = 4 + 16 + 4 + 4 + 4;
    let second_off = u32::from_le_bytes(
        bytes[offset_table_pos + 4..offset_table_pos + 8]
            .try_into()
            .unwrap(),
    ) as usize;
    assert_ne!(second_off % 4, 0);

    let file = DxbcFile::parse(&bytes).expect("parse should succeed");
    let chunks: Vec<_> = file.chunks().collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].data, &[1]);
    assert_eq!(chunks[1].data, &[2, 3]);
}

#[test]
fn missing_chunk_is_none_not_error() {
    // Callers must be able to distinguish "absent" from "malformed".
    let bytes = build_container(&[(FourCC(*b"SHDR"), &[0, 0, 0, 0])]);
    let file = DxbcFile::parse(&bytes).expect("parse");
    assert!(file.get_chunk(FourCC(*b"RTS0")).is_none());
    assert!(file.find_first_chunk(FourCC(*b"PSV0")).is_none());
}

#[test]
fn malformed_bad_magic_is_error() {
    let mut bytes = build_container(&[(FourCC(*b"SHDR"), &[1, 2, 3])]);
    bytes[0..4].copy_from_slice(b"NOPE");

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader { .. }));
    assert!(err.context().contains("bad magic"));
}

#[test]
fn malformed_truncated_header_is_error() {
    let bytes = vec![0u8; 10];
    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader { .. }));
    assert!(err.context().contains("need at least"));
    assert!(err.context().contains("got"));
}

#[test]
fn malformed_total_size_smaller_than_header_is_error() {
    let mut bytes = build_container(&[]);
    // total_size field is at offset 24.
    bytes[24..28].copy_from_slice(&0u32.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader { .. }));
    assert!(err.context().contains("total_size"));
    assert!(err.context().contains("smaller than header"));
}

#[test]
fn malformed_total_size_exceeds_buffer_len_is_error() {
    let mut bytes = build_container(&[]);
    let bad_total_size = (bytes.len() as u32) + 1;
    bytes[24..28].copy_from_slice(&bad_total_size.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("total_size"));
    assert!(err.context().contains("exceeds buffer length"));
}

#[test]
fn malformed_total_size_truncates_chunk_payload_is_error() {
    // Keep the buffer length unchanged but shrink the declared total_size so
    // it truncates the final byte of the chunk payload. Declared `total_size`
    // is the authoritative bound.
    let mut bytes = build_container(&[(FourCC(*b"SHDR"), &[1, 2, 3, 4])]);
    let bad_total_size = (bytes.len() as u32) - 1;
    bytes[24..28].copy_from_slice(&bad_total_size.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("chunk 0"));
    assert!(err.context().contains("SHDR"));
    assert!(err.context().contains("outside total_size"));
}

#[test]
fn malformed_total_size_truncates_chunk_header_is_error() {
    // Shrink total_size to end exactly at the end of the chunk offset table,
    // leaving no room for the chunk header itself.
    let mut bytes = build_container(&[(FourCC(*b"SHDR"), &[1, 2, 3, 4])]);
    let offset_table_end = 4 + 16 + 4 + 4 + 4 + 4;
    bytes[24..28].copy_from_slice(&(offset_table_end as u32).to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("chunk 0"));
    assert!(err.context().contains("header"));
    assert!(err.context().contains("outside total_size"));
}

#[test]
fn malformed_truncated_chunk_offset_table_is_error() {
    // DXBC header declaring one chunk, but missing the chunk offset table
    // entry.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"DXBC");
    bytes.extend_from_slice(&[0u8; 16]); // checksum
    bytes.extend_from_slice(&1u32.to_le_bytes()); // reserved
    bytes.extend_from_slice(&32u32.to_le_bytes()); // total_size
    bytes.extend_from_slice(&1u32.to_le_bytes()); // chunk_count
    assert_eq!(bytes.len(), 32);

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets { .. }));
    assert!(err.context().contains("chunk offset table"));
}

#[test]
fn rejects_excessive_chunk_count() {
    let mut bytes = build_container(&[]);
    bytes[28..32].copy_from_slice(&u32::MAX.to_le_bytes()); // chunk_count

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader { .. }));
    assert!(err.context().contains("chunk_count"));
}

#[test]
fn malformed_chunk_offset_points_into_header_is_error() {
    let mut bytes = build_container(&[(FourCC(*b"SHDR"), &[1, 2, 3, 4])]);
    // First offset table entry is right after the fixed header.
    bytes[32..36].copy_from_slice(&4u32.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets { .. }));
    assert!(err.context().contains("chunk 0"));
    assert!(err.context().contains("points into"));
}

#[test]
fn malformed_chunk_offset_points_into_offset_table_is_error() {
    let mut bytes = build_container(&[(FourCC(*b"SHDR"), &[1, 2, 3, 4])]);
    // Offset 32 is the offset table itself.
    bytes[32..36].copy_from_slice(&32u32.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets { .. }));
    assert!(err.context().contains("points into"));
}

#[test]
fn second_chunk_errors_mention_the_index() {
    let mut bytes = build_container(&[
        (FourCC(*b"SHDR"), &[1, 2, 3, 4]),
        (FourCC(*b"JUNK"), &[5, 6]),
    ]);
    // Push the second chunk's offset past total_size.
    let total_len = bytes.len() as u32;
    bytes[36..40].copy_from_slice(&total_len.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("chunk 1"));
}

#[test]
fn checksum_verifies_on_hashed_container() {
    let bytes = build_container_hashed(&[(FourCC(*b"SHEX"), &[1, 2, 3, 4])]);
    let file = DxbcFile::parse(&bytes).expect("parse");
    file.verify_checksum().expect("checksum should verify");
}

#[test]
fn checksum_mismatch_is_detected() {
    let mut bytes = build_container_hashed(&[(FourCC(*b"SHEX"), &[1, 2, 3, 4])]);
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let file = DxbcFile::parse(&bytes).expect("parse");
    let err = file.verify_checksum().unwrap_err();
    assert!(matches!(err, DxbcError::ChecksumMismatch { .. }));
}

#[test]
fn zeroed_checksum_field_fails_verification() {
    // `build_container` leaves the checksum zeroed.
    let bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3, 4])]);
    let file = DxbcFile::parse(&bytes).expect("parse");
    assert!(file.verify_checksum().is_err());
}
