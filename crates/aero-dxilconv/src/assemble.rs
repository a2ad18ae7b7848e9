//! Output container assembly.
//!
//! The emitted module becomes a `DXIL` part; the input's signature parts are
//! copied verbatim (in every ABI generation they appear in, zero-padded to a
//! 4-byte boundary), the root-signature and feature-info parts are carried
//! over when present, and a zero feature-info part is written when absent.

use aero_dxbc::write::pad4;
use aero_dxbc::{ContainerBuilder, DxbcFile, FourCC};
use aero_dxil::container::module_to_dxil_part;

use crate::conv::Conversion;
use crate::error::Result;

/// Signature tags the assembler copies through, in every generation.
const SIGNATURE_TAGS: [FourCC; 7] = [
    FourCC::ISGN,
    FourCC::ISG1,
    FourCC::OSGN,
    FourCC::OSG5,
    FourCC::OSG1,
    FourCC::PCSG,
    FourCC::PSG1,
];

impl Conversion {
    /// Assembles the output container for the standalone entry point.
    pub(crate) fn assemble_container(&self, input: &DxbcFile<'_>) -> Result<Vec<u8>> {
        let mut builder = ContainerBuilder::new();

        // Copied parts keep their input order; signatures are padded to a
        // DWORD boundary.
        for chunk in input.chunks() {
            let is_signature = SIGNATURE_TAGS.contains(&chunk.fourcc);
            let copied = is_signature
                || chunk.fourcc == FourCC::RTS0
                || chunk.fourcc == FourCC::SFI0;
            if !copied {
                continue;
            }
            let mut payload = chunk.data.to_vec();
            if is_signature {
                pad4(&mut payload);
            }
            builder.push_part(chunk.fourcc, payload);
        }

        // Feature info is mandatory in the output; absent on input means an
        // all-zero 64-bit record.
        if !builder.has_part(FourCC::SFI0) {
            builder.push_part(FourCC::SFI0, vec![0u8; 8]);
        }

        builder.push_part(FourCC::PSV0, self.build_psv0());
        builder.push_part(FourCC::DXIL, module_to_dxil_part(&self.module));

        Ok(builder.build()?)
    }
}
