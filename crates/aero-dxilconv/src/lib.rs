//! DXBC to DXIL translation.
//!
//! The converter turns a legacy tokenized shader (shader models 4.0 through
//! 5.1) into a typed SSA module whose primitives are dx op intrinsic calls,
//! then re-packages the result in a container. Two entry points exist:
//!
//! - [`Converter::convert`] — container in, container out (the standalone
//!   tool path).
//! - [`Converter::convert_in_driver`] — raw tokens plus DDI-shaped signature
//!   vectors in, bitcode out (the driver path; no container on either side).
//!
//! One conversion is fully independent of any other: all state lives on the
//! per-conversion instance, and the only global is the compile-time opcode
//! property table. A single conversion is single-threaded and runs to
//! completion on the caller's thread.

mod analyze;
mod assemble;
mod conv;
mod driver;
mod error;
mod lower;
mod operands;
mod options;
mod psv;
mod scopes;
mod signature;

pub use driver::DdiSignatureEntry;
pub use error::ConvertError;
pub use options::Options;

use aero_dxbc::sm4::{decode_program, Sm4Program};
use aero_dxbc::{DxbcFile, FourCC};
use aero_dxil::{is_reducible, remove_unreachable_blocks, verify_module, FuncId, ModulePass};
use tracing::{debug, debug_span};

use crate::conv::Conversion;
use crate::error::Result;
use crate::signature::{build_signature, records_from_chunk, records_from_ddi, SigKind};

/// Result of a standalone conversion.
#[derive(Debug)]
pub struct Converted {
    /// The assembled DXIL container.
    pub container: Vec<u8>,
    /// Caller-owned diagnostics, when the conversion produced any.
    pub diagnostics: Option<String>,
}

/// Result of an in-driver conversion.
#[derive(Debug)]
pub struct ConvertedModule {
    /// Serialized bitcode, not wrapped in a container.
    pub bitcode: Vec<u8>,
    pub diagnostics: Option<String>,
}

/// The DXBC-to-DXIL converter. Stateless between conversions; construct once
/// and reuse, or construct per call.
#[derive(Default)]
pub struct Converter {
    cleanup: Option<Box<dyn ModulePass>>,
}

impl Converter {
    pub fn new() -> Converter {
        Converter::default()
    }

    /// Installs the post-lowering IR cleanup pass. The converter treats it as
    /// an opaque in-place transform over the emitted module.
    pub fn with_cleanup(mut self, pass: Box<dyn ModulePass>) -> Converter {
        self.cleanup = Some(pass);
        self
    }

    /// Converts a DXBC container into a DXIL container.
    pub fn convert(&self, dxbc: &[u8], extra_options: &str) -> Result<Converted> {
        let span = debug_span!("convert", size = dxbc.len());
        let _guard = span.enter();

        let options = Options::parse(extra_options);
        let file = DxbcFile::parse(dxbc)?;
        if !options.disable_hash_check {
            file.verify_checksum()?;
        }

        let program = Sm4Program::parse_from_dxbc(&file)?;
        let mut conversion = self.build_module(&file, program, options)?;

        let container = conversion.assemble_container(&file)?;
        Ok(Converted {
            container,
            diagnostics: drain_diagnostics(&mut conversion),
        })
    }

    /// Converts a DXBC container and hands back the bare module instead of a
    /// container; the tool's listing/bitcode modes build on this.
    pub fn convert_to_module(
        &self,
        dxbc: &[u8],
        extra_options: &str,
    ) -> Result<aero_dxil::Module> {
        let options = Options::parse(extra_options);
        let file = DxbcFile::parse(dxbc)?;
        if !options.disable_hash_check {
            file.verify_checksum()?;
        }
        let program = Sm4Program::parse_from_dxbc(&file)?;
        let conversion = self.build_module(&file, program, options)?;
        Ok(conversion.module)
    }

    /// Converts raw bytecode plus DDI signatures into bare bitcode.
    pub fn convert_in_driver(
        &self,
        tokens: &[u32],
        input_signature: &[DdiSignatureEntry],
        output_signature: &[DdiSignatureEntry],
        patch_constant_signature: &[DdiSignatureEntry],
        extra_options: &str,
    ) -> Result<ConvertedModule> {
        let span = debug_span!("convert_in_driver", dwords = tokens.len());
        let _guard = span.enter();

        let options = Options::parse(extra_options);
        let program = Sm4Program::parse_token_slice(tokens)?;
        let stage = program.stage;
        let model = program.model;

        let instructions = decode_program(&program)?;
        let analysis = analyze::analyze(stage, model, &instructions)?;

        let input_records =
            records_from_ddi(input_signature, SigKind::Input, stage, &analysis)?;
        let output_records =
            records_from_ddi(output_signature, SigKind::Output, stage, &analysis)?;
        let patch_records = records_from_ddi(
            patch_constant_signature,
            SigKind::PatchConstant,
            stage,
            &analysis,
        )?;

        let input_sig = build_signature(SigKind::Input, stage, input_records, &analysis)?;
        let output_sig = build_signature(SigKind::Output, stage, output_records, &analysis)?;
        let patch_sig =
            build_signature(SigKind::PatchConstant, stage, patch_records, &analysis)?;

        let mut conversion = Conversion::new(
            stage,
            model,
            analysis,
            options,
            instructions,
            input_sig,
            output_sig,
            patch_sig,
        );
        self.run_pipeline(&mut conversion)?;

        let bitcode = aero_dxil::serialize(&conversion.module);
        Ok(ConvertedModule {
            bitcode,
            diagnostics: drain_diagnostics(&mut conversion),
        })
    }

    /// Container path: extract signatures, then run the shared pipeline.
    fn build_module(
        &self,
        file: &DxbcFile<'_>,
        program: Sm4Program,
        options: Options,
    ) -> Result<Conversion> {
        let stage = program.stage;
        let model = program.model;

        let instructions = decode_program(&program)?;
        let analysis = analyze::analyze(stage, model, &instructions)?;

        let signature_records = |tag: FourCC| -> Result<_> {
            match file.get_signature(tag) {
                None => Ok(Vec::new()),
                Some(chunk) => Ok(records_from_chunk(&chunk?)),
            }
        };
        let input_records = signature_records(FourCC::ISGN)?;
        let output_records = signature_records(FourCC::OSGN)?;
        let patch_records = signature_records(FourCC::PCSG)?;

        let input_sig = build_signature(SigKind::Input, stage, input_records, &analysis)?;
        let output_sig = build_signature(SigKind::Output, stage, output_records, &analysis)?;
        let patch_sig =
            build_signature(SigKind::PatchConstant, stage, patch_records, &analysis)?;

        let mut conversion = Conversion::new(
            stage,
            model,
            analysis,
            options,
            instructions,
            input_sig,
            output_sig,
            patch_sig,
        );
        self.run_pipeline(&mut conversion)?;
        Ok(conversion)
    }

    /// The shared lowering pipeline: declarations, instruction lowering,
    /// CFG finalization, verification, cleanup.
    fn run_pipeline(&self, conversion: &mut Conversion) -> Result<()> {
        conversion.declare_resources();
        conversion.declare_tgsm();
        conversion.declare_icb();
        conversion.attach_signature_metadata();

        conversion.convert_instructions()?;

        // Finalization: drop unreachable continuation blocks, then gate the
        // cleanup pass on reducibility.
        let func_count = conversion.module.functions.len();
        for i in 0..func_count {
            remove_unreachable_blocks(&mut conversion.module, FuncId(i as u32));
        }
        for func in &conversion.module.functions {
            if !is_reducible(func) {
                return Err(ConvertError::IrreducibleControlFlow(func.name.clone()));
            }
        }

        if cfg!(debug_assertions) || cfg!(feature = "verify") {
            verify_module(&conversion.module)
                .map_err(|e| ConvertError::VerificationFailed(e.to_string()))?;
        }

        if !conversion.options.no_dxil_cleanup {
            if let Some(pass) = &self.cleanup {
                debug!(pass = pass.name(), "running cleanup pass");
                pass.run(&mut conversion.module)
                    .map_err(|e| ConvertError::VerificationFailed(e.to_string()))?;
            }
        }

        for unknown in &conversion.options.unknown {
            conversion
                .diagnostics
                .push(format!("ignored unrecognized option {unknown}"));
        }
        Ok(())
    }
}

fn drain_diagnostics(conversion: &mut Conversion) -> Option<String> {
    if conversion.diagnostics.is_empty() {
        None
    } else {
        Some(conversion.diagnostics.join("\n"))
    }
}

impl Conversion {
    /// Copies the signature maps into the module metadata.
    fn attach_signature_metadata(&mut self) {
        self.module.input_signature = self.input_sig.cloned_elements().to_vec();
        self.module.output_signature = self.output_sig.cloned_elements().to_vec();
        self.module.patch_constant_signature = self.patch_sig.cloned_elements().to_vec();
    }
}
