//! Standalone DXBC-to-DXIL converter.
//!
//! ```text
//! dxbc2dxil <input> [/o <output>] [/disasm-dxbc] [/emit-llvm] [/emit-bc]
//!           [/no-dxil-cleanup]
//! ```
//!
//! Options are accepted with either `/` or `-` prefixes for compatibility
//! with the original tool's command lines. `/disasm-dxbc`, `/emit-llvm`, and
//! `/emit-bc` are mutually exclusive; the first two may print to stdout,
//! `/emit-bc` and the default container mode require `/o`.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use aero_dxbc::sm4::{disassemble, Sm4Program};
use aero_dxbc::DxbcFile;
use aero_dxilconv::Converter;

#[derive(Debug, Parser)]
#[command(
    name = "dxbc2dxil",
    about = "Converts DXBC shader containers (SM 4.0-5.1) to DXIL containers"
)]
struct Args {
    /// Input DXBC file.
    input: PathBuf,

    /// Output file name.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print DXBC disassembly and exit.
    #[arg(long)]
    disasm_dxbc: bool,

    /// Print the textual IR and exit.
    #[arg(long)]
    emit_llvm: bool,

    /// Emit bare bitcode rather than a DXIL container.
    #[arg(long)]
    emit_bc: bool,

    /// Skip the post-lowering IR cleanup pass.
    #[arg(long)]
    no_dxil_cleanup: bool,

    /// Accept containers whose integrity hash does not validate.
    #[arg(long)]
    disable_hash_check: bool,
}

/// Rewrites `/option`-style arguments into the `--option` form so one parser
/// serves both conventions.
fn normalize_args() -> Vec<std::ffi::OsString> {
    std::env::args_os()
        .map(|arg| {
            let Some(s) = arg.to_str() else { return arg };
            match s {
                "/o" => "--output".into(),
                "/disasm-dxbc" => "--disasm-dxbc".into(),
                "/emit-llvm" => "--emit-llvm".into(),
                "/emit-bc" => "--emit-bc".into(),
                "/no-dxil-cleanup" => "--no-dxil-cleanup".into(),
                "/disableHashCheck" => "--disable-hash-check".into(),
                "/?" | "/h" | "/help" => "--help".into(),
                _ => arg,
            }
        })
        .collect()
}

fn run(args: &Args) -> Result<()> {
    let mode_flags =
        args.disasm_dxbc as u8 + args.emit_llvm as u8 + args.emit_bc as u8;
    if mode_flags > 1 {
        bail!("/disasm-dxbc, /emit-llvm, and /emit-bc are mutually exclusive");
    }
    if (args.emit_bc || mode_flags == 0) && args.output.is_none() {
        bail!("this mode requires an output file (/o <file>)");
    }

    let bytes = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let mut extra_options = String::new();
    if args.no_dxil_cleanup {
        extra_options.push_str(" -no-dxil-cleanup");
    }
    if args.disable_hash_check {
        extra_options.push_str(" -disableHashCheck");
    }

    if args.disasm_dxbc {
        let file = DxbcFile::parse(&bytes).context("parsing DXBC container")?;
        let program = Sm4Program::parse_from_dxbc(&file).context("locating shader tokens")?;
        let listing = disassemble(&program).context("disassembling")?;
        return write_text(args.output.as_deref(), &listing);
    }

    let converter = Converter::new();

    if args.emit_llvm {
        let module = converter
            .convert_to_module(&bytes, &extra_options)
            .context("converting")?;
        let listing = aero_dxil::text::write_module(&module);
        return write_text(args.output.as_deref(), &listing);
    }

    let output = args.output.as_ref().expect("output checked above");
    if args.emit_bc {
        let module = converter
            .convert_to_module(&bytes, &extra_options)
            .context("converting")?;
        let bitcode = aero_dxil::serialize(&module);
        fs::write(output, bitcode)
            .with_context(|| format!("writing {}", output.display()))?;
    } else {
        let converted = converter
            .convert(&bytes, &extra_options)
            .context("converting")?;
        if let Some(diag) = &converted.diagnostics {
            eprintln!("{diag}");
        }
        fs::write(output, &converted.container)
            .with_context(|| format!("writing {}", output.display()))?;
    }
    Ok(())
}

fn write_text(output: Option<&std::path::Path>, text: &str) -> Result<()> {
    match output {
        None => {
            std::io::stdout().write_all(text.as_bytes())?;
            Ok(())
        }
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_from(normalize_args());
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dxbc2dxil: {err:#}");
            ExitCode::FAILURE
        }
    }
}
