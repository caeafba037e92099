//! Handlers for the bugc cli commands
use crate::command::{BuildArgs, BytecodeSelection, CheckArgs};
use anyhow::{anyhow, Result};
use bugc::{compile_source, CompileOptions};
use bugc_diagnostics::{Diagnostics, Severity};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use tracing::info;

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Prints every diagnostic, errors first, colored by severity.
fn print_diagnostics(diagnostics: &Diagnostics) {
    for severity in [Severity::Error, Severity::Warning, Severity::Info] {
        for diag in diagnostics.by_severity(severity) {
            let line = format!("{diag}");
            match severity {
                Severity::Error => eprintln!("{}", line.red().bold()),
                Severity::Warning => eprintln!("{}", line.yellow()),
                Severity::Info => eprintln!("{}", line.blue()),
            }
        }
    }
}

/// Parse and type-check a source file only; no bytecode is written.
pub fn check_command(args: &CheckArgs) -> Result<()> {
    let source = fs::read_to_string(&args.input).map_err(|e| anyhow!("reading {}: {e}", args.input))?;

    info!("checking {}", args.input);
    let pb = spinner("Parsing and type-checking...");
    let out = compile_source(&source, &CompileOptions::default())?;
    pb.finish_and_clear();

    print_diagnostics(&out.diagnostics);

    if out.diagnostics.has_errors() {
        return Err(anyhow!("{} reported errors", args.input));
    }

    println!("{}", "check passed".green().bold());
    Ok(())
}

/// Compile a source file, writing the requested bytecode blob(s) as
/// hex-encoded text files under `out`.
pub fn build_command(args: &BuildArgs) -> Result<()> {
    let source = fs::read_to_string(&args.input).map_err(|e| anyhow!("reading {}: {e}", args.input))?;

    info!("building {}", args.input);
    let pb = spinner("Compiling...");
    let out = compile_source(&source, &CompileOptions::default())?;
    pb.finish_and_clear();

    print_diagnostics(&out.diagnostics);

    if out.diagnostics.has_errors() {
        return Err(anyhow!("{} reported errors; no bytecode written", args.input));
    }

    let out_dir = Path::new(&args.out);
    fs::create_dir_all(out_dir)?;

    let write_hex = |name: &str, bytes: &[u8]| -> Result<()> {
        let path = out_dir.join(name);
        fs::write(&path, hex_encode(bytes))?;
        println!("  {} {}", "wrote".green(), path.display());
        Ok(())
    };

    if matches!(args.emit, BytecodeSelection::Runtime | BytecodeSelection::Both) {
        let runtime = out.runtime.ok_or_else(|| anyhow!("no runtime bytecode produced"))?;
        write_hex("runtime.hex", &runtime)?;
    }
    if matches!(args.emit, BytecodeSelection::Deploy | BytecodeSelection::Both) {
        let deployment = out.deployment.ok_or_else(|| anyhow!("no deployment bytecode produced"))?;
        write_hex("deployment.hex", &deployment)?;
    }

    println!("\n{} {}\n", "build succeeded:".green().bold(), args.input.cyan());
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
