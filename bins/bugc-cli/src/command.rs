//! holding command related structures
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[clap(name = "bugc", bin_name = "bugc")]
#[clap(version, about = "BUGC: compiles BUG smart contracts to EVM bytecode")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a BUG source file to runtime + deployment bytecode
    Build(BuildArgs),

    /// Parse and type-check a BUG source file without emitting bytecode
    Check(CheckArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Path to the `.bug` source file
    pub input: String,

    /// Output directory for the compiled bytecode (`<out>/runtime.hex`,
    /// `<out>/deployment.hex`)
    #[clap(long, default_value = "out")]
    pub out: String,

    /// Which blob(s) to emit
    #[clap(long, default_value = "both")]
    pub emit: BytecodeSelection,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the `.bug` source file
    pub input: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BytecodeSelection {
    Runtime,
    Deploy,
    Both,
}
