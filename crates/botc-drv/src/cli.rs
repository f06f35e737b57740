//! Command-line surface (spec §3 "Configuration / CLI"): `SOURCE [OUTPUT]`,
//! `-l/--listfunctions [DEFS_FILE]`, `-V/--verbose` (repeatable), and
//! clap's generated `-h/--help`.

use std::path::PathBuf;

use clap::Parser;

/// botc — botscript compiler.
#[derive(Debug, Parser)]
#[command(name = "botc", disable_version_flag = true)]
pub struct Cli {
    /// Source file to compile (omitted only with `--listfunctions`).
    pub source: Option<PathBuf>,

    /// Output object file path. Defaults to `SOURCE` with its extension
    /// replaced by `.o`.
    pub output: Option<PathBuf>,

    /// Print every command's signature from the definitions file and exit,
    /// without compiling anything.
    #[arg(short = 'l', long = "listfunctions", num_args = 0..=1, default_missing_value = "botc_defs.bts")]
    pub listfunctions: Option<PathBuf>,

    /// Increase logging verbosity; may be repeated (`-VV`).
    #[arg(short = 'V', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
