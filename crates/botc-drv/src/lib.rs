//! botc-drv — the `botc` command-line driver.
//!
//! Thin orchestrator: load the definitions file into the shared symbol
//! tables, run the lexer/parser over the source file (components C1–C6),
//! hand the result to `botc-obj` (C7), and write the object file. Nothing
//! here is part of the compiler proper — it's the external collaborator
//! spec.md §1 calls out explicitly, kept in its own crate the way this
//! source family always keeps its binary-producing glue separate from the
//! compiler library crates it drives.

pub mod cli;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use botc_sym::{CommandTable, EventTable, StateTable, StringPool};
use botc_util::CompileResult;

pub use cli::Cli;

/// `CARGO_PKG_VERSION`-backed build stamp, printed in verbose mode (spec §3
/// "Version/build-info stamping").
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

const DEFAULT_DEFS_FILE: &str = "botc_defs.bts";

pub fn main() -> anyhow::Result<()> {
    use clap::Parser as _;
    let cli = Cli::parse();
    init_logging(cli.verbose);
    log::info!("botc {}", version());

    if let Some(defs_path) = cli.listfunctions.clone() {
        return list_functions(&defs_path).context("listing functions");
    }

    let source = cli.source.clone().ok_or_else(|| anyhow!("the following required argument was not provided: SOURCE"))?;
    let output = cli.output.clone().unwrap_or_else(|| default_output_path(&source));

    compile(&source, &output).with_context(|| format!("compiling {}", source.display()))
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let _ = env_logger::Builder::new().filter_level(level).format_timestamp(None).try_init();
}

/// spec §3: "strip trailing 3-char extension, append `.o`" — a fixed
/// mechanical transform, not a general `Path::extension()` lookup (which
/// would behave differently on an extensionless source name).
fn default_output_path(source: &Path) -> PathBuf {
    let mut name = source.to_string_lossy().into_owned();
    if name.len() > 3 {
        name.truncate(name.len() - 3);
    }
    name.push('o');
    PathBuf::from(name)
}

fn load_defs(defs_path: &Path, events: &mut EventTable, commands: &mut CommandTable) -> CompileResult<()> {
    log::info!("loading definitions from {}", defs_path.display());
    let mut stream = botc_lex::TokenStream::from_file(defs_path)?;
    botc_par::defs::compile_defs(&mut stream, events, commands)
}

fn list_functions(defs_path: &Path) -> CompileResult<()> {
    let mut events = EventTable::new();
    let mut commands = CommandTable::new();
    load_defs(defs_path, &mut events, &mut commands)?;

    for def in commands.iter() {
        let args = def
            .args
            .iter()
            .map(|a| match &a.default {
                Some(d) => format!("{} {} = {:?}", a.ty.name(), a.name, d),
                None => format!("{} {}", a.ty.name(), a.name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{} {}({}) // opcode {}, {}",
            def.return_type.name(),
            def.name,
            args,
            def.opcode_number,
            if def.is_builtin { "builtin" } else { "user-defined" }
        );
    }
    Ok(())
}

fn compile(source: &Path, output: &Path) -> CompileResult<()> {
    let mut events = EventTable::new();
    let mut commands = CommandTable::new();
    let defs_path = PathBuf::from(DEFAULT_DEFS_FILE);
    if defs_path.exists() {
        load_defs(&defs_path, &mut events, &mut commands)?;
    }

    log::info!("reading {}", source.display());
    let mut stream = botc_lex::TokenStream::from_file(source)?;

    let mut states = StateTable::new();
    let mut strings = StringPool::new();

    log::info!("parsing");
    let parsed = botc_par::compile(&mut stream, &mut states, &mut events, &commands, &mut strings)?;

    log::info!(
        "{} / {} states, {} / {} global events, reaction time budget {}ms",
        states.iter().count(),
        botc_isa::limits::MAX_STATES,
        events.iter().count(),
        botc_isa::limits::MAX_GLOBAL_EVENTS,
        botc_isa::limits::REACTION_TIME,
    );

    log::info!("linking {} state segment(s)", parsed.states.len());
    let bytes = botc_obj::link(&parsed, &strings);
    log::debug!("{}", botc_obj::dump(&parsed, &strings));

    log::info!("writing {} ({} bytes)", output.display(), bytes.len());
    botc_obj::write_object_file(output, &bytes)
}
