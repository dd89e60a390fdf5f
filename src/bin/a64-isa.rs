use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};

use aarch64_isadb::isa::{Catalog, NoMatch, NormalizedOpcode, Strictness};
use aarch64_isadb::load;

/// AArch64 instruction encoding lookup
#[derive(Parser, Debug)]
#[command(name = "a64-isa", version, after_help = EXAMPLES)]
#[command(group(ArgGroup::new("query").required(true).args(["n", "op", "hint"])))]
struct Args {
    /// Show encoding pattern(s) for a mnemonic
    #[arg(long = "n", value_name = "MNEMONIC")]
    n: Option<String>,

    /// Decode an opcode to assembly (0xHEX or 0bBINARY)
    #[arg(long, value_name = "OPCODE")]
    op: Option<String>,

    /// List encodings compatible with a partial opcode (X/x for don't care)
    #[arg(long, value_name = "PARTIAL_OPCODE")]
    hint: Option<String>,

    /// Fail instead of printing unresolved operand placeholders
    #[arg(long)]
    strict: bool,

    /// Encoding database (JSON array or JSON Lines)
    #[arg(long, env = "A64_ISA_DB", default_value = "aarch64_isa_db.json")]
    db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

const EXAMPLES: &str = "\
Examples:
  a64-isa --n ADD
  a64-isa --op 0x11000000
  a64-isa --op 0x91_00_00_00
  a64-isa --op 0b10010001_00000000_00000000_00000000
  a64-isa --hint 0x1100XXXX
  a64-isa --hint 0b1001xxxx_0000xxxx_xxxxxxxx_xxxxxxxx

'_' and ':' may be used as separators. In hex, X/x is four don't care bits; in binary, one.";

fn decode(catalog: &Catalog, input: &str, strictness: Strictness) -> Result<()> {
    let opcode = NormalizedOpcode::parse(input)
        .with_context(|| format!("error parsing opcode {:?}", input))?;
    let found = catalog.decode_opcode(&opcode, strictness)
        .with_context(|| format!("decoding {}", input))?;

    if found.is_empty() {
        print!("{}", NoMatch::opcode(input, opcode));
        return Ok(());
    }
    if found.len() > 1 {
        log::warn!("{} encodings match {}", found.len(), input);
    }
    for decoded in found {
        println!("{}", decoded);
    }
    Ok(())
}

fn hint(catalog: &Catalog, input: &str) -> Result<()> {
    let opcode = NormalizedOpcode::parse(input)
        .with_context(|| format!("error parsing partial opcode {:?}", input))?;
    let found = aarch64_isadb::isa::matcher::scan_hint(catalog, &opcode);

    if found.is_empty() {
        print!("{}", NoMatch::partial(input, opcode));
        return Ok(());
    }
    for template in found {
        println!("{}", template.assembly_template());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let catalog = load::load_catalog(&args.db)
        .with_context(|| format!("loading encoding database {}", args.db.display()))?;

    let strictness = if args.strict { Strictness::Strict } else { Strictness::Lenient };

    if let Some(mnemonic) = args.n.as_deref() {
        print!("{}", catalog.describe_mnemonic(mnemonic));
    } else if let Some(op) = args.op.as_deref() {
        decode(&catalog, op, strictness)?;
    } else if let Some(partial) = args.hint.as_deref() {
        hint(&catalog, partial)?;
    }
    Ok(())
}
