use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};

use aarch64_isadb::load;
use aarch64_isadb::sysreg::RegisterQuery;

/// AArch64 system register lookup
#[derive(Parser, Debug)]
#[command(name = "a64-sysreg", version, after_help = EXAMPLES)]
#[command(group(ArgGroup::new("query_kind").required(true).args(["query", "field", "feature"])))]
struct Args {
    /// REG, REG[bit], REG[hi:lo], REG.FIELD, REG.FIELD[hi:lo], or RES0/RES1/...
    query: Option<String>,

    /// List the registers that have a field of this name
    #[arg(long, value_name = "NAME")]
    field: Option<String>,

    /// List the registers under a feature
    #[arg(long, value_name = "FEATURE")]
    feature: Option<String>,

    /// Print the answer as JSON
    #[arg(long)]
    json: bool,

    /// Register database (JSON array or JSON Lines)
    #[arg(long, env = "A64_SYSREG_DB", default_value = "aarch64_sysreg_db.json")]
    db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

const EXAMPLES: &str = "\
Examples:
  a64-sysreg 'HCR_EL2[1]'
  a64-sysreg 'HCR_EL2[31:8]'
  a64-sysreg HCR_EL2.TGE
  a64-sysreg ACCDATA_EL1
  a64-sysreg RES1 --json
  a64-sysreg --field TGE";

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let db = load::load_registers(&args.db)
        .with_context(|| format!("loading register database {}", args.db.display()))?;

    let query = match (args.query, args.field, args.feature) {
        (Some(query), _, _) => RegisterQuery::parse(&query)?,
        (None, Some(field), _) => RegisterQuery::FieldUsers(field),
        (None, None, Some(feature)) => RegisterQuery::Feature(feature),
        (None, None, None) => anyhow::bail!("no query given"),
    };

    let answer = db.answer(&query)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", answer);
    }
    Ok(())
}
