use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use dietrack_core::{BitVector, UpdateMode, ValueSource};
use dietrack_engine::{DownBinPolicy, EnvGlobals, RuleEngine, TrackingEngine, UpdateParams};
use dietrack_store::{
    loader, Database, DefinitionRepo, DefinitionStore, SqliteAuditLog, SqliteStore,
};
use dietrack_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "dietrack", about = "Die feature tracking and rule evaluation", version)]
struct Cli {
    /// Path to the store database.
    #[arg(long, global = true, default_value = "dietrack.db")]
    db: PathBuf,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load tracker and rule definition files into the store.
    Load {
        #[arg(long)]
        trackers: Option<PathBuf>,
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Print a composite tracker's current bits and reset value.
    Show {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Update a composite tracker.
    Update {
        #[arg(required = true)]
        names: Vec<String>,
        /// Input name: literal bits, a global-variable name, or a
        /// `Context.Key` storage token, depending on --source.
        #[arg(long)]
        value: String,
        /// Value source: literal, global, or storage.
        #[arg(long, default_value = "literal")]
        source: String,
        /// Bits to withhold from the update (`1` = preserve stored bit).
        #[arg(long)]
        mask: Option<String>,
        /// merge or overwrite.
        #[arg(long, default_value = "merge")]
        mode: String,
    },
    /// Evaluate a rule against a tracker's current bits or literal bits.
    Evaluate {
        rule: String,
        /// Composite tracker names to read the bits from.
        #[arg(long, conflicts_with = "bits")]
        tracker: Vec<String>,
        /// Literal bit string to evaluate instead.
        #[arg(long)]
        bits: Option<String>,
    },
    /// Configure the down-bin policy flag for this run (first call wins).
    Policy {
        #[arg(long)]
        allow_down_bins: bool,
    },
    /// Show recent audit records, newest first.
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Copy a tracker's definition, and data if any, under a new name.
    CloneTracker { src: String, dst: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        json: cli.json_logs,
        ..TelemetryConfig::default()
    });

    let db = Database::open(&cli.db)
        .with_context(|| format!("open store at {}", cli.db.display()))?;
    let store: Arc<dyn DefinitionStore> = Arc::new(SqliteStore::new(db.clone()));
    let audit = Arc::new(SqliteAuditLog::new(db));

    match cli.command {
        Command::Load { trackers, rules } => {
            if trackers.is_none() && rules.is_none() {
                bail!("nothing to load: pass --trackers and/or --rules");
            }
            let repo = DefinitionRepo::new(store);
            if let Some(path) = trackers {
                let count = loader::load_tracker_file(&repo, &path)?;
                println!("loaded {count} tracker definitions");
            }
            if let Some(path) = rules {
                let count = loader::load_rule_file(&repo, &path)?;
                println!("loaded {count} rule definitions");
            }
        }

        Command::Show { names } => {
            let engine = engine_over(&names, store, audit)?;
            println!("tracker:     {}", engine.name());
            println!("size:        {}", engine.size());
            println!("reset value: {}", engine.reset_value());
            match engine.current_bits() {
                Ok(bits) => println!("current:     {bits}"),
                Err(dietrack_engine::EngineError::NotInitialized { tracker }) => {
                    println!("current:     (not initialized: {tracker})")
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Update { names, value, source, mask, mode } => {
            let engine = engine_over(&names, store, audit)?;
            let mode = parse_mode(&mode)?;
            let source = ValueSource::from_str(&source).map_err(anyhow::Error::msg)?;
            let mask = mask.map(|m| BitVector::from_lenient(&m));

            let new_value = engine.mask_bits(source, &value)?;
            let mut params = UpdateParams::new(new_value, mode);
            if let Some(mask) = &mask {
                params = params.with_mask(mask);
            }
            if engine.update(params)? {
                println!("updated: {}", engine.current_bits()?);
            } else {
                bail!("update rejected by the down-bin policy");
            }
        }

        Command::Evaluate { rule, tracker, bits } => {
            let vector = match (bits, tracker.is_empty()) {
                (Some(raw), _) => raw.parse::<BitVector>().map_err(anyhow::Error::msg)?,
                (None, false) => engine_over(&tracker, store.clone(), audit)?.current_bits()?,
                (None, true) => bail!("pass --tracker names or --bits"),
            };
            let matches = RuleEngine::new(store).evaluate(&rule, &vector)?;
            if matches.is_empty() {
                println!("no matching configuration");
            }
            for m in matches {
                println!("{} ({:?})", m.variant, m.kind);
            }
        }

        Command::Policy { allow_down_bins } => {
            DownBinPolicy::new(store).configure(allow_down_bins)?;
            println!("down-bins allowed: {allow_down_bins}");
        }

        Command::Audit { limit } => {
            for record in audit.recent(limit)? {
                println!(
                    "{} {} mask={} result={} {} -> {}",
                    record.timestamp,
                    record.tracker,
                    record.mask,
                    record.result,
                    record.incoming,
                    record.outgoing,
                );
            }
        }

        Command::CloneTracker { src, dst } => {
            let repo = DefinitionRepo::new(store);
            let def = repo.clone_tracker(&src, &dst)?;
            println!("cloned {src} -> {dst} ({} bits)", def.size);
        }
    }

    Ok(())
}

fn engine_over(
    names: &[String],
    store: Arc<dyn DefinitionStore>,
    audit: Arc<SqliteAuditLog>,
) -> anyhow::Result<TrackingEngine> {
    Ok(TrackingEngine::new(
        names.iter().cloned(),
        store,
        audit,
        Arc::new(EnvGlobals),
    )?)
}

fn parse_mode(s: &str) -> anyhow::Result<UpdateMode> {
    match s {
        "merge" => Ok(UpdateMode::Merge),
        "overwrite" => Ok(UpdateMode::Overwrite),
        other => bail!("unknown mode `{other}` (expected merge or overwrite)"),
    }
}
