mod backends;
mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dialectic_ai::{AnalysisRequest, Analyst, ReferenceInput};
use dialectic_core::{AnalysisConfig, ModuleKind, ProviderId, chunks};
use dialectic_store::{DuckStore, MemoryStore, PolicyStore, RecordStore, records_to_batch};
use serde::Serialize;

use crate::backends::ProviderKeys;

#[derive(Parser)]
#[command(name = "dialectic", version, about = "Chunked LLM analysis of argumentative text")]
struct Cli {
    /// JSON file overriding analysis defaults.
    #[arg(long, global = true, env = "DIALECTIC_CONFIG")]
    config: Option<PathBuf>,

    /// DuckDB file holding doctrine and analysis history.
    #[arg(long, global = true, env = "DIALECTIC_DB", default_value = "dialectic.duckdb")]
    db: PathBuf,

    /// Keep everything in memory; nothing is persisted.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(flatten)]
    keys: ProviderKeys,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one analysis module over a text.
    Analyze {
        /// inference | justification | utility | integrity | continuity
        module: ModuleKind,
        /// Read the text from a file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Stored record id to compare against (continuity).
        #[arg(long = "reference")]
        references: Vec<String>,
        /// File whose text is compared against (continuity).
        #[arg(long = "reference-file")]
        reference_files: Vec<PathBuf>,
        /// Provider to try first.
        #[arg(long)]
        provider: Option<ProviderId>,
        /// Skip the argument gate.
        #[arg(long)]
        skip_gate: bool,
    },
    /// Decide whether a text is argumentative.
    Detect {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Extract the text's stance on laws of nature.
    Stance {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Extract the stance and score it against the stored doctrine.
    Align {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show how a text would be segmented.
    Segment {
        #[arg(long)]
        file: Option<PathBuf>,
        /// Word budget per chunk; defaults to the configured value.
        #[arg(long)]
        max_words: Option<usize>,
    },
    /// Read or change the reference doctrine.
    Doctrine {
        #[command(subcommand)]
        action: DoctrineAction,
    },
    /// List stored analyses.
    History {
        #[arg(long)]
        module: Option<ModuleKind>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one stored analysis.
    Show { id: String },
}

#[derive(Subcommand)]
enum DoctrineAction {
    /// Print every doctrine entry.
    Get,
    /// Set one entry, e.g. `law_kind non_humean`.
    Set {
        key: String,
        value: String,
        #[arg(long)]
        description: Option<String>,
    },
}

/// Store handles; `duck` is absent in ephemeral mode.
struct Stores {
    records: Arc<dyn RecordStore>,
    policy: Arc<dyn PolicyStore>,
    duck: Option<Arc<DuckStore>>,
}

fn open_stores(cli: &Cli) -> anyhow::Result<Stores> {
    if cli.ephemeral {
        let memory = Arc::new(MemoryStore::new());
        return Ok(Stores {
            records: memory.clone(),
            policy: memory,
            duck: None,
        });
    }
    let duck = Arc::new(
        DuckStore::open_persistent(&cli.db)
            .with_context(|| format!("opening {}", cli.db.display()))?,
    );
    Ok(Stores {
        records: duck.clone(),
        policy: duck.clone(),
        duck: Some(duck),
    })
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_json_file(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("dialectic v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(cli.config.as_deref())?;

    // Pure commands need neither providers nor stores.
    if let Command::Segment { file, max_words } = &cli.command {
        let text = read_input(file.as_deref())?;
        let max_words = max_words.unwrap_or(config.max_chunk_words);
        return print_json(&chunks(&text, max_words));
    }

    let stores = open_stores(&cli)?;
    let mut analyst = Analyst::new(
        cli.keys.gateway(),
        stores.records.clone(),
        stores.policy.clone(),
        config,
    );
    if let Some(embedder) = cli.keys.embedder() {
        analyst = analyst.with_embedder(embedder);
    }

    match cli.command {
        Command::Analyze {
            module,
            file,
            references,
            reference_files,
            provider,
            skip_gate,
        } => {
            ensure_providers(&analyst)?;
            let text = read_input(file.as_deref())?;
            let mut refs: Vec<ReferenceInput> =
                references.into_iter().map(ReferenceInput::Record).collect();
            for path in &reference_files {
                refs.push(ReferenceInput::Inline {
                    label: path.display().to_string(),
                    text: read_input(Some(path))?,
                });
            }
            if module != ModuleKind::Continuity && !refs.is_empty() {
                tracing::warn!(%module, "references are only used by continuity analysis");
            }

            let mut request = AnalysisRequest::new(module, text)
                .with_references(refs)
                .with_preferred(provider);
            if skip_gate {
                request = request.skip_gate();
            }
            print_json(&analyst.process(request).await?)
        }
        Command::Detect { file } => {
            let text = read_input(file.as_deref())?;
            print_json(&analyst.detect(&text).await)
        }
        Command::Stance { file } => {
            let text = read_input(file.as_deref())?;
            print_json(&analyst.extract_stance(&text).await)
        }
        Command::Align { file } => {
            let text = read_input(file.as_deref())?;
            print_json(&analyst.stance_alignment(&text).await?)
        }
        Command::Doctrine { action } => match action {
            DoctrineAction::Get => print_json(&analyst.doctrine().await?),
            DoctrineAction::Set {
                key,
                value,
                description,
            } => {
                analyst
                    .set_doctrine(&key, &value, description.as_deref())
                    .await?;
                print_json(&analyst.doctrine().await?)
            }
        },
        Command::History { module, limit } => {
            let duck = require_duck(&stores)?;
            let filter = module
                .map(|m| format!("WHERE module_type = '{}'", m.as_str()))
                .unwrap_or_default();
            let batches = duck.query_arrow(&format!(
                "SELECT id, module_type, word_count, processing_time_ms, created_at
                 FROM analysis_records {filter}
                 ORDER BY created_at DESC LIMIT {limit}"
            ))?;
            display::print_table(&batches)
        }
        Command::Show { id } => {
            let record = stores
                .records
                .get_by_id(&id)
                .await?
                .with_context(|| format!("no analysis record with id {id}"))?;
            let batch = records_to_batch(std::slice::from_ref(&record))?;
            display::print_record_card(&batch, 0)
        }
        Command::Segment { .. } => unreachable!("handled before stores are opened"),
    }
}

fn ensure_providers(analyst: &Analyst) -> anyhow::Result<()> {
    if analyst.providers().is_empty() {
        bail!("no completion provider configured; set ANTHROPIC_API_KEY, OPENAI_API_KEY or PERPLEXITY_API_KEY");
    }
    Ok(())
}

fn require_duck(stores: &Stores) -> anyhow::Result<&DuckStore> {
    match &stores.duck {
        Some(duck) => Ok(duck.as_ref()),
        None => bail!("history is not kept in --ephemeral mode"),
    }
}
