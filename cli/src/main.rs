use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use gloss_neighbors::embedding::openai::OpenAiEmbeddingClient;
use gloss_neighbors::store::open_store;
use gloss_neighbors::{annotate_dataset, describe_dataset, NeighborsConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "gloss-neighbors.toml";

/// Annotate vocabulary entries with their most similar distinct neighbors.
#[derive(Debug, Parser)]
#[clap(author, name = "gloss-neighbors", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML config file.
    #[arg(long = "config", short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Similarity matrix cache (overrides `matrix.cache`).
    #[arg(long = "matrix-cache", value_name = "FILE", global = true)]
    matrix_cache: Option<PathBuf>,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Write each entry's nearest distinct neighbors back into the dataset.
    Annotate(AnnotateCommand),

    /// Print the closest and farthest entries for one entry.
    Describe(DescribeCommand),
}

#[derive(Debug, Parser)]
struct AnnotateCommand {
    /// Dataset file (`.json` array or `.jsonl`).
    #[arg(value_name = "DATASET")]
    dataset: PathBuf,

    /// Neighbors per entry (overrides `k`).
    #[arg(short = 'k', long = "neighbors", value_name = "N")]
    k: Option<usize>,

    /// Record field receiving the neighbor list (overrides `output-field`).
    #[arg(long = "output-field", value_name = "NAME")]
    output_field: Option<String>,
}

#[derive(Debug, Parser)]
struct DescribeCommand {
    /// Dataset file (`.json` array or `.jsonl`).
    #[arg(value_name = "DATASET")]
    dataset: PathBuf,

    /// Entry index to inspect.
    #[arg(long = "index", short = 'i', value_name = "N")]
    index: usize,

    /// Closest entries listed.
    #[arg(long = "count", short = 'n', value_name = "M", default_value_t = 10)]
    count: usize,

    /// Farthest entries listed.
    #[arg(long = "farthest", value_name = "M", default_value_t = 3)]
    farthest: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(cache) = cli.matrix_cache {
        config.matrix.cache = Some(cache);
    }

    match cli.subcommand {
        Subcommand::Annotate(cmd) => {
            if let Some(k) = cmd.k {
                config.k = k;
            }
            if let Some(field) = cmd.output_field {
                config.output_field = field;
            }
            config.validate()?;
            debug!(?config, "effective config");
            let store = open_store(&cmd.dataset);
            let provider = OpenAiEmbeddingClient::from_config(&config.embedding);
            let summary = annotate_dataset(store.as_ref(), &provider, &config)?;
            println!(
                "annotated {} entries in {}: {} neighbors written, {} with fewer than {}",
                summary.entries,
                cmd.dataset.display(),
                summary.neighbors_written,
                summary.short_lists,
                config.k,
            );
            if summary.non_finite_rows > 0 {
                println!("{} rows had non-finite similarity scores", summary.non_finite_rows);
            }
        }
        Subcommand::Describe(cmd) => {
            config.validate()?;
            debug!(?config, "effective config");
            let store = open_store(&cmd.dataset);
            let provider = OpenAiEmbeddingClient::from_config(&config.embedding);
            let report = describe_dataset(store.as_ref(), &provider, &config, cmd.index, cmd.count, cmd.farthest)?;
            print!("{report}");
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<NeighborsConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            Ok(NeighborsConfig::load(path)?)
        }
        None => Ok(NeighborsConfig::load(Path::new(DEFAULT_CONFIG))?),
    }
}
