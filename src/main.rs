//! SDE subset builder
//!
//! Builds the minified blueprint, type and name index files an offline
//! manufacturing calculator loads instead of querying the full SDE.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use sde_subset::{FilterPolicy, Mode, ReferenceSource, build_subset, write_artifacts};

#[derive(Parser)]
#[command(name = "sde-subset")]
#[command(about = "Build minimal offline SDE subsets from EVE Ref reference data")]
#[command(group(ArgGroup::new("input").required(true).args(["refdata", "tar"])))]
struct Cli {
    /// Path to an extracted reference-data directory
    #[arg(long)]
    refdata: Option<PathBuf>,

    /// Path to a reference-data tarball (.tar, .tar.gz or .tar.xz)
    #[arg(long)]
    tar: Option<PathBuf>,

    /// Output directory for the generated files
    #[arg(long)]
    outdir: PathBuf,

    /// Filtering mode
    #[arg(long, value_enum, default_value_t = Mode::T1)]
    mode: Mode,

    /// Product category allowed in t1 mode (repeatable; default 7, 8, 18)
    #[arg(long = "category", value_name = "ID")]
    categories: Vec<i64>,

    /// Meta group required in t1 mode
    #[arg(long, value_name = "ID")]
    meta_group: Option<i64>,

    /// Log skipped blueprints
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn policy(&self) -> FilterPolicy {
        let mut policy = FilterPolicy::for_mode(self.mode);
        if !self.categories.is_empty() {
            policy = policy.with_categories(self.categories.iter().copied());
        }
        if let Some(meta_group) = self.meta_group {
            policy = policy.with_meta_group(meta_group);
        }
        policy
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sde_subset=debug" } else { "sde_subset=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let source = ReferenceSource::from_options(cli.refdata.clone(), cli.tar.clone())?;
    let data = source
        .load()
        .with_context(|| format!("Failed to load reference data from {}", source.path().display()))?;

    let policy = cli.policy();
    let subset = build_subset(&data, &policy);

    let written = write_artifacts(&cli.outdir, &subset, cli.mode, &data.meta, Utc::now())
        .with_context(|| format!("Failed to write artifacts to {}", cli.outdir.display()))?;

    for path in &written {
        println!("  {}", path.display());
    }
    println!("\n{}", subset.stats);

    Ok(())
}
