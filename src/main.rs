//! Command-line host: seeds an in-memory catalog from a JSON document, runs
//! one pivot generation against it and prints the resulting rows.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pivot_view::{Db, DbCommon, PivotConfig, PivotGenerator, PivotRequest, SeedFile};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pivot-view")]
#[command(about = "Build a pivot view (and optionally a typed table) over a long-format relation", long_about = None)]
struct Args {
    /// JSON document with the relations to load.
    #[arg(long)]
    seed: PathBuf,
    /// Relation to pivot.
    #[arg(long)]
    source: String,
    /// Column averaged into each cell.
    #[arg(long)]
    value: String,
    /// Column whose values become columns.
    #[arg(long)]
    category: String,
    /// Column whose values become rows.
    #[arg(long)]
    axis: String,
    /// Also snapshot the view into a table.
    #[arg(long, default_value_t = false)]
    materialize: bool,
    /// JSON configuration file (prefix, suffix, log table).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print every executed statement before the rows.
    #[arg(long, default_value_t = false)]
    show_sql: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading config {}", path.display()))?;
            PivotConfig::from_json_str(&text)?
        }
        None => PivotConfig::default(),
    };

    let seed_text = tokio::fs::read_to_string(&args.seed)
        .await
        .with_context(|| format!("reading seed {}", args.seed.display()))?;
    let seed = SeedFile::from_json_str(&seed_text)?;

    let db = Db::new_db_with_config(&config)?;
    db.load_seed(seed).context("loading seed relations")?;

    let request = PivotRequest::new(&args.source, &args.value, &args.category, &args.axis)
        .materialized(args.materialize);
    let outcome = PivotGenerator::new(&db, &config)
        .generate(&request)
        .with_context(|| format!("pivoting {}", args.source))?;

    if args.show_sql {
        for statement in &outcome.statements {
            println!("{statement}\n");
        }
    }

    let view_rows = db.rows_of(&outcome.view_name)?;
    let table_rows = match &outcome.table_name {
        Some(table) => Some(db.rows_of(table)?),
        None => None,
    };

    let report = json!({
        "view": outcome.view_name,
        "table": outcome.table_name,
        "categories": outcome.categories,
        "view_rows": view_rows,
        "table_rows": table_rows,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
