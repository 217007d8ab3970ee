mod export;
mod table;

use clap::{Parser, Subcommand, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use report_spec::{
    DocumentBundle, DocumentStore, HeaderSet, MemoryStore, ReportConfig, ResultDocument,
    ResultRecord, StoreGridItems, build_assessment_headers, compose_workflow_headers,
    compose_workflow_result, flatten_result, process_all,
};
use schemars::schema_for;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const OUTPUT_DIR_ENV: &str = "REPORT_OUTPUT_DIR";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Assessment report exporter",
    long_about = "Builds column headers and flattened result rows from assessment, result and workflow documents"
)]
struct Cli {
    /// Optional JSON file with the time zone and validation window.
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaDocument {
    Bundle,
    Config,
    Headers,
    Record,
}

#[derive(Subcommand)]
enum Command {
    /// Print the column headers of an assessment.
    Headers {
        /// Path to the document bundle JSON.
        #[arg(long, value_name = "BUNDLE")]
        bundle: PathBuf,
        #[arg(long, value_name = "ID")]
        assessment: String,
    },
    /// Flatten one result document into a record.
    Flatten {
        /// Path to the document bundle JSON.
        #[arg(long, value_name = "BUNDLE")]
        bundle: PathBuf,
        #[arg(long, value_name = "ID")]
        result: String,
    },
    /// Print the concatenated column headers of a workflow.
    WorkflowHeaders {
        /// Path to the document bundle JSON.
        #[arg(long, value_name = "BUNDLE")]
        bundle: PathBuf,
        #[arg(long, value_name = "ID")]
        workflow: String,
    },
    /// Merge the results of one trip through a workflow into a record.
    WorkflowResult {
        /// Path to the document bundle JSON.
        #[arg(long, value_name = "BUNDLE")]
        bundle: PathBuf,
        #[arg(long, value_name = "ID")]
        workflow: String,
        #[arg(long, value_name = "ID")]
        trip: String,
    },
    /// Flatten every matching result and write headers, records and CSV tables.
    Process {
        /// Path to the document bundle JSON.
        #[arg(long, value_name = "BUNDLE")]
        bundle: PathBuf,
        /// Glob over result ids; repeatable. Defaults to every result.
        #[arg(long = "results", value_name = "GLOB")]
        patterns: Vec<String>,
        /// Output directory (defaults to REPORT_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Replace previously exported headers and records.
        #[arg(long)]
        force: bool,
    },
    /// Render saved headers and records as CSV on stdout.
    Csv {
        /// Header set JSON.
        #[arg(long, value_name = "HEADERS")]
        headers: PathBuf,
        /// Record JSON files.
        #[arg(long = "record", value_name = "RECORD", required = true)]
        records: Vec<PathBuf>,
    },
    /// Print the JSON schema of an input or output document.
    Schema {
        #[arg(value_enum)]
        document: SchemaDocument,
    },
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Command::Headers { bundle, assessment } => run_headers(&bundle, &assessment),
        Command::Flatten { bundle, result } => run_flatten(&bundle, config, &result),
        Command::WorkflowHeaders { bundle, workflow } => run_workflow_headers(&bundle, &workflow),
        Command::WorkflowResult {
            bundle,
            workflow,
            trip,
        } => run_workflow_result(&bundle, config, &workflow, &trip),
        Command::Process {
            bundle,
            patterns,
            out,
            force,
        } => run_process(&bundle, config, &patterns, out, force),
        Command::Csv { headers, records } => run_csv(&headers, &records),
        Command::Schema { document } => run_schema(document),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_store(path: &Path) -> CliResult<MemoryStore> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read bundle {}: {}", path.display(), err))?;
    Ok(MemoryStore::load(&contents)?)
}

fn load_config(path: Option<&Path>) -> CliResult<ReportConfig> {
    let config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
            ReportConfig::from_json(&contents)?
        }
        None => ReportConfig::default(),
    };
    let config = config.with_env_overrides();
    debug!(time_zone = %config.time_zone, "loaded report config");
    Ok(config)
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_headers(bundle: &Path, assessment_id: &str) -> CliResult<()> {
    let store = load_store(bundle)?;
    let grid_items = StoreGridItems::new(&store);
    print_json(&build_assessment_headers(&store, &grid_items, assessment_id)?)
}

fn run_flatten(bundle: &Path, config: Option<&Path>, result_id: &str) -> CliResult<()> {
    let store = load_store(bundle)?;
    let config = load_config(config)?;
    let document = store.result_document(result_id)?;
    let processed = flatten_result(&document, &config.validator(), &config);
    print_json(&ResultRecord::from_processed(processed, &config.time_zone))
}

fn run_workflow_headers(bundle: &Path, workflow_id: &str) -> CliResult<()> {
    let store = load_store(bundle)?;
    let grid_items = StoreGridItems::new(&store);
    print_json(&compose_workflow_headers(&store, &grid_items, workflow_id)?)
}

fn run_workflow_result(
    bundle: &Path,
    config: Option<&Path>,
    workflow_id: &str,
    trip_id: &str,
) -> CliResult<()> {
    let store = load_store(bundle)?;
    let config = load_config(config)?;
    let processed =
        compose_workflow_result(&store, &config.validator(), &config, workflow_id, trip_id)?;
    print_json(&ResultRecord::from_processed(processed, &config.time_zone))
}

fn run_process(
    bundle: &Path,
    config: Option<&Path>,
    patterns: &[String],
    out: Option<PathBuf>,
    force: bool,
) -> CliResult<()> {
    let mut store = load_store(bundle)?;
    let config = load_config(config)?;
    let matcher = build_matcher(patterns)?;
    let out_root = resolve_output_root(out)?;

    let previous = export::previous_export(&out_root)?;
    if !previous.is_empty() {
        if !force {
            return Err(format!(
                "export in {} already exists; rerun with --force to overwrite",
                out_root.display()
            )
            .into());
        }
        export::remove_export(&previous)?;
    }

    let selected = |result: &ResultDocument| {
        matcher
            .as_ref()
            .is_none_or(|matcher| matcher.is_match(&result.id))
    };
    let summary = process_all(&mut store, &config.validator(), &config, &selected)?;
    let written = export::write_export(&out_root, store.header_sets(), store.result_records())?;
    info!(
        out = %out_root.display(),
        csv_files = written.csv_files.len(),
        "export written"
    );
    print_json(&summary)
}

/// `None` selects every result.
fn build_matcher(patterns: &[String]) -> CliResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os(OUTPUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(candidate)
}

fn run_csv(headers_path: &Path, record_paths: &[PathBuf]) -> CliResult<()> {
    let headers: HeaderSet = serde_json::from_str(&fs::read_to_string(headers_path)?)?;
    let mut records = Vec::with_capacity(record_paths.len());
    for path in record_paths {
        let record: ResultRecord = serde_json::from_str(&fs::read_to_string(path)?)?;
        records.push(record);
    }
    let rows = records.iter().collect::<Vec<_>>();
    print!("{}", table::render_csv(&headers, &rows));
    Ok(())
}

fn run_schema(document: SchemaDocument) -> CliResult<()> {
    let schema = match document {
        SchemaDocument::Bundle => schema_for!(DocumentBundle),
        SchemaDocument::Config => schema_for!(ReportConfig),
        SchemaDocument::Headers => schema_for!(HeaderSet),
        SchemaDocument::Record => schema_for!(ResultRecord),
    };
    print_json(&schema)
}
