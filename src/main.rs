use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use brt_pipeline::config::Config;
use brt_pipeline::logging;
use brt_pipeline::observability;
use brt_pipeline::pipeline::parser::BrtFileKind;
use brt_pipeline::BrtProcessor;

#[derive(Parser)]
#[command(name = "brt_pipeline")]
#[command(about = "Decode and normalize BRT property assessment exports")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (falls back to $BRT_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print a Prometheus snapshot of pipeline metrics on exit
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a code file and list the dictionary
    Codes {
        #[arg(long)]
        code_file: PathBuf,
        /// Only list one category key (e.g. 53 or VCS)
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Run the code file, data file and dictionary checks
    Check {
        #[arg(long)]
        data_file: PathBuf,
        #[arg(long)]
        code_file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Check, then normalize every data row to JSON lines
    Normalize {
        #[arg(long)]
        data_file: PathBuf,
        #[arg(long)]
        code_file: PathBuf,
        /// Write JSON lines here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Tax year for composite keys
        #[arg(long, requires = "ccdd")]
        year: Option<i32>,
        /// Municipality code for composite keys
        #[arg(long, requires = "year")]
        ccdd: Option<String>,
    },
    /// Report whether a file looks like a BRT data file or code file
    Detect {
        file: PathBuf,
    },
}

async fn read_file(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn print_codes(processor: &BrtProcessor, category: Option<&str>, json: bool) -> anyhow::Result<()> {
    let table = processor.table();
    let categories: Vec<&str> = match category {
        Some(c) => vec![c],
        None => table.categories(),
    };

    if json {
        let listing: serde_json::Map<String, serde_json::Value> = categories
            .iter()
            .map(|c| -> anyhow::Result<(String, serde_json::Value)> {
                Ok((c.to_string(), serde_json::to_value(table.entries(c))?))
            })
            .collect::<anyhow::Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for c in categories {
        let name = brt_pipeline::constants::category_name(c).unwrap_or(c);
        println!("{} ({}): {} codes", c, name, table.category_len(c));
        for entry in table.entries(c) {
            println!("   {:<8} {}", entry.code, entry.description);
        }
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let mut processor = BrtProcessor::with_config(config.processor.clone());

    match cli.command {
        Commands::Codes { code_file, category, json } => {
            let content = read_file(&code_file).await?;
            let summary = processor.process_code_file(&content)?;
            if !json {
                println!(
                    "Loaded {} codes across {} categories (sha256 {})",
                    summary.codes_extracted, summary.categories_found, summary.fingerprint
                );
                if !summary.missing_categories.is_empty() {
                    println!("Missing categories: {}", summary.missing_categories.join(", "));
                }
            }
            print_codes(&processor, category.as_deref(), json)?;
        }
        Commands::Check { data_file, code_file, json } => {
            let data = read_file(&data_file).await?;
            let codes = read_file(&code_file).await?;
            let report = processor.process_brt_files(&data, &codes);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.success {
                if let Some(data) = &report.data_file {
                    println!(
                        "OK: {} records, {} columns, {} skipped rows",
                        data.total_records, data.column_count, data.skipped_rows
                    );
                }
                if let Some(validation) = &report.validation {
                    println!(
                        "Dictionary: {} codes across {} categories",
                        validation.total_codes, validation.categories_found
                    );
                }
            }

            if !report.success {
                bail!(
                    "BRT check failed at {:?}: {}",
                    report.failed_stage,
                    report.error.unwrap_or_default()
                );
            }
        }
        Commands::Normalize { data_file, code_file, output, year, ccdd } => {
            let data = read_file(&data_file).await?;
            let codes = read_file(&code_file).await?;

            let report = processor.process_brt_files(&data, &codes);
            if !report.success {
                bail!(
                    "BRT check failed at {:?}: {}",
                    report.failed_stage,
                    report.error.unwrap_or_default()
                );
            }

            let records = processor.normalize_all(&data)?;
            let mut lines = Vec::with_capacity(records.len());
            for record in &records {
                let mut value = serde_json::to_value(record)?;
                if let (Some(year), Some(ccdd), Some(obj)) = (year, ccdd.as_deref(), value.as_object_mut()) {
                    obj.insert(
                        "composite_key".to_string(),
                        serde_json::Value::String(record.composite_key(year, ccdd)),
                    );
                }
                lines.push(serde_json::to_string(&value)?);
            }

            match output {
                Some(path) => {
                    let mut body = lines.join("\n");
                    body.push('\n');
                    tokio::fs::write(&path, body)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} normalized records to {}", records.len(), path.display());
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut handle = stdout.lock();
                    for line in &lines {
                        writeln!(handle, "{}", line)?;
                    }
                }
            }
        }
        Commands::Detect { file } => {
            let content = read_file(&file).await?;
            let kind = processor.detect_file_type(&content);
            match kind {
                BrtFileKind::DataFile => println!("{}: BRT data file", file.display()),
                BrtFileKind::CodeFile => println!("{}: BRT code file", file.display()),
                BrtFileKind::Unknown => {
                    warn!("Unrecognized file: {}", file.display());
                    println!("{}: unknown", file.display());
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging.log_dir);

    let print_metrics = cli.print_metrics;
    if print_metrics {
        if let Err(e) = observability::init() {
            warn!("Failed to install metrics recorder: {}", e);
        }
    }

    let result = run(cli, config).await;
    if let Err(e) = &result {
        error!("{:#}", e);
    }

    if print_metrics {
        if let Some(snapshot) = observability::render() {
            eprintln!("{}", snapshot);
        }
    }
    result
}
