//! monox command-line interface

use clap::{Parser, Subcommand};
use monox_core::{AnalysisConfig, DataMcPipeline, ShapeSummary, TransferReport};
use monox_io::HistogramDocument;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "monox")]
#[command(about = "Data/MC plots, transfer ratios and shape summaries for mono-X searches")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an analysis configuration
    Check {
        /// Analysis configuration (TOML or JSON)
        config: PathBuf,
    },

    /// Fill the data/MC plots of a region
    Plot {
        /// Analysis configuration (TOML or JSON)
        config: PathBuf,

        /// Directory receiving report.json and one document per variable
        #[arg(short, long, default_value = "plots")]
        output: PathBuf,
    },

    /// Compute configured transfer ratios
    Ratio {
        /// Analysis configuration (TOML or JSON)
        config: PathBuf,

        /// Only compute this transfer
        #[arg(short, long)]
        transfer: Option<String>,

        /// Output file for results (pretty JSON). Defaults to a table on stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize the shape variations stored in a histogram document
    Shapes {
        /// Histogram document (JSON)
        document: PathBuf,

        /// Processes to scan, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        processes: Vec<String>,

        /// Output file for results (pretty JSON). Defaults to a table on stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_string().to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Check { config } => cmd_check(&config),
        Commands::Plot { config, output } => cmd_plot(&config, &output),
        Commands::Ratio {
            config,
            transfer,
            output,
        } => cmd_ratio(&config, transfer.as_deref(), output.as_deref()),
        Commands::Shapes {
            document,
            processes,
            output,
        } => cmd_shapes(&document, &processes, output.as_deref()),
    }
}

fn cmd_check(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalysisConfig::load(path)?;
    println!(
        "{}: {} samples, {} variables, {} transfers",
        config.region,
        config.samples.len(),
        config.variables.len(),
        config.transfers.len()
    );
    Ok(())
}

fn cmd_plot(path: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalysisConfig::load(path)?;
    let report = DataMcPipeline::new(&config)?.run()?;

    fs::create_dir_all(output)?;
    fs::write(output.join("report.json"), report.to_json()?)?;
    for plot in &report.plots {
        plot.to_document()
            .save(output.join(format!("{}.json", plot.variable)))?;
    }
    tracing::info!(
        region = %report.region,
        plots = report.plots.len(),
        output = %output.display(),
        "wrote data/MC plots"
    );

    println!("Yields for {} ({:.1} /pb)", report.region, report.luminosity);
    print!("{}", report.yields);
    Ok(())
}

fn cmd_ratio(
    path: &Path,
    transfer: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalysisConfig::load(path)?;
    let pipeline = DataMcPipeline::new(&config)?;
    let reports = match transfer {
        Some(name) => vec![pipeline.transfer(name)?],
        None => pipeline.transfers()?,
    };

    match output {
        Some(out) => fs::write(out, serde_json::to_string_pretty(&reports)?)?,
        None => reports.iter().for_each(print_transfer),
    }
    Ok(())
}

fn print_transfer(report: &TransferReport) {
    println!("{}", report.name);
    println!(
        "{:>4} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "bin", "mc", "stat", "syst", "data", "stat"
    );
    for i in 0..report.mc.n_bins() {
        println!(
            "{:>4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            i,
            report.mc.content(i),
            report.mc.stat_error(i),
            report.mc.syst_error(i),
            report.data.content(i),
            report.data.stat_error(i)
        );
    }
}

fn cmd_shapes(
    path: &Path,
    processes: &[String],
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = HistogramDocument::load(path)?;
    let summary = ShapeSummary::from_document(&doc, processes)?;
    match output {
        Some(out) => fs::write(out, summary.to_json()?)?,
        None => print!("{}", summary),
    }
    Ok(())
}
