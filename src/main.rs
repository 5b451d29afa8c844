use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use plasmid_cov::align::{AlignOpt, ScanWindow};
use plasmid_cov::coverage::ConfidenceOpt;
use plasmid_cov::pipeline::{self, RunOptions};
use plasmid_cov::report::ReportConfig;

#[derive(Parser, Debug)]
#[command(name = "plasmid-cov", author, version, about = "Per-base read coverage for plasmid contigs", arg_required_else_help = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute coverage for the contigs of one sample
    Coverage {
        /// Reference FASTA (contigs)
        #[arg(long)]
        fasta: PathBuf,
        /// Reads FASTQ (.fastq or .fastq.gz)
        #[arg(long)]
        fastq: PathBuf,
        /// Sample name used in output file names
        #[arg(long)]
        sample: String,
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
        /// Only process these contigs (all contigs if omitted)
        #[arg(long = "contig")]
        contigs: Vec<String>,
        #[command(flatten)]
        opts: EngineArgs,
    },
    /// Process every {sample}.final.fasta / {sample}.final.fastq pair in a directory
    Batch {
        /// Directory with .final.fasta and .final.fastq files
        #[arg(short = 'd', long = "data-dir")]
        data_dir: PathBuf,
        /// Output base directory
        #[arg(short, long)]
        out: PathBuf,
        /// Sample names to process (default: all samples found)
        #[arg(long, num_args = 1..)]
        samples: Option<Vec<String>>,
        #[command(flatten)]
        opts: EngineArgs,
    },
}

#[derive(Args, Debug)]
struct EngineArgs {
    #[arg(long = "min-match", default_value_t = 20)]
    min_match: usize,
    #[arg(long = "identity", default_value_t = 0.70)]
    identity: f64,
    /// Scan the whole reference instead of the tail window
    #[arg(long = "full-scan")]
    full_scan: bool,
    /// Extra bases before the tail window
    #[arg(long = "flank", default_value_t = 100)]
    flank: usize,
    #[arg(long = "min-depth", default_value_t = 3)]
    min_depth: u32,
    #[arg(long = "min-vaf", default_value_t = 0.8)]
    min_vaf: f64,
    #[arg(long = "low-conf-limit", default_value_t = 100)]
    low_conf_limit: usize,
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,
}

impl EngineArgs {
    fn to_options(&self) -> RunOptions {
        let window = if self.full_scan {
            ScanWindow::Full
        } else {
            ScanWindow::Tail { flank: self.flank }
        };
        RunOptions {
            align: AlignOpt {
                min_match_length: self.min_match,
                identity_threshold: self.identity,
                window,
            },
            report: ReportConfig {
                confidence: ConfidenceOpt {
                    min_depth: self.min_depth,
                    min_vaf: self.min_vaf,
                },
                low_confidence_limit: self.low_conf_limit,
                ..ReportConfig::default()
            },
            threads: self.threads,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("plasmid_cov=debug,info")
    } else {
        EnvFilter::new("plasmid_cov=info,warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    info!("run started at {}", chrono::Local::now().to_rfc3339());

    match cli.command {
        Commands::Coverage { fasta, fastq, sample, out, contigs, opts } => {
            let opt = opts.to_options();
            debug!("options: {:?}", opt);
            let selected = if contigs.is_empty() { None } else { Some(contigs.as_slice()) };
            let report = pipeline::run_sample(&fasta, &fastq, &sample, selected, &out, &opt)?;
            for c in &report.contigs {
                info!(
                    "{}: {} bp, {}/{} reads mapped, avg {:.1}x, max {}x",
                    c.contig, c.length, c.mapped_reads, c.total_reads, c.avg_coverage, c.max_coverage
                );
            }
            if !report.failed_contigs.is_empty() {
                bail!("{} contig(s) failed in sample {}", report.failed_contigs.len(), sample);
            }
        }
        Commands::Batch { data_dir, out, samples, opts } => {
            let opt = opts.to_options();
            debug!("options: {:?}", opt);
            let summary = pipeline::run_batch(&data_dir, samples, &out, &opt)?;
            if !summary.failed.is_empty() {
                bail!("{} sample(s) failed: {}", summary.failed.len(), summary.failed.join(", "));
            }
        }
    }

    Ok(())
}
