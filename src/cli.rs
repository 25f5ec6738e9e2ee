use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::bio::taxonomy::ReferenceTable;
use crate::config::Stage1Config;
use crate::io::find_screen_files;
use crate::pipeline::{generate_report, Stage1Processor};
use crate::utils::parallel::{parallel_process, ParallelConfig};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Stage 1 capsular serotype calling from Mash screen output",
    long_about = None
)]
pub struct Cli {
    /// Reference serotype table (CSV: serotype_hit,predicted_pheno,group_id,group_name)
    #[arg(short, long)]
    pub reference: PathBuf,

    /// JSON config with filter thresholds and retry policy
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Minimum percent containment for a top hit (overrides config)
    #[arg(long)]
    pub minpercent: Option<f64>,

    /// Minimum median multiplicity for a top hit (overrides config)
    #[arg(long)]
    pub minmulti: Option<u32>,

    /// Also write <sample>_stage1.json next to the hit CSV
    #[arg(long)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a single Mash screen TSV
    Classify {
        /// Path to the Mash screen output
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Classify every Mash screen TSV in a directory
    ClassifyDir {
        /// Directory containing *.tsv Mash screen files
        #[arg(short, long)]
        dir: PathBuf,

        /// Path to the output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of samples to classify concurrently
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
    },
}

fn load_config(cli: &Cli) -> Result<Stage1Config> {
    let config = match &cli.config {
        Some(path) => Stage1Config::from_json_file(path)?,
        None => Stage1Config::default(),
    };
    config.with_overrides(cli.minpercent, cli.minmulti)
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    info!("Using configuration: {:?}", config);

    let reference = ReferenceTable::from_path(&cli.reference)
        .with_context(|| format!("failed to load reference table {}", cli.reference.display()))?;
    info!(
        "Loaded {} reference serotypes in {} groups",
        reference.len(),
        reference.group_count()
    );

    let processor = Stage1Processor::new(config, &reference).with_json(cli.json);

    match cli.command {
        Commands::Classify { input, output } => {
            let report = processor.process_file(&input, &output)?;
            println!("{}", generate_report(&report));
        }

        Commands::ClassifyDir {
            dir,
            output,
            threads,
        } => {
            let files = find_screen_files(&dir)
                .with_context(|| format!("failed to read directory {}", dir.display()))?;
            println!("Found {} Mash screen files to classify", files.len());

            let results = parallel_process(
                &files,
                |path| processor.process_file(path, &output),
                Some(ParallelConfig { threads }),
            )?;

            let mut failed = 0;
            for (path, result) in files.iter().zip(results) {
                match result {
                    Ok(report) => println!("{}", generate_report(&report)),
                    Err(e) => {
                        failed += 1;
                        eprintln!("ERROR: {}: {}", path.display(), e);
                    }
                }
            }

            println!("Classified {} of {} samples", files.len() - failed, files.len());
            if failed > 0 {
                bail!("{} sample(s) failed stage 1", failed);
            }
        }
    }

    Ok(())
}
