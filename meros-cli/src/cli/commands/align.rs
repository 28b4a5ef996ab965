use anyhow::Result;
use clap::Args;
use colored::*;
use comfy_table::Cell;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use meros::{Orchestrator, ProgressCallback, RunReport, UnitOutcome};
use meros_core::{Algorithm, Config, ReadInputs};

use super::effective_config;
use crate::cli::output::*;
use crate::cli::signal;
use crate::cli::GlobalOptions;

#[derive(Args, Debug)]
pub struct AlignArgs {
    /// FASTQ file with the reads (mate 1 when paired)
    #[arg(value_name = "READS1")]
    pub reads1: PathBuf,

    /// FASTQ file with mate 2; enables paired alignment
    #[arg(value_name = "READS2")]
    pub reads2: Option<PathBuf>,

    /// BWA index prefix of the reference
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Shared directory receiving one SAM file per partition
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Alignment algorithm: mem, aln or bwasw
    #[arg(short, long)]
    pub algorithm: Option<Algorithm>,

    /// Number of partitions (0 = one per worker)
    #[arg(short, long)]
    pub partitions: Option<usize>,

    /// Application name used in output file names
    #[arg(long)]
    pub app_name: Option<String>,

    /// Application id used in output file names (generated when absent)
    #[arg(long)]
    pub app_id: Option<String>,

    /// Path to the bwa binary
    #[arg(long, value_name = "PATH")]
    pub bwa: Option<PathBuf>,

    /// Threads per bwa invocation
    #[arg(short = 't', long)]
    pub aligner_threads: Option<usize>,

    /// Extra argument for the primary bwa subcommand (repeatable)
    #[arg(long = "bwa-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub bwa_args: Vec<String>,

    /// Local scratch directory for partition files
    #[arg(long)]
    pub tmp_dir: Option<String>,

    /// Attempts per partition before the run fails
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Skip comparing mate names at partition boundaries
    #[arg(long)]
    pub no_mate_check: bool,
}

impl AlignArgs {
    pub fn inputs(&self) -> ReadInputs {
        match &self.reads2 {
            Some(reads2) => ReadInputs::paired(&self.reads1, reads2),
            None => ReadInputs::single(&self.reads1),
        }
    }

    /// Layer the command-line settings over `config`
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(reference) = &self.reference {
            config.aligner.reference = Some(reference.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.job.output_dir = Some(dir.clone());
        }
        if let Some(algorithm) = self.algorithm {
            config.aligner.algorithm = algorithm;
        }
        if let Some(partitions) = self.partitions {
            config.job.partitions = partitions;
        }
        if let Some(name) = &self.app_name {
            config.job.app_name = name.clone();
        }
        if let Some(id) = &self.app_id {
            config.job.app_id = Some(id.clone());
        }
        if let Some(bwa) = &self.bwa {
            config.aligner.binary = bwa.clone();
        }
        if let Some(threads) = self.aligner_threads {
            config.aligner.threads = threads;
        }
        if !self.bwa_args.is_empty() {
            config.aligner.extra_args = self.bwa_args.clone();
        }
        if let Some(dir) = &self.tmp_dir {
            config.runtime.local_dir = Some(dir.clone());
        }
        if let Some(attempts) = self.max_attempts {
            config.runtime.max_attempts = attempts;
        }
    }
}

pub fn run(args: AlignArgs, global: &GlobalOptions) -> Result<()> {
    let mut config = effective_config(global)?;
    args.apply_to(&mut config);
    let inputs = args.inputs();

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed_precise}] {pos} partition(s) finished {msg}")?,
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    let bar = progress.clone();
    let callback: ProgressCallback = Arc::new(move |outcome: &UnitOutcome| {
        if let Err(e) = &outcome.result {
            bar.println(format!("{} {}", "✗".red(), e));
        }
        bar.inc(1);
    });

    let orchestrator = Orchestrator::from_config(&config, inputs.is_paired(), Some(callback))?
        .with_mate_check(!args.no_mate_check);
    signal::cancel_on_interrupt(orchestrator.cancellation_token())?;
    let ctx = orchestrator.context();
    progress.set_message(format!("({}-{}, {})", ctx.app_name(), ctx.app_id(), ctx.algorithm));

    let result = orchestrator.run(&inputs);
    progress.finish_and_clear();
    let report = result?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    section_header("Alignment Summary");

    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Partition"),
        header_cell("Records"),
        header_cell("Input"),
        header_cell("Attempts"),
        header_cell("Elapsed"),
        header_cell("Output"),
    ]);
    for (partition, result) in report.partitions.iter().zip(&report.results) {
        let output = result
            .published_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(partition.ordinal),
            Cell::new(format_number(partition.record_count())),
            Cell::new(format_bytes(partition.byte_len())),
            Cell::new(result.attempts),
            Cell::new(format_elapsed(result.elapsed)),
            Cell::new(output),
        ]);
    }
    println!("{}", table);

    let ctx = &report.context;
    field("Run", &format!("{}-{}", ctx.app_name(), ctx.app_id()));
    field("Algorithm", ctx.algorithm.name());
    field("Records", &format_number(report.total_records()));
    field("Published", &format_bytes(report.published_bytes));
    field("Elapsed", &format_elapsed(report.elapsed));
    if report.retries() > 0 {
        warning(&format!("{} attempt(s) were retried", report.retries()));
    }
    success(&format!(
        "Published {} SAM file(s) to {}",
        report.results.len(),
        ctx.output_dir.display()
    ));
}
