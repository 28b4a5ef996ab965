use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;
use std::path::{Path, PathBuf};

use meros::PoolScheduler;
use meros_bio::ReadPartitioner;
use meros_core::{Algorithm, ReadInputs, ReadPartition};
use meros_tools::StagePlan;

use super::effective_config;
use crate::cli::output::*;
use crate::cli::GlobalOptions;

#[derive(Args, Debug)]
pub struct PartitionArgs {
    /// FASTQ file with the reads (mate 1 when paired)
    #[arg(value_name = "READS1")]
    pub reads1: PathBuf,

    /// FASTQ file with mate 2
    #[arg(value_name = "READS2")]
    pub reads2: Option<PathBuf>,

    /// Number of partitions (0 = one per worker)
    #[arg(short, long)]
    pub partitions: Option<usize>,

    /// Algorithm whose stages are listed per partition
    #[arg(short, long)]
    pub algorithm: Option<Algorithm>,

    /// Skip comparing mate names at partition boundaries
    #[arg(long)]
    pub no_mate_check: bool,

    /// Print the partitions as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PartitionReport {
    requested: usize,
    algorithm: Algorithm,
    total_records: u64,
    partitions: Vec<PlannedPartition>,
}

#[derive(Debug, Serialize)]
struct PlannedPartition {
    #[serde(flatten)]
    partition: ReadPartition,
    stages: Vec<String>,
}

pub fn run(args: PartitionArgs, global: &GlobalOptions) -> Result<()> {
    let config = effective_config(global)?;
    let algorithm = args.algorithm.unwrap_or(config.aligner.algorithm);
    let requested = match args.partitions.unwrap_or(config.job.partitions) {
        0 => PoolScheduler::new(config.runtime.workers).workers(),
        n => n,
    };

    let inputs = match &args.reads2 {
        Some(reads2) => ReadInputs::paired(&args.reads1, reads2),
        None => ReadInputs::single(&args.reads1),
    };
    let partitions = ReadPartitioner::new(requested)
        .with_mate_check(!args.no_mate_check)
        .partition(&inputs)?;

    let report = PartitionReport {
        requested,
        algorithm,
        total_records: partitions.iter().map(ReadPartition::record_count).sum(),
        partitions: partitions
            .into_iter()
            .map(|partition| PlannedPartition {
                stages: stage_names(algorithm, &partition),
                partition,
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

fn stage_names(algorithm: Algorithm, partition: &ReadPartition) -> Vec<String> {
    let read2 = partition.read2.as_ref().map(|r| r.path.as_path());
    StagePlan::build(
        algorithm,
        partition.ordinal,
        &partition.read1.path,
        read2,
        Path::new("out.sam"),
    )
    .stages
    .iter()
    .map(|s| s.stage.to_string())
    .collect()
}

fn print_table(report: &PartitionReport) {
    section_header("Partitions");

    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("Partition"),
        header_cell("Records"),
        header_cell("First record"),
        header_cell("Mate 1"),
        header_cell("Mate 2"),
        header_cell("Stages"),
    ]);
    for planned in &report.partitions {
        let p = &planned.partition;
        table.add_row(vec![
            Cell::new(p.ordinal),
            Cell::new(format_number(p.record_count())),
            Cell::new(format_number(p.read1.first_record)),
            Cell::new(format_bytes(p.read1.byte_len())),
            Cell::new(
                p.read2
                    .as_ref()
                    .map(|r| format_bytes(r.byte_len()))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(planned.stages.join(", ")),
        ]);
    }
    println!("{}", table);

    field("Records", &format_number(report.total_records));
    if report.partitions.len() < report.requested {
        info(&format!(
            "{} partition(s) requested, only {} record(s) available",
            report.requested, report.total_records
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meros_test::{write_paired_fastq, TestEnvironment};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_names_follow_algorithm() {
        let env = TestEnvironment::new().unwrap();
        let (r1, r2) = write_paired_fastq(&env.input_dir(), 6, 30).unwrap();
        let partition = ReadPartitioner::new(1)
            .partition(&ReadInputs::paired(r1, r2))
            .unwrap()
            .remove(0);

        assert_eq!(
            stage_names(Algorithm::Aln, &partition),
            vec!["index-read1 (0)", "index-read2 (1)", "merge (2)"]
        );
        assert_eq!(stage_names(Algorithm::Mem, &partition), vec!["single (0)"]);
    }
}
