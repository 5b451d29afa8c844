//! 按 contig / 样本 / 批次驱动覆盖度计算。
//!
//! 每个 contig 独立计算并写出结果；单个 contig 或样本失败只记录日志，
//! 不影响其他 contig 和样本。

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::align::AlignOpt;
use crate::coverage::compute_coverage;
use crate::error::{CovError, Result};
use crate::io::fasta::{load_fasta, ReferenceSet};
use crate::io::fastq::open_fastq;
use crate::report::{self, CoverageReporter, ReportConfig};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub align: AlignOpt,
    pub report: ReportConfig,
    /// 并行处理 contig 的线程数
    pub threads: usize,
}

#[derive(Clone, Debug)]
pub struct ContigReport {
    pub sample: String,
    pub contig: String,
    pub length: usize,
    pub mapped_reads: u64,
    pub total_reads: u64,
    pub avg_coverage: f64,
    pub max_coverage: u32,
    pub per_base_path: PathBuf,
    pub low_confidence_path: PathBuf,
    /// 绘图失败时为 None
    pub plot_path: Option<PathBuf>,
    pub stream_error: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct SampleReport {
    pub sample: String,
    pub contigs: Vec<ContigReport>,
    /// (contig, 错误信息)
    pub failed_contigs: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: Vec<String>,
}

/// 计算一个 contig 的覆盖度并写出两张表与覆盖度图。
///
/// contig 不在 `references` 中时返回 `ContigNotFound`，不写任何文件。
pub fn run_contig(
    references: &ReferenceSet,
    fasta_path: &Path,
    fastq_path: &Path,
    sample: &str,
    contig: &str,
    out_dir: &Path,
    reporter: &CoverageReporter,
    align_opt: &AlignOpt,
) -> Result<ContigReport> {
    let reference = references.get(contig).ok_or_else(|| CovError::ContigNotFound {
        contig: contig.to_string(),
        path: fasta_path.display().to_string(),
    })?;
    debug!("computing coverage for {} ({} bp) from {}", contig, reference.len(), fasta_path.display());

    let reads = open_fastq(fastq_path)?.records();
    let run = compute_coverage(&reference.seq, reads, align_opt);
    info!(
        "sample {}: mapped {}/{} reads to {}",
        sample, run.mapped_reads, run.total_reads, contig
    );

    let per_base_path = out_dir.join(report::per_base_file_name(sample, contig));
    let low_confidence_path = out_dir.join(report::low_confidence_file_name(sample, contig));
    reporter.write_per_base_table(&run.state, &reference.seq, &per_base_path)?;
    let n_low = reporter.write_low_confidence_table(&run.state, &reference.seq, &low_confidence_path)?;
    debug!("{}: {} low-confidence rows written", contig, n_low);

    let plot_path = out_dir.join(report::plot_file_name(contig));
    let plot_path = match reporter.render_plot(&run.state, contig, &plot_path) {
        Ok(()) => Some(plot_path),
        Err(e) => {
            warn!("sample {} contig {}: {}", sample, contig, e);
            None
        }
    };

    Ok(ContigReport {
        sample: sample.to_string(),
        contig: contig.to_string(),
        length: reference.len(),
        mapped_reads: run.mapped_reads,
        total_reads: run.total_reads,
        avg_coverage: run.avg_coverage(),
        max_coverage: run.max_coverage(),
        per_base_path,
        low_confidence_path,
        plot_path,
        stream_error: run.stream_error,
    })
}

/// 处理一个样本的全部（或指定的）contig
pub fn run_sample(
    fasta_path: &Path,
    fastq_path: &Path,
    sample: &str,
    contigs: Option<&[String]>,
    out_dir: &Path,
    opt: &RunOptions,
) -> Result<SampleReport> {
    for p in [fasta_path, fastq_path] {
        if !p.exists() {
            return Err(CovError::MissingInput(p.to_path_buf()));
        }
    }
    std::fs::create_dir_all(out_dir)?;

    let references = load_fasta(fasta_path)?;
    info!("found {} contigs in {}", references.len(), sample);

    let names: Vec<String> = match contigs {
        Some(list) => list.to_vec(),
        None => references.iter().map(|r| r.id.clone()).collect(),
    };

    let reporter = CoverageReporter::new(opt.report.clone());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads.max(1))
        .build()
        .map_err(|e| CovError::Io(std::io::Error::other(e.to_string())))?;

    let results: Vec<(String, Result<ContigReport>)> = pool.install(|| {
        names
            .par_iter()
            .map(|name| {
                let res = run_contig(
                    &references,
                    fasta_path,
                    fastq_path,
                    sample,
                    name,
                    out_dir,
                    &reporter,
                    &opt.align,
                );
                (name.clone(), res)
            })
            .collect()
    });

    let mut report = SampleReport { sample: sample.to_string(), ..SampleReport::default() };
    for (name, res) in results {
        match res {
            Ok(c) => report.contigs.push(c),
            Err(e) => {
                error!("sample {} contig {}: {}", sample, name, e);
                report.failed_contigs.push((name, e.to_string()));
            }
        }
    }
    Ok(report)
}

/// FASTQ 的 read 数与碱基总数；读取出错时返回已统计的部分
pub fn count_reads(fastq_path: &Path) -> Result<(u64, u64)> {
    let mut reads = 0u64;
    let mut bases = 0u64;
    for rec in open_fastq(fastq_path)?.records() {
        match rec {
            Ok(r) => {
                reads += 1;
                bases += r.seq.len() as u64;
            }
            Err(e) => {
                warn!("error counting reads in {}: {}", fastq_path.display(), e);
                break;
            }
        }
    }
    Ok((reads, bases))
}

pub const SUMMARY_HEADER: [&str; 13] = [
    "Sample Name",
    "Total Read Count",
    "Total Base Count",
    "E-coli Read Count",
    "E-coli Base Count",
    "Contig Name",
    "Contig Length (bp)",
    "Reads Mapped to Contig",
    "Bases Mapped to Contig",
    "Multimer (by mass)",
    "Coverage",
    "Is Circular",
    "Reaction Status",
];

/// 追加样本的 contig 汇总行；文件不存在时先写表头
pub fn append_summary(path: &Path, report: &SampleReport, total_reads: u64, total_bases: u64) -> Result<()> {
    let exists = path.exists();
    let fh = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::Writer::from_writer(fh);
    if !exists {
        wtr.write_record(SUMMARY_HEADER)?;
    }
    for c in &report.contigs {
        wtr.write_record([
            report.sample.clone(),
            total_reads.to_string(),
            total_bases.to_string(),
            "0".to_string(),
            "0".to_string(),
            c.contig.clone(),
            c.length.to_string(),
            c.mapped_reads.to_string(),
            ((c.avg_coverage * c.length as f64) as u64).to_string(),
            "0.00%".to_string(),
            format!("{}x", c.avg_coverage as u64),
            "False".to_string(),
            "SUCCESS".to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 在目录中查找 `{sample}.final.fasta`，按样本名排序
pub fn discover_samples(data_dir: &Path) -> Result<Vec<String>> {
    let mut samples = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let name = entry?.file_name().to_string_lossy().to_string();
        if let Some(sample) = name.strip_suffix(".final.fasta") {
            if !sample.is_empty() {
                samples.push(sample.to_string());
            }
        }
    }
    samples.sort();
    Ok(samples)
}

/// 批量处理 `data_dir` 下的样本，结果写到 `out_dir/{sample}/` 与 `out_dir/summary.csv`
pub fn run_batch(
    data_dir: &Path,
    samples: Option<Vec<String>>,
    out_dir: &Path,
    opt: &RunOptions,
) -> Result<BatchSummary> {
    let samples = match samples {
        Some(s) => s,
        None => discover_samples(data_dir)?,
    };
    info!("found {} samples to process", samples.len());

    std::fs::create_dir_all(out_dir)?;
    let summary_path = out_dir.join("summary.csv");
    if summary_path.exists() {
        std::fs::remove_file(&summary_path)?;
    }

    let mut summary = BatchSummary::default();
    for sample in &samples {
        match process_sample(data_dir, sample, out_dir, &summary_path, opt) {
            Ok(()) => {
                info!("processed sample {}", sample);
                summary.succeeded += 1;
            }
            Err(e) => {
                error!("failed to process sample {}: {}", sample, e);
                summary.failed.push(sample.clone());
            }
        }
    }

    info!("processed {} samples successfully", summary.succeeded);
    if !summary.failed.is_empty() {
        warn!("failed to process {} samples: {}", summary.failed.len(), summary.failed.join(", "));
    }
    Ok(summary)
}

fn process_sample(data_dir: &Path, sample: &str, out_dir: &Path, summary_path: &Path, opt: &RunOptions) -> Result<()> {
    let fasta = data_dir.join(format!("{}.final.fasta", sample));
    let fastq = data_dir.join(format!("{}.final.fastq", sample));
    let report = run_sample(&fasta, &fastq, sample, None, &out_dir.join(sample), opt)?;
    let (reads, bases) = count_reads(&fastq)?;
    append_summary(summary_path, &report, reads, bases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const REF: &str = "AACCGGTTAGCTAGCTTGCAATCGGATCCATGCATTAGGC";

    fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let fasta = dir.join("S1.final.fasta");
        let fastq = dir.join("S1.final.fastq");
        fs::write(&fasta, format!(">contig_1 len=40\n{}\n{}\n", &REF[..20], &REF[20..])).unwrap();
        let q = "I".repeat(20);
        fs::write(
            &fastq,
            format!("@r1\n{}\n+\n{}\n@r2\n{}\n+\n{}\n", &REF[..20], q, &REF[20..], q),
        )
        .unwrap();
        (fasta, fastq)
    }

    #[test]
    fn contig_not_found_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (fasta, fastq) = fixture(dir.path());
        let refs = load_fasta(&fasta).unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let reporter = CoverageReporter::new(ReportConfig::default());
        let err = run_contig(&refs, &fasta, &fastq, "S1", "nope", &out, &reporter, &AlignOpt::default())
            .unwrap_err();
        assert!(matches!(err, CovError::ContigNotFound { .. }));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn sample_with_missing_contig_keeps_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let (fasta, fastq) = fixture(dir.path());
        let out = dir.path().join("out");
        let contigs = vec!["contig_1".to_string(), "missing".to_string()];
        let report = run_sample(&fasta, &fastq, "S1", Some(&contigs), &out, &RunOptions::default()).unwrap();
        assert_eq!(report.contigs.len(), 1);
        assert_eq!(report.failed_contigs.len(), 1);
        assert_eq!(report.failed_contigs[0].0, "missing");
        let c = &report.contigs[0];
        assert_eq!(c.mapped_reads, 2);
        assert_eq!(c.total_reads, 2);
        assert_eq!(c.max_coverage, 1);
        assert!(c.per_base_path.exists());
        assert!(c.low_confidence_path.exists());
        assert!(c.plot_path.as_ref().unwrap().exists());
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_sample(
            &dir.path().join("a.fasta"),
            &dir.path().join("a.fastq"),
            "a",
            None,
            dir.path(),
            &RunOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CovError::MissingInput(_)));
    }

    #[test]
    fn batch_counts_successes_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        // S2 has a FASTA but no FASTQ
        fs::write(dir.path().join("S2.final.fasta"), format!(">c\n{}\n", REF)).unwrap();
        let out = dir.path().join("results");

        let summary = run_batch(dir.path(), None, &out, &RunOptions::default()).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, vec!["S2".to_string()]);

        let text = fs::read_to_string(out.join("summary.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Sample Name,Total Read Count"));
        assert_eq!(lines[1], "S1,2,40,0,0,contig_1,40,2,40,0.00%,1x,False,SUCCESS");
        assert!(out.join("S1").join("S1_contig_1_per_base_details.csv").exists());
    }

    #[test]
    fn discover_samples_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.final.fasta", "a.final.fasta", "a.final.fastq", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        assert_eq!(discover_samples(dir.path()).unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
