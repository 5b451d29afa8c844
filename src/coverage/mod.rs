//! 逐位覆盖度累积：把每条 read 的比对结果折叠进 depth 与碱基计数数组。

pub mod counts;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::align::{self, AlignOpt, AlignmentResult, Orientation};
use crate::error::Result;
use crate::io::fastq::FastqRecord;
use crate::util::dna;

pub use counts::BaseCounts;

/// 低置信度判定阈值
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceOpt {
    pub min_depth: u32,
    pub min_vaf: f64,
}

impl Default for ConfidenceOpt {
    fn default() -> Self {
        Self { min_depth: 3, min_vaf: 0.8 }
    }
}

/// 单个 contig 的覆盖度状态，数组长度等于参考长度
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoverageState {
    pub depth: Vec<u32>,
    pub base_counts: Vec<BaseCounts>,
}

/// 由 `CoverageState` 派生的单个位置汇总
#[derive(Clone, Debug, PartialEq)]
pub struct PerBaseRecord {
    /// 1-based
    pub pos: usize,
    pub ref_base: u8,
    pub consensus: u8,
    pub depth: u32,
    /// 与参考碱基相同的碱基数
    pub match_count: u32,
    pub vaf: f64,
    pub counts: BaseCounts,
    pub qscore: u8,
    pub low_confidence: bool,
}

/// 质量值占位：有覆盖时固定为 30
pub const PLACEHOLDER_QSCORE: u8 = 30;

impl CoverageState {
    pub fn new(len: usize) -> Self {
        Self {
            depth: vec![0; len],
            base_counts: vec![BaseCounts::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    pub fn avg_coverage(&self) -> f64 {
        if self.depth.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.depth.iter().map(|&d| d as u64).sum();
        sum as f64 / self.depth.len() as f64
    }

    pub fn max_coverage(&self) -> u32 {
        self.depth.iter().copied().max().unwrap_or(0)
    }

    /// 计算位置 `i`（0-based）的汇总
    pub fn record_at(&self, reference: &[u8], i: usize, opt: &ConfidenceOpt) -> PerBaseRecord {
        let depth = self.depth[i];
        let counts = self.base_counts[i];
        let ref_base = reference[i];
        let total = counts.total();

        let (consensus, match_count, vaf) = match counts.consensus() {
            Some(cons) => {
                let m = counts.get(ref_base);
                (cons, m, m as f64 / total as f64)
            }
            None => (ref_base, 0, 1.0),
        };

        PerBaseRecord {
            pos: i + 1,
            ref_base,
            consensus,
            depth,
            match_count,
            vaf,
            counts,
            qscore: if depth > 0 { PLACEHOLDER_QSCORE } else { 0 },
            low_confidence: depth < opt.min_depth || vaf < opt.min_vaf,
        }
    }

    pub fn per_base<'a>(
        &'a self,
        reference: &'a [u8],
        opt: &'a ConfidenceOpt,
    ) -> impl Iterator<Item = PerBaseRecord> + 'a {
        (0..self.len()).map(move |i| self.record_at(reference, i, opt))
    }

    /// 按位置顺序取前 `limit` 个低置信度位置
    pub fn low_confidence<'a>(
        &'a self,
        reference: &'a [u8],
        opt: &'a ConfidenceOpt,
        limit: usize,
    ) -> impl Iterator<Item = PerBaseRecord> + 'a {
        self.per_base(reference, opt).filter(|r| r.low_confidence).take(limit)
    }

    /// 所有位置满足 `total(base_counts) <= depth`
    pub fn is_consistent(&self) -> bool {
        self.depth.len() == self.base_counts.len()
            && self
                .depth
                .iter()
                .zip(&self.base_counts)
                .all(|(&d, c)| c.total() <= d)
    }
}

/// 逐条 read 累积覆盖度
pub struct CoverageAccumulator<'r> {
    reference: &'r [u8],
    opt: AlignOpt,
    state: CoverageState,
    mapped_reads: u64,
    total_reads: u64,
}

impl<'r> CoverageAccumulator<'r> {
    pub fn new(reference: &'r [u8], opt: AlignOpt) -> Self {
        Self {
            reference,
            opt,
            state: CoverageState::new(reference.len()),
            mapped_reads: 0,
            total_reads: 0,
        }
    }

    /// 比对一条 read 并累积，返回比对结果
    pub fn add_read(&mut self, seq: &[u8]) -> AlignmentResult {
        self.total_reads += 1;
        let read = dna::to_upper(seq);
        let result = align::align(&read, self.reference, &self.opt);
        if let AlignmentResult::Mapped { start, orientation, .. } = result {
            self.mapped_reads += 1;
            let oriented = match orientation {
                Orientation::Forward => read,
                Orientation::ReverseComplement => dna::revcomp(&read),
            };
            self.add_alignment(&oriented, start);
        }
        result
    }

    /// `oriented` 已按胜出方向调整
    pub fn add_alignment(&mut self, oriented: &[u8], start: usize) {
        let ref_len = self.state.len();
        if start >= ref_len {
            return;
        }
        let span = oriented.len().min(ref_len - start);
        for (k, &base) in oriented[..span].iter().enumerate() {
            self.state.depth[start + k] += 1;
            self.state.base_counts[start + k].add(base);
        }
    }

    pub fn mapped_reads(&self) -> u64 {
        self.mapped_reads
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    pub fn finish(self) -> CoverageRun {
        CoverageRun {
            state: self.state,
            mapped_reads: self.mapped_reads,
            total_reads: self.total_reads,
            stream_error: None,
        }
    }
}

/// 一个 contig 的覆盖度计算结果
#[derive(Clone, Debug)]
pub struct CoverageRun {
    pub state: CoverageState,
    pub mapped_reads: u64,
    pub total_reads: u64,
    /// read 流中途出错时的错误信息；此时 `state` 只包含出错前的 reads
    pub stream_error: Option<String>,
}

impl CoverageRun {
    pub fn avg_coverage(&self) -> f64 {
        self.state.avg_coverage()
    }

    pub fn max_coverage(&self) -> u32 {
        self.state.max_coverage()
    }
}

/// 对一条参考序列累积全部 reads 的覆盖度。
///
/// read 流出错时记录警告并停止，已累积的结果照常返回。
pub fn compute_coverage<I>(reference: &[u8], reads: I, opt: &AlignOpt) -> CoverageRun
where
    I: IntoIterator<Item = Result<FastqRecord>>,
{
    let mut acc = CoverageAccumulator::new(reference, *opt);
    let mut stream_error = None;

    for item in reads {
        match item {
            Ok(rec) => {
                acc.add_read(&rec.seq);
                if acc.total_reads() % 1000 == 0 {
                    debug!("processed {} reads, {} mapped", acc.total_reads(), acc.mapped_reads());
                }
            }
            Err(e) => {
                warn!("error processing reads after {} records: {}", acc.total_reads(), e);
                stream_error = Some(e.to_string());
                break;
            }
        }
    }

    let mut run = acc.finish();
    run.stream_error = stream_error;
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::ScanWindow;
    use crate::error::CovError;

    fn rec(seq: &str) -> Result<FastqRecord> {
        Ok(FastqRecord {
            id: "r".to_string(),
            desc: None,
            seq: seq.as_bytes().to_vec(),
            qual: vec![b'I'; seq.len()],
        })
    }

    #[test]
    fn no_reads_gives_zero_coverage() {
        let reference = b"ACGTACGTACGTACGTACGTACGT";
        let run = compute_coverage(reference, Vec::new(), &AlignOpt::default());
        assert_eq!(run.state.depth, vec![0; 24]);
        assert_eq!(run.avg_coverage(), 0.0);
        assert_eq!(run.max_coverage(), 0);
        assert_eq!(run.mapped_reads, 0);
        assert_eq!(run.total_reads, 0);
    }

    #[test]
    fn empty_reference_does_not_panic() {
        let run = compute_coverage(b"", vec![rec("ACGTACGTACGTACGTACGT")], &AlignOpt::default());
        assert!(run.state.is_empty());
        assert_eq!(run.avg_coverage(), 0.0);
        assert_eq!(run.max_coverage(), 0);
        assert_eq!(run.total_reads, 1);
        assert_eq!(run.mapped_reads, 0);
    }

    #[test]
    fn exact_prefix_read() {
        let reference = b"ACGTACGTACGTACGTACGTACGT";
        let run = compute_coverage(reference, vec![rec("ACGTACGTACGTACGTACGT")], &AlignOpt::default());
        assert_eq!(&run.state.depth[..20], &[1; 20]);
        assert_eq!(&run.state.depth[20..], &[0; 4]);
        assert_eq!(run.mapped_reads, 1);
        assert_eq!(run.total_reads, 1);
        assert_eq!(run.state.base_counts[0], BaseCounts { a: 1, ..BaseCounts::default() });
    }

    #[test]
    fn mismatching_read_is_unmapped() {
        let reference = b"ACGTACGTACGTACGTACGTACGT";
        // neither orientation reaches 70% identity anywhere
        let run = compute_coverage(reference, vec![rec("GGGGGGGGGGGGGGGGGGGG")], &AlignOpt::default());
        assert_eq!(run.state.depth, vec![0; 24]);
        assert_eq!(run.mapped_reads, 0);
        assert_eq!(run.total_reads, 1);
    }

    #[test]
    fn disjoint_halves() {
        let reference = b"AACCGGTTAGCTAGCTTGCAATCGGATCCATGCATTAGGC";
        assert_eq!(reference.len(), 40);
        let first = std::str::from_utf8(&reference[..20]).unwrap();
        let second = std::str::from_utf8(&reference[20..]).unwrap();
        let opt = AlignOpt { window: ScanWindow::Full, ..AlignOpt::default() };
        let run = compute_coverage(reference, vec![rec(first), rec(second)], &opt);
        assert_eq!(run.state.depth, vec![1; 40]);
        assert_eq!(run.avg_coverage(), 1.0);
        assert_eq!(run.max_coverage(), 1);
        assert_eq!(run.mapped_reads, 2);
    }

    #[test]
    fn lowercase_reads_are_uppercased() {
        let reference = b"ACGTACGTACGTACGTACGTACGT";
        let run = compute_coverage(reference, vec![rec("acgtacgtacgtacgtacgt")], &AlignOpt::default());
        assert_eq!(run.mapped_reads, 1);
        assert_eq!(run.state.base_counts[1].c, 1);
    }

    #[test]
    fn reverse_reads_count_oriented_bases() {
        let reference = b"AACCGGTTAGCTAGCTTGCAATCGGATCCATGCATTAGGC";
        let rc = dna::revcomp(&reference[20..]);
        let run = compute_coverage(
            reference,
            vec![rec(std::str::from_utf8(&rc).unwrap())],
            &AlignOpt::default(),
        );
        assert_eq!(run.mapped_reads, 1);
        for i in 20..40 {
            assert_eq!(run.state.depth[i], 1);
            assert_eq!(run.state.base_counts[i].get(reference[i]), 1);
        }
    }

    #[test]
    fn ambiguous_bases_count_depth_only() {
        let reference = b"ACGTACGTACGTACGTACGTACGT";
        let run = compute_coverage(reference, vec![rec("ACGTACGTACNTACGTACGT")], &AlignOpt::default());
        assert_eq!(run.mapped_reads, 1);
        assert_eq!(run.state.depth[10], 1);
        assert_eq!(run.state.base_counts[10].total(), 0);
        assert!(run.state.is_consistent());
    }

    #[test]
    fn stream_error_keeps_partial_results() {
        let reference = b"ACGTACGTACGTACGTACGTACGT";
        let reads = vec![
            rec("ACGTACGTACGTACGTACGT"),
            Err(CovError::ReadStream("bad record".to_string())),
            rec("ACGTACGTACGTACGTACGT"),
        ];
        let run = compute_coverage(reference, reads, &AlignOpt::default());
        assert_eq!(run.total_reads, 1);
        assert_eq!(run.mapped_reads, 1);
        assert_eq!(run.state.depth[0], 1);
        assert!(run.stream_error.unwrap().contains("bad record"));
    }

    #[test]
    fn per_base_records() {
        let reference = b"ACGT";
        let mut state = CoverageState::new(4);
        // pos 0: 4 x A -> confident
        state.depth[0] = 4;
        state.base_counts[0] = BaseCounts { a: 4, ..BaseCounts::default() };
        // pos 1: C ref, 3 G + 1 C -> consensus G, vaf 0.25
        state.depth[1] = 4;
        state.base_counts[1] = BaseCounts { g: 3, c: 1, ..BaseCounts::default() };
        // pos 2: depth 2 -> low by depth
        state.depth[2] = 2;
        state.base_counts[2] = BaseCounts { g: 2, ..BaseCounts::default() };

        let opt = ConfidenceOpt::default();
        let recs: Vec<_> = state.per_base(reference, &opt).collect();
        assert_eq!(recs.len(), 4);

        assert_eq!(recs[0].pos, 1);
        assert_eq!(recs[0].consensus, b'A');
        assert_eq!(recs[0].match_count, 4);
        assert_eq!(recs[0].vaf, 1.0);
        assert!(!recs[0].low_confidence);
        assert_eq!(recs[0].qscore, 30);

        assert_eq!(recs[1].consensus, b'G');
        assert_eq!(recs[1].match_count, 1);
        assert_eq!(recs[1].vaf, 0.25);
        assert!(recs[1].low_confidence);

        assert!(recs[2].low_confidence);
        assert_eq!(recs[2].vaf, 1.0);

        // no coverage: reference base, vaf 1.0, qscore 0
        assert_eq!(recs[3].consensus, b'T');
        assert_eq!(recs[3].depth, 0);
        assert_eq!(recs[3].vaf, 1.0);
        assert_eq!(recs[3].qscore, 0);
        assert!(recs[3].low_confidence);
    }

    #[test]
    fn low_confidence_is_limited() {
        let reference = vec![b'A'; 500];
        let state = CoverageState::new(500);
        let opt = ConfidenceOpt::default();
        let low: Vec<_> = state.low_confidence(&reference, &opt, 100).collect();
        assert_eq!(low.len(), 100);
        assert_eq!(low[0].pos, 1);
        assert_eq!(low[99].pos, 100);
    }
}
