//! # plasmid-cov
//!
//! 纳米孔质粒测序的 read 覆盖度引擎。
//!
//! 给定组装得到的 contig（FASTA）与 reads（FASTQ，可为 `.gz`），本 crate：
//!
//! - **比对**：在参考序列的候选窗口内按逐位一致率为每条 read 找最佳起点（正向与反向互补）
//! - **累积**：统计每个位置的深度与 A/T/G/C 计数
//! - **判定**：按深度与 VAF 标记低置信度位置
//! - **输出**：逐位明细 CSV、低置信度 CSV 与覆盖度 PNG 图
//!
//! ## 快速示例
//!
//! ```rust
//! use plasmid_cov::align::{self, AlignOpt, AlignmentResult, Orientation};
//! use plasmid_cov::coverage::compute_coverage;
//!
//! let reference = b"ACGTACGTACGTACGTACGTACGT";
//! let read = b"ACGTACGTACGTACGTACGT";
//!
//! let res = align::align(read, reference, &AlignOpt::default());
//! assert_eq!(res, AlignmentResult::Mapped { start: 0, orientation: Orientation::Forward, identity: 1.0 });
//!
//! let run = compute_coverage(reference, Vec::new(), &AlignOpt::default());
//! assert_eq!(run.max_coverage(), 0);
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA / FASTQ 文件解析
//! - [`align`] — 窗口一致率比对
//! - [`coverage`] — 深度与碱基计数累积、逐位汇总
//! - [`report`] — CSV 表格与覆盖度图
//! - [`pipeline`] — 按 contig / 样本 / 批次驱动
//! - [`util`] — 反向互补等 DNA 工具函数

pub mod align;
pub mod coverage;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod report;
pub mod util;

pub use error::{CovError, Result};
