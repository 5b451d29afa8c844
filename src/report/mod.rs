//! 输出覆盖度结果：逐位明细表、低置信度表与覆盖度图。

pub mod plot;
pub mod table;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coverage::{ConfidenceOpt, CoverageState};
use crate::error::Result;

pub use plot::PlotStyle;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub confidence: ConfidenceOpt,
    /// 低置信度表最多写出的行数
    pub low_confidence_limit: usize,
    pub plot: PlotStyle,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceOpt::default(),
            low_confidence_limit: 100,
            plot: PlotStyle::default(),
        }
    }
}

/// 输出文件名，与下游报告模板一致
pub fn per_base_file_name(sample: &str, contig: &str) -> String {
    format!("{}_{}_per_base_details.csv", sample, contig)
}

pub fn low_confidence_file_name(sample: &str, contig: &str) -> String {
    format!("{}_{}_low_confidence_bases.csv", sample, contig)
}

pub fn plot_file_name(contig: &str) -> String {
    format!("{}_coverage.png", contig)
}

pub struct CoverageReporter {
    config: ReportConfig,
}

impl CoverageReporter {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// 返回写出的行数（不含表头）
    pub fn write_per_base_table(&self, state: &CoverageState, reference: &[u8], path: &Path) -> Result<usize> {
        let out = BufWriter::new(File::create(path)?);
        table::write_per_base(out, state.per_base(reference, &self.config.confidence))
    }

    pub fn write_low_confidence_table(&self, state: &CoverageState, reference: &[u8], path: &Path) -> Result<usize> {
        let out = BufWriter::new(File::create(path)?);
        table::write_low_confidence(
            out,
            state.low_confidence(reference, &self.config.confidence, self.config.low_confidence_limit),
        )
    }

    pub fn render_plot(&self, state: &CoverageState, contig: &str, path: &Path) -> Result<()> {
        plot::write_plot(state, contig, self.config.confidence.min_depth, &self.config.plot, path)
    }
}
