use std::path::PathBuf;

use thiserror::Error;

/// 覆盖度引擎的错误类型
#[derive(Debug, Error)]
pub enum CovError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// FASTA 中在任何 header 之前出现了序列行
    #[error("malformed FASTA '{path}' at line {line}: {message}")]
    Format {
        path: String,
        line: usize,
        message: String,
    },

    #[error("contig '{contig}' not found in '{path}'")]
    ContigNotFound { contig: String, path: String },

    /// 单条 FASTQ 记录解析失败；调用方保留已处理的 reads
    #[error("read stream error: {0}")]
    ReadStream(String),

    #[error("failed to render plot '{path}': {message}")]
    PlotRender { path: PathBuf, message: String },

    #[error("input file not found: {0}")]
    MissingInput(PathBuf),
}

pub type Result<T> = std::result::Result<T, CovError>;
