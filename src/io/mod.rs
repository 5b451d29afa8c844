//! FASTA / FASTQ 读取

pub mod fasta;
pub mod fastq;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::Result;

/// 按文件名后缀判断是否 gzip 压缩
pub fn is_gzipped(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".gz")
}

/// 打开输入文件，`.gz` 后缀自动解压
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let fh = File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(fh))))
    } else {
        Ok(Box::new(BufReader::new(fh)))
    }
}
