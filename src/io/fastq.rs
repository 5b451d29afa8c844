use std::io::BufRead;
use std::path::Path;

use tracing::warn;

use crate::error::{CovError, Result};

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

/// 读取一条记录的结果：区分正常结束与截断的记录
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Record(FastqRecord),
    /// 记录缺少序列行或质量行，之后不再读取
    Truncated { id: String, missing: &'static str },
    EndOfStream,
}

pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
}

/// 打开 FASTQ 文件，`.gz` 后缀按 gzip 解压
pub fn open_fastq(path: &Path) -> Result<FastqReader<Box<dyn BufRead>>> {
    Ok(FastqReader::new(crate::io::open_input(path)?))
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false }
    }

    fn read_trimmed(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf.trim().to_string()))
    }

    fn truncated(&mut self, id: String, missing: &'static str) -> ReadOutcome {
        self.done = true;
        ReadOutcome::Truncated { id, missing }
    }

    pub fn next_record(&mut self) -> Result<ReadOutcome> {
        if self.done {
            return Ok(ReadOutcome::EndOfStream);
        }

        // header line; a blank line ends the stream, stray lines are skipped
        let header = loop {
            match self.read_trimmed()? {
                None => {
                    self.done = true;
                    return Ok(ReadOutcome::EndOfStream);
                }
                Some(line) if line.is_empty() => {
                    self.done = true;
                    return Ok(ReadOutcome::EndOfStream);
                }
                Some(line) if line.starts_with('@') => break line[1..].to_string(),
                Some(_) => continue,
            }
        };
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let seq = match self.read_trimmed()? {
            Some(s) if !s.is_empty() => s.into_bytes(),
            _ => return Ok(self.truncated(id, "sequence")),
        };

        match self.read_trimmed()? {
            None => return Ok(self.truncated(id, "quality")),
            Some(plus) if !plus.starts_with('+') => {
                self.done = true;
                return Err(CovError::ReadStream(format!(
                    "record '{}': expected '+' separator line",
                    id
                )));
            }
            Some(_) => {}
        }

        let qual = match self.read_trimmed()? {
            Some(q) if !q.is_empty() => q.into_bytes(),
            _ => return Ok(self.truncated(id, "quality")),
        };

        if qual.len() != seq.len() {
            self.done = true;
            return Err(CovError::ReadStream(format!(
                "record '{}': sequence length {} != quality length {}",
                id,
                seq.len(),
                qual.len()
            )));
        }

        Ok(ReadOutcome::Record(FastqRecord { id, desc, seq, qual }))
    }

    /// 逐条产出记录；遇到截断记录时记录日志并结束
    pub fn records(self) -> FastqRecords<R> {
        FastqRecords { inner: self, finished: false }
    }
}

pub struct FastqRecords<R: BufRead> {
    inner: FastqReader<R>,
    finished: bool,
}

impl<R: BufRead> Iterator for FastqRecords<R> {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.inner.next_record() {
            Ok(ReadOutcome::Record(rec)) => Some(Ok(rec)),
            Ok(ReadOutcome::Truncated { id, missing }) => {
                warn!("truncated FASTQ record '{}' (missing {} line), stopping", id, missing);
                self.finished = true;
                None
            }
            Ok(ReadOutcome::EndOfStream) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
