use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::debug;

use crate::error::{CovError, Result};

/// 一条参考序列（contig），序列已转为大写
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

impl ReferenceSequence {
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// 一个 FASTA 文件解析后的全部 contig，保持文件顺序，可按 id 查找
#[derive(Debug, Default, Clone)]
pub struct ReferenceSet {
    records: Vec<ReferenceSequence>,
    by_id: HashMap<String, usize>,
}

impl ReferenceSet {
    /// 重复的 id 以后出现的序列为准，位置保持首次出现处
    pub fn insert(&mut self, rec: ReferenceSequence) {
        if let Some(&i) = self.by_id.get(&rec.id) {
            self.records[i] = rec;
        } else {
            self.by_id.insert(rec.id.clone(), self.records.len());
            self.records.push(rec);
        }
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceSequence> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceSequence> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    source: String,
    buf: String,
    line_no: usize,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_source(reader, "<stream>")
    }

    /// `source` 仅用于错误信息
    pub fn with_source(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
            buf: String::new(),
            line_no: 0,
            done: false,
            peek_header: None,
        }
    }

    fn read_line(&mut self) -> Result<usize> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n)
    }

    pub fn next_record(&mut self) -> Result<Option<ReferenceSequence>> {
        if self.done {
            return Ok(None);
        }

        // Find header line; sequence data before the first header is an error
        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                if self.read_line()? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if self.buf.starts_with('>') {
                    break self.buf[1..].trim().to_string();
                }
                if !self.buf.trim().is_empty() {
                    self.done = true;
                    return Err(CovError::Format {
                        path: self.source.clone(),
                        line: self.line_no,
                        message: "sequence data before first '>' header".to_string(),
                    });
                }
            }
        };

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut seq: Vec<u8> = Vec::new();
        loop {
            if self.read_line()? == 0 {
                self.done = true;
                break;
            }
            if self.buf.starts_with('>') {
                self.peek_header = Some(self.buf[1..].trim().to_string());
                break;
            }
            for &b in self.buf.as_bytes() {
                match b {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    _ => seq.push(b.to_ascii_uppercase()),
                }
            }
        }

        Ok(Some(ReferenceSequence { id, desc, seq }))
    }
}

/// 读取整个 FASTA 文件（支持 `.gz`）
pub fn load_fasta(path: &Path) -> Result<ReferenceSet> {
    let input = crate::io::open_input(path)?;
    let mut reader = FastaReader::with_source(input, path.display().to_string());
    let mut set = ReferenceSet::default();
    while let Some(rec) = reader.next_record()? {
        set.insert(rec);
    }
    debug!("loaded {} contigs from {}", set.len(), path.display());
    Ok(set)
}
