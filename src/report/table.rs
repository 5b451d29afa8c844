use std::io::Write;

use crate::coverage::PerBaseRecord;
use crate::error::Result;

pub const PER_BASE_HEADER: [&str; 14] = [
    "pos", "base", "depth", "match_count", "vaf", "G", "A", "T", "C", "ins", "del", "qscore", "confidence", "methylation",
];

pub const LOW_CONFIDENCE_HEADER: [&str; 14] = [
    "pos", "base", "depth", "match_count", "vaf", "G", "A", "T", "C", "ins", "del", "qscore", "confidence", "variants",
];

/// 无覆盖时写字面量 `1.0`，否则保留两位小数
pub fn format_vaf(rec: &PerBaseRecord) -> String {
    if rec.depth == 0 {
        "1.0".to_string()
    } else {
        format!("{:.2}", rec.vaf)
    }
}

/// 低置信度表的 VAF：有深度但没有任何 A/T/G/C 读数时记为 `0.00`
fn low_confidence_vaf(rec: &PerBaseRecord) -> String {
    if rec.depth > 0 && rec.counts.total() == 0 {
        "0.00".to_string()
    } else {
        format_vaf(rec)
    }
}

fn row(rec: &PerBaseRecord, base: u8, vaf: String, qscore: u8, confidence: &str) -> [String; 14] {
    [
        rec.pos.to_string(),
        (base as char).to_string(),
        rec.depth.to_string(),
        rec.match_count.to_string(),
        vaf,
        rec.counts.g.to_string(),
        rec.counts.a.to_string(),
        rec.counts.t.to_string(),
        rec.counts.c.to_string(),
        "0".to_string(),
        "0".to_string(),
        qscore.to_string(),
        confidence.to_string(),
        String::new(),
    ]
}

/// 逐位明细表：base 列为共识碱基
pub fn write_per_base<W: Write, I>(out: W, records: I) -> Result<usize>
where
    I: IntoIterator<Item = PerBaseRecord>,
{
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(PER_BASE_HEADER)?;
    let mut n = 0usize;
    for rec in records {
        let confidence = if rec.low_confidence { "low" } else { "" };
        wtr.write_record(row(&rec, rec.consensus, format_vaf(&rec), rec.qscore, confidence))?;
        n += 1;
    }
    wtr.flush()?;
    Ok(n)
}

/// 低置信度表：base 列为参考碱基，qscore 固定 30
pub fn write_low_confidence<W: Write, I>(out: W, records: I) -> Result<usize>
where
    I: IntoIterator<Item = PerBaseRecord>,
{
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(LOW_CONFIDENCE_HEADER)?;
    let mut n = 0usize;
    for rec in records {
        wtr.write_record(row(
            &rec,
            rec.ref_base,
            low_confidence_vaf(&rec),
            crate::coverage::PLACEHOLDER_QSCORE,
            "low",
        ))?;
        n += 1;
    }
    wtr.flush()?;
    Ok(n)
}
