use serde::{Deserialize, Serialize};

/// 候选起点的扫描范围
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScanWindow {
    /// 只扫描参考序列尾部：`[ref_len - read_len - flank, ref_len - min_match]`
    Tail { flank: usize },
    /// 扫描整条参考序列：`[0, ref_len - min_match]`
    Full,
}

impl Default for ScanWindow {
    fn default() -> Self {
        ScanWindow::Tail { flank: 100 }
    }
}

impl ScanWindow {
    /// 候选起点区间 `[lo, hi)`；参考短于 `min_match` 时为空
    pub fn candidates(&self, read_len: usize, ref_len: usize, min_match: usize) -> std::ops::Range<usize> {
        if ref_len < min_match {
            return 0..0;
        }
        let hi = ref_len - min_match + 1;
        let lo = match *self {
            ScanWindow::Tail { flank } => ref_len.saturating_sub(read_len + flank),
            ScanWindow::Full => 0,
        };
        lo..hi
    }
}

/// 某一方向上得分最高的位置
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowHit {
    pub pos: usize,
    pub identity: f64,
}

/// `read[0..match_len]` 与 `reference[pos..]` 的逐位一致比例，`match_len = min(read_len, ref_len - pos)`
#[inline]
pub fn window_identity(read: &[u8], reference: &[u8], pos: usize) -> f64 {
    let match_len = read.len().min(reference.len() - pos);
    if match_len == 0 {
        return 0.0;
    }
    let matches = read[..match_len]
        .iter()
        .zip(&reference[pos..pos + match_len])
        .filter(|(a, b)| a == b)
        .count();
    matches as f64 / match_len as f64
}

/// 在候选窗口内找得分最高的起点；同分保留最早的位置。
///
/// 代价为 O(候选数 × read 长度)，只适用于质粒这类短参考。
pub fn best_window(read: &[u8], reference: &[u8], min_match: usize, window: ScanWindow) -> Option<WindowHit> {
    let ref_len = reference.len();
    let mut best: Option<WindowHit> = None;
    for pos in window.candidates(read.len(), ref_len, min_match) {
        let match_len = read.len().min(ref_len - pos);
        if match_len < min_match {
            continue;
        }
        let identity = window_identity(read, reference, pos);
        if best.map_or(true, |b| identity > b.identity) {
            best = Some(WindowHit { pos, identity });
        }
    }
    best
}
