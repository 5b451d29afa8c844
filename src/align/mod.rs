//! 近似单位置比对：在参考序列的候选窗口内按逐位一致率打分，
//! 正向与反向互补各扫描一次，取得分最高者。
//!
//! 这不是动态规划比对器，不处理插入/缺失；仅用于在没有外部比对工具时
//! 粗略估计质粒 contig 的覆盖度。

pub mod scan;

use serde::{Deserialize, Serialize};

use crate::util::dna;

pub use scan::{best_window, window_identity, ScanWindow, WindowHit};

/// 比对参数
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignOpt {
    /// 重叠区最短长度
    pub min_match_length: usize,
    /// 一致率需严格大于该值才算比对上
    pub identity_threshold: f64,
    pub window: ScanWindow,
}

impl Default for AlignOpt {
    fn default() -> Self {
        Self {
            min_match_length: 20,
            identity_threshold: 0.70,
            window: ScanWindow::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Forward,
    ReverseComplement,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlignmentResult {
    Unmapped,
    Mapped {
        start: usize,
        orientation: Orientation,
        identity: f64,
    },
}

impl AlignmentResult {
    pub fn is_mapped(&self) -> bool {
        matches!(self, AlignmentResult::Mapped { .. })
    }
}

/// 比对一条（已转大写的）read。先扫正向，再扫反向互补；
/// 反向只有得分严格更高时才会替换正向结果。
pub fn align(read: &[u8], reference: &[u8], opt: &AlignOpt) -> AlignmentResult {
    let fwd = best_window(read, reference, opt.min_match_length, opt.window);
    let rc = dna::revcomp(read);
    let rev = best_window(&rc, reference, opt.min_match_length, opt.window);

    let best = match (fwd, rev) {
        (Some(f), Some(r)) if r.identity > f.identity => Some((r, Orientation::ReverseComplement)),
        (Some(f), _) => Some((f, Orientation::Forward)),
        (None, Some(r)) => Some((r, Orientation::ReverseComplement)),
        (None, None) => None,
    };

    match best {
        Some((hit, orientation)) if hit.identity > opt.identity_threshold => AlignmentResult::Mapped {
            start: hit.pos,
            orientation,
            identity: hit.identity,
        },
        _ => AlignmentResult::Unmapped,
    }
}
