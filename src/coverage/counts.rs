use serde::{Deserialize, Serialize};

/// 单个位置上 A/T/G/C 的计数
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCounts {
    pub a: u32,
    pub t: u32,
    pub g: u32,
    pub c: u32,
}

impl BaseCounts {
    /// 并列时的优先顺序
    pub const ORDER: [u8; 4] = [b'A', b'T', b'G', b'C'];

    /// 非 A/T/G/C 的碱基不计数，返回是否计入
    #[inline]
    pub fn add(&mut self, base: u8) -> bool {
        match base {
            b'A' => self.a += 1,
            b'T' => self.t += 1,
            b'G' => self.g += 1,
            b'C' => self.c += 1,
            _ => return false,
        }
        true
    }

    #[inline]
    pub fn get(&self, base: u8) -> u32 {
        match base {
            b'A' => self.a,
            b'T' => self.t,
            b'G' => self.g,
            b'C' => self.c,
            _ => 0,
        }
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.a + self.t + self.g + self.c
    }

    /// 计数最多的碱基，按 A、T、G、C 顺序取第一个最大值；没有计数时返回 None
    pub fn consensus(&self) -> Option<u8> {
        if self.total() == 0 {
            return None;
        }
        let mut best = Self::ORDER[0];
        for &b in &Self::ORDER[1..] {
            if self.get(b) > self.get(best) {
                best = b;
            }
        }
        Some(best)
    }
}
