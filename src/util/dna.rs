/// 互补碱基：A↔T, G↔C, N→N，其余字符一律视为 N
#[inline]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        out.push(complement(b));
    }
    out
}

pub fn to_upper(seq: &[u8]) -> Vec<u8> {
    seq.to_ascii_uppercase()
}
