//! 碱基的 2-bit 编码：A=0, C=1, G=2, T=3。
//! 哨兵 `$` 不参与编码，由持有者单独记录位置。

/// 索引字母表大小（$ + ACGT），写入索引头部。
pub const SIGMA: u8 = 5;

/// 把 ASCII 碱基编码为 2-bit 码。U 视为 T；N 及其他字符无编码。
#[inline]
pub fn encode(b: u8) -> Option<u8> {
    match b.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' | b'U' => Some(3),
        _ => None,
    }
}

#[inline]
pub fn decode(code: u8) -> u8 {
    match code & 3 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

/// 2-bit 码的互补：A<->T, C<->G。
#[inline]
pub fn complement_code(code: u8) -> u8 {
    3 - (code & 3)
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
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

/// 把整条 read 编码为 2-bit 码序列；遇到未知符号返回 None（整条 read 跳过）。
pub fn encode_read(seq: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        out.push(encode(b)?);
    }
    Some(out)
}
