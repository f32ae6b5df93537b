//! 前缀匹配引擎。
//!
//! 在 S = F · rc(F) · $ 的双链索引上，逐碱基喂入 read 的互补码做
//! 后向扩展：第 k 步之后区间描述的是 rc(Q[0..k)) 在 S 中的全部出现，
//! 因此 BWT 的后向扩展恰好等价于 read 的正向前缀延伸。落在反向块的
//! 出现换算回正链坐标，落在正向块的出现就是负链比对。

use crate::index::{Index, Interval};
use crate::util::dna;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

/// 一条比对落点（原始 FASTA 坐标，0-based）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub chrom: usize,
    pub pos: u64,
    pub strand: Strand,
}

/// 匹配前缀里允许的那一个替换。`offset` 是 read 坐标（0-based）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub offset: usize,
    pub read_base: u8,
    pub ref_base: u8,
}

/// 一条 read 的匹配结果：最长前缀长度、可选的替换、全部落点。
/// 尾巴是 read 的 [matched_len..) 后缀，由调用方取。
#[derive(Debug, Clone)]
pub struct PrefixMatch {
    pub matched_len: usize,
    pub mismatch: Option<Mismatch>,
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOpt {
    pub min_len: usize,
    pub allow_mismatch: bool,
}

impl Default for SearchOpt {
    fn default() -> Self {
        Self { min_len: 18, allow_mismatch: false }
    }
}

/// 从 `from` 开始贪心延伸，返回 (消费到的位置, 最后的非空区间)。
fn extend_greedy(idx: &Index, codes: &[u8], mut itv: Interval, from: usize) -> (usize, Interval) {
    let mut k = from;
    while k < codes.len() {
        let next = idx.fm.extend(itv, dna::complement_code(codes[k]));
        if next.is_empty() {
            break;
        }
        itv = next;
        k += 1;
    }
    (k, itv)
}

/// 对一条已编码的 read 找最长前缀匹配。
/// 前缀短于 `min_len`（或没有任何落点）时返回 None，read 不产生输出。
pub fn map_read(idx: &Index, codes: &[u8], opt: &SearchOpt) -> Option<PrefixMatch> {
    let m = codes.len();
    if m == 0 {
        return None;
    }

    let (exact_len, exact_itv) = extend_greedy(idx, codes, idx.fm.full_interval(), 0);
    let mut matched = exact_len;
    let mut itv = exact_itv;
    let mut mismatch = None;

    if opt.allow_mismatch && exact_len < m {
        // 在第一次区间变空的位置分支，每个替代碱基各试一次，
        // 之后继续精确延伸；保留最长的分支（并列取字典序最小的碱基）。
        let mut best: Option<(usize, Interval, u8)> = None;
        for alt in 0..4u8 {
            if alt == codes[exact_len] {
                continue;
            }
            let branched = idx.fm.extend(exact_itv, dna::complement_code(alt));
            if branched.is_empty() {
                continue;
            }
            let (len, final_itv) = extend_greedy(idx, codes, branched, exact_len + 1);
            if best.as_ref().map_or(true, |&(b, _, _)| len > b) {
                best = Some((len, final_itv, alt));
            }
        }
        // 没有分支达到 min_len 时退回精确前缀
        if let Some((len, final_itv, alt)) = best {
            if len >= opt.min_len {
                matched = len;
                itv = final_itv;
                mismatch = Some(Mismatch {
                    offset: exact_len,
                    read_base: dna::decode(codes[exact_len]),
                    ref_base: dna::decode(alt),
                });
            }
        }
    }

    if matched == 0 || matched < opt.min_len {
        return None;
    }

    let hits = collect_hits(idx, itv, matched as u64);
    if hits.is_empty() {
        return None;
    }
    Some(PrefixMatch { matched_len: matched, mismatch, hits })
}

/// 遍历 SA 区间，把 rc(前缀) 的出现换算为染色体坐标。
/// 跨 F/R 交界、跨染色体边界的出现丢弃。
fn collect_hits(idx: &Index, itv: Interval, p: u64) -> Vec<Hit> {
    let l = idx.forward_len();
    let mut hits = Vec::with_capacity(itv.width() as usize);
    for row in itv.lo..itv.hi {
        let s = idx.fm.locate(row);
        if s >= l {
            // 反向块里的 rc(前缀) 出现 == 正链匹配，镜像回正向坐标
            if s + p <= 2 * l {
                let fpos = 2 * l - s - p;
                if let Some((chrom, off)) = idx.resolve_forward_pos(fpos, p) {
                    hits.push(Hit {
                        chrom,
                        pos: idx.to_original(chrom, off),
                        strand: Strand::Forward,
                    });
                }
            }
        } else if s + p <= l {
            // 正向块里的 rc(前缀) 出现 == 负链匹配
            if let Some((chrom, off)) = idx.resolve_forward_pos(s, p) {
                hits.push(Hit { chrom, pos: idx.to_original(chrom, off), strand: Strand::Reverse });
            }
        }
    }
    hits.sort_by(|a, b| (a.chrom, a.pos, a.strand).cmp(&(b.chrom, b.pos, b.strand)));
    hits
}
