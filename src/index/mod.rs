pub mod bwt;
pub mod fm;
pub mod nmap;
pub mod packed;
pub mod reference;
pub mod sa;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use fm::{FmIndex, Interval};
pub use nmap::NRunMap;
pub use packed::PackedSeq;
pub use reference::{Chromosome, Reference};

/// 构建信息，随 BWT 工件一起落盘。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexMeta {
    pub reference_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 完整的只读索引：FM 表、压缩的 S、染色体表与 N 段表。
/// 构建一次之后在所有比对线程间共享借用。
#[derive(Debug)]
pub struct Index {
    pub fm: FmIndex,
    pub seq: PackedSeq,
    pub chroms: Vec<Chromosome>,
    pub nmaps: Vec<NRunMap>,
    pub meta: IndexMeta,
}

impl Index {
    /// 从参考序列构建全部索引结构。
    pub fn build(
        reference: Reference,
        occ_stride: u64,
        sa_stride: u64,
        meta: IndexMeta,
    ) -> Result<Self> {
        let suffixes = sa::build_sa(&reference.ranks);
        let fm = FmIndex::build(&reference.ranks, &suffixes, occ_stride, sa_stride);
        // S 的 2-bit 压缩拷贝（不含哨兵），供 locate 回退与校验使用
        let seq: PackedSeq = reference.ranks[..reference.ranks.len() - 1]
            .iter()
            .map(|&r| r - 1)
            .collect();
        Ok(Self {
            fm,
            seq,
            chroms: reference.chroms,
            nmaps: reference.nmaps,
            meta,
        })
    }

    /// 正向拼接块 F 的长度；|S| = 2|F| + 1。
    #[inline]
    pub fn forward_len(&self) -> u64 {
        (self.fm.len() - 1) / 2
    }

    /// 去 N 坐标空间里的正向位置 -> (染色体下标, 染色体内偏移)。
    /// 跨染色体边界（pos 本身或 pos+len 越界）的匹配丢弃。
    pub fn resolve_forward_pos(&self, pos: u64, len: u64) -> Option<(usize, u64)> {
        let mut lo = 0usize;
        let mut hi = self.chroms.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let c = &self.chroms[mid];
            if pos < c.start {
                hi = mid;
            } else if pos >= c.start + c.stripped_len {
                lo = mid + 1;
            } else {
                let off = pos - c.start;
                if off + len > c.stripped_len {
                    return None;
                }
                return Some((mid, off));
            }
        }
        None
    }

    /// 染色体内去 N 偏移 -> 原始 FASTA 坐标（0-based）。
    #[inline]
    pub fn to_original(&self, chrom: usize, off: u64) -> u64 {
        self.nmaps[chrom].to_original(off)
    }
}
