//! SAM 输出。
//!
//! 头部在任何 worker 启动前写一次；每条比对一行。尾巴在 CIGAR 里记
//! soft-clip，碱基序列放在 `TL:Z:` 可选字段（read 方向）；替换用标准
//! `MD:Z:` 描述；`NM:i:` 是匹配区间内的编辑距离（0 或 1）。
//! 负链记录按 SAM 约定给出反向互补的 SEQ 与反转的 QUAL，soft-clip
//! 移到 CIGAR 前端。

use std::fmt::Write as FmtWrite;
use std::io::{self, Write};

use crate::index::Index;
use crate::io::fastq::FastqRecord;
use crate::search::{PrefixMatch, Strand};
use crate::util::dna;

const FLAG_REVERSE: u16 = 0x10;
const FLAG_SECONDARY: u16 = 0x100;

/// 比对质量固定为 255（不可用）：本引擎只做精确/单替换前缀匹配，不打分。
const MAPQ_UNAVAILABLE: u8 = 255;

pub fn write_header<W: Write>(out: &mut W, index: &Index) -> io::Result<()> {
    writeln!(out, "@HD\tVN:1.0\tSO:unsorted")?;
    for c in &index.chroms {
        writeln!(out, "@SQ\tSN:{}\tLN:{}", c.name, c.original_len)?;
    }
    writeln!(
        out,
        "@PG\tID:tailmap\tPN:tailmap\tVN:{}",
        env!("CARGO_PKG_VERSION")
    )?;
    Ok(())
}

/// 把一条 read 的全部落点格式化进 `buf`（每个落点一行，行尾带换行）。
/// 第一行是主比对，其余带 secondary 标志。
pub fn format_records(buf: &mut String, index: &Index, rec: &FastqRecord, m: &PrefixMatch) {
    let p = m.matched_len;
    let tail_len = rec.seq.len() - p;

    let fwd_seq = &rec.seq;
    let rev_seq = dna::revcomp(&rec.seq);
    let rev_qual: Vec<u8> = rec.qual.iter().rev().copied().collect();

    for (i, hit) in m.hits.iter().enumerate() {
        let mut flag: u16 = 0;
        if hit.strand == Strand::Reverse {
            flag |= FLAG_REVERSE;
        }
        if i > 0 {
            flag |= FLAG_SECONDARY;
        }

        let (seq, qual): (&[u8], &[u8]) = match hit.strand {
            Strand::Forward => (fwd_seq, &rec.qual),
            Strand::Reverse => (&rev_seq, &rev_qual),
        };

        let _ = write!(
            buf,
            "{}\t{}\t{}\t{}\t{}\t",
            rec.id,
            flag,
            index.chroms[hit.chrom].name,
            hit.pos + 1,
            MAPQ_UNAVAILABLE,
        );
        match (hit.strand, tail_len) {
            (Strand::Forward, 0) => {
                let _ = write!(buf, "{}M", p);
            }
            (Strand::Forward, t) => {
                let _ = write!(buf, "{}M{}S", p, t);
            }
            (Strand::Reverse, 0) => {
                let _ = write!(buf, "{}M", p);
            }
            (Strand::Reverse, t) => {
                let _ = write!(buf, "{}S{}M", t, p);
            }
        }
        let _ = write!(
            buf,
            "\t*\t0\t0\t{}\t{}",
            String::from_utf8_lossy(seq),
            String::from_utf8_lossy(qual),
        );

        let nm = u32::from(m.mismatch.is_some());
        let _ = write!(buf, "\tNM:i:{}\tMD:Z:{}", nm, md_descriptor(m, hit.strand));
        if tail_len > 0 {
            let _ = write!(buf, "\tTL:Z:{}", String::from_utf8_lossy(&rec.seq[p..]));
        }
        buf.push('\n');
    }
}

/// MD 描述符：匹配区间的参考序列走样。负链时位置与碱基都换到参考方向。
fn md_descriptor(m: &PrefixMatch, strand: Strand) -> String {
    let p = m.matched_len;
    match m.mismatch {
        None => p.to_string(),
        Some(mm) => match strand {
            Strand::Forward => format!(
                "{}{}{}",
                mm.offset,
                mm.ref_base as char,
                p - mm.offset - 1
            ),
            Strand::Reverse => format!(
                "{}{}{}",
                p - mm.offset - 1,
                dna::complement(mm.ref_base) as char,
                mm.offset
            ),
        },
    }
}
