use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TailmapError};
use crate::io::fasta::FastaReader;
use crate::util::dna;

use super::nmap::NRunMap;

/// 染色体条目。`start` 是该染色体在正向拼接序列 F 中的偏移（去 N 坐标）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chromosome {
    pub name: String,
    pub original_len: u64,
    pub stripped_len: u64,
    pub start: u64,
}

/// 参考序列的构建产物：S = F · rc(F) · $ 的符号秩文本
/// （0=$, 1=A, 2=C, 3=G, 4=T）、染色体表、以及逐染色体的 N 段表。
#[derive(Debug)]
pub struct Reference {
    pub ranks: Vec<u8>,
    pub chroms: Vec<Chromosome>,
    pub nmaps: Vec<NRunMap>,
    pub forward_len: u64,
}

impl Reference {
    /// 读入多条 FASTA，去掉模糊碱基（N 与其他非 ACGT 字符），
    /// 拼接出 F，再接上反向互补与哨兵。
    pub fn from_fasta<R: BufRead>(mut reader: FastaReader<R>) -> Result<Self> {
        let mut ranks: Vec<u8> = Vec::new();
        let mut chroms: Vec<Chromosome> = Vec::new();
        let mut nmaps: Vec<NRunMap> = Vec::new();

        while let Some(rec) = reader.next_record()? {
            let start = ranks.len() as u64;
            let mut nmap = NRunMap::new();
            let mut pending_ns = 0u64;
            let mut stripped_len = 0u64;

            for &b in &rec.seq {
                match dna::encode(b) {
                    Some(code) => {
                        if pending_ns > 0 {
                            nmap.add_run(stripped_len, pending_ns);
                            pending_ns = 0;
                        }
                        ranks.push(code + 1);
                        stripped_len += 1;
                    }
                    None => pending_ns += 1,
                }
            }
            if pending_ns > 0 {
                nmap.add_run(stripped_len, pending_ns);
            }

            chroms.push(Chromosome {
                name: rec.id,
                original_len: rec.seq.len() as u64,
                stripped_len,
                start,
            });
            nmaps.push(nmap);
        }

        if chroms.is_empty() {
            return Err(TailmapError::BadInput("FASTA contains no sequences".into()));
        }
        let forward_len = ranks.len() as u64;
        if forward_len == 0 {
            return Err(TailmapError::BadInput(
                "reference is empty after removing ambiguous bases".into(),
            ));
        }

        // R[i] = complement(F[|F|-1-i]); 秩互补为 5 - r
        ranks.reserve(forward_len as usize + 1);
        for i in (0..forward_len as usize).rev() {
            ranks.push(5 - ranks[i]);
        }
        ranks.push(0);

        Ok(Self { ranks, chroms, nmaps, forward_len })
    }

    /// |S| = 2|F| + 1
    pub fn total_len(&self) -> u64 {
        self.ranks.len() as u64
    }
}
