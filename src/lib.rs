//! # tailmap
//!
//! 基于 BWT 的小 RNA 比对器，专门检测 read 3′ 端的非模板加尾（tailing）。
//!
//! 对每条 read，在双链 FM 索引上找出出现在基因组里的最长精确前缀
//! （可选允许一个内部替换），没匹配上的 3′ 后缀作为尾巴以 soft-clip
//! 报告。本 crate 提供：
//!
//! - **索引构建**：参考序列去 N、正向 + 反向互补 + 哨兵拼接，
//!   后缀数组 → BWT → C 表 / Occ 检查点 / SA 采样
//! - **前缀搜索**：后向扩展求最长前缀匹配，支持单替换分支
//! - **多线程比对**：只读索引共享给固定 worker 池，SAM 输出
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use tailmap::index::{Index, IndexMeta, Reference};
//! use tailmap::io::fasta::FastaReader;
//! use tailmap::search::{map_read, SearchOpt};
//! use tailmap::util::dna;
//!
//! let fasta = b">chr1\nACGTACGTACGT\n";
//! let reference = Reference::from_fasta(FastaReader::new(Cursor::new(&fasta[..]))).unwrap();
//! let index = Index::build(reference, 64, 512, IndexMeta::default()).unwrap();
//!
//! let query = dna::encode_read(b"ACGTACGTAAA").unwrap();
//! let opt = SearchOpt { min_len: 6, allow_mismatch: false };
//! if let Some(m) = map_read(&index, &query, &opt) {
//!     println!("matched {} bases, {} hits", m.matched_len, m.hits.len());
//! }
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA / FASTQ 文件解析
//! - [`index`] — 索引构建与持久化（后缀数组、BWT、FM 表、N 段坐标）
//! - [`search`] — 前缀匹配引擎
//! - [`map`] — worker 池与 SAM 输出
//! - [`util`] — 碱基编码 / 互补工具
//! - [`error`] — 错误类型与退出码

pub mod error;
pub mod index;
pub mod io;
pub mod map;
pub mod search;
pub mod util;

pub use error::{Result, TailmapError};
