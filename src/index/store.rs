//! 索引落盘与载入。
//!
//! 六个工件共用一个前缀（结尾补 `.`）：
//!
//! - `t_bwt.bwt`   压缩 BWT + 头部（|S|、primary、步长、字母表大小、构建信息）
//! - `t_table.bwt` C 表、Occ 检查点、SA 采样
//! - `t_seq.bwt`   压缩的 S（不含哨兵）
//! - `NposLen.z`   zlib 压缩的逐染色体 N 段表
//! - `chrStart`    文本：`名称\t起始偏移`
//! - `chrLen`      文本：`名称\t去N长度`
//!
//! 写盘先落 `.tmp` 再统一改名，失败不会留下半套索引。
//! 载入校验每个工件的 magic 与版本，并做 Occ/C 表一致性自检。

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Result, TailmapError};
use crate::util::dna;

use super::fm::FmIndex;
use super::nmap::NRunMap;
use super::packed::PackedSeq;
use super::reference::Chromosome;
use super::{Index, IndexMeta};

const BWT_MAGIC: u64 = 0x544D_4150_4257_5431; // "TMAPBWT1"
const TABLE_MAGIC: u64 = 0x544D_4150_5442_4C31; // "TMAPTBL1"
const SEQ_MAGIC: u64 = 0x544D_4150_5345_5131; // "TMAPSEQ1"
const NPOS_MAGIC: u64 = 0x544D_4150_4E50_5331; // "TMAPNPS1"
const FORMAT_VERSION: u32 = 1;

pub const FILE_BWT: &str = "t_bwt.bwt";
pub const FILE_TABLE: &str = "t_table.bwt";
pub const FILE_SEQ: &str = "t_seq.bwt";
pub const FILE_NPOS: &str = "NposLen.z";
pub const FILE_CHR_START: &str = "chrStart";
pub const FILE_CHR_LEN: &str = "chrLen";

#[derive(Serialize, Deserialize)]
struct BwtArtifact {
    magic: u64,
    version: u32,
    len: u64,
    primary: u64,
    sigma: u8,
    occ_stride: u64,
    sa_stride: u64,
    bwt: PackedSeq,
    meta: IndexMeta,
}

#[derive(Serialize, Deserialize)]
struct TableArtifact {
    magic: u64,
    version: u32,
    c: [u64; 5],
    occ_stride: u64,
    sa_stride: u64,
    occ_samples: Vec<u64>,
    sa_samples: Vec<u64>,
}

#[derive(Serialize, Deserialize)]
struct SeqArtifact {
    magic: u64,
    version: u32,
    seq: PackedSeq,
}

#[derive(Serialize, Deserialize)]
struct NposArtifact {
    magic: u64,
    version: u32,
    nmaps: Vec<NRunMap>,
}

/// 前缀结尾没有 `.` 时补上（与索引文件名直接拼接）。
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.ends_with('.') {
        prefix.to_string()
    } else {
        format!("{}.", prefix)
    }
}

fn artifact_path(prefix: &str, name: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", prefix, name))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = BufWriter::new(fs::File::create(path)?);
    bincode::serialize_into(&mut f, value)
        .map_err(|e| TailmapError::Io(std::io::Error::other(e)))?;
    f.flush()?;
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = open_artifact(path)?;
    bincode::deserialize_from(BufReader::new(f))
        .map_err(|e| TailmapError::corrupt(path, format!("deserialize failed: {}", e)))
}

fn open_artifact(path: &Path) -> Result<fs::File> {
    match fs::File::open(path) {
        Ok(f) => Ok(f),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TailmapError::MissingIndexFile(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn check_header(path: &Path, magic: u64, expect: u64, version: u32) -> Result<()> {
    if magic != expect {
        return Err(TailmapError::corrupt(
            path,
            format!("bad magic (expected 0x{:016X}, got 0x{:016X})", expect, magic),
        ));
    }
    if version != FORMAT_VERSION {
        return Err(TailmapError::corrupt(
            path,
            format!("unsupported version {} (expected {})", version, FORMAT_VERSION),
        ));
    }
    Ok(())
}

/// 把索引的六个工件写到 `prefix` 下。
/// 全部先写 `.tmp`，成功后统一 rename；中途失败清掉临时文件。
pub fn save(index: &Index, prefix: &str) -> Result<()> {
    let prefix = normalize_prefix(prefix);
    let finals: Vec<PathBuf> = [
        FILE_BWT, FILE_TABLE, FILE_SEQ, FILE_NPOS, FILE_CHR_START, FILE_CHR_LEN,
    ]
    .iter()
    .map(|n| artifact_path(&prefix, n))
    .collect();
    let tmps: Vec<PathBuf> = finals.iter().map(|p| tmp_path(p)).collect();

    let result = save_to_tmps(index, &tmps);
    if result.is_err() {
        for t in &tmps {
            let _ = fs::remove_file(t);
        }
        return result;
    }
    for (tmp, fin) in tmps.iter().zip(&finals) {
        if let Err(e) = fs::rename(tmp, fin) {
            for t in &tmps {
                let _ = fs::remove_file(t);
            }
            return Err(e.into());
        }
    }
    Ok(())
}

fn save_to_tmps(index: &Index, tmps: &[PathBuf]) -> Result<()> {
    let fm = &index.fm;

    write_bincode(
        &tmps[0],
        &BwtArtifact {
            magic: BWT_MAGIC,
            version: FORMAT_VERSION,
            len: fm.len,
            primary: fm.primary,
            sigma: dna::SIGMA,
            occ_stride: fm.occ_stride,
            sa_stride: fm.sa_stride,
            bwt: fm.bwt.clone(),
            meta: index.meta.clone(),
        },
    )?;

    write_bincode(
        &tmps[1],
        &TableArtifact {
            magic: TABLE_MAGIC,
            version: FORMAT_VERSION,
            c: fm.c,
            occ_stride: fm.occ_stride,
            sa_stride: fm.sa_stride,
            occ_samples: fm.occ_samples.clone(),
            sa_samples: fm.sa_samples.clone(),
        },
    )?;

    write_bincode(
        &tmps[2],
        &SeqArtifact { magic: SEQ_MAGIC, version: FORMAT_VERSION, seq: index.seq.clone() },
    )?;

    {
        let f = fs::File::create(&tmps[3])?;
        let mut enc = ZlibEncoder::new(BufWriter::new(f), Compression::default());
        bincode::serialize_into(
            &mut enc,
            &NposArtifact {
                magic: NPOS_MAGIC,
                version: FORMAT_VERSION,
                nmaps: index.nmaps.clone(),
            },
        )
        .map_err(|e| TailmapError::Io(std::io::Error::other(e)))?;
        let mut inner = enc.finish()?;
        inner.flush()?;
    }

    {
        let mut f = BufWriter::new(fs::File::create(&tmps[4])?);
        for c in &index.chroms {
            writeln!(f, "{}\t{}", c.name, c.start)?;
        }
        f.flush()?;
    }
    {
        let mut f = BufWriter::new(fs::File::create(&tmps[5])?);
        for c in &index.chroms {
            writeln!(f, "{}\t{}", c.name, c.stripped_len)?;
        }
        f.flush()?;
    }
    Ok(())
}

/// 载入并校验六个工件，重组只读索引。
pub fn load(prefix: &str) -> Result<Index> {
    let prefix = normalize_prefix(prefix);

    let bwt_path = artifact_path(&prefix, FILE_BWT);
    let bwt_art: BwtArtifact = read_bincode(&bwt_path)?;
    check_header(&bwt_path, bwt_art.magic, BWT_MAGIC, bwt_art.version)?;
    if bwt_art.sigma != dna::SIGMA {
        return Err(TailmapError::corrupt(
            &bwt_path,
            format!("alphabet size {} (expected {})", bwt_art.sigma, dna::SIGMA),
        ));
    }
    if bwt_art.bwt.len() + 1 != bwt_art.len || bwt_art.primary >= bwt_art.len {
        return Err(TailmapError::corrupt(&bwt_path, "BWT length/primary mismatch"));
    }

    let table_path = artifact_path(&prefix, FILE_TABLE);
    let table: TableArtifact = read_bincode(&table_path)?;
    check_header(&table_path, table.magic, TABLE_MAGIC, table.version)?;
    if table.occ_stride != bwt_art.occ_stride || table.sa_stride != bwt_art.sa_stride {
        return Err(TailmapError::corrupt(&table_path, "stride mismatch with BWT header"));
    }
    if !table.occ_stride.is_power_of_two() || !table.sa_stride.is_power_of_two() {
        return Err(TailmapError::corrupt(&table_path, "strides must be powers of two"));
    }
    let expect_sa_samples = bwt_art.len.div_ceil(table.sa_stride);
    if table.sa_samples.len() as u64 != expect_sa_samples {
        return Err(TailmapError::corrupt(&table_path, "SA sample table truncated"));
    }
    let expect_occ_rows = bwt_art.bwt.len().div_ceil(table.occ_stride).max(1) * 4;
    if table.occ_samples.len() as u64 != expect_occ_rows {
        return Err(TailmapError::corrupt(&table_path, "Occ sample table truncated"));
    }

    let seq_path = artifact_path(&prefix, FILE_SEQ);
    let seq_art: SeqArtifact = read_bincode(&seq_path)?;
    check_header(&seq_path, seq_art.magic, SEQ_MAGIC, seq_art.version)?;
    if seq_art.seq.len() + 1 != bwt_art.len {
        return Err(TailmapError::corrupt(&seq_path, "sequence length mismatch"));
    }

    let npos_path = artifact_path(&prefix, FILE_NPOS);
    let npos: NposArtifact = {
        let f = open_artifact(&npos_path)?;
        bincode::deserialize_from(ZlibDecoder::new(BufReader::new(f)))
            .map_err(|e| TailmapError::corrupt(&npos_path, format!("deserialize failed: {}", e)))?
    };
    check_header(&npos_path, npos.magic, NPOS_MAGIC, npos.version)?;

    let starts = read_text_table(&artifact_path(&prefix, FILE_CHR_START))?;
    let lens = read_text_table(&artifact_path(&prefix, FILE_CHR_LEN))?;
    let chr_len_path = artifact_path(&prefix, FILE_CHR_LEN);
    if starts.len() != lens.len() || starts.is_empty() {
        return Err(TailmapError::corrupt(&chr_len_path, "chromosome table size mismatch"));
    }
    if npos.nmaps.len() != starts.len() {
        return Err(TailmapError::corrupt(&npos_path, "N-run table count mismatch"));
    }

    let forward_len = (bwt_art.len - 1) / 2;
    let mut chroms = Vec::with_capacity(starts.len());
    let mut expect_start = 0u64;
    for (i, ((name, start), (name2, stripped_len))) in starts.into_iter().zip(lens).enumerate() {
        if name != name2 || start != expect_start {
            return Err(TailmapError::corrupt(&chr_len_path, "chromosome tables disagree"));
        }
        expect_start += stripped_len;
        let original_len = npos.nmaps[i].original_len(stripped_len);
        chroms.push(Chromosome { name, original_len, stripped_len, start });
    }
    if expect_start != forward_len {
        return Err(TailmapError::corrupt(&chr_len_path, "chromosome lengths do not cover F"));
    }

    let fm = FmIndex {
        len: bwt_art.len,
        primary: bwt_art.primary,
        c: table.c,
        bwt: bwt_art.bwt,
        occ_stride: table.occ_stride,
        sa_stride: table.sa_stride,
        occ_samples: table.occ_samples,
        sa_samples: table.sa_samples,
    };
    if !fm.occ_totals_consistent() {
        return Err(TailmapError::corrupt(&table_path, "Occ totals disagree with C table"));
    }

    Ok(Index { fm, seq: seq_art.seq, chroms, nmaps: npos.nmaps, meta: bwt_art.meta })
}

fn read_text_table(path: &Path) -> Result<Vec<(String, u64)>> {
    let f = open_artifact(path)?;
    let mut out = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once('\t')
            .ok_or_else(|| TailmapError::corrupt(path, "malformed line"))?;
        let value: u64 = value
            .trim()
            .parse()
            .map_err(|_| TailmapError::corrupt(path, "malformed number"))?;
        out.push((name.to_string(), value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::reference::Reference;
    use crate::io::fasta::FastaReader;
    use std::io::Cursor;

    fn toy_index(fasta: &[u8]) -> Index {
        let reference =
            Reference::from_fasta(FastaReader::new(Cursor::new(fasta.to_vec()))).unwrap();
        Index::build(reference, 4, 4, IndexMeta::default()).unwrap()
    }

    fn tmp_prefix(dir: &tempfile::TempDir) -> String {
        dir.path().join("idx").to_str().unwrap().to_string()
    }

    #[test]
    fn normalize_prefix_appends_dot() {
        assert_eq!(normalize_prefix("ref"), "ref.");
        assert_eq!(normalize_prefix("ref."), "ref.");
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = tmp_prefix(&dir);
        let idx = toy_index(b">a\nACGTNNACGT\n>b\nTTTTACGT\n");
        save(&idx, &prefix).unwrap();

        let loaded = load(&prefix).unwrap();
        assert_eq!(loaded.fm.len(), idx.fm.len());
        assert_eq!(loaded.fm.primary(), idx.fm.primary());
        assert_eq!(loaded.seq, idx.seq);
        assert_eq!(loaded.chroms, idx.chroms);
        assert_eq!(loaded.nmaps, idx.nmaps);
        for row in 0..idx.fm.len() {
            assert_eq!(loaded.fm.locate(row), idx.fm.locate(row));
        }
    }

    #[test]
    fn missing_artifact_is_distinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = tmp_prefix(&dir);
        let idx = toy_index(b">a\nACGT\n");
        save(&idx, &prefix).unwrap();
        fs::remove_file(artifact_path(&normalize_prefix(&prefix), FILE_NPOS)).unwrap();
        assert!(matches!(load(&prefix), Err(TailmapError::MissingIndexFile(_))));
    }

    #[test]
    fn truncated_artifact_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = tmp_prefix(&dir);
        let idx = toy_index(b">a\nACGTACGT\n");
        save(&idx, &prefix).unwrap();
        let path = artifact_path(&normalize_prefix(&prefix), FILE_TABLE);
        let data = fs::read(&path).unwrap();
        fs::write(&path, &data[..data.len() / 2]).unwrap();
        assert!(matches!(load(&prefix), Err(TailmapError::CorruptIndexFile { .. })));
    }

    #[test]
    fn wrong_magic_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = tmp_prefix(&dir);
        let idx = toy_index(b">a\nACGT\n");
        save(&idx, &prefix).unwrap();
        let norm = normalize_prefix(&prefix);
        // swap two artifacts: both have valid encodings but wrong magic
        let bwt = fs::read(artifact_path(&norm, FILE_BWT)).unwrap();
        fs::write(artifact_path(&norm, FILE_TABLE), &bwt).unwrap();
        assert!(matches!(load(&prefix), Err(TailmapError::CorruptIndexFile { .. })));
    }

    #[test]
    fn no_tmp_files_left_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = tmp_prefix(&dir);
        let idx = toy_index(b">a\nACGT\n");
        save(&idx, &prefix).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
