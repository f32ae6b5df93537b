use std::path::PathBuf;
use thiserror::Error;

/// 核心错误类型。建索引、载入索引、比对过程中的所有可恢复错误都归于此枚举。
#[derive(Debug, Error)]
pub enum TailmapError {
    /// FASTA / FASTQ 输入格式错误
    #[error("bad input: {0}")]
    BadInput(String),

    /// 索引文件缺失
    #[error("missing index file: {}", .0.display())]
    MissingIndexFile(PathBuf),

    /// 索引文件损坏（magic / 版本 / 截断 / 表不一致）
    #[error("corrupt index file {}: {reason}", .path.display())]
    CorruptIndexFile { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TailmapError>;

impl TailmapError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptIndexFile { path: path.into(), reason: reason.into() }
    }

    /// 进程退出码：索引损坏/缺失为 2，其余错误为 1。
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingIndexFile(_) | Self::CorruptIndexFile { .. } => 2,
            _ => 1,
        }
    }
}
