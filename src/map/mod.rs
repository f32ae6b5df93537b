//! 比对工作池。
//!
//! 固定数量的 OS 线程共享同一个只读索引。输入游标和输出流各有一把
//! 互斥锁：worker 先锁输入取下一条 read，搜索全程无锁，再把整条记录
//! 格式化进本线程的暂存区之后才锁输出写出，因此行不会交错。输出 I/O
//! 失败通过中止标志让其余 worker 在下一次取 read 时退出。

pub mod sam;

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;

use crate::error::{Result, TailmapError};
use crate::index::Index;
use crate::io::fastq::FastqReader;
use crate::search::{self, SearchOpt};
use crate::util::dna;

#[derive(Debug, Clone, Copy)]
pub struct MapOpt {
    pub threads: usize,
    pub min_len: usize,
    pub allow_mismatch: bool,
}

impl Default for MapOpt {
    fn default() -> Self {
        Self { threads: 1, min_len: 18, allow_mismatch: false }
    }
}

/// 一次 map 运行的累计计数。
#[derive(Debug, Default)]
pub struct MapStats {
    pub reads: u64,
    pub mapped: u64,
    pub dropped_short: u64,
    pub skipped_bad: u64,
}

struct Shared<'a, R: BufRead, W: Write> {
    index: &'a Index,
    input: Mutex<FastqReader<R>>,
    output: Mutex<W>,
    abort: AtomicBool,
    reads: AtomicU64,
    mapped: AtomicU64,
    dropped_short: AtomicU64,
    skipped_bad: AtomicU64,
    opt: SearchOpt,
}

/// 写 SAM 头部，然后用 `opt.threads` 个 worker 消费整个 FASTQ 流。
/// 线程数超过硬件并行度时收紧并告警。
pub fn run<R, W>(index: &Index, reader: FastqReader<R>, mut out: W, opt: &MapOpt) -> Result<MapStats>
where
    R: BufRead + Send,
    W: Write + Send,
{
    sam::write_header(&mut out, index)?;

    let hw = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let mut threads = opt.threads.max(1);
    if threads > hw {
        log::warn!("requested {} threads but only {} cores available, using {}", threads, hw, hw);
        threads = hw;
    }

    let shared = Shared {
        index,
        input: Mutex::new(reader),
        output: Mutex::new(out),
        abort: AtomicBool::new(false),
        reads: AtomicU64::new(0),
        mapped: AtomicU64::new(0),
        dropped_short: AtomicU64::new(0),
        skipped_bad: AtomicU64::new(0),
        opt: SearchOpt { min_len: opt.min_len, allow_mismatch: opt.allow_mismatch },
    };

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            handles.push(scope.spawn(|| worker(&shared)));
        }
        let mut first_err: Result<()> = Ok(());
        for h in handles {
            match h.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_err.is_ok() {
                        first_err = Err(e);
                    }
                }
                Err(_) => {
                    if first_err.is_ok() {
                        first_err =
                            Err(TailmapError::Io(std::io::Error::other("worker thread panicked")));
                    }
                }
            }
        }
        first_err
    })?;

    let stats = MapStats {
        reads: shared.reads.load(Ordering::Relaxed),
        mapped: shared.mapped.load(Ordering::Relaxed),
        dropped_short: shared.dropped_short.load(Ordering::Relaxed),
        skipped_bad: shared.skipped_bad.load(Ordering::Relaxed),
    };
    shared
        .output
        .into_inner()
        .map_err(|_| TailmapError::Io(std::io::Error::other("output lock poisoned")))?
        .flush()?;

    log::info!(
        "{} reads: {} mapped, {} below minimum length, {} skipped",
        stats.reads,
        stats.mapped,
        stats.dropped_short,
        stats.skipped_bad
    );
    Ok(stats)
}

fn worker<R: BufRead, W: Write>(shared: &Shared<'_, R, W>) -> Result<()> {
    let mut scratch = String::new();
    loop {
        if shared.abort.load(Ordering::Relaxed) {
            return Ok(());
        }

        let rec = {
            let mut input = shared
                .input
                .lock()
                .map_err(|_| TailmapError::Io(std::io::Error::other("input lock poisoned")))?;
            match input.next_record() {
                Ok(Some(rec)) => rec,
                Ok(None) => return Ok(()),
                Err(TailmapError::BadInput(_)) => {
                    shared.skipped_bad.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Err(e) => {
                    shared.abort.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        };
        shared.reads.fetch_add(1, Ordering::Relaxed);

        // 含未知碱基的 read 整条跳过
        let Some(query) = dna::encode_read(&rec.seq) else {
            shared.skipped_bad.fetch_add(1, Ordering::Relaxed);
            continue;
        };

        match search::map_read(shared.index, &query, &shared.opt) {
            Some(m) => {
                scratch.clear();
                sam::format_records(&mut scratch, shared.index, &rec, &m);
                let mut out = shared
                    .output
                    .lock()
                    .map_err(|_| TailmapError::Io(std::io::Error::other("output lock poisoned")))?;
                if let Err(e) = out.write_all(scratch.as_bytes()) {
                    shared.abort.store(true, Ordering::Relaxed);
                    return Err(e.into());
                }
                shared.mapped.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                shared.dropped_short.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
