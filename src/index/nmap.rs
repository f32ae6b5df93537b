use serde::{Deserialize, Serialize};

/// 单条染色体的 N 段坐标表。
///
/// 每个条目 `(stripped_pos, run_len)` 表示：压缩坐标 `stripped_pos` 处
/// 原序列被删去了 `run_len` 个连续的模糊碱基。条目按 `stripped_pos`
/// 升序排列；同一压缩坐标不会出现两个条目（相邻 N 段在构建时合并）。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NRunMap {
    runs: Vec<(u64, u64)>,
}

impl NRunMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个 N 段。`stripped_pos` 必须不小于已有条目；与上一条目
    /// 同位置时并入其长度。
    pub fn add_run(&mut self, stripped_pos: u64, run_len: u64) {
        if run_len == 0 {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            debug_assert!(stripped_pos >= last.0);
            if last.0 == stripped_pos {
                last.1 += run_len;
                return;
            }
        }
        self.runs.push((stripped_pos, run_len));
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn runs(&self) -> &[(u64, u64)] {
        &self.runs
    }

    /// 压缩坐标 -> 原始坐标。位于 `stripped_pos` 及之前的所有 N 段
    /// 都使原坐标后移。二分查找，单调。
    pub fn to_original(&self, pos: u64) -> u64 {
        let k = self.runs.partition_point(|&(p, _)| p <= pos);
        let shift: u64 = self.runs[..k].iter().map(|&(_, l)| l).sum();
        pos + shift
    }

    /// 去 N 后长度 -> 原始长度。
    pub fn original_len(&self, stripped_len: u64) -> u64 {
        stripped_len + self.runs.iter().map(|&(_, l)| l).sum::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_runs() {
        let m = NRunMap::new();
        assert_eq!(m.to_original(0), 0);
        assert_eq!(m.to_original(41), 41);
        assert_eq!(m.original_len(10), 10);
    }

    #[test]
    fn single_internal_run() {
        // original ACGTNNNNACGT -> stripped ACGTACGT, run (4, 4)
        let mut m = NRunMap::new();
        m.add_run(4, 4);
        assert_eq!(m.to_original(0), 0);
        assert_eq!(m.to_original(3), 3);
        assert_eq!(m.to_original(4), 8);
        assert_eq!(m.to_original(7), 11);
        assert_eq!(m.original_len(8), 12);
    }

    #[test]
    fn leading_run_shifts_everything() {
        // original NNACGT -> stripped ACGT, run (0, 2)
        let mut m = NRunMap::new();
        m.add_run(0, 2);
        assert_eq!(m.to_original(0), 2);
        assert_eq!(m.to_original(3), 5);
    }

    #[test]
    fn adjacent_runs_merge() {
        let mut m = NRunMap::new();
        m.add_run(5, 2);
        m.add_run(5, 3);
        assert_eq!(m.runs(), &[(5, 5)]);
        assert_eq!(m.to_original(4), 4);
        assert_eq!(m.to_original(5), 10);
    }

    #[test]
    fn mapping_is_monotone() {
        let mut m = NRunMap::new();
        m.add_run(2, 1);
        m.add_run(6, 10);
        m.add_run(9, 3);
        let mut prev = 0;
        for pos in 0..20 {
            let orig = m.to_original(pos);
            assert!(pos == 0 || orig > prev);
            prev = orig;
        }
    }
}
