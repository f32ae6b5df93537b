use rayon::prelude::*;

/// 构建后缀数组（倍增法，O(n log^2 n)，排序走 rayon 并行）。
/// 输入为符号秩文本（0:$, 1:A, 2:C, 3:G, 4:T），末尾应当是唯一的 0 哨兵，
/// 这样 SA[0] 必然是哨兵后缀。
pub fn build_sa(text: &[u8]) -> Vec<u64> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<i64> = text.iter().map(|&b| b as i64).collect();
    let mut tmp: Vec<i64> = vec![0; n];

    let mut k = 1usize;
    loop {
        let key = |i: usize| -> (i64, i64) {
            let next = if i + k < n { rank[i + k] } else { -1 };
            (rank[i], next)
        };
        sa.par_sort_unstable_by(|&i, &j| key(i).cmp(&key(j)));

        tmp[sa[0]] = 0;
        for i in 1..n {
            let a = sa[i - 1];
            let b = sa[i];
            tmp[b] = tmp[a] + if key(b) != key(a) { 1 } else { 0 };
        }
        rank.copy_from_slice(&tmp);

        if rank[sa[n - 1]] as usize == n - 1 {
            break;
        }
        k <<= 1;
        if k >= n {
            break;
        }
    }

    sa.into_iter().map(|x| x as u64).collect()
}
