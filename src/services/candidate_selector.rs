use rand::Rng;
use std::collections::HashSet;

use crate::models::{
    LOTTO_MAX_NUMBER, LOTTO_MIN_NUMBER, PENSION_DIGIT_LEN, PensionDigitFrequency,
    StatisticsSummary,
};
use crate::utils::random_digits;

/// 排除最低频的 `exclude_count` 个号码，剩余号码升序返回
///
/// 频率相同的号码按统计结果中的先后顺序排除（不按号码大小）。
/// 无历史数据时返回全部 45 个号码。
pub fn select_candidates(summary: &StatisticsSummary, exclude_count: usize) -> Vec<i32> {
    if summary.frequencies.is_empty() {
        return (LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER).collect();
    }

    let mut ascending: Vec<_> = summary.frequencies.iter().collect();
    ascending.sort_by(|a, b| a.count.cmp(&b.count));

    let mut candidates: Vec<i32> = ascending
        .into_iter()
        .skip(exclude_count)
        .map(|f| f.number)
        .collect();
    candidates.sort_unstable();
    candidates
}

/// 第 `rank` 名组合：每一位取频率排名 `min(rank, 可用数 - 1)` 的数字
fn digits_at_rank<R: Rng + ?Sized>(
    freq: &PensionDigitFrequency,
    rank: usize,
    rng: &mut R,
) -> Vec<u8> {
    (0..PENSION_DIGIT_LEN)
        .map(|pos| match freq.positions.get(pos) {
            Some(ranked) if !ranked.is_empty() => ranked[rank.min(ranked.len() - 1)].digit,
            _ => rng.gen_range(0..10u8),
        })
        .collect()
}

fn to_string(digits: &[u8]) -> String {
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

/// 与已有组合冲突时依次尝试：
/// 1. 逐位替换为更低排名的数字
/// 2. 逐位替换为任意不同数字
fn resolve_collision(
    freq: &PensionDigitFrequency,
    rank: usize,
    base: &[u8],
    used: &HashSet<String>,
) -> Option<String> {
    for pos in 0..PENSION_DIGIT_LEN {
        let ranked = freq.positions.get(pos).map(Vec::as_slice).unwrap_or(&[]);
        for next in ranked.iter().skip(rank + 1) {
            let mut candidate = base.to_vec();
            candidate[pos] = next.digit;
            let s = to_string(&candidate);
            if !used.contains(&s) {
                return Some(s);
            }
        }
    }

    for pos in 0..PENSION_DIGIT_LEN {
        for d in 0..10u8 {
            if d == base[pos] {
                continue;
            }
            let mut candidate = base.to_vec();
            candidate[pos] = d;
            let s = to_string(&candidate);
            if !used.contains(&s) {
                return Some(s);
            }
        }
    }

    None
}

/// 返回 `k` 个互不相同的 6 位数字组合（按排名 0..k）
///
/// 无历史数据时全部随机生成。
pub fn ranked_digit_sets<R: Rng + ?Sized>(
    freq: &PensionDigitFrequency,
    k: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(k);
    let mut sets = Vec::with_capacity(k);

    for rank in 0..k {
        let next = if freq.is_empty() {
            None
        } else {
            let base = digits_at_rank(freq, rank, rng);
            let s = to_string(&base);
            if used.contains(&s) {
                resolve_collision(freq, rank, &base, &used)
            } else {
                Some(s)
            }
        };

        let chosen = match next {
            Some(s) => s,
            None => loop {
                let s = random_digits(rng);
                if !used.contains(&s) {
                    break s;
                }
            },
        };
        used.insert(chosen.clone());
        sets.push(chosen);
    }

    sets
}
