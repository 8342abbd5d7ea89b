use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use crate::models::{LOTTO_MAX_NUMBER, LOTTO_MIN_NUMBER, LOTTO_SET_SIZE, PENSION_DIGIT_LEN};

/// 可注入的随机源；配置了种子时结果可复现
#[derive(Clone)]
pub struct SharedRng(Arc<Mutex<StdRng>>);

impl SharedRng {
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SharedRng(Arc::new(Mutex::new(rng)))
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // 锁中毒只可能来自其它线程 panic，随机数状态本身仍可用
        let mut guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl std::fmt::Debug for SharedRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedRng")
    }
}

/// 洗牌后取前 `take` 个并升序排列
pub fn pick_random<R: Rng + ?Sized>(rng: &mut R, pool: &[i32], take: usize) -> Vec<i32> {
    let mut pool = pool.to_vec();
    pool.shuffle(rng);
    pool.truncate(take);
    pool.sort_unstable();
    pool
}

/// 1..=45 中随机取 6 个
pub fn random_lotto_set<R: Rng + ?Sized>(rng: &mut R) -> Vec<i32> {
    let all: Vec<i32> = (LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER).collect();
    pick_random(rng, &all, LOTTO_SET_SIZE)
}

pub fn random_digits<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..PENSION_DIGIT_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{is_valid_lotto_set, is_valid_pension_digits};

    #[test]
    fn seeded_rng_is_reproducible() {
        let a = SharedRng::from_seed(Some(7));
        let b = SharedRng::from_seed(Some(7));
        assert_eq!(a.with(random_lotto_set), b.with(random_lotto_set));
    }

    #[test]
    fn random_values_are_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            assert!(is_valid_lotto_set(&random_lotto_set(&mut rng)));
            assert!(is_valid_pension_digits(&random_digits(&mut rng)));
        }
    }

    #[test]
    fn pick_random_sorts_and_truncates() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool: Vec<i32> = (10..20).collect();
        let picked = pick_random(&mut rng, &pool, 6);
        assert_eq!(picked.len(), 6);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(picked.iter().all(|n| pool.contains(n)));
    }
}
