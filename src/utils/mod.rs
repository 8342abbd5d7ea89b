pub mod date;
pub mod rng;

pub use date::next_weekday;
pub use rng::{SharedRng, pick_random, random_digits, random_lotto_set};
