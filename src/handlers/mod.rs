pub mod lotto;
pub mod pension;
pub mod statistics;
pub mod system;

pub use lotto::lotto_config;
pub use pension::pension_config;
pub use statistics::statistics_config;
pub use system::system_config;
