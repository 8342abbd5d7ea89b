pub mod dh_pension;
pub mod dhlottery;
pub mod ollama;
pub mod telegram;

pub use dh_pension::DhPensionClient;
pub use dhlottery::DhLotteryClient;
pub use ollama::OllamaClient;
pub use telegram::TelegramNotifier;
