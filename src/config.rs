use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub draw_source: DrawSourceConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    #[serde(default)]
    pub random: RandomConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...`，或 `memory://` 使用内存仓储
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

/// Ollama 文本生成服务
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            enabled: true,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:8b".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawSourceConfig {
    pub lotto_url: String,
    pub pension_url: String,
    pub timeout_secs: u64,
    /// 6/45 全量数据缓存时间
    pub cache_ttl_secs: u64,
    pub pension_chunk_size: i32,
    pub pension_chunk_delay_ms: u64,
    /// 查找最新回次时最多扫描的回次数
    pub pension_scan_limit: i32,
}

impl Default for DrawSourceConfig {
    fn default() -> Self {
        DrawSourceConfig {
            lotto_url: "https://www.dhlottery.co.kr/lt645/selectPstLt645Info.do".to_string(),
            pension_url: "https://www.dhlottery.co.kr/pt720/selectPstPt720Info.do".to_string(),
            timeout_secs: 30,
            cache_ttl_secs: 3600,
            pension_chunk_size: 100,
            pension_chunk_delay_ms: 300,
            pension_scan_limit: 500,
        }
    }
}

/// bot_token / chat_id 为空时禁用通知
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        TelegramConfig {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// 每周触发时间，格式 `MON 12:30`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub timezone: String,
    pub lotto_generate: String,
    pub lotto_verify: String,
    pub lotto_refresh: String,
    pub pension_generate: String,
    pub pension_verify: String,
    pub pension_refresh: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            enabled: true,
            timezone: "Asia/Seoul".to_string(),
            lotto_generate: "MON 12:30".to_string(),
            lotto_verify: "SAT 22:00".to_string(),
            lotto_refresh: "SAT 22:30".to_string(),
            pension_generate: "FRI 12:30".to_string(),
            pension_verify: "FRI 12:00".to_string(),
            pension_refresh: "FRI 13:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// 排除的低频号码数量
    pub exclude_count: usize,
    pub statistical_games: usize,
    pub ai_games: usize,
    /// 提供给 AI 的最近开奖回次数
    pub ai_history: usize,
    /// 每个排名生成 5 注（组 1..5）
    pub pension_ranks: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        RecommendationConfig {
            exclude_count: 20,
            statistical_games: 3,
            ai_games: 2,
            ai_history: 10,
            pension_ranks: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomConfig {
    /// 固定种子，便于复现；为空则使用系统熵
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    ai: AiConfig::default(),
                    draw_source: DrawSourceConfig::default(),
                    telegram: TelegramConfig::default(),
                    scheduler: SchedulerConfig::default(),
                    recommendation: RecommendationConfig::default(),
                    random: RandomConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse().ok())
        }

        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = parsed("SERVER_PORT") {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = parsed("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }

        // AI
        if let Some(v) = parsed("AI_ENABLED") {
            self.ai.enabled = v;
        }
        if let Ok(v) = env::var("OLLAMA_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Ok(v) = env::var("OLLAMA_MODEL") {
            self.ai.model = v;
        }
        if let Some(v) = parsed("AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = v;
        }

        if let Ok(v) = env::var("LOTTO_API_URL") {
            self.draw_source.lotto_url = v;
        }
        if let Ok(v) = env::var("PENSION_API_URL") {
            self.draw_source.pension_url = v;
        }

        // Telegram
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Ok(v) = env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }

        if let Some(v) = parsed("SCHEDULER_ENABLED") {
            self.scheduler.enabled = v;
        }
        if let Ok(v) = env::var("SCHEDULER_TIMEZONE") {
            self.scheduler.timezone = v;
        }

        if let Some(v) = parsed("RECOMMEND_EXCLUDE_COUNT") {
            self.recommendation.exclude_count = v;
        }
        if let Some(v) = parsed("PENSION_RANKS") {
            self.recommendation.pension_ranks = v;
        }

        if let Ok(v) = env::var("RANDOM_SEED")
            && let Ok(seed) = v.parse()
        {
            self.random.seed = Some(seed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "memory://"
            max_connections = 1

            [recommendation]
            pension_ranks = 2
            "#,
        )
        .unwrap();

        assert!(config.database.is_in_memory());
        assert_eq!(config.ai.model, "llama3.2:8b");
        assert_eq!(config.ai.timeout_secs, 60);
        assert_eq!(config.scheduler.lotto_generate, "MON 12:30");
        assert_eq!(config.recommendation.exclude_count, 20);
        assert_eq!(config.recommendation.pension_ranks, 2);
        assert_eq!(config.random.seed, None);
    }
}
