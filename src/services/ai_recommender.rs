//! AI 推荐号码
//!
//! 文本生成服务返回的内容不可信：先用正则截取 JSON，再逐组校验，
//! 不合格或缺失的组用随机号码补齐，保证总是返回 `count` 组合法号码。

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::error::AppResult;
use crate::models::{LOTTO_MAX_NUMBER, LOTTO_MIN_NUMBER, LOTTO_SET_SIZE, LottoDraw};
use crate::utils::{SharedRng, random_lotto_set};

pub const MAX_PROMPT_DRAWS: usize = 10;

pub const DEFAULT_AI_REASONING: &str = "AI recommendation";
pub const REASON_UNAVAILABLE: &str = "AI server unavailable, generated randomly";
pub const REASON_INVALID: &str = "AI response invalid, generated randomly";
pub const REASON_NO_HISTORY: &str = "Not enough draw history, generated randomly";

static RECOMMENDATIONS_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{[\s\S]*"recommendations"[\s\S]*\}"#).expect("valid recommendations regex")
});

/// 外部文本生成服务
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// 单组号码的校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValidation {
    Valid { numbers: Vec<i32>, reasoning: String },
    Invalid(String),
}

/// 一组 AI 推荐（或其随机替代）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiPick {
    /// 升序
    pub numbers: Vec<i32>,
    pub reasoning: String,
    /// false 表示随机补齐
    pub from_model: bool,
}

/// 截取包含 `recommendations` 的最外层 JSON 片段
pub fn extract_json(text: &str) -> Option<&str> {
    RECOMMENDATIONS_JSON.find(text).map(|m| m.as_str())
}

/// 校验一组推荐：6 个互不相同的整数，均在 1..=45
pub fn validate_set(value: &Value) -> SetValidation {
    let Some(raw) = value.get("numbers").and_then(Value::as_array) else {
        return SetValidation::Invalid("numbers is missing or not an array".to_string());
    };
    if raw.len() != LOTTO_SET_SIZE {
        return SetValidation::Invalid(format!("expected 6 numbers, got {}", raw.len()));
    }

    let mut numbers = Vec::with_capacity(LOTTO_SET_SIZE);
    for v in raw {
        let Some(n) = v.as_i64() else {
            return SetValidation::Invalid(format!("{v} is not an integer"));
        };
        if n < LOTTO_MIN_NUMBER as i64 || n > LOTTO_MAX_NUMBER as i64 {
            return SetValidation::Invalid(format!("{n} is out of range"));
        }
        numbers.push(n as i32);
    }

    let distinct: HashSet<i32> = numbers.iter().copied().collect();
    if distinct.len() != LOTTO_SET_SIZE {
        return SetValidation::Invalid("numbers are not distinct".to_string());
    }

    numbers.sort_unstable();
    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_AI_REASONING)
        .to_string();

    SetValidation::Valid { numbers, reasoning }
}

/// 解析模型输出，恰好返回 `count` 个校验结果；缺失的组记为 Invalid
pub fn parse_recommendations(text: &str, count: usize) -> Vec<SetValidation> {
    let missing = |reason: &str| vec![SetValidation::Invalid(reason.to_string()); count];

    let Some(json) = extract_json(text) else {
        return missing("no JSON found in response");
    };
    let parsed: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => return missing(&format!("malformed JSON: {e}")),
    };
    let Some(items) = parsed.get("recommendations").and_then(Value::as_array) else {
        return missing("recommendations is not an array");
    };

    (0..count)
        .map(|i| match items.get(i) {
            Some(item) => validate_set(item),
            None => SetValidation::Invalid("set missing from response".to_string()),
        })
        .collect()
}

pub fn build_prompt(recent: &[LottoDraw], count: usize) -> String {
    let draws_text = recent
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let numbers: Vec<String> = d.numbers.iter().map(i32::to_string).collect();
            format!(
                "{}. Draw {}: {} + bonus: {}",
                i + 1,
                d.id,
                numbers.join(", "),
                d.bonus_number
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert analyst of 6/45 lottery numbers.

[Recent winning numbers]
{draws_text}

Analyse the data above and recommend {count} sets of 6 numbers likely to appear in the next draw.

Each set must contain 6 distinct numbers between 1 and 45.
Briefly explain why you chose each set.

Respond ONLY with JSON in exactly this format:
{{
  "recommendations": [
    {{
      "numbers": [1, 2, 3, 4, 5, 6],
      "reasoning": "why these numbers"
    }}
  ]
}}"#
    )
}

#[derive(Clone)]
pub struct AiRecommender {
    /// None 表示 AI 已在配置中关闭
    generator: Option<Arc<dyn TextGenerator>>,
    rng: SharedRng,
    timeout: Duration,
}

impl AiRecommender {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        rng: SharedRng,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            rng,
            timeout,
        }
    }

    pub async fn is_available(&self) -> bool {
        match &self.generator {
            Some(g) => g.is_available().await,
            None => false,
        }
    }

    fn fallback(&self, reasoning: &str) -> AiPick {
        AiPick {
            numbers: self.rng.with(random_lotto_set),
            reasoning: reasoning.to_string(),
            from_model: false,
        }
    }

    fn fallback_all(&self, count: usize, reasoning: &str) -> Vec<AiPick> {
        (0..count).map(|_| self.fallback(reasoning)).collect()
    }

    /// 根据最近开奖（最新在前）请求 `count` 组推荐
    pub async fn recommend(&self, recent: &[LottoDraw], count: usize) -> Vec<AiPick> {
        if count == 0 {
            return vec![];
        }
        log::info!("Generating {count} AI recommendations");

        if recent.is_empty() {
            log::warn!("No draws provided, generating random numbers");
            return self.fallback_all(count, REASON_NO_HISTORY);
        }

        let Some(generator) = &self.generator else {
            log::info!("AI recommendations disabled, generating random numbers");
            return self.fallback_all(count, REASON_UNAVAILABLE);
        };

        if !generator.is_available().await {
            log::warn!("AI server not available, returning random numbers");
            return self.fallback_all(count, REASON_UNAVAILABLE);
        }

        let recent = &recent[..recent.len().min(MAX_PROMPT_DRAWS)];
        let prompt = build_prompt(recent, count);

        let text = match tokio::time::timeout(self.timeout, generator.generate(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                log::error!("Failed to get AI recommendation: {e}");
                return self.fallback_all(count, REASON_UNAVAILABLE);
            }
            Err(_) => {
                log::error!("AI recommendation timed out after {:?}", self.timeout);
                return self.fallback_all(count, REASON_UNAVAILABLE);
            }
        };

        parse_recommendations(&text, count)
            .into_iter()
            .enumerate()
            .map(|(i, validation)| match validation {
                SetValidation::Valid { numbers, reasoning } => AiPick {
                    numbers,
                    reasoning,
                    from_model: true,
                },
                SetValidation::Invalid(reason) => {
                    log::warn!("AI set {} rejected: {reason}", i + 1);
                    self.fallback(REASON_INVALID)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::is_valid_lotto_set;
    use chrono::NaiveDate;
    use serde_json::json;

    enum Behaviour {
        Unreachable,
        Fails,
        Replies(&'static str),
        Hangs,
    }

    struct FakeGenerator(Behaviour);

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn is_available(&self) -> bool {
            !matches!(self.0, Behaviour::Unreachable)
        }

        async fn generate(&self, _prompt: &str) -> AppResult<String> {
            match &self.0 {
                Behaviour::Unreachable | Behaviour::Fails => {
                    Err(AppError::ExternalApiError("connection refused".into()))
                }
                Behaviour::Replies(text) => Ok(text.to_string()),
                Behaviour::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn recommender(behaviour: Behaviour) -> AiRecommender {
        AiRecommender::new(
            Some(Arc::new(FakeGenerator(behaviour))),
            SharedRng::from_seed(Some(11)),
            Duration::from_millis(50),
        )
    }

    fn history() -> Vec<LottoDraw> {
        (1..=12)
            .rev()
            .map(|id| LottoDraw {
                id,
                draw_date: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
                numbers: vec![1, 2, 3, 4, 5, 6],
                bonus_number: 7,
                prize_tiers: vec![],
            })
            .collect()
    }

    fn assert_all_valid(picks: &[AiPick], count: usize) {
        assert_eq!(picks.len(), count);
        for p in picks {
            assert!(is_valid_lotto_set(&p.numbers), "{:?}", p.numbers);
            assert!(p.numbers.windows(2).all(|w| w[0] < w[1]));
            assert!(!p.reasoning.is_empty());
        }
    }

    #[test]
    fn validates_individual_sets() {
        assert_eq!(
            validate_set(&json!({"numbers": [45, 1, 2, 3, 4, 5], "reasoning": "hot"})),
            SetValidation::Valid {
                numbers: vec![1, 2, 3, 4, 5, 45],
                reasoning: "hot".into()
            }
        );
        assert!(matches!(
            validate_set(&json!({"numbers": [1, 2, 3, 4, 5]})),
            SetValidation::Invalid(_)
        ));
        assert!(matches!(
            validate_set(&json!({"numbers": [1, 1, 2, 3, 4, 5]})),
            SetValidation::Invalid(_)
        ));
        assert!(matches!(
            validate_set(&json!({"numbers": [0, 1, 2, 3, 4, 5]})),
            SetValidation::Invalid(_)
        ));
        assert!(matches!(
            validate_set(&json!({"numbers": [1.5, 2, 3, 4, 5, 6]})),
            SetValidation::Invalid(_)
        ));
        assert!(matches!(
            validate_set(&json!({"numbers": ["1", 2, 3, 4, 5, 6]})),
            SetValidation::Invalid(_)
        ));
        match validate_set(&json!({"numbers": [1, 2, 3, 4, 5, 6]})) {
            SetValidation::Valid { reasoning, .. } => assert_eq!(reasoning, DEFAULT_AI_REASONING),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extracts_json_embedded_in_prose() {
        let text = "Sure! Here you go:\n{\"recommendations\": []}\nGood luck.";
        assert_eq!(extract_json(text), Some("{\"recommendations\": []}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn prompt_lists_recent_draws() {
        let prompt = build_prompt(&history()[..2], 2);
        assert!(prompt.contains("1. Draw 12: 1, 2, 3, 4, 5, 6 + bonus: 7"));
        assert!(prompt.contains("recommend 2 sets"));
    }

    #[tokio::test]
    async fn unreachable_server_falls_back_to_random() {
        let picks = recommender(Behaviour::Unreachable)
            .recommend(&history(), 2)
            .await;
        assert_all_valid(&picks, 2);
        assert!(picks.iter().all(|p| !p.from_model && p.reasoning == REASON_UNAVAILABLE));
    }

    #[tokio::test]
    async fn generation_error_and_timeout_fall_back() {
        for behaviour in [Behaviour::Fails, Behaviour::Hangs] {
            let picks = recommender(behaviour).recommend(&history(), 3).await;
            assert_all_valid(&picks, 3);
            assert!(picks.iter().all(|p| !p.from_model));
        }
    }

    #[tokio::test]
    async fn malformed_json_falls_back() {
        let picks = recommender(Behaviour::Replies(
            "{\"recommendations\": [ {\"numbers\": [1,2,3 }",
        ))
        .recommend(&history(), 2)
        .await;
        assert_all_valid(&picks, 2);
        assert!(picks.iter().all(|p| p.reasoning == REASON_INVALID));
    }

    #[tokio::test]
    async fn partially_valid_response_keeps_good_sets() {
        let reply = r#"Here are my picks:
        {"recommendations": [
            {"numbers": [3, 11, 19, 27, 35, 43], "reasoning": "spread"},
            {"numbers": [1, 2, 3, 4, 5, 99], "reasoning": "bad"}
        ]}"#;
        let picks = recommender(Behaviour::Replies(reply))
            .recommend(&history(), 3)
            .await;
        assert_all_valid(&picks, 3);
        assert_eq!(picks[0].numbers, vec![3, 11, 19, 27, 35, 43]);
        assert_eq!(picks[0].reasoning, "spread");
        assert!(picks[0].from_model);
        assert!(!picks[1].from_model);
        assert!(!picks[2].from_model);
    }

    #[tokio::test]
    async fn no_history_and_disabled_generator() {
        let picks = recommender(Behaviour::Replies("{}")).recommend(&[], 2).await;
        assert_all_valid(&picks, 2);
        assert!(picks.iter().all(|p| p.reasoning == REASON_NO_HISTORY));

        let disabled = AiRecommender::new(None, SharedRng::from_seed(Some(1)), Duration::from_secs(1));
        assert!(!disabled.is_available().await);
        assert_all_valid(&disabled.recommend(&history(), 2).await, 2);
        assert!(disabled.recommend(&history(), 0).await.is_empty());
    }
}
