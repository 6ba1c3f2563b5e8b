//! 题目生成服务 - 业务能力层
//!
//! 只负责"按主题生成一批单选题"，生成结果可能残缺或为空，
//! 由题库服务决定如何取舍。

use std::sync::OnceLock;

use futures::future::BoxFuture;
use regex::Regex;
use tracing::{debug, info};

use crate::clients::LlmClient;
use crate::config::Config;
use crate::error::LlmError;
use crate::models::question::RawQuestion;
use crate::utils::logging::truncate_text;

/// 题目生成接口
pub trait QuestionGenerator: Send + Sync {
    /// 生成一批题目
    ///
    /// # 参数
    /// - `topic`: 题目主题
    /// - `job_text`: 岗位描述（通用题为 `None`）
    /// - `count`: 希望生成的数量
    fn generate<'a>(
        &'a self,
        topic: &'a str,
        job_text: Option<&'a str>,
        count: usize,
    ) -> BoxFuture<'a, anyhow::Result<Vec<RawQuestion>>>;
}

/// 基于 LLM 的题目生成器
pub struct LlmQuestionGenerator {
    client: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: LlmClient::new(config),
        }
    }

    async fn generate_batch(
        &self,
        topic: &str,
        job_text: Option<&str>,
        count: usize,
    ) -> Result<Vec<RawQuestion>, LlmError> {
        info!("🤖 正在生成 {} 道题目: {}", count, topic);

        let prompt = build_prompt(topic, job_text, count);
        let system_message = "You are an assessment designer for technical hiring. \
                              You write unambiguous multiple-choice questions with exactly one correct option \
                              and reply with JSON only.";

        let response = self.client.chat(&prompt, Some(system_message)).await?;
        let questions = parse_question_list(&response)?;

        info!("✓ 生成完成: {} 道 ({})", questions.len(), topic);
        Ok(questions)
    }
}

impl QuestionGenerator for LlmQuestionGenerator {
    fn generate<'a>(
        &'a self,
        topic: &'a str,
        job_text: Option<&'a str>,
        count: usize,
    ) -> BoxFuture<'a, anyhow::Result<Vec<RawQuestion>>> {
        Box::pin(async move { Ok(self.generate_batch(topic, job_text, count).await?) })
    }
}

/// 构建生成提示词
fn build_prompt(topic: &str, job_text: Option<&str>, count: usize) -> String {
    let context = match job_text {
        Some(jd) => format!(
            "The questions must test skills required by this job description:\n\"\"\"\n{}\n\"\"\"\n",
            jd.trim()
        ),
        None => "The questions must not depend on any particular job or technology.\n".to_string(),
    };

    format!(
        r#"Write {count} multiple-choice questions on the topic: {topic}.
{context}
Rules:
- Each question has exactly 4 options.
- "answer" must be copied verbatim from "options".
- Do not number the options or prefix them with letters.

Reply with a JSON array only, in this shape:
[{{"q": "question text", "options": ["...", "...", "...", "..."], "answer": "..."}}]"#
    )
}

fn question_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("静态正则表达式"))
}

/// 从 LLM 回复中解析题目列表
///
/// 回复里可能带 ```json 代码块或前后说明文字，只截取第一个 `[` 到最后一个 `]`
pub fn parse_question_list(response: &str) -> Result<Vec<RawQuestion>, LlmError> {
    let json = question_list_regex()
        .find(response)
        .map(|m| m.as_str())
        .ok_or_else(|| LlmError::NoQuestionList {
            preview: truncate_text(response, 80),
        })?;

    let questions: Vec<RawQuestion> =
        serde_json::from_str(json).map_err(|source| LlmError::JsonParseFailed { source })?;

    debug!("解析到 {} 道原始题目", questions.len());
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Here you go:\n```json\n[{\"q\":\"2+2?\",\"options\":[\"3\",\"4\"],\"answer\":\"4\"}]\n```\nGood luck!";
        let questions = parse_question_list(reply).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "4");
    }

    #[test]
    fn test_parse_missing_fields_default() {
        let questions = parse_question_list(r#"[{"q":"no options"}]"#).unwrap();
        assert!(questions[0].options.is_empty());
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_question_list("Sorry, I cannot help with that."),
            Err(LlmError::NoQuestionList { .. })
        ));
        assert!(matches!(
            parse_question_list("[not json]"),
            Err(LlmError::JsonParseFailed { .. })
        ));
    }

    #[test]
    fn test_prompt_mentions_job_only_for_technical() {
        assert!(build_prompt("Rust", Some("Backend engineer"), 15).contains("Backend engineer"));
        assert!(build_prompt("Logical reasoning", None, 10).contains("must not depend"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_generate_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let generator = LlmQuestionGenerator::new(&Config::from_env());
        let questions = generator
            .generate("Quantitative aptitude", None, 3)
            .await
            .expect("生成失败");

        println!("{:#?}", questions);
        assert!(!questions.is_empty());
    }
}
