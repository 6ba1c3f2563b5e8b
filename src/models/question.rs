use serde::{Deserialize, Serialize};

/// 题目分类标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionTag {
    /// 岗位相关技术题
    Technical,
    /// 通用能力题（所有岗位共享）
    General,
}

impl std::fmt::Display for QuestionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionTag::Technical => write!(f, "Technical"),
            QuestionTag::General => write!(f, "General"),
        }
    }
}

/// 单选题
///
/// 生成后不再修改。旧版题库没有 `tag` 字段，读入后为 `None`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "q")]
    pub text: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<QuestionTag>,
}

impl Question {
    /// 从生成器的原始输出构建题目
    ///
    /// 选项少于 2 个、或答案不在选项中时返回 `None`
    pub fn from_raw(raw: RawQuestion, tag: QuestionTag) -> Option<Self> {
        let text = raw.q.trim().to_string();
        let options: Vec<String> = raw
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        let answer = raw.answer.trim().to_string();

        if text.is_empty() || options.len() < 2 {
            return None;
        }
        if !options.iter().any(|o| o == &answer) {
            return None;
        }

        Some(Self {
            text,
            options,
            answer,
            tag: Some(tag),
        })
    }

    pub fn is_tagged(&self, tag: QuestionTag) -> bool {
        self.tag == Some(tag)
    }
}

/// 题目生成器返回的原始题目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: String,
}
