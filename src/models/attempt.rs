use std::collections::BTreeMap;
use std::fmt::Display;

use super::question::Question;

/// 考试阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Login,
    Rules,
    Exam,
    Terminated,
    Submitted,
}

impl Stage {
    /// 终态只允许回到登录页
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Terminated | Stage::Submitted)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Login => "Login",
            Stage::Rules => "Rules",
            Stage::Exam => "Exam",
            Stage::Terminated => "Terminated",
            Stage::Submitted => "Submitted",
        };
        write!(f, "{}", name)
    }
}

/// 认证通过后得到的考试入口信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSeed {
    /// 申请记录 ID
    pub record_id: String,
    pub candidate_email: String,
    pub job_id: String,
}

impl Display for AttemptSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[候选人 {} 岗位 {}]", self.candidate_email, self.job_id)
    }
}

/// 一次考试
#[derive(Debug, Clone)]
pub struct ExamAttempt {
    pub seed: AttemptSeed,
    /// 进入 Exam 阶段时抽取一次，之后不再变化
    pub sampled_questions: Vec<Question>,
    /// 题号 → 所选选项
    pub answers: BTreeMap<usize, String>,
    pub raw_score: Option<u32>,
    pub warn_count_at_end: Option<u32>,
}

impl ExamAttempt {
    pub fn new(seed: AttemptSeed) -> Self {
        Self {
            seed,
            sampled_questions: Vec::new(),
            answers: BTreeMap::new(),
            raw_score: None,
            warn_count_at_end: None,
        }
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }
}
