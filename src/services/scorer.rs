//! 判分服务 - 业务能力层
//!
//! 纯函数，无副作用

use std::collections::BTreeMap;

use crate::models::question::Question;

/// 模糊匹配要求两边都超过的最小字符数
const FUZZY_MIN_CHARS: usize = 5;

/// 判断所选选项是否正确
///
/// 1. 去掉首尾空白后完全相同 → 正确
/// 2. 否则两边都超过 5 个字符且一方包含另一方 → 正确
pub fn is_correct(chosen: &str, answer: &str) -> bool {
    let chosen = chosen.trim();
    let answer = answer.trim();

    if chosen == answer {
        return true;
    }

    chosen.chars().count() > FUZZY_MIN_CHARS
        && answer.chars().count() > FUZZY_MIN_CHARS
        && (chosen.contains(answer) || answer.contains(chosen))
}

/// 统计答对题数
pub fn score(questions: &[Question], answers: &BTreeMap<usize, String>) -> u32 {
    questions
        .iter()
        .enumerate()
        .filter(|(index, question)| {
            answers
                .get(index)
                .map(|chosen| is_correct(chosen, &question.answer))
                .unwrap_or(false)
        })
        .count() as u32
}
