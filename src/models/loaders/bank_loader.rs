use crate::error::PersistenceError;
use crate::models::question::Question;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 题库文件路径：`<dir>/<job_id>.json`
pub fn bank_path(dir: &Path, job_id: &str) -> PathBuf {
    dir.join(format!("{}.json", job_id))
}

/// 读取题库文件
///
/// 文件不存在时返回 `Ok(None)`
pub async fn load_bank(path: &Path) -> Result<Option<Vec<Question>>, PersistenceError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistenceError::io(path.display().to_string(), e)),
    };

    let questions: Vec<Question> = serde_json::from_str(&content)
        .map_err(|e| PersistenceError::serialize(path.display().to_string(), e))?;

    Ok(Some(questions))
}

/// 写入题库文件（先写临时文件再改名）
pub async fn save_bank(path: &Path, questions: &[Question]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PersistenceError::io(parent.display().to_string(), e))?;
    }

    let json = serde_json::to_string_pretty(questions)
        .map_err(|e| PersistenceError::serialize(path.display().to_string(), e))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .await
        .map_err(|e| PersistenceError::io(tmp_path.display().to_string(), e))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PersistenceError::io(path.display().to_string(), e))?;

    Ok(())
}

/// 列出目录下所有题库的 job_id
pub async fn list_banks(dir: &Path) -> Result<Vec<String>, PersistenceError> {
    if !dir.exists() {
        tracing::warn!("题库目录不存在: {}", dir.display());
        return Ok(Vec::new());
    }

    let mut job_ids = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| PersistenceError::io(dir.display().to_string(), e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PersistenceError::io(dir.display().to_string(), e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                job_ids.push(stem.to_string());
            }
        }
    }

    job_ids.sort();
    Ok(job_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionTag;

    fn question(text: &str) -> Question {
        Question {
            text: text.to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            answer: "a".to_string(),
            tag: Some(QuestionTag::Technical),
        }
    }

    #[tokio::test]
    async fn test_missing_bank_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_bank(&bank_path(dir.path(), "nobody")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = bank_path(dir.path(), "acme_backend");
        save_bank(&path, &[question("Q1"), question("Q2")]).await.unwrap();

        let loaded = load_bank(&path).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(list_banks(dir.path()).await.unwrap(), vec!["acme_backend"]);
    }

    #[tokio::test]
    async fn test_corrupt_bank_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = bank_path(dir.path(), "broken");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_bank(&path).await,
            Err(PersistenceError::Serialize { .. })
        ));
    }
}
