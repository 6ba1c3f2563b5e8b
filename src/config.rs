use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 数据根目录
    pub data_dir: String,
    /// 申请记录文件（相对 data_dir）
    pub ledger_file: String,
    /// 题库目录（相对 data_dir）
    pub questions_dir: String,
    /// 通知发件箱文件（相对 data_dir）
    pub outbox_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 访问码 ---
    pub credential_ttl_hours: i64,
    pub secret_length: usize,
    // --- 违规检测 ---
    pub debounce_secs: i64,
    pub warn_threshold: u32,
    pub frame_stride: u64,
    pub look_left_ratio: f32,
    pub look_right_ratio: f32,
    // --- 题库 ---
    pub n_technical: usize,
    pub n_general: usize,
    pub general_batch_size: usize,
    pub technical_batch_size: usize,
    // --- 考试 ---
    pub aptitude_threshold: u32,
    /// 仅在规则页展示，不做计时
    pub exam_duration_minutes: u32,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            ledger_file: "applications.json".to_string(),
            questions_dir: "questions".to_string(),
            outbox_file: "outbox.txt".to_string(),
            verbose_logging: false,
            credential_ttl_hours: 30,
            secret_length: 6,
            debounce_secs: 4,
            warn_threshold: 5,
            frame_stride: 2,
            look_left_ratio: 0.5,
            look_right_ratio: 2.0,
            n_technical: 25,
            n_general: 15,
            general_batch_size: 10,
            technical_batch_size: 15,
            aptitude_threshold: 25,
            exam_duration_minutes: 45,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    /// 只从环境变量读取（未设置的项使用默认值）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 读取 TOML 配置文件，再用环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            data_dir: env_string("PROCTOR_DATA_DIR").unwrap_or(self.data_dir),
            ledger_file: env_string("PROCTOR_LEDGER_FILE").unwrap_or(self.ledger_file),
            questions_dir: env_string("PROCTOR_QUESTIONS_DIR").unwrap_or(self.questions_dir),
            outbox_file: env_string("PROCTOR_OUTBOX_FILE").unwrap_or(self.outbox_file),
            verbose_logging: env_parsed("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            credential_ttl_hours: env_parsed("CREDENTIAL_TTL_HOURS").unwrap_or(self.credential_ttl_hours),
            secret_length: env_parsed("SECRET_LENGTH").unwrap_or(self.secret_length),
            debounce_secs: env_parsed("DEBOUNCE_SECS").unwrap_or(self.debounce_secs),
            warn_threshold: env_parsed("WARN_THRESHOLD").unwrap_or(self.warn_threshold),
            frame_stride: env_parsed("FRAME_STRIDE").unwrap_or(self.frame_stride),
            look_left_ratio: env_parsed("LOOK_LEFT_RATIO").unwrap_or(self.look_left_ratio),
            look_right_ratio: env_parsed("LOOK_RIGHT_RATIO").unwrap_or(self.look_right_ratio),
            n_technical: env_parsed("N_TECHNICAL").unwrap_or(self.n_technical),
            n_general: env_parsed("N_GENERAL").unwrap_or(self.n_general),
            general_batch_size: env_parsed("GENERAL_BATCH_SIZE").unwrap_or(self.general_batch_size),
            technical_batch_size: env_parsed("TECHNICAL_BATCH_SIZE").unwrap_or(self.technical_batch_size),
            aptitude_threshold: env_parsed("APTITUDE_THRESHOLD").unwrap_or(self.aptitude_threshold),
            exam_duration_minutes: env_parsed("EXAM_DURATION_MINUTES").unwrap_or(self.exam_duration_minutes),
            llm_api_key: env_string("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.ledger_file)
    }

    pub fn questions_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.questions_dir)
    }

    pub fn outbox_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.outbox_file)
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            debounce: chrono::Duration::seconds(self.debounce_secs),
            frame_stride: self.frame_stride.max(1),
            look_left_ratio: self.look_left_ratio,
            look_right_ratio: self.look_right_ratio,
        }
    }

    pub fn sampling_settings(&self) -> SamplingSettings {
        SamplingSettings {
            n_technical: self.n_technical,
            n_general: self.n_general,
            general_batch_size: self.general_batch_size,
            technical_batch_size: self.technical_batch_size,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            warn_threshold: self.warn_threshold,
            aptitude_threshold: self.aptitude_threshold,
            exam_duration_minutes: self.exam_duration_minutes,
            detector: self.detector_settings(),
        }
    }
}

/// 违规检测参数
#[derive(Clone, Debug)]
pub struct DetectorSettings {
    /// 两次计数警告之间的最小间隔
    pub debounce: chrono::Duration,
    /// 每隔多少帧分析一次
    pub frame_stride: u64,
    pub look_left_ratio: f32,
    pub look_right_ratio: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Config::default().detector_settings()
    }
}

/// 题库生成与抽题参数
#[derive(Clone, Debug)]
pub struct SamplingSettings {
    pub n_technical: usize,
    pub n_general: usize,
    pub general_batch_size: usize,
    pub technical_batch_size: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Config::default().sampling_settings()
    }
}

/// 考试会话参数
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub warn_threshold: u32,
    pub aptitude_threshold: u32,
    pub exam_duration_minutes: u32,
    pub detector: DetectorSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Config::default().session_settings()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_exam_rules() {
        let config = Config::default();
        assert_eq!(config.credential_ttl_hours, 30);
        assert_eq!(config.warn_threshold, 5);
        assert_eq!(config.n_technical + config.n_general, 40);
        assert_eq!(config.detector_settings().debounce, chrono::Duration::seconds(4));
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proctor.toml");
        std::fs::write(&path, "data_dir = \"/tmp/exam\"\nn_general = 10\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_dir, "/tmp/exam");
        assert_eq!(config.n_general, 10);
        // 未写的项保持默认
        assert_eq!(config.n_technical, 25);
    }

    #[test]
    fn test_load_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "n_general = \"many\"").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::TomlParse { .. })));
    }
}
