use tracing::info;
/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 默认 `info`，可通过 `RUST_LOG` 覆盖；重复调用无副作用
pub fn init() {
    init_with_default("info");
}

/// 以指定默认级别初始化日志
pub fn init_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 当前配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 在线测评系统启动");
    info!("📂 数据目录: {}", config.data_dir);
    info!(
        "🔑 访问码有效期: {} 小时 | 🚨 警告上限: {} 次",
        config.credential_ttl_hours, config.warn_threshold
    );
    info!(
        "📋 抽题: 技术 {} 道 + 通用 {} 道 | 考试时长 {} 分钟",
        config.n_technical, config.n_general, config.exam_duration_minutes
    );
    info!("🤖 LLM 模型: {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
