use anyhow::Result;
use proctor_exam::utils::logging;
use proctor_exam::{App, Command, Config};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 解析命令
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    // 加载配置：PROCTOR_CONFIG 指定 TOML 文件，否则只读环境变量
    let config = match std::env::var("PROCTOR_CONFIG") {
        Ok(path) => Config::load(&path)?,
        Err(_) => Config::from_env(),
    };

    // 初始化并运行应用
    App::initialize(config).await?.run(command).await?;

    Ok(())
}
