use anyhow::Result;
use sign_flow::utils::logging;
use sign_flow::{App, Config};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：指定了 TOML 文件时使用文件，否则读取环境变量
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_toml_file(Path::new(&path))?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行启动维护
    let app = App::initialize(config).await?;
    app.run().await?;

    Ok(())
}
