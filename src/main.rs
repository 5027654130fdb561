use clap::Parser;
use question_patch::app::server;
use question_patch::core::ConfigProvider;
use question_patch::utils::{logger, validation::Validate};
use question_patch::{CliConfig, TomlConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    match cli.config.clone() {
        Some(path) => {
            // 載入 TOML 配置，命令列參數優先
            let config = match TomlConfig::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            };
            let config = config.with_overrides(cli.bind.as_deref(), cli.database_url.as_deref());

            init_logging(&config, cli.verbose, config.log_level());
            tracing::info!("📁 Loaded configuration from: {}", path);
            run(config).await
        }
        None => {
            init_logging(&cli, cli.verbose, None);
            run(cli).await
        }
    }
}

fn init_logging<C: ConfigProvider>(config: &C, verbose: bool, level: Option<&str>) {
    if config.json_logs() {
        logger::init_json_logger(verbose, level);
    } else {
        logger::init_cli_logger(verbose, level);
    }
}

async fn run<C: ConfigProvider + Validate>(config: C) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting question-patch");

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let handler = match server::build_handler(&config).await {
        Ok(handler) => handler,
        Err(e) => {
            tracing::error!("❌ Failed to open database: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    server::serve(listener, handler, server::shutdown_signal()).await?;
    Ok(())
}
