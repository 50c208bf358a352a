//! Workbench - 视频生成与理解工作台
//!
//! 启动流程：加载配置 → 初始化日志 → 创建适配器 → 注册模块 → 启动 HTTP 服务

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use workbench::application::{
    ArkApiPort, Module, ModuleManager, ObjectStoragePort, ReferenceImageModule, TextToVideoModule,
    VideoComprehensionModule,
};
use workbench::config::{load_blocked_ips, load_config, print_config, AppConfig};
use workbench::infrastructure::adapters::{HttpArkClient, HttpArkClientConfig, TosutilStorage};
use workbench::infrastructure::http::{AppState, HttpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Workbench - 视频生成与理解工作台");
    print_config(&config);

    let manager = build_manager(&config)?;

    let blocked_ips = load_blocked_ips(&config.security.block_list_path);
    if !blocked_ips.is_empty() {
        tracing::info!(count = blocked_ips.len(), "Loaded IP block list");
    }

    let state = AppState::new(manager, blocked_ips);
    let server = HttpServer::new(&config.server, config.limits.body_limit_bytes(), state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},workbench={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn ark_client(endpoint: &str, timeout_secs: u64) -> anyhow::Result<Arc<dyn ArkApiPort>> {
    let client = HttpArkClient::new(HttpArkClientConfig::new(endpoint, timeout_secs))
        .map_err(|e| anyhow::anyhow!("Failed to create Ark client for {}: {}", endpoint, e))?;
    Ok(Arc::new(client))
}

/// 创建并注册全部模块，路由冲突直接终止启动
fn build_manager(config: &AppConfig) -> anyhow::Result<ModuleManager> {
    let storage: Arc<dyn ObjectStoragePort> = Arc::new(TosutilStorage::new(&config.tos, true));

    let reference_image = ReferenceImageModule::new(
        &config.api,
        &config.limits,
        config.log_switches(ReferenceImageModule::NAME),
        ark_client(&config.api.endpoint, config.api.timeout)?,
        storage.clone(),
    );
    let text_to_video = TextToVideoModule::new(
        &config.text_to_video,
        &config.limits,
        config.log_switches(TextToVideoModule::NAME),
        ark_client(&config.text_to_video.endpoint, config.text_to_video.timeout)?,
        storage.clone(),
    );
    let video_comprehension = VideoComprehensionModule::new(
        &config.video_comprehension,
        &config.limits,
        config.log_switches(VideoComprehensionModule::NAME),
        ark_client(
            &config.video_comprehension.endpoint,
            config.video_comprehension.timeout,
        )?,
        storage,
    );

    let mut manager = ModuleManager::new();
    let modules: [Arc<dyn Module>; 3] = [
        Arc::new(reference_image),
        Arc::new(text_to_video),
        Arc::new(video_comprehension),
    ];
    for module in modules {
        if let Err(e) = manager.register_module(module) {
            tracing::error!(error = %e, "Module registration failed");
            return Err(e.into());
        }
    }

    tracing::info!(
        modules = ?manager.module_names(),
        routes = manager.route_count(),
        "Modules registered"
    );

    Ok(manager)
}
