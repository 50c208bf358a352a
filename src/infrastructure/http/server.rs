//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::{blocked_ip_middleware, error_logging_middleware};
use super::routes::create_routes;
use super::state::AppState;
use crate::config::{ServerConfig, StaticFilesConfig};

/// HTTP 服务器
pub struct HttpServer {
    addr: String,
    static_files: StaticFilesConfig,
    body_limit: usize,
    state: Arc<AppState>,
}

impl HttpServer {
    /// `body_limit` 为请求体字节上限，覆盖最大的视频上传
    pub fn new(config: &ServerConfig, body_limit: usize, state: AppState) -> Self {
        Self {
            addr: config.addr(),
            static_files: config.static_files.clone(),
            body_limit,
            state: Arc::new(state),
        }
    }

    /// 构建 Router
    pub fn build_router(&self) -> Router {
        // CORS 配置 - 允许所有来源的跨域请求
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600));

        // 黑名单在最外层，CORS 预检也会被拦截
        create_routes(&self.static_files)
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(middleware::from_fn(error_logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                blocked_ip_middleware,
            ))
            .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        let listener = TcpListener::bind(&self.addr).await?;
        info!(
            addr = %self.addr,
            modules = ?self.state.manager.module_names(),
            blocked_ips = self.state.blocked_ips.len(),
            "Starting HTTP server (with graceful shutdown)"
        );

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await?;

        Ok(())
    }
}
