//! HTTP Routes
//!
//! - /                                  GET   index.html
//! - /index.html                        GET   index.html
//! - /reference_image_gen_video.html    GET   frontend/reference_image_gen_video.html
//! - /gen_video.html                    GET   frontend/gen_video.html
//! - /video_comprehension.html          GET   frontend/video_comprehension.html
//! - /frontend/*, /static/*             GET   静态目录
//! - *.css / *.js / *.png / *.jpg / *.ico GET  静态根目录下的资源
//! - /api/ping                          GET   健康检查
//! - /api/modules                       GET   模块列表
//! - 其余路径                            *     交给 ModuleManager 分发

use std::path::Path;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::services::{ServeDir, ServeFile};

use super::handlers;
use super::middleware::static_asset_middleware;
use super::state::AppState;
use crate::config::StaticFilesConfig;

/// 前端页面：请求路径 → 相对静态根目录的文件
const PAGES: [(&str, &str); 5] = [
    ("/", "index.html"),
    ("/index.html", "index.html"),
    ("/reference_image_gen_video.html", "frontend/reference_image_gen_video.html"),
    ("/gen_video.html", "frontend/gen_video.html"),
    ("/video_comprehension.html", "frontend/video_comprehension.html"),
];

/// 创建所有路由
pub fn create_routes(static_files: &StaticFilesConfig) -> Router<Arc<AppState>> {
    let router = Router::new().nest("/api", api_routes());

    if !static_files.enabled {
        return router.fallback(handlers::dispatch);
    }

    router
        .merge(static_routes(&static_files.dir))
        .fallback(handlers::dispatch)
        .layer(middleware::from_fn_with_state(
            ServeDir::new(&static_files.dir),
            static_asset_middleware,
        ))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/modules", get(handlers::list_modules))
}

/// 静态页面与目录，路径穿越由 ServeDir 拒绝
fn static_routes(root: &Path) -> Router<Arc<AppState>> {
    let mut router = Router::new();
    for (path, file) in PAGES {
        router = router.route_service(path, ServeFile::new(root.join(file)));
    }

    router
        .nest_service("/frontend", ServeDir::new(root.join("frontend")))
        .nest_service("/static", ServeDir::new(root.join("static")))
}
