use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use parking_lot::Mutex;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use position::Sensor;
use realtime::ChangeFeed;
use session::SessionHandle;
use session::service::Background;
use store::LocationStore;

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod position;
pub mod proximity;
pub mod realtime;
pub mod result;
pub mod routes;
pub mod session;
pub mod store;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn LocationStore>,
    pub feed: Arc<dyn ChangeFeed>,
    pub sensor: Sensor,
    pub session: SessionHandle,
    pub background: Arc<Mutex<Option<Background>>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn LocationStore>, feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            config,
            store,
            feed,
            sensor: Sensor::new(),
            session: SessionHandle::new(),
            background: Arc::new(Mutex::new(None)),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/avatars", get(routes::session::avatars))
        .route("/session", get(routes::session::current))
        .route("/session/login", post(routes::session::login))
        .route("/session/leave", post(routes::session::leave))
        .route("/session/sos", post(routes::session::sos))
        .route("/session/report", post(routes::session::report))
        .route("/sensor/samples", post(routes::sensor::push_sample));

    // axum 不支持嵌套到根路径
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    with_layers(router.fallback(middleware::not_found)).with_state(state)
}

/// 全局中间件：panic 兜底、请求日志、5xx 记录和 CORS
pub fn with_layers(router: Router<AppState>) -> Router<AppState> {
    let router = router.layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(middleware::handle_panic))
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn(middleware::log_errors)),
    );

    // 开发模式下允许任意来源，方便界面层本地调试
    #[cfg(debug_assertions)]
    let router = router.layer(CorsLayer::permissive());

    #[cfg(not(debug_assertions))]
    let router = router.layer(CorsLayer::new());

    router
}
