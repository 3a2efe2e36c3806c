use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use scheduling_cell::router::scheduling_routes;
use scheduling_cell::SchedulingEngine;
use shared_config::AppConfig;

pub fn create_router(engine: Arc<SchedulingEngine>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .merge(scheduling_routes(engine, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use scheduling_cell::{MemoryLedger, SystemClock};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_and_protected_routes() {
        let config = Arc::new(AppConfig {
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            supabase_jwt_secret: "secret".to_string(),
            port: 0,
            scheduling: Default::default(),
        });
        let engine = SchedulingEngine::new(
            &config.scheduling,
            Arc::new(MemoryLedger::new()),
            Arc::new(SystemClock),
        )
        .unwrap();
        let app = create_router(Arc::new(engine), config);

        let root = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(root.status(), StatusCode::OK);

        let bookings = app
            .oneshot(Request::builder().uri("/client/bookings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(bookings.status(), StatusCode::UNAUTHORIZED);
    }
}
