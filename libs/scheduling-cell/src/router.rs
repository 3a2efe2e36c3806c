// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::engine::SchedulingEngine;
use crate::handlers;

pub fn client_routes(engine: Arc<SchedulingEngine>, config: Arc<AppConfig>) -> Router {
    Router::new()
        // Provider directory
        .route("/providers", get(handlers::search_providers))
        .route("/specializations", get(handlers::list_specializations))
        .route("/providers/{provider_id}/slots", get(handlers::get_provider_slots))

        // Own bookings
        .route("/bookings", post(handlers::create_booking).get(handlers::list_bookings))
        .route(
            "/bookings/{appointment_id}",
            get(handlers::get_booking)
                .patch(handlers::update_booking)
                .delete(handlers::cancel_booking),
        )
        .route("/stats", get(handlers::get_client_stats))

        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(engine)
}

pub fn provider_routes(engine: Arc<SchedulingEngine>, config: Arc<AppConfig>) -> Router {
    Router::new()
        // Calendar
        .route("/slots", get(handlers::get_own_slots))
        .route("/blocks", post(handlers::create_block).get(handlers::list_blocks))
        .route("/blocks/{block_id}", delete(handlers::delete_block))

        // Appointments
        .route("/appointments", get(handlers::get_agenda))
        .route("/appointments/{appointment_id}/status", patch(handlers::update_appointment_status))

        // Reporting
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/report", get(handlers::get_report))

        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(engine)
}

/// Both route groups under `/client` and `/provider`.
pub fn scheduling_routes(engine: Arc<SchedulingEngine>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .nest("/client", client_routes(Arc::clone(&engine), Arc::clone(&config)))
        .nest("/provider", provider_routes(engine, config))
}
