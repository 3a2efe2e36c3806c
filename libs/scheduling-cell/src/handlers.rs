// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::auth::{Principal, Role};
use shared_models::error::AppError;

use crate::engine::SchedulingEngine;
use crate::models::{
    AppointmentId, BlockId, BlockRequest, BookAppointmentRequest, BookingPatch, Period,
    ProviderId, StatusUpdateRequest,
};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<Period>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSearchQuery {
    pub specialization: Option<String>,
}

// ==============================================================================
// CLIENT HANDLERS
// ==============================================================================

pub async fn search_providers(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ProviderSearchQuery>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Client)?;

    let specialization = query.specialization.unwrap_or_default();
    let providers = engine.providers_by_specialization(&specialization).await?;

    Ok(Json(json!({
        "success": true,
        "specialization": specialization,
        "total": providers.len(),
        "providers": providers
    })))
}

pub async fn list_specializations(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Client)?;

    let specializations = engine.specializations().await?;

    Ok(Json(json!({
        "success": true,
        "specializations": specializations
    })))
}

/// Free slots for a provider on a date, as a client sees them.
pub async fn get_provider_slots(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Path(provider_id): Path<ProviderId>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    principal.require(Role::Client)?;

    let date = query
        .date
        .ok_or_else(|| AppError::ValidationError("date query parameter is required".to_string()))?;
    let view = engine.client_availability(provider_id, date).await?;

    Ok(Json(json!({
        "success": true,
        "availability": view
    })))
}

#[axum::debug_handler]
pub async fn create_booking(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let client_id = principal.require(Role::Client)?;

    let appointment = engine
        .create_booking(
            client_id,
            request.provider_id,
            request.appointment_date,
            request.appointment_time,
            request.reason_for_visit,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

pub async fn list_bookings(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let client_id = principal.require(Role::Client)?;

    let bookings = engine.list_client_bookings(client_id).await?;

    Ok(Json(json!({
        "success": true,
        "bookings": bookings
    })))
}

pub async fn get_booking(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<AppointmentId>,
) -> Result<Json<Value>, AppError> {
    let client_id = principal.require(Role::Client)?;

    let appointment = engine.get_client_booking(client_id, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_booking(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<AppointmentId>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Value>, AppError> {
    let client_id = principal.require(Role::Client)?;

    let appointment = engine.update_booking(client_id, appointment_id, patch).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

pub async fn cancel_booking(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<AppointmentId>,
) -> Result<Json<Value>, AppError> {
    let client_id = principal.require(Role::Client)?;

    engine.cancel_booking(client_id, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully"
    })))
}

pub async fn get_client_stats(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let client_id = principal.require(Role::Client)?;

    let stats = engine.client_stats(client_id).await?;

    Ok(Json(json!({
        "success": true,
        "stats": stats
    })))
}

// ==============================================================================
// PROVIDER HANDLERS
// ==============================================================================

pub async fn get_own_slots(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let provider_id = principal.require(Role::Provider)?;

    let date = query.date.unwrap_or_else(|| engine.today());
    let view = engine.generate_availability(provider_id, date).await?;

    Ok(Json(json!({
        "success": true,
        "availability": view
    })))
}

#[axum::debug_handler]
pub async fn create_block(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BlockRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let provider_id = principal.require(Role::Provider)?;

    let block = engine
        .create_block(provider_id, request.block_date, request.spec, request.reason)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "block": block,
            "message": "Time blocked successfully"
        })),
    ))
}

pub async fn list_blocks(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let provider_id = principal.require(Role::Provider)?;

    let blocks = engine.list_blocks(provider_id).await?;

    Ok(Json(json!({
        "success": true,
        "total": blocks.len(),
        "blocks": blocks
    })))
}

pub async fn delete_block(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Path(block_id): Path<BlockId>,
) -> Result<Json<Value>, AppError> {
    let provider_id = principal.require(Role::Provider)?;

    engine.delete_block(provider_id, block_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Blocked time removed successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<AppointmentId>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let provider_id = principal.require(Role::Provider)?;

    let appointment = engine
        .set_appointment_status(provider_id, appointment_id, request.status, request.notes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment marked as {}", appointment.status)
    })))
}

pub async fn get_agenda(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let provider_id = principal.require(Role::Provider)?;

    let agenda = engine
        .provider_agenda(provider_id, query.period.unwrap_or_default())
        .await?;

    Ok(Json(json!({
        "success": true,
        "agenda": agenda
    })))
}

pub async fn get_dashboard(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let provider_id = principal.require(Role::Provider)?;

    let dashboard = engine.provider_dashboard(provider_id).await?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

pub async fn get_report(
    State(engine): State<Arc<SchedulingEngine>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let provider_id = principal.require(Role::Provider)?;

    let report = engine
        .get_period_report(provider_id, query.period.unwrap_or_default())
        .await?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}
