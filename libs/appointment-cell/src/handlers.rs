// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::scheduling::{Booking, BookingStatus};
use shared_utils::extractor::user_uuid;

use crate::models::{BookingListQuery, CreateBookingRequest, UpdateBookingStatusRequest};
use crate::services::BookingCoordinator;

fn can_view(user: &User, booking: &Booking) -> bool {
    user.is_admin()
        || user.id == booking.patient_id.to_string()
        || user.id == booking.doctor_id.to_string()
}

// Doctors and admins drive the lifecycle; a patient may only cancel.
fn can_set_status(user: &User, booking: &Booking, status: BookingStatus) -> bool {
    if user.is_admin() || user.id == booking.doctor_id.to_string() {
        return true;
    }
    user.id == booking.patient_id.to_string() && status == BookingStatus::Cancelled
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    // The authenticated caller is the patient
    let patient_id = user_uuid(&user)?;

    let coordinator = BookingCoordinator::new(&state);
    let booking = coordinator.create_booking(patient_id, request).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

#[axum::debug_handler]
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let coordinator = BookingCoordinator::new(&state);

    let booking = coordinator.get_booking(booking_id).await?;
    if !can_view(&user, &booking) {
        return Err(AppError::NotFound("Booking not found".to_string()));
    }
    if !can_set_status(&user, &booking, request.status) {
        return Err(AppError::Forbidden(format!(
            "Not authorized to set booking status to {}",
            request.status
        )));
    }

    let updated = coordinator.update_status(booking_id, request.status).await?;

    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Booking>, AppError> {
    let coordinator = BookingCoordinator::new(&state);

    let booking = coordinator.get_booking(booking_id).await?;
    if !can_view(&user, &booking) {
        return Err(AppError::NotFound("Booking not found".to_string()));
    }

    Ok(Json(booking))
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let coordinator = BookingCoordinator::new(&state);

    let bookings = if user.is_doctor() {
        coordinator.list_doctor_bookings(user_id, query.date).await?
    } else {
        let mut own = coordinator.list_patient_bookings(user_id).await?;
        if let Some(date) = query.date {
            own.retain(|b| b.date == date);
        }
        own
    };

    Ok(Json(json!({
        "bookings": bookings,
        "total": bookings.len()
    })))
}
