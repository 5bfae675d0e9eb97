// libs/appointment-cell/src/services/coordinator.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::AvailabilityService;
use shared_database::{with_timeout, AppState, BookingStore, StoreError};
use shared_models::scheduling::{Booking, BookingStatus};

use crate::models::{BookingError, CreateBookingRequest, MAX_REASON_LENGTH};
use crate::services::lifecycle::BookingLifecycleService;

/// Compare-and-set rounds before a status update gives up on a booking that
/// keeps changing underneath it.
const MAX_STATUS_ATTEMPTS: usize = 3;

/// The only writer of bookings. Slot uniqueness is delegated to the booking
/// store's atomic insert; no lock is held across store calls.
pub struct BookingCoordinator {
    availability: AvailabilityService,
    bookings: Arc<dyn BookingStore>,
    lifecycle: BookingLifecycleService,
    timeout: Duration,
    requires_approval: bool,
}

impl BookingCoordinator {
    pub fn new(state: &AppState) -> Self {
        Self::with_parts(
            AvailabilityService::new(state),
            state.bookings.clone(),
            state.config.store_timeout(),
            state.config.booking_requires_approval,
        )
    }

    pub fn with_parts(
        availability: AvailabilityService,
        bookings: Arc<dyn BookingStore>,
        timeout: Duration,
        requires_approval: bool,
    ) -> Self {
        Self {
            availability,
            bookings,
            lifecycle: BookingLifecycleService::new(),
            timeout,
            requires_approval,
        }
    }

    /// Book a slot for a patient.
    ///
    /// Fails with `SlotUnavailable` when the start time is not on the doctor's
    /// schedule for that date, and with `SlotConflict` when an active booking
    /// already holds the slot. The store's atomic insert decides the latter.
    pub async fn create_booking(
        &self,
        patient_id: Uuid,
        request: CreateBookingRequest,
    ) -> Result<Booking, BookingError> {
        let key = request.slot_key();
        debug!("Booking request from patient {} for {}", patient_id, key);

        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if reason.as_ref().map_or(false, |r| r.chars().count() > MAX_REASON_LENGTH) {
            return Err(BookingError::ValidationError(format!(
                "Reason must be at most {} characters",
                MAX_REASON_LENGTH
            )));
        }

        let scheduled = self
            .availability
            .is_scheduled_slot(key.doctor_id, &key.facility_ref, key.date, key.start_time)
            .await?;
        if !scheduled {
            warn!("Requested slot {} is not on the schedule", key);
            return Err(BookingError::SlotUnavailable(key.to_string()));
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            doctor_id: key.doctor_id,
            facility_ref: key.facility_ref,
            date: key.date,
            start_time: key.start_time,
            patient_id,
            reason,
            status: self.lifecycle.initial_status(self.requires_approval),
            created_at: now,
            updated_at: now,
        };

        let created = with_timeout(self.timeout, "insert booking", self.bookings.insert_booking(booking))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    warn!("Slot {} is already booked", key);
                    BookingError::SlotConflict(key.to_string())
                }
                other => BookingError::from(other),
            })?;

        info!("Booking {} created for {} with status {}", created.id, key, created.status);
        Ok(created)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        with_timeout(self.timeout, "get booking", self.bookings.get_booking(booking_id))
            .await?
            .ok_or(BookingError::NotFound)
    }

    /// Move a booking to `new_status`, re-validating against the status held
    /// by the store at the moment of the write.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let mut current = self.get_booking(booking_id).await?;

        for attempt in 1..=MAX_STATUS_ATTEMPTS {
            self.lifecycle.validate_transition(current.status, new_status)?;

            let updated = with_timeout(
                self.timeout,
                "update booking status",
                self.bookings.compare_and_set_status(booking_id, current.status, new_status),
            )
            .await?;

            if let Some(booking) = updated {
                info!("Booking {} moved {} -> {}", booking_id, current.status, booking.status);
                return Ok(booking);
            }

            debug!(
                "Booking {} changed concurrently (attempt {}), re-reading",
                booking_id, attempt
            );
            current = self.get_booking(booking_id).await?;
        }

        // The move is still legal; the booking is just contended.
        self.lifecycle.validate_transition(current.status, new_status)?;
        warn!(
            "Booking {} kept changing after {} attempts, giving up",
            booking_id, MAX_STATUS_ATTEMPTS
        );
        Err(BookingError::StoreUnavailable(format!(
            "booking {} is being updated concurrently, retry later",
            booking_id
        )))
    }

    pub async fn confirm_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.update_status(booking_id, BookingStatus::Confirmed).await
    }

    pub async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.update_status(booking_id, BookingStatus::Completed).await
    }

    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.update_status(booking_id, BookingStatus::Cancelled).await
    }

    pub async fn list_patient_bookings(&self, patient_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        let bookings = with_timeout(
            self.timeout,
            "list patient bookings",
            self.bookings.bookings_for_patient(patient_id),
        )
        .await?;
        Ok(bookings)
    }

    pub async fn list_doctor_bookings(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, BookingError> {
        let bookings = with_timeout(
            self.timeout,
            "list doctor bookings",
            self.bookings.bookings_for_doctor(doctor_id, date),
        )
        .await?;
        Ok(bookings)
    }
}
