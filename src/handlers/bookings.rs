use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::tour;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub tour_id: i64,
    pub number_of_people: i32,
    pub user_name: String,
    pub user_phone: Option<String>,
    pub user_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveBookingRequest {
    pub admin_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBookingRequest {
    pub rejection_reason: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: i64,
    pub tour_id: i64,
    pub tour_name: Option<String>,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub number_of_people: i32,
    pub status: BookingStatus,
    pub user_message: Option<String>,
    pub admin_note: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn booking_response(b: booking::Model, tour_name: Option<String>) -> BookingResponse {
    BookingResponse {
        id: b.id,
        tour_id: b.tour_id,
        tour_name,
        user_id: b.user_id,
        user_name: b.user_name,
        user_email: b.user_email,
        user_phone: b.user_phone,
        number_of_people: b.number_of_people,
        status: b.status,
        user_message: b.user_message,
        admin_note: b.admin_note,
        approved_by: b.approved_by,
        approved_at: b.approved_at.map(|t| t.with_timezone(&Utc)),
        rejected_by: b.rejected_by,
        rejected_at: b.rejected_at.map(|t| t.with_timezone(&Utc)),
        created_at: b.created_at.with_timezone(&Utc),
        updated_at: b.updated_at.with_timezone(&Utc),
    }
}

async fn find_booking_with_tour(
    state: &AppState,
    booking_id: i64,
) -> AppResult<(booking::Model, Option<tour::Model>)> {
    booking::Entity::find_by_id(booking_id)
        .find_also_related(tour::Entity)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

/// Submit a booking request against a tour. Seats are NOT reserved here;
/// multiple pending requests may legally oversubscribe the remaining
/// capacity. Seats are only committed when an admin approves.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    if payload.number_of_people < 1 {
        return Err(AppError::Validation(
            "Number of people must be at least 1".to_string(),
        ));
    }
    if payload.user_name.trim().is_empty() {
        return Err(AppError::Validation(
            "Contact name is required".to_string(),
        ));
    }

    let tour = tour::Entity::find_by_id(payload.tour_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;

    if !tour.is_bookable(Utc::now()) {
        return Err(AppError::NotBookable(
            "Tour is not open for booking".to_string(),
        ));
    }

    // Pre-check only. The authoritative capacity check happens at
    // approval time against the locked tour row.
    if tour.available_seats < payload.number_of_people {
        return Err(AppError::NotBookable(format!(
            "Only {} seats available",
            tour.available_seats
        )));
    }

    let now = Utc::now();
    let new_booking = booking::ActiveModel {
        tour_id: Set(tour.id),
        user_id: Set(claims.sub),
        user_name: Set(payload.user_name),
        user_email: Set(claims.email.clone()),
        user_phone: Set(payload.user_phone),
        number_of_people: Set(payload.number_of_people),
        status: Set(BookingStatus::Pending),
        user_message: Set(payload.user_message),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    let saved = new_booking.insert(state.db.as_ref()).await?;
    tracing::info!(
        booking_id = saved.id,
        tour_id = tour.id,
        user_id = %claims.sub,
        "Booking request created"
    );

    Ok(Json(booking_response(saved, Some(tour.name))))
}

/// Approve a pending booking (admin). The tour row is locked for the
/// duration of the capacity re-check and seat decrement so that
/// concurrent approvals against the same tour serialize.
pub async fn approve_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<i64>,
    Json(payload): Json<ApproveBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    let now = Utc::now();
    let txn = state.db.begin().await?;

    let found = booking::Entity::find_by_id(booking_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let mut approved = found.clone();
    approved.approve(claims.sub, payload.admin_note, now)?;

    // SELECT ... FOR UPDATE: re-check capacity against the current row,
    // not the value seen at request time.
    let tour = tour::Entity::find_by_id(found.tour_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;
    let tour_name = tour.name.clone();

    let mut inventory = tour.clone();
    inventory.decrement_seats(approved.number_of_people)?;

    let mut tour_active: tour::ActiveModel = tour.into();
    tour_active.available_seats = Set(inventory.available_seats);
    tour_active.status = Set(inventory.status);
    tour_active.updated_at = Set(now.into());
    tour_active.update(&txn).await?;

    let mut booking_active: booking::ActiveModel = found.into();
    booking_active.status = Set(approved.status);
    booking_active.approved_by = Set(approved.approved_by);
    booking_active.approved_at = Set(approved.approved_at);
    booking_active.admin_note = Set(approved.admin_note);
    booking_active.updated_at = Set(now.into());
    let saved = booking_active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        booking_id,
        tour_id = saved.tour_id,
        admin_id = %claims.sub,
        seats_left = inventory.available_seats,
        "Booking approved"
    );

    Ok(Json(booking_response(saved, Some(tour_name))))
}

/// Reject a pending booking (admin). No tour mutation: seats were never
/// reserved for a pending booking.
pub async fn reject_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<i64>,
    Json(payload): Json<RejectBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    let now = Utc::now();
    let (found, tour) = find_booking_with_tour(&state, booking_id).await?;

    let mut rejected = found.clone();
    rejected.reject(claims.sub, &payload.rejection_reason, now)?;

    let mut active: booking::ActiveModel = found.into();
    active.status = Set(rejected.status);
    active.rejected_by = Set(rejected.rejected_by);
    active.rejected_at = Set(rejected.rejected_at);
    active.admin_note = Set(rejected.admin_note);
    active.updated_at = Set(now.into());
    let saved = active.update(state.db.as_ref()).await?;

    tracing::info!(
        booking_id,
        tour_id = saved.tour_id,
        admin_id = %claims.sub,
        "Booking rejected"
    );

    Ok(Json(booking_response(saved, tour.map(|t| t.name))))
}

/// Cancel a pending booking. Only the requesting user may cancel, and
/// only while the booking is still pending.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<i64>,
) -> AppResult<Json<BookingResponse>> {
    let (found, tour) = find_booking_with_tour(&state, booking_id).await?;

    let mut cancelled = found.clone();
    cancelled.cancel(claims.sub)?;

    let mut active: booking::ActiveModel = found.into();
    active.status = Set(cancelled.status);
    active.updated_at = Set(Utc::now().into());
    let saved = active.update(state.db.as_ref()).await?;

    tracing::info!(booking_id, user_id = %claims.sub, "Booking cancelled");

    Ok(Json(booking_response(saved, tour.map(|t| t.name))))
}

/// Get a single booking: visible to its owner and to admins
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<i64>,
) -> AppResult<Json<BookingResponse>> {
    let (found, tour) = find_booking_with_tour(&state, booking_id).await?;

    if found.user_id != claims.sub && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You can only view your own bookings".to_string(),
        ));
    }

    Ok(Json(booking_response(found, tour.map(|t| t.name))))
}

/// List the caller's own bookings
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(claims.sub))
        .find_also_related(tour::Entity)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(
        bookings
            .into_iter()
            .map(|(b, t)| booking_response(b, t.map(|t| t.name)))
            .collect(),
    ))
}

/// List pending bookings oldest-first, so admins review in FIFO order
pub async fn pending_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .order_by_asc(booking::Column::CreatedAt)
        .find_also_related(tour::Entity)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(
        bookings
            .into_iter()
            .map(|(b, t)| booking_response(b, t.map(|t| t.name)))
            .collect(),
    ))
}

/// List bookings for one tour (admin)
pub async fn bookings_by_tour(
    State(state): State<AppState>,
    Path(tour_id): Path<i64>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let tour = tour::Entity::find_by_id(tour_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::TourId.eq(tour_id))
        .all(state.db.as_ref())
        .await?;

    Ok(Json(
        bookings
            .into_iter()
            .map(|b| booking_response(b, Some(tour.name.clone())))
            .collect(),
    ))
}

/// List all bookings (admin)
pub async fn all_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .find_also_related(tour::Entity)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(
        bookings
            .into_iter()
            .map(|(b, t)| booking_response(b, t.map(|t| t.name)))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

    use super::*;
    use crate::config::Config;
    use crate::entities::tour::TourStatus;
    use crate::entities::user::UserRole;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
        }
    }

    fn test_state(db: DatabaseConnection) -> AppState {
        AppState {
            db: Arc::new(db),
            config: test_config(),
        }
    }

    fn customer_claims() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            role: UserRole::Customer,
            exp: 0,
            iat: 0,
        }
    }

    fn admin_claims() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            role: UserRole::Admin,
            exp: 0,
            iat: 0,
        }
    }

    fn published_tour(available_seats: i32) -> tour::Model {
        let now = Utc::now();
        tour::Model {
            id: 1,
            name: "Cappadocia Escape".to_string(),
            price: 900.0,
            discounted_price: None,
            destinations: serde_json::json!(["Goreme"]),
            departure_city: "Ankara".to_string(),
            duration_days: 3,
            start_date: (now + Duration::days(30)).into(),
            end_date: (now + Duration::days(33)).into(),
            booking_deadline: Some((now + Duration::days(25)).into()),
            min_participants: 2,
            max_participants: 30,
            available_seats,
            status: TourStatus::Published,
            is_active: true,
            created_by: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn booking_with_status(status: BookingStatus) -> booking::Model {
        let now = Utc::now();
        booking::Model {
            id: 9,
            tour_id: 1,
            user_id: Uuid::new_v4(),
            user_name: "Ada".to_string(),
            user_email: "ada@example.com".to_string(),
            user_phone: None,
            number_of_people: 2,
            status,
            user_message: None,
            admin_note: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn create_request(number_of_people: i32) -> CreateBookingRequest {
        CreateBookingRequest {
            tour_id: 1,
            number_of_people,
            user_name: "Ada".to_string(),
            user_phone: None,
            user_message: None,
        }
    }

    #[tokio::test]
    async fn create_booking_rejects_non_positive_party_size() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let state = test_state(db);

        let err = create_booking(
            State(state),
            Extension(customer_claims()),
            Json(create_request(0)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_booking_fails_when_tour_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<tour::Model, _, _>([vec![]])
            .into_connection();
        let state = test_state(db);

        let err = create_booking(
            State(state),
            Extension(customer_claims()),
            Json(create_request(2)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_booking_fails_when_tour_inactive() {
        let mut tour = published_tour(30);
        tour.is_active = false;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tour]])
            .into_connection();
        let state = test_state(db);

        let err = create_booking(
            State(state),
            Extension(customer_claims()),
            Json(create_request(2)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotBookable(_)));
    }

    #[tokio::test]
    async fn create_booking_precheck_rejects_oversized_party() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![published_tour(1)]])
            .into_connection();
        let state = test_state(db);

        let err = create_booking(
            State(state),
            Extension(customer_claims()),
            Json(create_request(2)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotBookable(_)));
    }

    #[tokio::test]
    async fn approve_fails_when_booking_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<booking::Model, _, _>([vec![]])
            .into_connection();
        let state = test_state(db);

        let err = approve_booking(
            State(state),
            Extension(admin_claims()),
            Path(9),
            Json(ApproveBookingRequest { admin_note: None }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn approve_fails_when_booking_already_approved() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking_with_status(BookingStatus::Approved)]])
            .into_connection();
        let state = test_state(db);

        let err = approve_booking(
            State(state),
            Extension(admin_claims()),
            Path(9),
            Json(ApproveBookingRequest { admin_note: None }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn app_state_stays_cloneable_with_mock_connection() {
        // The router requires a cloneable state; the Arc keeps that true
        // for every connection backend.
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn approve_commits_booking_and_tour_in_one_transaction() {
        // Pending booking for 2 people against the last 2 seats: the
        // approval must decrement to zero, mark the tour sold out and
        // persist both rows inside the same transaction.
        let pending = booking_with_status(BookingStatus::Pending);
        let admin = admin_claims();

        let mut approved = pending.clone();
        approved
            .approve(admin.sub, Some("Have a nice trip".to_string()), Utc::now())
            .unwrap();

        let mut sold_out = published_tour(2);
        sold_out.available_seats = 0;
        sold_out.status = TourStatus::SoldOut;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending.clone()]])
            .append_query_results([vec![published_tour(2)]])
            .append_query_results([vec![sold_out]])
            .append_query_results([vec![approved.clone()]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();
        let db = Arc::new(db);
        let state = AppState {
            db: db.clone(),
            config: test_config(),
        };

        let response = approve_booking(
            State(state),
            Extension(admin),
            Path(9),
            Json(ApproveBookingRequest {
                admin_note: Some("Have a nice trip".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.0.status, BookingStatus::Approved);
        assert!(response.0.approved_by.is_some());

        let log = Arc::into_inner(db)
            .unwrap()
            .into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements())
            .map(|stmt| stmt.sql.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        // The tour row is locked for the capacity re-check, and both
        // updates happen before the commit.
        assert!(log.contains("FOR UPDATE"));
        assert!(log.contains(r#"UPDATE "tour""#));
        assert!(log.contains(r#"UPDATE "booking""#));
    }

    #[tokio::test]
    async fn approve_fails_when_capacity_exhausted() {
        // Pending booking for 2 people, but only 1 seat left on the
        // locked tour row.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking_with_status(BookingStatus::Pending)]])
            .append_query_results([vec![published_tour(1)]])
            .into_connection();
        let state = test_state(db);

        let err = approve_booking(
            State(state),
            Extension(admin_claims()),
            Path(9),
            Json(ApproveBookingRequest { admin_note: None }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InsufficientCapacity(_)));
    }
}
