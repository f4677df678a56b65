use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::entities::tour::{self, TourStatus};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTourRequest {
    pub name: String,
    pub price: f64,
    pub discounted_price: Option<f64>,
    pub destinations: Vec<String>,
    pub departure_city: String,
    pub duration_days: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub booking_deadline: Option<DateTime<Utc>>,
    pub min_participants: i32,
    pub max_participants: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTourRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub destinations: Option<Vec<String>>,
    pub departure_city: Option<String>,
    pub duration_days: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub booking_deadline: Option<DateTime<Utc>>,
    pub min_participants: Option<i32>,
    pub max_participants: Option<i32>,
    pub status: Option<TourStatus>,
}

#[derive(Debug, Serialize)]
pub struct TourResponse {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub discounted_price: Option<f64>,
    pub destinations: Vec<String>,
    pub departure_city: String,
    pub duration_days: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub booking_deadline: Option<DateTime<Utc>>,
    pub min_participants: i32,
    pub max_participants: i32,
    pub available_seats: i32,
    pub status: TourStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<tour::Model> for TourResponse {
    fn from(t: tour::Model) -> Self {
        let destinations =
            serde_json::from_value(t.destinations.clone()).unwrap_or_default();

        TourResponse {
            id: t.id,
            name: t.name,
            price: t.price,
            discounted_price: t.discounted_price,
            destinations,
            departure_city: t.departure_city,
            duration_days: t.duration_days,
            start_date: t.start_date.with_timezone(&Utc),
            end_date: t.end_date.with_timezone(&Utc),
            booking_deadline: t.booking_deadline.map(|d| d.with_timezone(&Utc)),
            min_participants: t.min_participants,
            max_participants: t.max_participants,
            available_seats: t.available_seats,
            status: t.status,
            is_active: t.is_active,
            created_at: t.created_at.with_timezone(&Utc),
            updated_at: t.updated_at.with_timezone(&Utc),
        }
    }
}

fn validate_prices(price: f64, discounted_price: Option<f64>) -> AppResult<()> {
    if price <= 0.0 {
        return Err(AppError::Validation(
            "Price must be greater than zero".to_string(),
        ));
    }
    if let Some(discounted) = discounted_price {
        if discounted >= price {
            return Err(AppError::Validation(
                "Discounted price must be lower than the regular price".to_string(),
            ));
        }
    }
    Ok(())
}

/// Create a new tour (admin). The seat counter starts at full capacity
/// and the tour starts in draft status.
pub async fn create_tour(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTourRequest>,
) -> AppResult<Json<TourResponse>> {
    if payload.end_date < payload.start_date {
        return Err(AppError::Validation(
            "End date must not be before start date".to_string(),
        ));
    }
    validate_prices(payload.price, payload.discounted_price)?;

    if payload.max_participants < 1 {
        return Err(AppError::Validation(
            "Maximum participants must be at least 1".to_string(),
        ));
    }
    if payload.min_participants < 1 || payload.min_participants > payload.max_participants {
        return Err(AppError::Validation(
            "Minimum participants must be between 1 and the maximum".to_string(),
        ));
    }
    if payload.duration_days < 1 {
        return Err(AppError::Validation(
            "Duration must be at least 1 day".to_string(),
        ));
    }

    let now = Utc::now();
    let new_tour = tour::ActiveModel {
        name: Set(payload.name),
        price: Set(payload.price),
        discounted_price: Set(payload.discounted_price),
        destinations: Set(serde_json::json!(payload.destinations)),
        departure_city: Set(payload.departure_city),
        duration_days: Set(payload.duration_days),
        start_date: Set(payload.start_date.into()),
        end_date: Set(payload.end_date.into()),
        booking_deadline: Set(payload.booking_deadline.map(Into::into)),
        min_participants: Set(payload.min_participants),
        max_participants: Set(payload.max_participants),
        available_seats: Set(payload.max_participants),
        status: Set(TourStatus::Draft),
        is_active: Set(true),
        created_by: Set(Some(claims.sub)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    let tour = new_tour.insert(state.db.as_ref()).await?;
    tracing::info!(tour_id = tour.id, admin_id = %claims.sub, "Tour created");

    Ok(Json(tour.into()))
}

/// Update a tour (admin). Only provided fields change; lowering the
/// maximum clamps the seat counter down to the new capacity.
pub async fn update_tour(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTourRequest>,
) -> AppResult<Json<TourResponse>> {
    let tour = tour::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;

    let new_price = payload.price.unwrap_or(tour.price);
    let new_discounted = payload.discounted_price.or(tour.discounted_price);
    validate_prices(new_price, new_discounted)?;

    let new_start = payload
        .start_date
        .unwrap_or_else(|| tour.start_date.with_timezone(&Utc));
    let new_end = payload
        .end_date
        .unwrap_or_else(|| tour.end_date.with_timezone(&Utc));
    if new_end < new_start {
        return Err(AppError::Validation(
            "End date must not be before start date".to_string(),
        ));
    }

    // Participant bounds are validated against the effective pair, so a
    // partial update cannot leave min above max.
    let new_min = payload.min_participants.unwrap_or(tour.min_participants);
    let new_max = payload.max_participants.unwrap_or(tour.max_participants);
    if new_max < 1 {
        return Err(AppError::Validation(
            "Maximum participants must be at least 1".to_string(),
        ));
    }
    if new_min < 1 || new_min > new_max {
        return Err(AppError::Validation(
            "Minimum participants must be between 1 and the maximum".to_string(),
        ));
    }

    let available_seats = tour.available_seats;
    let mut active: tour::ActiveModel = tour.into();

    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(discounted) = payload.discounted_price {
        active.discounted_price = Set(Some(discounted));
    }
    if let Some(destinations) = payload.destinations {
        active.destinations = Set(serde_json::json!(destinations));
    }
    if let Some(city) = payload.departure_city {
        active.departure_city = Set(city);
    }
    if let Some(days) = payload.duration_days {
        if days < 1 {
            return Err(AppError::Validation(
                "Duration must be at least 1 day".to_string(),
            ));
        }
        active.duration_days = Set(days);
    }
    if let Some(start) = payload.start_date {
        active.start_date = Set(start.into());
    }
    if let Some(end) = payload.end_date {
        active.end_date = Set(end.into());
    }
    if let Some(deadline) = payload.booking_deadline {
        active.booking_deadline = Set(Some(deadline.into()));
    }
    if let Some(min) = payload.min_participants {
        active.min_participants = Set(min);
    }
    if let Some(max) = payload.max_participants {
        active.max_participants = Set(max);
        if available_seats > max {
            active.available_seats = Set(max);
        }
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(state.db.as_ref()).await?;
    tracing::info!(tour_id = updated.id, admin_id = %claims.sub, "Tour updated");

    Ok(Json(updated.into()))
}

/// Soft-delete a tour (admin): it is deactivated and cancelled, never
/// removed, so existing bookings keep their reference.
pub async fn delete_tour(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let tour = tour::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;

    let mut active: tour::ActiveModel = tour.into();
    active.is_active = Set(false);
    active.status = Set(TourStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    active.update(state.db.as_ref()).await?;

    tracing::info!(tour_id = id, admin_id = %claims.sub, "Tour soft deleted");

    Ok(Json(serde_json::json!({ "message": "Tour deleted" })))
}

/// List all tours including drafts (admin)
pub async fn list_all_tours(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TourResponse>>> {
    let tours = tour::Entity::find().all(state.db.as_ref()).await?;
    Ok(Json(tours.into_iter().map(Into::into).collect()))
}

/// List active, published, upcoming tours (public)
pub async fn list_published_tours(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TourResponse>>> {
    let tours = tour::Entity::find()
        .filter(tour::Column::IsActive.eq(true))
        .filter(tour::Column::Status.eq(TourStatus::Published))
        .filter(tour::Column::StartDate.gt(Utc::now()))
        .all(state.db.as_ref())
        .await?;

    Ok(Json(tours.into_iter().map(Into::into).collect()))
}

/// Get tour details (public). Drafts, cancelled and deactivated tours
/// are not exposed here; sold-out tours remain visible.
pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<TourResponse>> {
    let tour = tour::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Tour not found".to_string()))?;

    if !tour.is_active
        || !matches!(tour.status, TourStatus::Published | TourStatus::SoldOut)
    {
        return Err(AppError::NotFound("Tour not found".to_string()));
    }

    Ok(Json(tour.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::entities::user::UserRole;

    fn test_state(db: DatabaseConnection) -> AppState {
        AppState {
            db: Arc::new(db),
            config: Config {
                database_url: String::new(),
                jwt_secret: "test-secret".to_string(),
                jwt_expiration_hours: 24,
                server_host: "127.0.0.1".to_string(),
                server_port: 0,
            },
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

    fn tour_model(status: TourStatus) -> tour::Model {
        let now = Utc::now();
        tour::Model {
            id: 1,
            name: "Lycian Way".to_string(),
            price: 750.0,
            discounted_price: None,
            destinations: serde_json::json!(["Fethiye", "Kas"]),
            departure_city: "Antalya".to_string(),
            duration_days: 5,
            start_date: (now + Duration::days(30)).into(),
            end_date: (now + Duration::days(35)).into(),
            booking_deadline: None,
            min_participants: 5,
            max_participants: 30,
            available_seats: 30,
            status,
            is_active: true,
            created_by: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn empty_update() -> UpdateTourRequest {
        UpdateTourRequest {
            name: None,
            price: None,
            discounted_price: None,
            destinations: None,
            departure_city: None,
            duration_days: None,
            start_date: None,
            end_date: None,
            booking_deadline: None,
            min_participants: None,
            max_participants: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn update_rejects_min_above_effective_max() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tour_model(TourStatus::Published)]])
            .into_connection();
        let state = test_state(db);

        let payload = UpdateTourRequest {
            min_participants: Some(40),
            ..empty_update()
        };

        let err = update_tour(State(state), Extension(admin_claims()), Path(1), Json(payload))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_rejects_max_below_existing_min() {
        // Stored minimum is 5; lowering the maximum to 2 must fail.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tour_model(TourStatus::Published)]])
            .into_connection();
        let state = test_state(db);

        let payload = UpdateTourRequest {
            max_participants: Some(2),
            ..empty_update()
        };

        let err = update_tour(State(state), Extension(admin_claims()), Path(1), Json(payload))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn get_tour_hides_draft_tours() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tour_model(TourStatus::Draft)]])
            .into_connection();
        let state = test_state(db);

        let err = get_tour(State(state), Path(1)).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_tour_hides_inactive_tours() {
        let mut tour = tour_model(TourStatus::Published);
        tour.is_active = false;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tour]])
            .into_connection();
        let state = test_state(db);

        let err = get_tour(State(state), Path(1)).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_tour_returns_sold_out_tours() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tour_model(TourStatus::SoldOut)]])
            .into_connection();
        let state = test_state(db);

        let response = get_tour(State(state), Path(1)).await.unwrap();

        assert_eq!(response.0.id, 1);
        assert_eq!(response.0.status, TourStatus::SoldOut);
    }
}
