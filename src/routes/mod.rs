use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{auth, bookings, tours};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::rate_limit::create_public_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // IP-based governor for unauthenticated routes
    let public_governor = create_public_governor();

    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    // Public tour catalog (published tours only)
    let public_routes = Router::new()
        .route("/tours", get(tours::list_published_tours))
        .route("/tours/{id}", get(tours::get_tour))
        .layer(public_governor);

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        // Tour management
        .route("/tours", get(tours::list_all_tours))
        .route("/tours", post(tours::create_tour))
        .route("/tours/{id}", put(tours::update_tour))
        .route("/tours/{id}", delete(tours::delete_tour))
        // Booking review
        .route("/bookings", get(bookings::all_bookings))
        .route("/bookings/pending", get(bookings::pending_bookings))
        .route("/bookings/tour/{tour_id}", get(bookings::bookings_by_tour))
        .route("/bookings/{id}/approve", post(bookings::approve_booking))
        .route("/bookings/{id}/reject", post(bookings::reject_booking))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Customer booking routes (requires auth; ownership enforced per handler)
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/", get(bookings::my_bookings))
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/cancel", post(bookings::cancel_booking))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/bookings", booking_routes)
        .with_state(state)
}
