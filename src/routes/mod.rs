use axum::{Router, routing::post};

use crate::state::AppState;

pub mod auth;
pub mod doc;
pub mod health;
pub mod members;
pub mod orders;
pub mod params;
pub mod products;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .nest("/members", members::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
}
