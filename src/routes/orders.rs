use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderResponse, OrderStatsResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{Pagination, StatsQuery},
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/me", get(my_orders))
        .route("/stats", get(order_stats))
        .route("/{order_number}/cancel", put(cancel_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Place order", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Insufficient stock")
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderResponse>>)> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders/me",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Own order history", body = ApiResponse<OrderList>)
    ),
    tag = "Orders"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_my_orders(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{order_number}/cancel",
    params(
        ("order_number" = String, Path, description = "Order number")
    ),
    responses(
        (status = 200, description = "Cancel order", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Not the order owner"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Already canceled")
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<OrderResponse>>> {
    let resp = order_service::cancel_order(&state, &user, &order_number).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/stats",
    params(
        ("month" = String, Query, description = "Month in YYYY-MM format")
    ),
    responses(
        (status = 200, description = "Monthly sales/cancellation totals", body = ApiResponse<OrderStatsResponse>),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Admin only")
    ),
    tag = "Orders"
)]
pub async fn order_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<ApiResponse<OrderStatsResponse>>> {
    let resp = order_service::monthly_stats(&state, &user, &query.month).await?;
    Ok(Json(resp))
}
