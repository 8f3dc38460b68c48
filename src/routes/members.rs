use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::auth::{RegisterRequest, RegisterResponse},
    dto::members::{MemberList, MemberResponse, MemberStatsResponse, UpdateMemberRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{Pagination, StatsQuery},
    services::{auth_service, member_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register).get(list_members))
        .route(
            "/me",
            get(my_info).put(update_my_info).delete(withdraw_me),
        )
        .route("/stats", get(member_stats))
}

#[utoipa::path(
    post,
    path = "/api/members",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register member", body = ApiResponse<RegisterResponse>),
        (status = 409, description = "Username or email already taken")
    ),
    tag = "Members"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
    let resp = auth_service::register_member(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/members",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List members", body = ApiResponse<MemberList>),
        (status = 403, description = "Admin only")
    ),
    tag = "Members"
)]
pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<MemberList>>> {
    let resp = member_service::list_members(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/members/me",
    responses(
        (status = 200, description = "My profile", body = ApiResponse<MemberResponse>)
    ),
    tag = "Members"
)]
pub async fn my_info(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MemberResponse>>> {
    let resp = member_service::get_my_info(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/members/me",
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Update my profile", body = ApiResponse<MemberResponse>)
    ),
    tag = "Members"
)]
pub async fn update_my_info(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateMemberRequest>,
) -> AppResult<Json<ApiResponse<MemberResponse>>> {
    let resp = member_service::update_my_info(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/members/me",
    responses(
        (status = 200, description = "Soft withdrawal", body = ApiResponse<MemberResponse>)
    ),
    tag = "Members"
)]
pub async fn withdraw_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MemberResponse>>> {
    let resp = member_service::withdraw_me(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/members/stats",
    params(
        ("month" = String, Query, description = "Month in YYYY-MM format")
    ),
    responses(
        (status = 200, description = "Joined/withdrawn counts", body = ApiResponse<MemberStatsResponse>),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Admin only")
    ),
    tag = "Members"
)]
pub async fn member_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<ApiResponse<MemberStatsResponse>>> {
    let resp = member_service::member_stats(&state, &user, &query.month).await?;
    Ok(Json(resp))
}
