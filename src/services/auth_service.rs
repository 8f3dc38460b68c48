use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    dto::members::MemberResponse,
    entity::members::{Column as MemberCol, Entity as Members},
    error::{AppError, AppResult},
    models::Member,
    response::{ApiResponse, Meta},
    services::member_service::{member_from_entity, member_to_active},
    state::AppState,
};

pub async fn register_member(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let mut member = Member::new(
        build_member_number(),
        payload.username,
        payload.full_name,
        payload.email,
        Utc::now(),
    );
    member.assign_password(&payload.password)?;
    member.validate()?;

    let username_taken = Members::find()
        .filter(MemberCol::Username.eq(member.username.clone()))
        .one(&state.orm)
        .await?
        .is_some();
    if username_taken {
        return Err(AppError::Duplicate("Username is already taken".into()));
    }

    let email_taken = Members::find()
        .filter(MemberCol::Email.eq(member.email.clone()))
        .one(&state.orm)
        .await?
        .is_some();
    if email_taken {
        return Err(AppError::Duplicate("Email is already registered".into()));
    }

    member_to_active(&member).insert(&state.orm).await?;

    let token = issue_token(&member)?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&member.member_number),
        "member_register",
        Some("members"),
        Some(serde_json::json!({ "member_number": member.member_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let resp = RegisterResponse {
        token,
        member: MemberResponse::from_member(&member),
    };
    Ok(ApiResponse::success("Member registered", resp, None))
}

pub async fn login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;

    let member = Members::find()
        .filter(MemberCol::Username.eq(username))
        .one(&state.orm)
        .await?
        .map(member_from_entity);

    // A missing member and a wrong password produce the same response so the
    // endpoint cannot be used to enumerate usernames.
    let member = match member {
        Some(m) if m.check_password(&password) => m,
        _ => {
            return Err(AppError::Authentication(
                "Invalid username or password".into(),
            ));
        }
    };

    let token = issue_token(&member)?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&member.member_number),
        "member_login",
        Some("members"),
        Some(serde_json::json!({ "member_number": member.member_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse { token },
        Some(Meta::empty()),
    ))
}

/// Sign a 24-hour HS256 token carrying the member's identity and admin flag.
pub fn issue_token(member: &Member) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: member.username.clone(),
        member_number: member.member_number.clone(),
        is_admin: member.is_admin,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AppError::Token)
}

fn build_member_number() -> String {
    let suffix = Uuid::new_v4().to_string();
    let short = &suffix[..8];
    format!("MBR-{short}")
}
