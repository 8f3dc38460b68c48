use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::{
    audit::log_audit,
    dto::members::{MemberList, MemberResponse, MemberStatsResponse, UpdateMemberRequest},
    entity::members::{
        ActiveModel as MemberActive, Column as MemberCol, Entity as Members, Model as MemberModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Member, MemberStatus},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::month_range,
    state::AppState,
};

pub async fn get_my_info(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<MemberResponse>> {
    let member = find_by_username(state, &user.username).await?;
    Ok(ApiResponse::success(
        "OK",
        MemberResponse::from_member(&member),
        None,
    ))
}

pub async fn update_my_info(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateMemberRequest,
) -> AppResult<ApiResponse<MemberResponse>> {
    let mut member = find_by_username(state, &user.username).await?;

    if let Some(full_name) = payload.full_name.filter(|v| !v.is_empty()) {
        member.full_name = full_name;
    }
    if let Some(email) = payload.email.filter(|v| !v.is_empty()) {
        if email != member.email {
            let email_taken = Members::find()
                .filter(MemberCol::Email.eq(email.clone()))
                .one(&state.orm)
                .await?
                .is_some();
            if email_taken {
                return Err(AppError::Duplicate("Email is already registered".into()));
            }
        }
        member.email = email;
    }
    if let Some(password) = payload.password.filter(|v| !v.is_empty()) {
        member.assign_password(&password)?;
    }
    member.validate()?;

    let updated = member_to_active(&member).update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&member.member_number),
        "member_update",
        Some("members"),
        Some(serde_json::json!({ "member_number": member.member_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Member updated",
        MemberResponse::from_member(&member_from_entity(updated)),
        Some(Meta::empty()),
    ))
}

/// Soft withdrawal: the row stays, only the withdrawal timestamp is set.
pub async fn withdraw_me(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<MemberResponse>> {
    let mut member = find_by_username(state, &user.username).await?;
    member.withdraw(Utc::now())?;

    let updated = member_to_active(&member).update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&member.member_number),
        "member_withdraw",
        Some("members"),
        Some(serde_json::json!({ "member_number": member.member_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Member withdrawn",
        MemberResponse::from_member(&member_from_entity(updated)),
        Some(Meta::empty()),
    ))
}

pub async fn list_members(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<MemberList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Members::find().order_by_asc(MemberCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|m| MemberResponse::from_member(&member_from_entity(m)))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Members", MemberList { items }, Some(meta)))
}

/// Joined and withdrawn counts for one calendar month. The two counts are
/// independent: withdrawal month is unrelated to the join month.
pub async fn member_stats(
    state: &AppState,
    user: &AuthUser,
    month: &str,
) -> AppResult<ApiResponse<MemberStatsResponse>> {
    ensure_admin(user)?;
    let (start, end) = month_range(month)?;

    let joined = Members::find()
        .filter(MemberCol::CreatedAt.gte(start))
        .filter(MemberCol::CreatedAt.lt(end))
        .count(&state.orm)
        .await? as i64;

    let withdrawn = Members::find()
        .filter(MemberCol::WithdrawnAt.is_not_null())
        .filter(MemberCol::WithdrawnAt.gte(start))
        .filter(MemberCol::WithdrawnAt.lt(end))
        .count(&state.orm)
        .await? as i64;

    let stats = MemberStatsResponse {
        month: month.to_string(),
        joined_members: joined,
        withdrawn_members: withdrawn,
    };
    Ok(ApiResponse::success("Member stats", stats, Some(Meta::empty())))
}

async fn find_by_username(state: &AppState, username: &str) -> AppResult<Member> {
    Members::find()
        .filter(MemberCol::Username.eq(username))
        .one(&state.orm)
        .await?
        .map(member_from_entity)
        .ok_or(AppError::NotFound("Member"))
}

pub(crate) fn member_from_entity(model: MemberModel) -> Member {
    let status = match model.withdrawn_at {
        Some(at) => MemberStatus::Withdrawn {
            at: at.with_timezone(&Utc),
        },
        None => MemberStatus::Active,
    };
    Member {
        id: model.id,
        member_number: model.member_number,
        username: model.username,
        password_hash: model.password_hash,
        full_name: model.full_name,
        email: model.email,
        is_admin: model.is_admin,
        status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn member_to_active(member: &Member) -> MemberActive {
    MemberActive {
        id: Set(member.id),
        member_number: Set(member.member_number.clone()),
        username: Set(member.username.clone()),
        password_hash: Set(member.password_hash.clone()),
        full_name: Set(member.full_name.clone()),
        email: Set(member.email.clone()),
        is_admin: Set(member.is_admin),
        withdrawn_at: Set(member.status.withdrawn_at().map(Into::into)),
        created_at: Set(member.created_at.into()),
    }
}
