use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Member;

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberResponse {
    pub member_number: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub is_admin: bool,
    pub is_withdrawn: bool,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MemberResponse {
    pub fn from_member(member: &Member) -> Self {
        Self {
            member_number: member.member_number.clone(),
            username: member.username.clone(),
            full_name: member.full_name.clone(),
            email: member.email.clone(),
            is_admin: member.is_admin,
            is_withdrawn: member.is_withdrawn(),
            withdrawn_at: member.status.withdrawn_at(),
            created_at: member.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberList {
    pub items: Vec<MemberResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberStatsResponse {
    pub month: String,
    pub joined_members: i64,
    pub withdrawn_members: i64,
}
