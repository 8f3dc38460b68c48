use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub member_number: String,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub is_admin: bool,
    pub withdrawn_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

// Orders reference members by member_number at the application layer only;
// there is no schema-level relation.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
