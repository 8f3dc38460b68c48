use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Utc};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Membership state. A "deleted" member is never removed from the store;
/// withdrawal keeps the record and tags it with the withdrawal time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberStatus {
    Active,
    Withdrawn { at: DateTime<Utc> },
}

impl MemberStatus {
    pub fn withdrawn_at(&self) -> Option<DateTime<Utc>> {
        match self {
            MemberStatus::Active => None,
            MemberStatus::Withdrawn { at } => Some(*at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub member_number: String,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub is_admin: bool,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(
        member_number: String,
        username: String,
        full_name: String,
        email: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_number,
            username,
            password_hash: String::new(),
            full_name,
            email,
            is_admin: false,
            status: MemberStatus::Active,
            created_at: now,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.member_number.is_empty() {
            return Err(AppError::Validation("Member number is required".into()));
        }
        if self.username.is_empty() {
            return Err(AppError::Validation("Username is required".into()));
        }
        if self.password_hash.is_empty() {
            return Err(AppError::Validation("Password is required".into()));
        }
        if self.full_name.is_empty() {
            return Err(AppError::Validation("Full name is required".into()));
        }
        if self.email.is_empty() {
            return Err(AppError::Validation("Email is required".into()));
        }
        Ok(())
    }

    /// Hash `plain` with a generated salt and store the result.
    pub fn assign_password(&mut self, plain: &str) -> AppResult<()> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
        self.password_hash = hash.to_string();
        Ok(())
    }

    /// Verify `plain` against the stored hash. A mismatch is `false`, never an error.
    pub fn check_password(&self, plain: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn is_withdrawn(&self) -> bool {
        matches!(self.status, MemberStatus::Withdrawn { .. })
    }

    /// Soft withdrawal. The record is retained; only the status changes.
    pub fn withdraw(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.is_withdrawn() {
            return Err(AppError::Validation("Member is already withdrawn".into()));
        }
        self.status = MemberStatus::Withdrawn { at: now };
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub product_number: String,
    pub name: String,
    pub category: String,
    pub price: i64,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn validate(&self) -> AppResult<()> {
        if self.product_number.is_empty() {
            return Err(AppError::Validation("Product number is required".into()));
        }
        if self.name.is_empty() {
            return Err(AppError::Validation("Product name is required".into()));
        }
        if self.price <= 0 {
            return Err(AppError::Validation("Price must be positive".into()));
        }
        if self.stock_quantity < 0 {
            return Err(AppError::Validation("Stock cannot be negative".into()));
        }
        Ok(())
    }

    /// Replace the stock quantity. Absolute set, not a delta.
    pub fn set_stock(&mut self, quantity: i32) -> AppResult<()> {
        if quantity < 0 {
            return Err(AppError::Validation("Stock cannot be negative".into()));
        }
        self.stock_quantity = quantity;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub ordered_at: DateTime<Utc>,
    pub member_number: String,
    pub product_number: String,
    /// Unit price snapshotted from the product at creation.
    pub price: i64,
    pub quantity: i32,
    /// price * quantity, computed once at creation and never recomputed.
    pub total_amount: i64,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        order_number: String,
        member_number: String,
        product_number: String,
        price: i64,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Self {
        // An overflowing total collapses to 0 and is rejected by validate().
        let total_amount = price.checked_mul(i64::from(quantity)).unwrap_or(0);
        Self {
            id: Uuid::new_v4(),
            order_number,
            ordered_at: now,
            member_number,
            product_number,
            price,
            quantity,
            total_amount,
            canceled_at: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.order_number.is_empty() {
            return Err(AppError::Validation("Order number is required".into()));
        }
        if self.member_number.is_empty() {
            return Err(AppError::Validation("Member number is required".into()));
        }
        if self.product_number.is_empty() {
            return Err(AppError::Validation("Product number is required".into()));
        }
        if self.price <= 0 {
            return Err(AppError::Validation("Price must be positive".into()));
        }
        if self.quantity <= 0 {
            return Err(AppError::Validation("Quantity must be positive".into()));
        }
        if self.total_amount <= 0 {
            return Err(AppError::Validation("Total amount must be positive".into()));
        }
        Ok(())
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    /// Mark the order canceled. Canceling twice is an error, not a no-op.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.is_canceled() {
            return Err(AppError::AlreadyCanceled);
        }
        self.canceled_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Member {
        let mut m = Member::new(
            "MBR-1".into(),
            "hong".into(),
            "Hong Gil-dong".into(),
            "hong@example.com".into(),
            Utc::now(),
        );
        m.password_hash = "hash".into();
        m
    }

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            product_number: "P1".into(),
            name: "Widget".into(),
            category: "tools".into(),
            price: 1000,
            stock_quantity: 10,
            created_at: Utc::now(),
        }
    }

    fn order() -> Order {
        Order::new("ORD-1".into(), "MBR-1".into(), "P1".into(), 1000, 2, Utc::now())
    }

    #[test]
    fn member_validate_rejects_missing_fields() {
        assert!(member().validate().is_ok());

        for field in ["member_number", "username", "password", "full_name", "email"] {
            let mut m = member();
            match field {
                "member_number" => m.member_number.clear(),
                "username" => m.username.clear(),
                "password" => m.password_hash.clear(),
                "full_name" => m.full_name.clear(),
                _ => m.email.clear(),
            }
            assert!(
                matches!(m.validate(), Err(AppError::Validation(_))),
                "expected validation failure for empty {field}"
            );
        }
    }

    #[test]
    fn password_round_trip() {
        let mut m = member();
        m.assign_password("secret").unwrap();
        assert_ne!(m.password_hash, "secret");
        assert!(m.check_password("secret"));
        assert!(!m.check_password("wrong"));
    }

    #[test]
    fn check_password_on_garbage_hash_is_false() {
        let mut m = member();
        m.password_hash = "not a phc string".into();
        assert!(!m.check_password("secret"));
    }

    #[test]
    fn withdraw_is_single_shot() {
        let mut m = member();
        let now = Utc::now();
        m.withdraw(now).unwrap();
        assert_eq!(m.status, MemberStatus::Withdrawn { at: now });
        assert!(m.withdraw(Utc::now()).is_err());
    }

    #[test]
    fn product_validate_bounds() {
        assert!(product().validate().is_ok());

        let mut p = product();
        p.product_number.clear();
        assert!(p.validate().is_err());

        let mut p = product();
        p.name.clear();
        assert!(p.validate().is_err());

        let mut p = product();
        p.price = 0;
        assert!(p.validate().is_err());

        let mut p = product();
        p.stock_quantity = -1;
        assert!(p.validate().is_err());
    }

    #[test]
    fn set_stock_is_absolute() {
        let mut p = product();
        p.set_stock(3).unwrap();
        assert_eq!(p.stock_quantity, 3);
        p.set_stock(0).unwrap();
        assert_eq!(p.stock_quantity, 0);
        assert!(matches!(p.set_stock(-1), Err(AppError::Validation(_))));
        assert_eq!(p.stock_quantity, 0);
    }

    #[test]
    fn order_total_is_price_times_quantity() {
        let o = order();
        assert_eq!(o.total_amount, 2000);
    }

    #[test]
    fn order_validate_bounds() {
        assert!(order().validate().is_ok());

        let mut o = order();
        o.order_number.clear();
        assert!(o.validate().is_err());

        let mut o = order();
        o.member_number.clear();
        assert!(o.validate().is_err());

        let mut o = order();
        o.product_number.clear();
        assert!(o.validate().is_err());

        let mut o = order();
        o.quantity = 0;
        o.total_amount = 0;
        assert!(o.validate().is_err());

        let mut o = order();
        o.price = -1;
        assert!(o.validate().is_err());
    }

    #[test]
    fn overflowing_total_fails_validation() {
        let o = Order::new(
            "ORD-1".into(),
            "MBR-1".into(),
            "P1".into(),
            i64::MAX,
            2,
            Utc::now(),
        );
        assert_eq!(o.total_amount, 0);
        assert!(matches!(o.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn cancel_twice_is_an_error() {
        let mut o = order();
        assert!(!o.is_canceled());
        o.cancel(Utc::now()).unwrap();
        assert!(o.is_canceled());
        assert!(matches!(o.cancel(Utc::now()), Err(AppError::AlreadyCanceled)));
        // cancellation does not touch the total
        assert_eq!(o.total_amount, 2000);
    }
}
