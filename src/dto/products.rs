use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub product_number: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: i64,
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStockRequest {
    /// New absolute stock quantity.
    pub stock_quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub product_number: String,
    pub name: String,
    pub category: String,
    pub price: i64,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            product_number: product.product_number.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            stock_quantity: product.stock_quantity,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductResponse>,
}
