use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Order;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub product_number: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub order_number: String,
    pub ordered_at: DateTime<Utc>,
    pub member_number: String,
    pub product_number: String,
    pub price: i64,
    pub quantity: i32,
    pub total_amount: i64,
    pub is_canceled: bool,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl OrderResponse {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            ordered_at: order.ordered_at,
            member_number: order.member_number.clone(),
            product_number: order.product_number.clone(),
            price: order.price,
            quantity: order.quantity,
            total_amount: order.total_amount,
            is_canceled: order.is_canceled(),
            canceled_at: order.canceled_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatsResponse {
    pub month: String,
    pub total_sales: i64,
    pub total_canceled: i64,
}
