use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Alias, Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderList, OrderResponse, OrderStatsResponse},
    entity::members::{Column as MemberCol, Entity as Members},
    entity::orders::{
        ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
    },
    entity::products::{Column as ProductCol, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::month_range,
    services::product_service::product_from_entity,
    state::AppState,
};

/// Place an order: snapshot the product price, decrement stock and insert the
/// order row in one transaction. The decrement is a conditional update so two
/// concurrent orders can never drive stock negative.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderResponse>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation("Quantity must be positive".into()));
    }

    let txn = state.orm.begin().await?;

    let member = Members::find()
        .filter(MemberCol::MemberNumber.eq(user.member_number.clone()))
        .one(&txn)
        .await?;
    if member.is_none() {
        return Err(AppError::NotFound("Member"));
    }

    let product = Products::find()
        .filter(ProductCol::ProductNumber.eq(payload.product_number.clone()))
        .one(&txn)
        .await?
        .map(product_from_entity)
        .ok_or(AppError::NotFound("Product"))?;

    let order = Order::new(
        build_order_number(),
        user.member_number.clone(),
        product.product_number.clone(),
        product.price,
        payload.quantity,
        Utc::now(),
    );
    order.validate()?;

    // stock = stock - qty only where enough stock remains; zero rows affected
    // means another order got there first or the stock was already too low.
    let decremented = Products::update_many()
        .col_expr(
            ProductCol::Stock,
            Expr::col(ProductCol::Stock).sub(order.quantity),
        )
        .filter(ProductCol::ProductNumber.eq(product.product_number.clone()))
        .filter(ProductCol::Stock.gte(order.quantity))
        .exec(&txn)
        .await?;
    if decremented.rows_affected == 0 {
        return Err(AppError::InsufficientStock);
    }

    order_to_active(&order).insert(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&user.member_number),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({
            "order_number": order.order_number,
            "total_amount": order.total_amount,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderResponse::from_order(&order),
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(OrderCol::MemberNumber.eq(user.member_number.clone()))
        .order_by_desc(OrderCol::OrderedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|o| OrderResponse::from_order(&order_from_entity(o)))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Cancel an own order and restore the product stock, atomically. A retried
/// cancellation sees the committed cancellation and fails with a conflict
/// instead of restoring stock twice.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<OrderResponse>> {
    let txn = state.orm.begin().await?;

    let existing = Orders::find()
        .filter(OrderCol::OrderNumber.eq(order_number))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let mut order = order_from_entity(existing.clone());

    if order.member_number != user.member_number {
        return Err(AppError::Forbidden);
    }

    order.cancel(Utc::now())?;

    let restocked = Products::update_many()
        .col_expr(
            ProductCol::Stock,
            Expr::col(ProductCol::Stock).add(order.quantity),
        )
        .filter(ProductCol::ProductNumber.eq(order.product_number.clone()))
        .exec(&txn)
        .await?;
    if restocked.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }

    let mut active: OrderActive = existing.into();
    active.canceled_at = Set(order.canceled_at.map(Into::into));
    active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&user.member_number),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_number": order.order_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order canceled",
        OrderResponse::from_order(&order),
        Some(Meta::empty()),
    ))
}

/// Sales and cancellation totals for one calendar month. Months with no
/// matching orders sum to zero.
pub async fn monthly_stats(
    state: &AppState,
    user: &AuthUser,
    month: &str,
) -> AppResult<ApiResponse<OrderStatsResponse>> {
    ensure_admin(user)?;
    let (start, end) = month_range(month)?;

    let total_sales = sum_total_amount(state, start, end, false).await?;
    let total_canceled = sum_total_amount(state, start, end, true).await?;

    let stats = OrderStatsResponse {
        month: month.to_string(),
        total_sales,
        total_canceled,
    };
    Ok(ApiResponse::success("Order stats", stats, Some(Meta::empty())))
}

async fn sum_total_amount(
    state: &AppState,
    start: chrono::DateTime<Utc>,
    end: chrono::DateTime<Utc>,
    canceled: bool,
) -> AppResult<i64> {
    let canceled_filter = if canceled {
        OrderCol::CanceledAt.is_not_null()
    } else {
        OrderCol::CanceledAt.is_null()
    };

    // SUM(bigint) comes back as numeric from Postgres, so cast it down.
    let total: Option<Option<i64>> = Orders::find()
        .select_only()
        .column_as(
            Expr::col(OrderCol::TotalAmount)
                .sum()
                .cast_as(Alias::new("BIGINT")),
            "total",
        )
        .filter(OrderCol::OrderedAt.gte(start))
        .filter(OrderCol::OrderedAt.lt(end))
        .filter(canceled_filter)
        .into_tuple()
        .one(&state.orm)
        .await?;

    Ok(total.flatten().unwrap_or(0))
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        order_number: model.order_number,
        ordered_at: model.ordered_at.with_timezone(&Utc),
        member_number: model.member_number,
        product_number: model.product_number,
        price: model.price,
        quantity: model.quantity,
        total_amount: model.total_amount,
        canceled_at: model.canceled_at.map(|dt| dt.with_timezone(&Utc)),
    }
}

pub(crate) fn order_to_active(order: &Order) -> OrderActive {
    OrderActive {
        id: Set(order.id),
        order_number: Set(order.order_number.clone()),
        ordered_at: Set(order.ordered_at.into()),
        member_number: Set(order.member_number.clone()),
        product_number: Set(order.product_number.clone()),
        price: Set(order.price),
        quantity: Set(order.quantity),
        total_amount: Set(order.total_amount),
        canceled_at: Set(order.canceled_at.map(Into::into)),
    }
}

fn build_order_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().to_string();
    let short = &suffix[..8];
    format!("ORD-{date}-{short}")
}
