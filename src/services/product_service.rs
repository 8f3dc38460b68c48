use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, ProductResponse, UpdateStockRequest},
    entity::orders::{Column as OrderCol, Entity as Orders},
    entity::products::{
        ActiveModel as ProductActive, Column as ProductCol, Entity as Products,
        Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(ProductCol::Category.eq(category.clone()));
    }
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        condition = condition.add(Expr::col(ProductCol::Name).ilike(pattern));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(ProductCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| ProductResponse::from_product(&product_from_entity(p)))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductResponse>> {
    ensure_admin(user)?;

    let product = Product {
        id: Uuid::new_v4(),
        product_number: payload.product_number,
        name: payload.name,
        category: payload.category,
        price: payload.price,
        stock_quantity: payload.stock_quantity,
        created_at: Utc::now(),
    };
    product.validate()?;

    let exists = Products::find()
        .filter(ProductCol::ProductNumber.eq(product.product_number.clone()))
        .one(&state.orm)
        .await?
        .is_some();
    if exists {
        return Err(AppError::Duplicate("Product number already exists".into()));
    }

    let inserted = product_to_active(&product).insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&user.member_number),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_number": product.product_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        ProductResponse::from_product(&product_from_entity(inserted)),
        Some(Meta::empty()),
    ))
}

/// Replace the stock quantity of a product. Absolute set, not a delta;
/// order placement and cancellation adjust stock separately.
pub async fn update_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateStockRequest,
) -> AppResult<ApiResponse<ProductResponse>> {
    ensure_admin(user)?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let mut product = product_from_entity(existing.clone());
    product.set_stock(payload.stock_quantity)?;

    let mut active: ProductActive = existing.into();
    active.stock = Set(product.stock_quantity);
    let updated = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&user.member_number),
        "product_stock_update",
        Some("products"),
        Some(serde_json::json!({
            "product_number": product.product_number,
            "stock_quantity": product.stock_quantity,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Stock updated",
        ProductResponse::from_product(&product_from_entity(updated)),
        Some(Meta::empty()),
    ))
}

/// Delete a product. Blocked while any order, canceled or not, references
/// its product number.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let order_count = Orders::find()
        .filter(OrderCol::ProductNumber.eq(product.product_number.clone()))
        .count(&state.orm)
        .await?;
    if order_count > 0 {
        return Err(AppError::Validation(
            "Product has order history and cannot be deleted".into(),
        ));
    }

    Products::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(&user.member_number),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_number": product.product_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        product_number: model.product_number,
        name: model.name,
        category: model.category,
        price: model.price,
        stock_quantity: model.stock,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn product_to_active(product: &Product) -> ProductActive {
    ProductActive {
        id: Set(product.id),
        product_number: Set(product.product_number.clone()),
        name: Set(product.name.clone()),
        category: Set(product.category.clone()),
        price: Set(product.price),
        stock: Set(product.stock_quantity),
        created_at: Set(product.created_at.into()),
    }
}
