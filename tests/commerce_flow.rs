use chrono::{Months, Utc};
use commerce_api::{
    db::{create_orm_conn, run_migrations},
    dto::auth::{LoginRequest, RegisterRequest},
    dto::members::UpdateMemberRequest,
    dto::orders::CreateOrderRequest,
    dto::products::{CreateProductRequest, UpdateStockRequest},
    entity::members::ActiveModel as MemberActive,
    entity::orders::ActiveModel as OrderActive,
    entity::products::{Column as ProductCol, Entity as Products},
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{Pagination, ProductQuery},
    services::{auth_service, member_service, order_service, product_service},
    state::AppState,
};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Statement};
use uuid::Uuid;

// Full order lifecycle: register -> order -> stats -> cancel -> restock,
// plus the admin product management and statistics paths.
#[tokio::test]
async fn order_lifecycle_and_stats_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(());
            }
        };
    if std::env::var("JWT_SECRET").is_err() {
        eprintln!("Skipping test: set JWT_SECRET to run integration flow tests.");
        return Ok(());
    }

    let state = setup_state(&database_url).await?;
    let month = Utc::now().format("%Y-%m").to_string();
    let last_month = Utc::now()
        .checked_sub_months(Months::new(1))
        .expect("previous month");
    let prev_month = last_month.format("%Y-%m").to_string();

    // Register the ordering member through the real registration path.
    let reg = auth_service::register_member(
        &state,
        RegisterRequest {
            username: "hong".into(),
            password: "secret-pw".into(),
            full_name: "Hong Gil-dong".into(),
            email: "hong@example.com".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(!reg.token.is_empty());
    assert!(!reg.member.is_admin);

    // Same username again is rejected.
    let dup = auth_service::register_member(
        &state,
        RegisterRequest {
            username: "hong".into(),
            password: "other-pw".into(),
            full_name: "Someone Else".into(),
            email: "else@example.com".into(),
        },
    )
    .await;
    assert!(matches!(dup, Err(AppError::Duplicate(_))));

    // Wrong password and unknown username fail the same way.
    let bad_login = auth_service::login(
        &state,
        LoginRequest {
            username: "hong".into(),
            password: "wrong".into(),
        },
    )
    .await;
    assert!(matches!(bad_login, Err(AppError::Authentication(_))));

    auth_service::login(
        &state,
        LoginRequest {
            username: "hong".into(),
            password: "secret-pw".into(),
        },
    )
    .await?;

    let user = AuthUser {
        username: "hong".into(),
        member_number: reg.member.member_number.clone(),
        is_admin: false,
    };
    let admin = seed_admin(&state).await?;

    // Admin creates the catalog entry.
    let product = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            product_number: "P1".into(),
            name: "Widget".into(),
            category: "tools".into(),
            price: 1000,
            stock_quantity: 10,
        },
    )
    .await?
    .data
    .unwrap();

    // Non-admin product creation is forbidden.
    let forbidden = product_service::create_product(
        &state,
        &user,
        CreateProductRequest {
            product_number: "P2".into(),
            name: "Gadget".into(),
            category: "tools".into(),
            price: 500,
            stock_quantity: 1,
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    // Second catalog entry to give the list filters something to exclude.
    product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            product_number: "P2".into(),
            name: "Gadget".into(),
            category: "gear".into(),
            price: 500,
            stock_quantity: 3,
        },
    )
    .await?;

    let by_category = product_service::list_products(&state, product_query(Some("tools"), None))
        .await?
        .data
        .unwrap();
    assert_eq!(by_category.items.len(), 1);
    assert_eq!(by_category.items[0].product_number, "P1");

    // Name filter is a case-insensitive substring match.
    let by_name = product_service::list_products(&state, product_query(None, Some("ADG")))
        .await?
        .data
        .unwrap();
    assert_eq!(by_name.items.len(), 1);
    assert_eq!(by_name.items[0].name, "Gadget");

    let no_match = product_service::list_products(&state, product_query(None, Some("zzz")))
        .await?
        .data
        .unwrap();
    assert!(no_match.items.is_empty());

    // Empty filter strings are ignored rather than matching nothing.
    let all = product_service::list_products(&state, product_query(Some(""), Some("")))
        .await?
        .data
        .unwrap();
    assert_eq!(all.items.len(), 2);

    // Place an order for 2 units: stock 10 -> 8, total = 2 * 1000.
    let order = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            product_number: "P1".into(),
            quantity: 2,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.total_amount, 2000);
    assert_eq!(order.price, 1000);
    assert_eq!(fetch_stock(&state, "P1").await?, 8);

    let orders = order_service::list_my_orders(
        &state,
        &user,
        Pagination {
            page: Some(1),
            per_page: Some(20),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(orders.items.len(), 1);

    // Current month: 2000 sold, nothing canceled.
    let stats = order_service::monthly_stats(&state, &admin, &month)
        .await?
        .data
        .unwrap();
    assert_eq!(stats.total_sales, 2000);
    assert_eq!(stats.total_canceled, 0);

    let bad_month = order_service::monthly_stats(&state, &admin, "invalid-month").await;
    assert!(matches!(bad_month, Err(AppError::InvalidMonth(_))));

    let not_admin = order_service::monthly_stats(&state, &user, &month).await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    // A different member cannot cancel someone else's order.
    let other = auth_service::register_member(
        &state,
        RegisterRequest {
            username: "kim".into(),
            password: "kim-pw".into(),
            full_name: "Kim Cheol-su".into(),
            email: "kim@example.com".into(),
        },
    )
    .await?
    .data
    .unwrap();
    let other_user = AuthUser {
        username: "kim".into(),
        member_number: other.member.member_number.clone(),
        is_admin: false,
    };

    // Changing one's email to an address another member holds is a conflict.
    let email_clash = member_service::update_my_info(
        &state,
        &other_user,
        UpdateMemberRequest {
            full_name: None,
            email: Some("hong@example.com".into()),
            password: None,
        },
    )
    .await;
    assert!(matches!(email_clash, Err(AppError::Duplicate(_))));

    let not_owner =
        order_service::cancel_order(&state, &other_user, &order.order_number).await;
    assert!(matches!(not_owner, Err(AppError::Forbidden)));
    assert_eq!(fetch_stock(&state, "P1").await?, 8);

    // Owner cancels: stock restored, order flagged canceled.
    let canceled = order_service::cancel_order(&state, &user, &order.order_number)
        .await?
        .data
        .unwrap();
    assert!(canceled.is_canceled);
    assert_eq!(canceled.total_amount, 2000);
    assert_eq!(fetch_stock(&state, "P1").await?, 10);

    // Double cancellation is a conflict, not a no-op.
    let twice = order_service::cancel_order(&state, &user, &order.order_number).await;
    assert!(matches!(twice, Err(AppError::AlreadyCanceled)));
    assert_eq!(fetch_stock(&state, "P1").await?, 10);

    // The canceled total moved columns.
    let stats = order_service::monthly_stats(&state, &admin, &month)
        .await?
        .data
        .unwrap();
    assert_eq!(stats.total_sales, 0);
    assert_eq!(stats.total_canceled, 2000);

    // An order from the previous month must not leak into this month's totals.
    OrderActive {
        id: Set(Uuid::new_v4()),
        order_number: Set("ORD-LAST".into()),
        ordered_at: Set(last_month.into()),
        member_number: Set(user.member_number.clone()),
        product_number: Set("P1".into()),
        price: Set(1000),
        quantity: Set(3),
        total_amount: Set(3000),
        canceled_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    let stats = order_service::monthly_stats(&state, &admin, &month)
        .await?
        .data
        .unwrap();
    assert_eq!(stats.total_sales, 0);
    assert_eq!(stats.total_canceled, 2000);

    let prev_stats = order_service::monthly_stats(&state, &admin, &prev_month)
        .await?
        .data
        .unwrap();
    assert_eq!(prev_stats.total_sales, 3000);
    assert_eq!(prev_stats.total_canceled, 0);

    // More than the available stock is refused.
    let too_many = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            product_number: "P1".into(),
            quantity: 100,
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::InsufficientStock)));
    assert_eq!(fetch_stock(&state, "P1").await?, 10);

    // Order history blocks deletion, even for canceled orders.
    let blocked = product_service::delete_product(&state, &admin, product.id).await;
    assert!(matches!(blocked, Err(AppError::Validation(_))));

    // Admin stock update is an absolute set.
    let restocked = product_service::update_stock(
        &state,
        &admin,
        product.id,
        UpdateStockRequest { stock_quantity: 5 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(restocked.stock_quantity, 5);

    // Withdrawal is soft and feeds the member statistics.
    let withdrawn = member_service::withdraw_me(&state, &other_user)
        .await?
        .data
        .unwrap();
    assert!(withdrawn.is_withdrawn);
    assert!(withdrawn.withdrawn_at.is_some());

    // A member who joined last month and withdrew this month counts toward
    // each month independently.
    MemberActive {
        id: Set(Uuid::new_v4()),
        member_number: Set("MBR-LAST".into()),
        username: Set("park".into()),
        password_hash: Set("dummy".into()),
        full_name: Set("Park Young-hee".into()),
        email: Set("park@example.com".into()),
        is_admin: Set(false),
        withdrawn_at: Set(Some(Utc::now().into())),
        created_at: Set(last_month.into()),
    }
    .insert(&state.orm)
    .await?;

    let member_stats = member_service::member_stats(&state, &admin, &month)
        .await?
        .data
        .unwrap();
    assert_eq!(member_stats.joined_members, 3);
    assert_eq!(member_stats.withdrawn_members, 2);

    let prev_member_stats = member_service::member_stats(&state, &admin, &prev_month)
        .await?
        .data
        .unwrap();
    assert_eq!(prev_member_stats.joined_members, 1);
    assert_eq!(prev_member_stats.withdrawn_members, 0);

    let not_admin = member_service::member_stats(&state, &user, &month).await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    // Member listing is paginated and admin only.
    let page = member_service::list_members(
        &state,
        &admin,
        Pagination {
            page: Some(1),
            per_page: Some(2),
        },
    )
    .await?;
    assert_eq!(page.meta.as_ref().and_then(|m| m.total), Some(4));
    assert_eq!(page.data.unwrap().items.len(), 2);

    let not_admin = member_service::list_members(
        &state,
        &user,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE orders, audit_logs, products, members RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { orm })
}

async fn seed_admin(state: &AppState) -> anyhow::Result<AuthUser> {
    let member_number = format!("MBR-{}", &Uuid::new_v4().to_string()[..8]);
    MemberActive {
        id: Set(Uuid::new_v4()),
        member_number: Set(member_number.clone()),
        username: Set("admin".into()),
        password_hash: Set("dummy".into()),
        full_name: Set("Admin".into()),
        email: Set("admin@example.com".into()),
        is_admin: Set(true),
        withdrawn_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        username: "admin".into(),
        member_number,
        is_admin: true,
    })
}

fn product_query(category: Option<&str>, q: Option<&str>) -> ProductQuery {
    ProductQuery {
        pagination: Pagination {
            page: None,
            per_page: None,
        },
        category: category.map(Into::into),
        q: q.map(Into::into),
    }
}

async fn fetch_stock(state: &AppState, product_number: &str) -> anyhow::Result<i32> {
    let product = Products::find()
        .filter(ProductCol::ProductNumber.eq(product_number))
        .one(&state.orm)
        .await?
        .expect("product row");
    Ok(product.stock)
}
