use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        members::{MemberList, MemberResponse, MemberStatsResponse, UpdateMemberRequest},
        orders::{CreateOrderRequest, OrderList, OrderResponse, OrderStatsResponse},
        products::{CreateProductRequest, ProductList, ProductResponse, UpdateStockRequest},
    },
    response::{ApiResponse, Meta},
    routes::{auth, health, members, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        members::register,
        members::list_members,
        members::my_info,
        members::update_my_info,
        members::withdraw_me,
        members::member_stats,
        products::list_products,
        products::create_product,
        products::update_stock,
        products::delete_product,
        orders::create_order,
        orders::my_orders,
        orders::cancel_order,
        orders::order_stats
    ),
    components(
        schemas(
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            MemberResponse,
            MemberList,
            UpdateMemberRequest,
            MemberStatsResponse,
            CreateProductRequest,
            UpdateStockRequest,
            ProductResponse,
            ProductList,
            CreateOrderRequest,
            OrderResponse,
            OrderList,
            OrderStatsResponse,
            params::Pagination,
            params::ProductQuery,
            params::StatsQuery,
            Meta,
            ApiResponse<MemberResponse>,
            ApiResponse<ProductList>,
            ApiResponse<OrderList>,
            ApiResponse<OrderStatsResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Members", description = "Member endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
