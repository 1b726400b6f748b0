use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::domain::cart::{CartAggregate, CartDraft, LineInput, OrderStatus, OrderSubmission};
use crate::errors::AppError;
use crate::AppCartService;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartLineRequest {
    pub product_id: i32,
    pub product_name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub product_price: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartRequest {
    pub user_id: i32,
    /// Existing draft order id to merge into; 0 (or omitted) mints a new one.
    #[serde(default)]
    pub order_id: i32,
    /// Decimal total as a string, e.g. "27.50"
    pub total_order_value: String,
    pub lines: Vec<CartLineRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddToCartResponse {
    /// The order id the lines ended up under (minted or pre-existing).
    pub order_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub product_id: i32,
    pub product_name: String,
    pub product_price: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub order_id: i32,
    pub user_id: i32,
    pub total_order_value: String,
    pub order_status: String,
    pub lines: Vec<CartLineResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserQuery {
    pub user_id: i32,
}

fn parse_decimal(field: &str, value: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid {} '{}': {}", field, value, e)))
}

fn parse_lines(lines: Vec<CartLineRequest>) -> Result<Vec<LineInput>, AppError> {
    lines
        .into_iter()
        .map(|l| {
            Ok(LineInput {
                product_id: l.product_id,
                product_name: l.product_name,
                product_price: parse_decimal("product_price", &l.product_price)?,
                quantity: l.quantity,
            })
        })
        .collect()
}

impl TryFrom<CartRequest> for CartDraft {
    type Error = AppError;

    fn try_from(req: CartRequest) -> Result<Self, Self::Error> {
        Ok(CartDraft {
            user_id: req.user_id,
            order_id: req.order_id,
            total_order_value: parse_decimal("total_order_value", &req.total_order_value)?,
            lines: parse_lines(req.lines)?,
        })
    }
}

impl TryFrom<CartRequest> for OrderSubmission {
    type Error = AppError;

    fn try_from(req: CartRequest) -> Result<Self, Self::Error> {
        Ok(OrderSubmission {
            user_id: req.user_id,
            order_id: req.order_id,
            total_order_value: parse_decimal("total_order_value", &req.total_order_value)?,
            lines: parse_lines(req.lines)?,
        })
    }
}

impl From<CartAggregate> for CartResponse {
    fn from(aggregate: CartAggregate) -> Self {
        CartResponse {
            order_id: aggregate.header.order_id,
            user_id: aggregate.header.user_id,
            total_order_value: aggregate.header.total_order_value.to_string(),
            order_status: aggregate.header.status.as_str().to_string(),
            lines: aggregate
                .lines
                .into_iter()
                .map(|l| CartLineResponse {
                    product_id: l.product_id,
                    product_name: l.product_name,
                    product_price: l.product_price.to_string(),
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /cart/add
///
/// Adds products to the user's cart: merges into the named draft order if
/// one exists, otherwise creates a new order under a freshly minted id.
#[utoipa::path(
    post,
    path = "/cart/add",
    request_body = CartRequest,
    responses(
        (status = 201, description = "Products added to cart", body = AddToCartResponse),
        (status = 400, description = "Malformed request payload"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    service: web::Data<AppCartService>,
    body: web::Json<CartRequest>,
) -> Result<HttpResponse, AppError> {
    let draft = CartDraft::try_from(body.into_inner())?;
    let service = service.into_inner();
    let order_id = web::block(move || service.add_to_cart(draft))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(AddToCartResponse { order_id }))
}

/// POST /cart/submit
///
/// Approves the named draft order, recording the final total and the final
/// quantity of every supplied product.
#[utoipa::path(
    post,
    path = "/cart/submit",
    request_body = CartRequest,
    responses(
        (status = 204, description = "Order approved"),
        (status = 400, description = "Malformed request payload"),
        (status = 404, description = "No draft order under the supplied id"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn submit_order(
    service: web::Data<AppCartService>,
    body: web::Json<CartRequest>,
) -> Result<HttpResponse, AppError> {
    let submission = OrderSubmission::try_from(body.into_inner())?;
    let service = service.into_inner();
    web::block(move || service.submit_order(submission))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /cart/{order_id}/lines/{product_id}
///
/// Removes a product from the cart by zeroing its quantity; cancelling the
/// order when no units remain on any line.
#[utoipa::path(
    delete,
    path = "/cart/{order_id}/lines/{product_id}",
    params(
        ("order_id" = i32, Path, description = "Order id"),
        ("product_id" = i32, Path, description = "Product id"),
    ),
    responses(
        (status = 204, description = "Line removed"),
        (status = 404, description = "Order or line not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn remove_line(
    service: web::Data<AppCartService>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, AppError> {
    let (order_id, product_id) = path.into_inner();
    let service = service.into_inner();
    web::block(move || service.remove_line(order_id, product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /cart/details?user_id=…
///
/// Returns the user's current carts (draft orders only).
#[utoipa::path(
    get,
    path = "/cart/details",
    params(
        ("user_id" = i32, Query, description = "Owner of the carts"),
    ),
    responses(
        (status = 200, description = "Draft carts for the user", body = [CartResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn cart_details(
    service: web::Data<AppCartService>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.into_inner().user_id;
    let service = service.into_inner();
    let aggregates = web::block(move || service.project(user_id, Some(OrderStatus::Draft)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<CartResponse> = aggregates.into_iter().map(CartResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /cart/orders?user_id=…
///
/// Returns the user's full order history, any status.
#[utoipa::path(
    get,
    path = "/cart/orders",
    params(
        ("user_id" = i32, Query, description = "Owner of the orders"),
    ),
    responses(
        (status = 200, description = "All orders for the user", body = [CartResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn order_details(
    service: web::Data<AppCartService>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = query.into_inner().user_id;
    let service = service.into_inner();
    let aggregates = web::block(move || service.project(user_id, None))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let body: Vec<CartResponse> = aggregates.into_iter().map(CartResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}
