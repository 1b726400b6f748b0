use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::cart::{LineInput, OrderHeader, OrderLine, OrderStatus};
use crate::domain::errors::DomainError;
use crate::schema::{order_lines, orders};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderHeaderRow {
    pub id: i32,
    pub order_id: i32,
    pub user_id: i32,
    pub total_order_value: BigDecimal,
    pub order_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderHeaderRow {
    pub order_id: i32,
    pub user_id: i32,
    pub total_order_value: BigDecimal,
    pub order_status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub product_price: BigDecimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub order_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub product_price: BigDecimal,
    pub quantity: i32,
}

impl TryFrom<OrderHeaderRow> for OrderHeader {
    type Error = DomainError;

    fn try_from(row: OrderHeaderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.order_status).ok_or_else(|| {
            DomainError::Internal(format!("unknown order status '{}'", row.order_status))
        })?;
        Ok(OrderHeader {
            order_id: row.order_id,
            user_id: row.user_id,
            total_order_value: row.total_order_value,
            status,
        })
    }
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
        }
    }
}

impl From<&OrderHeader> for NewOrderHeaderRow {
    fn from(header: &OrderHeader) -> Self {
        NewOrderHeaderRow {
            order_id: header.order_id,
            user_id: header.user_id,
            total_order_value: header.total_order_value.clone(),
            order_status: header.status.as_str().to_string(),
        }
    }
}

impl NewOrderLineRow {
    pub fn from_input(order_id: i32, line: &LineInput) -> Self {
        NewOrderLineRow {
            order_id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            product_price: line.product_price.clone(),
            quantity: line.quantity,
        }
    }
}
