use std::cell::RefCell;

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use crate::db::DbPool;
use crate::domain::cart::{LineInput, OrderHeader, OrderLine, OrderStatus};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartOps, CartStore};
use crate::schema::{order_lines, orders};

use super::models::{NewOrderHeaderRow, NewOrderLineRow, OrderHeaderRow, OrderLineRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => DomainError::NotFound,
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::WriteFailure(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Postgres-backed [`CartStore`]. Every [`CartStore::atomically`] call runs
/// inside one database transaction, so the state machine's read-then-write
/// sequences commit or roll back as a unit.
pub struct DieselCartStore {
    pool: DbPool,
}

impl DieselCartStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartStore for DieselCartStore {
    fn atomically<T>(
        &self,
        f: &mut dyn FnMut(&dyn CartOps) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<T, DomainError, _>(|conn| {
            let ops = DieselCartOps {
                conn: RefCell::new(conn),
            };
            f(&ops)
        })
    }
}

/// [`CartOps`] bound to the connection of one open transaction. The RefCell
/// bridges diesel's `&mut` connection to the `&self` trait methods; calls
/// never overlap within a transaction, so the borrow is always available.
struct DieselCartOps<'a> {
    conn: RefCell<&'a mut PgConnection>,
}

impl CartOps for DieselCartOps<'_> {
    fn headers_by_user(&self, user_id: i32) -> Result<Vec<OrderHeader>, DomainError> {
        let rows: Vec<OrderHeaderRow> = orders::table
            .filter(orders::user_id.eq(user_id))
            .select(OrderHeaderRow::as_select())
            .order(orders::id.asc())
            .load(&mut **self.conn.borrow_mut())?;
        rows.into_iter().map(OrderHeader::try_from).collect()
    }

    fn find_line(
        &self,
        order_id: i32,
        product_id: i32,
    ) -> Result<Option<OrderLine>, DomainError> {
        let row: Option<OrderLineRow> = order_lines::table
            .filter(order_lines::order_id.eq(order_id))
            .filter(order_lines::product_id.eq(product_id))
            .select(OrderLineRow::as_select())
            .first(&mut **self.conn.borrow_mut())
            .optional()?;
        Ok(row.map(OrderLine::from))
    }

    fn lines_by_order(&self, order_id: i32) -> Result<Vec<OrderLine>, DomainError> {
        let rows: Vec<OrderLineRow> = order_lines::table
            .filter(order_lines::order_id.eq(order_id))
            .select(OrderLineRow::as_select())
            .order(order_lines::id.asc())
            .load(&mut **self.conn.borrow_mut())?;
        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    fn insert_header(&self, header: &OrderHeader) -> Result<(), DomainError> {
        let inserted = diesel::insert_into(orders::table)
            .values(NewOrderHeaderRow::from(header))
            .execute(&mut **self.conn.borrow_mut())?;
        if inserted != 1 {
            return Err(DomainError::WriteFailure(format!(
                "expected to insert 1 header row for order {}, inserted {}",
                header.order_id, inserted
            )));
        }
        log::debug!(
            "Inserted header for order {} (user {})",
            header.order_id,
            header.user_id
        );
        Ok(())
    }

    fn insert_lines(&self, order_id: i32, lines: &[LineInput]) -> Result<(), DomainError> {
        let rows: Vec<NewOrderLineRow> = lines
            .iter()
            .map(|line| NewOrderLineRow::from_input(order_id, line))
            .collect();
        let inserted = diesel::insert_into(order_lines::table)
            .values(&rows)
            .execute(&mut **self.conn.borrow_mut())?;
        if inserted != lines.len() {
            return Err(DomainError::WriteFailure(format!(
                "expected to insert {} line row(s) for order {}, inserted {}",
                lines.len(),
                order_id,
                inserted
            )));
        }
        log::debug!("Inserted {} line(s) for order {}", inserted, order_id);
        Ok(())
    }

    fn set_line_quantity(
        &self,
        order_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<(), DomainError> {
        let updated = diesel::update(
            order_lines::table
                .filter(order_lines::order_id.eq(order_id))
                .filter(order_lines::product_id.eq(product_id)),
        )
        .set(order_lines::quantity.eq(quantity))
        .execute(&mut **self.conn.borrow_mut())?;
        if updated == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn set_header_status(
        &self,
        order_id: i32,
        status: OrderStatus,
        total_order_value: Option<&BigDecimal>,
    ) -> Result<(), DomainError> {
        let target = orders::table.filter(orders::order_id.eq(order_id));
        let updated = match total_order_value {
            Some(total) => diesel::update(target)
                .set((
                    orders::order_status.eq(status.as_str()),
                    orders::total_order_value.eq(total),
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .execute(&mut **self.conn.borrow_mut())?,
            None => diesel::update(target)
                .set((
                    orders::order_status.eq(status.as_str()),
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .execute(&mut **self.conn.borrow_mut())?,
        };
        if updated == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}
