use bigdecimal::BigDecimal;

use super::cart::{LineInput, OrderHeader, OrderLine, OrderStatus};
use super::errors::DomainError;

/// Keyed reads and writes against persisted cart state.
///
/// Implementations bind every call to whatever connection context they were
/// created in, so a sequence of calls made inside [`CartStore::atomically`]
/// observes and produces a single consistent snapshot.
pub trait CartOps {
    fn headers_by_user(&self, user_id: i32) -> Result<Vec<OrderHeader>, DomainError>;

    fn find_line(&self, order_id: i32, product_id: i32)
        -> Result<Option<OrderLine>, DomainError>;

    fn lines_by_order(&self, order_id: i32) -> Result<Vec<OrderLine>, DomainError>;

    /// Fails with [`DomainError::WriteFailure`] unless exactly one row lands.
    fn insert_header(&self, header: &OrderHeader) -> Result<(), DomainError>;

    /// Atomic batch insert; fails with [`DomainError::WriteFailure`] unless
    /// every supplied line lands.
    fn insert_lines(&self, order_id: i32, lines: &[LineInput]) -> Result<(), DomainError>;

    /// Fails with [`DomainError::NotFound`] if no `(order_id, product_id)`
    /// row exists.
    fn set_line_quantity(
        &self,
        order_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<(), DomainError>;

    /// Fails with [`DomainError::NotFound`] if no header carries `order_id`.
    fn set_header_status(
        &self,
        order_id: i32,
        status: OrderStatus,
        total_order_value: Option<&BigDecimal>,
    ) -> Result<(), DomainError>;
}

/// Durable keyed storage for order headers and lines.
pub trait CartStore: Send + Sync + 'static {
    /// Run `f` as one atomic unit: either every write made through the
    /// provided [`CartOps`] commits, or none of them does.
    fn atomically<T>(
        &self,
        f: &mut dyn FnMut(&dyn CartOps) -> Result<T, DomainError>,
    ) -> Result<T, DomainError>;
}
