use crate::domain::cart::{CartAggregate, OrderStatus};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartOps;

/// Assemble the caller-facing view of a user's orders: one aggregate per
/// header, with the header's lines grouped under it in storage retrieval
/// order. Headers without lines yield an aggregate with an empty line list.
///
/// Pure read; imposes no ordering of its own beyond what the store returns.
pub fn project(
    ops: &dyn CartOps,
    user_id: i32,
    status: Option<OrderStatus>,
) -> Result<Vec<CartAggregate>, DomainError> {
    ops.headers_by_user(user_id)?
        .into_iter()
        .filter(|header| status.map_or(true, |s| header.status == s))
        .map(|header| {
            let lines = ops.lines_by_order(header.order_id)?;
            Ok(CartAggregate { header, lines })
        })
        .collect()
}
