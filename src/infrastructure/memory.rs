use std::cell::RefCell;
use std::sync::{Mutex, PoisonError};

use bigdecimal::BigDecimal;

use crate::domain::cart::{LineInput, OrderHeader, OrderLine, OrderStatus};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartOps, CartStore};

#[derive(Debug, Clone, Default)]
struct State {
    headers: Vec<OrderHeader>,
    lines: Vec<OrderLine>,
}

/// Non-durable [`CartStore`] holding everything in a single mutex-guarded
/// state. `atomically` snapshots the state before running the closure and
/// restores the snapshot on error, mirroring a rolled-back transaction.
///
/// Backs the unit tests and works as a dev backend; it also enforces the
/// same active-order uniqueness rule the Postgres schema carries.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    state: Mutex<State>,
}

impl CartStore for InMemoryCartStore {
    fn atomically<T>(
        &self,
        f: &mut dyn FnMut(&dyn CartOps) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = state.clone();
        let result = {
            let ops = MemoryCartOps {
                state: RefCell::new(&mut *state),
            };
            f(&ops)
        };
        if result.is_err() {
            *state = snapshot;
        }
        result
    }
}

struct MemoryCartOps<'a> {
    state: RefCell<&'a mut State>,
}

impl CartOps for MemoryCartOps<'_> {
    fn headers_by_user(&self, user_id: i32) -> Result<Vec<OrderHeader>, DomainError> {
        Ok(self
            .state
            .borrow()
            .headers
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_line(
        &self,
        order_id: i32,
        product_id: i32,
    ) -> Result<Option<OrderLine>, DomainError> {
        Ok(self
            .state
            .borrow()
            .lines
            .iter()
            .find(|l| l.order_id == order_id && l.product_id == product_id)
            .cloned())
    }

    fn lines_by_order(&self, order_id: i32) -> Result<Vec<OrderLine>, DomainError> {
        Ok(self
            .state
            .borrow()
            .lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    fn insert_header(&self, header: &OrderHeader) -> Result<(), DomainError> {
        let mut state = self.state.borrow_mut();
        let duplicate_draft = header.status == OrderStatus::Draft
            && state.headers.iter().any(|h| {
                h.user_id == header.user_id
                    && h.order_id == header.order_id
                    && h.status == OrderStatus::Draft
            });
        if duplicate_draft {
            return Err(DomainError::WriteFailure(format!(
                "duplicate draft order {} for user {}",
                header.order_id, header.user_id
            )));
        }
        state.headers.push(header.clone());
        Ok(())
    }

    fn insert_lines(&self, order_id: i32, lines: &[LineInput]) -> Result<(), DomainError> {
        let mut state = self.state.borrow_mut();
        state.lines.extend(lines.iter().map(|line| OrderLine {
            order_id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            product_price: line.product_price.clone(),
            quantity: line.quantity,
        }));
        Ok(())
    }

    fn set_line_quantity(
        &self,
        order_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<(), DomainError> {
        let mut state = self.state.borrow_mut();
        let line = state
            .lines
            .iter_mut()
            .find(|l| l.order_id == order_id && l.product_id == product_id)
            .ok_or(DomainError::NotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    fn set_header_status(
        &self,
        order_id: i32,
        status: OrderStatus,
        total_order_value: Option<&BigDecimal>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.borrow_mut();
        let mut touched = 0;
        for header in state.headers.iter_mut().filter(|h| h.order_id == order_id) {
            header.status = status;
            if let Some(total) = total_order_value {
                header.total_order_value = total.clone();
            }
            touched += 1;
        }
        if touched == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}
