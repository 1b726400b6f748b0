use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::cart::{
    CartAggregate, CartDraft, OrderHeader, OrderStatus, OrderSubmission, MAX_ORDER_ID,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartOps, CartStore};

use super::order_id::OrderIdAllocator;
use super::projection;

/// Drives the cart lifecycle: decides for every mutation whether to create a
/// new order, merge into an existing draft, or cancel, and applies the
/// decision to the store as one atomic unit.
pub struct CartService<S> {
    store: S,
    order_ids: Arc<OrderIdAllocator>,
}

impl<S: CartStore> CartService<S> {
    pub fn new(store: S, order_ids: Arc<OrderIdAllocator>) -> Self {
        Self { store, order_ids }
    }

    /// Add products to a user's cart.
    ///
    /// If `draft.order_id` names one of the user's DRAFT orders, the first
    /// supplied line is merged into it: a new product becomes a new line, a
    /// product already in the cart gets its quantity bumped by exactly one
    /// (repeated add-to-cart clicks add one unit, whatever quantity the
    /// request carries). Otherwise a fresh order is created under a minted
    /// id and all supplied lines are inserted with it.
    ///
    /// Returns the order id the lines ended up under.
    pub fn add_to_cart(&self, draft: CartDraft) -> Result<i32, DomainError> {
        self.store.atomically(&mut |ops| {
            let headers = ops.headers_by_user(draft.user_id)?;
            let merge_target = draft.order_id != 0
                && headers
                    .iter()
                    .any(|h| h.order_id == draft.order_id && h.status == OrderStatus::Draft);

            if merge_target {
                self.merge_into_draft(ops, &draft)
            } else {
                self.create_order(ops, &headers, &draft)
            }
        })
    }

    fn merge_into_draft(&self, ops: &dyn CartOps, draft: &CartDraft) -> Result<i32, DomainError> {
        let line = draft.lines.first().ok_or_else(|| {
            DomainError::InvalidInput("merging into a cart requires at least one line".to_string())
        })?;
        match ops.find_line(draft.order_id, line.product_id)? {
            Some(existing) => {
                ops.set_line_quantity(draft.order_id, line.product_id, existing.quantity + 1)?;
            }
            None => ops.insert_lines(draft.order_id, std::slice::from_ref(line))?,
        }
        Ok(draft.order_id)
    }

    fn create_order(
        &self,
        ops: &dyn CartOps,
        headers: &[OrderHeader],
        draft: &CartDraft,
    ) -> Result<i32, DomainError> {
        let order_id = self.mint_order_id(draft.order_id, headers)?;
        log::info!(
            "Creating order {} for user {} with {} line(s)",
            order_id,
            draft.user_id,
            draft.lines.len()
        );
        ops.insert_header(&OrderHeader {
            order_id,
            user_id: draft.user_id,
            total_order_value: draft.total_order_value.clone(),
            status: OrderStatus::Draft,
        })?;
        ops.insert_lines(order_id, &draft.lines)?;
        Ok(order_id)
    }

    /// Pick an order id that does not collide with any of the user's loaded
    /// headers: the supplied id when non-zero, otherwise freshly allocated,
    /// re-drawing from the allocator until the candidate is free.
    ///
    /// The check runs against the header snapshot loaded at the start of the
    /// enclosing operation, not against live storage; a concurrent creation
    /// racing for the same id in the same wraparound window is caught by the
    /// store's uniqueness constraint instead.
    fn mint_order_id(&self, supplied: i32, headers: &[OrderHeader]) -> Result<i32, DomainError> {
        let in_use: HashSet<i32> = headers.iter().map(|h| h.order_id).collect();
        let mut candidate = if supplied != 0 {
            supplied
        } else {
            self.order_ids.next()
        };
        let mut redraws = 0;
        while in_use.contains(&candidate) {
            redraws += 1;
            // One full cycle of the allocator visits every id in the range.
            if redraws > MAX_ORDER_ID {
                return Err(DomainError::IdSpaceExhausted);
            }
            candidate = self.order_ids.next();
        }
        Ok(candidate)
    }

    /// Approve a draft order: set its status to APPROVED, record the final
    /// total, and set the quantity of each supplied product to the supplied
    /// value (a quantity-set, unlike the add-to-cart increment).
    ///
    /// Lines are paired to persisted rows by product id. Fails with
    /// [`DomainError::NotFound`] when the user has no DRAFT order under
    /// `submission.order_id`.
    pub fn submit_order(&self, submission: OrderSubmission) -> Result<(), DomainError> {
        self.store.atomically(&mut |ops| {
            let headers = ops.headers_by_user(submission.user_id)?;
            let is_draft = headers
                .iter()
                .any(|h| h.order_id == submission.order_id && h.status == OrderStatus::Draft);
            if !is_draft {
                return Err(DomainError::NotFound);
            }

            ops.set_header_status(
                submission.order_id,
                OrderStatus::Approved,
                Some(&submission.total_order_value),
            )?;
            for line in &submission.lines {
                ops.set_line_quantity(submission.order_id, line.product_id, line.quantity)?;
            }
            log::info!(
                "Approved order {} for user {}",
                submission.order_id,
                submission.user_id
            );
            Ok(())
        })
    }

    /// Remove a product from a cart by tombstoning its line (quantity 0).
    /// When that leaves the whole order at quantity zero, the header is
    /// cancelled.
    pub fn remove_line(&self, order_id: i32, product_id: i32) -> Result<(), DomainError> {
        self.store.atomically(&mut |ops| {
            ops.set_line_quantity(order_id, product_id, 0)?;
            let remaining: i32 = ops
                .lines_by_order(order_id)?
                .iter()
                .map(|line| line.quantity)
                .sum();
            if remaining == 0 {
                log::info!("Order {} has no units left, cancelling", order_id);
                ops.set_header_status(order_id, OrderStatus::Cancelled, None)?;
            }
            Ok(())
        })
    }

    /// Read a user's orders as aggregates, optionally filtered by status
    /// (DRAFT for the current cart, unfiltered for order history).
    pub fn project(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<CartAggregate>, DomainError> {
        self.store
            .atomically(&mut |ops| projection::project(ops, user_id, status))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bigdecimal::BigDecimal;

    use super::CartService;
    use crate::application::order_id::OrderIdAllocator;
    use crate::domain::cart::{
        CartDraft, LineInput, OrderHeader, OrderStatus, OrderSubmission, MAX_ORDER_ID,
        MIN_ORDER_ID,
    };
    use crate::domain::errors::DomainError;
    use crate::domain::ports::{CartOps, CartStore};
    use crate::infrastructure::memory::InMemoryCartStore;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn line(product_id: i32, quantity: i32) -> LineInput {
        LineInput {
            product_id,
            product_name: format!("product-{product_id}"),
            product_price: dec("1.50"),
            quantity,
        }
    }

    fn draft(user_id: i32, order_id: i32, lines: Vec<LineInput>) -> CartDraft {
        CartDraft {
            user_id,
            order_id,
            total_order_value: dec("3.00"),
            lines,
        }
    }

    fn service() -> CartService<InMemoryCartStore> {
        CartService::new(
            InMemoryCartStore::default(),
            Arc::new(OrderIdAllocator::new()),
        )
    }

    #[test]
    fn first_add_creates_draft_order_with_minted_id() {
        let service = service();

        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");
        assert!((MIN_ORDER_ID..=MAX_ORDER_ID).contains(&order_id));

        let carts = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].header.order_id, order_id);
        assert_eq!(carts[0].header.status, OrderStatus::Draft);
        assert_eq!(carts[0].header.total_order_value, dec("3.00"));
        assert_eq!(carts[0].lines.len(), 1);
        assert_eq!(carts[0].lines[0].product_id, 5);
        assert_eq!(carts[0].lines[0].quantity, 2);
    }

    #[test]
    fn repeated_add_increments_quantity_by_one() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");

        // Supplied quantity 7 is ignored on merge: one click adds one unit.
        let merged_id = service
            .add_to_cart(draft(42, order_id, vec![line(5, 7)]))
            .expect("merge failed");
        assert_eq!(merged_id, order_id);

        let carts = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(carts.len(), 1, "no second header may appear");
        assert_eq!(carts[0].lines[0].quantity, 3);
    }

    #[test]
    fn merge_adds_unknown_product_as_new_line() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");

        service
            .add_to_cart(draft(42, order_id, vec![line(9, 4)]))
            .expect("merge failed");

        let carts = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].lines.len(), 2);
        let added = carts[0]
            .lines
            .iter()
            .find(|l| l.product_id == 9)
            .expect("new line missing");
        assert_eq!(added.quantity, 4, "inserted lines keep their quantity");
    }

    #[test]
    fn unmatched_order_id_creates_a_new_order() {
        let service = service();
        let first = service
            .add_to_cart(draft(42, 0, vec![line(5, 1)]))
            .expect("add failed");

        let second = service
            .add_to_cart(draft(42, first + 100, vec![line(5, 1)]))
            .expect("add failed");
        assert_ne!(second, first);

        let carts = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(carts.len(), 2);
    }

    #[test]
    fn minting_skips_ids_already_held_by_the_user() {
        let service = service();
        // Occupy ids 1, 2 and 3 with explicitly supplied ids; the shared
        // allocator has not moved yet, so its next raw value is 1.
        for id in 1..=3 {
            service
                .add_to_cart(draft(7, id, vec![line(id, 1)]))
                .expect("seed add failed");
        }

        let minted = service
            .add_to_cart(draft(7, 0, vec![line(50, 1)]))
            .expect("add failed");
        assert_eq!(minted, 4, "first id outside {{1,2,3}}");
    }

    #[test]
    fn approved_orders_are_not_merge_targets() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");
        service
            .submit_order(OrderSubmission {
                user_id: 42,
                order_id,
                total_order_value: dec("3.00"),
                lines: vec![line(5, 2)],
            })
            .expect("submit failed");

        // Same order id, but the header is terminal now: a new order must be
        // created under a different id.
        let new_id = service
            .add_to_cart(draft(42, order_id, vec![line(5, 1)]))
            .expect("add failed");
        assert_ne!(new_id, order_id);

        let drafts = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].header.order_id, new_id);
    }

    #[test]
    fn submit_approves_and_sets_quantities_by_product_id() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2), line(9, 1)]))
            .expect("add failed");

        service
            .submit_order(OrderSubmission {
                user_id: 42,
                order_id,
                total_order_value: dec("15.00"),
                // Only product 5 is re-quantified; supplied order of lines
                // must not matter.
                lines: vec![line(5, 10)],
            })
            .expect("submit failed");

        let orders = service.project(42, None).expect("project failed");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].header.status, OrderStatus::Approved);
        assert_eq!(orders[0].header.total_order_value, dec("15.00"));
        let by_product = |id: i32| {
            orders[0]
                .lines
                .iter()
                .find(|l| l.product_id == id)
                .expect("line missing")
                .quantity
        };
        assert_eq!(by_product(5), 10, "quantity-set, not increment");
        assert_eq!(by_product(9), 1, "untouched line keeps its quantity");
    }

    #[test]
    fn submit_without_matching_draft_is_not_found() {
        let service = service();
        let result = service.submit_order(OrderSubmission {
            user_id: 42,
            order_id: 17,
            total_order_value: dec("1.00"),
            lines: vec![line(5, 1)],
        });
        assert!(matches!(result, Err(DomainError::NotFound)));
    }

    #[test]
    fn failed_submit_leaves_no_partial_state() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");

        // Product 99 has no persisted line, so the second quantity-set fails
        // after the status update already ran; the whole operation must roll
        // back.
        let result = service.submit_order(OrderSubmission {
            user_id: 42,
            order_id,
            total_order_value: dec("99.00"),
            lines: vec![line(5, 4), line(99, 1)],
        });
        assert!(matches!(result, Err(DomainError::NotFound)));

        let orders = service.project(42, None).expect("project failed");
        assert_eq!(orders[0].header.status, OrderStatus::Draft);
        assert_eq!(orders[0].header.total_order_value, dec("3.00"));
        assert_eq!(orders[0].lines[0].quantity, 2);
    }

    #[test]
    fn removing_last_line_cancels_the_order() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");

        service.remove_line(order_id, 5).expect("remove failed");

        let orders = service.project(42, None).expect("project failed");
        assert_eq!(orders[0].header.status, OrderStatus::Cancelled);
        assert_eq!(orders[0].lines[0].quantity, 0, "tombstone row remains");
    }

    #[test]
    fn removing_one_of_two_lines_keeps_the_draft_alive() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2), line(9, 1)]))
            .expect("add failed");

        service.remove_line(order_id, 5).expect("remove failed");

        let orders = service.project(42, None).expect("project failed");
        assert_eq!(orders[0].header.status, OrderStatus::Draft);
        let by_product = |id: i32| {
            orders[0]
                .lines
                .iter()
                .find(|l| l.product_id == id)
                .expect("line missing")
                .quantity
        };
        assert_eq!(by_product(5), 0);
        assert_eq!(by_product(9), 1);
    }

    #[test]
    fn removing_unknown_line_is_not_found() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");

        let result = service.remove_line(order_id, 999);
        assert!(matches!(result, Err(DomainError::NotFound)));

        // The header must not have been touched by the failed removal.
        let orders = service.project(42, None).expect("project failed");
        assert_eq!(orders[0].header.status, OrderStatus::Draft);
    }

    #[test]
    fn projection_is_idempotent_without_mutations() {
        let service = service();
        service
            .add_to_cart(draft(42, 0, vec![line(5, 2), line(9, 1)]))
            .expect("add failed");
        service
            .add_to_cart(draft(42, 500, vec![line(3, 1)]))
            .expect("add failed");

        let first = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        let second = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(first, second);
    }

    #[test]
    fn header_without_lines_projects_as_empty_aggregate() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![]))
            .expect("add failed");

        let carts = service
            .project(42, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].header.order_id, order_id);
        assert!(carts[0].lines.is_empty());
    }

    #[test]
    fn merge_with_no_lines_is_invalid_input() {
        let service = service();
        let order_id = service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");

        let result = service.add_to_cart(draft(42, order_id, vec![]));
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn projections_are_scoped_to_the_requesting_user() {
        let service = service();
        service
            .add_to_cart(draft(42, 0, vec![line(5, 2)]))
            .expect("add failed");
        service
            .add_to_cart(draft(43, 0, vec![line(6, 1)]))
            .expect("add failed");

        let carts = service
            .project(43, Some(OrderStatus::Draft))
            .expect("project failed");
        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].header.user_id, 43);
        assert_eq!(carts[0].lines[0].product_id, 6);
    }

    #[test]
    fn minting_fails_once_every_id_is_taken() {
        let store = InMemoryCartStore::default();
        store
            .atomically(&mut |ops| {
                for id in MIN_ORDER_ID..=MAX_ORDER_ID {
                    ops.insert_header(&OrderHeader {
                        order_id: id,
                        user_id: 42,
                        total_order_value: dec("1.00"),
                        status: OrderStatus::Draft,
                    })?;
                }
                Ok(())
            })
            .expect("seeding failed");
        let service = CartService::new(store, Arc::new(OrderIdAllocator::new()));

        let result = service.add_to_cart(draft(42, 0, vec![line(5, 1)]));
        assert!(matches!(result, Err(DomainError::IdSpaceExhausted)));
    }
}
