use bigdecimal::BigDecimal;

/// Lowest order id the allocator will ever hand out.
pub const MIN_ORDER_ID: i32 = 1;
/// Highest order id; the allocator wraps back to [`MIN_ORDER_ID`] past this.
pub const MAX_ORDER_ID: i32 = 9999;

/// Lifecycle of an order header.
///
/// `Draft` is the only state in which cart mutations (line merges) are
/// allowed; `Approved` and `Cancelled` are terminal for cart purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Draft,
    Approved,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(OrderStatus::Draft),
            "APPROVED" => Some(OrderStatus::Approved),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Order-level record: one per cart/order instance.
///
/// `order_id` values are drawn from `[MIN_ORDER_ID, MAX_ORDER_ID]` and are
/// reused over time, so an id is only a uniqueness key among a user's
/// non-terminal orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderHeader {
    pub order_id: i32,
    pub user_id: i32,
    pub total_order_value: BigDecimal,
    pub status: OrderStatus,
}

/// A single product entry within an order. `quantity` 0 is a tombstone: the
/// row stays persisted but the line counts as removed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub product_price: BigDecimal,
    pub quantity: i32,
}

/// A line as supplied by the caller, before it is bound to an order id.
#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    pub product_id: i32,
    pub product_name: String,
    pub product_price: BigDecimal,
    pub quantity: i32,
}

/// An add-to-cart request. `order_id` 0 means "mint a fresh id for me".
#[derive(Debug, Clone)]
pub struct CartDraft {
    pub user_id: i32,
    pub order_id: i32,
    pub total_order_value: BigDecimal,
    pub lines: Vec<LineInput>,
}

/// A submit request: approves the named draft order and sets the final
/// quantities for the supplied products.
#[derive(Debug, Clone)]
pub struct OrderSubmission {
    pub user_id: i32,
    pub order_id: i32,
    pub total_order_value: BigDecimal,
    pub lines: Vec<LineInput>,
}

/// Caller-facing aggregate: a header together with its grouped lines, in
/// storage retrieval order.
#[derive(Debug, Clone, PartialEq)]
pub struct CartAggregate {
    pub header: OrderHeader,
    pub lines: Vec<OrderLine>,
}
