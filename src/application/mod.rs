pub mod cart_service;
pub mod order_id;
pub mod projection;
