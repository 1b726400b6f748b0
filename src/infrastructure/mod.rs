pub mod cart_store;
pub mod memory;
pub mod models;
