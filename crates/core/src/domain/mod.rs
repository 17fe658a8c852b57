pub mod customer;
pub mod memory;
pub mod product;
pub mod recommendation;
