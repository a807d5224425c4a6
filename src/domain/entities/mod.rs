pub mod aggregate;
pub mod field;
pub mod filter;
pub mod order;
pub mod predicate;
pub mod value;
