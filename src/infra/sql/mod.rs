pub mod conditions;
pub mod dialect;
pub mod select;
