pub mod browse;
pub mod check;
pub mod drill;
pub mod due;
pub mod stats;
pub mod validate;
