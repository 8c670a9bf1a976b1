pub mod quote;
pub mod ticker;
