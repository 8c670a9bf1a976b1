pub mod export;
pub mod table;
