pub mod range;
pub mod table;
pub mod ticker;
