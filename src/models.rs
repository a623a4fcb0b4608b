pub mod quotes;
pub mod sync;
