pub mod error;
pub mod filter;
pub mod storage;
pub mod todo;
