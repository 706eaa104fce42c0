pub mod controller;
pub mod todo_store;
