pub mod retry;
pub mod tasks;
