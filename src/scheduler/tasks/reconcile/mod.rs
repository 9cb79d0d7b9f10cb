pub mod controller;
pub mod loop_runner;
pub mod task;
