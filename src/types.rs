pub mod logs;
pub mod push;
pub mod schedule;
pub mod views;
