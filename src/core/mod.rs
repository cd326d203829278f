pub mod board;
pub mod contact;
pub mod task;
pub mod user;
