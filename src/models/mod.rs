pub mod kind;
pub mod message;
pub mod task;
