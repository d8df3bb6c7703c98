pub mod gate;
pub mod lifecycle;
pub mod registry;
pub mod scheduler;
