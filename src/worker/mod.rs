pub mod command;
pub mod header;
pub mod supervisor;
