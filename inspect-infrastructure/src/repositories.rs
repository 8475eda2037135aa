pub mod accounts_file;
pub mod memory_store;

pub use accounts_file::*;
pub use memory_store::*;
