pub mod inspect_handlers;
pub mod ops_handlers;

pub use inspect_handlers::*;
pub use ops_handlers::*;
