// Domain value objects
pub mod history_kind;
pub mod item_names;
pub mod owner;

pub use history_kind::*;
pub use item_names::*;
pub use owner::*;
