// Domain entities

pub mod asset;
pub mod credential;
pub mod history;
pub mod item;
pub mod model;
pub mod rankings;

pub use asset::*;
pub use credential::*;
pub use history::*;
pub use item::*;
pub use model::*;
pub use rankings::*;
