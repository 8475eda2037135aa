pub mod gateway_worker;
pub mod health_service;
pub mod ping_service;

pub use gateway_worker::*;
pub use health_service::*;
pub use ping_service::*;
