// Domain services

pub mod identity;
pub mod provenance;

pub use identity::*;
pub use provenance::*;
