// Inspect Application Layer

pub mod commands;
pub mod correlation;
pub mod dtos;
pub mod engine;
pub mod error;
pub mod link;
pub mod metrics;
pub mod pool;
pub mod queries;
pub mod scheduler;
pub mod settings;
pub mod state;

pub use engine::{BackgroundTasks, InspectEngine, WorkerEvent};
pub use error::{AppError, InspectError};
pub use link::InspectParams;
pub use metrics::Metrics;
pub use settings::EngineSettings;
pub use state::AppState;
