//! Engine crate for the GApps provisioning daemon: the error taxonomy, job
//! record, registry, handler contracts, concrete handlers, queue manager,
//! daemon supervisor and admin console drain loop. The SQL store, Google
//! API clients and config loader are implemented in sibling crates against
//! the trait boundaries defined here.

pub mod admin;
pub mod config;
pub mod deps;
pub mod directory;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod job;
pub mod queue;
pub mod registry;
pub mod reports;
pub mod store;
pub mod supervisor;

pub use deps::HandlerDeps;
pub use error::ApiError;
pub use handler::JobHandler;
pub use job::{JobPriority, JobRecord, JobStatus};
pub use queue::QueueManager;
pub use registry::JobRegistry;
pub use supervisor::{Supervisor, SupervisorExit};
