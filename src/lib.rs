//! Model REST: a generated REST surface (singular and plural endpoints per model) over a
//! registry of data models.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{configure, load_from_path, ModelBinding, ModelConfig, ResolvedResources, ResourceConfig, Shape};
pub use error::{AppError, ConfigError, MalformedQuery, ModelError, ModelErrorKind};
pub use model::{MemoryModel, Model, ModelRegistry, PgModel, ValidationRule};
pub use query::{parse, ParsedQuery, Predicate, QueryOptions};
pub use response::respond;
pub use routes::{common_routes, mount_routes, resource_routes};
pub use service::{Action, CrudDispatcher, Outcome, Payload, WriteIntent};
pub use state::AppState;
pub use store::{ensure_database_exists, pg_registry};
