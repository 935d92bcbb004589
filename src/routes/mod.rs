pub mod common;
pub mod resource;

pub use common::common_routes;
pub use resource::{mount_routes, resource_routes};
