//! HTTP handlers for the generated resources and the discovery document.

pub mod discovery;
pub mod resource;
pub use discovery::*;
pub use resource::*;
