//! CrudDispatcher: the eight singular/plural operations over the model layer.

mod crud;
pub use crud::{Action, CrudDispatcher, Outcome, Payload, WriteIntent};
