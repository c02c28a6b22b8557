//! HTTP handlers for collection CRUD.

pub mod crud;
pub use crud::*;
