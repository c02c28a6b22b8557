//! Router composition: the registrar every binder funnels through, the CRUD
//! binder, and the stock health/version routes.

pub mod common;
pub mod crud;
pub mod registrar;

pub use common::*;
pub use crud::*;
pub use registrar::*;
