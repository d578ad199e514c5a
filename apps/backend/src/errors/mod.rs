//! Error handling for the dispatch backend.

pub mod domain;


pub use domain::{ConflictKind, DomainError, NotFoundKind};
