//! Domain-level error type used across services and the realtime layer.
//!
//! This error type is HTTP-agnostic. Handlers return
//! `Result<T, crate::error::AppError>` and convert from `DomainError`
//! using the provided `From<DomainError> for AppError` implementation;
//! the websocket session maps it onto protocol error codes instead.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::domain::{OrderStatus, Role};

/// Domain-level not found entities
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Order,
    Actor,
    Connection,
    Other(String),
}

/// Conflict kinds. A lost claim race is the normal outcome of the
/// assignment protocol, not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    /// Another courier won the claim race.
    AlreadyAssigned,
    /// The order changed underneath a conditional write.
    StaleState,
    /// The per-order lock could not be acquired within the bounded
    /// timeout; treated identically to a lost race.
    Busy,
    Other(String),
}

impl ConflictKind {
    /// Stable reason string surfaced to clients.
    pub fn reason(&self) -> &str {
        match self {
            ConflictKind::AlreadyAssigned => "already_assigned",
            ConflictKind::StaleState => "stale_state",
            ConflictKind::Busy => "busy",
            ConflictKind::Other(reason) => reason,
        }
    }
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input/user validation or business rule violation
    Validation(String),
    /// AccessGuard denial
    Authorization(String),
    /// Missing resource in domain terms
    NotFound(NotFoundKind, String),
    /// Transition absent from the role-gated table
    InvalidTransition {
        role: Role,
        from: OrderStatus,
        to: OrderStatus,
    },
    /// Lost assignment race or stale-state action
    Conflict(ConflictKind, String),
    /// Collaborator failure, surfaced as-is (no retries here)
    Internal(String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(d) => write!(f, "validation error: {d}"),
            DomainError::Authorization(d) => write!(f, "authorization error: {d}"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
            DomainError::InvalidTransition { role, from, to } => {
                write!(f, "invalid transition: {role} may not move {from} -> {to}")
            }
            DomainError::Conflict(kind, d) => write!(f, "conflict {}: {d}", kind.reason()),
            DomainError::Internal(d) => write!(f, "internal error: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
    pub fn authorization(detail: impl Into<String>) -> Self {
        Self::Authorization(detail.into())
    }
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }
    pub fn invalid_transition(role: Role, from: OrderStatus, to: OrderStatus) -> Self {
        Self::InvalidTransition { role, from, to }
    }
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}
