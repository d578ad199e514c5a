//! Application services: authorization, atomic courier assignment, and
//! the coordinator facade composing them.

pub mod access;
pub mod assignment;
pub mod orders;

#[cfg(test)]
mod tests_orders;

pub use access::{AccessGuard, Action};
pub use assignment::AssignmentCoordinator;
pub use orders::{DetailsPatch, NewOrder, OrderCoordinator};
