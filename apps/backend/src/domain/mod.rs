//! Domain layer: pure order/actor types and the transition policy.

pub mod actor;
pub mod message;
pub mod order;
pub mod transitions;

#[cfg(test)]
mod tests_order;
#[cfg(test)]
mod tests_props_transitions;
#[cfg(test)]
mod tests_transitions;

// Re-exports for ergonomics
pub use actor::{Actor, ActorId, Role};
pub use message::{Message, MessageId, MessageKind, NewMessage};
pub use order::{Order, OrderId, OrderStatus};
