//! CloudFormation access for tables owned by a stack.

mod client;
mod stack;
mod template;

#[cfg(test)]
pub use client::MockStackApi;
pub use client::{CloudFormation, StackApi};
pub use stack::{StackDescriptor, StackProgress, StackUpdate};
pub use template::Template;
