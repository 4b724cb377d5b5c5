//! Workflow steps, one module per role concern.

mod create;
mod exchange;
mod monitor;
mod send;
mod sign;
