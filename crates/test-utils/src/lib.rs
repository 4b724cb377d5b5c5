//! Test utilities for custody wallet components.
//!
//! This crate provides an in-memory coin node and an in-memory repository that implement
//! every capability trait of `custody-engine`, plus fixtures for the records tests seed
//! them with. Both keep their state behind a mutex so a test can adjust or inspect them
//! while an engine owns them.

mod fixture;
mod node;
mod repository;

pub use self::{
    fixture::{address_record, payment_request, public_key, unspent},
    node::{MockNode, MockNodeError},
    repository::{MemoryRepository, MemoryRepositoryError},
};
