#![allow(missing_docs)]

pub mod cli;
pub mod config;

mod command;

pub use self::command::{Engine, run};
