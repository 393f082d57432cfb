//! CLI module - argument declaration, parser construction and dispatch

pub mod args;
pub mod discovery;
pub mod help;
pub mod helpers;
pub mod parser;
pub mod registry;
pub mod shell;
pub mod table;

pub use args::{GlobalOpts, PROG};
pub use shell::Shell;
