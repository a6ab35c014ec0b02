pub mod cli;
pub mod commands;
pub mod fetch;
pub mod output;
