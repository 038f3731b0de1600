//! apiato-cli: command line front end for the Apiato data provider

pub mod cli;

pub use cli::{run, Cli, Command};
