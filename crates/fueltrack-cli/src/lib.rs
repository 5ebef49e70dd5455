//! Command-line tool for the fuel price tracker.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `start` | Start the dashboard server in the background |
//! | `stop` | Stop the background server |
//! | `status` | Report whether the server runs, with the record count (default) |
//! | `restart` | Stop, then start the server |
//! | `fetch` | Fetch and store today's price for every configured station |
//!
//! Every command exits with 0 on success and 1 on failure. `status` exits
//! with 1 when the server is not running, so it can be used in scripts.

pub mod cli;
pub mod commands;
pub mod fetch;
pub mod process;
pub mod supervisor;
