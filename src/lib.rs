//! `freightline` binary's library root: the CLI argument surface and exit
//! code mapping, kept separate from `main.rs` so integration tests can
//! drive [`cli::run`] directly.

pub mod cli;
pub mod exit_codes;
