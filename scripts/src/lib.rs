//! Scripts for deploying and configuring the token generator contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod client;
mod commands;
pub mod config;
pub mod constants;
pub mod errors;
#[cfg(test)]
mod mocks;
pub mod nonce;
pub mod orchestrator;
pub mod plan;
mod solidity;
pub mod verify;
