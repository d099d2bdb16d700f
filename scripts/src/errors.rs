//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Error reading a file from disk
    ReadFile(String),
    /// Error parsing a compilation artifact or build-info file
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error fetching the nonce of the deployer
    NonceFetching(String),
    /// Error reading chain state (balance, code) over RPC
    RpcRequest(String),
    /// Error constructing calldata for a constructor or contract method
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// No code exists at an address the scripts expected to attach to
    ContractNotFound(String),
    /// A deployment plan is malformed
    InvalidPlan(String),
    /// Error verifying a contract's source with the block explorer
    Verification(String),
    /// Missing or inconsistent network configuration
    Config(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::NonceFetching(s) => write!(f, "error fetching nonce: {}", s),
            ScriptError::RpcRequest(s) => write!(f, "error querying node: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::ContractNotFound(s) => write!(f, "no contract found: {}", s),
            ScriptError::InvalidPlan(s) => write!(f, "invalid deployment plan: {}", s),
            ScriptError::Verification(s) => write!(f, "error verifying contract: {}", s),
            ScriptError::Config(s) => write!(f, "invalid configuration: {}", s),
        }
    }
}

impl Error for ScriptError {}
