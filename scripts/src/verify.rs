//! Source verification against an Etherscan-compatible block explorer

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy::primitives::{Address, Bytes};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::info;

use crate::{
    artifacts::ContractId,
    constants::{
        ALREADY_VERIFIED, MAX_VERIFICATION_POLLS, STANDARD_JSON_CODE_FORMAT,
        VERIFICATION_PASSED, VERIFICATION_PENDING, VERIFICATION_POLL_INTERVAL,
    },
    errors::ScriptError,
};

/// Everything needed to verify one deployed contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The contract that was deployed
    pub id: ContractId,
    /// Where it was deployed
    pub address: Address,
    /// The ABI-encoded constructor arguments it was deployed with
    pub constructor_args: Bytes,
    /// The build-info file holding the compiler input
    pub build_info: Option<PathBuf>,
}

/// A service that checks deployed bytecode against its source
#[allow(async_fn_in_trait)]
pub trait SourceVerifier {
    /// Submit `request` and wait for the service's verdict
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError>;
}

/// The parts of a Hardhat build-info file needed for verification
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo {
    /// The full compiler version, e.g. `0.8.4+commit.c7e474f2`
    solc_long_version: String,
    /// The standard JSON input passed to the compiler
    input: Value,
}

impl BuildInfo {
    /// Read a build-info file
    fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))
    }
}

/// The envelope of every Etherscan API response
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    /// `"1"` on success, `"0"` otherwise
    status: String,
    /// A short description of the status
    #[allow(dead_code)]
    message: String,
    /// The payload: a GUID, a verification status, or an error message
    result: String,
}

/// How the explorer answered a verification submission
#[derive(Debug, PartialEq, Eq)]
enum Submission {
    /// Queued under the given GUID
    Queued(String),
    /// The explorer already has the source
    AlreadyVerified,
}

/// The state of a queued verification
#[derive(Debug, PartialEq, Eq)]
enum Status {
    /// Still waiting in the explorer's queue
    Pending,
    /// Source matched the bytecode
    Verified,
    /// The explorer rejected the source
    Failed(String),
}

/// Interpret the response to a `verifysourcecode` request
fn interpret_submission(response: EtherscanResponse) -> Result<Submission, ScriptError> {
    if response.status == "1" {
        return Ok(Submission::Queued(response.result));
    }

    if response.result.to_lowercase().contains(ALREADY_VERIFIED) {
        Ok(Submission::AlreadyVerified)
    } else {
        Err(ScriptError::Verification(response.result))
    }
}

/// Interpret the response to a `checkverifystatus` request
fn interpret_status(response: EtherscanResponse) -> Status {
    if response.result == VERIFICATION_PENDING {
        Status::Pending
    } else if response.result == VERIFICATION_PASSED
        || response.result.to_lowercase().contains(ALREADY_VERIFIED)
    {
        Status::Verified
    } else {
        Status::Failed(response.result)
    }
}

/// The compiler version string Etherscan expects
fn compiler_version(solc_long_version: &str) -> String {
    format!("v{}", solc_long_version.trim_start_matches('v'))
}

/// A [`SourceVerifier`] backed by an Etherscan-compatible HTTP API
pub struct EtherscanVerifier {
    /// The HTTP client
    client: reqwest::Client,
    /// The API endpoint, e.g. `https://api.etherscan.io/api`
    api_url: String,
    /// The API key
    api_key: String,
    /// The interval between status polls
    poll_interval: Duration,
    /// The maximum number of status polls per contract
    max_polls: usize,
}

impl EtherscanVerifier {
    /// Create a verifier for the explorer at `api_url`
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            poll_interval: VERIFICATION_POLL_INTERVAL,
            max_polls: MAX_VERIFICATION_POLLS,
        }
    }

    /// Replace the polling schedule
    #[cfg(test)]
    fn with_polling(mut self, poll_interval: Duration, max_polls: usize) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    /// Send a request and parse the response envelope
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<EtherscanResponse, ScriptError> {
        request
            .send()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .json()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))
    }

    /// Submit the source of a contract, returning how the explorer answered
    async fn submit(&self, request: &VerificationRequest) -> Result<Submission, ScriptError> {
        let build_info_path = request.build_info.as_ref().ok_or_else(|| {
            ScriptError::Verification(format!("no build-info found for {}", request.id))
        })?;
        let build_info = BuildInfo::load(build_info_path)?;
        let source_code = serde_json::to_string(&build_info.input)
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        let form = [
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", format!("{:#x}", request.address)),
            ("sourceCode", source_code),
            ("codeformat", STANDARD_JSON_CODE_FORMAT.to_string()),
            ("contractname", request.id.to_string()),
            ("compilerversion", compiler_version(&build_info.solc_long_version)),
            // Etherscan's parameter name is misspelled
            ("constructorArguements", hex::encode(&request.constructor_args)),
        ];

        let response = self.send(self.client.post(&self.api_url).form(&form)).await?;
        interpret_submission(response)
    }

    /// Poll a queued verification until the explorer reaches a verdict
    async fn await_verdict(&self, guid: &str) -> Result<(), ScriptError> {
        let query = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "checkverifystatus"),
            ("guid", guid),
        ];

        for _ in 0..self.max_polls {
            sleep(self.poll_interval).await;

            let response = self.send(self.client.get(&self.api_url).query(&query)).await?;
            match interpret_status(response) {
                Status::Pending => continue,
                Status::Verified => return Ok(()),
                Status::Failed(reason) => return Err(ScriptError::Verification(reason)),
            }
        }

        Err(ScriptError::Verification(format!(
            "verification {guid} still pending after {} polls",
            self.max_polls
        )))
    }
}

impl SourceVerifier for EtherscanVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        match self.submit(request).await? {
            Submission::AlreadyVerified => {
                info!("{} at {:#x} is already verified", request.id, request.address);
                Ok(())
            }
            Submission::Queued(guid) => {
                self.await_verdict(&guid).await?;
                info!("Verified {} at {:#x}", request.id, request.address);
                Ok(())
            }
        }
    }
}
