//! Constants used in the deploy scripts

use std::time::Duration;

// -----------
// | Amounts |
// -----------

/// 0.01 units of the native asset, in wei
pub const ONE_HUNDREDTH: u128 = 10_000_000_000_000_000;

/// 0.1 units of the native asset, in wei
pub const POINT_ONE: u128 = 100_000_000_000_000_000;

/// 0.5 units of the native asset, in wei
pub const ONE_HALF: u128 = 500_000_000_000_000_000;

/// 1 unit of the native asset, in wei
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// The number of wei in a gwei
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// The legacy gas price used for mainnet deployments, in gwei
pub const MAINNET_GAS_PRICE_GWEI: u128 = 3;

// ----------
// | Delays |
// ----------

/// The pause before the first transaction of a run
pub const STARTUP_DELAY: Duration = Duration::from_secs(1);

/// The pause after attaching to an existing contract
pub const ATTACH_DELAY: Duration = Duration::from_secs(3);

/// The pause after each configuration call
pub const CALL_DELAY: Duration = Duration::from_secs(5);

/// The pause after each verification attempt
pub const VERIFY_DELAY: Duration = Duration::from_secs(1);

/// The pause after each deployment on mainnet
pub const MAINNET_DEPLOY_DELAY: Duration = Duration::from_secs(6);

/// The pause after each deployment on testnet
pub const TESTNET_DEPLOY_DELAY: Duration = Duration::from_secs(5);

// ------------------
// | Contract names |
// ------------------

/// The fully-qualified name of the base token implementation
pub const BASE_TOKEN_CONTRACT: &str = "contracts/Tokens/BaseToken.sol:BaseToken";

/// The fully-qualified name of the custom token implementation
pub const CUSTOM_TOKEN_CONTRACT: &str = "contracts/Tokens/CustomToken.sol:CustomToken";

/// The fully-qualified name of the reward token implementation
pub const REWARD_TOKEN_CONTRACT: &str = "contracts/Tokens/RewardToken.sol:RewardToken";

/// The fully-qualified name of the fee receiver implementation
pub const FEE_RECEIVER_CONTRACT: &str = "contracts/TaxReceivers/FeeReceiver.sol:FeeReceiver";

/// The fully-qualified name of the distributor implementation
pub const DISTRIBUTOR_CONTRACT: &str = "contracts/Distributors/Distributor.sol:Distributor";

/// The fully-qualified name of the distributor generator
pub const DISTRIBUTOR_GENERATOR_CONTRACT: &str =
    "contracts/Generators/DistributorGenerator.sol:DistributorGenerator";

/// The fully-qualified name of the tax receiver generator
pub const TAX_RECEIVER_GENERATOR_CONTRACT: &str =
    "contracts/Generators/TaxReceiverGenerator.sol:TaxReceiverGenerator";

/// The fully-qualified name of the token generator
pub const TOKEN_GENERATOR_CONTRACT: &str =
    "contracts/Generators/TokenGenerator.sol:TokenGenerator";

// ---------------
// | Handle keys |
// ---------------

/// The base token implementation handle
pub const BASE_TOKEN_KEY: &str = "BaseToken";

/// The custom token implementation handle
pub const CUSTOM_TOKEN_KEY: &str = "CustomToken";

/// The reward token implementation handle
pub const REWARD_TOKEN_KEY: &str = "RewardToken";

/// The fee receiver implementation handle
pub const FEE_RECEIVER_KEY: &str = "FeeReceiver";

/// The distributor implementation handle
pub const DISTRIBUTOR_KEY: &str = "Distributor";

/// The distributor generator handle
pub const DISTRIBUTOR_GENERATOR_KEY: &str = "DistributorGenerator";

/// The tax receiver generator handle
pub const TAX_RECEIVER_GENERATOR_KEY: &str = "TaxReceiverGenerator";

/// The token generator handle
pub const TOKEN_GENERATOR_KEY: &str = "TokenGenerator";

// -------------
// | Token ids |
// -------------

/// The token type id of the base token
pub const BASE_TOKEN_TYPE: u64 = 0;

/// The token type id of the custom token
pub const CUSTOM_TOKEN_TYPE: u64 = 1;

/// The token type id of the reward token
pub const REWARD_TOKEN_TYPE: u64 = 2;

// -------------
// | Artifacts |
// -------------

/// The default location of the Hardhat artifacts directory
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The extension of a Hardhat contract artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of a Hardhat debug file, which points at the build-info
pub const DEBUG_FILE_EXTENSION: &str = "dbg.json";

// ----------------
// | Verification |
// ----------------

/// The code format Etherscan expects for standard JSON input
pub const STANDARD_JSON_CODE_FORMAT: &str = "solidity-standard-json-input";

/// The result Etherscan returns while a verification is queued
pub const VERIFICATION_PENDING: &str = "Pending in queue";

/// The result Etherscan returns once a verification succeeds
pub const VERIFICATION_PASSED: &str = "Pass - Verified";

/// The substring Etherscan uses to report an already-verified contract
pub const ALREADY_VERIFIED: &str = "already verified";

/// The interval between verification status polls
pub const VERIFICATION_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// The maximum number of verification status polls
pub const MAX_VERIFICATION_POLLS: usize = 10;
