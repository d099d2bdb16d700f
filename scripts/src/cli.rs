//! Definitions of CLI arguments and commands for the deploy scripts

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};

use crate::{
    artifacts::ArtifactStore,
    client::DeployClient,
    commands::{change_owner, deploy},
    config::{Network, NetworkConfig, StepDelays},
    constants::DEFAULT_ARTIFACTS_DIR,
    errors::ScriptError,
};

/// Deploy and configure the token, receiver, distributor and generator contracts
#[derive(Parser)]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = "PKEY")]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: String,

    /// The network whose costs, owner and addresses to use
    #[arg(short, long, value_enum)]
    pub network: Network,

    /// Path to the Hardhat artifacts directory
    #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Override the account that receives ownership of the generators
    #[arg(long)]
    pub new_owner: Option<Address>,

    /// Override the gas price, in gwei
    #[arg(long)]
    pub gas_price: Option<u64>,

    /// Skip the pauses between steps, e.g. against a local devnet
    #[arg(long)]
    pub no_delay: bool,

    /// The script to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The network preset with any overrides given on the command line
    pub fn network_config(&self) -> NetworkConfig {
        let mut config = NetworkConfig::preset(self.network);
        if let Some(new_owner) = self.new_owner {
            config = config.with_new_owner(new_owner);
        }
        if let Some(gwei) = self.gas_price {
            config = config.with_gas_price_gwei(gwei);
        }
        if self.no_delay {
            config = config.with_delays(StepDelays::none());
        }

        config
    }
}

/// The scripts that can be run
#[derive(Subcommand)]
pub enum Command {
    /// Deploy and configure every contract
    Deploy(DeployArgs),
    /// Transfer ownership of already-deployed generators
    ChangeOwner(ChangeOwnerArgs),
}

impl Command {
    /// Run the selected script
    pub async fn run(
        self,
        client: impl DeployClient,
        artifacts: ArtifactStore,
        config: NetworkConfig,
    ) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, client, artifacts, config).await,
            Command::ChangeOwner(args) => change_owner(args, client, artifacts, config).await,
        }
    }
}

/// Deploy every implementation and generator, register the token types,
/// hand the generators to the new owner and verify the sources.
#[derive(Args)]
pub struct DeployArgs {
    /// Skip source verification
    #[arg(long)]
    pub skip_verify: bool,

    /// Etherscan-compatible API endpoint used for source verification
    #[arg(long, env = "ETHERSCAN_API_URL")]
    pub etherscan_url: Option<String>,

    /// API key for the verification endpoint
    #[arg(long, env = "ETHERSCAN_API_KEY")]
    pub etherscan_api_key: Option<String>,
}

/// Hand already-deployed generators to the new owner.
///
/// Generator addresses default to the ones known for the selected network.
#[derive(Args)]
pub struct ChangeOwnerArgs {
    /// Address of the token generator
    #[arg(long)]
    pub token_generator: Option<Address>,

    /// Address of the distributor generator
    #[arg(long)]
    pub distributor_generator: Option<Address>,

    /// Address of the tax receiver generator
    #[arg(long)]
    pub tax_receiver_generator: Option<Address>,
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;
    use clap::Parser;

    use super::{Cli, Command};
    use crate::{
        config::{Network, StepDelays},
        constants::WEI_PER_GWEI,
    };

    #[test]
    fn test_parse_overrides() {
        let owner = Address::repeat_byte(0x42);
        let cli = Cli::try_parse_from([
            "generator-scripts",
            "--priv-key",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--network",
            "mainnet",
            "--new-owner",
            &format!("{owner:#x}"),
            "--gas-price",
            "5",
            "--no-delay",
            "deploy",
            "--skip-verify",
        ])
        .unwrap();

        let config = cli.network_config();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.new_owner, owner);
        assert_eq!(config.gas_price, Some(5 * WEI_PER_GWEI));
        assert_eq!(config.delays, StepDelays::none());
        assert!(matches!(cli.command, Command::Deploy(ref args) if args.skip_verify));
    }

    #[test]
    fn test_network_is_required() {
        let res = Cli::try_parse_from([
            "generator-scripts",
            "--priv-key",
            "0x01",
            "--rpc-url",
            "http://127.0.0.1:8545",
            "change-owner",
        ]);
        assert!(res.is_err());
    }
}
