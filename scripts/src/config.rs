//! Per-network deployment settings

use std::{
    fmt::{self, Display},
    time::Duration,
};

use alloy::primitives::{address, Address, U256};
use clap::ValueEnum;

use crate::constants::{
    ATTACH_DELAY, CALL_DELAY, MAINNET_DEPLOY_DELAY, MAINNET_GAS_PRICE_GWEI, ONE, ONE_HALF,
    ONE_HUNDREDTH, POINT_ONE, STARTUP_DELAY, TESTNET_DEPLOY_DELAY, VERIFY_DELAY, WEI_PER_GWEI,
};

/// The networks the scripts have presets for
#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Network {
    /// Production deployment
    Mainnet,
    /// Test deployment
    Testnet,
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// How long to pause after each kind of step, letting the node's pending
/// pool settle before the next nonce-bearing transaction goes out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDelays {
    /// Before the first step of a run
    pub startup: Duration,
    /// After each contract deployment
    pub after_deploy: Duration,
    /// After attaching to an existing contract
    pub after_attach: Duration,
    /// After each configuration or ownership call
    pub after_call: Duration,
    /// After each source verification attempt
    pub after_verify: Duration,
}

impl StepDelays {
    /// No pauses at all, for local devnets and tests
    pub fn none() -> Self {
        Self {
            startup: Duration::ZERO,
            after_deploy: Duration::ZERO,
            after_attach: Duration::ZERO,
            after_call: Duration::ZERO,
            after_verify: Duration::ZERO,
        }
    }

    /// The standard pauses, with the given post-deployment pause
    fn with_deploy_delay(after_deploy: Duration) -> Self {
        Self {
            startup: STARTUP_DELAY,
            after_deploy,
            after_attach: ATTACH_DELAY,
            after_call: CALL_DELAY,
            after_verify: VERIFY_DELAY,
        }
    }
}

/// The addresses of previously deployed generators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorAddresses {
    /// The distributor generator
    pub distributor_generator: Address,
    /// The tax receiver generator
    pub tax_receiver_generator: Address,
    /// The token generator
    pub token_generator: Address,
}

/// Everything that differs between deployments to different networks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// The network this config targets
    pub network: Network,
    /// The fee, in wei, to create a base token
    pub base_token_cost: U256,
    /// The fee, in wei, to create a custom token
    pub custom_token_cost: U256,
    /// The fee, in wei, to create a reward token
    pub reward_token_cost: U256,
    /// The account that receives ownership of the generators
    pub new_owner: Address,
    /// A fixed legacy gas price in wei, or `None` to use the node's estimate
    pub gas_price: Option<u128>,
    /// Pauses between steps
    pub delays: StepDelays,
    /// Generators already deployed on this network, if any
    pub generators: Option<GeneratorAddresses>,
}

impl NetworkConfig {
    /// The built-in settings for `network`
    pub fn preset(network: Network) -> Self {
        match network {
            Network::Mainnet => Self {
                network,
                base_token_cost: U256::from(ONE),
                custom_token_cost: U256::from(2 * ONE),
                reward_token_cost: U256::from(3 * ONE),
                new_owner: address!("319428B799cE4e286e74767719523F275b911F1e"),
                gas_price: Some(MAINNET_GAS_PRICE_GWEI * WEI_PER_GWEI),
                delays: StepDelays::with_deploy_delay(MAINNET_DEPLOY_DELAY),
                generators: None,
            },
            Network::Testnet => Self {
                network,
                base_token_cost: U256::from(ONE_HUNDREDTH),
                custom_token_cost: U256::from(POINT_ONE),
                reward_token_cost: U256::from(ONE_HALF),
                new_owner: address!("3f1b0334ae9c405D94f330c9460D98079349f2aC"),
                gas_price: None,
                delays: StepDelays::with_deploy_delay(TESTNET_DEPLOY_DELAY),
                generators: Some(GeneratorAddresses {
                    distributor_generator: address!("2d2D40f80891b5Cc4143Cf3eF24092bC540756E5"),
                    tax_receiver_generator: address!("c7393ce49bbFAEE830c7DdA0a75c3Db40F5ED3af"),
                    token_generator: address!("ca9cd9C52B9D59d06136a757a34e75c6BaD8dEB8"),
                }),
            },
        }
    }

    /// Replace the new owner
    pub fn with_new_owner(mut self, new_owner: Address) -> Self {
        self.new_owner = new_owner;
        self
    }

    /// Replace the gas price with a fixed price in gwei
    pub fn with_gas_price_gwei(mut self, gwei: u64) -> Self {
        self.gas_price = Some(u128::from(gwei) * WEI_PER_GWEI);
        self
    }

    /// Replace the step delays
    pub fn with_delays(mut self, delays: StepDelays) -> Self {
        self.delays = delays;
        self
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::{Network, NetworkConfig, StepDelays};
    use crate::constants::{ONE, WEI_PER_GWEI};

    #[test]
    fn test_presets() {
        let mainnet = NetworkConfig::preset(Network::Mainnet);
        assert_eq!(mainnet.base_token_cost, U256::from(ONE));
        assert_eq!(mainnet.reward_token_cost, U256::from(3 * ONE));
        assert_eq!(mainnet.gas_price, Some(3 * WEI_PER_GWEI));
        assert!(mainnet.generators.is_none());

        let testnet = NetworkConfig::preset(Network::Testnet);
        assert!(testnet.custom_token_cost < testnet.reward_token_cost);
        assert!(testnet.base_token_cost < testnet.custom_token_cost);
        assert_eq!(testnet.gas_price, None);
        assert!(testnet.generators.is_some());
        assert_ne!(mainnet.new_owner, testnet.new_owner);
    }

    #[test]
    fn test_overrides() {
        let config = NetworkConfig::preset(Network::Testnet)
            .with_gas_price_gwei(7)
            .with_delays(StepDelays::none());

        assert_eq!(config.gas_price, Some(7 * WEI_PER_GWEI));
        assert_eq!(config.delays, StepDelays::none());
    }
}
