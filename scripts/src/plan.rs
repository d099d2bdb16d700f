//! Ordered deployment plans and the fixed plans run by the scripts
//!
//! A plan is a list of steps, each tagged with the [`Phase`] it belongs to.
//! Steps refer to contracts produced by earlier steps through string keys, so
//! the order of the plan encodes the dependencies between contracts.

use std::{
    collections::HashSet,
    fmt::{self, Display},
};

use alloy::{
    json_abi::Function,
    primitives::{Address, U256},
};
use alloy_sol_types::SolCall;

use crate::{
    artifacts::ContractId,
    config::{GeneratorAddresses, NetworkConfig},
    constants::{
        BASE_TOKEN_CONTRACT, BASE_TOKEN_KEY, BASE_TOKEN_TYPE, CUSTOM_TOKEN_CONTRACT,
        CUSTOM_TOKEN_KEY, CUSTOM_TOKEN_TYPE, DISTRIBUTOR_CONTRACT,
        DISTRIBUTOR_GENERATOR_CONTRACT, DISTRIBUTOR_GENERATOR_KEY, DISTRIBUTOR_KEY,
        FEE_RECEIVER_CONTRACT, FEE_RECEIVER_KEY, REWARD_TOKEN_CONTRACT, REWARD_TOKEN_KEY,
        REWARD_TOKEN_TYPE, TAX_RECEIVER_GENERATOR_CONTRACT, TAX_RECEIVER_GENERATOR_KEY,
        TOKEN_GENERATOR_CONTRACT, TOKEN_GENERATOR_KEY,
    },
    errors::ScriptError,
    solidity::{setTokenTypeAndExternalGeneratorsCall, setTokenTypeCall},
};

// ---------
// | Types |
// ---------

/// The stages of a run, in the order they execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Deploy the implementation contracts the generators clone
    DeployImplementations,
    /// Deploy or attach to the generators
    DeployGenerators,
    /// Register token types with the token generator
    ConfigureTokenTypes,
    /// Hand the generators to their new owner
    TransferOwnership,
    /// Verify the source of every deployed contract
    VerifyAll,
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::DeployImplementations => write!(f, "deploy implementations"),
            Phase::DeployGenerators => write!(f, "deploy generators"),
            Phase::ConfigureTokenTypes => write!(f, "configure token types"),
            Phase::TransferOwnership => write!(f, "transfer ownership"),
            Phase::VerifyAll => write!(f, "verify sources"),
        }
    }
}

/// Where a constructor or method argument comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanArg {
    /// A literal `uint256`
    Uint(U256),
    /// A literal `address`
    Address(Address),
    /// The address of a contract produced by an earlier step
    Handle(String),
    /// An `address[]` of contracts produced by earlier steps
    Handles(Vec<String>),
    /// The deployer's own address
    Deployer,
}

impl PlanArg {
    /// A literal `uint256`
    pub fn uint(value: impl Into<U256>) -> Self {
        PlanArg::Uint(value.into())
    }

    /// The address of the contract stored under `key`
    pub fn handle(key: &str) -> Self {
        PlanArg::Handle(key.to_string())
    }

    /// The addresses of the contracts stored under `keys`, as an `address[]`
    pub fn handles(keys: &[&str]) -> Self {
        PlanArg::Handles(keys.iter().map(|k| k.to_string()).collect())
    }

    /// The handle keys this argument refers to
    fn referenced_keys(&self) -> Vec<&str> {
        match self {
            PlanArg::Handle(key) => vec![key.as_str()],
            PlanArg::Handles(keys) => keys.iter().map(String::as_str).collect(),
            _ => vec![],
        }
    }
}

/// A single remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Deploy a new contract and store its handle under `key`
    Deploy {
        /// The key to store the handle under
        key: String,
        /// The contract to deploy
        id: ContractId,
        /// The constructor arguments
        args: Vec<PlanArg>,
    },
    /// Attach to a contract that is already deployed
    Attach {
        /// The key to store the handle under
        key: String,
        /// The contract deployed at `address`
        id: ContractId,
        /// Where the contract lives
        address: Address,
    },
    /// Call a configuration method on an earlier handle
    Call {
        /// The key of the contract to call
        target: String,
        /// The Solidity signature of the method, e.g. `setTokenType(uint256,address,uint256)`
        signature: String,
        /// The method arguments
        args: Vec<PlanArg>,
        /// A description of the call for the logs
        label: String,
    },
    /// Transfer ownership of an earlier handle
    TransferOwnership {
        /// The key of the contract to hand over
        target: String,
        /// The account receiving ownership
        new_owner: Address,
    },
    /// Verify the source of every contract deployed so far
    VerifyAll,
}

/// A step together with the phase it runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// The phase of the run the step belongs to
    pub phase: Phase,
    /// The operation to perform
    pub step: Step,
}

/// A validated, ordered list of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// The steps, in execution order
    steps: Vec<PlannedStep>,
}

impl DeploymentPlan {
    /// Start building a plan
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    /// The steps of the plan, in execution order
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// The number of transactions the plan submits
    pub fn num_transactions(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| {
                matches!(
                    s.step,
                    Step::Deploy { .. } | Step::Call { .. } | Step::TransferOwnership { .. }
                )
            })
            .count()
    }

    /// Check phase ordering, handle references, and call signatures
    fn validate(&self) -> Result<(), ScriptError> {
        let mut produced: HashSet<&str> = HashSet::new();
        let mut last_phase: Option<Phase> = None;

        for (i, planned) in self.steps.iter().enumerate() {
            if last_phase.is_some_and(|last| planned.phase < last) {
                return Err(ScriptError::InvalidPlan(format!(
                    "step {i} runs in phase `{}` after a later phase",
                    planned.phase
                )));
            }
            last_phase = Some(planned.phase);

            match &planned.step {
                Step::Deploy { key, args, .. } => {
                    for referenced in args.iter().flat_map(PlanArg::referenced_keys) {
                        require_produced(&produced, referenced, i)?;
                    }
                    if !produced.insert(key.as_str()) {
                        return Err(ScriptError::InvalidPlan(format!(
                            "step {i} produces `{key}` a second time"
                        )));
                    }
                }
                Step::Attach { key, .. } => {
                    if !produced.insert(key.as_str()) {
                        return Err(ScriptError::InvalidPlan(format!(
                            "step {i} produces `{key}` a second time"
                        )));
                    }
                }
                Step::Call {
                    target,
                    signature,
                    args,
                    ..
                } => {
                    require_produced(&produced, target, i)?;
                    for referenced in args.iter().flat_map(PlanArg::referenced_keys) {
                        require_produced(&produced, referenced, i)?;
                    }

                    let function = Function::parse(signature).map_err(|e| {
                        ScriptError::InvalidPlan(format!("step {i} signature `{signature}`: {e}"))
                    })?;
                    if function.inputs.len() != args.len() {
                        return Err(ScriptError::InvalidPlan(format!(
                            "step {i} passes {} args to `{signature}`",
                            args.len()
                        )));
                    }
                }
                Step::TransferOwnership { target, .. } => {
                    require_produced(&produced, target, i)?;
                }
                Step::VerifyAll => {}
            }
        }

        Ok(())
    }
}

/// Fail if `key` has not been produced by a step before step `i`
fn require_produced(produced: &HashSet<&str>, key: &str, i: usize) -> Result<(), ScriptError> {
    if produced.contains(key) {
        Ok(())
    } else {
        Err(ScriptError::InvalidPlan(format!(
            "step {i} references `{key}` before it is deployed"
        )))
    }
}

/// Builds a [`DeploymentPlan`], tagging each step with the current phase
#[derive(Debug)]
pub struct PlanBuilder {
    /// The phase new steps are tagged with
    phase: Phase,
    /// The steps pushed so far
    steps: Vec<PlannedStep>,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self {
            phase: Phase::DeployImplementations,
            steps: vec![],
        }
    }
}

impl PlanBuilder {
    /// Tag subsequent steps with `phase`
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Deploy `id` with `args`, storing the handle under `key`
    pub fn deploy(self, key: &str, id: ContractId, args: Vec<PlanArg>) -> Self {
        self.push(Step::Deploy {
            key: key.to_string(),
            id,
            args,
        })
    }

    /// Attach to `id` at `address`, storing the handle under `key`
    pub fn attach(self, key: &str, id: ContractId, address: Address) -> Self {
        self.push(Step::Attach {
            key: key.to_string(),
            id,
            address,
        })
    }

    /// Call the method with Solidity signature `signature` on `target`
    pub fn call(self, target: &str, signature: &str, args: Vec<PlanArg>, label: &str) -> Self {
        self.push(Step::Call {
            target: target.to_string(),
            signature: signature.to_string(),
            args,
            label: label.to_string(),
        })
    }

    /// Hand `target` over to `new_owner`
    pub fn transfer_ownership(self, target: &str, new_owner: Address) -> Self {
        self.push(Step::TransferOwnership {
            target: target.to_string(),
            new_owner,
        })
    }

    /// Verify every deployed contract, in its own phase
    pub fn verify_all(self) -> Self {
        self.phase(Phase::VerifyAll).push(Step::VerifyAll)
    }

    /// Validate and finish the plan
    pub fn build(self) -> Result<DeploymentPlan, ScriptError> {
        let plan = DeploymentPlan { steps: self.steps };
        plan.validate()?;
        Ok(plan)
    }

    /// Append a step in the current phase
    fn push(mut self, step: Step) -> Self {
        self.steps.push(PlannedStep {
            phase: self.phase,
            step,
        });
        self
    }
}

// ---------------
// | Fixed Plans |
// ---------------

/// The full deployment: implementations, generators, token types, ownership
/// transfer and, if `verify` is set, source verification
pub fn full_deployment_plan(
    config: &NetworkConfig,
    verify: bool,
) -> Result<DeploymentPlan, ScriptError> {
    let mut builder = DeploymentPlan::builder()
        .phase(Phase::DeployImplementations)
        .deploy(BASE_TOKEN_KEY, BASE_TOKEN_CONTRACT.parse()?, vec![])
        .deploy(CUSTOM_TOKEN_KEY, CUSTOM_TOKEN_CONTRACT.parse()?, vec![])
        .deploy(REWARD_TOKEN_KEY, REWARD_TOKEN_CONTRACT.parse()?, vec![])
        .deploy(FEE_RECEIVER_KEY, FEE_RECEIVER_CONTRACT.parse()?, vec![])
        .deploy(DISTRIBUTOR_KEY, DISTRIBUTOR_CONTRACT.parse()?, vec![])
        .phase(Phase::DeployGenerators)
        .deploy(
            DISTRIBUTOR_GENERATOR_KEY,
            DISTRIBUTOR_GENERATOR_CONTRACT.parse()?,
            vec![PlanArg::handle(DISTRIBUTOR_KEY)],
        )
        .deploy(
            TAX_RECEIVER_GENERATOR_KEY,
            TAX_RECEIVER_GENERATOR_CONTRACT.parse()?,
            vec![PlanArg::handle(FEE_RECEIVER_KEY)],
        )
        .deploy(
            TOKEN_GENERATOR_KEY,
            TOKEN_GENERATOR_CONTRACT.parse()?,
            vec![PlanArg::Address(config.new_owner)],
        )
        .phase(Phase::ConfigureTokenTypes)
        .call(
            TOKEN_GENERATOR_KEY,
            setTokenTypeCall::SIGNATURE,
            vec![
                PlanArg::uint(U256::from(BASE_TOKEN_TYPE)),
                PlanArg::handle(BASE_TOKEN_KEY),
                PlanArg::Uint(config.base_token_cost),
            ],
            "Set token type 0",
        )
        .call(
            TOKEN_GENERATOR_KEY,
            setTokenTypeAndExternalGeneratorsCall::SIGNATURE,
            vec![
                PlanArg::uint(U256::from(CUSTOM_TOKEN_TYPE)),
                PlanArg::handle(CUSTOM_TOKEN_KEY),
                PlanArg::Uint(config.custom_token_cost),
                PlanArg::handles(&[TAX_RECEIVER_GENERATOR_KEY]),
            ],
            "Set token type 1",
        )
        .call(
            TOKEN_GENERATOR_KEY,
            setTokenTypeAndExternalGeneratorsCall::SIGNATURE,
            vec![
                PlanArg::uint(U256::from(REWARD_TOKEN_TYPE)),
                PlanArg::handle(REWARD_TOKEN_KEY),
                PlanArg::Uint(config.reward_token_cost),
                PlanArg::handles(&[TAX_RECEIVER_GENERATOR_KEY, DISTRIBUTOR_GENERATOR_KEY]),
            ],
            "Set token type 2",
        )
        .phase(Phase::TransferOwnership)
        .transfer_ownership(TOKEN_GENERATOR_KEY, config.new_owner)
        .transfer_ownership(DISTRIBUTOR_GENERATOR_KEY, config.new_owner)
        .transfer_ownership(TAX_RECEIVER_GENERATOR_KEY, config.new_owner);

    if verify {
        builder = builder.verify_all();
    }

    builder.build()
}

/// Attach to already-deployed generators and hand them to the new owner
pub fn change_owner_plan(
    generators: &GeneratorAddresses,
    new_owner: Address,
) -> Result<DeploymentPlan, ScriptError> {
    DeploymentPlan::builder()
        .phase(Phase::DeployGenerators)
        .attach(
            DISTRIBUTOR_GENERATOR_KEY,
            DISTRIBUTOR_GENERATOR_CONTRACT.parse()?,
            generators.distributor_generator,
        )
        .attach(
            TAX_RECEIVER_GENERATOR_KEY,
            TAX_RECEIVER_GENERATOR_CONTRACT.parse()?,
            generators.tax_receiver_generator,
        )
        .attach(
            TOKEN_GENERATOR_KEY,
            TOKEN_GENERATOR_CONTRACT.parse()?,
            generators.token_generator,
        )
        .phase(Phase::TransferOwnership)
        .transfer_ownership(TOKEN_GENERATOR_KEY, new_owner)
        .transfer_ownership(DISTRIBUTOR_GENERATOR_KEY, new_owner)
        .transfer_ownership(TAX_RECEIVER_GENERATOR_KEY, new_owner)
        .build()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256};
    use eyre::Result;

    use super::{
        change_owner_plan, full_deployment_plan, DeploymentPlan, Phase, PlanArg, Step,
    };
    use crate::{
        artifacts::ContractId,
        config::{Network, NetworkConfig},
        constants::BASE_TOKEN_CONTRACT,
        errors::ScriptError,
    };

    #[test]
    fn test_full_plan_shape() -> Result<()> {
        let config = NetworkConfig::preset(Network::Mainnet);
        let plan = full_deployment_plan(&config, true /* verify */)?;

        assert_eq!(plan.num_transactions(), 14);
        assert_eq!(plan.steps().last().map(|s| &s.step), Some(&Step::VerifyAll));

        let phases: Vec<Phase> = plan.steps().iter().map(|s| s.phase).collect();
        assert!(phases.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(phases.iter().filter(|p| **p == Phase::DeployImplementations).count(), 5);
        assert_eq!(phases.iter().filter(|p| **p == Phase::DeployGenerators).count(), 3);

        let unverified = full_deployment_plan(&config, false /* verify */)?;
        assert_eq!(unverified.steps().len(), plan.steps().len() - 1);
        Ok(())
    }

    #[test]
    fn test_change_owner_plan_shape() -> Result<()> {
        let config = NetworkConfig::preset(Network::Testnet);
        let generators = config.generators.expect("testnet has known generators");
        let plan = change_owner_plan(&generators, config.new_owner)?;

        assert_eq!(plan.num_transactions(), 3);
        assert!(plan
            .steps()
            .iter()
            .all(|s| !matches!(s.step, Step::Deploy { .. })));
        Ok(())
    }

    #[test]
    fn test_rejects_forward_reference() -> Result<()> {
        let res = DeploymentPlan::builder()
            .deploy(
                "Generator",
                ContractId::parse(BASE_TOKEN_CONTRACT)?,
                vec![PlanArg::handle("Implementation")],
            )
            .deploy("Implementation", ContractId::parse(BASE_TOKEN_CONTRACT)?, vec![])
            .build();

        assert!(matches!(res, Err(ScriptError::InvalidPlan(_))));
        Ok(())
    }

    #[test]
    fn test_rejects_phase_regression() -> Result<()> {
        let res = DeploymentPlan::builder()
            .phase(Phase::DeployGenerators)
            .deploy("A", ContractId::parse(BASE_TOKEN_CONTRACT)?, vec![])
            .phase(Phase::DeployImplementations)
            .deploy("B", ContractId::parse(BASE_TOKEN_CONTRACT)?, vec![])
            .build();

        assert!(matches!(res, Err(ScriptError::InvalidPlan(_))));
        Ok(())
    }

    #[test]
    fn test_rejects_bad_call() -> Result<()> {
        let base = || {
            DeploymentPlan::builder().deploy("A", BASE_TOKEN_CONTRACT.parse().unwrap(), vec![])
        };

        let wrong_arity = base()
            .call(
                "A",
                "setTokenType(uint256,address,uint256)",
                vec![PlanArg::uint(U256::from(0u64))],
                "bad",
            )
            .build();
        assert!(matches!(wrong_arity, Err(ScriptError::InvalidPlan(_))));

        let bad_signature = base().call("A", "setTokenType(", vec![], "bad").build();
        assert!(matches!(bad_signature, Err(ScriptError::InvalidPlan(_))));

        let duplicate = base()
            .attach("A", BASE_TOKEN_CONTRACT.parse()?, Address::ZERO)
            .build();
        assert!(matches!(duplicate, Err(ScriptError::InvalidPlan(_))));
        Ok(())
    }
}
