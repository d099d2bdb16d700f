//! Sequential execution of deployment plans
//!
//! The orchestrator issues one remote operation at a time, waiting for each
//! to complete before starting the next. Every transaction carries an
//! explicit nonce from a [`NonceAllocator`] seeded at startup. A failed
//! deployment or call aborts the run; nothing already deployed is rolled back.

use std::{
    fmt::{self, Display},
    path::PathBuf,
    time::Duration,
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    primitives::{utils::format_ether, Address, Bytes, TxKind},
};
use alloy_sol_types::SolCall;
use itertools::Itertools;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    artifacts::{ArtifactStore, ContractId},
    client::{DeployClient, PreparedTx, TxConfirmation},
    config::{NetworkConfig, StepDelays},
    errors::ScriptError,
    nonce::NonceAllocator,
    plan::{DeploymentPlan, Phase, PlanArg, Step},
    solidity::changeOwnerCall,
    verify::{SourceVerifier, VerificationRequest},
};

/// A contract the run deployed or attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    /// The key later steps refer to the contract by
    pub key: String,
    /// The contract's fully-qualified name
    pub id: ContractId,
    /// Where the contract lives
    pub address: Address,
    /// The encoded constructor arguments, empty for attached contracts
    pub constructor_args: Bytes,
    /// The nonce of the creation transaction, `None` for attached contracts
    pub nonce: Option<u64>,
    /// The build-info of the contract's artifact
    pub build_info: Option<PathBuf>,
}

impl ContractHandle {
    /// Whether this run deployed the contract, as opposed to attaching to it
    pub fn is_deployed(&self) -> bool {
        self.nonce.is_some()
    }
}

/// A summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    /// Every contract the run produced, in order
    pub handles: Vec<ContractHandle>,
    /// The deployer's transaction count when the run began
    pub base_nonce: u64,
    /// The number of transactions the run submitted
    pub transactions: u64,
    /// The number of contracts whose verification failed
    pub verification_failures: usize,
}

impl Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for handle in &self.handles {
            match handle.nonce {
                Some(nonce) => {
                    writeln!(f, "{}: {:#x} (nonce {nonce})", handle.key, handle.address)?
                }
                None => writeln!(f, "{}: {:#x} (attached)", handle.key, handle.address)?,
            }
        }
        write!(
            f,
            "{} transactions from nonce {}, {} verification failures",
            self.transactions, self.base_nonce, self.verification_failures
        )
    }
}

/// Executes deployment plans against a chain
pub struct Orchestrator<C, V> {
    /// The chain client
    client: C,
    /// The source verification service, if one is configured
    verifier: Option<V>,
    /// Compiled contracts
    artifacts: ArtifactStore,
    /// The deployer's nonces
    nonces: NonceAllocator,
    /// Pauses between steps
    delays: StepDelays,
    /// A fixed legacy gas price, if any
    gas_price: Option<u128>,
    /// Contracts produced so far, in order
    handles: Vec<ContractHandle>,
    /// The phase of the most recent step
    phase: Option<Phase>,
    /// The number of failed verifications
    verification_failures: usize,
}

impl<C: DeployClient, V: SourceVerifier> Orchestrator<C, V> {
    /// Read the deployer's balance and nonce and prepare to run plans
    pub async fn init(
        client: C,
        verifier: Option<V>,
        artifacts: ArtifactStore,
        config: &NetworkConfig,
    ) -> Result<Self, ScriptError> {
        info!("Deploying contracts with the account: {:#x}", client.deployer());
        let balance = client.balance().await?;
        info!("Account balance: {}", format_ether(balance));

        let base_nonce = client.transaction_count().await?;
        info!("Account nonce: {base_nonce}");
        info!("Deploying on {}", config.network);

        Ok(Self {
            client,
            verifier,
            artifacts,
            nonces: NonceAllocator::new(base_nonce),
            delays: config.delays,
            gas_price: config.gas_price,
            handles: vec![],
            phase: None,
            verification_failures: 0,
        })
    }

    // -------------
    // | Accessors |
    // -------------

    /// The handle stored under `key`
    pub fn handle(&self, key: &str) -> Option<&ContractHandle> {
        self.handles.iter().find(|h| h.key == key)
    }

    /// Every handle produced so far, in order
    pub fn handles(&self) -> &[ContractHandle] {
        &self.handles
    }

    /// The deployer's nonce allocator
    pub fn nonces(&self) -> &NonceAllocator {
        &self.nonces
    }

    /// The phase of the most recently executed step
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// The chain client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Summarize the run so far
    pub fn report(&self) -> DeploymentReport {
        DeploymentReport {
            handles: self.handles.clone(),
            base_nonce: self.nonces.base(),
            transactions: self.nonces.consumed(),
            verification_failures: self.verification_failures,
        }
    }

    // ---------
    // | Steps |
    // ---------

    /// Run every step of `plan` in order, stopping at the first failure
    pub async fn execute(&mut self, plan: &DeploymentPlan) -> Result<DeploymentReport, ScriptError> {
        pause(self.delays.startup).await;

        for planned in plan.steps() {
            self.enter_phase(planned.phase);

            match &planned.step {
                Step::Deploy { key, id, args } => {
                    self.deploy(key, id, args).await?;
                }
                Step::Attach { key, id, address } => {
                    self.attach(key, id, *address).await?;
                }
                Step::Call {
                    target,
                    signature,
                    args,
                    label,
                } => {
                    self.call(target, signature, args, label).await?;
                }
                Step::TransferOwnership { target, new_owner } => {
                    self.transfer_ownership(target, *new_owner).await?;
                }
                Step::VerifyAll => self.verify_all().await,
            }
        }

        Ok(self.report())
    }

    /// Deploy `id` with the given constructor arguments and wait for it to be mined
    pub async fn deploy(
        &mut self,
        key: &str,
        id: &ContractId,
        args: &[PlanArg],
    ) -> Result<&ContractHandle, ScriptError> {
        if self.handle(key).is_some() {
            return Err(ScriptError::InvalidPlan(format!("`{key}` already exists")));
        }

        let values = self.resolve_args(args)?;
        let artifact = self.artifacts.get(id)?;
        let constructor_args = encode_constructor_args(&artifact.abi, id, &values)?;
        let input = [artifact.bytecode.as_ref(), constructor_args.as_slice()].concat();
        let build_info = artifact.build_info.clone();

        let nonce = self.nonces.next();
        let confirmation = self
            .client
            .submit(PreparedTx {
                nonce,
                kind: TxKind::Create,
                input: input.into(),
                gas_price: self.gas_price,
            })
            .await?;

        if !confirmation.success {
            return Err(ScriptError::ContractDeployment(format!(
                "{key} creation {} reverted",
                confirmation.tx_hash
            )));
        }
        let address = confirmation.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "{key} creation {} has no contract address",
                confirmation.tx_hash
            ))
        })?;
        info!("{key}: {address:#x}");

        self.handles.push(ContractHandle {
            key: key.to_string(),
            id: id.clone(),
            address,
            constructor_args: constructor_args.into(),
            nonce: Some(nonce),
            build_info,
        });
        pause(self.delays.after_deploy).await;

        Ok(&self.handles[self.handles.len() - 1])
    }

    /// Attach to `id` at `address`, failing if no code is deployed there
    ///
    /// Only reads chain state; no transaction is sent and no nonce is used.
    pub async fn attach(
        &mut self,
        key: &str,
        id: &ContractId,
        address: Address,
    ) -> Result<&ContractHandle, ScriptError> {
        if self.handle(key).is_some() {
            return Err(ScriptError::InvalidPlan(format!("`{key}` already exists")));
        }

        let build_info = self.artifacts.get(id)?.build_info.clone();
        let code = self.client.code_at(address).await?;
        if code.is_empty() {
            return Err(ScriptError::ContractNotFound(format!("{key} ({id}) at {address:#x}")));
        }
        info!("Fetched {key}: {address:#x}");

        self.handles.push(ContractHandle {
            key: key.to_string(),
            id: id.clone(),
            address,
            constructor_args: Bytes::new(),
            nonce: None,
            build_info,
        });
        pause(self.delays.after_attach).await;

        Ok(&self.handles[self.handles.len() - 1])
    }

    /// Call the method with Solidity signature `signature` on `target` and
    /// wait for the call to be mined
    pub async fn call(
        &mut self,
        target: &str,
        signature: &str,
        args: &[PlanArg],
        label: &str,
    ) -> Result<TxConfirmation, ScriptError> {
        let to = self.address_of(target)?;
        let function = Function::parse(signature)
            .map_err(|e| ScriptError::CalldataConstruction(format!("{signature}: {e}")))?;
        let values = self.resolve_args(args)?;
        let calldata = function
            .abi_encode_input(&values)
            .map_err(|e| ScriptError::CalldataConstruction(format!("{signature}: {e}")))?;

        let nonce = self.nonces.next();
        let confirmation = self
            .client
            .submit(PreparedTx {
                nonce,
                kind: TxKind::Call(to),
                input: calldata.into(),
                gas_price: self.gas_price,
            })
            .await?;

        if !confirmation.success {
            return Err(ScriptError::ContractInteraction(format!(
                "{label}: {target}.{} reverted in {}",
                function.name, confirmation.tx_hash
            )));
        }
        info!("{label}");
        pause(self.delays.after_call).await;

        Ok(confirmation)
    }

    /// Hand `target` over to `new_owner`
    pub async fn transfer_ownership(
        &mut self,
        target: &str,
        new_owner: Address,
    ) -> Result<TxConfirmation, ScriptError> {
        let label = format!("Set new owner in {target}");
        self.call(
            target,
            changeOwnerCall::SIGNATURE,
            &[PlanArg::Address(new_owner)],
            &label,
        )
        .await
    }

    /// Verify every contract this run deployed, in deployment order
    ///
    /// Failures are logged and counted but never returned; verification has
    /// no bearing on what was deployed.
    pub async fn verify_all(&mut self) {
        let Some(verifier) = &self.verifier else {
            info!("No verification service configured, skipping source verification");
            return;
        };

        let mut failed = vec![];
        for handle in self.handles.iter().filter(|h| h.is_deployed()) {
            let request = VerificationRequest {
                id: handle.id.clone(),
                address: handle.address,
                constructor_args: handle.constructor_args.clone(),
                build_info: handle.build_info.clone(),
            };

            if let Err(e) = verifier.verify(&request).await {
                warn!("error verifying {} at {:#x}: {e}", handle.key, handle.address);
                failed.push(handle.key.as_str());
            }
            pause(self.delays.after_verify).await;
        }

        if !failed.is_empty() {
            warn!("Unverified contracts: {}", failed.iter().join(", "));
        }
        self.verification_failures += failed.len();
    }

    // -----------
    // | Helpers |
    // -----------

    /// Log the start of a new phase
    fn enter_phase(&mut self, phase: Phase) {
        if self.phase != Some(phase) {
            info!("Starting phase: {phase}");
            self.phase = Some(phase);
        }
    }

    /// The address of the handle stored under `key`
    fn address_of(&self, key: &str) -> Result<Address, ScriptError> {
        self.handle(key)
            .map(|h| h.address)
            .ok_or_else(|| ScriptError::InvalidPlan(format!("`{key}` has not been deployed")))
    }

    /// Turn plan arguments into ABI values
    fn resolve_args(&self, args: &[PlanArg]) -> Result<Vec<DynSolValue>, ScriptError> {
        args.iter()
            .map(|arg| match arg {
                PlanArg::Uint(value) => Ok(DynSolValue::Uint(*value, 256)),
                PlanArg::Address(address) => Ok(DynSolValue::Address(*address)),
                PlanArg::Handle(key) => self.address_of(key).map(DynSolValue::Address),
                PlanArg::Handles(keys) => keys
                    .iter()
                    .map(|key| self.address_of(key).map(DynSolValue::Address))
                    .collect::<Result<Vec<_>, _>>()
                    .map(DynSolValue::Array),
                PlanArg::Deployer => Ok(DynSolValue::Address(self.client.deployer())),
            })
            .collect()
    }
}

/// ABI-encode constructor arguments against a contract's ABI
fn encode_constructor_args(
    abi: &JsonAbi,
    id: &ContractId,
    values: &[DynSolValue],
) -> Result<Vec<u8>, ScriptError> {
    match abi.constructor() {
        Some(constructor) => constructor
            .abi_encode_input(values)
            .map_err(|e| ScriptError::CalldataConstruction(format!("{id} constructor: {e}"))),
        None if values.is_empty() => Ok(vec![]),
        None => Err(ScriptError::CalldataConstruction(format!(
            "{id} has no constructor but {} args were given",
            values.len()
        ))),
    }
}

/// Sleep for `duration`, skipping the timer entirely for zero
async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
