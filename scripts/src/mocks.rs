//! In-memory stand-ins for the chain and the verification service

use std::{collections::HashSet, sync::Mutex};

use alloy::{
    json_abi::JsonAbi,
    primitives::{keccak256, Address, Bytes, TxKind, U256},
};

use crate::{
    artifacts::{ArtifactStore, ContractArtifact},
    client::{DeployClient, PreparedTx, TxConfirmation},
    constants::{
        BASE_TOKEN_CONTRACT, CUSTOM_TOKEN_CONTRACT, DISTRIBUTOR_CONTRACT,
        DISTRIBUTOR_GENERATOR_CONTRACT, FEE_RECEIVER_CONTRACT, REWARD_TOKEN_CONTRACT,
        TAX_RECEIVER_GENERATOR_CONTRACT, TOKEN_GENERATOR_CONTRACT,
    },
    errors::ScriptError,
    verify::{SourceVerifier, VerificationRequest},
};

/// The ABI of a contract whose constructor takes a single address
const ADDRESS_CONSTRUCTOR_ABI: &str = r#"[
    {
        "type": "constructor",
        "stateMutability": "nonpayable",
        "inputs": [{ "name": "target", "type": "address", "internalType": "address" }]
    }
]"#;

/// Artifacts for every contract in the fixed plans, with placeholder bytecode
pub(crate) fn test_artifacts() -> ArtifactStore {
    let no_constructor: JsonAbi = serde_json::from_str("[]").unwrap();
    let address_constructor: JsonAbi = serde_json::from_str(ADDRESS_CONSTRUCTOR_ABI).unwrap();

    let implementations = [
        BASE_TOKEN_CONTRACT,
        CUSTOM_TOKEN_CONTRACT,
        REWARD_TOKEN_CONTRACT,
        FEE_RECEIVER_CONTRACT,
        DISTRIBUTOR_CONTRACT,
    ];
    let generators = [
        DISTRIBUTOR_GENERATOR_CONTRACT,
        TAX_RECEIVER_GENERATOR_CONTRACT,
        TOKEN_GENERATOR_CONTRACT,
    ];

    let mut store = ArtifactStore::in_memory();
    let contracts = implementations
        .iter()
        .map(|id| (id, &no_constructor))
        .chain(generators.iter().map(|id| (id, &address_constructor)));
    for (i, (id, abi)) in contracts.enumerate() {
        store.insert(ContractArtifact {
            id: id.parse().unwrap(),
            abi: abi.clone(),
            bytecode: Bytes::from(vec![0x60, 0x80, i as u8]),
            build_info: None,
        });
    }

    store
}

/// A chain that mines every transaction instantly
pub(crate) struct MockClient {
    /// The deployer's address
    deployer: Address,
    /// The deployer's transaction count
    base_nonce: u64,
    /// Addresses that hold code before the run starts
    code: HashSet<Address>,
    /// The index of a submission that fails to reach the node
    fail_at: Option<usize>,
    /// The index of a submission that is mined but reverts
    revert_at: Option<usize>,
    /// Every submission, in order
    submitted: Mutex<Vec<PreparedTx>>,
}

impl MockClient {
    /// A chain where the deployer has sent `base_nonce` transactions
    pub(crate) fn new(base_nonce: u64) -> Self {
        Self {
            deployer: Address::repeat_byte(0xde),
            base_nonce,
            code: HashSet::new(),
            fail_at: None,
            revert_at: None,
            submitted: Mutex::new(vec![]),
        }
    }

    /// Place code at `address`
    pub(crate) fn with_code(mut self, address: Address) -> Self {
        self.code.insert(address);
        self
    }

    /// Reject the submission with index `index`
    pub(crate) fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Revert the submission with index `index`
    pub(crate) fn revert_at(mut self, index: usize) -> Self {
        self.revert_at = Some(index);
        self
    }

    /// Every submission so far
    pub(crate) fn submitted(&self) -> Vec<PreparedTx> {
        self.submitted.lock().unwrap().clone()
    }
}

impl DeployClient for MockClient {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn transaction_count(&self) -> Result<u64, ScriptError> {
        Ok(self.base_nonce)
    }

    async fn balance(&self) -> Result<U256, ScriptError> {
        Ok(U256::from(10).pow(U256::from(20)))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ScriptError> {
        let deployed = self
            .submitted()
            .iter()
            .any(|tx| tx.kind == TxKind::Create && self.deployer.create(tx.nonce) == address);

        if self.code.contains(&address) || deployed {
            Ok(Bytes::from_static(&[0x60, 0x80]))
        } else {
            Ok(Bytes::new())
        }
    }

    async fn submit(&self, tx: PreparedTx) -> Result<TxConfirmation, ScriptError> {
        let mut submitted = self.submitted.lock().unwrap();
        let index = submitted.len();
        submitted.push(tx.clone());

        if self.fail_at == Some(index) {
            return Err(ScriptError::ContractInteraction("connection refused".to_string()));
        }

        let contract_address = match tx.kind {
            TxKind::Create => Some(self.deployer.create(tx.nonce)),
            TxKind::Call(_) => None,
        };

        Ok(TxConfirmation {
            tx_hash: keccak256(tx.nonce.to_be_bytes()),
            contract_address,
            success: self.revert_at != Some(index),
        })
    }
}

/// A verification service that records every request
#[derive(Default)]
pub(crate) struct MockVerifier {
    /// Whether every verification fails
    fail: bool,
    /// Every request, in order
    requests: Mutex<Vec<VerificationRequest>>,
}

impl MockVerifier {
    /// A verifier that rejects everything
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Every request so far
    pub(crate) fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SourceVerifier for MockVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            Err(ScriptError::Verification("Fail - Unable to verify".to_string()))
        } else {
            Ok(())
        }
    }
}
