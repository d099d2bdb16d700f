//! The RPC client used to read chain state and submit transactions

use std::str::FromStr;

use alloy::{
    network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, TxKind, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use tracing::info;

use crate::errors::ScriptError;

/// A transaction ready to be signed and submitted by the deployer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    /// The nonce the transaction must use
    pub nonce: u64,
    /// Contract creation, or a call to an existing contract
    pub kind: TxKind,
    /// Creation code with encoded constructor args, or calldata
    pub input: Bytes,
    /// A fixed legacy gas price in wei; the node's estimate is used when unset
    pub gas_price: Option<u128>,
}

/// The outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxConfirmation {
    /// The hash of the transaction
    pub tx_hash: TxHash,
    /// The address of the created contract, for creation transactions
    pub contract_address: Option<Address>,
    /// Whether the transaction executed without reverting
    pub success: bool,
}

/// The chain operations the deploy scripts depend on
///
/// Every method is awaited to completion before the next is issued; the
/// scripts never have more than one request in flight.
#[allow(async_fn_in_trait)]
pub trait DeployClient {
    /// The address of the deploying account
    fn deployer(&self) -> Address;

    /// The deployer's transaction count, including pending transactions
    async fn transaction_count(&self) -> Result<u64, ScriptError>;

    /// The deployer's native balance
    async fn balance(&self) -> Result<U256, ScriptError>;

    /// The code deployed at `address`
    async fn code_at(&self, address: Address) -> Result<Bytes, ScriptError>;

    /// Sign and submit a transaction, then wait for it to be mined
    async fn submit(&self, tx: PreparedTx) -> Result<TxConfirmation, ScriptError>;
}

/// A [`DeployClient`] backed by an alloy provider with a local signer
pub struct AlloyClient<P> {
    /// The underlying provider, which signs with the deployer's key
    provider: P,
    /// The deployer's address
    deployer: Address,
}

impl<P: Provider> AlloyClient<P> {
    /// Wrap a signing provider
    pub fn new(provider: P, deployer: Address) -> Self {
        Self { provider, deployer }
    }
}

impl<P: Provider> DeployClient for AlloyClient<P> {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn transaction_count(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_transaction_count(self.deployer)
            .pending()
            .await
            .map_err(|e| ScriptError::NonceFetching(e.to_string()))
    }

    async fn balance(&self) -> Result<U256, ScriptError> {
        self.provider
            .get_balance(self.deployer)
            .await
            .map_err(|e| ScriptError::RpcRequest(e.to_string()))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ScriptError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(|e| ScriptError::RpcRequest(e.to_string()))
    }

    async fn submit(&self, tx: PreparedTx) -> Result<TxConfirmation, ScriptError> {
        let is_create = tx.kind.is_create();
        let to_err = |e: String| {
            if is_create {
                ScriptError::ContractDeployment(e)
            } else {
                ScriptError::ContractInteraction(e)
            }
        };

        let mut request = TransactionRequest::default()
            .with_from(self.deployer)
            .with_nonce(tx.nonce)
            .with_input(tx.input);
        request = match tx.kind {
            TxKind::Create => request.into_create(),
            TxKind::Call(to) => request.with_to(to),
        };
        if let Some(gas_price) = tx.gas_price {
            request = request.with_gas_price(gas_price);
        }

        let receipt = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| to_err(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| to_err(e.to_string()))?;

        Ok(TxConfirmation {
            tx_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
            success: receipt.status(),
        })
    }
}

/// Sets up the signing client used by the deploy scripts from the
/// deployer's private key and the node's RPC url
pub async fn setup_client(
    priv_key: &str,
    rpc_url: &str,
) -> Result<AlloyClient<impl Provider>, ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let deployer = signer.address();

    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .on_http(url);

    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    info!("Connected to chain {chain_id} as {deployer:#x}");

    Ok(AlloyClient::new(provider, deployer))
}
