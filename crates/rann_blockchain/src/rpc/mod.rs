//! # RPC Ledger
//!
//! The live ledger: an alloy provider pair shared by every battle.
//!
//! A missing endpoint or key does not stop the server from starting. The
//! first call that needs it fails with [`ChainError::Configuration`] and the
//! battle that issued it pauses.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use rann_shared::constants::{
    CONFIRMATION_TIMEOUT_SECS, FLOW_TESTNET_CHAIN_ID, FLOW_TESTNET_RPC_URL, RPC_REQUEST_TIMEOUT_SECS,
};

use crate::contracts::IKurukshetra;
use crate::error::{ChainError, ChainResult};
use crate::reader::{ChainReader, DamageReport, ReceiptSummary};
use crate::signature::{MoveSigner, SignedMoves};
use crate::writer::{ChainWriter, TransactionRecord};

/// Configuration for the live ledger.
#[derive(Clone)]
pub struct ChainConfig {
    /// RPC endpoint URL.
    pub rpc_url: Option<String>,
    /// Expected chain id.
    pub chain_id: u64,
    /// Operator private key (hex).
    pub private_key: Option<String>,
    /// Upper bound on waiting for a receipt.
    pub confirmation_timeout: Duration,
    /// Upper bound on every other node request.
    pub request_timeout: Duration,
    /// Check for contract code before every write.
    pub verify_liveness: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: Some(FLOW_TESTNET_RPC_URL.to_string()),
            chain_id: FLOW_TESTNET_CHAIN_ID,
            private_key: None,
            confirmation_timeout: Duration::from_secs(CONFIRMATION_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(RPC_REQUEST_TIMEOUT_SECS),
            verify_liveness: true,
        }
    }
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("verify_liveness", &self.verify_liveness)
            .finish()
    }
}

impl ChainConfig {
    /// The move signer for the configured operator key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Configuration`] when the key is malformed.
    pub fn move_signer(&self) -> ChainResult<Option<MoveSigner>> {
        self.private_key
            .as_deref()
            .map(MoveSigner::from_hex_key)
            .transpose()
    }
}

/// Live ledger over JSON-RPC.
///
/// Created once per process and shared by every battle.
pub struct RpcLedger {
    /// Read-only provider.
    reader: Option<DynProvider>,
    /// Provider with the operator wallet attached.
    writer: Option<DynProvider>,
    /// Receipt wait bound.
    confirmation_timeout: Duration,
    /// Bound on reads and on filling and broadcasting a write.
    request_timeout: Duration,
    /// Probe for contract code before writes.
    verify_liveness: bool,
}

impl RpcLedger {
    /// Connects to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Configuration`] for a malformed key and
    /// [`ChainError::Rpc`] when the endpoint cannot be parsed or reached.
    pub async fn connect(config: &ChainConfig) -> ChainResult<Self> {
        let Some(rpc_url) = config.rpc_url.as_deref() else {
            tracing::warn!("No RPC endpoint configured, live battles will pause on first write");
            return Ok(Self {
                reader: None,
                writer: None,
                confirmation_timeout: config.confirmation_timeout,
                request_timeout: config.request_timeout,
                verify_liveness: config.verify_liveness,
            });
        };

        let reader = ProviderBuilder::new().connect(rpc_url).await?.erased();

        let writer = match config.move_signer()? {
            Some(operator) => {
                tracing::info!("Operator account: {}", operator.address());
                let wallet = EthereumWallet::from(operator.into_inner());
                Some(
                    ProviderBuilder::new()
                        .wallet(wallet)
                        .connect(rpc_url)
                        .await?
                        .erased(),
                )
            }
            None => {
                tracing::warn!("ARENA_AUTOMATION_PRIVATE_KEY not set, live battles will pause on first write");
                None
            }
        };

        let chain_id = tokio::time::timeout(config.request_timeout, reader.get_chain_id()).await;
        match chain_id {
            Ok(Ok(chain_id)) if chain_id != config.chain_id => {
                tracing::warn!(
                    "RPC endpoint reports chain {}, expected {}",
                    chain_id,
                    config.chain_id
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(err)) => tracing::warn!("Could not read chain id from {}: {}", rpc_url, err),
            Err(_) => tracing::warn!("Chain id request to {} timed out", rpc_url),
        }

        tracing::info!("Ledger connected: {}", rpc_url);

        Ok(Self {
            reader: Some(reader),
            writer,
            confirmation_timeout: config.confirmation_timeout,
            request_timeout: config.request_timeout,
            verify_liveness: config.verify_liveness,
        })
    }

    fn reader(&self) -> ChainResult<&DynProvider> {
        self.reader
            .as_ref()
            .ok_or_else(|| ChainError::Configuration("no RPC endpoint configured".into()))
    }

    fn writer(&self) -> ChainResult<&DynProvider> {
        self.writer.as_ref().ok_or_else(|| {
            ChainError::Configuration(
                "no signing key configured (ARENA_AUTOMATION_PRIVATE_KEY)".into(),
            )
        })
    }

    /// Runs one node request under the request bound.
    async fn bounded<T, E>(
        &self,
        operation: &'static str,
        request: impl Future<Output = Result<T, E>>,
    ) -> ChainResult<T>
    where
        ChainError: From<E>,
    {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result.map_err(ChainError::from),
            Err(_) => Err(ChainError::RequestTimeout {
                operation,
                timeout_secs: self.request_timeout.as_secs(),
            }),
        }
    }

    /// Executes a view call and decodes its return value.
    async fn view<C: SolCall>(&self, arena: Address, call: &C) -> ChainResult<C::Return> {
        let provider = self.reader()?;
        let request = TransactionRequest::default()
            .with_to(arena)
            .with_input(call.abi_encode());
        let output: Bytes = self
            .bounded("eth_call", async { provider.call(request).await })
            .await?;

        C::abi_decode_returns(&output).map_err(|err| ChainError::Decode {
            call: C::SIGNATURE,
            reason: err.to_string(),
        })
    }

    /// Fails fast when nothing is deployed at `arena`.
    ///
    /// A probe that errors is only logged; the write itself will surface a
    /// real network problem.
    async fn ensure_live(&self, arena: Address) -> ChainResult<()> {
        if !self.verify_liveness {
            return Ok(());
        }
        match self.has_contract(arena).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ChainError::ContractNotFound(arena)),
            Err(err) => {
                tracing::warn!("Could not verify contract code at {}: {}", arena, err);
                Ok(())
            }
        }
    }

    /// Submits calldata to `arena` and waits for its receipt.
    async fn submit(&self, arena: Address, input: Vec<u8>) -> ChainResult<TransactionRecord> {
        let provider = self.writer()?;
        self.ensure_live(arena).await?;

        let request = TransactionRequest::default()
            .with_to(arena)
            .with_input(input);
        let pending = self
            .bounded("eth_sendTransaction", async {
                provider.send_transaction(request).await
            })
            .await?;
        let hash = *pending.tx_hash();
        tracing::info!("Transaction sent to {}: {}", arena, hash);

        let receipt = match tokio::time::timeout(self.confirmation_timeout, pending.get_receipt()).await {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(err)) => return Err(ChainError::Rpc(err.to_string())),
            Err(_) => {
                return Err(ChainError::TransactionTimeout {
                    hash,
                    timeout_secs: self.confirmation_timeout.as_secs(),
                })
            }
        };

        if !receipt.status() {
            return Err(ChainError::TransactionReverted {
                hash,
                block_number: receipt.block_number,
            });
        }

        tracing::info!(
            "Transaction {} confirmed in block {:?}",
            hash,
            receipt.block_number
        );
        Ok(TransactionRecord::confirmed(hash, arena, receipt.block_number))
    }
}

/// Clamps a ledger damage value into `u64`.
fn damage_to_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[async_trait]
impl ChainReader for RpcLedger {
    async fn current_round(&self, arena: Address) -> ChainResult<u8> {
        self.view(arena, &IKurukshetra::getCurrentRoundCall {}).await
    }

    async fn damage(&self, arena: Address) -> ChainResult<DamageReport> {
        let first = self
            .view(arena, &IKurukshetra::getDamageOnYodhaOneCall {})
            .await?;
        let second = self
            .view(arena, &IKurukshetra::getDamageOnYodhaTwoCall {})
            .await?;

        Ok(DamageReport {
            first: damage_to_u64(first),
            second: damage_to_u64(second),
        })
    }

    async fn has_contract(&self, arena: Address) -> ChainResult<bool> {
        let provider = self.reader()?;
        let code = self
            .bounded("eth_getCode", async { provider.get_code_at(arena).await })
            .await?;
        Ok(!code.is_empty())
    }

    async fn receipt(&self, hash: B256) -> ChainResult<Option<ReceiptSummary>> {
        let provider = self.reader()?;
        let receipt = self
            .bounded("eth_getTransactionReceipt", async {
                provider.get_transaction_receipt(hash).await
            })
            .await?;
        Ok(receipt.map(|receipt| ReceiptSummary {
            hash,
            success: receipt.status(),
            block_number: receipt.block_number,
        }))
    }
}

#[async_trait]
impl ChainWriter for RpcLedger {
    async fn start_game(&self, arena: Address) -> ChainResult<TransactionRecord> {
        tracing::info!("Calling startGame() on {}", arena);
        self.submit(arena, IKurukshetra::startGameCall {}.abi_encode())
            .await
    }

    async fn battle(&self, arena: Address, moves: &SignedMoves) -> ChainResult<TransactionRecord> {
        tracing::info!("Calling battle({}) on {}", moves.decision, arena);
        let call = IKurukshetra::battleCall {
            yodhaOneMove: moves.decision.first.as_u8(),
            yodhaTwoMove: moves.decision.second.as_u8(),
            signature: moves.signature_bytes(),
        };
        self.submit(arena, call.abi_encode()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    // Well-known development key (anvil account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn arena() -> Address {
        Address::repeat_byte(0xab)
    }

    fn sent_hash() -> B256 {
        B256::repeat_byte(0x5e)
    }

    /// A JSON-RPC node holding one arena and one submitted transaction.
    struct Node {
        code: &'static str,
        receipt: Value,
    }

    impl Respond for Node {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let result = match body["method"].as_str().unwrap_or_default() {
                "eth_chainId" => json!("0x221"),
                "eth_getCode" => json!(self.code),
                "eth_getTransactionCount" => json!("0x0"),
                "eth_estimateGas" => json!("0x5208"),
                "eth_feeHistory" => json!({
                    "oldestBlock": "0x29",
                    "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
                    "gasUsedRatio": [0.5],
                    "reward": [["0x3b9aca00"]],
                }),
                "eth_sendRawTransaction" => json!(sent_hash()),
                "eth_blockNumber" => json!("0x2a"),
                "eth_getTransactionReceipt" => self.receipt.clone(),
                _ => Value::Null,
            };
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": result,
            }))
        }
    }

    fn receipt(status: &str) -> Value {
        json!({
            "type": "0x2",
            "status": status,
            "transactionHash": sent_hash(),
            "transactionIndex": "0x0",
            "blockHash": B256::repeat_byte(0x11),
            "blockNumber": "0x2a",
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": arena(),
            "contractAddress": null,
            "cumulativeGasUsed": "0x5208",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
        })
    }

    async fn node(code: &'static str, receipt: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(Node { code, receipt })
            .mount(&server)
            .await;
        server
    }

    async fn connect(server: &MockServer, confirmation_timeout: Duration) -> RpcLedger {
        let config = ChainConfig {
            rpc_url: Some(server.uri()),
            private_key: Some(DEV_KEY.into()),
            confirmation_timeout,
            request_timeout: Duration::from_secs(5),
            ..ChainConfig::default()
        };
        RpcLedger::connect(&config).await.unwrap()
    }

    async fn methods_called(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
            .filter_map(|body| body["method"].as_str().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_contract_aborts_before_sending() {
        let server = node("0x", Value::Null).await;
        let ledger = connect(&server, Duration::from_secs(5)).await;

        let err = ledger.start_game(arena()).await.unwrap_err();
        assert_eq!(err, ChainError::ContractNotFound(arena()));

        let called = methods_called(&server).await;
        assert!(called.iter().any(|m| m == "eth_getCode"));
        assert!(!called.iter().any(|m| m == "eth_sendRawTransaction"));
    }

    #[tokio::test]
    async fn test_confirmed_write() {
        let server = node("0x6080", receipt("0x1")).await;
        let ledger = connect(&server, Duration::from_secs(5)).await;

        let record = ledger.start_game(arena()).await.unwrap();
        assert_eq!(record.hash, sent_hash());
        assert_eq!(record.arena, arena());
        assert!(record.confirmed);
        assert_eq!(record.block_number, Some(42));
    }

    #[tokio::test]
    async fn test_reverted_write_keeps_hash() {
        let server = node("0x6080", receipt("0x0")).await;
        let ledger = connect(&server, Duration::from_secs(5)).await;

        let err = ledger.start_game(arena()).await.unwrap_err();
        assert_eq!(
            err,
            ChainError::TransactionReverted {
                hash: sent_hash(),
                block_number: Some(42),
            }
        );
        assert_eq!(err.submitted_hash(), Some(sent_hash()));
    }

    #[tokio::test]
    async fn test_unmined_write_times_out_with_hash() {
        let server = node("0x6080", Value::Null).await;
        let ledger = connect(&server, Duration::from_secs(1)).await;

        let err = tokio::time::timeout(Duration::from_secs(10), ledger.start_game(arena()))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::TransactionTimeout {
                hash: sent_hash(),
                timeout_secs: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_silent_node_hits_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(60)))
            .mount(&server)
            .await;
        let config = ChainConfig {
            rpc_url: Some(server.uri()),
            private_key: Some(DEV_KEY.into()),
            request_timeout: Duration::from_secs(1),
            ..ChainConfig::default()
        };
        let ledger = tokio::time::timeout(Duration::from_secs(10), RpcLedger::connect(&config))
            .await
            .unwrap()
            .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(10), ledger.current_round(arena()))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::RequestTimeout {
                operation: "eth_call",
                timeout_secs: 1,
            }
        );

        let err = tokio::time::timeout(Duration::from_secs(10), ledger.start_game(arena()))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::RequestTimeout {
                operation: "eth_sendTransaction",
                timeout_secs: 1,
            }
        );
        assert_eq!(err.submitted_hash(), None);
    }

    #[test]
    fn test_default_targets_flow_testnet() {
        let config = ChainConfig::default();
        assert_eq!(config.chain_id, 545);
        assert_eq!(config.confirmation_timeout, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.verify_liveness);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ChainConfig {
            private_key: Some("0xdeadbeef".into()),
            ..ChainConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("deadbeef"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_damage_clamps() {
        assert_eq!(damage_to_u64(U256::from(42)), 42);
        assert_eq!(damage_to_u64(U256::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_unconfigured_ledger_fails_at_write_time() {
        let config = ChainConfig {
            rpc_url: None,
            ..ChainConfig::default()
        };
        let ledger = RpcLedger::connect(&config).await.unwrap();

        let err = ledger.start_game(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, ChainError::Configuration(_)));

        let err = ledger.current_round(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, ChainError::Configuration(_)));
    }
}
