//! # Client
//!
//! The handle every transaction and query executes against. A `Client` is
//! cheap to clone (one `Arc`), safe to share across tasks, and owns:
//!
//! - the [`Network`] address book and per-node cooldowns,
//! - the [`Transport`] used to reach nodes,
//! - an optional operator (default payer and signer),
//! - the execution settings and status table requests resolve against.
//!
//! Nothing here is global. Two clients in one process never see each
//! other's settings, which is what lets the integration tests run in
//! parallel.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::config::{ClientConfig, ExecutionConfig, DEFAULT_MAX_QUERY_PAYMENT};
use crate::crypto::{PrivateKey, PublicKey, Signer};
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::AccountId;
use crate::network::{Network, Transport};
use crate::status::StatusTable;

/// The account that pays for and signs requests by default.
#[derive(Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub(crate) signer: Arc<dyn Signer>,
}

impl Operator {
    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn signer(&self) -> Arc<dyn Signer> {
        Arc::clone(&self.signer)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key())
            .finish()
    }
}

struct ClientInner {
    network: Network,
    transport: Arc<dyn Transport>,
    operator: RwLock<Option<Operator>>,
    execution: RwLock<ExecutionConfig>,
    status_table: RwLock<Arc<StatusTable>>,
    default_max_transaction_fee: RwLock<Option<Hbar>>,
    default_max_query_payment: RwLock<Hbar>,
    max_nodes_per_transaction: RwLock<Option<usize>>,
}

/// A connection to one ledger network.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// A client for the given `(address, node account id)` pairs.
    pub fn for_network(
        nodes: impl IntoIterator<Item = (String, AccountId)>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let network = Network::new(nodes)?;
        info!(nodes = network.len(), "client created");
        Ok(Self {
            inner: Arc::new(ClientInner {
                network,
                transport,
                operator: RwLock::new(None),
                execution: RwLock::new(ExecutionConfig::default()),
                status_table: RwLock::new(Arc::new(StatusTable::default())),
                default_max_transaction_fee: RwLock::new(None),
                default_max_query_payment: RwLock::new(DEFAULT_MAX_QUERY_PAYMENT),
                max_nodes_per_transaction: RwLock::new(None),
            }),
        })
    }

    /// A client described by a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let client = Self::for_network(config.nodes()?, transport)?;
        client.set_execution_config(config.execution_config()?);

        if let Some(operator) = &config.operator {
            let account_id: AccountId = operator.account_id.parse()?;
            let key = PrivateKey::from_hex(&operator.private_key)?;
            client.set_operator(account_id, key);
        }
        if let Some(max) = config.max_nodes_per_transaction {
            client.set_max_nodes_per_transaction(Some(max))?;
        }
        if let Some(tinybars) = config.default_max_transaction_fee_tinybars {
            client.set_default_max_transaction_fee(Hbar::from_tinybars(tinybars))?;
        }
        if let Some(tinybars) = config.default_max_query_payment_tinybars {
            client.set_default_max_query_payment(Hbar::from_tinybars(tinybars))?;
        }
        Ok(client)
    }

    /// Parse a JSON config and build a client from it.
    pub fn from_config_json(json: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::from_config(&ClientConfig::from_json(json)?, transport)
    }

    pub fn network(&self) -> &Network {
        &self.inner.network
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    // -----------------------------------------------------------------------
    // Operator
    // -----------------------------------------------------------------------

    pub fn set_operator(&self, account_id: AccountId, signer: impl Signer + 'static) -> &Self {
        self.set_operator_with(account_id, Arc::new(signer))
    }

    pub fn set_operator_with(&self, account_id: AccountId, signer: Arc<dyn Signer>) -> &Self {
        info!(operator = %account_id, "operator set");
        *self.inner.operator.write() = Some(Operator { account_id, signer });
        self
    }

    pub fn operator(&self) -> Option<Operator> {
        self.inner.operator.read().clone()
    }

    pub fn operator_account_id(&self) -> Option<AccountId> {
        self.inner.operator.read().as_ref().map(|op| op.account_id)
    }

    pub fn operator_public_key(&self) -> Option<PublicKey> {
        self.inner.operator.read().as_ref().map(Operator::public_key)
    }

    // -----------------------------------------------------------------------
    // Execution settings
    // -----------------------------------------------------------------------

    pub fn execution_config(&self) -> ExecutionConfig {
        self.inner.execution.read().clone()
    }

    pub fn set_execution_config(&self, config: ExecutionConfig) -> &Self {
        *self.inner.execution.write() = config;
        self
    }

    /// Mutate the execution config in place. The closure's error, if any,
    /// leaves the config untouched.
    pub fn update_execution_config(
        &self,
        update: impl FnOnce(&mut ExecutionConfig) -> Result<()>,
    ) -> Result<&Self> {
        let mut config = self.execution_config();
        update(&mut config)?;
        *self.inner.execution.write() = config;
        Ok(self)
    }

    pub fn status_table(&self) -> Arc<StatusTable> {
        Arc::clone(&self.inner.status_table.read())
    }

    pub fn set_status_table(&self, table: StatusTable) -> &Self {
        *self.inner.status_table.write() = Arc::new(table);
        self
    }

    pub fn default_max_transaction_fee(&self) -> Option<Hbar> {
        *self.inner.default_max_transaction_fee.read()
    }

    pub fn set_default_max_transaction_fee(&self, fee: Hbar) -> Result<&Self> {
        if fee.is_negative() {
            return Err(Error::validation("default_max_transaction_fee", "must not be negative"));
        }
        *self.inner.default_max_transaction_fee.write() = Some(fee);
        Ok(self)
    }

    pub fn default_max_query_payment(&self) -> Hbar {
        *self.inner.default_max_query_payment.read()
    }

    pub fn set_default_max_query_payment(&self, max: Hbar) -> Result<&Self> {
        if max.is_negative() {
            return Err(Error::validation("default_max_query_payment", "must not be negative"));
        }
        *self.inner.default_max_query_payment.write() = max;
        Ok(self)
    }

    pub fn max_nodes_per_transaction(&self) -> Option<usize> {
        *self.inner.max_nodes_per_transaction.read()
    }

    pub fn set_max_nodes_per_transaction(&self, max: Option<usize>) -> Result<&Self> {
        if max == Some(0) {
            return Err(Error::validation("max_nodes_per_transaction", "must be at least 1"));
        }
        *self.inner.max_nodes_per_transaction.write() = max;
        Ok(self)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("network", &self.inner.network)
            .field("operator", &*self.inner.operator.read())
            .field("execution", &*self.inner.execution.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Endpoint, TransportError, TransportRequest};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::time::Duration;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(
            &self,
            _node: &Endpoint,
            _request: TransportRequest,
            _deadline: tokio::time::Instant,
        ) -> std::result::Result<Bytes, TransportError> {
            Err(TransportError::Unavailable("test".into()))
        }
    }

    #[test]
    fn builds_from_json() {
        let key = PrivateKey::generate();
        let json = format!(
            r#"{{
                "network": {{ "127.0.0.1:50211": "0.0.3", "127.0.0.1:50212": "0.0.4" }},
                "operator": {{ "account_id": "0.0.2", "private_key": "{}" }},
                "max_attempts": 4,
                "min_backoff_ms": 100,
                "max_nodes_per_transaction": 2,
                "default_max_query_payment_tinybars": 500
            }}"#,
            hex::encode(key.to_bytes())
        );
        let client = Client::from_config_json(&json, Arc::new(Unreachable)).unwrap();

        assert_eq!(client.network().len(), 2);
        assert_eq!(client.operator_account_id(), Some(AccountId::new(0, 0, 2)));
        assert_eq!(client.operator_public_key(), Some(key.public_key()));
        assert_eq!(client.execution_config().max_attempts(), 4);
        assert_eq!(client.execution_config().min_backoff(), Duration::from_millis(100));
        assert_eq!(client.max_nodes_per_transaction(), Some(2));
        assert_eq!(client.default_max_query_payment(), Hbar::from_tinybars(500));
    }

    #[test]
    fn update_is_all_or_nothing() {
        let client = Client::for_network(
            vec![("a".to_string(), AccountId::new(0, 0, 3))],
            Arc::new(Unreachable),
        )
        .unwrap();

        let result = client.update_execution_config(|config| {
            config.set_max_attempts(3)?;
            config.set_min_backoff(Duration::from_secs(60))?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(client.execution_config(), ExecutionConfig::default());
    }

    #[test]
    fn rejects_negative_defaults() {
        let client = Client::for_network(
            vec![("a".to_string(), AccountId::new(0, 0, 3))],
            Arc::new(Unreachable),
        )
        .unwrap();
        assert!(client.set_default_max_transaction_fee(Hbar::new(-1)).is_err());
        assert!(client.set_default_max_query_payment(Hbar::new(-1)).is_err());
        assert!(client.set_max_nodes_per_transaction(Some(0)).is_err());
        assert_eq!(client.default_max_transaction_fee(), None);
    }
}
