//! Query payments.
//!
//! A paid query carries a transfer from the operator to the answering node
//! inside its header. The transfer names exactly one node, so a query that
//! may go to several nodes needs one payment per node, each frozen and
//! signed up front.

use std::collections::HashMap;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::{AccountId, TransactionId};
use crate::proto;
use crate::transaction::TransferTransaction;

/// Fee ceiling on the payment transfer itself.
const PAYMENT_MAX_TRANSACTION_FEE: Hbar = Hbar::new(1);

#[derive(Debug, Clone)]
pub(crate) struct QueryPayments {
    by_node: HashMap<AccountId, proto::Transaction>,
}

impl QueryPayments {
    pub(crate) fn build(client: &Client, nodes: &[AccountId], amount: Hbar) -> Result<Self> {
        let operator = client
            .operator()
            .ok_or_else(|| Error::illegal_state("paid queries need an operator to pay with"))?;

        let mut by_node = HashMap::with_capacity(nodes.len());
        for &node in nodes {
            let mut payment = TransferTransaction::new();
            payment
                .add_hbar_transfer(operator.account_id, -amount)?
                .add_hbar_transfer(node, amount)?
                .set_transaction_id(TransactionId::generate(operator.account_id))?
                .set_node_account_ids(vec![node])?
                .set_max_transaction_fee(PAYMENT_MAX_TRANSACTION_FEE)?
                .freeze()?;
            payment.sign_arc(operator.signer())?;
            by_node.insert(node, payment.to_proto_for_node(node)?);
        }
        Ok(Self { by_node })
    }

    pub(crate) fn for_node(&self, node: AccountId) -> Result<proto::Transaction> {
        self.by_node
            .get(&node)
            .cloned()
            .ok_or_else(|| Error::illegal_state(format!("no query payment built for node {node}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;
    use crate::network::{Endpoint, Transport, TransportError, TransportRequest};
    use async_trait::async_trait;
    use bytes::Bytes;
    use prost::Message;
    use std::sync::Arc;

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

    fn client() -> Client {
        Client::for_network(
            vec![
                ("a".to_string(), AccountId::new(0, 0, 3)),
                ("b".to_string(), AccountId::new(0, 0, 4)),
            ],
            Arc::new(Unreachable),
        )
        .unwrap()
    }

    #[test]
    fn one_signed_transfer_per_node() {
        let client = client();
        let key = PrivateKey::generate();
        client.set_operator(AccountId::new(0, 0, 2), key.clone());

        let nodes = [AccountId::new(0, 0, 3), AccountId::new(0, 0, 4)];
        let payments = QueryPayments::build(&client, &nodes, Hbar::from_tinybars(25)).unwrap();

        for node in nodes {
            let bytes = payments.for_node(node).unwrap().encode_to_vec();
            let transfer = TransferTransaction::from_bytes(&bytes).unwrap();
            assert_eq!(transfer.node_account_ids(), Some(&[node][..]));
            assert!(transfer.is_signed_by(&key.public_key()));
            let legs = transfer.hbar_transfers();
            assert_eq!(legs.len(), 2);
            assert_eq!(legs[0].amount, Hbar::from_tinybars(-25));
            assert_eq!(legs[1].account_id, node);
        }
        assert!(payments.for_node(AccountId::new(0, 0, 5)).is_err());
    }

    #[test]
    fn needs_an_operator() {
        let err = QueryPayments::build(&client(), &[AccountId::new(0, 0, 3)], Hbar::new(1));
        assert!(matches!(err, Err(Error::IllegalState(_))));
    }
}
