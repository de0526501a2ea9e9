//! # Query Module
//!
//! Read-only requests: receipts, records, balances.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs     : Query<D>: node choice, payment, cost lookup, execution
//! payment.rs : per-node payment transfers signed by the operator
//! receipt.rs : TransactionReceiptQuery (free, polls until consensus)
//! record.rs  : TransactionRecordQuery (paid, polls until consensus)
//! balance.rs : AccountBalanceQuery (free)
//! ```
//!
//! ## Design Decisions
//!
//! - Queries run through the same engine as transactions. The only thing
//!   that differs is how a response is bucketed, which each kind refines
//!   through [`QueryData::classify_answer`].
//! - A paid query with no explicit payment first asks a node what the
//!   answer costs. The cost query itself carries no payment. A quote above
//!   the maximum payment fails before anything is paid.

mod balance;
mod payment;
mod receipt;
mod record;

pub use balance::{AccountBalance, AccountBalanceQuery, AccountBalanceQueryData};
pub use receipt::{TransactionReceiptQuery, TransactionReceiptQueryData};
pub use record::{TransactionRecordQuery, TransactionRecordQueryData};

use std::fmt;
use std::time::Duration;

use prost::Message;
use tracing::debug;

use crate::client::Client;
use crate::config::ExecutionOverrides;
use crate::error::{Error, Result};
use crate::execute::{self, Execute};
use crate::hbar::Hbar;
use crate::id::{AccountId, TransactionId};
use crate::network::TransportRequest;
use crate::proto;
use crate::status::{Status, StatusBucket, StatusTable};
use payment::QueryPayments;

// ---------------------------------------------------------------------------
// QueryData
// ---------------------------------------------------------------------------

/// The kind-specific half of a query.
pub trait QueryData: Clone + fmt::Debug + Send + Sync + 'static {
    type Output;

    fn method(&self) -> &'static str;

    fn is_payment_required(&self) -> bool {
        true
    }

    /// The transaction this query is about, if any.
    fn transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// Reject a query that cannot be sent as built.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn to_query(&self, header: proto::QueryHeader) -> Result<proto::Query>;

    /// Second look at a response whose header precheck was a success.
    /// `None` keeps the header's verdict.
    fn classify_answer(
        &self,
        _response: &proto::Response,
        _table: &StatusTable,
    ) -> Option<(Status, StatusBucket)> {
        None
    }

    fn make_output(&self, response: proto::Response) -> Result<Self::Output>;
}

fn header_status(response: &proto::Response) -> Status {
    Status::from_code(
        response
            .header()
            .map(|h| h.node_transaction_precheck_code)
            .unwrap_or_default(),
    )
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Query<D> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    payment_amount: Option<Hbar>,
    max_query_payment: Option<Hbar>,
    overrides: ExecutionOverrides,
}

impl<D: QueryData + Default> Default for Query<D> {
    fn default() -> Self {
        Self::from_data(D::default())
    }
}

impl<D: QueryData + Default> Query<D> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: QueryData> Query<D> {
    pub(crate) fn from_data(data: D) -> Self {
        Self {
            data,
            node_account_ids: None,
            payment_amount: None,
            max_query_payment: None,
            overrides: ExecutionOverrides::default(),
        }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.node_account_ids.as_deref()
    }

    pub fn set_node_account_ids(&mut self, ids: Vec<AccountId>) -> Result<&mut Self> {
        if ids.is_empty() {
            return Err(Error::validation("node_account_ids", "must not be empty"));
        }
        for id in &ids {
            id.require_num("node_account_ids")?;
        }
        self.node_account_ids = Some(ids);
        Ok(self)
    }

    /// Pin the query to the one node that is known to have the answer.
    pub(crate) fn restrict_to(&mut self, node: AccountId) -> &mut Self {
        self.node_account_ids = Some(vec![node]);
        self
    }

    /// Pay exactly this much, skipping the cost lookup.
    pub fn set_query_payment(&mut self, amount: Hbar) -> Result<&mut Self> {
        if amount.is_negative() {
            return Err(Error::validation("query_payment", "must not be negative"));
        }
        self.payment_amount = Some(amount);
        Ok(self)
    }

    /// Refuse to pay more than this. Defaults to the client's setting.
    pub fn set_max_query_payment(&mut self, max: Hbar) -> Result<&mut Self> {
        if max.is_negative() {
            return Err(Error::validation("max_query_payment", "must not be negative"));
        }
        self.max_query_payment = Some(max);
        Ok(self)
    }

    pub fn set_max_attempts(&mut self, attempts: u32) -> Result<&mut Self> {
        self.overrides.set_max_attempts(attempts)?;
        Ok(self)
    }

    pub fn set_min_backoff(&mut self, min: Duration) -> Result<&mut Self> {
        self.overrides.set_min_backoff(min)?;
        Ok(self)
    }

    pub fn set_max_backoff(&mut self, max: Duration) -> Result<&mut Self> {
        self.overrides.set_max_backoff(max)?;
        Ok(self)
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.overrides.request_timeout = Some(timeout);
        self
    }

    pub fn set_grpc_deadline(&mut self, deadline: Duration) -> &mut Self {
        self.overrides.grpc_deadline = Some(deadline);
        self
    }

    fn node_ids(&self, client: &Client) -> Vec<AccountId> {
        match &self.node_account_ids {
            Some(ids) => ids.clone(),
            None => client
                .network()
                .node_ids_for_execute(client.max_nodes_per_transaction()),
        }
    }

    /// What a node would charge to answer. Free queries cost nothing and
    /// are not asked.
    pub async fn get_cost(&self, client: &Client) -> Result<Hbar> {
        if !self.data.is_payment_required() {
            return Ok(Hbar::ZERO);
        }
        self.data.validate()?;
        let mut cost = CostExecution {
            query: self,
            node_ids: self.node_ids(client),
        };
        execute::execute(client, &mut cost).await
    }

    pub async fn execute(&self, client: &Client) -> Result<D::Output> {
        self.data.validate()?;
        let node_ids = self.node_ids(client);

        let payments = if self.data.is_payment_required() {
            let amount = match self.payment_amount {
                Some(amount) => amount,
                None => {
                    let cost = self.get_cost(client).await?;
                    let max = self
                        .max_query_payment
                        .unwrap_or_else(|| client.default_max_query_payment());
                    if cost > max {
                        return Err(Error::MaxQueryPaymentExceeded { cost, max });
                    }
                    cost
                }
            };
            debug!(amount = %amount, nodes = node_ids.len(), "paying for query");
            Some(QueryPayments::build(client, &node_ids, amount)?)
        } else {
            None
        };

        let mut answer = AnswerExecution {
            query: self,
            node_ids,
            payments,
        };
        execute::execute(client, &mut answer).await
    }
}

// ---------------------------------------------------------------------------
// Engine glue
// ---------------------------------------------------------------------------

struct AnswerExecution<'a, D> {
    query: &'a Query<D>,
    node_ids: Vec<AccountId>,
    payments: Option<QueryPayments>,
}

impl<D: QueryData> Execute for AnswerExecution<'_, D> {
    type Response = proto::Response;
    type Output = D::Output;

    fn candidates(&self) -> Vec<AccountId> {
        self.node_ids.clone()
    }

    fn overrides(&self) -> &ExecutionOverrides {
        &self.query.overrides
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.query.data.transaction_id()
    }

    fn make_request(&self, node: AccountId) -> Result<TransportRequest> {
        let payment = match &self.payments {
            Some(payments) => Some(payments.for_node(node)?),
            None => None,
        };
        let header = proto::QueryHeader {
            payment,
            response_type: proto::RESPONSE_TYPE_ANSWER_ONLY,
        };
        Ok(TransportRequest::new(
            self.query.data.method(),
            self.query.data.to_query(header)?.encode_to_vec(),
        ))
    }

    fn classify(&self, response: &Self::Response, table: &StatusTable) -> (Status, StatusBucket) {
        let status = header_status(response);
        let bucket = table.classify_precheck(status);
        if bucket == StatusBucket::Success {
            if let Some(answer) = self.query.data.classify_answer(response, table) {
                return answer;
            }
        }
        (status, bucket)
    }

    fn make_output(
        &self,
        response: Self::Response,
        _node: AccountId,
        _status: Status,
    ) -> Result<D::Output> {
        self.query.data.make_output(response)
    }
}

struct CostExecution<'a, D> {
    query: &'a Query<D>,
    node_ids: Vec<AccountId>,
}

impl<D: QueryData> Execute for CostExecution<'_, D> {
    type Response = proto::Response;
    type Output = Hbar;

    fn candidates(&self) -> Vec<AccountId> {
        self.node_ids.clone()
    }

    fn overrides(&self) -> &ExecutionOverrides {
        &self.query.overrides
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.query.data.transaction_id()
    }

    fn make_request(&self, _node: AccountId) -> Result<TransportRequest> {
        let header = proto::QueryHeader {
            payment: None,
            response_type: proto::RESPONSE_TYPE_COST_ANSWER,
        };
        Ok(TransportRequest::new(
            self.query.data.method(),
            self.query.data.to_query(header)?.encode_to_vec(),
        ))
    }

    fn classify(&self, response: &Self::Response, table: &StatusTable) -> (Status, StatusBucket) {
        let status = header_status(response);
        (status, table.classify_precheck(status))
    }

    fn make_output(&self, response: Self::Response, _node: AccountId, _status: Status) -> Result<Hbar> {
        let cost = response.header().map(|h| h.cost).unwrap_or_default();
        Ok(Hbar::from_tinybars(i64::try_from(cost).unwrap_or(i64::MAX)))
    }
}
