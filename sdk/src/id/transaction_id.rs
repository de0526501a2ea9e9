//! Transaction identifiers.
//!
//! A transaction id is the payer plus the instant from which the transaction
//! becomes valid. The network rejects duplicates, so two ids generated for
//! the same payer must never collide. [`TransactionId::generate`] hands out
//! valid-start times that are strictly increasing across the whole process.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use super::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::proto;

/// Last valid-start handed out, in nanoseconds since the epoch.
static LAST_VALID_START_NANOS: AtomicI64 = AtomicI64::new(0);

/// `payer@seconds.nanos[?scheduled][/nonce]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start: DateTime<Utc>,
    /// Set on the id of a transaction executed by a schedule.
    pub scheduled: bool,
    /// Distinguishes child transactions that share a parent's payer and
    /// valid start.
    pub nonce: Option<i32>,
}

impl TransactionId {
    pub fn new(account_id: AccountId, valid_start: DateTime<Utc>) -> Self {
        Self {
            account_id,
            valid_start,
            scheduled: false,
            nonce: None,
        }
    }

    /// A fresh id for `payer`, valid from now.
    ///
    /// The valid start is strictly later than any previously generated in
    /// this process, even when the wall clock has not moved.
    pub fn generate(payer: AccountId) -> Self {
        Self::new(payer, next_valid_start())
    }

    pub fn with_scheduled(mut self, scheduled: bool) -> Self {
        self.scheduled = scheduled;
        self
    }

    pub fn with_nonce(mut self, nonce: i32) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// The id of chunk `index` in a chunked submission whose first chunk
    /// uses `self`. Chunk `i` starts `i` nanoseconds after the first, so the
    /// chain is a pure function of the initial id.
    pub fn chunk_id(&self, index: usize) -> Self {
        Self {
            valid_start: self.valid_start + ChronoDuration::nanoseconds(index as i64),
            ..*self
        }
    }

    pub fn to_proto(self) -> Result<proto::TransactionId> {
        Ok(proto::TransactionId {
            transaction_valid_start: Some(timestamp_to_proto(self.valid_start)),
            account_id: Some(self.account_id.to_account_proto()?),
            scheduled: self.scheduled,
            nonce: self.nonce.unwrap_or(0),
        })
    }

    pub fn from_proto(id: &proto::TransactionId) -> Result<Self> {
        let account = id
            .account_id
            .as_ref()
            .ok_or_else(|| Error::validation("transaction id", "missing account id"))?;
        let start = id
            .transaction_valid_start
            .as_ref()
            .ok_or_else(|| Error::validation("transaction id", "missing valid start"))?;
        Ok(Self {
            account_id: AccountId::from_account_proto(account)?,
            valid_start: timestamp_from_proto(start)?,
            scheduled: id.scheduled,
            nonce: (id.nonce != 0).then_some(id.nonce),
        })
    }
}

fn next_valid_start() -> DateTime<Utc> {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);
    let mut previous = LAST_VALID_START_NANOS.load(Ordering::Relaxed);
    loop {
        let next = now.max(previous + 1);
        match LAST_VALID_START_NANOS.compare_exchange_weak(
            previous,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return Utc.timestamp_nanos(next),
            Err(actual) => previous = actual,
        }
    }
}

pub(crate) fn timestamp_to_proto(time: DateTime<Utc>) -> proto::Timestamp {
    proto::Timestamp {
        seconds: time.timestamp(),
        nanos: time.timestamp_subsec_nanos() as i32,
    }
}

pub(crate) fn timestamp_from_proto(ts: &proto::Timestamp) -> Result<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos)
        .map_err(|_| Error::validation("timestamp", "negative nanos"))?;
    Utc.timestamp_opt(ts.seconds, nanos)
        .single()
        .ok_or_else(|| Error::validation("timestamp", "out of range"))
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id,
            self.valid_start.timestamp(),
            self.valid_start.timestamp_subsec_nanos()
        )?;
        if self.scheduled {
            f.write_str("?scheduled")?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, "/{nonce}")?;
        }
        Ok(())
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::validation("transaction id", format!("{s:?}: {reason}"));

        let (account, rest) = s.split_once('@').ok_or_else(|| invalid("missing '@'"))?;
        let (rest, nonce) = match rest.split_once('/') {
            Some((rest, nonce)) => (
                rest,
                Some(nonce.parse::<i32>().map_err(|_| invalid("bad nonce"))?),
            ),
            None => (rest, None),
        };
        let (rest, scheduled) = match rest.strip_suffix("?scheduled") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let (seconds, nanos) = rest
            .split_once('.')
            .ok_or_else(|| invalid("expected seconds.nanos"))?;
        let seconds: i64 = seconds.parse().map_err(|_| invalid("bad seconds"))?;
        let nanos: u32 = nanos.parse().map_err(|_| invalid("bad nanos"))?;
        if nanos >= 1_000_000_000 {
            return Err(invalid("nanos out of range"));
        }
        let valid_start = Utc
            .timestamp_opt(seconds, nanos)
            .single()
            .ok_or_else(|| invalid("timestamp out of range"))?;

        Ok(Self {
            account_id: account.parse()?,
            valid_start,
            scheduled,
            nonce,
        })
    }
}
