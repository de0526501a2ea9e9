//! # Strata Simulator
//!
//! An in-process stand-in for a Strata network. It implements the SDK's
//! `Transport` trait, so a `Client` talks to it exactly as it would talk to
//! real nodes: same protobuf bytes in, same protobuf bytes out.
//!
//! ## Architecture
//!
//! - **ledger**: Accounts, files and topics, plus a consensus step that
//!   turns a prechecked transaction into a receipt and a record.
//! - **node**: `SimulatedNetwork`: per-node precheck, query answering,
//!   and the `Transport` implementation.
//! - **faults**: Scripted per-node failures for exercising retry paths.
//! - **logging**: `tracing` subscriber setup for runs and tests.
//!
//! ## Design Decisions
//!
//! - Consensus is synchronous and totally ordered behind one lock. Receipt
//!   latency is simulated separately, per transaction.
//! - Every transaction costs the same flat fee. Fee schedules are a
//!   network concern the SDK never computes.

pub mod faults;
pub mod ledger;
pub mod logging;
pub mod node;

pub use faults::{Fault, Faults};
pub use ledger::{Ledger, Outcome, SimError};
pub use logging::{init_logging, init_test_logging, LogFormat};
pub use node::{SimConfig, SimulatedNetwork, FIRST_NODE_NUM};
