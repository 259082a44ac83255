//! Core logic of the yCRV zap client.
//!
//! The state machine in [`state`] decides, for a selected input token,
//! output token and amount, whether an approval is needed before the swap
//! can be submitted and what the minimum acceptable output is. The
//! [`orchestrator`] runs the reads and transactions the state machine asks
//! for against a [`ZapClient`].

pub mod approval;
pub mod balances;
pub mod contracts;
pub mod error;
pub mod event_bus;
pub mod orchestrator;
pub mod policy;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use approval::ApprovalChecker;
pub use balances::BalanceSnapshotProvider;
pub use contracts::{OnchainZapClient, ZapClient, APPROVED_CALLER_DEPOSIT_AND_WITHDRAW};
pub use error::ZapError;
pub use event_bus::EventBus;
pub use orchestrator::SwapOrchestrator;
pub use policy::ZapPolicy;
pub use state::{phase, primary_action, reduce, Action, ApprovalKey, Effect, QuoteKey, SwapState};

#[cfg(any(test, feature = "testing"))]
pub use contracts::MockZapClient;
