//! Credit-gated inference relay.
//!
//! Accepts a prompt together with a caller's account address, checks that
//! the account holds at least one credit on the `ApiAuthorization`
//! contract, completes the prompt through an ordered chain of language
//! model backends and records one unit of usage against the account.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod providers;

pub use config::Config;
pub use coordinator::{CompletionRequest, RelayCoordinator, RelaySettings, UsageMode};
pub use error::RelayError;
pub use providers::build_provider_chain;
