pub mod contract;

pub mod deployment;

pub mod error;

pub mod evm;

pub mod grading;

pub mod practice;

pub mod session;

pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use contract::{
    ContractClient,
    execute,
};
pub use session::{
    Action,
    Command,
    Session,
};
