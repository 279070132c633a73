//! CIN reward token access: the ERC-20 contract client and the faucet built on it.

pub mod contract;
pub mod cooldown;
pub mod faucet;

pub use contract::{CinTokenClient, TOKEN_DECIMALS, TOKEN_SYMBOL};
pub use faucet::{FaucetService, MintReceipt, TokenBalance};
