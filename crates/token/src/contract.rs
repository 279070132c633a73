//! Client for the deployed CIN ERC-20 contract.
//!
//! Only the owner-restricted `mint` and a few views are bound; the contract
//! itself is deployed and managed elsewhere.

use std::str::FromStr;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;

use cin_common::error::AppError;

sol! {
    #[sol(rpc)]
    interface ICinToken {
        /// Mint `amount` base units to `to`. Only callable by the owner.
        function mint(address to, uint256 amount) external;
        function owner() external view returns (address);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// ERC-20 decimals of the CIN token.
pub const TOKEN_DECIMALS: u8 = 18;

pub const TOKEN_SYMBOL: &str = "CIN";

/// Thin RPC client for the CIN token contract.
#[derive(Debug, Clone)]
pub struct CinTokenClient {
    rpc_url: String,
    token_address: Address,
}

impl CinTokenClient {
    pub fn new(rpc_url: &str, token_address: &str) -> Result<Self, AppError> {
        let token_address = Address::from_str(token_address.trim()).map_err(|e| {
            AppError::Config(format!("Invalid CIN token address '{}': {}", token_address, e))
        })?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            token_address,
        })
    }

    pub fn token_address(&self) -> Address {
        self.token_address
    }

    /// Read the token balance of `account` in base units.
    pub async fn balance_of(&self, account: Address) -> Result<U256, AppError> {
        let provider = ProviderBuilder::new().connect_http(self.endpoint()?);
        let contract = ICinToken::new(self.token_address, provider);

        contract
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| AppError::Chain(format!("balanceOf failed: {}", e)))
    }

    /// Mint `amount` base units to `to`, signing with the owner key, and wait
    /// for the transaction to be mined.
    ///
    /// The owner is checked first when the RPC allows it; a failed owner read
    /// is logged and the mint is attempted anyway.
    pub async fn mint(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, AppError> {
        let minter = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(self.endpoint()?);
        let contract = ICinToken::new(self.token_address, provider);

        match contract.owner().call().await {
            Ok(owner) if owner != minter => {
                tracing::error!(%owner, %minter, "Custodial key does not own the CIN token");
                return Err(AppError::Config(
                    "Server misconfiguration: DEPLOYER is not the token owner".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    token = %self.token_address,
                    error = %e,
                    "Could not verify token owner, attempting mint anyway"
                );
            }
        }

        let pending = contract
            .mint(to, amount)
            .send()
            .await
            .map_err(|e| AppError::Chain(format!("Mint transaction failed: {}", e)))?;

        tracing::info!(tx_hash = %pending.tx_hash(), to = %to, "Mint transaction submitted");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| AppError::Chain(format!("Mint receipt unavailable: {}", e)))?;

        if !receipt.status() {
            return Err(AppError::Chain(format!(
                "Mint transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        Ok(receipt.transaction_hash)
    }

    fn endpoint(&self) -> Result<alloy::transports::http::reqwest::Url, AppError> {
        self.rpc_url
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid RPC URL '{}': {}", self.rpc_url, e)))
    }
}

/// Convert whole tokens to base units.
pub fn token_units(whole_tokens: u64, decimals: u8) -> U256 {
    U256::from(whole_tokens) * U256::from(10u64).pow(U256::from(decimals))
}

/// Render base units as a decimal token amount.
pub fn display_units(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// Parse a user-supplied address.
///
/// The `0x` prefix is optional. All-lower or all-upper hex is accepted as is;
/// mixed case must carry a valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Result<Address, AppError> {
    let invalid = || AppError::Validation("Invalid user address".to_string());

    let input = input.trim();
    let hex = input.strip_prefix("0x").unwrap_or(input);
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let prefixed = format!("0x{}", hex);
    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(&prefixed, None).map_err(|_| invalid())
    } else {
        Address::from_str(&prefixed).map_err(|_| invalid())
    }
}
