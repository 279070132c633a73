//! Faucet service: hands out a fixed amount of CIN to an address.

use std::str::FromStr;

use alloy::signers::local::PrivateKeySigner;
use redis::aio::ConnectionManager;
use serde::Serialize;

use cin_common::config::AppConfig;
use cin_common::error::AppError;

use crate::contract::{
    CinTokenClient, TOKEN_DECIMALS, TOKEN_SYMBOL, display_units, parse_address, token_units,
};
use crate::cooldown::FaucetCooldown;

/// Result of a successful faucet mint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub message: String,
    pub transaction_hash: String,
    pub amount: String,
}

/// Token balance of an address.
#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub address: String,
    pub symbol: &'static str,
    /// Base units, decimal string
    pub raw: String,
    /// Whole-token display amount
    pub balance: String,
}

/// Mints the faucet allowance with the custodial owner key.
#[derive(Clone)]
pub struct FaucetService {
    token: CinTokenClient,
    signer: Option<PrivateKeySigner>,
    mint_amount: u64,
    cooldown: FaucetCooldown,
}

impl FaucetService {
    pub fn new(
        token: CinTokenClient,
        signer: Option<PrivateKeySigner>,
        mint_amount: u64,
        cooldown: FaucetCooldown,
    ) -> Self {
        Self {
            token,
            signer,
            mint_amount,
            cooldown,
        }
    }

    /// Build the faucet from configuration.
    ///
    /// A missing key is allowed (the faucet then refuses to mint); a malformed
    /// one is a configuration error.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let token = CinTokenClient::new(&config.rpc_url, &config.cin_token_address)?;
        let signer = config
            .deployer_private_key
            .as_deref()
            .map(|key| {
                PrivateKeySigner::from_str(key.trim()).map_err(|_| {
                    AppError::Config("DEPLOYER_PRIVATE_KEY is not a valid private key".to_string())
                })
            })
            .transpose()?;

        match &signer {
            Some(s) => tracing::info!(
                minter = %s.address(),
                token = %token.token_address(),
                "Faucet enabled"
            ),
            None => tracing::warn!("DEPLOYER_PRIVATE_KEY not set, faucet minting disabled"),
        }

        Ok(Self::new(
            token,
            signer,
            config.faucet_mint_amount,
            FaucetCooldown::new(config.faucet_cooldown_seconds),
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.signer.is_some()
    }

    /// Mint the faucet allowance to `user_address`.
    ///
    /// The cooldown slot is claimed before the transaction is sent and released
    /// again if minting fails.
    pub async fn mint(
        &self,
        redis: &mut ConnectionManager,
        user_address: &str,
    ) -> Result<MintReceipt, AppError> {
        let to = parse_address(user_address)?;
        let signer = self.signer.as_ref().ok_or_else(|| {
            AppError::Config("Server misconfiguration: DEPLOYER_PRIVATE_KEY is not set".to_string())
        })?;

        if !self.cooldown.try_acquire(redis, to).await? {
            let remaining = self.cooldown.remaining(redis, to).await.unwrap_or(0);
            return Err(AppError::RateLimited(format!(
                "Address {:#x} already received CIN, try again in {} seconds",
                to, remaining
            )));
        }

        let amount = token_units(self.mint_amount, TOKEN_DECIMALS);
        match self.token.mint(signer, to, amount).await {
            Ok(tx_hash) => {
                tracing::info!(
                    to = %to,
                    tx_hash = %tx_hash,
                    amount = self.mint_amount,
                    "CIN minted from faucet"
                );
                Ok(MintReceipt {
                    message: "CIN minted successfully".to_string(),
                    transaction_hash: format!("{:#x}", tx_hash),
                    amount: format!("{} {}", self.mint_amount, TOKEN_SYMBOL),
                })
            }
            Err(e) => {
                tracing::error!(to = %to, error = %e, "Faucet mint failed");
                if let Err(clear_err) = self.cooldown.clear(redis, to).await {
                    tracing::warn!(
                        to = %to,
                        error = %clear_err,
                        "Failed to release faucet cooldown"
                    );
                }
                Err(e)
            }
        }
    }

    /// Read the CIN balance of `address`.
    pub async fn balance(&self, address: &str) -> Result<TokenBalance, AppError> {
        let account = parse_address(address)?;
        let raw = self.token.balance_of(account).await?;

        Ok(TokenBalance {
            address: format!("{:#x}", account),
            symbol: TOKEN_SYMBOL,
            raw: raw.to_string(),
            balance: display_units(raw, TOKEN_DECIMALS),
        })
    }
}
