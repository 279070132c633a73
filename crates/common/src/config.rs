use serde::Deserialize;

/// Default CIN token deployment on Base Sepolia.
pub const DEFAULT_CIN_TOKEN_ADDRESS: &str = "0xD6533D9b1705c01D048D8CcA087F0426d1A09d08";

/// Default public Base Sepolia RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://sepolia.base.org";

/// Upper bound for session lifetime (one year).
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string
    pub redis_url: String,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Port the HTTP server binds to (default: 3000)
    pub api_port: u16,

    /// JSON-RPC endpoint of the chain hosting the CIN token
    pub rpc_url: String,

    /// Address of the deployed CIN ERC-20 contract
    pub cin_token_address: String,

    /// Custodial key of the token owner, used by the faucet to call `mint`
    pub deployer_private_key: Option<String>,

    /// Whole tokens minted per faucet request (default: 30)
    pub faucet_mint_amount: u64,

    /// Seconds an address must wait between faucet requests (default: 86400)
    pub faucet_cooldown_seconds: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: var_or("REDIS_URL", "redis://localhost:6379"),
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: var_or("JWT_EXPIRY_HOURS", "24")
                .parse()
                .ok()
                .filter(|h| (1..=MAX_JWT_EXPIRY_HOURS).contains(h))
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "JWT_EXPIRY_HOURS must be between 1 and {}",
                        MAX_JWT_EXPIRY_HOURS
                    )
                })?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", "20")
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            api_port: var_or("API_PORT", "3000")
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid u16"))?,
            rpc_url: var_or("BASE_SEPOLIA_RPC_URL", DEFAULT_RPC_URL),
            cin_token_address: var_or("CIN_TOKEN_ADDRESS", DEFAULT_CIN_TOKEN_ADDRESS),
            deployer_private_key: lookup("DEPLOYER_PRIVATE_KEY").filter(|k| !k.trim().is_empty()),
            faucet_mint_amount: var_or("FAUCET_MINT_AMOUNT", "30")
                .parse()
                .map_err(|_| anyhow::anyhow!("FAUCET_MINT_AMOUNT must be a valid u64"))?,
            faucet_cooldown_seconds: var_or("FAUCET_COOLDOWN_SECONDS", "86400")
                .parse()
                .map_err(|_| anyhow::anyhow!("FAUCET_COOLDOWN_SECONDS must be a valid u64"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/cin"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.jwt_expiry_hours, 24);
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.api_port, 3000);
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.cin_token_address, DEFAULT_CIN_TOKEN_ADDRESS);
        assert!(config.deployer_private_key.is_none());
        assert_eq!(config.faucet_mint_amount, 30);
        assert_eq!(config.faucet_cooldown_seconds, 86_400);
    }

    #[test]
    fn test_missing_database_url_is_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "secret")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_number_is_error() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/cin"),
            ("JWT_SECRET", "secret"),
            ("FAUCET_MINT_AMOUNT", "thirty"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_jwt_expiry_out_of_range_is_error() {
        for hours in ["0", "8761", "18446744073709551615"] {
            let result = AppConfig::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://localhost/cin"),
                ("JWT_SECRET", "secret"),
                ("JWT_EXPIRY_HOURS", hours),
            ]));
            assert!(result.is_err(), "{}", hours);
        }

        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/cin"),
            ("JWT_SECRET", "secret"),
            ("JWT_EXPIRY_HOURS", "8760"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_expiry_hours, MAX_JWT_EXPIRY_HOURS);
    }

    #[test]
    fn test_blank_private_key_treated_as_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/cin"),
            ("JWT_SECRET", "secret"),
            ("DEPLOYER_PRIVATE_KEY", "  "),
        ]))
        .unwrap();
        assert!(config.deployer_private_key.is_none());
    }
}
