//! Faucet cooldown: Redis-backed per-address timers.
//!
//! Once an address has been funded it cannot request again until its key
//! expires. Uses Redis `SET NX EX` for an atomic check-and-set with TTL expiry.

use alloy::primitives::Address;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Default cooldown duration in seconds (24 hours).
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 86_400;

#[derive(Debug, Clone, Copy)]
pub struct FaucetCooldown {
    seconds: u64,
}

impl FaucetCooldown {
    pub fn new(seconds: u64) -> Self {
        Self { seconds }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Claim the cooldown slot for `address`.
    ///
    /// Returns `true` if the address was free (request may proceed) and
    /// `false` if it is still cooling down. A zero duration disables the check.
    pub async fn try_acquire(
        &self,
        redis: &mut ConnectionManager,
        address: Address,
    ) -> redis::RedisResult<bool> {
        if self.seconds == 0 {
            return Ok(true);
        }

        // Some("OK") if the key was set, None if it already exists
        let result: Option<String> = redis::cmd("SET")
            .arg(Self::key(address))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.seconds)
            .query_async(redis)
            .await?;

        let allowed = result.is_some();
        if !allowed {
            tracing::debug!(
                %address,
                cooldown_secs = self.seconds,
                "Faucet request suppressed, address in cooldown"
            );
        }

        Ok(allowed)
    }

    /// Seconds left before `address` may request again (0 if free).
    pub async fn remaining(
        &self,
        redis: &mut ConnectionManager,
        address: Address,
    ) -> redis::RedisResult<u64> {
        let ttl: i64 = redis.ttl(Self::key(address)).await?;
        Ok(ttl.max(0) as u64)
    }

    /// Release the cooldown for `address`, e.g. after a failed mint.
    pub async fn clear(
        &self,
        redis: &mut ConnectionManager,
        address: Address,
    ) -> redis::RedisResult<()> {
        redis.del::<_, ()>(Self::key(address)).await?;
        Ok(())
    }

    fn key(address: Address) -> String {
        format!("faucet:cooldown:{:#x}", address)
    }
}

impl Default for FaucetCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_SECONDS)
    }
}
