//! HTTP API for Crypto Investment Note.
//!
//! Endpoints:
//! - POST /api/auth/wallet-login: Register or look up a wallet
//! - POST /api/auth/siwe: Sign-In with Ethereum, returns a JWT
//! - POST /api/auth/api-keys: Generate API key
//! - CRUD /api/notes: Own notes with embedded trade logs
//! - GET  /api/community/notes: Public note feed
//! - GET  /api/portfolio/*: Analytics over the caller's trades
//! - POST /api/faucet/mint: CIN token faucet

pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;
