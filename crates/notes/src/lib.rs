//! Note, trade and user services plus the read-side views built on them:
//! the community feed and portfolio aggregation.

pub mod feed;
pub mod filter;
pub mod notes;
pub mod portfolio;
pub mod users;
