//! Authorization gateway for restricted channels
//!
//! `private-` and `presence-` channel subscriptions are validated against an
//! external HTTP endpoint, with results (positive and negative) cached under
//! `auth:{channel}:{member}` for a configurable TTL.

pub mod cache;
pub mod client;
pub mod error;
pub mod gateway;

pub use cache::{AuthCache, CacheEntry, MemoryCache};
pub use client::{AuthClient, AuthRequest, HttpAuthClient};
pub use error::AuthError;
pub use gateway::{AuthGateway, DEFAULT_CACHE_EXPIRES};
