//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Each save costs two Sheets write requests (clear + update) against a
/// quota of 60 writes per minute per user.
pub const DEFAULT_MUTATIONS_PER_MINUTE: u32 = 30;

/// Create a limiter allowing `per_minute` requests, bursting up to the same
pub fn create_limiter(per_minute: u32) -> Arc<Limiter> {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}
