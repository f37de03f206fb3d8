//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// Rate limiter keyed by user, so one noisy client only throttles itself
pub type UserLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

/// Create a per-user rate limiter with the specified requests per second
pub fn create_user_limiter(requests_per_second: u32) -> Arc<UserLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_burst_then_limits() {
        let limiter = create_user_limiter(3);
        let user = Uuid::new_v4();
        assert!((0..3).all(|_| limiter.check_key(&user).is_ok()));
        assert!(limiter.check_key(&user).is_err());
    }

    #[test]
    fn users_have_separate_budgets() {
        let limiter = create_user_limiter(1);
        let (noisy, quiet) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(limiter.check_key(&noisy).is_ok());
        assert!(limiter.check_key(&noisy).is_err());
        assert!(limiter.check_key(&quiet).is_ok());
    }

    #[test]
    fn zero_is_clamped_to_one() {
        let limiter = create_user_limiter(0);
        let user = Uuid::new_v4();
        assert!(limiter.check_key(&user).is_ok());
        assert!(limiter.check_key(&user).is_err());
    }
}
