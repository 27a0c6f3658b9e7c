pub mod clock;
pub mod device;
pub mod ratelimiter;
pub mod validate;
