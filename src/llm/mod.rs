// Generation service integration
//
// The language-model service is consumed through the `Generator` trait so
// agents can run against the HTTP client or an in-process stand-in.

pub mod client;
pub mod errors;
pub mod rate_limiter;

pub use client::{Generation, GenerationRequest, Generator, OpenRouterClient};
pub use errors::GenerationError;
pub use rate_limiter::RateLimiter;
