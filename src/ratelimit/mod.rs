//! Rate limiting logic and state management.

mod cancel;
mod limiter;
mod window;

pub use cancel::Cancellation;
pub use limiter::{Decision, RateLimiter, WindowStatus};
pub use window::Window;
