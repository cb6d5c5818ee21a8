//! Portal fetchers: the driver executable plus the shared retry wrapper.

mod common;
mod driver;

pub use common::{RetryPolicy, RetryingFetcher, DEFAULT_BACKOFF, DEFAULT_RETRIES};
pub use driver::{DriverFetcher, DRIVER_DATE_FORMAT};
