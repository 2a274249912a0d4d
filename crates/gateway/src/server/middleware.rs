//! Limits applied to every route by the router's middleware stack.

use std::time::Duration;

/// Per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request body limit used when none is configured.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
