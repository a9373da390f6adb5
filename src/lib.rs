// Restline - a REST client helper for Rust
//
// Every call returns a response envelope instead of an error, with bounded
// retries, typed error payloads, redirect resolution and cookie persistence.

// Re-export the client
pub use restline_http_client::*;

/// Prelude for common imports.
///
/// ```
/// use restline::prelude::*;
/// ```
pub mod prelude {
    pub use restline_http_client::prelude::*;
}
