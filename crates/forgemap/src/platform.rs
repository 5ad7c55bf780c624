//! Provider-agnostic capability interface for hosting provider adapters.
//!
//! Each provider exposes its repositories under a different container
//! hierarchy. The [`ProviderAdapter`] trait hides the traversal shape behind
//! one capability set, and [`create_adapter`] selects the implementation from
//! the closed [`Provider`] enumeration.
//!
//! # Example
//!
//! ```ignore
//! use forgemap::platform::{Credentials, ProviderEndpoint, Throttle, create_adapter};
//! use forgemap::Provider;
//!
//! let adapter = create_adapter(Provider::GitHub, Credentials::token(token), &ProviderEndpoint::default())?;
//! let throttle = Throttle::fixed_delay(adapter.request_delay(), Default::default());
//! for raw in adapter.list_repositories("myorg", &throttle).await? {
//!     println!("{}", raw.normalize()?.full_name());
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::bitbucket::BitbucketAdapter;
use crate::entity::provider::Provider;
use crate::github::GitHubAdapter;
use crate::gitlab::GitLabAdapter;
use crate::http::HttpTransport;
use crate::http::reqwest_transport::ReqwestTransport;

mod convert;
mod errors;
mod fetch;
mod pacing;
mod types;

pub use convert::languages_to_json;
pub use errors::{PlatformError, Result, short_error_message};
pub use fetch::{JsonResponse, fetch_json};
pub use pacing::{FixedDelayPacer, NoopPacer, Pacer, Throttle, request_delays};
pub use types::{CanonicalRepo, Credentials, Languages, ProviderAdapter, ProviderEndpoint, RawRepo};

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User-Agent sent with every provider request.
pub const USER_AGENT: &str = concat!("forgemap/", env!("CARGO_PKG_VERSION"));

/// Build the adapter for `provider` over a real HTTP transport.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn create_adapter(
    provider: Provider,
    credentials: Credentials,
    endpoint: &ProviderEndpoint,
) -> Result<Arc<dyn ProviderAdapter>> {
    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::with_timeout(endpoint.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .map_err(|e| PlatformError::internal(e.to_string()))?,
    );
    Ok(create_adapter_with_transport(
        provider,
        credentials,
        endpoint,
        transport,
    ))
}

/// Build the adapter for `provider` over the given transport.
pub fn create_adapter_with_transport(
    provider: Provider,
    credentials: Credentials,
    endpoint: &ProviderEndpoint,
    transport: Arc<dyn HttpTransport>,
) -> Arc<dyn ProviderAdapter> {
    let delay = endpoint
        .request_delay
        .unwrap_or_else(|| request_delays::default_for(provider));
    let base_url = endpoint.base_url.as_deref();

    match provider {
        Provider::GitHub => Arc::new(GitHubAdapter::new_with_transport(
            transport,
            base_url,
            credentials,
            delay,
        )),
        Provider::GitLab => Arc::new(GitLabAdapter::new_with_transport(
            transport,
            base_url,
            credentials,
            delay,
        )),
        Provider::Bitbucket => Arc::new(BitbucketAdapter::new_with_transport(
            transport,
            base_url,
            credentials,
            delay,
        )),
    }
}
