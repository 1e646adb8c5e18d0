//! Provider logout redirect.

use crate::config::OidcConfig;
use crate::error::OidcResult;
use url::Url;

/// Provider logout URL returning the browser to the configured landing page.
///
/// Clearing the local session is the caller's job.
pub fn build_logout_url(config: &OidcConfig) -> OidcResult<String> {
    let mut url = Url::parse(&config.logout_endpoint())?;
    url.query_pairs_mut()
        .append_pair("post_logout_redirect_uri", &config.logout_uri);
    Ok(url.to_string())
}
