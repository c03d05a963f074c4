//! Maps a local port to the URL a browser-side frame should load.

use crate::LOCALHOST_BASE_URL;
use crate::config::{EnvironmentConfig, EnvironmentMode};
use crate::error::server::ServerError;

use url::Url;

/// Placeholder substituted in proxy URL templates.
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Turns a bound loopback port into a URL reachable from the user's browser.
pub trait UrlResolver: Send + Sync {
    /// Base URL of the server, without a trailing slash.
    fn resolve(&self, port: u16) -> Result<String, ServerError>;

    /// URL of the served path, e.g. `http://localhost:18000/`.
    fn frame_url(&self, port: u16, served_path: &str) -> Result<String, ServerError> {
        let base = self.resolve(port)?;
        Ok(format!("{base}{served_path}"))
    }
}

/// The browser runs on the same machine: `http://localhost:<port>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResolver;

impl UrlResolver for LocalResolver {
    fn resolve(&self, port: u16) -> Result<String, ServerError> {
        Ok(format!("{LOCALHOST_BASE_URL}:{port}"))
    }
}

/// Hosted notebooks expose local ports through a proxy whose URL embeds the port.
#[derive(Debug, Clone)]
pub struct ProxyResolver {
    template: String,
}

impl ProxyResolver {
    /// `template` must contain `{port}` and yield an absolute http(s) URL.
    #[track_caller]
    pub fn new(template: impl Into<String>) -> Result<Self, ServerError> {
        let template = template.into();
        if !template.contains(PORT_PLACEHOLDER) {
            return Err(ServerError::invalid_options(format!(
                "proxy URL template '{template}' has no {PORT_PLACEHOLDER} placeholder"
            )));
        }

        let probe = template.replace(PORT_PLACEHOLDER, "1");
        let parsed = Url::parse(&probe).map_err(|e| {
            ServerError::invalid_options(format!("proxy URL template '{template}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ServerError::invalid_options(format!(
                "proxy URL template '{template}' must be http or https"
            )));
        }

        Ok(Self { template })
    }
}

impl UrlResolver for ProxyResolver {
    fn resolve(&self, port: u16) -> Result<String, ServerError> {
        let url = self.template.replace(PORT_PLACEHOLDER, &port.to_string());
        Ok(url.trim_end_matches('/').to_string())
    }
}

/// Pick the resolver for the configured environment.
pub fn for_environment(config: &EnvironmentConfig) -> Result<Box<dyn UrlResolver>, ServerError> {
    match config.mode {
        EnvironmentMode::Local => Ok(Box::new(LocalResolver)),
        EnvironmentMode::Hosted => {
            let template = config.proxy_url_template.as_deref().ok_or_else(|| {
                ServerError::invalid_options("hosted environment needs proxy_url_template")
            })?;
            Ok(Box::new(ProxyResolver::new(template)?))
        }
    }
}
