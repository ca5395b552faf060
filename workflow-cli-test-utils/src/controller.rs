//! Workflow controller endpoint resolution

use crate::ConfigError;

pub const HOST_VAR: &str = "DEIS_WORKFLOW_SERVICE_HOST";
pub const PORT_VAR: &str = "DEIS_WORKFLOW_SERVICE_PORT";

/// Base URL of the controller under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    url: String,
}

impl Controller {
    /// Resolve from the values of [`HOST_VAR`] and [`PORT_VAR`].
    ///
    /// Port `443` selects https, no port or `80` plain http, anything else
    /// is appended to an http URL.
    pub fn resolve(host: Option<&str>, port: Option<&str>) -> Result<Self, ConfigError> {
        let host = host
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHost { var: HOST_VAR })?;

        let url = match port.unwrap_or_default() {
            "443" => format!("https://{host}"),
            "80" | "" => format!("http://{host}"),
            port => format!("http://{host}:{port}"),
        };

        tracing::debug!(%url, "resolved controller endpoint");
        Ok(Self { url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}
