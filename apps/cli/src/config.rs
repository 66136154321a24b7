//! Client configuration: environment first, command line flags on top.

use spike_settings::ClientConfig;
use std::time::Duration;

/// Connection flags shared by every network command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConnectionArgs {
    /// Settings API base URL [env: SPIKE_API_URL]
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Dashboard login [env: SPIKE_LOGIN]
    #[arg(long, global = true)]
    pub login: Option<String>,

    /// HTTP timeout in seconds [env: SPIKE_HTTP_TIMEOUT_SECS]
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    /// Apply the flags that were given over `base`.
    pub fn apply(&self, mut base: ClientConfig) -> ClientConfig {
        if let Some(url) = &self.api_url {
            base = base.with_base_url(url.as_str());
        }
        if let Some(login) = &self.login {
            base = base.with_login(login.as_str());
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            base = base.with_timeout(Duration::from_secs(secs));
        }
        base
    }

    pub fn client_config(&self) -> ClientConfig {
        self.apply(ClientConfig::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_base() {
        let base = ClientConfig::default().with_login("from-env");
        let args = ConnectionArgs {
            api_url: Some("https://api.example.com/".to_string()),
            login: None,
            timeout: Some(0),
        };
        let config = args.apply(base.clone());
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.login.as_deref(), Some("from-env"));
        assert_eq!(config.timeout, base.timeout);

        let config = ConnectionArgs {
            login: Some("trader".to_string()),
            timeout: Some(30),
            ..Default::default()
        }
        .apply(base);
        assert_eq!(config.login.as_deref(), Some("trader"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
