use hostmon_reverse::ReverseConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Address the local metric endpoint binds to.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Directory scanned for executable metric plugins.
    pub plugin_dir: Option<PathBuf>,
    #[serde(default)]
    pub reverse: ReverseSection,
}

#[derive(Debug, Deserialize)]
pub struct ReverseSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub check_id: String,
    #[serde(default)]
    pub broker_url: String,
    pub broker_ca_file: Option<PathBuf>,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    pub secret: Option<String>,
    /// Consecutive connection failures before the agent gives up;
    /// 0 retries forever.
    #[serde(default = "default_max_conn_retry")]
    pub max_conn_retry: u32,
}

impl Default for ReverseSection {
    fn default() -> Self {
        Self {
            enabled: false,
            check_id: String::new(),
            broker_url: String::new(),
            broker_ca_file: None,
            ssl_verify: default_ssl_verify(),
            secret: None,
            max_conn_retry: default_max_conn_retry(),
        }
    }
}

fn default_listen_address() -> String {
    "127.0.0.1:2609".to_string()
}

fn default_ssl_verify() -> bool {
    true
}

fn default_max_conn_retry() -> u32 {
    10
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// The configuration surface the reverse client consumes.
    pub fn reverse_config(&self) -> ReverseConfig {
        ReverseConfig {
            enabled: self.reverse.enabled,
            check_id: self.reverse.check_id.clone(),
            broker_url: self.reverse.broker_url.clone(),
            broker_ca_file: self.reverse.broker_ca_file.clone(),
            ssl_verify: self.reverse.ssl_verify,
            listen_address: self.listen_address.clone(),
            max_conn_retry: self.reverse.max_conn_retry,
            secret: self.reverse.secret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:2609");
        assert!(config.plugin_dir.is_none());
        assert!(!config.reverse.enabled);
        assert!(config.reverse.ssl_verify);
        assert_eq!(config.reverse.max_conn_retry, 10);
    }

    #[test]
    fn reverse_section_maps_onto_the_client_config() {
        let config: AgentConfig = toml::from_str(
            r#"
            listen_address = "0.0.0.0:2609"

            [reverse]
            enabled = true
            check_id = "c_42"
            broker_url = "mtev_reverse://broker.example.net:43191"
            ssl_verify = false
            secret = "hush"
            max_conn_retry = 0
            "#,
        )
        .unwrap();

        let reverse = config.reverse_config();
        assert!(reverse.enabled);
        assert_eq!(reverse.check_id, "c_42");
        assert_eq!(reverse.listen_address, "0.0.0.0:2609");
        assert!(!reverse.ssl_verify);
        assert_eq!(reverse.secret.as_deref(), Some("hush"));
        assert_eq!(reverse.max_conn_retry, 0);
    }
}
