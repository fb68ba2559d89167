//! Configuration types for the SOAP server.

use serde::{Deserialize, Serialize};

/// Main configuration for the SOAP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapServerConfig {
    /// Config version
    pub version: String,

    /// General settings
    pub settings: SettingsConfig,

    /// XXE prevention configuration
    pub xxe_prevention: XxePreventionConfig,

    /// WSDL generation settings
    pub wsdl: WsdlConfig,
}

impl Default for SoapServerConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: SettingsConfig::default(),
            xxe_prevention: XxePreventionConfig::default(),
            wsdl: WsdlConfig::default(),
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Host part of the target namespace (`http://<target_namespace>/`)
    pub target_namespace: String,

    /// Address to listen on
    pub listen: String,

    /// Maximum request body size to process (bytes)
    pub max_body_size: usize,

    /// Add debug headers (X-SOAP-*) to responses
    pub debug_headers: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            target_namespace: "server.soap.com".to_string(),
            listen: "127.0.0.1:1337".to_string(),
            max_body_size: 1_048_576, // 1MB
            debug_headers: false,
        }
    }
}

/// XXE (XML External Entity) prevention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XxePreventionConfig {
    /// Enable XXE prevention (should always be true)
    pub enabled: bool,

    /// Block DOCTYPE declarations
    pub block_doctype: bool,

    /// Block entity declarations
    pub block_external_entities: bool,
}

impl Default for XxePreventionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            block_doctype: true,
            block_external_entities: true,
        }
    }
}

/// WSDL generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WsdlConfig {
    /// Body namespace prefix; the service name is appended
    pub binding_namespace_prefix: String,
}

impl Default for WsdlConfig {
    fn default() -> Self {
        Self {
            binding_namespace_prefix: "urn:examples:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SoapServerConfig::default();
        assert_eq!(config.settings.target_namespace, "server.soap.com");
        assert_eq!(config.settings.listen, "127.0.0.1:1337");
        assert!(config.xxe_prevention.enabled);
        assert!(config.xxe_prevention.block_doctype);
        assert!(!config.settings.debug_headers);
    }

    #[test]
    fn test_config_serialization() {
        let config = SoapServerConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: SoapServerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.settings.max_body_size, config.settings.max_body_size);
        assert_eq!(parsed.wsdl.binding_namespace_prefix, "urn:examples:");
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
version: "1"
settings:
  target_namespace: KnockKnock.readify.net
  listen: "0.0.0.0:8080"
  debug_headers: true
xxe_prevention:
  block_doctype: false
wsdl:
  binding_namespace_prefix: "urn:acme:"
"#;
        let config: SoapServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.settings.target_namespace, "KnockKnock.readify.net");
        assert_eq!(config.settings.listen, "0.0.0.0:8080");
        assert_eq!(config.settings.max_body_size, 1_048_576);
        assert!(config.settings.debug_headers);
        assert!(config.xxe_prevention.enabled);
        assert!(!config.xxe_prevention.block_doctype);
        assert_eq!(config.wsdl.binding_namespace_prefix, "urn:acme:");
    }
}
