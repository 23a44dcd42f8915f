//! Operator configuration.
//!
//! Built-in plugins take their tunables from here, and extra data-driven
//! operators can be declared under `[[custom]]`. Every section is optional;
//! missing keys take the defaults below.
//!
//! ```toml
//! [lvm]
//! minimum_openshift_version = "4.12.0"
//!
//! [mce.requirements]
//! cpu_cores = 4
//! ram_mib = 16384
//!
//! [[custom]]
//! name = "storage-dashboard"
//! dependencies = ["lvm"]
//! worker = { cpu_cores = 1, ram_mib = 256 }
//! ```

use crate::core::error::ConfigError;
use crate::core::plugin::StaticPlugin;
use crate::core::types::Quantitative;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "OPERATOR_REGISTRY_CONFIG";

/// Configuration for all operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorsConfig {
    pub node_feature_discovery: NodeFeatureDiscoveryConfig,
    pub nvidia_gpu: NvidiaGpuConfig,
    pub lvm: LvmConfig,
    pub mce: MceConfig,
    /// Additional operators defined purely by data.
    pub custom: Vec<CustomOperatorConfig>,
}

impl OperatorsConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load the file named by `OPERATOR_REGISTRY_CONFIG`, or the defaults
    /// when the variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                log::debug!("Loading operator configuration from {:?}", path);
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFeatureDiscoveryConfig {
    pub enabled: bool,
}

impl Default for NodeFeatureDiscoveryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NvidiaGpuConfig {
    pub enabled: bool,
    /// Install timeout.
    pub timeout_seconds: u64,
}

impl Default for NvidiaGpuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LvmConfig {
    pub enabled: bool,
    /// Oldest OpenShift release LVM storage supports.
    pub minimum_openshift_version: String,
    /// Whether every host needs a disk besides the installation disk.
    pub require_additional_disk: bool,
    pub master: Quantitative,
    pub worker: Quantitative,
}

impl Default for LvmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_openshift_version: "4.11.0".to_string(),
            require_additional_disk: true,
            master: Quantitative::new(1, 400, 0),
            worker: Quantitative::new(1, 400, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MceConfig {
    pub enabled: bool,
    pub minimum_openshift_version: String,
    /// Per-host demand on multi-node clusters.
    pub requirements: Quantitative,
    /// Per-host demand on single node clusters.
    pub single_node_requirements: Quantitative,
}

impl Default for MceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_openshift_version: "4.10.0".to_string(),
            requirements: Quantitative::new(4, 16384, 0),
            single_node_requirements: Quantitative::new(8, 32768, 0),
        }
    }
}

/// A data-driven operator declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOperatorConfig {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub master: Quantitative,
    #[serde(default)]
    pub worker: Quantitative,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl CustomOperatorConfig {
    /// Build the plugin this entry describes.
    pub fn to_plugin(&self) -> StaticPlugin {
        let mut builder = StaticPlugin::builder(self.name.clone())
            .dependencies(self.dependencies.iter().cloned())
            .master(self.master.clone())
            .worker(self.worker.clone());

        if let Some(full_name) = &self.full_name {
            builder = builder.full_name(full_name.clone());
        }
        if let Some(namespace) = &self.namespace {
            builder = builder.namespace(namespace.clone());
        }
        if let Some(timeout) = self.timeout_seconds {
            builder = builder.timeout_seconds(timeout);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plugin::OperatorPlugin;
    use crate::core::types::Cluster;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = OperatorsConfig::from_toml_str("").unwrap();
        assert_eq!(config, OperatorsConfig::default());
        assert!(config.lvm.enabled);
        assert_eq!(config.mce.requirements.cpu_cores, 4);
    }

    #[test]
    fn test_partial_sections() {
        let config = OperatorsConfig::from_toml_str(
            r#"
            [lvm]
            minimum_openshift_version = "4.12.0"

            [lvm.worker]
            cpu_cores = 2

            [nvidia_gpu]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.lvm.minimum_openshift_version, "4.12.0");
        assert_eq!(config.lvm.worker, Quantitative::new(2, 0, 0));
        assert_eq!(config.lvm.master, Quantitative::new(1, 400, 0));
        assert!(!config.nvidia_gpu.enabled);
        assert!(config.mce.enabled);
    }

    #[test]
    fn test_custom_operator() {
        let config = OperatorsConfig::from_toml_str(
            r#"
            [[custom]]
            name = "storage-dashboard"
            full_name = "Storage Dashboard"
            dependencies = ["lvm"]
            worker = { cpu_cores = 1, ram_mib = 256 }
            "#,
        )
        .unwrap();

        let plugin = config.custom[0].to_plugin();
        let cluster = Cluster::new("test", "4.15");
        assert_eq!(plugin.name(), "storage-dashboard");
        assert_eq!(plugin.full_name(), "Storage Dashboard");
        assert_eq!(plugin.dependencies(&cluster).unwrap(), vec!["lvm"]);
        assert_eq!(plugin.node_requirements(&cluster).unwrap().worker.ram_mib, 256);
    }

    #[test]
    fn test_invalid_document() {
        let error = OperatorsConfig::from_toml_str("[lvm]\nenabled = \"yes\"").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mce]\nenabled = false").unwrap();

        let config = OperatorsConfig::from_file(file.path()).unwrap();
        assert!(!config.mce.enabled);

        let missing = OperatorsConfig::from_file("/nonexistent/operators.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
