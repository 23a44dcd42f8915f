//! Value types shared by plugins, the registry and its consumers.
//!
//! Inbound snapshots (`Cluster`, `Host`) are read-only inputs handed in by
//! the installer. Requirement types (`Quantitative` and friends) are produced
//! by plugins and merged by the aggregator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};
use uuid::Uuid;

// ============================================================================
// Inbound snapshots
// ============================================================================

/// Role a host plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostRole {
    /// Control plane host.
    Master,
    /// Compute host.
    Worker,
    /// Role not decided yet; treated as a worker for requirement purposes.
    #[default]
    AutoAssign,
}

impl fmt::Display for HostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRole::Master => write!(f, "master"),
            HostRole::Worker => write!(f, "worker"),
            HostRole::AutoAssign => write!(f, "auto-assign"),
        }
    }
}

/// Control plane topology of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HighAvailabilityMode {
    /// Three or more control plane hosts.
    #[default]
    Full,
    /// Single node cluster.
    None,
}

/// A disk reported by host discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Device name (e.g. "sda").
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Whether this disk is the installation target.
    #[serde(default)]
    pub bootable: bool,
}

/// A GPU reported by host discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gpu {
    /// Vendor name as reported by the host.
    pub vendor: String,
    /// PCI vendor id (e.g. "10de" for NVIDIA).
    pub vendor_id: String,
    /// PCI device id.
    #[serde(default)]
    pub device_id: String,
}

/// Hardware inventory of a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub cpu_cores: u32,
    pub ram_mib: u64,
    #[serde(default)]
    pub disks: Vec<Disk>,
    #[serde(default)]
    pub gpus: Vec<Gpu>,
}

impl Inventory {
    /// Disks other than the installation disk.
    pub fn additional_disks(&self) -> impl Iterator<Item = &Disk> {
        self.disks.iter().filter(|d| !d.bootable)
    }
}

/// Snapshot of a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub role: HostRole,
    /// `None` until the host has reported its hardware.
    #[serde(default)]
    pub inventory: Option<Inventory>,
}

impl Host {
    /// Create a host with a random ID.
    pub fn new(hostname: impl Into<String>, role: HostRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            hostname: hostname.into(),
            role,
            inventory: None,
        }
    }

    /// Attach an inventory.
    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }
}

/// Snapshot of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub openshift_version: String,
    #[serde(default)]
    pub high_availability_mode: HighAvailabilityMode,
    /// Operators the user asked for.
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

impl Cluster {
    /// Create a cluster with a random ID.
    pub fn new(name: impl Into<String>, openshift_version: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            openshift_version: openshift_version.into(),
            high_availability_mode: HighAvailabilityMode::Full,
            operators: Vec::new(),
            hosts: Vec::new(),
        }
    }

    /// Request an operator.
    pub fn with_operator(mut self, name: impl Into<String>) -> Self {
        self.operators.push(name.into());
        self
    }

    /// Add a host.
    pub fn with_host(mut self, host: Host) -> Self {
        self.hosts.push(host);
        self
    }

    /// Set the availability mode.
    pub fn with_high_availability_mode(mut self, mode: HighAvailabilityMode) -> Self {
        self.high_availability_mode = mode;
        self
    }

    pub fn is_single_node(&self) -> bool {
        self.high_availability_mode == HighAvailabilityMode::None
    }

    /// Parse `openshift_version` leniently ("4.12" is read as "4.12.0").
    pub fn parsed_openshift_version(&self) -> Result<semver::Version, semver::Error> {
        let raw = self.openshift_version.trim().trim_start_matches('v');
        let core = raw.split(['-', '+']).next().unwrap_or(raw);
        let padded = match core.matches('.').count() {
            0 => format!("{}.0.0", core),
            1 => format!("{}.0", core),
            _ => core.to_string(),
        };
        semver::Version::parse(&padded)
    }
}

// ============================================================================
// Requirements
// ============================================================================

/// Numeric resource demand for one host class.
///
/// Every field merges by summation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quantitative {
    pub cpu_cores: u32,
    pub ram_mib: u64,
    pub disk_size_gb: u64,
    /// Named extra resources (e.g. "gpus").
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, u64>,
}

impl Quantitative {
    pub fn new(cpu_cores: u32, ram_mib: u64, disk_size_gb: u64) -> Self {
        Self {
            cpu_cores,
            ram_mib,
            disk_size_gb,
            custom: BTreeMap::new(),
        }
    }

    /// Add a named custom resource.
    pub fn with_custom(mut self, name: impl Into<String>, amount: u64) -> Self {
        *self.custom.entry(name.into()).or_insert(0) += amount;
        self
    }

    /// True when nothing is demanded.
    pub fn is_zero(&self) -> bool {
        self.cpu_cores == 0
            && self.ram_mib == 0
            && self.disk_size_gb == 0
            && self.custom.values().all(|&v| v == 0)
    }
}

impl AddAssign<&Quantitative> for Quantitative {
    fn add_assign(&mut self, other: &Quantitative) {
        self.cpu_cores = self.cpu_cores.saturating_add(other.cpu_cores);
        self.ram_mib = self.ram_mib.saturating_add(other.ram_mib);
        self.disk_size_gb = self.disk_size_gb.saturating_add(other.disk_size_gb);
        for (name, amount) in &other.custom {
            let entry = self.custom.entry(name.clone()).or_insert(0);
            *entry = entry.saturating_add(*amount);
        }
    }
}

impl Add<&Quantitative> for Quantitative {
    type Output = Quantitative;

    fn add(mut self, other: &Quantitative) -> Quantitative {
        self += other;
        self
    }
}

impl fmt::Display for Quantitative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cores, {} MiB RAM, {} GB disk",
            self.cpu_cores, self.ram_mib, self.disk_size_gb
        )?;
        for (name, amount) in &self.custom {
            write!(f, ", {} {}", amount, name)?;
        }
        Ok(())
    }
}

/// Requirements split by host class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTypeRequirements {
    pub master: Quantitative,
    pub worker: Quantitative,
}

impl HostTypeRequirements {
    /// Same demand on masters and workers.
    pub fn uniform(quantitative: Quantitative) -> Self {
        Self {
            master: quantitative.clone(),
            worker: quantitative,
        }
    }

    /// Pick the class matching a host role. Undecided hosts count as workers.
    pub fn for_role(&self, role: HostRole) -> &Quantitative {
        match role {
            HostRole::Master => &self.master,
            HostRole::Worker | HostRole::AutoAssign => &self.worker,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.master.is_zero() && self.worker.is_zero()
    }
}

impl AddAssign<&HostTypeRequirements> for HostTypeRequirements {
    fn add_assign(&mut self, other: &HostTypeRequirements) {
        self.master += &other.master;
        self.worker += &other.worker;
    }
}

/// Hardware requirements of one operator, as computed before hosts are
/// inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareRequirements {
    pub operator_name: String,
    /// Operators this one depends on, embedded so the record is
    /// self-describing.
    pub dependencies: Vec<String>,
    pub requirements: HostTypeRequirements,
}

// ============================================================================
// Operator metadata
// ============================================================================

/// How an operator gets installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorType {
    /// Installed through an OLM subscription.
    Olm,
    /// Part of the base platform.
    Builtin,
}

/// Identity record describing how to install and monitor an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    pub name: String,
    pub display_name: String,
    pub namespace: String,
    pub operator_type: OperatorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
    pub timeout_seconds: u64,
}

impl OperatorDescriptor {
    /// Descriptor for an OLM-installed operator.
    pub fn olm(
        name: impl Into<String>,
        display_name: impl Into<String>,
        namespace: impl Into<String>,
        subscription_name: impl Into<String>,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            namespace: namespace.into(),
            operator_type: OperatorType::Olm,
            subscription_name: Some(subscription_name.into()),
            timeout_seconds,
        }
    }
}

/// A configurable property an operator exposes to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorProperty {
    pub name: String,
    pub data_type: String,
    pub mandatory: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Identifier of the feature-support entry that gates an operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureSupportId {
    NodeFeatureDiscovery,
    NvidiaGpu,
    Lvm,
    Mce,
    Custom(String),
}

impl fmt::Display for FeatureSupportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSupportId::NodeFeatureDiscovery => write!(f, "NODE_FEATURE_DISCOVERY"),
            FeatureSupportId::NvidiaGpu => write!(f, "NVIDIA_GPU"),
            FeatureSupportId::Lvm => write!(f, "LVM"),
            FeatureSupportId::Mce => write!(f, "MCE"),
            FeatureSupportId::Custom(name) => write!(f, "{}", name.to_uppercase()),
        }
    }
}
