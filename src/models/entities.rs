//! Directory entity projections
//!
//! Flat records over the JSON the query scripts emit. These are
//! ephemeral: reconstructed on every query, never cached, and carry no
//! consistency guarantee between calls (directory replication delay is
//! not accounted for).
//!
//! Every field is `#[serde(default)]`-tolerant because AD attributes are
//! routinely absent and PowerShell omits null properties from
//! `ConvertTo-Json` output depending on version.

use serde::{Deserialize, Serialize};

/// User account projection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdUser {
    pub name: String,
    #[serde(default)]
    pub sam_account_name: String,
    #[serde(default)]
    pub distinguished_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub locked_out: bool,
    #[serde(default)]
    pub member_of: Vec<String>,
    #[serde(default)]
    pub when_created: Option<String>,
    #[serde(default)]
    pub last_logon: Option<String>,
}

/// Computer account projection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdComputer {
    pub name: String,
    #[serde(default)]
    pub sam_account_name: String,
    #[serde(default)]
    pub distinguished_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dns_host_name: Option<String>,
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub when_created: Option<String>,
    #[serde(default)]
    pub last_logon: Option<String>,
}

/// Security/distribution group projection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdGroup {
    pub name: String,
    #[serde(default)]
    pub distinguished_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub member_count: u32,
}

/// A member of a group (user, computer, or nested group)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub name: String,
    #[serde(default)]
    pub sam_account_name: String,
    #[serde(default)]
    pub object_class: String,
}

/// Organizational unit projection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub name: String,
    #[serde(default)]
    pub distinguished_name: String,
}

/// Domain summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub name: String,
    #[serde(default)]
    pub dns_root: String,
    #[serde(default)]
    pub netbios_name: String,
    #[serde(default)]
    pub domain_mode: Option<String>,
    #[serde(default)]
    pub pdc_emulator: Option<String>,
}

/// Aggregate object counts, gathered by concurrent fan-out queries.
///
/// A failed branch contributes 0 rather than failing the aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCounts {
    pub users: u64,
    pub computers: u64,
    pub groups: u64,
}

/// Remote machine OS summary (Win32_OperatingSystem)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineSummary {
    pub hostname: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub build_number: String,
    #[serde(default)]
    pub last_boot: Option<String>,
    #[serde(default)]
    pub free_memory_mb: Option<f64>,
    #[serde(default)]
    pub total_memory_mb: Option<f64>,
}

/// Logical disk projection (Win32_LogicalDisk, fixed disks only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub drive: String,
    #[serde(default)]
    pub total_gb: f64,
    #[serde(default)]
    pub free_gb: f64,
}

/// Local user profile projection (Win32_UserProfile)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfileRecord {
    pub sid: String,
    #[serde(default)]
    pub local_path: String,
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub last_use_time: Option<String>,
}

/// Windows service projection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub startup_type: String,
}
