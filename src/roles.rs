//! Role identities and bus topic naming
//!
//! The four specialist roles are fixed for the life of the process. Each
//! role owns a well-known task topic (orchestrator-originated work) and a
//! request topic (peer-originated collaboration).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four fixed specialist roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleId {
    Ceo,
    Cto,
    Cmo,
    Cfo,
}

impl RoleId {
    /// All known roles, in fan-out order
    pub const ALL: [RoleId; 4] = [RoleId::Ceo, RoleId::Cto, RoleId::Cmo, RoleId::Cfo];

    /// Lowercase wire name (`ceo`, `cto`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleId::Ceo => "ceo",
            RoleId::Cto => "cto",
            RoleId::Cmo => "cmo",
            RoleId::Cfo => "cfo",
        }
    }

    /// Uppercase display name used in prompt text (`CEO's response: ...`)
    pub fn display_name(&self) -> &'static str {
        match self {
            RoleId::Ceo => "CEO",
            RoleId::Cto => "CTO",
            RoleId::Cmo => "CMO",
            RoleId::Cfo => "CFO",
        }
    }

    /// Topic carrying orchestrator-originated tasks for this role
    pub fn task_topic(&self) -> String {
        format!("agent.{}.task", self.as_str())
    }

    /// Topic carrying peer collaboration requests for this role
    pub fn request_topic(&self) -> String {
        format!("agent.{}.request", self.as_str())
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ceo" => Ok(RoleId::Ceo),
            "cto" => Ok(RoleId::Cto),
            "cmo" => Ok(RoleId::Cmo),
            "cfo" => Ok(RoleId::Cfo),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}
