//! Core types for sequencer state and cluster membership

use serde::{Deserialize, Serialize};
use std::fmt;

/// A live boolean that may not have been fetched successfully.
///
/// Anything populated by a remote call starts out `Unknown` and stays that way
/// when the call fails; it is never coerced to `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveFlag {
    #[default]
    Unknown,
    True,
    False,
}

impl LiveFlag {
    pub fn is_true(self) -> bool {
        self == LiveFlag::True
    }

    pub fn is_known(self) -> bool {
        self != LiveFlag::Unknown
    }

    /// `None` when unknown
    pub fn as_bool(self) -> Option<bool> {
        match self {
            LiveFlag::Unknown => None,
            LiveFlag::True => Some(true),
            LiveFlag::False => Some(false),
        }
    }
}

impl From<bool> for LiveFlag {
    fn from(value: bool) -> Self {
        if value {
            LiveFlag::True
        } else {
            LiveFlag::False
        }
    }
}

impl From<Option<bool>> for LiveFlag {
    fn from(value: Option<bool>) -> Self {
        value.map(LiveFlag::from).unwrap_or_default()
    }
}

impl fmt::Display for LiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveFlag::Unknown => f.write_str("?"),
            LiveFlag::True => f.write_str("true"),
            LiveFlag::False => f.write_str("false"),
        }
    }
}

/// Raft membership role, encoded on the wire as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Suffrage {
    Voter,
    Nonvoter,
    /// Any other value the consensus library reports (e.g. staging)
    Unrecognized(u8),
}

impl Suffrage {
    /// Role a sequencer should hold given its declared voting intent
    pub fn for_voting(voting: bool) -> Self {
        if voting {
            Suffrage::Voter
        } else {
            Suffrage::Nonvoter
        }
    }
}

impl From<u8> for Suffrage {
    fn from(value: u8) -> Self {
        match value {
            0 => Suffrage::Voter,
            1 => Suffrage::Nonvoter,
            other => Suffrage::Unrecognized(other),
        }
    }
}

impl From<Suffrage> for u8 {
    fn from(value: Suffrage) -> Self {
        match value {
            Suffrage::Voter => 0,
            Suffrage::Nonvoter => 1,
            Suffrage::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for Suffrage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suffrage::Voter => f.write_str("voter"),
            Suffrage::Nonvoter => f.write_str("non-voter"),
            Suffrage::Unrecognized(code) => write!(f, "suffrage({})", code),
        }
    }
}

/// One server entry in the leader's membership listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Raft server ID (the sequencer ID)
    pub id: String,
    /// Raft address
    #[serde(default)]
    pub addr: String,
    pub suffrage: Suffrage,
}

/// Cluster membership as reported by the current leader
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterMembership {
    pub servers: Vec<ClusterMember>,
    /// Configuration index; 0 when the conductor does not report one
    pub version: u64,
}

impl ClusterMembership {
    pub fn get(&self, id: &str) -> Option<&ClusterMember> {
        self.servers.iter().find(|server| server.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

/// Wire shapes of `conductor_clusterMembership`: newer conductors wrap the
/// server list with a version, older ones return the bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum MembershipWire {
    Versioned {
        servers: Vec<ClusterMember>,
        #[serde(default)]
        version: u64,
    },
    Bare(Vec<ClusterMember>),
}

impl<'de> Deserialize<'de> for ClusterMembership {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match MembershipWire::deserialize(deserializer)? {
            MembershipWire::Versioned { servers, version } => Self { servers, version },
            MembershipWire::Bare(servers) => Self {
                servers,
                version: 0,
            },
        })
    }
}

/// Latest unsafe L2 block reported by a sequencer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsafeHead {
    pub number: u64,
    pub hash: String,
}

/// The subset of `optimism_syncStatus` this tool reads
#[derive(Debug, Clone, Deserialize)]
pub struct SyncStatus {
    pub unsafe_l2: UnsafeHead,
}
