// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! BGP community values, standard (`ASN:VALUE`) and large (`large:A:B:C`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommunityError {
    #[error("invalid community format: {0}")]
    InvalidFormat(String),
    #[error("invalid community member {member} in {community}")]
    InvalidMember { community: String, member: String },
}

/// A BGP community attached to advertised prefixes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Community {
    /// Standard two-part community, `ASN:VALUE`.
    Standard { asn: u16, value: u16 },
    /// Large three-part community, authored as `large:A:B:C`.
    Large { global: u32, local1: u32, local2: u32 },
}

// Communities sort lexicographically by their rendered form. Standard and
// large communities never render equal (two vs three members), so this
// stays consistent with the derived equality.
impl Ord for Community {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for Community {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Community {
    #[must_use]
    pub fn is_large(&self) -> bool {
        matches!(self, Community::Large { .. })
    }
}

impl FromStr for Community {
    type Err = CommunityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("large:") {
            let parts: Vec<&str> = rest.split(':').collect();
            if parts.len() != 3 {
                return Err(CommunityError::InvalidFormat(s.to_string()));
            }
            let member = |p: &str| {
                p.parse::<u32>().map_err(|_| CommunityError::InvalidMember {
                    community: s.to_string(),
                    member: p.to_string(),
                })
            };
            return Ok(Community::Large {
                global: member(parts[0])?,
                local1: member(parts[1])?,
                local2: member(parts[2])?,
            });
        }

        let Some((asn, value)) = s.split_once(':') else {
            return Err(CommunityError::InvalidFormat(s.to_string()));
        };
        let member = |p: &str| {
            p.parse::<u16>().map_err(|_| CommunityError::InvalidMember {
                community: s.to_string(),
                member: p.to_string(),
            })
        };
        Ok(Community::Standard {
            asn: member(asn)?,
            value: member(value)?,
        })
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Community::Standard { asn, value } => write!(f, "{asn}:{value}"),
            Community::Large {
                global,
                local1,
                local2,
            } => write!(f, "{global}:{local1}:{local2}"),
        }
    }
}
