//! Sender key identity: one (group, sender, device) triple.

use std::{fmt, str::FromStr};

use crate::error::GroupError;

/// Delimiter of the canonical string form.
const DELIMITER: &str = "::";

/// Identifies one sender chain: a device of a sender within a group.
///
/// The canonical string form `groupId::senderId::deviceId` is the storage key
/// and the job queue bucket. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenderKeyIdentity {
    group_id: String,
    sender_id: String,
    device_id: u32,
}

impl SenderKeyIdentity {
    /// Create an identity.
    pub fn new(group_id: impl Into<String>, sender_id: impl Into<String>, device_id: u32) -> Self {
        Self { group_id: group_id.into(), sender_id: sender_id.into(), device_id }
    }

    /// Group the sender key belongs to.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Sending member.
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Device of the sending member.
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Canonical `groupId::senderId::deviceId` string.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// 31-multiplier string hash of the canonical form over UTF-16 code
    /// units, wrapping at 32 bits.
    ///
    /// Matches the hash other implementations use to bucket sender keys.
    pub fn hash_code(&self) -> i32 {
        self.serialize()
            .encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
    }
}

impl fmt::Display for SenderKeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DELIMITER}{}{DELIMITER}{}", self.group_id, self.sender_id, self.device_id)
    }
}

impl FromStr for SenderKeyIdentity {
    type Err = GroupError;

    /// Parse the canonical form. The group id may itself contain `::`; the
    /// sender and device are taken from the right.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, DELIMITER);
        let (Some(device), Some(sender), Some(group)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(GroupError::InvalidIdentity { input: s.to_string() });
        };

        let device_id =
            device.parse().map_err(|_| GroupError::InvalidIdentity { input: s.to_string() })?;

        Ok(Self::new(group, sender, device_id))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn canonical_form() {
        let identity = SenderKeyIdentity::new("group@g.us", "alice", 3);
        assert_eq!(identity.serialize(), "group@g.us::alice::3");
        assert_eq!(identity.to_string(), identity.serialize());
    }

    #[test]
    fn parse_roundtrip() {
        let identity = SenderKeyIdentity::new("group", "bob", 0);
        let parsed: SenderKeyIdentity = identity.serialize().parse().unwrap();
        assert_eq!(parsed, identity);
    }

    #[test]
    fn parse_group_containing_delimiter() {
        let parsed: SenderKeyIdentity = "a::b::carol::12".parse().unwrap();

        assert_eq!(parsed.group_id(), "a::b");
        assert_eq!(parsed.sender_id(), "carol");
        assert_eq!(parsed.device_id(), 12);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("no-delimiters".parse::<SenderKeyIdentity>().is_err());
        assert!("group::alice".parse::<SenderKeyIdentity>().is_err());
        assert!("group::alice::phone".parse::<SenderKeyIdentity>().is_err());
    }

    #[test]
    fn equality_is_structural() {
        let a = SenderKeyIdentity::new("g", "alice", 1);
        let b = SenderKeyIdentity::new(String::from("g"), String::from("alice"), 1);
        let c = SenderKeyIdentity::new("g", "alice", 2);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn hash_code_matches_reference_values() {
        assert_eq!(SenderKeyIdentity::new("a", "b", 1).hash_code(), 1_905_543_216);
        assert_eq!(SenderKeyIdentity::new("", "", 0).hash_code(), 55_349_680);
    }
}
