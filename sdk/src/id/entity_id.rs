//! Ledger entity identifiers.
//!
//! Every entity lives at `shard.realm.<something>`. For most entities the
//! something is a number. Accounts may instead be addressed by an alias: the
//! public key that will own them, or a 20-byte EVM address. The three forms
//! are mutually exclusive, so they are one enum rather than three optional
//! fields that could disagree.

use prost::Message;
use std::fmt;
use std::str::FromStr;

use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::proto;

/// Length of an EVM address alias.
pub const EVM_ADDRESS_LENGTH: usize = 20;

/// What sits in the third position of an entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityAddress {
    Num(u64),
    KeyAlias(PublicKey),
    EvmAddress([u8; EVM_ADDRESS_LENGTH]),
}

/// `shard.realm.num`, or `shard.realm.<alias>` for accounts.
///
/// Components are bounded by `i64::MAX` because that is what the wire
/// format carries. Parsing, decoding and encoding enforce the bound; an id
/// built out of range is rejected when it is first put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub address: EntityAddress,
}

pub type AccountId = EntityId;
pub type TokenId = EntityId;
pub type TopicId = EntityId;
pub type FileId = EntityId;
pub type ScheduleId = EntityId;

/// Largest value any component may take.
pub const MAX_COMPONENT: u64 = i64::MAX as u64;

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self {
            shard,
            realm,
            address: EntityAddress::Num(num),
        }
    }

    /// Bounds-checked constructor.
    pub fn try_new(shard: u64, realm: u64, num: u64) -> Result<Self> {
        let id = Self::new(shard, realm, num);
        id.check_bounds()?;
        Ok(id)
    }

    pub fn from_key_alias(shard: u64, realm: u64, key: PublicKey) -> Self {
        Self {
            shard,
            realm,
            address: EntityAddress::KeyAlias(key),
        }
    }

    pub fn from_evm_address(shard: u64, realm: u64, address: [u8; EVM_ADDRESS_LENGTH]) -> Self {
        Self {
            shard,
            realm,
            address: EntityAddress::EvmAddress(address),
        }
    }

    /// Same shard and realm, addressed by number. Any alias is dropped.
    pub fn with_num(self, num: u64) -> Self {
        Self {
            address: EntityAddress::Num(num),
            ..self
        }
    }

    pub fn with_key_alias(self, key: PublicKey) -> Self {
        Self {
            address: EntityAddress::KeyAlias(key),
            ..self
        }
    }

    pub fn with_evm_address(self, address: [u8; EVM_ADDRESS_LENGTH]) -> Self {
        Self {
            address: EntityAddress::EvmAddress(address),
            ..self
        }
    }

    pub fn num(&self) -> Option<u64> {
        match self.address {
            EntityAddress::Num(num) => Some(num),
            _ => None,
        }
    }

    pub fn key_alias(&self) -> Option<&PublicKey> {
        match &self.address {
            EntityAddress::KeyAlias(key) => Some(key),
            _ => None,
        }
    }

    pub fn evm_address(&self) -> Option<&[u8; EVM_ADDRESS_LENGTH]> {
        match &self.address {
            EntityAddress::EvmAddress(address) => Some(address),
            _ => None,
        }
    }

    fn check_bounds(&self) -> Result<()> {
        let num = self.num().unwrap_or(0);
        if self.shard > MAX_COMPONENT || self.realm > MAX_COMPONENT || num > MAX_COMPONENT {
            return Err(Error::validation("entity id", "component exceeds i64::MAX"));
        }
        Ok(())
    }

    /// Reject aliases where only a numeric id makes sense (tokens, topics, ...).
    pub(crate) fn require_num(&self, field: &'static str) -> Result<()> {
        if self.num().is_none() {
            return Err(Error::validation(field, "aliases are only valid for accounts"));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Wire conversions
    // -----------------------------------------------------------------------

    /// Wire form as an account id. Aliases go in the `alias` slot.
    pub fn to_account_proto(self) -> Result<proto::AccountId> {
        let account = match self.address {
            EntityAddress::Num(num) => {
                proto::account_id::Account::AccountNum(wire_component(num, "account number")?)
            }
            EntityAddress::KeyAlias(key) => {
                proto::account_id::Account::Alias(key.to_key_proto().encode_to_vec())
            }
            EntityAddress::EvmAddress(address) => {
                proto::account_id::Account::Alias(address.to_vec())
            }
        };
        Ok(proto::AccountId {
            shard_num: wire_component(self.shard, "shard")?,
            realm_num: wire_component(self.realm, "realm")?,
            account: Some(account),
        })
    }

    pub fn from_account_proto(id: &proto::AccountId) -> Result<Self> {
        let shard = non_negative(id.shard_num, "shard")?;
        let realm = non_negative(id.realm_num, "realm")?;
        let address = match &id.account {
            Some(proto::account_id::Account::AccountNum(num)) => {
                EntityAddress::Num(non_negative(*num, "account number")?)
            }
            Some(proto::account_id::Account::Alias(bytes)) => {
                if let Ok(evm) = <[u8; EVM_ADDRESS_LENGTH]>::try_from(bytes.as_slice()) {
                    EntityAddress::EvmAddress(evm)
                } else {
                    let key = proto::Key::decode(bytes.as_slice())
                        .map_err(|e| Error::validation("account alias", e.to_string()))?;
                    EntityAddress::KeyAlias(PublicKey::from_key_proto(&key)?)
                }
            }
            None => EntityAddress::Num(0),
        };
        Ok(Self {
            shard,
            realm,
            address,
        })
    }

    /// Only meaningful for numeric ids; callers validate with `require_num`.
    pub fn to_num_proto(self) -> Result<proto::EntityNum> {
        Ok(proto::EntityNum {
            shard_num: wire_component(self.shard, "shard")?,
            realm_num: wire_component(self.realm, "realm")?,
            num: wire_component(self.num().unwrap_or_default(), "entity number")?,
        })
    }

    pub fn from_num_proto(id: &proto::EntityNum) -> Result<Self> {
        Ok(Self::new(
            non_negative(id.shard_num, "shard")?,
            non_negative(id.realm_num, "realm")?,
            non_negative(id.num, "entity number")?,
        ))
    }
}

fn wire_component(value: u64, field: &'static str) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::validation(field, format!("{value} exceeds i64::MAX")))
}

fn non_negative(value: i64, field: &'static str) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::validation(field, format!("{value} is negative")))
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.", self.shard, self.realm)?;
        match &self.address {
            EntityAddress::Num(num) => write!(f, "{num}"),
            EntityAddress::KeyAlias(key) => write!(f, "{key}"),
            EntityAddress::EvmAddress(address) => f.write_str(&hex::encode(address)),
        }
    }
}

impl FromStr for EntityId {
    type Err = Error;

    /// Accepts `0.0.3`, `0.0.<64 hex key>` and `0.0.<40 hex evm address>`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::validation("entity id", format!("{s:?}: {reason}"));

        let mut parts = s.splitn(3, '.');
        let (Some(shard), Some(realm), Some(last)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected shard.realm.num"));
        };
        let shard: u64 = shard.parse().map_err(|_| invalid("bad shard"))?;
        let realm: u64 = realm.parse().map_err(|_| invalid("bad realm"))?;

        let id = if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
            let num: u64 = last.parse().map_err(|_| invalid("bad number"))?;
            Self::new(shard, realm, num)
        } else if last.len() == EVM_ADDRESS_LENGTH * 2 {
            let bytes = hex::decode(last).map_err(|_| invalid("bad evm address"))?;
            let mut address = [0u8; EVM_ADDRESS_LENGTH];
            address.copy_from_slice(&bytes);
            Self::from_evm_address(shard, realm, address)
        } else {
            let key = PublicKey::from_hex(last).map_err(|_| invalid("bad key alias"))?;
            Self::from_key_alias(shard, realm, key)
        };
        id.check_bounds()?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    #[test]
    fn parse_and_display_numeric() {
        let id: AccountId = "0.0.1001".parse().unwrap();
        assert_eq!(id, AccountId::new(0, 0, 1001));
        assert_eq!(id.to_string(), "0.0.1001");
        assert_eq!(id.num(), Some(1001));
    }

    #[test]
    fn parse_aliases() {
        let key = PrivateKey::generate().public_key();
        let id: AccountId = format!("0.0.{key}").parse().unwrap();
        assert_eq!(id.key_alias(), Some(&key));
        assert_eq!(id.num(), None);

        let evm: AccountId = "1.2.00112233445566778899aabbccddeeff00112233".parse().unwrap();
        assert_eq!(evm.shard, 1);
        assert_eq!(evm.evm_address().map(|a| a[1]), Some(0x11));
        assert_eq!(evm.to_string(), "1.2.00112233445566778899aabbccddeeff00112233");
    }

    #[test]
    fn setting_one_form_clears_the_others() {
        let key = PrivateKey::generate().public_key();
        let id = AccountId::new(0, 0, 5).with_key_alias(key);
        assert_eq!(id.num(), None);
        let id = id.with_evm_address([9u8; 20]);
        assert_eq!(id.key_alias(), None);
        let id = id.with_num(7);
        assert_eq!(id.evm_address(), None);
        assert_eq!(id, AccountId::new(0, 0, 7));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("0.0".parse::<AccountId>().is_err());
        assert!("a.0.3".parse::<AccountId>().is_err());
        assert!("0.0.zz".parse::<AccountId>().is_err());
        assert!("0.0.9223372036854775808".parse::<AccountId>().is_err());
        assert!(AccountId::try_new(0, u64::MAX, 1).is_err());
    }

    #[test]
    fn proto_roundtrip_preserves_alias_kind() {
        let key = PrivateKey::generate().public_key();
        for id in [
            AccountId::new(0, 0, 3),
            AccountId::from_key_alias(0, 0, key),
            AccountId::from_evm_address(0, 0, [0xAB; 20]),
        ] {
            let decoded = AccountId::from_account_proto(&id.to_account_proto().unwrap()).unwrap();
            assert_eq!(decoded, id);
        }
    }

    #[test]
    fn out_of_range_ids_do_not_encode() {
        let just_over = MAX_COMPONENT + 1;
        assert!(AccountId::new(just_over, 0, 1001).to_account_proto().is_err());
        assert!(AccountId::new(0, just_over, 1001).to_account_proto().is_err());
        assert!(AccountId::new(0, 0, just_over).to_account_proto().is_err());
        assert!(TopicId::new(0, 0, just_over).to_num_proto().is_err());

        let key = PrivateKey::generate().public_key();
        assert!(AccountId::from_key_alias(just_over, 0, key).to_account_proto().is_err());

        let edge = AccountId::new(MAX_COMPONENT, MAX_COMPONENT, MAX_COMPONENT);
        let wire = edge.to_account_proto().unwrap();
        assert_eq!(AccountId::from_account_proto(&wire).unwrap(), edge);
    }

    #[test]
    fn negative_wire_values_rejected() {
        let wire = proto::EntityNum {
            shard_num: 0,
            realm_num: -1,
            num: 3,
        };
        assert!(EntityId::from_num_proto(&wire).is_err());
    }

    #[test]
    fn require_num_rejects_alias() {
        let key = PrivateKey::generate().public_key();
        assert!(TokenId::from_key_alias(0, 0, key).require_num("token id").is_err());
        assert!(TokenId::new(0, 0, 9).require_num("token id").is_ok());
    }
}
