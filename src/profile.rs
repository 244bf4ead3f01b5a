//! Profile record stored per CPF
//!
//! ## Item layout
//!
//! Each profile is one item in a single table keyed by `CPF`:
//! - `CPF` (String): partition key, always present
//! - `Name`, `Email`, `Phone`, `Address` (String): optional personal attributes
//!
//! An attribute that was never set and one that was redacted look the same:
//! the attribute is simply not in the item.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Partition key attribute
pub const CPF_ATTR: &str = "CPF";
pub const NAME_ATTR: &str = "Name";
pub const EMAIL_ATTR: &str = "Email";
pub const PHONE_ATTR: &str = "Phone";
pub const ADDRESS_ATTR: &str = "Address";

/// Attributes removed by redaction
pub const PERSONAL_ATTRS: [&str; 4] = [NAME_ATTR, EMAIL_ATTR, PHONE_ATTR, ADDRESS_ATTR];

/// Store-neutral item: attribute name to string value
pub type Item = HashMap<String, String>;

/// A person's profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub cpf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Profile {
    /// Creates a profile holding only the key
    pub fn new(cpf: impl Into<String>) -> Self {
        Self {
            cpf: cpf.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// True when no personal attribute is present (new or redacted record)
    pub fn is_bare(&self) -> bool {
        self.personal_attrs().all(|(_, value)| value.is_none())
    }

    fn personal_attrs(&self) -> impl Iterator<Item = (&'static str, Option<&String>)> {
        [
            (NAME_ATTR, self.name.as_ref()),
            (EMAIL_ATTR, self.email.as_ref()),
            (PHONE_ATTR, self.phone.as_ref()),
            (ADDRESS_ATTR, self.address.as_ref()),
        ]
        .into_iter()
    }

    /// Serializes every present field into an item, key included
    pub fn to_item(&self) -> Item {
        let mut item = self.attributes();
        item.insert(CPF_ATTR.to_string(), self.cpf.clone());
        item
    }

    /// Present personal attributes only, without the key
    pub fn attributes(&self) -> Item {
        self.personal_attrs()
            .filter_map(|(attr, value)| value.map(|v| (attr.to_string(), v.clone())))
            .collect()
    }

    /// Deserializes an item; attributes missing from the item stay `None`
    pub fn from_item(mut item: Item) -> Result<Self, StoreError> {
        let cpf = item.remove(CPF_ATTR).ok_or_else(|| StoreError::Malformed {
            attribute: CPF_ATTR.to_string(),
            message: "missing partition key".to_string(),
        })?;

        Ok(Self {
            cpf,
            name: item.remove(NAME_ATTR),
            email: item.remove(EMAIL_ATTR),
            phone: item.remove(PHONE_ATTR),
            address: item.remove(ADDRESS_ATTR),
        })
    }
}
