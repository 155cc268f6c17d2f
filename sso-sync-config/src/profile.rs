//! Canonical SSO profile names.
//!
//! A profile name is `sso-{account_id}-{role_name}`. It doubles as the AWS
//! config section key (`[profile sso-…]`) and as a round-trippable identifier:
//! parsing takes the second `-`-separated token as the account id and
//! everything after the second `-` as the role name. Role names may therefore
//! contain `-`; account ids (fixed-width numeric strings) may not. An account
//! id containing `-` is not rejected, it simply parses back differently.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every generated profile name.
pub const PROFILE_PREFIX: &str = "sso";

/// An (account, role) pair reachable through the SSO session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub account_id: String,
    pub role_name: String,
}

impl Role {
    pub fn new(account_id: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            role_name: role_name.into(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_id, self.role_name)
    }
}

/// Canonical profile name derived from a [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileName(String);

impl ProfileName {
    /// Build the canonical name for `role`. No escaping is performed.
    pub fn format(role: &Role) -> Self {
        Self(format!(
            "{}-{}-{}",
            PROFILE_PREFIX, role.account_id, role.role_name
        ))
    }

    /// Split a profile name back into its [`Role`].
    ///
    /// Fails with [`ConfigError::MalformedProfileName`] when the name has
    /// fewer than two `-` separators or an empty account id or role name.
    pub fn parse(name: &str) -> Result<Role, ConfigError> {
        let mut parts = name.splitn(3, '-');
        let _prefix = parts.next();
        match (parts.next(), parts.next()) {
            (Some(account_id), Some(role_name))
                if !account_id.is_empty() && !role_name.is_empty() =>
            {
                Ok(Role::new(account_id, role_name))
            }
            _ => Err(ConfigError::MalformedProfileName(name.to_string())),
        }
    }

    /// Wrap an existing string, checking that it parses.
    pub fn from_string(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        Self::parse(&name)?;
        Ok(Self(name))
    }

    /// The role this name encodes.
    pub fn role(&self) -> Result<Role, ConfigError> {
        Self::parse(&self.0)
    }

    /// AWS config section key for this profile, e.g. `profile sso-1234-Admin`.
    pub fn section_name(&self) -> String {
        named_profile_section(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProfileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Section key the AWS CLI uses for a named (non-default) profile.
pub fn named_profile_section(name: &str) -> String {
    format!("profile {name}")
}
