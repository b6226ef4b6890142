//! Parser for collaborator roster documents.
//!
//! Four YAML layouts are recognized, tried in this order:
//!
//! ```yaml
//! # 1. Teams: every member inherits the group's role
//! - team: core
//!   role: admin
//!   members:
//!     - username: alice
//!       note: release manager
//!     - bob
//!
//! # 2. Usernames: everyone gets push
//! - alice
//! - bob
//!
//! # 3. Entries: explicit permission, push when missing
//! - username: alice
//!   permission: admin
//! - username: bob
//!
//! # 4. Mapping: login to permission, null means push
//! alice: admin
//! bob:
//! ```

use crate::error::{Error, Result};
use crate::types::{Roster, Shape};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Keys accepted for a member or entry identity.
const IDENTITY_KEYS: [&str; 2] = ["username", "login"];

/// Keys accepted for a team name.
const TEAM_NAME_KEYS: [&str; 2] = ["team", "name"];

/// Keys accepted for an entry's permission.
const PERMISSION_KEYS: [&str; 2] = ["permission", "role"];

/// Parse a roster from a file path.
pub fn parse_file(path: &Path) -> Result<Roster> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content)
}

/// Parse a roster from a string.
pub fn parse_str(content: &str) -> Result<Roster> {
    // An empty file deserializes as Null, not as an error.
    let value: Value = if content.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(content)?
    };

    let document = Document::classify(&value)?;
    log::debug!("Roster document recognized as {}", document.shape());
    document.into_roster()
}

/// A roster document, classified by its structure.
#[derive(Debug)]
enum Document<'a> {
    Teams(&'a [Value]),
    Usernames(&'a [Value]),
    Entries(&'a [Value]),
    Mapping(&'a Mapping),
    Empty,
}

impl<'a> Document<'a> {
    /// Match the value against each recognized shape in priority order.
    fn classify(value: &'a Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::Sequence(items) if items.is_empty() => Ok(Self::Empty),
            Value::Sequence(items) if items.iter().all(is_team) => Ok(Self::Teams(items)),
            Value::Sequence(items) if items.iter().all(Value::is_string) => {
                Ok(Self::Usernames(items))
            }
            Value::Sequence(items) if items.iter().all(Value::is_mapping) => {
                Ok(Self::Entries(items))
            }
            Value::Sequence(_) => Err(Error::Format(
                "list items must be all team objects, all usernames, or all entry objects"
                    .to_string(),
            )),
            Value::Mapping(map) if map.is_empty() => Ok(Self::Empty),
            Value::Mapping(map) => Ok(Self::Mapping(map)),
            other => Err(Error::Format(format!(
                "expected a list or a mapping, found {}",
                kind_of(other)
            ))),
        }
    }

    fn shape(&self) -> Shape {
        match self {
            Self::Teams(_) => Shape::Teams,
            Self::Usernames(_) => Shape::Usernames,
            Self::Entries(_) => Shape::Entries,
            Self::Mapping(_) => Shape::Mapping,
            Self::Empty => Shape::Empty,
        }
    }

    fn into_roster(self) -> Result<Roster> {
        let mut roster = Roster::new(self.shape());

        match self {
            Self::Teams(groups) => {
                for group in groups {
                    read_team(group, &mut roster)?;
                }
            }
            Self::Usernames(names) => {
                for name in names {
                    let identity = name.as_str().unwrap_or_default();
                    require_identity(identity, name)?;
                    roster.add_with_role(identity, None);
                }
            }
            Self::Entries(entries) => {
                for entry in entries {
                    read_entry(entry, &mut roster)?;
                }
            }
            Self::Mapping(map) => {
                for (key, value) in map {
                    let identity = key.as_str().ok_or_else(|| invalid(key, "key is not a login"))?;
                    require_identity(identity, key)?;
                    let role = role_text(value);
                    roster.add_with_role(identity, role.as_deref());
                }
            }
            Self::Empty => {}
        }

        Ok(roster)
    }
}

/// A group object: a mapping with a `members` key.
fn is_team(value: &Value) -> bool {
    value
        .as_mapping()
        .is_some_and(|m| m.contains_key("members"))
}

fn read_team(group: &Value, roster: &mut Roster) -> Result<()> {
    let Some(map) = group.as_mapping() else {
        return Err(invalid(group, "team is not an object"));
    };

    let name = lookup(map, &TEAM_NAME_KEYS)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(group, "team has no name"))?;

    let role = map.get("role").and_then(role_text);

    let members: &[Value] = match map.get("members") {
        Some(Value::Sequence(members)) => members.as_slice(),
        Some(Value::Null) | None => &[],
        Some(_) => return Err(invalid(group, "members is not a list")),
    };

    log::debug!(
        "Team {} ({} members, role {})",
        name,
        members.len(),
        role.as_deref().unwrap_or("default")
    );

    for member in members {
        let identity = match member {
            Value::String(login) => login.as_str(),
            Value::Mapping(m) => lookup(m, &IDENTITY_KEYS)
                .and_then(Value::as_str)
                .ok_or_else(|| invalid(member, "member has no username"))?,
            _ => return Err(invalid(member, "member is not a username or object")),
        };
        require_identity(identity, member)?;
        roster.add_with_role(identity, role.as_deref());
    }

    Ok(())
}

fn read_entry(entry: &Value, roster: &mut Roster) -> Result<()> {
    let Some(map) = entry.as_mapping() else {
        return Err(invalid(entry, "entry is not an object"));
    };

    let identity = lookup(map, &IDENTITY_KEYS)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(entry, "entry has no username"))?;
    require_identity(identity, entry)?;

    let role = lookup(map, &PERMISSION_KEYS).and_then(role_text);
    roster.add_with_role(identity, role.as_deref());
    Ok(())
}

/// First value present under any of `keys`.
fn lookup<'m>(map: &'m Mapping, keys: &[&str]) -> Option<&'m Value> {
    keys.iter().find_map(|k| map.get(*k))
}

/// A role value as text. Null means "not given"; scalars are stringified so
/// an odd value surfaces as an unknown-role warning instead of an error.
fn role_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(describe(other)),
    }
}

fn require_identity(identity: &str, source: &Value) -> Result<()> {
    if identity.trim().is_empty() {
        return Err(invalid(source, "username is empty"));
    }
    Ok(())
}

fn invalid(entry: &Value, reason: &str) -> Error {
    Error::Validation {
        entry: describe(entry),
        reason: reason.to_string(),
    }
}

/// Serialize a value as compact JSON for error messages.
fn describe(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
