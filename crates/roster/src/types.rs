//! Core types for collaborator rosters.

use repoaccess::PermissionLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Fold an identity to the form used for equality comparison.
///
/// Logins are case-insensitive on GitHub, so `Alice` and `alice` name the
/// same principal.
pub fn canonical(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Map a role string from a roster document to a permission level.
///
/// `member` is the team-style alias for `push`; the API's `read`/`write`
/// aliases are accepted too. Returns `None` for anything else.
pub fn role_to_permission(role: &str) -> Option<PermissionLevel> {
    match role.trim().to_lowercase().as_str() {
        "member" => Some(PermissionLevel::Push),
        other => PermissionLevel::from_api_name(other),
    }
}

/// One declared collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredCollaborator {
    pub identity: String,
    #[serde(default)]
    pub permission: PermissionLevel,
}

impl DesiredCollaborator {
    pub fn new(identity: impl Into<String>, permission: PermissionLevel) -> Self {
        Self {
            identity: identity.into(),
            permission,
        }
    }
}

/// Which of the recognized document layouts a roster was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Groups with a name, a role and members.
    Teams,
    /// A flat list of logins.
    Usernames,
    /// A flat list of `{username, permission}` objects.
    Entries,
    /// A `login: permission` mapping.
    Mapping,
    /// An empty document or empty list.
    Empty,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Teams => write!(f, "teams"),
            Shape::Usernames => write!(f, "usernames"),
            Shape::Entries => write!(f, "entries"),
            Shape::Mapping => write!(f, "mapping"),
            Shape::Empty => write!(f, "empty"),
        }
    }
}

/// A non-fatal problem found while reading a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The role is not one we know; the entry was given `push`.
    UnknownRole { identity: String, role: String },
    /// The identity was declared more than once; the last declaration wins.
    DuplicateIdentity {
        identity: String,
        previous: PermissionLevel,
        current: PermissionLevel,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownRole { identity, role } => write!(
                f,
                "unknown role '{}' for {}, defaulting to {}",
                role,
                identity,
                PermissionLevel::Push
            ),
            Warning::DuplicateIdentity {
                identity,
                previous,
                current,
            } => write!(
                f,
                "{} is declared more than once ({} then {}), using {}",
                identity, previous, current, current
            ),
        }
    }
}

/// A parsed roster: the ordered desired collaborators plus parse metadata.
#[derive(Debug, Clone)]
pub struct Roster {
    pub collaborators: Vec<DesiredCollaborator>,
    pub shape: Shape,
    pub warnings: Vec<Warning>,
    /// Canonical identity -> position in `collaborators`.
    index: HashMap<String, usize>,
}

impl Roster {
    /// Create an empty roster for the given shape.
    pub fn new(shape: Shape) -> Self {
        Self {
            collaborators: Vec::new(),
            shape,
            warnings: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a collaborator, collapsing case-insensitive duplicates.
    ///
    /// A repeated identity keeps its first position and takes the later
    /// permission.
    pub fn add(&mut self, identity: &str, permission: PermissionLevel) {
        let identity = identity.trim();
        let key = canonical(identity);

        if let Some(&pos) = self.index.get(&key) {
            let existing = &mut self.collaborators[pos];
            let warning = Warning::DuplicateIdentity {
                identity: existing.identity.clone(),
                previous: existing.permission,
                current: permission,
            };
            existing.permission = permission;
            self.warn(warning);
            return;
        }

        self.index.insert(key, self.collaborators.len());
        self.collaborators
            .push(DesiredCollaborator::new(identity, permission));
    }

    /// Add a collaborator whose role came from the document.
    ///
    /// Unknown roles are accepted as `push` with a warning.
    pub fn add_with_role(&mut self, identity: &str, role: Option<&str>) {
        let permission = match role {
            None => PermissionLevel::Push,
            Some(role) => match role_to_permission(role) {
                Some(level) => level,
                None => {
                    self.warn(Warning::UnknownRole {
                        identity: identity.trim().to_string(),
                        role: role.to_string(),
                    });
                    PermissionLevel::Push
                }
            },
        };
        self.add(identity, permission);
    }

    fn warn(&mut self, warning: Warning) {
        log::debug!("Roster warning: {}", warning);
        self.warnings.push(warning);
    }

    /// Number of distinct collaborators.
    pub fn len(&self) -> usize {
        self.collaborators.len()
    }

    /// Whether the roster declares nobody.
    pub fn is_empty(&self) -> bool {
        self.collaborators.is_empty()
    }

    /// Look up a collaborator by identity, case-insensitively.
    pub fn get(&self, identity: &str) -> Option<&DesiredCollaborator> {
        self.index
            .get(&canonical(identity))
            .map(|&pos| &self.collaborators[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical() {
        assert_eq!(canonical("Alice"), "alice");
        assert_eq!(canonical("  BoB "), "bob");
    }

    #[test]
    fn test_role_to_permission() {
        assert_eq!(role_to_permission("admin"), Some(PermissionLevel::Admin));
        assert_eq!(role_to_permission("member"), Some(PermissionLevel::Push));
        assert_eq!(role_to_permission("Maintain"), Some(PermissionLevel::Maintain));
        assert_eq!(role_to_permission("triage"), Some(PermissionLevel::Triage));
        assert_eq!(role_to_permission("pull"), Some(PermissionLevel::Pull));
        assert_eq!(role_to_permission("read"), Some(PermissionLevel::Pull));
        assert_eq!(role_to_permission("owner"), None);
    }

    #[test]
    fn test_roster_duplicates_last_write_wins() {
        let mut roster = Roster::new(Shape::Entries);
        roster.add("alice", PermissionLevel::Pull);
        roster.add("bob", PermissionLevel::Push);
        roster.add("ALICE", PermissionLevel::Admin);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.collaborators[0].identity, "alice");
        assert_eq!(roster.collaborators[0].permission, PermissionLevel::Admin);
        assert_eq!(
            roster.warnings,
            vec![Warning::DuplicateIdentity {
                identity: "alice".to_string(),
                previous: PermissionLevel::Pull,
                current: PermissionLevel::Admin,
            }]
        );
    }

    #[test]
    fn test_roster_unknown_role_defaults_to_push() {
        let mut roster = Roster::new(Shape::Teams);
        roster.add_with_role("carol", Some("owner"));

        assert_eq!(roster.get("Carol").unwrap().permission, PermissionLevel::Push);
        assert_eq!(roster.warnings.len(), 1);
        assert!(roster.warnings[0].to_string().contains("owner"));
    }

    #[test]
    fn test_roster_missing_role_is_push_without_warning() {
        let mut roster = Roster::new(Shape::Entries);
        roster.add_with_role("dave", None);
        assert_eq!(roster.collaborators[0].permission, PermissionLevel::Push);
        assert!(roster.warnings.is_empty());
    }

    #[test]
    fn test_desired_collaborator_deserialize_default_permission() {
        let c: DesiredCollaborator = serde_json::from_str(r#"{"identity": "erin"}"#).unwrap();
        assert_eq!(c.permission, PermissionLevel::Push);
    }
}
