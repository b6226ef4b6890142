//! # roster
//!
//! Read a declarative list of repository collaborators.
//!
//! A roster document is YAML in one of four layouts (team groups, a list of
//! logins, a list of `{username, permission}` objects, or a `login: permission`
//! mapping). Parsing yields an ordered, de-duplicated list of
//! [`DesiredCollaborator`]s; anything without an explicit permission gets
//! `push`.
//!
//! ## Example
//!
//! ```
//! use repoaccess::PermissionLevel;
//! use roster::{Shape, parse_str};
//!
//! let roster = parse_str("alice: admin\nbob:\n").unwrap();
//! assert_eq!(roster.shape, Shape::Mapping);
//! assert_eq!(roster.collaborators[1].permission, PermissionLevel::Push);
//! ```
//!
//! Unknown roles never fail a parse. They fall back to `push` and are reported
//! in [`Roster::warnings`].

#![warn(clippy::all)]

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::{parse_file, parse_str};
pub use types::{DesiredCollaborator, Roster, Shape, Warning, canonical, role_to_permission};
