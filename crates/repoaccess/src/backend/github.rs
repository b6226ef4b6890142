//! GitHub REST backend.
//!
//! This module provides the [`GitHubBackend`] implementation of
//! [`RepositoryAccess`] on top of GitHub's collaborators and invitations API.
//!
//! # Rate Limiting
//!
//! Authenticated requests are limited to 5000 per hour. A sync costs one
//! request per page of collaborators and invitations plus one per mutation,
//! so rate limits only matter for very large rosters.

use crate::backend::RepositoryAccess;
use crate::error::{Error, Result};
use crate::types::{
    InvitationId, Page, PageCursor, PendingInvitation, PermissionLevel, RemoteCollaborator,
    RepoRef, UpsertOutcome,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default public API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Largest page size the API accepts.
const PER_PAGE: u32 = 100;

/// Timeout applied to every request unless overridden.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "collabsync";
const API_VERSION: &str = "2022-11-28";

/// GitHub REST backend.
///
/// # Example
///
/// ```no_run
/// use repoaccess::backend::github::GitHubBackend;
/// use repoaccess::backend::list_all_collaborators;
/// use repoaccess::RepoRef;
///
/// let backend = GitHubBackend::new("ghp_example");
/// let repo: RepoRef = "octo-org/hello-world".parse().unwrap();
/// let collaborators = list_all_collaborators(&backend, &repo).unwrap();
/// println!("{} collaborators", collaborators.len());
/// ```
pub struct GitHubBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// GitHub API base URL.
    api_base: String,
    /// Pre-formatted `Authorization` header value.
    authorization: String,
}

impl GitHubBackend {
    /// Create a backend for the public API.
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a backend with a custom API base (GitHub Enterprise, testing).
    #[must_use]
    pub fn with_api_base(token: &str, api_base: impl Into<String>) -> Self {
        Self::with_options(token, api_base, DEFAULT_TIMEOUT)
    }

    /// Create a backend with a custom API base and request timeout.
    #[must_use]
    pub fn with_options(token: &str, api_base: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let api_base: String = api_base.into();
        Self {
            agent: config.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            authorization: format!("Bearer {}", token.trim()),
        }
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn repo_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.name)
    }

    /// First page of direct collaborators.
    fn collaborators_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/collaborators?affiliation=direct&per_page={}",
            self.repo_url(repo),
            PER_PAGE
        )
    }

    /// URL of a single collaborator. Every path segment is percent-encoded.
    fn collaborator_url(&self, repo: &RepoRef, identity: &str) -> Result<String> {
        let mut url = url::Url::parse(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|()| Error::Other(format!("API base cannot carry a path: {}", self.api_base)))?
            .pop_if_empty()
            .extend(["repos", repo.owner.as_str(), repo.name.as_str(), "collaborators", identity]);
        Ok(url.into())
    }

    fn invitations_url(&self, repo: &RepoRef) -> String {
        format!("{}/invitations?per_page={}", self.repo_url(repo), PER_PAGE)
    }

    fn invitation_url(&self, repo: &RepoRef, id: InvitationId) -> String {
        format!("{}/invitations/{}", self.repo_url(repo), id)
    }

    fn request<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
            .header("Authorization", self.authorization.as_str())
    }

    /// GET a JSON array and the `rel="next"` link, if any.
    fn get_page<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<(Vec<T>, Option<String>)> {
        log::debug!("GET {}", url);
        let mut response = self.request(self.agent.get(url)).call()?;

        let next = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);

        let items: Vec<T> = response.body_mut().read_json()?;
        Ok((items, next))
    }
}

impl RepositoryAccess for GitHubBackend {
    fn list_collaborators(
        &self,
        repo: &RepoRef,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteCollaborator>> {
        let url = match cursor {
            Some(PageCursor(next)) => next.clone(),
            None => self.collaborators_url(repo),
        };

        let (raw, next) = self.get_page::<GitHubCollaborator>(&url)?;
        let items = raw
            .into_iter()
            .map(RemoteCollaborator::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            next: next.map(PageCursor),
        })
    }

    fn list_invitations(&self, repo: &RepoRef) -> Result<Vec<PendingInvitation>> {
        let mut invitations = Vec::new();
        let mut url = Some(self.invitations_url(repo));

        while let Some(current) = url {
            let (raw, next) = self.get_page::<GitHubInvitation>(&current)?;
            for invitation in raw {
                invitations.push(PendingInvitation::try_from(invitation)?);
            }
            url = next;
        }

        Ok(invitations)
    }

    fn upsert_collaborator(
        &self,
        repo: &RepoRef,
        identity: &str,
        permission: PermissionLevel,
    ) -> Result<UpsertOutcome> {
        let url = self.collaborator_url(repo, identity)?;
        log::debug!("PUT {} ({})", url, permission);

        let response = self
            .request(self.agent.put(&url))
            .send_json(&UpsertBody {
                permission: permission.as_str(),
            })?;

        // 201 carries the new invitation, 204 means an existing collaborator
        // was updated.
        match response.status().as_u16() {
            201 => Ok(UpsertOutcome::Invited),
            _ => Ok(UpsertOutcome::Updated),
        }
    }

    fn revoke_collaborator(&self, repo: &RepoRef, identity: &str) -> Result<()> {
        let url = self.collaborator_url(repo, identity)?;
        log::debug!("DELETE {}", url);
        self.request(self.agent.delete(&url)).call()?;
        Ok(())
    }

    fn delete_invitation(&self, repo: &RepoRef, id: InvitationId) -> Result<()> {
        let url = self.invitation_url(repo, id);
        log::debug!("DELETE {}", url);
        self.request(self.agent.delete(&url)).call()?;
        Ok(())
    }
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut sections = part.split(';');
        let target = sections.next()?.trim();
        let is_next = sections.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

// =============================================================================
// GitHub API request/response types
// =============================================================================

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    permission: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitHubCollaborator {
    login: String,
    #[serde(default)]
    role_name: Option<String>,
    #[serde(default)]
    permissions: Option<GitHubPermissions>,
}

#[derive(Debug, Default, Deserialize)]
struct GitHubPermissions {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    maintain: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    triage: bool,
    #[serde(default)]
    pull: bool,
}

impl GitHubPermissions {
    /// Highest level whose flag is set.
    fn highest(&self) -> Option<PermissionLevel> {
        [
            (self.admin, PermissionLevel::Admin),
            (self.maintain, PermissionLevel::Maintain),
            (self.push, PermissionLevel::Push),
            (self.triage, PermissionLevel::Triage),
            (self.pull, PermissionLevel::Pull),
        ]
        .into_iter()
        .find_map(|(set, level)| set.then_some(level))
    }
}

#[derive(Debug, Deserialize)]
struct GitHubInvitation {
    id: u64,
    #[serde(default)]
    invitee: Option<GitHubUser>,
    permissions: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

impl TryFrom<GitHubCollaborator> for RemoteCollaborator {
    type Error = Error;

    fn try_from(c: GitHubCollaborator) -> Result<Self> {
        // Custom organization roles report a role_name outside the five
        // levels; the permission flags still describe the effective level.
        let permission = c
            .role_name
            .as_deref()
            .and_then(PermissionLevel::from_api_name)
            .or_else(|| c.permissions.as_ref().and_then(GitHubPermissions::highest))
            .ok_or_else(|| {
                Error::InvalidResponse(format!("no permission reported for collaborator {}", c.login))
            })?;

        Ok(Self {
            identity: c.login,
            permission,
        })
    }
}

impl TryFrom<GitHubInvitation> for PendingInvitation {
    type Error = Error;

    fn try_from(i: GitHubInvitation) -> Result<Self> {
        let permission = PermissionLevel::from_api_name(&i.permissions).ok_or_else(|| {
            Error::InvalidResponse(format!(
                "unknown permission '{}' on invitation {}",
                i.permissions, i.id
            ))
        })?;

        Ok(Self {
            id: InvitationId(i.id),
            invitee: i.invitee.map(|u| u.login),
            permission,
        })
    }
}
