//! Account and role enumeration through the AWS SSO portal API.
//!
//! The portal exposes two paginated endpoints, both authenticated with the
//! session token in the `x-amz-sso_bearer_token` header:
//!
//! - `GET /assignment/accounts?max_result=…&next_token=…`
//! - `GET /assignment/roles?account_id=…&max_result=…&next_token=…`

use crate::error::SyncError;
use crate::http::{self, MAX_API_RESPONSE_SIZE};
use crate::token_cache::SessionToken;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sso_sync_config::{Role, Settings, normalize_start_url};
use ureq::Agent;

/// Header carrying the session token.
const BEARER_HEADER: &str = "x-amz-sso_bearer_token";

/// Page size requested from the portal.
const PAGE_SIZE: &str = "100";

/// Upper bound on pages followed for a single listing.
const MAX_PAGES: usize = 1000;

/// Source of the (account, role) pairs reachable with a session token.
pub trait RoleSource {
    /// Every role of every account, complete (all pages followed).
    fn list_roles(&self, token: &SessionToken) -> Result<Vec<Role>, SyncError>;
}

/// An account assigned to the signed-in user.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleInfo {
    role_name: String,
    account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountPage {
    #[serde(default)]
    account_list: Vec<AccountInfo>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RolePage {
    #[serde(default)]
    role_list: Vec<RoleInfo>,
    next_token: Option<String>,
}

/// Browser sign-in link for `role` through the access portal.
pub fn console_url(start_url: &str, role: &Role) -> String {
    format!(
        "{}/console?account_id={}&role_name={}",
        normalize_start_url(start_url),
        role.account_id,
        role.role_name
    )
}

/// Follow `next_token` until the portal stops returning one.
fn collect_pages<T>(
    mut fetch: impl FnMut(Option<&str>) -> Result<(Vec<T>, Option<String>), SyncError>,
) -> Result<Vec<T>, SyncError> {
    let mut items = Vec::new();
    let mut next: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let (page, token) = fetch(next.as_deref())?;
        items.extend(page);
        match token.filter(|t| !t.is_empty()) {
            Some(t) if next.as_deref() != Some(t.as_str()) => next = Some(t),
            _ => return Ok(items),
        }
    }

    Err(SyncError::Portal(format!(
        "pagination did not finish after {MAX_PAGES} pages"
    )))
}

/// Blocking client for the SSO portal of one region.
pub struct PortalClient {
    base_url: String,
    agent: Agent,
}

impl PortalClient {
    /// Client for the public portal endpoint of `region`.
    pub fn for_region(region: &str) -> Self {
        Self {
            base_url: format!("https://portal.sso.{region}.amazonaws.com"),
            agent: http::agent(),
        }
    }

    /// Client for the configured `portal_url`, or the region endpoint.
    pub fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        match settings.portal_url.as_deref() {
            Some(url) => {
                log::info!("Using custom portal endpoint {}", url);
                Self::with_base_url(url)
            }
            None => Ok(Self::for_region(&settings.sso_region)),
        }
    }

    /// Client for a custom endpoint (must be HTTPS).
    pub fn with_base_url(base_url: &str) -> Result<Self, SyncError> {
        http::validate_portal_url(base_url).map_err(SyncError::Portal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: http::agent(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &SessionToken,
    ) -> Result<T, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .agent
            .get(&url)
            .header(BEARER_HEADER, token.expose())
            .header("User-Agent", "aws-sso-sync");
        for (key, value) in query {
            request = request.query(*key, *value);
        }

        let bytes = request
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(401) | ureq::Error::StatusCode(403) => SyncError::Portal(
                    format!("{path}: session token rejected; log in again"),
                ),
                other => SyncError::Portal(format!("{path}: {other}")),
            })?
            .into_body()
            .with_config()
            .limit(MAX_API_RESPONSE_SIZE)
            .read_to_vec()
            .map_err(|e| SyncError::Portal(format!("{path}: failed to read response: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::Portal(format!("{path}: unexpected response: {e}")))
    }

    /// Accounts assigned to the signed-in user.
    pub fn list_accounts(&self, token: &SessionToken) -> Result<Vec<AccountInfo>, SyncError> {
        collect_pages(|next| {
            let mut query = vec![("max_result", PAGE_SIZE)];
            if let Some(next) = next {
                query.push(("next_token", next));
            }
            let page: AccountPage = self.get_json("/assignment/accounts", &query, token)?;
            Ok((page.account_list, page.next_token))
        })
    }

    /// Role names the user may assume in `account_id`.
    pub fn list_account_roles(
        &self,
        token: &SessionToken,
        account_id: &str,
    ) -> Result<Vec<Role>, SyncError> {
        collect_pages(|next| {
            let mut query = vec![("account_id", account_id), ("max_result", PAGE_SIZE)];
            if let Some(next) = next {
                query.push(("next_token", next));
            }
            let page: RolePage = self.get_json("/assignment/roles", &query, token)?;
            let roles = page
                .role_list
                .into_iter()
                .map(|r| Role::new(r.account_id, r.role_name))
                .collect();
            Ok((roles, page.next_token))
        })
    }
}

impl RoleSource for PortalClient {
    fn list_roles(&self, token: &SessionToken) -> Result<Vec<Role>, SyncError> {
        let accounts = self.list_accounts(token)?;
        log::info!("SSO portal returned {} accounts", accounts.len());

        let mut roles = Vec::new();
        for account in &accounts {
            let account_roles = self.list_account_roles(token, &account.account_id)?;
            log::debug!(
                "Account {} ({}): {} roles",
                account.account_id,
                account.account_name.as_deref().unwrap_or("unnamed"),
                account_roles.len()
            );
            roles.extend(account_roles);
        }
        Ok(roles)
    }
}
