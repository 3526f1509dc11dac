use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::model::{
    Member, MemberGuildSettings, PkMessage, System, SystemGuildSettings,
};
use crate::{PkError, Result, API_USER_AGENT};

/// Read access to the PluralKit system/member/message directory.
///
/// Every call issues one request; nothing is retried.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look a system up by its id or by the Discord id of its account
    async fn system(&self, id: &str) -> Result<System>;

    async fn system_members(&self, system_id: &str) -> Result<Vec<Member>>;

    async fn member(&self, id: &str) -> Result<Member>;

    async fn member_guild_settings(
        &self,
        member_id: &str,
        guild_id: &str,
    ) -> Result<MemberGuildSettings>;

    async fn system_guild_settings(
        &self,
        system_id: &str,
        guild_id: &str,
    ) -> Result<SystemGuildSettings>;

    /// Look up a proxied message by the id of either the original or the
    /// proxied copy
    async fn message(&self, id: &str) -> Result<PkMessage>;
}

/// HTTP client of the public PluralKit API
pub struct PkApi {
    client: reqwest::Client,
    base: Url,
}

impl PkApi {
    pub fn new(base: &str) -> Result<Self> {
        Self::with_builder(base, reqwest::Client::builder())
    }

    fn with_builder(
        base: &str,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
        let client = builder
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base: base_url(base)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn request<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PkError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(not_found(&url, status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PkError::RemoteUnavailable(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| PkError::RemoteMalformed(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl Directory for PkApi {
    async fn system(&self, id: &str) -> Result<System> {
        self.request(&format!("systems/{}", id)).await
    }

    async fn system_members(&self, system_id: &str) -> Result<Vec<Member>> {
        self.request(&format!("systems/{}/members", system_id))
            .await
    }

    async fn member(&self, id: &str) -> Result<Member> {
        self.request(&format!("members/{}", id)).await
    }

    async fn member_guild_settings(
        &self,
        member_id: &str,
        guild_id: &str,
    ) -> Result<MemberGuildSettings> {
        self.request(&format!("members/{}/guilds/{}", member_id, guild_id))
            .await
    }

    async fn system_guild_settings(
        &self,
        system_id: &str,
        guild_id: &str,
    ) -> Result<SystemGuildSettings> {
        self.request(&format!("systems/{}/guilds/{}", system_id, guild_id))
            .await
    }

    async fn message(&self, id: &str) -> Result<PkMessage> {
        self.request(&format!("messages/{}", id)).await
    }
}

/// Relative endpoints only join below the base if it ends with a slash
fn base_url(base: &str) -> Result<Url> {
    if base.ends_with('/') {
        Ok(Url::parse(base)?)
    } else {
        Ok(Url::parse(&format!("{}/", base))?)
    }
}

fn not_found(url: &Url, status: StatusCode) -> PkError {
    PkError::RemoteNotFound(format!("{} answered {}", url, status))
}
