//! HTTP client for the Discord REST API and CDN.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::DiscordError;
use crate::rate_limit::retry_with_backoff;
use crate::types::{Guild, GuildMember, PartialGuild};

/// `GET /users/@me/guilds` page size.
pub(crate) const GUILDS_PAGE_LIMIT: usize = 200;
/// `GET /guilds/{id}/members` page size.
pub(crate) const MEMBERS_PAGE_LIMIT: usize = 1000;
/// Guard against cursors that never advance.
pub(crate) const MAX_PAGES: usize = 500;

/// Bot-authenticated Discord REST client.
///
/// 429 and network failures are retried with exponential backoff; asset
/// downloads are attempted once.
pub struct DiscordClient {
    client: Client,
    api_base: String,
    cdn_base: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl DiscordClient {
    /// Build a client sending `Authorization: Bot <token>` on every request.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::InvalidToken`] when the token cannot be used
    /// as a header value, or [`DiscordError::Http`] when the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(
        api_base: &str,
        cdn_base: &str,
        token: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, DiscordError> {
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|e| DiscordError::InvalidToken(e.to_string()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            cdn_base: cdn_base.trim_end_matches('/').to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    /// Every guild the bot is a member of.
    ///
    /// # Errors
    ///
    /// Propagates request failures; returns [`DiscordError::PaginationLimit`]
    /// if the listing never ends.
    pub async fn list_guilds(&self) -> Result<Vec<PartialGuild>, DiscordError> {
        let mut guilds: Vec<PartialGuild> = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut route = format!("/users/@me/guilds?limit={GUILDS_PAGE_LIMIT}");
            if let Some(cursor) = &after {
                route.push_str(&format!("&after={cursor}"));
            }
            let page: Vec<PartialGuild> = self.get_json(&route, "guild list").await?;
            let full_page = page.len() >= GUILDS_PAGE_LIMIT;
            after = page.last().map(|g| g.id.clone());
            guilds.extend(page);
            if !full_page || after.is_none() {
                return Ok(guilds);
            }
        }

        Err(DiscordError::PaginationLimit {
            route: "/users/@me/guilds".to_owned(),
            max_pages: MAX_PAGES,
        })
    }

    /// Live guild metadata including approximate member/presence counts.
    ///
    /// # Errors
    ///
    /// Propagates request and deserialization failures.
    pub async fn fetch_guild(&self, guild_id: &str) -> Result<Guild, DiscordError> {
        self.get_json(
            &format!("/guilds/{guild_id}?with_counts=true"),
            &format!("guild {guild_id}"),
        )
        .await
    }

    /// The full member roster of a guild, following the `after` cursor.
    ///
    /// Requires the `GUILD_MEMBERS` privileged intent; without it Discord
    /// answers 403, surfaced as [`DiscordError::Forbidden`].
    ///
    /// # Errors
    ///
    /// Propagates request failures; returns [`DiscordError::PaginationLimit`]
    /// if the roster never ends.
    pub async fn fetch_members(&self, guild_id: &str) -> Result<Vec<GuildMember>, DiscordError> {
        let mut members: Vec<GuildMember> = Vec::new();
        let mut after = "0".to_owned();

        for page_number in 0..MAX_PAGES {
            let route =
                format!("/guilds/{guild_id}/members?limit={MEMBERS_PAGE_LIMIT}&after={after}");
            let page: Vec<GuildMember> = self
                .get_json(&route, &format!("members of guild {guild_id}"))
                .await?;
            let full_page = page.len() >= MEMBERS_PAGE_LIMIT;
            let next = page
                .iter()
                .filter_map(|m| m.user.as_ref())
                .filter_map(|u| u.id.parse::<u64>().ok())
                .max();
            members.extend(page);

            let Some(next) = next.map(|id| id.to_string()) else {
                return Ok(members);
            };
            if !full_page || next == after {
                return Ok(members);
            }
            tracing::debug!(guild_id, page = page_number + 1, after = %next, "fetching next member page");
            after = next;
        }

        Err(DiscordError::PaginationLimit {
            route: format!("/guilds/{guild_id}/members"),
            max_pages: MAX_PAGES,
        })
    }

    #[must_use]
    pub fn icon_url(&self, guild_id: &str, hash: &str) -> String {
        format!("{}/icons/{guild_id}/{hash}.png?size=1024", self.cdn_base)
    }

    #[must_use]
    pub fn banner_url(&self, guild_id: &str, hash: &str) -> String {
        format!("{}/banners/{guild_id}/{hash}.png?size=1024", self.cdn_base)
    }

    /// Download an asset once, without retries.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::NotFound`] / [`DiscordError::UnexpectedStatus`]
    /// for non-2xx responses and [`DiscordError::Http`] on network failure.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, DiscordError> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response, url)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        route: &str,
        context: &str,
    ) -> Result<T, DiscordError> {
        let url = format!("{}{route}", self.api_base);
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self.client.get(&url).send().await?;
                let response = check_status(response, route)?;
                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| DiscordError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })
            }
        })
        .await
    }
}

/// Map non-2xx responses onto typed errors.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn check_status(
    response: reqwest::Response,
    route: &str,
) -> Result<reqwest::Response, DiscordError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map_or(5, |secs| secs.ceil() as u64);
            Err(DiscordError::RateLimited {
                route: route.to_owned(),
                retry_after_secs,
            })
        }
        StatusCode::NOT_FOUND => Err(DiscordError::NotFound { url }),
        StatusCode::FORBIDDEN => Err(DiscordError::Forbidden { url }),
        _ => Err(DiscordError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        }),
    }
}
