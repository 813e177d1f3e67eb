use std::collections::HashMap;

use guildwiki_core::{GuildInfo, MemberRecord, MemberStatus};
use guildwiki_discord::{snowflake_timestamp, DiscordClient, Guild, GuildMember, PresenceCache};
use guildwiki_store::AssetKind;

use super::{GuildCapture, GuildSource};

/// Live guild state from the Discord REST API, with member statuses taken
/// from the gateway presence cache.
pub(crate) struct DiscordSource {
    client: DiscordClient,
    presence: PresenceCache,
}

impl DiscordSource {
    pub(crate) fn new(client: DiscordClient, presence: PresenceCache) -> Self {
        Self { client, presence }
    }
}

impl GuildSource for DiscordSource {
    async fn list_guild_ids(&self) -> anyhow::Result<Vec<String>> {
        let guilds = self.client.list_guilds().await?;
        Ok(guilds.into_iter().map(|g| g.id).collect())
    }

    async fn capture(&self, guild_id: &str) -> anyhow::Result<GuildCapture> {
        let guild = self.client.fetch_guild(guild_id).await?;
        let roster = self.client.fetch_members(guild_id).await?;
        let statuses = self.presence.guild(guild_id).await;
        Ok(build_capture(guild, &roster, statuses.as_ref()))
    }

    async fn download_asset(
        &self,
        guild_id: &str,
        kind: AssetKind,
        hash: &str,
    ) -> anyhow::Result<Vec<u8>> {
        let url = match kind {
            AssetKind::Icon => self.client.icon_url(guild_id, hash),
            AssetKind::Banner => self.client.banner_url(guild_id, hash),
        };
        Ok(self.client.download(&url).await?)
    }
}

/// Combine REST metadata, the roster, and cached presences into one capture.
///
/// `statuses` is `None` when the gateway has not delivered presence data for
/// the guild; every member is then `offline` and `online_count` falls back
/// to the approximate presence count.
fn build_capture(
    guild: Guild,
    roster: &[GuildMember],
    statuses: Option<&HashMap<String, MemberStatus>>,
) -> GuildCapture {
    let members: Vec<MemberRecord> = roster
        .iter()
        .filter_map(|member| {
            let user = member.user.as_ref()?;
            let status = statuses
                .and_then(|s| s.get(&user.id).copied())
                .unwrap_or_default();
            Some(MemberRecord {
                id: user.id.clone(),
                display_name: member.display_name(),
                is_bot: user.bot,
                status,
                joined_at: member.joined_at,
            })
        })
        .collect();

    let member_count = if members.is_empty() {
        guild.approximate_member_count.unwrap_or(0)
    } else {
        members.len() as u64
    };
    let online_count = match statuses {
        Some(_) => members.iter().filter(|m| m.status.is_online()).count() as u64,
        None => guild.approximate_presence_count.unwrap_or(0),
    };
    let owner = guild.owner_id.as_deref().and_then(|owner_id| {
        members
            .iter()
            .find(|m| m.id == owner_id)
            .map(|m| m.display_name.clone())
    });

    GuildCapture {
        info: GuildInfo {
            created_at: snowflake_timestamp(&guild.id),
            id: guild.id,
            name: guild.name,
            member_count,
            online_count,
            description: guild.description,
            owner_id: guild.owner_id,
            owner,
            icon_url: None,
            banner_url: None,
            premium_tier: guild.premium_tier,
            premium_subscription_count: guild.premium_subscription_count.unwrap_or(0),
            features: guild.features,
            vanity_url: guild.vanity_url_code,
        },
        members,
        icon_hash: guild.icon,
        banner_hash: guild.banner,
    }
}
