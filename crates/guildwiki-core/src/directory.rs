//! Load-once server directory with slug resolution.

use std::collections::{BTreeMap, HashMap};

use crate::slug::server_slug;
use crate::snapshot::GuildSnapshot;

/// Slug → guild ID mapping, assigned greedily in load order.
///
/// The first guild to claim a slug keeps it; later guilds with the same
/// canonical name (or a name that canonicalises to nothing) are routed by
/// their numeric ID instead. All-digit segments belong to guild IDs, so a
/// name that canonicalises to digits is routed by ID as well.
#[derive(Debug, Clone, Default)]
pub struct SlugIndex {
    by_slug: BTreeMap<String, String>,
    by_guild: HashMap<String, String>,
}

impl SlugIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a routable path segment for `guild_id` and return it.
    ///
    /// Assigning the same guild twice returns the segment it already holds.
    pub fn assign(&mut self, name: &str, guild_id: &str) -> String {
        if let Some(existing) = self.by_guild.get(guild_id) {
            return existing.clone();
        }

        let slug = server_slug(name);
        let taken = self.by_slug.contains_key(&slug);
        let routable = if slug.is_empty() || is_id_like(&slug) || taken {
            self.by_slug
                .insert(guild_id.to_string(), guild_id.to_string());
            guild_id.to_string()
        } else {
            self.by_slug.insert(slug.clone(), guild_id.to_string());
            slug
        };

        self.by_guild
            .insert(guild_id.to_string(), routable.clone());
        routable
    }

    #[must_use]
    pub fn lookup(&self, slug: &str) -> Option<&str> {
        self.by_slug.get(slug).map(String::as_str)
    }

    #[must_use]
    pub fn slug_for(&self, guild_id: &str) -> Option<&str> {
        self.by_guild.get(guild_id).map(String::as_str)
    }

    /// Every key in the index, sorted.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.by_slug.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}

fn is_id_like(segment: &str) -> bool {
    segment.bytes().all(|b| b.is_ascii_digit())
}

/// A guild resolved through the directory.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryEntry<'a> {
    pub guild_id: &'a str,
    pub slug: &'a str,
    pub snapshot: &'a GuildSnapshot,
}

/// Every guild snapshot the web service loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct ServerDirectory {
    snapshots: BTreeMap<String, GuildSnapshot>,
    slugs: SlugIndex,
}

impl ServerDirectory {
    /// Build the directory from `(guild_id, snapshot)` pairs in load order.
    ///
    /// Load order decides slug ownership, so callers pass documents sorted by
    /// file name.
    #[must_use]
    pub fn from_loaded(loaded: Vec<(String, GuildSnapshot)>) -> Self {
        let mut slugs = SlugIndex::new();
        let mut snapshots = BTreeMap::new();
        for (guild_id, snapshot) in loaded {
            let name = snapshot.display_name(&guild_id);
            slugs.assign(&name, &guild_id);
            snapshots.insert(guild_id, snapshot);
        }
        Self { snapshots, slugs }
    }

    /// Resolve a path segment: known slug first, then an all-digit guild ID.
    #[must_use]
    pub fn resolve(&self, query: &str) -> Option<DirectoryEntry<'_>> {
        let guild_id = match self.slugs.lookup(query) {
            Some(id) => id,
            None if !query.is_empty() && is_id_like(query) => query,
            None => return None,
        };
        self.entry(guild_id)
    }

    fn entry(&self, guild_id: &str) -> Option<DirectoryEntry<'_>> {
        let (guild_id, snapshot) = self.snapshots.get_key_value(guild_id)?;
        Some(DirectoryEntry {
            guild_id,
            slug: self.slugs.slug_for(guild_id).unwrap_or(guild_id),
            snapshot,
        })
    }

    /// All guilds ordered by lower-cased display name, then guild ID.
    #[must_use]
    pub fn sorted_by_name(&self) -> Vec<DirectoryEntry<'_>> {
        let mut entries: Vec<DirectoryEntry<'_>> = self
            .snapshots
            .keys()
            .filter_map(|id| self.entry(id))
            .collect();
        entries.sort_by_cached_key(|e| {
            (
                e.snapshot.display_name(e.guild_id).to_lowercase(),
                e.guild_id.to_string(),
            )
        });
        entries
    }

    pub fn guild_ids(&self) -> impl Iterator<Item = &str> {
        self.snapshots.keys().map(String::as_str)
    }

    #[must_use]
    pub fn slug_index(&self) -> &SlugIndex {
        &self.slugs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::GuildInfo;

    fn named(id: &str, name: &str) -> (String, GuildSnapshot) {
        (
            id.to_string(),
            GuildSnapshot {
                info: GuildInfo {
                    id: id.to_string(),
                    name: name.to_string(),
                    member_count: 5,
                    ..GuildInfo::default()
                },
                ..GuildSnapshot::default()
            },
        )
    }

    #[test]
    fn first_loaded_name_wins_slug() {
        let mut index = SlugIndex::new();
        assert_eq!(index.assign("Night Owls", "1"), "night-owls");
        assert_eq!(index.assign("night owls!", "2"), "2");
        assert_eq!(index.lookup("night-owls"), Some("1"));
        assert_eq!(index.slug_for("2"), Some("2"));
    }

    #[test]
    fn empty_slug_falls_back_to_id() {
        let mut index = SlugIndex::new();
        assert_eq!(index.assign("Клуб", "77"), "77");
        assert_eq!(index.lookup("77"), Some("77"));
    }

    #[test]
    fn reassigning_same_guild_is_stable() {
        let mut index = SlugIndex::new();
        let first = index.assign("Alpha", "1");
        let again = index.assign("Alpha", "1");
        assert_eq!(first, again);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn assignment_is_deterministic_for_fixed_order() {
        let docs = || vec![named("10", "Same"), named("20", "Same"), named("30", "Other")];
        let a = ServerDirectory::from_loaded(docs());
        let b = ServerDirectory::from_loaded(docs());
        let slugs_a: Vec<&str> = a.slug_index().slugs().collect();
        let slugs_b: Vec<&str> = b.slug_index().slugs().collect();
        assert_eq!(slugs_a, slugs_b);
        assert_eq!(a.slug_index().lookup("same"), Some("10"));
        assert_eq!(a.slug_index().slug_for("20"), Some("20"));
    }

    #[test]
    fn lookup_by_slug_and_id_return_same_record() {
        let dir = ServerDirectory::from_loaded(vec![named("123", "Night Owls")]);
        let by_slug = dir.resolve("night-owls").expect("slug");
        let by_id = dir.resolve("123").expect("id");
        assert_eq!(by_slug.guild_id, by_id.guild_id);
        assert_eq!(by_slug.snapshot, by_id.snapshot);
        assert_eq!(by_id.slug, "night-owls");
    }

    #[test]
    fn unknown_query_is_not_found() {
        let dir = ServerDirectory::from_loaded(vec![named("123", "Night Owls")]);
        assert!(dir.resolve("day-owls").is_none());
        assert!(dir.resolve("999").is_none());
        assert!(dir.resolve("").is_none());
    }

    #[test]
    fn sorted_by_lowercased_name() {
        let dir = ServerDirectory::from_loaded(vec![
            named("1", "beta"),
            named("2", "Alpha"),
            named("3", "gamma"),
        ]);
        let ids: Vec<&str> = dir.sorted_by_name().iter().map(|e| e.guild_id).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn numeric_name_never_shadows_another_guild_id() {
        let dir = ServerDirectory::from_loaded(vec![named("1", "42"), named("42", "Dup42")]);

        assert_eq!(dir.slug_index().slug_for("1"), Some("1"));
        assert_eq!(dir.resolve("42").expect("id route").guild_id, "42");
        assert_eq!(dir.resolve("1").expect("id route").guild_id, "1");
        assert_eq!(dir.resolve("dup42").expect("slug").guild_id, "42");
    }

    #[test]
    fn id_fallback_keeps_every_guild_reachable() {
        let mut index = SlugIndex::new();
        assert_eq!(index.assign("Alpha", "1"), "alpha");
        assert_eq!(index.assign("Alpha", "2"), "2");
        assert_eq!(index.assign("", "3"), "3");
        for id in ["1", "2", "3"] {
            let segment = index.slug_for(id).expect("segment");
            assert_eq!(index.lookup(segment), Some(id));
        }
    }

    #[test]
    fn blank_name_uses_placeholder_slug() {
        let dir = ServerDirectory::from_loaded(vec![named("42", "")]);
        let entry = dir.resolve("server-42").expect("placeholder slug");
        assert_eq!(entry.guild_id, "42");
    }
}
