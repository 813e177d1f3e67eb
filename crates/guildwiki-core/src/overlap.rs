//! Cross-guild member overlap.
//!
//! For guild G and every other known guild H the overlap is
//! `members(G) ∩ members(H)`, bots excluded on both sides. Only non-empty
//! intersections are recorded. Every pass rebuilds the whole table from the
//! in-memory rosters so A→B and B→A always describe the same ID set.

use std::collections::{BTreeMap, BTreeSet};

use crate::snapshot::{GuildSnapshot, MemberOverlap};

struct Roster<'a> {
    guild_id: &'a str,
    server_name: &'a str,
    member_ids: BTreeSet<&'a str>,
}

fn rosters(snapshots: &BTreeMap<String, GuildSnapshot>) -> Vec<Roster<'_>> {
    snapshots
        .iter()
        .map(|(guild_id, snapshot)| Roster {
            guild_id: guild_id.as_str(),
            server_name: if snapshot.info.name.is_empty() {
                "Unknown"
            } else {
                snapshot.info.name.as_str()
            },
            member_ids: snapshot.human_member_ids(),
        })
        .collect()
}

fn overlaps_for(own: &Roster<'_>, rosters: &[Roster<'_>]) -> BTreeMap<String, MemberOverlap> {
    rosters
        .iter()
        .filter(|other| other.guild_id != own.guild_id)
        .filter_map(|other| {
            // BTreeSet intersection yields IDs already sorted.
            let common: Vec<String> = own
                .member_ids
                .intersection(&other.member_ids)
                .map(|id| (*id).to_string())
                .collect();
            if common.is_empty() {
                return None;
            }
            Some((
                other.guild_id.to_string(),
                MemberOverlap {
                    server_name: other.server_name.to_string(),
                    common_count: common.len(),
                    common_member_ids: common,
                },
            ))
        })
        .collect()
}

/// Overlaps of `guild_id` against every other guild in `snapshots`.
///
/// Returns an empty map when `guild_id` is unknown.
#[must_use]
pub fn compute_overlaps(
    snapshots: &BTreeMap<String, GuildSnapshot>,
    guild_id: &str,
) -> BTreeMap<String, MemberOverlap> {
    let rosters = rosters(snapshots);
    rosters
        .iter()
        .find(|r| r.guild_id == guild_id)
        .map(|own| overlaps_for(own, &rosters))
        .unwrap_or_default()
}

/// Rebuild `member_overlaps` for every guild from the current rosters.
pub fn recompute_all_overlaps(snapshots: &mut BTreeMap<String, GuildSnapshot>) {
    let computed: Vec<(String, BTreeMap<String, MemberOverlap>)> = {
        let rosters = rosters(snapshots);
        rosters
            .iter()
            .map(|own| (own.guild_id.to_string(), overlaps_for(own, &rosters)))
            .collect()
    };

    for (guild_id, overlaps) in computed {
        if let Some(snapshot) = snapshots.get_mut(&guild_id) {
            snapshot.member_overlaps = overlaps;
        }
    }
}

#[cfg(test)]
#[path = "overlap_test.rs"]
mod tests;
