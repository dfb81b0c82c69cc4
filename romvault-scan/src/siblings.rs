//! Sibling grouping
//!
//! Entries sharing any identical (provider, external id) pair are siblings;
//! grouping is transitive. Groups are computed with a disjoint-set over entry
//! indices, never by filename similarity.

use romvault_common::models::{ProviderId, RomEntry, SiblingGroup};
use std::collections::HashMap;
use uuid::Uuid;

/// Disjoint-set with union by rank and path compression
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiblingGrouper {
    region_priority: Vec<String>,
}

impl SiblingGrouper {
    pub fn new(region_priority: Vec<String>) -> Self {
        Self { region_priority }
    }

    fn region_rank(&self, entry: &RomEntry) -> usize {
        entry
            .tags
            .regions
            .iter()
            .filter_map(|region| {
                self.region_priority
                    .iter()
                    .position(|p| p.eq_ignore_ascii_case(region))
            })
            .min()
            .unwrap_or(self.region_priority.len())
    }

    /// Deterministic ordering key: title, region preference, revision, file name
    pub fn sort_key(&self, entry: &RomEntry) -> String {
        format!(
            "{}\0{:03}\0{}\0{}",
            entry.title().to_lowercase(),
            self.region_rank(entry),
            entry.tags.revision.as_deref().unwrap_or("").to_lowercase(),
            entry.fs_name
        )
    }

    /// Group the entries of one platform. Entries missing from disk are left out.
    pub fn group(&self, entries: &[RomEntry]) -> Vec<SiblingGroup> {
        let present: Vec<&RomEntry> = entries.iter().filter(|e| !e.missing_from_fs).collect();
        let mut sets = DisjointSet::new(present.len());

        let mut first_holder: HashMap<(ProviderId, &str), usize> = HashMap::new();
        for (index, entry) in present.iter().enumerate() {
            for (provider, external_id) in &entry.external_ids {
                match first_holder.get(&(*provider, external_id.as_str())) {
                    Some(&other) => sets.union(index, other),
                    None => {
                        first_holder.insert((*provider, external_id.as_str()), index);
                    }
                }
            }
        }

        let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
        for index in 0..present.len() {
            let root = sets.find(index);
            members.entry(root).or_default().push(index);
        }

        let mut groups: Vec<SiblingGroup> = members
            .into_values()
            .map(|indices| {
                let group: Vec<&RomEntry> = indices.iter().map(|&i| present[i]).collect();
                self.build_group(&group)
            })
            .collect();
        groups.sort_by_key(|g| g.id);
        groups
    }

    fn build_group(&self, group: &[&RomEntry]) -> SiblingGroup {
        let mut ids: Vec<Uuid> = group.iter().map(|e| e.id).collect();
        ids.sort();

        let flagged: Vec<&&RomEntry> = group.iter().filter(|e| e.user_main_sibling).collect();
        let pool: Vec<&&RomEntry> = if flagged.is_empty() {
            group.iter().collect()
        } else {
            flagged
        };
        let main = pool
            .into_iter()
            .min_by(|a, b| {
                self.sort_key(a)
                    .cmp(&self.sort_key(b))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|e| e.id)
            .unwrap_or(ids[0]);

        SiblingGroup {
            id: ids[0],
            platform_id: group[0].platform_id,
            members: ids,
            main,
        }
    }
}

/// Write group membership onto the entries.
///
/// Returns the indices of entries whose group or main flag changed. Entries
/// not in any group (missing from disk) lose their membership.
pub fn apply_groups(groups: &[SiblingGroup], entries: &mut [RomEntry]) -> Vec<usize> {
    let mut membership: HashMap<Uuid, (Uuid, bool)> = HashMap::new();
    for group in groups {
        for member in &group.members {
            membership.insert(*member, (group.id, *member == group.main));
        }
    }

    let mut changed = Vec::new();
    for (index, entry) in entries.iter_mut().enumerate() {
        let (group_id, is_main) = match membership.get(&entry.id) {
            Some(&(group_id, is_main)) => (Some(group_id), is_main),
            None => (None, false),
        };
        if entry.sibling_group != group_id || entry.is_main_sibling != is_main {
            entry.sibling_group = group_id;
            entry.is_main_sibling = is_main;
            changed.push(index);
        }
    }
    changed
}
