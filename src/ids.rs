use crate::error::{ConvertError, Result};
use crate::pgm::Id;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// IdGroup identifies the target records derived from one source table.
/// The optional name tells apart several records built from the same row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdGroup {
    pub table: String,
    pub name: Option<String>,
}

impl IdGroup {
    pub fn new(table: &str, name: Option<&str>) -> Self {
        Self {
            table: table.to_string(),
            name: name.map(String::from),
        }
    }
}

impl fmt::Display for IdGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "'{}' (name={})", self.table, name),
            None => write!(f, "'{}'", self.table),
        }
    }
}

/// Source reference of a single target id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdReference {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub index: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraInfoEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_reference: Option<IdReference>,
}

/// Sidecar annotation keyed by target id.
pub type ExtraInfo = BTreeMap<Id, ExtraInfoEntry>;

/// Bijection between the source indices and target ids of one group,
/// in allocation order.
#[derive(Debug, Clone, Default)]
struct IdMap {
    source: Vec<i64>,
    target: Vec<Id>,
    to_target: HashMap<i64, Id>,
    to_source: HashMap<Id, i64>,
}

impl IdMap {
    fn push(&mut self, index: i64, id: Id) -> Result<()> {
        if self.to_target.contains_key(&index) {
            return Err(ConvertError::InconsistentIdReference {
                id,
                reason: format!("source index {} is mapped twice", index),
            });
        }
        self.source.push(index);
        self.target.push(id);
        self.to_target.insert(index, id);
        self.to_source.insert(id, index);
        Ok(())
    }
}

/// IdRegistry assigns dense target ids to source rows and maps them back.
///
/// Ids are unique over all groups and handed out consecutively from 0 in
/// the order groups are allocated, so the same source data processed in the
/// same order always gets the same ids.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    groups: Vec<(IdGroup, IdMap)>,
    lookup: HashMap<IdGroup, usize>,
    owner: HashMap<Id, usize>,
    next_id: Id,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all groups and restarts numbering at 0.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Next id to be allocated.
    pub fn next_id(&self) -> Id {
        self.next_id
    }

    fn map(&self, table: &str, name: Option<&str>) -> Result<&IdMap> {
        let group = IdGroup::new(table, name);
        match self.lookup.get(&group) {
            Some(&i) => Ok(&self.groups[i].1),
            None => Err(ConvertError::UnknownGroup(group)),
        }
    }

    /// Allocates one new id per source index, in input order.
    pub fn allocate(&mut self, table: &str, indices: &[i64], name: Option<&str>) -> Result<Vec<Id>> {
        let group = IdGroup::new(table, name);
        if self.lookup.contains_key(&group) {
            return Err(ConvertError::DuplicateGroup(group));
        }

        let start = self.next_id;
        let mut map = IdMap::default();
        for (k, &index) in indices.iter().enumerate() {
            map.push(index, start + k as Id)?;
        }

        let g = self.groups.len();
        for &id in &map.target {
            self.owner.insert(id, g);
        }
        self.next_id = start + indices.len() as Id;
        log::debug!(
            "allocated ids {}..{} for {}",
            start,
            self.next_id,
            group
        );

        let ids = map.target.clone();
        self.lookup.insert(group.clone(), g);
        self.groups.push((group, map));
        Ok(ids)
    }

    /// Target ids of previously allocated source indices. Order and
    /// duplicates of `indices` are preserved.
    pub fn to_target(&self, table: &str, indices: &[i64], name: Option<&str>) -> Result<Vec<Id>> {
        let map = self.map(table, name)?;
        indices
            .iter()
            .map(|index| {
                map.to_target
                    .get(index)
                    .copied()
                    .ok_or_else(|| ConvertError::UnknownSourceIndex {
                        group: IdGroup::new(table, name),
                        index: *index,
                    })
            })
            .collect()
    }

    /// Source indices of previously allocated target ids.
    pub fn to_source(&self, table: &str, ids: &[Id], name: Option<&str>) -> Result<Vec<i64>> {
        let map = self.map(table, name)?;
        ids.iter()
            .map(|id| {
                map.to_source
                    .get(id)
                    .copied()
                    .ok_or(ConvertError::UnknownId(*id))
            })
            .collect()
    }

    /// Source reference of a single target id, whatever its group.
    pub fn resolve(&self, id: Id) -> Result<IdReference> {
        let &g = self.owner.get(&id).ok_or(ConvertError::UnknownId(id))?;
        let (group, map) = &self.groups[g];
        Ok(IdReference {
            table: group.table.clone(),
            name: group.name.clone(),
            index: map.to_source[&id],
        })
    }

    /// Replaces all state with the groups described by `entries`.
    ///
    /// Groups are created in order of their lowest id, and ids within a
    /// group keep ascending order.
    pub fn rebuild<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (Id, IdReference)>,
    {
        let mut sorted: Vec<(Id, IdReference)> = entries.into_iter().collect();
        sorted.sort_by_key(|(id, _)| *id);

        let mut registry = IdRegistry::default();
        for (id, reference) in sorted {
            if registry.owner.contains_key(&id) {
                return Err(ConvertError::InconsistentIdReference {
                    id,
                    reason: "id is referenced twice".to_string(),
                });
            }
            let group = IdGroup {
                table: reference.table,
                name: reference.name,
            };
            let g = match registry.lookup.get(&group) {
                Some(&g) => g,
                None => {
                    let g = registry.groups.len();
                    registry.lookup.insert(group.clone(), g);
                    registry.groups.push((group, IdMap::default()));
                    g
                }
            };
            registry.groups[g].1.push(reference.index, id)?;
            registry.owner.insert(id, g);
            registry.next_id = registry.next_id.max(id + 1);
        }

        log::debug!(
            "rebuilt {} id groups ({} ids)",
            registry.groups.len(),
            registry.owner.len()
        );
        *self = registry;
        Ok(())
    }

    /// Rebuilds from a sidecar annotation. Entries without an id reference
    /// are ignored.
    pub fn rebuild_from_extra_info(&mut self, extra_info: &ExtraInfo) -> Result<()> {
        self.rebuild(extra_info.iter().filter_map(|(&id, extra)| {
            extra.id_reference.clone().map(|reference| (id, reference))
        }))
    }

    /// Sidecar annotation with one id reference per allocated id.
    pub fn extra_info(&self) -> ExtraInfo {
        let mut extra_info = ExtraInfo::new();
        for (group, map) in &self.groups {
            for (&index, &id) in map.source.iter().zip(&map.target) {
                extra_info.insert(
                    id,
                    ExtraInfoEntry {
                        id_reference: Some(IdReference {
                            table: group.table.clone(),
                            name: group.name.clone(),
                            index,
                        }),
                    },
                );
            }
        }
        extra_info
    }
}
