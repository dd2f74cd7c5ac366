//! Genealogy records and kinship classification
//!
//! Genealogy stores ids, never owning references: the registry is a flat map
//! from agent id to record, and cleanup is just a map entry removal. Kinship
//! is a discrete classification, not a continuous coefficient, and is
//! symmetric by construction.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::AgentId;

/// Lineage record for one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenealogyRecord {
    pub id: AgentId,
    pub parent1: Option<AgentId>,
    /// Absent for initial spawns and asexual splits
    pub parent2: Option<AgentId>,
    pub generation: u32,
    /// Capped; oldest entries are evicted first
    pub offspring: Vec<AgentId>,
}

impl GenealogyRecord {
    pub fn founder(id: AgentId) -> Self {
        Self {
            id,
            parent1: None,
            parent2: None,
            generation: 0,
            offspring: Vec::new(),
        }
    }

    pub fn child(id: AgentId, parent1: AgentId, parent2: Option<AgentId>, generation: u32) -> Self {
        Self {
            id,
            parent1: Some(parent1),
            parent2,
            generation,
            offspring: Vec::new(),
        }
    }

    fn parents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.parent1.into_iter().chain(self.parent2)
    }
}

/// Discrete relatedness levels, closest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kinship {
    SelfSame,
    ParentChild,
    Sibling,
    GrandparentOrAuntUncle,
    DistantSameGeneration,
    Unrelated,
}

impl Kinship {
    /// Pairs at or closer than sibling are rejected for mating
    pub fn too_close_to_mate(&self) -> bool {
        *self <= Kinship::Sibling
    }
}

/// Flat id-keyed store of genealogy records
#[derive(Debug, Default)]
pub struct GenealogyRegistry {
    records: AHashMap<AgentId, GenealogyRecord>,
    offspring_cap: usize,
}

impl GenealogyRegistry {
    pub fn new(offspring_cap: usize) -> Self {
        Self {
            records: AHashMap::new(),
            offspring_cap,
        }
    }

    pub fn insert(&mut self, record: GenealogyRecord) {
        self.records.insert(record.id, record);
    }

    pub fn get(&self, id: AgentId) -> Option<&GenealogyRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a child to a parent's offspring list, evicting the oldest
    /// entry once the cap is reached
    pub fn record_offspring(&mut self, parent: AgentId, child: AgentId) {
        if let Some(record) = self.records.get_mut(&parent) {
            if record.offspring.len() >= self.offspring_cap {
                record.offspring.remove(0);
            }
            record.offspring.push(child);
        }
    }

    fn parents_of(&self, id: AgentId) -> Vec<AgentId> {
        self.records
            .get(&id)
            .map(|r| r.parents().collect())
            .unwrap_or_default()
    }

    fn grandparents_of(&self, id: AgentId) -> Vec<AgentId> {
        self.parents_of(id)
            .into_iter()
            .flat_map(|p| self.parents_of(p))
            .collect()
    }

    /// Classify how closely `a` and `b` are related
    ///
    /// Every check below tests both directions, so the classification is
    /// symmetric for any constructed graph.
    pub fn relatedness(&self, a: AgentId, b: AgentId) -> Kinship {
        if a == b {
            return Kinship::SelfSame;
        }

        let parents_a = self.parents_of(a);
        let parents_b = self.parents_of(b);

        if parents_a.contains(&b) || parents_b.contains(&a) {
            return Kinship::ParentChild;
        }

        if parents_a.iter().any(|p| parents_b.contains(p)) {
            return Kinship::Sibling;
        }

        let grandparents_a = self.grandparents_of(a);
        let grandparents_b = self.grandparents_of(b);

        // Grandparent line, or aunt/uncle (sibling of a parent)
        if grandparents_a.contains(&b)
            || grandparents_b.contains(&a)
            || parents_a.iter().any(|p| grandparents_b.contains(p))
            || parents_b.iter().any(|p| grandparents_a.contains(p))
        {
            return Kinship::GrandparentOrAuntUncle;
        }

        // Cousins: same generation sharing a grandparent
        let same_generation = match (self.records.get(&a), self.records.get(&b)) {
            (Some(ra), Some(rb)) => ra.generation == rb.generation,
            _ => false,
        };
        if same_generation && grandparents_a.iter().any(|g| grandparents_b.contains(g)) {
            return Kinship::DistantSameGeneration;
        }

        Kinship::Unrelated
    }

    /// Drop an agent's record. Offspring lists elsewhere keep the stale id
    /// harmlessly; they are read only for display and eviction.
    pub fn remove(&mut self, id: AgentId) {
        self.records.remove(&id);
    }
}
