use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::item::MemoryItem;

/// Per-agent two-tier container.
///
/// Working is a bounded FIFO; long-term is unbounded unless the caller
/// sets a capacity. Items never share mutable state across tiers:
/// consolidation clones into long-term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMemoryStore {
    working: VecDeque<MemoryItem>,
    long_term: Vec<MemoryItem>,
}

impl AgentMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to working, evicting the oldest non-consolidated item once
    /// over capacity. Consolidated items are preferentially retained;
    /// when everything is consolidated the oldest goes.
    pub fn push_working(&mut self, item: MemoryItem, capacity: usize) {
        self.working.push_back(item);
        while self.working.len() > capacity {
            let victim = self
                .working
                .iter()
                .position(|m| !m.consolidated)
                .unwrap_or(0);
            let _ = self.working.remove(victim);
        }
    }

    /// Clone-into-long-term consolidation. The copy is deep by value
    /// semantics; mutating one tier cannot touch the other.
    pub fn consolidate(&mut self, item: &MemoryItem) {
        let mut copy = item.clone();
        copy.consolidated = true;
        self.long_term.push(copy);
    }

    /// Drop the lowest-importance long-term items once over capacity.
    /// Importance is compared after decay so stale items lose to fresh
    /// ones of equal initial weight.
    pub fn evict_long_term(&mut self, capacity: usize, decay_rate: f64, now_year: u32) {
        while self.long_term.len() > capacity {
            let victim = self
                .long_term
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.decayed_importance(now_year, decay_rate)
                        .total_cmp(&b.decayed_importance(now_year, decay_rate))
                        .then(a.seq.cmp(&b.seq))
                })
                .map(|(i, _)| i);
            match victim {
                Some(index) => {
                    self.long_term.remove(index);
                }
                None => break,
            }
        }
    }

    pub fn working(&self) -> impl Iterator<Item = &MemoryItem> {
        self.working.iter()
    }

    pub fn long_term(&self) -> impl Iterator<Item = &MemoryItem> {
        self.long_term.iter()
    }

    pub fn working_mut(&mut self) -> impl Iterator<Item = &mut MemoryItem> {
        self.working.iter_mut()
    }

    pub fn working_len(&self) -> usize {
        self.working.len()
    }

    pub fn long_term_len(&self) -> usize {
        self.long_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty() && self.long_term.is_empty()
    }
}
