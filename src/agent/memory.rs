//! Short-term memory, target memory, and goal memory
//!
//! Three small memory systems feed the perception vector: a ring of recent
//! frames, a cached reference to the nearest food/mate with a forgetting
//! horizon, and the currently prioritized behavioral goal.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{Tick, Vec2};

/// Number of frames the short-term memory ring holds
pub const MEMORY_FRAMES: usize = 8;

/// One remembered frame of the agent's own recent state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryFrame {
    pub speed: f32,
    pub energy_fraction: f32,
    pub danger: f32,
    pub aggression: f32,
    pub ray_hits: u32,
}

impl MemoryFrame {
    /// Compress the frame to a single danger-salience scalar for the
    /// perception vector. High danger or dense ray hits dominate.
    pub fn salience(&self) -> f32 {
        let hit_load = (self.ray_hits as f32 / 8.0).min(1.0);
        (self.danger * 0.5 + hit_load * 0.3 + self.aggression * 0.2).clamp(0.0, 1.0)
    }
}

/// Rolling ring of the last [`MEMORY_FRAMES`] frames, oldest evicted
#[derive(Debug, Clone, Default)]
pub struct ShortTermMemory {
    frames: VecDeque<MemoryFrame>,
}

impl ShortTermMemory {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::with_capacity(MEMORY_FRAMES),
        }
    }

    pub fn record(&mut self, frame: MemoryFrame) {
        if self.frames.len() >= MEMORY_FRAMES {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Salience values oldest-first, zero-padded to [`MEMORY_FRAMES`] so the
    /// perception vector width never changes
    pub fn saliences(&self) -> [f32; MEMORY_FRAMES] {
        let mut out = [0.0; MEMORY_FRAMES];
        let pad = MEMORY_FRAMES - self.frames.len();
        for (i, frame) in self.frames.iter().enumerate() {
            out[pad + i] = frame.salience();
        }
        out
    }

    pub fn latest(&self) -> Option<&MemoryFrame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// What kind of thing the target memory is holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Food,
    Mate,
}

/// Short-lived cached reference to the nearest perceived food or mate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetMemory {
    pub kind: TargetKind,
    pub position: Vec2,
    pub priority: f32,
    pub last_seen: Tick,
    /// Ticks after `last_seen` before the memory is forgotten
    pub attention_span: u32,
}

impl TargetMemory {
    pub fn is_stale(&self, now: Tick) -> bool {
        now.saturating_sub(self.last_seen) > u64::from(self.attention_span)
    }
}

/// The agent's currently prioritized behavioral objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    SeekFood,
    SeekMate,
    AvoidDanger,
    Rest,
}

/// Goal plus the bookkeeping needed for goal-completion fitness credit
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalMemory {
    pub goal: Goal,
    pub priority: f32,
    pub started: Tick,
}

impl GoalMemory {
    pub fn new(goal: Goal, priority: f32, now: Tick) -> Self {
        Self {
            goal,
            priority,
            started: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_ring_evicts_oldest() {
        let mut mem = ShortTermMemory::new();
        for i in 0..(MEMORY_FRAMES + 3) {
            mem.record(MemoryFrame {
                danger: i as f32 / 16.0,
                ..MemoryFrame::default()
            });
        }
        assert_eq!(mem.len(), MEMORY_FRAMES);
        // Oldest three frames were evicted, so the first remaining frame is
        // the fourth recorded
        let expected = 3.0 / 16.0;
        let first = mem.frames.front().unwrap();
        assert!((first.danger - expected).abs() < 1e-6);
    }

    #[test]
    fn test_saliences_zero_padded() {
        let mut mem = ShortTermMemory::new();
        mem.record(MemoryFrame {
            danger: 1.0,
            ray_hits: 8,
            aggression: 1.0,
            ..MemoryFrame::default()
        });
        let s = mem.saliences();
        assert_eq!(s.len(), MEMORY_FRAMES);
        for v in &s[..MEMORY_FRAMES - 1] {
            assert_eq!(*v, 0.0);
        }
        assert!(s[MEMORY_FRAMES - 1] > 0.9);
    }

    #[test]
    fn test_target_memory_staleness() {
        let t = TargetMemory {
            kind: TargetKind::Food,
            position: Vec2::default(),
            priority: 1.0,
            last_seen: 100,
            attention_span: 50,
        };
        assert!(!t.is_stale(120));
        assert!(!t.is_stale(150));
        assert!(t.is_stale(151));
    }
}
