//! Sparse hash grid behind the spatial-query boundary
//!
//! The core only ever asks for axis-aligned rectangle candidates; whoever
//! owns the world decides what index implements that. The grid here is the
//! default: rebuilt once per tick, never mutated mid-query.

use ahash::AHashMap;

use crate::core::types::{AgentId, Rect, Vec2};

/// What a spatial entry points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialRef {
    Agent(AgentId),
    /// Index into the world's food list
    Food(usize),
    /// Index into the world's pheromone pulse list
    Pulse(usize),
}

/// One indexed entity: reference, committed position, body radius
#[derive(Debug, Clone, Copy)]
pub struct SpatialEntry {
    pub target: SpatialRef,
    pub position: Vec2,
    pub radius: f32,
}

/// Rectangular range query over world entities
///
/// Returns candidates whose body overlaps the rectangle; exact distance
/// filtering is the caller's job. `out` is a caller-owned scratch buffer,
/// cleared by the implementation.
pub trait SpatialQuery {
    fn query_rect(&self, rect: Rect, out: &mut Vec<SpatialEntry>);
}

/// Sparse hash grid with O(1) cell lookup
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<SpatialEntry>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    pub fn insert(&mut self, entry: SpatialEntry) {
        if !entry.position.is_finite() {
            return;
        }
        let coord = self.cell_coord(entry.position);
        self.cells.entry(coord).or_default().push(entry);
    }

    /// Rebuild from scratch; called once per tick by the world
    pub fn rebuild(&mut self, entries: impl Iterator<Item = SpatialEntry>) {
        self.clear();
        for entry in entries {
            self.insert(entry);
        }
    }
}

impl SpatialQuery for SparseHashGrid {
    fn query_rect(&self, rect: Rect, out: &mut Vec<SpatialEntry>) {
        out.clear();
        let (min_cx, min_cy) = self.cell_coord(rect.min);
        let (max_cx, max_cy) = self.cell_coord(rect.max);

        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                let Some(cell) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for entry in cell {
                    // Inflate the rect by the entry's body radius so large
                    // bodies straddling the edge still come back
                    let inflated = Rect::new(
                        Vec2::new(rect.min.x - entry.radius, rect.min.y - entry.radius),
                        Vec2::new(rect.max.x + entry.radius, rect.max.y + entry.radius),
                    );
                    if inflated.contains(entry.position) {
                        out.push(*entry);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(x: f32, y: f32, idx: usize) -> SpatialEntry {
        SpatialEntry {
            target: SpatialRef::Food(idx),
            position: Vec2::new(x, y),
            radius: 2.0,
        }
    }

    #[test]
    fn test_query_rect_finds_entries_in_range() {
        let mut grid = SparseHashGrid::new(50.0);
        grid.insert(entry(10.0, 10.0, 0));
        grid.insert(entry(400.0, 400.0, 1));
        grid.insert(entry(30.0, 5.0, 2));

        let mut out = Vec::new();
        grid.query_rect(Rect::around(Vec2::new(15.0, 10.0), 40.0), &mut out);

        let found: Vec<usize> = out
            .iter()
            .filter_map(|e| match e.target {
                SpatialRef::Food(i) => Some(i),
                _ => None,
            })
            .collect();
        assert!(found.contains(&0));
        assert!(found.contains(&2));
        assert!(!found.contains(&1));
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut grid = SparseHashGrid::new(50.0);
        grid.insert(entry(10.0, 10.0, 0));
        grid.rebuild([entry(20.0, 20.0, 1)].into_iter());

        let mut out = Vec::new();
        grid.query_rect(Rect::around(Vec2::new(15.0, 15.0), 100.0), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, SpatialRef::Food(1));
    }

    #[test]
    fn test_non_finite_positions_rejected() {
        let mut grid = SparseHashGrid::new(50.0);
        grid.insert(SpatialEntry {
            target: SpatialRef::Food(0),
            position: Vec2::new(f32::NAN, 0.0),
            radius: 1.0,
        });
        let mut out = Vec::new();
        grid.query_rect(Rect::around(Vec2::default(), 1e6), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_radius_inflation_catches_straddlers() {
        let mut grid = SparseHashGrid::new(50.0);
        grid.insert(SpatialEntry {
            target: SpatialRef::Food(0),
            position: Vec2::new(102.0, 0.0),
            radius: 5.0,
        });
        let mut out = Vec::new();
        // Center just outside the rect, body overlapping it
        grid.query_rect(
            Rect::new(Vec2::new(0.0, -10.0), Vec2::new(100.0, 10.0)),
            &mut out,
        );
        assert_eq!(out.len(), 1);
    }
}
