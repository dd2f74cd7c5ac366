//! Neurofauna: an evolvable neural-agent simulation core
//!
//! Agents perceive the world through sensor rays, decide with a recurrent
//! controller evolved rather than trained, move under a physical energy
//! budget, signal each other chemically and vocally, and reproduce under a
//! fitness-gated genetic system with kinship tracking.
//!
//! The crate is deterministic per seed: the perception/decision phase runs
//! in parallel against committed state, and all mutation happens in a
//! sequential phase in stable arena order.

pub mod agent;
pub mod brain;
pub mod core;
pub mod fitness;
pub mod genetics;
pub mod movement;
pub mod perception;
pub mod signaling;
pub mod simulation;
pub mod world;

pub use crate::core::config::SimulationConfig;
pub use crate::core::error::{FaunaError, Result};
pub use crate::simulation::{Simulation, SimulationEvent};
pub use crate::world::World;
