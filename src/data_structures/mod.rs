//! Scene data: generated geometry, shapes, the scene graph and GPU textures.
//!
//! - `geometry` generates interleaved vertex and index arrays for spheres, cubes and quads
//! - `shape` pairs generated geometry with a pose and texture slots
//! - `scene_graph` is the arena-backed node hierarchy the renderer packs and draws
//! - `texture` wraps wgpu textures and creation utilities

pub mod geometry;
pub mod scene_graph;
pub mod shape;
pub mod texture;
