//! globe-viewer
//!
//! An interactive viewer for a small hierarchical scene: a planet, its cloud shell and a
//! starfield sphere, seen through an orbit camera. Spheres are generated procedurally, the
//! scene graph is flattened into one shared vertex buffer and one index buffer with rebased
//! indices, and every frame is drawn by walking the graph in exactly the order it was packed.
//!
//! High-level modules
//! - `camera`: orbit camera with clamped latitude and zoom
//! - `config`: RON-loadable viewer configuration
//! - `context`: window surface, device and queue
//! - `data_structures`: generated geometry, shapes, the scene graph and GPU textures
//! - `error`: the crate's error type
//! - `layers`: texture layer visibility flags with change notification
//! - `pipelines`: the lit, textured globe pipeline
//! - `render`: buffer packing, draw traversal and the wgpu backend
//! - `resources`: texture roles, handles and asset loading
//! - `scene`: construction of the globe scene
//! - `viewer`: winit host mapping input onto camera, scene and layers
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod layers;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewer;

// Re-exports commonly used types for convenience in downstream code.
pub use camera::OrbitCamera;
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use render::Renderer;
pub use viewer::run;
