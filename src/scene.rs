//! Construction of the globe scene: `root -> space -> earth -> earthClouds`.

use crate::{
    config::SceneConfig,
    data_structures::{
        scene_graph::{NodeId, SceneGraph, SceneNode, TexturePolicy},
        shape::Shape,
    },
    error::{Result, ViewerError},
    resources::{TextureProvider, TextureRole},
};

pub const ROOT: &str = "root";
pub const SPACE: &str = "space";
pub const EARTH: &str = "earth";
pub const EARTH_CLOUDS: &str = "earthClouds";

type SceneChanged = Box<dyn FnMut(&SceneGraph)>;

/// Builds the fixed globe scene and tells subscribers once it is complete.
pub struct SceneBuilder {
    config: SceneConfig,
    listeners: Vec<SceneChanged>,
}

impl SceneBuilder {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    /// Registers a callback run after every successful [`SceneBuilder::build`].
    pub fn on_scene_changed(&mut self, listener: impl FnMut(&SceneGraph) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Builds the scene, loading every texture through `textures`.
    ///
    /// A texture that cannot be loaded is logged and its role left empty, so the renderer binds
    /// the transparent placeholder in its place. Geometry errors abort the build.
    pub fn build(&mut self, textures: &mut dyn TextureProvider) -> Result<SceneGraph> {
        let config = &self.config;
        let placeholder = textures.transparent_placeholder()?;

        let mut graph = SceneGraph::new(SceneNode::new(ROOT, None));
        let root = graph.root();

        let space = Self::add_sphere(
            &mut graph,
            root,
            SPACE,
            TexturePolicy::Default,
            config.rasterization,
            config.space_radius,
        )?;

        let earth = Self::add_sphere(
            &mut graph,
            space,
            EARTH,
            TexturePolicy::PrimaryBody,
            config.rasterization,
            config.earth_radius,
        )?;
        if let Some(node) = graph.node_mut(earth) {
            node.rotate_to(90.0, 0.0, 0.0);
        }

        let clouds = Self::add_sphere(
            &mut graph,
            earth,
            EARTH_CLOUDS,
            TexturePolicy::CloudShell,
            config.rasterization,
            config.cloud_radius,
        )?;

        let assignments = [
            (space, &config.space_texture, &config.space_texture),
            (
                earth,
                &config.earth_diffuse_texture,
                &config.earth_specular_texture,
            ),
            (clouds, &config.cloud_texture, &config.cloud_texture),
        ];
        for (id, diffuse, specular) in assignments {
            let Some(shape) = graph.node_mut(id).and_then(SceneNode::shape_mut) else {
                continue;
            };
            for (role, path) in [(TextureRole::Diffuse, diffuse), (TextureRole::Specular, specular)]
            {
                match textures.load(path, role) {
                    Ok(handle) => shape.set_texture(role, handle),
                    Err(
                        e @ (ViewerError::AssetMissing(_) | ViewerError::ResourceExhausted(_)),
                    ) => log::warn!("{:?} texture {} unavailable: {}", role, path, e),
                    Err(e) => return Err(e),
                }
            }
            shape.set_texture(TextureRole::Transparent, placeholder);
        }

        log::info!(
            "Built scene with {} nodes at rasterization {}",
            graph.len(),
            config.rasterization
        );
        for listener in self.listeners.iter_mut() {
            listener(&graph);
        }
        Ok(graph)
    }

    fn add_sphere(
        graph: &mut SceneGraph,
        parent: NodeId,
        name: &str,
        policy: TexturePolicy,
        rasterization: u32,
        radius: f32,
    ) -> Result<NodeId> {
        let shape = Shape::sphere(rasterization, radius)?;
        graph.add_child(parent, SceneNode::new(name, Some(shape)).with_policy(policy))
    }
}
