use globe_viewer::{
    OrbitCamera,
    config::CameraConfig,
    data_structures::{
        geometry::FLOATS_PER_VERTEX,
        scene_graph::{SceneGraph, SceneNode},
        shape::Shape,
    },
    error::ViewerError,
    render::packing::PackedScene,
    scene::{EARTH, EARTH_CLOUDS, SPACE},
};

use crate::common::test_utils::{Call, packed_fixture, small_scene_config};

mod common;

fn camera() -> OrbitCamera {
    OrbitCamera::new(&CameraConfig::default(), 800.0 / 600.0).unwrap()
}

/// root -> (a: sphere 4, group -> (b: cube, c: sphere 6))
fn mixed_graph() -> SceneGraph {
    let mut graph = SceneGraph::default();
    let root = graph.root();
    graph
        .add_child(root, SceneNode::new("a", Some(Shape::sphere(4, 1.0).unwrap())))
        .unwrap();
    let group = graph.add_child(root, SceneNode::new("group", None)).unwrap();
    graph
        .add_child(group, SceneNode::new("b", Some(Shape::cube(1.0, 2.0, 3.0).unwrap())))
        .unwrap();
    graph
        .add_child(group, SceneNode::new("c", Some(Shape::sphere(6, 2.0).unwrap())))
        .unwrap();
    graph
}

#[test]
fn packed_sizes_match_the_graph() {
    let graph = mixed_graph();
    let packed = PackedScene::pack(&graph).unwrap();

    assert_eq!(packed.slots.len(), 3);
    assert_eq!(packed.vertex_bytes(), graph.vertex_buffer_size().unwrap());
    assert_eq!(packed.index_bytes(), graph.index_buffer_size().unwrap());
    assert_eq!(packed.vertices.len(), (25 + 8 + 49) * FLOATS_PER_VERTEX);
}

#[test]
fn slots_are_contiguous_in_pre_order() {
    let graph = mixed_graph();
    let packed = PackedScene::pack(&graph).unwrap();

    let names: Vec<&str> = packed
        .slots
        .iter()
        .map(|slot| graph.node(slot.node).unwrap().name())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);

    let mut vertex_offset = 0;
    let mut index_offset = 0;
    let mut first_vertex = 0;
    for slot in &packed.slots {
        let shape = graph.node(slot.node).unwrap().shape().unwrap();
        assert_eq!(slot.vertex_offset, vertex_offset);
        assert_eq!(slot.index_offset, index_offset);
        assert_eq!(slot.first_vertex, first_vertex);
        assert_eq!(slot.vertex_count as usize, shape.vertex_count());
        assert_eq!(slot.index_count as usize, shape.index_count());
        vertex_offset += shape.vertex_buffer_size();
        index_offset += shape.index_buffer_size();
        first_vertex += slot.vertex_count;
    }
}

#[test]
fn indices_are_rebased_into_their_own_vertex_range() {
    let graph = mixed_graph();
    let packed = PackedScene::pack(&graph).unwrap();

    for slot in &packed.slots {
        let shape = graph.node(slot.node).unwrap().shape().unwrap();
        let rebased = packed.slot_indices(slot);
        let local = shape.indices();
        assert_eq!(rebased.len(), local.len());
        for (&global, &own) in rebased.iter().zip(local) {
            assert_eq!(global, own + slot.first_vertex);
            assert!(slot.vertex_range().contains(&global));
        }
        assert_eq!(packed.slot_vertices(slot), shape.vertices());
    }
}

#[test]
fn initialize_uploads_each_slot_at_its_offset() {
    let fixture = packed_fixture(small_scene_config(8));
    let backend = fixture.renderer.backend();
    let packed = fixture.renderer.packed().unwrap();

    assert_eq!(
        backend.count(|c| matches!(c, Call::AllocateBuffers { .. })),
        1
    );
    assert!(backend.calls.contains(&Call::AllocateBuffers {
        vertex_bytes: fixture.graph.vertex_buffer_size().unwrap(),
        index_bytes: fixture.graph.index_buffer_size().unwrap(),
    }));
    for slot in &packed.slots {
        assert!(backend.calls.contains(&Call::VertexSubData {
            byte_offset: slot.vertex_offset,
            floats: slot.vertex_count as usize * FLOATS_PER_VERTEX,
        }));
        assert!(backend.calls.contains(&Call::IndexSubData {
            byte_offset: slot.index_offset,
            indices: slot.index_count as usize,
        }));
    }

    assert_eq!(backend.vertex_buffer, packed.vertices);
    assert_eq!(backend.index_buffer, packed.indices);
    assert_eq!(fixture.renderer.viewport(), (800, 600));
}

#[test]
fn every_shape_gets_a_vertex_array_at_its_pack_offset() {
    let fixture = packed_fixture(small_scene_config(8));
    let backend = fixture.renderer.backend();
    let packed = fixture.renderer.packed().unwrap();

    assert_eq!(backend.vertex_arrays.len(), 3);
    for slot in &packed.slots {
        let shape = fixture.graph.node(slot.node).unwrap().shape().unwrap();
        let handle = shape.vertex_array().unwrap();
        let layout = &backend.vertex_arrays[&handle];
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.pack_offset, slot.vertex_offset);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24]);
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.location).collect();
        assert_eq!(locations, [0, 1, 2]);
    }
}

#[test]
fn render_draws_in_pack_order_with_running_offsets() {
    let mut fixture = packed_fixture(small_scene_config(8));
    fixture
        .renderer
        .render(&fixture.graph, &camera())
        .unwrap();

    let packed = fixture.renderer.packed().unwrap().clone();
    let backend = fixture.renderer.backend();
    assert_eq!(backend.draws.len(), 3);
    for (draw, slot) in backend.draws.iter().zip(&packed.slots) {
        let shape = fixture.graph.node(slot.node).unwrap().shape().unwrap();
        assert_eq!(draw.count, slot.index_count);
        assert_eq!(draw.index_byte_offset, slot.index_offset);
        assert_eq!(draw.vertex_array, shape.vertex_array());
    }

    let order: Vec<&str> = packed
        .slots
        .iter()
        .map(|slot| fixture.graph.node(slot.node).unwrap().name())
        .collect();
    assert_eq!(order, [SPACE, EARTH, EARTH_CLOUDS]);

    // 8 + 2 * 8 * 3 triangles per sphere
    assert!(backend.draws.iter().all(|draw| draw.count == 168));
    assert_eq!(backend.calls.first(), Some(&Call::CreateProgram("Globe Shader".to_string())));
    assert_eq!(backend.calls.last(), Some(&Call::EndFrame));
}

#[test]
fn render_before_initialize_is_skipped() {
    let fixture = packed_fixture(small_scene_config(4));
    let mut renderer = globe_viewer::Renderer::new(
        common::test_utils::RecordingBackend::default(),
        fixture.layers.clone(),
        Default::default(),
        globe_viewer::resources::TextureHandle(0),
    );
    renderer.render(&fixture.graph, &camera()).unwrap();
    assert!(renderer.backend().calls.is_empty());
    assert!(!renderer.is_packed());
}

#[test]
fn changed_geometry_without_repack_is_rejected() {
    let mut fixture = packed_fixture(small_scene_config(8));
    let earth = fixture.graph.find(EARTH).unwrap();
    fixture
        .graph
        .node_mut(earth)
        .unwrap()
        .shape_mut()
        .unwrap()
        .set_rasterization(16)
        .unwrap();

    let err = fixture
        .renderer
        .render(&fixture.graph, &camera())
        .unwrap_err();
    assert!(matches!(err, ViewerError::InvalidGraph(_)));
    assert!(err.to_string().contains("reinitialize"));
}

#[test]
fn radius_change_without_repack_is_rejected() {
    let mut fixture = packed_fixture(small_scene_config(8));
    let earth = fixture.graph.find(EARTH).unwrap();
    let shape = fixture.graph.node_mut(earth).unwrap().shape_mut().unwrap();
    let counts = (shape.vertex_count(), shape.index_count());
    shape.set_radius(40.0).unwrap();
    assert_eq!((shape.vertex_count(), shape.index_count()), counts);

    let err = fixture
        .renderer
        .render(&fixture.graph, &camera())
        .unwrap_err();
    assert!(matches!(err, ViewerError::InvalidGraph(_)));
    assert!(err.to_string().contains("reinitialize"));

    fixture.renderer.reinitialize(&mut fixture.graph).unwrap();
    fixture
        .renderer
        .render(&fixture.graph, &camera())
        .unwrap();
    let packed = fixture.renderer.packed().unwrap();
    let slot = packed.slot(earth).unwrap();
    let shape = fixture.graph.node(earth).unwrap().shape().unwrap();
    assert_eq!(packed.slot_vertices(slot), shape.vertices());
    let start = (slot.vertex_offset / 4) as usize;
    assert_eq!(
        &fixture.renderer.backend().vertex_buffer[start..start + shape.vertices().len()],
        shape.vertices()
    );
}

#[test]
fn reinitialize_repacks_after_a_rasterization_change() {
    let mut fixture = packed_fixture(small_scene_config(8));
    for shape in fixture.graph.shapes_mut() {
        shape.set_rasterization(16).unwrap();
    }
    fixture.renderer.reinitialize(&mut fixture.graph).unwrap();
    fixture
        .renderer
        .render(&fixture.graph, &camera())
        .unwrap();

    let backend = fixture.renderer.backend();
    assert_eq!(backend.count(|c| matches!(c, Call::ReleaseBuffers)), 1);
    assert_eq!(backend.count(|c| matches!(c, Call::DeleteVertexArray(_))), 3);
    assert_eq!(backend.count(|c| matches!(c, Call::CreateProgram(_))), 1);
    assert_eq!(backend.vertex_arrays.len(), 3);
    assert_eq!(backend.vertex_buffer.len(), 3 * 17 * 17 * FLOATS_PER_VERTEX);
    assert_eq!(backend.draws.len(), 3);

    // 16 + 2 * 16 * 7 triangles per sphere
    assert!(backend.draws.iter().all(|draw| draw.count == 240 * 3));
    let offsets: Vec<u64> = backend.draws.iter().map(|d| d.index_byte_offset).collect();
    assert_eq!(offsets, [0, 720 * 4, 2 * 720 * 4]);
}

#[test]
fn initialize_twice_disposes_the_previous_pack() {
    let mut fixture = packed_fixture(small_scene_config(4));
    fixture
        .renderer
        .initialize(1024, 768, &mut fixture.graph)
        .unwrap();

    let backend = fixture.renderer.backend();
    assert_eq!(backend.count(|c| matches!(c, Call::AllocateBuffers { .. })), 2);
    assert_eq!(backend.count(|c| matches!(c, Call::ReleaseBuffers)), 1);
    assert_eq!(backend.vertex_arrays.len(), 3);
    assert_eq!(fixture.renderer.viewport(), (1024, 768));
}

#[test]
fn dispose_releases_everything_and_clears_vertex_arrays() {
    let mut fixture = packed_fixture(small_scene_config(4));
    fixture.renderer.dispose(&mut fixture.graph);

    assert!(!fixture.renderer.is_packed());
    assert!(fixture.renderer.backend().vertex_arrays.is_empty());
    for id in fixture.graph.shape_nodes().unwrap() {
        let shape = fixture.graph.node(id).unwrap().shape().unwrap();
        assert_eq!(shape.vertex_array(), None);
    }

    // disposing twice does not release the buffers again
    fixture.renderer.dispose(&mut fixture.graph);
    assert_eq!(
        fixture
            .renderer
            .backend()
            .count(|c| matches!(c, Call::ReleaseBuffers)),
        1
    );

    fixture
        .renderer
        .render(&fixture.graph, &camera())
        .unwrap();
    assert!(fixture.renderer.backend().draws.is_empty());
}

#[test]
fn oversized_buffers_fail_with_resource_exhausted() {
    let mut fixture = packed_fixture(small_scene_config(4));
    fixture.renderer.dispose(&mut fixture.graph);
    fixture.renderer.backend_mut().buffer_limit = Some(1024);
    for shape in fixture.graph.shapes_mut() {
        shape.set_rasterization(64).unwrap();
    }

    let err = fixture
        .renderer
        .initialize(800, 600, &mut fixture.graph)
        .unwrap_err();
    assert!(matches!(err, ViewerError::ResourceExhausted(_)));
    assert!(!fixture.renderer.is_packed());
}
