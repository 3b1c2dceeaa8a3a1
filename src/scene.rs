//! The scene container.
//!
//! A [`Scene`] owns every camera, light and mesh created for it. Nodes are
//! created through the constructors of their types (`ArcRotateCamera::create`,
//! `PointLight::create`, `MeshBuilder::create_box`, ...) which add them to a
//! scene and hand back a mutable reference for the one-time transform setup.
//!
//! Node ids embed the id of the scene that created them, so an id can never
//! resolve to a node of another scene.

use std::sync::atomic::{AtomicU32, Ordering};

use winit::event::WindowEvent;

use crate::{
    camera::ArcRotateCamera,
    data_structures::mesh::Mesh,
    engine::{Engine, FrameError},
    light::{HemisphericLight, LightSource, PointLight},
    mesh_builder::Shape,
};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    scene: u32,
    index: u32,
}

impl NodeId {
    pub fn scene(&self) -> u32 {
        self.scene
    }
}

/// Borrowed view of any node kind.
#[derive(Clone, Copy)]
pub enum Node<'a> {
    Camera(&'a ArcRotateCamera),
    Light(&'a dyn LightSource),
    Mesh(&'a Mesh),
}

impl Node<'_> {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Camera(camera) => camera.id(),
            Node::Light(light) => light.id(),
            Node::Mesh(mesh) => mesh.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Camera(camera) => camera.name(),
            Node::Light(light) => light.name(),
            Node::Mesh(mesh) => mesh.name(),
        }
    }
}

#[derive(Debug)]
pub struct Scene {
    id: u32,
    next_index: u32,
    cameras: Vec<ArcRotateCamera>,
    hemispheric_lights: Vec<HemisphericLight>,
    point_lights: Vec<PointLight>,
    meshes: Vec<Mesh>,
    active_camera: Option<NodeId>,
    pub clear_colour: wgpu::Color,
}

impl Scene {
    pub const DEFAULT_CLEAR_COLOUR: wgpu::Color = wgpu::Color {
        r: 0.2,
        g: 0.2,
        b: 0.3,
        a: 1.0,
    };

    pub fn new() -> Self {
        let id = NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("creating scene {}", id);
        Self {
            id,
            next_index: 0,
            cameras: Vec::new(),
            hemispheric_lights: Vec::new(),
            point_lights: Vec::new(),
            meshes: Vec::new(),
            active_camera: None,
            clear_colour: Self::DEFAULT_CLEAR_COLOUR,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn reserve_id(&mut self) -> NodeId {
        let id = NodeId {
            scene: self.id,
            index: self.next_index,
        };
        self.next_index += 1;
        id
    }

    fn owns(&self, id: NodeId) -> bool {
        id.scene == self.id
    }

    pub(crate) fn add_camera(
        &mut self,
        build: impl FnOnce(NodeId) -> ArcRotateCamera,
    ) -> &mut ArcRotateCamera {
        let id = self.reserve_id();
        if self.active_camera.is_none() {
            self.active_camera = Some(id);
        }
        self.cameras.push(build(id));
        let last = self.cameras.len() - 1;
        &mut self.cameras[last]
    }

    pub(crate) fn add_hemispheric_light(
        &mut self,
        build: impl FnOnce(NodeId) -> HemisphericLight,
    ) -> &mut HemisphericLight {
        let id = self.reserve_id();
        self.hemispheric_lights.push(build(id));
        let last = self.hemispheric_lights.len() - 1;
        &mut self.hemispheric_lights[last]
    }

    pub(crate) fn add_point_light(
        &mut self,
        build: impl FnOnce(NodeId) -> PointLight,
    ) -> &mut PointLight {
        let id = self.reserve_id();
        self.point_lights.push(build(id));
        let last = self.point_lights.len() - 1;
        &mut self.point_lights[last]
    }

    pub(crate) fn add_mesh(&mut self, name: &str, shape: Shape) -> &mut Mesh {
        let id = self.reserve_id();
        let geometry = shape.vertex_data();
        log::debug!(
            "mesh {} built with {} vertices and {} indices",
            name,
            geometry.vertex_count(),
            geometry.index_count()
        );
        self.meshes.push(Mesh::new(id, name, shape, geometry));
        let last = self.meshes.len() - 1;
        &mut self.meshes[last]
    }

    pub fn cameras(&self) -> impl Iterator<Item = &ArcRotateCamera> {
        self.cameras.iter()
    }

    pub fn lights(&self) -> impl Iterator<Item = &dyn LightSource> {
        self.hemispheric_lights
            .iter()
            .map(|light| light as &dyn LightSource)
            .chain(self.point_lights.iter().map(|light| light as &dyn LightSource))
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter()
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> Vec<Node<'_>> {
        let mut nodes: Vec<Node<'_>> = self
            .cameras
            .iter()
            .map(Node::Camera)
            .chain(self.lights().map(Node::Light))
            .chain(self.meshes.iter().map(Node::Mesh))
            .collect();
        nodes.sort_by_key(|node| node.id());
        nodes
    }

    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        if !self.owns(id) {
            return None;
        }
        self.nodes().into_iter().find(|node| node.id() == id)
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn light_count(&self) -> usize {
        self.hemispheric_lights.len() + self.point_lights.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn camera(&self, id: NodeId) -> Option<&ArcRotateCamera> {
        self.cameras.iter().find(|c| self.owns(id) && c.id() == id)
    }

    pub fn camera_mut(&mut self, id: NodeId) -> Option<&mut ArcRotateCamera> {
        let owned = self.owns(id);
        self.cameras.iter_mut().find(|c| owned && c.id() == id)
    }

    pub fn hemispheric_light(&self, id: NodeId) -> Option<&HemisphericLight> {
        self.hemispheric_lights.iter().find(|l| self.owns(id) && l.id() == id)
    }

    pub fn point_light(&self, id: NodeId) -> Option<&PointLight> {
        self.point_lights.iter().find(|l| self.owns(id) && l.id() == id)
    }

    pub fn mesh(&self, id: NodeId) -> Option<&Mesh> {
        self.meshes.iter().find(|m| self.owns(id) && m.id() == id)
    }

    pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut Mesh> {
        let owned = self.owns(id);
        self.meshes.iter_mut().find(|m| owned && m.id() == id)
    }

    pub fn get_mesh_by_name(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.name() == name)
    }

    pub fn active_camera(&self) -> Option<&ArcRotateCamera> {
        self.active_camera.and_then(|id| self.camera(id))
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut ArcRotateCamera> {
        let id = self.active_camera?;
        self.camera_mut(id)
    }

    pub fn set_active_camera(&mut self, id: NodeId) -> anyhow::Result<()> {
        if self.camera(id).is_none() {
            anyhow::bail!("node {:?} is not a camera of scene {}", id, self.id);
        }
        self.active_camera = Some(id);
        Ok(())
    }

    /// Route a window event to the controls of the active camera.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.active_camera_mut()
            .map(|camera| camera.handle_window_event(event))
            .unwrap_or(false)
    }

    /// Per-frame simulation step. Only the active camera's inertia moves anything.
    pub fn update(&mut self) {
        if let Some(camera) = self.active_camera_mut() {
            camera.update();
        }
    }

    /// Advance the scene by one frame and draw it with `engine`.
    pub fn render(&mut self, engine: &mut Engine) -> Result<(), FrameError> {
        self.update();
        engine.render(self)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{EuclideanSpace, Point3, Vector3};

    use super::*;
    use crate::mesh_builder::{BoxOptions, MeshBuilder};

    #[test]
    fn nodes_keep_creation_order() {
        let mut scene = Scene::new();
        let a = MeshBuilder::create_box("a", BoxOptions::default(), &mut scene).id();
        let b = PointLight::create("b", Vector3::new(0.0, 0.0, 0.0), &mut scene).id();
        let c = ArcRotateCamera::create("c", 0.0, 1.0, 5.0, Point3::origin(), &mut scene).id();
        let ids: Vec<NodeId> = scene.nodes().iter().map(Node::id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert_eq!(scene.node(b).map(|n| n.name().to_string()), Some("b".to_string()));
    }

    #[test]
    fn ids_do_not_resolve_in_other_scenes() {
        let mut first = Scene::new();
        let mut second = Scene::new();
        let in_first = MeshBuilder::create_box("box", BoxOptions::default(), &mut first).id();
        MeshBuilder::create_box("box", BoxOptions::default(), &mut second);

        assert!(first.mesh(in_first).is_some());
        assert!(second.mesh(in_first).is_none());
        assert!(second.mesh_mut(in_first).is_none());
        assert!(second.node(in_first).is_none());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn first_camera_becomes_active() {
        let mut scene = Scene::new();
        assert!(scene.active_camera().is_none());
        let origin = Point3::origin();
        let first = ArcRotateCamera::create("one", 0.0, 1.0, 5.0, origin, &mut scene).id();
        let second = ArcRotateCamera::create("two", 0.0, 1.0, 7.0, origin, &mut scene).id();
        assert_eq!(scene.active_camera().map(|c| c.id()), Some(first));
        scene.set_active_camera(second).unwrap();
        assert_eq!(scene.active_camera().map(|c| c.radius), Some(7.0));

        let mesh = MeshBuilder::create_box("box", BoxOptions::default(), &mut scene).id();
        assert!(scene.set_active_camera(mesh).is_err());
    }

    #[test]
    fn update_leaves_still_nodes_alone() {
        let mut scene = Scene::new();
        ArcRotateCamera::create("cam", 1.0, 1.0, 5.0, Point3::new(0.0, 0.0, 0.0), &mut scene)
            .bind_controls(true);
        let mesh = MeshBuilder::create_box("box", BoxOptions::default(), &mut scene);
        mesh.position = Vector3::new(1.0, 2.0, 3.0);

        let before = scene.meshes().map(Mesh::instance).collect::<Vec<_>>();
        let camera_before = scene.active_camera().map(|c| c.position());
        scene.update();
        scene.update();
        assert_eq!(scene.meshes().map(Mesh::instance).collect::<Vec<_>>(), before);
        assert_eq!(scene.active_camera().map(|c| c.position()), camera_before);
    }
}
