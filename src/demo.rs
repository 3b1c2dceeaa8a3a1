//! The demo scene: one orbit camera, two lights and five primitives.
//!
//! [`build_scene`] fills a [`Scene`] from a fixed parameter table, so two calls
//! always produce the same picture. [`SceneContext`] bundles the engine, the
//! scene and the ids of the created nodes for the resize and frame handlers.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Point3, Vector3};

use crate::{
    app::{FrameTick, SceneDriver},
    camera::ArcRotateCamera,
    data_structures::plane::Plane,
    engine::{Engine, FrameError},
    light::{HemisphericLight, LightSource, PointLight},
    mesh_builder::{
        BoxOptions, GroundOptions, LinesOptions, MeshBuilder, PlaneOptions, SideOrientation,
        SphereOptions,
    },
    scene::{NodeId, Scene},
};

/// Ids of everything [`build_scene`] creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneNodes {
    pub camera: NodeId,
    pub hemispheric_light: NodeId,
    pub point_light: NodeId,
    pub sphere: NodeId,
    pub box_mesh: NodeId,
    pub plane: NodeId,
    pub ground: NodeId,
    pub lines: NodeId,
}

pub fn build_scene(scene: &mut Scene) -> SceneNodes {
    let camera = create_camera(scene);
    let [hemispheric_light, point_light] = create_lights(scene);
    SceneNodes {
        camera,
        hemispheric_light,
        point_light,
        sphere: create_sphere(scene),
        box_mesh: create_box(scene),
        plane: create_plane(scene),
        ground: create_ground(scene),
        lines: create_line(scene),
    }
}

pub fn create_camera(scene: &mut Scene) -> NodeId {
    let target = Point3::new(0.0, 0.0, 0.0);
    ArcRotateCamera::create("Camera", FRAC_PI_2, FRAC_PI_2, 10.0, target, scene).id()
}

pub fn create_lights(scene: &mut Scene) -> [NodeId; 2] {
    let sky = HemisphericLight::create("light1", Vector3::new(1.0, 1.0, 0.0), scene).id();
    let bulb = PointLight::create("light2", Vector3::new(0.0, 1.0, -1.0), scene).id();
    [sky, bulb]
}

pub fn create_sphere(scene: &mut Scene) -> NodeId {
    let sphere = MeshBuilder::create_sphere(
        "sphere",
        SphereOptions {
            diameter: 2.0,
            ..Default::default()
        },
        scene,
    );
    sphere.position = Vector3::new(1.0, 4.0, -4.0);
    sphere.id()
}

pub fn create_box(scene: &mut Scene) -> NodeId {
    let cube = MeshBuilder::create_box(
        "box",
        BoxOptions {
            height: 2.0,
            width: 1.0,
            depth: 0.5,
            ..Default::default()
        },
        scene,
    );
    cube.position = Vector3::new(2.0, -1.0, 2.0);
    cube.rotation = Vector3::new(0.0, 0.5, 0.0);
    cube.id()
}

pub fn create_plane(scene: &mut Scene) -> NodeId {
    let mut source_plane = Plane::new(0.0, -1.0, 1.0, 0.0);
    source_plane.normalize();
    let plane = MeshBuilder::create_plane(
        "plane",
        PlaneOptions {
            height: 2.0,
            width: 1.0,
            source_plane: Some(source_plane),
            side_orientation: SideOrientation::Double,
        },
        scene,
    );
    plane.position = Vector3::new(-3.0, 0.0, -3.0);
    plane.rotation = Vector3::new(-0.2, 1.1, 0.0);
    plane.id()
}

pub fn create_ground(scene: &mut Scene) -> NodeId {
    let ground = MeshBuilder::create_ground(
        "ground",
        GroundOptions {
            height: 1.5,
            width: 2.5,
            subdivisions: 4,
        },
        scene,
    );
    ground.position = Vector3::new(0.0, -0.5, -2.0);
    ground.rotation = Vector3::new(0.4, 0.15, 0.0);
    ground.scaling = Vector3::new(1.25, 1.0, 4.0);
    ground.id()
}

pub fn create_line(scene: &mut Scene) -> NodeId {
    let points = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 1.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    let line = MeshBuilder::create_lines("lines", LinesOptions { points }, scene);
    line.position = Vector3::new(-1.0, 1.0, 0.0);
    line.rotation = Vector3::new(0.3, 2.1, 0.0);
    line.scaling = Vector3::new(3.0, 1.5, 3.0);
    line.id()
}

/// What the frame handler does with a failed surface acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFailure {
    /// Reconfigure the surface and keep going.
    Reconfigure,
    /// Drop this frame.
    Skip,
    /// Stop the render loop.
    Fatal,
}

impl FrameFailure {
    pub fn classify(error: &FrameError) -> Self {
        match error {
            FrameError::Lost | FrameError::Outdated => Self::Reconfigure,
            FrameError::Timeout | FrameError::Occluded => Self::Skip,
            FrameError::Validation => Self::Fatal,
        }
    }
}

/// Everything the resize and frame handlers work on.
#[derive(Debug)]
pub struct SceneContext {
    pub engine: Engine,
    pub scene: Scene,
    pub nodes: SceneNodes,
    /// Where to save the first rendered frame.
    pub capture: Option<std::path::PathBuf>,
    finished: bool,
}

impl SceneContext {
    /// Build the demo scene for `engine` and bind the camera to its surface, if any.
    pub fn new(engine: Engine, capture: Option<std::path::PathBuf>) -> Self {
        let mut scene = Scene::new();
        let nodes = build_scene(&mut scene);
        if let (Some(surface), Some(camera)) = (engine.surface(), scene.camera_mut(nodes.camera)) {
            camera.attach_control(surface, true);
        }
        log::info!(
            "scene {} built: {} camera(s), {} light(s), {} mesh(es)",
            scene.id(),
            scene.camera_count(),
            scene.light_count(),
            scene.mesh_count()
        );
        Self {
            engine,
            scene,
            nodes,
            capture,
            finished: false,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn save_capture(&mut self) -> anyhow::Result<()> {
        use anyhow::Context as _;

        let Some(path) = self.capture.take() else {
            return Ok(());
        };
        let image = futures::executor::block_on(self.engine.read_pixels())
            .context("could not read the first frame back")?;
        image
            .save(&path)
            .with_context(|| format!("could not save the capture to {}", path.display()))?;
        log::info!("saved frame {} to {}", self.engine.frame_count(), path.display());
        self.finished = true;
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn save_capture(&mut self) -> anyhow::Result<()> {
        if self.capture.take().is_some() {
            log::warn!("frame capture is not available in the browser");
        }
        Ok(())
    }
}

impl SceneDriver for SceneContext {
    fn resize(&mut self, width: u32, height: u32) {
        self.engine.resize(width, height);
    }

    fn render_frame(&mut self, tick: &FrameTick) -> anyhow::Result<()> {
        let error = match self.scene.render(&mut self.engine) {
            Ok(()) => return self.save_capture(),
            Err(e) => e,
        };
        match FrameFailure::classify(&error) {
            FrameFailure::Reconfigure => {
                log::debug!("{} at frame {}, reconfiguring", error, tick.frame);
                self.engine.reconfigure();
                Ok(())
            }
            FrameFailure::Skip => {
                log::warn!("{} at frame {}, skipping", error, tick.frame);
                Ok(())
            }
            FrameFailure::Fatal => Err(anyhow::Error::new(error)
                .context(format!("unable to render frame {}", tick.frame))),
        }
    }

    fn request_redraw(&self) {
        if let Some(surface) = self.engine.surface() {
            surface.request_redraw();
        }
    }

    fn finished(&self) -> bool {
        self.finished
    }
}
