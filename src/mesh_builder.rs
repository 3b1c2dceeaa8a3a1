//! Procedural geometry for the built-in primitives.
//!
//! Every `create_*` function generates [`VertexData`] from an options struct and
//! registers a new [`Mesh`] in the given [`Scene`]. The options are kept on the
//! mesh as its [`Shape`] so the parameters a mesh was built with can be
//! inspected later.
//!
//! Triangles are wound counter-clockwise when seen from the side their normal
//! points to.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

use crate::{
    data_structures::{
        mesh::{Mesh, ModelVertex, Topology, VertexData},
        plane::Plane,
    },
    scene::Scene,
};

/// Which faces of a mesh are generated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SideOrientation {
    #[default]
    Front,
    Back,
    /// Every face is emitted twice, once per side.
    Double,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SphereOptions {
    pub diameter: f32,
    pub segments: u32,
    pub side_orientation: SideOrientation,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            diameter: 1.0,
            segments: 32,
            side_orientation: SideOrientation::Front,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoxOptions {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub side_orientation: SideOrientation,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
            side_orientation: SideOrientation::Front,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaneOptions {
    pub width: f32,
    pub height: f32,
    /// Plane that sets the initial position and rotation. Expected to be normalized.
    pub source_plane: Option<Plane>,
    pub side_orientation: SideOrientation,
}

impl Default for PlaneOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            source_plane: None,
            side_orientation: SideOrientation::Front,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundOptions {
    pub width: f32,
    pub height: f32,
    pub subdivisions: u32,
}

impl Default for GroundOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            subdivisions: 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinesOptions {
    pub points: Vec<Vector3<f32>>,
}

/// The parameters a mesh was created from.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Sphere(SphereOptions),
    Box(BoxOptions),
    Plane(PlaneOptions),
    Ground(GroundOptions),
    Lines(LinesOptions),
}

impl Shape {
    pub fn vertex_data(&self) -> VertexData {
        match self {
            Shape::Sphere(options) => sphere_data(options),
            Shape::Box(options) => box_data(options),
            Shape::Plane(options) => plane_data(options),
            Shape::Ground(options) => ground_data(options),
            Shape::Lines(options) => lines_data(options),
        }
    }
}

pub struct MeshBuilder;

impl MeshBuilder {
    pub fn create_sphere<'s>(
        name: &str,
        options: SphereOptions,
        scene: &'s mut Scene,
    ) -> &'s mut Mesh {
        scene.add_mesh(name, Shape::Sphere(options))
    }

    pub fn create_box<'s>(name: &str, options: BoxOptions, scene: &'s mut Scene) -> &'s mut Mesh {
        scene.add_mesh(name, Shape::Box(options))
    }

    /// The rectangle is built facing -Z. A source plane only sets the initial
    /// transform: the mesh is moved onto the plane and turned so that its +Z
    /// axis follows the plane normal.
    pub fn create_plane<'s>(
        name: &str,
        options: PlaneOptions,
        scene: &'s mut Scene,
    ) -> &'s mut Mesh {
        let source_plane = options.source_plane;
        let mesh = scene.add_mesh(name, Shape::Plane(options));
        if let Some((position, rotation)) = source_plane.as_ref().and_then(source_plane_transform) {
            mesh.position = position;
            mesh.rotation = rotation;
        }
        mesh
    }

    pub fn create_ground<'s>(
        name: &str,
        options: GroundOptions,
        scene: &'s mut Scene,
    ) -> &'s mut Mesh {
        scene.add_mesh(name, Shape::Ground(options))
    }

    pub fn create_lines<'s>(
        name: &str,
        options: LinesOptions,
        scene: &'s mut Scene,
    ) -> &'s mut Mesh {
        scene.add_mesh(name, Shape::Lines(options))
    }
}

/// UV sphere with `segments` latitude rings and twice as many meridians.
pub fn sphere_data(options: &SphereOptions) -> VertexData {
    let radius = options.diameter / 2.0;
    let rings = options.segments.max(2);
    let meridians = rings * 2;
    let mut data = VertexData::new(Topology::Triangles);

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let theta = v * PI;
        for meridian in 0..=meridians {
            let u = meridian as f32 / meridians as f32;
            let phi = u * 2.0 * PI;
            let normal = [theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
            let position = normal.map(|n| n * radius);
            data.vertices.push(ModelVertex::new(position, normal, [u, v]));
        }
    }

    let stride = meridians + 1;
    for ring in 0..rings {
        for meridian in 0..meridians {
            let a = ring * stride + meridian;
            let b = a + stride;
            let c = a + 1;
            let d = b + 1;
            data.indices.extend_from_slice(&[a, c, b, c, d, b]);
        }
    }

    apply_side_orientation(&mut data, options.side_orientation);
    data
}

/// Box centred on the origin with four vertices per face.
pub fn box_data(options: &BoxOptions) -> VertexData {
    let half = Vector3::new(options.width, options.height, options.depth) / 2.0;
    // (normal, u, v) with u x v == normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    let mut data = VertexData::new(Topology::Triangles);
    for (normal, u, v) in faces {
        let (n, u, v): (Vector3<f32>, Vector3<f32>, Vector3<f32>) =
            (normal.into(), u.into(), v.into());
        push_quad(&mut data, n, u, v, |p| {
            Vector3::new(p.x * half.x, p.y * half.y, p.z * half.z)
        });
    }
    apply_side_orientation(&mut data, options.side_orientation);
    data
}

/// Rectangle in the XY plane facing -Z.
pub fn plane_data(options: &PlaneOptions) -> VertexData {
    let (half_w, half_h) = (options.width / 2.0, options.height / 2.0);
    let n = Vector3::new(0.0, 0.0, -1.0);
    let u = Vector3::new(-1.0, 0.0, 0.0);
    let v = Vector3::new(0.0, 1.0, 0.0);

    let mut data = VertexData::new(Topology::Triangles);
    push_quad(&mut data, n, u, v, |p| u * (p.dot(u) * half_w) + v * (p.dot(v) * half_h));
    apply_side_orientation(&mut data, options.side_orientation);
    data
}

/// Position and Euler rotation that put a mesh on `plane` with its +Z axis along the normal.
///
/// `None` for planes without a normal.
pub fn source_plane_transform(plane: &Plane) -> Option<(Vector3<f32>, Vector3<f32>)> {
    if plane.normal.magnitude2() == 0.0 {
        return None;
    }
    let direction = plane.normal.normalize();
    let horizontal = (direction.x * direction.x + direction.z * direction.z).sqrt();
    let pitch = (-direction.y).atan2(horizontal);
    let yaw = direction.x.atan2(direction.z);
    Some((plane.origin_point(), Vector3::new(pitch, yaw, 0.0)))
}

/// Flat grid in the XZ plane facing +Y.
pub fn ground_data(options: &GroundOptions) -> VertexData {
    let subdivisions = options.subdivisions.max(1);
    let mut data = VertexData::new(Topology::Triangles);
    for row in 0..=subdivisions {
        let t = row as f32 / subdivisions as f32;
        for col in 0..=subdivisions {
            let s = col as f32 / subdivisions as f32;
            data.vertices.push(ModelVertex::new(
                [
                    -options.width / 2.0 + s * options.width,
                    0.0,
                    -options.height / 2.0 + t * options.height,
                ],
                [0.0, 1.0, 0.0],
                [s, t],
            ));
        }
    }
    let stride = subdivisions + 1;
    for row in 0..subdivisions {
        for col in 0..subdivisions {
            let a = row * stride + col;
            let up = a + stride;
            data.indices.extend_from_slice(&[a, up, a + 1, a + 1, up, up + 1]);
        }
    }
    data
}

pub fn lines_data(options: &LinesOptions) -> VertexData {
    let mut data = VertexData::new(Topology::LineStrip);
    data.vertices = options
        .points
        .iter()
        .map(|p| ModelVertex::new((*p).into(), [0.0; 3], [0.0; 2]))
        .collect();
    data.indices = (0..data.vertices.len() as u32).collect();
    data
}

/// Appends a unit quad spanned by `u` and `v` around `n`, mapped through `place`.
fn push_quad(
    data: &mut VertexData,
    n: Vector3<f32>,
    u: Vector3<f32>,
    v: Vector3<f32>,
    place: impl Fn(Vector3<f32>) -> Vector3<f32>,
) {
    let base = data.vertices.len() as u32;
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    for (su, sv) in corners {
        let p = place(n + u * su + v * sv);
        data.vertices.push(ModelVertex::new(
            p.into(),
            n.into(),
            [(su + 1.0) / 2.0, (1.0 - sv) / 2.0],
        ));
    }
    data.indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

fn apply_side_orientation(data: &mut VertexData, orientation: SideOrientation) {
    let flip = |data: &VertexData| {
        let vertices: Vec<ModelVertex> = data
            .vertices
            .iter()
            .map(|v| ModelVertex {
                normal: v.normal.map(|c| -c),
                ..*v
            })
            .collect();
        let indices: Vec<u32> = data
            .indices
            .chunks(3)
            .flat_map(|tri| [tri[0], tri[2], tri[1]])
            .collect();
        (vertices, indices)
    };
    match orientation {
        SideOrientation::Front => (),
        SideOrientation::Back => {
            let (vertices, indices) = flip(data);
            data.vertices = vertices;
            data.indices = indices;
        }
        SideOrientation::Double => {
            let offset = data.vertices.len() as u32;
            let (mut vertices, indices) = flip(data);
            data.vertices.append(&mut vertices);
            data.indices.extend(indices.into_iter().map(|i| i + offset));
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Rotation;

    use super::*;
    use crate::data_structures::instance::Instance;

    fn face_normals_agree(data: &VertexData) -> bool {
        data.indices.chunks(3).all(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vector3::from(data.vertices[i as usize].position));
            let winding = (b - a).cross(c - a);
            let normal = Vector3::from(data.vertices[tri[0] as usize].normal);
            // degenerate pole triangles have no winding
            winding.magnitude() < 1e-6 || winding.dot(normal) > 0.0
        })
    }

    #[test]
    fn sphere_vertices_lie_on_the_radius() {
        let data = sphere_data(&SphereOptions {
            diameter: 2.0,
            ..Default::default()
        });
        assert_eq!(data.vertex_count(), 33 * 65);
        assert_eq!(data.index_count(), 32 * 64 * 6);
        assert!(data
            .vertices
            .iter()
            .all(|v| (Vector3::from(v.position).magnitude() - 1.0).abs() < 1e-5));
        assert!(face_normals_agree(&data));
    }

    #[test]
    fn box_has_expected_extents_and_outward_faces() {
        let data = box_data(&BoxOptions {
            height: 2.0,
            width: 1.0,
            depth: 0.5,
            ..Default::default()
        });
        assert_eq!(data.vertex_count(), 24);
        assert_eq!(data.index_count(), 36);
        assert_eq!(data.bounds(), Some(([-0.5, -1.0, -0.25], [0.5, 1.0, 0.25])));
        assert!(face_normals_agree(&data));
    }

    #[test]
    fn plane_without_source_faces_negative_z() {
        let data = plane_data(&PlaneOptions {
            width: 1.0,
            height: 2.0,
            ..Default::default()
        });
        assert_eq!(data.vertex_count(), 4);
        assert!(data.vertices.iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
        let (min, max) = data.bounds().unwrap();
        assert!((max[0] - min[0] - 1.0).abs() < 1e-6);
        assert!((max[1] - min[1] - 2.0).abs() < 1e-6);
        assert!(face_normals_agree(&data));
    }

    #[test]
    fn source_plane_does_not_tilt_the_geometry() {
        let plane = Plane::new(0.0, -1.0, 1.0, 0.0).normalized();
        let data = plane_data(&PlaneOptions {
            width: 1.0,
            height: 2.0,
            source_plane: Some(plane),
            side_orientation: SideOrientation::Double,
        });
        assert_eq!(data.vertex_count(), 8);
        assert_eq!(data.index_count(), 12);
        assert!(data.vertices.iter().all(|v| v.position[2] == 0.0));
        assert_eq!(data.vertices[0].normal, [0.0, 0.0, -1.0]);
        assert_eq!(data.vertices[4].normal, [0.0, 0.0, 1.0]);
        assert!(face_normals_agree(&data));
    }

    #[test]
    fn source_plane_sets_the_initial_transform() {
        let plane = Plane::new(0.0, -1.0, 1.0, 0.0).normalized();
        let mut scene = Scene::new();
        let mesh = MeshBuilder::create_plane(
            "plane",
            PlaneOptions {
                source_plane: Some(plane),
                ..Default::default()
            },
            &mut scene,
        );
        assert_eq!(mesh.position, Vector3::new(0.0, 0.0, 0.0));
        assert!((mesh.rotation.x - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert!(mesh.rotation.y.abs() < 1e-6);

        let forward = mesh.instance().rotation.rotate_vector(Vector3::unit_z());
        assert!((forward - plane.normal).magnitude() < 1e-5);
    }

    #[test]
    fn source_plane_transform_follows_any_normal() {
        for plane in [
            Plane::new(1.0, 0.0, 0.0, 0.0),
            Plane::new(0.0, 2.0, 0.0, -4.0),
            Plane::new(-1.0, 1.0, -1.0, 3.0),
        ] {
            let plane = plane.normalized();
            let (position, rotation) = source_plane_transform(&plane).unwrap();
            assert!(plane.signed_distance_to(position).abs() < 1e-5);
            let turned = Instance::from_euler(position, rotation, Vector3::new(1.0, 1.0, 1.0));
            let forward = turned.rotation.rotate_vector(Vector3::unit_z());
            assert!((forward - plane.normal).magnitude() < 1e-5, "{:?} -> {:?}", plane, forward);
        }
        assert!(source_plane_transform(&Plane::new(0.0, 0.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn transform_set_after_creation_replaces_the_source_plane_one() {
        let mut scene = Scene::new();
        let mesh = MeshBuilder::create_plane(
            "plane",
            PlaneOptions {
                source_plane: Some(Plane::new(0.0, 2.0, 0.0, -4.0).normalized()),
                ..Default::default()
            },
            &mut scene,
        );
        assert!((mesh.position.y - 2.0).abs() < 1e-5);
        mesh.position = Vector3::new(-3.0, 0.0, -3.0);
        mesh.rotation = Vector3::new(-0.2, 1.1, 0.0);
        assert_eq!(mesh.instance().position, Vector3::new(-3.0, 0.0, -3.0));
        assert_eq!(
            mesh.instance(),
            Instance::from_euler(
                Vector3::new(-3.0, 0.0, -3.0),
                Vector3::new(-0.2, 1.1, 0.0),
                Vector3::new(1.0, 1.0, 1.0)
            )
        );
    }

    #[test]
    fn ground_grid_is_subdivided() {
        let data = ground_data(&GroundOptions {
            width: 2.5,
            height: 1.5,
            subdivisions: 4,
        });
        assert_eq!(data.vertex_count(), 25);
        assert_eq!(data.index_count(), 96);
        assert_eq!(data.bounds(), Some(([-1.25, 0.0, -0.75], [1.25, 0.0, 0.75])));
        assert!(face_normals_agree(&data));
    }

    #[test]
    fn lines_follow_the_points_in_order() {
        let data = lines_data(&LinesOptions {
            points: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 1.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
        });
        assert_eq!(data.topology, Topology::LineStrip);
        assert_eq!(data.indices, vec![0, 1, 2]);
        assert_eq!(data.vertices[1].position, [0.0, 1.0, 1.0]);
    }

    #[test]
    fn back_orientation_reverses_winding() {
        let front = plane_data(&PlaneOptions::default());
        let back = plane_data(&PlaneOptions {
            side_orientation: SideOrientation::Back,
            ..Default::default()
        });
        assert_eq!(back.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(&back.indices[..3], &[front.indices[0], front.indices[2], front.indices[1]]);
        assert!(face_normals_agree(&back));
    }
}
