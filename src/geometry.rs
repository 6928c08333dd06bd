use std::collections::HashSet;
use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MaterialConfig;

/// The three base shapes a decorative object can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Icosahedron,
    Octahedron,
    TorusKnot,
}

impl Archetype {
    pub const ALL: [Archetype; 3] = [
        Archetype::Icosahedron,
        Archetype::Octahedron,
        Archetype::TorusKnot,
    ];

    /// Maps a uniform draw in `[0, 1)` onto an archetype, one third each.
    pub fn from_draw(draw: f32) -> Self {
        if draw < 1.0 / 3.0 {
            Archetype::Icosahedron
        } else if draw < 2.0 / 3.0 {
            Archetype::Octahedron
        } else {
            Archetype::TorusKnot
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Archetype::Icosahedron => "icosahedron",
            Archetype::Octahedron => "octahedron",
            Archetype::TorusKnot => "torus-knot",
        }
    }

    fn build_mesh(self) -> Mesh {
        match self {
            Archetype::Icosahedron => icosahedron(1.0),
            Archetype::Octahedron => octahedron(0.8),
            Archetype::TorusKnot => torus_knot(TorusKnot::default()),
        }
    }
}

/// Indexed triangle mesh with its wireframe edge list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    /// Triangle list, three indices per face.
    pub indices: Vec<u32>,
    /// Unique undirected edges of the triangle list.
    pub edges: Vec<[u32; 2]>,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let edges = wireframe_edges(&indices);
        Self {
            positions,
            indices,
            edges,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flattened `xyz` positions ready for a vertex buffer.
    pub fn vertex_data(&self) -> Vec<f32> {
        self.positions
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }

    /// Edge endpoints as a flat line-list index buffer.
    pub fn line_indices(&self) -> Vec<u32> {
        self.edges.iter().flat_map(|edge| *edge).collect()
    }
}

/// Wireframe material applied to every shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub opacity: f32,
    pub wireframe: bool,
}

impl From<&MaterialConfig> for Material {
    fn from(config: &MaterialConfig) -> Self {
        Self {
            color: config.color,
            opacity: config.opacity,
            wireframe: true,
        }
    }
}

/// Geometry and material owned by one decorative object.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub archetype: Archetype,
    pub mesh: Mesh,
    pub material: Material,
}

/// Builds each archetype once and hands out independent clones.
#[derive(Debug, Clone)]
pub struct GeometryFactory {
    prototypes: [Mesh; 3],
    material: Material,
}

impl GeometryFactory {
    pub fn new(material: &MaterialConfig) -> Self {
        Self {
            prototypes: Archetype::ALL.map(Archetype::build_mesh),
            material: Material::from(material),
        }
    }

    /// Picks an archetype uniformly and returns a fresh copy of it.
    pub fn create<R: Rng + ?Sized>(&self, rng: &mut R) -> Geometry {
        self.create_archetype(Archetype::from_draw(rng.gen::<f32>()))
    }

    pub fn create_archetype(&self, archetype: Archetype) -> Geometry {
        Geometry {
            archetype,
            mesh: self.prototype(archetype).clone(),
            material: self.material.clone(),
        }
    }

    pub fn prototype(&self, archetype: Archetype) -> &Mesh {
        let index = match archetype {
            Archetype::Icosahedron => 0,
            Archetype::Octahedron => 1,
            Archetype::TorusKnot => 2,
        };
        &self.prototypes[index]
    }
}

impl Default for GeometryFactory {
    fn default() -> Self {
        Self::new(&MaterialConfig::default())
    }
}

fn wireframe_edges(indices: &[u32]) -> Vec<[u32; 2]> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for triangle in indices.chunks_exact(3) {
        for (a, b) in [
            (triangle[0], triangle[1]),
            (triangle[1], triangle[2]),
            (triangle[2], triangle[0]),
        ] {
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                edges.push([key.0, key.1]);
            }
        }
    }
    edges
}

fn icosahedron(radius: f32) -> Mesh {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    #[rustfmt::skip]
    let corners = [
        [-1.0, t, 0.0], [1.0, t, 0.0], [-1.0, -t, 0.0], [1.0, -t, 0.0],
        [0.0, -1.0, t], [0.0, 1.0, t], [0.0, -1.0, -t], [0.0, 1.0, -t],
        [t, 0.0, -1.0], [t, 0.0, 1.0], [-t, 0.0, -1.0], [-t, 0.0, 1.0],
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11,
        1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7, 1, 8,
        3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9,
        4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9, 8, 1,
    ];
    Mesh::new(project_to_sphere(&corners, radius), indices)
}

fn octahedron(radius: f32) -> Mesh {
    #[rustfmt::skip]
    let corners = [
        [1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, -1.0],
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 4, 0, 4, 3, 0, 3, 5, 0, 5, 2,
        1, 2, 5, 1, 5, 3, 1, 3, 4, 1, 4, 2,
    ];
    Mesh::new(project_to_sphere(&corners, radius), indices)
}

fn project_to_sphere(corners: &[[f32; 3]], radius: f32) -> Vec<Vec3> {
    corners
        .iter()
        .map(|corner| Vec3::from_array(*corner).normalize() * radius)
        .collect()
}

/// Parameters of a `(p, q)` torus knot tube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusKnot {
    pub radius: f32,
    pub tube: f32,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    pub p: f32,
    pub q: f32,
}

impl Default for TorusKnot {
    fn default() -> Self {
        Self {
            radius: 0.5,
            tube: 0.2,
            tubular_segments: 100,
            radial_segments: 16,
            p: 2.0,
            q: 3.0,
        }
    }
}

impl TorusKnot {
    fn curve_point(&self, u: f32) -> Vec3 {
        let qu_over_p = self.q / self.p * u;
        let cs = qu_over_p.cos();
        Vec3::new(
            self.radius * (2.0 + cs) * 0.5 * u.cos(),
            self.radius * (2.0 + cs) * 0.5 * u.sin(),
            self.radius * qu_over_p.sin() * 0.5,
        )
    }
}

fn torus_knot(knot: TorusKnot) -> Mesh {
    let tubular = knot.tubular_segments;
    let radial = knot.radial_segments;
    let mut positions = Vec::with_capacity(((tubular + 1) * (radial + 1)) as usize);

    for i in 0..=tubular {
        let u = i as f32 / tubular as f32 * knot.p * TAU;
        let p1 = knot.curve_point(u);
        let p2 = knot.curve_point(u + 0.01);

        // Frenet-like frame along the curve.
        let tangent = p2 - p1;
        let mut normal = p2 + p1;
        let binormal = tangent.cross(normal).normalize();
        normal = binormal.cross(tangent).normalize();

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * 2.0 * PI;
            let cx = -knot.tube * v.cos();
            let cy = knot.tube * v.sin();
            positions.push(p1 + normal * cx + binormal * cy);
        }
    }

    let mut indices = Vec::with_capacity((tubular * radial * 6) as usize);
    for j in 1..=tubular {
        for i in 1..=radial {
            let a = (radial + 1) * (j - 1) + (i - 1);
            let b = (radial + 1) * j + (i - 1);
            let c = (radial + 1) * j + i;
            let d = (radial + 1) * (j - 1) + i;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Mesh::new(positions, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn draw_thresholds_split_into_thirds() {
        assert_eq!(Archetype::from_draw(0.0), Archetype::Icosahedron);
        assert_eq!(Archetype::from_draw(0.333), Archetype::Icosahedron);
        assert_eq!(Archetype::from_draw(0.334), Archetype::Octahedron);
        assert_eq!(Archetype::from_draw(0.666), Archetype::Octahedron);
        assert_eq!(Archetype::from_draw(0.667), Archetype::TorusKnot);
        assert_eq!(Archetype::from_draw(0.9999), Archetype::TorusKnot);
    }

    #[test]
    fn polyhedra_have_expected_topology() {
        let ico = icosahedron(1.0);
        assert_eq!(ico.positions.len(), 12);
        assert_eq!(ico.triangle_count(), 20);
        assert_eq!(ico.edges.len(), 30);

        let octa = octahedron(0.8);
        assert_eq!(octa.positions.len(), 6);
        assert_eq!(octa.triangle_count(), 8);
        assert_eq!(octa.edges.len(), 12);
    }

    #[test]
    fn polyhedra_vertices_sit_on_their_radius() {
        for p in icosahedron(1.0).positions {
            assert!((p.length() - 1.0).abs() < 1e-5);
        }
        for p in octahedron(0.8).positions {
            assert!((p.length() - 0.8).abs() < 1e-5);
        }
    }

    #[test]
    fn torus_knot_grid_dimensions() {
        let knot = torus_knot(TorusKnot::default());
        assert_eq!(knot.positions.len(), 101 * 17);
        assert_eq!(knot.triangle_count(), 100 * 16 * 2);
        assert!(knot
            .indices
            .iter()
            .all(|&index| (index as usize) < knot.positions.len()));
        assert!(knot.positions.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn created_geometry_is_an_independent_copy() {
        let factory = GeometryFactory::default();
        let mut first = factory.create_archetype(Archetype::Octahedron);
        let second = factory.create_archetype(Archetype::Octahedron);
        first.mesh.positions[0] = Vec3::splat(42.0);
        first.material.opacity = 1.0;
        assert_ne!(first.mesh, second.mesh);
        assert_eq!(second.material.opacity, 0.3);
        assert_eq!(
            factory.prototype(Archetype::Octahedron),
            &second.mesh,
            "prototype must be untouched"
        );
    }

    #[test]
    fn archetype_frequencies_approach_one_third() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples = 30_000;
        let mut counts = [0usize; 3];
        for _ in 0..samples {
            let index = match Archetype::from_draw(rng.gen::<f32>()) {
                Archetype::Icosahedron => 0,
                Archetype::Octahedron => 1,
                Archetype::TorusKnot => 2,
            };
            counts[index] += 1;
        }
        for count in counts {
            let share = count as f64 / samples as f64;
            assert!((share - 1.0 / 3.0).abs() < 0.02, "share {share}");
        }
    }
}
