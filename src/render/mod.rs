//! Render engine contract and the per-frame render bridge

pub mod bridge;
pub mod scenery;

pub use bridge::RenderBridge;

use crate::engine::GeometryBuffer;
use crate::host::Camera;
use crate::pool::{ResourcePool, TeamColors};
use crate::util::math::{Rotator, Vec3};

/// First vertex of the cosmetic accessory region that is always drawn fully transparent
pub const COSMETIC_OVERRIDE_VERTEX_START: usize = 750 * 3;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

/// A dynamic mesh sized for one character
pub trait AvatarMesh: Send {
    fn vertices_mut(&mut self) -> &mut [Vertex];
    fn set_team_colors(&mut self, colors: &TeamColors);
    /// Upload the first `triangles` triangles and draw them; 0 clears the mesh
    fn upload(&mut self, triangles: usize, camera: Option<&Camera>);
}

/// Static or transform-driven scenery (ball, arena, vehicle ghosts)
pub trait SceneryMesh: Send {
    fn vertices_mut(&mut self) -> &mut [Vertex];
    fn upload(&mut self, triangles: usize, camera: &Camera);
    fn set_transform(&mut self, translation: Vec3, rotation: Rotator);
    fn render(&mut self, camera: &Camera);
    fn set_disabled(&mut self, disabled: bool);
}

/// Vehicle body family used to pick a ghost mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleBody {
    Octane,
    Dominus,
    Fennec,
}

impl VehicleBody {
    const OCTANE_ID: i32 = 23;
    const BREAKOUT_ID: i32 = 22;
    const DOMINUS_ID: i32 = 403;
    const FENNEC_ID: i32 = 4284;

    /// Map a host body id to the closest ghost mesh
    pub fn from_body_id(id: i32) -> Self {
        match id {
            Self::BREAKOUT_ID | Self::DOMINUS_ID => VehicleBody::Dominus,
            Self::FENNEC_ID => VehicleBody::Fennec,
            Self::OCTANE_ID => VehicleBody::Octane,
            _ => VehicleBody::Octane,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneryKind {
    Ball,
    Arena { max_triangles: usize },
    Vehicle(VehicleBody),
}

pub trait RenderEngine: Send + Sync {
    fn create_avatar_mesh(&self, max_triangles: usize, texture: &[u8]) -> Box<dyn AvatarMesh>;
    fn create_scenery(&self, kind: SceneryKind) -> Box<dyn SceneryMesh>;
}

pub type MeshPool = ResourcePool<Box<dyn AvatarMesh>>;

/// Copy engine geometry into a mesh's vertex buffer in host space.
/// Returns the number of triangles written.
pub fn write_geometry(geometry: &GeometryBuffer, vertices: &mut [Vertex]) -> usize {
    let triangles = geometry
        .triangles_used
        .min(geometry.max_triangles())
        .min(vertices.len() / 3);

    for (i, vertex) in vertices.iter_mut().take(triangles * 3).enumerate() {
        let p = &geometry.position[i * 3..i * 3 + 3];
        let n = &geometry.normal[i * 3..i * 3 + 3];
        let c = &geometry.color[i * 3..i * 3 + 3];
        let uv = &geometry.uv[i * 2..i * 2 + 2];

        vertex.position = Vec3::new(p[0], p[1], p[2]).to_host().to_array();
        vertex.normal = Vec3::new(n[0], n[1], n[2]).to_host().to_array();
        let alpha = if i >= COSMETIC_OVERRIDE_VERTEX_START {
            0.0
        } else {
            1.0
        };
        vertex.color = [c[0], c[1], c[2], alpha];
        vertex.uv = [uv[0], uv[1]];
    }

    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_geometry_swaps_axes() {
        let mut geometry = GeometryBuffer::with_capacity(2);
        geometry.position[..3].copy_from_slice(&[1.0, 2.0, 3.0]);
        geometry.normal[..3].copy_from_slice(&[0.0, 1.0, 0.0]);
        geometry.color[..3].copy_from_slice(&[0.5, 0.25, 0.125]);
        geometry.triangles_used = 1;

        let mut vertices = vec![Vertex::default(); 6];
        let written = write_geometry(&geometry, &mut vertices);

        assert_eq!(written, 1);
        assert_eq!(vertices[0].position, [1.0, 3.0, 2.0]);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[0].color, [0.5, 0.25, 0.125, 1.0]);
        assert_eq!(vertices[3], Vertex::default());
    }

    #[test]
    fn test_cosmetic_region_is_transparent() {
        let triangles = COSMETIC_OVERRIDE_VERTEX_START / 3 + 1;
        let mut geometry = GeometryBuffer::with_capacity(triangles);
        geometry.color.iter_mut().for_each(|c| *c = 1.0);
        geometry.triangles_used = triangles;

        let mut vertices = vec![Vertex::default(); triangles * 3];
        write_geometry(&geometry, &mut vertices);

        assert_eq!(vertices[COSMETIC_OVERRIDE_VERTEX_START - 1].color[3], 1.0);
        assert_eq!(vertices[COSMETIC_OVERRIDE_VERTEX_START].color[3], 0.0);
    }

    #[test]
    fn test_write_geometry_clamps_to_vertex_buffer() {
        let mut geometry = GeometryBuffer::with_capacity(4);
        geometry.triangles_used = 4;
        let mut vertices = vec![Vertex::default(); 6];
        assert_eq!(write_geometry(&geometry, &mut vertices), 2);
    }

    #[test]
    fn test_body_ids_map_to_ghosts() {
        assert_eq!(VehicleBody::from_body_id(22), VehicleBody::Dominus);
        assert_eq!(VehicleBody::from_body_id(4284), VehicleBody::Fennec);
        assert_eq!(VehicleBody::from_body_id(9999), VehicleBody::Octane);
    }
}
