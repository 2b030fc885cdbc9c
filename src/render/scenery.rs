//! Ball, arena and vehicle ghost meshes

use std::collections::HashMap;

use crate::assets::Triangle;
use crate::host::{Ball, Camera, Vehicle};

use super::{RenderEngine, SceneryKind, SceneryMesh, VehicleBody, Vertex};

pub struct Scenery {
    ball: Box<dyn SceneryMesh>,
    arena: Box<dyn SceneryMesh>,
    arena_triangles: Vec<Triangle>,
    arena_uploaded: bool,
    ghosts: HashMap<VehicleBody, Box<dyn SceneryMesh>>,
}

impl Scenery {
    pub fn new(renderer: &dyn RenderEngine, arena_triangles: Vec<Triangle>) -> Self {
        let ghosts = [VehicleBody::Octane, VehicleBody::Dominus, VehicleBody::Fennec]
            .into_iter()
            .map(|body| (body, renderer.create_scenery(SceneryKind::Vehicle(body))))
            .collect();
        Self {
            ball: renderer.create_scenery(SceneryKind::Ball),
            arena: renderer.create_scenery(SceneryKind::Arena {
                max_triangles: arena_triangles.len(),
            }),
            arena_triangles,
            arena_uploaded: false,
            ghosts,
        }
    }

    pub fn render_ball(&mut self, ball: &dyn Ball, camera: &Camera) {
        self.ball.set_disabled(false);
        self.ball.set_transform(ball.location(), ball.rotation());
        self.ball.render(camera);
    }

    /// Upload the arena on first use (winding reversed), then just draw it
    pub fn render_arena(&mut self, camera: &Camera) {
        self.arena.set_disabled(false);
        if self.arena_uploaded {
            self.arena.render(camera);
            return;
        }

        let vertices = self.arena.vertices_mut();
        let triangles = self.arena_triangles.len().min(vertices.len() / 3);
        for (triangle, out) in self
            .arena_triangles
            .iter()
            .zip(vertices.chunks_exact_mut(3))
            .take(triangles)
        {
            for (corner, vertex) in triangle.iter().rev().zip(out.iter_mut()) {
                *vertex = Vertex {
                    position: corner.to_array(),
                    ..Vertex::default()
                };
            }
        }
        self.arena.upload(triangles, camera);
        self.arena_uploaded = true;
    }

    /// Draw the ghost mesh matching the vehicle's body at its transform
    pub fn render_ghost(&mut self, vehicle: &dyn Vehicle, camera: &Camera) {
        let body = VehicleBody::from_body_id(vehicle.body_id());
        if let Some(ghost) = self.ghosts.get_mut(&body) {
            ghost.set_disabled(false);
            ghost.set_transform(vehicle.location(), vehicle.rotation());
            ghost.render(camera);
        }
    }

    /// Hide everything until it is rendered again
    pub fn disable_all(&mut self) {
        self.ball.set_disabled(true);
        self.arena.set_disabled(true);
        for ghost in self.ghosts.values_mut() {
            ghost.set_disabled(true);
        }
    }
}
