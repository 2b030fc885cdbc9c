//! Bridging host vehicles and simulated avatars
//!
//! Host space is Z-up and simulation space Y-up; every value crossing
//! between them goes through [`Vec3::to_sim`] or [`Vec3::to_host`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::audio::{AudioBridge, SoundEmitter};
use crate::engine::{AttackInput, SimHandle};
use crate::host::{Camera, ControllerInput, HostGame, PlayerId, Vehicle};
use crate::net::NetworkSync;
use crate::util::math::{yaw_from_face_angle, Rotator, Vec3, CAR_OFFSET_Z};
use crate::util::time::ball_cooldown_ticks;

use super::instance::{AvatarInstance, InstanceRef};
use super::interaction::{apply_attack_damage, ball_impulse, is_hit_by, InteractionTuning, BOOST_EMPTY};
use super::store::InstanceStore;

pub struct SimulationBridge {
    store: Arc<InstanceStore>,
    sync: Arc<NetworkSync>,
    host: Arc<dyn HostGame>,
    audio: Arc<AudioBridge>,
    tuning: InteractionTuning,
    interpolation_factor: AtomicU32,
}

impl SimulationBridge {
    pub fn new(
        store: Arc<InstanceStore>,
        sync: Arc<NetworkSync>,
        host: Arc<dyn HostGame>,
        audio: Arc<AudioBridge>,
        tuning: InteractionTuning,
    ) -> Self {
        Self {
            store,
            sync,
            host,
            audio,
            tuning,
            interpolation_factor: AtomicU32::new(1),
        }
    }

    pub fn tuning(&self) -> &InteractionTuning {
        &self.tuning
    }

    pub fn interpolation_factor(&self) -> u32 {
        self.interpolation_factor.load(Ordering::Relaxed)
    }

    pub fn set_interpolation_factor(&self, factor: u32) {
        self.interpolation_factor.store(factor.max(1), Ordering::Relaxed);
    }

    /// Advance a locally driven avatar one step from its vehicle's input.
    ///
    /// Takes the store lock for the attack scan, so callers must not hold it.
    pub fn tick(&self, instance: &InstanceRef, vehicle: &dyn Vehicle) {
        let (player_id, is_car_mode) = {
            let guard = instance.lock();
            (guard.player_id, guard.is_car_mode)
        };
        if is_car_mode {
            return;
        }

        let (pre_round, boost) = {
            let settings = self.sync.settings().lock();
            (settings.pre_round, settings.boost)
        };
        let engine = self.store.engine();
        let attackers = if engine.should_update() {
            self.attack_candidates(player_id)
        } else {
            Vec::new()
        };
        let controls = if pre_round {
            None
        } else {
            vehicle.controller_input()
        };
        let camera = self.host.camera();
        let location = vehicle.location();

        let mut guard = instance.lock();
        let avatar: &mut AvatarInstance = &mut guard;

        if !avatar.handle.is_active() {
            if avatar.handle == SimHandle::Failed {
                return;
            }
            avatar.spawn_rotation = vehicle.rotation();
            let [x, y, z] = location.to_sim_spawn();
            avatar.handle = SimHandle::from_create(engine.create(x, y, z));
            if !avatar.handle.is_active() {
                warn!(player_id, "Simulation engine refused to create an avatar");
                return;
            }
            debug!(player_id, handle = avatar.handle.raw(), "Avatar spawned");
        } else if avatar.is_desynchronized() {
            if let Some(id) = avatar.handle.active() {
                engine.delete(id);
            }
            let [x, y, z] = location.to_sim_spawn();
            avatar.handle = SimHandle::from_create(engine.create(x, y, z));
            debug!(player_id, handle = avatar.handle.raw(), "Desynchronized avatar respawned");
            if !avatar.handle.is_active() {
                warn!(player_id, "Simulation engine refused to respawn an avatar");
                return;
            }
        }

        let input = &mut avatar.input;
        match controls {
            Some(controls) => {
                input.button_a = controls.jump;
                input.button_b = controls.handbrake;
                input.button_z = controls.throttle < 0.0;
                input.stick_x = controls.steer;
                input.stick_y = controls.pitch;
            }
            None => input.neutralize_controls(),
        }
        if let Some(camera) = &camera {
            let sim_camera = camera.location.to_sim();
            input.cam_look_x = avatar.body.state.position.x - sim_camera.x;
            input.cam_look_z = avatar.body.state.position.z - sim_camera.z;
        }
        let boost_left = vehicle.boost_amount().unwrap_or(0.0);
        input.is_boosting =
            !pre_round && controls.is_some_and(|c| c.holding_boost) && boost_left >= BOOST_EMPTY;
        input.boost = boost;

        input.attack = AttackInput::default();
        let own = avatar.body.state.position;
        if let Some((attacker, _)) = attackers
            .iter()
            .find(|(other, action)| is_hit_by(&self.tuning, own, *other, *action))
        {
            trace!(player_id, "Avatar hit by another avatar");
            input.attack = AttackInput {
                is_attacked: true,
                attacker_position: *attacker,
            };
        }

        if self.host.is_paused() {
            return;
        }
        let Some(id) = avatar.handle.active() else {
            return;
        };
        avatar.input.is_input = true;
        avatar.input.grant_cosmetic = true;
        engine.step(id, &avatar.input, &mut avatar.body, &mut avatar.geometry);

        if vehicle.is_local() || self.sync.is_host() {
            write_vehicle(avatar, vehicle);
        }

        if !avatar.body.state.is_update_frame {
            return;
        }
        if let Some(camera) = &camera {
            let emitter = emitter(avatar, camera);
            self.audio
                .update_sounds(avatar.body.state.sound_mask, &emitter, &mut avatar.audio);
        }
        let body = avatar.body;
        drop(guard);

        self.sync.broadcast_state(player_id, &body);
    }

    /// Step a replicated avatar for animation only, creating its simulation
    /// at the replicated position if needed
    pub fn step_replica(&self, avatar: &mut AvatarInstance, camera: Option<&Camera>) {
        let engine = self.store.engine();
        if avatar.handle == SimHandle::Uninitialized {
            let [x, y, z] = avatar.body.state.position.to_spawn_coords();
            avatar.handle = SimHandle::from_create(engine.create(x, y, z));
            if !avatar.handle.is_active() {
                warn!(player_id = avatar.player_id, "Simulation engine refused a replica");
            }
        }
        let Some(id) = avatar.handle.active() else {
            return;
        };

        avatar.input.is_input = false;
        avatar.input.grant_cosmetic = false;
        engine.step(id, &avatar.input, &mut avatar.body, &mut avatar.geometry);

        if let Some(camera) = camera {
            let emitter = emitter(avatar, camera);
            self.audio
                .update_sounds(avatar.body.state.sound_mask, &emitter, &mut avatar.audio);
        }
        avatar.body.state.sound_mask = 0;
    }

    /// Host input hook for one vehicle: hide it behind its avatar, place it
    /// on the avatar, apply avatar hits and, on the host, ball interactions
    pub fn on_vehicle_input(&self, vehicle: &dyn Vehicle, controls: &mut ControllerInput) {
        let Some(player_id) = vehicle.player_id() else {
            return;
        };
        let is_host = self.sync.is_host();
        if !is_host && !vehicle.is_local() {
            return;
        }
        let Some(instance) = self.store.get(player_id) else {
            return;
        };
        let mut guard = instance.lock();
        let avatar: &mut AvatarInstance = &mut guard;

        if avatar.is_car_mode {
            vehicle.set_hidden(false);
            return;
        }

        if avatar.handle.is_active() {
            vehicle.set_hidden(true);
            if !write_vehicle(avatar, vehicle) {
                return;
            }
            controls.neutralize();
        }

        let state = &mut avatar.body.state;
        if state.is_update_frame && state.is_attacked {
            if let Some(boost) = vehicle.boost_amount() {
                avatar.input.attack.is_attacked = false;
                state.is_attacked = false;
                let (left, demolish) = apply_attack_damage(boost, self.tuning.attack_boost_damage);
                vehicle.set_boost_amount(left);
                if demolish {
                    debug!(player_id, "Vehicle demolished by avatar attack");
                    vehicle.demolish();
                }
            }
        }

        if is_host {
            self.interact_with_ball(avatar);
        }
    }

    fn interact_with_ball(&self, avatar: &mut AvatarInstance) {
        let Some(ball) = self.host.ball() else {
            return;
        };
        let cooldown = ball_cooldown_ticks(self.interpolation_factor());
        let recently = avatar
            .last_ball_interaction
            .is_some_and(|last| avatar.tick_count.saturating_sub(last) < cooldown);

        if !recently {
            let hit = ball_impulse(
                &self.tuning,
                avatar.body.action,
                avatar.host_position(),
                ball.location(),
            );
            if let Some((kind, impulse)) = hit {
                debug!(player_id = avatar.player_id, ?kind, "Avatar hit the ball");
                ball.set_velocity(ball.velocity() + impulse);
                avatar.last_ball_interaction = Some(avatar.tick_count);
            }
        }
        avatar.tick_count += 1;
    }

    /// Client post-physics hook: pin a vehicle to its replicated avatar
    pub fn follow_avatar(&self, vehicle: &dyn Vehicle) {
        let Some(player_id) = vehicle.player_id() else {
            return;
        };
        let Some(instance) = self.store.get(player_id) else {
            return;
        };
        let avatar = instance.lock();
        if !avatar.is_car_mode && avatar.handle.is_active() {
            write_vehicle(&avatar, vehicle);
        }
    }

    /// Positions and actions of every other simulated avatar
    fn attack_candidates(&self, own: PlayerId) -> Vec<(Vec3, u32)> {
        self.store.with_map(|instances| {
            instances
                .iter()
                .filter(|(id, _)| **id != own)
                .filter_map(|(_, instance)| {
                    let other = instance.lock();
                    other
                        .handle
                        .is_active()
                        .then_some((other.body.state.position, other.body.action))
                })
                .collect()
        })
    }
}

/// Place a vehicle on its avatar. False while the avatar has no output yet.
pub fn write_vehicle(avatar: &AvatarInstance, vehicle: &dyn Vehicle) -> bool {
    let state = &avatar.body.state;
    if state.position.is_origin() {
        return false;
    }

    let mut location = state.interpolated_position.to_host();
    location.z += CAR_OFFSET_Z;
    vehicle.set_location(location);
    vehicle.set_velocity(state.velocity.to_host());
    vehicle.set_rotation(Rotator::new(
        avatar.spawn_rotation.pitch,
        yaw_from_face_angle(state.face_angle),
        avatar.spawn_rotation.roll,
    ));
    true
}

fn emitter(avatar: &AvatarInstance, camera: &Camera) -> SoundEmitter {
    SoundEmitter {
        position: avatar.host_position(),
        velocity: avatar.host_velocity(),
        listener_position: camera.location,
        listener_at: camera.rotation.forward(),
    }
}
