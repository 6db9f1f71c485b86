//! Decides when the body follows the head, and moves it there.
//!
//! Small head motion (leaning, looking around) must not drag the body along,
//! so the target only moves once the head has travelled or turned past a
//! threshold since the last commit. The body then walks to that target at the
//! speed the head moved, while its height tracks the head every tick so
//! crouching is immediate.

use bevy::math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
	config::BodyTrackingConfig,
	error::TrackingError,
	geometry::{
		angle_between_degrees, delta_angle_degrees, interp_angle_constant_to,
		interp_planar_to, normalize_axis_degrees, Pose,
	},
};

/// Once this close to its target the body stops and reports no movement.
pub const ARRIVAL_TOLERANCE: f32 = 10.;
/// Committed speeds are floored here so short steps still complete.
pub const MIN_MOVEMENT_SPEED: f32 = 5.;
/// The step clock only runs once the head is further than this from where it
/// was at the last commit.
pub const STEP_START_DISTANCE: f32 = 1.;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct BodyTrackingState {
	/// Head pose at the last commit. Position and rotation are committed by
	/// the movement and rotation gates independently.
	pub last_head: Pose,
	pub current_position: Vec3,
	pub target_position: Vec3,
	pub current_yaw: f32,
	pub target_yaw: f32,
	pub movement_speed: f32,
	/// Signed degrees in [-180, 180], 0 is forward.
	pub movement_direction: f32,
	/// Seconds the head has spent away from its committed position.
	pub elapsed_since_commit: f32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct TorsoOutput {
	pub body_position: Vec3,
	pub body_yaw: f32,
	pub movement_speed: f32,
	pub movement_direction: f32,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Default)]
pub enum FollowMode {
	/// Threshold gated follow with rate limited catch up.
	#[default]
	Follow,
	/// Commit the head pose every tick and snap to it.
	Teleport,
	/// Keep the current position and heading; only height follows the head.
	Hold,
}

#[derive(Debug, Default, Clone)]
pub struct TorsoFollowController {
	state: Option<BodyTrackingState>,
}

impl TorsoFollowController {
	pub fn new() -> Self {
		Self::default()
	}

	/// `None` until the first head pose arrives.
	pub fn state(&self) -> Option<&BodyTrackingState> {
		self.state.as_ref()
	}

	pub fn advance(
		&mut self,
		dt: f32,
		head: &Pose,
		config: &BodyTrackingConfig,
		mode: FollowMode,
	) -> Result<TorsoOutput, TrackingError> {
		// also rejects NaN
		if !(dt > 0.) {
			return Err(TrackingError::DegenerateInput("non-positive delta time"));
		}
		let state = match self.state.as_mut() {
			Some(state) => state,
			None => {
				let state = self.state.insert(BodyTrackingState::default());
				state.snap_to(head, config);
				debug!(position = ?state.current_position, yaw = state.current_yaw, "seeded body from head");
				return Ok(state.output());
			}
		};

		match mode {
			FollowMode::Teleport => state.snap_to(head, config),
			FollowMode::Hold => {
				state.elapsed_since_commit = 0.;
				state.movement_speed = 0.;
				state.movement_direction = 0.;
				state.target_position = state.current_position;
				state.target_yaw = state.current_yaw;
			}
			FollowMode::Follow => {
				state.run_step_clock(dt, head);
				state.commit_if_past_thresholds(dt, head, config);
				state.catch_up(dt, config);
			}
		}
		state.track_height(head, config);

		Ok(state.output())
	}
}

impl BodyTrackingState {
	fn output(&self) -> TorsoOutput {
		TorsoOutput {
			body_position: self.current_position,
			body_yaw: self.current_yaw,
			movement_speed: self.movement_speed,
			movement_direction: self.movement_direction,
		}
	}

	fn snap_to(&mut self, head: &Pose, config: &BodyTrackingConfig) {
		self.last_head = *head;
		self.target_position = body_anchor(head, config);
		self.current_position = self.target_position;
		self.target_yaw = body_yaw(head, config);
		self.current_yaw = self.target_yaw;
		self.movement_speed = 0.;
		self.movement_direction = 0.;
		self.elapsed_since_commit = 0.;
		self.track_height(head, config);
	}

	/// Standing still does not count toward the next step's duration, so a
	/// step after a pause is timed from when the head started moving.
	fn run_step_clock(&mut self, dt: f32, head: &Pose) {
		let drift = head
			.position
			.truncate()
			.distance(self.last_head.position.truncate());
		if drift <= STEP_START_DISTANCE {
			self.elapsed_since_commit = 0.;
		} else {
			self.elapsed_since_commit += dt;
		}
	}

	fn commit_if_past_thresholds(
		&mut self,
		dt: f32,
		head: &Pose,
		config: &BodyTrackingConfig,
	) {
		let displacement = head.position.truncate() - self.last_head.position.truncate();
		let distance = displacement.length();
		let yaw_delta = delta_angle_degrees(self.last_head.yaw(), head.yaw()).abs();

		if distance > config.movement_threshold {
			self.target_position = body_anchor(head, config);
			self.movement_direction = movement_direction(&self.last_head, head);
			let elapsed = self.elapsed_since_commit.max(dt);
			self.movement_speed = (distance / elapsed * config.movement_speed_multiplier)
				.max(MIN_MOVEMENT_SPEED);
			self.elapsed_since_commit = 0.;
			self.last_head.position = head.position;
			debug!(
				target = ?self.target_position,
				speed = self.movement_speed,
				direction = self.movement_direction,
				"body step committed"
			);
		}

		if yaw_delta > config.rotation_threshold {
			self.target_yaw = body_yaw(head, config);
			self.last_head.rotation = head.rotation;
			debug!(target_yaw = self.target_yaw, "body turn committed");
		}
	}

	fn catch_up(&mut self, dt: f32, config: &BodyTrackingConfig) {
		let current = self.current_position.truncate();
		let target = self.target_position.truncate();
		if current.distance(target) <= ARRIVAL_TOLERANCE {
			self.movement_speed = 0.;
			self.movement_direction = 0.;
		} else {
			let rate = self.movement_speed.max(MIN_MOVEMENT_SPEED);
			let next: Vec2 = interp_planar_to(current, target, dt, rate);
			self.current_position.x = next.x;
			self.current_position.y = next.y;
		}
		self.current_yaw = interp_angle_constant_to(
			self.current_yaw,
			self.target_yaw,
			dt,
			config.body_rotation_speed,
		);
	}

	fn track_height(&mut self, head: &Pose, config: &BodyTrackingConfig) {
		let z = head.position.z - config.player_height;
		self.current_position.z = z;
		self.target_position.z = z;
	}
}

/// Where the body should stand for this head pose.
fn body_anchor(head: &Pose, config: &BodyTrackingConfig) -> Vec3 {
	head.position + head.forward() * config.body_offset
}

fn body_yaw(head: &Pose, config: &BodyTrackingConfig) -> f32 {
	normalize_axis_degrees(head.yaw() + config.body_rotation_offset)
}

/// Angle between the committed and current facing on the ground plane,
/// negative when the head moved against its committed facing. Pitch plays no
/// part.
pub fn movement_direction(last: &Pose, current: &Pose) -> f32 {
	let last_forward = last.forward().truncate().extend(0.);
	let current_forward = current.forward().truncate().extend(0.);
	let angle = angle_between_degrees(last_forward, current_forward);
	let displacement = (current.position - last.position).truncate().extend(0.);
	let signed = if displacement.dot(last_forward) < 0. {
		-angle
	} else {
		angle
	};
	signed.clamp(-180., 180.)
}
