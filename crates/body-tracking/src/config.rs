//! Tunables for one avatar's tracker.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::ConfigError, hands::SocketOffset, side::Side};

pub const MIN_FOOT_TRACE_HEIGHT: f32 = 1.;

/// Settings read by every solver. Units are world units (cm), degrees and
/// seconds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct BodyTrackingConfig {
	/// How far the head has to move before it counts as a step instead of
	/// head movement.
	pub movement_threshold: f32,
	/// How far the head has to turn before the body turns with it.
	pub rotation_threshold: f32,
	pub player_height: f32,
	/// Pushes the body along the look direction; negative keeps it behind the
	/// camera so the view does not clip into the neck.
	pub body_offset: f32,
	/// Aligns the skeleton's forward axis with the camera's.
	pub body_rotation_offset: f32,
	/// Scales how fast the body catches up after a step.
	pub movement_speed_multiplier: f32,
	/// Degrees per second the body turns toward its target heading.
	pub body_rotation_speed: f32,
	/// Height above the foot where the ground probe starts. `None` follows
	/// half of `player_height`; see [`Self::foot_trace_height`].
	pub foot_trace_height: Option<f32>,
	/// Rate at which finger curl approaches its target.
	pub finger_interp_speed: f32,
	/// Shorter frames are accumulated until this much time has passed.
	pub min_tick_interval: f32,
	pub left_hand_socket: SocketOffset,
	pub right_hand_socket: SocketOffset,
}

impl Default for BodyTrackingConfig {
	fn default() -> Self {
		Self {
			movement_threshold: 60.,
			rotation_threshold: 25.,
			player_height: 180.,
			body_offset: -20.,
			body_rotation_offset: -90.,
			movement_speed_multiplier: 1.,
			body_rotation_speed: 180.,
			foot_trace_height: None,
			finger_interp_speed: 4.,
			min_tick_interval: 0.01,
			left_hand_socket: SocketOffset::default(),
			right_hand_socket: SocketOffset::default(),
		}
	}
}

/// A single change to a [`BodyTrackingConfig`]. Every write to a running
/// tracker goes through one of these.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum ConfigUpdate {
	MovementThreshold(f32),
	RotationThreshold(f32),
	PlayerHeight(f32),
	BodyOffset(f32),
	BodyRotationOffset(f32),
	MovementSpeedMultiplier(f32),
	BodyRotationSpeed(f32),
	FootTraceHeight(f32),
	FingerInterpSpeed(f32),
	MinTickInterval(f32),
	HandSocket(Side, SocketOffset),
}

impl BodyTrackingConfig {
	pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(s)?;
		Ok(config.sanitized())
	}

	pub fn apply(&mut self, update: ConfigUpdate) {
		match update {
			ConfigUpdate::MovementThreshold(v) => self.movement_threshold = v,
			ConfigUpdate::RotationThreshold(v) => self.rotation_threshold = v,
			ConfigUpdate::PlayerHeight(v) => self.player_height = v,
			ConfigUpdate::BodyOffset(v) => self.body_offset = v,
			ConfigUpdate::BodyRotationOffset(v) => self.body_rotation_offset = v,
			ConfigUpdate::MovementSpeedMultiplier(v) => {
				self.movement_speed_multiplier = v
			}
			ConfigUpdate::BodyRotationSpeed(v) => self.body_rotation_speed = v,
			ConfigUpdate::FootTraceHeight(v) => self.foot_trace_height = Some(v),
			ConfigUpdate::FingerInterpSpeed(v) => self.finger_interp_speed = v,
			ConfigUpdate::MinTickInterval(v) => self.min_tick_interval = v,
			ConfigUpdate::HandSocket(Side::Left, socket) => {
				self.left_hand_socket = socket
			}
			ConfigUpdate::HandSocket(Side::Right, socket) => {
				self.right_hand_socket = socket
			}
		}
		*self = self.sanitized();
	}

	/// The probe start height in use: the explicit setting, or half the
	/// player height. Never below [`MIN_FOOT_TRACE_HEIGHT`].
	pub fn foot_trace_height(&self) -> f32 {
		self.foot_trace_height
			.unwrap_or(self.player_height / 2.)
			.max(MIN_FOOT_TRACE_HEIGHT)
	}

	pub fn hand_socket(&self, side: Side) -> &SocketOffset {
		match side {
			Side::Left => &self.left_hand_socket,
			Side::Right => &self.right_hand_socket,
		}
	}

	/// Clamps every value into a range the solvers can work with. NaNs fall
	/// back to the default.
	pub fn sanitized(self) -> Self {
		let d = Self::default();
		Self {
			movement_threshold: clamp_field(
				"movement_threshold",
				self.movement_threshold,
				0.,
				f32::MAX,
				d.movement_threshold,
			),
			rotation_threshold: clamp_field(
				"rotation_threshold",
				self.rotation_threshold,
				0.,
				180.,
				d.rotation_threshold,
			),
			player_height: clamp_field(
				"player_height",
				self.player_height,
				0.,
				f32::MAX,
				d.player_height,
			),
			body_offset: clamp_field(
				"body_offset",
				self.body_offset,
				f32::MIN,
				f32::MAX,
				d.body_offset,
			),
			body_rotation_offset: clamp_field(
				"body_rotation_offset",
				self.body_rotation_offset,
				-360.,
				360.,
				d.body_rotation_offset,
			),
			movement_speed_multiplier: clamp_field(
				"movement_speed_multiplier",
				self.movement_speed_multiplier,
				0.,
				f32::MAX,
				d.movement_speed_multiplier,
			),
			body_rotation_speed: clamp_field(
				"body_rotation_speed",
				self.body_rotation_speed,
				1.,
				f32::MAX,
				d.body_rotation_speed,
			),
			// NaN falls back to following the player height
			foot_trace_height: self
				.foot_trace_height
				.filter(|v| !v.is_nan())
				.map(|v| {
					clamp_field("foot_trace_height", v, MIN_FOOT_TRACE_HEIGHT, f32::MAX, v)
				}),
			finger_interp_speed: clamp_field(
				"finger_interp_speed",
				self.finger_interp_speed,
				0.,
				f32::MAX,
				d.finger_interp_speed,
			),
			min_tick_interval: clamp_field(
				"min_tick_interval",
				self.min_tick_interval,
				0.,
				1.,
				d.min_tick_interval,
			),
			left_hand_socket: self.left_hand_socket,
			right_hand_socket: self.right_hand_socket,
		}
	}
}

fn clamp_field(name: &'static str, value: f32, min: f32, max: f32, fallback: f32) -> f32 {
	if value.is_nan() {
		warn!(field = name, fallback, "config value is NaN, using the default");
		return fallback;
	}
	let clamped = value.clamp(min, max);
	if clamped != value {
		warn!(field = name, value, clamped, "config value out of range, clamped");
	}
	clamped
}
