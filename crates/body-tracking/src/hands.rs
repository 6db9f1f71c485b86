//! Places the hand IK effectors on the tracked controllers.

use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
	error::{Reference, TrackingError},
	geometry::{Pose, Rotator},
	side::{Side, Sided},
};

/// Where on the hand bone the controller should sit, in the bone's local axes
/// (x forward, y right, z up).
///
/// The hand bone's pivot is at the wrist, so without this the rendered hand
/// would be centered on the controller instead of holding it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(default)]
pub struct SocketOffset {
	pub translation: Vec3,
	pub rotation: Rotator,
}

impl SocketOffset {
	/// The same socket on the other hand. Skeletons mirror their bone axes
	/// across the body, so only the translation flips.
	pub fn mirrored(self) -> Self {
		Self {
			translation: -self.translation,
			rotation: self.rotation,
		}
	}

	pub fn to_pose(self) -> Pose {
		Pose::from_rotator(self.translation, self.rotation)
	}
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct HandTarget {
	pub location: Vec3,
	pub rotation: Quat,
}

impl HandTarget {
	pub fn transform(&self) -> Pose {
		Pose::new(self.location, self.rotation)
	}

	pub fn rotator(&self) -> Rotator {
		Rotator::from_quat(self.rotation)
	}
}

/// Composes the controller transform with the socket offset. No smoothing:
/// controllers are already tracked at display rate.
pub fn resolve(controller: &Pose, socket: &SocketOffset) -> HandTarget {
	let target = controller.mul_pose(socket.to_pose());
	HandTarget {
		location: target.position,
		rotation: target.rotation,
	}
}

/// Remembers the last target per hand so a controller dropout freezes the
/// hand instead of snapping it.
#[derive(Debug, Default, Clone)]
pub struct HandTargetResolver {
	targets: Sided<HandTarget>,
	stale: Sided<bool>,
}

impl HandTargetResolver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn update(
		&mut self,
		side: Side,
		controller: Option<&Pose>,
		socket: &SocketOffset,
	) -> Result<HandTarget, TrackingError> {
		let Some(controller) = controller else {
			self.stale[side] = true;
			return Err(TrackingError::MissingReference(Reference::Controller(side)));
		};
		let target = resolve(controller, socket);
		self.targets[side] = target;
		self.stale[side] = false;
		Ok(target)
	}

	pub fn target(&self, side: Side) -> HandTarget {
		self.targets[side]
	}

	/// Whether the last update for this hand had no controller.
	pub fn is_stale(&self, side: Side) -> bool {
		self.stale[side]
	}
}
