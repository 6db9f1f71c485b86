//! Math shared by the solvers.
//!
//! The world is X forward, Y right, Z up. Angles that cross the public API are
//! in degrees, rotations are stored as quaternions.

use bevy::math::{EulerRot, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Exponential interpolation snaps to its target below this distance.
const INTERP_SNAP_DISTANCE: f32 = 1.0e-4;

/// Vectors shorter than this have no usable direction.
const DEGENERATE_LENGTH_SQUARED: f32 = 1.0e-8;

/// A pose is like a `Transform`, but without scale.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Pose {
	pub position: Vec3,
	pub rotation: Quat,
}

impl Pose {
	pub const IDENTITY: Pose = Pose {
		position: Vec3::ZERO,
		rotation: Quat::IDENTITY,
	};

	pub const fn new(position: Vec3, rotation: Quat) -> Self {
		Self { position, rotation }
	}

	pub fn from_rotator(position: Vec3, rotator: Rotator) -> Self {
		Self::new(position, rotator.to_quat())
	}

	pub fn forward(&self) -> Vec3 {
		forward(self.rotation)
	}

	pub fn right(&self) -> Vec3 {
		right(self.rotation)
	}

	pub fn up(&self) -> Vec3 {
		up(self.rotation)
	}

	/// Heading about +Z in degrees.
	pub fn yaw(&self) -> f32 {
		yaw_degrees(self.rotation)
	}

	/// Applies `local`, expressed in this pose's axes, on top of this pose.
	pub fn mul_pose(&self, local: Pose) -> Pose {
		Pose {
			position: self.position + (self.rotation * local.position),
			rotation: (self.rotation * local.rotation).normalize(),
		}
	}
}

/// Pitch, yaw and roll in degrees.
///
/// Composes as yaw about +Z, then pitch about the new +Y (positive lifts the
/// forward vector toward +Z), then roll about the new +X (positive drops the
/// right vector toward -Z).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Rotator {
	pub pitch: f32,
	pub yaw: f32,
	pub roll: f32,
}

impl Rotator {
	pub const ZERO: Rotator = Rotator::new(0., 0., 0.);

	pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
		Self { pitch, yaw, roll }
	}

	pub const fn from_yaw(yaw: f32) -> Self {
		Self::new(0., yaw, 0.)
	}

	pub fn to_quat(self) -> Quat {
		Quat::from_euler(
			EulerRot::ZYX,
			self.yaw.to_radians(),
			-self.pitch.to_radians(),
			-self.roll.to_radians(),
		)
	}

	pub fn from_quat(rotation: Quat) -> Self {
		let (yaw, pitch, roll) = rotation.to_euler(EulerRot::ZYX);
		Self {
			pitch: -pitch.to_degrees(),
			yaw: yaw.to_degrees(),
			roll: -roll.to_degrees(),
		}
	}
}

pub fn forward(rotation: Quat) -> Vec3 {
	rotation * Vec3::X
}

pub fn right(rotation: Quat) -> Vec3 {
	rotation * Vec3::Y
}

pub fn up(rotation: Quat) -> Vec3 {
	rotation * Vec3::Z
}

/// Heading of the forward vector projected onto the ground plane.
///
/// Looking straight up or down has no heading and yields 0.
pub fn yaw_degrees(rotation: Quat) -> f32 {
	let flat = forward(rotation).truncate();
	if flat.length_squared() < DEGENERATE_LENGTH_SQUARED {
		return 0.;
	}
	flat.y.atan2(flat.x).to_degrees()
}

/// Wraps an angle into [-180, 180).
pub fn normalize_axis_degrees(angle: f32) -> f32 {
	(angle + 180.).rem_euclid(360.) - 180.
}

/// Shortest signed rotation taking `from` onto `to`.
pub fn delta_angle_degrees(from: f32, to: f32) -> f32 {
	normalize_axis_degrees(to - from)
}

/// Unsigned angle between two directions, 0 if either has no length.
pub fn angle_between_degrees(a: Vec3, b: Vec3) -> f32 {
	let lengths = (a.length_squared() * b.length_squared()).sqrt();
	if lengths < DEGENERATE_LENGTH_SQUARED {
		return 0.;
	}
	(a.dot(b) / lengths).clamp(-1., 1.).acos().to_degrees()
}

/// Moves `current` toward `target` by at most `speed * dt`.
pub fn interp_constant_to(current: f32, target: f32, dt: f32, speed: f32) -> f32 {
	let dist = target - current;
	let step = (speed * dt).max(0.);
	if dist.abs() <= step {
		target
	} else {
		current + dist.signum() * step
	}
}

/// Planar counterpart of [`interp_constant_to`]; never overshoots.
pub fn interp_planar_to(current: Vec2, target: Vec2, dt: f32, speed: f32) -> Vec2 {
	let delta = target - current;
	let dist = delta.length();
	let step = (speed * dt).max(0.);
	if dist <= step || dist * dist < DEGENERATE_LENGTH_SQUARED {
		target
	} else {
		current + delta / dist * step
	}
}

/// Exponential approach: covers `speed * dt` of the remaining distance.
///
/// A non-positive speed jumps straight to the target.
pub fn interp_to(current: f32, target: f32, dt: f32, speed: f32) -> f32 {
	if speed <= 0. {
		return target;
	}
	let dist = target - current;
	if dist.abs() < INTERP_SNAP_DISTANCE {
		return target;
	}
	current + dist * (dt * speed).clamp(0., 1.)
}

/// Turns `current` toward `target` along the shortest arc at `speed` deg/sec.
pub fn interp_angle_constant_to(current: f32, target: f32, dt: f32, speed: f32) -> f32 {
	let delta = delta_angle_degrees(current, target);
	normalize_axis_degrees(interp_constant_to(current, current + delta, dt, speed))
}

#[cfg(test)]
mod test {
	use super::*;

	const EPS: f32 = 1.0e-4;

	fn assert_vec_eq(a: Vec3, b: Vec3) {
		assert!(a.abs_diff_eq(b, EPS), "{a:?} != {b:?}");
	}

	#[test]
	fn test_rotator_axes() {
		let yawed = Rotator::from_yaw(90.).to_quat();
		assert_vec_eq(forward(yawed), Vec3::Y);
		assert_vec_eq(right(yawed), Vec3::NEG_X);

		let pitched = Rotator::new(90., 0., 0.).to_quat();
		assert_vec_eq(forward(pitched), Vec3::Z);

		let rolled = Rotator::new(0., 0., 90.).to_quat();
		assert_vec_eq(right(rolled), Vec3::NEG_Z);
		assert_vec_eq(forward(rolled), Vec3::X);
	}

	#[test]
	fn test_rotator_quat_round_trip() {
		let rot = Rotator::new(20., -135., 10.);
		let back = Rotator::from_quat(rot.to_quat());
		assert!((back.pitch - rot.pitch).abs() < 1.0e-2);
		assert!((back.yaw - rot.yaw).abs() < 1.0e-2);
		assert!((back.roll - rot.roll).abs() < 1.0e-2);
	}

	#[test]
	fn test_yaw_ignores_pitch() {
		let rot = Rotator::new(40., 30., 0.).to_quat();
		assert!((yaw_degrees(rot) - 30.).abs() < EPS);
		// straight up has no heading
		assert_eq!(yaw_degrees(Rotator::new(90., 30., 0.).to_quat()), 0.);
	}

	#[test]
	fn test_normalize_and_delta() {
		assert_eq!(normalize_axis_degrees(190.), -170.);
		assert_eq!(normalize_axis_degrees(-190.), 170.);
		assert_eq!(normalize_axis_degrees(45.), 45.);
		assert_eq!(delta_angle_degrees(170., -170.), 20.);
		assert_eq!(delta_angle_degrees(-170., 170.), -20.);
	}

	#[test]
	fn test_angle_between_degenerate() {
		assert_eq!(angle_between_degrees(Vec3::ZERO, Vec3::X), 0.);
		assert!((angle_between_degrees(Vec3::X, Vec3::Y) - 90.).abs() < EPS);
		assert!((angle_between_degrees(Vec3::X, Vec3::NEG_X) - 180.).abs() < EPS);
	}

	#[test]
	fn test_interp_constant_never_overshoots() {
		assert_eq!(interp_constant_to(0., 10., 0.1, 50.), 5.);
		assert_eq!(interp_constant_to(0., 3., 0.1, 50.), 3.);
		assert_eq!(interp_constant_to(0., -10., 0.1, 50.), -5.);

		let next = interp_planar_to(Vec2::ZERO, Vec2::new(30., 40.), 0.1, 100.);
		assert!((next.length() - 10.).abs() < EPS);
		let arrived = interp_planar_to(Vec2::ZERO, Vec2::new(3., 4.), 0.1, 100.);
		assert_eq!(arrived, Vec2::new(3., 4.));
	}

	#[test]
	fn test_interp_to_converges_exactly() {
		let mut value = 0.;
		for _ in 0..2000 {
			value = interp_to(value, 1., 0.01, 4.);
		}
		assert_eq!(value, 1.);
		assert_eq!(interp_to(0.2, 1., 1., 4.), 1.);
		assert_eq!(interp_to(0.2, 1., 0.1, 0.), 1.);
	}

	#[test]
	fn test_interp_angle_takes_short_way() {
		let next = interp_angle_constant_to(170., -170., 0.1, 50.);
		assert!((next - 175.).abs() < EPS);
		let arrived = interp_angle_constant_to(170., -170., 1., 50.);
		assert!((arrived - -170.).abs() < EPS);
	}

	#[test]
	fn test_mul_pose_uses_local_axes() {
		let controller = Pose::from_rotator(Vec3::new(10., 0., 0.), Rotator::from_yaw(90.));
		let socket = Pose::new(Vec3::new(5., 2., 1.), Quat::IDENTITY);
		let composed = controller.mul_pose(socket);
		let expected = controller.position
			+ controller.forward() * 5.
			+ controller.right() * 2.
			+ controller.up() * 1.;
		assert_vec_eq(composed.position, expected);
	}
}
