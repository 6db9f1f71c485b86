//! What the animation side reads after a tick.

use std::sync::Arc;

use arc_swap::ArcSwap;
use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
	fingers::{FingerBone, FINGER_BONE_COUNT},
	foot::{FootIkState, TraceOutcome},
	geometry::Pose,
	hands::HandTarget,
	side::{Side, Sided},
	torso::TorsoOutput,
};

#[derive(
	Debug, Eq, PartialEq, Copy, Clone, Hash, Default, Serialize, Deserialize,
)]
pub enum CharacterState {
	#[default]
	Idle,
	Teleporting,
	Climbing,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct HeadIk {
	pub location: Vec3,
	pub rotation: Quat,
}

impl HeadIk {
	/// The camera pose, pushed along its look direction by the same offset the
	/// body uses.
	pub fn from_camera(camera: &Pose, body_offset: f32) -> Self {
		Self {
			location: camera.position + camera.forward() * body_offset,
			rotation: camera.rotation,
		}
	}
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct HandIk {
	pub target: HandTarget,
	/// The controller was missing and `target` is from an earlier tick.
	pub stale: bool,
}

/// Every IK value produced by one tick. Never mutated after publishing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IkSnapshot {
	/// Number of completed ticks, 0 before the first one.
	pub tick: u64,
	pub state: CharacterState,
	pub torso: TorsoOutput,
	pub head: HeadIk,
	pub hands: Sided<HandIk>,
	pub feet: Sided<FootIkState>,
	/// How this tick's ground trace went for each foot. `None` when the foot
	/// location was not supplied. Anything but `Planted` means `feet` holds an
	/// earlier placement.
	pub foot_outcomes: Sided<Option<TraceOutcome>>,
	pub fingers: [f32; FINGER_BONE_COUNT],
}

impl Default for IkSnapshot {
	fn default() -> Self {
		Self {
			tick: 0,
			state: CharacterState::default(),
			torso: TorsoOutput::default(),
			head: HeadIk::default(),
			hands: Sided::default(),
			feet: Sided::default(),
			foot_outcomes: Sided::default(),
			fingers: [0.; FINGER_BONE_COUNT],
		}
	}
}

impl IkSnapshot {
	pub fn finger_blend(&self, bone: FingerBone) -> f32 {
		self.fingers[bone.index()]
	}

	/// The finger blend map, in bone order.
	pub fn finger_blends(&self) -> impl Iterator<Item = (FingerBone, f32)> + '_ {
		FingerBone::ALL.into_iter().zip(self.fingers.iter().copied())
	}

	pub fn hand(&self, side: Side) -> &HandIk {
		&self.hands[side]
	}

	pub fn foot(&self, side: Side) -> &FootIkState {
		&self.feet[side]
	}
}

/// Read handle for the latest published snapshot. Cheap to clone and safe to
/// read from any thread while the tracker ticks.
#[derive(Clone)]
pub struct SnapshotReader {
	slot: Arc<ArcSwap<IkSnapshot>>,
}

impl SnapshotReader {
	pub fn load(&self) -> Arc<IkSnapshot> {
		self.slot.load_full()
	}
}

/// Swaps in whole snapshots so readers never see a half written one.
pub(crate) struct SnapshotPublisher {
	slot: Arc<ArcSwap<IkSnapshot>>,
}

impl SnapshotPublisher {
	pub fn new() -> Self {
		Self {
			slot: Arc::new(ArcSwap::from_pointee(IkSnapshot::default())),
		}
	}

	pub fn publish(&self, snapshot: IkSnapshot) -> Arc<IkSnapshot> {
		let snapshot = Arc::new(snapshot);
		self.slot.store(Arc::clone(&snapshot));
		snapshot
	}

	pub fn current(&self) -> Arc<IkSnapshot> {
		self.slot.load_full()
	}

	pub fn reader(&self) -> SnapshotReader {
		SnapshotReader {
			slot: Arc::clone(&self.slot),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	use crate::geometry::Rotator;

	#[test]
	fn test_reader_sees_whole_snapshots() {
		let publisher = SnapshotPublisher::new();
		let reader = publisher.reader();
		let before = reader.load();
		assert_eq!(before.tick, 0);

		let published = publisher.publish(IkSnapshot {
			tick: 7,
			..Default::default()
		});
		assert_eq!(reader.load().tick, 7);
		assert!(Arc::ptr_eq(&published, &reader.load()));
		// the old snapshot is untouched
		assert_eq!(before.tick, 0);
	}

	#[test]
	fn test_head_offset_along_look_direction() {
		let camera = Pose::from_rotator(Vec3::new(0., 0., 170.), Rotator::from_yaw(90.));
		let head = HeadIk::from_camera(&camera, -20.);
		assert!(head.location.abs_diff_eq(Vec3::new(0., -20., 170.), 1.0e-4));
		assert_eq!(head.rotation, camera.rotation);
	}

	#[test]
	fn test_finger_blend_map() {
		let mut snapshot = IkSnapshot::default();
		snapshot.fingers[FingerBone::RightPinky02.index()] = 0.5;
		assert_eq!(snapshot.finger_blend(FingerBone::RightPinky02), 0.5);
		let map: Vec<_> = snapshot.finger_blends().collect();
		assert_eq!(map.len(), FINGER_BONE_COUNT);
		assert_eq!(map[FingerBone::RightPinky02.index()], (FingerBone::RightPinky02, 0.5));
	}
}
