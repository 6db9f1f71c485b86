//! Finger curl while gripping.
//!
//! Each bone blends toward curled (1) while its hand holds something and
//! toward open (0) otherwise. A bone stops as soon as its hitbox touches the
//! held object, so fingers wrap around thick and thin objects alike instead
//! of curling through them.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
	geometry::interp_to,
	side::{Side, Sided},
};

pub const BONES_PER_HAND: usize = 15;
pub const FINGER_BONE_COUNT: usize = 2 * BONES_PER_HAND;

/// Handle to the object a hand is gripping, owned by the host.
#[derive(
	Debug, Display, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize,
)]
#[display("grip target {_0}")]
pub struct GripTarget(pub u64);

/// Handle to a finger hitbox capsule, owned by the host.
#[derive(
	Debug, Display, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize,
)]
#[display("capsule {_0}")]
pub struct CapsuleId(pub u64);

/// Answers whether a finger hitbox currently overlaps a grabbed object.
pub trait FingerContacts {
	fn is_overlapping(&self, capsule: CapsuleId, target: GripTarget) -> bool;
}

impl<F> FingerContacts for F
where
	F: Fn(CapsuleId, GripTarget) -> bool,
{
	fn is_overlapping(&self, capsule: CapsuleId, target: GripTarget) -> bool {
		self(capsule, target)
	}
}

/// Nothing ever touches.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContacts;

impl FingerContacts for NoContacts {
	fn is_overlapping(&self, _capsule: CapsuleId, _target: GripTarget) -> bool {
		false
	}
}

#[derive(
	Debug, Display, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize,
)]
pub enum Digit {
	#[display("index")]
	Index,
	#[display("middle")]
	Middle,
	#[display("ring")]
	Ring,
	#[display("pinky")]
	Pinky,
	#[display("thumb")]
	Thumb,
}

/// Joint along a digit, from the knuckle outward.
#[derive(
	Debug, Display, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize,
)]
pub enum Joint {
	#[display("01")]
	Proximal,
	#[display("02")]
	Intermediate,
	#[display("03")]
	Distal,
}

/// Every finger bone driven by grip IK, left hand first.
///
/// The discriminant is the bone's index into per-bone arrays.
#[rustfmt::skip]
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FingerBone {
	LeftIndex01, LeftIndex02, LeftIndex03,
	LeftMiddle01, LeftMiddle02, LeftMiddle03,
	LeftRing01, LeftRing02, LeftRing03,
	LeftPinky01, LeftPinky02, LeftPinky03,
	LeftThumb01, LeftThumb02, LeftThumb03,
	RightIndex01, RightIndex02, RightIndex03,
	RightMiddle01, RightMiddle02, RightMiddle03,
	RightRing01, RightRing02, RightRing03,
	RightPinky01, RightPinky02, RightPinky03,
	RightThumb01, RightThumb02, RightThumb03,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
struct BoneInfo {
	side: Side,
	digit: Digit,
	joint: Joint,
}

const DIGITS: [Digit; 5] = [
	Digit::Index,
	Digit::Middle,
	Digit::Ring,
	Digit::Pinky,
	Digit::Thumb,
];
const JOINTS: [Joint; 3] = [Joint::Proximal, Joint::Intermediate, Joint::Distal];

const BONE_TABLE: [BoneInfo; FINGER_BONE_COUNT] = build_bone_table();
static ALL_BONES: [FingerBone; FINGER_BONE_COUNT] = FingerBone::ALL;

const fn build_bone_table() -> [BoneInfo; FINGER_BONE_COUNT] {
	let mut table = [BoneInfo {
		side: Side::Left,
		digit: Digit::Index,
		joint: Joint::Proximal,
	}; FINGER_BONE_COUNT];
	let mut idx = 0;
	while idx < FINGER_BONE_COUNT {
		let in_hand = idx % BONES_PER_HAND;
		table[idx] = BoneInfo {
			side: if idx < BONES_PER_HAND {
				Side::Left
			} else {
				Side::Right
			},
			digit: DIGITS[in_hand / JOINTS.len()],
			joint: JOINTS[in_hand % JOINTS.len()],
		};
		idx += 1;
	}
	table
}

impl FingerBone {
	#[rustfmt::skip]
	pub const ALL: [FingerBone; FINGER_BONE_COUNT] = {
		use FingerBone::*;
		[
			LeftIndex01, LeftIndex02, LeftIndex03,
			LeftMiddle01, LeftMiddle02, LeftMiddle03,
			LeftRing01, LeftRing02, LeftRing03,
			LeftPinky01, LeftPinky02, LeftPinky03,
			LeftThumb01, LeftThumb02, LeftThumb03,
			RightIndex01, RightIndex02, RightIndex03,
			RightMiddle01, RightMiddle02, RightMiddle03,
			RightRing01, RightRing02, RightRing03,
			RightPinky01, RightPinky02, RightPinky03,
			RightThumb01, RightThumb02, RightThumb03,
		]
	};

	pub const fn index(self) -> usize {
		self as usize
	}

	pub fn from_index(idx: usize) -> Option<FingerBone> {
		Self::ALL.get(idx).copied()
	}

	pub const fn side(self) -> Side {
		BONE_TABLE[self.index()].side
	}

	pub const fn digit(self) -> Digit {
		BONE_TABLE[self.index()].digit
	}

	pub const fn joint(self) -> Joint {
		BONE_TABLE[self.index()].joint
	}

	/// The 15 bones of one hand.
	pub fn of_hand(side: Side) -> &'static [FingerBone] {
		match side {
			Side::Left => &ALL_BONES[..BONES_PER_HAND],
			Side::Right => &ALL_BONES[BONES_PER_HAND..],
		}
	}

	/// Skeleton bone name, e.g. `index_01_l`.
	pub fn bone_name(self) -> String {
		let suffix = match self.side() {
			Side::Left => 'l',
			Side::Right => 'r',
		};
		format!("{}_{}_{suffix}", self.digit(), self.joint())
	}
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct BoneState {
	/// 0 is open, 1 fully curled.
	pub blend: f32,
	/// No further blending until the next grip or release on this hand.
	pub settled: bool,
}

#[derive(Debug, Clone)]
pub struct FingerGripController {
	bones: [BoneState; FINGER_BONE_COUNT],
	capsules: [Option<CapsuleId>; FINGER_BONE_COUNT],
	grips: Sided<Option<GripTarget>>,
}

impl Default for FingerGripController {
	fn default() -> Self {
		Self {
			bones: [BoneState::default(); FINGER_BONE_COUNT],
			capsules: [None; FINGER_BONE_COUNT],
			grips: Sided::default(),
		}
	}
}

impl FingerGripController {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn start_grip(&mut self, side: Side, target: GripTarget) {
		debug!(%side, %target, "start grip");
		self.grips[side] = Some(target);
		self.rearm(side);
	}

	pub fn stop_grip(&mut self, side: Side) {
		debug!(%side, "stop grip");
		self.grips[side] = None;
		self.rearm(side);
	}

	pub fn grip(&self, side: Side) -> Option<GripTarget> {
		self.grips[side]
	}

	pub fn set_capsule(&mut self, bone: FingerBone, capsule: Option<CapsuleId>) {
		self.capsules[bone.index()] = capsule;
	}

	pub fn set_all_capsules(&mut self, capsules: [Option<CapsuleId>; FINGER_BONE_COUNT]) {
		self.capsules = capsules;
	}

	pub fn capsule(&self, bone: FingerBone) -> Option<CapsuleId> {
		self.capsules[bone.index()]
	}

	pub fn bone(&self, bone: FingerBone) -> BoneState {
		self.bones[bone.index()]
	}

	pub fn blends(&self) -> [f32; FINGER_BONE_COUNT] {
		self.bones.map(|state| state.blend)
	}

	/// Lets every bone of the hand move again, even ones that already settled
	/// on a previous object.
	fn rearm(&mut self, side: Side) {
		for bone in FingerBone::of_hand(side) {
			self.bones[bone.index()].settled = false;
		}
	}

	pub fn tick(&mut self, dt: f32, speed: f32, contacts: &(impl FingerContacts + ?Sized)) {
		for bone in FingerBone::ALL {
			let state = &mut self.bones[bone.index()];
			if state.settled {
				continue;
			}
			let grip = self.grips[bone.side()];
			let target_alpha = if grip.is_some() { 1. } else { 0. };
			if state.blend == target_alpha {
				state.settled = true;
				continue;
			}
			let touching = match (self.capsules[bone.index()], grip) {
				(Some(capsule), Some(target)) => contacts.is_overlapping(capsule, target),
				_ => false,
			};
			if touching {
				trace!(?bone, blend = state.blend, "finger touched grip target");
				state.settled = true;
				continue;
			}
			state.blend = interp_to(state.blend, target_alpha, dt, speed).clamp(0., 1.);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn run(fingers: &mut FingerGripController, ticks: usize, contacts: &impl FingerContacts) {
		for _ in 0..ticks {
			fingers.tick(0.05, 4., contacts);
		}
	}

	#[test]
	fn test_bone_table() {
		assert_eq!(FingerBone::ALL.len(), FINGER_BONE_COUNT);
		for (idx, bone) in FingerBone::ALL.iter().enumerate() {
			assert_eq!(bone.index(), idx);
			assert_eq!(FingerBone::from_index(idx), Some(*bone));
		}
		assert_eq!(FingerBone::from_index(FINGER_BONE_COUNT), None);
		assert_eq!(FingerBone::LeftThumb03.side(), Side::Left);
		assert_eq!(FingerBone::RightIndex01.side(), Side::Right);
		assert_eq!(FingerBone::RightRing02.digit(), Digit::Ring);
		assert_eq!(FingerBone::RightRing02.joint(), Joint::Intermediate);
		assert_eq!(FingerBone::LeftIndex01.bone_name(), "index_01_l");
		assert_eq!(FingerBone::RightThumb03.bone_name(), "thumb_03_r");
		assert!(FingerBone::of_hand(Side::Right)
			.iter()
			.all(|bone| bone.side() == Side::Right));
	}

	#[test]
	fn test_grip_curls_to_one_and_settles() {
		let mut fingers = FingerGripController::new();
		fingers.start_grip(Side::Left, GripTarget(1));
		run(&mut fingers, 400, &NoContacts);
		for bone in FingerBone::of_hand(Side::Left) {
			let state = fingers.bone(*bone);
			assert_eq!(state.blend, 1.);
			assert!(state.settled);
		}
		for bone in FingerBone::of_hand(Side::Right) {
			assert_eq!(fingers.bone(*bone).blend, 0.);
		}
	}

	#[test]
	fn test_start_grip_rearms_only_that_hand() {
		let mut fingers = FingerGripController::new();
		run(&mut fingers, 1, &NoContacts);
		assert!(FingerBone::ALL.iter().all(|bone| fingers.bone(*bone).settled));

		fingers.start_grip(Side::Right, GripTarget(3));
		for bone in FingerBone::ALL {
			assert_eq!(fingers.bone(bone).settled, bone.side() == Side::Left);
		}
	}

	#[test]
	fn test_contact_freezes_blend() {
		let mut fingers = FingerGripController::new();
		fingers.set_capsule(FingerBone::RightIndex03, Some(CapsuleId(42)));
		fingers.start_grip(Side::Right, GripTarget(9));
		run(&mut fingers, 3, &NoContacts);
		let before = fingers.bone(FingerBone::RightIndex03).blend;
		assert!(before > 0. && before < 1.);

		let touching = |capsule: CapsuleId, target: GripTarget| {
			capsule == CapsuleId(42) && target == GripTarget(9)
		};
		run(&mut fingers, 200, &touching);
		let frozen = fingers.bone(FingerBone::RightIndex03);
		assert!(frozen.settled);
		assert_eq!(frozen.blend, before);
		// bones without a capsule keep curling
		assert_eq!(fingers.bone(FingerBone::RightIndex02).blend, 1.);

		// a fresh grip lets the bone move again
		fingers.start_grip(Side::Right, GripTarget(10));
		run(&mut fingers, 1, &touching);
		assert!(fingers.bone(FingerBone::RightIndex03).blend > before);
	}

	#[test]
	fn test_release_round_trip() {
		let mut fingers = FingerGripController::new();
		fingers.start_grip(Side::Left, GripTarget(5));
		run(&mut fingers, 10, &NoContacts);
		fingers.stop_grip(Side::Left);
		assert_eq!(fingers.grip(Side::Left), None);
		run(&mut fingers, 400, &NoContacts);
		for bone in FingerBone::of_hand(Side::Left) {
			let state = fingers.bone(*bone);
			assert_eq!(state.blend, 0.);
			assert!(state.settled);
		}
	}

	#[test]
	fn test_contacts_ignored_without_grip() {
		let mut fingers = FingerGripController::new();
		fingers.set_all_capsules([Some(CapsuleId(1)); FINGER_BONE_COUNT]);
		fingers.start_grip(Side::Left, GripTarget(2));
		run(&mut fingers, 5, &NoContacts);
		fingers.stop_grip(Side::Left);
		let always = |_: CapsuleId, _: GripTarget| true;
		run(&mut fingers, 400, &always);
		assert_eq!(fingers.bone(FingerBone::LeftIndex01).blend, 0.);
	}
}
