//! A scripted VR session: stand, walk onto a ledge, turn, crouch, grab a mug,
//! drop the left controller for a moment, then teleport away.

use bevy::math::{Vec2, Vec3};
use body_tracking::{
	fingers::Joint, CapsuleId, FingerBone, GripTarget, PlaneProbe, Pose, ProbeSet,
	Rotator, Side, Sided,
};

pub const MUG: GripTarget = GripTarget(1);

const STAND_HEIGHT: f32 = 170.;
const CROUCH_HEIGHT: f32 = 110.;
const WALK_SPEED: f32 = 100.;
const LEDGE_HEIGHT: f32 = 15.;
const TELEPORT_TO: Vec3 = Vec3::new(1000., 400., STAND_HEIGHT);
/// Half the distance between the feet.
const STANCE: f32 = 12.;

const WALK: (f32, f32) = (2., 4.);
const TURN: (f32, f32) = (4., 5.);
const CROUCH: (f32, f32) = (5., 7.);
const GRIP: (f32, f32) = (8., 10.);
/// The fingers reach the mug this long after the grab starts.
const REACH_TIME: f32 = 0.25;
const LEFT_DROPOUT: (f32, f32) = (9.5, 9.8);
const TELEPORT: (f32, f32) = (11., 11.1);

pub const DURATION: f32 = 12.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
	StartGrip(Side, GripTarget),
	StopGrip(Side),
	BeginTeleport,
	EndTeleport,
}

const EVENTS: [(f32, Event); 4] = [
	(GRIP.0, Event::StartGrip(Side::Right, MUG)),
	(GRIP.1, Event::StopGrip(Side::Right)),
	(TELEPORT.0, Event::BeginTeleport),
	(TELEPORT.1, Event::EndTeleport),
];

/// Tracked poses at one moment of the session.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
	pub head: Pose,
	pub controllers: Sided<Option<Pose>>,
	pub feet: Sided<Option<Vec3>>,
}

/// Events whose time falls in `(from, to]`.
pub fn events_between(from: f32, to: f32) -> impl Iterator<Item = Event> {
	EVENTS
		.into_iter()
		.filter(move |(at, _)| from < *at && *at <= to)
		.map(|(_, event)| event)
}

/// Linear progress through `phase`, clamped to 0..=1.
fn progress(t: f32, (start, end): (f32, f32)) -> f32 {
	((t - start) / (end - start)).clamp(0., 1.)
}

fn within(t: f32, (start, end): (f32, f32)) -> bool {
	start <= t && t < end
}

pub fn sample(t: f32) -> Sample {
	let teleported = t >= TELEPORT.0;
	let yaw = 90. * progress(t, TURN);
	let height = if t < CROUCH.0 {
		STAND_HEIGHT
	} else {
		// down for the first half, back up for the second
		let p = progress(t, CROUCH);
		let depth = 1. - (2. * p - 1.).abs();
		STAND_HEIGHT + (CROUCH_HEIGHT - STAND_HEIGHT) * depth
	};
	let position = if teleported {
		TELEPORT_TO
	} else {
		let walked = WALK_SPEED * (WALK.1 - WALK.0) * progress(t, WALK);
		Vec3::new(walked, 0., height)
	};
	let head = Pose::from_rotator(position, Rotator::from_yaw(yaw));

	let controllers = Sided::from_fn(|side| {
		if side == Side::Left && within(t, LEFT_DROPOUT) {
			return None;
		}
		let lateral = match side {
			Side::Left => -25.,
			Side::Right => 25.,
		};
		let reach = if side == Side::Right && within(t, GRIP) {
			45.
		} else {
			20.
		};
		let offset = head.forward() * reach + head.right() * lateral - Vec3::Z * 50.;
		Some(Pose::new(head.position + offset, head.rotation))
	});

	let feet = Sided::from_fn(|side| {
		let lateral = match side {
			Side::Left => -STANCE,
			Side::Right => STANCE,
		};
		let under = head.position + head.right() * lateral;
		Some(Vec3::new(under.x, under.y, 0.))
	});

	Sample {
		head,
		controllers,
		feet,
	}
}

/// The floor, plus a raised platform where the walk ends.
pub fn ground() -> ProbeSet {
	ProbeSet::new().with(PlaneProbe::floor(0.)).with(
		PlaneProbe::floor(LEDGE_HEIGHT)
			.with_bounds(Vec2::new(150., -100.), Vec2::new(400., 100.)),
	)
}

/// Capsule handles for every finger bone, numbered by bone index.
pub fn capsules() -> [Option<CapsuleId>; body_tracking::fingers::FINGER_BONE_COUNT] {
	std::array::from_fn(|idx| Some(CapsuleId(idx as u64)))
}

/// Whether the fingertips of the right hand are on the mug at time `t`.
pub fn fingertips_on_mug(t: f32, capsule: CapsuleId, target: GripTarget) -> bool {
	let Some(bone) = usize::try_from(capsule.0).ok().and_then(FingerBone::from_index)
	else {
		return false;
	};
	target == MUG
		&& bone.side() == Side::Right
		&& bone.joint() == Joint::Distal
		&& t >= GRIP.0 + REACH_TIME
}

#[cfg(test)]
mod test {
	use super::*;

	use body_tracking::{BodyTrackingConfig, FootPlacementSolver, GroundProbe};

	#[test]
	fn test_events_fire_once() {
		let mut fired = Vec::new();
		let dt = 1. / 90.;
		let mut t = 0.;
		while t < DURATION {
			fired.extend(events_between(t, t + dt));
			t += dt;
		}
		assert_eq!(fired.len(), EVENTS.len());
		assert_eq!(fired[0], Event::StartGrip(Side::Right, MUG));
	}

	#[test]
	fn test_walk_ends_on_the_ledge() {
		let end = sample(WALK.1);
		let foot = end.feet[Side::Left].unwrap();
		let hit = ground()
			.cast(
				&FootPlacementSolver::new(BodyTrackingConfig::default().foot_trace_height())
					.probe_ray(foot),
			)
			.unwrap();
		assert!((hit.point.z - LEDGE_HEIGHT).abs() < 1.0e-3);
	}

	#[test]
	fn test_crouch_returns_to_standing() {
		assert_eq!(sample(CROUCH.0).head.position.z, STAND_HEIGHT);
		assert!((sample(6.).head.position.z - CROUCH_HEIGHT).abs() < 1.0e-3);
		assert_eq!(sample(CROUCH.1).head.position.z, STAND_HEIGHT);
	}

	#[test]
	fn test_left_controller_drops_out() {
		assert!(sample(9.6).controllers[Side::Left].is_none());
		assert!(sample(9.9).controllers[Side::Left].is_some());
	}
}
