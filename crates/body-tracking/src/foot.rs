//! Plants the feet on the ground under them.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
	geometry::Rotator,
	probe::{GroundProbe, ProbeHit, ProbeRay},
};

/// IK values for one foot, as consumed by the animation graph.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct FootIkState {
	/// Where the ground was hit.
	pub location: Vec3,
	/// How far the foot has to be raised to stand on the hit.
	pub effector: f32,
	/// Tilt that lays the sole flush with the surface. Yaw is always 0.
	pub rotation: Rotator,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum TraceOutcome {
	/// The ground was hit at or above the foot.
	Planted,
	/// Nothing under the foot within the trace height.
	Miss,
	/// Ground was found only below the foot, e.g. stepping off a ledge.
	BelowFoot,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootTrace {
	pub state: FootIkState,
	pub outcome: TraceOutcome,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootPlacementSolver {
	trace_height: f32,
}

impl FootPlacementSolver {
	pub fn new(trace_height: f32) -> Self {
		Self { trace_height }
	}

	pub fn probe_ray(&self, foot: Vec3) -> ProbeRay {
		ProbeRay {
			start: foot + Vec3::Z * self.trace_height,
			end: foot,
			exclude_self: true,
		}
	}

	/// Traces under `foot`. Anything but a hit at or above the foot keeps
	/// `previous` untouched, which avoids the foot popping at ledge edges.
	pub fn trace(
		&self,
		foot: Vec3,
		probe: &(impl GroundProbe + ?Sized),
		previous: FootIkState,
	) -> FootTrace {
		let Some(hit) = probe.cast(&self.probe_ray(foot)) else {
			trace!(?foot, "foot trace missed, holding previous placement");
			return FootTrace {
				state: previous,
				outcome: TraceOutcome::Miss,
			};
		};
		if hit.point.z < foot.z {
			trace!(?foot, ?hit, "ground is below the foot, holding previous placement");
			return FootTrace {
				state: previous,
				outcome: TraceOutcome::BelowFoot,
			};
		}
		FootTrace {
			state: placement(foot, &hit),
			outcome: TraceOutcome::Planted,
		}
	}
}

fn placement(foot: Vec3, hit: &ProbeHit) -> FootIkState {
	let n = hit.normal;
	FootIkState {
		location: hit.point,
		effector: (hit.point.z - foot.z).abs(),
		rotation: Rotator {
			pitch: n.x.atan2(n.z).to_degrees(),
			yaw: 0.,
			roll: n.y.atan2(n.z).to_degrees(),
		},
	}
}

#[cfg(test)]
mod test {
	use super::*;

	use crate::probe::{NoGround, PlaneProbe};

	fn solver() -> FootPlacementSolver {
		FootPlacementSolver::new(90.)
	}

	#[test]
	fn test_flat_step_up() {
		let trace = solver().trace(Vec3::new(10., 5., 0.), &PlaneProbe::floor(5.), FootIkState::default());
		assert_eq!(trace.outcome, TraceOutcome::Planted);
		assert!((trace.state.effector - 5.).abs() < 1.0e-4);
		assert!((trace.state.location.z - 5.).abs() < 1.0e-4);
		assert_eq!(trace.state.rotation.roll, 0.);
		assert_eq!(trace.state.rotation.pitch, 0.);
		assert_eq!(trace.state.rotation.yaw, 0.);
	}

	#[test]
	fn test_slope_tilts_foot() {
		let normal = Vec3::new(0., 1., 1.).normalize();
		let slope = PlaneProbe::new(Vec3::ZERO, normal);
		let trace = solver().trace(Vec3::new(0., -10., 0.), &slope, FootIkState::default());
		assert_eq!(trace.outcome, TraceOutcome::Planted);
		assert!((trace.state.rotation.roll - 45.).abs() < 1.0e-3);
		assert!(trace.state.rotation.pitch.abs() < 1.0e-3);
		assert!((trace.state.effector - 10.).abs() < 1.0e-3);
	}

	#[test]
	fn test_miss_holds_previous() {
		let previous = FootIkState {
			location: Vec3::new(1., 2., 3.),
			effector: 3.,
			rotation: Rotator::new(4., 0., 5.),
		};
		let first = solver().trace(Vec3::ZERO, &NoGround, previous);
		let second = solver().trace(Vec3::ZERO, &NoGround, first.state);
		assert_eq!(first.outcome, TraceOutcome::Miss);
		assert_eq!(second.state, previous);
	}

	#[test]
	fn test_ground_below_foot_holds_previous() {
		let probe = |ray: &ProbeRay| {
			Some(ProbeHit {
				point: ray.end - Vec3::Z * 2.,
				normal: Vec3::Z,
			})
		};
		let previous = FootIkState {
			effector: 7.,
			..Default::default()
		};
		let trace = solver().trace(Vec3::new(0., 0., 30.), &probe, previous);
		assert_eq!(trace.outcome, TraceOutcome::BelowFoot);
		assert_eq!(trace.state, previous);
	}

	#[test]
	fn test_probe_ray_spans_trace_height() {
		let ray = solver().probe_ray(Vec3::new(1., 2., 3.));
		assert_eq!(ray.start, Vec3::new(1., 2., 93.));
		assert_eq!(ray.end, Vec3::new(1., 2., 3.));
		assert!(ray.exclude_self);
	}
}
