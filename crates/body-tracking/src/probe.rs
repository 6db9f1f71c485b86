//! Downward ray queries against the host's collision world.

use bevy::math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A line segment to test against the world, from `start` to `end`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeRay {
	pub start: Vec3,
	pub end: Vec3,
	/// The avatar's own colliders must not block the ray.
	pub exclude_self: bool,
}

/// The first blocking surface along a [`ProbeRay`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeHit {
	pub point: Vec3,
	pub normal: Vec3,
}

/// Casts a ray and returns the first blocking hit, if any.
///
/// Implementations must be synchronous; an async physics backend needs an
/// adapter that resolves the query before returning.
pub trait GroundProbe {
	fn cast(&self, ray: &ProbeRay) -> Option<ProbeHit>;
}

impl<F> GroundProbe for F
where
	F: Fn(&ProbeRay) -> Option<ProbeHit>,
{
	fn cast(&self, ray: &ProbeRay) -> Option<ProbeHit> {
		self(ray)
	}
}

/// A world with nothing to stand on.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGround;

impl GroundProbe for NoGround {
	fn cast(&self, _ray: &ProbeRay) -> Option<ProbeHit> {
		None
	}
}

/// An infinite plane, optionally limited to an XY rectangle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PlaneProbe {
	pub point: Vec3,
	pub normal: Vec3,
	/// `(min, max)` corners of the area the plane covers.
	#[serde(default)]
	pub bounds: Option<(Vec2, Vec2)>,
}

impl PlaneProbe {
	/// Flat ground at height `z`.
	pub fn floor(z: f32) -> Self {
		Self {
			point: Vec3::new(0., 0., z),
			normal: Vec3::Z,
			bounds: None,
		}
	}

	pub fn new(point: Vec3, normal: Vec3) -> Self {
		Self {
			point,
			normal,
			bounds: None,
		}
	}

	pub fn with_bounds(mut self, min: Vec2, max: Vec2) -> Self {
		self.bounds = Some((min.min(max), min.max(max)));
		self
	}
}

impl GroundProbe for PlaneProbe {
	fn cast(&self, ray: &ProbeRay) -> Option<ProbeHit> {
		let normal = self.normal.try_normalize()?;
		let dir = ray.end - ray.start;
		let denom = normal.dot(dir);
		// Only the front face blocks, and a parallel ray never hits.
		if denom >= -f32::EPSILON {
			return None;
		}
		let t = normal.dot(self.point - ray.start) / denom;
		if !(0.0..=1.0).contains(&t) {
			return None;
		}
		let point = ray.start + dir * t;
		if let Some((min, max)) = self.bounds {
			let flat = point.truncate();
			if flat.cmplt(min).any() || flat.cmpgt(max).any() {
				return None;
			}
		}
		Some(ProbeHit { point, normal })
	}
}

/// Several probes queried together; the hit closest to the ray start wins.
#[derive(Default)]
pub struct ProbeSet {
	probes: Vec<Box<dyn GroundProbe + Send + Sync>>,
}

impl ProbeSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, probe: impl GroundProbe + Send + Sync + 'static) -> Self {
		self.push(probe);
		self
	}

	pub fn push(&mut self, probe: impl GroundProbe + Send + Sync + 'static) {
		self.probes.push(Box::new(probe));
	}

	pub fn len(&self) -> usize {
		self.probes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.probes.is_empty()
	}
}

impl GroundProbe for ProbeSet {
	fn cast(&self, ray: &ProbeRay) -> Option<ProbeHit> {
		self.probes
			.iter()
			.filter_map(|probe| probe.cast(ray))
			.min_by(|a, b| {
				a.point
					.distance_squared(ray.start)
					.total_cmp(&b.point.distance_squared(ray.start))
			})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn down_ray(x: f32, y: f32, from: f32, to: f32) -> ProbeRay {
		ProbeRay {
			start: Vec3::new(x, y, from),
			end: Vec3::new(x, y, to),
			exclude_self: true,
		}
	}

	#[test]
	fn test_floor_hit() {
		let hit = PlaneProbe::floor(5.).cast(&down_ray(1., 2., 90., 0.)).unwrap();
		assert!(hit.point.abs_diff_eq(Vec3::new(1., 2., 5.), 1.0e-4));
		assert_eq!(hit.normal, Vec3::Z);
	}

	#[test]
	fn test_floor_out_of_segment() {
		assert_eq!(PlaneProbe::floor(-5.).cast(&down_ray(0., 0., 90., 0.)), None);
		assert_eq!(PlaneProbe::floor(100.).cast(&down_ray(0., 0., 90., 0.)), None);
	}

	#[test]
	fn test_back_face_does_not_block() {
		let ceiling = PlaneProbe::new(Vec3::new(0., 0., 50.), Vec3::NEG_Z);
		assert_eq!(ceiling.cast(&down_ray(0., 0., 90., 0.)), None);
	}

	#[test]
	fn test_bounds_and_closest_hit() {
		let set = ProbeSet::new().with(PlaneProbe::floor(0.)).with(
			PlaneProbe::floor(15.)
				.with_bounds(Vec2::new(100., -50.), Vec2::new(200., 50.)),
		);
		assert_eq!(set.len(), 2);

		let on_step = set.cast(&down_ray(150., 0., 90., -1.)).unwrap();
		assert!((on_step.point.z - 15.).abs() < 1.0e-4);

		let off_step = set.cast(&down_ray(50., 0., 90., -1.)).unwrap();
		assert!(off_step.point.z.abs() < 1.0e-4);
	}

	#[test]
	fn test_closure_probe() {
		let probe = |ray: &ProbeRay| {
			ray.exclude_self.then_some(ProbeHit {
				point: ray.end,
				normal: Vec3::Z,
			})
		};
		assert!(probe.cast(&down_ray(0., 0., 1., 0.)).is_some());
		assert_eq!(NoGround.cast(&down_ray(0., 0., 1., 0.)), None);
	}
}
