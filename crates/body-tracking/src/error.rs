use bevy::utils::HashSet;
use derive_more::Display;
use tracing::{info, trace, warn};

use crate::side::Side;

/// An external input the tracker borrows each tick.
#[derive(Debug, Display, Eq, PartialEq, Copy, Clone, Hash)]
pub enum Reference {
	#[display("head")]
	Head,
	#[display("{_0} controller")]
	Controller(Side),
	#[display("{_0} foot")]
	Foot(Side),
}

/// Reasons a tick, or part of one, was skipped.
///
/// None of these are fatal: whoever detects one keeps its previous state.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingError {
	#[error("{0} is unavailable")]
	MissingReference(Reference),
	#[error("degenerate input: {0}")]
	DegenerateInput(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
	#[error("failed to parse body tracking config")]
	Parse(#[from] serde_json::Error),
}

/// Reports a missing reference when it drops out and when it comes back,
/// instead of on every tick in between.
#[derive(Debug, Default)]
pub(crate) struct MissingLatch {
	missing: HashSet<Reference>,
}

impl MissingLatch {
	pub fn report(&mut self, err: TrackingError) {
		match err {
			TrackingError::MissingReference(reference) => {
				if self.missing.insert(reference) {
					warn!("{err}, holding its last IK values");
				} else {
					trace!("{err}");
				}
			}
			TrackingError::DegenerateInput(_) => trace!("skipped: {err}"),
		}
	}

	pub fn restore(&mut self, reference: Reference) {
		if self.missing.remove(&reference) {
			info!("{reference} is available again");
		}
	}

	pub fn is_missing(&self, reference: Reference) -> bool {
		self.missing.contains(&reference)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_reference_display() {
		assert_eq!(Reference::Head.to_string(), "head");
		assert_eq!(
			Reference::Controller(Side::Left).to_string(),
			"left controller"
		);
		assert_eq!(
			TrackingError::MissingReference(Reference::Foot(Side::Right)).to_string(),
			"right foot is unavailable"
		);
	}

	#[test]
	fn test_latch_tracks_dropouts() {
		let mut latch = MissingLatch::default();
		let head = TrackingError::MissingReference(Reference::Head);
		latch.report(head);
		latch.report(head);
		assert!(latch.is_missing(Reference::Head));
		latch.restore(Reference::Head);
		assert!(!latch.is_missing(Reference::Head));

		latch.report(TrackingError::DegenerateInput("zero delta time"));
		assert!(!latch.is_missing(Reference::Head));
	}
}
