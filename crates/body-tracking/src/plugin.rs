//! Drives trackers from a bevy app.

use bevy::{
	math::Vec3,
	prelude::{
		Component, Deref, DerefMut, IntoSystemConfigs, Plugin, PreUpdate, Query, Res,
		Resource, SystemSet,
	},
	time::Time,
};

use crate::{
	fingers::{FingerContacts, NoContacts},
	frame::{BodyTrackingFrame, TrackingInputs},
	geometry::Pose,
	probe::{GroundProbe, NoGround},
	side::Sided,
};

/// Ticks every [`BodyTracker`] in [`PreUpdate`], so animation systems in
/// `Update` see this frame's snapshot.
#[derive(Default)]
pub struct BodyTrackingPlugin;

impl Plugin for BodyTrackingPlugin {
	fn build(&self, app: &mut bevy::prelude::App) {
		app.init_resource::<GroundProbeResource>()
			.init_resource::<FingerContactsResource>()
			.add_systems(PreUpdate, tick_trackers.in_set(BodyTrackingSet));
	}
}

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyTrackingSet;

#[derive(Component, Deref, DerefMut, Default)]
pub struct BodyTracker(pub BodyTrackingFrame);

/// Tracked poses for an entity's [`BodyTracker`]. Whoever reads the headset
/// writes this before [`PreUpdate`].
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct TrackedInputs {
	pub head: Option<Pose>,
	pub controllers: Sided<Option<Pose>>,
	pub feet: Sided<Option<Vec3>>,
}

#[derive(Resource, Deref, DerefMut)]
pub struct GroundProbeResource(pub Box<dyn GroundProbe + Send + Sync>);

impl Default for GroundProbeResource {
	fn default() -> Self {
		Self(Box::new(NoGround))
	}
}

#[derive(Resource, Deref, DerefMut)]
pub struct FingerContactsResource(pub Box<dyn FingerContacts + Send + Sync>);

impl Default for FingerContactsResource {
	fn default() -> Self {
		Self(Box::new(NoContacts))
	}
}

pub fn tick_trackers(
	time: Res<Time>,
	ground: Res<GroundProbeResource>,
	contacts: Res<FingerContactsResource>,
	mut trackers: Query<(&mut BodyTracker, &TrackedInputs)>,
) {
	let dt = time.delta_seconds();
	for (mut tracker, tracked) in trackers.iter_mut() {
		let inputs = TrackingInputs {
			head: tracked.head,
			controllers: tracked.controllers,
			feet: tracked.feet,
			ground: &*ground.0,
			contacts: &*contacts.0,
		};
		tracker.tick(dt, &inputs);
	}
}
