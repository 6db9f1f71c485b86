//! Runs every solver once per tick and publishes the result.

use std::sync::Arc;

use bevy::math::Vec3;
use tracing::{debug, trace};

use crate::{
	config::{BodyTrackingConfig, ConfigUpdate},
	error::{MissingLatch, Reference, TrackingError},
	fingers::{
		CapsuleId, FingerBone, FingerContacts, FingerGripController, GripTarget,
		NoContacts, FINGER_BONE_COUNT,
	},
	foot::{FootIkState, FootPlacementSolver, TraceOutcome},
	geometry::Pose,
	hands::{HandTargetResolver, SocketOffset},
	probe::{GroundProbe, NoGround},
	side::{Side, Sided},
	snapshot::{
		CharacterState, HandIk, HeadIk, IkSnapshot, SnapshotPublisher, SnapshotReader,
	},
	torso::{FollowMode, TorsoFollowController},
};

/// Everything the tracker borrows from the host for one tick.
#[derive(Clone, Copy)]
pub struct TrackingInputs<'a> {
	pub head: Option<Pose>,
	pub controllers: Sided<Option<Pose>>,
	/// Foot bone locations from the animated skeleton.
	pub feet: Sided<Option<Vec3>>,
	pub ground: &'a dyn GroundProbe,
	pub contacts: &'a dyn FingerContacts,
}

impl Default for TrackingInputs<'_> {
	fn default() -> Self {
		Self {
			head: None,
			controllers: Sided::default(),
			feet: Sided::default(),
			ground: &NoGround,
			contacts: &NoContacts,
		}
	}
}

impl<'a> TrackingInputs<'a> {
	pub fn new(head: Pose) -> Self {
		Self {
			head: Some(head),
			..Default::default()
		}
	}

	pub fn with_controller(mut self, side: Side, controller: Pose) -> Self {
		self.controllers[side] = Some(controller);
		self
	}

	pub fn with_foot(mut self, side: Side, foot: Vec3) -> Self {
		self.feet[side] = Some(foot);
		self
	}

	pub fn with_ground(mut self, ground: &'a dyn GroundProbe) -> Self {
		self.ground = ground;
		self
	}

	pub fn with_contacts(mut self, contacts: &'a dyn FingerContacts) -> Self {
		self.contacts = contacts;
		self
	}
}

/// Body tracking for one avatar.
///
/// Owns the per-solver state and the config. Host events (grip, teleport,
/// config changes) take `&mut self`, so they always land between ticks.
pub struct BodyTrackingFrame {
	config: BodyTrackingConfig,
	torso: TorsoFollowController,
	hands: HandTargetResolver,
	feet: Sided<FootIkState>,
	fingers: FingerGripController,
	teleporting: bool,
	climbing: bool,
	pending_dt: f32,
	ticks: u64,
	latch: MissingLatch,
	publisher: SnapshotPublisher,
}

impl Default for BodyTrackingFrame {
	fn default() -> Self {
		Self::new(BodyTrackingConfig::default())
	}
}

impl BodyTrackingFrame {
	pub fn new(config: BodyTrackingConfig) -> Self {
		Self {
			config: config.sanitized(),
			torso: TorsoFollowController::new(),
			hands: HandTargetResolver::new(),
			feet: Sided::default(),
			fingers: FingerGripController::new(),
			teleporting: false,
			climbing: false,
			pending_dt: 0.,
			ticks: 0,
			latch: MissingLatch::default(),
			publisher: SnapshotPublisher::new(),
		}
	}

	pub fn config(&self) -> &BodyTrackingConfig {
		&self.config
	}

	pub fn torso(&self) -> &TorsoFollowController {
		&self.torso
	}

	pub fn fingers(&self) -> &FingerGripController {
		&self.fingers
	}

	/// Handle for reading snapshots from elsewhere, including other threads.
	pub fn reader(&self) -> SnapshotReader {
		self.publisher.reader()
	}

	/// The most recently published snapshot.
	pub fn snapshot(&self) -> Arc<IkSnapshot> {
		self.publisher.current()
	}

	pub fn character_state(&self) -> CharacterState {
		if self.teleporting {
			CharacterState::Teleporting
		} else if self.climbing {
			CharacterState::Climbing
		} else {
			CharacterState::Idle
		}
	}

	/// Whether `reference` was absent on the latest tick that needed it.
	pub fn is_missing(&self, reference: Reference) -> bool {
		self.latch.is_missing(reference)
	}

	fn follow_mode(&self) -> FollowMode {
		match self.character_state() {
			CharacterState::Idle => FollowMode::Follow,
			CharacterState::Teleporting => FollowMode::Teleport,
			CharacterState::Climbing => FollowMode::Hold,
		}
	}

	/// Advances every solver by `dt` seconds and publishes a new snapshot.
	///
	/// Returns the previous snapshot unchanged when the tick is skipped: `dt`
	/// is not positive, not enough time has accumulated yet, or there is no
	/// head pose.
	pub fn tick(&mut self, dt: f32, inputs: &TrackingInputs) -> Arc<IkSnapshot> {
		if !(dt > 0.) {
			self.latch
				.report(TrackingError::DegenerateInput("non-positive delta time"));
			return self.publisher.current();
		}
		self.pending_dt += dt;
		if self.pending_dt < self.config.min_tick_interval {
			trace!(pending = self.pending_dt, "accumulating short frame");
			return self.publisher.current();
		}
		let dt = std::mem::take(&mut self.pending_dt);

		let Some(head) = inputs.head else {
			self.latch
				.report(TrackingError::MissingReference(Reference::Head));
			return self.publisher.current();
		};
		self.latch.restore(Reference::Head);

		let mode = self.follow_mode();
		let torso = match self.torso.advance(dt, &head, &self.config, mode) {
			Ok(torso) => torso,
			Err(err) => {
				self.latch.report(err);
				return self.publisher.current();
			}
		};
		let head_ik = HeadIk::from_camera(&head, self.config.body_offset);

		for side in Side::BOTH {
			let socket = self.config.hand_socket(side);
			match self.hands.update(side, inputs.controllers[side].as_ref(), socket) {
				Ok(_) => self.latch.restore(Reference::Controller(side)),
				Err(err) => self.latch.report(err),
			}
		}

		let solver = FootPlacementSolver::new(self.config.foot_trace_height());
		let mut foot_outcomes = Sided::<Option<TraceOutcome>>::default();
		for side in Side::BOTH {
			let Some(foot) = inputs.feet[side] else {
				self.latch
					.report(TrackingError::MissingReference(Reference::Foot(side)));
				continue;
			};
			self.latch.restore(Reference::Foot(side));
			let trace = solver.trace(foot, inputs.ground, self.feet[side]);
			self.feet[side] = trace.state;
			foot_outcomes[side] = Some(trace.outcome);
		}

		self.fingers
			.tick(dt, self.config.finger_interp_speed, inputs.contacts);

		self.ticks += 1;
		let hands = &self.hands;
		let snapshot = IkSnapshot {
			tick: self.ticks,
			state: self.character_state(),
			torso,
			head: head_ik,
			hands: Sided::from_fn(|side| HandIk {
				target: hands.target(side),
				stale: hands.is_stale(side),
			}),
			feet: self.feet,
			foot_outcomes,
			fingers: self.fingers.blends(),
		};
		self.publisher.publish(snapshot)
	}

	pub fn start_grip(&mut self, side: Side, target: GripTarget) {
		self.fingers.start_grip(side, target);
	}

	pub fn stop_grip(&mut self, side: Side) {
		self.fingers.stop_grip(side);
	}

	pub fn set_capsule(&mut self, bone: FingerBone, capsule: Option<CapsuleId>) {
		self.fingers.set_capsule(bone, capsule);
	}

	pub fn set_all_capsules(&mut self, capsules: [Option<CapsuleId>; FINGER_BONE_COUNT]) {
		self.fingers.set_all_capsules(capsules);
	}

	/// While teleporting the body snaps to the head every tick.
	pub fn begin_teleport(&mut self) {
		debug!("begin teleport");
		self.teleporting = true;
	}

	pub fn end_teleport(&mut self) {
		debug!("end teleport");
		self.teleporting = false;
	}

	pub fn set_climbing(&mut self, climbing: bool) {
		if self.climbing != climbing {
			debug!(climbing, "climbing changed");
		}
		self.climbing = climbing;
	}

	pub fn update_config(&mut self, update: ConfigUpdate) {
		debug!(?update, "config update");
		self.config.apply(update);
	}

	pub fn set_movement_threshold(&mut self, value: f32) {
		self.update_config(ConfigUpdate::MovementThreshold(value));
	}

	pub fn set_rotation_threshold(&mut self, value: f32) {
		self.update_config(ConfigUpdate::RotationThreshold(value));
	}

	pub fn set_player_height(&mut self, value: f32) {
		self.update_config(ConfigUpdate::PlayerHeight(value));
	}

	pub fn set_body_offset(&mut self, value: f32) {
		self.update_config(ConfigUpdate::BodyOffset(value));
	}

	pub fn set_body_rotation_offset(&mut self, value: f32) {
		self.update_config(ConfigUpdate::BodyRotationOffset(value));
	}

	pub fn set_movement_speed_multiplier(&mut self, value: f32) {
		self.update_config(ConfigUpdate::MovementSpeedMultiplier(value));
	}

	pub fn set_finger_interp_speed(&mut self, value: f32) {
		self.update_config(ConfigUpdate::FingerInterpSpeed(value));
	}

	pub fn set_hand_socket(&mut self, side: Side, socket: SocketOffset) {
		self.update_config(ConfigUpdate::HandSocket(side, socket));
	}
}
