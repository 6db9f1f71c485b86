//! Full body tracking for VR avatars driven by only a headset and two
//! controllers.
//!
//! Every tick a [`BodyTrackingFrame`] turns the tracked head and controller
//! poses into IK targets for the avatar's animation graph: where the torso
//! stands and which way it faces, where the hands go, how the feet sit on the
//! ground under them, and how far each finger bone curls around a held object.
//! The results are published as one immutable [`IkSnapshot`] that can be read
//! from any thread through a [`SnapshotReader`].
//!
//! The crate does no rendering and no physics. Ground queries and finger
//! contacts are answered by the host through the [`GroundProbe`] and
//! [`FingerContacts`] traits, and [`plugin::BodyTrackingPlugin`] wires all of
//! it into a bevy app.
//!
//! World axes are X forward, Y right and Z up, in centimeters. Angles are in
//! degrees.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod fingers;
pub mod foot;
pub mod frame;
pub mod geometry;
pub mod hands;
pub mod plugin;
pub mod probe;
pub mod side;
pub mod snapshot;
pub mod torso;

pub use crate::config::{BodyTrackingConfig, ConfigUpdate};
pub use crate::error::{ConfigError, Reference, TrackingError};
pub use crate::fingers::{
	CapsuleId, FingerBone, FingerContacts, FingerGripController, GripTarget,
	NoContacts,
};
pub use crate::foot::{FootIkState, FootPlacementSolver, TraceOutcome};
pub use crate::frame::{BodyTrackingFrame, TrackingInputs};
pub use crate::geometry::{Pose, Rotator};
pub use crate::hands::{HandTarget, HandTargetResolver, SocketOffset};
pub use crate::probe::{GroundProbe, NoGround, PlaneProbe, ProbeHit, ProbeRay, ProbeSet};
pub use crate::side::{Side, Sided};
pub use crate::snapshot::{CharacterState, IkSnapshot, SnapshotReader};
pub use crate::torso::{TorsoFollowController, TorsoOutput};
