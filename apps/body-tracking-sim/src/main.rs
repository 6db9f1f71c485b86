mod scenario;

use std::{path::PathBuf, time::Duration};

use bevy::{app::App, time::Time};
use body_tracking::{
	plugin::{
		BodyTracker, BodyTrackingPlugin, FingerContactsResource, GroundProbeResource,
		TrackedInputs,
	},
	BodyTrackingConfig, BodyTrackingFrame, CapsuleId, GripTarget, IkSnapshot, Side,
};
use clap::Parser as _;
use color_eyre::eyre::{bail, Context as _};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::scenario::Event;

#[derive(clap::Parser, Debug)]
struct Cli {
	/// JSON file with body tracking settings. Missing fields keep their defaults.
	#[clap(long, env = "BODY_TRACKING_CONFIG")]
	config: Option<PathBuf>,
	/// Number of ticks to run. Defaults to the whole scripted session.
	#[clap(long)]
	ticks: Option<u32>,
	/// Seconds per tick.
	#[clap(long, default_value_t = 1. / 90.)]
	dt: f32,
	/// Log a summary every this many ticks.
	#[clap(long, default_value_t = 30)]
	report_every: u32,
}

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or("info".into()))
		.with(tracing_subscriber::fmt::layer())
		.init();

	let cli = Cli::parse();
	if !(cli.dt > 0.) {
		bail!("--dt must be positive, got {}", cli.dt);
	}

	let config = match &cli.config {
		Some(path) => {
			let json = std::fs::read_to_string(path).wrap_err_with(|| {
				format!("failed to read config file {}", path.display())
			})?;
			BodyTrackingConfig::from_json_str(&json).wrap_err_with(|| {
				format!("invalid config file {}", path.display())
			})?
		}
		None => BodyTrackingConfig::default(),
	};
	info!(?config, "loaded config");

	let ticks = cli
		.ticks
		.unwrap_or((scenario::DURATION / cli.dt).ceil() as u32);

	let mut frame = BodyTrackingFrame::new(config);
	frame.set_all_capsules(scenario::capsules());

	let mut app = App::new();
	app.init_resource::<Time>()
		.add_plugins(BodyTrackingPlugin)
		.insert_resource(GroundProbeResource(Box::new(scenario::ground())));
	let tracker = app
		.world
		.spawn((BodyTracker(frame), TrackedInputs::default()))
		.id();

	let mut t = 0.;
	for tick in 1..=ticks {
		let next = t + cli.dt;
		let sample = scenario::sample(next);
		app.insert_resource(FingerContactsResource(Box::new(
			move |capsule: CapsuleId, target: GripTarget| {
				scenario::fingertips_on_mug(next, capsule, target)
			},
		)));

		let mut entity = app.world.entity_mut(tracker);
		let Some(mut body) = entity.get_mut::<BodyTracker>() else {
			bail!("tracker entity lost its BodyTracker");
		};
		for event in scenario::events_between(t, next) {
			info!(?event, time = next, "scripted event");
			match event {
				Event::StartGrip(side, target) => body.start_grip(side, target),
				Event::StopGrip(side) => body.stop_grip(side),
				Event::BeginTeleport => body.begin_teleport(),
				Event::EndTeleport => body.end_teleport(),
			}
		}
		entity.insert(TrackedInputs {
			head: Some(sample.head),
			controllers: sample.controllers,
			feet: sample.feet,
		});

		app.world
			.resource_mut::<Time>()
			.advance_by(Duration::from_secs_f32(cli.dt));
		app.update();
		t = next;

		if tick % cli.report_every.max(1) == 0 || tick == ticks {
			let Some(body) = app.world.get::<BodyTracker>(tracker) else {
				bail!("tracker entity lost its BodyTracker");
			};
			let snapshot = body.snapshot();
			report(t, &snapshot);
			let json = serde_json::to_string(&*snapshot)
				.wrap_err("failed to serialize snapshot")?;
			debug!(snapshot = %json);
		}
	}

	Ok(())
}

fn report(time: f32, snapshot: &IkSnapshot) {
	let right_curl = snapshot
		.finger_blends()
		.filter(|(bone, _)| bone.side() == Side::Right)
		.map(|(_, blend)| blend)
		.sum::<f32>()
		/ body_tracking::fingers::BONES_PER_HAND as f32;
	info!(
		time,
		tick = snapshot.tick,
		state = ?snapshot.state,
		body = ?snapshot.torso.body_position,
		yaw = snapshot.torso.body_yaw,
		speed = snapshot.torso.movement_speed,
		direction = snapshot.torso.movement_direction,
		left_foot = snapshot.feet[Side::Left].effector,
		right_foot = snapshot.feet[Side::Right].effector,
		left_trace = ?snapshot.foot_outcomes[Side::Left],
		left_hand_stale = snapshot.hands[Side::Left].stale,
		right_curl,
		"snapshot"
	);
}
