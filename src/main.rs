//! Drone Swarm headless driver
//!
//! Loads settings, plays one round with a scripted human player and prints
//! the final snapshot as JSON.
//!
//! Usage: `drone-swarm [settings.json] [WIDTHxHEIGHT]`. A viewport given as
//! the second argument is applied mid-round.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use drone_swarm::consts::*;
    use drone_swarm::sim::{
        Command, GamePhase, GameState, RoundOutcome, Snapshot, TargetRef, TickInput,
        UpgradeAttribute, tick,
    };
    use drone_swarm::Settings;

    /// Ten simulated minutes
    const TICK_LIMIT: u64 = 36_000;
    /// Ticks between scripted rally moves
    const RALLY_EVERY: u64 = 300;
    /// Ticks between upgrade attempts
    const UPGRADE_EVERY: u64 = 120;
    /// Tick at which a viewport given on the command line is applied
    const RESIZE_AT: u64 = 1_800;

    /// Parse `WIDTHxHEIGHT`
    fn parse_viewport(arg: &str) -> Option<(f32, f32)> {
        let (w, h) = arg.split_once('x')?;
        let width = w.trim().parse::<f32>().ok()?;
        let height = h.trim().parse::<f32>().ok()?;
        (width > 0.0 && height > 0.0).then_some((width, height))
    }

    /// Scripted commands for the human player on this tick
    fn scripted_commands(state: &GameState) -> Vec<Command> {
        let mut commands = Vec::new();
        let Some(human) = state.human() else {
            return commands;
        };
        let frame = state.frame;
        let me = &state.players[human];

        let enemy = state
            .players
            .iter()
            .filter(|p| p.team != me.team && p.base.is_alive())
            .min_by(|a, b| {
                a.base
                    .pos
                    .distance_squared(me.base.pos)
                    .total_cmp(&b.base.pos.distance_squared(me.base.pos))
            });

        if let Some(enemy) = enemy
            && frame % RALLY_EVERY == 0
        {
            // Creep toward the nearest enemy, committing to its base later on
            let wave = (frame / RALLY_EVERY).min(4) as f32 / 4.0;
            if wave >= 1.0 {
                commands.push(Command::SetAttackTarget(TargetRef::Base(enemy.id)));
            } else {
                let point = me.base.pos.lerp(enemy.base.pos, 0.25 + wave * 0.5);
                commands.push(Command::SetRallyPoint {
                    x: point.x,
                    y: point.y,
                });
            }
        }

        if frame % UPGRADE_EVERY == 0 && me.resources > 0 {
            let attribute = UpgradeAttribute::ALL[(frame / UPGRADE_EVERY) as usize % 4];
            commands.push(Command::RequestUpgrade(attribute));
        }
        commands
    }

    pub fn run() {
        env_logger::init();
        log::info!("Drone Swarm (headless) starting...");

        let mut args = std::env::args().skip(1);
        let settings = match args.next() {
            Some(path) => Settings::load_or_default(path),
            None => Settings::default(),
        };
        let resize = args.next().and_then(|arg| {
            let parsed = parse_viewport(&arg);
            if parsed.is_none() {
                log::warn!("Ignoring viewport {arg:?}, expected WIDTHxHEIGHT");
            }
            parsed
        });
        let device_pixel_ratio = settings.viewport.device_pixel_ratio;
        let mut state = GameState::new(settings);
        state.start_round();

        while state.phase == GamePhase::Playing && state.frame < TICK_LIMIT {
            let mut commands = scripted_commands(&state);
            if let Some((width, height)) = resize
                && state.frame == RESIZE_AT
            {
                commands.push(Command::Resize {
                    width,
                    height,
                    device_pixel_ratio,
                });
            }
            let input = TickInput {
                commands,
                pause: false,
            };
            tick(&mut state, &input, SIM_DT_MS);
        }

        match state.outcome {
            Some(RoundOutcome::Victory { team }) => {
                log::info!("Team {team} wins after {} ticks", state.frame)
            }
            Some(RoundOutcome::Draw) => log::info!("Draw after {} ticks", state.frame),
            None => log::info!("Tick limit reached with the round still running"),
        }

        match Snapshot::capture(&state).to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => log::error!("Failed to serialize snapshot: {err}"),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on the web; a host page drives `sim::tick` itself
}
