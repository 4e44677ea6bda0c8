//! AI players
//!
//! Every AI pass walks the AI players in slot order. Each one first checks its
//! battlefield awareness (distress and enemy movement), then, on its own
//! staggered cadence, picks a strategy, spends resources and (hard tier)
//! sends drones to collect debris.
//!
//! Strategy selection is a set of pure functions over an `AiView` that return
//! a `Plan`; only `run_ai_pass` mutates the game state.

pub mod awareness;
pub mod economy;
pub mod strategy;
pub mod team;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::entities::{Debris, Drone, PlayerId};
use super::state::{GameState, Player, random_between};
use crate::consts::RALLY_INSET;
use crate::polar_to_cartesian;
use crate::settings::{Difficulty, DifficultyProfile, GameMode};

/// Offsets that spread AI players across ticks
const DECISION_STAGGER: u64 = 25;
const UPGRADE_STAGGER: u64 = 50;
const COLLECT_STAGGER: u64 = 75;
const COLLECT_INTERVAL: u64 = 300;

/// Named intent behind a rally point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Patrol,
    Retreat,
    Attack,
    Gather,
    Predictive,
    MultiTarget,
    Flank,
    Counter,
    Tactical,
    Hunt,
    Defend,
    Intercept,
    Pressure,
    DefendMate,
    GuardMate,
    Regroup,
    Support,
    CloseSupport,
    Siege,
    HoldLine,
}

/// A strategy and the rally point that carries it out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub strategy: Strategy,
    pub rally: Vec2,
}

impl Plan {
    pub fn new(strategy: Strategy, rally: Vec2) -> Self {
        Self { strategy, rally }
    }
}

/// Read-only battlefield view for one AI player
#[derive(Debug, Clone, Copy)]
pub struct AiView<'a> {
    pub me: &'a Player,
    pub players: &'a [Player],
    pub debris: &'a [Debris],
    pub difficulty: Difficulty,
    pub profile: DifficultyProfile,
    pub now: f64,
}

impl<'a> AiView<'a> {
    pub fn new(
        players: &'a [Player],
        debris: &'a [Debris],
        me: PlayerId,
        difficulty: Difficulty,
        now: f64,
    ) -> Self {
        Self {
            me: &players[me],
            players,
            debris,
            difficulty,
            profile: difficulty.profile(),
            now,
        }
    }

    pub fn my_base(&self) -> Vec2 {
        self.me.base.pos
    }

    pub fn my_health_ratio(&self) -> f32 {
        self.me.base.health_ratio()
    }

    pub fn my_drone_count(&self) -> usize {
        self.me.alive_drone_count()
    }

    /// Players on other teams
    pub fn enemies(&self) -> impl Iterator<Item = &'a Player> + 'a {
        let team = self.me.team;
        self.players.iter().filter(move |p| p.team != team)
    }

    pub fn enemy_drones(&self) -> impl Iterator<Item = &'a Drone> + 'a {
        self.enemies().flat_map(|p| p.alive_drones())
    }

    /// Teammate, if any
    pub fn mate(&self) -> Option<&'a Player> {
        let me = self.me;
        self.players.iter().find(|p| p.team == me.team && p.id != me.id)
    }

    /// The enemy solo strategies measure themselves against: the human when
    /// they are an opponent, otherwise the closest enemy still standing
    pub fn primary_enemy(&self) -> Option<&'a Player> {
        let my_base = self.my_base();
        self.enemies()
            .find(|p| p.is_human && p.base.is_alive())
            .or_else(|| {
                self.enemies()
                    .filter(|p| p.base.is_alive())
                    .min_by(|a, b| {
                        a.base
                            .pos
                            .distance_squared(my_base)
                            .total_cmp(&b.base.pos.distance_squared(my_base))
                    })
            })
    }

    /// Hold pattern around the own base
    pub fn patrol(&self, rng: &mut Pcg32) -> Plan {
        Plan::new(Strategy::Patrol, ring(rng, self.my_base(), 100.0, 150.0))
    }
}

/// Random point on an annulus around `center`
pub fn ring(rng: &mut Pcg32, center: Vec2, min_radius: f32, max_radius: f32) -> Vec2 {
    let angle = rng.random::<f32>() * std::f32::consts::TAU;
    let radius = random_between(rng, min_radius, max_radius);
    center + polar_to_cartesian(radius, angle)
}

/// `center` displaced by up to `amount` on each axis
pub fn jitter(rng: &mut Pcg32, center: Vec2, amount: f32) -> Vec2 {
    center
        + Vec2::new(
            random_between(rng, -amount, amount),
            random_between(rng, -amount, amount),
        )
}

pub fn chance(rng: &mut Pcg32, probability: f32) -> bool {
    rng.random::<f32>() < probability
}

/// Whether a tick `t` in `(prev, now]` satisfies `t % interval == offset % interval`
pub fn is_due(prev: u64, now: u64, interval: u64, offset: u64) -> bool {
    if interval == 0 || now <= prev {
        return false;
    }
    let phase = offset % interval;
    let first = prev + 1;
    let wait = (phase + interval - first % interval) % interval;
    first + wait <= now
}

/// Point the AI's drones at a new rally, kept inside the playfield
pub fn apply_rally(state: &mut GameState, player: PlayerId, rally: Vec2) {
    let bounds = state.bounds;
    let clamped = Vec2::new(
        rally.x.clamp(RALLY_INSET, (bounds.x - RALLY_INSET).max(RALLY_INSET)),
        rally.y.clamp(RALLY_INSET, (bounds.y - RALLY_INSET).max(RALLY_INSET)),
    );
    if let Some(p) = state.players.get_mut(player) {
        p.set_rally(clamped);
    }
}

fn apply_plan(state: &mut GameState, player: PlayerId, plan: Plan) {
    log::debug!(
        "AI {player}: {:?} -> ({:.0}, {:.0})",
        plan.strategy,
        plan.rally.x,
        plan.rally.y
    );
    apply_rally(state, player, plan.rally);
}

/// Strategic decision for one AI player
fn decide(state: &mut GameState, player: PlayerId) {
    let difficulty = state.settings.difficulty;
    let view = AiView::new(&state.players, &state.debris, player, difficulty, state.clock_ms);

    if state.settings.mode == GameMode::TwoVsTwo {
        let decision = team::decide(&view, &mut state.rng);
        let mate = view.mate().filter(|m| !m.is_human).map(|m| m.id);
        apply_plan(state, player, decision.plan);
        if let (Some(mate), Some(rally)) = (mate, decision.mate_rally) {
            apply_rally(state, mate, rally);
        }
    } else {
        let plan = strategy::decide(&view, &mut state.rng);
        apply_plan(state, player, plan);
    }
}

/// One throttled AI pass over every AI player with a standing base
pub fn run_ai_pass(state: &mut GameState) {
    let prev = state.last_ai_frame;
    let frame = state.frame;
    state.last_ai_frame = frame;
    let difficulty = state.settings.difficulty;
    let profile = difficulty.profile();

    for i in 0..state.players.len() {
        let player = &state.players[i];
        if player.is_human || !player.base.is_alive() {
            continue;
        }
        let slot = i as u64;

        let in_emergency = awareness::update(state, i, prev, frame);
        if !in_emergency && is_due(prev, frame, profile.decision_interval, slot * DECISION_STAGGER)
        {
            decide(state, i);
        }

        if state.players[i].resources > 0
            && is_due(prev, frame, profile.upgrade_interval, slot * UPGRADE_STAGGER)
        {
            economy::spend_resources(&mut state.players[i], difficulty);
        }

        if difficulty == Difficulty::Hard
            && is_due(prev, frame, COLLECT_INTERVAL, slot * COLLECT_STAGGER)
        {
            economy::collect_resources(state, i);
        }
    }
}
