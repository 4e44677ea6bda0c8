//! 2v2 team play
//!
//! A priority ladder: help a mate whose base has enemies at the door, defend
//! the own base (pulling an AI mate along), shore up a badly damaged mate,
//! regroup when the own base is low, and otherwise cooperate. Cooperation
//! follows the human's rally when the mate is human and splits roles when
//! both are AI. A mate whose base has fallen is treated as absent and the
//! player falls back to solo play.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::{AiView, Plan, Strategy, chance, jitter, ring, strategy};
use crate::sim::entities::Drone;
use crate::sim::state::{Player, random_between};
use crate::{angle_to, polar_to_cartesian};

/// Enemy drones this close to a base count as an attack on it
pub const THREAT_RADIUS: f32 = 300.0;
/// Distance from the human rally at which an enemy counts as engaged
const ENGAGED_RADIUS: f32 = 200.0;
const HOLD_LINE_OFFSET: f32 = 80.0;

/// Plan for the deciding player plus an optional order for an AI mate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamDecision {
    pub plan: Plan,
    pub mate_rally: Option<Vec2>,
}

impl TeamDecision {
    fn solo(plan: Plan) -> Self {
        Self {
            plan,
            mate_rally: None,
        }
    }
}

fn threats<'a>(view: &AiView<'a>, around: Vec2) -> impl Iterator<Item = &'a Drone> + 'a {
    view.enemy_drones()
        .filter(move |d| d.pos.distance(around) < THREAT_RADIUS)
}

fn closest_to<'a>(drones: impl Iterator<Item = &'a Drone>, point: Vec2) -> Option<&'a Drone> {
    drones.min_by(|a, b| {
        a.pos
            .distance_squared(point)
            .total_cmp(&b.pos.distance_squared(point))
    })
}

/// Pick the next team plan for an AI player in 2v2
pub fn decide(view: &AiView, rng: &mut Pcg32) -> TeamDecision {
    let Some(mate) = view.mate().filter(|m| m.base.is_alive()) else {
        return TeamDecision::solo(strategy::decide(view, rng));
    };
    let my_base = view.my_base();

    if mate_under_attack(view, mate) {
        return TeamDecision::solo(defend_mate(view, mate, rng));
    }

    if threats(view, my_base).next().is_some() {
        let angle = rng.random::<f32>() * TAU;
        let radius = random_between(rng, 80.0, 120.0);
        let plan = Plan::new(Strategy::Defend, my_base + polar_to_cartesian(radius, angle));
        let mate_rally =
            (!mate.is_human).then(|| my_base + polar_to_cartesian(120.0, angle + PI));
        return TeamDecision { plan, mate_rally };
    }

    if mate.base.health_ratio() < 0.3 {
        return TeamDecision::solo(guard_mate(mate, rng));
    }

    if view.my_health_ratio() < 0.4 {
        let mid = (my_base + mate.base.pos) / 2.0;
        return TeamDecision::solo(Plan::new(Strategy::Regroup, jitter(rng, mid, 50.0)));
    }

    if mate.is_human {
        TeamDecision::solo(cooperate_with_human(view, mate, rng))
    } else {
        split_roles(view, mate, rng)
    }
}

fn mate_under_attack(view: &AiView, mate: &Player) -> bool {
    threats(view, mate.base.pos).next().is_some()
}

/// Go after the intruder at the mate's base nearest to us
fn defend_mate(view: &AiView, mate: &Player, rng: &mut Pcg32) -> Plan {
    match closest_to(threats(view, mate.base.pos), view.my_base()) {
        Some(intruder) => Plan::new(Strategy::DefendMate, intruder.pos),
        None => guard_mate(mate, rng),
    }
}

fn guard_mate(mate: &Player, rng: &mut Pcg32) -> Plan {
    Plan::new(Strategy::GuardMate, ring(rng, mate.base.pos, 100.0, 150.0))
}

fn cooperate_with_human(view: &AiView, human: &Player, rng: &mut Pcg32) -> Plan {
    let Some(rally) = human.rally else {
        return proactive(view, rng);
    };

    let engaged = view
        .enemy_drones()
        .any(|d| d.pos.distance(rally) < ENGAGED_RADIUS);
    if engaged && let Some(enemy) = closest_to(view.enemy_drones(), rally) {
        let angle = angle_to(rally, enemy.pos) + FRAC_PI_2;
        return Plan::new(Strategy::Support, enemy.pos + polar_to_cartesian(150.0, angle));
    }

    if rally.distance(view.my_base()) < THREAT_RADIUS {
        return Plan::new(Strategy::CloseSupport, ring(rng, rally, 80.0, 120.0));
    }

    if chance(rng, 0.7) {
        proactive(view, rng)
    } else {
        gather(view, rng)
    }
}

/// Two AI mates: when strong enough the bigger squad sieges the weakest
/// enemy base while the other hunts drones, otherwise hold a shared line
fn split_roles(view: &AiView, mate: &Player, rng: &mut Pcg32) -> TeamDecision {
    let mine = view.my_drone_count();
    let theirs = mate.alive_drone_count();
    let enemy_drones = view.enemy_drones().count();
    let weakest_base = view
        .enemies()
        .filter(|p| p.base.is_alive())
        .min_by(|a, b| a.base.health.total_cmp(&b.base.health))
        .map(|p| p.base.pos);

    if let Some(siege_at) = weakest_base
        && (mine + theirs) as f32 >= enemy_drones as f32 * 0.8
    {
        let siege = Plan::new(Strategy::Siege, siege_at);
        if mine >= theirs {
            let support = hunt_from(view, mate.base.pos, rng);
            return TeamDecision {
                plan: siege,
                mate_rally: Some(support.rally),
            };
        }
        return TeamDecision {
            plan: hunt_from(view, view.my_base(), rng),
            mate_rally: Some(siege.rally),
        };
    }

    if view.my_health_ratio() < 0.6 || mate.base.health_ratio() < 0.6 {
        let my_base = view.my_base();
        let mid = (my_base + mate.base.pos) / 2.0;
        let side = if view.me.id % 2 == 0 { 1.0 } else { -1.0 };
        let angle = angle_to(my_base, mate.base.pos) + FRAC_PI_2;
        let rally = mid + polar_to_cartesian(HOLD_LINE_OFFSET * side, angle);
        return TeamDecision::solo(Plan::new(Strategy::HoldLine, rally));
    }

    if view.me.id % 2 == 0 {
        TeamDecision::solo(proactive(view, rng))
    } else {
        TeamDecision::solo(gather(view, rng))
    }
}

/// Enemy drone nearest `home`, or a gathering run when none are left
fn hunt_from(view: &AiView, home: Vec2, rng: &mut Pcg32) -> Plan {
    match closest_to(view.enemy_drones(), home) {
        Some(drone) => Plan::new(Strategy::Hunt, drone.pos),
        None => gather(view, rng),
    }
}

/// Strike a random enemy drone, else the first standing enemy base
fn proactive(view: &AiView, rng: &mut Pcg32) -> Plan {
    let drones: Vec<Vec2> = view.enemy_drones().map(|d| d.pos).collect();
    if !drones.is_empty() {
        return Plan::new(Strategy::Attack, drones[rng.random_range(0..drones.len())]);
    }
    match view.enemies().find(|p| p.base.is_alive()) {
        Some(enemy) => Plan::new(Strategy::Attack, enemy.base.pos),
        None => view.patrol(rng),
    }
}

fn gather(view: &AiView, rng: &mut Pcg32) -> Plan {
    let live: Vec<Vec2> = view
        .debris
        .iter()
        .filter(|d| d.is_alive())
        .map(|d| d.pos)
        .collect();
    if live.is_empty() {
        return Plan::new(Strategy::Patrol, ring(rng, view.my_base(), 200.0, 200.0));
    }
    Plan::new(Strategy::Gather, live[rng.random_range(0..live.len())])
}
