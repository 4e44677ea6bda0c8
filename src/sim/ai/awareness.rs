//! Battlefield awareness: distress response and enemy movement trends

use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

use glam::Vec2;
use rand_pcg::Pcg32;

use super::{AiView, Plan, Strategy, apply_rally, chance, is_due, jitter, ring};
use crate::settings::Difficulty;
use crate::sim::entities::PlayerId;
use crate::sim::state::{GameState, Player};
use crate::{angle_to, polar_to_cartesian};

/// Enemy rally samples older than this are dropped (ms)
pub const HISTORY_WINDOW_MS: f64 = 5000.0;
/// Ticks between movement samples
const ANALYSIS_INTERVAL: u64 = 60;
const MIN_SAMPLES: usize = 3;
/// The enemy counts as approaching once it closes this much distance
const APPROACH_MARGIN: f32 = 50.0;
const AGGRESSION_RADIUS: f32 = 400.0;

/// Run distress handling and trend analysis. Returns true while the player
/// is in emergency mode, which suppresses normal decisions.
pub fn update(state: &mut GameState, player: PlayerId, prev_frame: u64, frame: u64) -> bool {
    let now = state.clock_ms;
    let difficulty = state.settings.difficulty;
    let reaction_ms = difficulty.profile().reaction_ms;

    let awareness = &state.players[player].awareness;
    if awareness.under_attack {
        let attacker = awareness.attacker;
        if now - awareness.last_attack_ms < reaction_ms
            && let Some(attacker) = attacker.filter(|&a| a < state.players.len())
        {
            let view = AiView::new(&state.players, &state.debris, player, difficulty, now);
            let plan = emergency_plan(&view, &state.players[attacker], &mut state.rng);
            if let Some(plan) = plan {
                log::debug!("AI {player} under attack from {attacker}: {:?}", plan.strategy);
                apply_rally(state, player, plan.rally);
            }
            return true;
        }
        state.players[player].awareness.clear_alert();
    }

    if is_due(prev_frame, frame, ANALYSIS_INTERVAL, 0)
        && let Some(plan) = analyze_movement(state, player)
    {
        log::debug!("AI {player} reacting to enemy movement: {:?}", plan.strategy);
        apply_rally(state, player, plan.rally);
    }
    false
}

/// Tier-specific answer to being attacked
pub fn emergency_plan(view: &AiView, attacker: &Player, rng: &mut Pcg32) -> Option<Plan> {
    let my_base = view.my_base();
    match view.difficulty {
        Difficulty::Easy => {
            chance(rng, 0.3).then(|| Plan::new(Strategy::Defend, ring(rng, my_base, 100.0, 100.0)))
        }
        Difficulty::Medium => {
            let mine = view.my_drone_count() as f32;
            let theirs = attacker.alive_drone_count() as f32;
            if mine > theirs * 0.8 {
                Some(Plan::new(Strategy::Counter, jitter(rng, attacker.base.pos, 100.0)))
            } else {
                Some(Plan::new(Strategy::Defend, jitter(rng, my_base, 75.0)))
            }
        }
        Difficulty::Hard => Some(counter_attacker(my_base, attacker, rng)),
    }
}

/// Intercept an intruder close to home, flank one that is still far away
fn counter_attacker(my_base: Vec2, attacker: &Player, rng: &mut Pcg32) -> Plan {
    let their_base = attacker.base.pos;
    match attacker.rally {
        Some(rally) if rally.distance(my_base) < 300.0 => {
            let dir = (rally - my_base).normalize_or_zero();
            Plan::new(Strategy::Intercept, my_base + dir * 200.0)
        }
        Some(rally) => {
            let angle = angle_to(rally, their_base) + FRAC_PI_2;
            Plan::new(Strategy::Flank, their_base + polar_to_cartesian(250.0, angle))
        }
        None => Plan::new(Strategy::Counter, jitter(rng, their_base, 50.0)),
    }
}

/// What the enemy rally history says about their intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub approaching: bool,
    pub aggressive: bool,
}

/// Record `current` and classify the enemy's recent movement
pub fn record_and_classify(
    history: &mut VecDeque<(Vec2, f64)>,
    current: Option<Vec2>,
    my_base: Vec2,
    now: f64,
) -> Option<Trend> {
    if let Some(rally) = current {
        history.push_back((rally, now));
    }
    while history
        .front()
        .is_some_and(|&(_, t)| now - t > HISTORY_WINDOW_MS)
    {
        history.pop_front();
    }
    if history.len() < MIN_SAMPLES {
        return None;
    }

    let (first, _) = *history.front()?;
    let (last, _) = *history.back()?;
    Some(Trend {
        approaching: last.distance(my_base) < first.distance(my_base) - APPROACH_MARGIN,
        aggressive: current.is_some_and(|r| r.distance(my_base) < AGGRESSION_RADIUS),
    })
}

fn analyze_movement(state: &mut GameState, player: PlayerId) -> Option<Plan> {
    let human = state.human()?;
    if state.players[human].team == state.players[player].team {
        return None;
    }
    let human_rally = state.players[human].rally;
    let my_base = state.players[player].base.pos;
    let now = state.clock_ms;
    let difficulty = state.settings.difficulty;

    let history = &mut state.players[player].awareness.rally_history;
    let trend = record_and_classify(history, human_rally, my_base, now)?;
    let rally = human_rally?;
    let rng = &mut state.rng;

    let mut plan = None;
    if trend.approaching {
        plan = match difficulty {
            Difficulty::Easy => None,
            Difficulty::Medium => {
                let dir = (rally - my_base).normalize_or_zero();
                Some(Plan::new(Strategy::Intercept, my_base + dir * 150.0))
            }
            Difficulty::Hard => Some(Plan::new(Strategy::Intercept, jitter(rng, rally, 50.0))),
        };
    }
    if trend.aggressive && difficulty == Difficulty::Hard {
        let angle = angle_to(my_base, rally) + FRAC_PI_3;
        plan = Some(Plan::new(Strategy::Pressure, rally + polar_to_cartesian(200.0, angle)));
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaledValues;
    use crate::settings::{GameMode, Settings};
    use crate::sim::entities::{Base, Drone, Upgrades};
    use rand::SeedableRng;

    fn duel() -> Vec<Player> {
        let scale = ScaledValues::default();
        let stats = Upgrades::default().drone_stats(&scale);
        let mut human = Player::new(0, 0, "", true, Base::new(0, Vec2::new(100.0, 100.0), &scale, 0.0));
        let mut ai = Player::new(1, 1, "", false, Base::new(1, Vec2::new(1100.0, 700.0), &scale, 0.0));
        for i in 0..10 {
            human.drones.push(Drone::new(i, 0, Vec2::new(150.0, 150.0), stats, &scale, 0.0));
        }
        for i in 0..4 {
            ai.drones.push(Drone::new(100 + i, 1, Vec2::new(1000.0, 600.0), stats, &scale, 0.0));
        }
        vec![human, ai]
    }

    #[test]
    fn test_classify_needs_three_samples() {
        let mut history = VecDeque::new();
        let base = Vec2::new(1000.0, 500.0);
        assert_eq!(record_and_classify(&mut history, Some(Vec2::new(200.0, 500.0)), base, 0.0), None);
        assert_eq!(record_and_classify(&mut history, Some(Vec2::new(400.0, 500.0)), base, 1000.0), None);
        let trend = record_and_classify(&mut history, Some(Vec2::new(700.0, 500.0)), base, 2000.0);
        assert_eq!(
            trend,
            Some(Trend {
                approaching: true,
                aggressive: true
            })
        );
    }

    #[test]
    fn test_history_is_bounded_by_window() {
        let mut history = VecDeque::new();
        let base = Vec2::ZERO;
        for i in 0..20 {
            record_and_classify(&mut history, Some(Vec2::new(900.0, 900.0)), base, i as f64 * 1000.0);
        }
        assert_eq!(history.len(), 6);
        assert!(history.iter().all(|&(_, t)| 19_000.0 - t <= HISTORY_WINDOW_MS));
    }

    #[test]
    fn test_retreating_enemy_is_not_approaching() {
        let mut history = VecDeque::new();
        let base = Vec2::new(1000.0, 500.0);
        for (i, x) in [800.0, 600.0, 400.0].iter().enumerate() {
            record_and_classify(&mut history, Some(Vec2::new(*x, 500.0)), base, i as f64 * 500.0);
        }
        let trend = record_and_classify(&mut history, None, base, 1600.0).unwrap();
        assert!(!trend.approaching);
        assert!(!trend.aggressive);
    }

    #[test]
    fn test_medium_emergency_depends_on_strength() {
        let players = duel();
        let view = AiView::new(&players, &[], 1, Difficulty::Medium, 0.0);
        let mut rng = Pcg32::seed_from_u64(1);
        // 4 drones against 10: fall back home
        let plan = emergency_plan(&view, &players[0], &mut rng).unwrap();
        assert_eq!(plan.strategy, Strategy::Defend);
        assert!(plan.rally.distance(Vec2::new(1100.0, 700.0)) <= 75.0 * 2f32.sqrt());
    }

    #[test]
    fn test_hard_emergency_intercepts_close_intruder() {
        let mut players = duel();
        players[0].set_rally(Vec2::new(1100.0, 500.0));
        let view = AiView::new(&players, &[], 1, Difficulty::Hard, 0.0);
        let mut rng = Pcg32::seed_from_u64(1);
        let plan = emergency_plan(&view, &players[0], &mut rng).unwrap();
        assert_eq!(plan.strategy, Strategy::Intercept);
        assert!((plan.rally - Vec2::new(1100.0, 500.0)).length() < 1e-3);
    }

    #[test]
    fn test_hard_emergency_flanks_distant_rally() {
        let mut players = duel();
        players[0].set_rally(Vec2::new(500.0, 100.0));
        let view = AiView::new(&players, &[], 1, Difficulty::Hard, 0.0);
        let mut rng = Pcg32::seed_from_u64(1);
        let plan = emergency_plan(&view, &players[0], &mut rng).unwrap();
        assert_eq!(plan.strategy, Strategy::Flank);
        assert!((plan.rally.distance(Vec2::new(100.0, 100.0)) - 250.0).abs() < 1e-2);
    }

    #[test]
    fn test_alert_expires_after_reaction_window() {
        let mut state = GameState::new(Settings {
            mode: GameMode::OneVsOne,
            difficulty: crate::settings::Difficulty::Medium,
            ..Default::default()
        });
        state.start_round();
        state.clock_ms = 5000.0;
        {
            let aw = &mut state.players[1].awareness;
            aw.under_attack = true;
            aw.last_attack_ms = 4500.0;
            aw.attacker = Some(0);
        }
        assert!(update(&mut state, 1, 0, 11));

        state.clock_ms = 5600.0;
        assert!(!update(&mut state, 1, 11, 22));
        assert!(!state.players[1].awareness.under_attack);
        assert_eq!(state.players[1].awareness.attacker, None);
    }
}
