//! AI spending and resource collection

use crate::settings::Difficulty;
use crate::sim::entities::{PlayerId, TargetRef, UpgradeAttribute};
use crate::sim::state::{GameState, Player};

use UpgradeAttribute::*;

/// Collectors only come from within this distance of the debris
const COLLECT_RADIUS: f32 = 300.0;
const MAX_COLLECTORS: usize = 5;
const COLLECTOR_SHARE: f32 = 0.3;

/// Upgrade order for the tier, given the own base health ratio
pub fn upgrade_priorities(difficulty: Difficulty, base_ratio: f32) -> &'static [UpgradeAttribute] {
    match difficulty {
        Difficulty::Easy => &[],
        Difficulty::Medium if base_ratio < 0.5 => &[BaseHealth, Health, Attack, MoveSpeed, AttackSpeed],
        Difficulty::Medium => &[Health, Attack, BaseHealth, MoveSpeed, AttackSpeed],
        Difficulty::Hard if base_ratio < 0.3 => &[BaseHealth, Attack, AttackSpeed, Health, MoveSpeed],
        Difficulty::Hard => &[Attack, AttackSpeed, MoveSpeed, Health, BaseHealth],
    }
}

/// Spend the tier's share of resources, one level at a time, always taking
/// the first affordable entry in the priority list. Returns resources spent.
pub fn spend_resources(player: &mut Player, difficulty: Difficulty) -> u32 {
    let budget = (player.resources as f32 * difficulty.profile().upgrade_ratio).floor() as u32;
    if budget == 0 {
        return 0;
    }
    let priorities = upgrade_priorities(difficulty, player.base.health_ratio());

    let mut spent = 0;
    loop {
        let next = priorities.iter().copied().find(|&attr| {
            player
                .upgrades
                .next_cost(attr)
                .is_some_and(|cost| cost <= player.resources && spent + cost <= budget)
        });
        let Some(attr) = next else {
            break;
        };
        let before = player.resources;
        if !player.try_upgrade(attr) {
            break;
        }
        spent += before - player.resources;
        log::debug!("AI {} upgraded {}", player.id, attr.as_str());
    }
    spent
}

/// Send a few nearby drones after the most valuable debris
pub fn collect_resources(state: &mut GameState, player: PlayerId) -> usize {
    let owner = &state.players[player];
    if owner.awareness.under_attack {
        return 0;
    }
    let home = owner.base.pos;

    let mut best = None;
    let mut best_score = 0.0;
    for node in state.debris.iter().filter(|d| d.is_alive()) {
        let score = node.points as f32 * 100.0 - node.pos.distance(home) * 0.1;
        if score > best_score {
            best_score = score;
            best = Some((node.id, node.pos));
        }
    }
    let Some((id, at)) = best else {
        return 0;
    };

    let owner = &mut state.players[player];
    let quota = MAX_COLLECTORS.min((owner.alive_drone_count() as f32 * COLLECTOR_SHARE) as usize);
    let mut sent = 0;
    for drone in owner.drones.iter_mut().filter(|d| d.is_alive()) {
        if sent >= quota {
            break;
        }
        if drone.pos.distance(at) < COLLECT_RADIUS {
            drone.player_target = Some(TargetRef::Debris(id));
            drone.reached_rally = false;
            sent += 1;
        }
    }
    if sent > 0 {
        log::debug!("AI {player} sent {sent} drones to collect debris {id}");
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaledValues;
    use crate::sim::entities::{Base, Debris, Drone, Upgrades};
    use glam::Vec2;

    fn ai_player(resources: u32) -> Player {
        let scale = ScaledValues::default();
        let mut player = Player::new(1, 1, "", false, Base::new(1, Vec2::new(500.0, 500.0), &scale, 0.0));
        player.resources = resources;
        player
    }

    fn node(id: u32, pos: Vec2) -> Debris {
        Debris {
            id,
            pos,
            size: 20.0,
            points: 3,
            health: 60.0,
            max_health: 60.0,
        }
    }

    #[test]
    fn test_easy_never_spends() {
        let mut player = ai_player(20);
        assert_eq!(spend_resources(&mut player, Difficulty::Easy), 0);
        assert_eq!(player.resources, 20);
    }

    #[test]
    fn test_medium_spends_half_health_first() {
        let mut player = ai_player(7);
        // budget floor(7 * 0.5) = 3
        assert_eq!(spend_resources(&mut player, Difficulty::Medium), 3);
        assert_eq!(player.resources, 4);
        assert_eq!(player.upgrades.health, 3);
        assert_eq!(player.upgrades.attack, 0);
    }

    #[test]
    fn test_hard_spends_everything_attack_first() {
        let mut player = ai_player(10);
        assert_eq!(spend_resources(&mut player, Difficulty::Hard), 10);
        assert_eq!(player.resources, 0);
        // 4 levels at 1, then 3 at 2
        assert_eq!(player.upgrades.attack, 7);
        assert_eq!(player.upgrades.attack_speed, 0);
    }

    #[test]
    fn test_hard_wounded_base_buys_base_health() {
        let mut player = ai_player(12);
        player.base.health = 200.0;
        spend_resources(&mut player, Difficulty::Hard);
        assert_eq!(player.upgrades.base_health, 1);
        assert_eq!(player.base.max_health, 1100.0);
        assert_eq!(player.base.health, 300.0);
        assert_eq!(player.upgrades.attack, 2);
        assert_eq!(player.resources, 0);
    }

    #[test]
    fn test_spending_stops_at_level_cap() {
        let mut player = ai_player(200);
        player.upgrades = Upgrades {
            attack: 10,
            attack_speed: 10,
            move_speed: 10,
            health: 10,
            base_health: 10,
        };
        assert_eq!(spend_resources(&mut player, Difficulty::Hard), 0);
        assert_eq!(player.resources, 200);
    }

    #[test]
    fn test_collectors_limited_and_nearby() {
        let mut state = GameState::new(Default::default());
        let scale = ScaledValues::default();
        let stats = Upgrades::default().drone_stats(&scale);
        let mut player = ai_player(0);
        player.id = 0;
        for i in 0..20 {
            // First ten near the debris, the rest far away
            let pos = if i < 10 {
                Vec2::new(700.0 + i as f32, 500.0)
            } else {
                Vec2::new(50.0, 50.0)
            };
            player.drones.push(Drone::new(i, 0, pos, stats, &scale, 0.0));
        }
        state.players = vec![player];
        state.debris = vec![node(99, Vec2::new(800.0, 500.0))];

        assert_eq!(collect_resources(&mut state, 0), 5);
        let assigned: Vec<u32> = state.players[0]
            .drones
            .iter()
            .filter(|d| d.player_target == Some(TargetRef::Debris(99)))
            .map(|d| d.id)
            .collect();
        assert_eq!(assigned, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_no_collection_under_attack() {
        let mut state = GameState::new(Default::default());
        let mut player = ai_player(0);
        player.id = 0;
        player.awareness.under_attack = true;
        state.players = vec![player];
        state.debris = vec![node(1, Vec2::new(520.0, 500.0))];
        assert_eq!(collect_resources(&mut state, 0), 0);
    }
}
