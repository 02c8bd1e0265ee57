//! Run lifecycle through the public API: setup, start, stop, persistence.

use delve::character::{AttributeType, Attributes, PlayerState, WeaponType};
use delve::core::constants::{DUNGEON_SIMULATION_STEP_MS, FOOD_ITEM_ID};
use delve::core::tick::game_tick_with_delta;
use delve::dungeon::{
    complete_onboarding, select_dungeon, set_auto_restart, set_party, start_dungeon_run,
    start_dungeon_run_from_setup, stop_dungeon_run, DungeonRegistry, RunEndReason, RunStatus,
    StartRunError, StartRunRequest,
};
use delve::inventory::Inventory;
use delve::GameState;

const STEP: i64 = DUNGEON_SIMULATION_STEP_MS;

fn roster_state(food: i64) -> GameState {
    let mut state = GameState::new(0);
    for (id, weapon) in [
        ("p1", WeaponType::Melee),
        ("p2", WeaponType::Ranged),
        ("p3", WeaponType::Magic),
        ("p4", WeaponType::Ranged),
        ("p5", WeaponType::Melee),
    ] {
        let mut player = PlayerState::new(id, id.to_uppercase());
        player.attributes = Attributes::new()
            .with(AttributeType::Strength, 30)
            .with(AttributeType::Agility, 30)
            .with(AttributeType::Stamina, 30)
            .with(AttributeType::Intellect, 30);
        player.equipment.weapon_type = weapon;
        player.skill_mut(weapon.combat_skill()).level = 30;
        state.add_player(player);
    }
    state.inventory = Inventory::new().with_item(FOOD_ITEM_ID, food);
    state
}

fn party(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn start(state: &mut GameState, run_id: &str, registry: &DungeonRegistry) -> String {
    let request = StartRunRequest {
        run_id: run_id.to_string(),
        dungeon_id: "goblin_warren".to_string(),
        hero_ids: party(&["p1", "p2", "p3", "p4"]),
        now_ms: state.last_tick,
    };
    start_dungeon_run(state, request, registry).unwrap()
}

fn advance(state: &GameState, ms: i64, registry: &DungeonRegistry) -> GameState {
    game_tick_with_delta(state, ms, state.last_tick + ms, registry).state
}

#[test]
fn test_setup_flow_then_start_from_setup() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(50);
    assert!(state.dungeon.onboarding_required);
    complete_onboarding(&mut state);
    assert!(!state.dungeon.onboarding_required);

    assert!(!select_dungeon(&mut state, "nowhere", &registry));
    assert!(select_dungeon(&mut state, "howling_den", &registry));
    let stored = set_party(
        &mut state,
        &party(&["p1", "p1", "ghost", "p2", "p3", "p4", "p5"]),
    );
    assert_eq!(stored, party(&["p1", "p2", "p3", "p4"]));

    let run_id = start_dungeon_run_from_setup(&mut state, 0, &registry).unwrap();
    assert!(uuid::Uuid::parse_str(&run_id).is_ok());
    let run = &state.dungeon.runs[&run_id];
    assert_eq!(run.dungeon_id, "howling_den");
    assert_eq!(state.dungeon.active_run_id.as_ref(), Some(&run_id));
    assert_eq!(state.dungeon.active_run().map(|r| r.floor), Some(1));
}

#[test]
fn test_start_rejects_busy_heroes_and_extra_runs() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(50);
    start(&mut state, "r1", &registry);
    let snapshot = state.clone();

    let busy = StartRunRequest {
        run_id: "r2".to_string(),
        dungeon_id: "goblin_warren".to_string(),
        hero_ids: party(&["p5", "p2", "p3", "p4"]),
        now_ms: 0,
    };
    let err = start_dungeon_run(&mut state, busy, &registry).unwrap_err();
    assert_eq!(err, StartRunError::HeroBusy("p2".to_string()));
    assert_eq!(state, snapshot, "a rejected start changes nothing");
}

#[test]
fn test_start_rejects_hero_doing_another_action() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(50);
    state.players.get_mut("p3").unwrap().current_action = Some("woodcutting".to_string());
    let snapshot = state.clone();

    let request = StartRunRequest {
        run_id: "r1".to_string(),
        dungeon_id: "goblin_warren".to_string(),
        hero_ids: party(&["p1", "p2", "p3", "p4"]),
        now_ms: 0,
    };
    let err = start_dungeon_run(&mut state, request, &registry).unwrap_err();
    assert_eq!(err, StartRunError::HeroNotIdle("p3".to_string()));
    assert_eq!(state, snapshot, "a rejected start changes nothing");

    state.players.get_mut("p3").unwrap().current_action = None;
    assert_eq!(start(&mut state, "r1", &registry), "r1");
}

#[test]
fn test_start_rejects_short_food_and_bad_party() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(0);
    let request = StartRunRequest {
        run_id: "r1".to_string(),
        dungeon_id: "goblin_warren".to_string(),
        hero_ids: party(&["p1", "p2", "p3", "p4"]),
        now_ms: 0,
    };
    assert!(matches!(
        start_dungeon_run(&mut state, request, &registry),
        Err(StartRunError::NotEnoughFood { available: 0, .. })
    ));

    let mut state = roster_state(50);
    let request = StartRunRequest {
        run_id: "r1".to_string(),
        dungeon_id: "goblin_warren".to_string(),
        hero_ids: party(&["p1", "p2", "p3"]),
        now_ms: 0,
    };
    assert_eq!(
        start_dungeon_run(&mut state, request, &registry),
        Err(StartRunError::WrongPartySize {
            expected: 4,
            found: 3
        })
    );
    assert!(state.dungeon.runs.is_empty());
}

#[test]
fn test_stop_running_run_heals_party_and_writes_replay() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(50);
    start(&mut state, "r1", &registry);
    state = advance(&state, 4 * STEP, &registry);

    let journal = stop_dungeon_run(&mut state, "r1", &registry).unwrap();
    let run = &state.dungeon.runs["r1"];
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.end_reason, Some(RunEndReason::Stopped));
    assert!(run.party.iter().all(|h| h.hp == h.hp_max));
    assert!(state.dungeon.active_run_id.is_none());
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].text, "Dungeon ended: Goblin Warren (Stopped)");

    let replay = state.dungeon.latest_replay.as_ref().unwrap();
    assert_eq!(replay.end_reason, Some(RunEndReason::Stopped));
    assert_eq!(state.dungeon.completions("goblin_warren"), 0);

    assert!(stop_dungeon_run(&mut state, "r1", &registry).is_none());
    assert!(stop_dungeon_run(&mut state, "missing", &registry).is_none());

    let after = advance(&state, 10 * STEP, &registry);
    assert_eq!(after.dungeon.runs["r1"], state.dungeon.runs["r1"], "stopped runs do not advance");
}

#[test]
fn test_stop_while_awaiting_restart_only_cancels_restart() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(100);
    set_auto_restart(&mut state, true);
    start(&mut state, "r1", &registry);
    for _ in 0..400 {
        state = advance(&state, STEP, &registry);
        if state.dungeon.runs["r1"].status == RunStatus::Victory {
            break;
        }
    }
    assert!(state.dungeon.runs["r1"].restart_at.is_some());
    let replay_before = state.dungeon.latest_replay.clone();

    let journal = stop_dungeon_run(&mut state, "r1", &registry).unwrap();
    let run = &state.dungeon.runs["r1"];
    assert!(journal.is_empty());
    assert_eq!(run.status, RunStatus::Victory);
    assert!(run.restart_at.is_none());
    assert!(!run.is_active());
    assert_eq!(state.dungeon.latest_replay, replay_before);
}

#[test]
fn test_disabling_auto_restart_cancels_pending_restart() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(100);
    set_auto_restart(&mut state, true);
    start(&mut state, "r1", &registry);
    for _ in 0..400 {
        state = advance(&state, STEP, &registry);
        if state.dungeon.runs["r1"].status == RunStatus::Victory {
            break;
        }
    }

    set_auto_restart(&mut state, false);
    assert!(state.dungeon.runs["r1"].restart_at.is_none());
    assert!(state.dungeon.active_run_id.is_none());

    let later = advance(&state, 10_000, &registry);
    assert_eq!(later.dungeon.runs["r1"].run_index, 0);
    assert_eq!(later.dungeon.runs["r1"].status, RunStatus::Victory);
}

#[test]
fn test_save_round_trip_keeps_run_progress() {
    let registry = DungeonRegistry::builtin().unwrap();
    let mut state = roster_state(50);
    start(&mut state, "r1", &registry);
    state = advance(&state, 6_000, &registry);

    let json = state.to_json().unwrap();
    let loaded = GameState::from_json(&json).unwrap();

    let before = &state.dungeon.runs["r1"];
    let after = &loaded.dungeon.runs["r1"];
    assert_eq!(after.floor, before.floor);
    assert_eq!(after.elapsed_ms, before.elapsed_ms);
    assert_eq!(after.party, before.party);
    assert_eq!(after.enemies, before.enemies);
    assert_eq!(after.events, before.events);
    assert_eq!(after.threat_tie_order, before.threat_tie_order);
    assert_eq!(loaded.inventory, state.inventory);
    assert_eq!(loaded.dungeon.active_run_id.as_deref(), Some("r1"));

    let resumed = advance(&loaded, 2_000, &registry);
    assert!(resumed.dungeon.runs["r1"].elapsed_ms > after.elapsed_ms);
}
