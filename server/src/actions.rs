//! Game rules
//!
//! Each action runs its checks in a fixed order against the locked
//! [`SessionState`] and returns the first failure as a [`Rejection`]. State is
//! only mutated once every check has passed, so a rejected action leaves the
//! session untouched.

use crate::client_manager::ClientId;
use crate::error::Rejection;
use crate::game::SessionState;
use log::{debug, info};
use rand::Rng;
use shared::hex::random_free_position;
use shared::{GameStatus, Hex, Player, PlayerState};

/// Result of a successful shot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Target lost a heart and is still alive
    Hit,
    /// Target ran out of hearts but more than one player is left
    Eliminated,
    /// Only the shooter is left standing
    Won { color: String },
}

/// Seats a new player in a lobby. Returns the color it was given.
pub fn join<R: Rng + ?Sized>(
    state: &mut SessionState,
    board_size: i32,
    max_players: usize,
    player_id: &str,
    client: ClientId,
    rng: &mut R,
) -> Result<&'static str, Rejection> {
    if state.status() == GameStatus::InProgress {
        return Err(Rejection::GameInProgress);
    }
    if state.roster_size() >= max_players {
        return Err(Rejection::GameFull);
    }
    if state.contains_player(player_id) {
        return Err(Rejection::PlayerIdTaken);
    }
    let position = random_free_position(board_size, &state.occupied_positions(), rng)
        .ok_or(Rejection::BoardFull)?;

    let color = state.next_join_color();
    state.add_player(
        Player::new(
            player_id.to_string(),
            color.to_string(),
            PlayerState::new(board_size, position),
        ),
        Some(client),
    );
    Ok(color)
}

pub fn move_player(
    state: &mut SessionState,
    board_size: i32,
    player_id: &str,
    hex: Hex,
) -> Result<(), Rejection> {
    let actor = living(state, player_id)?;
    if actor.action_points <= 0 {
        return Err(Rejection::NotEnoughActionPoints);
    }
    if !actor.is_cell_in_range(hex) {
        return Err(Rejection::CellOutOfRange);
    }
    if state.player_at(hex).is_some() {
        return Err(Rejection::CellOccupied);
    }

    let actor = living_mut(state, player_id)?;
    actor.action_points -= 1;
    actor.relocate(board_size, hex);
    debug!("{} moved to {:?}", player_id, hex);
    Ok(())
}

pub fn shoot(state: &mut SessionState, player_id: &str, hex: Hex) -> Result<ShotOutcome, Rejection> {
    let target_id = target_in_range(state, player_id, hex)?;

    living_mut(state, player_id)?.action_points -= 1;

    let target = state
        .player_mut(&target_id)
        .ok_or(Rejection::CellNotOccupied)?;
    let mut bounty = None;
    if let Some(target_state) = target.state.as_mut() {
        target_state.hearts -= 1;
        if target_state.hearts <= 0 {
            bounty = Some(target_state.action_points);
        }
    }

    let Some(bounty) = bounty else {
        debug!("{} hit {}", player_id, target_id);
        return Ok(ShotOutcome::Hit);
    };

    // The eliminated player's action points go to the shooter
    target.state = None;
    living_mut(state, player_id)?.action_points += bounty;
    info!("{} eliminated {}", player_id, target_id);

    if state.living_player_count() == 1 {
        let color = state
            .player(player_id)
            .map(|player| player.color.clone())
            .unwrap_or_default();
        return Ok(ShotOutcome::Won { color });
    }
    Ok(ShotOutcome::Eliminated)
}

/// Grows the player's range by one, paying the new range in action points
pub fn increase_range(
    state: &mut SessionState,
    board_size: i32,
    player_id: &str,
) -> Result<i32, Rejection> {
    let actor = living(state, player_id)?;
    let new_range = actor.range() + 1;
    if actor.action_points < new_range {
        return Err(Rejection::NotEnoughActionPoints);
    }

    let actor = living_mut(state, player_id)?;
    actor.set_range(board_size, new_range);
    actor.action_points -= new_range;
    debug!("{} increased range to {}", player_id, new_range);
    Ok(new_range)
}

pub fn give_action_point(state: &mut SessionState, player_id: &str, hex: Hex) -> Result<(), Rejection> {
    let target_id = target_in_range(state, player_id, hex)?;

    living_mut(state, player_id)?.action_points -= 1;
    living_mut(state, &target_id)?.action_points += 1;
    debug!("{} gave an action point to {}", player_id, target_id);
    Ok(())
}

/// Checks shared by shoot and give: the actor can act on `hex` and someone
/// other than the actor stands there. Returns the target's id.
fn target_in_range(state: &SessionState, player_id: &str, hex: Hex) -> Result<String, Rejection> {
    let actor = living(state, player_id)?;
    if actor.action_points <= 0 {
        return Err(Rejection::NotEnoughActionPoints);
    }
    if !actor.is_cell_in_range(hex) {
        return Err(Rejection::CellOutOfRange);
    }

    let target = state.player_at(hex).ok_or(Rejection::CellNotOccupied)?;
    if target.id == player_id {
        return Err(Rejection::CannotTargetSelf);
    }
    Ok(target.id.clone())
}

fn living<'a>(state: &'a SessionState, player_id: &str) -> Result<&'a PlayerState, Rejection> {
    state
        .player(player_id)
        .ok_or(Rejection::PlayerNotFound)?
        .state
        .as_ref()
        .ok_or(Rejection::PlayerEliminated)
}

fn living_mut<'a>(
    state: &'a mut SessionState,
    player_id: &str,
) -> Result<&'a mut PlayerState, Rejection> {
    state
        .player_mut(player_id)
        .ok_or(Rejection::PlayerNotFound)?
        .state
        .as_mut()
        .ok_or(Rejection::PlayerEliminated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::hex::spiral;
    use shared::{JOIN_COLORS, MAX_PLAYERS};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const BOARD: i32 = 17;

    fn session() -> SessionState {
        SessionState::new(Duration::from_secs(60))
    }

    fn seat(state: &mut SessionState, id: &str, position: Hex, action_points: i32) {
        let mut player_state = PlayerState::new(BOARD, position);
        player_state.action_points = action_points;
        state.add_player(
            Player::new(id.to_string(), "blue".to_string(), player_state),
            Some(1),
        );
    }

    fn ap(state: &SessionState, id: &str) -> i32 {
        state.player(id).unwrap().state.as_ref().unwrap().action_points
    }

    fn hearts(state: &SessionState, id: &str) -> i32 {
        state.player(id).unwrap().state.as_ref().unwrap().hearts
    }

    #[test]
    fn test_join_assigns_palette_color() {
        let mut state = session();
        let mut rng = StdRng::seed_from_u64(7);
        seat(&mut state, "A", Hex::new(8, 8), 0);

        let color = assert_ok!(join(&mut state, BOARD, MAX_PLAYERS, "B", 2, &mut rng));
        assert_eq!(color, JOIN_COLORS[1]);
        assert_eq!(state.roster_size(), 2);
        assert_ne!(
            state.player("A").unwrap().state.as_ref().unwrap().position(),
            state.player("B").unwrap().state.as_ref().unwrap().position()
        );
    }

    #[test]
    fn test_join_rejects_full_game() {
        let mut state = session();
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..MAX_PLAYERS {
            assert_ok!(join(&mut state, BOARD, MAX_PLAYERS, &format!("P{}", i), 1, &mut rng));
        }

        assert_eq!(
            join(&mut state, BOARD, MAX_PLAYERS, "late", 2, &mut rng),
            Err(Rejection::GameFull)
        );
        assert_eq!(state.roster_size(), MAX_PLAYERS);
    }

    #[test]
    fn test_join_rejects_started_game() {
        let mut state = session();
        let mut rng = StdRng::seed_from_u64(7);
        seat(&mut state, "A", Hex::new(8, 8), 0);
        state.start();

        assert_eq!(
            join(&mut state, BOARD, MAX_PLAYERS, "B", 2, &mut rng),
            Err(Rejection::GameInProgress)
        );
    }

    #[test]
    fn test_join_rejects_taken_id() {
        let mut state = session();
        let mut rng = StdRng::seed_from_u64(7);
        seat(&mut state, "A", Hex::new(8, 8), 0);

        assert_eq!(
            join(&mut state, BOARD, MAX_PLAYERS, "A", 2, &mut rng),
            Err(Rejection::PlayerIdTaken)
        );
    }

    #[test]
    fn test_join_rejects_when_board_is_full() {
        // a size 1 board has a single playable cell
        let mut state = session();
        let mut rng = StdRng::seed_from_u64(7);
        assert_ok!(join(&mut state, 1, MAX_PLAYERS, "A", 1, &mut rng));
        assert_eq!(
            join(&mut state, 1, MAX_PLAYERS, "B", 2, &mut rng),
            Err(Rejection::BoardFull)
        );
    }

    #[test]
    fn test_move_to_every_free_cell_in_range() {
        let start = Hex::new(8, 8);
        for target in spiral(BOARD, start, 1) {
            if target == start {
                continue;
            }
            let mut state = session();
            seat(&mut state, "A", start, 2);

            assert_ok!(move_player(&mut state, BOARD, "A", target));
            let actor = state.player("A").unwrap().state.as_ref().unwrap();
            assert_eq!(actor.position(), target);
            assert_eq!(actor.action_points, 1);
            assert_eq!(actor.cells_in_range(), spiral(BOARD, target, 1).as_slice());
        }
    }

    #[test]
    fn test_move_out_of_range_leaves_state_untouched() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 2);
        let before = state.snapshot();

        assert_eq!(
            move_player(&mut state, BOARD, "A", Hex::new(10, 8)),
            Err(Rejection::CellOutOfRange)
        );
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_move_validator_order() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 0);
        seat(&mut state, "B", Hex::new(9, 8), 1);

        assert_eq!(
            move_player(&mut state, BOARD, "nobody", Hex::new(8, 9)),
            Err(Rejection::PlayerNotFound)
        );
        // no action points beats out of range
        assert_eq!(
            move_player(&mut state, BOARD, "A", Hex::new(12, 8)),
            Err(Rejection::NotEnoughActionPoints)
        );
        assert_eq!(
            move_player(&mut state, BOARD, "B", Hex::new(8, 8)),
            Err(Rejection::CellOccupied)
        );
        // the center cell is in range but occupied by the mover
        assert_eq!(
            move_player(&mut state, BOARD, "B", Hex::new(9, 8)),
            Err(Rejection::CellOccupied)
        );
        assert_eq!(ap(&state, "B"), 1);
    }

    #[test]
    fn test_eliminated_player_cannot_act() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 3);
        state.player_mut("A").unwrap().state = None;

        assert_eq!(
            move_player(&mut state, BOARD, "A", Hex::new(8, 9)),
            Err(Rejection::PlayerEliminated)
        );
        assert_eq!(
            increase_range(&mut state, BOARD, "A"),
            Err(Rejection::PlayerEliminated)
        );
    }

    #[test]
    fn test_shoot_removes_a_heart() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 2);
        seat(&mut state, "B", Hex::new(9, 8), 0);
        seat(&mut state, "C", Hex::new(2, 8), 0);

        assert_eq!(shoot(&mut state, "A", Hex::new(9, 8)), Ok(ShotOutcome::Hit));
        assert_eq!(ap(&state, "A"), 1);
        assert_eq!(hearts(&state, "B"), 2);
    }

    #[test]
    fn test_shoot_rejections() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 2);
        seat(&mut state, "B", Hex::new(9, 8), 0);

        assert_eq!(
            shoot(&mut state, "A", Hex::new(8, 9)),
            Err(Rejection::CellNotOccupied)
        );
        assert_eq!(
            shoot(&mut state, "A", Hex::new(8, 8)),
            Err(Rejection::CannotTargetSelf)
        );
        assert_eq!(
            shoot(&mut state, "A", Hex::new(11, 8)),
            Err(Rejection::CellOutOfRange)
        );
        assert_eq!(
            shoot(&mut state, "B", Hex::new(8, 8)),
            Err(Rejection::NotEnoughActionPoints)
        );
        assert_eq!(ap(&state, "A"), 2);
        assert_eq!(hearts(&state, "B"), 3);
    }

    #[test]
    fn test_elimination_transfers_action_points() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 5);
        seat(&mut state, "B", Hex::new(9, 8), 4);
        seat(&mut state, "C", Hex::new(2, 8), 0);
        state.player_mut("B").unwrap().state.as_mut().unwrap().hearts = 1;

        assert_eq!(
            shoot(&mut state, "A", Hex::new(9, 8)),
            Ok(ShotOutcome::Eliminated)
        );
        assert!(state.player("B").unwrap().state.is_none());
        assert!(state.player_at(Hex::new(9, 8)).is_none());
        assert_eq!(ap(&state, "A"), 5 - 1 + 4);
        assert_eq!(state.living_player_count(), 2);
    }

    #[test]
    fn test_last_player_standing_wins() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 3);
        seat(&mut state, "B", Hex::new(9, 8), 0);
        state.player_mut("A").unwrap().color = "blue".to_string();

        assert_eq!(shoot(&mut state, "A", Hex::new(9, 8)), Ok(ShotOutcome::Hit));
        assert_eq!(shoot(&mut state, "A", Hex::new(9, 8)), Ok(ShotOutcome::Hit));
        assert_eq!(
            shoot(&mut state, "A", Hex::new(9, 8)),
            Ok(ShotOutcome::Won {
                color: "blue".to_string()
            })
        );
        assert_eq!(state.living_player_count(), 1);
    }

    #[test]
    fn test_increase_range_costs_new_range() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 1);

        assert_err!(increase_range(&mut state, BOARD, "A"));
        assert_eq!(ap(&state, "A"), 1);

        state.award_action_points(2);
        assert_eq!(increase_range(&mut state, BOARD, "A"), Ok(2));
        let actor = state.player("A").unwrap().state.as_ref().unwrap();
        assert_eq!(actor.action_points, 1);
        assert_eq!(actor.range(), 2);
        assert_eq!(actor.cells_in_range().len(), 19);
    }

    #[test]
    fn test_give_action_point() {
        let mut state = session();
        seat(&mut state, "A", Hex::new(8, 8), 1);
        seat(&mut state, "B", Hex::new(8, 9), 0);

        assert_ok!(give_action_point(&mut state, "A", Hex::new(8, 9)));
        assert_eq!(ap(&state, "A"), 0);
        assert_eq!(ap(&state, "B"), 1);

        assert_eq!(
            give_action_point(&mut state, "A", Hex::new(8, 9)),
            Err(Rejection::NotEnoughActionPoints)
        );
        assert_eq!(
            give_action_point(&mut state, "B", Hex::new(8, 9)),
            Err(Rejection::CannotTargetSelf)
        );
    }
}
