//! End-to-end scenarios spanning the board, the move generator, the
//! round-50 tiebreaker, and the tournament runner, exercised only through
//! the public API rather than any single module's internals.

use hexwar::action::Action;
use hexwar::color::Color;
use hexwar::evolution::{EvolutionConfig, EvolutionDriver, FixedSide};
use hexwar::hex::{Direction, Hex};
use hexwar::pieces::PieceId;
use hexwar::ruleset::{piece_zone, Ruleset, BLACK_KING_POS, WHITE_KING_POS};
use hexwar::state::{Board, Graveyard, GameState, Piece};
use hexwar::template::TemplateId;
use hexwar::tournament::{run_matchup, MatchupSpec};

fn bare_state() -> GameState {
    GameState {
        board: Board::new(),
        graveyards: [Graveyard::default(), Graveyard::default()],
        current_player: Color::White,
        turn_number: 0,
        round_number: 1,
        templates: [TemplateId::E, TemplateId::E],
        action_index: 0,
        last_acted: None,
        king_positions: [Hex::new(0, 0), Hex::new(0, 0)],
        winner: None,
    }
}

fn place(state: &mut GameState, hex: Hex, kind: PieceId, owner: Color, facing: Direction) {
    state.board.place(hex, Piece { kind, owner, facing });
    if hexwar::pieces::is_king(kind) {
        state.king_positions[owner.index()] = hex;
    }
}

/// Scenario 1: an empty-center queen capture wins the game outright.
#[test]
fn empty_center_queen_capture() {
    let mut state = bare_state();
    place(&mut state, Hex::new(0, 0), PieceId("D5"), Color::White, Direction::N);
    place(&mut state, Hex::new(0, -1), PieceId("K1"), Color::Black, Direction::S);

    let capture = Action::Move { from: Hex::new(0, 0), to: Hex::new(0, -1) };
    assert!(state.legal_actions().contains(&capture));

    state.apply(&capture);
    assert_eq!(state.winner, Some(Color::White));
}

/// Scenario 2: a phased piece blocks a slide without being a legal capture
/// target, and nothing behind it is reachable either.
#[test]
fn phased_standoff() {
    let mut state = bare_state();
    place(&mut state, Hex::new(0, 0), PieceId("G1"), Color::White, Direction::N);
    place(&mut state, Hex::new(0, 2), PieceId("D2"), Color::Black, Direction::N);
    state.current_player = Color::Black;

    let destinations: Vec<Hex> = state
        .legal_actions()
        .into_iter()
        .filter_map(|a| match a {
            Action::Move { from, to } if from == Hex::new(0, 2) => Some(to),
            _ => None,
        })
        .collect();

    assert_eq!(destinations, vec![Hex::new(0, 1)]);
    assert!(!destinations.contains(&Hex::new(0, 0)));
    assert!(!destinations.contains(&Hex::new(0, -1)));
}

/// Scenario 3: a rebirth placement offers every empty hex next to the king,
/// each facing back toward it.
#[test]
fn rebirth_placement_faces_the_king() {
    let mut state = bare_state();
    place(&mut state, Hex::new(0, 3), PieceId("K1"), Color::White, Direction::N);
    state.graveyards[Color::White.index()].push(PieceId("P1"));

    let rebirths: Vec<(Hex, Direction)> = state
        .legal_actions()
        .into_iter()
        .filter_map(|a| match a {
            Action::Rebirth { at, facing, .. } => Some((at, facing)),
            _ => None,
        })
        .collect();

    assert_eq!(rebirths.len(), 6);
    for (at, facing) in rebirths {
        assert_eq!(at.neighbor(facing), Hex::new(0, 3));
    }
}

/// Scenario 4: past round 50 with both kings alive, the closer-to-center
/// king wins the proximity tiebreaker.
#[test]
fn round_50_proximity_win() {
    let mut state = bare_state();
    place(&mut state, Hex::new(0, 1), PieceId("K1"), Color::White, Direction::N);
    place(&mut state, Hex::new(0, -3), PieceId("K1"), Color::Black, Direction::S);
    state.round_number = 51;

    state.resolve_timeout();
    assert_eq!(state.winner, Some(Color::White));
}

fn symmetric_ruleset() -> Ruleset {
    let white_zone: Vec<(i8, i8)> = piece_zone(Color::White).into_iter().take(8).map(|h| (h.q, h.r)).collect();
    let black_zone: Vec<(i8, i8)> = piece_zone(Color::Black).into_iter().take(8).map(|h| (h.q, h.r)).collect();
    Ruleset {
        white_king: PieceId("K1"),
        white_pieces: vec![PieceId("A1"); 8],
        black_king: PieceId("K1"),
        black_pieces: vec![PieceId("A1"); 8],
        white_template: TemplateId::E,
        black_template: TemplateId::E,
        white_positions: Some(std::iter::once((WHITE_KING_POS.q, WHITE_KING_POS.r)).chain(white_zone).collect()),
        black_positions: Some(std::iter::once((BLACK_KING_POS.q, BLACK_KING_POS.r)).chain(black_zone).collect()),
        white_facings: None,
        black_facings: None,
        name: None,
    }
}

/// Scenario 5: a deeper search should consistently outplay a shallower one
/// on a symmetric army across enough games to wash out search jitter.
#[test]
fn deeper_search_beats_shallower_search() {
    let ruleset = symmetric_ruleset();
    let spec = MatchupSpec { depth_a: 4, depth_b: 2, games: 20, weight: 1.0 };
    let stats = run_matchup(&ruleset, &spec, 100);
    assert!(stats.deeper_win_rate() > 0.7, "deeper win rate was {}", stats.deeper_win_rate());
}

/// Scenario 6: pinning one side holds it byte-identical across every
/// individual the evolutionary loop produces, in every generation.
#[test]
fn fixed_side_evolution_never_mutates_the_pinned_side() {
    let pinned = symmetric_ruleset();
    let fixed = FixedSide {
        color: Color::White,
        king: pinned.white_king,
        pieces: pinned.white_pieces.clone(),
        template: pinned.white_template,
        positions: pinned.white_positions.clone().unwrap(),
        facings: vec![Direction::N; 9],
    };

    let config = EvolutionConfig {
        population_size: 4,
        elite_count: 2,
        min_evals: 2,
        ucb_c: 0.3,
        games_per_matchup: 2,
        base_depth: 1,
        reduced_tournament: true,
        max_generations: 2,
        worker_count: Some(2),
        seed: 7,
        fixed_side: Some(fixed),
    };

    let mut driver = EvolutionDriver::new(config);
    let champion = driver.run();
    driver.shutdown();

    assert_eq!(champion.ruleset.white_king, pinned.white_king);
    assert_eq!(champion.ruleset.white_pieces, pinned.white_pieces);
    assert_eq!(champion.ruleset.white_positions, pinned.white_positions);
}
