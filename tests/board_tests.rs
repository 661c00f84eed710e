mod support;

use battleship_server::{Board, BoardError, ShotOutcome, TOTAL_SHIP_CELLS};
use support::{DESTROYER, FLEET_CELLS, FLEET_TEXT, WATER};

fn fleet_with(replace: &str, with: &str) -> String {
    assert!(FLEET_TEXT.contains(replace));
    FLEET_TEXT.replacen(replace, with, 1)
}

#[test]
fn accepts_a_legal_fleet() {
    let board = Board::from_placement_text(FLEET_TEXT).unwrap();
    assert_eq!(board.ships().len(), 10);
    assert_eq!(board.ship_map().count_ones(), TOTAL_SHIP_CELLS);
    for (x, y) in FLEET_CELLS {
        assert!(board.ship_map().contains(x, y), "({}, {}) should hold a hull", x, y);
    }
    assert_eq!(board.placement_text(), FLEET_TEXT);
}

#[test]
fn rejects_overlapping_hulls() {
    let text = fleet_with("3,9,4,0;", "3,0,4,0;");
    assert_eq!(
        Board::from_placement_text(&text).unwrap_err(),
        BoardError::ShipOverlaps
    );
}

#[test]
fn rejects_diagonally_touching_hulls() {
    // (9,3) only touches the cruiser cell (8,2), corner to corner.
    let text = fleet_with("3,9,4,0;", "3,9,3,0;");
    assert_eq!(
        Board::from_placement_text(&text).unwrap_err(),
        BoardError::ShipTouches
    );
}

#[test]
fn rejects_hulls_running_off_the_board() {
    let text = fleet_with("1,5,0,0;", "1,8,8,0;");
    assert_eq!(
        Board::from_placement_text(&text).unwrap_err(),
        BoardError::ShipOutOfBounds
    );
}

#[test]
fn rejects_wrong_composition() {
    let missing = fleet_with("3,9,4,0;", "");
    assert_eq!(
        Board::from_placement_text(&missing).unwrap_err(),
        BoardError::WrongFleetComposition
    );
    let swapped = fleet_with("3,9,4,0;", "2,8,8,0;");
    assert_eq!(
        Board::from_placement_text(&swapped).unwrap_err(),
        BoardError::WrongFleetComposition
    );
}

#[test]
fn rejects_malformed_text() {
    assert!(matches!(
        Board::from_placement_text("garbage"),
        Err(BoardError::MalformedPlacement(_))
    ));
    assert_eq!(
        Board::from_placement_text("").unwrap_err(),
        BoardError::WrongFleetComposition
    );
}

#[test]
fn shots_resolve_miss_hit_and_sunk() {
    let mut board = Board::from_placement_text(FLEET_TEXT).unwrap();
    assert_eq!(board.fire(WATER.0, WATER.1), Ok(ShotOutcome::Miss));
    assert_eq!(board.fire(DESTROYER.0, DESTROYER.1), Ok(ShotOutcome::Sunk));
    assert_eq!(board.fire(4, 2), Ok(ShotOutcome::Hit));
    assert_eq!(board.fire(5, 2), Ok(ShotOutcome::Sunk));
    assert_eq!(board.hits_taken(), 3);
    assert_eq!(board.misses().count_ones(), 1);
}

#[test]
fn repeated_and_off_board_shots_are_rejected() {
    let mut board = Board::from_placement_text(FLEET_TEXT).unwrap();
    board.fire(0, 0).unwrap();
    assert_eq!(board.fire(0, 0), Err(BoardError::AlreadyTargeted));
    board.fire(9, 9).unwrap();
    assert_eq!(board.fire(9, 9), Err(BoardError::AlreadyTargeted));
    assert!(matches!(board.fire(10, 0), Err(BoardError::BitBoardError(_))));
    assert_eq!(board.hits_taken(), 1);
}

#[test]
fn fleet_is_destroyed_after_exactly_twenty_hits() {
    let mut board = Board::from_placement_text(FLEET_TEXT).unwrap();
    let (last, rest) = FLEET_CELLS.split_last().unwrap();
    for &(x, y) in rest {
        board.fire(x, y).unwrap();
        assert!(!board.all_sunk());
    }
    assert_eq!(board.fire(last.0, last.1), Ok(ShotOutcome::Sunk));
    assert!(board.all_sunk());
    assert_eq!(board.hits_taken(), TOTAL_SHIP_CELLS);
}
