use battleship_server::{neighbours, BitBoard, BitBoardError};

type BB = BitBoard<u128, 10>;

#[test]
fn set_and_get_use_x_then_y() {
    let mut bb = BB::new();
    bb.set(3, 7).unwrap();
    assert!(bb.get(3, 7).unwrap());
    assert!(!bb.get(7, 3).unwrap());
    assert_eq!(bb.count_ones(), 1);
    assert_eq!(bb.iter_set_bits().collect::<Vec<_>>(), vec![(3, 7)]);
}

#[test]
fn off_board_cells_are_errors_for_get_and_set() {
    let mut bb = BB::new();
    assert_eq!(bb.get(10, 0), Err(BitBoardError::OutOfBounds { x: 10, y: 0 }));
    assert_eq!(bb.set(0, 10), Err(BitBoardError::OutOfBounds { x: 0, y: 10 }));
    assert!(!bb.contains(10, 10));
    assert!(bb.is_empty());
}

#[test]
fn try_new_rejects_oversized_boards() {
    assert!(BitBoard::<u64, 8>::try_new().is_ok());
    assert_eq!(
        BitBoard::<u64, 9>::try_new(),
        Err(BitBoardError::SizeTooLarge { n: 9, capacity: 64 })
    );
}

#[test]
fn halo_covers_diagonals_and_is_clipped() {
    let corner = BB::from_cells([(0, 0)]).unwrap();
    let halo = corner.halo();
    assert_eq!(halo.count_ones(), 4);
    assert!(halo.contains(1, 1));

    let middle = BB::from_cells([(5, 5)]).unwrap();
    assert_eq!(middle.halo().count_ones(), 9);
}

#[test]
fn orthogonal_neighbours_stay_on_the_board() {
    let mut edge: Vec<_> = neighbours::<10>(0, 4, false).collect();
    edge.sort();
    assert_eq!(edge, vec![(0, 3), (0, 5), (1, 4)]);
    assert_eq!(neighbours::<10>(9, 9, true).count(), 3);
    assert_eq!(neighbours::<10>(4, 4, true).count(), 8);
}

#[test]
fn bit_operators_combine_boards() {
    let a = BB::from_cells([(1, 1), (2, 2)]).unwrap();
    let b = BB::from_cells([(2, 2), (3, 3)]).unwrap();
    assert_eq!((a & b).iter_set_bits().collect::<Vec<_>>(), vec![(2, 2)]);
    assert_eq!((a | b).count_ones(), 3);
    assert_eq!((!a).count_ones(), 98);
}
