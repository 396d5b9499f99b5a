use rayon::prelude::*;

use crate::board::Board;
use crate::types::Move;

/// Count the leaf nodes of the legal move tree down to `depth` plies.
pub fn run_perft_test(board: &Board, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut board = board.clone();
    let moves = board.legal_moves(board.active_color());
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for m in moves {
        let mut b = board.clone();
        b.execute(&m);
        nodes += run_perft_test(&b, depth - 1);
    }
    nodes
}

/// Same count with the root moves spread over the rayon thread pool
pub fn run_perft_parallel(board: &Board, depth: u8) -> u64 {
    divide(board, depth).into_iter().map(|(_, n)| n).sum()
}

/// Node count below each root move, sorted by move
pub fn divide(board: &Board, depth: u8) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }
    let mut board = board.clone();
    let moves = board.legal_moves(board.active_color());
    let mut counts: Vec<(Move, u64)> = moves
        .into_par_iter()
        .map(|m| {
            let mut b = board.clone();
            b.execute(&m);
            (m, run_perft_test(&b, depth - 1))
        })
        .collect();
    counts.sort_by_key(|(m, _)| (m.from, m.to));
    counts
}

/// Perft from starting position
///
/// https://www.chessprogramming.org/Perft_Results
///
/// | Depth | Nodes     | Captures | E.p. | Castles | Checks | Checkmates |
/// | ----- | --------- | -------- | ---- | ------- | ------ | ---------- |
/// | 0     | 1         | 0        | 0    | 0       | 0      | 0          |
/// | 1     | 20        | 0        | 0    | 0       | 0      | 0          |
/// | 2     | 400       | 0        | 0    | 0       | 0      | 0          |
/// | 3     | 8,902     | 34       | 0    | 0       | 12     | 0          |
/// | 4     | 197,281   | 1576     | 0    | 0       | 469    | 8          |
///
/// From depth 5 on the counts include en passant captures, which are not generated here.
pub fn expected_start_node_count(depth: u8) -> Option<u64> {
    match depth {
        0 => Some(1),
        1 => Some(20),
        2 => Some(400),
        3 => Some(8902),
        4 => Some(197_281),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_DEPTH: u8 = 3;

    #[test]
    fn perft_start() {
        let board = Board::new();
        for depth in 0..=MAX_DEPTH {
            println!("Depth {}", depth);
            assert_eq!(expected_start_node_count(depth), Some(run_perft_test(&board, depth)));
        }
    }

    #[test]
    fn perft_parallel_matches_sequential() {
        let board = Board::new();
        assert_eq!(run_perft_parallel(&board, 3), 8902);
    }

    #[test]
    fn perft_divide() {
        let counts = divide(&Board::new(), 2);
        assert_eq!(counts.len(), 20);
        assert!(counts.iter().all(|(_, n)| *n == 20));
    }

    #[test]
    fn perft_promotions() {
        // each promotion choice is a separate node
        let board = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(run_perft_test(&board, 1), 4 + 5);
    }

    #[test]
    fn perft_castling() {
        // 2 castles, 5 king steps, 10 + 9 rook moves
        let board = Board::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert_eq!(run_perft_test(&board, 1), 26);
    }
}
