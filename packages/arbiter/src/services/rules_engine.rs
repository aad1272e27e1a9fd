use std::str::FromStr;

use chess::{BitBoard, Board, BoardStatus, Color, MoveGen, Piece};

use crate::models::side::Side;
use crate::services::errors::rules_engine_errors::RulesEngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Ongoing,
    Checkmate { winner: Side },
    Stalemate,
    InsufficientMaterial,
}

/// Legal-move generation, move application and game-end classification.
/// Positions are FEN strings and moves are UCI strings.
pub trait GameRulesEngine: Send + Sync {
    fn legal_moves(&self, position: &str) -> Result<Vec<String>, RulesEngineError>;

    /// Returns the resulting position, or `IllegalMove`.
    fn apply_move(&self, position: &str, uci: &str) -> Result<String, RulesEngineError>;

    fn classify(&self, position: &str) -> Result<PositionStatus, RulesEngineError>;

    /// Compares positions rather than strings, so formatting differences such as
    /// move counters do not matter.
    fn same_position(&self, a: &str, b: &str) -> bool;
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRulesEngine;

impl ChessRulesEngine {
    pub fn new() -> Self {
        ChessRulesEngine
    }

    fn parse(position: &str) -> Result<Board, RulesEngineError> {
        Board::from_str(position.trim())
            .map_err(|e| RulesEngineError::InvalidPosition(format!("Invalid FEN: {}", e)))
    }

    /// Bare kings, or a single minor piece against a bare king.
    fn insufficient_material(board: &Board) -> bool {
        let heavy_or_pawns: BitBoard =
            *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
        if heavy_or_pawns.popcnt() > 0 {
            return false;
        }
        let minors = *board.pieces(Piece::Bishop) | *board.pieces(Piece::Knight);
        minors.popcnt() <= 1
    }
}

impl GameRulesEngine for ChessRulesEngine {
    fn legal_moves(&self, position: &str) -> Result<Vec<String>, RulesEngineError> {
        let board = Self::parse(position)?;
        Ok(MoveGen::new_legal(&board).map(|m| m.to_string()).collect())
    }

    fn apply_move(&self, position: &str, uci: &str) -> Result<String, RulesEngineError> {
        let board = Self::parse(position)?;
        let wanted = uci.trim().to_ascii_lowercase();

        let chess_move = MoveGen::new_legal(&board)
            .find(|m| m.to_string() == wanted)
            .ok_or_else(|| {
                RulesEngineError::IllegalMove(format!("{} is not legal here", uci))
            })?;

        Ok(format!("{}", board.make_move_new(chess_move)))
    }

    fn classify(&self, position: &str) -> Result<PositionStatus, RulesEngineError> {
        let board = Self::parse(position)?;
        Ok(match board.status() {
            BoardStatus::Checkmate => PositionStatus::Checkmate {
                winner: side_of(!board.side_to_move()),
            },
            BoardStatus::Stalemate => PositionStatus::Stalemate,
            BoardStatus::Ongoing if Self::insufficient_material(&board) => {
                PositionStatus::InsufficientMaterial
            }
            BoardStatus::Ongoing => PositionStatus::Ongoing,
        })
    }

    fn same_position(&self, a: &str, b: &str) -> bool {
        match (Self::parse(a), Self::parse(b)) {
            (Ok(left), Ok(right)) => format!("{}", left) == format!("{}", right),
            _ => false,
        }
    }
}
