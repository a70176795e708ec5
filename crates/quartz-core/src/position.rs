//! Board state with copy-make semantics.
//!
//! A `Position` is a plain `Copy` value. The search copies it for every
//! node and calls [`Position::apply_move`], which performs the move and
//! reports whether it was legal; there is no unmake. Both the full hash
//! and the pawn/king hash are maintained incrementally.

use std::fmt;
use std::str::FromStr;

use crate::attacks;
use crate::bitboard::{Bitboard, BitboardIterator, more_than_one};
use crate::moves::{Move, MoveKind};
use crate::piece::{Color, Piece, PieceType};
use crate::square::Square;
use crate::zobrist;

/// Castling right bits.
pub const CASTLE_WHITE_KING: u8 = 1;
pub const CASTLE_WHITE_QUEEN: u8 = 2;
pub const CASTLE_BLACK_KING: u8 = 4;
pub const CASTLE_BLACK_QUEEN: u8 = 8;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// Rights that survive a move touching each square.
const fn build_castle_masks() -> [u8; 64] {
    let mut masks = [0xF; 64];
    masks[Square::A1 as usize] = 0xF & !CASTLE_WHITE_QUEEN;
    masks[Square::E1 as usize] = 0xF & !(CASTLE_WHITE_KING | CASTLE_WHITE_QUEEN);
    masks[Square::H1 as usize] = 0xF & !CASTLE_WHITE_KING;
    masks[Square::A8 as usize] = 0xF & !CASTLE_BLACK_QUEEN;
    masks[Square::E8 as usize] = 0xF & !(CASTLE_BLACK_KING | CASTLE_BLACK_QUEEN);
    masks[Square::H8 as usize] = 0xF & !CASTLE_BLACK_KING;
    masks
}

static CASTLE_MASKS: [u8; 64] = build_castle_masks();

/// Error raised when parsing an invalid FEN string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFenError {
    MissingField(&'static str),
    InvalidBoard(String),
    InvalidSideToMove(String),
    InvalidCastling(String),
    InvalidEnPassant(String),
    InvalidCounter(String),
}

impl fmt::Display for ParseFenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFenError::MissingField(field) => write!(f, "missing FEN field: {field}"),
            ParseFenError::InvalidBoard(s) => write!(f, "invalid board field: {s}"),
            ParseFenError::InvalidSideToMove(s) => write!(f, "invalid side to move: {s}"),
            ParseFenError::InvalidCastling(s) => write!(f, "invalid castling field: {s}"),
            ParseFenError::InvalidEnPassant(s) => write!(f, "invalid en passant field: {s}"),
            ParseFenError::InvalidCounter(s) => write!(f, "invalid move counter: {s}"),
        }
    }
}

impl std::error::Error for ParseFenError {}

#[derive(Clone, Copy)]
pub struct Position {
    by_type: [Bitboard; 6],
    by_color: [Bitboard; 2],
    board: [Piece; 64],
    side_to_move: Color,
    castling: u8,
    ep_square: Square,
    halfmove_clock: u16,
    fullmove_number: u16,
    hash: u64,
    pawn_king_hash: u64,
}

impl Position {
    pub fn startpos() -> Position {
        START_FEN.parse().unwrap_or_else(|err| panic!("bad start FEN: {err}"))
    }

    fn empty() -> Position {
        Position {
            by_type: [0; 6],
            by_color: [0; 2],
            board: [Piece::None; 64],
            side_to_move: Color::White,
            castling: 0,
            ep_square: Square::None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            pawn_king_hash: 0,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Position, ParseFenError> {
        let mut fields = fen.split_whitespace();
        let board_field = fields.next().ok_or(ParseFenError::MissingField("board"))?;
        let side_field = fields.next().ok_or(ParseFenError::MissingField("side to move"))?;
        let castling_field = fields.next().unwrap_or("-");
        let ep_field = fields.next().unwrap_or("-");
        let halfmove_field = fields.next().unwrap_or("0");
        let fullmove_field = fields.next().unwrap_or("1");

        let mut pos = Position::empty();

        let mut rank = 7usize;
        let mut file = 0usize;
        for c in board_field.chars() {
            match c {
                '/' => {
                    if file != 8 || rank == 0 {
                        return Err(ParseFenError::InvalidBoard(board_field.to_string()));
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => {
                    file += c as usize - '0' as usize;
                    if file > 8 {
                        return Err(ParseFenError::InvalidBoard(board_field.to_string()));
                    }
                }
                _ => {
                    let piece = Piece::from_fen_char(c)
                        .ok_or_else(|| ParseFenError::InvalidBoard(board_field.to_string()))?;
                    if file >= 8 {
                        return Err(ParseFenError::InvalidBoard(board_field.to_string()));
                    }
                    pos.put_piece(piece, Square::from_file_rank(file, rank));
                    file += 1;
                }
            }
        }
        if rank != 0 || file != 8 {
            return Err(ParseFenError::InvalidBoard(board_field.to_string()));
        }

        pos.side_to_move = match side_field {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(ParseFenError::InvalidSideToMove(side_field.to_string())),
        };

        if castling_field != "-" {
            for c in castling_field.chars() {
                pos.castling |= match c {
                    'K' => CASTLE_WHITE_KING,
                    'Q' => CASTLE_WHITE_QUEEN,
                    'k' => CASTLE_BLACK_KING,
                    'q' => CASTLE_BLACK_QUEEN,
                    _ => return Err(ParseFenError::InvalidCastling(castling_field.to_string())),
                };
            }
        }

        if ep_field != "-" {
            pos.ep_square = ep_field
                .parse()
                .map_err(|_| ParseFenError::InvalidEnPassant(ep_field.to_string()))?;
        }

        pos.halfmove_clock = halfmove_field
            .parse()
            .map_err(|_| ParseFenError::InvalidCounter(halfmove_field.to_string()))?;
        pos.fullmove_number = fullmove_field
            .parse()
            .map_err(|_| ParseFenError::InvalidCounter(fullmove_field.to_string()))?;
        if pos.fullmove_number == 0 {
            pos.fullmove_number = 1;
        }

        pos.recompute_hashes();
        Ok(pos)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let piece = self.board[Square::from_file_rank(file, rank) as usize];
                if piece.is_some() {
                    if empty > 0 {
                        fen.push((b'0' + empty) as char);
                        empty = 0;
                    }
                    fen.push(piece.to_fen_char());
                } else {
                    empty += 1;
                }
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side_to_move == Color::White { 'w' } else { 'b' });
        fen.push(' ');
        if self.castling == 0 {
            fen.push('-');
        } else {
            for (bit, c) in [
                (CASTLE_WHITE_KING, 'K'),
                (CASTLE_WHITE_QUEEN, 'Q'),
                (CASTLE_BLACK_KING, 'k'),
                (CASTLE_BLACK_QUEEN, 'q'),
            ] {
                if self.castling & bit != 0 {
                    fen.push(c);
                }
            }
        }
        fen.push(' ');
        fen.push_str(&self.ep_square.to_string());
        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    fn recompute_hashes(&mut self) {
        self.hash = 0;
        self.pawn_king_hash = 0;
        for sq in Square::iter() {
            let piece = self.board[sq as usize];
            if piece.is_some() {
                let key = zobrist::piece_square(piece, sq);
                self.hash ^= key;
                if matches!(piece.piece_type(), PieceType::Pawn | PieceType::King) {
                    self.pawn_king_hash ^= key;
                }
            }
        }
        self.hash ^= zobrist::castling(self.castling);
        if self.ep_square.is_some() {
            self.hash ^= zobrist::en_passant(self.ep_square.file());
        }
        if self.side_to_move == Color::Black {
            self.hash ^= zobrist::side_to_move();
        }
    }

    #[inline]
    fn put_piece(&mut self, piece: Piece, sq: Square) {
        debug_assert!(self.board[sq as usize] == Piece::None);
        let bb = sq.bitboard();
        self.by_type[piece.piece_type().index()] |= bb;
        self.by_color[piece.color().index()] |= bb;
        self.board[sq as usize] = piece;
        let key = zobrist::piece_square(piece, sq);
        self.hash ^= key;
        if matches!(piece.piece_type(), PieceType::Pawn | PieceType::King) {
            self.pawn_king_hash ^= key;
        }
    }

    #[inline]
    fn remove_piece(&mut self, sq: Square) {
        let piece = self.board[sq as usize];
        debug_assert!(piece.is_some());
        let bb = sq.bitboard();
        self.by_type[piece.piece_type().index()] ^= bb;
        self.by_color[piece.color().index()] ^= bb;
        self.board[sq as usize] = Piece::None;
        let key = zobrist::piece_square(piece, sq);
        self.hash ^= key;
        if matches!(piece.piece_type(), PieceType::Pawn | PieceType::King) {
            self.pawn_king_hash ^= key;
        }
    }

    #[inline]
    fn move_piece(&mut self, from: Square, to: Square) {
        let piece = self.board[from as usize];
        debug_assert!(piece.is_some());
        let bb = from.bitboard() | to.bitboard();
        self.by_type[piece.piece_type().index()] ^= bb;
        self.by_color[piece.color().index()] ^= bb;
        self.board[from as usize] = Piece::None;
        self.board[to as usize] = piece;
        let key = zobrist::piece_square(piece, from) ^ zobrist::piece_square(piece, to);
        self.hash ^= key;
        if matches!(piece.piece_type(), PieceType::Pawn | PieceType::King) {
            self.pawn_king_hash ^= key;
        }
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn pieces(&self, color: Color, pt: PieceType) -> Bitboard {
        self.by_type[pt.index()] & self.by_color[color.index()]
    }

    #[inline]
    pub fn pieces_by_type(&self, pt: PieceType) -> Bitboard {
        self.by_type[pt.index()]
    }

    #[inline]
    pub fn pieces_of(&self, color: Color) -> Bitboard {
        self.by_color[color.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.by_color[0] | self.by_color[1]
    }

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Piece {
        self.board[sq as usize]
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        crate::bitboard::lsb(self.pieces(color, PieceType::King))
    }

    #[inline]
    pub fn castling_rights(&self) -> u8 {
        self.castling
    }

    #[inline]
    pub fn ep_square(&self) -> Square {
        self.ep_square
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// Half-moves played since the start of the game.
    #[inline]
    pub fn game_ply(&self) -> usize {
        let base = (self.fullmove_number.max(1) as usize - 1) * 2;
        base + (self.side_to_move == Color::Black) as usize
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn pawn_king_hash(&self) -> u64 {
        self.pawn_king_hash
    }

    /// All pieces of either color attacking `sq` given `occupied`.
    pub fn attackers_to(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        let bishops_queens =
            self.by_type[PieceType::Bishop.index()] | self.by_type[PieceType::Queen.index()];
        let rooks_queens =
            self.by_type[PieceType::Rook.index()] | self.by_type[PieceType::Queen.index()];

        attacks::pawn_attacks(Color::Black, sq) & self.pieces(Color::White, PieceType::Pawn)
            | attacks::pawn_attacks(Color::White, sq) & self.pieces(Color::Black, PieceType::Pawn)
            | attacks::knight_attacks(sq) & self.by_type[PieceType::Knight.index()]
            | attacks::king_attacks(sq) & self.by_type[PieceType::King.index()]
            | attacks::bishop_attacks(sq, occupied) & bishops_queens
            | attacks::rook_attacks(sq, occupied) & rooks_queens
    }

    /// Whether `sq` is attacked by any piece of `by`.
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        let occ = self.occupied();
        let them = self.by_color[by.index()];

        if attacks::pawn_attacks(!by, sq) & self.pieces(by, PieceType::Pawn) != 0 {
            return true;
        }
        if attacks::knight_attacks(sq) & self.pieces(by, PieceType::Knight) != 0 {
            return true;
        }
        if attacks::king_attacks(sq) & self.pieces(by, PieceType::King) != 0 {
            return true;
        }
        let bishops_queens = (self.by_type[PieceType::Bishop.index()]
            | self.by_type[PieceType::Queen.index()])
            & them;
        if bishops_queens != 0 && attacks::bishop_attacks(sq, occ) & bishops_queens != 0 {
            return true;
        }
        let rooks_queens = (self.by_type[PieceType::Rook.index()]
            | self.by_type[PieceType::Queen.index()])
            & them;
        rooks_queens != 0 && attacks::rook_attacks(sq, occ) & rooks_queens != 0
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.is_attacked(self.king_square(self.side_to_move), !self.side_to_move)
    }

    /// Applies a pseudo-legal move and returns whether it was legal.
    ///
    /// The position is mutated either way; on `false` the caller must
    /// discard its copy. This is the only legality filter in the engine.
    #[must_use]
    pub fn apply_move(&mut self, mv: Move) -> bool {
        let us = self.side_to_move;
        let them = !us;
        let from = mv.from();
        let to = mv.to();
        let piece = self.board[from as usize];
        debug_assert!(piece.is_some() && piece.color() == us, "bad move {mv}");

        if self.ep_square.is_some() {
            self.hash ^= zobrist::en_passant(self.ep_square.file());
            self.ep_square = Square::None;
        }

        self.halfmove_clock += 1;
        if piece.piece_type() == PieceType::Pawn || mv.is_capture() {
            self.halfmove_clock = 0;
        }

        match mv.kind() {
            MoveKind::Quiet => self.move_piece(from, to),
            MoveKind::DoublePush => {
                self.move_piece(from, to);
                let ep = Square::from_usize_unchecked((from as usize + to as usize) / 2);
                self.ep_square = ep;
                self.hash ^= zobrist::en_passant(ep.file());
            }
            MoveKind::Capture => {
                self.remove_piece(to);
                self.move_piece(from, to);
            }
            MoveKind::EnPassant => {
                let captured_sq = Square::from_file_rank(to.file(), from.rank());
                self.remove_piece(captured_sq);
                self.move_piece(from, to);
            }
            MoveKind::CastleWhiteKing => {
                self.move_piece(Square::E1, Square::G1);
                self.move_piece(Square::H1, Square::F1);
            }
            MoveKind::CastleWhiteQueen => {
                self.move_piece(Square::E1, Square::C1);
                self.move_piece(Square::A1, Square::D1);
            }
            MoveKind::CastleBlackKing => {
                self.move_piece(Square::E8, Square::G8);
                self.move_piece(Square::H8, Square::F8);
            }
            MoveKind::CastleBlackQueen => {
                self.move_piece(Square::E8, Square::C8);
                self.move_piece(Square::A8, Square::D8);
            }
            _ => {
                // Promotion, optionally capturing.
                if mv.is_capture() {
                    self.remove_piece(to);
                }
                self.remove_piece(from);
                self.put_piece(Piece::new(us, mv.promotion_type()), to);
            }
        }

        let new_rights =
            self.castling & CASTLE_MASKS[from as usize] & CASTLE_MASKS[to as usize];
        if new_rights != self.castling {
            self.hash ^= zobrist::castling(self.castling) ^ zobrist::castling(new_rights);
            self.castling = new_rights;
        }

        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = them;
        self.hash ^= zobrist::side_to_move();

        !self.is_attacked(self.king_square(us), them)
    }

    /// Side-swap-only "null" move used by null-move pruning.
    pub fn apply_null_move(&mut self) {
        debug_assert!(!self.in_check());
        if self.ep_square.is_some() {
            self.hash ^= zobrist::en_passant(self.ep_square.file());
            self.ep_square = Square::None;
        }
        self.halfmove_clock += 1;
        self.side_to_move = !self.side_to_move;
        self.hash ^= zobrist::side_to_move();
    }

    /// Whether `color` has any piece besides pawns and the king.
    /// Used to avoid null-move pruning in zugzwang-prone endgames.
    #[inline]
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        self.pieces_of(color)
            & !(self.by_type[PieceType::Pawn.index()] | self.by_type[PieceType::King.index()])
            != 0
    }

    /// Material combinations with no possible checkmate.
    pub fn is_insufficient_material(&self) -> bool {
        let heavy = self.by_type[PieceType::Pawn.index()]
            | self.by_type[PieceType::Rook.index()]
            | self.by_type[PieceType::Queen.index()];
        if heavy != 0 {
            return false;
        }
        let minors =
            self.by_type[PieceType::Knight.index()] | self.by_type[PieceType::Bishop.index()];
        if !more_than_one(minors) {
            return true;
        }
        // Two bishops on same-colored squares cannot mate either.
        const DARK_SQUARES: Bitboard = 0xAA55_AA55_AA55_AA55;
        let bishops = self.by_type[PieceType::Bishop.index()];
        minors == bishops
            && (bishops & DARK_SQUARES == bishops || bishops & DARK_SQUARES == 0)
    }
}

impl FromStr for Position {
    type Err = ParseFenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_fen(s)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  +-----------------+")?;
        for rank in (0..8).rev() {
            write!(f, "{} |", rank + 1)?;
            for file in 0..8 {
                write!(f, " {}", self.board[Square::from_file_rank(file, rank) as usize])?;
            }
            writeln!(f, " |")?;
        }
        writeln!(f, "  +-----------------+")?;
        writeln!(f, "    a b c d e f g h")?;
        write!(f, "fen: {}", self.to_fen())
    }
}

/// Iterator convenience used by evaluation and movegen.
#[inline]
pub fn squares_of(bb: Bitboard) -> BitboardIterator {
    BitboardIterator::new(bb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos() {
        let pos = Position::startpos();
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.castling_rights(), 0xF);
        assert_eq!(pos.occupied().count_ones(), 32);
        assert_eq!(pos.king_square(Color::White), Square::E1);
        assert_eq!(pos.king_square(Color::Black), Square::E8);
        assert!(!pos.in_check());
        assert_eq!(pos.to_fen(), START_FEN);
    }

    #[test]
    fn test_fen_round_trip() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "8/8/8/8/8/4k3/4P3/4K3 w - - 12 40",
        ];
        for fen in fens {
            let pos: Position = fen.parse().unwrap();
            assert_eq!(pos.to_fen(), fen, "round trip failed for {fen}");
        }
    }

    #[test]
    fn test_fen_errors() {
        assert!(Position::from_fen("").is_err());
        assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8 w").is_err());
        assert!(Position::from_fen("9/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"
        )
        .is_err());
    }

    #[test]
    fn test_apply_move_updates_hash_incrementally() {
        let mut pos = Position::startpos();
        assert!(pos.apply_move(Move::new(Square::E2, Square::E4, MoveKind::DoublePush)));
        assert!(pos.apply_move(Move::new(Square::C7, Square::C5, MoveKind::DoublePush)));
        assert!(pos.apply_move(Move::new(Square::G1, Square::F3, MoveKind::Quiet)));

        let mut fresh = pos;
        fresh.recompute_hashes();
        assert_eq!(pos.hash(), fresh.hash());
        assert_eq!(pos.pawn_king_hash(), fresh.pawn_king_hash());
    }

    #[test]
    fn test_apply_move_rejects_illegal() {
        // White is in check from the queen on h4; only a block or king
        // move is playable.
        let mut pos: Position =
            "rnb1kbnr/pppp1ppp/8/4p3/5P1q/8/PPPPP1PP/RNBQKBNR w KQkq - 1 3"
                .parse()
                .unwrap();
        let mut copy = pos;
        assert!(!copy.apply_move(Move::new(Square::G1, Square::H3, MoveKind::Quiet)));
        // Blocking on g3 resolves the check.
        assert!(pos.apply_move(Move::new(Square::G2, Square::G3, MoveKind::Quiet)));
    }

    #[test]
    fn test_en_passant_capture() {
        let mut pos: Position = "4k3/8/8/8/4pP2/8/8/4K3 b - f3 0 1".parse().unwrap();
        assert!(pos.apply_move(Move::new(Square::E4, Square::F3, MoveKind::EnPassant)));
        assert_eq!(pos.piece_on(Square::F3), Piece::BlackPawn);
        assert_eq!(pos.piece_on(Square::F4), Piece::None);
        assert_eq!(pos.piece_on(Square::E4), Piece::None);
    }

    #[test]
    fn test_castling_moves_rook() {
        let mut pos: Position =
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        assert!(pos.apply_move(Move::new(Square::E1, Square::G1, MoveKind::CastleWhiteKing)));
        assert_eq!(pos.piece_on(Square::G1), Piece::WhiteKing);
        assert_eq!(pos.piece_on(Square::F1), Piece::WhiteRook);
        assert_eq!(pos.castling_rights() & (CASTLE_WHITE_KING | CASTLE_WHITE_QUEEN), 0);
        assert!(pos.apply_move(Move::new(Square::E8, Square::C8, MoveKind::CastleBlackQueen)));
        assert_eq!(pos.piece_on(Square::C8), Piece::BlackKing);
        assert_eq!(pos.piece_on(Square::D8), Piece::BlackRook);
        assert_eq!(pos.castling_rights(), 0);
    }

    #[test]
    fn test_rook_capture_clears_castling_right() {
        let mut pos: Position =
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        assert!(pos.apply_move(Move::new(Square::A1, Square::A8, MoveKind::Capture)));
        assert_eq!(pos.castling_rights() & CASTLE_BLACK_QUEEN, 0);
        assert_eq!(pos.castling_rights() & CASTLE_WHITE_QUEEN, 0);
        assert_eq!(pos.castling_rights() & CASTLE_BLACK_KING, CASTLE_BLACK_KING);
    }

    #[test]
    fn test_promotion() {
        let mut pos: Position = "4k3/P7/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        assert!(pos.apply_move(Move::new(Square::A7, Square::A8, MoveKind::PromoQueen)));
        assert_eq!(pos.piece_on(Square::A8), Piece::WhiteQueen);
        assert_eq!(pos.pieces(Color::White, PieceType::Pawn), 0);
    }

    #[test]
    fn test_null_move_flips_side_and_hash() {
        let mut pos = Position::startpos();
        let hash = pos.hash();
        pos.apply_null_move();
        assert_eq!(pos.side_to_move(), Color::Black);
        assert_ne!(pos.hash(), hash);
        pos.apply_null_move();
        assert_eq!(pos.hash(), hash);
    }

    #[test]
    fn test_insufficient_material() {
        let draw_fens = [
            "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/4KN2 w - - 0 1",
            "4k3/8/8/8/8/8/8/4KB2 w - - 0 1",
            "2b1k3/8/8/8/8/8/8/4KB2 w - - 0 1", // both bishops on light squares
        ];
        for fen in draw_fens {
            let pos: Position = fen.parse().unwrap();
            assert!(pos.is_insufficient_material(), "{fen}");
        }
        let live_fens = [
            "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/3QK3 w - - 0 1",
            "4k3/8/8/8/8/8/8/2N1KN2 w - - 0 1",
        ];
        for fen in live_fens {
            let pos: Position = fen.parse().unwrap();
            assert!(!pos.is_insufficient_material(), "{fen}");
        }
    }

    #[test]
    fn test_game_ply() {
        assert_eq!(Position::startpos().game_ply(), 0);
        let pos: Position =
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1".parse().unwrap();
        assert_eq!(pos.game_ply(), 1);
        let pos: Position = "4k3/8/8/8/8/8/8/4K3 w - - 0 40".parse().unwrap();
        assert_eq!(pos.game_ply(), 78);
    }
}
