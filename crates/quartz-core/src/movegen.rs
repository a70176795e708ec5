//! Pseudo-legal move generation.
//!
//! Moves are generated without regard for pins or checks; legality is
//! settled by [`Position::apply_move`]. Castling is the one exception
//! and is emitted fully legal, since its attack constraints cannot be
//! recovered after the fact.

use crate::attacks;
use crate::bitboard::{self, Bitboard, BitboardIterator, RANK_1, RANK_3, RANK_6, RANK_8};
use crate::move_list::MoveList;
use crate::moves::{Move, MoveKind};
use crate::piece::{Color, PieceType};
use crate::position::{
    CASTLE_BLACK_KING, CASTLE_BLACK_QUEEN, CASTLE_WHITE_KING, CASTLE_WHITE_QUEEN, Position,
};
use crate::square::Square;

/// Generates all pseudo-legal moves for the side to move.
pub fn generate_moves(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move();
    let targets = !pos.pieces_of(us);
    generate_pawn_moves(pos, us, true, list);
    for pt in [
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ] {
        generate_piece_moves(pos, us, pt, targets, list);
    }
    generate_castling(pos, us, list);
}

/// Generates captures, en passant, and queen promotions. Quiescence
/// search uses this when not in check.
pub fn generate_captures(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move();
    let targets = pos.pieces_of(!us);
    generate_pawn_moves(pos, us, false, list);
    for pt in [
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ] {
        generate_piece_moves(pos, us, pt, targets, list);
    }
}

fn generate_piece_moves(pos: &Position, us: Color, pt: PieceType, targets: Bitboard, list: &mut MoveList) {
    let occ = pos.occupied();
    for from in BitboardIterator::new(pos.pieces(us, pt)) {
        let att = match pt {
            PieceType::Knight => attacks::knight_attacks(from),
            PieceType::Bishop => attacks::bishop_attacks(from, occ),
            PieceType::Rook => attacks::rook_attacks(from, occ),
            PieceType::Queen => attacks::queen_attacks(from, occ),
            PieceType::King => attacks::king_attacks(from),
            PieceType::Pawn => unreachable!(),
        };
        for to in BitboardIterator::new(att & targets) {
            let kind = if pos.piece_on(to).is_some() {
                MoveKind::Capture
            } else {
                MoveKind::Quiet
            };
            list.push(Move::new(from, to, kind));
        }
    }
}

fn generate_pawn_moves(pos: &Position, us: Color, include_quiets: bool, list: &mut MoveList) {
    let pawns = pos.pieces(us, PieceType::Pawn);
    let empty = !pos.occupied();
    let them = pos.pieces_of(!us);

    // from = to - delta for each shift direction, from White's view.
    let (single, double, cap_east, cap_west, promo_rank, up, east, west) = match us {
        Color::White => (
            bitboard::north(pawns) & empty,
            bitboard::north(bitboard::north(pawns) & empty & RANK_3) & empty,
            bitboard::north_east(pawns) & them,
            bitboard::north_west(pawns) & them,
            RANK_8,
            8i32,
            9i32,
            7i32,
        ),
        Color::Black => (
            bitboard::south(pawns) & empty,
            bitboard::south(bitboard::south(pawns) & empty & RANK_6) & empty,
            bitboard::south_east(pawns) & them,
            bitboard::south_west(pawns) & them,
            RANK_1,
            -8i32,
            -7i32,
            -9i32,
        ),
    };

    let from_of = |to: Square, delta: i32| Square::from_usize_unchecked((to as i32 - delta) as usize);

    for to in BitboardIterator::new(single & promo_rank) {
        push_promotions(list, from_of(to, up), to, false, include_quiets);
    }
    for (caps, delta) in [(cap_east, east), (cap_west, west)] {
        for to in BitboardIterator::new(caps & promo_rank) {
            push_promotions(list, from_of(to, delta), to, true, include_quiets);
        }
        for to in BitboardIterator::new(caps & !promo_rank) {
            list.push(Move::new(from_of(to, delta), to, MoveKind::Capture));
        }
    }

    if include_quiets {
        for to in BitboardIterator::new(single & !promo_rank) {
            list.push(Move::new(from_of(to, up), to, MoveKind::Quiet));
        }
        for to in BitboardIterator::new(double) {
            list.push(Move::new(from_of(to, 2 * up), to, MoveKind::DoublePush));
        }
    }

    let ep = pos.ep_square();
    if ep.is_some() {
        for from in BitboardIterator::new(attacks::pawn_attacks(!us, ep) & pawns) {
            list.push(Move::new(from, ep, MoveKind::EnPassant));
        }
    }
}

fn push_promotions(list: &mut MoveList, from: Square, to: Square, capture: bool, all: bool) {
    if capture {
        list.push(Move::new(from, to, MoveKind::PromoCaptureQueen));
        if all {
            list.push(Move::new(from, to, MoveKind::PromoCaptureKnight));
            list.push(Move::new(from, to, MoveKind::PromoCaptureRook));
            list.push(Move::new(from, to, MoveKind::PromoCaptureBishop));
        }
    } else {
        list.push(Move::new(from, to, MoveKind::PromoQueen));
        if all {
            list.push(Move::new(from, to, MoveKind::PromoKnight));
            list.push(Move::new(from, to, MoveKind::PromoRook));
            list.push(Move::new(from, to, MoveKind::PromoBishop));
        }
    }
}

fn generate_castling(pos: &Position, us: Color, list: &mut MoveList) {
    match us {
        Color::White => {
            if castle_is_legal(pos, MoveKind::CastleWhiteKing) {
                list.push(Move::new(Square::E1, Square::G1, MoveKind::CastleWhiteKing));
            }
            if castle_is_legal(pos, MoveKind::CastleWhiteQueen) {
                list.push(Move::new(Square::E1, Square::C1, MoveKind::CastleWhiteQueen));
            }
        }
        Color::Black => {
            if castle_is_legal(pos, MoveKind::CastleBlackKing) {
                list.push(Move::new(Square::E8, Square::G8, MoveKind::CastleBlackKing));
            }
            if castle_is_legal(pos, MoveKind::CastleBlackQueen) {
                list.push(Move::new(Square::E8, Square::C8, MoveKind::CastleBlackQueen));
            }
        }
    }
}

fn castle_is_legal(pos: &Position, kind: MoveKind) -> bool {
    let (right, empty_mask, checked_squares, enemy) = match kind {
        MoveKind::CastleWhiteKing => (
            CASTLE_WHITE_KING,
            Square::F1.bitboard() | Square::G1.bitboard(),
            [Square::E1, Square::F1, Square::G1],
            Color::Black,
        ),
        MoveKind::CastleWhiteQueen => (
            CASTLE_WHITE_QUEEN,
            Square::B1.bitboard() | Square::C1.bitboard() | Square::D1.bitboard(),
            [Square::E1, Square::D1, Square::C1],
            Color::Black,
        ),
        MoveKind::CastleBlackKing => (
            CASTLE_BLACK_KING,
            Square::F8.bitboard() | Square::G8.bitboard(),
            [Square::E8, Square::F8, Square::G8],
            Color::White,
        ),
        MoveKind::CastleBlackQueen => (
            CASTLE_BLACK_QUEEN,
            Square::B8.bitboard() | Square::C8.bitboard() | Square::D8.bitboard(),
            [Square::E8, Square::D8, Square::C8],
            Color::White,
        ),
        _ => return false,
    };
    pos.castling_rights() & right != 0
        && pos.occupied() & empty_mask == 0
        && !checked_squares.iter().any(|&sq| pos.is_attacked(sq, enemy))
}

/// Validates a move pulled from the transposition table against the
/// current position. A stale or colliding entry can carry a move that
/// makes no sense here; playing it would corrupt the board.
pub fn is_pseudo_legal(pos: &Position, mv: Move) -> bool {
    if !mv.is_some() {
        return false;
    }
    let us = pos.side_to_move();
    let from = mv.from();
    let to = mv.to();
    let piece = pos.piece_on(from);

    if !piece.is_some() || piece.color() != us {
        return false;
    }
    let victim = pos.piece_on(to);
    if mv.is_capture() && mv.kind() != MoveKind::EnPassant {
        if !victim.is_some() || victim.color() == us || victim.piece_type() == PieceType::King {
            return false;
        }
    } else if victim.is_some() && !mv.is_castle() {
        return false;
    }

    let pt = piece.piece_type();
    match mv.kind() {
        MoveKind::Quiet | MoveKind::Capture if pt == PieceType::Pawn => {
            if mv.kind() == MoveKind::Quiet {
                let up = us.forward();
                to as i32 == from as i32 + up
                    && to.bitboard() & pawn_promo_rank(us) == 0
            } else {
                attacks::pawn_attacks(us, from) & to.bitboard() != 0
                    && to.bitboard() & pawn_promo_rank(us) == 0
            }
        }
        MoveKind::Quiet | MoveKind::Capture => {
            let occ = pos.occupied();
            let att = match pt {
                PieceType::Knight => attacks::knight_attacks(from),
                PieceType::Bishop => attacks::bishop_attacks(from, occ),
                PieceType::Rook => attacks::rook_attacks(from, occ),
                PieceType::Queen => attacks::queen_attacks(from, occ),
                PieceType::King => attacks::king_attacks(from),
                PieceType::Pawn => unreachable!(),
            };
            att & to.bitboard() != 0
        }
        MoveKind::DoublePush => {
            let up = us.forward();
            pt == PieceType::Pawn
                && to as i32 == from as i32 + 2 * up
                && from.bitboard() & pawn_start_rank(us) != 0
                && !pos.piece_on(Square::from_usize_unchecked((from as i32 + up) as usize)).is_some()
        }
        MoveKind::EnPassant => {
            pt == PieceType::Pawn
                && to == pos.ep_square()
                && attacks::pawn_attacks(us, from) & to.bitboard() != 0
        }
        kind if kind.is_castle_kind() => pt == PieceType::King && castle_is_legal(pos, kind),
        _ => {
            // Promotions.
            if pt != PieceType::Pawn || to.bitboard() & pawn_promo_rank(us) == 0 {
                return false;
            }
            if mv.is_capture() {
                attacks::pawn_attacks(us, from) & to.bitboard() != 0
            } else {
                to as i32 == from as i32 + us.forward()
            }
        }
    }
}

fn pawn_promo_rank(us: Color) -> Bitboard {
    match us {
        Color::White => RANK_8,
        Color::Black => RANK_1,
    }
}

fn pawn_start_rank(us: Color) -> Bitboard {
    match us {
        Color::White => bitboard::RANK_2,
        Color::Black => bitboard::RANK_7,
    }
}
