//! Price-time priority matching.
//!
//! [`match_order`] runs one incoming order against the opposite side of the
//! book while it crosses: the oldest order at the best opposite slot trades
//! first, at its own (resting) price. Emptied slots advance the opposite
//! cursor outward until a non-empty slot or the ladder bound is reached.

use crate::order_book::OrderBook;
use crate::price_level::Fill;
use crate::types::Order;

/// Matches `incoming` (limit slot `limit`) against the book and decrements its
/// volume. Returns fills in execution order; the caller turns them into trades
/// and rests any remainder.
pub fn match_order(book: &mut OrderBook, incoming: &mut Order, limit: usize) -> Vec<Fill> {
    let opposite = incoming.side.opposite();
    let mut fills = Vec::new();

    while incoming.volume > 0 {
        let Some(slot) = book.crossing_slot(incoming.side, limit) else {
            break;
        };
        let Some(fill) = book.fill_at(opposite, slot, incoming.volume) else {
            // Cursor sits on an empty slot: the opposite side has nothing left.
            if !book.advance_best(opposite) {
                break;
            }
            continue;
        };
        incoming.volume -= fill.volume;
        if fill.resting_fully_filled {
            book.unindex(fill.resting_order_id);
        }
        if book.slot_is_empty(opposite, slot) {
            book.advance_best(opposite);
        }
        fills.push(fill);
    }
    fills
}
