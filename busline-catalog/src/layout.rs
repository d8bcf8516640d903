use serde::Serialize;

use busline_core::{LayoutClass, Route, SeatNumber};

const SLEEPER_BERTHS_PER_ROW: u32 = 2;
const SEATER_SEATS_PER_ROW: u32 = 4;
/// Seater rows are split 2 + 2 with the aisle after this column.
const SEATER_AISLE_AFTER: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Deck {
    Main,
    Upper,
    Lower,
}

/// Where a seat number sits on the vehicle. Purely presentational.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatPosition {
    pub seat: SeatNumber,
    pub deck: Deck,
    pub row: u32,
    pub column: u32,
    pub label: String,
    pub aisle_after: bool,
}

/// Sleepers put the first half of the numbers on the upper deck and the rest
/// on the lower deck; seaters number row by row.
pub fn seat_position(route: &Route, seat: SeatNumber) -> Option<SeatPosition> {
    if !route.contains_seat(seat) {
        return None;
    }
    let index = seat - 1;

    let position = match route.layout {
        LayoutClass::Sleeper => {
            let upper_berths = route.capacity.div_ceil(2);
            let (deck, offset, prefix) = if index < upper_berths {
                (Deck::Upper, index, 'U')
            } else {
                (Deck::Lower, index - upper_berths, 'L')
            };
            SeatPosition {
                seat,
                deck,
                row: offset / SLEEPER_BERTHS_PER_ROW + 1,
                column: offset % SLEEPER_BERTHS_PER_ROW + 1,
                label: format!("{}{}", prefix, offset + 1),
                aisle_after: false,
            }
        }
        LayoutClass::Seater => {
            let row = index / SEATER_SEATS_PER_ROW + 1;
            let column = index % SEATER_SEATS_PER_ROW + 1;
            let letter = char::from(b'A' + (column - 1) as u8);
            SeatPosition {
                seat,
                deck: Deck::Main,
                row,
                column,
                label: format!("{}{}", row, letter),
                aisle_after: column == SEATER_AISLE_AFTER,
            }
        }
    };

    Some(position)
}

/// Every seat of the route in numbering order.
pub fn seat_plan(route: &Route) -> Vec<SeatPosition> {
    (1..=route.capacity)
        .filter_map(|seat| seat_position(route, seat))
        .collect()
}
