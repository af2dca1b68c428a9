//! TfL adult travelcard prices (2019 fares), for comparing pay-as-you-go
//! spend against a season ticket.

use rust_decimal::Decimal;

/// Interest uplift applied by a Commuter Club loan, in percent.
pub const COMMUTER_CLUB_INTEREST_PCT: Decimal = Decimal::from_parts(56, 0, 0, false, 1);

pub const MIN_ZONE: u8 = 1;
pub const MAX_ZONE: u8 = 9;

/// Travelcard prices for a zone pair, in pounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fare {
    pub from_zone: u8,
    pub to_zone: u8,
    pub weekly: Decimal,
    pub monthly: Decimal,
    pub yearly: Decimal,
}

// (from, to, weekly pence, monthly pence, yearly pounds)
const FARES: &[(u8, u8, i64, i64, i64)] = &[
    (1, 1, 3510, 13480, 1404),
    (1, 2, 3510, 13480, 1404),
    (1, 3, 4120, 15830, 1648),
    (1, 4, 5050, 19400, 2020),
    (1, 5, 6000, 23040, 2400),
    (1, 6, 6420, 24660, 2568),
    (1, 7, 6980, 26810, 2792),
    (1, 8, 8250, 31680, 3300),
    (1, 9, 9150, 35140, 3660),
    (2, 2, 2630, 10100, 1052),
    (2, 3, 2630, 10100, 1052),
    (2, 4, 2910, 11180, 1164),
    (2, 5, 3490, 13410, 1396),
    (2, 6, 4390, 16860, 1756),
    (2, 7, 4560, 17520, 1824),
    (2, 8, 6200, 23810, 2480),
    (2, 9, 6200, 23810, 2480),
    (3, 3, 2630, 10100, 1052),
    (3, 4, 2630, 10100, 1052),
    (3, 5, 2910, 11180, 1164),
    (3, 6, 3490, 13410, 1396),
    (3, 7, 4560, 17520, 1824),
    (3, 8, 6200, 23810, 2480),
    (3, 9, 6200, 23810, 2480),
    (4, 4, 2630, 10100, 1052),
    (4, 5, 2630, 10100, 1052),
    (4, 6, 2910, 11180, 1164),
    (4, 7, 3300, 12680, 1320),
    (4, 8, 5550, 21320, 2220),
    (4, 9, 5550, 21320, 2220),
    (5, 5, 2630, 10100, 1052),
    (5, 6, 2630, 10100, 1052),
    (5, 7, 3300, 12680, 1320),
    (5, 8, 5550, 21320, 2220),
    (5, 9, 5550, 21320, 2220),
    (6, 6, 2630, 10100, 1052),
    (6, 7, 3300, 12680, 1320),
    (6, 8, 5550, 21320, 2220),
    (6, 9, 5550, 21320, 2220),
    (7, 7, 3300, 12680, 1320),
    (7, 8, 5550, 21320, 2220),
    (7, 9, 5550, 21320, 2220),
    (8, 8, 5550, 21320, 2220),
    (8, 9, 5550, 21320, 2220),
    (9, 9, 8280, 31800, 3312),
];

/// Fare for travelling between two zones, in either direction.
pub fn lookup(from_zone: u8, to_zone: u8) -> Option<Fare> {
    let (low, high) = if from_zone > to_zone {
        (to_zone, from_zone)
    } else {
        (from_zone, to_zone)
    };

    FARES
        .iter()
        .find(|(from, to, ..)| *from == low && *to == high)
        .map(|&(from, to, weekly, monthly, yearly)| Fare {
            from_zone: from,
            to_zone: to,
            weekly: Decimal::new(weekly, 2),
            monthly: Decimal::new(monthly, 2),
            yearly: Decimal::from(yearly),
        })
}

/// Yearly travelcard price for a zone pair; zero for an unknown pair.
pub fn yearly_amount(from_zone: u8, to_zone: u8) -> Decimal {
    lookup(from_zone, to_zone)
        .map(|fare| fare.yearly)
        .unwrap_or(Decimal::ZERO)
}

/// Yearly cost of a travelcard bought with a Commuter Club loan.
pub fn commuter_club(yearly: Decimal) -> Decimal {
    yearly / Decimal::ONE_HUNDRED * COMMUTER_CLUB_INTEREST_PCT + yearly
}
