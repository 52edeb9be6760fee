//! Stereo assignment of partials.
//!
//! Partials are distributed over the two channels so that every prime family is split
//! evenly: walking the primes from high to low, the not yet assigned multiples of each
//! prime alternate between the channels, and the channel that starts alternates from
//! one prime to the next. Both channels thus end up with a comparable share of every
//! sieve setting.
//!
//! The table is computed once on first use.

use spin::Once;

use super::sieve::PRIMES;

/// Highest partial covered by the table.
pub const PAN_TABLE_PARTIALS: usize = 128;

static PAN_TABLE: Once<[bool; PAN_TABLE_PARTIALS + 1]> = Once::new();

/// Returns the table, building it if necessary. Call once outside the audio
/// callback to avoid building it there.
pub fn pan_table() -> &'static [bool; PAN_TABLE_PARTIALS + 1] {
    PAN_TABLE.call_once(build_table)
}

/// Returns `true` if `partial` sounds at full level in the left channel (before any
/// flip), `false` if it belongs to the right one.
///
/// Partial 1 is in both channels and not covered by this function. Partials above
/// the table alternate by parity.
#[inline]
pub fn is_left(partial: usize) -> bool {
    match pan_table().get(partial) {
        Some(&left) => left,
        None => partial % 2 == 1,
    }
}

fn build_table() -> [bool; PAN_TABLE_PARTIALS + 1] {
    let mut assigned = [false; PAN_TABLE_PARTIALS + 1];
    let mut left = [false; PAN_TABLE_PARTIALS + 1];
    let mut family_starts_left = false;

    for &prime in PRIMES.iter().rev() {
        let mut next_left = family_starts_left;

        for partial in (prime..=PAN_TABLE_PARTIALS).step_by(prime) {
            if !assigned[partial] {
                assigned[partial] = true;
                left[partial] = next_left;
                next_left = !next_left;
            }
        }

        family_starts_left = !family_starts_left;
    }

    log::trace!("stereo pan table built");

    left
}
