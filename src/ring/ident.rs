#![warn(missing_docs)]

//! Identifier-space arithmetic for the ring.
//!
//! Every node and every key lives at a position in `[0, 2^m)` and all
//! ordering questions are circular: "is x strictly clockwise of a and
//! strictly before b" must hold across the wraparound point, so plain
//! integer comparison is never enough. [RingSpace] owns the modulus and
//! is the only way to build an in-range [Ident], which keeps the
//! range check in one place instead of sprinkled over every predicate.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// A position on the identifier ring. Valid only within the
/// [RingSpace] that produced it.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct Ident(u128);

impl Ident {
    /// The raw integer value of this identifier.
    pub fn raw(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Ident> for u128 {
    fn from(id: Ident) -> u128 {
        id.0
    }
}

/// The identifier space of a ring with `2^bits` slots.
///
/// All interval predicates are expressed through clockwise distance:
/// `distance(a, b) = (b - a) mod 2^bits`. Comparing distances from a
/// common origin is what makes the predicates correct across the
/// wraparound point.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSpace {
    bits: u32,
}

impl RingSpace {
    /// Build a space of `2^bits` identifiers. `bits` is a deployment
    /// choice in `1..=128`.
    pub fn new(bits: u32) -> Result<Self> {
        if !(1..=128).contains(&bits) {
            return Err(Error::InvalidRingSize(bits));
        }
        Ok(Self { bits })
    }

    /// The ring size exponent `m`.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn mask(&self) -> u128 {
        if self.bits == 128 {
            u128::MAX
        } else {
            (1u128 << self.bits) - 1
        }
    }

    /// Validate a raw value into an [Ident], rejecting anything outside
    /// `[0, 2^bits)` before it can reach an interval predicate.
    pub fn ident(&self, raw: u128) -> Result<Ident> {
        if raw > self.mask() {
            return Err(Error::InvalidIdentifier {
                id: raw,
                bits: self.bits,
            });
        }
        Ok(Ident(raw))
    }

    /// Reduce an arbitrary integer into the space. Used for hashed keys,
    /// where the hash width may exceed the ring width.
    pub fn fold(&self, raw: u128) -> Ident {
        Ident(raw & self.mask())
    }

    /// Whether `id` belongs to this space.
    pub fn contains(&self, id: Ident) -> bool {
        id.0 <= self.mask()
    }

    /// Clockwise distance from `from` to `to`.
    pub fn distance(&self, from: Ident, to: Ident) -> u128 {
        to.0.wrapping_sub(from.0) & self.mask()
    }

    /// Test `x ∈ (a, b)` going clockwise. `(a, a)` denotes the full
    /// ring minus the endpoint itself.
    pub fn between(&self, x: Ident, a: Ident, b: Ident) -> bool {
        let off = self.distance(a, x);
        if off == 0 || x == b {
            return false;
        }
        let span = self.distance(a, b);
        span == 0 || off < span
    }

    /// Test `x ∈ (a, b]` going clockwise. `(a, a]` wraps the whole way
    /// around and covers every identifier, which is what makes a
    /// singleton node responsible for the entire space.
    pub fn in_open_closed(&self, x: Ident, a: Ident, b: Ident) -> bool {
        let span = self.distance(a, b);
        if span == 0 {
            return true;
        }
        let off = self.distance(a, x);
        off != 0 && off <= span
    }

    /// The start of finger interval `index` for a node at `id`:
    /// `(id + 2^index) mod 2^bits`.
    pub fn finger_start(&self, id: Ident, index: u32) -> Ident {
        debug_assert!(index < self.bits);
        self.fold(id.0.wrapping_add(1u128 << index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space8() -> RingSpace {
        RingSpace::new(3).unwrap()
    }

    fn id(space: &RingSpace, raw: u128) -> Ident {
        space.ident(raw).unwrap()
    }

    #[test]
    fn test_space_bounds() {
        assert_eq!(RingSpace::new(0).unwrap_err(), Error::InvalidRingSize(0));
        assert_eq!(
            RingSpace::new(129).unwrap_err(),
            Error::InvalidRingSize(129)
        );
        assert!(RingSpace::new(1).is_ok());
        assert!(RingSpace::new(128).is_ok());
    }

    #[test]
    fn test_ident_validation() {
        let space = space8();
        assert!(space.ident(7).is_ok());
        assert_eq!(
            space.ident(8).unwrap_err(),
            Error::InvalidIdentifier { id: 8, bits: 3 }
        );
        assert_eq!(space.fold(9).raw(), 1);
    }

    #[test]
    fn test_distance_wraps() {
        let space = space8();
        assert_eq!(space.distance(id(&space, 6), id(&space, 2)), 4);
        assert_eq!(space.distance(id(&space, 2), id(&space, 6)), 4);
        assert_eq!(space.distance(id(&space, 5), id(&space, 5)), 0);
        assert_eq!(space.distance(id(&space, 7), id(&space, 0)), 1);
    }

    #[test]
    fn test_between_wraparound() {
        let space = space8();
        // Clockwise arc from 6 to 2 is {7, 0, 1}.
        assert!(space.between(id(&space, 1), id(&space, 6), id(&space, 2)));
        assert!(space.between(id(&space, 7), id(&space, 6), id(&space, 2)));
        assert!(space.between(id(&space, 0), id(&space, 6), id(&space, 2)));
        assert!(!space.between(id(&space, 5), id(&space, 6), id(&space, 2)));
        assert!(!space.between(id(&space, 6), id(&space, 6), id(&space, 2)));
        assert!(!space.between(id(&space, 2), id(&space, 6), id(&space, 2)));
    }

    #[test]
    fn test_between_plain_arc() {
        let space = space8();
        assert!(space.between(id(&space, 3), id(&space, 1), id(&space, 5)));
        assert!(!space.between(id(&space, 1), id(&space, 1), id(&space, 5)));
        assert!(!space.between(id(&space, 5), id(&space, 1), id(&space, 5)));
        assert!(!space.between(id(&space, 6), id(&space, 1), id(&space, 5)));
    }

    #[test]
    fn test_between_degenerate_full_ring() {
        let space = space8();
        // (a, a) is everything except a itself.
        for x in 0..8u128 {
            let expect = x != 3;
            assert_eq!(
                space.between(id(&space, x), id(&space, 3), id(&space, 3)),
                expect,
                "x = {x}"
            );
        }
    }

    #[test]
    fn test_open_closed_interval() {
        let space = space8();
        assert!(space.in_open_closed(id(&space, 5), id(&space, 1), id(&space, 5)));
        assert!(!space.in_open_closed(id(&space, 1), id(&space, 1), id(&space, 5)));
        assert!(space.in_open_closed(id(&space, 0), id(&space, 6), id(&space, 2)));
        assert!(space.in_open_closed(id(&space, 2), id(&space, 6), id(&space, 2)));
        assert!(!space.in_open_closed(id(&space, 6), id(&space, 6), id(&space, 2)));
        // (a, a] is the full ring, including a itself at the far end.
        for x in 0..8u128 {
            assert!(space.in_open_closed(id(&space, x), id(&space, 4), id(&space, 4)));
        }
    }

    #[test]
    fn test_finger_start() {
        let space = space8();
        let n = id(&space, 6);
        assert_eq!(space.finger_start(n, 0).raw(), 7);
        assert_eq!(space.finger_start(n, 1).raw(), 0);
        assert_eq!(space.finger_start(n, 2).raw(), 2);
    }

    #[test]
    fn test_full_width_space() {
        let space = RingSpace::new(128).unwrap();
        let max = space.ident(u128::MAX).unwrap();
        let zero = space.ident(0).unwrap();
        assert_eq!(space.distance(max, zero), 1);
        assert!(space.between(zero, max, space.ident(1).unwrap()));
    }

    #[test]
    fn test_ident_serde() {
        let space = space8();
        let n = id(&space, 5);
        let dumped = serde_json::to_string(&n).unwrap();
        assert_eq!(dumped, "5");
        let loaded: Ident = serde_json::from_str(&dumped).unwrap();
        assert_eq!(loaded, n);
    }
}
