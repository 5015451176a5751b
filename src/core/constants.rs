// ============================================================================
// spark-compose - Constants
// Flag constants for graph node kinds and states
// ============================================================================

// =============================================================================
// NODE KIND FLAGS
// =============================================================================

/// Source signal (basic reactive value)
pub const SOURCE: u32 = 1 << 0;

/// Node is a derived value (computed, cached)
pub const DERIVED: u32 = 1 << 1;

/// Node is an effect
pub const EFFECT: u32 = 1 << 2;

/// Effect drives a view snapshot (installed by `mount`)
pub const RENDER_EFFECT: u32 = 1 << 3;

// =============================================================================
// STATE FLAGS
// =============================================================================

/// Node is clean (up-to-date)
pub const CLEAN: u32 = 1 << 10;

/// A direct dependency was written
pub const DIRTY: u32 = 1 << 11;

/// An upstream derived may have changed; versions must be checked
pub const MAYBE_DIRTY: u32 = 1 << 12;

/// Reaction is currently executing
pub const REACTION_IS_UPDATING: u32 = 1 << 13;

/// Effect has been destroyed
pub const DESTROYED: u32 = 1 << 14;

/// Effect has run at least once
pub const EFFECT_RAN: u32 = 1 << 16;

// =============================================================================
// STATUS MASK (for clearing status bits)
// =============================================================================

/// Mask to clear all status bits (CLEAN, DIRTY, MAYBE_DIRTY)
pub const STATUS_MASK: u32 = !(DIRTY | MAYBE_DIRTY | CLEAN);

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_distinct() {
        let all_flags = [
            SOURCE,
            DERIVED,
            EFFECT,
            RENDER_EFFECT,
            CLEAN,
            DIRTY,
            MAYBE_DIRTY,
            REACTION_IS_UPDATING,
            DESTROYED,
            EFFECT_RAN,
        ];

        for (i, &a) in all_flags.iter().enumerate() {
            for (j, &b) in all_flags.iter().enumerate() {
                if i != j {
                    assert_eq!(a & b, 0, "flags at {i} and {j} overlap: {a:b} & {b:b}");
                }
            }
        }
    }

    #[test]
    fn status_mask_keeps_kind_bits() {
        let flags = EFFECT | DIRTY | EFFECT_RAN;
        let cleared = flags & STATUS_MASK;

        assert_eq!(cleared & DIRTY, 0);
        assert_ne!(cleared & EFFECT, 0);
        assert_ne!(cleared & EFFECT_RAN, 0);
    }
}
