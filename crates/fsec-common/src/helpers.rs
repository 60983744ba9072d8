//! Common helper functions for fsec.

use subtle::ConstantTimeEq;

/// Compare two byte strings in constant time.
///
/// The running time depends only on the lengths. Strings of different
/// lengths never match.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
