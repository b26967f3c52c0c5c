//! Deterministic palette assignment.
//!
//! Each layer name is hashed onto the fixed palette list. Names are placed
//! in sorted order and collisions probe forward to the next free palette, so
//! the result depends only on the set of names. Once every palette is taken
//! a new round starts and palettes are reused.

use std::collections::BTreeMap;

use crate::scheme::Palette;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a hash
fn fnv1a(text: &str) -> u64 {
    text.bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// Palette for a single name, ignoring collisions.
pub fn palette_for(name: &str) -> Palette {
    let n = Palette::ALL.len() as u64;
    Palette::ALL[(fnv1a(name) % n) as usize]
}

/// Assign a palette to every name.
///
/// Duplicate names receive a single entry.
pub fn assign_palettes<S: AsRef<str>>(names: &[S]) -> BTreeMap<String, Palette> {
    let mut sorted: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let n = Palette::ALL.len();
    let mut taken = vec![false; n];
    let mut free = n;
    let mut out = BTreeMap::new();

    for name in sorted {
        if free == 0 {
            taken.iter_mut().for_each(|t| *t = false);
            free = n;
        }
        let start = (fnv1a(name) % n as u64) as usize;
        let slot = (0..n)
            .map(|i| (start + i) % n)
            .find(|&i| !taken[i])
            .unwrap_or(start);
        taken[slot] = true;
        free -= 1;
        out.insert(name.to_string(), Palette::ALL[slot]);
    }

    out
}
