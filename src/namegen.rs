//! Deterministic two-word champion names: the same signature always hashes
//! to the same name, across runs and across machines.
//!
//! `std::collections::HashMap`'s default hasher is randomized per-process
//! and explicitly not guaranteed stable across compilations, so it can't be
//! used here. Rather than reach for a hashing crate for a four-line
//! function, this hand-rolls FNV-1a, the same way a chess engine's position
//! hashing computes Zobrist keys by hand when it needs a hash that must
//! stay fixed forever rather than whatever the standard library happens to
//! do this version.

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

const ADJECTIVES: [&str; 64] = [
    "amber", "ancient", "arid", "azure", "bitter", "blazing", "bleak", "bold",
    "brash", "brittle", "bronze", "brooding", "brutal", "calm", "coiled", "copper",
    "craggy", "crimson", "cunning", "dappled", "dark", "deft", "dense", "dire",
    "dusty", "eager", "ember", "faded", "feral", "fierce", "frail", "frost",
    "gaunt", "gilded", "glacial", "gnarled", "golden", "grim", "hazy", "hollow",
    "hushed", "iron", "ivory", "jagged", "keen", "lank", "lean", "lurid",
    "molten", "murky", "obsidian", "pale", "quiet", "restless", "rigid", "rusted",
    "sable", "sharp", "silent", "slate", "stark", "sullen", "swift", "weary",
];

const NOUNS: [&str; 64] = [
    "anvil", "badger", "barrow", "basilisk", "bishop", "bramble", "brigand", "cairn",
    "castle", "chasm", "cinder", "citadel", "cobra", "crane", "crow", "drake",
    "ember", "falcon", "ferret", "gauntlet", "gecko", "glacier", "goshawk", "harrier",
    "heron", "hollow", "hornet", "hydra", "jackal", "javelin", "kestrel", "lance",
    "lantern", "lichen", "lynx", "magpie", "mantis", "marsh", "mongoose", "moth",
    "musket", "nettle", "otter", "owl", "panther", "phalanx", "pike", "quarry",
    "rampart", "raven", "redoubt", "sentinel", "serpent", "shrike", "sparrow", "spire",
    "stoat", "talon", "thicket", "thorn", "viper", "wasp", "wolf", "wren",
];

/// Maps a ruleset signature to a stable `adjective-noun` name: 4096
/// possibilities (64 adjectives times 64 nouns), the same name every time
/// for the same signature.
pub fn signature_to_name(signature: &str) -> String {
    let hash = fnv1a(signature.as_bytes());
    let adjective = ADJECTIVES[(hash & 0x3f) as usize];
    let noun = NOUNS[((hash >> 6) & 0x3f) as usize];
    format!("{adjective}-{noun}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_signature_always_yields_the_same_name() {
        let sig = "K1:A1,A1,A1,A1,A1,A1,A1,A1|K1:A1,A1,A1,A1,A1,A1,A1,A1";
        assert_eq!(signature_to_name(sig), signature_to_name(sig));
    }

    #[test]
    fn different_signatures_usually_yield_different_names() {
        let a = signature_to_name("K1:A1|K1:A2");
        let b = signature_to_name("K1:A2|K1:A1");
        assert_ne!(a, b);
    }

    #[test]
    fn name_has_exactly_one_separator() {
        let name = signature_to_name("K1:A1|K1:A1");
        assert_eq!(name.matches('-').count(), 1);
    }

    #[test]
    fn word_tables_have_no_duplicates() {
        let mut adjectives = ADJECTIVES.to_vec();
        adjectives.sort();
        adjectives.dedup();
        assert_eq!(adjectives.len(), 64);

        let mut nouns = NOUNS.to_vec();
        nouns.sort();
        nouns.dedup();
        assert_eq!(nouns.len(), 64);
    }
}
