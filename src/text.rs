//! French text normalization for user-facing matching
//!
//! Client messages arrive with inconsistent casing and accents ("Vol",
//! "vol", "résilié", "resilie"). Matching against database labels folds
//! both sides to lowercase ASCII first.

/// Lowercase a string and strip French diacritics
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            _ => c,
        })
        .collect()
}

/// Case and accent insensitive containment check
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    normalize(haystack).contains(&normalize(needle))
}
