//! String utilities.

use rand::Rng;

/// Generates a random string of lowercase letters.
///
/// # Examples
///
/// ```
/// use cutil::str::random_string;
///
/// let random = random_string(10);
/// assert_eq!(random.len(), 10);
/// assert!(random.chars().all(|c| c.is_ascii_lowercase()));
/// ```
pub fn random_string(length: usize) -> String {
    let mut rng = rand::rng();
    let chars: Vec<char> = ('a'..='z').collect();
    (0..length)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string() {
        for length in [0, 1, 5, 10, 50] {
            let random = random_string(length);
            assert_eq!(random.len(), length);
            assert!(random.chars().all(|c| c.is_ascii_lowercase()));
        }

        // Note: There's a very small chance this could fail, but it's extremely unlikely
        assert_ne!(random_string(16), random_string(16));
    }
}
