//! Case-insensitive string similarity used by entity reconciliation.

/// Classic single-character insertion/deletion/substitution edit distance,
/// computed over chars with a two-row table.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution_cost = usize::from(ca != cb);
            current[j + 1] = (prev[j] + substitution_cost)
                .min(prev[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

/// Normalized similarity between two lower-cased strings:
/// `1 - dist / max(len)`. Two empty strings score 1.0; any string scores
/// exactly 1.0 against itself regardless of case.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let dist = edit_distance(&a, &b);
    (1.0 - dist as f64 / max_len as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Edit Distance Tests ====================

    #[test]
    fn test_edit_distance_identical() {
        assert_eq!(edit_distance("kitten", "kitten"), 0);
    }

    #[test]
    fn test_edit_distance_classic() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
    }

    #[test]
    fn test_edit_distance_empty() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_edit_distance_multibyte_chars() {
        assert_eq!(edit_distance("café", "cafe"), 1);
    }

    // ==================== Similarity Tests ====================

    #[test]
    fn test_similarity_identity_case_insensitive() {
        assert_eq!(similarity("Web API", "web api"), 1.0);
        assert_eq!(similarity("ORDERS-DB", "orders-db"), 1.0);
    }

    #[test]
    fn test_similarity_empty_strings_score_one() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_similarity_symmetry() {
        let pairs = [("payment service", "payments svc"), ("api", "gateway"), ("", "x")];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_similarity_bounds() {
        for (a, b) in [("a", "zzzzzzzz"), ("abc", "abd"), ("", "long string here")] {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "similarity({a:?}, {b:?}) = {s}");
        }
    }

    #[test]
    fn test_similarity_disjoint_strings_score_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similarity_close_names_score_high() {
        assert!(similarity("Web API", "Web-API") > 0.8);
        assert!(similarity("user database", "user db") > 0.5);
    }
}
