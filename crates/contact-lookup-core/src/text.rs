//! Text comparison primitives shared by index backends.
//!
//! All comparisons are case-insensitive and operate on Unicode scalar
//! values, so every backend agrees on what "equal", "contains", and
//! "approximately equal" mean.

/// Case-folded form used for every text comparison.
///
/// Backends that store precomputed keys must store `fold(value)`.
pub fn fold(value: &str) -> String {
    value.to_lowercase()
}

/// Case-insensitive equality.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    fold(a) == fold(b)
}

/// Levenshtein distance over `char`s.
///
/// Uses a single rolling row, so memory is `O(len(b))`.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diag + cost);
            diag = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b.len()]
}

/// True when `value` is within `slop` edits of `text`, ignoring case.
pub fn approx_eq(value: &str, text: &str, slop: u32) -> bool {
    let value = fold(value);
    let text = fold(text);

    // Length difference is a lower bound on the distance.
    let len_gap = value.chars().count().abs_diff(text.chars().count());
    if len_gap > slop as usize {
        return false;
    }
    edit_distance(&value, &text) <= slop as usize
}
