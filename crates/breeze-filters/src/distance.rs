//! Edit distance helpers for fuzzy matching

/// Levenshtein edit distance between two strings, counted in characters
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein_chars(&a, &b)
}

/// Levenshtein distance over pre-split character slices
pub fn levenshtein_chars(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return long.len();
    }

    let mut prev_row: Vec<usize> = (0..=short.len()).collect();
    let mut curr_row = vec![0; short.len() + 1];

    for (i, c1) in long.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, c2) in short.iter().enumerate() {
            let insertion = prev_row[j + 1] + 1;
            let deletion = curr_row[j] + 1;
            let substitution = prev_row[j] + usize::from(c1 != c2);
            curr_row[j + 1] = insertion.min(deletion).min(substitution);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[short.len()]
}
