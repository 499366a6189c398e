use std::collections::HashMap;

/// Ratcliff/Obershelp "gestalt" similarity: `2·M / (|a| + |b|)` where `M` is
/// the number of characters in matching blocks found by recursively taking
/// the longest common substring. Two empty strings score 1.0.
pub fn gestalt_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 { return 1.0; }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, &positions, alo, ahi, blo, bhi);
        if k == 0 { continue; }
        matched += k;
        if alo < i && blo < j { pending.push((alo, i, blo, j)); }
        if i + k < ahi && j + k < bhi { pending.push((i + k, ahi, j + k, bhi)); }
    }
    matched
}

/// Longest block `a[i..i+k] == b[j..j+k]` within the given ranges; the
/// earliest such block in `a` wins ties.
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();
    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next = HashMap::new();
        for &j in positions.get(c).map(Vec::as_slice).unwrap_or_default() {
            if j < blo { continue; }
            if j >= bhi { break; }
            let k = j.checked_sub(1).and_then(|p| run_ending_at.get(&p)).copied().unwrap_or(0) + 1;
            next.insert(j, k);
            if k > best.2 { best = (i + 1 - k, j + 1 - k, k); }
        }
        run_ending_at = next;
    }
    best
}
