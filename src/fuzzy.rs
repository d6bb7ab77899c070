//! Edit-distance similarity used to recognise noisy OCR spellings of a label.

/// Case-insensitive similarity of two strings on a 0..=100 scale.
///
/// The score is `2 * M / T` scaled to 100 and rounded half to even, where `T`
/// is the combined character count and `M` the length of the longest common
/// subsequence. Equivalently it is one minus the insert/delete edit distance
/// over `T`. An empty side scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a = a.to_lowercase().chars().collect::<Vec<_>>();
    let b = b.to_lowercase().chars().collect::<Vec<_>>();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let total = (a.len() + b.len()) as f64;
    let matches = lcs_len(&a, &b) as f64;
    (100.0 * 2.0 * matches / total).round_ties_even() as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
