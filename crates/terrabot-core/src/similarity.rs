//! Matching-block similarity (Ratcliff/Obershelp) and best-of-pool selection.
//!
//! Scores are `2*M / (|a| + |b|)` over lower-cased characters, where `M` is the total length
//! of the matching blocks found by repeatedly taking the longest common substring and
//! recursing on both sides of it.

use crate::{MatchResult, Matched};

fn fold(s: &str) -> Vec<char> {
    s.chars().flat_map(|c| c.to_lowercase()).collect()
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
///
/// Among equally long blocks the one starting earliest in `a` wins.
fn longest_block(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0usize);
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo;
            cur[col + 1] = if a[i] == b[j] {
                let k = prev[col] + 1;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
                k
            } else {
                0
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0usize;
    let mut todo = vec![((0, a.len()), (0, b.len()))];
    while let Some(((alo, ahi), (blo, bhi))) = todo.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let (i, j, k) = longest_block(a, b, (alo, ahi), (blo, bhi));
        if k == 0 {
            continue;
        }
        total += k;
        todo.push(((alo, i), (blo, j)));
        todo.push(((i + k, ahi), (j + k, bhi)));
    }
    total
}

/// Pairwise similarity ratio in `[0, 1]`, case-insensitive.
///
/// Block search is order-sensitive, so the folded inputs are put in a fixed order first;
/// `similarity(a, b) == similarity(b, a)` always holds.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = fold(a);
    let b = fold(b);
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let m = if a <= b {
        matched_chars(&a, &b)
    } else {
        matched_chars(&b, &a)
    };
    2.0 * m as f64 / total as f64
}

/// Index and score of the best candidate scoring strictly above `cutoff`.
///
/// The current best is only replaced on a strictly greater score, so exact ties go to the
/// candidate seen first.
pub fn best_candidate<'a, I>(query: &str, candidates: I, cutoff: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    if query.trim().is_empty() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (idx, cand) in candidates.into_iter().enumerate() {
        let score = similarity(query, cand);
        if score <= cutoff {
            continue;
        }
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

/// Closest-of-many: the highest-scoring candidate above `cutoff`, returned verbatim.
pub fn closest_match<'a, I>(query: &str, candidates: I, cutoff: f64) -> MatchResult
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let it = candidates.into_iter();
    match best_candidate(query, it.clone(), cutoff) {
        Some((idx, score)) => match it.into_iter().nth(idx) {
            Some(text) => MatchResult::Match(Matched {
                text: text.to_string(),
                score,
                source_id: None,
            }),
            None => MatchResult::NoMatch,
        },
        None => MatchResult::NoMatch,
    }
}
