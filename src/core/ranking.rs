//! Top-N ranking shared by the reporting queries

/// Rank `(key, count)` pairs by descending count and keep the first `n`
///
/// The sort is stable, so pairs with equal counts keep the order in which
/// they were supplied. Callers feed pairs in identifier order, which makes
/// ties resolve lexicographically by identifier.
pub fn top_n<K, C>(pairs: impl IntoIterator<Item = (K, C)>, n: usize) -> Vec<(K, C)>
where
    C: Ord + Copy,
{
    let mut ranked: Vec<(K, C)> = pairs.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}
