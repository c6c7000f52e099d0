use super::*;

/// Where to begin searching: nonce zero, then any suggestions, then
/// `random` random nonces. Duplicates are dropped, first occurrence wins.
pub(crate) fn starting_points(
    suggested: &[Nonce],
    random: usize,
    rng: &mut impl Rng,
) -> Vec<Nonce> {
    let mut seen = HashSet::new();

    std::iter::once(Nonce::from(0))
        .chain(suggested.iter().copied())
        .chain((0..random).map(|_| Nonce::from(rng.random::<u32>())))
        .filter(|nonce| seen.insert(*nonce))
        .collect()
}
