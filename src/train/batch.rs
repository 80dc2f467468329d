use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// Seeded generator when `seed` is set, entropy-seeded otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Picks `n` distinct items uniformly at random. When `n` covers the whole
/// slice every item is returned, in order.
pub fn random_subset<'a, T, R>(items: &'a [T], n: usize, rng: &mut R) -> Vec<&'a T>
where
    R: Rng + ?Sized,
{
    if n >= items.len() {
        return items.iter().collect();
    }
    index::sample(rng, items.len(), n)
        .into_iter()
        .map(|i| &items[i])
        .collect()
}
