//! Temperature and nucleus (top-p) sampling over raw logits.

use rand::Rng;

pub const MIN_TEMPERATURE: f32 = 1e-3;
const MIN_MASS: f32 = 1e-6;

/// Draws a token index from `logits`. Returns 0 for an empty slice.
pub fn sample_from_logits<R: Rng + ?Sized>(logits: &[f32], temperature: f32, top_p: f32, rng: &mut R) -> usize {
    if logits.is_empty() {
        return 0;
    }
    let temperature = temperature.max(MIN_TEMPERATURE);
    let scaled: Vec<f32> = logits.iter().map(|l| l / temperature).collect();
    sample_top_p(&softmax(&scaled), top_p, rng)
}

pub fn softmax(x: &[f32]) -> Vec<f32> {
    let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let max = if max.is_finite() { max } else { 0.0 };
    let exps: Vec<f32> = x.iter().map(|v| (v - max).exp()).collect();
    let sum = exps.iter().sum::<f32>().max(MIN_MASS);
    exps.into_iter().map(|e| e / sum).collect()
}

/// Keeps the most probable indices until their mass reaches `top_p`
/// (clamped to `[0.01, 1]`), then draws from them renormalised. At
/// `top_p = 1` every index stays a candidate.
pub fn sample_top_p<R: Rng + ?Sized>(probs: &[f32], top_p: f32, rng: &mut R) -> usize {
    let p = top_p.clamp(0.01, 1.0);
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|a, b| probs[*b].total_cmp(&probs[*a]));

    let mut nucleus = Vec::with_capacity(order.len());
    let mut cumulative = 0.0f32;
    for i in order {
        nucleus.push(i);
        cumulative += probs[i];
        if p < 1.0 && cumulative >= p {
            break;
        }
    }

    let norm = nucleus.iter().map(|i| probs[*i] as f64).sum::<f64>().max(MIN_MASS as f64) as f32;
    let mut r: f32 = rng.gen();
    for &i in &nucleus {
        let q = probs[i] / norm;
        if r <= q {
            return i;
        }
        r -= q;
    }
    nucleus.last().copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    #[test]
    fn test_empty_logits() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sample_from_logits(&[], 0.8, 0.95, &mut rng), 0);
    }

    #[test]
    fn test_full_nucleus_reaches_every_index() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let logits = [0.0f32, 0.5, 1.0, -0.5];
        let seen: BTreeSet<usize> = (0..2000)
            .map(|_| sample_from_logits(&logits, 1.0, 1.0, &mut rng))
            .collect();
        assert_eq!(seen, (0..4).collect());
    }

    #[test]
    fn test_narrow_nucleus_keeps_top_token() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let logits = [0.0f32, 5.0, 0.0, 0.0];
        for _ in 0..200 {
            assert_eq!(sample_from_logits(&logits, 1.0, 0.5, &mut rng), 1);
        }
    }

    #[test]
    fn test_low_temperature_is_greedy() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let logits = [1.0f32, 1.2, 0.9];
        for _ in 0..100 {
            assert_eq!(sample_from_logits(&logits, 0.0, 1.0, &mut rng), 1);
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let logits: Vec<f32> = (0..32).map(|i| (i as f32 * 0.37).sin()).collect();
        let draw = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..16).map(|_| sample_from_logits(&logits, 0.8, 0.95, &mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(99), draw(99));
    }
}
