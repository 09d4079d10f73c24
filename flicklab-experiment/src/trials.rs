//! Trial-list composition.
//!
//! Sessions are planned up front as same-length columns (stimulus
//! frequency, modality, inter-trial interval) and consumed row-wise. The
//! helpers here build ratio-weighted pools and shuffle them blockwise, so
//! every block presents the full combination set once in random order.

use rand::seq::SliceRandom;
use rand::Rng;

use flicklab_core::Modality;

use crate::config::SessionConfig;

/// One planned trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialRow {
    pub index: usize,
    pub modality: Modality,
    pub hz: f32,
    pub iti: f64,
}

/// The whole session's trial order.
#[derive(Debug, Clone, Default)]
pub struct TrialPlan {
    rows: Vec<TrialRow>,
}

impl TrialPlan {
    /// Go/no-go composition: visual frequencies split by the boundary and
    /// mixed with auditory probe trials, blockwise shuffled, with uniform
    /// inter-trial intervals.
    pub fn discrimination<R: Rng>(config: &SessionConfig, rng: &mut R) -> TrialPlan {
        let go: Vec<f32> =
            config.led_flick_hz.iter().copied().filter(|hz| *hz > config.boundary).collect();
        let nogo: Vec<f32> =
            config.led_flick_hz.iter().copied().filter(|hz| *hz < config.boundary).collect();
        let go_nogo = mix(&go, &nogo, config.go_ratio, config.nogo_ratio);

        let visual = vec![Modality::Visual; go_nogo.len()];
        let auditory = vec![Modality::Auditory; config.sound_flick_hz.len()];
        let hz_pool = mix(&go_nogo, &config.sound_flick_hz, config.visual_ratio, config.sound_ratio);
        let modality_pool = mix(&visual, &auditory, config.visual_ratio, config.sound_ratio);

        TrialPlan::from_pools(&hz_pool, &modality_pool, config, rng)
    }

    /// Training composition: synchronous audiovisual, visual-only, and
    /// auditory-only pools mixed with equal weight.
    pub fn training<R: Rng>(config: &SessionConfig, rng: &mut R) -> TrialPlan {
        let sync = &config.led_flick_hz;
        let audio = &config.sound_flick_hz;
        let av = vec![Modality::Audiovisual; sync.len()];
        let visual = vec![Modality::Visual; sync.len()];
        let auditory = vec![Modality::Auditory; audio.len()];

        let hz_pool = mix(&mix(sync, sync, 1, 1), audio, 1, 1);
        let modality_pool = mix(&mix(&av, &visual, 1, 1), &auditory, 1, 1);

        TrialPlan::from_pools(&hz_pool, &modality_pool, config, rng)
    }

    fn from_pools<R: Rng>(
        hz_pool: &[f32],
        modality_pool: &[Modality],
        config: &SessionConfig,
        rng: &mut R,
    ) -> TrialPlan {
        debug_assert_eq!(hz_pool.len(), modality_pool.len());
        if hz_pool.is_empty() || config.number_of_trial == 0 {
            return TrialPlan::default();
        }
        let n = config.number_of_trial;
        let reps = n / hz_pool.len() + 1;
        let (hz_col, modality_col) = blockwise_shuffle_pair(
            &repeat(hz_pool, reps),
            &repeat(modality_pool, reps),
            hz_pool.len(),
            rng,
        );
        let itis = sample_itis(config.iti, config.iti_range, n, rng);

        let rows = hz_col
            .into_iter()
            .zip(modality_col)
            .zip(itis)
            .take(n)
            .enumerate()
            .map(|(index, ((hz, modality), iti))| TrialRow { index, modality, hz, iti })
            .collect();
        TrialPlan { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialRow> {
        self.rows.iter()
    }
}

/// The whole slice repeated `n` times.
pub fn repeat<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        out.extend_from_slice(items);
    }
    out
}

/// Ratio-weighted concatenation of two pools.
pub fn mix<T: Clone>(a: &[T], b: &[T], a_ratio: usize, b_ratio: usize) -> Vec<T> {
    let mut out = repeat(a, a_ratio);
    out.extend(repeat(b, b_ratio));
    out
}

/// Shuffles within consecutive blocks, leaving block boundaries fixed.
pub fn blockwise_shuffle<T: Clone, R: Rng>(items: &[T], block: usize, rng: &mut R) -> Vec<T> {
    let (shuffled, _) = blockwise_shuffle_pair(items, &vec![(); items.len()], block, rng);
    shuffled
}

/// Applies one fresh permutation per block to both columns, keeping the
/// rows of the two columns paired.
pub fn blockwise_shuffle_pair<A: Clone, B: Clone, R: Rng>(
    a: &[A],
    b: &[B],
    block: usize,
    rng: &mut R,
) -> (Vec<A>, Vec<B>) {
    debug_assert_eq!(a.len(), b.len());
    let block = block.max(1);
    let mut out_a = Vec::with_capacity(a.len());
    let mut out_b = Vec::with_capacity(b.len());
    let mut start = 0;
    while start < a.len() {
        let end = (start + block).min(a.len());
        let mut order: Vec<usize> = (start..end).collect();
        order.shuffle(rng);
        for i in order {
            out_a.push(a[i].clone());
            out_b.push(b[i].clone());
        }
        start = end;
    }
    (out_a, out_b)
}

/// Uniform samples from `center - range ..= center + range`.
pub fn sample_itis<R: Rng>(center: f64, range: f64, n: usize, rng: &mut R) -> Vec<f64> {
    (0..n)
        .map(|_| {
            if range > 0.0 {
                rng.random_range(center - range..center + range)
            } else {
                center
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_cycles_the_whole_slice() {
        assert_eq!(repeat(&[1, 2], 3), vec![1, 2, 1, 2, 1, 2]);
        assert_eq!(repeat::<i32>(&[], 5), Vec::<i32>::new());
    }

    #[test]
    fn mix_weights_each_pool_by_its_ratio() {
        assert_eq!(mix(&[1], &[2], 2, 1), vec![1, 1, 2]);
        assert_eq!(mix(&[1, 2], &[3], 1, 0), vec![1, 2]);
    }

    #[test]
    fn blockwise_shuffle_preserves_each_blocks_contents() {
        let mut rng = rand::rng();
        let items: Vec<i32> = (0..12).collect();
        let shuffled = blockwise_shuffle(&items, 4, &mut rng);
        assert_eq!(shuffled.len(), items.len());
        for block in 0..3 {
            let mut chunk: Vec<i32> = shuffled[block * 4..(block + 1) * 4].to_vec();
            chunk.sort();
            assert_eq!(chunk, items[block * 4..(block + 1) * 4]);
        }
    }

    #[test]
    fn paired_shuffle_applies_the_same_permutation_to_both_columns() {
        let mut rng = rand::rng();
        let a: Vec<i32> = (0..9).collect();
        let b: Vec<i32> = (0..9).map(|x| x * 10).collect();
        let (sa, sb) = blockwise_shuffle_pair(&a, &b, 3, &mut rng);
        for (x, y) in sa.iter().zip(&sb) {
            assert_eq!(*y, *x * 10);
        }
    }

    #[test]
    fn itis_stay_inside_the_configured_range() {
        let mut rng = rand::rng();
        for iti in sample_itis(3.0, 1.0, 100, &mut rng) {
            assert!((2.0..4.0).contains(&iti));
        }
        assert!(sample_itis(5.0, 0.0, 3, &mut rng).iter().all(|iti| *iti == 5.0));
    }

    #[test]
    fn discrimination_plan_has_the_requested_length() {
        let mut rng = rand::rng();
        let config = SessionConfig { number_of_trial: 40, ..SessionConfig::default() };
        let plan = TrialPlan::discrimination(&config, &mut rng);
        assert_eq!(plan.len(), 40);
        assert!(plan.iter().all(|row| row.hz > 0.0 && row.iti > 0.0));
    }

    #[test]
    fn discrimination_plan_pairs_visual_rows_with_led_frequencies() {
        let mut rng = rand::rng();
        let config = SessionConfig { number_of_trial: 60, ..SessionConfig::default() };
        let plan = TrialPlan::discrimination(&config, &mut rng);
        for row in plan.iter() {
            match row.modality {
                Modality::Visual => assert!(config.led_flick_hz.contains(&row.hz)),
                Modality::Auditory => assert!(config.sound_flick_hz.contains(&row.hz)),
                Modality::Audiovisual => panic!("discrimination plans have no sync trials"),
            }
        }
    }

    #[test]
    fn empty_pools_yield_an_empty_plan() {
        let mut rng = rand::rng();
        let config = SessionConfig {
            led_flick_hz: Vec::new(),
            sound_flick_hz: Vec::new(),
            ..SessionConfig::default()
        };
        assert!(TrialPlan::discrimination(&config, &mut rng).is_empty());
    }
}
