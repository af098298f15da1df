//! Order in which targets are visited during a session.

use neurocal_core::{InputMode, TARGET_COUNT, TargetIndex};
use rand::Rng;
use rand::seq::SliceRandom;

/// Builds the full target sequence for a session.
///
/// Randomized modes append `rounds` independent permutations of all eight
/// targets. EEG visits each target `rounds` times in a row, in target order.
/// Zero rounds yields an empty sequence.
pub fn generate<R: Rng + ?Sized>(rounds: usize, mode: InputMode, rng: &mut R) -> Vec<TargetIndex> {
    let mut sequence = Vec::with_capacity(rounds * TARGET_COUNT);
    if mode.is_sequential() {
        for target in TargetIndex::all() {
            sequence.extend(std::iter::repeat_n(target, rounds));
        }
    } else {
        for _ in 0..rounds {
            let mut block: Vec<TargetIndex> = TargetIndex::all().collect();
            block.shuffle(rng);
            sequence.extend(block);
        }
    }
    sequence
}

/// One-based calibration block, and so the file, of a sequence position.
///
/// Randomized modes group every eight consecutive trials. EEG keeps one block
/// per target: its repetitions all carry the target's own number.
pub fn block_at(sequence: &[TargetIndex], position: usize, mode: InputMode) -> u32 {
    if mode.is_sequential() {
        sequence.get(position).map_or(1, |t| u32::from(t.get()))
    } else {
        1 + (position / TARGET_COUNT) as u32
    }
}

/// Whether the trial at `position` is the last one of its block.
pub fn closes_block(sequence: &[TargetIndex], position: usize, mode: InputMode) -> bool {
    if mode.is_sequential() {
        position < sequence.len() && sequence.get(position + 1) != sequence.get(position)
    } else {
        (position + 1) % TARGET_COUNT == 0
    }
}

/// How many times the target at `position` already appeared directly before it.
pub fn repetition_at(sequence: &[TargetIndex], position: usize) -> usize {
    let Some(target) = sequence.get(position) else {
        return 0;
    };
    sequence[..position]
        .iter()
        .rev()
        .take_while(|t| *t == target)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn numbers(seq: &[TargetIndex]) -> Vec<u8> {
        seq.iter().map(|t| t.get()).collect()
    }

    #[test]
    fn randomized_blocks_are_permutations() {
        let mut rng = StdRng::seed_from_u64(42);
        for rounds in 1..=6 {
            let seq = generate(rounds, InputMode::EyeTracker, &mut rng);
            assert_eq!(seq.len(), rounds * TARGET_COUNT);
            for block in seq.chunks(TARGET_COUNT) {
                let mut sorted = numbers(block);
                sorted.sort_unstable();
                assert_eq!(sorted, [1, 2, 3, 4, 5, 6, 7, 8]);
            }
        }
    }

    #[test]
    fn eeg_sequence_is_run_length_grouped() {
        let mut rng = StdRng::seed_from_u64(0);
        let seq = generate(2, InputMode::Eeg, &mut rng);
        assert_eq!(
            numbers(&seq),
            [1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8]
        );
        for rounds in 1..=5 {
            let seq = generate(rounds, InputMode::Eeg, &mut rng);
            let expected: Vec<u8> = (1..=8u8)
                .flat_map(|t| std::iter::repeat_n(t, rounds))
                .collect();
            assert_eq!(numbers(&seq), expected);
        }
    }

    #[test]
    fn zero_rounds_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate(0, InputMode::Pointer, &mut rng).is_empty());
        assert!(generate(0, InputMode::Eeg, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_sequence() {
        let a = generate(3, InputMode::Pointer, &mut StdRng::seed_from_u64(9));
        let b = generate(3, InputMode::Pointer, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn randomized_blocks_are_eight_trials() {
        let seq = generate(2, InputMode::Pointer, &mut StdRng::seed_from_u64(5));
        let blocks: Vec<u32> = (0..seq.len())
            .map(|i| block_at(&seq, i, InputMode::Pointer))
            .collect();
        assert_eq!(&blocks[..8], [1; 8]);
        assert_eq!(&blocks[8..], [2; 8]);
        let closing: Vec<usize> = (0..seq.len())
            .filter(|&i| closes_block(&seq, i, InputMode::Pointer))
            .collect();
        assert_eq!(closing, [7, 15]);
    }

    #[test]
    fn eeg_blocks_follow_the_target() {
        let seq = generate(3, InputMode::Eeg, &mut StdRng::seed_from_u64(0));
        let blocks: Vec<u32> = (0..seq.len())
            .map(|i| block_at(&seq, i, InputMode::Eeg))
            .collect();
        let expected: Vec<u32> = (1..=8u32).flat_map(|t| [t; 3]).collect();
        assert_eq!(blocks, expected);
        let closing: Vec<usize> = (0..seq.len())
            .filter(|&i| closes_block(&seq, i, InputMode::Eeg))
            .collect();
        assert_eq!(closing, [2, 5, 8, 11, 14, 17, 20, 23]);
        assert!(!closes_block(&seq, 99, InputMode::Eeg));
    }

    #[test]
    fn repetitions_count_back_to_run_start() {
        let seq = generate(3, InputMode::Eeg, &mut StdRng::seed_from_u64(0));
        assert_eq!(repetition_at(&seq, 0), 0);
        assert_eq!(repetition_at(&seq, 2), 2);
        assert_eq!(repetition_at(&seq, 3), 0);
        assert_eq!(repetition_at(&seq, 99), 0);
    }
}
