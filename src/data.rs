use ndarray::Array1;
use ndarray_rand::rand::{Rng, seq::SliceRandom};

use crate::error::{Error, Result};

/// A single input vector paired with its correct class.
#[derive(Clone, Debug, PartialEq)]
pub struct Example {
    pub input: Array1<f64>,
    pub label: usize,
}

impl Example {
    pub fn new(input: Array1<f64>, label: usize) -> Example {
        Example { input, label }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// Source of labeled batches for training and evaluation.
pub trait DataReader {
    /// Every example currently in `split`, in its current order.
    fn split(&self, split: Split) -> &[Example];

    /// Shuffle `split` in place and rewind its batch cursor.
    fn shuffle<R: Rng + ?Sized>(&mut self, split: Split, rng: &mut R);

    /// Hand out the next `size` consecutive examples of `split`. The final batch of a
    /// pass may be shorter, and an exhausted split yields an empty slice until the next
    /// shuffle.
    fn get_batch(&mut self, size: usize, split: Split) -> Result<&[Example]>;
}

/// In-memory train/test split.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    train: Vec<Example>,
    test: Vec<Example>,
    train_cursor: usize,
    test_cursor: usize,
}

impl Dataset {
    pub fn new(train: Vec<Example>, test: Vec<Example>) -> Dataset {
        Dataset {
            train,
            test,
            train_cursor: 0,
            test_cursor: 0,
        }
    }

    fn parts_mut(&mut self, split: Split) -> (&mut Vec<Example>, &mut usize) {
        match split {
            Split::Train => (&mut self.train, &mut self.train_cursor),
            Split::Test => (&mut self.test, &mut self.test_cursor),
        }
    }
}

impl DataReader for Dataset {
    fn split(&self, split: Split) -> &[Example] {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }

    fn shuffle<R: Rng + ?Sized>(&mut self, split: Split, rng: &mut R) {
        let (examples, cursor) = self.parts_mut(split);
        examples.shuffle(rng);
        *cursor = 0;
    }

    fn get_batch(&mut self, size: usize, split: Split) -> Result<&[Example]> {
        if size == 0 {
            return Err(Error::InvalidConfiguration("batch size must be positive".to_string()));
        }
        let (examples, cursor) = self.parts_mut(split);
        let start = *cursor;
        let end = (start + size).min(examples.len());
        *cursor = end;
        Ok(&examples[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_rand::rand::{SeedableRng, rngs::StdRng};

    fn numbered(count: usize) -> Vec<Example> {
        (0..count)
            .map(|i| Example::new(array![i as f64], i % 2))
            .collect()
    }

    fn firsts(batch: &[Example]) -> Vec<f64> {
        batch.iter().map(|example| example.input[0]).collect()
    }

    #[test]
    fn batches_cover_split_with_short_tail() {
        let mut data = Dataset::new(numbered(7), Vec::new());

        let batch = data.get_batch(3, Split::Train).unwrap();
        assert_eq!(firsts(batch), [0.0, 1.0, 2.0]);
        let batch = data.get_batch(3, Split::Train).unwrap();
        assert_eq!(firsts(batch), [3.0, 4.0, 5.0]);
        let batch = data.get_batch(3, Split::Train).unwrap();
        assert_eq!(firsts(batch), [6.0]);
        assert!(data.get_batch(3, Split::Train).unwrap().is_empty());
    }

    #[test]
    fn shuffle_rewinds_and_keeps_examples() {
        let mut data = Dataset::new(numbered(20), numbered(2));
        let mut rng = StdRng::seed_from_u64(7);

        while !data.get_batch(6, Split::Train).unwrap().is_empty() {}
        data.shuffle(Split::Train, &mut rng);

        let mut seen = firsts(data.get_batch(20, Split::Train).unwrap());
        assert_eq!(seen.len(), 20);
        assert_ne!(seen, firsts(&numbered(20)));
        seen.sort_by(f64::total_cmp);
        assert_eq!(seen, firsts(&numbered(20)));

        // The test split is untouched.
        assert_eq!(firsts(data.split(Split::Test)), [0.0, 1.0]);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut data = Dataset::new(numbered(3), Vec::new());
        assert!(matches!(
            data.get_batch(0, Split::Train),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
