//! Splitting of byte slices in consecutive sub-slices of varying sizes,
//! used to hand each chunk to its own worker.
use std::iter::FusedIterator;

/// Iterator over consecutive sub-slices, the size of each one
/// being given by the `sizes` iterator.
///
/// Iteration stops when `sizes` is exhausted or when the next size
/// does not fit in what remains of the slice.
pub struct ChunksIrregular<'a, I> {
    remainder: &'a [u8],
    sizes: I,
}

impl<'a, I: Iterator<Item = usize>> ChunksIrregular<'a, I> {
    pub fn new(slc: &'a [u8], sizes: I) -> Self {
        Self {
            remainder: slc,
            sizes,
        }
    }
}

impl<'a, I: Iterator<Item = usize>> Iterator for ChunksIrregular<'a, I> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let size = self.sizes.next()?;
        if size > self.remainder.len() {
            return None;
        }
        let (head, tail) = self.remainder.split_at(size);
        self.remainder = tail;
        Some(head)
    }
}

impl<'a, I: FusedIterator<Item = usize>> FusedIterator for ChunksIrregular<'a, I> {}

/// Mutable version of [`ChunksIrregular`]
pub struct ChunksIrregularMut<'a, I> {
    remainder: &'a mut [u8],
    sizes: I,
}

impl<'a, I: Iterator<Item = usize>> ChunksIrregularMut<'a, I> {
    pub fn new(slc: &'a mut [u8], sizes: I) -> Self {
        Self {
            remainder: slc,
            sizes,
        }
    }
}

impl<'a, I: Iterator<Item = usize>> Iterator for ChunksIrregularMut<'a, I> {
    type Item = &'a mut [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let size = self.sizes.next()?;
        if size > self.remainder.len() {
            return None;
        }
        let tmp = std::mem::take(&mut self.remainder);
        let (head, tail) = tmp.split_at_mut(size);
        self.remainder = tail;
        Some(head)
    }
}

impl<'a, I: FusedIterator<Item = usize>> FusedIterator for ChunksIrregularMut<'a, I> {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_irregular_chunks() {
        let data = [0u8, 1, 2, 3, 4, 5, 6];
        let chunks: Vec<&[u8]> = ChunksIrregular::new(&data, vec![2, 0, 4, 3].into_iter()).collect();
        assert_eq!(chunks, vec![&[0u8, 1][..], &[][..], &[2, 3, 4, 5][..]]);
    }

    #[test]
    fn test_irregular_chunks_mut() {
        let mut data = [0u8; 6];
        for (i, chunk) in ChunksIrregularMut::new(&mut data, [1usize, 2, 3].iter().copied()).enumerate() {
            chunk.iter_mut().for_each(|b| *b = i as u8);
        }
        assert_eq!(data, [0, 1, 1, 2, 2, 2]);
    }
}
