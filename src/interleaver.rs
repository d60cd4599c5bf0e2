//! Interleaver for frames of a given size
//!
//! An [`Interleaver`] is a lookup table: output element `i` of a frame is input element `lut[i]`.
//! Buffers holding several consecutive frames are interleaved frame by frame.
//!
//! The [`Interleaver::column_row`] table is obtained by writing the indices `0 .. size` row by row
//! into a virtual table of `n_cols` columns and `ceil(size / n_cols)` rows, then reading them
//! column by column from the corner given by a [`ReadOrder`]. Positions of the last row beyond
//! `size` are skipped.

use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Corner from which the column-row table is read
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub enum ReadOrder {
    /// Columns left to right, rows top to bottom
    #[default]
    TopLeft,
    /// Columns right to left, rows top to bottom
    TopRight,
    /// Columns left to right, rows bottom to top
    BottomLeft,
    /// Columns right to left, rows bottom to top
    BottomRight,
}

impl FromStr for ReadOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "TOP_LEFT" => Ok(ReadOrder::TopLeft),
            "TOP_RIGHT" => Ok(ReadOrder::TopRight),
            "BOTTOM_LEFT" => Ok(ReadOrder::BottomLeft),
            "BOTTOM_RIGHT" => Ok(ReadOrder::BottomRight),
            _ => Err(Error::InvalidInput(format!(
                "Unknown read order '{s}' (expected TOP_LEFT, TOP_RIGHT, BOTTOM_LEFT or \
                BOTTOM_RIGHT)"
            ))),
        }
    }
}

/// Interleaver for frames of a given size
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Interleaver {
    /// Input index for each output index
    lut: Vec<usize>,
    /// Output index for each input index
    lut_inv: Vec<usize>,
}

impl Interleaver {
    /// Returns interleaver corresponding to a given permutation.
    ///
    /// # Parameters
    ///
    /// - `perm`: Permutation of integers in `[0, L)` for some positive integer `L`. If the
    ///   interleaver input is the sequence `x[0], x[1], ..., x[L-1]`, then its output is the
    ///   sequence `x[perm[0]], x[perm[1]], ..., x[perm[L-1]]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `perm` is not a permutation of the integers in `[0, L)` for some
    /// positive integer `L`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecflow::Interleaver;
    ///
    /// let interleaver = Interleaver::new(&[0, 3, 2, 5, 4, 7, 6, 1])?;
    /// let mut output = ['_'; 8];
    /// interleaver.interleave(&['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'], &mut output)?;
    /// assert_eq!(output, ['a', 'd', 'c', 'f', 'e', 'h', 'g', 'b']);
    /// # Ok::<(), fecflow::Error>(())
    /// ```
    pub fn new(perm: &[usize]) -> Result<Self, Error> {
        if perm.is_empty() {
            return Err(Error::InvalidInput(
                "Permutation defining interleaver cannot be empty".to_string(),
            ));
        }
        let mut sorted = perm.to_vec();
        sorted.sort_unstable();
        if !sorted.into_iter().eq(0 .. perm.len()) {
            return Err(Error::InvalidInput(format!(
                "Expected permutation of all integers in the range [0, {}), found {perm:?}",
                perm.len(),
            )));
        }
        Ok(Self::from_valid_perm(perm.to_vec()))
    }

    /// Returns random interleaver for frames of a given size.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is `0`.
    pub fn random<G: Rng + ?Sized>(size: usize, rng: &mut G) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::InvalidInput(
                "Size of interleaver must be a positive integer".to_string(),
            ));
        }
        let mut perm: Vec<usize> = (0 .. size).collect();
        perm.shuffle(rng);
        Ok(Self::from_valid_perm(perm))
    }

    /// Returns column-row interleaver.
    ///
    /// # Parameters
    ///
    /// - `size`: Frame size.
    ///
    /// - `n_cols`: Number of columns of the virtual table.
    ///
    /// - `read_order`: Corner from which the table is read.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` or `n_cols` is `0`, or if `n_cols` is greater than `size`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecflow::{Interleaver, ReadOrder};
    ///
    /// // 0 1 2
    /// // 3 4 5
    /// let interleaver = Interleaver::column_row(6, 3, ReadOrder::TopRight)?;
    /// assert_eq!(interleaver.get_lut(), [2, 5, 1, 4, 0, 3]);
    /// # Ok::<(), fecflow::Error>(())
    /// ```
    pub fn column_row(size: usize, n_cols: usize, read_order: ReadOrder) -> Result<Self, Error> {
        if size == 0 || n_cols == 0 || n_cols > size {
            return Err(Error::InvalidInput(format!(
                "Expected 0 < n_cols <= size, found size = {size} and n_cols = {n_cols}"
            )));
        }
        let n_rows = size.div_ceil(n_cols);
        let cols: Vec<usize> = match read_order {
            ReadOrder::TopLeft | ReadOrder::BottomLeft => (0 .. n_cols).collect(),
            ReadOrder::TopRight | ReadOrder::BottomRight => (0 .. n_cols).rev().collect(),
        };
        let rows: Vec<usize> = match read_order {
            ReadOrder::TopLeft | ReadOrder::TopRight => (0 .. n_rows).collect(),
            ReadOrder::BottomLeft | ReadOrder::BottomRight => (0 .. n_rows).rev().collect(),
        };
        let perm = cols
            .iter()
            .flat_map(|&col| rows.iter().map(move |&row| row * n_cols + col))
            .filter(|&index| index < size)
            .collect();
        Ok(Self::from_valid_perm(perm))
    }

    /// Returns the frame size.
    #[must_use]
    pub fn get_size(&self) -> usize {
        self.lut.len()
    }

    /// Returns the input index for each output index.
    #[must_use]
    pub fn get_lut(&self) -> &[usize] {
        &self.lut
    }

    /// Returns the output index for each input index.
    #[must_use]
    pub fn get_lut_inv(&self) -> &[usize] {
        &self.lut_inv
    }

    /// Interleaves every frame of a buffer.
    ///
    /// # Parameters
    ///
    /// - `input`: Interleaver input (one or more frames).
    ///
    /// - `output`: Buffer for interleaver output, of the same length as `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if `input.len()` is not a positive multiple of the frame size, or if
    /// `output.len()` differs from `input.len()`.
    pub fn interleave<T: Copy>(&self, input: &[T], output: &mut [T]) -> Result<(), Error> {
        self.check_lengths(input.len(), output.len())?;
        Self::apply(&self.lut, input, output);
        Ok(())
    }

    /// Deinterleaves every frame of a buffer.
    ///
    /// # Parameters
    ///
    /// - `output`: Interleaver output (one or more frames).
    ///
    /// - `input`: Buffer for interleaver input, of the same length as `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if `output.len()` is not a positive multiple of the frame size, or if
    /// `input.len()` differs from `output.len()`.
    pub fn deinterleave<T: Copy>(&self, output: &[T], input: &mut [T]) -> Result<(), Error> {
        self.check_lengths(output.len(), input.len())?;
        Self::apply(&self.lut_inv, output, input);
        Ok(())
    }

    /// Writes `dst[i] = src[lut[i]]` for every frame.
    fn apply<T: Copy>(lut: &[usize], src: &[T], dst: &mut [T]) {
        let frames = src.chunks_exact(lut.len()).zip(dst.chunks_exact_mut(lut.len()));
        for (src_frame, dst_frame) in frames {
            for (d, &index) in dst_frame.iter_mut().zip(lut) {
                *d = src_frame[index];
            }
        }
    }

    /// Checks the buffer lengths of an interleaving or deinterleaving.
    fn check_lengths(&self, src_len: usize, dst_len: usize) -> Result<(), Error> {
        let size = self.get_size();
        if src_len == 0 || src_len % size != 0 || dst_len != src_len {
            return Err(Error::InvalidInput(format!(
                "Expected buffers of equal length and a positive multiple of {size}, found \
                {src_len} and {dst_len}"
            )));
        }
        Ok(())
    }

    /// Returns interleaver corresponding to a valid permutation.
    fn from_valid_perm(lut: Vec<usize>) -> Self {
        let mut lut_inv = vec![0; lut.len()];
        for (out_index, &in_index) in lut.iter().enumerate() {
            lut_inv[in_index] = out_index;
        }
        Self { lut, lut_inv }
    }
}

#[cfg(test)]
mod tests_of_interleaver {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_new() {
        // Invalid input
        assert!(Interleaver::new(&[]).is_err());
        assert!(Interleaver::new(&[1, 2, 3, 4]).is_err());
        assert!(Interleaver::new(&[0, 0, 1, 2]).is_err());
        // Valid input
        let interleaver = Interleaver::new(&[0, 3, 2, 5, 4, 7, 6, 1]).unwrap();
        assert_eq!(interleaver.get_size(), 8);
        assert_eq!(interleaver.get_lut(), [0, 3, 2, 5, 4, 7, 6, 1]);
        assert_eq!(interleaver.get_lut_inv(), [0, 7, 2, 1, 4, 3, 6, 5]);
    }

    #[test]
    fn test_random() {
        let mut rng = StdRng::seed_from_u64(3);
        // Invalid input
        assert!(Interleaver::random(0, &mut rng).is_err());
        // Valid input
        let interleaver = Interleaver::random(16, &mut rng).unwrap();
        let mut lut = interleaver.get_lut().to_vec();
        lut.sort_unstable();
        assert!(lut.into_iter().eq(0 .. 16));
    }

    #[test]
    fn test_column_row() {
        // Invalid input
        assert!(Interleaver::column_row(0, 1, ReadOrder::TopLeft).is_err());
        assert!(Interleaver::column_row(6, 0, ReadOrder::TopLeft).is_err());
        assert!(Interleaver::column_row(6, 7, ReadOrder::TopLeft).is_err());
        // Full table
        // 0 1 2
        // 3 4 5
        let luts = [
            (ReadOrder::TopLeft, [0, 3, 1, 4, 2, 5]),
            (ReadOrder::TopRight, [2, 5, 1, 4, 0, 3]),
            (ReadOrder::BottomLeft, [3, 0, 4, 1, 5, 2]),
            (ReadOrder::BottomRight, [5, 2, 4, 1, 3, 0]),
        ];
        for (read_order, lut) in luts {
            let interleaver = Interleaver::column_row(6, 3, read_order).unwrap();
            assert_eq!(interleaver.get_lut(), lut);
        }
        // Incomplete last row
        // 0 1
        // 2 3
        // 4 .
        let interleaver = Interleaver::column_row(5, 2, ReadOrder::TopLeft).unwrap();
        assert_eq!(interleaver.get_lut(), [0, 2, 4, 1, 3]);
        let interleaver = Interleaver::column_row(5, 2, ReadOrder::BottomRight).unwrap();
        assert_eq!(interleaver.get_lut(), [3, 1, 4, 2, 0]);
        // Single column or single row
        let interleaver = Interleaver::column_row(4, 1, ReadOrder::TopLeft).unwrap();
        assert_eq!(interleaver.get_lut(), [0, 1, 2, 3]);
        let interleaver = Interleaver::column_row(4, 4, ReadOrder::TopRight).unwrap();
        assert_eq!(interleaver.get_lut(), [3, 2, 1, 0]);
    }

    #[test]
    fn test_read_order_from_str() {
        assert_eq!("TOP_LEFT".parse::<ReadOrder>().unwrap(), ReadOrder::TopLeft);
        assert_eq!("TOP_RIGHT".parse::<ReadOrder>().unwrap(), ReadOrder::TopRight);
        assert_eq!("BOTTOM_LEFT".parse::<ReadOrder>().unwrap(), ReadOrder::BottomLeft);
        assert_eq!("BOTTOM_RIGHT".parse::<ReadOrder>().unwrap(), ReadOrder::BottomRight);
        assert!("top_left".parse::<ReadOrder>().is_err());
    }

    #[test]
    fn test_interleave() {
        let interleaver = Interleaver::new(&[0, 3, 2, 5, 4, 7, 6, 1]).unwrap();
        let mut output = ['_'; 8];
        // Invalid input
        let input = ['a', 'b', 'c', 'd', 'e', 'f', 'g'];
        assert!(interleaver.interleave(&input, &mut output[.. 7]).is_err());
        assert!(interleaver.interleave::<char>(&[], &mut []).is_err());
        // Valid input
        let input = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
        interleaver.interleave(&input, &mut output).unwrap();
        assert_eq!(output, ['a', 'd', 'c', 'f', 'e', 'h', 'g', 'b']);
        let mut input_hat = ['_'; 8];
        interleaver.deinterleave(&output, &mut input_hat).unwrap();
        assert_eq!(input_hat, input);
        assert!(interleaver.deinterleave(&output, &mut input_hat[.. 4]).is_err());
    }

    #[test]
    fn test_interleave_frames() {
        let interleaver = Interleaver::column_row(4, 2, ReadOrder::TopLeft).unwrap();
        let mut output = [0; 8];
        interleaver
            .interleave(&[10, 11, 12, 13, 20, 21, 22, 23], &mut output)
            .unwrap();
        assert_eq!(output, [10, 12, 11, 13, 20, 22, 21, 23]);
    }

    proptest! {
        #[test]
        fn deinterleave_inverts_interleave(
            size in 1_usize .. 40,
            n_cols_seed in 0_usize .. 1000,
            n_frames in 1_usize .. 4,
            read_order in prop_oneof![
                Just(ReadOrder::TopLeft),
                Just(ReadOrder::TopRight),
                Just(ReadOrder::BottomLeft),
                Just(ReadOrder::BottomRight),
            ],
        ) {
            let n_cols = 1 + n_cols_seed % size;
            let interleaver = Interleaver::column_row(size, n_cols, read_order).unwrap();
            let input: Vec<usize> = (0 .. size * n_frames).collect();
            let mut output = vec![0; input.len()];
            interleaver.interleave(&input, &mut output).unwrap();
            let mut sorted = output.clone();
            sorted.sort_unstable();
            prop_assert_eq!(&sorted, &input);
            let mut input_hat = vec![0; input.len()];
            interleaver.deinterleave(&output, &mut input_hat).unwrap();
            prop_assert_eq!(input_hat, input);
        }
    }
}
