//! # Helpers for sources, channels and bit layouts
//!
//! Simulation chains draw information bits from [`random_bits`], pass them through
//! [`bpsk_awgn_channel`] to get channel LLR values, and compare decoded bits with the source
//! through [`error_count`]. [`bpsk_slicer`] makes hard decisions without decoding. [`pack_bits`]
//! and [`unpack_bits`] convert between one bit per element and 8 bits per element (bit `j` in
//! element `j / 8`, at position `j % 8`).
//!
//! # Examples
//!
//! ```
//! use fecflow::utils;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let bits: Vec<i32> = utils::random_bits(40, &mut rng);
//! let bits_llr: Vec<f32> = utils::bpsk_awgn_channel(&bits, 10.0, &mut rng);
//! let bits_hat: Vec<i32> = utils::bpsk_slicer(&bits_llr);
//! let err_count = utils::error_count(&bits_hat, &bits);
//! ```

use rand::Rng;
use rand_distr::StandardNormal;

use crate::{Error, HardBit, SoftValue};

/// Returns given number of random bits.
///
/// # Parameters
///
/// - `num_bits`: Number of random bits to be generated.
///
/// - `rng`: Random number generator to be used.
///
/// # Returns
///
/// - `bits`: Random bits.
pub fn random_bits<B: HardBit, G: Rng + ?Sized>(num_bits: usize, rng: &mut G) -> Vec<B> {
    (0 .. num_bits)
        .map(|_| B::from_bool(rng.random_bool(0.5)))
        .collect()
}

/// Returns LLR values at BPSK-AWGN channel output corresponding to given input bits.
///
/// # Parameters
///
/// - `bits`: Bits to be transmitted over the BPSK-AWGN channel.
///
/// - `es_over_n0_db`: Ratio (dB) of symbol energy to noise power spectral density at the BPSK-AWGN
///   channel output (if the BPSK symbols are `+1.0` and `-1.0`, then the noise variance is
///   `0.5 / 10f64.powf(0.1 * es_over_n0_db)`).
///
/// - `rng`: Random number generator to be used.
///
/// # Returns
///
/// - `bits_llr`: Log-likelihood-ratio (LLR) values at the BPSK-AWGN channel output corresponding
///   to the transmitted bits, with positive values indicating that bit `0` is more likely.
pub fn bpsk_awgn_channel<B: HardBit, R: SoftValue, G: Rng + ?Sized>(
    bits: &[B],
    es_over_n0_db: f64,
    rng: &mut G,
) -> Vec<R> {
    let es_over_n0 = 10f64.powf(0.1 * es_over_n0_db);
    let noise_std = (0.5 / es_over_n0).sqrt();
    bits.iter()
        .map(|&b| R::from_hard(b).as_f64())
        .map(|x| {
            R::from_f64(4.0 * es_over_n0 * (x + noise_std * rng.sample::<f64, _>(StandardNormal)))
        })
        .collect()
}

/// Returns BPSK slicer output.
///
/// # Parameters
///
/// - `syms`: Soft values to be sliced. Nonnegative values are mapped to bit `0`, and negative
///   values to bit `1`.
///
/// # Returns
///
/// - `bits_hat`: Bits obtained by slicing the given soft values.
#[must_use]
pub fn bpsk_slicer<B: HardBit, R: SoftValue>(syms: &[R]) -> Vec<B> {
    syms.iter()
        .map(|&x| B::from_bool(x < R::zero()))
        .collect()
}

/// Returns number of errors in a sequence with respect to a reference sequence.
///
/// # Parameters
///
/// - `seq`: Sequence in which errors must be counted.
///
/// - `ref_seq`: Reference sequence to which the given sequence is compared.
///
/// # Returns
///
/// - `err_count`: Number of positions in which the two sequences differ. If they are of different
///   lengths, then the longer sequence is effectively truncated to the length of the shorter one.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    ref_seq
        .iter()
        .zip(seq.iter())
        .filter(|&(x, y)| x != y)
        .count()
}

/// Returns the number of elements needed to hold a number of packed bits.
#[must_use]
pub fn packed_len(num_bits: usize) -> usize {
    num_bits.div_ceil(8)
}

/// Packs bits, 8 per element.
///
/// # Parameters
///
/// - `bits`: Bits to be packed (one per element).
///
/// - `packed`: Buffer for packed bits. The first `ceil(bits.len() / 8)` elements receive the
///   packed bits and any further elements are set to `0`.
///
/// # Errors
///
/// Returns an error if `packed` has fewer than `ceil(bits.len() / 8)` elements.
///
/// # Examples
///
/// ```
/// use fecflow::utils;
///
/// let mut packed = [0_u8; 2];
/// utils::pack_bits(&[1_u8, 0, 1, 1, 0, 0, 0, 0, 1], &mut packed)?;
/// assert_eq!(packed, [0b0000_1101, 0b0000_0001]);
/// # Ok::<(), fecflow::Error>(())
/// ```
pub fn pack_bits<B: HardBit>(bits: &[B], packed: &mut [B]) -> Result<(), Error> {
    let num_packed = packed_len(bits.len());
    if packed.len() < num_packed {
        return Err(Error::InvalidInput(format!(
            "Packing {} bits needs {} elements, found {}",
            bits.len(),
            num_packed,
            packed.len()
        )));
    }
    for (chunk, elmt) in bits.chunks(8).zip(packed.iter_mut()) {
        let byte = chunk
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_one())
            .fold(0_u8, |byte, (j, _)| byte | (1 << j));
        *elmt = B::from_byte(byte);
    }
    packed[num_packed ..].fill(B::zero());
    Ok(())
}

/// Unpacks bits, 8 per element.
///
/// # Parameters
///
/// - `packed`: Packed bits.
///
/// - `bits`: Buffer for unpacked bits (one per element); its length is the number of bits.
///
/// # Errors
///
/// Returns an error if `packed` has fewer than `ceil(bits.len() / 8)` elements.
pub fn unpack_bits<B: HardBit>(packed: &[B], bits: &mut [B]) -> Result<(), Error> {
    if packed.len() < packed_len(bits.len()) {
        return Err(Error::InvalidInput(format!(
            "Unpacking {} bits needs {} elements, found {}",
            bits.len(),
            packed_len(bits.len()),
            packed.len()
        )));
    }
    for (bit, value) in bits.iter_mut().zip(packed_bits(packed, usize::MAX)) {
        *bit = B::from_bool(value);
    }
    Ok(())
}

/// Returns an iterator over at most `num_bits` packed bits.
pub(crate) fn packed_bits<B: HardBit>(
    packed: &[B],
    num_bits: usize,
) -> impl Iterator<Item = bool> + '_ {
    packed
        .iter()
        .flat_map(|elmt| {
            let byte = elmt.low_byte();
            (0 .. 8).map(move |j| (byte >> j) & 1 == 1)
        })
        .take(num_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_random_bits() {
        let mut rng = StdRng::seed_from_u64(1);
        let num_bits = 0;
        assert!(random_bits::<u8, _>(num_bits, &mut rng).is_empty());
        let num_bits = 10000;
        let bits: Vec<i16> = random_bits(num_bits, &mut rng);
        let num_zeros = bits.iter().filter(|&&b| b == 0).count();
        let num_ones = bits.iter().filter(|&&b| b == 1).count();
        assert!(num_zeros > 9 * num_bits / 20 && num_ones > 9 * num_bits / 20);
    }

    #[test]
    fn test_bpsk_awgn_channel() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(bpsk_awgn_channel::<i32, f64, _>(&[], 0.0, &mut rng).is_empty());
        let es_over_n0_db = 20f64;
        let num_bits = 10000;
        let bits: Vec<i32> = random_bits(num_bits, &mut rng);
        let bits_llr: Vec<f64> = bpsk_awgn_channel(&bits, es_over_n0_db, &mut rng);
        let es_over_n0 = 10f64.powf(0.1 * es_over_n0_db);
        let noise_var_est = bits_llr
            .iter()
            .zip(bits)
            .map(|(y, b)| match b {
                0 => y - 4.0 * es_over_n0,
                _ => y + 4.0 * es_over_n0,
            })
            .map(|x| x * x)
            .sum::<f64>()
            / f64::from(u32::try_from(num_bits).unwrap());
        assert!(noise_var_est > 7.2 * es_over_n0 && noise_var_est < 8.8 * es_over_n0);
    }

    #[test]
    fn test_bpsk_slicer() {
        assert!(bpsk_slicer::<u8, f32>(&[]).is_empty());
        assert_eq!(bpsk_slicer::<u8, f32>(&[0.0, 0.01, -0.01]), [0, 0, 1]);
    }

    #[test]
    fn test_error_count() {
        assert_eq!(error_count(&[], &[1, 0]), 0);
        assert_eq!(error_count(&[1, 0], &[]), 0);
        // Longer `seq`
        let ref_seq = [1, 0, 0, 1, 1, 1, 0, 0];
        let seq = [1, 1, 0, 0, 1, 1, 0, 0, 0, 1];
        assert_eq!(error_count(&seq, &ref_seq), 2);
        // Shorter `seq`
        let ref_seq = [1, 0, 0, 1, 1, 1, 0, 0, 0, 1];
        let seq = [1, 1, 0, 0, 1, 1, 0, 0];
        assert_eq!(error_count(&seq, &ref_seq), 2);
    }

    #[test]
    fn test_pack_bits() {
        let bits = [1_i32, 1, 0, 0, 0, 0, 0, 1, 0, 1, 1];
        // Invalid input
        assert!(pack_bits(&bits, &mut [0; 1]).is_err());
        // Valid input
        let mut packed = [7; 4];
        pack_bits(&bits, &mut packed).unwrap();
        assert_eq!(packed, [0b1000_0011, 0b0000_0110, 0, 0]);
        let mut unpacked = [0; 11];
        unpack_bits(&packed, &mut unpacked).unwrap();
        assert_eq!(unpacked, bits);
        assert!(unpack_bits(&packed[.. 1], &mut unpacked).is_err());
    }

    #[test]
    fn test_packed_bits() {
        let packed = [0b0000_0101_u8, 0b0000_0001];
        let bits: Vec<bool> = packed_bits(&packed, 10).collect();
        assert_eq!(
            bits,
            [true, false, true, false, false, false, false, false, true, false]
        );
        assert_eq!(packed_bits(&packed, 3).count(), 3);
    }
}
