//! Repetition code
//!
//! The codeword holds `rep` consecutive copies of the information word, so `N = K * rep`. The
//! decoder sums the LLR values of all copies of each bit.

use crate::decoder::{SihoDecoding, SisoDecoding};
use crate::encoder::Encoding;
use crate::task::{Status, SUCCESS};
use crate::{Error, HardBit, SoftValue};

/// Checks the parameters of a repetition code.
fn check_params(num_info_bits: usize, rep: usize) -> Result<(), Error> {
    if num_info_bits == 0 || rep == 0 {
        return Err(Error::InvalidInput(format!(
            "Expected positive information length and repetition factor, found {num_info_bits} \
            and {rep}"
        )));
    }
    Ok(())
}

/// Repetition encoding
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct RepetitionEncoding {
    /// Number of information bits
    num_info_bits: usize,
    /// Number of copies
    rep: usize,
}

impl RepetitionEncoding {
    /// Returns repetition encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_info_bits` or `rep` is `0`.
    pub fn new(num_info_bits: usize, rep: usize) -> Result<Self, Error> {
        check_params(num_info_bits, rep)?;
        Ok(Self { num_info_bits, rep })
    }

    /// Returns the number of copies.
    #[must_use]
    pub fn get_rep(&self) -> usize {
        self.rep
    }
}

impl<B: HardBit> Encoding<B> for RepetitionEncoding {
    fn k(&self) -> usize {
        self.num_info_bits
    }

    fn n(&self) -> usize {
        self.num_info_bits * self.rep
    }

    fn encode(&mut self, u_k: &[B], x_n: &mut [B]) {
        for copy in x_n.chunks_exact_mut(self.num_info_bits) {
            copy.copy_from_slice(u_k);
        }
    }
}

/// Repetition decoder
///
/// As a SISO decoder, the first copy is the systematic part and the other copies the parity part.
#[derive(Clone, Debug)]
pub struct RepetitionDecoder {
    /// Number of information bits
    num_info_bits: usize,
    /// Number of copies
    rep: usize,
    /// Combined LLR values of the information bits
    llr_sum: Vec<f64>,
}

impl RepetitionDecoder {
    /// Returns repetition decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_info_bits` or `rep` is `0`.
    pub fn new(num_info_bits: usize, rep: usize) -> Result<Self, Error> {
        check_params(num_info_bits, rep)?;
        Ok(Self {
            num_info_bits,
            rep,
            llr_sum: vec![0.0; num_info_bits],
        })
    }

    /// Returns the number of copies.
    #[must_use]
    pub fn get_rep(&self) -> usize {
        self.rep
    }

    /// Writes the sums of the LLR values of the given copies.
    fn combine<R: SoftValue>(&mut self, copies: &[R]) {
        self.llr_sum.fill(0.0);
        for copy in copies.chunks_exact(self.num_info_bits) {
            for (sum, &y) in self.llr_sum.iter_mut().zip(copy) {
                *sum += y.as_f64();
            }
        }
    }
}

impl<B: HardBit, R: SoftValue> SihoDecoding<B, R> for RepetitionDecoder {
    fn load(&mut self, y_n: &[R], _: usize) {
        self.combine(y_n);
    }

    fn decode(&mut self, _: usize) -> Status {
        SUCCESS
    }

    fn store(&mut self, v_k: &mut [B], _: usize) {
        for (bit, &llr) in v_k.iter_mut().zip(&self.llr_sum) {
            *bit = B::from_bool(llr < 0.0);
        }
    }

    fn store_cw(&mut self, v_n: &mut [B], frame: usize) {
        for copy in v_n.chunks_exact_mut(self.num_info_bits) {
            SihoDecoding::<B, R>::store(self, copy, frame);
        }
    }

    fn reset(&mut self, _: usize) {
        self.llr_sum.fill(0.0);
    }
}

impl<B: HardBit, R: SoftValue> SisoDecoding<B, R> for RepetitionDecoder {
    /// Writes, for every copy, the sum of the LLR values of the other copies.
    fn decode_siso(&mut self, y_n1: &[R], y_n2: &mut [R], _: usize) -> Status {
        self.combine(y_n1);
        for (out_copy, in_copy) in y_n2
            .chunks_exact_mut(self.num_info_bits)
            .zip(y_n1.chunks_exact(self.num_info_bits))
        {
            for ((out, &y), &sum) in out_copy.iter_mut().zip(in_copy).zip(&self.llr_sum) {
                *out = R::from_f64(sum - y.as_f64());
            }
        }
        SUCCESS
    }

    fn decode_siso_alt(&mut self, _: &[R], par: &[R], ext: &mut [R], _: usize) -> Status {
        self.combine(par);
        for (e, &sum) in ext.iter_mut().zip(&self.llr_sum) {
            *e = R::from_f64(sum);
        }
        SUCCESS
    }
}
