//! Recursive systematic convolutional (RSC) code
//!
//! The code is described by its generator polynomials, the first one being the feedback
//! polynomial. The encoder terminates the trellis in state `0` with `m` tail bits, where `m` is the
//! memory length of the code. A codeword is laid out stream by stream: the `K + m` systematic bits
//! (information bits followed by tail bits) come first, then the `K + m` bits of each parity
//! stream. A code with `n` polynomials thus has `N = (K + m) * n`, and a trellis tail length of
//! `t = 2 * m` in the sense of [`SisoDecoding::tail_length`].
//!
//! Decoding is by the BCJR algorithm, with one of three variants of the `max*` operation (see
//! [`DecodingAlgo`]).

use serde::{Deserialize, Serialize};

use crate::decoder::{SihoDecoding, SisoDecoding};
use crate::encoder::Encoding;
use crate::task::{Status, SUCCESS};
use crate::{Error, HardBit, SoftValue};

const INF: f64 = 1e100;

/// Enumeration of BCJR decoding algorithms
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub enum DecodingAlgo {
    /// Max-Log-MAP (lowest complexity, worst performance)
    MaxLogMAP,
    /// Linear-Log-MAP (see Valenti & Sun, 2001)
    LinearLogMAP,
    /// Log-MAP (highest complexity, best performance)
    #[default]
    LogMAP,
}

/// Trellis of an RSC code
#[derive(Clone, Eq, PartialEq, Debug)]
struct Trellis {
    /// Code polynomials
    code_polynomials: Vec<usize>,
    /// Memory length
    memory_len: usize,
    /// Number of states
    num_states: usize,
    /// Number of output bits per input bit
    num_output_bits: usize,
    /// Next state for each state and input bit
    next_state: Vec<[usize; 2]>,
    /// Output bits (bit `j` for output `j`) for each state and input bit
    output_bits: Vec<[usize; 2]>,
    /// Input bit that drives each state towards state `0`
    tail_input: Vec<usize>,
}

impl Trellis {
    /// Returns trellis corresponding to given code polynomials.
    ///
    /// # Notes
    ///
    /// Let `b_{n,0}`, `b_{n,1}`, ... , `b_{n,L-1}` be the `L`-bit binary representation of
    /// `code_polynomials[n]`, with `b_{n,0}` being the MSB. With `x_{k}` the input bit at time
    /// `k`, output bit `n` at time `k` is `y_{n,k} = sum_{i=0}^{L-1} b_{n,i} * s_{k-i}`, where
    /// `s_{k} = b_{0,0} * x_{k} + sum_{i=1}^{L-1} b_{0,i} * s_{k-i}`, so that `y_{0,k} = x_{k}`.
    /// The bits `s_{k-1}`, ... , `s_{k-L+1}` form the state at time `k`, with `s_{k-1}` as MSB.
    fn new(code_polynomials: &[usize]) -> Result<Self, Error> {
        let memory_len = constraint_length(code_polynomials)? - 1;
        let num_states = 1 << memory_len;
        let feedback_poly = code_polynomials[0];
        let mut next_state = Vec::with_capacity(num_states);
        let mut output_bits = Vec::with_capacity(num_states);
        for state in 0 .. num_states {
            let mut next = [0; 2];
            let mut out = [0; 2];
            for input in 0 .. 2 {
                let msb = parity((input << memory_len | state) & feedback_poly);
                let aug_state = msb << memory_len | state;
                next[input] = aug_state >> 1;
                out[input] = code_polynomials
                    .iter()
                    .enumerate()
                    .fold(0, |acc, (j, &poly)| acc | parity(aug_state & poly) << j);
            }
            next_state.push(next);
            output_bits.push(out);
        }
        Ok(Self {
            code_polynomials: code_polynomials.to_vec(),
            memory_len,
            num_states,
            num_output_bits: code_polynomials.len(),
            next_state,
            output_bits,
            tail_input: (0 .. num_states)
                .map(|state| parity(state & feedback_poly))
                .collect(),
        })
    }

    /// Writes the terminated codeword of `info_bits` to `code_bits`, stream by stream.
    fn encode<B: HardBit>(&self, info_bits: &[B], code_bits: &mut [B]) {
        let stream_len = info_bits.len() + self.memory_len;
        let mut state = 0;
        for time in 0 .. stream_len {
            let input = match info_bits.get(time) {
                Some(bit) => usize::from(bit.is_one()),
                None => self.tail_input[state],
            };
            let out = self.output_bits[state][input];
            for (j, stream) in code_bits.chunks_exact_mut(stream_len).enumerate() {
                stream[time] = B::from_bool((out >> j) & 1 == 1);
            }
            state = self.next_state[state][input];
        }
    }
}

/// Workspace of the BCJR algorithm
#[derive(Clone, Debug)]
struct Bcjr {
    /// `max*` variant
    decoding_algo: DecodingAlgo,
    /// Beta values of all states at all time instants
    beta_val: Vec<f64>,
    /// Alpha values of all states at current time instant
    alpha_val: Vec<f64>,
    /// Alpha values of all states at next time instant
    alpha_val_next: Vec<f64>,
}

impl Bcjr {
    /// Returns workspace for given trellis and stream length.
    fn new(trellis: &Trellis, stream_len: usize, decoding_algo: DecodingAlgo) -> Self {
        Self {
            decoding_algo,
            beta_val: vec![-INF; (stream_len + 1) * trellis.num_states],
            alpha_val: vec![-INF; trellis.num_states],
            alpha_val_next: vec![-INF; trellis.num_states],
        }
    }

    /// Writes extrinsic information of the `extrinsic_info.len()` information bits, given the LLR
    /// values of a codeword (stream by stream).
    fn run(&mut self, trellis: &Trellis, code_bits_llr: &[f64], extrinsic_info: &mut [f64]) {
        let stream_len = code_bits_llr.len() / trellis.num_output_bits;
        let num_states = trellis.num_states;
        let algo = self.decoding_algo;
        // Backward pass
        self.beta_val.fill(-INF);
        self.beta_val[stream_len * num_states] = 0.0;
        for time in (0 .. stream_len).rev() {
            let (beta, beta_next) = self.beta_val.split_at_mut((time + 1) * num_states);
            let beta = &mut beta[time * num_states ..];
            for state in 0 .. num_states {
                for input in 0 .. 2 {
                    let out = trellis.output_bits[state][input];
                    let (sys, par) = branch_metric(trellis, code_bits_llr, stream_len, time, out);
                    let next = trellis.next_state[state][input];
                    beta[state] = maxstar(beta[state], sys + par + beta_next[next], algo);
                }
            }
            recenter(beta);
        }
        // Forward pass
        self.alpha_val.fill(-INF);
        self.alpha_val[0] = 0.0;
        for (time, ext) in extrinsic_info.iter_mut().enumerate() {
            let beta_next = &self.beta_val[(time + 1) * num_states .. (time + 2) * num_states];
            self.alpha_val_next.fill(-INF);
            let mut metric = [-INF; 2];
            for state in 0 .. num_states {
                for input in 0 .. 2 {
                    let out = trellis.output_bits[state][input];
                    let (sys, par) = branch_metric(trellis, code_bits_llr, stream_len, time, out);
                    let next = trellis.next_state[state][input];
                    let alpha = self.alpha_val[state];
                    metric[input] = maxstar(metric[input], alpha + par + beta_next[next], algo);
                    self.alpha_val_next[next] =
                        maxstar(self.alpha_val_next[next], alpha + sys + par, algo);
                }
            }
            recenter(&mut self.alpha_val_next);
            std::mem::swap(&mut self.alpha_val, &mut self.alpha_val_next);
            *ext = metric[0] - metric[1];
        }
    }
}

/// RSC encoding with trellis termination
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RscEncoding {
    /// Number of information bits
    num_info_bits: usize,
    /// Trellis of the code
    trellis: Trellis,
}

impl RscEncoding {
    /// Returns RSC encoding.
    ///
    /// # Parameters
    ///
    /// - `num_info_bits`: Number of information bits per frame.
    ///
    /// - `code_polynomials`: Integer representations of the generator polynomials for the code.
    ///   Must have length `n` for a code of rate `1/n`. The first element is taken as the feedback
    ///   polynomial (this corresponds to the systematic bit), and all subsequent ones as the
    ///   feedforward polynomials (these correspond to the parity bits). For a code of constraint
    ///   length `L`, the feedback polynomial must be in the range `(2^(L-1), 2^L)`, and each
    ///   feedforward polynomial must be in the range `[1, 2^L)` and different from the feedback
    ///   polynomial.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_info_bits` is `0` or the code polynomials are invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecflow::{Encoding, RscEncoding};
    ///
    /// let mut code = RscEncoding::new(4, &[0o13, 0o15])?;
    /// assert_eq!(Encoding::<u8>::n(&code), 14);
    /// let mut code_bits = [0_u8; 14];
    /// code.encode(&[0, 1, 1, 0], &mut code_bits);
    /// # Ok::<(), fecflow::Error>(())
    /// ```
    pub fn new(num_info_bits: usize, code_polynomials: &[usize]) -> Result<Self, Error> {
        if num_info_bits == 0 {
            return Err(Error::InvalidInput(
                "Expected at least one information bit".to_string(),
            ));
        }
        Ok(Self {
            num_info_bits,
            trellis: Trellis::new(code_polynomials)?,
        })
    }

    /// Returns the memory length of the code.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.trellis.memory_len
    }

    /// Returns the code polynomials.
    #[must_use]
    pub fn code_polynomials(&self) -> &[usize] {
        &self.trellis.code_polynomials
    }
}

impl<B: HardBit> Encoding<B> for RscEncoding {
    fn k(&self) -> usize {
        self.num_info_bits
    }

    fn n(&self) -> usize {
        (self.num_info_bits + self.trellis.memory_len) * self.trellis.num_output_bits
    }

    fn encode(&mut self, u_k: &[B], x_n: &mut [B]) {
        self.trellis.encode(u_k, x_n);
    }
}

/// BCJR decoder of an RSC code
///
/// Decoding never fails; [`SihoDecoding::decode`] always returns [`SUCCESS`].
#[derive(Clone, Debug)]
pub struct RscDecoder {
    /// Number of information bits
    num_info_bits: usize,
    /// Trellis of the code
    trellis: Trellis,
    /// BCJR workspace
    bcjr: Bcjr,
    /// LLR values of the loaded codeword
    code_bits_llr: Vec<f64>,
    /// Extrinsic information of the information bits
    extrinsic_info: Vec<f64>,
    /// Posterior LLR values of the information bits
    llr_posterior: Vec<f64>,
}

impl RscDecoder {
    /// Returns BCJR decoder for the RSC code with given parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_info_bits` is `0` or the code polynomials are invalid (see
    /// [`RscEncoding::new`]).
    pub fn new(
        num_info_bits: usize,
        code_polynomials: &[usize],
        decoding_algo: DecodingAlgo,
    ) -> Result<Self, Error> {
        let encoding = RscEncoding::new(num_info_bits, code_polynomials)?;
        let stream_len = num_info_bits + encoding.memory_len();
        let num_code_bits = stream_len * encoding.trellis.num_output_bits;
        Ok(Self {
            num_info_bits,
            bcjr: Bcjr::new(&encoding.trellis, stream_len, decoding_algo),
            trellis: encoding.trellis,
            code_bits_llr: vec![0.0; num_code_bits],
            extrinsic_info: vec![0.0; num_info_bits],
            llr_posterior: vec![0.0; num_info_bits],
        })
    }

    /// Returns the number of information bits.
    #[must_use]
    pub fn get_k(&self) -> usize {
        self.num_info_bits
    }

    /// Returns the number of code bits.
    #[must_use]
    pub fn get_n(&self) -> usize {
        self.code_bits_llr.len()
    }

    /// Returns the decoding algorithm.
    #[must_use]
    pub fn get_decoding_algo(&self) -> DecodingAlgo {
        self.bcjr.decoding_algo
    }

    /// Returns the extrinsic information of the information bits of the last decoded frame.
    #[must_use]
    pub fn extrinsic_info(&self) -> &[f64] {
        &self.extrinsic_info
    }

    /// Returns the posterior LLR values of the information bits of the last decoded frame.
    #[must_use]
    pub fn llr_posterior(&self) -> &[f64] {
        &self.llr_posterior
    }

    /// Runs the BCJR algorithm on the loaded codeword.
    fn run_bcjr(&mut self) {
        self.bcjr
            .run(&self.trellis, &self.code_bits_llr, &mut self.extrinsic_info);
        for ((post, &ext), &sys) in self
            .llr_posterior
            .iter_mut()
            .zip(&self.extrinsic_info)
            .zip(&self.code_bits_llr)
        {
            *post = sys + ext;
        }
    }
}

impl<B: HardBit, R: SoftValue> SihoDecoding<B, R> for RscDecoder {
    fn load(&mut self, y_n: &[R], _: usize) {
        for (llr, &y) in self.code_bits_llr.iter_mut().zip(y_n) {
            *llr = y.as_f64();
        }
    }

    fn decode(&mut self, _: usize) -> Status {
        self.run_bcjr();
        SUCCESS
    }

    fn store(&mut self, v_k: &mut [B], _: usize) {
        for (bit, &llr) in v_k.iter_mut().zip(&self.llr_posterior) {
            *bit = B::from_bool(llr < 0.0);
        }
    }

    fn store_cw(&mut self, v_n: &mut [B], _: usize) {
        let info_bits: Vec<B> = self
            .llr_posterior
            .iter()
            .map(|&llr| B::from_bool(llr < 0.0))
            .collect();
        self.trellis.encode(&info_bits, v_n);
    }

    fn reset(&mut self, _: usize) {
        self.extrinsic_info.fill(0.0);
        self.llr_posterior.fill(0.0);
    }
}

impl<B: HardBit, R: SoftValue> SisoDecoding<B, R> for RscDecoder {
    fn tail_length(&self) -> usize {
        2 * self.trellis.memory_len
    }

    /// Writes the extrinsic information of the information bits to the first `K` values of
    /// `y_n2`, and `0` to the others.
    fn decode_siso(&mut self, y_n1: &[R], y_n2: &mut [R], frame: usize) -> Status {
        SihoDecoding::<B, R>::load(self, y_n1, frame);
        self.run_bcjr();
        y_n2.fill(R::zero());
        for (y, &ext) in y_n2.iter_mut().zip(&self.extrinsic_info) {
            *y = R::from_f64(ext);
        }
        SUCCESS
    }

    fn decode_siso_alt(&mut self, sys: &[R], par: &[R], ext: &mut [R], _: usize) -> Status {
        for (llr, &y) in self.code_bits_llr.iter_mut().zip(sys.iter().chain(par)) {
            *llr = y.as_f64();
        }
        self.run_bcjr();
        for (e, &val) in ext.iter_mut().zip(&self.extrinsic_info) {
            *e = R::from_f64(val);
        }
        SUCCESS
    }
}

/// Returns the systematic and parity components of the branch metric at a time instant.
fn branch_metric(
    trellis: &Trellis,
    code_bits_llr: &[f64],
    stream_len: usize,
    time: usize,
    out: usize,
) -> (f64, f64) {
    let sys = bit_metric_from_llr(out & 1, code_bits_llr[time]);
    let par = (1 .. trellis.num_output_bits)
        .map(|j| bit_metric_from_llr((out >> j) & 1, code_bits_llr[j * stream_len + time]))
        .sum();
    (sys, par)
}

/// Subtracts the largest value from all values.
fn recenter(vals: &mut [f64]) {
    let max = vals.iter().copied().fold(-INF, f64::max);
    vals.iter_mut().for_each(|x| *x -= max);
}

/// Returns constraint length corresponding to given code polynomials.
fn constraint_length(code_polynomials: &[usize]) -> Result<usize, Error> {
    let (&feedback_poly, feedforward_polys) = match code_polynomials {
        [first, rest @ ..] if !rest.is_empty() => (first, rest),
        _ => {
            return Err(Error::InvalidInput(format!(
                "Expected a feedback and at least one feedforward polynomial, found {} \
                polynomial(s)",
                code_polynomials.len()
            )))
        }
    };
    if feedback_poly.count_ones() < 2 {
        return Err(Error::InvalidInput(format!(
            "Feedback polynomial {feedback_poly:o} needs at least two nonzero coefficients"
        )));
    }
    let num_bits = usize::BITS - feedback_poly.leading_zeros();
    let constraint_len = usize::try_from(num_bits).unwrap_or(usize::MAX);
    let poly_limit = 1_usize.checked_shl(num_bits);
    let is_valid = |poly: usize| {
        poly != 0 && poly != feedback_poly && poly_limit.map_or(true, |limit| poly < limit)
    };
    if let Some(poly) = feedforward_polys.iter().find(|&&poly| !is_valid(poly)) {
        return Err(Error::InvalidInput(format!(
            "Feedforward polynomial {poly:o} must be nonzero, differ from the feedback \
            polynomial and have degree below {constraint_len}"
        )));
    }
    Ok(constraint_len)
}

/// Returns XOR of bits in the binary representation of given integer.
fn parity(num: usize) -> usize {
    usize::from(num.count_ones() % 2 == 1)
}

/// Returns metric for given bit corresponding to given LLR value.
fn bit_metric_from_llr(bit: usize, llr_val: f64) -> f64 {
    if bit == 0 {
        llr_val / 2.0
    } else {
        -llr_val / 2.0
    }
}

/// Returns the maxstar of two numbers for given decoding algorithm.
fn maxstar(x: f64, y: f64, decoding_algo: DecodingAlgo) -> f64 {
    x.max(y)
        + match decoding_algo {
            DecodingAlgo::MaxLogMAP => 0.0,
            DecodingAlgo::LinearLogMAP => linear_log_map_correction_term((x - y).abs()),
            DecodingAlgo::LogMAP => log_map_correction_term((x - y).abs()),
        }
}

/// Returns the correction term for Linear-Log-MAP decoding algorithm (Valenti & Sun, 2001).
fn linear_log_map_correction_term(abs_diff: f64) -> f64 {
    let thresh = 2.506_816_400_220_01;
    if abs_diff > thresh {
        0.0
    } else {
        let slope = -0.249_041_818_917_1;
        slope * (abs_diff - thresh)
    }
}

/// Returns the correction term for Log-MAP decoding algorithm.
fn log_map_correction_term(abs_diff: f64) -> f64 {
    (-abs_diff).exp().ln_1p()
}


#[cfg(test)]
mod tests_of_functions {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn test_constraint_length() {
        assert!(constraint_length(&[]).is_err());
        assert!(constraint_length(&[0o13]).is_err());
        assert!(constraint_length(&[0o0, 0o15]).is_err());
        assert!(constraint_length(&[0o20, 0o15]).is_err());
        assert!(constraint_length(&[0o13, 0o0]).is_err());
        assert!(constraint_length(&[0o13, 0o20]).is_err());
        assert!(constraint_length(&[0o13, 0o13]).is_err());
        assert_eq!(constraint_length(&[0o11, 0o15]).unwrap(), 4);
        assert_eq!(constraint_length(&[0o7, 0o5]).unwrap(), 3);
    }

    #[test]
    fn test_parity() {
        let parities: Vec<usize> = (0x0 .. 0x10).map(parity).collect();
        assert_eq!(parities, [0, 1, 1, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0, 1, 1, 0]);
    }

    #[test]
    fn test_bit_metric_from_llr() {
        assert_float_eq!(bit_metric_from_llr(0, 2.0), 1.0, abs <= 1e-8);
        assert_float_eq!(bit_metric_from_llr(1, 2.0), -1.0, abs <= 1e-8);
    }

    #[test]
    fn test_recenter() {
        let mut vals = [-INF, 2.0, -1.0];
        recenter(&mut vals);
        assert_float_eq!(vals[1 ..].to_vec(), vec![0.0, -3.0], abs_all <= 1e-8);
        assert!(vals[0] < -1e99);
    }

    #[test]
    fn test_maxstar() {
        assert_float_eq!(maxstar(1.2, 1.3, DecodingAlgo::MaxLogMAP), 1.3, abs <= 1e-8);
        assert_float_eq!(maxstar(-1.2, -1.3, DecodingAlgo::MaxLogMAP), -1.2, abs <= 1e-8);
        assert_float_eq!(maxstar(1.3, -1.3, DecodingAlgo::LinearLogMAP), 1.3, abs <= 1e-8);
        assert_float_eq!(
            maxstar(-1.2, 1.2, DecodingAlgo::LinearLogMAP),
            1.226_601_750_600_968_3,
            abs <= 1e-8
        );
        assert_float_eq!(
            maxstar(1.2, 1.3, DecodingAlgo::LogMAP),
            1.944_396_660_073_571,
            abs <= 1e-8
        );
        assert_float_eq!(
            maxstar(-INF, 0.5, DecodingAlgo::LogMAP),
            0.5,
            abs <= 1e-8
        );
    }

    #[test]
    fn test_log_map_correction_term() {
        assert_float_eq!(
            log_map_correction_term(2.6),
            0.071_644_691_967_669_72,
            abs <= 1e-8
        );
        assert_float_eq!(linear_log_map_correction_term(2.6), 0.0, abs <= 1e-8);
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests_of_rsc_decoder {
    use super::*;
    use crate::decoder::{DecoderSiho, DecoderSiso};
    use crate::task::Frames;
    use crate::{utils, Framing};
    use float_eq::assert_float_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn noiseless_llr(code_bits: &[u8], magnitude: f64) -> Vec<f64> {
        code_bits
            .iter()
            .map(|&b| if b == 0 { magnitude } else { -magnitude })
            .collect()
    }

    #[test]
    fn test_new() {
        assert!(RscDecoder::new(0, &[0o13, 0o15], DecodingAlgo::LogMAP).is_err());
        assert!(RscDecoder::new(8, &[0o10, 0o15], DecodingAlgo::LogMAP).is_err());
        let decoder = RscDecoder::new(8, &[0o13, 0o15], DecodingAlgo::MaxLogMAP).unwrap();
        assert_eq!(decoder.get_k(), 8);
        assert_eq!(decoder.get_n(), 22);
        assert_eq!(SisoDecoding::<u8, f64>::tail_length(&decoder), 6);
        assert_eq!(decoder.get_decoding_algo(), DecodingAlgo::MaxLogMAP);
    }

    #[test]
    fn test_decode_corrects_weak_error() {
        let info_bits = [1_u8, 0, 0, 1, 1, 0, 1, 0];
        let mut code = RscEncoding::new(8, &[0o13, 0o15, 0o17]).unwrap();
        let mut code_bits = [0_u8; 33];
        code.encode(&info_bits, &mut code_bits);
        let mut llr = noiseless_llr(&code_bits, 4.0);
        // Weakly wrong systematic value
        llr[2] = -1.0;
        for algo in [
            DecodingAlgo::MaxLogMAP,
            DecodingAlgo::LinearLogMAP,
            DecodingAlgo::LogMAP,
        ] {
            let mut decoder = RscDecoder::new(8, &[0o13, 0o15, 0o17], algo).unwrap();
            SihoDecoding::<u8, f64>::load(&mut decoder, &llr, 0);
            assert_eq!(SihoDecoding::<u8, f64>::decode(&mut decoder, 0), SUCCESS);
            let mut v_k = [0_u8; 8];
            SihoDecoding::<u8, f64>::store(&mut decoder, &mut v_k, 0);
            assert_eq!(v_k, info_bits);
            let mut v_n = [0_u8; 33];
            SihoDecoding::<u8, f64>::store_cw(&mut decoder, &mut v_n, 0);
            assert_eq!(v_n, code_bits);
            // Posterior is systematic plus extrinsic
            let expected: Vec<f64> = llr[.. 8]
                .iter()
                .zip(decoder.extrinsic_info())
                .map(|(s, e)| s + e)
                .collect();
            assert_float_eq!(decoder.llr_posterior().to_vec(), expected, abs_all <= 1e-8);
            assert!(decoder.extrinsic_info()[2] > 1.0);
        }
    }

    #[test]
    fn test_decode_siso_alt_matches_decode_siso() {
        let info_bits = [0_u8, 1, 1, 0, 1];
        let mut code = RscEncoding::new(5, &[0o7, 0o5]).unwrap();
        let mut code_bits = [0_u8; 14];
        code.encode(&info_bits, &mut code_bits);
        let llr = noiseless_llr(&code_bits, 1.5);
        let decoder = RscDecoder::new(5, &[0o7, 0o5], DecodingAlgo::LogMAP).unwrap();
        let mut siso = DecoderSiso::<u8, f64, _>::new(5, 14, decoder, Framing::default()).unwrap();
        assert_eq!(siso.tail_length(), 4);
        let mut y_n2 = [0.0; 14];
        siso.decode_siso(&llr, &mut y_n2, Frames::All).unwrap();
        assert!(y_n2[5 ..].iter().all(|&y| y == 0.0));
        let mut ext = [0.0; 5];
        siso.decode_siso_alt(&llr[.. 7], &llr[7 ..], &mut ext, Frames::All)
            .unwrap();
        assert_float_eq!(ext.to_vec(), y_n2[.. 5].to_vec(), abs_all <= 1e-8);
        for (&e, &b) in ext.iter().zip(&info_bits) {
            assert_eq!(e < 0.0, b == 1);
        }
    }

    #[test]
    fn test_awgn_batch() {
        let mut rng = StdRng::seed_from_u64(11);
        let (k, n_frames) = (40, 6);
        let polys = [0o13, 0o15];
        let mut encoding = RscEncoding::new(k, &polys).unwrap();
        let n = Encoding::<i32>::n(&encoding);
        let info_bits: Vec<i32> = utils::random_bits(k * n_frames, &mut rng);
        let mut code_bits = vec![0; n * n_frames];
        for (u, x) in info_bits.chunks_exact(k).zip(code_bits.chunks_exact_mut(n)) {
            encoding.encode(u, x);
        }
        let llr: Vec<f32> = utils::bpsk_awgn_channel(&code_bits, 8.0, &mut rng);
        let decoder = RscDecoder::new(k, &polys, DecodingAlgo::LinearLogMAP).unwrap();
        let mut siho =
            DecoderSiho::<i32, f32, _>::new(k, n, decoder, Framing::new(n_frames, 4).unwrap())
                .unwrap();
        let mut decoded = vec![0; k * n_frames];
        assert_eq!(siho.decode_siho(&llr, &mut decoded, Frames::All).unwrap(), SUCCESS);
        assert_eq!(utils::error_count(&decoded, &info_bits), 0);
    }
}
