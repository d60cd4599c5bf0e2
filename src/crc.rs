//! Cyclic redundancy check (CRC) module
//!
//! A [`Crc`] module exposes four tasks around a [`CrcAlgorithm`]: `build` appends the check bits
//! to an information word of `K` bits, `extract` strips them, and `check`/`check_packed` verify a
//! codeword of `K + size` bits (one bit per element, or 8 bits per element respectively). A
//! failed verification is reported through the task status ([`FAILURE_STOP`] for the frame),
//! never as an error.
//!
//! [`CrcPolynomial`] is the generic polynomial CRC, constructible from a standard name.
//!
//! [`FAILURE_STOP`]: crate::FAILURE_STOP

use std::fmt::Debug;
use std::marker::PhantomData;
use std::str::FromStr;

use tracing::debug;

use crate::module::{Modular, Module, TaskKind};
use crate::task::{lane_bit, Frames, Status, Timers, Wave, SUCCESS};
use crate::utils::packed_bits;
use crate::{Error, Framing, HardBit};

/// Tasks of a CRC module
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash, Debug)]
pub enum CrcTask {
    /// Appends the check bits
    Build,
    /// Strips the check bits
    Extract,
    /// Verifies a codeword
    Check,
    /// Verifies a bit-packed codeword
    CheckPacked,
}

impl TaskKind for CrcTask {
    fn name(self) -> &'static str {
        match self {
            CrcTask::Build => "build",
            CrcTask::Extract => "extract",
            CrcTask::Check => "check",
            CrcTask::CheckPacked => "check_packed",
        }
    }
}

/// Sockets of the CRC tasks
pub mod sck {
    use super::CrcTask;
    use crate::module::socket_kinds;

    socket_kinds! {
        /// Sockets of the `build` task
        pub Build for CrcTask::Build: CrcTask {
            /// Information word (`K`)
            Uk1 = (0, "U_K1"),
            /// Information word followed by check bits (`K + size`)
            Uk2 = (1, "U_K2"),
        }
    }

    socket_kinds! {
        /// Sockets of the `extract` task
        pub Extract for CrcTask::Extract: CrcTask {
            /// Codeword (`K + size`)
            Vk1 = (0, "V_K1"),
            /// Information word (`K`)
            Vk2 = (1, "V_K2"),
        }
    }

    socket_kinds! {
        /// Sockets of the `check` task
        pub Check for CrcTask::Check: CrcTask {
            /// Codeword (`K + size`)
            Vk = (0, "V_K"),
        }
    }

    socket_kinds! {
        /// Sockets of the `check_packed` task
        pub CheckPacked for CrcTask::CheckPacked: CrcTask {
            /// Bit-packed codeword (`K + size` elements per frame, packed bits in the prefix)
            Vk = (0, "V_K"),
        }
    }
}

/// CRC algorithm acting on one frame
pub trait CrcAlgorithm<B: HardBit>: Debug + Send {
    /// Returns the number of check bits.
    fn size(&self) -> usize;

    /// Writes the information word `u_k1` followed by its check bits to `u_k2`.
    fn build(&mut self, u_k1: &[B], u_k2: &mut [B]);

    /// Writes the information word of the codeword `v_k1` to `v_k2`.
    fn extract(&mut self, v_k1: &[B], v_k2: &mut [B]);

    /// Returns `true` if the check bits of the codeword `v_k` match its information word.
    fn check(&mut self, v_k: &[B]) -> bool;

    /// Returns `true` if the check bits of a bit-packed codeword match its information word. The
    /// codeword has `v_k.len()` bits, packed 8 per element in the prefix of `v_k`.
    fn check_packed(&mut self, v_k: &[B]) -> bool;
}

/// Polynomial CRC (MSB first, zero initial register)
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CrcPolynomial {
    /// Polynomial, without the implicit leading term
    poly: u64,
    /// Number of check bits
    size: usize,
}

impl CrcPolynomial {
    /// Returns CRC for a given polynomial.
    ///
    /// # Parameters
    ///
    /// - `poly`: Generator polynomial without its leading `x^size` term (e.g., `0x1021` for
    ///   CRC-16-CCITT).
    ///
    /// - `size`: Number of check bits, at most `32`. A size of `0` means no CRC.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is greater than `32`, or if `poly` does not fit in `size` bits.
    pub fn new(poly: u64, size: usize) -> Result<Self, Error> {
        if size > 32 || poly >> size != 0 {
            return Err(Error::InvalidInput(format!(
                "CRC polynomial {poly:#x} does not fit in {size} bits (at most 32)"
            )));
        }
        Ok(Self { poly, size })
    }

    /// Returns the polynomial, without its leading term.
    #[must_use]
    pub fn poly(&self) -> u64 {
        self.poly
    }

    /// Returns the CRC register after shifting in the given bits.
    fn register(&self, bits: impl Iterator<Item = bool>) -> u64 {
        if self.size == 0 {
            bits.for_each(|_| ());
            return 0;
        }
        let mask = (1_u64 << self.size) - 1;
        bits.fold(0, |reg, bit| {
            let feedback = ((reg >> (self.size - 1)) & 1 == 1) ^ bit;
            let reg = (reg << 1) & mask;
            if feedback {
                reg ^ self.poly
            } else {
                reg
            }
        })
    }

    /// Returns the check bits, MSB first.
    fn check_bits(&self, register: u64) -> impl Iterator<Item = bool> + '_ {
        (0 .. self.size)
            .rev()
            .map(move |j| (register >> j) & 1 == 1)
    }

    /// Returns `true` if the check bits following the information bits match.
    fn matches(&self, mut bits: impl Iterator<Item = bool>, k: usize) -> bool {
        let register = self.register(bits.by_ref().take(k));
        self.check_bits(register).eq(bits)
    }
}

impl FromStr for CrcPolynomial {
    type Err = Error;

    /// Parses a standard CRC name such as `"16-CCITT"` or `"NO"`.
    fn from_str(name: &str) -> Result<Self, Error> {
        let (poly, size) = match name {
            "NO" => (0, 0),
            "3-GSM" => (0x3, 3),
            "4-ITU" => (0x3, 4),
            "5-ITU" => (0x15, 5),
            "6-ITU" => (0x03, 6),
            "8-DVB-S2" => (0xD5, 8),
            "8-ATM" => (0x07, 8),
            "16-CCITT" => (0x1021, 16),
            "16-IBM" => (0x8005, 16),
            "24-LTEA" => (0x0086_4CFB, 24),
            "24-LTEB" => (0x0080_0063, 24),
            "32-GZIP" => (0x04C1_1DB7, 32),
            "32-CASTAGNOLI" => (0x1EDC_6F41, 32),
            _ => {
                return Err(Error::InvalidInput(format!("Unknown CRC name '{name}'")));
            }
        };
        Self::new(poly, size)
    }
}

impl<B: HardBit> CrcAlgorithm<B> for CrcPolynomial {
    fn size(&self) -> usize {
        self.size
    }

    fn build(&mut self, u_k1: &[B], u_k2: &mut [B]) {
        let k = u_k1.len();
        u_k2[.. k].copy_from_slice(u_k1);
        let register = self.register(u_k1.iter().map(|b| b.is_one()));
        for (out, bit) in u_k2[k ..].iter_mut().zip(self.check_bits(register)) {
            *out = B::from_bool(bit);
        }
    }

    fn extract(&mut self, v_k1: &[B], v_k2: &mut [B]) {
        let k = v_k2.len();
        v_k2.copy_from_slice(&v_k1[.. k]);
    }

    fn check(&mut self, v_k: &[B]) -> bool {
        let k = v_k.len() - self.size;
        self.matches(v_k.iter().map(|b| b.is_one()), k)
    }

    fn check_packed(&mut self, v_k: &[B]) -> bool {
        let k = v_k.len() - self.size;
        self.matches(packed_bits(v_k, v_k.len()), k)
    }
}

/// State of a CRC module
#[derive(Debug)]
pub struct CrcState<B, A> {
    /// Number of information bits
    k: usize,
    /// CRC algorithm
    algo: A,
    /// Bit element type
    _bits: PhantomData<B>,
}

impl<B: HardBit, A: CrcAlgorithm<B>> CrcState<B, A> {
    /// Returns the codeword length.
    fn n(&self) -> usize {
        self.k + self.algo.size()
    }

    /// Runs one verification per lane and returns the failed lanes.
    fn check_lanes(&mut self, v_k: &[B], check: fn(&mut A, &[B]) -> bool) -> Status {
        v_k.chunks_exact(self.n())
            .enumerate()
            .filter(|(_, frame)| !check(&mut self.algo, frame))
            .fold(SUCCESS, |status, (lane, _)| status | lane_bit(lane))
    }
}

/// Codelet of the `build` task.
fn build_codelet<B: HardBit, A: CrcAlgorithm<B>>(
    state: &mut CrcState<B, A>,
    wave: &mut Wave<'_>,
    _: &mut Timers,
) -> Result<Status, Error> {
    let (k, n) = (state.k, state.n());
    let (u_k1, u_k2) = wave.split::<B, B>(sck::Build::Uk1, sck::Build::Uk2)?;
    for (info, codeword) in u_k1.chunks_exact(k).zip(u_k2.chunks_exact_mut(n)) {
        state.algo.build(info, codeword);
    }
    Ok(SUCCESS)
}

/// Codelet of the `extract` task.
fn extract_codelet<B: HardBit, A: CrcAlgorithm<B>>(
    state: &mut CrcState<B, A>,
    wave: &mut Wave<'_>,
    _: &mut Timers,
) -> Result<Status, Error> {
    let (k, n) = (state.k, state.n());
    let (v_k1, v_k2) = wave.split::<B, B>(sck::Extract::Vk1, sck::Extract::Vk2)?;
    for (codeword, info) in v_k1.chunks_exact(n).zip(v_k2.chunks_exact_mut(k)) {
        state.algo.extract(codeword, info);
    }
    Ok(SUCCESS)
}

/// Codelet of the `check` task.
fn check_codelet<B: HardBit, A: CrcAlgorithm<B>>(
    state: &mut CrcState<B, A>,
    wave: &mut Wave<'_>,
    _: &mut Timers,
) -> Result<Status, Error> {
    let v_k = wave.input::<B>(sck::Check::Vk)?;
    Ok(state.check_lanes(v_k, A::check))
}

/// Codelet of the `check_packed` task.
fn check_packed_codelet<B: HardBit, A: CrcAlgorithm<B>>(
    state: &mut CrcState<B, A>,
    wave: &mut Wave<'_>,
    _: &mut Timers,
) -> Result<Status, Error> {
    let v_k = wave.input::<B>(sck::CheckPacked::Vk)?;
    Ok(state.check_lanes(v_k, A::check_packed))
}

/// CRC module
#[derive(Debug)]
pub struct Crc<B: HardBit, A: CrcAlgorithm<B>> {
    /// Tasks and sockets
    module: Module<CrcTask, CrcState<B, A>>,
    /// Algorithm state
    state: CrcState<B, A>,
}

impl<B: HardBit, A: CrcAlgorithm<B>> Crc<B, A> {
    /// Returns CRC module.
    ///
    /// # Parameters
    ///
    /// - `k`: Number of information bits per frame.
    ///
    /// - `algo`: CRC algorithm.
    ///
    /// - `framing`: Frame batching parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecflow::{Crc, CrcPolynomial, Frames, Framing};
    ///
    /// let mut crc = Crc::new(4, "3-GSM".parse::<CrcPolynomial>()?, Framing::default())?;
    /// let mut codeword = [0_i32; 7];
    /// crc.build(&[1, 0, 1, 1], &mut codeword, Frames::All)?;
    /// assert!(crc.check(&codeword, Frames::All)?);
    /// codeword[2] ^= 1;
    /// assert!(!crc.check(&codeword, Frames::All)?);
    /// # Ok::<(), fecflow::Error>(())
    /// ```
    pub fn new(k: usize, algo: A, framing: Framing) -> Result<Self, Error> {
        if k == 0 {
            return Err(Error::InvalidInput(
                "Number of information bits must be positive".to_string(),
            ));
        }
        let size = algo.size();
        let mut module = Module::new("CRC", framing);
        module.create_task(CrcTask::Build)?;
        module.create_socket_in::<B, _>(sck::Build::Uk1, k)?;
        module.create_socket_out::<B, _>(sck::Build::Uk2, k + size)?;
        module.create_codelet(CrcTask::Build, build_codelet::<B, A>)?;
        module.create_task(CrcTask::Extract)?;
        module.create_socket_in::<B, _>(sck::Extract::Vk1, k + size)?;
        module.create_socket_out::<B, _>(sck::Extract::Vk2, k)?;
        module.create_codelet(CrcTask::Extract, extract_codelet::<B, A>)?;
        module.create_task(CrcTask::Check)?;
        module.create_socket_in::<B, _>(sck::Check::Vk, k + size)?;
        module.create_codelet(CrcTask::Check, check_codelet::<B, A>)?;
        module.create_task(CrcTask::CheckPacked)?;
        module.create_socket_in::<B, _>(sck::CheckPacked::Vk, k + size)?;
        module.create_codelet(CrcTask::CheckPacked, check_packed_codelet::<B, A>)?;
        debug!(k, size, n_frames = framing.get_n_frames(), "Created CRC module");
        Ok(Self {
            module,
            state: CrcState {
                k,
                algo,
                _bits: PhantomData,
            },
        })
    }

    /// Returns the number of information bits per frame.
    #[must_use]
    pub fn get_k(&self) -> usize {
        self.state.k
    }

    /// Returns the number of check bits per frame.
    #[must_use]
    pub fn get_size(&self) -> usize {
        self.state.algo.size()
    }

    /// Returns the CRC algorithm.
    #[must_use]
    pub fn algo(&self) -> &A {
        &self.state.algo
    }

    /// Appends the check bits to the information words of the selected frames.
    ///
    /// # Parameters
    ///
    /// - `u_k1`: Information words of all frames (`K * n_frames`).
    ///
    /// - `u_k2`: Buffer for the codewords of all frames (`(K + size) * n_frames`); only the
    ///   selected frames are written.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn build(&mut self, u_k1: &[B], u_k2: &mut [B], frames: Frames) -> Result<(), Error> {
        self.bind(sck::Build::Uk1, u_k1)?;
        self.exec(CrcTask::Build, frames, true)?;
        self.read(sck::Build::Uk2, u_k2, frames)
    }

    /// Strips the check bits from the codewords of the selected frames.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn extract(&mut self, v_k1: &[B], v_k2: &mut [B], frames: Frames) -> Result<(), Error> {
        self.bind(sck::Extract::Vk1, v_k1)?;
        self.exec(CrcTask::Extract, frames, true)?;
        self.read(sck::Extract::Vk2, v_k2, frames)
    }

    /// Returns `true` if the codewords of the selected frames all pass verification.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer length is wrong or the selected frame does not exist.
    pub fn check(&mut self, v_k: &[B], frames: Frames) -> Result<bool, Error> {
        self.bind(sck::Check::Vk, v_k)?;
        Ok(self.exec(CrcTask::Check, frames, true)? == SUCCESS)
    }

    /// Returns `true` if the bit-packed codewords of the selected frames all pass verification.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer length is wrong or the selected frame does not exist.
    pub fn check_packed(&mut self, v_k: &[B], frames: Frames) -> Result<bool, Error> {
        self.bind(sck::CheckPacked::Vk, v_k)?;
        Ok(self.exec(CrcTask::CheckPacked, frames, true)? == SUCCESS)
    }
}

impl<B: HardBit, A: CrcAlgorithm<B>> Modular for Crc<B, A> {
    type Task = CrcTask;
    type State = CrcState<B, A>;

    fn module(&self) -> &Module<CrcTask, CrcState<B, A>> {
        &self.module
    }

    fn module_mut(&mut self) -> &mut Module<CrcTask, CrcState<B, A>> {
        &mut self.module
    }

    fn exec(
        &mut self,
        task: CrcTask,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error> {
        self.module
            .exec(&mut self.state, task, frames, managed_memory)
    }
}
