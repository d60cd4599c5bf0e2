//! Decoder modules
//!
//! A [`DecoderSiho`] wraps a [`SihoDecoding`] algorithm and exposes four tasks that decode one
//! wave at a time: `decode_siho`/`decode_siho_cw` take soft input, while `decode_hiho`/
//! `decode_hiho_cw` take hard input, which is first mapped to soft values (`0 -> +1`, `1 -> -1`)
//! in an internal buffer of one wave. Each wave goes to [`SihoDecoding::decode_siho_wave`], which
//! by default takes every frame of the wave through the phases load, decode and store, followed
//! by a reset of the algorithm state if auto-reset is on. The phases are timed under the names
//! [`LOAD`], [`DECODE`] and [`STORE`], and the whole wave under [`TOTAL`]. The hard-to-soft
//! mapping is added to the load time.
//!
//! Only the frames of the batch reach the algorithm: the zero padding of a staged wave (trailing
//! partial wave, or single frame selected inside a wave) is never loaded, decoded or reset.
//!
//! A [`DecoderSiso`] wraps a [`SisoDecoding`] algorithm and adds the soft-output tasks
//! `decode_siso` and `decode_siso_alt`.
//!
//! Decoding failures (e.g., non-convergence) are reported through the task status, one bit per
//! frame of the wave, never as errors.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::Range;
use std::time::Instant;

use itertools::izip;
use tracing::debug;

use crate::module::{Modular, Module, TaskKind};
use crate::task::{lane_bit, Frames, Status, Timers, Wave, SUCCESS};
use crate::{Error, Framing, HardBit, SoftValue};

/// Name of the timer of the load phase
pub const LOAD: &str = "load";

/// Name of the timer of the decode phase
pub const DECODE: &str = "decode";

/// Name of the timer of the store phase
pub const STORE: &str = "store";

/// Name of the timer of a whole wave
pub const TOTAL: &str = "total";

/// Tasks of a decoder module
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash, Debug)]
pub enum DecoderTask {
    /// Hard input, information bits output
    DecodeHiho,
    /// Hard input, codeword output
    DecodeHihoCw,
    /// Soft input, information bits output
    DecodeSiho,
    /// Soft input, codeword output
    DecodeSihoCw,
    /// Soft input, soft output
    DecodeSiso,
    /// Systematic and parity soft input, extrinsic output
    DecodeSisoAlt,
}

impl TaskKind for DecoderTask {
    fn name(self) -> &'static str {
        match self {
            DecoderTask::DecodeHiho => "decode_hiho",
            DecoderTask::DecodeHihoCw => "decode_hiho_cw",
            DecoderTask::DecodeSiho => "decode_siho",
            DecoderTask::DecodeSihoCw => "decode_siho_cw",
            DecoderTask::DecodeSiso => "decode_siso",
            DecoderTask::DecodeSisoAlt => "decode_siso_alt",
        }
    }
}

/// Sockets of the decoder tasks
pub mod sck {
    use super::DecoderTask;
    use crate::module::socket_kinds;

    socket_kinds! {
        /// Sockets of the `decode_hiho` task
        pub DecodeHiho for DecoderTask::DecodeHiho: DecoderTask {
            /// Hard codeword (`N`)
            Yn = (0, "Y_N"),
            /// Decoded information bits (`K`)
            Vk = (1, "V_K"),
        }
    }

    socket_kinds! {
        /// Sockets of the `decode_hiho_cw` task
        pub DecodeHihoCw for DecoderTask::DecodeHihoCw: DecoderTask {
            /// Hard codeword (`N`)
            Yn = (0, "Y_N"),
            /// Decoded codeword (`N`)
            Vn = (1, "V_N"),
        }
    }

    socket_kinds! {
        /// Sockets of the `decode_siho` task
        pub DecodeSiho for DecoderTask::DecodeSiho: DecoderTask {
            /// Soft codeword (`N`)
            Yn = (0, "Y_N"),
            /// Decoded information bits (`K`)
            Vk = (1, "V_K"),
        }
    }

    socket_kinds! {
        /// Sockets of the `decode_siho_cw` task
        pub DecodeSihoCw for DecoderTask::DecodeSihoCw: DecoderTask {
            /// Soft codeword (`N`)
            Yn = (0, "Y_N"),
            /// Decoded codeword (`N`)
            Vn = (1, "V_N"),
        }
    }

    socket_kinds! {
        /// Sockets of the `decode_siso` task
        pub DecodeSiso for DecoderTask::DecodeSiso: DecoderTask {
            /// Soft codeword (`N`)
            Yn1 = (0, "Y_N1"),
            /// Soft output (`N`)
            Yn2 = (1, "Y_N2"),
        }
    }

    socket_kinds! {
        /// Sockets of the `decode_siso_alt` task
        pub DecodeSisoAlt for DecoderTask::DecodeSisoAlt: DecoderTask {
            /// Systematic soft input (`K + t/2`)
            Sys = (0, "sys"),
            /// Parity soft input (`N - K - t/2`)
            Par = (1, "par"),
            /// Extrinsic output (`K`)
            Ext = (2, "ext"),
        }
    }
}

/// Frames of one wave as handed to the wave-level decoding hooks
///
/// The wave buffers always hold `n_lanes` frames. Only the lanes in `valid` hold frames of the
/// batch; the others are zero padding of a staged wave and must not be decoded.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct WaveLanes {
    /// Index in the batch of the frame in lane `0`
    pub first_frame: usize,
    /// Number of lanes of the wave buffers
    pub n_lanes: usize,
    /// Lanes holding frames of the batch
    pub valid: Range<usize>,
    /// Whether the algorithm is reset after every decoded frame
    pub auto_reset: bool,
}

impl WaveLanes {
    /// Returns the lanes of a wave being executed.
    fn of(wave: &Wave<'_>, auto_reset: bool) -> Self {
        Self {
            first_frame: wave.first_frame(),
            n_lanes: wave.n_lanes(),
            valid: wave.valid_lanes(),
            auto_reset,
        }
    }

    /// Returns `true` if the lane holds a frame of the batch.
    #[must_use]
    pub fn is_valid(&self, lane: usize) -> bool {
        self.valid.contains(&lane)
    }

    /// Returns the index in the batch of the frame in a lane.
    #[must_use]
    pub fn frame(&self, lane: usize) -> usize {
        self.first_frame + lane
    }
}

/// Soft-input hard-output decoding algorithm
///
/// The per-frame hooks get `frame`, the index of the frame in the batch (always below the number
/// of frames), so that algorithms may keep per-frame state. The decoder tasks call
/// [`SihoDecoding::decode_siho_wave`] once per wave; its default drives the per-frame hooks, and
/// algorithms decoding all lanes of a wave together override it.
pub trait SihoDecoding<B: HardBit, R: SoftValue>: Debug + Send {
    /// Loads the soft codeword (`N` values) of a frame.
    fn load(&mut self, y_n: &[R], frame: usize);

    /// Decodes the loaded frame, and returns [`SUCCESS`] or a non-zero status on failure.
    fn decode(&mut self, frame: usize) -> Status;

    /// Writes the decoded information bits (`K`) of the frame.
    fn store(&mut self, v_k: &mut [B], frame: usize);

    /// Writes the decoded codeword (`N`) of the frame.
    fn store_cw(&mut self, v_n: &mut [B], frame: usize);

    /// Resets the algorithm state for the frame.
    fn reset(&mut self, frame: usize);

    /// Decodes the valid lanes of one wave, and returns the wave status, with bit `l` set if lane
    /// `l` failed.
    ///
    /// # Parameters
    ///
    /// - `y_n`: Soft codewords of the wave (`N` values per lane).
    ///
    /// - `out`: Buffer for the decoded information bits (`K` per lane), or for the decoded
    ///   codewords (`N` per lane) if `codeword` is `true`.
    ///
    /// - `lanes`: Lanes of the wave.
    ///
    /// - `timers`: Timers of the executed task, with [`LOAD`], [`DECODE`] and [`STORE`] registered.
    ///
    /// The default goes through load, decode and store for every valid lane in turn, timing each
    /// phase, and resets the frame afterwards if `lanes.auto_reset` is set.
    fn decode_siho_wave(
        &mut self,
        y_n: &[R],
        out: &mut [B],
        codeword: bool,
        lanes: &WaveLanes,
        timers: &mut Timers,
    ) -> Status {
        let n = y_n.len() / lanes.n_lanes;
        let width = out.len() / lanes.n_lanes;
        let mut status = SUCCESS;
        for (lane, y, v) in izip!(0 .., y_n.chunks_exact(n), out.chunks_exact_mut(width)) {
            if !lanes.is_valid(lane) {
                continue;
            }
            let frame = lanes.frame(lane);
            timers.time(LOAD, || self.load(y, frame));
            if timers.time(DECODE, || self.decode(frame)) != SUCCESS {
                status |= lane_bit(lane);
            }
            timers.time(STORE, || {
                if codeword {
                    self.store_cw(v, frame);
                } else {
                    self.store(v, frame);
                }
            });
            if lanes.auto_reset {
                self.reset(frame);
            }
        }
        status
    }
}

/// Soft-input soft-output decoding algorithm
///
/// As for [`SihoDecoding`], the decoder tasks call the wave-level hooks, whose defaults call the
/// per-frame hooks on every valid lane and reset the frame afterwards if `lanes.auto_reset` is set.
pub trait SisoDecoding<B: HardBit, R: SoftValue>: SihoDecoding<B, R> {
    /// Returns the number of trellis tail symbols of the code.
    fn tail_length(&self) -> usize {
        0
    }

    /// Writes soft output values (`N`) for a soft codeword. The default output is the input.
    fn decode_siso(&mut self, y_n1: &[R], y_n2: &mut [R], frame: usize) -> Status {
        let _ = frame;
        y_n2.copy_from_slice(y_n1);
        SUCCESS
    }

    /// Writes extrinsic values (`K`) for the information bits given systematic
    /// (`K + tail_length() / 2`) and parity (`N - K - tail_length() / 2`) soft values.
    fn decode_siso_alt(&mut self, sys: &[R], par: &[R], ext: &mut [R], frame: usize) -> Status;

    /// Writes the soft output values of the valid lanes of one wave, and returns the wave status.
    fn decode_siso_wave(&mut self, y_n1: &[R], y_n2: &mut [R], lanes: &WaveLanes) -> Status {
        let n = y_n1.len() / lanes.n_lanes;
        let mut status = SUCCESS;
        for (lane, y1, y2) in izip!(0 .., y_n1.chunks_exact(n), y_n2.chunks_exact_mut(n)) {
            if !lanes.is_valid(lane) {
                continue;
            }
            let frame = lanes.frame(lane);
            if self.decode_siso(y1, y2, frame) != SUCCESS {
                status |= lane_bit(lane);
            }
            if lanes.auto_reset {
                self.reset(frame);
            }
        }
        status
    }

    /// Writes the extrinsic values of the valid lanes of one wave, and returns the wave status.
    fn decode_siso_alt_wave(
        &mut self,
        sys: &[R],
        par: &[R],
        ext: &mut [R],
        lanes: &WaveLanes,
    ) -> Status {
        let sys_len = sys.len() / lanes.n_lanes;
        let par_len = par.len() / lanes.n_lanes;
        let k = ext.len() / lanes.n_lanes;
        let mut status = SUCCESS;
        for (lane, s, p, e) in izip!(
            0 ..,
            sys.chunks_exact(sys_len),
            par.chunks_exact(par_len),
            ext.chunks_exact_mut(k)
        ) {
            if !lanes.is_valid(lane) {
                continue;
            }
            let frame = lanes.frame(lane);
            if self.decode_siso_alt(s, p, e, frame) != SUCCESS {
                status |= lane_bit(lane);
            }
            if lanes.auto_reset {
                self.reset(frame);
            }
        }
        status
    }
}

impl<B: HardBit, R: SoftValue> SihoDecoding<B, R> for Box<dyn SihoDecoding<B, R>> {
    fn load(&mut self, y_n: &[R], frame: usize) {
        (**self).load(y_n, frame);
    }

    fn decode(&mut self, frame: usize) -> Status {
        (**self).decode(frame)
    }

    fn store(&mut self, v_k: &mut [B], frame: usize) {
        (**self).store(v_k, frame);
    }

    fn store_cw(&mut self, v_n: &mut [B], frame: usize) {
        (**self).store_cw(v_n, frame);
    }

    fn reset(&mut self, frame: usize) {
        (**self).reset(frame);
    }

    fn decode_siho_wave(
        &mut self,
        y_n: &[R],
        out: &mut [B],
        codeword: bool,
        lanes: &WaveLanes,
        timers: &mut Timers,
    ) -> Status {
        (**self).decode_siho_wave(y_n, out, codeword, lanes, timers)
    }
}

/// State of a decoder module
#[derive(Debug)]
pub struct DecoderState<B, R, D> {
    /// Number of information bits
    k: usize,
    /// Number of code bits
    n: usize,
    /// Whether the algorithm is reset after every decoded frame
    auto_reset: bool,
    /// Soft values of one wave, for hard input
    y_n: Vec<R>,
    /// Decoding algorithm
    algo: D,
    /// Bit element type
    _bits: PhantomData<B>,
}

impl<B: HardBit, R: SoftValue, D: SihoDecoding<B, R>> DecoderState<B, R, D> {
    /// Maps hard values of one wave to soft values, and returns the soft buffer.
    fn soft_from_hard(&mut self, y_n: &[B]) -> Vec<R> {
        let mut soft = std::mem::take(&mut self.y_n);
        soft.clear();
        soft.extend(y_n.iter().map(|&b| R::from_hard(b)));
        soft
    }
}

/// Codelet of the `decode_hiho` and `decode_hiho_cw` tasks.
///
/// The hard-to-soft mapping counts towards the load phase and the whole wave.
fn decode_hiho_codelet<B: HardBit, R: SoftValue, D: SihoDecoding<B, R>, const CW: bool>(
    state: &mut DecoderState<B, R, D>,
    wave: &mut Wave<'_>,
    timers: &mut Timers,
) -> Result<Status, Error> {
    let start = Instant::now();
    let lanes = WaveLanes::of(wave, state.auto_reset);
    let (y_n, v) = if CW {
        wave.split::<B, B>(sck::DecodeHihoCw::Yn, sck::DecodeHihoCw::Vn)?
    } else {
        wave.split::<B, B>(sck::DecodeHiho::Yn, sck::DecodeHiho::Vk)?
    };
    let soft = state.soft_from_hard(y_n);
    let mapping = start.elapsed();
    let status = state.algo.decode_siho_wave(&soft, v, CW, &lanes, timers);
    state.y_n = soft;
    timers.add(LOAD, mapping);
    timers.record(TOTAL, start.elapsed());
    Ok(status)
}

/// Codelet of the `decode_siho` and `decode_siho_cw` tasks.
fn decode_siho_codelet<B: HardBit, R: SoftValue, D: SihoDecoding<B, R>, const CW: bool>(
    state: &mut DecoderState<B, R, D>,
    wave: &mut Wave<'_>,
    timers: &mut Timers,
) -> Result<Status, Error> {
    let start = Instant::now();
    let lanes = WaveLanes::of(wave, state.auto_reset);
    let (y_n, v) = if CW {
        wave.split::<R, B>(sck::DecodeSihoCw::Yn, sck::DecodeSihoCw::Vn)?
    } else {
        wave.split::<R, B>(sck::DecodeSiho::Yn, sck::DecodeSiho::Vk)?
    };
    let status = state.algo.decode_siho_wave(y_n, v, CW, &lanes, timers);
    timers.record(TOTAL, start.elapsed());
    Ok(status)
}

/// Codelet of the `decode_siso` task.
fn decode_siso_codelet<B: HardBit, R: SoftValue, D: SisoDecoding<B, R>>(
    state: &mut DecoderState<B, R, D>,
    wave: &mut Wave<'_>,
    _: &mut Timers,
) -> Result<Status, Error> {
    let lanes = WaveLanes::of(wave, state.auto_reset);
    let (y_n1, y_n2) = wave.split::<R, R>(sck::DecodeSiso::Yn1, sck::DecodeSiso::Yn2)?;
    Ok(state.algo.decode_siso_wave(y_n1, y_n2, &lanes))
}

/// Codelet of the `decode_siso_alt` task.
fn decode_siso_alt_codelet<B: HardBit, R: SoftValue, D: SisoDecoding<B, R>>(
    state: &mut DecoderState<B, R, D>,
    wave: &mut Wave<'_>,
    _: &mut Timers,
) -> Result<Status, Error> {
    let lanes = WaveLanes::of(wave, state.auto_reset);
    let (sys, par, ext) = wave.split3::<R, R, R>(
        sck::DecodeSisoAlt::Sys,
        sck::DecodeSisoAlt::Par,
        sck::DecodeSisoAlt::Ext,
    )?;
    Ok(state.algo.decode_siso_alt_wave(sys, par, ext, &lanes))
}

/// Returns the lengths of the systematic and parity parts of a codeword with a trellis tail.
fn sys_par_lengths(k: usize, n: usize, tail_length: usize) -> (usize, usize) {
    let sys_len = k + tail_length / 2;
    (sys_len, n.saturating_sub(sys_len))
}

/// Soft-input hard-output decoder module
#[derive(Debug)]
pub struct DecoderSiho<B: HardBit, R: SoftValue, D: SihoDecoding<B, R>> {
    /// Tasks and sockets
    module: Module<DecoderTask, DecoderState<B, R, D>>,
    /// Decoding state
    state: DecoderState<B, R, D>,
}

impl<B: HardBit, R: SoftValue, D: SihoDecoding<B, R>> DecoderSiho<B, R, D> {
    /// Returns soft-input hard-output decoder module.
    ///
    /// # Parameters
    ///
    /// - `k`: Number of information bits per frame.
    ///
    /// - `n`: Number of code bits per frame.
    ///
    /// - `algo`: Decoding algorithm.
    ///
    /// - `framing`: Frame batching parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is `0`, `n` is `0`, or `k` is greater than `n`.
    pub fn new(k: usize, n: usize, algo: D, framing: Framing) -> Result<Self, Error> {
        if k == 0 || n == 0 || k > n {
            return Err(Error::InvalidInput(format!(
                "Expected 0 < K <= N, found K = {k} and N = {n}"
            )));
        }
        let mut module = Module::new("Decoder", framing);
        module.create_task(DecoderTask::DecodeHiho)?;
        module.create_socket_in::<B, _>(sck::DecodeHiho::Yn, n)?;
        module.create_socket_out::<B, _>(sck::DecodeHiho::Vk, k)?;
        module.create_codelet(
            DecoderTask::DecodeHiho,
            decode_hiho_codelet::<B, R, D, false>,
        )?;
        module.create_task(DecoderTask::DecodeHihoCw)?;
        module.create_socket_in::<B, _>(sck::DecodeHihoCw::Yn, n)?;
        module.create_socket_out::<B, _>(sck::DecodeHihoCw::Vn, n)?;
        module.create_codelet(
            DecoderTask::DecodeHihoCw,
            decode_hiho_codelet::<B, R, D, true>,
        )?;
        module.create_task(DecoderTask::DecodeSiho)?;
        module.create_socket_in::<R, _>(sck::DecodeSiho::Yn, n)?;
        module.create_socket_out::<B, _>(sck::DecodeSiho::Vk, k)?;
        module.create_codelet(
            DecoderTask::DecodeSiho,
            decode_siho_codelet::<B, R, D, false>,
        )?;
        module.create_task(DecoderTask::DecodeSihoCw)?;
        module.create_socket_in::<R, _>(sck::DecodeSihoCw::Yn, n)?;
        module.create_socket_out::<B, _>(sck::DecodeSihoCw::Vn, n)?;
        module.create_codelet(
            DecoderTask::DecodeSihoCw,
            decode_siho_codelet::<B, R, D, true>,
        )?;
        for task in [
            DecoderTask::DecodeHiho,
            DecoderTask::DecodeHihoCw,
            DecoderTask::DecodeSiho,
            DecoderTask::DecodeSihoCw,
        ] {
            for timer in [LOAD, DECODE, STORE, TOTAL] {
                module.register_timer(task, timer)?;
            }
        }
        debug!(k, n, n_frames = framing.get_n_frames(), "Created decoder module");
        Ok(Self {
            module,
            state: DecoderState {
                k,
                n,
                auto_reset: true,
                y_n: vec![R::zero(); n * framing.get_n_frames_per_wave()],
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

    /// Returns the number of code bits per frame.
    #[must_use]
    pub fn get_n(&self) -> usize {
        self.state.n
    }

    /// Returns `true` if the algorithm is reset after every decoded frame.
    #[must_use]
    pub fn is_auto_reset(&self) -> bool {
        self.state.auto_reset
    }

    /// Sets whether the algorithm is reset after every decoded frame.
    pub fn set_auto_reset(&mut self, auto_reset: bool) {
        self.state.auto_reset = auto_reset;
    }

    /// Returns the decoding algorithm.
    #[must_use]
    pub fn algo(&self) -> &D {
        &self.state.algo
    }

    /// Returns the mutable decoding algorithm.
    pub fn algo_mut(&mut self) -> &mut D {
        &mut self.state.algo
    }

    /// Resets the algorithm state for every frame of the batch.
    pub fn reset(&mut self) {
        for frame in 0 .. self.module.get_n_frames() {
            self.state.algo.reset(frame);
        }
    }

    /// Changes the number of frames; every socket is re-declared (and unbound).
    ///
    /// # Errors
    ///
    /// Returns an error if `n_frames` is `0`.
    pub fn set_n_frames(&mut self, n_frames: usize) -> Result<(), Error> {
        self.module.set_n_frames(n_frames)
    }

    /// Changes the number of frames per wave, and resizes the internal buffer to one wave.
    ///
    /// # Errors
    ///
    /// Returns an error if `n_frames_per_wave` is `0`.
    pub fn set_n_frames_per_wave(&mut self, n_frames_per_wave: usize) -> Result<(), Error> {
        self.module.set_n_frames_per_wave(n_frames_per_wave)?;
        self.state
            .y_n
            .resize(self.state.n * n_frames_per_wave, R::zero());
        Ok(())
    }

    /// Returns the length of the internal soft buffer (`N * n_frames_per_wave`).
    #[must_use]
    pub fn get_buffer_len(&self) -> usize {
        self.state.y_n.len()
    }

    /// Decodes hard codewords of the selected frames to information bits.
    ///
    /// # Parameters
    ///
    /// - `y_n`: Hard codewords of all frames (`N * n_frames`).
    ///
    /// - `v_k`: Buffer for the information bits of all frames (`K * n_frames`); only the selected
    ///   frames are written.
    ///
    /// - `frames`: Frames to be decoded.
    ///
    /// # Returns
    ///
    /// - `status`: Decoding status (bit set for every failed frame).
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn decode_hiho(
        &mut self,
        y_n: &[B],
        v_k: &mut [B],
        frames: Frames,
    ) -> Result<Status, Error> {
        self.bind(sck::DecodeHiho::Yn, y_n)?;
        let status = self.exec(DecoderTask::DecodeHiho, frames, true)?;
        self.read(sck::DecodeHiho::Vk, v_k, frames)?;
        Ok(status)
    }

    /// Decodes hard codewords of the selected frames to codewords.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn decode_hiho_cw(
        &mut self,
        y_n: &[B],
        v_n: &mut [B],
        frames: Frames,
    ) -> Result<Status, Error> {
        self.bind(sck::DecodeHihoCw::Yn, y_n)?;
        let status = self.exec(DecoderTask::DecodeHihoCw, frames, true)?;
        self.read(sck::DecodeHihoCw::Vn, v_n, frames)?;
        Ok(status)
    }

    /// Decodes soft codewords of the selected frames to information bits.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn decode_siho(
        &mut self,
        y_n: &[R],
        v_k: &mut [B],
        frames: Frames,
    ) -> Result<Status, Error> {
        self.bind(sck::DecodeSiho::Yn, y_n)?;
        let status = self.exec(DecoderTask::DecodeSiho, frames, true)?;
        self.read(sck::DecodeSiho::Vk, v_k, frames)?;
        Ok(status)
    }

    /// Decodes soft codewords of the selected frames to codewords.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn decode_siho_cw(
        &mut self,
        y_n: &[R],
        v_n: &mut [B],
        frames: Frames,
    ) -> Result<Status, Error> {
        self.bind(sck::DecodeSihoCw::Yn, y_n)?;
        let status = self.exec(DecoderTask::DecodeSihoCw, frames, true)?;
        self.read(sck::DecodeSihoCw::Vn, v_n, frames)?;
        Ok(status)
    }
}

impl<B: HardBit, R: SoftValue, D: SihoDecoding<B, R>> Modular for DecoderSiho<B, R, D> {
    type Task = DecoderTask;
    type State = DecoderState<B, R, D>;

    fn module(&self) -> &Module<DecoderTask, DecoderState<B, R, D>> {
        &self.module
    }

    fn module_mut(&mut self) -> &mut Module<DecoderTask, DecoderState<B, R, D>> {
        &mut self.module
    }

    fn exec(
        &mut self,
        task: DecoderTask,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error> {
        self.module
            .exec(&mut self.state, task, frames, managed_memory)
    }
}

/// Soft-input soft-output decoder module
///
/// Provides the tasks of [`DecoderSiho`] (reachable through [`DecoderSiso::siho`] and
/// [`DecoderSiso::siho_mut`]) plus `decode_siso` and `decode_siso_alt`.
#[derive(Debug)]
pub struct DecoderSiso<B: HardBit, R: SoftValue, D: SisoDecoding<B, R>> {
    /// Soft-input hard-output part, holding every task
    siho: DecoderSiho<B, R, D>,
}

impl<B: HardBit, R: SoftValue, D: SisoDecoding<B, R>> DecoderSiso<B, R, D> {
    /// Returns soft-input soft-output decoder module.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is `0`, `n` is `0`, `k` is greater than `n`, or the codeword has no
    /// room for parity values after `k + tail_length / 2` systematic values.
    pub fn new(k: usize, n: usize, algo: D, framing: Framing) -> Result<Self, Error> {
        let (sys_len, par_len) = sys_par_lengths(k, n, algo.tail_length());
        let mut siho = DecoderSiho::new(k, n, algo, framing)?;
        let module = &mut siho.module;
        module.create_task(DecoderTask::DecodeSiso)?;
        module.create_socket_in::<R, _>(sck::DecodeSiso::Yn1, n)?;
        module.create_socket_out::<R, _>(sck::DecodeSiso::Yn2, n)?;
        module.create_codelet(DecoderTask::DecodeSiso, decode_siso_codelet::<B, R, D>)?;
        module.create_task(DecoderTask::DecodeSisoAlt)?;
        module.create_socket_in::<R, _>(sck::DecodeSisoAlt::Sys, sys_len)?;
        module.create_socket_in::<R, _>(sck::DecodeSisoAlt::Par, par_len)?;
        module.create_socket_out::<R, _>(sck::DecodeSisoAlt::Ext, k)?;
        module.create_codelet(
            DecoderTask::DecodeSisoAlt,
            decode_siso_alt_codelet::<B, R, D>,
        )?;
        Ok(Self { siho })
    }

    /// Returns the soft-input hard-output part.
    #[must_use]
    pub fn siho(&self) -> &DecoderSiho<B, R, D> {
        &self.siho
    }

    /// Returns the mutable soft-input hard-output part.
    pub fn siho_mut(&mut self) -> &mut DecoderSiho<B, R, D> {
        &mut self.siho
    }

    /// Returns the number of trellis tail symbols of the code.
    #[must_use]
    pub fn tail_length(&self) -> usize {
        self.siho.state.algo.tail_length()
    }

    /// Computes soft output values for the soft codewords of the selected frames.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn decode_siso(
        &mut self,
        y_n1: &[R],
        y_n2: &mut [R],
        frames: Frames,
    ) -> Result<Status, Error> {
        self.bind(sck::DecodeSiso::Yn1, y_n1)?;
        let status = self.exec(DecoderTask::DecodeSiso, frames, true)?;
        self.read(sck::DecodeSiso::Yn2, y_n2, frames)?;
        Ok(status)
    }

    /// Computes extrinsic values for the information bits of the selected frames.
    ///
    /// # Parameters
    ///
    /// - `sys`: Systematic soft values of all frames (`(K + t/2) * n_frames`).
    ///
    /// - `par`: Parity soft values of all frames (`(N - K - t/2) * n_frames`).
    ///
    /// - `ext`: Buffer for the extrinsic values of all frames (`K * n_frames`); only the selected
    ///   frames are written.
    ///
    /// - `frames`: Frames to be decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn decode_siso_alt(
        &mut self,
        sys: &[R],
        par: &[R],
        ext: &mut [R],
        frames: Frames,
    ) -> Result<Status, Error> {
        self.bind(sck::DecodeSisoAlt::Sys, sys)?;
        self.bind(sck::DecodeSisoAlt::Par, par)?;
        let status = self.exec(DecoderTask::DecodeSisoAlt, frames, true)?;
        self.read(sck::DecodeSisoAlt::Ext, ext, frames)?;
        Ok(status)
    }
}

impl<B: HardBit, R: SoftValue, D: SisoDecoding<B, R>> Modular for DecoderSiso<B, R, D> {
    type Task = DecoderTask;
    type State = DecoderState<B, R, D>;

    fn module(&self) -> &Module<DecoderTask, DecoderState<B, R, D>> {
        self.siho.module()
    }

    fn module_mut(&mut self) -> &mut Module<DecoderTask, DecoderState<B, R, D>> {
        self.siho.module_mut()
    }

    fn exec(
        &mut self,
        task: DecoderTask,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error> {
        self.siho.exec(task, frames, managed_memory)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests_of_decoder {
    use super::*;
    use crate::FAILURE_STOP;
    use proptest::prelude::*;

    /// Slices the systematic prefix; fails frames holding an erasure (`0.0`), and inverts its
    /// decisions once it has decoded more than one frame since the last reset.
    #[derive(Debug, Default)]
    struct Slicer {
        y: Vec<f32>,
        n_decodes: usize,
        loads: Vec<usize>,
        resets: Vec<usize>,
    }

    impl Slicer {
        fn slice(&self, v: &mut [i32]) {
            let invert = self.n_decodes > 1;
            for (bit, &y) in v.iter_mut().zip(&self.y) {
                *bit = i32::from((y < 0.0) != invert);
            }
        }
    }

    impl SihoDecoding<i32, f32> for Slicer {
        fn load(&mut self, y_n: &[f32], frame: usize) {
            self.y.clear();
            self.y.extend_from_slice(y_n);
            self.loads.push(frame);
        }

        fn decode(&mut self, _: usize) -> Status {
            self.n_decodes += 1;
            if self.y.iter().any(|&y| y == 0.0) {
                FAILURE_STOP
            } else {
                SUCCESS
            }
        }

        fn store(&mut self, v_k: &mut [i32], _: usize) {
            self.slice(v_k);
        }

        fn store_cw(&mut self, v_n: &mut [i32], _: usize) {
            self.slice(v_n);
        }

        fn reset(&mut self, frame: usize) {
            self.n_decodes = 0;
            self.resets.push(frame);
        }
    }

    impl SisoDecoding<i32, f32> for Slicer {
        fn tail_length(&self) -> usize {
            2
        }

        fn decode_siso_alt(
            &mut self,
            sys: &[f32],
            par: &[f32],
            ext: &mut [f32],
            frame: usize,
        ) -> Status {
            for (e, (&s, &p)) in ext.iter_mut().zip(sys.iter().zip(par)) {
                *e = s + p;
            }
            self.loads.push(frame);
            SUCCESS
        }
    }

    /// Decodes whole waves at once: fails the lanes whose first soft value is negative, and logs
    /// the lanes it was handed.
    #[derive(Debug, Default)]
    struct WaveSign {
        waves: Vec<WaveLanes>,
    }

    impl SihoDecoding<i32, f32> for WaveSign {
        fn load(&mut self, _: &[f32], _: usize) {}

        fn decode(&mut self, _: usize) -> Status {
            SUCCESS
        }

        fn store(&mut self, _: &mut [i32], _: usize) {}

        fn store_cw(&mut self, _: &mut [i32], _: usize) {}

        fn reset(&mut self, _: usize) {}

        fn decode_siho_wave(
            &mut self,
            y_n: &[f32],
            out: &mut [i32],
            _: bool,
            lanes: &WaveLanes,
            _: &mut Timers,
        ) -> Status {
            let n = y_n.len() / lanes.n_lanes;
            let width = out.len() / lanes.n_lanes;
            let mut status = SUCCESS;
            for lane in lanes.valid.clone() {
                let frame = i32::try_from(lanes.frame(lane)).unwrap();
                out[lane * width .. (lane + 1) * width].fill(frame);
                if y_n[lane * n] < 0.0 {
                    status |= lane_bit(lane);
                }
            }
            self.waves.push(lanes.clone());
            status
        }
    }

    fn siho(
        k: usize,
        n: usize,
        n_frames: usize,
        n_frames_per_wave: usize,
    ) -> DecoderSiho<i32, f32, Slicer> {
        DecoderSiho::new(
            k,
            n,
            Slicer::default(),
            Framing::new(n_frames, n_frames_per_wave).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_new() {
        // Invalid input
        for (k, n) in [(0, 8), (4, 0), (9, 8)] {
            assert!(
                DecoderSiho::<i32, f32, _>::new(k, n, Slicer::default(), Framing::default())
                    .is_err()
            );
        }
        // Valid input
        let decoder = siho(4, 8, 3, 2);
        assert_eq!(decoder.get_k(), 4);
        assert_eq!(decoder.get_n(), 8);
        assert!(decoder.is_auto_reset());
        assert_eq!(decoder.get_buffer_len(), 16);
        assert_eq!(decoder.get_n_waves(), 2);
        assert_eq!(
            decoder.module()[DecoderTask::DecodeSiho][sck::DecodeSiho::Yn].get_n_elmts(),
            24
        );
        let timers = decoder.module()[DecoderTask::DecodeSiho].get_timers();
        assert_eq!(
            timers.iter().map(crate::Timer::get_name).collect::<Vec<_>>(),
            [LOAD, DECODE, STORE, TOTAL]
        );
        assert!(decoder.module().task(DecoderTask::DecodeSiso).is_err());
    }

    #[test]
    fn test_decode_siho_two_frames_one_wave() {
        let mut decoder = siho(4, 8, 2, 2);
        let y_n = [
            1.0, -1.0, 2.0, -2.0, 1.0, 1.0, 1.0, 1.0, // Frame 0
            -3.0, -1.0, 0.5, 4.0, 1.0, -1.0, 1.0, 1.0, // Frame 1
        ];
        let mut all = [0; 8];
        let status = decoder.decode_siho(&y_n, &mut all, Frames::All).unwrap();
        assert_eq!(status, SUCCESS);
        assert_eq!(all, [0, 1, 0, 1, 1, 1, 0, 0]);
        let mut each = [0; 8];
        decoder.decode_siho(&y_n, &mut each, Frames::One(0)).unwrap();
        decoder.decode_siho(&y_n, &mut each, Frames::One(1)).unwrap();
        assert_eq!(each, all);
        let timers = decoder.module()[DecoderTask::DecodeSiho].get_timers();
        // Two frames, then each frame alone in a padded wave of two
        assert_eq!(timers.get(LOAD).unwrap().get_n_calls(), 4);
        assert_eq!(timers.get(DECODE).unwrap().get_n_calls(), 4);
        assert_eq!(timers.get(TOTAL).unwrap().get_n_calls(), 3);
        assert_eq!(decoder.algo().loads, [0, 1, 0, 1]);
    }

    #[test]
    fn test_padded_lanes_never_reach_algorithm() {
        let mut decoder = siho(1, 2, 3, 2);
        let y_n = [1.0, 1.0, -1.0, 1.0, 1.0, -1.0];
        let mut v_k = [7; 3];
        assert_eq!(decoder.decode_siho(&y_n, &mut v_k, Frames::All).unwrap(), SUCCESS);
        assert_eq!(v_k, [0, 1, 0]);
        assert_eq!(decoder.algo().loads, [0, 1, 2]);
        assert_eq!(decoder.algo().resets, [0, 1, 2]);
        decoder.decode_siho(&y_n, &mut v_k, Frames::One(1)).unwrap();
        decoder.decode_hiho(&[0, 1, 1, 0, 0, 0], &mut v_k, Frames::One(2)).unwrap();
        assert_eq!(decoder.algo().loads, [0, 1, 2, 1, 2]);
        assert_eq!(decoder.algo().resets, [0, 1, 2, 1, 2]);
        // Each phase is timed once per decoded frame
        let timers = decoder.module()[DecoderTask::DecodeSiho].get_timers();
        for name in [LOAD, DECODE, STORE] {
            assert_eq!(timers.get(name).unwrap().get_n_calls(), 4);
        }
    }

    #[test]
    fn test_decode_hiho_timers() {
        let mut decoder = siho(2, 4, 2, 2);
        let mut v_k = [0; 4];
        decoder
            .decode_hiho(&[1, 0, 1, 1, 0, 1, 0, 0], &mut v_k, Frames::All)
            .unwrap();
        let timers = decoder.module()[DecoderTask::DecodeHiho].get_timers();
        let get = |name| timers.get(name).unwrap();
        assert_eq!(get(LOAD).get_n_calls(), 2);
        assert_eq!(get(DECODE).get_n_calls(), 2);
        assert_eq!(get(STORE).get_n_calls(), 2);
        assert_eq!(get(TOTAL).get_n_calls(), 1);
        assert!(
            get(TOTAL).get_total()
                >= get(LOAD).get_total() + get(DECODE).get_total() + get(STORE).get_total()
        );
    }

    #[test]
    fn test_wave_level_decoding() {
        let mut decoder =
            DecoderSiho::new(1, 2, WaveSign::default(), Framing::new(3, 2).unwrap()).unwrap();
        let y_n = [1.0, 1.0, -1.0, 1.0, -1.0, 1.0];
        let mut v_k = [7; 3];
        // Frames 1 and 2 fail: lane 1 of wave 0, then lane 0 of wave 1
        let status = decoder.decode_siho(&y_n, &mut v_k, Frames::All).unwrap();
        assert_eq!(status, 0b10_01);
        assert_eq!(v_k, [0, 1, 2]);
        assert_eq!(
            decoder.algo().waves,
            [
                WaveLanes { first_frame: 0, n_lanes: 2, valid: 0 .. 2, auto_reset: true },
                WaveLanes { first_frame: 2, n_lanes: 2, valid: 0 .. 1, auto_reset: true },
            ]
        );
        assert_eq!(decoder.decode_siho(&y_n, &mut v_k, Frames::One(1)).unwrap(), FAILURE_STOP);
        assert_eq!(
            decoder.algo().waves[2],
            WaveLanes { first_frame: 0, n_lanes: 2, valid: 1 .. 2, auto_reset: true }
        );
    }

    #[test]
    fn test_decode_siho_partial_wave() {
        let mut decoder = siho(2, 3, 3, 2);
        let y_n = [-1.0, 1.0, 1.0, 1.0, -1.0, 1.0, -1.0, -1.0, 0.0];
        let mut v_k = [7; 6];
        let status = decoder.decode_siho(&y_n, &mut v_k, Frames::All).unwrap();
        assert_eq!(v_k, [1, 0, 0, 1, 1, 1]);
        // Frame 2 is lane 0 of the partial wave; the padded lane is not decoded
        assert_eq!(status, 0b00_01);
        assert_eq!(decoder.decode_siho(&y_n, &mut v_k, Frames::One(2)).unwrap(), FAILURE_STOP);
        assert_eq!(decoder.decode_siho(&y_n, &mut v_k, Frames::One(1)).unwrap(), SUCCESS);
        // Without managed memory, only full waves can be processed
        assert!(decoder.exec(DecoderTask::DecodeSiho, Frames::All, false).is_err());
        assert!(decoder.exec(DecoderTask::DecodeSiho, Frames::One(1), false).is_err());
    }

    #[test]
    fn test_decode_siho_status_single_lane() {
        let mut decoder = siho(1, 2, 3, 1);
        let mut v_k = [0; 3];
        let status = decoder
            .decode_siho(&[0.0, 1.0, 1.0, 1.0, 1.0, 0.0], &mut v_k, Frames::All)
            .unwrap();
        assert_eq!(status, 0b101);
    }

    #[test]
    fn test_decode_hiho() {
        let mut decoder = siho(2, 4, 2, 1);
        let mut v_k = [0; 4];
        decoder
            .decode_hiho(&[1, 0, 1, 1, 0, 1, 0, 0], &mut v_k, Frames::All)
            .unwrap();
        assert_eq!(v_k, [1, 0, 0, 1]);
        let mut v_n = [0; 8];
        decoder
            .decode_hiho_cw(&[1, 0, 1, 1, 0, 1, 0, 0], &mut v_n, Frames::All)
            .unwrap();
        assert_eq!(v_n, [1, 0, 1, 1, 0, 1, 0, 0]);
        let mut v_n = [0; 8];
        decoder
            .decode_siho_cw(&[-1.0, 2.0, -3.0, 4.0, 1.0, 1.0, 1.0, -1.0], &mut v_n, Frames::All)
            .unwrap();
        assert_eq!(v_n, [1, 0, 1, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_auto_reset() {
        let y_n = [1.0, -1.0, 1.0, -1.0];
        let mut decoder = siho(2, 4, 1, 1);
        let mut first = [0; 2];
        let mut second = [0; 2];
        decoder.decode_siho(&y_n, &mut first, Frames::All).unwrap();
        decoder.decode_siho(&y_n, &mut second, Frames::All).unwrap();
        assert_eq!(first, second);
        assert_eq!(decoder.algo().resets, [0, 0]);
        // Without auto-reset, the internal state carries over
        decoder.set_auto_reset(false);
        decoder.decode_siho(&y_n, &mut first, Frames::All).unwrap();
        decoder.decode_siho(&y_n, &mut second, Frames::All).unwrap();
        assert_ne!(first, second);
        decoder.reset();
        assert_eq!(decoder.algo().n_decodes, 0);
    }

    #[test]
    fn test_set_n_frames_per_wave() {
        let mut decoder = siho(2, 4, 4, 1);
        decoder.set_n_frames_per_wave(3).unwrap();
        assert_eq!(decoder.get_buffer_len(), 12);
        assert_eq!(decoder.get_n_waves(), 2);
        assert!(decoder.set_n_frames_per_wave(0).is_err());
        decoder.set_n_frames(6).unwrap();
        assert!(!decoder.is_single_wave());
        assert_eq!(decoder.get_n_frames(), 6);
        let mut v_k = [0; 12];
        decoder
            .decode_hiho(&[1, 1, 0, 0].repeat(6), &mut v_k, Frames::All)
            .unwrap();
        assert_eq!(v_k, [1, 1].repeat(6).as_slice());
    }

    #[test]
    fn test_decoder_siso() {
        let mut decoder =
            DecoderSiso::new(2, 6, Slicer::default(), Framing::new(2, 2).unwrap()).unwrap();
        assert_eq!(decoder.tail_length(), 2);
        // Default soft output is the input
        let y_n1 = [1.0, -2.0, 3.0, -4.0, 5.0, -6.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5];
        let mut y_n2 = [0.0; 12];
        decoder.decode_siso(&y_n1, &mut y_n2, Frames::All).unwrap();
        assert_eq!(y_n2, y_n1);
        // sys: K + 1 = 3 values, par: N - K - 1 = 3 values
        let sys = [1.0, 2.0, 3.0, 10.0, 20.0, 30.0];
        let par = [0.5, 0.5, 0.5, -1.0, -1.0, -1.0];
        let mut ext = [0.0; 4];
        decoder
            .decode_siso_alt(&sys, &par, &mut ext, Frames::One(1))
            .unwrap();
        assert_eq!(ext, [0.0, 0.0, 9.0, 19.0]);
        assert_eq!(decoder.siho().algo().loads, [1]);
        // Frames decoded by `decode_siso`, then frame 1 alone
        assert_eq!(decoder.siho().algo().resets, [0, 1, 1]);
        assert!(decoder.decode_siso_alt(&sys[.. 4], &par, &mut ext, Frames::All).is_err());
        // SIHO tasks are available too
        let mut v_k = [0; 4];
        decoder
            .siho_mut()
            .decode_siho(&y_n1, &mut v_k, Frames::All)
            .unwrap();
        assert_eq!(v_k, [0, 1, 0, 0]);
        assert!(!decoder.siho().algo().resets.is_empty());
        // No room for parity values
        assert!(
            DecoderSiso::<i32, f32, _>::new(4, 5, Slicer::default(), Framing::default()).is_err()
        );
    }

    proptest! {
        #[test]
        fn batch_matches_single_frames(
            y_n in prop::collection::vec(-4.0_f32 .. 4.0, 5 * 6),
            n_frames_per_wave in 1_usize .. 7,
        ) {
            let mut decoder = siho(3, 6, 5, n_frames_per_wave);
            let mut all = [0; 15];
            let status_all = decoder.decode_siho(&y_n, &mut all, Frames::All).unwrap();
            let mut each = [0; 15];
            for frame in 0 .. 5 {
                let status = decoder.decode_siho(&y_n, &mut each, Frames::One(frame)).unwrap();
                prop_assert!(status <= FAILURE_STOP);
            }
            prop_assert_eq!(all, each);
            prop_assert!(status_all < 1 << (decoder.get_n_waves() * n_frames_per_wave));
        }
    }
}
