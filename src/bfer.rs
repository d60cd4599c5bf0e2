//! Bit and frame error rate (BFER) simulation over a BPSK-AWGN channel
//!
//! Every worker thread owns a complete communication chain: random source, CRC build, encoder,
//! optional column-row channel interleaver, BPSK-AWGN channel, decoder, CRC extract and check. The
//! workers share only the error counters, a stop flag polled between batches, and a list of the
//! distinct error messages they ran into.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::crc::CrcTask;
use crate::decoder::SihoDecoding;
use crate::encoder::Encoding;
use crate::module::Modular;
use crate::repetition::{RepetitionDecoder, RepetitionEncoding};
use crate::rsc::{DecodingAlgo, RscDecoder, RscEncoding};
use crate::task::{Frames, SUCCESS};
use crate::{
    crc, utils, Crc, CrcPolynomial, DecoderSiho, Encoder, Error, Framing, Interleaver, ReadOrder,
};

/// Channel code of a simulation
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub enum Code {
    /// Repetition code with given number of copies
    Repetition {
        /// Number of copies
        rep: usize,
    },
    /// Terminated RSC code
    Rsc {
        /// Code polynomials, feedback polynomial first
        code_polynomials: Vec<usize>,
        /// BCJR variant
        decoding_algo: DecodingAlgo,
    },
}

/// Boxed encoding of a chain
type BoxedEncoding = Box<dyn Encoding<u8>>;

/// Boxed decoding algorithm of a chain
type BoxedDecoding = Box<dyn SihoDecoding<u8, f64>>;

impl Code {
    /// Returns encoding and decoding algorithm for a given number of information bits.
    fn build(&self, num_info_bits: usize) -> Result<(BoxedEncoding, BoxedDecoding), Error> {
        match self {
            Code::Repetition { rep } => {
                let encoding: BoxedEncoding =
                    Box::new(RepetitionEncoding::new(num_info_bits, *rep)?);
                let decoding: BoxedDecoding =
                    Box::new(RepetitionDecoder::new(num_info_bits, *rep)?);
                Ok((encoding, decoding))
            }
            Code::Rsc {
                code_polynomials,
                decoding_algo,
            } => {
                let encoding: BoxedEncoding =
                    Box::new(RscEncoding::new(num_info_bits, code_polynomials)?);
                let decoding: BoxedDecoding = Box::new(RscDecoder::new(
                    num_info_bits,
                    code_polynomials,
                    *decoding_algo,
                )?);
                Ok((encoding, decoding))
            }
        }
    }
}

/// Parameters for a simulation point
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SimParams {
    /// Number of information bits per frame, before CRC
    pub num_info_bits: usize,
    /// CRC name (e.g., `"16-CCITT"`, or `"NO"`)
    pub crc_name: String,
    /// Channel code
    pub code: Code,
    /// Number of frames per batch
    pub n_frames: usize,
    /// Number of frames per wave
    pub n_frames_per_wave: usize,
    /// Ratio (dB) of symbol energy to noise power spectral density at BPSK-AWGN channel output
    pub es_over_n0_db: f64,
    /// Number of columns of the column-row channel interleaver (no interleaver if `None`)
    pub interleaver_n_cols: Option<usize>,
    /// Number of worker threads
    pub n_threads: usize,
    /// Desired minimum number of frame errors
    pub num_frame_errors_min: u64,
    /// Maximum number of frames to be simulated
    pub num_frames_max: u64,
    /// Seed of the random number generators (worker `t` uses `seed + t`)
    pub seed: u64,
}

/// Execution statistics of a task, summed over all workers
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct TaskStats {
    /// Module name
    pub module: String,
    /// Task name
    pub task: String,
    /// Number of executions
    pub n_calls: u64,
    /// Total execution time (s)
    pub total_secs: f64,
}

/// Results of a simulation point
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SimResults {
    /// Simulation parameters
    pub params: SimParams,
    /// Number of frames simulated
    pub num_frames: u64,
    /// Number of frames with at least one information bit in error
    pub num_frame_errors: u64,
    /// Number of information bits in error
    pub num_bit_errors: u64,
    /// Number of frames whose CRC check failed
    pub num_crc_failures: u64,
    /// Bit error rate
    pub ber: f64,
    /// Frame error rate
    pub fer: f64,
    /// Execution statistics of all tasks
    pub task_stats: Vec<TaskStats>,
    /// Distinct error messages of failed workers
    pub errors: Vec<String>,
    /// Wall-clock duration (s)
    pub elapsed_secs: f64,
}

/// Error counts of a batch of frames
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
struct BatchCounts {
    /// Number of frames
    frames: u64,
    /// Number of frames with errors
    frame_errors: u64,
    /// Number of bits in error
    bit_errors: u64,
    /// Number of frames failing the CRC check
    crc_failures: u64,
}

/// Error counters shared by the workers
#[derive(Debug, Default)]
struct Monitor {
    /// Number of frames
    frames: AtomicU64,
    /// Number of frames with errors
    frame_errors: AtomicU64,
    /// Number of bits in error
    bit_errors: AtomicU64,
    /// Number of frames failing the CRC check
    crc_failures: AtomicU64,
}

impl Monitor {
    /// Adds the counts of a batch, and returns `true` if the simulation point is complete.
    fn add(&self, counts: BatchCounts, params: &SimParams) -> bool {
        let frames = self.frames.fetch_add(counts.frames, Ordering::Relaxed) + counts.frames;
        let frame_errors = self
            .frame_errors
            .fetch_add(counts.frame_errors, Ordering::Relaxed)
            + counts.frame_errors;
        self.bit_errors
            .fetch_add(counts.bit_errors, Ordering::Relaxed);
        self.crc_failures
            .fetch_add(counts.crc_failures, Ordering::Relaxed);
        frame_errors >= params.num_frame_errors_min || frames >= params.num_frames_max
    }

    /// Returns the accumulated counts.
    fn counts(&self) -> BatchCounts {
        BatchCounts {
            frames: self.frames.load(Ordering::Relaxed),
            frame_errors: self.frame_errors.load(Ordering::Relaxed),
            bit_errors: self.bit_errors.load(Ordering::Relaxed),
            crc_failures: self.crc_failures.load(Ordering::Relaxed),
        }
    }
}

/// Communication chain of a worker
#[derive(Debug)]
struct Chain {
    /// CRC module
    crc: Crc<u8, CrcPolynomial>,
    /// Encoder module
    encoder: Encoder<u8, BoxedEncoding>,
    /// Decoder module
    decoder: DecoderSiho<u8, f64, BoxedDecoding>,
    /// Channel interleaver
    interleaver: Option<Interleaver>,
    /// Random number generator of the source and channel
    rng: StdRng,
    /// Ratio (dB) of symbol energy to noise power spectral density
    es_over_n0_db: f64,
    /// Information bits
    u_k: Vec<u8>,
    /// Information bits with CRC
    u_k_crc: Vec<u8>,
    /// Code bits
    x_n: Vec<u8>,
    /// Interleaved code bits
    x_n_int: Vec<u8>,
    /// Channel LLR values
    llr: Vec<f64>,
    /// Decoded information bits with CRC
    v_k_crc: Vec<u8>,
    /// Decoded information bits
    v_k: Vec<u8>,
}

impl Chain {
    /// Returns communication chain for given parameters and worker index.
    fn new(params: &SimParams, worker: u64) -> Result<Self, Error> {
        let framing = Framing::new(params.n_frames, params.n_frames_per_wave)?;
        let crc = Crc::new(
            params.num_info_bits,
            params.crc_name.parse::<CrcPolynomial>()?,
            framing,
        )?;
        let k_crc = params.num_info_bits + crc.get_size();
        let (encoding, decoding) = params.code.build(k_crc)?;
        let n = encoding.n();
        let encoder = Encoder::new(encoding, framing)?;
        let decoder = DecoderSiho::new(k_crc, n, decoding, framing)?;
        let interleaver = params
            .interleaver_n_cols
            .map(|n_cols| Interleaver::column_row(n, n_cols, ReadOrder::TopLeft))
            .transpose()?;
        debug!(worker, k_crc, n, "Created communication chain");
        let n_frames = params.n_frames;
        Ok(Self {
            crc,
            encoder,
            decoder,
            interleaver,
            rng: StdRng::seed_from_u64(params.seed.wrapping_add(worker)),
            es_over_n0_db: params.es_over_n0_db,
            u_k: vec![0; params.num_info_bits * n_frames],
            u_k_crc: vec![0; k_crc * n_frames],
            x_n: vec![0; n * n_frames],
            x_n_int: vec![0; n * n_frames],
            llr: vec![0.0; n * n_frames],
            v_k_crc: vec![0; k_crc * n_frames],
            v_k: vec![0; params.num_info_bits * n_frames],
        })
    }

    /// Simulates a batch of frames.
    fn run_batch(&mut self) -> Result<BatchCounts, Error> {
        let k = self.crc.get_k();
        self.u_k = utils::random_bits(self.u_k.len(), &mut self.rng);
        self.crc.build(&self.u_k, &mut self.u_k_crc, Frames::All)?;
        self.encoder
            .encode(&self.u_k_crc, &mut self.x_n, Frames::All)?;
        match &self.interleaver {
            Some(interleaver) => {
                interleaver.interleave(&self.x_n, &mut self.x_n_int)?;
                let llr_int: Vec<f64> =
                    utils::bpsk_awgn_channel(&self.x_n_int, self.es_over_n0_db, &mut self.rng);
                interleaver.deinterleave(&llr_int, &mut self.llr)?;
            }
            None => {
                self.llr = utils::bpsk_awgn_channel(&self.x_n, self.es_over_n0_db, &mut self.rng);
            }
        }
        self.decoder
            .decode_siho(&self.llr, &mut self.v_k_crc, Frames::All)?;
        self.crc
            .extract(&self.v_k_crc, &mut self.v_k, Frames::All)?;
        let mut counts = BatchCounts {
            frames: u64::try_from(self.crc.get_n_frames()).unwrap_or(u64::MAX),
            ..BatchCounts::default()
        };
        self.crc.bind(crc::sck::Check::Vk, &self.v_k_crc)?;
        for (frame, (v, u)) in self
            .v_k
            .chunks_exact(k)
            .zip(self.u_k.chunks_exact(k))
            .enumerate()
        {
            if self.crc.exec(CrcTask::Check, Frames::One(frame), true)? != SUCCESS {
                counts.crc_failures += 1;
            }
            let bit_errors = utils::error_count(v, u);
            if bit_errors > 0 {
                counts.frame_errors += 1;
                counts.bit_errors += u64::try_from(bit_errors).unwrap_or(u64::MAX);
            }
        }
        Ok(counts)
    }

    /// Returns the execution statistics of all tasks that ran.
    fn task_stats(&self) -> Vec<TaskStats> {
        let mut stats = Vec::new();
        push_task_stats(&self.crc, &mut stats);
        push_task_stats(&self.encoder, &mut stats);
        push_task_stats(&self.decoder, &mut stats);
        stats
    }
}

/// Appends the execution statistics of the tasks of a module that ran.
fn push_task_stats<M: Modular>(module: &M, stats: &mut Vec<TaskStats>) {
    for (_, task) in module.module().tasks() {
        let timer = task.get_exec_timer();
        if timer.get_n_calls() > 0 {
            stats.push(TaskStats {
                module: module.get_name().to_string(),
                task: task.get_name().to_string(),
                n_calls: timer.get_n_calls(),
                total_secs: timer.get_total().as_secs_f64(),
            });
        }
    }
}

/// Sums the execution statistics of the workers, task by task.
fn merge_task_stats(all_stats: impl IntoIterator<Item = TaskStats>) -> Vec<TaskStats> {
    let mut merged: BTreeMap<(String, String), TaskStats> = BTreeMap::new();
    for stats in all_stats {
        merged
            .entry((stats.module.clone(), stats.task.clone()))
            .and_modify(|acc| {
                acc.n_calls += stats.n_calls;
                acc.total_secs += stats.total_secs;
            })
            .or_insert(stats);
    }
    merged.into_values().collect()
}

/// Checks validity of simulation parameters.
fn check_sim_params(params: &SimParams) -> Result<(), Error> {
    if params.n_threads == 0 {
        return Err(Error::InvalidInput(
            "Number of threads cannot be zero".to_string(),
        ));
    }
    if params.num_frames_max == 0 {
        return Err(Error::InvalidInput(
            "Maximum number of frames cannot be zero".to_string(),
        ));
    }
    if !params.es_over_n0_db.is_finite() {
        return Err(Error::InvalidInput(format!(
            "Es/N0 must be finite, found {}",
            params.es_over_n0_db
        )));
    }
    Ok(())
}

/// Runs a worker until the simulation point is complete or the stop flag is raised.
fn run_worker(
    params: &SimParams,
    worker: u64,
    monitor: &Monitor,
    done: &AtomicBool,
    stop: &AtomicBool,
) -> Result<Vec<TaskStats>, Error> {
    let mut chain = Chain::new(params, worker)?;
    while !done.load(Ordering::Relaxed) && !stop.load(Ordering::Relaxed) {
        let counts = chain.run_batch()?;
        if monitor.add(counts, params) {
            done.store(true, Ordering::Relaxed);
        }
    }
    Ok(chain.task_stats())
}

/// Runs a simulation point.
///
/// # Parameters
///
/// - `params`: Simulation parameters.
///
/// - `stop`: Flag that makes every worker return after its current batch once raised.
///
/// # Returns
///
/// - `results`: Simulation results. Worker failures do not make the simulation fail: they are
///   logged and their distinct messages reported in `results.errors`.
///
/// # Errors
///
/// Returns an error if the parameters are invalid or the thread pool cannot be built.
pub fn run_bpsk_awgn_sim(params: &SimParams, stop: &AtomicBool) -> Result<SimResults, Error> {
    check_sim_params(params)?;
    // Fail early on a chain that cannot be built
    Chain::new(params, 0)?;
    let timer = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.n_threads)
        .build()
        .map_err(|e| Error::InvalidInput(format!("Cannot build thread pool: {e}")))?;
    let monitor = Monitor::default();
    let done = AtomicBool::new(false);
    let errors: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let all_stats: Vec<Vec<TaskStats>> = pool.install(|| {
        (0 .. params.n_threads)
            .into_par_iter()
            .filter_map(|worker| {
                let worker = u64::try_from(worker).unwrap_or(u64::MAX);
                match run_worker(params, worker, &monitor, &done, stop) {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        done.store(true, Ordering::Relaxed);
                        let message = e.to_string();
                        let mut errors = errors.lock().unwrap_or_else(PoisonError::into_inner);
                        if !errors.contains(&message) {
                            error!(worker, "{message}");
                            errors.push(message);
                        }
                        None
                    }
                }
            })
            .collect()
    });
    let counts = monitor.counts();
    let num_info_bits = u64::try_from(params.num_info_bits).unwrap_or(u64::MAX);
    let results = SimResults {
        params: params.clone(),
        num_frames: counts.frames,
        num_frame_errors: counts.frame_errors,
        num_bit_errors: counts.bit_errors,
        num_crc_failures: counts.crc_failures,
        ber: ratio(counts.bit_errors, counts.frames.saturating_mul(num_info_bits)),
        fer: ratio(counts.frame_errors, counts.frames),
        task_stats: merge_task_stats(all_stats.into_iter().flatten()),
        errors: errors.into_inner().unwrap_or_else(PoisonError::into_inner),
        elapsed_secs: timer.elapsed().as_secs_f64(),
    };
    if results.num_frame_errors < params.num_frame_errors_min && results.errors.is_empty() {
        warn!(
            es_over_n0_db = params.es_over_n0_db,
            num_frame_errors = results.num_frame_errors,
            "Frame limit reached before the desired number of frame errors"
        );
    }
    Ok(results)
}

/// Runs simulation points one after the other, and saves all results to a JSON file.
///
/// # Errors
///
/// Returns an error if the parameters of a point are invalid, or if the results cannot be saved.
pub fn run_bpsk_awgn_sims(
    all_params: &[SimParams],
    json_filename: &str,
    stop: &AtomicBool,
) -> Result<Vec<SimResults>, Error> {
    let mut all_results = Vec::with_capacity(all_params.len());
    for params in all_params {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let results = run_bpsk_awgn_sim(params, stop)?;
        info!(
            es_over_n0_db = params.es_over_n0_db,
            frames = results.num_frames,
            ber = results.ber,
            fer = results.fer,
            crc_failures = results.num_crc_failures,
            "Simulation point done"
        );
        all_results.push(results);
        save_results(&all_results, json_filename)?;
    }
    Ok(all_results)
}

/// Saves simulation results to a JSON file.
fn save_results(all_results: &[SimResults], json_filename: &str) -> Result<(), Error> {
    let writer = BufWriter::new(File::create(json_filename)?);
    serde_json::to_writer_pretty(writer, all_results)?;
    Ok(())
}

/// Returns the ratio of two counts (zero if the denominator is zero).
#[allow(clippy::cast_precision_loss)]
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
