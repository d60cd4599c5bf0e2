//! This crate is a small task/socket execution framework for forward-error-correction (FEC)
//! processing chains. A module owns a set of tasks; every task has named, typed, fixed-width data
//! sockets and a codelet that processes one wave of frames at a time. A batch of `n_frames` frames
//! is split into waves of `n_frames_per_wave` frames, and each frame can report its own status bit.
//!
//! On top of the framework, the crate provides:
//!
//! - A CRC module ([`Crc`]) that builds, extracts and checks cyclic redundancy check bits, with
//!   generic polynomial CRCs constructible from standard names (e.g., `"16-CCITT"`).
//!
//! - An encoder module ([`Encoder`]) and two decoder modules: [`DecoderSiho`] (hard-input or
//!   soft-input, hard-output) and [`DecoderSiso`] (soft-input, soft-output), driven by pluggable
//!   codes ([`RepetitionEncoding`]/[`RepetitionDecoder`], and [`RscEncoding`]/[`RscDecoder`], the
//!   latter being a BCJR decoder of a terminated recursive systematic convolutional code).
//!
//! - A permutation-table interleaver ([`Interleaver`]), including the column-row interleaver.
//!
//! - A multi-threaded bit/frame error rate simulation over a BPSK-AWGN channel ([`bfer`]).
//!
//! # Examples
//!
//! ```
//! use fecflow::{utils, Crc, CrcPolynomial, DecoderSiho, Encoder, Frames, Framing};
//! use fecflow::{RepetitionDecoder, RepetitionEncoding};
//!
//! let framing = Framing::new(4, 2)?;
//! let mut crc = Crc::new(6, "8-DVB-S2".parse::<CrcPolynomial>()?, framing)?;
//! let mut encoder = Encoder::new(RepetitionEncoding::new(14, 3)?, framing)?;
//! let mut decoder =
//!     DecoderSiho::<u8, f64, _>::new(14, 42, RepetitionDecoder::new(14, 3)?, framing)?;
//! let mut rng = rand::rng();
//! let u_k: Vec<u8> = utils::random_bits(24, &mut rng);
//! let mut u_k_crc = vec![0; 56];
//! crc.build(&u_k, &mut u_k_crc, Frames::All)?;
//! let mut x_n = vec![0; 168];
//! encoder.encode(&u_k_crc, &mut x_n, Frames::All)?;
//! let y_n: Vec<f64> = utils::bpsk_awgn_channel(&x_n, 20.0, &mut rng);
//! let mut v_k_crc = vec![0; 56];
//! decoder.decode_siho(&y_n, &mut v_k_crc, Frames::All)?;
//! assert!(crc.check(&v_k_crc, Frames::All)?);
//! # Ok::<(), fecflow::Error>(())
//! ```

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

mod common;
mod module;
mod socket;
mod task;

pub mod bfer;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod interleaver;
pub mod repetition;
pub mod rsc;
pub mod utils;

pub use common::{Error, HardBit, SoftValue};
pub use crc::{Crc, CrcAlgorithm, CrcPolynomial, CrcTask};
pub use decoder::{
    DecoderSiho, DecoderSiso, DecoderTask, SihoDecoding, SisoDecoding, WaveLanes,
};
pub use encoder::{Encoder, EncoderTask, Encoding};
pub use interleaver::{Interleaver, ReadOrder};
pub use module::{Framing, Modular, Module, SocketKind, TaskKind};
pub use repetition::{RepetitionDecoder, RepetitionEncoding};
pub use rsc::{DecodingAlgo, RscDecoder, RscEncoding};
pub use socket::{Direction, Element, Socket};
pub use task::{
    lane_bit, Codelet, Frames, Status, Task, Timer, Timers, Wave, FAILURE_STOP, SUCCESS,
};
