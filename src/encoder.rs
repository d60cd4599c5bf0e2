//! Encoder module
//!
//! An [`Encoder`] exposes the single task `encode`, mapping information words of `K` bits to
//! codewords of `N` bits through an [`Encoding`].

use std::fmt::Debug;
use std::marker::PhantomData;

use tracing::debug;

use crate::module::{Modular, Module, TaskKind};
use crate::task::{Frames, Status, Timers, Wave, SUCCESS};
use crate::{Error, Framing, HardBit};

/// Tasks of an encoder module
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash, Debug)]
pub enum EncoderTask {
    /// Encodes information words
    Encode,
}

impl TaskKind for EncoderTask {
    fn name(self) -> &'static str {
        match self {
            EncoderTask::Encode => "encode",
        }
    }
}

/// Sockets of the encoder tasks
pub mod sck {
    use super::EncoderTask;
    use crate::module::socket_kinds;

    socket_kinds! {
        /// Sockets of the `encode` task
        pub Encode for EncoderTask::Encode: EncoderTask {
            /// Information word (`K`)
            Uk = (0, "U_K"),
            /// Codeword (`N`)
            Xn = (1, "X_N"),
        }
    }
}

/// Channel code encoding one frame
pub trait Encoding<B: HardBit>: Debug + Send {
    /// Returns the number of information bits.
    fn k(&self) -> usize;

    /// Returns the number of code bits.
    fn n(&self) -> usize;

    /// Writes the codeword of the information word `u_k` to `x_n`.
    fn encode(&mut self, u_k: &[B], x_n: &mut [B]);
}

impl<B: HardBit> Encoding<B> for Box<dyn Encoding<B>> {
    fn k(&self) -> usize {
        (**self).k()
    }

    fn n(&self) -> usize {
        (**self).n()
    }

    fn encode(&mut self, u_k: &[B], x_n: &mut [B]) {
        (**self).encode(u_k, x_n);
    }
}

/// State of an encoder module
#[derive(Debug)]
pub struct EncoderState<B, E> {
    /// Channel code
    encoding: E,
    /// Bit element type
    _bits: PhantomData<B>,
}

/// Codelet of the `encode` task.
fn encode_codelet<B: HardBit, E: Encoding<B>>(
    state: &mut EncoderState<B, E>,
    wave: &mut Wave<'_>,
    _: &mut Timers,
) -> Result<Status, Error> {
    let (k, n) = (state.encoding.k(), state.encoding.n());
    let (u_k, x_n) = wave.split::<B, B>(sck::Encode::Uk, sck::Encode::Xn)?;
    for (info, codeword) in u_k.chunks_exact(k).zip(x_n.chunks_exact_mut(n)) {
        state.encoding.encode(info, codeword);
    }
    Ok(SUCCESS)
}

/// Encoder module
#[derive(Debug)]
pub struct Encoder<B: HardBit, E: Encoding<B>> {
    /// Tasks and sockets
    module: Module<EncoderTask, EncoderState<B, E>>,
    /// Encoding state
    state: EncoderState<B, E>,
}

impl<B: HardBit, E: Encoding<B>> Encoder<B, E> {
    /// Returns encoder module.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding has `K == 0` or `K > N`.
    pub fn new(encoding: E, framing: Framing) -> Result<Self, Error> {
        let (k, n) = (encoding.k(), encoding.n());
        if k == 0 || k > n {
            return Err(Error::InvalidInput(format!(
                "Expected 0 < K <= N, found K = {k} and N = {n}"
            )));
        }
        let mut module = Module::new("Encoder", framing);
        module.create_task(EncoderTask::Encode)?;
        module.create_socket_in::<B, _>(sck::Encode::Uk, k)?;
        module.create_socket_out::<B, _>(sck::Encode::Xn, n)?;
        module.create_codelet(EncoderTask::Encode, encode_codelet::<B, E>)?;
        debug!(k, n, "Created encoder module");
        Ok(Self {
            module,
            state: EncoderState {
                encoding,
                _bits: PhantomData,
            },
        })
    }

    /// Returns the number of information bits per frame.
    #[must_use]
    pub fn get_k(&self) -> usize {
        self.state.encoding.k()
    }

    /// Returns the number of code bits per frame.
    #[must_use]
    pub fn get_n(&self) -> usize {
        self.state.encoding.n()
    }

    /// Returns the channel code.
    #[must_use]
    pub fn encoding(&self) -> &E {
        &self.state.encoding
    }

    /// Encodes the information words of the selected frames.
    ///
    /// # Parameters
    ///
    /// - `u_k`: Information words of all frames (`K * n_frames`).
    ///
    /// - `x_n`: Buffer for the codewords of all frames (`N * n_frames`); only the selected frames
    ///   are written.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer length is wrong or the selected frame does not exist.
    pub fn encode(&mut self, u_k: &[B], x_n: &mut [B], frames: Frames) -> Result<(), Error> {
        self.bind(sck::Encode::Uk, u_k)?;
        self.exec(EncoderTask::Encode, frames, true)?;
        self.read(sck::Encode::Xn, x_n, frames)
    }
}

impl<B: HardBit, E: Encoding<B>> Modular for Encoder<B, E> {
    type Task = EncoderTask;
    type State = EncoderState<B, E>;

    fn module(&self) -> &Module<EncoderTask, EncoderState<B, E>> {
        &self.module
    }

    fn module_mut(&mut self) -> &mut Module<EncoderTask, EncoderState<B, E>> {
        &mut self.module
    }

    fn exec(
        &mut self,
        task: EncoderTask,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error> {
        self.module
            .exec(&mut self.state, task, frames, managed_memory)
    }
}

#[cfg(test)]
mod tests_of_encoder {
    use super::*;

    /// Single parity check code
    #[derive(Debug)]
    struct ParityCheck(usize);

    impl Encoding<u8> for ParityCheck {
        fn k(&self) -> usize {
            self.0
        }

        fn n(&self) -> usize {
            self.0 + 1
        }

        fn encode(&mut self, u_k: &[u8], x_n: &mut [u8]) {
            x_n[.. self.0].copy_from_slice(u_k);
            x_n[self.0] = u_k.iter().fold(0, |p, b| p ^ b);
        }
    }

    #[test]
    fn test_new() {
        // Invalid input
        assert!(Encoder::new(ParityCheck(0), Framing::default()).is_err());
        // Valid input
        let encoder = Encoder::new(ParityCheck(3), Framing::new(2, 1).unwrap()).unwrap();
        assert_eq!(encoder.get_k(), 3);
        assert_eq!(encoder.get_n(), 4);
        assert_eq!(encoder.encoding().0, 3);
        assert_eq!(encoder.get_name(), "Encoder");
        assert_eq!(encoder.module()[EncoderTask::Encode][sck::Encode::Xn].get_n_elmts(), 8);
    }

    #[test]
    fn test_encode() {
        let mut encoder = Encoder::new(ParityCheck(3), Framing::new(3, 2).unwrap()).unwrap();
        let mut x_n = [0; 12];
        encoder
            .encode(&[1, 0, 0, 1, 1, 0, 1, 1, 1], &mut x_n, Frames::All)
            .unwrap();
        assert_eq!(x_n, [1, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 1]);
        let mut x_n = [5; 12];
        encoder
            .encode(&[0, 0, 0, 0, 1, 0, 1, 1, 1], &mut x_n, Frames::One(1))
            .unwrap();
        assert_eq!(x_n, [5, 5, 5, 5, 0, 1, 0, 1, 5, 5, 5, 5]);
        assert!(encoder.encode(&[0; 8], &mut x_n, Frames::All).is_err());
    }
}
