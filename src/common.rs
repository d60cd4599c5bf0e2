//! Types needed in multiple modules

use num_traits::{Float, PrimInt};

/// Custom error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid input error (bad constructor parameter, buffer length, frame index, ...)
    #[error("{0}")]
    InvalidInput(String),
    /// Operation that the module was never given (missing task or codelet)
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
    /// Input socket executed before any buffer was bound to it
    #[error("Socket '{socket}' of task '{task}' is not bound")]
    UnboundSocket {
        /// Task name
        task: String,
        /// Socket name
        socket: String,
    },
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
}

/// Integer type used to carry hard decisions (bits).
///
/// A value of `0` is bit `0` and any other value is bit `1`. A hard element can also carry one
/// byte, which is how bit-packed frames (8 logical bits per element) are stored.
pub trait HardBit: PrimInt + Default + std::fmt::Debug + Send + Sync + 'static {
    /// Returns the element holding the given byte.
    fn from_byte(byte: u8) -> Self;

    /// Returns the low byte of the element.
    fn low_byte(self) -> u8;

    /// Returns the element for bit `1` if `bit` is `true`, else the element for bit `0`.
    fn from_bool(bit: bool) -> Self {
        if bit {
            Self::one()
        } else {
            Self::zero()
        }
    }

    /// Returns `true` if the element is bit `1`.
    fn is_one(self) -> bool {
        self != Self::zero()
    }
}

/// Floating-point type used to carry soft values (log-likelihood ratios).
///
/// Positive values indicate that bit `0` is more likely.
pub trait SoftValue: Float + Default + std::fmt::Debug + Send + Sync + 'static {
    /// Returns the value closest to the given `f64`.
    fn from_f64(val: f64) -> Self;

    /// Returns the value as an `f64`.
    fn as_f64(self) -> f64;

    /// Returns the BPSK symbol for a hard bit (`0 -> +1`, `1 -> -1`).
    fn from_hard<B: HardBit>(bit: B) -> Self {
        if bit.is_one() {
            -Self::one()
        } else {
            Self::one()
        }
    }
}

macro_rules! impl_hard_bit {
    ($($t:ty),*) => {
        $(
            impl HardBit for $t {
                #[allow(trivial_numeric_casts, clippy::cast_lossless, clippy::cast_possible_wrap)]
                fn from_byte(byte: u8) -> Self {
                    byte as $t
                }

                #[allow(
                    trivial_numeric_casts,
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss
                )]
                fn low_byte(self) -> u8 {
                    self as u8
                }
            }
        )*
    };
}

impl_hard_bit!(i8, u8, i16, u16, i32, u32, i64, u64);

impl SoftValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(val: f64) -> Self {
        val as f32
    }

    fn as_f64(self) -> f64 {
        f64::from(self)
    }
}

impl SoftValue for f64 {
    fn from_f64(val: f64) -> Self {
        val
    }

    fn as_f64(self) -> f64 {
        self
    }
}
