//! Named, typed data ports of a task
//!
//! A [`Socket`] describes one buffer that a task reads, writes, or both. Its storage is sized for
//! the whole frame batch of the owning module (`width * n_frames` elements) and holds elements of
//! a single type fixed at creation.

use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::ops::Range;

use crate::{Error, Frames};

/// Direction of a socket
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy)]
pub enum Direction {
    /// Read by the task
    In,
    /// Written by the task
    Out,
    /// Read and written by the task
    InOut,
}

impl Direction {
    /// Returns `true` if the task reads data through a socket with this direction.
    #[must_use]
    pub fn is_input(self) -> bool {
        matches!(self, Direction::In | Direction::InOut)
    }

    /// Returns `true` if the task writes data through a socket with this direction.
    #[must_use]
    pub fn is_output(self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }
}

/// Element type that can flow through a socket.
pub trait Element: Copy + Default + Debug + Send + Sync + 'static {}

impl<T: Copy + Default + Debug + Send + Sync + 'static> Element for T {}

/// Type-erased contiguous storage (implemented by `Vec<T>` for every element type).
pub(crate) trait Buffer: Debug + Send + Sync {
    /// Number of elements
    fn n_elmts(&self) -> usize;

    /// Resizes the buffer, filling new positions with the default element.
    fn resize_elmts(&mut self, n_elmts: usize);

    /// Overwrites a range with the default element.
    fn fill_default(&mut self, range: Range<usize>);

    /// Copies `src[src_range]` into `self` starting at `dst_start`.
    fn copy_from(
        &mut self,
        dst_start: usize,
        src: &dyn Buffer,
        src_range: Range<usize>,
    ) -> Result<(), Error>;

    /// Returns an empty buffer of the same element type.
    fn empty_like(&self) -> Box<dyn Buffer>;

    /// Upcast for downcasting to `Vec<T>`
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to `Vec<T>`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Element> Buffer for Vec<T> {
    fn n_elmts(&self) -> usize {
        self.len()
    }

    fn resize_elmts(&mut self, n_elmts: usize) {
        self.resize(n_elmts, T::default());
    }

    fn fill_default(&mut self, range: Range<usize>) {
        self[range].fill(T::default());
    }

    fn copy_from(
        &mut self,
        dst_start: usize,
        src: &dyn Buffer,
        src_range: Range<usize>,
    ) -> Result<(), Error> {
        let src = src
            .as_any()
            .downcast_ref::<Vec<T>>()
            .ok_or_else(|| Error::InvalidInput("Mismatched buffer element types".to_string()))?;
        let len = src_range.len();
        self[dst_start .. dst_start + len].copy_from_slice(&src[src_range]);
        Ok(())
    }

    fn empty_like(&self) -> Box<dyn Buffer> {
        Box::new(Vec::<T>::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Named, typed data port of a task
#[derive(Debug)]
pub struct Socket {
    /// Name, unique within the task
    name: &'static str,
    /// Direction
    direction: Direction,
    /// Element type identifier
    datatype: TypeId,
    /// Element type name
    datatype_name: &'static str,
    /// Element size (bytes)
    elem_size: usize,
    /// Number of elements per frame
    width: usize,
    /// Number of frames the storage is sized for
    n_frames: usize,
    /// Storage for the whole frame batch
    pub(crate) data: Box<dyn Buffer>,
    /// Whether a buffer has been bound since creation or the last resize
    bound: bool,
}

impl Socket {
    /// Returns socket with zero-filled storage for `width * n_frames` elements of type `T`.
    pub(crate) fn new<T: Element>(
        name: &'static str,
        direction: Direction,
        width: usize,
        n_frames: usize,
    ) -> Self {
        Self {
            name,
            direction,
            datatype: TypeId::of::<T>(),
            datatype_name: std::any::type_name::<T>(),
            elem_size: std::mem::size_of::<T>(),
            width,
            n_frames,
            data: Box::new(vec![T::default(); width * n_frames]),
            bound: false,
        }
    }

    /// Returns the socket name.
    #[must_use]
    pub fn get_name(&self) -> &'static str {
        self.name
    }

    /// Returns the socket direction.
    #[must_use]
    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    /// Returns the name of the element type.
    #[must_use]
    pub fn get_datatype_string(&self) -> &'static str {
        self.datatype_name
    }

    /// Returns the size (bytes) of one element.
    #[must_use]
    pub fn get_datatype_size(&self) -> usize {
        self.elem_size
    }

    /// Returns the number of elements per frame.
    #[must_use]
    pub fn get_width(&self) -> usize {
        self.width
    }

    /// Returns the number of elements for the whole frame batch.
    #[must_use]
    pub fn get_n_elmts(&self) -> usize {
        self.width * self.n_frames
    }

    /// Returns the number of bytes for the whole frame batch.
    #[must_use]
    pub fn get_databytes(&self) -> usize {
        self.get_n_elmts() * self.elem_size
    }

    /// Returns `true` if a buffer has been bound to the socket.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Returns `true` if the socket carries elements of type `T`.
    #[must_use]
    pub fn has_datatype<T: Element>(&self) -> bool {
        self.datatype == TypeId::of::<T>()
    }

    /// Binds a buffer to the socket, loading its contents for the next execution.
    ///
    /// # Parameters
    ///
    /// - `data`: Buffer for the whole frame batch.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` is not the element type of the socket, or if `data.len()` is not
    /// equal to the number of elements of the socket (width times number of frames).
    pub fn bind<T: Element>(&mut self, data: &[T]) -> Result<(), Error> {
        let n_elmts = self.get_n_elmts();
        if data.len() != n_elmts {
            return Err(Error::InvalidInput(format!(
                "Buffer bound to socket '{}' must have {} elements ({} per frame, {} frames), \
                found {}",
                self.name,
                n_elmts,
                self.width,
                self.n_frames,
                data.len()
            )));
        }
        self.data_mut::<T>()?.copy_from_slice(data);
        self.bound = true;
        Ok(())
    }

    /// Returns the socket contents for the whole frame batch.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` is not the element type of the socket.
    pub fn data<T: Element>(&self) -> Result<&[T], Error> {
        self.data
            .as_any()
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
            .ok_or_else(|| self.type_mismatch::<T>())
    }

    /// Returns the mutable socket contents for the whole frame batch.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` is not the element type of the socket.
    pub fn data_mut<T: Element>(&mut self) -> Result<&mut [T], Error> {
        if !self.has_datatype::<T>() {
            return Err(self.type_mismatch::<T>());
        }
        self.data
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
            .map(Vec::as_mut_slice)
            .ok_or_else(|| Error::InvalidInput("Socket storage has an unexpected type".to_string()))
    }

    /// Copies the contents of the selected frames into a caller buffer laid out for the whole
    /// frame batch; other frames of `out` are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` is not the element type of the socket, if `out.len()` is not the
    /// number of elements of the socket, or if the selected frame does not exist.
    pub fn read_frames_into<T: Element>(&self, out: &mut [T], frames: Frames) -> Result<(), Error> {
        if out.len() != self.get_n_elmts() {
            return Err(Error::InvalidInput(format!(
                "Buffer read from socket '{}' must have {} elements, found {}",
                self.name,
                self.get_n_elmts(),
                out.len()
            )));
        }
        let range = self.frame_range(frames)?;
        out[range.clone()].copy_from_slice(&self.data::<T>()?[range]);
        Ok(())
    }

    /// Returns the element range of the selected frames.
    fn frame_range(&self, frames: Frames) -> Result<Range<usize>, Error> {
        match frames {
            Frames::All => Ok(0 .. self.get_n_elmts()),
            Frames::One(f) if f < self.n_frames => Ok(f * self.width .. (f + 1) * self.width),
            Frames::One(f) => Err(Error::InvalidInput(format!(
                "Frame index {f} out of range for socket '{}' ({} frames)",
                self.name, self.n_frames
            ))),
        }
    }

    /// Re-declares the storage for a new number of frames (contents are reset).
    pub(crate) fn set_n_frames(&mut self, n_frames: usize) {
        self.n_frames = n_frames;
        self.data.resize_elmts(0);
        self.data.resize_elmts(self.width * n_frames);
        self.bound = false;
    }

    /// Returns error for access with wrong element type.
    fn type_mismatch<T: Element>(&self) -> Error {
        Error::InvalidInput(format!(
            "Socket '{}' carries elements of type {}, not {}",
            self.name,
            self.datatype_name,
            std::any::type_name::<T>()
        ))
    }
}

#[cfg(test)]
mod tests_of_socket {
    use super::*;

    #[test]
    fn test_new() {
        let socket = Socket::new::<f32>("Y_N", Direction::In, 8, 3);
        assert_eq!(socket.get_name(), "Y_N");
        assert_eq!(socket.get_direction(), Direction::In);
        assert_eq!(socket.get_width(), 8);
        assert_eq!(socket.get_n_elmts(), 24);
        assert_eq!(socket.get_datatype_size(), 4);
        assert_eq!(socket.get_databytes(), 96);
        assert_eq!(socket.get_datatype_string(), "f32");
        assert!(socket.has_datatype::<f32>());
        assert!(!socket.has_datatype::<f64>());
        assert!(!socket.is_bound());
        assert_eq!(socket.data::<f32>().unwrap(), [0.0; 24]);
    }

    #[test]
    fn test_bind() {
        let mut socket = Socket::new::<i32>("U_K", Direction::In, 2, 2);
        // Invalid inputs
        assert!(socket.bind(&[1, 0, 1]).is_err());
        assert!(socket.bind(&[1_i8, 0, 1, 1]).is_err());
        assert!(!socket.is_bound());
        // Valid input
        socket.bind(&[1, 0, 1, 1]).unwrap();
        assert!(socket.is_bound());
        assert_eq!(socket.data::<i32>().unwrap(), [1, 0, 1, 1]);
        assert!(socket.data::<u32>().is_err());
    }

    #[test]
    fn test_read_frames_into() {
        let mut socket = Socket::new::<u8>("V_K", Direction::Out, 2, 3);
        socket
            .data_mut::<u8>()
            .unwrap()
            .copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let mut out = [0_u8; 6];
        socket.read_frames_into(&mut out, Frames::One(1)).unwrap();
        assert_eq!(out, [0, 0, 3, 4, 0, 0]);
        socket.read_frames_into(&mut out, Frames::All).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
        assert!(socket.read_frames_into(&mut out, Frames::One(3)).is_err());
        assert!(socket.read_frames_into(&mut out[.. 4], Frames::All).is_err());
    }

    #[test]
    fn test_set_n_frames() {
        let mut socket = Socket::new::<f64>("Y_N", Direction::InOut, 4, 1);
        socket.bind(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        socket.set_n_frames(3);
        assert_eq!(socket.get_n_elmts(), 12);
        assert!(!socket.is_bound());
        assert_eq!(socket.data::<f64>().unwrap(), [0.0; 12]);
    }

    #[test]
    fn test_buffer_copy_from() {
        let mut dst: Box<dyn Buffer> = Box::new(vec![0_i16; 4]);
        let src: Box<dyn Buffer> = Box::new(vec![7_i16, 8, 9]);
        dst.copy_from(1, &*src, 1 .. 3).unwrap();
        assert_eq!(dst.as_any().downcast_ref::<Vec<i16>>().unwrap(), &[0, 8, 9, 0]);
        let wrong: Box<dyn Buffer> = Box::new(vec![1.0_f32]);
        assert!(dst.copy_from(0, &*wrong, 0 .. 1).is_err());
        dst.fill_default(0 .. 2);
        assert_eq!(dst.as_any().downcast_ref::<Vec<i16>>().unwrap(), &[0, 0, 9, 0]);
        assert_eq!(dst.empty_like().n_elmts(), 0);
    }
}
