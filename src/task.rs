//! Tasks: an ordered set of sockets plus one executable codelet
//!
//! A task is executed over the frame batch of its module one wave at a time. The codelet sees a
//! [`Wave`], a view of every socket restricted to the `n_frames_per_wave` frames of the current
//! wave, and returns a [`Status`].
//!
//! With managed memory, a trailing partial wave, or a single frame selected inside a wave of
//! several frames, is staged through wave-sized scratch buffers owned by the task: the scratch
//! buffers are zero-filled, the valid frames are copied in, the codelet runs on the whole wave,
//! and only the valid frames of the outputs are copied back. Frames outside the batch are never
//! read or written.

use std::fmt;
use std::ops::{Index, IndexMut, Range};
use std::time::{Duration, Instant};

use crate::socket::{Buffer, Direction, Element, Socket};
use crate::{Error, Framing, SocketKind};

/// Status code returned by a task execution
///
/// Within one wave, bit `i` is set if lane `i` (frame `first_frame + i`) failed. Statuses of
/// successive waves are combined by shifting left by the number of frames per wave.
pub type Status = u32;

/// Status of a successful execution
pub const SUCCESS: Status = 0;

/// Status of a frame whose processing must stop (e.g., CRC mismatch)
pub const FAILURE_STOP: Status = 1;

/// Selection of the frames processed by one task execution
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy)]
pub enum Frames {
    /// Every frame of the batch
    All,
    /// A single frame of the batch
    One(usize),
}

/// Codelet of a task: runs the task body on one wave of the module state `S`.
pub type Codelet<S> = fn(&mut S, &mut Wave<'_>, &mut Timers) -> Result<Status, Error>;

/// Accumulator of wall-clock durations
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Timer {
    /// Timer name
    name: &'static str,
    /// Number of recorded durations
    n_calls: u64,
    /// Sum of recorded durations
    total: Duration,
    /// Shortest recorded duration
    min: Duration,
    /// Longest recorded duration
    max: Duration,
}

impl Timer {
    /// Returns timer with no recorded duration.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            n_calls: 0,
            total: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
        }
    }

    /// Records one duration.
    pub fn record(&mut self, duration: Duration) {
        self.n_calls += 1;
        self.total += duration;
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
    }

    /// Adds a duration to the total without counting a call, for work shared by calls already
    /// recorded.
    pub fn add(&mut self, duration: Duration) {
        self.total += duration;
    }

    /// Forgets every recorded duration.
    pub fn reset(&mut self) {
        *self = Self::new(self.name);
    }

    /// Returns the timer name.
    #[must_use]
    pub fn get_name(&self) -> &'static str {
        self.name
    }

    /// Returns the number of recorded durations.
    #[must_use]
    pub fn get_n_calls(&self) -> u64 {
        self.n_calls
    }

    /// Returns the sum of recorded durations.
    #[must_use]
    pub fn get_total(&self) -> Duration {
        self.total
    }

    /// Returns the shortest recorded duration (zero if nothing was recorded).
    #[must_use]
    pub fn get_min(&self) -> Duration {
        if self.n_calls == 0 {
            Duration::ZERO
        } else {
            self.min
        }
    }

    /// Returns the longest recorded duration.
    #[must_use]
    pub fn get_max(&self) -> Duration {
        self.max
    }

    /// Returns the average recorded duration (zero if nothing was recorded).
    #[must_use]
    pub fn get_average(&self) -> Duration {
        match u32::try_from(self.n_calls) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / 2f64.powi(32)),
        }
    }
}

/// Named timers of a task
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Timers(Vec<Timer>);

impl Timers {
    /// Registers a new timer.
    ///
    /// # Errors
    ///
    /// Returns an error if a timer with the same name is already registered.
    pub fn register(&mut self, name: &'static str) -> Result<(), Error> {
        if self.get(name).is_some() {
            return Err(Error::InvalidInput(format!(
                "Timer '{name}' is already registered"
            )));
        }
        self.0.push(Timer::new(name));
        Ok(())
    }

    /// Records a duration in the named timer. Durations for names that were never registered
    /// are discarded.
    pub fn record(&mut self, name: &str, duration: Duration) {
        if let Some(timer) = self.0.iter_mut().find(|t| t.name == name) {
            timer.record(duration);
        }
    }

    /// Adds a duration to the total of the named timer without counting a call.
    pub fn add(&mut self, name: &str, duration: Duration) {
        if let Some(timer) = self.0.iter_mut().find(|t| t.name == name) {
            timer.add(duration);
        }
    }

    /// Runs `f` and records its duration in the named timer.
    pub fn time<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(name, start.elapsed());
        out
    }

    /// Returns the named timer.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Timer> {
        self.0.iter().find(|t| t.name == name)
    }

    /// Returns an iterator over all timers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.0.iter()
    }

    /// Forgets every recorded duration.
    pub fn reset(&mut self) {
        self.0.iter_mut().for_each(Timer::reset);
    }
}

/// View of one socket restricted to one wave
#[derive(Debug)]
struct Slot<'a> {
    /// Socket name
    name: &'static str,
    /// Storage holding the wave
    buf: &'a mut dyn Buffer,
    /// Element range of the wave within `buf`
    range: Range<usize>,
}

impl Slot<'_> {
    /// Returns the wave elements.
    fn typed<T: Element>(&self) -> Result<&[T], Error> {
        let range = self.range.clone();
        self.buf
            .as_any()
            .downcast_ref::<Vec<T>>()
            .map(|v| &v[range])
            .ok_or_else(|| slot_type_mismatch::<T>(self.name))
    }

    /// Returns the mutable wave elements.
    fn typed_mut<T: Element>(&mut self) -> Result<&mut [T], Error> {
        let name = self.name;
        let range = self.range.clone();
        self.buf
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
            .map(|v| &mut v[range])
            .ok_or_else(|| slot_type_mismatch::<T>(name))
    }
}

/// Returns error for access to a socket with wrong element type.
fn slot_type_mismatch<T>(name: &str) -> Error {
    Error::InvalidInput(format!(
        "Socket '{name}' does not carry elements of type {}",
        std::any::type_name::<T>()
    ))
}

/// Sockets of a task restricted to the frames of one wave, as seen by a codelet
#[derive(Debug)]
pub struct Wave<'a> {
    /// Index of the first frame of the wave in the batch
    first_frame: usize,
    /// Number of frames (lanes) in the wave
    n_lanes: usize,
    /// Lanes holding frames of the batch (the others are zero padding)
    valid_lanes: Range<usize>,
    /// One view per socket, in declaration order
    slots: Vec<Slot<'a>>,
}

impl Wave<'_> {
    /// Returns the index of the first frame of the wave in the batch.
    #[must_use]
    pub fn first_frame(&self) -> usize {
        self.first_frame
    }

    /// Returns the number of frames (lanes) in the wave.
    #[must_use]
    pub fn n_lanes(&self) -> usize {
        self.n_lanes
    }

    /// Returns the lanes that hold frames of the batch.
    ///
    /// A staged wave (trailing partial wave, or a single frame selected inside a wave) is padded
    /// with zeros: lane `l` holds frame `first_frame() + l` only if `l` is in this range, and
    /// `first_frame() + l` is then always below the number of frames of the batch.
    #[must_use]
    pub fn valid_lanes(&self) -> Range<usize> {
        self.valid_lanes.clone()
    }

    /// Returns the wave elements of a socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket does not belong to the task or does not carry elements of
    /// type `T`.
    pub fn input<T: Element>(&self, socket: impl SocketKind) -> Result<&[T], Error> {
        self.slot_index(socket)?;
        self.slots[socket.index()].typed()
    }

    /// Returns the mutable wave elements of a socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket does not belong to the task or does not carry elements of
    /// type `T`.
    pub fn output<T: Element>(&mut self, socket: impl SocketKind) -> Result<&mut [T], Error> {
        self.slot_index(socket)?;
        self.slots[socket.index()].typed_mut()
    }

    /// Returns the wave elements of one socket and the mutable wave elements of another.
    ///
    /// # Errors
    ///
    /// Returns an error if the sockets are the same, do not belong to the task, or carry elements
    /// of other types.
    pub fn split<I: Element, O: Element>(
        &mut self,
        input: impl SocketKind,
        output: impl SocketKind,
    ) -> Result<(&[I], &mut [O]), Error> {
        let i = self.slot_index(input)?;
        let o = self.slot_index(output)?;
        let mut in_slot = None;
        let mut out_slot = None;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if idx == i {
                in_slot = Some(&*slot);
            } else if idx == o {
                out_slot = Some(slot);
            }
        }
        match (in_slot, out_slot) {
            (Some(a), Some(b)) => Ok((a.typed()?, b.typed_mut()?)),
            _ => Err(Error::InvalidInput(format!(
                "Sockets {input:?} and {output:?} cannot be split"
            ))),
        }
    }

    /// Returns the wave elements of two sockets and the mutable wave elements of a third.
    ///
    /// # Errors
    ///
    /// Returns an error if the sockets are not distinct, do not belong to the task, or carry
    /// elements of other types.
    pub fn split3<I1: Element, I2: Element, O: Element>(
        &mut self,
        input1: impl SocketKind,
        input2: impl SocketKind,
        output: impl SocketKind,
    ) -> Result<(&[I1], &[I2], &mut [O]), Error> {
        let i1 = self.slot_index(input1)?;
        let i2 = self.slot_index(input2)?;
        let o = self.slot_index(output)?;
        let mut in1_slot = None;
        let mut in2_slot = None;
        let mut out_slot = None;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if idx == i1 {
                in1_slot = Some(&*slot);
            } else if idx == i2 {
                in2_slot = Some(&*slot);
            } else if idx == o {
                out_slot = Some(slot);
            }
        }
        match (in1_slot, in2_slot, out_slot) {
            (Some(a), Some(b), Some(c)) => Ok((a.typed()?, b.typed()?, c.typed_mut()?)),
            _ => Err(Error::InvalidInput(format!(
                "Sockets {input1:?}, {input2:?} and {output:?} cannot be split"
            ))),
        }
    }

    /// Returns the slot index of a socket, checking that it belongs to the task.
    fn slot_index(&self, socket: impl SocketKind) -> Result<usize, Error> {
        match self.slots.get(socket.index()) {
            Some(slot) if slot.name == socket.name() => Ok(socket.index()),
            _ => Err(Error::InvalidInput(format!(
                "Socket {socket:?} does not belong to the executed task"
            ))),
        }
    }
}

/// Operation with its sockets, codelet and timers
pub struct Task<S> {
    /// Task name
    name: &'static str,
    /// Small integer identifier (creation order within the module)
    id: usize,
    /// Sockets, in declaration order
    sockets: Vec<Socket>,
    /// Wave-sized scratch buffer for each socket
    scratch: Vec<Box<dyn Buffer>>,
    /// Task body
    codelet: Option<Codelet<S>>,
    /// Named timers updated by the codelet
    timers: Timers,
    /// Durations of whole executions
    exec_timer: Timer,
}

impl<S> fmt::Debug for Task<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("sockets", &self.sockets)
            .field("has_codelet", &self.codelet.is_some())
            .field("timers", &self.timers)
            .field("exec_timer", &self.exec_timer)
            .finish_non_exhaustive()
    }
}

impl<S> Task<S> {
    /// Returns task with no socket and no codelet.
    pub(crate) fn new(name: &'static str, id: usize) -> Self {
        Self {
            name,
            id,
            sockets: Vec::new(),
            scratch: Vec::new(),
            codelet: None,
            timers: Timers::default(),
            exec_timer: Timer::new(name),
        }
    }

    /// Appends a socket and its scratch buffer, and returns the socket index.
    pub(crate) fn create_socket<T: Element>(
        &mut self,
        name: &'static str,
        direction: Direction,
        width: usize,
        framing: &Framing,
    ) -> usize {
        let socket = Socket::new::<T>(name, direction, width, framing.get_n_frames());
        let mut scratch = socket.data.empty_like();
        scratch.resize_elmts(width * framing.get_n_frames_per_wave());
        self.sockets.push(socket);
        self.scratch.push(scratch);
        self.sockets.len() - 1
    }

    /// Attaches the codelet.
    pub(crate) fn set_codelet(&mut self, codelet: Codelet<S>) {
        self.codelet = Some(codelet);
    }

    /// Re-declares socket storage for a new number of frames.
    pub(crate) fn set_n_frames(&mut self, n_frames: usize) {
        self.sockets
            .iter_mut()
            .for_each(|socket| socket.set_n_frames(n_frames));
    }

    /// Resizes the scratch buffers for a new number of frames per wave.
    pub(crate) fn set_n_frames_per_wave(&mut self, n_frames_per_wave: usize) {
        for (socket, scratch) in self.sockets.iter().zip(self.scratch.iter_mut()) {
            scratch.resize_elmts(socket.get_width() * n_frames_per_wave);
        }
    }

    /// Registers a named timer that the codelet may update.
    ///
    /// # Errors
    ///
    /// Returns an error if a timer with the same name is already registered.
    pub fn register_timer(&mut self, name: &'static str) -> Result<(), Error> {
        self.timers.register(name)
    }

    /// Returns the task name.
    #[must_use]
    pub fn get_name(&self) -> &'static str {
        self.name
    }

    /// Returns the task identifier.
    #[must_use]
    pub fn get_id(&self) -> usize {
        self.id
    }

    /// Returns `true` if a codelet is attached.
    #[must_use]
    pub fn has_codelet(&self) -> bool {
        self.codelet.is_some()
    }

    /// Returns the sockets, in declaration order.
    #[must_use]
    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    /// Returns the socket of the given kind, if it belongs to this task.
    #[must_use]
    pub fn socket<K: SocketKind>(&self, socket: K) -> Option<&Socket> {
        self.sockets
            .get(socket.index())
            .filter(|s| s.get_name() == socket.name())
    }

    /// Returns the mutable socket of the given kind, if it belongs to this task.
    pub fn socket_mut<K: SocketKind>(&mut self, socket: K) -> Option<&mut Socket> {
        self.sockets
            .get_mut(socket.index())
            .filter(|s| s.get_name() == socket.name())
    }

    /// Returns the named timers.
    #[must_use]
    pub fn get_timers(&self) -> &Timers {
        &self.timers
    }

    /// Returns the timer of whole executions.
    #[must_use]
    pub fn get_exec_timer(&self) -> &Timer {
        &self.exec_timer
    }

    /// Forgets every recorded duration.
    pub fn reset_stats(&mut self) {
        self.timers.reset();
        self.exec_timer.reset();
    }

    /// Executes the codelet over the selected frames.
    ///
    /// # Parameters
    ///
    /// - `state`: Module state handed to the codelet.
    ///
    /// - `framing`: Frame batching parameters of the module.
    ///
    /// - `frames`: Frames to be processed.
    ///
    /// - `managed_memory`: Whether the task may stage partial waves and single frames through its
    ///   own scratch buffers. If `false`, requests that need staging are rejected.
    ///
    /// # Returns
    ///
    /// - `status`: Aggregated status of all processed waves, masked to the valid bits of the
    ///   module.
    ///
    /// # Errors
    ///
    /// Returns an error if no codelet is attached, if the selected frame is out of range, if an
    /// input socket is not bound, if staging is needed without managed memory, or if the codelet
    /// fails.
    pub fn exec(
        &mut self,
        state: &mut S,
        framing: &Framing,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error> {
        let codelet = self.codelet.ok_or_else(|| {
            Error::Unimplemented(format!("Task '{}' has no codelet", self.name))
        })?;
        framing.check_frames(frames)?;
        if let Some(socket) = self
            .sockets
            .iter()
            .find(|s| s.get_direction().is_input() && !s.is_bound())
        {
            return Err(Error::UnboundSocket {
                task: self.name.to_string(),
                socket: socket.get_name().to_string(),
            });
        }
        let start = Instant::now();
        let result = self.exec_waves(state, codelet, framing, frames, managed_memory);
        self.exec_timer.record(start.elapsed());
        result.map(|status| status & framing.status_mask())
    }

    /// Runs the codelet once per wave covering the selected frames.
    fn exec_waves(
        &mut self,
        state: &mut S,
        codelet: Codelet<S>,
        framing: &Framing,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error> {
        let n_lanes = framing.get_n_frames_per_wave();
        match frames {
            Frames::All => {
                let shift = u32::try_from(n_lanes).unwrap_or(u32::MAX);
                let mut status = SUCCESS;
                for wave in 0 .. framing.get_n_waves() {
                    let n_valid = framing.n_frames_in_wave(wave);
                    let wave_status = if n_valid == n_lanes {
                        self.run_in_place(state, codelet, wave, n_lanes)?
                    } else {
                        self.check_managed(managed_memory, "a partial wave")?;
                        self.run_staged(state, codelet, wave, n_lanes, 0 .. n_valid)?
                    };
                    status = status.checked_shl(shift).unwrap_or(SUCCESS)
                        | lane_status(wave_status, n_lanes, 0 .. n_valid);
                }
                Ok(status)
            }
            Frames::One(frame) => {
                let wave = frame / n_lanes;
                let lane = frame % n_lanes;
                let wave_status = if n_lanes == 1 {
                    self.run_in_place(state, codelet, wave, n_lanes)?
                } else {
                    self.check_managed(managed_memory, "a frame inside a wave")?;
                    self.run_staged(state, codelet, wave, n_lanes, lane .. lane + 1)?
                };
                Ok(lane_status(wave_status, n_lanes, lane .. lane + 1) >> lane)
            }
        }
    }

    /// Runs the codelet directly on the socket storage of a full wave.
    fn run_in_place(
        &mut self,
        state: &mut S,
        codelet: Codelet<S>,
        wave: usize,
        n_lanes: usize,
    ) -> Result<Status, Error> {
        let first_frame = wave * n_lanes;
        let slots = self
            .sockets
            .iter_mut()
            .map(|socket| {
                let width = socket.get_width();
                Slot {
                    name: socket.get_name(),
                    range: first_frame * width .. (first_frame + n_lanes) * width,
                    buf: &mut *socket.data,
                }
            })
            .collect();
        let mut io = Wave {
            first_frame,
            n_lanes,
            valid_lanes: 0 .. n_lanes,
            slots,
        };
        codelet(state, &mut io, &mut self.timers)
    }

    /// Runs the codelet on the scratch buffers, with only the given lanes of the wave loaded
    /// from, and stored back to, the socket storage.
    fn run_staged(
        &mut self,
        state: &mut S,
        codelet: Codelet<S>,
        wave: usize,
        n_lanes: usize,
        lanes: Range<usize>,
    ) -> Result<Status, Error> {
        let first_frame = wave * n_lanes;
        // Load
        for (socket, scratch) in self.sockets.iter().zip(self.scratch.iter_mut()) {
            let width = socket.get_width();
            scratch.fill_default(0 .. width * n_lanes);
            if socket.get_direction().is_input() {
                scratch.copy_from(
                    lanes.start * width,
                    &*socket.data,
                    (first_frame + lanes.start) * width .. (first_frame + lanes.end) * width,
                )?;
            }
        }
        // Run
        let status = {
            let slots = self
                .sockets
                .iter()
                .zip(self.scratch.iter_mut())
                .map(|(socket, scratch)| Slot {
                    name: socket.get_name(),
                    range: 0 .. socket.get_width() * n_lanes,
                    buf: &mut **scratch,
                })
                .collect();
            let mut io = Wave {
                first_frame,
                n_lanes,
                valid_lanes: lanes.clone(),
                slots,
            };
            codelet(state, &mut io, &mut self.timers)?
        };
        // Store
        for (socket, scratch) in self.sockets.iter_mut().zip(self.scratch.iter()) {
            if socket.get_direction().is_output() {
                let width = socket.get_width();
                socket.data.copy_from(
                    (first_frame + lanes.start) * width,
                    &**scratch,
                    lanes.start * width .. lanes.end * width,
                )?;
            }
        }
        Ok(status)
    }

    /// Rejects staging when memory is not managed by the task.
    fn check_managed(&self, managed_memory: bool, what: &str) -> Result<(), Error> {
        if managed_memory {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "Task '{}' needs managed memory to process {what}",
                self.name
            )))
        }
    }
}

impl<S, K: SocketKind> Index<K> for Task<S> {
    type Output = Socket;

    fn index(&self, socket: K) -> &Socket {
        self.socket(socket)
            .unwrap_or_else(|| panic!("Socket {socket:?} does not belong to task '{}'", self.name))
    }
}

impl<S, K: SocketKind> IndexMut<K> for Task<S> {
    fn index_mut(&mut self, socket: K) -> &mut Socket {
        let name = self.name;
        self.socket_mut(socket)
            .unwrap_or_else(|| panic!("Socket {socket:?} does not belong to task '{name}'"))
    }
}

/// Returns the wave status with only the failure bit of a lane set.
#[must_use]
pub fn lane_bit(lane: usize) -> Status {
    u32::try_from(lane)
        .ok()
        .and_then(|l| FAILURE_STOP.checked_shl(l))
        .unwrap_or(SUCCESS)
}

/// Returns the failure bits of the given lanes in a wave status.
fn lane_status(status: Status, n_lanes: usize, lanes: Range<usize>) -> Status {
    if n_lanes == 1 {
        Status::from(status != SUCCESS)
    } else {
        status & lanes.fold(SUCCESS, |mask, lane| mask | lane_bit(lane))
    }
}
