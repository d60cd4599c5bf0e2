//! Modules: named collections of tasks sharing one frame batch
//!
//! A module owns its tasks, addressed by a closed enumeration of task kinds, and the framing of
//! the batch its sockets are sized for. Concrete modules (CRC, encoders, decoders) wrap a
//! [`Module`] together with their algorithm state and expose it through the [`Modular`] trait.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::{Index, IndexMut};

use tracing::debug;

use crate::socket::{Direction, Element, Socket};
use crate::task::{Codelet, Frames, Status, Task};
use crate::Error;

/// Frame batching parameters of a module
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy)]
pub struct Framing {
    /// Number of frames processed per call
    n_frames: usize,
    /// Number of frames packed into one wave
    n_frames_per_wave: usize,
    /// Number of waves (`ceil(n_frames / n_frames_per_wave)`)
    n_waves: usize,
    /// Number of frames in the trailing partial wave (`0` if there is none)
    n_frames_per_wave_rest: usize,
}

impl Framing {
    /// Returns framing for a batch of frames.
    ///
    /// # Parameters
    ///
    /// - `n_frames`: Number of frames processed per call.
    ///
    /// - `n_frames_per_wave`: Number of frames packed into one wave.
    ///
    /// # Errors
    ///
    /// Returns an error if either parameter is `0`.
    ///
    /// # Examples
    /// ```
    /// use fecflow::Framing;
    ///
    /// let framing = Framing::new(5, 2)?;
    /// assert_eq!(framing.get_n_waves(), 3);
    /// assert_eq!(framing.get_n_frames_per_wave_rest(), 1);
    /// assert!(!framing.is_single_wave());
    /// # Ok::<(), fecflow::Error>(())
    /// ```
    pub fn new(n_frames: usize, n_frames_per_wave: usize) -> Result<Self, Error> {
        if n_frames == 0 || n_frames_per_wave == 0 {
            return Err(Error::InvalidInput(format!(
                "Number of frames ({n_frames}) and number of frames per wave \
                ({n_frames_per_wave}) must be positive"
            )));
        }
        Ok(Self {
            n_frames,
            n_frames_per_wave,
            n_waves: n_frames.div_ceil(n_frames_per_wave),
            n_frames_per_wave_rest: n_frames % n_frames_per_wave,
        })
    }

    /// Returns the number of frames processed per call.
    #[must_use]
    pub fn get_n_frames(&self) -> usize {
        self.n_frames
    }

    /// Returns the number of frames packed into one wave.
    #[must_use]
    pub fn get_n_frames_per_wave(&self) -> usize {
        self.n_frames_per_wave
    }

    /// Returns the number of waves.
    #[must_use]
    pub fn get_n_waves(&self) -> usize {
        self.n_waves
    }

    /// Returns the number of frames in the trailing partial wave (`0` if there is none).
    #[must_use]
    pub fn get_n_frames_per_wave_rest(&self) -> usize {
        self.n_frames_per_wave_rest
    }

    /// Returns `true` if the batch fits in one wave.
    #[must_use]
    pub fn is_single_wave(&self) -> bool {
        self.n_waves == 1
    }

    /// Returns the number of valid frames in a wave.
    #[must_use]
    pub fn n_frames_in_wave(&self, wave: usize) -> usize {
        if wave + 1 == self.n_waves && self.n_frames_per_wave_rest != 0 {
            self.n_frames_per_wave_rest
        } else {
            self.n_frames_per_wave
        }
    }

    /// Returns the mask of the status bits that an execution over all frames can set.
    #[must_use]
    pub fn status_mask(&self) -> Status {
        match u32::try_from(self.n_waves * self.n_frames_per_wave) {
            Ok(n_bits) if n_bits < Status::BITS => (1 << n_bits) - 1,
            _ => Status::MAX,
        }
    }

    /// Checks that a frame selection is within the batch.
    ///
    /// # Errors
    ///
    /// Returns an error if a single frame at or beyond `n_frames` is selected.
    pub fn check_frames(&self, frames: Frames) -> Result<(), Error> {
        match frames {
            Frames::One(frame) if frame >= self.n_frames => Err(Error::InvalidInput(format!(
                "Frame index {frame} must be less than the number of frames ({})",
                self.n_frames
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            n_frames: 1,
            n_frames_per_wave: 1,
            n_waves: 1,
            n_frames_per_wave_rest: 0,
        }
    }
}

/// Closed enumeration of the tasks of a module
pub trait TaskKind: Copy + Ord + Debug + Send + Sync + 'static {
    /// Returns the task name.
    fn name(self) -> &'static str;
}

/// Closed enumeration of the sockets of one task
pub trait SocketKind: Copy + Debug {
    /// Kind of the tasks owning these sockets
    type Task: TaskKind;

    /// Returns the owning task.
    fn task(self) -> Self::Task;

    /// Returns the position of the socket within its task.
    fn index(self) -> usize;

    /// Returns the socket name.
    fn name(self) -> &'static str;
}

/// Declares an enumeration of the sockets of one task, with explicit positions and names.
///
/// The visibility written before the enumeration name is applied to the enumeration.
macro_rules! socket_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident for $task:path : $task_ty:ty {
            $($(#[$vmeta:meta])* $variant:ident = ($idx:expr, $sname:expr)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Eq, Hash, PartialEq, Debug, Copy)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::SocketKind for $name {
            type Task = $task_ty;

            fn task(self) -> $task_ty {
                $task
            }

            fn index(self) -> usize {
                match self {
                    $(Self::$variant => $idx),+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $sname),+
                }
            }
        }
    };
}

pub(crate) use socket_kinds;

/// Named collection of tasks sharing one frame batch
#[derive(Debug)]
pub struct Module<T: TaskKind, S> {
    /// Module name
    name: String,
    /// Short name
    short_name: String,
    /// Frame batching parameters
    framing: Framing,
    /// Tasks by kind
    tasks: BTreeMap<T, Task<S>>,
}

impl<T: TaskKind, S> Module<T, S> {
    /// Returns module with no task.
    #[must_use]
    pub fn new(name: &str, framing: Framing) -> Self {
        Self {
            name: name.to_string(),
            short_name: name.to_string(),
            framing,
            tasks: BTreeMap::new(),
        }
    }

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task already exists.
    pub fn create_task(&mut self, kind: T) -> Result<&mut Task<S>, Error> {
        if self.tasks.contains_key(&kind) {
            return Err(Error::InvalidInput(format!(
                "Task '{}' already exists in module '{}'",
                kind.name(),
                self.name
            )));
        }
        let id = self.tasks.len();
        Ok(self.tasks.entry(kind).or_insert(Task::new(kind.name(), id)))
    }

    /// Creates an input socket of `n_elmts` elements per frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the owning task does not exist, if the socket is not declared in
    /// enumeration order, or if `n_elmts` is `0`.
    pub fn create_socket_in<E: Element, K: SocketKind<Task = T>>(
        &mut self,
        socket: K,
        n_elmts: usize,
    ) -> Result<(), Error> {
        self.create_socket::<E, K>(socket, Direction::In, n_elmts)
    }

    /// Creates an output socket of `n_elmts` elements per frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the owning task does not exist, if the socket is not declared in
    /// enumeration order, or if `n_elmts` is `0`.
    pub fn create_socket_out<E: Element, K: SocketKind<Task = T>>(
        &mut self,
        socket: K,
        n_elmts: usize,
    ) -> Result<(), Error> {
        self.create_socket::<E, K>(socket, Direction::Out, n_elmts)
    }

    /// Creates an input/output socket of `n_elmts` elements per frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the owning task does not exist, if the socket is not declared in
    /// enumeration order, or if `n_elmts` is `0`.
    pub fn create_socket_in_out<E: Element, K: SocketKind<Task = T>>(
        &mut self,
        socket: K,
        n_elmts: usize,
    ) -> Result<(), Error> {
        self.create_socket::<E, K>(socket, Direction::InOut, n_elmts)
    }

    /// Creates a socket sized for the whole frame batch.
    fn create_socket<E: Element, K: SocketKind<Task = T>>(
        &mut self,
        socket: K,
        direction: Direction,
        n_elmts: usize,
    ) -> Result<(), Error> {
        if n_elmts == 0 {
            return Err(Error::InvalidInput(format!(
                "Socket '{}' must have a positive number of elements per frame",
                socket.name()
            )));
        }
        let framing = self.framing;
        let task = self.task_mut(socket.task())?;
        if socket.index() != task.sockets().len() {
            return Err(Error::InvalidInput(format!(
                "Socket '{}' of task '{}' must be declared at position {}, not {}",
                socket.name(),
                task.get_name(),
                socket.index(),
                task.sockets().len()
            )));
        }
        task.create_socket::<E>(socket.name(), direction, n_elmts, &framing);
        Ok(())
    }

    /// Attaches the codelet of a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist.
    pub fn create_codelet(&mut self, kind: T, codelet: Codelet<S>) -> Result<(), Error> {
        self.task_mut(kind)?.set_codelet(codelet);
        Ok(())
    }

    /// Registers a named timer on a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist or already has the timer.
    pub fn register_timer(&mut self, kind: T, name: &'static str) -> Result<(), Error> {
        self.task_mut(kind)?.register_timer(name)
    }

    /// Checks that every required task exists and has a codelet.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first incomplete task.
    pub fn check_complete(&self, required: &[T]) -> Result<(), Error> {
        match required
            .iter()
            .find(|&&kind| !self.tasks.get(&kind).is_some_and(Task::has_codelet))
        {
            Some(kind) => Err(Error::Unimplemented(format!(
                "Task '{}' of module '{}' has no codelet",
                kind.name(),
                self.name
            ))),
            None => Ok(()),
        }
    }

    /// Returns the module name.
    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Sets the module name.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Returns the module short name.
    #[must_use]
    pub fn get_short_name(&self) -> &str {
        &self.short_name
    }

    /// Sets the module short name.
    pub fn set_short_name(&mut self, short_name: &str) {
        self.short_name = short_name.to_string();
    }

    /// Returns the frame batching parameters.
    #[must_use]
    pub fn get_framing(&self) -> Framing {
        self.framing
    }

    /// Returns the number of frames processed per call.
    #[must_use]
    pub fn get_n_frames(&self) -> usize {
        self.framing.get_n_frames()
    }

    /// Returns the number of frames packed into one wave.
    #[must_use]
    pub fn get_n_frames_per_wave(&self) -> usize {
        self.framing.get_n_frames_per_wave()
    }

    /// Returns the number of waves.
    #[must_use]
    pub fn get_n_waves(&self) -> usize {
        self.framing.get_n_waves()
    }

    /// Returns the number of frames in the trailing partial wave.
    #[must_use]
    pub fn get_n_frames_per_wave_rest(&self) -> usize {
        self.framing.get_n_frames_per_wave_rest()
    }

    /// Returns `true` if the batch fits in one wave.
    #[must_use]
    pub fn is_single_wave(&self) -> bool {
        self.framing.is_single_wave()
    }

    /// Returns an iterator over the tasks, in kind order.
    pub fn tasks(&self) -> impl Iterator<Item = (&T, &Task<S>)> {
        self.tasks.iter()
    }

    /// Returns a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist.
    pub fn task(&self, kind: T) -> Result<&Task<S>, Error> {
        self.tasks
            .get(&kind)
            .ok_or_else(|| missing_task(&self.name, kind))
    }

    /// Returns a mutable task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist.
    pub fn task_mut(&mut self, kind: T) -> Result<&mut Task<S>, Error> {
        let name = &self.name;
        self.tasks
            .get_mut(&kind)
            .ok_or_else(|| missing_task(name, kind))
    }

    /// Returns a socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket was never created.
    pub fn socket<K: SocketKind<Task = T>>(&self, socket: K) -> Result<&Socket, Error> {
        self.task(socket.task())?
            .socket(socket)
            .ok_or_else(|| missing_socket(socket))
    }

    /// Returns a mutable socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket was never created.
    pub fn socket_mut<K: SocketKind<Task = T>>(&mut self, socket: K) -> Result<&mut Socket, Error> {
        self.task_mut(socket.task())?
            .socket_mut(socket)
            .ok_or_else(|| missing_socket(socket))
    }

    /// Executes a task over the selected frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist or its execution fails (see [`Task::exec`]).
    pub fn exec(
        &mut self,
        state: &mut S,
        kind: T,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error> {
        let framing = self.framing;
        self.task_mut(kind)?
            .exec(state, &framing, frames, managed_memory)
    }

    /// Changes the number of frames; every socket is re-declared (and unbound).
    ///
    /// # Errors
    ///
    /// Returns an error if `n_frames` is `0`.
    pub fn set_n_frames(&mut self, n_frames: usize) -> Result<(), Error> {
        self.framing = Framing::new(n_frames, self.framing.get_n_frames_per_wave())?;
        self.tasks
            .values_mut()
            .for_each(|task| task.set_n_frames(n_frames));
        debug!(module = %self.name, n_frames, "Resized sockets");
        Ok(())
    }

    /// Changes the number of frames per wave; task scratch buffers are resized to one wave.
    ///
    /// # Errors
    ///
    /// Returns an error if `n_frames_per_wave` is `0`.
    pub fn set_n_frames_per_wave(&mut self, n_frames_per_wave: usize) -> Result<(), Error> {
        self.framing = Framing::new(self.framing.get_n_frames(), n_frames_per_wave)?;
        self.tasks
            .values_mut()
            .for_each(|task| task.set_n_frames_per_wave(n_frames_per_wave));
        debug!(module = %self.name, n_frames_per_wave, "Resized wave scratch buffers");
        Ok(())
    }

    /// Forgets every recorded duration of every task.
    pub fn reset_stats(&mut self) {
        self.tasks.values_mut().for_each(Task::reset_stats);
    }
}

/// Returns error for access to a task that was never created.
fn missing_task<T: TaskKind>(module: &str, kind: T) -> Error {
    Error::Unimplemented(format!("Module '{module}' has no task '{}'", kind.name()))
}

/// Returns error for access to a socket that was never created.
fn missing_socket<K: SocketKind>(socket: K) -> Error {
    Error::Unimplemented(format!(
        "Task '{}' has no socket '{}'",
        socket.task().name(),
        socket.name()
    ))
}

impl<T: TaskKind, S> Index<T> for Module<T, S> {
    type Output = Task<S>;

    fn index(&self, kind: T) -> &Task<S> {
        self.tasks
            .get(&kind)
            .unwrap_or_else(|| panic!("Module '{}' has no task '{}'", self.name, kind.name()))
    }
}

impl<T: TaskKind, S> IndexMut<T> for Module<T, S> {
    fn index_mut(&mut self, kind: T) -> &mut Task<S> {
        let name = &self.name;
        self.tasks
            .get_mut(&kind)
            .unwrap_or_else(|| panic!("Module '{}' has no task '{}'", name, kind.name()))
    }
}

/// Uniform driver view of a concrete module
pub trait Modular {
    /// Task enumeration of the module
    type Task: TaskKind;

    /// Algorithm state handed to the codelets
    type State;

    /// Returns the underlying module.
    fn module(&self) -> &Module<Self::Task, Self::State>;

    /// Returns the mutable underlying module.
    fn module_mut(&mut self) -> &mut Module<Self::Task, Self::State>;

    /// Executes a task over the selected frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist or its execution fails.
    fn exec(
        &mut self,
        task: Self::Task,
        frames: Frames,
        managed_memory: bool,
    ) -> Result<Status, Error>;

    /// Binds a buffer to a socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket does not exist or rejects the buffer.
    fn bind<E: Element, K: SocketKind<Task = Self::Task>>(
        &mut self,
        socket: K,
        data: &[E],
    ) -> Result<(), Error> {
        self.module_mut().socket_mut(socket)?.bind(data)
    }

    /// Copies the selected frames of a socket into a caller buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket does not exist or rejects the buffer.
    fn read<E: Element, K: SocketKind<Task = Self::Task>>(
        &self,
        socket: K,
        out: &mut [E],
        frames: Frames,
    ) -> Result<(), Error> {
        self.module().socket(socket)?.read_frames_into(out, frames)
    }

    /// Returns the module name.
    fn get_name(&self) -> &str {
        self.module().get_name()
    }

    /// Returns the number of frames processed per call.
    fn get_n_frames(&self) -> usize {
        self.module().get_n_frames()
    }

    /// Returns the number of frames packed into one wave.
    fn get_n_frames_per_wave(&self) -> usize {
        self.module().get_n_frames_per_wave()
    }

    /// Returns the number of waves.
    fn get_n_waves(&self) -> usize {
        self.module().get_n_waves()
    }

    /// Returns `true` if the batch fits in one wave.
    fn is_single_wave(&self) -> bool {
        self.module().is_single_wave()
    }

    /// Forgets every recorded duration.
    fn reset_stats(&mut self) {
        self.module_mut().reset_stats();
    }
}

#[cfg(test)]
mod tests_of_module {
    use super::*;
    use crate::task::{Timers, Wave, SUCCESS};

    #[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash, Debug)]
    enum Tsk {
        Scale,
        Sum,
    }

    impl TaskKind for Tsk {
        fn name(self) -> &'static str {
            match self {
                Tsk::Scale => "scale",
                Tsk::Sum => "sum",
            }
        }
    }

    socket_kinds! {
        /// Sockets of the scale task
        Scale for Tsk::Scale: Tsk {
            /// Values
            X = (0, "X"),
            /// Scaled values
            Y = (1, "Y"),
        }
    }

    socket_kinds! {
        Sum for Tsk::Sum: Tsk {
            A = (0, "A"),
            B = (1, "B"),
            C = (2, "C"),
        }
    }

    fn scale(gain: &mut f64, wave: &mut Wave<'_>, _: &mut Timers) -> Result<Status, Error> {
        let (x, y) = wave.split::<f64, f64>(Scale::X, Scale::Y)?;
        for (a, b) in x.iter().zip(y.iter_mut()) {
            *b = *gain * a;
        }
        Ok(SUCCESS)
    }

    fn sum(_: &mut f64, wave: &mut Wave<'_>, _: &mut Timers) -> Result<Status, Error> {
        let (a, b, c) = wave.split3::<i32, i32, i32>(Sum::A, Sum::B, Sum::C)?;
        for ((a, b), c) in a.iter().zip(b).zip(c.iter_mut()) {
            *c = a + b;
        }
        Ok(SUCCESS)
    }

    fn module() -> Module<Tsk, f64> {
        let mut module = Module::new("Test", Framing::new(2, 1).unwrap());
        module.create_task(Tsk::Scale).unwrap();
        module.create_socket_in::<f64, _>(Scale::X, 3).unwrap();
        module.create_socket_out::<f64, _>(Scale::Y, 3).unwrap();
        module.create_codelet(Tsk::Scale, scale).unwrap();
        module.create_task(Tsk::Sum).unwrap();
        module.create_socket_in::<i32, _>(Sum::A, 1).unwrap();
        module.create_socket_in::<i32, _>(Sum::B, 1).unwrap();
        module.create_socket_out::<i32, _>(Sum::C, 1).unwrap();
        module.create_codelet(Tsk::Sum, sum).unwrap();
        module
    }

    #[test]
    fn test_framing() {
        // Invalid input
        assert!(Framing::new(0, 1).is_err());
        assert!(Framing::new(1, 0).is_err());
        // Valid input
        let framing = Framing::new(7, 3).unwrap();
        assert_eq!(framing.get_n_waves(), 3);
        assert_eq!(framing.get_n_frames_per_wave_rest(), 1);
        assert_eq!(framing.n_frames_in_wave(0), 3);
        assert_eq!(framing.n_frames_in_wave(2), 1);
        assert_eq!(framing.status_mask(), 0x1FF);
        assert!(framing.check_frames(Frames::One(6)).is_ok());
        assert!(framing.check_frames(Frames::One(7)).is_err());
        let framing = Framing::new(4, 4).unwrap();
        assert!(framing.is_single_wave());
        assert_eq!(framing.n_frames_in_wave(0), 4);
        assert_eq!(Framing::new(40, 1).unwrap().status_mask(), u32::MAX);
        assert_eq!(Framing::default(), Framing::new(1, 1).unwrap());
    }

    #[test]
    fn test_create() {
        let mut module = module();
        assert_eq!(module[Tsk::Scale].get_id(), 0);
        assert_eq!(module[Tsk::Sum].get_id(), 1);
        assert_eq!(module[Tsk::Scale][Scale::Y].get_n_elmts(), 6);
        assert_eq!(module.socket(Sum::C).unwrap().get_width(), 1);
        assert!(module.check_complete(&[Tsk::Scale, Tsk::Sum]).is_ok());
        // Invalid declarations
        assert!(module.create_task(Tsk::Sum).is_err());
        assert!(module.create_socket_in::<i32, _>(Sum::B, 1).is_err());
        let mut partial: Module<Tsk, f64> = Module::new("Partial", Framing::default());
        assert!(partial.create_socket_in::<f64, _>(Scale::X, 1).is_err());
        partial.create_task(Tsk::Scale).unwrap();
        assert!(partial.create_socket_in::<f64, _>(Scale::X, 0).is_err());
        assert!(partial.create_socket_out::<f64, _>(Scale::Y, 1).is_err());
        assert!(partial.check_complete(&[Tsk::Scale]).is_err());
        assert!(partial.socket(Sum::A).is_err());
    }

    #[test]
    fn test_exec() {
        let mut module = module();
        let mut gain = 2.0;
        module[Tsk::Scale][Scale::X]
            .bind(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        let status = module
            .exec(&mut gain, Tsk::Scale, Frames::All, true)
            .unwrap();
        assert_eq!(status, SUCCESS);
        assert_eq!(
            module[Tsk::Scale][Scale::Y].data::<f64>().unwrap(),
            [2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
        );
        module.socket_mut(Sum::A).unwrap().bind(&[1, 2]).unwrap();
        module.socket_mut(Sum::B).unwrap().bind(&[10, 20]).unwrap();
        module.exec(&mut gain, Tsk::Sum, Frames::One(1), true).unwrap();
        let mut out = [0; 2];
        module
            .socket(Sum::C)
            .unwrap()
            .read_frames_into(&mut out, Frames::All)
            .unwrap();
        assert_eq!(out, [0, 22]);
        assert_eq!(module[Tsk::Sum].get_exec_timer().get_n_calls(), 1);
        module.reset_stats();
        assert_eq!(module[Tsk::Sum].get_exec_timer().get_n_calls(), 0);
    }

    #[test]
    fn test_set_n_frames() {
        let mut module = module();
        module.set_n_frames(3).unwrap();
        assert_eq!(module.get_n_frames(), 3);
        assert_eq!(module.socket(Scale::X).unwrap().get_n_elmts(), 9);
        assert!(!module.socket(Scale::X).unwrap().is_bound());
        module.set_n_frames_per_wave(2).unwrap();
        assert_eq!(module.get_n_waves(), 2);
        assert_eq!(module.get_n_frames_per_wave_rest(), 1);
        assert!(!module.is_single_wave());
        let mut gain = -1.0;
        module
            .socket_mut(Scale::X)
            .unwrap()
            .bind(&[1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0])
            .unwrap();
        module.exec(&mut gain, Tsk::Scale, Frames::All, true).unwrap();
        assert_eq!(
            module.socket(Scale::Y).unwrap().data::<f64>().unwrap(),
            [-1.0, -1.0, -1.0, -2.0, -2.0, -2.0, -3.0, -3.0, -3.0]
        );
        assert!(module.set_n_frames(0).is_err());
        assert!(module.set_n_frames_per_wave(0).is_err());
    }
}
