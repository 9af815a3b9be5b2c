//! Parallel-for scheduler with per-thread scratch memory
use crate::{Error, LineBlockAllocator, Point, RasterizerConfig, Span, StartCoverTable};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    cell::RefCell,
    ops::Range,
    sync::{
        OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};
use thread_local::ThreadLocal;

/// Memory used by the thread for the duration of a rasterization pass
#[derive(Debug, Default)]
pub struct FrameMemory {
    /// Linearized lines
    pub lines: LineBlockAllocator,
    /// Path points transformed into raster space
    pub points: Vec<Point>,
    /// Start cover tables of the tiled layout
    pub covers: StartCoverTable,
}

impl FrameMemory {
    /// Release everything allocated during the pass, keeping the capacity
    pub fn clear(&mut self) {
        self.lines.clear();
        self.points.clear();
        self.covers.clear();
    }
}

/// Memory used by a single parallel-for index, reset after every index
#[derive(Debug, Default)]
pub struct TaskMemory {
    /// Per-cell accumulated cover
    pub cover: Vec<i32>,
    /// Per-cell accumulated area
    pub area: Vec<i32>,
    /// Per pixel row cover entering the current tile
    pub row_cover: Vec<i32>,
    /// Per pixel row span waiting to be merged with the next tile
    pub spans: Vec<Span>,
}

/// Resize buffer to `len` zeros without giving up its capacity
pub(crate) fn zeroed(buffer: &mut Vec<i32>, len: usize) -> Result<&mut [i32], Error> {
    buffer.clear();
    buffer.try_reserve(len)?;
    buffer.resize(len, 0);
    Ok(buffer.as_mut_slice())
}

impl TaskMemory {
    pub fn reset(&mut self) {
        self.cover.clear();
        self.area.clear();
        self.row_cover.clear();
        self.spans.clear();
    }
}

/// Scratch memory owned by a thread
///
/// Frame and task memory are borrowed independently, workers only ever touch
/// task memory while the dispatching thread holds its frame memory.
#[derive(Debug, Default)]
pub struct ThreadMemory {
    frame: RefCell<FrameMemory>,
    task: RefCell<TaskMemory>,
}

/// Shared cursor handing out index ranges to workers
struct TaskList {
    cursor: AtomicUsize,
    count: usize,
    run: usize,
}

impl TaskList {
    fn new(count: usize, run: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(0),
            count,
            run,
        }
    }

    /// Claim next range of indices
    fn next_range(&self) -> Option<Range<usize>> {
        let start = self.cursor.fetch_add(self.run, Ordering::Relaxed);
        (start < self.count).then(|| start..(start + self.run).min(self.count))
    }
}

/// Number of consecutive indices claimed by a worker at once
pub(crate) fn run_size(count: usize, thread_count: usize) -> usize {
    (count / (thread_count * 32)).min(64).max(1)
}

/// Bounded worker pool executing index ranges
///
/// The pool is started on first parallel dispatch and shut down when `Threads`
/// is dropped.
pub struct Threads {
    thread_count: usize,
    pool: OnceLock<ThreadPool>,
    memory: ThreadLocal<ThreadMemory>,
}

impl std::fmt::Debug for Threads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Threads")
            .field("thread_count", &self.thread_count)
            .field("started", &self.pool.get().is_some())
            .finish()
    }
}

impl Threads {
    pub fn new(thread_count: usize) -> Self {
        Self {
            thread_count: thread_count.max(1),
            pool: OnceLock::new(),
            memory: ThreadLocal::new(),
        }
    }

    pub fn from_config(config: &RasterizerConfig) -> Self {
        Self::new(config.thread_count())
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn pool(&self) -> Result<Option<&ThreadPool>, Error> {
        if self.pool.get().is_none() {
            let pool = ThreadPoolBuilder::new()
                .num_threads(self.thread_count)
                .thread_name(|index| format!("blaze-raster-{}", index))
                .build()?;
            tracing::debug!("[threads] pool started: threads={}", self.thread_count);
            // pool built by a racing thread is dropped
            let _ = self.pool.set(pool);
        }
        Ok(self.pool.get())
    }

    fn memory(&self) -> &ThreadMemory {
        self.memory.get_or_default()
    }

    /// Run `f` with the calling thread's frame memory
    ///
    /// Re-entrant calls (for example from a compositor) get fresh memory.
    pub fn with_frame_memory<R>(&self, f: impl FnOnce(&mut FrameMemory) -> R) -> R {
        match self.memory().frame.try_borrow_mut() {
            Ok(mut frame) => f(&mut frame),
            Err(_) => f(&mut FrameMemory::default()),
        }
    }

    /// Reclaim the calling thread's frame memory
    pub fn reset_frame_memory(&self) {
        if let Ok(mut frame) = self.memory().frame.try_borrow_mut() {
            frame.clear();
        }
    }

    fn run_task<F>(&self, index: usize, f: &F) -> Result<(), Error>
    where
        F: Fn(usize, &mut TaskMemory) -> Result<(), Error>,
    {
        match self.memory().task.try_borrow_mut() {
            Ok(mut task) => {
                let result = f(index, &mut task);
                task.reset();
                result
            }
            Err(_) => f(index, &mut TaskMemory::default()),
        }
    }

    /// Execute `f` for every index in `[0, count)`
    ///
    /// Blocks until all indices are processed. Order of execution is unspecified,
    /// the first error reported by any worker is returned.
    pub fn parallel_for<F>(&self, count: usize, f: F) -> Result<(), Error>
    where
        F: Fn(usize, &mut TaskMemory) -> Result<(), Error> + Sync,
    {
        if count == 0 {
            return Ok(());
        }
        let pool = if count == 1 || self.thread_count <= 1 {
            None
        } else {
            self.pool()?
        };
        let Some(pool) = pool else {
            for index in 0..count {
                self.run_task(index, &f)?;
            }
            return Ok(());
        };

        let run = run_size(count, self.thread_count);
        let required = self.thread_count.min(count.div_ceil(run));
        tracing::trace!(
            "[threads] parallel_for: count={} run={} workers={}",
            count,
            run,
            required
        );
        let tasks = TaskList::new(count, run);
        let results = pool.broadcast(|ctx| {
            if ctx.index() >= required {
                return None;
            }
            while let Some(range) = tasks.next_range() {
                for index in range {
                    if let Err(error) = self.run_task(index, &f) {
                        return Some(Err(error));
                    }
                }
            }
            Some(Ok(()))
        });

        let mut finalized = 0;
        let mut outcome = Ok(());
        for result in results.into_iter().flatten() {
            finalized += 1;
            if outcome.is_ok() {
                outcome = result;
            }
        }
        debug_assert_eq!(finalized, required);
        outcome
    }
}

impl Default for Threads {
    fn default() -> Self {
        Self::from_config(&RasterizerConfig::default())
    }
}
