//! Fixed-size worker pool for per-cell sampling jobs.
//!
//! Jobs flow through a bounded intake queue to `worker_count` threads;
//! results come back on a bounded egress queue in completion order. Every
//! result carries its `(row, column)` tag, so consumers reassemble by
//! position rather than arrival order.
//!
//! Both queues are sized at [`QUEUE_DEPTH_PER_WORKER`] × `worker_count`.
//! Because egress is bounded, results must be drained while jobs are still
//! being submitted (e.g. submit from one thread, drain from another),
//! otherwise workers block on a full egress queue and `submit` blocks on a
//! full intake queue.
//!
//! A panicking sampler is caught per job and reported as a failed
//! [`CellResult`]. The process panic hook still runs first, so the panic
//! message also reaches stderr unless the binary installs its own hook.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use image::RgbaImage;

use super::error::RenderError;
use super::grid::Cell;
use super::sampler::CellStatistic;

/// Queue slots per worker on both the intake and egress queues.
pub const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Function a worker runs for each job.
pub type SampleFn = Arc<dyn Fn(&RgbaImage, &Cell) -> CellStatistic + Send + Sync>;

/// One unit of work: a shared image and the cell to sample from it.
#[derive(Debug, Clone)]
pub struct Job {
    pub image: Arc<RgbaImage>,
    pub cell: Cell,
}

impl Job {
    pub fn new(image: Arc<RgbaImage>, cell: Cell) -> Self {
        Self { image, cell }
    }
}

/// Result of one job, tagged with the cell it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CellResult {
    pub row: u32,
    pub column: u32,
    /// The statistic, or the panic message if sampling failed
    pub outcome: Result<CellStatistic, String>,
}

/// Default sampler: full statistics over the cell's nominal bounds.
pub fn measure_cell(img: &RgbaImage, cell: &Cell) -> CellStatistic {
    CellStatistic::measure(img, cell.x, cell.y, cell.width, cell.height)
}

/// Bounded pool of sampling threads.
pub struct WorkerPool {
    worker_count: usize,
    sampler: SampleFn,
    job_tx: Option<Sender<Job>>,
    job_rx: Receiver<Job>,
    result_tx: Option<Sender<CellResult>>,
    result_rx: Receiver<CellResult>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("running", &self.workers.len())
            .field("accepting_jobs", &self.job_tx.is_some())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create a pool with the default cell sampler.
    ///
    /// # Errors
    /// [`RenderError::Configuration`] if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Result<Self, RenderError> {
        Self::with_sampler(worker_count, Arc::new(measure_cell))
    }

    /// Create a pool that runs `sampler` for each job.
    pub fn with_sampler(worker_count: usize, sampler: SampleFn) -> Result<Self, RenderError> {
        if worker_count == 0 {
            return Err(RenderError::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }

        let capacity = worker_count * QUEUE_DEPTH_PER_WORKER;
        let (job_tx, job_rx) = flume::bounded(capacity);
        let (result_tx, result_rx) = flume::bounded(capacity);

        Ok(Self {
            worker_count,
            sampler,
            job_tx: Some(job_tx),
            job_rx,
            result_tx: Some(result_tx),
            result_rx,
            workers: Vec::with_capacity(worker_count),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Launch exactly `worker_count` worker threads.
    ///
    /// Calling `start` on a running or stopped pool is an error.
    pub fn start(&mut self) -> Result<(), RenderError> {
        if !self.workers.is_empty() {
            return Err(RenderError::Configuration(
                "worker pool already started".to_string(),
            ));
        }
        let result_tx = self.result_tx.as_ref().ok_or(RenderError::PoolClosed)?;

        for id in 0..self.worker_count {
            let jobs = self.job_rx.clone();
            let results = result_tx.clone();
            let sampler = Arc::clone(&self.sampler);

            let handle = thread::Builder::new()
                .name(format!("cell-worker-{}", id))
                .spawn(move || run_worker(jobs, results, sampler))
                .map_err(RenderError::WorkerSpawn)?;
            self.workers.push(handle);
        }

        log::debug!("Started {} cell workers", self.worker_count);
        Ok(())
    }

    /// Enqueue a job, blocking while the intake queue is full.
    ///
    /// # Errors
    /// [`RenderError::PoolClosed`] after `stop`, or if no worker is left to
    /// receive the job.
    pub fn submit(&self, job: Job) -> Result<(), RenderError> {
        let tx = self.job_tx.as_ref().ok_or(RenderError::PoolClosed)?;
        tx.send(job).map_err(|_| RenderError::PoolClosed)
    }

    /// A handle on the result queue. The queue disconnects once `stop`
    /// has returned and every result has been received.
    pub fn results(&self) -> Receiver<CellResult> {
        self.result_rx.clone()
    }

    /// Close intake, wait for every worker to finish, then close egress.
    ///
    /// Safe to call more than once. Results must be drained concurrently
    /// for this to return (see module docs).
    pub fn stop(&mut self) {
        // Dropping the last job sender lets workers drain and exit.
        self.job_tx.take();

        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("cell-worker").to_string();
            if handle.join().is_err() {
                log::error!("{} exited abnormally", name);
            }
        }

        // No worker can publish any more.
        self.result_tx.take();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Release both queues without joining; workers exit once the job
        // queue is drained.
        self.job_tx.take();
        self.result_tx.take();
    }
}

fn run_worker(jobs: Receiver<Job>, results: Sender<CellResult>, sampler: SampleFn) {
    for job in jobs.iter() {
        let cell = job.cell;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sampler(&job.image, &cell)))
            .map_err(|payload| panic_message(payload.as_ref()));

        if let Err(detail) = &outcome {
            log::error!(
                "Sampling cell (row {}, column {}) panicked: {}",
                cell.row,
                cell.column,
                detail
            );
        }

        let result = CellResult {
            row: cell.row,
            column: cell.column,
            outcome,
        };
        if results.send(result).is_err() {
            // Nobody is listening any more.
            break;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::grid::TileGrid;
    use image::Rgba;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(RenderError::Configuration(_))
        ));
    }

    #[test]
    fn test_submit_after_stop_is_rejected() {
        let mut pool = WorkerPool::new(1).unwrap();
        pool.start().unwrap();
        pool.stop();
        let image = Arc::new(RgbaImage::new(4, 4));
        let cell = TileGrid::compute(4, 4, 1).unwrap().cell(0, 0);
        assert!(matches!(
            pool.submit(Job::new(image, cell)),
            Err(RenderError::PoolClosed)
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut pool = WorkerPool::new(3).unwrap();
        pool.start().unwrap();
        pool.stop();
        pool.stop();
        assert!(pool.results().recv().is_err());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut pool = WorkerPool::new(2).unwrap();
        pool.start().unwrap();
        assert!(pool.start().is_err());
        pool.stop();
    }

    #[test]
    fn test_single_job_round_trip() {
        let image = Arc::new(RgbaImage::from_pixel(10, 20, Rgba([255, 0, 0, 255])));
        let cell = TileGrid::compute(10, 20, 1).unwrap().cell(0, 0);

        let mut pool = WorkerPool::new(1).unwrap();
        pool.start().unwrap();
        pool.submit(Job::new(image, cell)).unwrap();
        pool.stop();

        let results: Vec<CellResult> = pool.results().iter().collect();
        assert_eq!(results.len(), 1);
        let stat = results[0].outcome.as_ref().unwrap();
        assert!((stat.brightness - 0.299).abs() < 0.01);
    }

    #[test]
    fn test_panicking_job_yields_tagged_failure() {
        let sampler: SampleFn = Arc::new(|_: &RgbaImage, cell: &Cell| {
            if cell.column == 1 {
                panic!("bad cell");
            }
            CellStatistic::EMPTY
        });
        let image = Arc::new(RgbaImage::new(20, 40));
        let grid = TileGrid::compute(20, 40, 2).unwrap();

        let mut pool = WorkerPool::with_sampler(1, sampler).unwrap();
        pool.start().unwrap();
        pool.submit(Job::new(Arc::clone(&image), grid.cell(0, 0))).unwrap();
        pool.submit(Job::new(image, grid.cell(0, 1))).unwrap();
        pool.stop();

        let mut results: Vec<CellResult> = pool.results().iter().collect();
        results.sort_by_key(|r| r.column);
        assert_eq!(results.len(), 2);
        assert!(results[0].outcome.is_ok());
        assert_eq!(results[1].outcome, Err("bad cell".to_string()));
    }
}
