//! Work-group-parallel device backed by rayon.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace};

use relax_core::{BufferHandle, DispatchError, KernelHandle, SetupError};

use crate::device::{ComputeDevice, DeviceInfo, DeviceKind, DeviceStats, LaunchGeometry};
use crate::program::{CellFn, KernelArg, KernelSource};
use crate::registry::DeviceMemory;

/// Options for [`ThreadPoolDevice::with_options`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadPoolOptions {
    /// Worker count for a dedicated pool. `None` shares rayon's global
    /// pool.
    pub threads: Option<usize>,
}

impl ThreadPoolOptions {
    /// Use a dedicated pool with `threads` workers.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
        }
    }
}

/// Evaluates work-groups concurrently.
///
/// Each work-group writes a disjoint chunk of the output buffer and reads
/// only the immutable input, so results are identical to
/// [`SequentialDevice`](crate::SequentialDevice) for every work-group size
/// and thread count.
#[derive(Debug)]
pub struct ThreadPoolDevice {
    memory: DeviceMemory,
    pool: Option<Arc<ThreadPool>>,
}

impl ThreadPoolDevice {
    /// A device on rayon's global pool.
    pub fn new() -> Self {
        Self {
            memory: DeviceMemory::new(),
            pool: None,
        }
    }

    /// A device configured by `options`.
    ///
    /// Fails with [`SetupError::DeviceUnavailable`] if a dedicated pool
    /// was requested with zero threads or could not be built.
    pub fn with_options(options: ThreadPoolOptions) -> Result<Self, SetupError> {
        let pool = match options.threads {
            None => None,
            Some(0) => {
                return Err(SetupError::DeviceUnavailable {
                    reason: "thread pool needs at least one worker".into(),
                })
            }
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("relax-worker-{i}"))
                    .build()
                    .map_err(|e| SetupError::DeviceUnavailable {
                        reason: format!("failed to build thread pool: {e}"),
                    })?;
                debug!(threads, "built dedicated thread pool");
                Some(Arc::new(pool))
            }
        };
        Ok(Self {
            memory: DeviceMemory::new(),
            pool,
        })
    }

    fn parallelism(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl Default for ThreadPoolDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_parallel(cell: CellFn, input: &[f64], out: &mut [f64], geometry: LaunchGeometry) {
    let local = geometry.effective_local();
    out.par_chunks_mut(local)
        .enumerate()
        .for_each(|(group, chunk)| {
            let base = group * local;
            for (offset, slot) in chunk.iter_mut().enumerate() {
                *slot = cell(input, base + offset);
            }
        });
}

impl ComputeDevice for ThreadPoolDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "thread-pool".to_string(),
            kind: DeviceKind::ThreadPool,
            parallelism: self.parallelism(),
        }
    }

    fn allocate(&mut self, len: usize) -> Result<BufferHandle, SetupError> {
        self.memory.allocate(len)
    }

    fn upload(&mut self, buffer: BufferHandle, data: &[f64]) -> Result<(), SetupError> {
        self.memory.upload(buffer, data)
    }

    fn compile(
        &mut self,
        source: &KernelSource,
        entry_point: &str,
        args: &[KernelArg],
    ) -> Result<KernelHandle, SetupError> {
        self.memory.compile(source, entry_point, args)
    }

    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        geometry: LaunchGeometry,
    ) -> Result<(), DispatchError> {
        trace!(
            %kernel,
            global = geometry.global,
            local = geometry.local,
            groups = geometry.group_count(),
            "thread-pool dispatch"
        );
        match &self.pool {
            Some(pool) => self
                .memory
                .dispatch(kernel, geometry, |cell, input, out, geometry| {
                    pool.install(|| eval_parallel(cell, input, out, geometry))
                }),
            None => self.memory.dispatch(kernel, geometry, eval_parallel),
        }
    }

    fn read_back(&mut self, buffer: BufferHandle, host: &mut [f64]) -> Result<(), DispatchError> {
        self.memory.read_back(buffer, host)
    }

    fn stats(&self) -> DeviceStats {
        self.memory.stats()
    }
}
