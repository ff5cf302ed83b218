//! Single-threaded reference device.

use tracing::trace;

use relax_core::{BufferHandle, DispatchError, KernelHandle, SetupError};

use crate::device::{ComputeDevice, DeviceInfo, DeviceKind, DeviceStats, LaunchGeometry};
use crate::program::{CellFn, KernelArg, KernelSource};
use crate::registry::DeviceMemory;

/// Evaluates every work-item on the calling thread, one work-group at a
/// time in ascending order.
///
/// This is the reference every other device is compared against: its
/// results are what a plain loop over `0..global` would produce.
#[derive(Debug, Default)]
pub struct SequentialDevice {
    memory: DeviceMemory,
}

impl SequentialDevice {
    /// A device with no buffers or kernels.
    pub fn new() -> Self {
        Self {
            memory: DeviceMemory::new(),
        }
    }
}

pub(crate) fn eval_serial(cell: CellFn, input: &[f64], out: &mut [f64], geometry: LaunchGeometry) {
    let local = geometry.effective_local();
    for (group, chunk) in out.chunks_mut(local).enumerate() {
        let base = group * local;
        for (offset, slot) in chunk.iter_mut().enumerate() {
            *slot = cell(input, base + offset);
        }
    }
}

impl ComputeDevice for SequentialDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "sequential".to_string(),
            kind: DeviceKind::Sequential,
            parallelism: 1,
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
        trace!(%kernel, global = geometry.global, local = geometry.local, "sequential dispatch");
        self.memory.dispatch(kernel, geometry, eval_serial)
    }

    fn read_back(&mut self, buffer: BufferHandle, host: &mut [f64]) -> Result<(), DispatchError> {
        self.memory.read_back(buffer, host)
    }

    fn stats(&self) -> DeviceStats {
        self.memory.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relax_core::kernel;

    fn setup(data: &[f64]) -> (SequentialDevice, BufferHandle, BufferHandle, KernelHandle) {
        let mut dev = SequentialDevice::new();
        let a = dev.allocate(data.len()).unwrap();
        let b = dev.allocate(data.len()).unwrap();
        dev.upload(a, data).unwrap();
        let k = dev
            .compile(
                &KernelSource::relax(),
                "relax",
                &[
                    KernelArg::Buffer(a),
                    KernelArg::Buffer(b),
                    KernelArg::Uint(data.len() as u32),
                ],
            )
            .unwrap();
        (dev, a, b, k)
    }

    #[test]
    fn info_reports_sequential() {
        let dev = SequentialDevice::new();
        let info = dev.info();
        assert_eq!(info.kind, DeviceKind::Sequential);
        assert_eq!(info.parallelism, 1);
    }

    #[test]
    fn dispatch_matches_host_stencil() {
        let data = [100.0, 40.0, 7.0, 0.0, -3.0, 12.0, 0.0];
        let (mut dev, _, b, k) = setup(&data);
        dev.dispatch(k, LaunchGeometry::new(data.len(), 3)).unwrap();
        let mut got = [0.0; 7];
        dev.read_back(b, &mut got).unwrap();
        let mut expected = [0.0; 7];
        kernel::apply(&data, &mut expected);
        assert_eq!(got, expected);
    }

    #[test]
    fn work_group_size_does_not_change_result() {
        let data: Vec<f64> = (0..23).map(|i| (i * i % 17) as f64).collect();
        let mut reference = vec![0.0; data.len()];
        kernel::apply(&data, &mut reference);
        for local in [1, 2, 5, 8, 23, 64] {
            let (mut dev, _, b, k) = setup(&data);
            dev.dispatch(k, LaunchGeometry::new(data.len(), local))
                .unwrap();
            let mut got = vec![0.0; data.len()];
            dev.read_back(b, &mut got).unwrap();
            assert_eq!(got, reference, "local = {local}");
        }
    }

    #[test]
    fn stats_accumulate() {
        let (mut dev, _, b, k) = setup(&[1.0, 2.0, 3.0]);
        for _ in 0..4 {
            dev.dispatch(k, LaunchGeometry::new(3, 1)).unwrap();
        }
        let mut host = [0.0; 3];
        dev.read_back(b, &mut host).unwrap();
        let stats = dev.stats();
        assert_eq!(stats.dispatches, 4);
        assert_eq!(stats.bytes_uploaded, 24);
        assert_eq!(stats.bytes_read_back, 24);
    }

    #[test]
    fn boxed_device_forwards() {
        let mut dev: Box<dyn ComputeDevice> = Box::new(SequentialDevice::new());
        let a = dev.allocate(3).unwrap();
        dev.upload(a, &[4.0, 5.0, 6.0]).unwrap();
        let mut host = [0.0; 3];
        dev.read_back(a, &mut host).unwrap();
        assert_eq!(host, [4.0, 5.0, 6.0]);
        assert_eq!(dev.info().kind, DeviceKind::Sequential);
    }
}
