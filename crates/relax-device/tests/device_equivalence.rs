//! The thread-pool device must reproduce the sequential device bit-for-bit
//! for any field, work-group size, and worker count.

use proptest::prelude::*;

use relax_core::{BufferHandle, KernelHandle};
use relax_device::{
    ComputeDevice, KernelArg, KernelSource, LaunchGeometry, SequentialDevice, ThreadPoolDevice,
    ThreadPoolOptions,
};

/// Upload `data`, compile both directions, and run `steps` alternating
/// dispatches. Returns the final read field.
fn relax_steps<D: ComputeDevice>(dev: &mut D, data: &[f64], local: usize, steps: usize) -> Vec<f64> {
    let n = data.len();
    let a = dev.allocate(n).unwrap();
    let b = dev.allocate(n).unwrap();
    dev.upload(a, data).unwrap();
    dev.upload(b, data).unwrap();
    let src = KernelSource::relax();
    let bind = |dev: &mut D, from: BufferHandle, to: BufferHandle| -> KernelHandle {
        dev.compile(
            &src,
            "relax",
            &[
                KernelArg::Buffer(from),
                KernelArg::Buffer(to),
                KernelArg::Uint(n as u32),
            ],
        )
        .unwrap()
    };
    let forward = bind(&mut *dev, a, b);
    let backward = bind(&mut *dev, b, a);
    for step in 0..steps {
        let k = if step % 2 == 0 { forward } else { backward };
        dev.dispatch(k, LaunchGeometry::new(n, local)).unwrap();
    }
    let last = if steps % 2 == 0 { a } else { b };
    let mut out = vec![0.0; n];
    dev.read_back(last, &mut out).unwrap();
    out
}

#[test]
fn devices_agree_on_step_function() {
    let mut data = vec![0.0; 50];
    data[0] = 100.0;
    let seq = relax_steps(&mut SequentialDevice::new(), &data, 32, 40);
    let par = relax_steps(&mut ThreadPoolDevice::new(), &data, 32, 40);
    assert_eq!(seq, par);
    assert_eq!(seq[0], 100.0);
    assert_eq!(seq[49], 0.0);
}

#[test]
fn boxed_devices_are_interchangeable() {
    let data = [100.0, 0.0, 0.0, 0.0, 0.0];
    let mut devices: Vec<Box<dyn ComputeDevice>> = vec![
        Box::new(SequentialDevice::new()),
        Box::new(ThreadPoolDevice::with_options(ThreadPoolOptions::with_threads(2)).unwrap()),
    ];
    let results: Vec<Vec<f64>> = devices
        .iter_mut()
        .map(|dev| relax_steps(dev, &data, 2, 3))
        .collect();
    assert_eq!(results[0], results[1]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn thread_pool_matches_sequential(
        data in prop::collection::vec(-1.0e3f64..1.0e3, 3..200),
        local in 1usize..70,
        threads in 1usize..5,
        steps in 1usize..12,
    ) {
        let seq = relax_steps(&mut SequentialDevice::new(), &data, local, steps);
        let mut pool = ThreadPoolDevice::with_options(ThreadPoolOptions::with_threads(threads)).unwrap();
        let par = relax_steps(&mut pool, &data, local, steps);
        prop_assert_eq!(seq, par);
    }
}
