use crate::profiling::DeviceProfile;
use crate::quality::QualityTier;
use tokio::runtime::{Builder, Runtime};

/// Worker sizing for the tokio runtime hosting the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub max_blocking_threads: usize,
    pub stack_size: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            worker_threads: num_cpus.max(1),
            max_blocking_threads: 64,
            stack_size: Some(2 * 1024 * 1024), // 2MB stack size
        }
    }
}

impl RuntimeConfig {
    /// Scale workers to the device class
    pub fn for_device(device: &DeviceProfile) -> Self {
        Self::for_cores(device, num_cpus::get())
    }

    pub fn for_cores(device: &DeviceProfile, cpu_cores: usize) -> Self {
        let cpu_cores = cpu_cores.max(1);
        match QualityTier::for_compute_score(device.compute_score) {
            QualityTier::Low => Self {
                worker_threads: (cpu_cores / 2).max(1),
                max_blocking_threads: 8,
                stack_size: Some(1024 * 1024), // 1MB stack
            },
            QualityTier::Medium | QualityTier::High => Self {
                worker_threads: cpu_cores,
                max_blocking_threads: 32,
                stack_size: Some(2 * 1024 * 1024),
            },
            QualityTier::Ultra => Self {
                worker_threads: cpu_cores,
                max_blocking_threads: 64,
                stack_size: Some(2 * 1024 * 1024),
            },
        }
    }

    pub fn build(&self) -> std::io::Result<Runtime> {
        let mut builder = Builder::new_multi_thread();
        builder
            .worker_threads(self.worker_threads.max(1))
            .max_blocking_threads(self.max_blocking_threads.max(1))
            .thread_name("frameflow-worker")
            .enable_all();
        if let Some(stack_size) = self.stack_size {
            builder.thread_stack_size(stack_size);
        }
        builder.build()
    }
}
