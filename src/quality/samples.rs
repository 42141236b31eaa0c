//! Rolling window of performance telemetry

use std::collections::VecDeque;
use std::time::Instant;

/// One telemetry sample pushed by the rendering layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSample {
    pub fps: f32,
    /// Resident memory over available memory, `[0, 1]`
    pub memory_usage_ratio: f32,
    /// `[0, 1]`
    pub cpu_usage_ratio: f32,
    pub timestamp: Instant,
}

impl PerformanceSample {
    pub fn new(fps: f32, memory_usage_ratio: f32, cpu_usage_ratio: f32) -> Self {
        Self::at(fps, memory_usage_ratio, cpu_usage_ratio, Instant::now())
    }

    pub fn at(fps: f32, memory_usage_ratio: f32, cpu_usage_ratio: f32, timestamp: Instant) -> Self {
        Self {
            fps: fps.max(0.0),
            memory_usage_ratio: memory_usage_ratio.clamp(0.0, 1.0),
            cpu_usage_ratio: cpu_usage_ratio.clamp(0.0, 1.0),
            timestamp,
        }
    }
}

/// Averages over the current window contents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverages {
    pub fps: f32,
    pub memory_usage_ratio: f32,
    pub cpu_usage_ratio: f32,
    pub samples: usize,
}

/// Fixed-capacity ring buffer; the oldest sample is dropped on overflow
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<PerformanceSample>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: PerformanceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn latest(&self) -> Option<&PerformanceSample> {
        self.samples.back()
    }

    pub fn averages(&self) -> Option<WindowAverages> {
        if self.samples.is_empty() {
            return None;
        }
        let n = self.samples.len() as f32;
        let (fps, memory, cpu) = self.samples.iter().fold((0.0, 0.0, 0.0), |acc, s| {
            (acc.0 + s.fps, acc.1 + s.memory_usage_ratio, acc.2 + s.cpu_usage_ratio)
        });
        Some(WindowAverages {
            fps: fps / n,
            memory_usage_ratio: memory / n,
            cpu_usage_ratio: cpu / n,
            samples: self.samples.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut window = SampleWindow::new(3);
        for fps in [10.0, 20.0, 30.0, 40.0] {
            window.push(PerformanceSample::new(fps, 0.5, 0.5));
        }
        assert_eq!(window.len(), 3);
        let avg = window.averages().unwrap();
        assert_eq!(avg.fps, 30.0);
        assert_eq!(avg.samples, 3);
    }

    #[test]
    fn test_empty_window_has_no_averages() {
        assert!(SampleWindow::new(5).averages().is_none());
    }

    #[test]
    fn test_sample_ratios_are_clamped() {
        let sample = PerformanceSample::new(-5.0, 1.7, -0.2);
        assert_eq!(sample.fps, 0.0);
        assert_eq!(sample.memory_usage_ratio, 1.0);
        assert_eq!(sample.cpu_usage_ratio, 0.0);
    }
}
