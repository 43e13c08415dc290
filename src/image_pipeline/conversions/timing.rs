use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::image_pipeline::common::error::Phase;

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub phase: Phase,
    pub duration: Duration,
}

/// Wall-clock time spent in each conversion phase.
#[derive(Debug, Clone, Default)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
    by_phase: HashMap<&'static str, Duration>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, phase: Phase, duration: Duration) {
        self.steps.push(StepTiming { phase, duration });
        *self.by_phase.entry(phase_key(phase)).or_insert(Duration::ZERO) += duration;
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, phase: Phase) -> Option<Duration> {
        self.by_phase.get(phase_key(phase)).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn log_summary(&self) {
        let total = self.total_duration();
        for step in &self.steps {
            let percentage = if total.as_secs_f64() > 0.0 {
                (step.duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            debug!(
                "{:<12} {:>10.3}ms ({:>5.1}%)",
                step.phase,
                step.duration.as_secs_f64() * 1000.0,
                percentage
            );
        }
        debug!("{:<12} {:>10.3}ms", "Total", total.as_secs_f64() * 1000.0);
    }
}

fn phase_key(phase: Phase) -> &'static str {
    match phase {
        Phase::Decoding => "decoding",
        Phase::Rescaling => "rescaling",
        Phase::Encoding => "encoding",
    }
}

pub struct Timer {
    start: Instant,
    phase: Phase,
}

impl Timer {
    pub fn start(phase: Phase) -> Self {
        Self {
            start: Instant::now(),
            phase,
        }
    }

    pub fn stop(self) -> (Phase, Duration) {
        (self.phase, self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_per_phase() {
        let mut timings = PipelineTimings::new();
        timings.add_step(Phase::Decoding, Duration::from_millis(4));
        timings.add_step(Phase::Encoding, Duration::from_millis(6));
        timings.add_step(Phase::Decoding, Duration::from_millis(1));

        assert_eq!(timings.steps().len(), 3);
        assert_eq!(timings.get_step(Phase::Decoding), Some(Duration::from_millis(5)));
        assert_eq!(timings.get_step(Phase::Rescaling), None);
        assert_eq!(timings.total_duration(), Duration::from_millis(11));
    }

    #[test]
    fn test_timer_reports_its_phase() {
        let (phase, elapsed) = Timer::start(Phase::Rescaling).stop();
        assert_eq!(phase, Phase::Rescaling);
        assert!(elapsed < Duration::from_secs(5));
    }
}
