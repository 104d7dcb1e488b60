//! # Restarting Strategies
//!
//! A training run consists of one or more restarts, each starting from
//! freshly initialized weights. A strategy decides when the current restart
//! has run long enough.

use lrnn_core::{RestartPolicy, Settings};

/// Progress of the current restart, updated after each epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    pub restart: usize,
    /// Epochs finished in this restart.
    pub epoch: usize,
    pub epoch_errors: Vec<f64>,
    /// Lowest epoch error of this restart.
    pub best_error: Option<f64>,
    /// Epoch at which `best_error` was reached.
    pub best_epoch: usize,
}

impl Progress {
    pub fn new(restart: usize) -> Self {
        Self {
            restart,
            ..Self::default()
        }
    }

    pub fn record_epoch(&mut self, error: f64) {
        self.epoch += 1;
        self.epoch_errors.push(error);
        if self.best_error.map_or(true, |best| error < best) {
            self.best_error = Some(error);
            self.best_epoch = self.epoch;
        }
    }
}

pub trait RestartingStrategy: Send {
    /// Whether another epoch should run in this restart.
    fn continue_restart(&self, progress: &Progress) -> bool;
}

/// Always run exactly `max_epochs` epochs.
#[derive(Debug, Clone, Copy)]
pub struct StaticRestartingStrategy {
    pub max_epochs: usize,
}

impl RestartingStrategy for StaticRestartingStrategy {
    fn continue_restart(&self, progress: &Progress) -> bool {
        progress.epoch < self.max_epochs
    }
}

/// Stop once `patience` epochs have passed without a new best error.
#[derive(Debug, Clone, Copy)]
pub struct NoImprovementStrategy {
    pub patience: usize,
    pub max_epochs: usize,
}

impl RestartingStrategy for NoImprovementStrategy {
    fn continue_restart(&self, progress: &Progress) -> bool {
        progress.epoch < self.max_epochs && progress.epoch - progress.best_epoch < self.patience
    }
}

pub fn for_settings(settings: &Settings) -> Box<dyn RestartingStrategy> {
    match settings.restart_policy {
        RestartPolicy::Static => Box::new(StaticRestartingStrategy {
            max_epochs: settings.max_epochs,
        }),
        RestartPolicy::NoImprovement { patience } => Box::new(NoImprovementStrategy {
            patience,
            max_epochs: settings.max_epochs,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_runs_max_epochs() {
        let s = StaticRestartingStrategy { max_epochs: 3 };
        let mut p = Progress::new(0);
        let mut epochs = 0;
        while s.continue_restart(&p) {
            p.record_epoch(1.0);
            epochs += 1;
        }
        assert_eq!(epochs, 3);
    }

    #[test]
    fn test_no_improvement_stops_early() {
        let s = NoImprovementStrategy {
            patience: 2,
            max_epochs: 100,
        };
        let mut p = Progress::new(0);
        for error in [1.0, 0.5, 0.6, 0.7] {
            assert!(s.continue_restart(&p));
            p.record_epoch(error);
        }
        assert_eq!(p.best_epoch, 2);
        assert_eq!(p.best_error, Some(0.5));
        assert!(!s.continue_restart(&p));
    }

    #[test]
    fn test_for_settings() {
        let settings = Settings {
            max_epochs: 2,
            ..Settings::default()
        };
        let s = for_settings(&settings);
        let mut p = Progress::new(0);
        p.record_epoch(0.1);
        p.record_epoch(0.1);
        assert!(!s.continue_restart(&p));
    }
}
