//! Monitor double that records every sample.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::monitor::{Labels, Monitor};

#[derive(Default)]
struct Samples {
    counters: HashMap<String, i64>,
    gauges: HashMap<String, i64>,
    labels: Vec<Vec<(String, String)>>,
}

/// Records counters, gauges, and the labels attached to each sample.
#[derive(Default)]
pub struct RecordingMonitor {
    samples: Mutex<Samples>,
}

impl RecordingMonitor {
    pub fn count(&self, key: &str) -> i64 {
        self.samples
            .lock()
            .expect("samples lock")
            .counters
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    pub fn gauge_value(&self, key: &str) -> Option<i64> {
        self.samples
            .lock()
            .expect("samples lock")
            .gauges
            .get(key)
            .copied()
    }

    /// Returns `true` when every sample carried exactly `expected`.
    pub fn all_labelled(&self, expected: &[(&str, &str)]) -> bool {
        let samples = self.samples.lock().expect("samples lock");
        samples.labels.iter().all(|labels| {
            labels.len() == expected.len()
                && labels
                    .iter()
                    .zip(expected)
                    .all(|((key, value), (want_key, want_value))| {
                        key == want_key && value == want_value
                    })
        })
    }

    fn record_labels(samples: &mut Samples, labels: &Labels<'_>) {
        samples.labels.push(
            labels
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
        );
    }
}

impl Monitor for RecordingMonitor {
    fn gauge(&self, key: &str, value: i64, labels: &Labels<'_>) {
        let mut samples = self.samples.lock().expect("samples lock");
        samples.gauges.insert(key.to_owned(), value);
        Self::record_labels(&mut samples, labels);
    }

    fn incr(&self, key: &str, labels: &Labels<'_>) {
        let mut samples = self.samples.lock().expect("samples lock");
        *samples.counters.entry(key.to_owned()).or_default() += 1;
        Self::record_labels(&mut samples, labels);
    }
}
