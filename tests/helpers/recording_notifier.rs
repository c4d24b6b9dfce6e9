#![allow(dead_code)]
//! A notifier that records the reports it receives.

use async_trait::async_trait;
use noisewatch::core::{Notifier, RunReport};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    reports: Arc<Mutex<Vec<RunReport>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        if self.fail {
            "failing"
        } else {
            "recording"
        }
    }

    async fn notify(&self, report: &RunReport) -> anyhow::Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        if self.fail {
            anyhow::bail!("recording notifier configured to fail");
        }
        Ok(())
    }
}
