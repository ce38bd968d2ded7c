//! Delivery of build results.
//!
//! Builds are fire-and-report: nothing is returned to whoever asked for the
//! build. The finished result goes out on a named channel instead.

use stackbuild_proto::{decode_build_report, encode_build_report, BuildReport, BUILD_CHANNEL};
use std::sync::{Mutex, PoisonError};

/// Named-channel callback to the host.
pub trait Reporter: Send + Sync {
    fn send(&self, channel: &str, payload: &str);
}

impl<F> Reporter for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn send(&self, channel: &str, payload: &str) {
        self(channel, payload);
    }
}

/// Encode `report` and send it on the build channel.
///
/// Encoding failures are logged; the host never hears about that build.
pub fn send_build_report(reporter: &dyn Reporter, report: &BuildReport) {
    match encode_build_report(report) {
        Ok(payload) => reporter.send(BUILD_CHANNEL, &payload),
        Err(e) => tracing::error!(build_id = report.build_id, error = %e, "failed to encode build report"),
    }
}

/// Reporter that keeps every message. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<(String, String)>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(channel, payload)` pairs received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Decoded build reports, in arrival order. Undecodable payloads are
    /// skipped.
    #[must_use]
    pub fn build_reports(&self) -> Vec<BuildReport> {
        self.messages()
            .iter()
            .filter(|(channel, _)| channel == BUILD_CHANNEL)
            .filter_map(|(_, payload)| decode_build_report(payload).ok())
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn send(&self, channel: &str, payload: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel.to_string(), payload.to_string()));
    }
}
