// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution settings

use serde::{Deserialize, Serialize};

/// Settings for a resolution run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XlinkConfig {
    /// Threads of the worker pool that runs independent kinds side by side
    pub worker_threads: usize,
    /// Longest alias chain the identifier resolver follows
    pub max_alias_depth: usize,
    /// Upper bound on passes of a multi-pass kind
    pub max_passes: usize,
    /// Keep the symbolic ids of records abandoned after a cycle in the report
    pub retain_stuck_ids: bool,
    /// Batch size used instead of the adapter's maximum
    pub batch_size_override: Option<usize>,
}

impl Default for XlinkConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            max_alias_depth: 64,
            max_passes: 1024,
            retain_stuck_ids: true,
            batch_size_override: None,
        }
    }
}

impl XlinkConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every kind on a single worker
    pub fn sequential() -> Self {
        Self {
            worker_threads: 1,
            ..Self::default()
        }
    }

    /// Set the worker pool size
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Set the maximum alias chain depth
    pub fn with_max_alias_depth(mut self, depth: usize) -> Self {
        self.max_alias_depth = depth;
        self
    }

    /// Set the maximum number of passes per multi-pass kind
    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Set whether abandoned symbolic ids are kept for reporting
    pub fn with_retain_stuck_ids(mut self, enabled: bool) -> Self {
        self.retain_stuck_ids = enabled;
        self
    }

    /// Override the adapter's batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size_override = Some(size.max(1));
        self
    }

    /// Batch size to use given the adapter's maximum
    pub fn batch_size(&self, adapter_max: usize) -> usize {
        self.batch_size_override.unwrap_or(adapter_max).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = XlinkConfig::new()
            .with_worker_threads(0)
            .with_max_alias_depth(8)
            .with_batch_size(0);
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.max_alias_depth, 8);
        assert_eq!(config.batch_size(100), 1);
    }

    #[test]
    fn test_batch_size_defaults_to_adapter() {
        assert_eq!(XlinkConfig::default().batch_size(500), 500);
        assert_eq!(XlinkConfig::default().batch_size(0), 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: XlinkConfig =
            serde_json::from_str(r#"{ "worker_threads": 2, "retain_stuck_ids": false }"#).unwrap();
        assert_eq!(config.worker_threads, 2);
        assert!(!config.retain_stuck_ids);
        assert_eq!(config.max_alias_depth, XlinkConfig::default().max_alias_depth);
    }

    #[test]
    fn test_sequential_preset() {
        assert_eq!(XlinkConfig::sequential().worker_threads, 1);
    }
}
