// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution report

use citydb_lite_model::XlinkKind;
use serde::Serialize;
use std::fmt;

/// Outcome of one kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub kind: XlinkKind,
    /// Passes run over the kind's ledger partition
    pub passes: usize,
    /// Records that produced writes
    pub resolved: usize,
    /// Records dropped after a per-record failure
    pub failed: usize,
    /// Records left unresolved when the kind stopped
    pub abandoned: usize,
    /// The kind stopped because a pass made no progress
    pub cycle: bool,
    /// Symbolic ids of the abandoned records, when retained
    pub stuck_ids: Vec<String>,
}

impl KindReport {
    /// Empty report for a kind
    pub fn new(kind: XlinkKind) -> Self {
        Self {
            kind,
            passes: 0,
            resolved: 0,
            failed: 0,
            abandoned: 0,
            cycle: false,
            stuck_ids: Vec::new(),
        }
    }

    /// Number of records seen in the first pass
    pub fn total(&self) -> usize {
        self.resolved + self.failed + self.abandoned
    }
}

impl fmt::Display for KindReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} resolved, {} failed, {} abandoned in {} pass(es)",
            self.kind, self.resolved, self.failed, self.abandoned, self.passes
        )?;
        if self.cycle {
            f.write_str(" (cycle)")?;
        }
        Ok(())
    }
}

/// Outcome of a whole resolution run, in execution order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub kinds: Vec<KindReport>,
}

impl ResolutionReport {
    /// Report of one kind
    pub fn kind(&self, kind: XlinkKind) -> Option<&KindReport> {
        self.kinds.iter().find(|r| r.kind == kind)
    }

    /// Kinds that stopped on a cycle
    pub fn cycles(&self) -> Vec<XlinkKind> {
        self.kinds.iter().filter(|r| r.cycle).map(|r| r.kind).collect()
    }

    pub fn resolved(&self) -> usize {
        self.kinds.iter().map(|r| r.resolved).sum()
    }

    pub fn failed(&self) -> usize {
        self.kinds.iter().map(|r| r.failed).sum()
    }

    pub fn abandoned(&self) -> usize {
        self.kinds.iter().map(|r| r.abandoned).sum()
    }

    /// Every record resolved
    pub fn is_complete(&self) -> bool {
        self.failed() == 0 && self.abandoned() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let mut basic = KindReport::new(XlinkKind::Basic);
        basic.passes = 1;
        basic.resolved = 3;
        basic.failed = 1;
        let mut group = KindReport::new(XlinkKind::GroupMembership);
        group.passes = 2;
        group.abandoned = 2;
        group.cycle = true;

        let report = ResolutionReport {
            kinds: vec![basic, group],
        };
        assert_eq!(report.resolved(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.abandoned(), 2);
        assert!(!report.is_complete());
        assert_eq!(report.cycles(), vec![XlinkKind::GroupMembership]);
        assert_eq!(report.kind(XlinkKind::Basic).unwrap().total(), 4);
        assert_eq!(
            report.kind(XlinkKind::GroupMembership).unwrap().to_string(),
            "group-membership: 0 resolved, 0 failed, 2 abandoned in 2 pass(es) (cycle)"
        );
    }

    #[test]
    fn test_serializes() {
        let report = ResolutionReport {
            kinds: vec![KindReport::new(XlinkKind::SolidGeometry)],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kinds"][0]["passes"], 0);
    }
}
