//! Last-known-good index values served when every live index source fails.

use crate::models::{Direction, MarketIndex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
    pub name: &'static str,
    pub value: f64,
    pub percent_change: f64,
    pub volume: f64,
}

/// A fixed, versioned set of index values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexSnapshot {
    pub version: &'static str,
    /// Trading day the values were taken from.
    pub captured_on: &'static str,
    pub entries: &'static [SnapshotEntry],
}

pub const NEPSE_SNAPSHOT: IndexSnapshot = IndexSnapshot {
    version: "2026.10.1",
    captured_on: "2026-10-16",
    entries: &[
        SnapshotEntry { name: "NEPSE Index", value: 2712.45, percent_change: 1.2, volume: 5_123_456_789.0 },
        SnapshotEntry { name: "Sensitive Index", value: 462.3, percent_change: -0.45, volume: 0.0 },
        SnapshotEntry { name: "Float Index", value: 190.12, percent_change: 0.98, volume: 0.0 },
        SnapshotEntry { name: "Sensitive Float Index", value: 157.84, percent_change: -0.31, volume: 0.0 },
        SnapshotEntry { name: "Banking SubIndex", value: 1450.2, percent_change: 0.58, volume: 0.0 },
        SnapshotEntry { name: "Development Bank Index", value: 5210.67, percent_change: 0.0, volume: 0.0 },
        SnapshotEntry { name: "Hydropower Index", value: 3325.9, percent_change: 2.14, volume: 0.0 },
    ],
};

impl IndexSnapshot {
    pub fn indices(&self) -> Vec<MarketIndex> {
        self.entries
            .iter()
            .map(|e| MarketIndex {
                name: e.name.to_string(),
                value: e.value,
                percent_change: e.percent_change,
                direction: if e.percent_change > 0.0 {
                    Direction::Up
                } else if e.percent_change < 0.0 {
                    Direction::Down
                } else {
                    Direction::Neutral
                },
                volume: e.volume,
            })
            .collect()
    }

    pub fn note(&self) -> String {
        format!(
            "Live index sources unavailable; showing snapshot {} from {}",
            self.version, self.captured_on
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_has_seven_unique_indices() {
        let indices = NEPSE_SNAPSHOT.indices();
        assert_eq!(indices.len(), 7);
        let mut names: Vec<&str> = indices.iter().map(|i| i.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 7);
        assert_eq!(indices[1].direction, Direction::Down);
        assert_eq!(indices[5].direction, Direction::Neutral);
    }
}
