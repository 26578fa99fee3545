use std::fmt;

use serde::{Deserialize, Serialize};

/// Post-processing stage of a dataset as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatasetStage {
    /// Upload finished, malware scan pending.
    Initial,
    /// Malware scan running.
    Scanning,
    /// Scan passed, dataset is being packaged.
    Scanned,
    /// Dataset can be downloaded.
    Available,
    /// Dataset was removed by the server.
    Deleted,
    /// Any stage this client does not know.
    Other(String),
}

impl DatasetStage {
    /// Returns the wire representation of the stage.
    pub fn as_str(&self) -> &str {
        match self {
            DatasetStage::Initial => "initial",
            DatasetStage::Scanning => "scanning",
            DatasetStage::Scanned => "scanned",
            DatasetStage::Available => "available",
            DatasetStage::Deleted => "deleted",
            DatasetStage::Other(s) => s,
        }
    }
}

impl From<&str> for DatasetStage {
    fn from(s: &str) -> Self {
        match s {
            "initial" => DatasetStage::Initial,
            "scanning" => DatasetStage::Scanning,
            "scanned" => DatasetStage::Scanned,
            "available" => DatasetStage::Available,
            "deleted" => DatasetStage::Deleted,
            other => DatasetStage::Other(other.to_string()),
        }
    }
}

impl From<String> for DatasetStage {
    fn from(s: String) -> Self {
        DatasetStage::from(s.as_str())
    }
}

impl From<DatasetStage> for String {
    fn from(stage: DatasetStage) -> Self {
        stage.as_str().to_string()
    }
}

impl fmt::Display for DatasetStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns an approximate human description of a retention time.
///
/// Up to two days no approximation is given; up to three weeks the time is
/// rounded to days, beyond that to weeks (e.g. 815 h → `"(~ 5 weeks)"`).
pub fn retention_time_label(hours: u32) -> String {
    let hours = f64::from(hours);
    if hours <= 48.0 {
        String::new()
    } else if hours <= 504.0 {
        format!("(~ {} days)", (hours / 24.0).round())
    } else {
        format!("(~ {} weeks)", (hours / 24.0 / 7.0).round())
    }
}
