use serde::{Deserialize, Serialize};

/// Stimulus channel for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Visual,
    Auditory,
    /// Synchronous visual + auditory presentation.
    Audiovisual,
}

/// How a single trial resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialOutcome {
    /// Responded correctly; reward delivered.
    Rewarded,
    /// Correctly withheld responding; no reward scheduled.
    Withheld,
    /// The decision window elapsed with no response.
    NoResponse,
    /// Responded when it should not have; timeout penalty served.
    TimedOut,
}

/// One row of the session summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub modality: Modality,
    pub hz: f32,
    pub iti_secs: f64,
    pub outcome: TrialOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_serialize_with_tagged_fields() {
        let record = TrialRecord {
            trial: 3,
            modality: Modality::Visual,
            hz: 10.0,
            iti_secs: 2.5,
            outcome: TrialOutcome::Rewarded,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"modality\":\"visual\""));
        assert!(json.contains("\"outcome\":\"rewarded\""));
        let back: TrialRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
