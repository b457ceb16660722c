//! Queue wire format.

use serde::{Deserialize, Serialize};

/// A pending weather lookup.
///
/// Serialized flat on the wire; `fault` carries the chaos flag from the
/// producer to whichever worker ends up processing the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub location: String,
    pub fault: bool,
}

impl Job {
    pub fn new(location: impl Into<String>, fault: bool) -> Self {
        Self {
            location: location.into(),
            fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_serialization() {
        let job = Job::new("lubbock", false);
        let json = serde_json::to_string(&job).unwrap();
        assert_eq!(json, r#"{"location":"lubbock","fault":false}"#);
    }

    #[test]
    fn test_job_round_trip() {
        let job = Job::new("austin", true);
        let json = serde_json::to_string(&job).unwrap();
        let decoded: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_unknown_fields_are_rejected_gracefully() {
        // Extra fields on the wire are tolerated; missing ones are not.
        let decoded: Job =
            serde_json::from_str(r#"{"location":"austin","fault":true,"extra":1}"#).unwrap();
        assert_eq!(decoded, Job::new("austin", true));

        let malformed = serde_json::from_str::<Job>(r#"{"location":"austin"}"#);
        assert!(malformed.is_err());
    }
}
