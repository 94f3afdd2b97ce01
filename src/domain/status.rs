use serde::{Deserialize, Serialize};

/// A job's position in the lifecycle.
///
/// `Finished` and `Error` are terminal: [`crate::queue::JobQueue::update_job_status`]
/// refuses any further transition out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Pulled,
    Preprocessing,
    Running,
    Postprocessing,
    Finished,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Queued,
        JobStatus::Pulled,
        JobStatus::Preprocessing,
        JobStatus::Running,
        JobStatus::Postprocessing,
        JobStatus::Finished,
        JobStatus::Error,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error)
    }

    /// Statuses the TimeoutSupervisor considers a live (non-terminal,
    /// post-queued) lease.
    pub fn is_leased(self) -> bool {
        matches!(
            self,
            JobStatus::Pulled
                | JobStatus::Preprocessing
                | JobStatus::Running
                | JobStatus::Postprocessing
        )
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Pulled => "pulled",
            JobStatus::Preprocessing => "preprocessing",
            JobStatus::Running => "running",
            JobStatus::Postprocessing => "postprocessing",
            JobStatus::Finished => "finished",
            JobStatus::Error => "error",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "queued" => JobStatus::Queued,
            "pulled" => JobStatus::Pulled,
            "preprocessing" => JobStatus::Preprocessing,
            "running" => JobStatus::Running,
            "postprocessing" => JobStatus::Postprocessing,
            "finished" => JobStatus::Finished,
            "error" => JobStatus::Error,
            _ => return None,
        })
    }
}

/// Coarse worker-pool label. `Any` is a wildcard that only becomes
/// eligible for dispatch once a job has aged past `older_than` seconds,
/// letting the matching-environment queue drain first.
///
/// Serializes as its lowercase string (`"local"`, `"cloud"`) except
/// `Any`, which serializes as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Local,
    Cloud,
    Any,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Any
    }
}

impl Environment {
    pub fn as_db_str(self) -> Option<&'static str> {
        match self {
            Environment::Local => Some("local"),
            Environment::Cloud => Some("cloud"),
            Environment::Any => None,
        }
    }

    pub fn from_db_str(s: Option<&str>) -> Self {
        match s {
            Some("local") => Environment::Local,
            Some("cloud") => Environment::Cloud,
            _ => Environment::Any,
        }
    }
}

impl Serialize for Environment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.as_db_str() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        Ok(match opt.as_deref() {
            None | Some("any") => Environment::Any,
            Some("local") => Environment::Local,
            Some("cloud") => Environment::Cloud,
            Some(other) => {
                return Err(serde::de::Error::custom(format!(
                    "unknown environment: {other}"
                )));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_environment_serializes_as_null() {
        let v = serde_json::to_value(Environment::Any).unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn local_environment_serializes_as_string() {
        let v = serde_json::to_value(Environment::Local).unwrap();
        assert_eq!(v, serde_json::json!("local"));
    }

    #[test]
    fn null_deserializes_to_any() {
        let env: Environment = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(env, Environment::Any);
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
