use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::download::download_task::{FetchOptions, FetchRequest, FetchResult};

/// Scheduling discipline applied to every task of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One OS thread per identifier
    Threaded,
    /// One child process per identifier
    Multiprocess,
    /// All fetches interleaved on a single thread
    Cooperative,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Threaded, Strategy::Multiprocess, Strategy::Cooperative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Threaded => "threaded",
            Strategy::Multiprocess => "multiprocess",
            Strategy::Cooperative => "cooperative",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "threaded" | "threads" => Ok(Strategy::Threaded),
            "multiprocess" | "processes" => Ok(Strategy::Multiprocess),
            "cooperative" | "async" => Ok(Strategy::Cooperative),
            other => Err(format!("Unknown strategy: {}", other)),
        }
    }
}

/// Runs N independent fetch tasks and hands back exactly N results,
/// one per request, each carrying its request's identifier.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn execute(&self, requests: Vec<FetchRequest>, options: Arc<FetchOptions>) -> Vec<FetchResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_names() {
        assert_eq!("threaded".parse::<Strategy>(), Ok(Strategy::Threaded));
        assert_eq!("Multiprocess".parse::<Strategy>(), Ok(Strategy::Multiprocess));
        assert_eq!("async".parse::<Strategy>(), Ok(Strategy::Cooperative));
        assert!("fibers".parse::<Strategy>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>(), Ok(strategy));
        }
    }
}
