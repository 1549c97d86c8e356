//! In-memory, concurrency-safe job table.
//!
//! Keyed by a monotonically increasing decimal identifier, the way
//! spec.md §9 mandates for test portability ("1", "2", ... rather than a
//! ULID or UUID — a deliberate departure from the teacher, which uses
//! `ulid::Ulid` for its on-disk job directories).

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::RegistryError;
use crate::job::{Job, JobState};

/// Settling delay after `start()` spawns a job, so a fast command's output
/// is already visible in the immediate response (spec.md §4.1 step 6).
const SETTLE_DELAY: Duration = Duration::from_millis(30);

/// Point-in-time view of a job, returned by `start`/`get`.
#[derive(Debug, Serialize)]
pub struct JobDescriptor {
    pub id: String,
    pub cmd: String,
    pub status: &'static str,
    pub output: String,
}

/// The identifier→Job map. A single `RwLock` serializes insertion and
/// lookup; it is never held across a Job method that may block.
pub struct Registry {
    jobs: RwLock<BTreeState>,
}

struct BTreeState {
    /// Insertion-ordered map keyed by the identifier's numeric value, so
    /// `list()` returns ascending numeric order without a separate sort
    /// (spec.md §4.2).
    jobs: BTreeMap<u64, Arc<Job>>,
    next_id: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            jobs: RwLock::new(BTreeState {
                jobs: BTreeMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Allocate an identifier, create a `Queued` job, spawn it, and return a
    /// snapshot descriptor. The registry lock is held only for the
    /// insertion, never across `Job::start`.
    pub fn start(&self, command: Vec<String>) -> JobDescriptor {
        let job = Job::new(command);

        let id = {
            let mut state = self.jobs.write().expect("registry lock poisoned");
            state.next_id += 1;
            let id = state.next_id;
            state.jobs.insert(id, Arc::clone(&job));
            id
        };
        let id_str = id.to_string();
        info!(job_id = %id_str, command = ?job.command(), "job created");

        job.start();
        thread::sleep(SETTLE_DELAY);

        JobDescriptor {
            id: id_str,
            cmd: job.command_joined(),
            status: job.state().as_wire_str(),
            output: String::from_utf8_lossy(&job.output()).into_owned(),
        }
    }

    /// Send `SIGTERM` to the named job's process group. `Ok(true)` iff the
    /// job was running and the signal was sent.
    pub fn stop(&self, id: &str) -> Result<bool, RegistryError> {
        let job = self.find(id)?;
        Ok(job.stop()?)
    }

    /// Snapshot a single job's current state and output.
    pub fn get(&self, id: &str) -> Result<JobDescriptor, RegistryError> {
        let job = self.find(id)?;
        Ok(JobDescriptor {
            id: id.to_string(),
            cmd: job.command_joined(),
            status: job.state().as_wire_str(),
            output: String::from_utf8_lossy(&job.output()).into_owned(),
        })
    }

    /// All known identifiers, ascending numeric order, insertion order for
    /// ties (there are none, since ids are unique and monotone).
    pub fn list(&self) -> Vec<String> {
        let state = self.jobs.read().expect("registry lock poisoned");
        state.jobs.keys().map(u64::to_string).collect()
    }

    /// The state of every currently-live job. Used only by tests and
    /// diagnostics; not part of the external contract.
    #[cfg(test)]
    pub fn states(&self) -> Vec<JobState> {
        let state = self.jobs.read().expect("registry lock poisoned");
        state.jobs.values().map(|j| j.state()).collect()
    }

    fn find(&self, id: &str) -> Result<Arc<Job>, RegistryError> {
        let numeric: u64 = id
            .parse()
            .map_err(|_| RegistryError::UnknownIdentifier(id.to_string()))?;
        let state = self.jobs.read().expect("registry lock poisoned");
        state
            .jobs
            .get(&numeric)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownIdentifier(id.to_string()))
    }
}
