//! Working memory: the current context, in-flight processes and scratch data.
//!
//! Processes and scratch entries share one capacity. When full, the oldest
//! finished (completed or failed) process is evicted; if nothing is finished
//! the insert fails with [`MemoryError::WorkingMemoryFull`].

use chrono::Utc;
use indexmap::IndexMap;

use super::types::{ActiveProcess, ProcessStatus};
use super::{MemoryError, MemoryResult};
use crate::types::{clamp_unit, Context};

#[derive(Debug, Clone)]
pub struct WorkingMemory {
    current_context: Option<Context>,
    processes: IndexMap<String, ActiveProcess>,
    scratch: IndexMap<String, serde_json::Value>,
    capacity: usize,
}

impl WorkingMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            current_context: None,
            processes: IndexMap::new(),
            scratch: IndexMap::new(),
            capacity,
        }
    }

    pub fn current_context(&self) -> Option<&Context> {
        self.current_context.as_ref()
    }

    pub fn set_current_context(&mut self, context: Context) {
        self.current_context = Some(context);
    }

    /// Slots in use (processes plus scratch entries).
    pub fn len(&self) -> usize {
        self.processes.len() + self.scratch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ------------------------------------------------------------------------
    // Processes
    // ------------------------------------------------------------------------

    /// Register a running process and return its id.
    pub fn start_process(
        &mut self,
        process_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> MemoryResult<String> {
        self.make_room()?;
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        self.processes.insert(
            id.clone(),
            ActiveProcess {
                id: id.clone(),
                process_type: process_type.into(),
                status: ProcessStatus::Running,
                progress: 0.0,
                payload,
                started_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    /// Update progress and, optionally, status of a process.
    pub fn update_process(
        &mut self,
        id: &str,
        progress: f64,
        status: Option<ProcessStatus>,
    ) -> MemoryResult<()> {
        let process = self.process_mut(id)?;
        process.progress = clamp_unit(progress);
        if let Some(status) = status {
            process.status = status;
        }
        process.updated_at = Utc::now();
        Ok(())
    }

    /// Mark a process completed, optionally replacing its payload with a result.
    pub fn complete_process(
        &mut self,
        id: &str,
        result: Option<serde_json::Value>,
    ) -> MemoryResult<()> {
        let process = self.process_mut(id)?;
        process.status = ProcessStatus::Completed;
        process.progress = 1.0;
        if let Some(result) = result {
            process.payload = result;
        }
        process.updated_at = Utc::now();
        Ok(())
    }

    /// Mark a process failed, recording the reason in its payload.
    pub fn fail_process(&mut self, id: &str, reason: &str) -> MemoryResult<()> {
        let process = self.process_mut(id)?;
        process.status = ProcessStatus::Failed;
        process.payload = serde_json::json!({ "error": reason });
        process.updated_at = Utc::now();
        Ok(())
    }

    pub fn process(&self, id: &str) -> Option<&ActiveProcess> {
        self.processes.get(id)
    }

    /// Processes that are still running or waiting.
    pub fn active_processes(&self) -> Vec<&ActiveProcess> {
        self.processes
            .values()
            .filter(|p| !p.status.is_finished())
            .collect()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    fn process_mut(&mut self, id: &str) -> MemoryResult<&mut ActiveProcess> {
        self.processes
            .get_mut(id)
            .ok_or_else(|| MemoryError::UnknownProcess(id.to_string()))
    }

    // ------------------------------------------------------------------------
    // Scratch
    // ------------------------------------------------------------------------

    /// Set a scratch value; overwriting an existing key needs no extra room.
    pub fn set_scratch(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> MemoryResult<()> {
        let key = key.into();
        if !self.scratch.contains_key(&key) {
            self.make_room()?;
        }
        self.scratch.insert(key, value);
        Ok(())
    }

    pub fn get_scratch(&self, key: &str) -> Option<&serde_json::Value> {
        self.scratch.get(key)
    }

    pub fn remove_scratch(&mut self, key: &str) -> Option<serde_json::Value> {
        self.scratch.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.current_context = None;
        self.processes.clear();
        self.scratch.clear();
    }

    fn make_room(&mut self) -> MemoryResult<()> {
        if self.len() < self.capacity {
            return Ok(());
        }
        let finished = self
            .processes
            .iter()
            .find(|(_, p)| p.status.is_finished())
            .map(|(id, _)| id.clone());
        match finished {
            Some(id) => {
                self.processes.shift_remove(&id);
                Ok(())
            }
            None => Err(MemoryError::WorkingMemoryFull {
                capacity: self.capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_process_lifecycle() {
        let mut memory = WorkingMemory::new(4);
        let id = memory.start_process("summarize", json!({"messages": 3})).unwrap();
        assert_eq!(memory.active_processes().len(), 1);

        memory
            .update_process(&id, 0.5, Some(ProcessStatus::Waiting))
            .unwrap();
        assert_eq!(memory.process(&id).unwrap().status, ProcessStatus::Waiting);

        memory.complete_process(&id, Some(json!("done"))).unwrap();
        let process = memory.process(&id).unwrap();
        assert_eq!(process.status, ProcessStatus::Completed);
        assert_eq!(process.progress, 1.0);
        assert_eq!(process.payload, json!("done"));
        assert!(memory.active_processes().is_empty());
    }

    #[test]
    fn test_unknown_process() {
        let mut memory = WorkingMemory::new(4);
        assert!(matches!(
            memory.fail_process("nope", "boom"),
            Err(MemoryError::UnknownProcess(_))
        ));
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut memory = WorkingMemory::new(4);
        let id = memory.start_process("t", json!(null)).unwrap();
        memory.update_process(&id, 3.0, None).unwrap();
        assert_eq!(memory.process(&id).unwrap().progress, 1.0);
    }

    #[test]
    fn test_full_memory_evicts_finished_first() {
        let mut memory = WorkingMemory::new(2);
        let first = memory.start_process("a", json!(null)).unwrap();
        memory.set_scratch("k", json!(1)).unwrap();

        // Nothing finished yet
        assert!(matches!(
            memory.start_process("b", json!(null)),
            Err(MemoryError::WorkingMemoryFull { capacity: 2 })
        ));

        memory.fail_process(&first, "timeout").unwrap();
        let second = memory.start_process("b", json!(null)).unwrap();
        assert!(memory.process(&first).is_none());
        assert!(memory.process(&second).is_some());
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_scratch_overwrite_needs_no_room() {
        let mut memory = WorkingMemory::new(1);
        memory.set_scratch("k", json!(1)).unwrap();
        memory.set_scratch("k", json!(2)).unwrap();
        assert_eq!(memory.get_scratch("k"), Some(&json!(2)));
        assert!(memory.set_scratch("other", json!(3)).is_err());
        assert_eq!(memory.remove_scratch("k"), Some(json!(2)));
    }
}
