//! Per-caller persistent state: saved variables, the execution counter
//! and the timing-line display preference.
//!
//! Sessions are partitioned by an opaque caller key with no cross-caller
//! visibility. Entries live until an explicit reset.

use std::collections::HashMap;

use dashmap::DashMap;

use crate::value::Value;

/// Fallback key for requests that carry no caller identity.
pub const ANONYMOUS_CALLER: &str = "_anon";

#[derive(Debug)]
struct Session {
    vars: HashMap<String, Value>,
    exec_count: u64,
    show_timing: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            vars: HashMap::new(),
            exec_count: 0,
            show_timing: true,
        }
    }
}

/// Read-only introspection record for one persisted variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarSnapshot {
    pub name: String,
    pub type_name: &'static str,
    pub size: usize,
    pub preview: String,
}

#[derive(Debug, Default)]
pub struct StateStore {
    sessions: DashMap<String, Session>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the caller's persisted variables, creating an empty
    /// session on first reference.
    pub fn get_or_create_namespace(&self, caller: &str) -> HashMap<String, Value> {
        self.sessions
            .entry(caller.to_string())
            .or_default()
            .vars
            .clone()
    }

    pub fn get_counter(&self, caller: &str) -> u64 {
        self.sessions
            .get(caller)
            .map(|session| session.exec_count)
            .unwrap_or(0)
    }

    /// Increments and returns the new count. Called exactly once per
    /// execution attempt.
    pub fn increment_counter(&self, caller: &str) -> u64 {
        let mut session = self.sessions.entry(caller.to_string()).or_default();
        session.exec_count += 1;
        session.exec_count
    }

    /// Copies the requested names out of a post-execution namespace.
    /// Underscore-prefixed names and names absent from the namespace are
    /// silently skipped. Returns the names actually saved.
    pub fn persist(
        &self,
        caller: &str,
        requested: &[String],
        namespace: &HashMap<String, Value>,
    ) -> Vec<String> {
        let mut session = self.sessions.entry(caller.to_string()).or_default();
        let mut saved = Vec::new();
        for name in requested {
            if name.starts_with('_') {
                continue;
            }
            if let Some(value) = namespace.get(name) {
                session.vars.insert(name.clone(), value.clone());
                saved.push(name.clone());
            }
        }
        saved
    }

    /// Clears the caller's variables and zeroes the counter. Returns the
    /// number of variables removed.
    pub fn reset(&self, caller: &str) -> usize {
        match self.sessions.get_mut(caller) {
            Some(mut session) => {
                let removed = session.vars.len();
                session.vars.clear();
                session.exec_count = 0;
                removed
            }
            None => 0,
        }
    }

    /// Introspection view of the caller's persisted variables, sorted by
    /// name. Does not create a session.
    pub fn snapshot(&self, caller: &str) -> Vec<VarSnapshot> {
        let Some(session) = self.sessions.get(caller) else {
            return Vec::new();
        };
        let mut entries: Vec<VarSnapshot> = session
            .vars
            .iter()
            .map(|(name, value)| VarSnapshot {
                name: name.clone(),
                type_name: value.type_name(),
                size: value.approx_size(),
                preview: value.preview(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn show_timing(&self, caller: &str) -> bool {
        self.sessions
            .get(caller)
            .map(|session| session.show_timing)
            .unwrap_or(true)
    }

    pub fn set_show_timing(&self, caller: &str, show: bool) {
        self.sessions
            .entry(caller.to_string())
            .or_default()
            .show_timing = show;
    }
}
