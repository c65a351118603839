//! YAML scripts that drive a `VersionedMap<String, Value>` through a sequence of operations.
//!
//! ```yaml
//! policy: { flatten_after: 32, mode: compact }
//! initial: { foo: 1 }
//! steps:
//!   - insert: { key: bar, value: 2 }
//!   - remove: foo
//!   - save: base
//!   - rollback
//!   - checkout: base
//!   - show
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use timemap::{HistoryPolicy, MapError, VersionedMap};

/// Errors from parsing or running a script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("step {step}: no saved handle named `{name}`")]
    UnknownHandle { step: usize, name: String },
}

/// A parsed script: optional history policy, initial contents and the steps to run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Script {
    pub policy: HistoryPolicy,
    pub initial: BTreeMap<String, Value>,
    /// Steps are written as one-key maps (`remove: foo`) or bare names (`rollback`).
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Command>,
}

impl Script {
    pub fn from_yaml(source: &str) -> Result<Self, ScriptError> {
        Ok(serde_yaml::from_str(source)?)
    }
}

/// One script step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Insert { key: String, value: Value },
    Remove(String),
    Lookup(String),
    Rollback,
    Compact,
    Purge,
    /// Remember the current handle under a name.
    Save(String),
    /// Continue from a previously saved handle.
    Checkout(String),
    /// Report the full active state.
    Show,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Remove(_) => "remove",
            Self::Lookup(_) => "lookup",
            Self::Rollback => "rollback",
            Self::Compact => "compact",
            Self::Purge => "purge",
            Self::Save(_) => "save",
            Self::Checkout(_) => "checkout",
            Self::Show => "show",
        }
    }
}

/// What a step produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The step moved to another version.
    Version { active: usize },
    Found { key: String, value: Value },
    Removed { key: String },
    NotFound { key: String },
    Saved { name: String },
    State { entries: BTreeMap<String, Value> },
}

/// Result line for one executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub step: usize,
    pub op: &'static str,
    pub depth: usize,
    pub outcome: Outcome,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>3}] {:<8} depth={:<4} ", self.step, self.op, self.depth)?;
        match &self.outcome {
            Outcome::Version { active } => write!(f, "active={active}"),
            Outcome::Found { key, value } => write!(f, "{key} = {value}"),
            Outcome::Removed { key } => write!(f, "{key} is removed"),
            Outcome::NotFound { key } => write!(f, "{key} was never set"),
            Outcome::Saved { name } => write!(f, "saved as `{name}`"),
            Outcome::State { entries } => {
                let rendered: Vec<String> =
                    entries.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

/// Execution state: the current handle plus every saved one.
pub struct Session {
    current: VersionedMap<String, Value>,
    saved: BTreeMap<String, VersionedMap<String, Value>>,
    policy: HistoryPolicy,
}

impl Session {
    pub fn new(initial: BTreeMap<String, Value>, policy: HistoryPolicy) -> Self {
        Self {
            current: VersionedMap::new(initial),
            saved: BTreeMap::new(),
            policy,
        }
    }

    /// Execute every step of `script` on a fresh session.
    pub fn run_script(script: Script) -> Result<Vec<Report>, ScriptError> {
        let mut session = Self::new(script.initial, script.policy);
        script
            .steps
            .iter()
            .enumerate()
            .map(|(index, command)| session.execute(index + 1, command))
            .collect()
    }

    /// Execute one step. Unknown keys are reported, not treated as failures.
    pub fn execute(&mut self, step: usize, command: &Command) -> Result<Report, ScriptError> {
        tracing::debug!(step, op = command.name(), "executing step");
        let outcome = match command {
            Command::Insert { key, value } => {
                let next = self
                    .current
                    .insert(key.clone(), value.clone())
                    .apply_policy(&self.policy);
                self.advance(next)
            }
            Command::Remove(key) => {
                let next = self.current.remove(key.clone()).apply_policy(&self.policy);
                self.advance(next)
            }
            Command::Lookup(key) => match self.current.lookup(key) {
                Ok(Some(value)) => Outcome::Found {
                    key: key.clone(),
                    value: value.clone(),
                },
                Ok(None) => Outcome::Removed { key: key.clone() },
                Err(MapError::KeyNotFound) => Outcome::NotFound { key: key.clone() },
            },
            Command::Rollback => {
                let next = self.current.rollback();
                self.advance(next)
            }
            Command::Compact => {
                let next = self.current.compact();
                self.advance(next)
            }
            Command::Purge => {
                let next = self.current.purge();
                self.advance(next)
            }
            Command::Save(name) => {
                self.saved.insert(name.clone(), self.current.clone());
                Outcome::Saved { name: name.clone() }
            }
            Command::Checkout(name) => {
                let handle = self
                    .saved
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ScriptError::UnknownHandle {
                        step,
                        name: name.clone(),
                    })?;
                self.advance(handle)
            }
            Command::Show => Outcome::State {
                entries: self.current.to_map(),
            },
        };
        Ok(Report {
            step,
            op: command.name(),
            depth: self.current.depth(),
            outcome,
        })
    }

    fn advance(&mut self, next: VersionedMap<String, Value>) -> Outcome {
        self.current = next;
        Outcome::Version {
            active: self.current.len(),
        }
    }
}
