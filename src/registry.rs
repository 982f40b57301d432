//! Model Registry & External Surface
//!
//! The process-wide collection of loaded models. Each entry owns one model
//! and its evaluation sessions ("children"). Slots are reused through a
//! free-list, so closing a model never re-indexes the surviving ones and
//! handle resolution stays O(1).
//!
//! Every fallible operation here follows the same discipline: the error is
//! recorded on the model's read-once message slot and returned to the
//! caller, mirroring the non-zero-return / `get_msg_text` convention of the
//! external surface.

use parking_lot::RwLock;

use crate::error::{FuzzyError, Result};
use crate::fcl;
use crate::grid::GridSpec;
use crate::infer;
use crate::model::Model;
use crate::session::Session;

/// Handle of a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(usize);

/// Handle of one evaluation session, scoped to its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(usize);

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Grid resolutions applied to models created by this registry
    pub grid: GridSpec,
    /// Maximum sessions per model (0 = unlimited)
    pub max_sessions_per_model: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            grid: GridSpec::default(),
            max_sessions_per_model: 0,
        }
    }
}

struct Entry {
    model: Model,
    sessions: Vec<Option<Session>>,
}

#[derive(Default)]
struct Slots {
    entries: Vec<Option<Entry>>,
    free: Vec<usize>,
}

/// Process-wide, thread-safe collection of models and their sessions.
pub struct ModelRegistry {
    slots: RwLock<Slots>,
    config: RegistryConfig,
}

impl ModelRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        ModelRegistry {
            slots: RwLock::new(Slots::default()),
            config,
        }
    }

    /// Create an empty model and return its handle.
    pub fn new_model(&self) -> ModelHandle {
        let mut slots = self.slots.write();
        let entry = Entry {
            model: Model::new(self.config.grid),
            sessions: Vec::new(),
        };
        let index = match slots.free.pop() {
            Some(index) => {
                slots.entries[index] = Some(entry);
                index
            }
            None => {
                slots.entries.push(Some(entry));
                slots.entries.len() - 1
            }
        };
        tracing::info!(model = index, "model_created");
        ModelHandle(index)
    }

    /// Release a model and all of its sessions. The slot is recycled;
    /// handles of other models stay valid.
    pub fn close_model(&self, handle: ModelHandle) -> Result<()> {
        let mut slots = self.slots.write();
        let taken = slots.entries.get_mut(handle.0).and_then(Option::take);
        if taken.is_none() {
            return Err(FuzzyError::UnknownHandle(format!("model {}", handle.0)));
        }
        slots.free.push(handle.0);
        tracing::info!(model = handle.0, "model_closed");
        Ok(())
    }

    /// Number of live models.
    pub fn model_count(&self) -> usize {
        self.slots.read().entries.iter().flatten().count()
    }

    /// Load FCL text into the model, replacing its previous contents.
    ///
    /// On success all existing sessions of the model are dropped - their
    /// shapes no longer match. On failure the previous contents are kept
    /// and the error is recorded on the model's message slot.
    pub fn load_fcl_string(&self, handle: ModelHandle, text: &str) -> Result<()> {
        let mut slots = self.slots.write();
        let entry = entry_mut(&mut slots, handle)?;
        match fcl::load_str(text, entry.model.grid()) {
            Ok(model) => {
                entry.model = model;
                entry.sessions.clear();
                tracing::info!(
                    model = handle.0,
                    inputs = entry.model.num_inputs(),
                    rules = entry.model.rules().len(),
                    "fcl_loaded"
                );
                Ok(())
            }
            Err(err) => {
                entry.model.record(&err);
                Err(err)
            }
        }
    }

    /// Load an FCL file into the model. See [`ModelRegistry::load_fcl_string`].
    pub fn load_fcl_file(&self, handle: ModelHandle, path: &str) -> Result<()> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                let err = FuzzyError::FileOpen {
                    path: path.to_string(),
                    source,
                };
                let mut slots = self.slots.write();
                let entry = entry_mut(&mut slots, handle)?;
                entry.model.record(&err);
                return Err(err);
            }
        };
        self.load_fcl_string(handle, &text)
    }

    /// Serialize the model to FCL text.
    pub fn save_fcl_string(&self, handle: ModelHandle) -> Result<String> {
        let slots = self.slots.read();
        let entry = entry_ref(&slots, handle)?;
        Ok(fcl::save_str(&entry.model))
    }

    /// Serialize the model to an FCL file.
    pub fn save_fcl_file(&self, handle: ModelHandle, path: &str) -> Result<()> {
        let text = self.save_fcl_string(handle)?;
        std::fs::write(path, text).map_err(|source| {
            let err = FuzzyError::FileOpen {
                path: path.to_string(),
                source,
            };
            let mut slots = self.slots.write();
            if let Ok(entry) = entry_mut(&mut slots, handle) {
                entry.model.record(&err);
            }
            err
        })
    }

    /// Create a new evaluation session for the model.
    pub fn new_child(&self, handle: ModelHandle) -> Result<SessionHandle> {
        let mut slots = self.slots.write();
        let limit = self.config.max_sessions_per_model;
        let entry = entry_mut(&mut slots, handle)?;

        if limit > 0 && entry.sessions.iter().flatten().count() >= limit {
            let err = FuzzyError::SessionLimit(limit);
            entry.model.record(&err);
            return Err(err);
        }

        let session = Session::new(&entry.model);
        let index = match entry.sessions.iter().position(Option::is_none) {
            Some(index) => {
                entry.sessions[index] = Some(session);
                index
            }
            None => {
                entry.sessions.push(Some(session));
                entry.sessions.len() - 1
            }
        };
        Ok(SessionHandle(index))
    }

    /// Drop one session of the model.
    pub fn close_child(&self, handle: ModelHandle, child: SessionHandle) -> Result<()> {
        let mut slots = self.slots.write();
        let entry = entry_mut(&mut slots, handle)?;
        let taken = entry.sessions.get_mut(child.0).and_then(Option::take);
        if taken.is_none() {
            return Err(FuzzyError::UnknownHandle(format!("session {}", child.0)));
        }
        Ok(())
    }

    /// Set an input variable's crisp value for one session. Values outside
    /// the variable's domain clamp to the nearest endpoint; that is a
    /// contract of the index map, not an error.
    pub fn set_value(
        &self,
        handle: ModelHandle,
        child: SessionHandle,
        var_idx: usize,
        value: f64,
    ) -> Result<()> {
        let mut slots = self.slots.write();
        let entry = entry_mut(&mut slots, handle)?;

        let Some(var) = entry.model.input(var_idx) else {
            let err =
                FuzzyError::UnknownHandle(format!("input variable index {var_idx} out of range"));
            entry.model.record(&err);
            return Err(err);
        };
        let idx = var.map().index_of(value);

        let session = session_mut(entry, child)?;
        session.set_input_idx(var_idx, idx);
        Ok(())
    }

    /// Evaluate the session and defuzzify. `Ok(None)` means no output set
    /// is active (the NoOutput sentinel).
    pub fn get_output_value(
        &self,
        handle: ModelHandle,
        child: SessionHandle,
    ) -> Result<Option<f64>> {
        let mut slots = self.slots.write();
        let entry = entry_mut(&mut slots, handle)?;
        let Entry { model, sessions } = entry;
        let session = sessions
            .get_mut(child.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| FuzzyError::UnknownHandle(format!("session {}", child.0)))?;
        Ok(infer::evaluate(model, session))
    }

    /// Read (and consume) the model's last error message.
    pub fn take_msg_text(&self, handle: ModelHandle) -> Result<Option<String>> {
        let mut slots = self.slots.write();
        let entry = entry_mut(&mut slots, handle)?;
        Ok(entry.model.take_msg())
    }

    /// Run a closure with read access to a model.
    pub fn with_model<R>(&self, handle: ModelHandle, f: impl FnOnce(&Model) -> R) -> Result<R> {
        let slots = self.slots.read();
        let entry = entry_ref(&slots, handle)?;
        Ok(f(&entry.model))
    }

    /// Run a closure with write access to a model. Structural mutation
    /// invalidates nothing here - sessions keep their indices and are
    /// resized at the next evaluation.
    pub fn with_model_mut<R>(
        &self,
        handle: ModelHandle,
        f: impl FnOnce(&mut Model) -> R,
    ) -> Result<R> {
        let mut slots = self.slots.write();
        let entry = entry_mut(&mut slots, handle)?;
        Ok(f(&mut entry.model))
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        ModelRegistry::new(RegistryConfig::default())
    }
}

fn entry_ref(slots: &Slots, handle: ModelHandle) -> Result<&Entry> {
    slots
        .entries
        .get(handle.0)
        .and_then(Option::as_ref)
        .ok_or_else(|| FuzzyError::UnknownHandle(format!("model {}", handle.0)))
}

fn entry_mut(slots: &mut Slots, handle: ModelHandle) -> Result<&mut Entry> {
    slots
        .entries
        .get_mut(handle.0)
        .and_then(Option::as_mut)
        .ok_or_else(|| FuzzyError::UnknownHandle(format!("model {}", handle.0)))
}

fn session_mut(entry: &mut Entry, child: SessionHandle) -> Result<&mut Session> {
    entry
        .sessions
        .get_mut(child.0)
        .and_then(Option::as_mut)
        .ok_or_else(|| FuzzyError::UnknownHandle(format!("session {}", child.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_close_model() {
        let registry = ModelRegistry::default();
        let a = registry.new_model();
        let b = registry.new_model();
        assert_ne!(a, b);
        assert_eq!(registry.model_count(), 2);

        registry.close_model(a).unwrap();
        assert_eq!(registry.model_count(), 1);
        assert!(matches!(
            registry.close_model(a),
            Err(FuzzyError::UnknownHandle(_))
        ));
    }

    #[test]
    fn test_closing_a_model_keeps_peer_handles_valid() {
        let registry = ModelRegistry::default();
        let a = registry.new_model();
        let b = registry.new_model();
        let c = registry.new_model();

        registry.close_model(b).unwrap();
        // a and c still resolve
        assert!(registry.with_model(a, |_| ()).is_ok());
        assert!(registry.with_model(c, |_| ()).is_ok());

        // the freed slot is recycled
        let d = registry.new_model();
        assert_eq!(d, b);
    }

    #[test]
    fn test_session_limit() {
        let registry = ModelRegistry::new(RegistryConfig {
            max_sessions_per_model: 2,
            ..RegistryConfig::default()
        });
        let m = registry.new_model();
        registry.new_child(m).unwrap();
        registry.new_child(m).unwrap();
        assert!(registry.new_child(m).is_err());
        // the failure is readable through the message channel once
        assert!(registry.take_msg_text(m).unwrap().is_some());
        assert!(registry.take_msg_text(m).unwrap().is_none());
    }

    #[test]
    fn test_close_child_recycles_slot() {
        let registry = ModelRegistry::default();
        let m = registry.new_model();
        let s1 = registry.new_child(m).unwrap();
        let _s2 = registry.new_child(m).unwrap();

        registry.close_child(m, s1).unwrap();
        assert!(matches!(
            registry.close_child(m, s1),
            Err(FuzzyError::UnknownHandle(_))
        ));
        let s3 = registry.new_child(m).unwrap();
        assert_eq!(s3, s1);
    }

    #[test]
    fn test_set_value_on_unknown_variable() {
        let registry = ModelRegistry::default();
        let m = registry.new_model();
        let s = registry.new_child(m).unwrap();
        assert!(registry.set_value(m, s, 0, 1.0).is_err());
    }

    #[test]
    fn test_output_of_empty_model_is_none() {
        let registry = ModelRegistry::default();
        let m = registry.new_model();
        let s = registry.new_child(m).unwrap();
        assert_eq!(registry.get_output_value(m, s).unwrap(), None);
    }
}
