//! Component profiles and the [`ComponentFactory`] that instantiates them.
//!
//! A host registers each component type once, together with its
//! [`ComponentProfile`] and a constructor. Instances are then created by type
//! name; the factory enforces the profile's `max_instance` limit and names
//! instances `<type_name><index>`.

use std::collections::HashMap;

use kobuki_types::KobukiError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How the host schedules a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityType {
    /// Executed at a fixed rate by a periodic execution context.
    Periodic,
    /// Executed when an external event arrives.
    Event,
}

/// Static description of a component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentProfile {
    pub implementation_id: String,
    pub type_name: String,
    pub description: String,
    pub version: String,
    pub vendor: String,
    pub category: String,
    pub activity_type: ActivityType,
    pub kind: String,
    /// Maximum number of live instances; `0` means unlimited.
    pub max_instance: usize,
    pub language: String,
}

/// A component created by a [`ComponentFactory`].
pub struct FactoryInstance<C> {
    pub instance_name: String,
    pub type_name: String,
    pub component: C,
}

type Constructor<C> = Box<dyn Fn() -> Result<C, KobukiError> + Send + Sync>;

struct FactoryEntry<C> {
    profile: ComponentProfile,
    constructor: Constructor<C>,
    live: usize,
    next_index: usize,
}

/// Registry of component constructors keyed by type name.
pub struct ComponentFactory<C> {
    entries: HashMap<String, FactoryEntry<C>>,
}

impl<C> Default for ComponentFactory<C> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<C> ComponentFactory<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `profile.type_name`. A previous
    /// registration with the same type name is replaced and its instance
    /// count is reset.
    pub fn register<F>(&mut self, profile: ComponentProfile, constructor: F)
    where
        F: Fn() -> Result<C, KobukiError> + Send + Sync + 'static,
    {
        info!(type_name = %profile.type_name, version = %profile.version, "component registered");
        self.entries.insert(
            profile.type_name.clone(),
            FactoryEntry {
                profile,
                constructor: Box::new(constructor),
                live: 0,
                next_index: 0,
            },
        );
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of live instances of `type_name`.
    pub fn live_instances(&self, type_name: &str) -> usize {
        self.entries.get(type_name).map_or(0, |e| e.live)
    }

    /// Construct a new instance of `type_name`.
    ///
    /// # Errors
    ///
    /// * [`KobukiError::UnknownComponent`] when nothing is registered under
    ///   `type_name`.
    /// * [`KobukiError::FactoryLimit`] when `max_instance` instances are
    ///   already live.
    /// * Any error returned by the constructor.
    pub fn create(&mut self, type_name: &str) -> Result<FactoryInstance<C>, KobukiError> {
        let entry = self
            .entries
            .get_mut(type_name)
            .ok_or_else(|| KobukiError::UnknownComponent(type_name.to_string()))?;

        let max = entry.profile.max_instance;
        if max != 0 && entry.live >= max {
            return Err(KobukiError::FactoryLimit {
                type_name: type_name.to_string(),
                max_instance: max,
            });
        }

        let component = (entry.constructor)()?;
        let instance_name = format!("{}{}", type_name, entry.next_index);
        entry.live += 1;
        entry.next_index += 1;
        debug!(instance = %instance_name, "component instance created");

        Ok(FactoryInstance {
            instance_name,
            type_name: type_name.to_string(),
            component,
        })
    }

    /// Release an instance, freeing its slot.
    pub fn destroy(&mut self, instance: FactoryInstance<C>) {
        if let Some(entry) = self.entries.get_mut(&instance.type_name) {
            entry.live = entry.live.saturating_sub(1);
        }
        debug!(instance = %instance.instance_name, "component instance destroyed");
    }
}
