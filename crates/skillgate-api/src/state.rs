//! Shared state handed to the router.

use std::{collections::BTreeMap, sync::Arc};

use skillgate_core::{Clock, SystemClock};
use skillgate_verify::RequestValidator;

use crate::config::{Config, SkillApp};

/// Immutable state every skill route and probe reads.
///
/// Built once at startup; cloning shares the validator, skill table and
/// clock.
#[derive(Debug, Clone)]
pub struct GateState {
    /// Validator run on every skill request.
    pub validator: RequestValidator,
    /// Whether the `_dev` query parameter is honoured.
    pub allow_dev_bypass: bool,
    /// Skills served, keyed by path segment.
    pub skills: Arc<BTreeMap<String, SkillApp>>,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
    /// Time source for probes.
    pub clock: Arc<dyn Clock>,
}

impl GateState {
    /// State with strict defaults: no bypass and no skills registered.
    pub fn new(validator: RequestValidator) -> Self {
        let defaults = Config::default();
        Self {
            validator,
            allow_dev_bypass: defaults.allow_dev_bypass,
            skills: Arc::new(defaults.skills),
            max_body_bytes: defaults.max_body_bytes,
            clock: Arc::new(SystemClock),
        }
    }

    /// State taking its request settings and skill table from `config`.
    pub fn from_config(validator: RequestValidator, config: &Config) -> Self {
        Self {
            allow_dev_bypass: config.allow_dev_bypass,
            skills: Arc::new(config.skills.clone()),
            max_body_bytes: config.max_body_bytes,
            ..Self::new(validator)
        }
    }

    /// Enables or disables the `_dev` bypass.
    #[must_use]
    pub fn with_dev_bypass(mut self, allow: bool) -> Self {
        self.allow_dev_bypass = allow;
        self
    }

    /// Serves `name` for requests naming `application_id`.
    #[must_use]
    pub fn with_skill(
        mut self,
        name: impl Into<String>,
        application_id: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.skills)
            .insert(name.into(), SkillApp { application_id: application_id.into() });
        self
    }

    /// Registered skill for a path segment.
    pub fn skill(&self, name: &str) -> Option<&SkillApp> {
        self.skills.get(name)
    }

    /// Replaces the probe clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
