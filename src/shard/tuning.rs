use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server id flag (`-sid`).
pub const SID: &str = "sid";
/// Worker thread count flag (`-thnum`).
pub const THNUM: &str = "thnum";
/// Hash bucket count.
pub const BNUM: &str = "bnum";
/// Record alignment power.
pub const APOW: &str = "apow";
/// Free block pool power.
pub const FPOW: &str = "fpow";
/// Cached non-leaf node count.
pub const NCNUM: &str = "ncnum";
/// Extra mapped memory size. This is the knob aging instances shrink.
pub const XMSIZ: &str = "xmsiz";
/// Free-form database options string.
pub const OPTS: &str = "opts";

/// Knobs passed to the server as command line flags rather than appended to
/// the database path.
const SERVER_FLAGS: [&str; 2] = [SID, THNUM];

/// Rejects text that would break out of its slot on the launch command line.
pub(crate) fn check_token(what: &str, token: &str) -> Result<(), String> {
    match token.chars().find(|c| c.is_whitespace() || c.is_control() || *c == '#') {
        Some(c) => Err(format!("{} '{}' contains {:?}", what, token.escape_debug(), c)),
        None => Ok(()),
    }
}

/// Named tuning knobs for one instance.
///
/// Merging is per key: an override replaces only the knobs it names. Knobs
/// that are never set are left out of the launch unit entirely so the
/// server's own defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TuningOptions(BTreeMap<String, String>);

impl TuningOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, knob: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(knob, value);
        self
    }

    pub fn set(&mut self, knob: impl Into<String>, value: impl Into<String>) {
        self.0.insert(knob.into(), value.into());
    }

    pub fn get(&self, knob: &str) -> Option<&str> {
        self.0.get(knob).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a copy of `self` with every knob in `overrides` applied on top.
    pub fn merged_with(&self, overrides: &TuningOptions) -> TuningOptions {
        let mut merged = self.clone();
        for (knob, value) in overrides.iter() {
            merged.set(knob, value);
        }
        merged
    }

    /// Knobs rendered as `-knob value` server flags, in a fixed order.
    pub fn server_flags(&self) -> impl Iterator<Item = (&str, &str)> {
        SERVER_FLAGS
            .iter()
            .filter_map(move |flag| self.get(flag).map(|value| (*flag, value)))
    }

    /// Knobs rendered as `#knob=value` database path parameters.
    pub fn database_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(knob, _)| !SERVER_FLAGS.contains(knob))
    }

    /// Every knob name and value must be a single command line token without
    /// `#`, and knob names cannot contain `=`.
    pub fn validate(&self) -> Result<(), String> {
        for (knob, value) in self.iter() {
            if knob.is_empty() || knob.contains('=') {
                return Err(format!("invalid tuning knob name '{}'", knob.escape_debug()));
            }
            check_token("tuning knob", knob)?;
            check_token(&format!("value of '{}'", knob), value)?;
        }
        Ok(())
    }

    /// Parses `knob=value` assignments as given on the command line.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (knob, value) = assignment
                .split_once('=')
                .ok_or_else(|| format!("Invalid tuning '{}'. Expected format: knob=value", assignment))?;
            let knob = knob.trim();
            if knob.is_empty() {
                return Err(format!("Invalid tuning '{}': empty knob name", assignment));
            }
            options.set(knob, value.trim());
        }
        options.validate()?;
        Ok(options)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TuningOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut options = Self::new();
        for (knob, value) in iter {
            options.set(knob, value);
        }
        options
    }
}
