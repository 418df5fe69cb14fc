//! Observed reads

use serde::{Deserialize, Serialize};
use std::fmt;

/// The value seen by one read statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Statement index of the read
    pub index: usize,
    /// What was read: `b` for the binding, `*foo` through a reference
    pub name: String,
    pub value: i64,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} = {}", self.index, self.name, self.value)
    }
}

/// Every observation of a run, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    observations: Vec<Observation>,
}

impl Trace {
    pub(crate) fn record(&mut self, index: usize, name: String, value: i64) {
        tracing::trace!(index, name = name.as_str(), value, "observed");
        self.observations.push(Observation { index, name, value });
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Value of the most recent read named `name`
    pub fn last_observed(&self, name: &str) -> Option<i64> {
        self.observations
            .iter()
            .rev()
            .find(|observation| observation.name == name)
            .map(|observation| observation.value)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
