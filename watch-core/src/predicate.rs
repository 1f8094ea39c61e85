//! Structural sub-match predicates.

use serde_json::{Map, Value};
use std::fmt;
use watch_types::RawEvent;

use crate::log::Candidate;

/// An extra condition a candidate event must satisfy to match an expectation.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralPredicate {
    /// Every declared key must equal the same top-level field of the
    /// mutation's decoded JSON value. A missing field compares as `null`.
    JsonIncluding(Map<String, Value>),
    /// Every declared `KEY=VALUE` entry must appear verbatim in the resolved
    /// container environment.
    EnvIncluding(Vec<String>),
}

impl StructuralPredicate {
    /// Evaluate against one candidate.
    pub fn matches(&self, candidate: &Candidate) -> bool {
        match self {
            StructuralPredicate::JsonIncluding(expected) => {
                let RawEvent::Mutation(mutation) = &candidate.event else {
                    return false;
                };
                match mutation.json() {
                    Some(Value::Object(actual)) => expected
                        .iter()
                        .all(|(key, value)| actual.get(key).unwrap_or(&Value::Null) == value),
                    _ => false,
                }
            }
            StructuralPredicate::EnvIncluding(entries) => match &candidate.identity {
                Some(identity) => entries.iter().all(|entry| identity.has_env(entry)),
                None => false,
            },
        }
    }
}

impl fmt::Display for StructuralPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralPredicate::JsonIncluding(expected) => {
                write!(f, "json including {}", Value::Object(expected.clone()))
            }
            StructuralPredicate::EnvIncluding(entries) => {
                write!(f, "env including {:?}", entries)
            }
        }
    }
}

/// True iff every predicate holds for the candidate.
pub fn all_match(predicates: &[StructuralPredicate], candidate: &Candidate) -> bool {
    predicates.iter().all(|predicate| predicate.matches(candidate))
}
