//! Label queries
//!
//! A query is an operator, a label key and candidate values. The JSON form is
//! `{"op": "in", "key": "rack", "values": ["7", "8"]}`.

use crate::error::{Result, StoreError};
use crate::types::{Resource, ResourceMap};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    #[serde(rename = "==", alias = "eq", alias = "equal")]
    MatchEqual,
    #[serde(rename = "!=", alias = "neq", alias = "notequal")]
    MatchNotEqual,
    #[serde(rename = "in")]
    MatchIn,
    #[serde(rename = "notin", alias = "not_in")]
    MatchNotIn,
}

impl Operator {
    /// Operators that take exactly one candidate value
    pub fn is_singular(self) -> bool {
        matches!(self, Operator::MatchEqual | Operator::MatchNotEqual)
    }

    /// Whether matching resources carry one of the candidate values
    pub fn is_inclusive(self) -> bool {
        matches!(self, Operator::MatchEqual | Operator::MatchIn)
    }
}

impl FromStr for Operator {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "==" | "=" | "eq" | "equal" | "matchequal" => Ok(Operator::MatchEqual),
            "!=" | "neq" | "notequal" | "matchnotequal" => Ok(Operator::MatchNotEqual),
            "in" | "matchin" => Ok(Operator::MatchIn),
            "notin" | "not_in" | "matchnotin" => Ok(Operator::MatchNotIn),
            _ => Err(StoreError::InvalidQuery(format!("unknown operator {:?}", s))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::MatchEqual => "==",
            Operator::MatchNotEqual => "!=",
            Operator::MatchIn => "in",
            Operator::MatchNotIn => "notin",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub op: Operator,
    pub key: String,
    #[serde(default)]
    pub values: SmallVec<[String; 4]>,
}

impl Query {
    pub fn new<I, S>(op: Operator, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            op,
            key: key.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn equal(key: &str, value: &str) -> Self {
        Self::new(Operator::MatchEqual, key, [value])
    }

    pub fn not_equal(key: &str, value: &str) -> Self {
        Self::new(Operator::MatchNotEqual, key, [value])
    }

    pub fn any_of(key: &str, values: &[&str]) -> Self {
        Self::new(Operator::MatchIn, key, values.iter().copied())
    }

    pub fn none_of(key: &str, values: &[&str]) -> Self {
        Self::new(Operator::MatchNotIn, key, values.iter().copied())
    }

    /// Parse a single JSON query and validate it.
    pub fn parse(json: &str) -> Result<Self> {
        let query: Query = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;
        query.validate()?;
        Ok(query)
    }

    /// Parse a JSON array of queries, validating each.
    pub fn parse_many(json: &str) -> Result<Vec<Self>> {
        let queries: Vec<Query> = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;
        for q in &queries {
            q.validate()?;
        }
        Ok(queries)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(StoreError::InvalidQuery("missing label key".into()));
        }
        if self.op.is_singular() && self.values.len() != 1 {
            return Err(StoreError::InvalidQuery(format!(
                "{} on {:?} takes exactly one value, got {}",
                self.op,
                self.key,
                self.values.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn excludes(&self, value: &str) -> bool {
        !self.values.iter().any(|v| v == value)
    }

    /// Evaluate against a resource's own labels. Resources without the key
    /// never match, for either polarity.
    pub fn matches(&self, res: &dyn Resource) -> bool {
        match res.labels().get(&self.key) {
            Some(value) if self.op.is_inclusive() => !self.excludes(value),
            Some(value) => self.excludes(value),
            None => false,
        }
    }
}

/// Narrow an existing result down to resources matching `query`.
///
/// Used to chain label queries after a first indexed lookup; keys of the
/// input map are preserved.
pub fn filter_label(query: &Query, resources: &ResourceMap) -> Result<ResourceMap> {
    query.validate()?;
    let mut results = ResourceMap::new();
    for (key, list) in resources.iter() {
        for res in list.iter().filter(|r| query.matches(r.as_ref())) {
            results.add(res.clone(), key);
        }
    }
    Ok(results)
}
