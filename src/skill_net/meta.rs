//! Free-form, string-keyed bookkeeping a hook can attach to a gate state
//! (§3 "meta", §9 "Hooks that mutate shared state"). The kernel never
//! inspects it; it exists purely as an escape valve for policies that need
//! domain knowledge beyond pure token topology (observed channels, backed
//! up paths, pass/fail flags, counters).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta(BTreeMap<String, Value>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn increment(&mut self, key: &str) -> i64 {
        let next = self.get(key).and_then(Value::as_i64).unwrap_or(0) + 1;
        self.set(key.to_string(), next);
        next
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}
