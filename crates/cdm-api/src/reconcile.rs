// Desired-vs-observed reconciliation.
//
// The cluster has no upsert for several resource types (archive targets,
// cloud accounts, SMTP, VLAN), so every create/update first fetches the
// current definition, strips the fields only the server sets, and compares.
// A match means the write is skipped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Order-insensitive structural equality over two JSON trees.
///
/// Numbers compare by their `f64` value, as the cluster's JSON decoding
/// treats every number as a float: `5` and `5.0` are equal. No other
/// coercion happens; `"5"` and `5` differ.
pub fn is_equivalent(desired: &Value, observed: &Value) -> bool {
    match (desired, observed) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => same_float(x, y),
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| is_equivalent(x, y))
        }
        (Value::Object(a), Value::Object(b)) => maps_equivalent(a, b),
        _ => false,
    }
}

#[allow(clippy::float_cmp)]
fn same_float(x: f64, y: f64) -> bool {
    x == y
}

fn maps_equivalent(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).is_some_and(|other| is_equivalent(v, other)))
}

/// Server-only fields to remove from an observed definition before comparing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StripFields(Vec<String>);

impl StripFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Remove the listed top-level keys from `map`.
    pub fn apply(&self, map: &mut Map<String, Value>) {
        for field in &self.0 {
            map.remove(field);
        }
    }
}

/// Compare `desired` against a copy of `observed` passed through `strip`.
///
/// `observed` is never modified. A non-object `observed` is compared as-is.
pub fn matches_after<F>(desired: &Value, observed: &Value, strip: F) -> bool
where
    F: FnOnce(&mut Map<String, Value>),
{
    let mut observed = observed.clone();
    if let Value::Object(map) = &mut observed {
        strip(map);
    }
    is_equivalent(desired, &observed)
}

/// [`matches_after`] with a [`StripFields`] list.
pub fn matches_stripped(desired: &Value, observed: &Value, strip: &StripFields) -> bool {
    matches_after(desired, observed, |map| strip.apply(map))
}
