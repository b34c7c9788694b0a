//! `component.Base`: the root class every widget extends.
//!
//! Configs:
//! - `id`: element id; falls back to `component-<n>` derived from the instance id.
//! - `cls`: list of css class names.
//! - `style`: map of inline style properties.
//! - `hidden`: toggles the `neo-hidden` class.

use slotmap::Key;
use tracing::trace;

use crate::config::{ClassDefinition, ConfigMap};
use crate::error::{Result, RuntimeError};
use crate::instance::InstanceId;
use crate::runtime::Runtime;
use crate::value::Value;

pub const CLASS_NAME: &str = "component.Base";

/// Class toggled by the `hidden` config.
pub const HIDDEN_CLS: &str = "neo-hidden";

/// Class definition for `component.Base`.
pub fn definition() -> ClassDefinition {
    ClassDefinition::new(CLASS_NAME)
        .configs(
            ConfigMap::new()
                .declare("id_", Value::Null)
                .declare("cls_", Value::List(Vec::new()))
                .declare("style_", Value::Map(Default::default()))
                .declare("hidden_", false),
        )
        .before_get("id", |_, id, stored| {
            if stored.is_null() {
                Value::from(fallback_id(id))
            } else {
                stored.clone()
            }
        })
        .before_set("cls", |_, _, incoming, _| normalize_cls(incoming))
        .before_set("style", |_, _, incoming, _| match incoming {
            Value::Null => Ok(Value::Map(Default::default())),
            Value::Map(_) => Ok(incoming),
            other => Err(RuntimeError::InvalidValue {
                config: "style".into(),
                message: format!("expected a map, got {other}"),
            }),
        })
        .after_set("hidden", |rt, id, value, _| {
            toggle_cls(rt, id, HIDDEN_CLS, value.as_bool().unwrap_or(false))
        })
}

fn fallback_id(id: InstanceId) -> String {
    format!("component-{}", id.data().as_ffi())
}

/// Accept `null` or a list of strings; drop duplicates keeping first position.
fn normalize_cls(incoming: Value) -> Result<Value> {
    let items = match incoming {
        Value::Null => return Ok(Value::List(Vec::new())),
        Value::List(items) => items,
        other => {
            return Err(RuntimeError::InvalidValue {
                config: "cls".into(),
                message: format!("expected a list of class names, got {other}"),
            })
        }
    };

    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if item.as_str().is_none() {
            return Err(RuntimeError::InvalidValue {
                config: "cls".into(),
                message: format!("class names must be strings, got {item}"),
            });
        }
        if !out.contains(&item) {
            out.push(item);
        }
    }
    Ok(Value::List(out))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The element id (configured or derived).
pub fn element_id(rt: &Runtime, id: InstanceId) -> Result<String> {
    Ok(rt.get(id, "id")?.as_str().unwrap_or_default().to_owned())
}

/// Current css classes.
pub fn cls_list(rt: &Runtime, id: InstanceId) -> Result<Vec<String>> {
    Ok(rt
        .get(id, "cls")?
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_str().map(str::to_owned))
        .collect())
}

/// Whether `name` is among the current css classes.
pub fn has_cls(rt: &Runtime, id: InstanceId, name: &str) -> Result<bool> {
    Ok(cls_list(rt, id)?.iter().any(|c| c == name))
}

/// Add or remove one class. Writes only when membership changes.
pub fn toggle_cls(rt: &mut Runtime, id: InstanceId, name: &str, on: bool) -> Result<()> {
    let mut cls = cls_list(rt, id)?;
    let present = cls.iter().any(|c| c == name);
    if present == on {
        return Ok(());
    }
    if on {
        cls.push(name.to_owned());
    } else {
        cls.retain(|c| c != name);
    }
    trace!(?id, cls = name, on, "toggling class");
    rt.set(id, "cls", cls)
}

/// Merge `entries` into the current style and write it back.
pub fn assign_style<K, V>(
    rt: &mut Runtime,
    id: InstanceId,
    entries: impl IntoIterator<Item = (K, V)>,
) -> Result<()>
where
    K: Into<String>,
    V: Into<Value>,
{
    let mut style = rt.get(id, "style")?.as_map().cloned().unwrap_or_default();
    for (key, value) in entries {
        style.insert(key.into(), value.into());
    }
    rt.set(id, "style", Value::Map(style))
}
