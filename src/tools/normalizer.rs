// Argument normalizer - repairs and validates model-supplied arguments
//
// Fixed order: shape -> nested unwrap -> alias resolution -> type coercion ->
// drop undeclared -> required-field validation. Every step is a no-op on its
// own output, so normalizing a NormalizedAction again yields the same
// arguments.

use anyhow::{bail, Result};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::ActionError;
use crate::tools::types::{NormalizedAction, ParamType, RawAction, ToolDescriptor};

/// Parameter names treated as "the file" when a bare value must be wrapped
pub const DEFAULT_PATH_FIELDS: &[&str] = &["path", "file_path", "location", "filename"];

/// Sub-keys unwrapped from JSON objects smuggled inside string values
pub const DEFAULT_NESTED_KEYS: &[&str] = &["file_path", "path", "location"];

const MAX_NESTING: usize = 8;

/// Friendly name -> canonical value. Matching is case-insensitive and ignores
/// surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    /// Build a table. A canonical value may not itself be an alias key,
    /// otherwise resolution would depend on how many times it ran.
    pub fn new<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table: HashMap<String, String> = HashMap::new();
        for (key, value) in entries {
            let key = Self::fold(key.as_ref());
            if key.is_empty() {
                bail!("alias names must not be empty");
            }
            let value: String = value.into();
            if let Some(existing) = table.get(&key) {
                if *existing != value {
                    bail!(
                        "alias '{}' is defined twice with different targets ('{}' and '{}')",
                        key,
                        existing,
                        value
                    );
                }
            }
            table.insert(key, value);
        }

        for (key, target) in &table {
            if table.contains_key(&Self::fold(target)) {
                bail!(
                    "alias '{}' points at '{}', which is itself an alias",
                    key,
                    target
                );
            }
        }

        Ok(Self { entries: table })
    }

    pub fn resolve(&self, value: &str) -> Option<&str> {
        self.entries.get(&Self::fold(value)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fold(value: &str) -> String {
        value.trim().to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub aliases: AliasTable,
    pub path_fields: Vec<String>,
    pub nested_keys: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            aliases: AliasTable::default(),
            path_fields: DEFAULT_PATH_FIELDS.iter().map(|s| s.to_string()).collect(),
            nested_keys: DEFAULT_NESTED_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArgumentNormalizer {
    config: NormalizerConfig,
}

impl ArgumentNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn with_aliases(aliases: AliasTable) -> Self {
        Self::new(NormalizerConfig {
            aliases,
            ..NormalizerConfig::default()
        })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Validate `raw` against `descriptor`. Never returns a partially
    /// normalized action.
    pub fn normalize(
        &self,
        raw: RawAction,
        descriptor: &ToolDescriptor,
    ) -> Result<NormalizedAction, ActionError> {
        if let Some(name) = &raw.tool_name {
            if name != descriptor.name() {
                return Err(ActionError::UnknownTool(name.clone()));
            }
        }

        let mut args = self.shape(raw.arguments, descriptor);
        self.unwrap_nested(&mut args);
        self.resolve_aliases(&mut args);
        coerce_types(&mut args, descriptor);
        drop_undeclared(&mut args, descriptor);

        for param in descriptor.required_parameters() {
            if args.get(&param.name).map_or(true, is_empty_value) {
                return Err(ActionError::MissingRequiredArgument {
                    tool: descriptor.name().to_string(),
                    field: param.name.clone(),
                });
            }
        }

        Ok(NormalizedAction::new(descriptor.name().to_string(), args))
    }

    /// Step 1: turn whatever the model sent into a mapping
    fn shape(&self, arguments: Value, descriptor: &ToolDescriptor) -> Map<String, Value> {
        match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
                Ok(Value::Object(map)) => map,
                _ => self.wrap_positional(Value::String(s), descriptor),
            },
            other => self.wrap_positional(other, descriptor),
        }
    }

    fn wrap_positional(&self, value: Value, descriptor: &ToolDescriptor) -> Map<String, Value> {
        let mut map = Map::new();
        let primary = descriptor
            .parameters()
            .iter()
            .find(|p| self.config.path_fields.iter().any(|f| f == &p.name));

        match primary {
            Some(param) => {
                map.insert(param.name.clone(), value);
            }
            None => warn!(
                "Bare argument {} for '{}' has no path-like field to go in; dropping it",
                value,
                descriptor.name()
            ),
        }
        map
    }

    /// Step 2: `"{\"file_path\": \"x\"}"` -> `"x"`, repeated for doubly
    /// encoded values up to `MAX_NESTING` layers
    fn unwrap_nested(&self, args: &mut Map<String, Value>) {
        for (field, value) in args.iter_mut() {
            for _ in 0..MAX_NESTING {
                match self.nested_value(value) {
                    Some(unwrapped) => {
                        debug!("Unwrapped nested value for '{}'", field);
                        *value = unwrapped;
                    }
                    None => break,
                }
            }
        }
    }

    fn nested_value(&self, value: &Value) -> Option<Value> {
        let Value::String(s) = value else { return None };
        if !s.trim_start().starts_with('{') {
            return None;
        }
        let Ok(Value::Object(inner)) = serde_json::from_str::<Value>(s.trim()) else {
            return None;
        };
        self.config
            .nested_keys
            .iter()
            .find_map(|k| inner.get(k).filter(|v| !v.is_null()))
            .cloned()
    }

    /// Step 3: friendly names -> canonical values
    fn resolve_aliases(&self, args: &mut Map<String, Value>) {
        if self.config.aliases.is_empty() {
            return;
        }
        for (field, value) in args.iter_mut() {
            let Value::String(s) = value else { continue };
            if let Some(canonical) = self.config.aliases.resolve(s) {
                debug!("Resolved alias '{}' for '{}' -> '{}'", s, field, canonical);
                *value = Value::String(canonical.to_string());
            }
        }
    }
}

/// Step 4: bring values in line with declared types where it is unambiguous.
/// Values that cannot be coerced are left for the tool to reject.
fn coerce_types(args: &mut Map<String, Value>, descriptor: &ToolDescriptor) {
    for param in descriptor.parameters() {
        let Some(value) = args.get_mut(&param.name) else {
            continue;
        };
        if let Some(coerced) = coerce(value, param.kind) {
            *value = coerced;
        }
    }
}

fn coerce(value: &Value, kind: ParamType) -> Option<Value> {
    match (kind, value) {
        (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (ParamType::Integer, Value::Number(n)) if n.is_f64() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (ParamType::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (ParamType::Object, Value::String(s)) => match serde_json::from_str(s.trim()) {
            Ok(v @ Value::Object(_)) => Some(v),
            _ => None,
        },
        (ParamType::Array, Value::String(s)) => match serde_json::from_str(s.trim()) {
            Ok(v @ Value::Array(_)) => Some(v),
            _ => None,
        },
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

/// Step 5
fn drop_undeclared(args: &mut Map<String, Value>, descriptor: &ToolDescriptor) {
    if descriptor.parameters().is_empty() {
        return;
    }
    args.retain(|name, _| {
        let declared = descriptor.parameter(name).is_some();
        if !declared {
            debug!("Dropping undeclared argument '{}' for '{}'", name, descriptor.name());
        }
        declared
    });
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
