// Core types for the tool-call pipeline
//
// RawAction (model output, untrusted) -> NormalizedAction (validated against a
// ToolDescriptor) -> ResultEnvelope (what the caller gets back).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ActionError, ErrorKind};

/// Tool definition as listed by a tool server (MCP `tools/list` shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: ToolInputSchema,
}

/// JSON Schema for tool input parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String, // Usually "object"
    #[serde(default = "empty_object")]
    pub properties: Value,
    #[serde(default)]
    pub required: Vec<String>,
}

fn default_schema_type() -> String {
    "object".to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self {
            schema_type: default_schema_type(),
            properties: empty_object(),
            required: Vec::new(),
        }
    }
}

impl ToolInputSchema {
    /// Build a schema from `(name, type, description, required)` tuples, in order
    pub fn from_params(params: &[(&str, &str, &str, bool)]) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, ty, description, is_required) in params {
            let mut prop = Map::new();
            if !ty.is_empty() {
                prop.insert("type".to_string(), Value::String(ty.to_string()));
            }
            prop.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
            properties.insert(name.to_string(), Value::Object(prop));
            if *is_required {
                required.push(name.to_string());
            }
        }

        Self {
            schema_type: default_schema_type(),
            properties: Value::Object(properties),
            required,
        }
    }
}

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl ParamType {
    /// Read the type out of one JSON-Schema property.
    ///
    /// Handles `"type": "x"`, `"type": ["x", "null"]` and `anyOf` unions
    /// (first non-null member wins).
    pub fn from_property(prop: &Value) -> Self {
        match prop.get("type") {
            Some(Value::String(t)) => Self::from_name(t),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(Self::from_name)
                .unwrap_or(ParamType::Any),
            _ => prop
                .get("anyOf")
                .and_then(Value::as_array)
                .and_then(|members| {
                    members
                        .iter()
                        .map(Self::from_property)
                        .find(|t| *t != ParamType::Any)
                })
                .unwrap_or(ParamType::Any),
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "string" => ParamType::String,
            "integer" => ParamType::Integer,
            "number" => ParamType::Number,
            "boolean" => ParamType::Boolean,
            "object" => ParamType::Object,
            "array" => ParamType::Array,
            _ => ParamType::Any,
        }
    }
}

/// One declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A tool as known to the registry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    input_schema: ToolInputSchema,
}

impl ToolDescriptor {
    pub fn from_definition(def: ToolDefinition) -> Self {
        let schema = def.input_schema;
        let mut parameters = Vec::new();

        if let Some(props) = schema.properties.as_object() {
            for (name, prop) in props {
                parameters.push(ParameterSpec {
                    name: name.clone(),
                    kind: ParamType::from_property(prop),
                    required: schema.required.iter().any(|r| r == name),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
        }

        // Required names that the schema forgot to declare still count
        for name in &schema.required {
            if !parameters.iter().any(|p| &p.name == name) {
                parameters.push(ParameterSpec {
                    name: name.clone(),
                    kind: ParamType::Any,
                    required: true,
                    description: None,
                });
            }
        }

        Self {
            description: def.description.unwrap_or_default(),
            name: def.name,
            parameters,
            input_schema: schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn input_schema(&self) -> &ToolInputSchema {
        &self.input_schema
    }

    /// Definition to hand to a model that supports native tool calling
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// An action as proposed by the model, before any validation
#[derive(Debug, Clone, PartialEq)]
pub struct RawAction {
    pub tool_name: Option<String>,
    pub arguments: Value,
}

impl RawAction {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            arguments,
        }
    }
}

/// A validated action. Only the normalizer builds these.
///
/// Deliberately not `Clone`: `Dispatcher::dispatch` consumes it, so one
/// action can reach the tool collaborator at most once.
#[derive(Debug, PartialEq)]
pub struct NormalizedAction {
    id: String,
    tool_name: String,
    arguments: Map<String, Value>,
}

impl NormalizedAction {
    pub(crate) fn new(tool_name: String, arguments: Map<String, Value>) -> Self {
        Self {
            id: Self::generate_id(),
            tool_name,
            arguments,
        }
    }

    /// Generate a call id for log correlation
    pub fn generate_id() -> String {
        use rand::Rng;
        let random: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        format!("call_{}", random)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// View this action as raw model output again (for re-normalization)
    pub fn to_raw(&self) -> RawAction {
        RawAction {
            tool_name: Some(self.tool_name.clone()),
            arguments: Value::Object(self.arguments.clone()),
        }
    }
}

/// Uniform result of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultEnvelope {
    Success {
        value: Value,
    },
    Failure {
        kind: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

impl ResultEnvelope {
    pub fn success(value: Value) -> Self {
        ResultEnvelope::Success { value }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ResultEnvelope::Failure {
            kind,
            message: message.into(),
            raw_response: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultEnvelope::Success { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ResultEnvelope::Success { value } => Some(value),
            ResultEnvelope::Failure { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ResultEnvelope::Success { .. } => None,
            ResultEnvelope::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<ActionError> for ResultEnvelope {
    fn from(err: ActionError) -> Self {
        ResultEnvelope::Failure {
            kind: err.kind(),
            raw_response: err.raw_response().map(str::to_string),
            message: err.to_string(),
        }
    }
}

impl From<Result<Value, ActionError>> for ResultEnvelope {
    fn from(result: Result<Value, ActionError>) -> Self {
        match result {
            Ok(value) => ResultEnvelope::success(value),
            Err(err) => err.into(),
        }
    }
}
