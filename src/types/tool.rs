//! Tool calling definitions shared by every adapter

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool descriptor supplied by an external tool registry.
///
/// Serializes in the flat `{name, description, inputSchema}` shape. Deserializes from
/// either that shape or the OpenAI-wrapped `{"type": "function", "function": {...}}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DescriptorWire")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON-schema-like mapping with `properties` and `required`.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Optional usage example rendered into prompt catalogs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorWire {
    Wrapped {
        function: FunctionSpec,
    },
    Flat {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default, rename = "inputSchema", alias = "input_schema", alias = "parameters")]
        input_schema: Option<Value>,
        #[serde(default)]
        example: Option<Value>,
    },
}

#[derive(Deserialize)]
struct FunctionSpec {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "inputSchema")]
    parameters: Option<Value>,
    #[serde(default)]
    example: Option<Value>,
}

impl From<DescriptorWire> for ToolDescriptor {
    fn from(wire: DescriptorWire) -> Self {
        match wire {
            DescriptorWire::Wrapped { function } => Self {
                name: function.name,
                description: function.description.unwrap_or_default(),
                input_schema: function.parameters.unwrap_or(Value::Null),
                example: function.example,
            },
            DescriptorWire::Flat {
                name,
                description,
                input_schema,
                example,
            } => Self {
                name,
                description: description.unwrap_or_default(),
                input_schema: input_schema.unwrap_or(Value::Null),
                example,
            },
        }
    }
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            example: None,
        }
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    /// Declared parameters, in declaration order.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.input_schema.get("properties").and_then(Value::as_object)
    }

    pub fn is_required(&self, param: &str) -> bool {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|req| req.iter().any(|r| r.as_str() == Some(param)))
            .unwrap_or(false)
    }

    /// Render in the OpenAI `tools` wire shape used by native function calling.
    pub fn to_openai_tool(&self) -> Value {
        let parameters = if self.input_schema.is_null() {
            serde_json::json!({"type": "object", "properties": {}})
        } else {
            self.input_schema.clone()
        };
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": parameters,
            }
        })
    }
}

/// Function payload of a normalized invocation. `arguments` is always a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Normalized tool invocation: `{id, type: "function", function: {name, arguments}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolInvocation {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Synthetic id assigned to the `index`-th invocation of a response.
    pub fn synthetic_id(index: usize) -> String {
        format!("call_{}", index)
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn arguments(&self) -> &str {
        &self.function.arguments
    }

    pub fn parsed_arguments(&self) -> crate::Result<Value> {
        Ok(serde_json::from_str(&self.function.arguments)?)
    }
}

/// Outcome of parsing one model response for tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub invocations: Vec<ToolInvocation>,
    pub raw_response: String,
    pub has_calls: bool,
    pub needs_continuation: bool,
}

impl ToolCallResult {
    pub fn from_invocations(
        invocations: Vec<ToolInvocation>,
        raw_response: impl Into<String>,
    ) -> Self {
        let has_calls = !invocations.is_empty();
        Self {
            invocations,
            raw_response: raw_response.into(),
            has_calls,
            needs_continuation: has_calls,
        }
    }

    pub fn text_only(raw_response: impl Into<String>) -> Self {
        Self::from_invocations(Vec::new(), raw_response)
    }
}

/// Result of executing one tool, fed back to the model on continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl ToolResult {
    pub fn success(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}
