//! Message module - chat messages and tool schemas exchanged with the model

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Instructions framing the whole conversation
    System,

    /// Input from the caller
    User,

    /// Output from the model
    Assistant,

    /// Result of a tool invocation
    Tool,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Provider-assigned call id
    pub id: String,

    /// Name of the invoked tool
    pub name: String,

    /// Raw JSON argument payload, exactly as the model produced it
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Author role
    pub role: Role,

    /// Text content (the argument payload for tool messages)
    pub content: String,

    /// Tool invocations carried by an assistant message
    pub tool_calls: Vec<ToolCall>,

    /// Tool that produced a tool message
    pub tool_name: Option<String>,

    /// Call id a tool message answers
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
            tool_call_id: None,
        }
    }

    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Plain assistant message without tool calls
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant message carrying tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Tool message holding the payload of one invocation
    pub fn tool_result(call: &ToolCall) -> Self {
        Self {
            tool_name: Some(call.name.clone()),
            tool_call_id: Some(call.id.clone()),
            ..Self::with_role(Role::Tool, call.arguments.clone())
        }
    }

    /// Expand the tool calls of an assistant reply into tool messages
    ///
    /// The tools registered by the engine simply echo their arguments, so
    /// each resulting message carries the raw payload of one call.
    pub fn tool_results(&self) -> Vec<Message> {
        self.tool_calls.iter().map(Message::tool_result).collect()
    }
}

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON string
    String,
    /// JSON boolean
    Boolean,
    /// JSON number
    Number,
    /// JSON object
    Object,
    /// JSON array
    Array,
}

impl ParamKind {
    /// JSON Schema type name
    pub fn as_json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Boolean => "boolean",
            ParamKind::Number => "number",
            ParamKind::Object => "object",
            ParamKind::Array => "array",
        }
    }
}

/// One parameter of a tool schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParam {
    /// Parameter name
    pub name: String,

    /// JSON type
    pub kind: ParamKind,

    /// What the model should put there
    pub description: String,

    /// Whether the model must provide it
    pub required: bool,
}

/// Declaration of a callable tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSchema {
    /// Tool name the model uses to invoke it
    pub name: String,

    /// When the model should call it
    pub description: String,

    /// Parameters, in declaration order
    pub params: Vec<ToolParam>,
}

impl ToolSchema {
    /// Start a schema without parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Add a required parameter
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        self.params.push(ToolParam {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        });
        self
    }
}
