//! Tool definitions for the "create files" capability
//!
//! 각 provider 연동은 정확히 하나의 tool 이름을 인식합니다.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Anthropic Messages tool (folder/filename/content 배열)
pub const CREATE_FULL_PROJECT: &str = "create_full_project";
/// OpenAI Assistants function (파일 하나씩)
pub const CREATE_FILE: &str = "createFile";
/// Structured output 응답을 tool call로 합성할 때 쓰는 이름
pub const CREATE_FILES: &str = "create_files";

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// Parameters schema for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String,

    pub properties: Value,

    #[serde(default)]
    pub required: Vec<String>,
}

impl ToolDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ToolParameters {
                schema_type: "object".to_string(),
                properties: json!({}),
                required: vec![],
            },
        }
    }

    /// Add a parameter with an arbitrary JSON schema
    pub fn with_param(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if let Value::Object(ref mut props) = self.parameters.properties {
            props.insert(name.clone(), schema);
        }
        if required {
            self.parameters.required.push(name);
        }
        self
    }

    pub fn with_string_param(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.with_param(
            name,
            json!({ "type": "string", "description": description.into() }),
            required,
        )
    }

    /// Full JSON schema object
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": self.parameters.schema_type,
            "properties": self.parameters.properties,
            "required": self.parameters.required,
        })
    }

    /// `{folder, filename, content}` 배열을 받는 project tool
    pub fn create_full_project() -> Self {
        let file = ToolDef::new("file", "")
            .with_string_param("folder", "The folder path where to write the file", true)
            .with_string_param("filename", "The name of the file to write", true)
            .with_string_param("content", "The content to write to the file", true);

        ToolDef::new(CREATE_FULL_PROJECT, "Creates a full project with the given files").with_param(
            "files",
            json!({
                "type": "array",
                "items": file.to_json_schema(),
                "description": "Array of files to create and save."
            }),
            true,
        )
    }

    /// 파일 하나를 만드는 assistant function
    pub fn create_file() -> Self {
        ToolDef::new(CREATE_FILE, "Creates a new file with the given content")
            .with_string_param("folder", "Parent Directory of the File", true)
            .with_string_param("filename", "Name of the file", true)
            .with_string_param("content", "File contents", true)
    }

    /// Structured output schema: `{files: [{filepath, content}]}`
    pub fn create_files() -> Self {
        ToolDef::new(CREATE_FILES, "The result of the generation").with_param(
            "files",
            json!({
                "type": "array",
                "description": "Array of files to create with filepath and content",
                "items": {
                    "type": "object",
                    "properties": {
                        "filepath": {
                            "type": "string",
                            "description": "The full path of the file to create (with filename)"
                        },
                        "content": {
                            "description": "The content of the file to create"
                        }
                    },
                    "required": ["filepath", "content"]
                }
            }),
            true,
        )
    }
}
