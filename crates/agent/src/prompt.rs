//! System message seeding every run.
//!
//! Text backends never see tool schemas, so the catalogue and the expected
//! call format are spelled out in plain text.

use majordome_core::tool::ToolRegistry;

const CALL_FORMAT: &str = r#"To use a tool, reply with only this JSON object and nothing else:
{"name": "<tool name>", "arguments": {<arguments>}}
When the task is fully done and nothing is left to say, you may reply with:
{"type": "FINISH", "summary": "<one-line summary>"}
Otherwise answer the user directly in plain language."#;

/// Build the system message: prompt, tool catalogue, call format.
pub fn build_system_message(prompt: &str, tools: &ToolRegistry) -> String {
    if tools.is_empty() {
        return prompt.to_string();
    }

    let mut out = String::from(prompt.trim_end());
    out.push_str("\n\n## Tools\n");
    for def in tools.definitions() {
        out.push_str(&format!(
            "- {}({}): {}\n",
            def.name,
            argument_list(&def.parameters),
            def.description
        ));
    }
    out.push('\n');
    out.push_str(CALL_FORMAT);
    out
}

/// `path: string, limit?: integer` from a JSON schema.
fn argument_list(schema: &serde_json::Value) -> String {
    let Some(properties) = schema["properties"].as_object() else {
        return String::new();
    };
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| {
            let ty = prop["type"].as_str().unwrap_or("any");
            let marker = if required.contains(&name.as_str()) { "" } else { "?" };
            format!("{name}{marker}: {ty}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::registry_with;

    #[test]
    fn catalogue_lists_every_tool() {
        let tools = registry_with(&["get_time", "read_file"]);
        let msg = build_system_message("Tu es Majordome.", &tools);

        assert!(msg.starts_with("Tu es Majordome."));
        assert!(msg.contains("- get_time("));
        assert!(msg.contains("- read_file(input?: string)"));
        assert!(msg.contains(r#"{"name": "<tool name>", "arguments""#));
        assert!(msg.contains("FINISH"));
    }

    #[test]
    fn empty_registry_keeps_prompt_only() {
        let tools = ToolRegistry::new();
        assert_eq!(build_system_message("Hello", &tools), "Hello");
    }

    #[test]
    fn argument_list_marks_optional() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "limit": {"type": "integer"}
            },
            "required": ["path"]
        });
        assert_eq!(argument_list(&schema), "limit?: integer, path: string");
        assert_eq!(argument_list(&serde_json::json!({})), "");
    }
}
