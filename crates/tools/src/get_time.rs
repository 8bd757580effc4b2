//! `get_time` — current local date and time.

use async_trait::async_trait;
use chrono::{Local, Utc};
use majordome_core::error::ToolError;
use majordome_core::tool::{InvocationContext, Tool};

pub struct GetTimeTool;

#[async_trait]
impl Tool for GetTimeTool {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        let now = Local::now();
        Ok(serde_json::json!({
            "success": true,
            "time": now.format("%H:%M:%S").to_string(),
            "date": now.format("%Y-%m-%d").to_string(),
            "weekday": now.format("%A").to_string(),
            "utc_offset": now.format("%:z").to_string(),
            "iso": now.to_rfc3339(),
            "unix": Utc::now().timestamp(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_time_fields() {
        let ctx = InvocationContext {
            session_id: "test".into(),
            iteration: 1,
            call_id: "call_1".into(),
        };
        let result = GetTimeTool
            .execute(serde_json::json!({}), &ctx)
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        let time = result["time"].as_str().unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(&time[2..3], ":");
        assert!(result["date"].as_str().unwrap().starts_with("20"));
        assert!(result["unix"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn ignores_arguments() {
        let ctx = InvocationContext {
            session_id: "test".into(),
            iteration: 2,
            call_id: "call_2".into(),
        };
        let result = GetTimeTool
            .execute(serde_json::json!({"timezone": "Europe/Paris"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result["success"], true);
    }
}
