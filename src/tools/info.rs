use super::{string_arg, ToolExecutor};
use serde_json::{json, Map, Value};

/// Dummy weather provider with a fixed forecast.
pub struct GetWeatherTool;

impl ToolExecutor for GetWeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        json!({
            "status": "ok",
            "location": string_arg(arguments, "location"),
            "date": string_arg(arguments, "date"),
            "forecast": "sunny",
            "temperature_celsius": 22,
        })
    }
}

/// Dummy news provider that fabricates two headlines about the topic.
pub struct GetNewsTool;

impl ToolExecutor for GetNewsTool {
    fn name(&self) -> &'static str {
        "get_news"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        let topic = string_arg(arguments, "topic");
        json!({
            "status": "ok",
            "topic": topic,
            "timeframe": string_arg(arguments, "timeframe"),
            "headlines": [
                format!("Dummy headline about {} (1)", topic),
                format!("Dummy headline about {} (2)", topic),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn weather_is_deterministic() {
        let payload = GetWeatherTool
            .execute(&object(json!({"location": "Tokyo", "date": "tomorrow"})));
        assert_eq!(payload["forecast"], "sunny");
        assert_eq!(payload["temperature_celsius"], 22);
        assert_eq!(payload["location"], "Tokyo");
    }

    #[test]
    fn news_headlines_mention_the_topic() {
        let payload = GetNewsTool.execute(&object(json!({"topic": "ai", "timeframe": "today"})));
        let headlines = payload["headlines"].as_array().unwrap();
        assert_eq!(headlines.len(), 2);
        assert!(headlines[0].as_str().unwrap().contains("ai"));
    }
}
