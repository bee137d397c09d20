//! Line-delimited JSON requests for the `rime-bridge` host.
//!
//! One request per line: `{"op": "rime-lib-get-context", "args": []}`.
//! Each answer is a single line, `{"ok": <value>}` or `{"error": "<message>"}`,
//! where values use the bridge's JSON form (nil is `null`, t is `true`,
//! pairs are two-element arrays).

use rime_bridge_core::{Bridge, RimeApi, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Request {
    pub op: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Ok(Value),
    Error(String),
}

/// Decode one request line, run it and encode the answer.
///
/// Blank lines yield `None`.
pub fn handle_line<A: RimeApi>(bridge: &Bridge<A>, line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let response = match serde_json::from_str::<Request>(line) {
        Ok(req) => {
            let args: Vec<Value> = req.args.into_iter().map(Value::from_json).collect();
            match bridge.call(&req.op, &args) {
                Ok(value) => Response::Ok(value),
                Err(e) => Response::Error(e.to_string()),
            }
        }
        Err(e) => Response::Error(format!("malformed request: {}", e)),
    };

    Some(encode(&response))
}

fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| encode_failure(&e.to_string()))
}

fn encode_failure(message: &str) -> String {
    serde_json::json!({ "error": format!("unencodable response: {}", message) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_bridge_core::{MockRime, RimeHandle};
    use serde_json::json;

    fn run(bridge: &Bridge<MockRime>, line: &str) -> serde_json::Value {
        let out = handle_line(bridge, line).expect("response");
        serde_json::from_str(&out).expect("json response")
    }

    fn bridge() -> Bridge<MockRime> {
        Bridge::new(RimeHandle::new(MockRime::new()))
    }

    #[test]
    fn test_blank_line_ignored() {
        assert!(handle_line(&bridge(), "   ").is_none());
    }

    #[test]
    fn test_malformed_request() {
        let out = run(&bridge(), "{not json");
        assert!(out["error"]
            .as_str()
            .unwrap()
            .starts_with("malformed request"));
    }

    #[test]
    fn test_error_text_is_escaped() {
        let line = encode_failure("key \"a\" must be a string\n");
        let out: serde_json::Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(
            out["error"],
            "unencodable response: key \"a\" must be a string\n"
        );

        let line = encode(&Response::Error("bad \"op\"".to_string()));
        let out: serde_json::Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(out["error"], "bad \"op\"");
    }

    #[test]
    fn test_session_flow() {
        let b = bridge();
        assert_eq!(
            run(&b, r#"{"op":"rime-lib-start","args":["/usr/share/rime-data","/tmp/rime"]}"#),
            json!({"ok": true})
        );
        run(&b, r#"{"op":"rime-lib-process-key","args":[110,0]}"#);
        run(&b, r#"{"op":"rime-lib-process-key","args":[105,0]}"#);

        let ctx = run(&b, r#"{"op":"rime-lib-get-context"}"#);
        let pairs = ctx["ok"].as_array().unwrap();
        let comp = pairs
            .iter()
            .find(|p| p[0] == "composition")
            .expect("composition pair");
        assert!(comp[1]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p[0] == "preedit" && p[1] == "ni"));
    }

    #[test]
    fn test_nil_is_null() {
        let out = run(&bridge(), r#"{"op":"rime-lib-get-input"}"#);
        assert_eq!(out, json!({"ok": null}));
    }

    #[test]
    fn test_errors_reported() {
        let b = bridge();
        let out = run(&b, r#"{"op":"rime-lib-nope"}"#);
        assert!(out["error"].as_str().unwrap().contains("rime-lib-nope"));

        let out = run(&b, r#"{"op":"rime-lib-string-length","args":[]}"#);
        assert!(out.get("error").is_some());

        let out = run(&b, r#"{"op":"rime-lib-string-length","args":["中a"]}"#);
        assert_eq!(out, json!({"ok": 4}));
    }
}
