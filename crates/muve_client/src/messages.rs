//! Wire payloads exchanged with the MUVE backend.
//!
//! Outbound messages are delimiter-joined text. Inbound payloads are JSON; the
//! connector passes them through untouched and callbacks decode them with
//! [`ResponseFrame::parse`] when they want the typed shape.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Field separator for outbound text payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Query messages: `dataset;query;...`
    Semicolon,
    /// Result records: `user|method|...`
    Pipe,
}

impl Delimiter {
    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Semicolon => ";",
            Delimiter::Pipe => "|",
        }
    }

    pub fn join<I, S>(self, fields: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::new();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                out.push_str(self.as_str());
            }
            out.push_str(field.as_ref());
        }
        out
    }
}

/// Client → server: natural-language query against a dataset.
///
/// Encodes as `dataset;query`, or `dataset;query;width;planner` when the
/// visualization width is known. A missing planner is sent as an empty field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMessage {
    pub dataset: String,
    pub query: String,
    pub width: Option<u32>,
    pub planner: Option<String>,
}

impl QueryMessage {
    pub fn new(dataset: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            query: query.into(),
            width: None,
            planner: None,
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_planner(mut self, planner: impl Into<String>) -> Self {
        self.planner = Some(planner.into());
        self
    }

    pub fn encode(&self) -> String {
        let mut fields = vec![self.dataset.clone(), self.query.clone()];
        if self.width.is_some() || self.planner.is_some() {
            fields.push(self.width.map(|w| w.to_string()).unwrap_or_default());
            fields.push(self.planner.clone().unwrap_or_default());
        }
        Delimiter::Semicolon.join(fields)
    }
}

impl fmt::Display for QueryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<QueryMessage> for String {
    fn from(msg: QueryMessage) -> Self {
        msg.encode()
    }
}

/// Server → client: one result frame.
///
/// Streaming routes send `{"data": [...], "debug": ..., "timestamp": ..., "name": ...}`;
/// request/response routes may send the bare `data` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseFrame {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub debug: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ResponseFrame {
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(payload)?;
        match value {
            Value::Array(data) => Ok(ResponseFrame {
                data,
                ..Default::default()
            }),
            other => serde_json::from_value(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// How a caller interprets frames. Switching modes means swapping the
/// connector's callback, not reconnecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Final result: draw the whole frame.
    #[default]
    Default,
    /// Partial results: a new timestamp starts a new plot set, the same
    /// timestamp fills in the named plot.
    Incremental,
    /// Approximate estimates, refined in place like incremental results.
    Approximate,
}

/// What the renderer should do with a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderAction {
    /// Empty result set; `debug` carries the template the backend tried.
    NoResults { debug: Option<Value> },
    Draw,
    NewPlotSet,
    UpdatePlot { name: Option<String> },
}

impl RenderMode {
    /// Decide the action for `frame`. `last_timestamp` is the timestamp of
    /// the previous frame in incremental/approximate modes and is updated here.
    pub fn interpret(self, frame: &ResponseFrame, last_timestamp: &mut Option<Value>) -> RenderAction {
        match self {
            RenderMode::Default => {
                if frame.is_empty() {
                    RenderAction::NoResults {
                        debug: frame.debug.clone(),
                    }
                } else {
                    RenderAction::Draw
                }
            }
            RenderMode::Incremental | RenderMode::Approximate => {
                if *last_timestamp != frame.timestamp {
                    *last_timestamp = frame.timestamp.clone();
                    RenderAction::NewPlotSet
                } else {
                    RenderAction::UpdatePlot {
                        name: frame.name.clone(),
                    }
                }
            }
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(RenderMode::Default),
            "incremental" => Ok(RenderMode::Incremental),
            "approximate" => Ok(RenderMode::Approximate),
            _ => Err(format!("unknown render mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_without_width_is_two_fields() {
        let msg = QueryMessage::new("dataset1", "count of rows");
        assert_eq!(msg.encode(), "dataset1;count of rows");
    }

    #[test]
    fn query_with_width_and_planner() {
        let msg = QueryMessage::new("dob_job", "average cost by borough")
            .with_width(1200)
            .with_planner("greedy");
        assert_eq!(msg.encode(), "dob_job;average cost by borough;1200;greedy");
    }

    #[test]
    fn pipe_join() {
        assert_eq!(Delimiter::Pipe.join(["u1", "0", "2", "17"]), "u1|0|2|17");
        assert_eq!(Delimiter::Pipe.join(Vec::<String>::new()), "");
    }

    #[test]
    fn parse_streaming_frame() {
        let frame = ResponseFrame::parse(
            r#"{"data":[{"a":1}],"debug":{"sql":"x"},"timestamp":7,"name":"plot_0"}"#,
        )
        .unwrap();
        assert_eq!(frame.data, vec![json!({"a": 1})]);
        assert_eq!(frame.timestamp, Some(json!(7)));
        assert_eq!(frame.name.as_deref(), Some("plot_0"));
    }

    #[test]
    fn parse_bare_array() {
        let frame = ResponseFrame::parse(r#"[{"a":1},{"b":2}]"#).unwrap();
        assert_eq!(frame.data.len(), 2);
        assert!(frame.debug.is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ResponseFrame::parse("not json").is_err());
    }

    #[test]
    fn default_mode_reports_empty_results() {
        let frame = ResponseFrame::parse(r#"{"data":[],"debug":"count(*)"}"#).unwrap();
        let mut last = None;
        assert_eq!(
            RenderMode::Default.interpret(&frame, &mut last),
            RenderAction::NoResults {
                debug: Some(json!("count(*)"))
            }
        );
    }

    #[test]
    fn incremental_mode_tracks_timestamps() {
        let mut last = None;
        let first = ResponseFrame::parse(r#"{"data":[1],"timestamp":1,"name":"p0"}"#).unwrap();
        let second = ResponseFrame::parse(r#"{"data":[2],"timestamp":1,"name":"p1"}"#).unwrap();
        let third = ResponseFrame::parse(r#"{"data":[3],"timestamp":2,"name":"p0"}"#).unwrap();

        let mode = RenderMode::Incremental;
        assert_eq!(mode.interpret(&first, &mut last), RenderAction::NewPlotSet);
        assert_eq!(
            mode.interpret(&second, &mut last),
            RenderAction::UpdatePlot {
                name: Some("p1".into())
            }
        );
        assert_eq!(mode.interpret(&third, &mut last), RenderAction::NewPlotSet);
        assert_eq!(last, Some(json!(2)));
    }

    #[test]
    fn approximate_mode_tracks_timestamps() {
        let mut last = Some(json!("t0"));
        let refined = ResponseFrame::parse(r#"{"data":[1],"timestamp":"t0","name":"p2"}"#).unwrap();
        let fresh = ResponseFrame::parse(r#"{"data":[4],"timestamp":"t1"}"#).unwrap();

        let mode = RenderMode::Approximate;
        assert_eq!(
            mode.interpret(&refined, &mut last),
            RenderAction::UpdatePlot {
                name: Some("p2".into())
            }
        );
        assert_eq!(mode.interpret(&fresh, &mut last), RenderAction::NewPlotSet);
        assert_eq!(last, Some(json!("t1")));
        assert_eq!(
            mode.interpret(&fresh, &mut last),
            RenderAction::UpdatePlot { name: None }
        );
    }
}
