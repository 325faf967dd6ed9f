//! # frameseek MCP Server
//!
//! Model Context Protocol server exposing frame extraction as tools.
//!
//! ## Features
//! - Open media files (or `synthetic://` test clips) and query their info
//! - Fetch single video/audio frames by timestamp or frame index
//! - Fetch sequential frame ranges
//! - Queue asynchronous requests; results arrive as notifications
//!
//! ## Usage
//! ```bash
//! # Start server (stdio transport)
//! frameseek-mcp
//!
//! # Custom engine settings, debug logging
//! RUST_LOG=debug frameseek-mcp --config engine.json
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use frameseek_core::{
    AudioFrame, EngineConfig, FrameError, MediaEngine, RangeCallbacks, RequestId, TaskQueue,
    VideoFrame, VideoFrameBatch, VideoRange,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

// ============================================================================
// MCP Protocol Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcNotification {
    jsonrpc: String,
    method: String,
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

// ============================================================================
// Output
// ============================================================================

/// Line-oriented JSON writer shared by the request loop and queue callbacks.
#[derive(Clone)]
struct Outbox {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Outbox {
    fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    fn send<T: Serialize>(&self, message: &T) -> io::Result<()> {
        let line = serde_json::to_string(message)?;
        debug!("Sending: {}", line);
        let mut out = self.out.lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }

    fn notify(&self, method: &str, params: Value) {
        let notification = JsonRpcNotification {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
        };
        if let Err(e) = self.send(&notification) {
            error!("Failed to write notification: {}", e);
        }
    }
}

// ============================================================================
// Frame Summaries
// ============================================================================

fn video_summary(frame: &VideoFrame) -> Value {
    let pixels = (frame.width as u64 * frame.height as u64).max(1);
    let mut sums = [0u64; 4];
    for px in frame.data.chunks_exact(4) {
        for (sum, &c) in sums.iter_mut().zip(px) {
            *sum += c as u64;
        }
    }
    json!({
        "width": frame.width,
        "height": frame.height,
        "stride": frame.stride,
        "pts_ms": frame.pts_ms,
        "index": frame.index,
        "mean_rgba": sums.map(|s| s / pixels),
    })
}

fn audio_summary(frame: &AudioFrame) -> Value {
    let peak = frame.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    json!({
        "pts_ms": frame.pts_ms,
        "sample_count": frame.sample_count,
        "channels": frame.channels,
        "sample_rate": frame.sample_rate,
        "duration_ms": frame.duration_ms(),
        "peak": peak,
    })
}

fn batch_summary(batch: &VideoFrameBatch) -> Value {
    json!({
        "requested": batch.requested,
        "delivered": batch.len(),
        "stopped_by": batch.stopped_by.as_ref().map(frame_error),
        "frames": batch.frames.iter().map(video_summary).collect::<Vec<_>>(),
    })
}

fn frame_error(e: &FrameError) -> Value {
    json!({ "code": e.code(), "message": e.to_string() })
}

// ============================================================================
// Argument Helpers
// ============================================================================

fn arg_i64(args: &Value, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

fn require_i64(args: &Value, key: &str) -> Result<i64, String> {
    arg_i64(args, key).ok_or_else(|| format!("Missing integer argument '{}'", key))
}

/// Either `{"ms": ..}` or `{"index": ..}`.
enum Position {
    Ms(i64),
    Index(i64),
}

fn position(args: &Value) -> Result<Position, String> {
    match (arg_i64(args, "ms"), arg_i64(args, "index")) {
        (Some(ms), None) => Ok(Position::Ms(ms)),
        (None, Some(index)) => Ok(Position::Index(index)),
        _ => Err("Give exactly one of 'ms' or 'index'".into()),
    }
}

fn range(args: &Value) -> Result<VideoRange, String> {
    if let Some(step_ms) = arg_i64(args, "step_ms") {
        Ok(VideoRange::Time {
            start_ms: require_i64(args, "start_ms")?,
            end_ms: require_i64(args, "end_ms")?,
            step_ms,
        })
    } else {
        Ok(VideoRange::Index {
            start: require_i64(args, "start")?,
            end: require_i64(args, "end")?,
        })
    }
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

// ============================================================================
// MCP Server Implementation
// ============================================================================

struct McpServer {
    initialized: bool,
    engine: Arc<MediaEngine>,
    queue: TaskQueue,
    outbox: Outbox,
}

impl McpServer {
    fn new(config: EngineConfig, outbox: Outbox) -> Result<Self> {
        let engine = Arc::new(MediaEngine::with_config(config));
        let queue = TaskQueue::new(engine.clone()).context("starting decode worker")?;
        Ok(Self {
            initialized: false,
            engine,
            queue,
            outbox,
        })
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request.params),
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                Ok(json!({}))
            }
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tool_call(&request.params),
            _ => Err(JsonRpcError {
                code: -32601,
                message: format!("Method not found: {}", request.method),
                data: None,
            }),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id,
                result: Some(value),
                error: None,
            },
            Err(error) => JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id,
                result: None,
                error: Some(error),
            },
        }
    }

    fn handle_initialize(&self, _params: &Value) -> Result<Value, JsonRpcError> {
        Ok(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "frameseek-mcp",
                "version": env!("CARGO_PKG_VERSION")
            }
        }))
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        let position_props = json!({
            "ms": { "type": "integer", "description": "Target time in milliseconds" },
            "index": { "type": "integer", "description": "Target frame index" }
        });
        let range_props = json!({
            "start": { "type": "integer", "description": "First frame index" },
            "end": { "type": "integer", "description": "Last frame index (inclusive)" },
            "start_ms": { "type": "integer" },
            "end_ms": { "type": "integer" },
            "step_ms": { "type": "integer", "description": "Selects a time range when present" }
        });

        let tools = vec![
            // ============================================================
            // Session
            // ============================================================
            Tool {
                name: "media_open".into(),
                description: "Open a media file or synthetic:// clip, replacing any open media".into(),
                input_schema: schema(
                    json!({ "locator": { "type": "string", "description": "File path or synthetic:// URL" } }),
                    &["locator"],
                ),
            },
            Tool {
                name: "media_info".into(),
                description: "Duration, dimensions, fps, frame count and audio layout of the open media".into(),
                input_schema: schema(json!({}), &[]),
            },
            Tool {
                name: "media_stop".into(),
                description: "Close the open media".into(),
                input_schema: schema(json!({}), &[]),
            },
            Tool {
                name: "media_seek".into(),
                description: "Reposition the decoder to a time or frame index".into(),
                input_schema: schema(position_props.clone(), &[]),
            },
            // ============================================================
            // Synchronous Frames
            // ============================================================
            Tool {
                name: "video_frame".into(),
                description: "Decode the first video frame at or after a time or frame index".into(),
                input_schema: schema(position_props.clone(), &[]),
            },
            Tool {
                name: "audio_frame".into(),
                description: "Decode the first audio frame at or after a time or frame index".into(),
                input_schema: schema(position_props.clone(), &[]),
            },
            Tool {
                name: "video_range".into(),
                description: "Decode a sequential range of video frames with a single seek".into(),
                input_schema: schema(range_props.clone(), &[]),
            },
            // ============================================================
            // Task Queue
            // ============================================================
            Tool {
                name: "enqueue_video_frame".into(),
                description: "Queue a video frame request; the result arrives as a notifications/frame message".into(),
                input_schema: schema(position_props.clone(), &[]),
            },
            Tool {
                name: "enqueue_audio_frame".into(),
                description: "Queue an audio frame request; the result arrives as a notifications/frame message".into(),
                input_schema: schema(position_props, &[]),
            },
            Tool {
                name: "enqueue_video_range".into(),
                description: "Queue a range request; frames and progress arrive as notifications".into(),
                input_schema: schema(range_props, &[]),
            },
            Tool {
                name: "cancel".into(),
                description: "Cancel a queued or running request".into(),
                input_schema: schema(
                    json!({ "request_id": { "type": "integer" } }),
                    &["request_id"],
                ),
            },
        ];

        Ok(json!({ "tools": tools }))
    }

    fn handle_tool_call(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let name = params["name"].as_str().unwrap_or("");
        let args = &params["arguments"];

        debug!("Tool call: {} with args: {:?}", name, args);

        let result = match name {
            "media_open" => self.tool_media_open(args),
            "media_info" => self.tool_media_info(),
            "media_stop" => self.tool_media_stop(),
            "media_seek" => self.tool_media_seek(args),
            "video_frame" => self.tool_video_frame(args),
            "audio_frame" => self.tool_audio_frame(args),
            "video_range" => self.tool_video_range(args),
            "enqueue_video_frame" => self.tool_enqueue_video_frame(args),
            "enqueue_audio_frame" => self.tool_enqueue_audio_frame(args),
            "enqueue_video_range" => self.tool_enqueue_video_range(args),
            "cancel" => self.tool_cancel(args),
            _ => Err(format!("Unknown tool: {}", name)),
        };

        match result {
            Ok(value) => Ok(json!({
                "content": [{
                    "type": "text",
                    "text": value.to_string()
                }]
            })),
            Err(e) => Ok(json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            })),
        }
    }

    // ========================================================================
    // Tool Implementations
    // ========================================================================

    fn tool_media_open(&self, args: &Value) -> Result<Value, String> {
        let locator = args["locator"]
            .as_str()
            .ok_or("Missing string argument 'locator'")?;
        self.engine
            .open(locator)
            .map_err(|e| format!("{} (code {})", e, e.code()))?;
        Ok(json!(self.engine.info()))
    }

    fn tool_media_info(&self) -> Result<Value, String> {
        Ok(json!(self.engine.info()))
    }

    fn tool_media_stop(&self) -> Result<Value, String> {
        self.engine.stop();
        Ok(json!({ "stopped": true }))
    }

    fn tool_media_seek(&self, args: &Value) -> Result<Value, String> {
        let result = match position(args)? {
            Position::Ms(ms) => self.engine.seek(ms),
            Position::Index(index) => self.engine.seek_frame(index),
        };
        result.map_err(|e| e.to_string())?;
        Ok(json!({ "seeked": true }))
    }

    fn tool_video_frame(&self, args: &Value) -> Result<Value, String> {
        let frame = match position(args)? {
            Position::Ms(ms) => self.engine.video_frame_at(ms),
            Position::Index(index) => self.engine.video_frame_at_index(index),
        }
        .map_err(|e| e.to_string())?;
        Ok(video_summary(&frame))
    }

    fn tool_audio_frame(&self, args: &Value) -> Result<Value, String> {
        let frame = match position(args)? {
            Position::Ms(ms) => self.engine.audio_frame_at(ms),
            Position::Index(index) => self.engine.audio_frame_at_index(index),
        }
        .map_err(|e| e.to_string())?;
        Ok(audio_summary(&frame))
    }

    fn tool_video_range(&self, args: &Value) -> Result<Value, String> {
        let batch = self
            .engine
            .video_frames(range(args)?)
            .map_err(|e| e.to_string())?;
        Ok(batch_summary(&batch))
    }

    fn tool_enqueue_video_frame(&self, args: &Value) -> Result<Value, String> {
        let outbox = self.outbox.clone();
        let callback = move |id: RequestId, result: Result<VideoFrame, FrameError>| {
            let params = match result {
                Ok(frame) => json!({ "request_id": id, "frame": video_summary(&frame) }),
                Err(e) => json!({ "request_id": id, "error": frame_error(&e) }),
            };
            outbox.notify("notifications/frame", params);
        };

        let id = match position(args)? {
            Position::Ms(ms) => self.queue.enqueue_video_frame(ms, callback),
            Position::Index(index) => self.queue.enqueue_video_frame_at_index(index, callback),
        }
        .map_err(|e| e.to_string())?;
        Ok(json!({ "request_id": id }))
    }

    fn tool_enqueue_audio_frame(&self, args: &Value) -> Result<Value, String> {
        let outbox = self.outbox.clone();
        let callback = move |id: RequestId, result: Result<AudioFrame, FrameError>| {
            let params = match result {
                Ok(frame) => json!({ "request_id": id, "frame": audio_summary(&frame) }),
                Err(e) => json!({ "request_id": id, "error": frame_error(&e) }),
            };
            outbox.notify("notifications/frame", params);
        };

        let id = match position(args)? {
            Position::Ms(ms) => self.queue.enqueue_audio_frame(ms, callback),
            Position::Index(index) => self.queue.enqueue_audio_frame_at_index(index, callback),
        }
        .map_err(|e| e.to_string())?;
        Ok(json!({ "request_id": id }))
    }

    fn tool_enqueue_video_range(&self, args: &Value) -> Result<Value, String> {
        let (frames, progress, done) = (self.outbox.clone(), self.outbox.clone(), self.outbox.clone());
        let callbacks = RangeCallbacks::new(
            move |id, frame| {
                frames.notify(
                    "notifications/frame",
                    json!({ "request_id": id, "frame": video_summary(&frame) }),
                )
            },
            move |id, p| {
                progress.notify(
                    "notifications/progress",
                    json!({ "request_id": id, "completed": p.completed, "total": p.total }),
                )
            },
        )
        .on_done(move |id, summary| {
            done.notify(
                "notifications/range_done",
                json!({
                    "request_id": id,
                    "requested": summary.requested,
                    "delivered": summary.delivered,
                    "stopped_by": summary.stopped_by.as_ref().map(frame_error),
                }),
            )
        });

        let id = self
            .queue
            .enqueue_video_range(range(args)?, callbacks)
            .map_err(|e| e.to_string())?;
        Ok(json!({ "request_id": id }))
    }

    fn tool_cancel(&self, args: &Value) -> Result<Value, String> {
        let id = require_i64(args, "request_id")?;
        let cancelled = u64::try_from(id).map(|id| self.queue.cancel(id)).unwrap_or(false);
        Ok(json!({ "cancelled": cancelled }))
    }
}

// ============================================================================
// Main
// ============================================================================

fn parse_args() -> Result<Option<PathBuf>> {
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            "--version" => {
                println!("frameseek-mcp {}", frameseek_core::VERSION);
                std::process::exit(0);
            }
            other => bail!("Unknown argument: {}", other),
        }
    }
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frameseek_mcp=info".parse()?)
                .add_directive("frameseek_core=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let config = match parse_args()? {
        Some(path) => EngineConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    info!("frameseek MCP Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let outbox = Outbox::new(Box::new(io::stdout()));
    let server = McpServer::new(config, outbox.clone())?;

    info!("Listening for MCP requests on stdin...");
    serve(server, io::stdin().lock(), &outbox);
    Ok(())
}

/// Answer requests from `input` until it closes or a response cannot be
/// written, then shut the queue and engine down.
fn serve(mut server: McpServer, input: impl BufRead, outbox: &Outbox) {
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                continue;
            }
        };

        // Notifications get no response
        if request.id.is_none() {
            server.handle_request(request);
            continue;
        }

        let response = server.handle_request(request);
        if let Err(e) = outbox.send(&response) {
            error!("Failed to write response, shutting down: {}", e);
            break;
        }
    }

    server.queue.release();
    server.engine.stop();
    info!("MCP server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    /// Collects everything written to the outbox.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn lines(&self) -> Vec<Value> {
            String::from_utf8_lossy(&self.0.lock())
                .lines()
                .filter_map(|l| serde_json::from_str(l).ok())
                .collect()
        }
    }

    fn server() -> (McpServer, Capture) {
        let capture = Capture::default();
        let server =
            McpServer::new(EngineConfig::default(), Outbox::new(Box::new(capture.clone()))).unwrap();
        (server, capture)
    }

    fn call(server: &mut McpServer, name: &str, arguments: Value) -> (bool, Value) {
        let response = server.handle_request(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: "tools/call".into(),
            params: json!({ "name": name, "arguments": arguments }),
        });
        let result = response.result.unwrap();
        let is_error = result["isError"].as_bool().unwrap_or(false);
        let text = result["content"][0]["text"].as_str().unwrap().to_string();
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (is_error, value)
    }

    /// Writer whose every write fails, like a closed stdout.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_still_shuts_down() {
        let outbox = Outbox::new(Box::new(Broken));
        let server = McpServer::new(EngineConfig::default(), outbox.clone()).unwrap();
        let engine = server.engine.clone();
        engine.open("synthetic://clip").unwrap();

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"media_stop","arguments":{}}}"#,
            "\n",
        );
        serve(server, io::Cursor::new(input), &outbox);

        // Stopped by shutdown, not by the second request that was never read
        assert!(!engine.is_open());
    }

    #[test]
    fn test_serve_answers_until_input_closes() {
        let capture = Capture::default();
        let outbox = Outbox::new(Box::new(capture.clone()));
        let server = McpServer::new(EngineConfig::default(), outbox.clone()).unwrap();
        let engine = server.engine.clone();

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"media_open","arguments":{"locator":"synthetic://clip"}}}"#,
            "\n",
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "not json\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );
        serve(server, io::Cursor::new(input), &outbox);

        let ids: Vec<_> = capture.lines().iter().map(|l| l["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
        assert!(!engine.is_open());
    }

    #[test]
    fn test_tools_list() {
        let (mut server, _) = server();
        let response = server.handle_request(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(7)),
            method: "tools/list".into(),
            params: Value::Null,
        });
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 11);
    }

    #[test]
    fn test_unknown_method() {
        let (mut server, _) = server();
        let response = server.handle_request(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: "bogus".into(),
            params: Value::Null,
        });
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_open_and_fetch() {
        let (mut server, _) = server();
        let (err, info) = call(&mut server, "media_open", json!({ "locator": "synthetic://clip?fps=30" }));
        assert!(!err);
        assert_eq!(info["total_frames"], 300);

        let (err, frame) = call(&mut server, "video_frame", json!({ "index": 42 }));
        assert!(!err);
        assert_eq!(frame["index"], 42);

        let (err, batch) = call(&mut server, "video_range", json!({ "start": 0, "end": 2 }));
        assert!(!err);
        assert_eq!(batch["delivered"], 3);

        let (err, _) = call(&mut server, "audio_frame", json!({ "ms": 0 }));
        assert!(err);
    }

    #[test]
    fn test_enqueue_emits_notification() {
        let (mut server, capture) = server();
        call(&mut server, "media_open", json!({ "locator": "synthetic://clip" }));
        let (_, queued) = call(&mut server, "enqueue_video_frame", json!({ "ms": 1000 }));
        assert_eq!(queued["request_id"], 1);

        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let lines = capture.lines();
            if let Some(n) = lines.iter().find(|l| l["method"] == "notifications/frame") {
                assert_eq!(n["params"]["request_id"], 1);
                assert_eq!(n["params"]["frame"]["index"], 30);
                break;
            }
            assert!(Instant::now() < deadline, "no notification");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_position_requires_one_key() {
        assert!(position(&json!({ "ms": 1, "index": 2 })).is_err());
        assert!(position(&json!({})).is_err());
        assert!(matches!(position(&json!({ "index": 2 })), Ok(Position::Index(2))));
    }
}
