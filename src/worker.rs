//! Out-of-process engine speaking one JSON object per line.
//!
//! Requests go out as `{"id":1,"width":300,"height":300,"focus":{"x":..,"y":..}}`;
//! replies come back as `{"id":1,"width":300,"height":300,"pixels":"<base64>"}`
//! or `{"id":1,"error":"..."}`. The wire has no "absent" focus, so a missing
//! focus is sent as the configured sentinel and decoded back to `None` on the
//! serving side. JSON has no non-finite numbers either; such a coordinate is
//! sent as the string `"inf"`, `"-inf"` or `"NaN"`.
//!
//! `serve` is the worker side (run by `raycanvas --worker`); `WorkerEngine` is
//! the client side and needs the `worker` feature.

use crate::engine::{EngineResponse, GradientEngine};
use crate::request::{FocusPoint, GenerationRequest};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

/// One request line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerJob {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    #[serde(with = "wire_focus")]
    pub focus: FocusPoint,
}

mod wire_focus {
    use crate::request::FocusPoint;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Coord {
        Number(f64),
        Text(String),
    }

    impl Coord {
        fn encode(v: f64) -> Self {
            if v.is_finite() {
                Coord::Number(v)
            } else {
                Coord::Text(v.to_string())
            }
        }

        fn decode<E: de::Error>(self) -> Result<f64, E> {
            match self {
                Coord::Number(v) => Ok(v),
                Coord::Text(t) => t
                    .parse()
                    .map_err(|_| E::custom(format!("invalid coordinate {:?}", t))),
            }
        }
    }

    #[derive(Serialize, Deserialize)]
    struct Point {
        x: Coord,
        y: Coord,
    }

    pub fn serialize<S: Serializer>(focus: &FocusPoint, s: S) -> Result<S::Ok, S::Error> {
        Point {
            x: Coord::encode(focus.x),
            y: Coord::encode(focus.y),
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FocusPoint, D::Error> {
        let p = Point::deserialize(d)?;
        let x = p.x.decode::<D::Error>()?;
        let y = p.y.decode::<D::Error>()?;
        Ok(FocusPoint::new(x, y))
    }
}

impl WorkerJob {
    pub fn from_request(id: u64, request: &GenerationRequest, sentinel: FocusPoint) -> Self {
        Self {
            id,
            width: request.width,
            height: request.height,
            focus: request.focus_or(sentinel),
        }
    }

    pub fn to_request(&self, sentinel: FocusPoint) -> GenerationRequest {
        GenerationRequest {
            width: self.width,
            height: self.height,
            focus: if self.focus == sentinel { None } else { Some(self.focus) },
        }
    }
}

/// One reply line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkerReply {
    pub id: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub pixels: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReply {
    pub fn from_response(id: u64, response: &EngineResponse) -> Self {
        Self {
            id,
            width: response.width,
            height: response.height,
            pixels: STANDARD.encode(&response.pixels),
            error: None,
        }
    }

    pub fn failure(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Decode into an engine response. The buffer length is not checked here;
    /// that is the render pipeline's job.
    pub fn into_response(self) -> Result<EngineResponse> {
        if let Some(msg) = self.error {
            return Err(Error::Engine(msg));
        }
        let pixels = STANDARD
            .decode(self.pixels.as_bytes())
            .map_err(|e| Error::WorkerProtocol(format!("invalid pixel encoding: {}", e)))?;
        Ok(EngineResponse::new(self.width, self.height, pixels))
    }
}

/// Serve jobs from `input` until EOF, answering each on its own line.
///
/// Lines that fail to parse get an error reply with id 0 so the client is
/// never left waiting.
pub fn serve<R: BufRead, W: Write>(
    engine: &GradientEngine,
    sentinel: FocusPoint,
    input: R,
    mut output: W,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<WorkerJob>(&line) {
            Ok(job) if job.width == 0 || job.height == 0 => {
                WorkerReply::failure(job.id, format!("invalid size {}x{}", job.width, job.height))
            }
            Ok(job) => {
                debug!("worker job #{} {}x{}", job.id, job.width, job.height);
                let response = engine.render(&job.to_request(sentinel));
                WorkerReply::from_response(job.id, &response)
            }
            Err(e) => {
                warn!("malformed worker job: {}", e);
                WorkerReply::failure(0, format!("malformed job: {}", e))
            }
        };
        let js = serde_json::to_string(&reply).unwrap_or_else(|_| {
            format!("{{\"id\":{},\"error\":\"serialization failed\"}}", reply.id)
        });
        writeln!(output, "{}", js)?;
        output.flush()?;
    }
    Ok(())
}

#[cfg(feature = "worker")]
pub use client::{WorkerEngine, WorkerLoader};

#[cfg(feature = "worker")]
mod client {
    use super::{WorkerJob, WorkerReply};
    use crate::engine::{EngineLoader, EngineResponse, PixelEngine};
    use crate::request::{FocusPoint, GenerationRequest};
    use crate::{Error, Result};
    use futures::future::BoxFuture;
    use log::{debug, info};
    use std::path::{Path, PathBuf};
    use std::process::Stdio;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::process::{Child, ChildStdin, ChildStdout, Command};
    use tokio::sync::Mutex;

    struct Pipe {
        // Held so the child is killed when the engine is dropped
        _child: Child,
        stdin: ChildStdin,
        stdout: BufReader<ChildStdout>,
        next_id: u64,
    }

    /// Client for a spawned worker process. Jobs are serialized: one line
    /// out, one line back.
    pub struct WorkerEngine {
        pipe: Mutex<Pipe>,
        sentinel: FocusPoint,
    }

    impl WorkerEngine {
        pub fn spawn(program: &Path, args: &[String], sentinel: FocusPoint) -> Result<Self> {
            let mut child = Command::new(program)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    Error::EngineLoadFailure(format!("cannot spawn {}: {}", program.display(), e))
                })?;
            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| Error::EngineLoadFailure("worker stdin unavailable".to_string()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| Error::EngineLoadFailure("worker stdout unavailable".to_string()))?;
            info!("spawned worker {}", program.display());
            Ok(Self {
                pipe: Mutex::new(Pipe {
                    _child: child,
                    stdin,
                    stdout: BufReader::new(stdout),
                    next_id: 1,
                }),
                sentinel,
            })
        }

        async fn exchange(&self, request: GenerationRequest) -> Result<EngineResponse> {
            let mut pipe = self.pipe.lock().await;
            let id = pipe.next_id;
            pipe.next_id += 1;

            let job = WorkerJob::from_request(id, &request, self.sentinel);
            let mut line = serde_json::to_string(&job)?;
            line.push('\n');
            pipe.stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| Error::Engine(format!("worker write failed: {}", e)))?;
            pipe.stdin
                .flush()
                .await
                .map_err(|e| Error::Engine(format!("worker write failed: {}", e)))?;

            let mut reply_line = String::new();
            let n = pipe
                .stdout
                .read_line(&mut reply_line)
                .await
                .map_err(|e| Error::Engine(format!("worker read failed: {}", e)))?;
            if n == 0 {
                return Err(Error::Engine("worker exited".to_string()));
            }
            let reply: WorkerReply = serde_json::from_str(reply_line.trim())?;
            if reply.id != id {
                return Err(Error::WorkerProtocol(format!(
                    "reply id {} does not match job {}",
                    reply.id, id
                )));
            }
            debug!("worker reply #{} {}x{}", id, reply.width, reply.height);
            reply.into_response()
        }
    }

    impl PixelEngine for WorkerEngine {
        fn name(&self) -> &str {
            "worker"
        }

        fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<EngineResponse>> {
            Box::pin(self.exchange(request))
        }
    }

    /// Spawns a `WorkerEngine` on first use
    #[derive(Debug, Clone)]
    pub struct WorkerLoader {
        program: PathBuf,
        args: Vec<String>,
        sentinel: FocusPoint,
    }

    impl WorkerLoader {
        pub fn new(program: impl Into<PathBuf>, args: Vec<String>, sentinel: FocusPoint) -> Self {
            Self {
                program: program.into(),
                args,
                sentinel,
            }
        }
    }

    impl EngineLoader for WorkerLoader {
        fn load(&self) -> BoxFuture<'_, Result<Arc<dyn PixelEngine>>> {
            Box::pin(async move {
                let engine = WorkerEngine::spawn(&self.program, &self.args, self.sentinel)?;
                Ok::<_, Error>(Arc::new(engine) as Arc<dyn PixelEngine>)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;

    const SENTINEL: FocusPoint = FocusPoint { x: -1000.0, y: -1000.0 };

    fn run(input: &str) -> Vec<WorkerReply> {
        let mut out = Vec::new();
        serve(&GradientEngine::new(), SENTINEL, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn absent_focus_travels_as_sentinel() {
        let req = build(3.0, 2.0, None).unwrap();
        let job = WorkerJob::from_request(7, &req, SENTINEL);
        assert_eq!(job.focus, SENTINEL);
        assert_eq!(job.to_request(SENTINEL), req);

        let focused = build(3.0, 2.0, Some(FocusPoint::new(1.0, 1.0))).unwrap();
        let job = WorkerJob::from_request(8, &focused, SENTINEL);
        assert_eq!(job.to_request(SENTINEL).focus, Some(FocusPoint::new(1.0, 1.0)));
    }

    #[test]
    fn non_finite_focus_survives_the_wire() {
        let req = build(4.0, 4.0, Some(FocusPoint::new(f64::INFINITY, f64::NAN))).unwrap();
        let line = serde_json::to_string(&WorkerJob::from_request(2, &req, SENTINEL)).unwrap();
        assert!(line.contains(r#""x":"inf""#), "{}", line);
        assert!(line.contains(r#""y":"NaN""#), "{}", line);

        let job: WorkerJob = serde_json::from_str(&line).unwrap();
        assert_eq!(job.focus.x, f64::INFINITY);
        assert!(job.focus.y.is_nan());

        let replies = run(&format!("{}\n", line));
        assert_eq!(replies[0].id, 2);
        assert!(replies[0].error.is_none());
    }

    #[test]
    fn unknown_coordinate_text_is_rejected() {
        let replies = run("{\"id\":5,\"width\":1,\"height\":1,\"focus\":{\"x\":\"left\",\"y\":0}}\n");
        assert_eq!(replies[0].id, 0);
        assert!(replies[0].error.is_some());
    }

    #[test]
    fn serve_answers_every_line() {
        let replies = run(concat!(
            r#"{"id":1,"width":4,"height":2,"focus":{"x":-1000.0,"y":-1000.0}}"#,
            "\n\n",
            "not json\n",
            r#"{"id":3,"width":0,"height":2,"focus":{"x":0.0,"y":0.0}}"#,
            "\n",
        ));
        assert_eq!(replies.len(), 3);

        let ok = replies[0].clone().into_response().unwrap();
        assert_eq!((ok.width, ok.height), (4, 2));
        assert_eq!(ok.pixels.len(), 32);

        assert_eq!(replies[1].id, 0);
        assert!(replies[1].error.is_some());
        assert_eq!(replies[2].id, 3);
        assert!(matches!(replies[2].clone().into_response(), Err(Error::Engine(_))));
    }

    #[test]
    fn bad_base64_is_a_protocol_error() {
        let reply = WorkerReply {
            id: 1,
            width: 1,
            height: 1,
            pixels: "***".to_string(),
            error: None,
        };
        assert!(matches!(reply.into_response(), Err(Error::WorkerProtocol(_))));
    }
}
