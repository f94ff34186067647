//! Middleware ordering tests.
//!
//! Drives `Pipeline::handle` directly with recording units of both flavors
//! and checks the exact order in which phases run.

use std::sync::{Arc, Mutex};

use http::HeaderValue;
use strata::middleware::{keys, EnvMiddleware, Environment, Flow, HeaderLogger, Middleware, Value};
use strata::{ContentType, Error, Method, Parts, Pipeline, Request, Response, Router, Status};

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Copy)]
enum Behavior {
    Pass,
    Respond,
    FailBefore,
    FailAfter,
    Panic,
}

struct Recorder {
    tag: &'static str,
    log: Log,
    behavior: Behavior,
}

impl Recorder {
    fn new(tag: &'static str, log: &Log) -> Self {
        Self::with(tag, log, Behavior::Pass)
    }

    fn with(tag: &'static str, log: &Log, behavior: Behavior) -> Self {
        Self { tag, log: Arc::clone(log), behavior }
    }

    fn record(&self, phase: &str) {
        self.log.lock().unwrap().push(format!("{}.{phase}", self.tag));
    }
}

impl Middleware for Recorder {
    fn name(&self) -> &str {
        self.tag
    }

    fn before(&self, _req: &mut Request) -> Result<Flow, Error> {
        self.record("pre");
        match self.behavior {
            Behavior::Respond => Ok(Flow::Respond(Response::status(Status::Unauthorized))),
            Behavior::FailBefore => Err(Error::fault(self.tag, "refused")),
            Behavior::Panic => panic!("{} blew up", self.tag),
            Behavior::Pass | Behavior::FailAfter => Ok(Flow::Continue),
        }
    }

    fn after(&self, _req: &Parts, _res: &mut Response) -> Result<(), Error> {
        self.record("post");
        match self.behavior {
            Behavior::FailAfter => Err(Error::fault(self.tag, "broken on the way out")),
            _ => Ok(()),
        }
    }
}

/// Environment-flavor recorder that stamps a request header on the way in
/// and a response header on the way out.
struct EnvRecorder {
    tag: &'static str,
    log: Log,
    respond: bool,
}

impl EnvMiddleware for EnvRecorder {
    fn name(&self) -> &str {
        self.tag
    }

    fn before(&self, env: &mut Environment) -> Result<Flow, Error> {
        self.log.lock().unwrap().push(format!("{}.pre", self.tag));
        if let Some(headers) = env.headers_mut(keys::REQUEST_HEADERS) {
            headers.insert("x-via".into(), vec![self.tag.into()]);
        }
        if self.respond {
            return Ok(Flow::Respond(Response::status(Status::TooManyRequests)));
        }
        Ok(Flow::Continue)
    }

    fn after(&self, env: &mut Environment) -> Result<(), Error> {
        self.log.lock().unwrap().push(format!("{}.post", self.tag));
        let status = env.status().unwrap_or_default();
        if let Some(headers) = env.headers_mut(keys::RESPONSE_HEADERS) {
            headers.insert("x-seen-status".into(), vec![status.to_string()]);
        }
        Ok(())
    }
}

/// Typed unit that checks what the environment unit wrote.
struct ViaCheck {
    log: Log,
}

impl Middleware for ViaCheck {
    fn name(&self) -> &str {
        "via-check"
    }

    fn before(&self, req: &mut Request) -> Result<Flow, Error> {
        let via = req.header("x-via").unwrap_or("none").to_owned();
        self.log.lock().unwrap().push(format!("via={via}"));
        Ok(Flow::Continue)
    }

    fn after(&self, _req: &Parts, res: &mut Response) -> Result<(), Error> {
        let seen = res.header("x-seen-status").unwrap_or("none").to_owned();
        self.log.lock().unwrap().push(format!("seen={seen}"));
        Ok(())
    }
}

fn terminal(log: &Log) -> Router {
    let log = Arc::clone(log);
    Router::new().on(Method::Get, "/", move |req: Request| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push("T".to_owned());
            let via = req.header("x-via").unwrap_or("none").to_owned();
            Ok::<_, Error>(Response::text(via))
        }
    })
}

fn failing_terminal(log: &Log) -> Router {
    let log = Arc::clone(log);
    Router::new().on(Method::Get, "/", move |_req: Request| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push("T".to_owned());
            Err::<Response, _>(Error::fault("terminal", "storage unavailable"))
        }
    })
}

fn events(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn get() -> Request {
    Request::new(Method::Get, "/")
}

#[tokio::test]
async fn layers_nest_in_registration_order() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log))
        .layer(Recorder::new("A", &log))
        .layer(Recorder::new("B", &log))
        .layer(Recorder::new("C", &log));

    let res = pipeline.handle(get()).await.unwrap();

    assert_eq!(res.status_code(), 200);
    assert_eq!(events(&log), ["A.pre", "B.pre", "C.pre", "T", "C.post", "B.post", "A.post"]);
}

#[tokio::test]
async fn short_circuit_skips_inner_layers_and_terminal() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log))
        .layer(Recorder::new("A", &log))
        .layer(Recorder::with("B", &log, Behavior::Respond))
        .layer(Recorder::new("C", &log));

    let res = pipeline.handle(get()).await.unwrap();

    assert_eq!(res.status_code(), 401);
    assert_eq!(events(&log), ["A.pre", "B.pre", "B.post", "A.post"]);
}

#[tokio::test]
async fn flavors_interleave_with_one_ordering() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log))
        .layer(Recorder::new("A", &log))
        .adapter(EnvRecorder { tag: "B", log: Arc::clone(&log), respond: false })
        .layer(Recorder::new("C", &log));

    let res = pipeline.handle(get()).await.unwrap();

    assert_eq!(events(&log), ["A.pre", "B.pre", "C.pre", "T", "C.post", "B.post", "A.post"]);
    assert_eq!(res.body(), b"B");
    assert_eq!(res.header("x-seen-status"), Some("200"));
}

#[tokio::test]
async fn typed_units_see_environment_edits() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log))
        .layer(ViaCheck { log: Arc::clone(&log) })
        .adapter(EnvRecorder { tag: "env", log: Arc::clone(&log), respond: false });

    pipeline.handle(get()).await.unwrap();

    // The outer typed unit runs before the environment edit on the way in,
    // and after the environment's response edit on the way out.
    assert_eq!(events(&log), ["via=none", "env.pre", "T", "env.post", "seen=200"]);
}

#[tokio::test]
async fn environment_units_can_short_circuit() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log))
        .layer(Recorder::new("A", &log))
        .adapter(EnvRecorder { tag: "B", log: Arc::clone(&log), respond: true })
        .layer(Recorder::new("C", &log));

    let res = pipeline.handle(get()).await.unwrap();

    assert_eq!(res.status_code(), 429);
    assert_eq!(res.header("x-seen-status"), Some("429"));
    assert_eq!(events(&log), ["A.pre", "B.pre", "B.post", "A.post"]);
}

#[tokio::test]
async fn fault_in_before_skips_every_after() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log))
        .layer(Recorder::new("A", &log))
        .layer(Recorder::with("B", &log, Behavior::FailBefore))
        .layer(Recorder::new("C", &log));

    let err = pipeline.handle(get()).await.unwrap_err();

    assert!(matches!(err, Error::Fault { ref unit, .. } if unit == "B"));
    assert_eq!(events(&log), ["A.pre", "B.pre"]);
}

#[tokio::test]
async fn fault_in_terminal_skips_every_after() {
    let log = Log::default();
    let pipeline = Pipeline::new(failing_terminal(&log))
        .layer(Recorder::new("A", &log))
        .layer(Recorder::new("B", &log));

    let err = pipeline.handle(get()).await.unwrap_err();

    assert!(matches!(err, Error::Fault { ref unit, .. } if unit == "terminal"));
    assert_eq!(events(&log), ["A.pre", "B.pre", "T"]);
}

#[tokio::test]
async fn fault_in_after_stops_the_unwind() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log))
        .layer(Recorder::new("A", &log))
        .layer(Recorder::new("B", &log))
        .layer(Recorder::with("C", &log, Behavior::FailAfter));

    assert!(pipeline.handle(get()).await.is_err());
    assert_eq!(events(&log), ["A.pre", "B.pre", "C.pre", "T", "C.post"]);
}

#[tokio::test]
async fn panics_propagate_uncaught() {
    let log = Log::default();
    let pipeline = Arc::new(
        Pipeline::new(terminal(&log))
            .layer(Recorder::new("A", &log))
            .layer(Recorder::with("B", &log, Behavior::Panic))
            .layer(Recorder::new("C", &log)),
    );

    let p = Arc::clone(&pipeline);
    let joined = tokio::spawn(async move { p.handle(get()).await }).await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(events(&log), ["A.pre", "B.pre"]);
}

#[tokio::test]
async fn outer_after_can_replace_the_response() {
    struct Rewrite;

    impl Middleware for Rewrite {
        fn name(&self) -> &str {
            "rewrite"
        }

        fn after(&self, _req: &Parts, res: &mut Response) -> Result<(), Error> {
            *res = Response::builder().status(Status::Accepted).text("rewritten");
            Ok(())
        }
    }

    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log)).layer(Rewrite);

    let res = pipeline.handle(get()).await.unwrap();

    assert_eq!(res.status_code(), 202);
    assert_eq!(res.body(), b"rewritten");
}

#[tokio::test]
async fn metadata_is_shared_between_flavors() {
    struct SetTenant;

    impl EnvMiddleware for SetTenant {
        fn name(&self) -> &str {
            "set-tenant"
        }

        fn before(&self, env: &mut Environment) -> Result<Flow, Error> {
            env.insert("tenant", Value::Text("acme".into()));
            Ok(Flow::Continue)
        }
    }

    struct RequireTenant;

    impl Middleware for RequireTenant {
        fn name(&self) -> &str {
            "require-tenant"
        }

        fn before(&self, req: &mut Request) -> Result<Flow, Error> {
            match req.metadata("tenant") {
                Some("acme") => Ok(Flow::Continue),
                _ => Ok(Flow::Respond(Response::status(Status::Forbidden))),
            }
        }
    }

    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log)).adapter(SetTenant).layer(RequireTenant);

    let res = pipeline.handle(get()).await.unwrap();
    assert_eq!(res.status_code(), 200);
    assert_eq!(events(&log), ["T"]);
}

#[tokio::test]
async fn empty_pipeline_reaches_the_router() {
    let log = Log::default();
    let pipeline = Pipeline::new(terminal(&log));
    assert!(pipeline.is_empty());

    let res = pipeline.handle(get()).await.unwrap();
    assert_eq!(res.status_code(), 200);

    let res = pipeline.handle(Request::new(Method::Get, "/missing")).await.unwrap();
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn read_only_adapters_leave_header_bytes_alone() {
    let echo = || {
        Router::new().on(Method::Get, "/", |req: Request| async move {
            let raw = req.headers().get("x-name").map(|v| v.as_bytes().to_vec()).unwrap_or_default();
            Ok::<_, Error>(Response::builder().bytes(ContentType::OctetStream, raw))
        })
    };
    let request = || {
        let mut req = get();
        req.headers_mut().insert("x-name", HeaderValue::from_bytes(b"J\xE9r").unwrap());
        req
    };

    let plain = Pipeline::new(echo()).handle(request()).await.unwrap();
    let logged = Pipeline::new(echo()).adapter(HeaderLogger).handle(request()).await.unwrap();

    assert_eq!(plain.body(), b"J\xE9r");
    assert_eq!(logged.body(), plain.body());
    assert_eq!(logged.header("content-type"), Some("application/octet-stream"));
}
