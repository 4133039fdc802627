use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use crate::attachment::{LoggingBehavior, PipelineAttachment};
use crate::config::LoggerConfig;
use crate::error::{AttachError, PipelineError, PipelineResult};
use crate::logging::{LogDispatcher, MemorySink};
use crate::message::Message;
use crate::pipeline::{
    ClientChannel, ClientRuntime, EndpointDispatcher, LoopbackTransport, ServiceHost, handler_fn,
};

use super::support::UnrenderableBody;

const ECHO: &str = "svc://echo";

async fn echo(mut request: Message) -> PipelineResult<Message> {
    let text = request
        .read_text()
        .map_err(|e| PipelineError::handler(request.action(), e.to_string()))?
        .unwrap_or_default();
    let reply_text = if text == "ping" { "pong".to_string() } else { text };
    Ok(Message::new(format!("{}Reply", request.action()), reply_text))
}

async fn acknowledge(request: Message) -> PipelineResult<Message> {
    Ok(Message::new(format!("{}Reply", request.action()), "ack"))
}

async fn reject(request: Message) -> PipelineResult<Message> {
    Err(PipelineError::handler(request.action(), "not allowed"))
}

fn logged_host(behavior: &LoggingBehavior) -> Arc<ServiceHost> {
    let mut host = ServiceHost::new()
        .endpoint(ECHO, handler_fn(echo))
        .endpoint("svc://reject", handler_fn(reject));
    behavior.on_service_pipeline_built(&mut host).unwrap();
    host.open();
    Arc::new(host)
}

fn plain_host() -> Arc<ServiceHost> {
    let mut host = ServiceHost::new().endpoint(ECHO, handler_fn(echo));
    host.open();
    Arc::new(host)
}

fn logged_channel(behavior: &LoggingBehavior, host: Arc<ServiceHost>, address: &str) -> ClientChannel {
    let mut runtime = ClientRuntime::new(address);
    behavior.on_client_pipeline_built(&mut runtime).unwrap();
    ClientChannel::open(runtime, Arc::new(LoopbackTransport::new(host)))
}

fn setup(sink: &MemorySink, config: LoggerConfig) -> (LogDispatcher, LoggingBehavior) {
    let dispatcher = LogDispatcher::new(Arc::new(sink.clone()), config);
    let behavior = LoggingBehavior::new(dispatcher.clone());
    (dispatcher, behavior)
}

#[tokio::test]
async fn test_ping_pong_logs_correlated_pairs() {
    let sink = MemorySink::new();
    let (dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let channel = logged_channel(&behavior, logged_host(&behavior), ECHO);

    let mut reply = channel.call(Message::new("echo", "ping")).await.unwrap();
    assert_eq!(reply.action(), "echoReply");
    assert_eq!(reply.read_text().unwrap().as_deref(), Some("pong"));

    dispatcher.flush().await;
    let lines = sink.json_lines();
    assert_eq!(lines.len(), 4);

    let direction = |i: usize| lines[i]["direction"].as_str().unwrap();
    assert_eq!(direction(0), "ClientRequest");
    assert_eq!(direction(1), "ServiceRequest");
    assert_eq!(direction(2), "ServiceReply");
    assert_eq!(direction(3), "ClientReply");

    assert_eq!(lines[0]["correlationId"], lines[3]["correlationId"]);
    assert_eq!(lines[1]["correlationId"], lines[2]["correlationId"]);
    assert_ne!(lines[0]["correlationId"], lines[1]["correlationId"]);

    assert_eq!(lines[0]["body"], "ping");
    assert_eq!(lines[3]["body"], "pong");
}

#[tokio::test]
async fn test_client_only_logging() {
    let sink = MemorySink::new();
    let (dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let channel = logged_channel(&behavior, plain_host(), ECHO);

    channel.call(Message::new("echo", "ping")).await.unwrap();
    dispatcher.flush().await;

    let lines = sink.json_lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["direction"], "ClientRequest");
    assert_eq!(lines[1]["direction"], "ClientReply");
    assert_eq!(lines[0]["correlationId"], lines[1]["correlationId"]);
}

#[tokio::test]
async fn test_disabled_sink_logs_nothing() {
    let sink = MemorySink::disabled();
    let (dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let channel = logged_channel(&behavior, logged_host(&behavior), ECHO);

    let mut reply = channel.call(Message::new("echo", "ping")).await.unwrap();
    assert_eq!(reply.read_text().unwrap().as_deref(), Some("pong"));

    dispatcher.flush().await;
    assert!(sink.lines().is_empty());
    assert!(sink.errors().is_empty());
    assert_eq!(sink.emit_attempts(), 0);
}

#[tokio::test]
async fn test_failing_sink_never_affects_exchanges() {
    let sink = MemorySink::failing();
    let config = LoggerConfig::new().with_queue_capacity(4096);
    let (dispatcher, behavior) = setup(&sink, config);
    let channel = logged_channel(&behavior, plain_host(), ECHO);

    for i in 0..1000 {
        let mut reply = channel
            .call(Message::new("echo", format!("message {}", i)))
            .await
            .unwrap();
        assert_eq!(
            reply.read_text().unwrap(),
            Some(format!("message {}", i))
        );
    }

    dispatcher.flush().await;
    // Two legs per exchange: the outbound request and the inbound reply.
    assert_eq!(sink.emit_attempts(), 2000);
    assert_eq!(sink.errors().len(), 2000);
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn test_render_fault_does_not_affect_exchange() {
    let sink = MemorySink::new();
    let (dispatcher, behavior) = setup(&sink, LoggerConfig::new());

    let mut host = ServiceHost::new().endpoint("svc://ack", handler_fn(acknowledge));
    behavior.on_service_pipeline_built(&mut host).unwrap();
    host.open();
    let channel = logged_channel(&behavior, Arc::new(host), "svc://ack");

    let mut reply = channel
        .call(Message::new("decrypt", UnrenderableBody))
        .await
        .unwrap();
    assert_eq!(reply.action(), "decryptReply");
    assert_eq!(reply.read_text().unwrap().as_deref(), Some("ack"));

    dispatcher.flush().await;

    // Both request legs carry the unrenderable body; both replies render.
    let errors = sink.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|(_, cause)| cause == "body is encrypted"));
    assert!(errors[0].0.contains("ClientRequest"));
    assert!(errors[1].0.contains("ServiceRequest"));

    let lines = sink.json_lines();
    let directions: Vec<_> = lines
        .iter()
        .map(|line| line["direction"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(directions, ["ServiceReply", "ClientReply"]);
    assert!(lines.iter().all(|line| line["body"] == "ack"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_channels_do_not_cross_talk() {
    let sink = MemorySink::new();
    let config = LoggerConfig::new().with_queue_capacity(4096).with_worker_count(2);
    let (dispatcher, behavior) = setup(&sink, config);
    let host = plain_host();

    let alpha = Arc::new(logged_channel(&behavior, host.clone(), ECHO));
    let beta = Arc::new(logged_channel(&behavior, host, ECHO));

    let mut tasks = Vec::new();
    for (channel, action) in [(alpha.clone(), "alpha"), (beta.clone(), "beta")] {
        for i in 0..50 {
            let channel = channel.clone();
            tasks.push(tokio::spawn(async move {
                channel
                    .call(Message::new(action, format!("{} {}", action, i)))
                    .await
            }));
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    dispatcher.flush().await;

    let mut actions_by_id: HashMap<String, Vec<String>> = HashMap::new();
    for line in sink.json_lines() {
        actions_by_id
            .entry(line["correlationId"].as_str().unwrap().to_string())
            .or_default()
            .push(line["action"].as_str().unwrap().to_string());
    }

    assert_eq!(actions_by_id.len(), 2);
    for actions in actions_by_id.values() {
        assert_eq!(actions.len(), 100);
        let family = actions[0].trim_end_matches("Reply").to_string();
        assert!(
            actions
                .iter()
                .all(|action| action.trim_end_matches("Reply") == family)
        );
    }
}

#[tokio::test]
async fn test_streamed_request_reaches_handler_intact() {
    let sink = MemorySink::new();
    let (dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let channel = logged_channel(&behavior, logged_host(&behavior), ECHO);

    let request = Message::streamed("upload", Cursor::new(b"large body".to_vec()));
    let mut reply = channel.call(request).await.unwrap();
    assert_eq!(reply.read_text().unwrap().as_deref(), Some("large body"));

    dispatcher.flush().await;
    let lines = sink.json_lines();
    assert_eq!(lines[0]["body"], "large body");
    assert_eq!(lines[1]["body"], "large body");
}

#[tokio::test]
async fn test_handler_error_skips_reply_hooks() {
    let sink = MemorySink::new();
    let (dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let host = logged_host(&behavior);
    let channel = logged_channel(&behavior, host, "svc://reject");

    let error = channel
        .call(Message::new("delete", "everything"))
        .await
        .unwrap_err();
    assert_eq!(error, PipelineError::handler("delete", "not allowed"));

    dispatcher.flush().await;
    let lines = sink.json_lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["direction"], "ClientRequest");
    assert_eq!(lines[1]["direction"], "ServiceRequest");
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let sink = MemorySink::new();
    let (_dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let channel = logged_channel(&behavior, plain_host(), "svc://missing");

    let error = channel.call(Message::empty("ping")).await.unwrap_err();
    assert_eq!(
        error,
        PipelineError::EndpointNotFound("svc://missing".to_string())
    );
}

#[tokio::test]
async fn test_host_must_be_open() {
    let host = ServiceHost::new().endpoint(ECHO, handler_fn(echo));
    let error = host.dispatch(ECHO, Message::empty("ping")).await.unwrap_err();
    assert_eq!(error, PipelineError::HostNotOpen);
}

#[tokio::test]
async fn test_attach_to_open_client_runtime_fails() {
    let sink = MemorySink::new();
    let (_dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let mut channel = logged_channel(&behavior, plain_host(), ECHO);

    let error = behavior
        .on_client_pipeline_built(channel.runtime_mut())
        .unwrap_err();
    assert_eq!(error, AttachError::ClientRuntimeOpen(ECHO.to_string()));
    assert_eq!(channel.runtime().inspector_count(), 1);
}

#[tokio::test]
async fn test_attach_to_open_host_fails() {
    let sink = MemorySink::new();
    let (_dispatcher, behavior) = setup(&sink, LoggerConfig::new());

    let mut host = ServiceHost::new().endpoint(ECHO, handler_fn(echo));
    host.open();

    assert_eq!(
        behavior.on_service_pipeline_built(&mut host),
        Err(AttachError::ServiceHostOpen)
    );
    assert_eq!(host.endpoints()[0].inspector_count(), 0);
}

#[tokio::test]
async fn test_attach_to_open_endpoint_fails() {
    let sink = MemorySink::new();
    let (_dispatcher, behavior) = setup(&sink, LoggerConfig::new());

    let mut endpoint = EndpointDispatcher::new(ECHO, handler_fn(echo));
    behavior.on_endpoint_built(&mut endpoint).unwrap();
    endpoint.open();

    assert_eq!(
        behavior.on_endpoint_built(&mut endpoint),
        Err(AttachError::EndpointOpen(ECHO.to_string()))
    );
    assert_eq!(endpoint.inspector_count(), 1);
}

#[tokio::test]
async fn test_service_attach_gives_each_endpoint_its_own_interceptor() {
    let sink = MemorySink::new();
    let (dispatcher, behavior) = setup(&sink, LoggerConfig::new());
    let host = logged_host(&behavior);
    assert!(host.endpoints().iter().all(|e| e.inspector_count() == 1));

    let to_echo = logged_channel(&behavior, host.clone(), ECHO);
    let to_reject = logged_channel(&behavior, host, "svc://reject");
    to_echo.call(Message::new("echo", "ping")).await.unwrap();
    let _ = to_reject.call(Message::new("delete", "x")).await;

    dispatcher.flush().await;
    let service_ids: Vec<_> = sink
        .json_lines()
        .into_iter()
        .filter(|line| line["direction"] == "ServiceRequest")
        .map(|line| line["correlationId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(service_ids.len(), 2);
    assert_ne!(service_ids[0], service_ids[1]);
}

#[tokio::test]
async fn test_internal_debug_comes_from_config() {
    let sink = MemorySink::new();
    let (_dispatcher, quiet) = setup(&sink, LoggerConfig::new());
    assert!(!quiet.internal_debug().is_enabled());

    let (_dispatcher, chatty) = setup(&sink, LoggerConfig::new().with_internal_debug(true));
    assert!(chatty.internal_debug().is_enabled());

    // Lifecycle logging never changes attachment results.
    let mut runtime = ClientRuntime::new(ECHO);
    chatty.on_client_pipeline_built(&mut runtime).unwrap();
    assert_eq!(runtime.inspector_count(), 1);
}
