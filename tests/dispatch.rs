//! Orchestration checked against stub transports that never touch the network.
#![cfg(not(target_arch = "wasm32"))]

mod common;

use std::sync::{mpsc, Arc, Mutex};

use http_dispatch::{
    Blob, ByteView, Completion, OutgoingRequest, Payload, RawBuffer, RawResponse, RequestSpec, Requester,
    ResponseData, Transport, TransportError, TransportKind, BLOB, OCTET_STREAM,
};

const URL: &str = "http://localhost:3000/";

/// Remembers every request it is handed and answers 200.
#[derive(Clone, Default)]
struct RecordingTransport {
    seen: Arc<Mutex<Vec<OutgoingRequest>>>,
}

impl RecordingTransport {
    fn take(&self) -> Vec<OutgoingRequest> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

impl Transport for RecordingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Server
    }

    async fn transmit(&self, request: OutgoingRequest) -> Result<Completion, TransportError> {
        self.seen.lock().unwrap().push(request);
        Ok(Completion::new(ResponseData::Empty, 200, RawResponse::new(Vec::new())))
    }
}

/// Answers every request with the given status.
struct StatusTransport(u16);

impl Transport for StatusTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Browser
    }

    async fn transmit(&self, _request: OutgoingRequest) -> Result<Completion, TransportError> {
        Err(TransportError::Status {
            status: self.0,
            data: ResponseData::Text("not here".to_string()),
        })
    }
}

/// Dies before settling anything.
struct PanickingTransport;

impl Transport for PanickingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Server
    }

    async fn transmit(&self, _request: OutgoingRequest) -> Result<Completion, TransportError> {
        panic!("transport blew up")
    }
}

fn recording() -> (Requester<RecordingTransport>, RecordingTransport) {
    common::init_logging();
    let transport = RecordingTransport::default();
    (Requester::with_transport(transport.clone()), transport)
}

fn post_octets(data: impl Into<Payload>) -> RequestSpec {
    RequestSpec::new("POST").url(URL).content_type(OCTET_STREAM).data(data)
}

#[test]
fn string_reaches_transport_unchanged() {
    let (requester, transport) = recording();
    requester.send(post_octets("Test")).unwrap().wait().unwrap();

    let seen = transport.take();
    assert_eq!(seen.len(), 1);
    assert!(matches!(seen[0].payload, Some(Payload::Text(ref text)) if text == "Test"));
    assert_eq!(seen[0].content_type.as_deref(), Some(OCTET_STREAM));
}

#[test]
fn byte_sequence_reaches_transport_in_order() {
    let (requester, transport) = recording();
    let bytes: Vec<u8> = "Test".bytes().collect();
    requester.send(post_octets(bytes.clone())).unwrap().wait().unwrap();

    match transport.take().pop().and_then(|request| request.payload) {
        Some(Payload::ByteSequence(sent)) => {
            for (index, byte) in bytes.iter().enumerate() {
                assert_eq!(sent[index], *byte);
            }
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn typed_view_reaches_transport_intact() {
    let (requester, transport) = recording();
    let view = ByteView::from("Test".as_bytes());
    requester.send(post_octets(view.clone())).unwrap().wait().unwrap();

    match transport.take().pop().and_then(|request| request.payload) {
        Some(Payload::TypedView(sent)) => {
            assert_eq!(sent.len(), view.len());
            for index in 0..view.len() {
                assert_eq!(sent[index], view[index]);
            }
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn raw_buffer_is_refused_as_octet_stream() {
    let (requester, transport) = recording();
    let err = requester.send(post_octets(RawBuffer::new(4))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "data sended must be a File, a Blob, or an ArrayBufferView"
    );
    assert!(transport.take().is_empty());
}

#[test]
fn raw_buffer_is_refused_as_blob() {
    let (requester, transport) = recording();
    let spec = RequestSpec::new("POST")
        .url(URL)
        .content_type(BLOB)
        .data(RawBuffer::new(4));
    let err = requester.send(spec).unwrap_err();
    assert_eq!(err.to_string(), "data sended must be a Blob, not an ArrayBuffer");
    assert!(transport.take().is_empty());
}

#[test]
fn blob_is_accepted_as_blob() {
    let (requester, transport) = recording();
    let blob = Blob::file("notes.txt", "Test", Some("text/plain"));
    let spec = RequestSpec::new("PUT").url(URL).content_type(BLOB).data(blob.clone());
    requester.send(spec).unwrap().wait().unwrap();

    let seen = transport.take();
    assert!(matches!(seen[0].payload, Some(Payload::Blob(ref sent)) if *sent == blob));
}

#[test]
fn missing_url_never_reaches_transport() {
    let (requester, transport) = recording();
    let err = requester.send(RequestSpec::new("GET")).unwrap_err();
    assert_eq!(err.to_string(), "undefined:url");
    assert!(transport.take().is_empty());
}

#[test]
fn unknown_verb_is_a_configuration_error() {
    let (requester, transport) = recording();
    let err = requester.send(RequestSpec::new("FETCH").url(URL)).unwrap_err();
    assert!(matches!(err, http_dispatch::ConfigError::UnknownMethod(_)));
    assert!(transport.take().is_empty());
}

#[test]
fn success_fires_callback_and_resolves() {
    let (requester, _) = recording();
    let (tx, rx) = mpsc::channel();

    let completion = requester
        .send(RequestSpec::new("GET").url(URL).success(move |data, status, raw| {
            tx.send((data.is_empty(), status, raw.status().as_u16())).unwrap();
        }))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(completion.status, 200);
    assert_eq!(rx.recv().unwrap(), (true, 200, 200));
}

#[test]
fn failure_fires_callback_and_rejects() {
    common::init_logging();
    let requester = Requester::with_transport(StatusTransport(404));
    let (tx, rx) = mpsc::channel();

    let err = requester
        .send(RequestSpec::new("GET").url(URL).error(move |data, status| {
            tx.send((data.as_text().map(str::to_string), status)).unwrap();
        }))
        .unwrap()
        .wait()
        .unwrap_err();

    assert_eq!(err.status(), 404);
    assert_eq!(rx.recv().unwrap(), (Some("not here".to_string()), 404));
}

#[test]
fn success_callback_stays_silent_on_failure() {
    let requester = Requester::with_transport(StatusTransport(500));
    let (tx, rx) = mpsc::channel::<u16>();

    let err = requester
        .send(RequestSpec::new("GET").url(URL).success(move |_, status, _| {
            tx.send(status).unwrap();
        }))
        .unwrap()
        .wait()
        .unwrap_err();

    assert_eq!(err.status(), 500);
    assert!(rx.recv().is_err());
}

#[test]
fn dying_transport_abandons_the_request() {
    let requester = Requester::with_transport(PanickingTransport);
    let outcome = requester.send(RequestSpec::new("GET").url(URL)).unwrap().wait();
    assert!(matches!(outcome, Err(TransportError::Abandoned)));
}

#[test]
fn panicking_callback_still_settles_the_deferred() {
    let (requester, _) = recording();
    let completion = requester
        .send(RequestSpec::new("GET").url(URL).success(|_, _, _| panic!("caller bug")))
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(completion.status, 200);
}

#[test]
fn identical_specs_produce_separate_requests() {
    let (requester, transport) = recording();
    let spec = || RequestSpec::new("POST").url(URL).header("X-Request", "same").data("Test");

    let first = requester.send(spec()).unwrap();
    let second = requester.send(spec()).unwrap();
    assert_eq!(first.wait().unwrap().status, 200);
    assert_eq!(second.wait().unwrap().status, 200);

    let seen = transport.take();
    assert_eq!(seen.len(), 2);
    for request in &seen {
        assert_eq!(request.headers["x-request"], "same");
        assert!(matches!(request.payload, Some(Payload::Text(ref text)) if text == "Test"));
    }
}

#[test]
fn requester_exposes_its_transport() {
    let requester = Requester::with_transport(StatusTransport(418));
    assert_eq!(requester.transport().kind(), TransportKind::Browser);
    assert_eq!(requester.clone().transport().0, 418);
}
