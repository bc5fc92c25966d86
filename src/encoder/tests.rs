//! Unit tests for response serialization and close handling.

use std::{
    io,
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use rstest::{fixture, rstest};

use super::*;
use crate::{cookie::Cookie, message::InboundEvent};

/// Records sent messages, optionally failing after `fail_after` sends.
#[derive(Debug, Default)]
struct Recording {
    sent: Vec<OutboundMessage>,
    fail_after: Option<usize>,
}

#[async_trait]
impl Transport for Recording {
    async fn receive(&mut self) -> io::Result<InboundEvent> { Ok(InboundEvent::Disconnect) }

    async fn send(&mut self, message: OutboundMessage) -> io::Result<()> {
        if self.fail_after.is_some_and(|limit| self.sent.len() >= limit) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gateway gone"));
        }
        self.sent.push(message);
        Ok(())
    }
}

fn nz(val: usize) -> NonZeroUsize { NonZeroUsize::new(val).expect("non-zero") }

#[fixture]
fn encoder() -> ResponseEncoder { ResponseEncoder::new(nz(4), nz(8)) }

fn bodies(sent: &[OutboundMessage]) -> Vec<(&[u8], bool)> {
    sent.iter()
        .filter_map(|message| match message {
            OutboundMessage::ResponseBody { body, more_body } => Some((body.as_ref(), *more_body)),
            OutboundMessage::ResponseStart { .. } => None,
        })
        .collect()
}

fn counted_close(response: Response) -> (Response, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closes);
    let response = response.on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (response, closes)
}

#[rstest]
#[tokio::test]
async fn full_body_is_chunked_with_final_flag(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    encoder
        .send_response(Response::bytes(200, &b"abcdefghij"[..]), &mut transport)
        .await
        .expect("send");

    assert!(matches!(
        transport.sent.first(),
        Some(OutboundMessage::ResponseStart { status: 200, .. })
    ));
    assert_eq!(
        bodies(&transport.sent),
        vec![
            (&b"abcd"[..], true),
            (&b"efgh"[..], true),
            (&b"ij"[..], false)
        ]
    );
}

#[rstest]
#[tokio::test]
async fn empty_body_sends_one_final_message(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    encoder
        .send_response(Response::new(204), &mut transport)
        .await
        .expect("send");
    assert_eq!(transport.sent.len(), 2);
    assert_eq!(bodies(&transport.sent), vec![(&b""[..], false)]);
}

#[rstest]
#[tokio::test]
async fn streams_end_with_an_empty_final_message(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    let response = Response::from_parts(200, [Bytes::from_static(b"hello"), Bytes::from_static(b"!")]);
    encoder.send_response(response, &mut transport).await.expect("send");
    assert_eq!(
        bodies(&transport.sent),
        vec![
            (&b"hell"[..], true),
            (&b"o"[..], true),
            (&b"!"[..], true),
            (&b""[..], false)
        ]
    );
}

#[rstest]
#[tokio::test]
async fn empty_stream_sends_only_the_terminator(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    let response = Response::stream(200, stream::empty());
    encoder.send_response(response, &mut transport).await.expect("send");
    assert_eq!(bodies(&transport.sent), vec![(&b""[..], false)]);
}

#[rstest]
#[tokio::test]
async fn readers_use_the_file_chunk_size(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    let response = Response::reader(200, &b"0123456789abcdefXY"[..]);
    encoder.send_response(response, &mut transport).await.expect("send");

    let sent = bodies(&transport.sent);
    let (last, rest) = sent.split_last().expect("terminator");
    assert_eq!(*last, (&b""[..], false));
    assert!(rest.iter().all(|(chunk, more)| *more && chunk.len() <= 8));
    assert_eq!(
        rest.iter().flat_map(|(chunk, _)| chunk.iter().copied()).collect::<Vec<u8>>(),
        b"0123456789abcdefXY"
    );
}

#[rstest]
#[tokio::test]
async fn headers_and_cookies_are_encoded_in_order(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    let response = Response::new(302)
        .header("Location", "/caf\u{e9}")
        .cookie(Cookie::new("session", "abc").path("/"));
    encoder.send_response(response, &mut transport).await.expect("send");

    let Some(OutboundMessage::ResponseStart { status, headers }) = transport.sent.first() else {
        panic!("expected a start message");
    };
    assert_eq!(*status, 302);
    assert_eq!(
        headers,
        &vec![
            (Bytes::from_static(b"Location"), Bytes::from_static(b"/caf\xe9")),
            (
                Bytes::from_static(b"Set-Cookie"),
                Bytes::from_static(b"session=abc; Path=/")
            ),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn unencodable_header_fails_before_start(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    let (response, closes) = counted_close(Response::new(200).header("X-Title", "\u{2603}"));
    let err = encoder
        .send_response(response, &mut transport)
        .await
        .expect_err("header must not encode");
    assert!(matches!(err, SendError::HeaderEncoding { ref name } if name == "X-Title"));
    assert!(transport.sent.is_empty());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[tokio::test]
async fn close_runs_once_when_the_transport_fails(
    encoder: ResponseEncoder,
    #[case] fail_after: usize,
) {
    let mut transport = Recording {
        fail_after: Some(fail_after),
        ..Recording::default()
    };
    let (response, closes) = counted_close(Response::bytes(200, &b"abcdefgh"[..]));
    let err = encoder
        .send_response(response, &mut transport)
        .await
        .expect_err("transport fails");
    assert!(matches!(err, SendError::Transport(_)));
    assert_eq!(transport.sent.len(), fail_after);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn stream_errors_stop_the_body(encoder: ResponseEncoder) {
    let mut transport = Recording::default();
    let parts = stream::iter([
        Ok(Bytes::from_static(b"ok")),
        Err(io::Error::other("disk read failed")),
    ]);
    let (response, closes) = counted_close(Response::stream(200, parts));
    let err = encoder
        .send_response(response, &mut transport)
        .await
        .expect_err("stream fails");
    assert!(matches!(err, SendError::Body(_)));
    assert_eq!(bodies(&transport.sent), vec![(&b"ok"[..], true)]);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn file_chunk_size_never_drops_below_chunk_size() {
    let encoder = ResponseEncoder::new(nz(16), nz(4));
    assert_eq!(encoder, ResponseEncoder::new(nz(16), nz(16)));
}
