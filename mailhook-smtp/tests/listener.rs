//! Integration tests for the SMTP listener
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use mailhook_common::{Participant, Signal, error::ListenerError};
use mailhook_smtp::{Listener, SmtpConfig};
use pretty_assertions::assert_eq;
use support::{client::SmtpClient, recorder::Recorder};
use tokio::{sync::broadcast, task::JoinHandle};

const WAIT: Duration = Duration::from_secs(5);

fn config() -> SmtpConfig {
    SmtpConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        banner: "mx.test".to_string(),
        ..SmtpConfig::default()
    }
}

async fn start(
    recorder: Arc<Recorder>,
) -> (
    SocketAddr,
    broadcast::Sender<Signal>,
    JoinHandle<Result<(), ListenerError>>,
) {
    let listener = Listener::bind(&config()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, receiver) = broadcast::channel(4);

    let handle = tokio::spawn(listener.serve(recorder, receiver));
    (addr, shutdown, handle)
}

#[tokio::test]
async fn relays_a_message() {
    let recorder = Arc::new(Recorder::default());
    let (addr, shutdown, handle) = start(Arc::clone(&recorder)).await;

    let (mut client, greeting) = SmtpClient::connect(addr).await.unwrap();
    assert_eq!(greeting, "220 mx.test ESMTP mailhook\r\n");

    let ehlo = client.command("EHLO client.test").await.unwrap();
    assert!(ehlo.starts_with("250-mx.test greets client.test\r\n"));
    assert!(ehlo.contains("SIZE 10485760"));

    let data = "Message-ID: <1@x.com>\r\n\
                From: alice@x.com\r\n\
                To: bob@y.com\r\n\
                Subject: Hi\r\n\
                \r\n\
                Hello\r\n";
    let reply = client
        .send_mail("alice@x.com", &["bob@y.com"], data)
        .await
        .unwrap();
    assert_eq!(reply, "250 Ok: queued\r\n");
    assert!(client.command("QUIT").await.unwrap().starts_with("221 "));

    let envelopes = recorder.wait_for(1, WAIT).await;
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].mail_from(), &Participant::new("alice", "x.com"));
    assert_eq!(envelopes[0].rcpt_to(), &[Participant::new("bob", "y.com")]);
    assert_eq!(envelopes[0].subject(), "Hi");
    assert_eq!(envelopes[0].header("message-id"), Some("<1@x.com>"));
    assert_eq!(envelopes[0].body(), data);
    assert_eq!(envelopes[0].remote_addr(), "127.0.0.1");

    shutdown.send(Signal::Shutdown).unwrap();
    tokio::time::timeout(WAIT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn concurrent_sessions() {
    let recorder = Arc::new(Recorder::default());
    let (addr, shutdown, handle) = start(Arc::clone(&recorder)).await;

    let clients = (0..5).map(|index| {
        tokio::spawn(async move {
            let (mut client, _) = SmtpClient::connect(addr).await.unwrap();
            client.command("HELO client").await.unwrap();
            let reply = client
                .send_mail(
                    &format!("sender{index}@x.com"),
                    &["bob@y.com"],
                    &format!("Subject: {index}\r\n\r\nbody\r\n"),
                )
                .await
                .unwrap();
            client.command("QUIT").await.unwrap();
            reply
        })
    });

    for client in futures_util::future::join_all(clients).await {
        assert_eq!(client.unwrap(), "250 Ok: queued\r\n");
    }

    let mut subjects = recorder
        .wait_for(5, WAIT)
        .await
        .iter()
        .map(|envelope| envelope.subject().to_string())
        .collect::<Vec<_>>();
    subjects.sort();
    assert_eq!(subjects, vec!["0", "1", "2", "3", "4"]);

    shutdown.send(Signal::Shutdown).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_closes_open_sessions() {
    let (addr, shutdown, handle) = start(Arc::new(Recorder::default())).await;

    let (mut client, _) = SmtpClient::connect(addr).await.unwrap();
    client.command("HELO client").await.unwrap();

    shutdown.send(Signal::Shutdown).unwrap();

    assert!(client.reply().await.unwrap().starts_with("421 "));
    tokio::time::timeout(WAIT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn bind_conflict_is_reported() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    let result = Listener::bind(&SmtpConfig {
        listen: taken.local_addr().unwrap(),
        ..config()
    })
    .await;

    assert!(matches!(result, Err(ListenerError::Bind { .. })));
}
