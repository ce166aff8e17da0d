//! End-to-end test harness: a relay on a random port in front of a mock webhook
#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::{net::SocketAddr, path::Path, time::Duration};

use mailhook::{ExitStatus, Relay, RelayConfig};
use mailhook_delivery::DeliveryConfig;
use mailhook_smtp::SmtpConfig;
use tempfile::TempDir;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
};

pub struct Harness {
    smtp_addr: SocketAddr,
    fallback_dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    relay: JoinHandle<ExitStatus>,
}

impl Harness {
    pub async fn start(api_url: impl Into<String>) -> Self {
        let fallback_dir = tempfile::tempdir().expect("Failed to create fallback dir");

        let config = RelayConfig {
            smtp: SmtpConfig {
                listen: "127.0.0.1:0".parse().expect("valid address"),
                banner: "relay.test".to_string(),
                ..SmtpConfig::default()
            },
            delivery: DeliveryConfig {
                api_url: api_url.into(),
                request_timeout_secs: 5,
                fallback_dir: fallback_dir.path().to_path_buf(),
                ..DeliveryConfig::default()
            },
        };

        let relay = Relay::start(&config).await.expect("Failed to start relay");
        let smtp_addr = relay.local_addr().expect("Failed to get relay address");

        let (stop, stopped) = oneshot::channel();
        let relay = tokio::spawn(relay.run(async move {
            let _ = stopped.await;
        }));

        Self {
            smtp_addr,
            fallback_dir,
            stop: Some(stop),
            relay,
        }
    }

    pub fn fallback_dir(&self) -> &Path {
        self.fallback_dir.path()
    }

    /// Send one message over SMTP; returns the reply to the end of data
    pub async fn send_email(&self, from: &str, to: &[&str], data: &str) -> String {
        let stream = TcpStream::connect(self.smtp_addr)
            .await
            .expect("Failed to connect to relay");
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let mut reply = read_reply(&mut reader).await;
        assert!(reply.starts_with("220 "), "Unexpected greeting {reply}");

        let mut commands = vec!["HELO harness".to_string(), format!("MAIL FROM:<{from}>")];
        commands.extend(to.iter().map(|recipient| format!("RCPT TO:<{recipient}>")));
        commands.push("DATA".to_string());

        for command in commands {
            writer
                .write_all(format!("{command}\r\n").as_bytes())
                .await
                .expect("Failed to send command");
            reply = read_reply(&mut reader).await;
        }
        assert!(reply.starts_with("354 "), "DATA refused: {reply}");

        writer
            .write_all(format!("{data}.\r\n").as_bytes())
            .await
            .expect("Failed to send data");
        let reply = read_reply(&mut reader).await;

        let _ = writer.write_all(b"QUIT\r\n").await;
        reply
    }

    /// Stop the relay as a signal would and return its exit status
    pub async fn shutdown(mut self) -> ExitStatus {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.wait().await
    }

    /// Wait for the relay to stop on its own
    pub async fn wait(self) -> ExitStatus {
        tokio::time::timeout(Duration::from_secs(10), self.relay)
            .await
            .expect("Relay did not stop in time")
            .expect("Relay task panicked")
    }
}

async fn read_reply<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> String {
    let mut reply = String::new();

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.expect("Failed to read reply") == 0 {
            return reply;
        }
        reply.push_str(&line);

        if line.len() < 4 || line.as_bytes()[3] != b'-' {
            return reply;
        }
    }
}
