//! Bare bones SMTP client speaking over a real socket
#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::net::SocketAddr;

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

pub struct SmtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl SmtpClient {
    /// Connect and consume the greeting
    pub async fn connect(addr: SocketAddr) -> std::io::Result<(Self, String)> {
        let (reader, writer) = TcpStream::connect(addr).await?.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
        };
        let greeting = client.reply().await?;
        Ok((client, greeting))
    }

    /// Read one complete, possibly multi-line, reply
    pub async fn reply(&mut self) -> std::io::Result<String> {
        let mut reply = String::new();

        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(reply);
            }
            reply.push_str(&line);

            if line.len() < 4 || line.as_bytes()[3] != b'-' {
                return Ok(reply);
            }
        }
    }

    pub async fn command(&mut self, command: &str) -> std::io::Result<String> {
        self.writer
            .write_all(format!("{command}\r\n").as_bytes())
            .await?;
        self.reply().await
    }

    /// Run a full transaction; returns the reply to the end of data
    pub async fn send_mail(&mut self, from: &str, to: &[&str], data: &str) -> std::io::Result<String> {
        self.command(&format!("MAIL FROM:<{from}>")).await?;
        for recipient in to {
            self.command(&format!("RCPT TO:<{recipient}>")).await?;
        }
        self.command("DATA").await?;
        self.writer.write_all(data.as_bytes()).await?;
        self.command(".").await
    }
}
