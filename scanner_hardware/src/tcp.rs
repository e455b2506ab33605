//! Line-oriented TCP link to an Ethernet motion controller.
//!
//! Commands are terminated with `\r`. The controller answers with optional
//! data followed by the `:` prompt, or with `?` when it rejects a command.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use scanner_traits::{BoxError, Transport};

use crate::error::HwError;

const PROMPT: u8 = b':';
const REJECT: u8 = b'?';
const MAX_REPLY: usize = 4096;

pub struct TcpTransport {
    address: String,
    io_timeout: Duration,
    stream: Option<TcpStream>,
    /// Set by `connect`, cleared by `disconnect`. While set, a dropped link
    /// is reopened on the next query.
    linked: bool,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            io_timeout,
            stream: None,
            linked: false,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn open(&self) -> Result<TcpStream, HwError> {
        let addr = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| HwError::Transport(format!("cannot resolve '{}'", self.address)))?;
        let stream = TcpStream::connect_timeout(&addr, self.io_timeout).map_err(HwError::from_io)?;
        stream.set_read_timeout(Some(self.io_timeout))?;
        stream.set_write_timeout(Some(self.io_timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn exchange(&mut self, request: &str) -> Result<String, HwError> {
        if self.stream.is_none() && self.linked {
            self.stream = Some(self.open()?);
            tracing::info!(address = %self.address, "controller link reopened");
        }
        let stream = self.stream.as_mut().ok_or(HwError::NotConnected)?;
        stream
            .write_all(format!("{request}\r").as_bytes())
            .map_err(HwError::from_io)?;

        let mut reply = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = stream.read(&mut byte).map_err(HwError::from_io)?;
            if n == 0 {
                return Err(HwError::Transport("connection closed by controller".into()));
            }
            match byte[0] {
                PROMPT => break,
                REJECT => {
                    reply.push(REJECT);
                    break;
                }
                b => reply.push(b),
            }
            if reply.len() > MAX_REPLY {
                return Err(HwError::BadReply {
                    command: request.to_string(),
                    reply: String::from_utf8_lossy(&reply).into_owned(),
                });
            }
        }
        let text = String::from_utf8_lossy(&reply).trim().to_string();
        tracing::trace!(request, reply = %text, "dmc exchange");
        Ok(text)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<(), BoxError> {
        if self.stream.is_none() {
            self.stream = Some(self.open()?);
            tracing::debug!(address = %self.address, "controller link open");
        }
        self.linked = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), BoxError> {
        self.linked = false;
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both).map_err(HwError::from_io)?;
        }
        Ok(())
    }

    fn query(&mut self, request: &str) -> Result<String, BoxError> {
        let result = self.exchange(request);
        if result.is_err() {
            // a late or partial reply may still be in flight; never reuse the stream
            if let Some(stream) = self.stream.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
        Ok(result?)
    }

    fn is_alive(&mut self) -> bool {
        if self.stream.is_none() && self.linked {
            self.stream = self.open().ok();
        }
        self.stream
            .as_ref()
            .is_some_and(|s| s.peer_addr().is_ok())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
