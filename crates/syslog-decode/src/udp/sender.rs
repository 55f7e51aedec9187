//! UDP syslog 송신기
//!
//! 고정 대상 주소로 원문 텍스트나 RFC 5424로 직렬화한 메시지를 보냅니다.
//! 응답을 기다리지 않는 fire-and-forget 송신입니다.

use std::net::{SocketAddr, UdpSocket};

use metrics::Counter;
use syslog_decode_core::metrics as m;
use tracing::debug;

use crate::error::SyslogPipelineError;
use crate::model::ParsedMessage;
use crate::serializer;

/// UDP syslog 송신기
pub struct SyslogUdpSender {
    socket: UdpSocket,
    target: SocketAddr,
    sent: Counter,
    errors: Counter,
}

impl SyslogUdpSender {
    /// 대상 주소와 같은 주소 체계의 임시 포트에 바인드합니다.
    pub fn new(target: &str) -> Result<Self, SyslogPipelineError> {
        let sender_err = |reason: String| SyslogPipelineError::Sender {
            target: target.to_owned(),
            reason,
        };
        let target: SocketAddr = target
            .parse()
            .map_err(|e| sender_err(format!("invalid target address: {e}")))?;
        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).map_err(|e| sender_err(format!("bind: {e}")))?;
        debug!(target = %target, local = ?socket.local_addr().ok(), "syslog UDP sender ready");

        Ok(Self {
            socket,
            target,
            sent: metrics::counter!(m::SENDER_PACKETS_SENT_TOTAL),
            errors: metrics::counter!(m::SENDER_ERRORS_TOTAL),
        })
    }

    /// 텍스트를 그대로 한 데이터그램으로 보냅니다.
    pub fn send_text(&self, text: &str) -> Result<(), SyslogPipelineError> {
        match self.socket.send_to(text.as_bytes(), self.target) {
            Ok(_) => {
                self.sent.increment(1);
                Ok(())
            }
            Err(e) => {
                self.errors.increment(1);
                Err(SyslogPipelineError::Sender {
                    target: self.target.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// 메시지를 RFC 5424로 직렬화해 보냅니다.
    pub fn send_message(&self, message: &ParsedMessage) -> Result<(), SyslogPipelineError> {
        self.send_text(&serializer::serialize(message))
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SyslogPipelineError> {
        Ok(self.socket.local_addr()?)
    }
}

impl std::fmt::Debug for SyslogUdpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogUdpSender")
            .field("target", &self.target)
            .field("local", &self.socket.local_addr().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Facility, Severity};
    use std::time::Duration;

    fn receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        socket
    }

    fn recv_text(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 2048];
        let (len, _) = socket.recv_from(&mut buf).unwrap();
        String::from_utf8(buf[..len].to_vec()).unwrap()
    }

    #[test]
    fn sends_text_and_messages() {
        let rx = receiver();
        let sender = SyslogUdpSender::new(&rx.local_addr().unwrap().to_string()).unwrap();
        assert_eq!(sender.target(), rx.local_addr().unwrap());

        sender.send_text("<13>raw text").unwrap();
        assert_eq!(recv_text(&rx), "<13>raw text");

        let msg = ParsedMessage::rfc5424(Facility::Auth, Severity::Critical)
            .with_host_name("host")
            .with_message("hi");
        sender.send_message(&msg).unwrap();
        assert_eq!(recv_text(&rx), "<34>1 - host - - - - hi");
    }

    #[test]
    fn rejects_invalid_target() {
        let err = SyslogUdpSender::new("nowhere").unwrap_err();
        assert!(matches!(err, SyslogPipelineError::Sender { .. }));
    }
}
