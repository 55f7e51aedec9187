//! UDP 전송 계층 -- 리스너, 송신기, 리스너→파서 파이프라인

pub mod listener;
pub mod pipeline;
pub mod sender;

pub use listener::{ListenerStatus, SyslogUdpListener, UdpListenerConfig};
pub use pipeline::SyslogUdpPipeline;
pub use sender::SyslogUdpSender;
