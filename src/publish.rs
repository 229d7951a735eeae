//! 可插拔的消息发布后端
//!
//! 核心驱动对下游传输一无所知，这里只约定"发布一段字节"和
//! "阻塞接收一段字节"两种能力，由配置选择具体后端。

use anyhow::Context;

use crate::config::Config;

/// 发布一段字节的能力
pub trait Publisher {
    fn publish(&mut self, payload: &[u8]) -> anyhow::Result<()>;
}

/// 阻塞接收一段字节的能力
pub trait Subscriber {
    fn receive(&mut self) -> anyhow::Result<Vec<u8>>;
}

/// 根据配置构造发布端
pub fn create_publisher(config: &Config) -> anyhow::Result<Box<dyn Publisher>> {
    match config.backend.as_str() {
        "nats" => Ok(Box::new(NatsPublisher::connect(
            &config.nats.url,
            &config.nats.subject,
        )?)),
        #[cfg(feature = "zmq-backend")]
        "zmq" => Ok(Box::new(ZmqPublisher::bind(&config.zmq.endpoint)?)),
        other => Err(anyhow::anyhow!("未知的消息后端: {}", other)),
    }
}

/// 根据配置构造订阅端
pub fn create_subscriber(config: &Config) -> anyhow::Result<Box<dyn Subscriber>> {
    match config.backend.as_str() {
        "nats" => Ok(Box::new(NatsSubscriber::connect(
            &config.nats.url,
            &config.nats.subject,
        )?)),
        #[cfg(feature = "zmq-backend")]
        "zmq" => Ok(Box::new(ZmqSubscriber::connect(&config.zmq.endpoint)?)),
        other => Err(anyhow::anyhow!("未知的消息后端: {}", other)),
    }
}

/// NATS发布端
pub struct NatsPublisher {
    conn: nats::Connection,
    subject: String,
}

impl NatsPublisher {
    pub fn connect(url: &str, subject: &str) -> anyhow::Result<Self> {
        let conn = nats::connect(url).with_context(|| format!("连接NATS失败: {}", url))?;
        // OK
        Ok(Self {
            conn,
            subject: subject.to_string(),
        })
    }
}

impl Publisher for NatsPublisher {
    fn publish(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        self.conn.publish(&self.subject, payload)?;
        Ok(())
    }
}

/// NATS订阅端
pub struct NatsSubscriber {
    // 订阅依赖连接存活，连接句柄必须一起持有
    _conn: nats::Connection,
    sub: nats::Subscription,
}

impl NatsSubscriber {
    pub fn connect(url: &str, subject: &str) -> anyhow::Result<Self> {
        let conn = nats::connect(url).with_context(|| format!("连接NATS失败: {}", url))?;
        let sub = conn.subscribe(subject)?;
        // OK
        Ok(Self { _conn: conn, sub })
    }
}

impl Subscriber for NatsSubscriber {
    fn receive(&mut self) -> anyhow::Result<Vec<u8>> {
        let msg = self
            .sub
            .next()
            .ok_or_else(|| anyhow::anyhow!("NATS订阅已关闭"))?;
        Ok(msg.data)
    }
}

/// ZeroMQ PUB发布端
#[cfg(feature = "zmq-backend")]
pub struct ZmqPublisher {
    // Context随socket一起保活
    _context: zmq::Context,
    socket: zmq::Socket,
}

#[cfg(feature = "zmq-backend")]
impl ZmqPublisher {
    pub fn bind(endpoint: &str) -> anyhow::Result<Self> {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::PUB)?;
        socket
            .bind(endpoint)
            .with_context(|| format!("绑定ZeroMQ端点失败: {}", endpoint))?;
        // OK
        Ok(Self {
            _context: context,
            socket,
        })
    }
}

#[cfg(feature = "zmq-backend")]
impl Publisher for ZmqPublisher {
    fn publish(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        self.socket.send(payload, 0)?;
        Ok(())
    }
}

/// ZeroMQ SUB订阅端
#[cfg(feature = "zmq-backend")]
pub struct ZmqSubscriber {
    _context: zmq::Context,
    socket: zmq::Socket,
}

#[cfg(feature = "zmq-backend")]
impl ZmqSubscriber {
    pub fn connect(endpoint: &str) -> anyhow::Result<Self> {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::SUB)?;
        socket
            .connect(endpoint)
            .with_context(|| format!("连接ZeroMQ端点失败: {}", endpoint))?;
        // 订阅全部消息
        socket.set_subscribe(b"")?;
        // OK
        Ok(Self {
            _context: context,
            socket,
        })
    }
}

#[cfg(feature = "zmq-backend")]
impl Subscriber for ZmqSubscriber {
    fn receive(&mut self) -> anyhow::Result<Vec<u8>> {
        Ok(self.socket.recv_bytes(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_is_rejected() {
        let config = Config {
            backend: "carrier-pigeon".into(),
            ..Config::default()
        };
        assert!(create_publisher(&config).is_err());
        assert!(create_subscriber(&config).is_err());
    }
}
