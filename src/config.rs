//! 发布端YAML配置
//!
//! 所有字段都有默认值，配置文件里只需要写想覆盖的部分。

use std::fs;
use std::path::Path;

use serde::Deserialize;

/// 发布端配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 消息后端："nats"或"zmq"（zmq需要启用zmq-backend特性）
    pub backend: String,
    /// ZeroMQ后端配置
    pub zmq: ZmqConfig,
    /// NATS后端配置
    pub nats: NatsConfig,
    /// SPI总线配置
    pub spi: SpiConfig,
    /// 指标服务配置
    pub metrics: MetricsConfig,
    /// 发布节律配置
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZmqConfig {
    /// PUB套接字绑定地址
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// 服务器地址
    pub url: String,
    /// 发布主题
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpiConfig {
    /// SPI总线编号（0对应/dev/spidev0.x）
    pub bus: u8,
    /// 片选编号
    pub slave_select: u8,
    /// 时钟速率（Hz）
    pub clock_hz: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// HTTP监听地址
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// 采集发布间隔（毫秒）
    pub interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: "nats".into(),
            zmq: ZmqConfig::default(),
            nats: NatsConfig::default(),
            spi: SpiConfig::default(),
            metrics: MetricsConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl Default for ZmqConfig {
    fn default() -> Self {
        Self {
            endpoint: "tcp://127.0.0.1:5555".into(),
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".into(),
            subject: "bme280.readings".into(),
        }
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            slave_select: 0,
            clock_hz: 1_000_000,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9100".into(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl Config {
    /// 从YAML文件加载配置
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = serde_yaml::from_str(&text)?;
        // OK
        Ok(config)
    }
}
