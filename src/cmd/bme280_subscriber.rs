use std::env;

use log::{error, info, warn};

use raspi_bme280::config::Config;
use raspi_bme280::publish;
use raspi_bme280::wire;

/// BME280读数订阅程序
///
/// 从消息后端阻塞接收20字节报文，解码后逐条打印。
/// 长度不对的报文记录警告后跳过，不会中断接收循环。
fn main() -> anyhow::Result<()> {
    env_logger::init();

    // 配置文件路径取第一个命令行参数，缺省为config.yaml
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.yaml".into());
    let config = Config::load(&config_path)?;

    let mut subscriber = publish::create_subscriber(&config)?;
    info!("订阅端已连接: {}", config.backend);

    loop {
        let payload = match subscriber.receive() {
            Ok(payload) => payload,
            Err(err) => {
                error!("接收失败: {}", err);
                continue;
            }
        };

        match wire::decode(&payload) {
            Ok(sample) => {
                println!(
                    "ts={:.3} 温度={:.2}℃ 压力={:.2}hPa 湿度={:.2}%",
                    sample.timestamp,
                    sample.reading.temperature,
                    sample.reading.pressure,
                    sample.reading.humidity
                );
            }
            Err(err) => {
                warn!("丢弃无效报文: {}", err);
            }
        }
    }
}
