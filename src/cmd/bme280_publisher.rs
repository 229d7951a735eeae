use std::env;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use raspi_bme280::config::Config;
use raspi_bme280::metrics::Metrics;
use raspi_bme280::publish;
use raspi_bme280::sensor::bme280::Driver;
use raspi_bme280::wire;

/// 把配置里的总线编号换成rppal的总线枚举
fn spi_bus(bus: u8) -> anyhow::Result<Bus> {
    match bus {
        0 => Ok(Bus::Spi0),
        1 => Ok(Bus::Spi1),
        2 => Ok(Bus::Spi2),
        other => Err(anyhow::anyhow!("不支持的SPI总线编号: {}", other)),
    }
}

/// 把配置里的片选编号换成rppal的片选枚举
fn spi_slave_select(ss: u8) -> anyhow::Result<SlaveSelect> {
    match ss {
        0 => Ok(SlaveSelect::Ss0),
        1 => Ok(SlaveSelect::Ss1),
        2 => Ok(SlaveSelect::Ss2),
        other => Err(anyhow::anyhow!("不支持的SPI片选编号: {}", other)),
    }
}

/// BME280采集发布程序
///
/// 按固定间隔读取传感器，编码成20字节报文发布到消息后端，
/// 同时更新Prometheus指标。单次读取或发布失败只记录日志，
/// 等下一个周期再试，不做立即重试。
fn main() -> anyhow::Result<()> {
    env_logger::init();

    // 配置文件路径取第一个命令行参数，缺省为config.yaml
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.yaml".into());
    let config = Config::load(&config_path)?;
    info!("已加载配置: {}", config_path);

    // 打开SPI总线（模式0，速率由配置给定）
    let spi = Spi::new(
        spi_bus(config.spi.bus)?,
        spi_slave_select(config.spi.slave_select)?,
        config.spi.clock_hz,
        Mode::Mode0,
    )?;

    // 初始化传感器驱动
    let mut driver = Driver::initialize(spi)?;
    info!("BME280初始化完成");

    // 启动指标服务
    let metrics = Metrics::new()?;
    metrics.serve(&config.metrics.addr)?;

    // 创建消息发布端
    let mut publisher = publish::create_publisher(&config)?;
    info!("消息后端就绪: {}", config.backend);

    let interval = Duration::from_millis(config.publish.interval_ms);
    loop {
        thread::sleep(interval);

        // 读取传感器，失败则等下一个周期
        let reading = match driver.read() {
            Ok(reading) => reading,
            Err(err) => {
                error!("传感器读取失败: {}", err);
                continue;
            }
        };
        metrics.observe(&reading);

        // 编码并发布
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)?
            .as_secs_f64();
        let payload = wire::encode(&reading, timestamp);
        match publisher.publish(&payload) {
            Ok(()) => {
                debug!(
                    "已发布: 温度{:.2}℃ 压力{:.2}hPa 湿度{:.2}%",
                    reading.temperature, reading.pressure, reading.humidity
                );
            }
            Err(err) => {
                error!("消息发布失败: {}", err);
            }
        }
    }
}
