//! Prometheus指标暴露
//!
//! 三个仪表盘对应最近一次读数，/metrics风格的HTTP端点在独立
//! 线程上应答，不参与采集循环。

use std::net::SocketAddr;
use std::thread;

use anyhow::Context;
use log::{error, info};
use prometheus::{Encoder, Gauge, Registry, TextEncoder};

use crate::sensor::bme280::PhysicalReading;

/// 传感器读数指标集
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    temperature: Gauge,
    pressure: Gauge,
    humidity: Gauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let temperature = Gauge::new("bme280_temperature_celsius", "BME280温度（摄氏度）")?;
        let pressure = Gauge::new("bme280_pressure_hpa", "BME280压力（百帕）")?;
        let humidity = Gauge::new("bme280_humidity_percent", "BME280相对湿度（%）")?;

        registry.register(Box::new(temperature.clone()))?;
        registry.register(Box::new(pressure.clone()))?;
        registry.register(Box::new(humidity.clone()))?;

        // OK
        Ok(Self {
            registry,
            temperature,
            pressure,
            humidity,
        })
    }

    /// 用最近一次读数更新三个仪表盘
    pub fn observe(&self, reading: &PhysicalReading) {
        self.temperature.set(reading.temperature as f64);
        self.pressure.set(reading.pressure as f64);
        self.humidity.set(reading.humidity as f64);
    }

    /// 在独立线程上启动指标HTTP服务
    ///
    /// 只有`/metrics`路径返回文本格式的全量指标，其余路径一律404。
    /// 返回实际绑定的地址，便于用端口0让系统自动分配。
    pub fn serve(&self, addr: &str) -> anyhow::Result<SocketAddr> {
        let server = tiny_http::Server::http(addr)
            .map_err(|err| anyhow::anyhow!("指标服务监听失败: {}", err))
            .with_context(|| format!("addr = {}", addr))?;
        let bound = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| anyhow::anyhow!("指标服务地址不是IP套接字"))?;
        info!("指标服务已启动: http://{}/metrics", bound);

        let registry = self.registry.clone();
        thread::spawn(move || {
            for request in server.incoming_requests() {
                if request.url() != "/metrics" {
                    if let Err(err) = request.respond(tiny_http::Response::empty(404)) {
                        error!("指标应答失败: {}", err);
                    }
                    continue;
                }
                let mut buf = Vec::new();
                let encoder = TextEncoder::new();
                if let Err(err) = encoder.encode(&registry.gather(), &mut buf) {
                    error!("指标编码失败: {}", err);
                    continue;
                }
                if let Err(err) = request.respond(tiny_http::Response::from_data(buf)) {
                    error!("指标应答失败: {}", err);
                }
            }
        });

        // OK
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpStream;

    use super::*;

    /// 对指定路径发一次HTTP/1.0 GET，返回响应状态行
    fn get_status_line(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {} HTTP/1.0\r\n\r\n", path).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response.lines().next().unwrap().to_string()
    }

    #[test]
    fn serve_answers_metrics_path_only() {
        let metrics = Metrics::new().unwrap();
        let addr = metrics.serve("127.0.0.1:0").unwrap();

        assert!(get_status_line(addr, "/metrics").contains("200"));
        assert!(get_status_line(addr, "/").contains("404"));
        assert!(get_status_line(addr, "/healthz").contains("404"));
    }

    #[test]
    fn observe_updates_gauges() {
        let metrics = Metrics::new().unwrap();
        metrics.observe(&PhysicalReading {
            temperature: 25.08,
            pressure: 1006.53,
            humidity: 46.44,
        });

        let families = metrics.registry.gather();
        assert_eq!(families.len(), 3);
        let temp = families
            .iter()
            .find(|f| f.get_name() == "bme280_temperature_celsius")
            .unwrap();
        let value = temp.get_metric()[0].get_gauge().get_value();
        assert!((value - 25.08).abs() < 1e-6);
    }
}
