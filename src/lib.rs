//! 树莓派 BME280 环境传感器采集与发布库
//!
//! - `bus`: SPI总线传输抽象与寄存器协议
//! - `sensor`: BME280传感器驱动（校准、补偿、读取）
//! - `wire`: 20字节二进制报文编解码
//! - `config` / `publish` / `metrics`: 发布端外围组件

pub mod bus;
pub mod config;
pub mod metrics;
pub mod publish;
pub mod sensor;
pub mod wire;
