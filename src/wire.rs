//! 20字节二进制报文编解码
//!
//! 发布端和订阅端必须对这个格式逐位一致。布局（大端序）：
//! - 第0-7字节: f64，Unix时间戳（秒，小数部分为亚秒）
//! - 第8-11字节: f32，温度（℃）
//! - 第12-15字节: f32，压力（hPa）
//! - 第16-19字节: f32，相对湿度（%）

use std::fmt;

use crate::sensor::bme280::PhysicalReading;

/// 报文固定长度
pub const PAYLOAD_LEN: usize = 20;

/// 解码失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// 报文长度不是20字节
    Length(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Length(len) => write!(f, "报文长度无效: {}字节（期望20）", len),
        }
    }
}

impl std::error::Error for DecodeError {}

/// 一条带时间戳的样本
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Unix时间戳（秒）
    pub timestamp: f64,
    /// 物理读数
    pub reading: PhysicalReading,
}

/// 把一条物理读数和时间戳编码成20字节报文
pub fn encode(reading: &PhysicalReading, timestamp: f64) -> [u8; PAYLOAD_LEN] {
    let mut buf = [0u8; PAYLOAD_LEN];
    buf[0..8].copy_from_slice(&timestamp.to_be_bytes());
    buf[8..12].copy_from_slice(&reading.temperature.to_be_bytes());
    buf[12..16].copy_from_slice(&reading.pressure.to_be_bytes());
    buf[16..20].copy_from_slice(&reading.humidity.to_be_bytes());
    buf
}

/// 解码一条20字节报文
///
/// 长度不等于20字节的输入一律拒绝，不会越界读取。
pub fn decode(buf: &[u8]) -> Result<Sample, DecodeError> {
    if buf.len() != PAYLOAD_LEN {
        return Err(DecodeError::Length(buf.len()));
    }

    let timestamp = f64::from_be_bytes(buf[0..8].try_into().unwrap());
    let temperature = f32::from_be_bytes(buf[8..12].try_into().unwrap());
    let pressure = f32::from_be_bytes(buf[12..16].try_into().unwrap());
    let humidity = f32::from_be_bytes(buf[16..20].try_into().unwrap());

    // OK
    Ok(Sample {
        timestamp,
        reading: PhysicalReading {
            temperature,
            pressure,
            humidity,
        },
    })
}
