//! BME280温度、压力、湿度传感器驱动（SPI接口）
//!
//! 初始化流程：读芯片ID校验 → 软复位并等待固定时间 → 加载校准
//! 参数 → 按固定顺序写三个配置寄存器。初始化成功后驱动进入可
//! 读状态，`read`每次完成一个8字节整块读取并做三路补偿换算。

mod calibration;
mod compensate;

pub use calibration::Calibration;

use std::fmt;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::bus::{RegisterBus, Transport, TransportError};

/// 芯片ID寄存器
const REG_ID: u8 = 0xD0;
/// 软复位寄存器
const REG_RESET: u8 = 0xE0;
/// 湿度采样配置寄存器
const REG_CTRL_HUM: u8 = 0xF2;
/// 温度/压力采样与工作模式配置寄存器
const REG_CTRL_MEAS: u8 = 0xF4;
/// 待机时间/滤波器配置寄存器
const REG_CONFIG: u8 = 0xF5;
/// 原始测量数据起始寄存器（0xF7-0xFE共8字节）
const REG_PRESS_MSB: u8 = 0xF7;

/// BME280的固定芯片ID
const CHIP_ID: u8 = 0x60;
/// 软复位命令字
const RESET_CMD: u8 = 0xB6;
/// 复位后的固定等待时间
///
/// 该芯片系列没有复位完成的查询接口，只能保守地固定等待，
/// 等待结束不代表收到了任何就绪信号
const RESET_SETTLE: Duration = Duration::from_millis(5);

/// 湿度采样x1
const CTRL_HUM_X1: u8 = 0x01;
/// 温度采样x1、压力采样x1、正常工作模式
const CTRL_MEAS_X1_NORMAL: u8 = 0x27;
/// 待机1000ms、滤波器关闭
const CONFIG_SB1000_NOFILTER: u8 = 0xA0;

/// 驱动错误
#[derive(Debug)]
pub enum Error {
    /// 总线交换失败
    Transport(TransportError),
    /// 芯片ID不匹配，初始化失败且不可重试
    UnexpectedChipId(u8),
    /// 初始化期间校准参数块读取失败
    Calibration(TransportError),
    /// 采集周期内整块读取失败，驱动实例仍然可用，
    /// 调用方可在下一个周期重试
    Read(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "总线通信失败: {}", err),
            Error::UnexpectedChipId(id) => write!(f, "芯片ID不匹配: 0x{:02X}", id),
            Error::Calibration(err) => write!(f, "校准参数读取失败: {}", err),
            Error::Read(err) => write!(f, "测量数据读取失败: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) | Error::Calibration(err) | Error::Read(err) => Some(err),
            Error::UnexpectedChipId(_) => None,
        }
    }
}

/// 一次测量的三个原始ADC值
///
/// 从0xF7起的8字节整块读取中解出，只在单个采集周期内有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// 20位原始压力值
    pub pressure: i32,
    /// 20位原始温度值
    pub temperature: i32,
    /// 16位原始湿度值
    pub humidity: i32,
}

impl RawSample {
    /// 从8字节突发读取结果解出三个原始值
    ///
    /// 压力和温度各占3字节，MSB在前，末字节只有高4位有效；
    /// 湿度占2字节，MSB在前。
    pub fn decode(data: &[u8; 8]) -> Self {
        Self {
            pressure: ((data[0] as i32) << 12) | ((data[1] as i32) << 4) | ((data[2] as i32) >> 4),
            temperature: ((data[3] as i32) << 12)
                | ((data[4] as i32) << 4)
                | ((data[5] as i32) >> 4),
            humidity: ((data[6] as i32) << 8) | (data[7] as i32),
        }
    }
}

/// 一次补偿换算后的物理读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalReading {
    /// 温度（℃）
    pub temperature: f32,
    /// 压力（hPa）
    pub pressure: f32,
    /// 相对湿度（%RH）
    pub humidity: f32,
}

/// BME280传感器驱动封装对象
///
/// 只有完整走完初始化流程才能构造出实例，所以实例一旦存在就
/// 处于可读状态。独占持有总线传输，`&mut self`保证同一时刻
/// 只有一个未完成的总线往返。
pub struct Driver<T: Transport> {
    /// 寄存器协议层
    bus: RegisterBus<T>,
    /// 校准参数，初始化时一次性填充，之后不再变化
    calib: Calibration,
}

impl<T: Transport> Driver<T> {
    /// 初始化传感器并构造驱动实例
    ///
    /// 初始化失败一律是致命的，不会返回半初始化的驱动。
    /// 配置寄存器的写入顺序固定：湿度采样寄存器必须先于
    /// 测量控制寄存器写入，否则湿度配置不会被芯片锁存。
    pub fn initialize(transport: T) -> Result<Self, Error> {
        let mut bus = RegisterBus::new(transport);

        // 校验芯片ID
        let id = bus.read_register(REG_ID).map_err(Error::Transport)?;
        if id != CHIP_ID {
            return Err(Error::UnexpectedChipId(id));
        }

        // 软复位后固定等待，芯片不提供就绪查询
        bus.write_register(REG_RESET, RESET_CMD)
            .map_err(Error::Transport)?;
        thread::sleep(RESET_SETTLE);

        // 加载校准参数
        let calib = Calibration::load(&mut bus).map_err(Error::Calibration)?;
        debug!("BME280校准参数: {:?}", calib);

        // 配置湿度采样x1（必须在ctrl_meas之前写入）
        bus.write_register(REG_CTRL_HUM, CTRL_HUM_X1)
            .map_err(Error::Transport)?;
        // 配置温度/压力采样x1，正常模式
        bus.write_register(REG_CTRL_MEAS, CTRL_MEAS_X1_NORMAL)
            .map_err(Error::Transport)?;
        // 配置待机1000ms，滤波器关闭
        bus.write_register(REG_CONFIG, CONFIG_SB1000_NOFILTER)
            .map_err(Error::Transport)?;

        // OK
        Ok(Self { bus, calib })
    }

    /// 读取一次补偿后的物理读数
    ///
    /// 一次8字节整块读取拿到三个原始ADC值，然后按固定顺序补偿：
    /// 先温度（产生t_fine），再用同一个t_fine算压力和湿度。
    /// 读取失败不影响驱动状态，下一个周期可以直接重试。
    pub fn read(&mut self) -> Result<PhysicalReading, Error> {
        let data = self
            .bus
            .read_block(REG_PRESS_MSB, 8)
            .map_err(Error::Read)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&data);
        let raw = RawSample::decode(&buf);

        // 温度必须先算，t_fine在本周期内传给压力和湿度补偿
        let (temperature, t_fine) = compensate::temperature(raw.temperature, &self.calib);
        let pressure = compensate::pressure(raw.pressure, &self.calib, t_fine);
        let humidity = compensate::humidity(raw.humidity, &self.calib, t_fine);

        // OK
        Ok(PhysicalReading {
            temperature,
            pressure,
            humidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// 模拟一颗完整的BME280：寄存器空间加SPI读写协议
    struct SimChip {
        regs: [u8; 256],
        /// 为真时所有交换直接失败
        fail: bool,
    }

    impl SimChip {
        /// 预置芯片ID、数据手册算例的校准参数和一组原始测量值
        fn new() -> Self {
            let mut regs = [0u8; 256];
            regs[REG_ID as usize] = CHIP_ID;

            // 0x88起26字节：数据手册算例的温度/压力校准参数
            let block_tp: [u8; 26] = [
                112, 107, 67, 103, 24, 252, 125, 142, 67, 214, 208, 11, 39, 11, 140, 0, 249, 255,
                140, 60, 248, 198, 112, 23, 0, 75,
            ];
            regs[0x88..0x88 + 26].copy_from_slice(&block_tp);

            // 0xE1起7字节：湿度校准参数（dig_h4=336, dig_h5=4）
            let block_h: [u8; 7] = [97, 1, 0, 0x15, 0x40, 0x00, 30];
            regs[0xE1..0xE1 + 7].copy_from_slice(&block_h);

            // 0xF7起8字节：adc_p=415148, adc_t=519888, adc_h=30000
            let raw: [u8; 8] = [101, 90, 192, 126, 237, 0, 117, 48];
            regs[0xF7..0xF7 + 8].copy_from_slice(&raw);

            Self { regs, fail: false }
        }
    }

    impl Transport for SimChip {
        fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>, TransportError> {
            if self.fail {
                return Err(TransportError::new(io::Error::new(
                    io::ErrorKind::Other,
                    "bus wedged",
                )));
            }
            let mut rx = vec![0u8; tx.len()];
            if tx[0] & 0x80 != 0 {
                // 读操作：去掉读标志后地址自增返回寄存器内容。
                // BME280的寄存器地址本身都在0x80以上，需要补回最高位
                let base = ((tx[0] & 0x7F) | 0x80) as usize;
                for i in 1..tx.len() {
                    rx[i] = self.regs[(base + i - 1) & 0xFF];
                }
            } else {
                // 写操作
                self.regs[(tx[0] | 0x80) as usize] = tx[1];
            }
            Ok(rx)
        }
    }

    #[test]
    fn raw_sample_decode_unpacks_bit_fields() {
        let raw = RawSample::decode(&[101, 90, 192, 126, 237, 0, 117, 48]);
        assert_eq!(raw.pressure, 415148);
        assert_eq!(raw.temperature, 519888);
        assert_eq!(raw.humidity, 30000);
    }

    #[test]
    fn initialize_configures_sensor() {
        let mut driver = Driver::initialize(SimChip::new()).unwrap();
        // 初始化写入的三个配置寄存器应落在模拟芯片里
        assert_eq!(driver.bus.read_register(REG_CTRL_HUM).unwrap(), 0x01);
        assert_eq!(driver.bus.read_register(REG_CTRL_MEAS).unwrap(), 0x27);
        assert_eq!(driver.bus.read_register(REG_CONFIG).unwrap(), 0xA0);
        // 校准参数整组填充
        assert_eq!(driver.calib.dig_t1, 27504);
        assert_eq!(driver.calib.dig_h4, 336);
        assert_eq!(driver.calib.dig_h5, 4);
    }

    #[test]
    fn initialize_rejects_unexpected_chip_id() {
        let mut chip = SimChip::new();
        chip.regs[REG_ID as usize] = 0x58;
        match Driver::initialize(chip) {
            Err(Error::UnexpectedChipId(id)) => assert_eq!(id, 0x58),
            other => panic!("期望芯片ID错误，实际: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn initialize_fails_on_dead_bus() {
        let mut chip = SimChip::new();
        chip.fail = true;
        assert!(matches!(Driver::initialize(chip), Err(Error::Transport(_))));
    }

    #[test]
    fn read_reproduces_datasheet_example() {
        let mut driver = Driver::initialize(SimChip::new()).unwrap();
        let reading = driver.read().unwrap();
        assert!((reading.temperature - 25.08).abs() < 0.005);
        assert!((reading.pressure - 1006.5325).abs() < 0.01);
        assert_eq!(reading.humidity, 46.4384765625);
    }

    #[test]
    fn read_failure_leaves_driver_usable() {
        let mut driver = Driver::initialize(SimChip::new()).unwrap();
        driver.bus = RegisterBus::new({
            let mut chip = SimChip::new();
            chip.fail = true;
            chip
        });
        assert!(matches!(driver.read(), Err(Error::Read(_))));

        // 总线恢复后同一个驱动实例可以继续读
        driver.bus = RegisterBus::new(SimChip::new());
        assert!(driver.read().is_ok());
    }
}
