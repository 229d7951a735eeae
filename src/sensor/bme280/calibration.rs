use crate::bus::{RegisterBus, Transport, TransportError};

/// 温度/压力校准参数块基地址（26字节，0x88-0xA1）
const REG_CALIB_TP: u8 = 0x88;
/// 湿度校准参数块基地址（7字节，0xE1-0xE7）
const REG_CALIB_H: u8 = 0xE1;

/// 温度/压力校准参数块长度
const CALIB_TP_LEN: usize = 26;
/// 湿度校准参数块长度
const CALIB_H_LEN: usize = 7;

/// BME280传感器校准参数
///
/// 出厂时烧录在芯片NVM中的逐件校准系数，复位后一次性读出，
/// 在驱动实例的整个生命周期内不再变化。要么整组填充成功，
/// 要么加载失败，不存在部分填充的状态。
///
/// # 存储分布
/// - 温度参数: 0x88-0x8D，1个无符号 + 2个有符号16位字（小端序）
/// - 压力参数: 0x8E-0x9F，1个无符号 + 8个有符号16位字（小端序）
/// - 湿度参数: 0xA1（dig_h1）+ 0xE1-0xE7（dig_h2~dig_h6）
///
/// 湿度参数dig_h4/dig_h5是非标准的12位打包格式，两个值共享
/// 0xE5的高低半字节，解码逻辑见[`Calibration::decode`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    /// 温度校准系数1（u16，0x88-0x89）
    pub dig_t1: u16,
    /// 温度校准系数2（i16，0x8A-0x8B）
    pub dig_t2: i16,
    /// 温度校准系数3（i16，0x8C-0x8D）
    pub dig_t3: i16,

    /// 压力校准系数1（u16，0x8E-0x8F）
    pub dig_p1: u16,
    /// 压力校准系数2（i16，0x90-0x91）
    pub dig_p2: i16,
    /// 压力校准系数3（i16，0x92-0x93）
    pub dig_p3: i16,
    /// 压力校准系数4（i16，0x94-0x95）
    pub dig_p4: i16,
    /// 压力校准系数5（i16，0x96-0x97）
    pub dig_p5: i16,
    /// 压力校准系数6（i16，0x98-0x99）
    pub dig_p6: i16,
    /// 压力校准系数7（i16，0x9A-0x9B）
    pub dig_p7: i16,
    /// 压力校准系数8（i16，0x9C-0x9D）
    pub dig_p8: i16,
    /// 压力校准系数9（i16，0x9E-0x9F）
    pub dig_p9: i16,

    /// 湿度校准系数1（u8，0xA1，即26字节块的最后一个字节）
    pub dig_h1: u8,
    /// 湿度校准系数2（i16，0xE1-0xE2，小端序）
    pub dig_h2: i16,
    /// 湿度校准系数3（u8，0xE3）
    pub dig_h3: u8,
    /// 湿度校准系数4（12位打包：0xE4整字节为高8位，0xE5低半字节为低4位）
    pub dig_h4: i16,
    /// 湿度校准系数5（12位打包：0xE6整字节为高8位，0xE5高半字节为低4位）
    pub dig_h5: i16,
    /// 湿度校准系数6（i8，0xE7）
    pub dig_h6: i8,
}

impl Calibration {
    /// 通过寄存器协议加载校准参数
    ///
    /// 两次整块读取（26字节 + 7字节），任何一次失败则整体失败，
    /// 不会留下半填充的参数组。
    pub fn load<T: Transport>(bus: &mut RegisterBus<T>) -> Result<Self, TransportError> {
        let mut block_tp = [0u8; CALIB_TP_LEN];
        block_tp.copy_from_slice(&bus.read_block(REG_CALIB_TP, CALIB_TP_LEN)?);
        let mut block_h = [0u8; CALIB_H_LEN];
        block_h.copy_from_slice(&bus.read_block(REG_CALIB_H, CALIB_H_LEN)?);
        // OK
        Ok(Self::decode(&block_tp, &block_h))
    }

    /// 从两个原始字节块解码校准参数
    ///
    /// 纯函数，便于对位打包规则做独立测试。`block_tp`为0x88起的
    /// 26字节，`block_h`为0xE1起的7字节，长度由类型保证。
    pub fn decode(block_tp: &[u8; CALIB_TP_LEN], block_h: &[u8; CALIB_H_LEN]) -> Self {
        Self {
            // 温度参数：第1个字无符号，其余有符号（小端序）
            dig_t1: u16::from_le_bytes([block_tp[0], block_tp[1]]),
            dig_t2: i16::from_le_bytes([block_tp[2], block_tp[3]]),
            dig_t3: i16::from_le_bytes([block_tp[4], block_tp[5]]),

            // 压力参数：第1个字无符号，其余有符号（小端序）
            dig_p1: u16::from_le_bytes([block_tp[6], block_tp[7]]),
            dig_p2: i16::from_le_bytes([block_tp[8], block_tp[9]]),
            dig_p3: i16::from_le_bytes([block_tp[10], block_tp[11]]),
            dig_p4: i16::from_le_bytes([block_tp[12], block_tp[13]]),
            dig_p5: i16::from_le_bytes([block_tp[14], block_tp[15]]),
            dig_p6: i16::from_le_bytes([block_tp[16], block_tp[17]]),
            dig_p7: i16::from_le_bytes([block_tp[18], block_tp[19]]),
            dig_p8: i16::from_le_bytes([block_tp[20], block_tp[21]]),
            dig_p9: i16::from_le_bytes([block_tp[22], block_tp[23]]),

            // dig_h1藏在第一个块的第26个字节（0xA1），0xA0是保留字节
            dig_h1: block_tp[25],
            dig_h2: i16::from_le_bytes([block_h[0], block_h[1]]),
            dig_h3: block_h[2],
            // 12位打包：dig_h4占0xE4全字节和0xE5低半字节
            dig_h4: ((block_h[3] as i16) << 4) | ((block_h[4] & 0x0F) as i16),
            // 12位打包：dig_h5占0xE6全字节和0xE5高半字节
            dig_h5: ((block_h[5] as i16) << 4) | ((block_h[4] >> 4) as i16),
            dig_h6: block_h[6] as i8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bosch数据手册算例的校准参数按小端序编码成的26字节块
    const BLOCK_TP: [u8; 26] = [
        112, 107, // dig_t1 = 27504
        67, 103, // dig_t2 = 26435
        24, 252, // dig_t3 = -1000
        125, 142, // dig_p1 = 36477
        67, 214, // dig_p2 = -10685
        208, 11, // dig_p3 = 3024
        39, 11, // dig_p4 = 2855
        140, 0, // dig_p5 = 140
        249, 255, // dig_p6 = -7
        140, 60, // dig_p7 = 15500
        248, 198, // dig_p8 = -14600
        112, 23, // dig_p9 = 6000
        0,  // 0xA0 保留字节
        75, // dig_h1 = 75
    ];

    /// 配套的7字节湿度校准块
    const BLOCK_H: [u8; 7] = [
        97, 1,    // dig_h2 = 353
        0,    // dig_h3 = 0
        0x15, // dig_h4 高8位
        0x40, // 低半字节归dig_h4，高半字节归dig_h5
        0x00, // dig_h5 高8位
        30,   // dig_h6 = 30
    ];

    #[test]
    fn decode_reconstructs_every_coefficient() {
        let calib = Calibration::decode(&BLOCK_TP, &BLOCK_H);
        assert_eq!(calib.dig_t1, 27504);
        assert_eq!(calib.dig_t2, 26435);
        assert_eq!(calib.dig_t3, -1000);
        assert_eq!(calib.dig_p1, 36477);
        assert_eq!(calib.dig_p2, -10685);
        assert_eq!(calib.dig_p3, 3024);
        assert_eq!(calib.dig_p4, 2855);
        assert_eq!(calib.dig_p5, 140);
        assert_eq!(calib.dig_p6, -7);
        assert_eq!(calib.dig_p7, 15500);
        assert_eq!(calib.dig_p8, -14600);
        assert_eq!(calib.dig_p9, 6000);
        assert_eq!(calib.dig_h1, 75);
        assert_eq!(calib.dig_h2, 353);
        assert_eq!(calib.dig_h3, 0);
        // 0x15 << 4 | (0x40 & 0x0F) = 336
        assert_eq!(calib.dig_h4, 336);
        // 0x00 << 4 | (0x40 >> 4) = 4
        assert_eq!(calib.dig_h5, 4);
        assert_eq!(calib.dig_h6, 30);
    }

    #[test]
    fn all_ff_humidity_block_decodes_to_known_values() {
        let calib = Calibration::decode(&BLOCK_TP, &[0xFF; 7]);
        assert_eq!(calib.dig_h2, -1);
        assert_eq!(calib.dig_h3, 255);
        // 打包格式里字节不做12位符号扩展，0xFF全置只能得到4095
        assert_eq!(calib.dig_h4, 4095);
        assert_eq!(calib.dig_h5, 4095);
        assert_eq!(calib.dig_h6, -1);
    }
}
