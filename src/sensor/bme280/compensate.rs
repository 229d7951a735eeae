//! BME280定点补偿算法
//!
//! 按Bosch数据手册4.2.3节的参考实现逐位复刻。中间运算全部使用
//! 定点整数（温度/湿度32位，压力64位），移位次序和乘法顺序不可
//! 调整，否则最低有效位的舍入会偏离厂商算法。三个函数都是纯函
//! 数，不做任何I/O，也不会失败。
//!
//! 参考实现建立在C/Go的补码回绕语义之上：量程边缘的ADC值配上
//! 边缘校准参数时，中间乘加会越过32位范围再绕回来。这里用
//! `wrapping_*`显式写出同样的语义，任何输入都不会触发溢出检查。

use super::calibration::Calibration;

/// 温度补偿
///
/// 把20位原始温度ADC值换算成摄氏度，同时产生中间量t_fine。
/// t_fine必须在同一个采集周期内原样传给压力和湿度补偿，这是
/// 算法的硬性依赖顺序：温度先算，压力湿度后算。
///
/// 返回`(摄氏度, t_fine)`。温度定点值分辨率0.01℃，最后除以
/// 100.0得到浮点摄氏度。
pub fn temperature(adc_t: i32, calib: &Calibration) -> (f32, i32) {
    let dig_t1 = calib.dig_t1 as i32;
    let dig_t2 = calib.dig_t2 as i32;
    let dig_t3 = calib.dig_t3 as i32;

    let var1 = (adc_t >> 3).wrapping_sub(dig_t1 << 1).wrapping_mul(dig_t2) >> 11;
    let d = (adc_t >> 4).wrapping_sub(dig_t1);
    let var2 = ((d.wrapping_mul(d) >> 12).wrapping_mul(dig_t3)) >> 14;
    let t_fine = var1.wrapping_add(var2);

    // 定点值单位为0.01℃
    let t = t_fine.wrapping_mul(5).wrapping_add(128) >> 8;
    (t as f32 / 100.0, t_fine)
}

/// 压力补偿
///
/// 64位定点算法，把20位原始压力ADC值换算成百帕（hPa）。
/// 中间量的移位序列依赖64位范围，改用更窄的类型会溢出。
///
/// 边界情况：当分母var1恰好为0时返回0.0，这是算法定义的哨兵
/// 值（避免除零），不是错误。
pub fn pressure(adc_p: i32, calib: &Calibration, t_fine: i32) -> f32 {
    let dig_p1 = calib.dig_p1 as i64;
    let dig_p2 = calib.dig_p2 as i64;
    let dig_p3 = calib.dig_p3 as i64;
    let dig_p4 = calib.dig_p4 as i64;
    let dig_p5 = calib.dig_p5 as i64;
    let dig_p6 = calib.dig_p6 as i64;
    let dig_p7 = calib.dig_p7 as i64;
    let dig_p8 = calib.dig_p8 as i64;
    let dig_p9 = calib.dig_p9 as i64;

    let mut var1 = (t_fine as i64) - 128000;
    let mut var2 = var1.wrapping_mul(var1).wrapping_mul(dig_p6);
    var2 = var2.wrapping_add(var1.wrapping_mul(dig_p5) << 17);
    var2 = var2.wrapping_add(dig_p4 << 35);
    var1 = (var1.wrapping_mul(var1).wrapping_mul(dig_p3) >> 8)
        .wrapping_add(var1.wrapping_mul(dig_p2) << 12);
    var1 = (1_i64 << 47).wrapping_add(var1).wrapping_mul(dig_p1) >> 33;

    // 分母为0时返回哨兵值
    if var1 == 0 {
        return 0.0;
    }

    let mut p = 1048576 - (adc_p as i64);
    p = (p << 31).wrapping_sub(var2).wrapping_mul(3125) / var1;
    var1 = dig_p9.wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
    var2 = dig_p8.wrapping_mul(p) >> 19;
    p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add(dig_p7 << 4);

    // 定点值为Q24.8帕斯卡，再除以100换算成百帕
    p as f32 / 25600.0
}

/// 湿度补偿
///
/// 32位定点算法，把16位原始湿度ADC值换算成相对湿度百分比。
/// 中间值在最终缩放前钳位到[0, 419430400]，对应输出0%到100%，
/// 防止校准边缘输入产生超范围的百分比。
pub fn humidity(adc_h: i32, calib: &Calibration, t_fine: i32) -> f32 {
    let dig_h1 = calib.dig_h1 as i32;
    let dig_h2 = calib.dig_h2 as i32;
    let dig_h3 = calib.dig_h3 as i32;
    let dig_h4 = calib.dig_h4 as i32;
    let dig_h5 = calib.dig_h5 as i32;
    let dig_h6 = calib.dig_h6 as i32;

    let vx = t_fine.wrapping_sub(76800);

    // 分步展开数据手册的嵌套表达式，各步与参考实现逐位一致
    let var2 = (adc_h << 14)
        .wrapping_sub(dig_h4 << 20)
        .wrapping_sub(dig_h5.wrapping_mul(vx))
        .wrapping_add(16384)
        >> 15;
    let var3 = (vx.wrapping_mul(dig_h6) >> 10)
        .wrapping_mul((vx.wrapping_mul(dig_h3) >> 11).wrapping_add(32768))
        >> 10;
    let var4 = var3
        .wrapping_add(2097152)
        .wrapping_mul(dig_h2)
        .wrapping_add(8192)
        >> 14;
    let mut vx = var2.wrapping_mul(var4);
    vx = vx.wrapping_sub(((vx >> 15).wrapping_mul(vx >> 15) >> 7).wrapping_mul(dig_h1) >> 4);

    // 钳位到算法定义的输出范围
    vx = vx.clamp(0, 419430400);

    // Q22.10格式，右移12位后再除以1024得到百分比
    (vx >> 12) as f32 / 1024.0
}
