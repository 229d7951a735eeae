use std::fmt;

/// 读标志位：寄存器地址的第7位置1表示读操作，置0表示写操作
///
/// BME280的SPI协议中寄存器地址只占低7位，最高位用作读写标记
const READ_FLAG: u8 = 0x80;

/// 总线传输错误
///
/// 表示一次全双工交换未能完成，内部保留底层I/O错误作为原因。
/// 本库内部不做重试，错误直接向上传播，由调用方决定下一个
/// 采集周期是否重试。
#[derive(Debug)]
pub struct TransportError {
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "总线交换失败: {}", self.source)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// 总线传输能力抽象
///
/// 一次全双工交换：发送`tx`的同时接收等长的响应字节序列，
/// 响应的第i个字节与请求的第i个字节在总线上同时钟对齐。
/// BME280的半双工命令/响应协议就是按这个约定叠加在全双工
/// 通道上实现的。
pub trait Transport {
    /// 执行一次全双工交换，返回与`tx`等长的响应
    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// 树莓派硬件SPI实现
///
/// 设备选择、时钟速率、工作模式等由调用方在创建`Spi`时配置，
/// 驱动核心只依赖交换原语本身。
impl Transport for rppal::spi::Spi {
    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>, TransportError> {
        // 接收缓冲区与发送缓冲区等长
        let mut rx = vec![0u8; tx.len()];
        self.transfer(&mut rx, tx).map_err(TransportError::new)?;
        // OK
        Ok(rx)
    }
}

/// 寄存器协议层
///
/// 在总线传输之上提供单寄存器读、单寄存器写和多字节连续读，
/// 每个操作都对应一次总线交换。
pub struct RegisterBus<T: Transport> {
    transport: T,
}

impl<T: Transport> RegisterBus<T> {
    /// 创建寄存器协议实例，独占持有底层传输
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// 读取单个寄存器
    ///
    /// 发送2字节请求：第1字节为地址加读标志，第2字节为占位0x00；
    /// 芯片在第2个字节的时钟上送出寄存器值。
    pub fn read_register(&mut self, reg: u8) -> Result<u8, TransportError> {
        let rx = self.transport.exchange(&[reg | READ_FLAG, 0x00])?;
        // OK
        Ok(rx[1])
    }

    /// 写入单个寄存器
    ///
    /// 发送2字节请求：第1字节为地址（读标志清零），第2字节为值；
    /// 响应内容无意义，直接丢弃。
    pub fn write_register(&mut self, reg: u8, value: u8) -> Result<(), TransportError> {
        self.transport.exchange(&[reg & !READ_FLAG, value])?;
        // OK
        Ok(())
    }

    /// 从`reg`起连续读取`len`个寄存器字节
    ///
    /// 芯片地址自增，一次交换完成整块读取；响应的第1个字节是
    /// 地址回显，丢弃后返回其余`len`个字节。
    pub fn read_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, TransportError> {
        // 请求长度为len+1：1字节地址 + len字节占位
        let mut tx = vec![0u8; len + 1];
        tx[0] = reg | READ_FLAG;
        let mut rx = self.transport.exchange(&tx)?;
        rx.remove(0);
        // OK
        Ok(rx)
    }
}
