//! MAC 地址与帧头
//!
//! 队列只读取帧头里的三个地址、是否为 QoS Data 以及 TID，其它字段不建模。

use std::fmt;

/// 48 位 MAC 地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Mac48Address(pub [u8; 6]);

impl Mac48Address {
    pub const BROADCAST: Mac48Address = Mac48Address([0xff; 6]);

    /// 用一个整数的低 48 位构造地址，便于按编号分配站点地址
    pub fn from_index(index: u64) -> Self {
        let b = index.to_be_bytes();
        Mac48Address([b[2], b[3], b[4], b[5], b[6], b[7]])
    }
}

impl fmt::Display for Mac48Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// 帧头中的地址角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    /// receiver
    Addr1,
    /// transmitter
    Addr2,
    /// BSSID / 第三方地址
    Addr3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiMacHeader {
    pub addr1: Mac48Address,
    pub addr2: Mac48Address,
    pub addr3: Mac48Address,
    /// QoS Data 帧的 TID；非 QoS 帧为 None
    pub qos_tid: Option<u8>,
}

impl WifiMacHeader {
    /// QoS Data 帧；TID 取低 4 位
    pub fn qos_data(addr1: Mac48Address, addr2: Mac48Address, addr3: Mac48Address, tid: u8) -> Self {
        Self {
            addr1,
            addr2,
            addr3,
            qos_tid: Some(tid & 0x0f),
        }
    }

    /// 非 QoS 帧（管理帧、普通 Data 帧）
    pub fn non_qos(addr1: Mac48Address, addr2: Mac48Address, addr3: Mac48Address) -> Self {
        Self {
            addr1,
            addr2,
            addr3,
            qos_tid: None,
        }
    }

    pub fn is_qos_data(&self) -> bool {
        self.qos_tid.is_some()
    }

    pub fn address(&self, ty: AddressType) -> Mac48Address {
        match ty {
            AddressType::Addr1 => self.addr1,
            AddressType::Addr2 => self.addr2,
            AddressType::Addr3 => self.addr3,
        }
    }
}
