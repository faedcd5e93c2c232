//! 内存抽象层
//!
//! `Memory` trait 定义按字节/半字/字访问的统一接口，
//! `FlatMemory` 是一段带基地址偏移的线性内存。
//!
//! 所有访问都做边界检查；不检查对齐，未对齐访问按小端序逐字节拼接。

use thiserror::Error;

/// 访存粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSize {
    Byte,
    Half,
    Word,
}

impl AccessSize {
    pub fn bytes(self) -> usize {
        match self {
            AccessSize::Byte => 1,
            AccessSize::Half => 2,
            AccessSize::Word => 4,
        }
    }
}

/// 内存访问错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemError {
    /// 访问范围落在 `[base, base + size)` 之外
    #[error(
        "out-of-bounds {access:?} access at 0x{addr:08x} (region=0x{base:08x}..0x{end:08x})",
        end = region_end(.base, .size)
    )]
    OutOfBounds {
        addr: u32,
        access: AccessSize,
        base: u32,
        size: usize,
    },
}

fn region_end(base: &u32, size: &usize) -> u32 {
    base.wrapping_add(*size as u32)
}

pub type MemResult<T> = Result<T, MemError>;

/// 内存访问的统一接口（小端序）
pub trait Memory {
    fn load8(&self, addr: u32) -> MemResult<u8>;

    fn load16(&self, addr: u32) -> MemResult<u16>;

    fn load32(&self, addr: u32) -> MemResult<u32>;

    fn store8(&mut self, addr: u32, value: u8) -> MemResult<()>;

    fn store16(&mut self, addr: u32, value: u16) -> MemResult<()>;

    fn store32(&mut self, addr: u32, value: u32) -> MemResult<()>;
}

/// 简单线性内存
///
/// 架构地址 `addr` 对应 `data[addr - base_addr]`。
#[derive(Clone)]
pub struct FlatMemory {
    data: Vec<u8>,
    base_addr: u32,
}

impl FlatMemory {
    /// 创建一个指定大小、全零的内存区域
    ///
    /// # 示例
    ///
    /// ```
    /// use rv32i_sim::memory::FlatMemory;
    ///
    /// let mem = FlatMemory::new(64 * 1024, 0x1000);
    /// assert_eq!(mem.base_addr(), 0x1000);
    /// assert_eq!(mem.size(), 64 * 1024);
    /// ```
    pub fn new(size: usize, base_addr: u32) -> Self {
        FlatMemory {
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn base_addr(&self) -> u32 {
        self.base_addr
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// `[addr, addr + len)` 是否完全落在内存区域内
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        self.translate(addr, len).is_some()
    }

    fn translate(&self, addr: u32, len: usize) -> Option<usize> {
        let offset = addr.checked_sub(self.base_addr)? as usize;
        let end = offset.checked_add(len)?;
        (end <= self.data.len()).then_some(offset)
    }

    fn bounds_check(&self, addr: u32, len: usize, access: AccessSize) -> MemResult<usize> {
        self.translate(addr, len).ok_or(MemError::OutOfBounds {
            addr,
            access,
            base: self.base_addr,
            size: self.data.len(),
        })
    }

    fn read_array<const N: usize>(&self, addr: u32, access: AccessSize) -> MemResult<[u8; N]> {
        let idx = self.bounds_check(addr, N, access)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[idx..idx + N]);
        Ok(bytes)
    }

    fn write_array<const N: usize>(
        &mut self,
        addr: u32,
        bytes: [u8; N],
        access: AccessSize,
    ) -> MemResult<()> {
        let idx = self.bounds_check(addr, N, access)?;
        self.data[idx..idx + N].copy_from_slice(&bytes);
        Ok(())
    }

    /// 批量写入数据
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> MemResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let start = self.bounds_check(addr, data.len(), AccessSize::Byte)?;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// 批量读取数据，返回副本
    pub fn read_bytes(&self, addr: u32, len: usize) -> MemResult<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let start = self.bounds_check(addr, len, AccessSize::Byte)?;
        Ok(self.data[start..start + len].to_vec())
    }

    /// 将指定范围填充为固定字节
    pub fn fill(&mut self, addr: u32, len: usize, value: u8) -> MemResult<()> {
        if len == 0 {
            return Ok(());
        }
        let start = self.bounds_check(addr, len, AccessSize::Byte)?;
        self.data[start..start + len].fill(value);
        Ok(())
    }
}

impl Memory for FlatMemory {
    fn load8(&self, addr: u32) -> MemResult<u8> {
        let [b] = self.read_array(addr, AccessSize::Byte)?;
        Ok(b)
    }

    fn load16(&self, addr: u32) -> MemResult<u16> {
        self.read_array(addr, AccessSize::Half).map(u16::from_le_bytes)
    }

    fn load32(&self, addr: u32) -> MemResult<u32> {
        self.read_array(addr, AccessSize::Word).map(u32::from_le_bytes)
    }

    fn store8(&mut self, addr: u32, value: u8) -> MemResult<()> {
        self.write_array(addr, [value], AccessSize::Byte)
    }

    fn store16(&mut self, addr: u32, value: u16) -> MemResult<()> {
        self.write_array(addr, value.to_le_bytes(), AccessSize::Half)
    }

    fn store32(&mut self, addr: u32, value: u32) -> MemResult<()> {
        self.write_array(addr, value.to_le_bytes(), AccessSize::Word)
    }
}

impl std::fmt::Debug for FlatMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatMemory")
            .field("base_addr", &format_args!("0x{:08x}", self.base_addr))
            .field("size", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_memory_little_endian() {
        let mut mem = FlatMemory::new(1024, 0);

        mem.store16(2, 0x3456).unwrap();
        assert_eq!(mem.load16(2).unwrap(), 0x3456);
        assert_eq!(mem.load8(2).unwrap(), 0x56);
        assert_eq!(mem.load8(3).unwrap(), 0x34);

        mem.store32(4, 0x78ABCDEF).unwrap();
        assert_eq!(mem.load32(4).unwrap(), 0x78ABCDEF);
        assert_eq!(mem.read_bytes(4, 4).unwrap(), vec![0xEF, 0xCD, 0xAB, 0x78]);
    }

    #[test]
    fn test_flat_memory_with_base_addr() {
        let mut mem = FlatMemory::new(1024, 0x1000);

        mem.store32(0x1000, 0xDEADBEEF).unwrap();
        assert_eq!(mem.load32(0x1000).unwrap(), 0xDEADBEEF);
        assert!(mem.load8(0x0FFF).is_err());
        assert!(mem.contains(0x1000, 1024));
        assert!(!mem.contains(0x1000, 1025));
    }

    #[test]
    fn test_unaligned_access_is_allowed() {
        let mut mem = FlatMemory::new(16, 0);
        mem.store32(1, 0x11223344).unwrap();
        assert_eq!(mem.load32(1).unwrap(), 0x11223344);
        assert_eq!(mem.load16(3).unwrap(), 0x1122);
    }

    #[test]
    fn test_out_of_bounds() {
        let mem = FlatMemory::new(1024, 0);
        let err = mem.load8(2000).unwrap_err();
        assert!(matches!(err, MemError::OutOfBounds { addr: 2000, .. }));

        // 跨越末尾的字访问同样越界
        let err = mem.load32(1022).unwrap_err();
        assert_eq!(
            err,
            MemError::OutOfBounds {
                addr: 1022,
                access: AccessSize::Word,
                base: 0,
                size: 1024
            }
        );
    }

    #[test]
    fn test_fill_and_write_bytes() {
        let mut mem = FlatMemory::new(64, 0x100);
        mem.write_bytes(0x100, &[1, 2, 3, 4]).unwrap();
        mem.fill(0x102, 4, 0xAA).unwrap();
        assert_eq!(mem.read_bytes(0x100, 6).unwrap(), vec![1, 2, 0xAA, 0xAA, 0xAA, 0xAA]);
        assert!(mem.write_bytes(0x13E, &[0; 4]).is_err());
    }

    #[test]
    fn test_error_message() {
        let mem = FlatMemory::new(0x100, 0x1000);
        let err = mem.load32(0x2000).unwrap_err();
        assert_eq!(
            err.to_string(),
            "out-of-bounds Word access at 0x00002000 (region=0x00001000..0x00001100)"
        );
    }
}
