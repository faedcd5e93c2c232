//! 镜像加载
//!
//! 支持两种镜像：
//! - 原始二进制：整体拷贝到代码区起始处，PC 指向代码区起始
//! - ELF32 RISC-V 可执行文件：按 `PT_LOAD` 段加载，`.bss` 清零，PC 取入口点
//!
//! 所有内容都必须落在代码区（内存低半部分）之内。

use std::path::Path;

use elf::abi::{EM_RISCV, PF_W, PF_X, PT_LOAD};
use elf::endian::AnyEndian;
use elf::ElfBytes;
use tracing::{debug, info};

use crate::machine::Machine;
use crate::sim_env::SimError;

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// 镜像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    Raw,
    Elf,
    /// 根据 ELF 魔数自动识别
    #[default]
    Auto,
}

impl ImageFormat {
    /// `Auto` 按内容解析为具体格式，其余原样返回
    pub fn resolve(self, data: &[u8]) -> ImageFormat {
        match self {
            ImageFormat::Auto if data.starts_with(ELF_MAGIC) => ImageFormat::Elf,
            ImageFormat::Auto => ImageFormat::Raw,
            other => other,
        }
    }
}

/// ELF 程序段信息
#[derive(Debug, Clone)]
pub struct ElfSegment {
    pub vaddr: u32,
    pub file_size: usize,
    pub mem_size: usize,
    pub data: Vec<u8>,
    pub executable: bool,
    pub writable: bool,
}

/// ELF 文件解析结果
#[derive(Debug, Clone)]
pub struct ElfInfo {
    pub entry: u32,
    pub segments: Vec<ElfSegment>,
}

impl ElfInfo {
    /// 从字节数组解析 ELF（使用 elf crate）
    ///
    /// 只接受 32 位 RISC-V 文件，只保留 `PT_LOAD` 段。
    pub fn parse_bytes(data: &[u8]) -> Result<Self, SimError> {
        let elf_file = ElfBytes::<AnyEndian>::minimal_parse(data)
            .map_err(|e| SimError::Elf(format!("failed to parse ELF: {e}")))?;
        let header = &elf_file.ehdr;

        if header.e_machine != EM_RISCV {
            return Err(SimError::Elf(format!(
                "not a RISC-V ELF (machine type: 0x{:x}, expected 0x{:x})",
                header.e_machine, EM_RISCV
            )));
        }
        if header.class != elf::file::Class::ELF32 {
            return Err(SimError::Elf("only 32-bit ELF is supported".into()));
        }

        let mut segments = Vec::new();
        if let Some(phdrs) = elf_file.segments() {
            for phdr in phdrs.iter().filter(|p| p.p_type == PT_LOAD) {
                let seg_data = elf_file
                    .segment_data(&phdr)
                    .map_err(|e| SimError::Elf(format!("failed to read segment data: {e}")))?;
                let mem_size = phdr.p_memsz as usize;
                if seg_data.len() > mem_size {
                    return Err(SimError::Elf(format!(
                        "segment at 0x{:08x} has filesz 0x{:x} > memsz 0x{:x}",
                        phdr.p_vaddr,
                        seg_data.len(),
                        mem_size
                    )));
                }
                segments.push(ElfSegment {
                    vaddr: phdr.p_vaddr as u32,
                    file_size: seg_data.len(),
                    mem_size,
                    data: seg_data.to_vec(),
                    executable: phdr.p_flags & PF_X != 0,
                    writable: phdr.p_flags & PF_W != 0,
                });
            }
        }

        if segments.is_empty() {
            return Err(SimError::Elf("no loadable segments".into()));
        }

        Ok(ElfInfo {
            entry: header.e_entry as u32,
            segments,
        })
    }
}

/// 加载结果摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedImage {
    /// 实际使用的格式（不会是 `Auto`）
    pub format: ImageFormat,
    pub entry: u32,
    /// 写入内存的字节数（含 bss）
    pub bytes: usize,
}

/// 读取镜像文件
pub fn read_image(path: &Path) -> Result<Vec<u8>, SimError> {
    std::fs::read(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// 将镜像加载到机器中并设置初始 PC
pub fn load_image(
    machine: &mut Machine,
    data: &[u8],
    format: ImageFormat,
) -> Result<LoadedImage, SimError> {
    let loaded = match format.resolve(data) {
        ImageFormat::Elf => load_elf(machine, data)?,
        _ => load_raw(machine, data)?,
    };
    machine.set_pc(loaded.entry);
    info!(
        format = ?loaded.format,
        entry = format_args!("0x{:08x}", loaded.entry),
        bytes = loaded.bytes,
        "image loaded"
    );
    Ok(loaded)
}

fn load_raw(machine: &mut Machine, data: &[u8]) -> Result<LoadedImage, SimError> {
    let layout = *machine.layout();
    if data.len() > layout.text_size() {
        return Err(SimError::ImageTooLarge {
            len: data.len(),
            limit: layout.text_size(),
        });
    }
    machine.memory_mut().write_bytes(layout.text_start(), data)?;
    Ok(LoadedImage {
        format: ImageFormat::Raw,
        entry: layout.text_start(),
        bytes: data.len(),
    })
}

fn load_elf(machine: &mut Machine, data: &[u8]) -> Result<LoadedImage, SimError> {
    let elf = ElfInfo::parse_bytes(data)?;
    let layout = *machine.layout();
    let mut bytes = 0;

    for (i, seg) in elf.segments.iter().enumerate() {
        if !layout.text_contains(seg.vaddr, seg.mem_size) {
            return Err(SimError::SegmentOutsideText {
                vaddr: seg.vaddr,
                size: seg.mem_size,
            });
        }
        debug!(
            index = i,
            vaddr = format_args!("0x{:08x}", seg.vaddr),
            filesz = seg.file_size,
            memsz = seg.mem_size,
            flags = format_args!(
                "{}{}",
                if seg.executable { "X" } else { "-" },
                if seg.writable { "W" } else { "R" }
            ),
            "loading segment"
        );

        let memory = machine.memory_mut();
        memory.write_bytes(seg.vaddr, &seg.data)?;
        if seg.mem_size > seg.file_size {
            let bss_start = seg.vaddr + seg.file_size as u32;
            memory.fill(bss_start, seg.mem_size - seg.file_size, 0)?;
        }
        bytes += seg.mem_size;
    }

    Ok(LoadedImage {
        format: ImageFormat::Elf,
        entry: elf.entry,
        bytes,
    })
}
