//! 磁盘数据结构层的代码在 layout.rs 和 bitmap.rs 中
//!
//! 三个数据结构 [`SuperBlock`], [`DiskInode`], [`DirEntry`]
//!
//! 在 fs 磁盘布局中, 按照块编号从小到大顺序地分成 3 个区域:
//!
//! - 块 0 是超级块 ([`SuperBlock`])
//!   以 魔数 的形式提供了文件系统合法性检查功能, 同时保存了空闲块位图和对象数量
//!
//! - 块 1 是 inode 表, 一个连续的 [`DiskInode`] 数组, 有效长度为 inodes_count
//!
//! - 块 2 及以后是数据块
//!   目录的数据块中保存了一个连续的 [`DirEntry`] 数组, 有效长度为该目录的 dir_children_count
//!
//! 所有结构都是 `#[repr(C)]` 且只包含整数字段, 任意字节组合都是合法值,
//! 因此可以直接在块缓冲区上解释.

use std::fmt::{Debug, Formatter, Result};

use super::{
    FsError, FsResult, BITMAP_WORDS, BLOCK_COUNT, BLOCK_SIZE, DIRENT_SIZE, FLAT_FS_MAGIC,
    FLAT_FS_VERSION, INODE_SIZE, MAX_OBJECTS, NAME_LENGTH_LIMIT, RESERVED_BLOCKS,
    ROOT_DATA_BLOCK_ID, ROOT_INODE_ID,
};

/// 对象类型所在的位
pub const S_IFMT: u32 = 0o170000;
/// 目录
pub const S_IFDIR: u32 = 0o040000;
/// 普通文件
pub const S_IFREG: u32 = 0o100000;
/// 权限位
pub const S_IPERM: u32 = 0o7777;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u64, // 用于文件系统合法性验证的魔数
    pub version: u64,
    pub block_size: u64,
    /// 已经使用的 inode 数量, 也就是下一个 inode 在表中的位置
    pub inodes_count: u64,
    /// 空闲块位图, 第 i 位为 1 表示块 i 空闲
    pub free_blocks: [u64; BITMAP_WORDS],
}

impl Debug for SuperBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("SuperBlock")
            .field("magic", &format_args!("{:#x}", self.magic))
            .field("version", &self.version)
            .field("block_size", &self.block_size)
            .field("inodes_count", &self.inodes_count)
            .field(
                "free_blocks",
                &self
                    .free_blocks
                    .iter()
                    .map(|w| w.count_ones())
                    .sum::<u32>(),
            )
            .finish()
    }
}

/// SuperBlock 是一个磁盘上数据结构, 它就存放在磁盘上编号为 0 的块的起始处
impl SuperBlock {
    /// 格式化时的超级块: 只有根目录一个对象, 根目录占用了块 2
    pub fn initialize(&mut self) {
        let mut free_blocks = [0u64; BITMAP_WORDS];
        for bit in RESERVED_BLOCKS..BLOCK_COUNT {
            free_blocks[bit / 64] |= 1u64 << (bit % 64);
        }
        free_blocks[ROOT_DATA_BLOCK_ID / 64] &= !(1u64 << (ROOT_DATA_BLOCK_ID % 64));
        *self = Self {
            magic: FLAT_FS_MAGIC,
            version: FLAT_FS_VERSION,
            block_size: BLOCK_SIZE as u64,
            inodes_count: 1,
            free_blocks,
        };
    }

    /// 检查超级块中的格式常量, 任何一项不符合都拒绝挂载
    pub fn validate(&self) -> FsResult<()> {
        if self.magic != FLAT_FS_MAGIC {
            return Err(FsError::Format(format!(
                "magic number mismatch: found {:#x}, expected {:#x}",
                self.magic, FLAT_FS_MAGIC
            )));
        }
        if self.block_size != BLOCK_SIZE as u64 {
            return Err(FsError::Format(format!(
                "formatted with a non-standard block size {} (expected {})",
                self.block_size, BLOCK_SIZE
            )));
        }
        if self.inodes_count > MAX_OBJECTS as u64 {
            return Err(FsError::Format(format!(
                "inodes_count {} exceeds the limit of {}",
                self.inodes_count, MAX_OBJECTS
            )));
        }
        if self.free_blocks[0] & 0b11 != 0 {
            return Err(FsError::Format(
                "superblock or inode table block is marked free".into(),
            ));
        }
        Ok(())
    }
}

/// 索引节点的类型, 目前仅支持文件 File 和目录 Directory 两种类型
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum DiskInodeType {
    File,
    Directory,
}

impl DiskInodeType {
    /// 从 mode 中解析出对象类型, 既不是文件也不是目录时返回 None
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(DiskInodeType::File),
            S_IFDIR => Some(DiskInodeType::Directory),
            _ => None,
        }
    }

    /// 类型位和权限位合成一个 mode
    pub fn mode(self, perm: u32) -> u32 {
        let kind = match self {
            DiskInodeType::File => S_IFREG,
            DiskInodeType::Directory => S_IFDIR,
        };
        kind | (perm & S_IPERM)
    }
}

/// 每个 文件/目录 在磁盘上均以一个 DiskInode 的形式存储
///
/// 大小为 32 字节, inode 表所在的一个块正好能够容纳 MAX_OBJECTS 个 DiskInode
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DiskInode {
    /// 对象类型 + 权限
    pub mode: u32,
    /// 目录下的目录项数量 (仅对目录有意义)
    pub dir_children_count: u32,
    pub inode_no: u64,
    /// 该对象独占的数据块
    pub data_block_number: u64,
    /// 文件内容的字节数 (仅对文件有意义)
    pub file_size: u64,
}

impl DiskInode {
    pub fn new(inode_no: u64, mode: u32, data_block_number: u64) -> Self {
        Self {
            mode,
            dir_children_count: 0,
            inode_no,
            data_block_number,
            file_size: 0,
        }
    }

    /// 格式化时创建的根目录
    pub fn root() -> Self {
        Self::new(
            ROOT_INODE_ID,
            DiskInodeType::Directory.mode(0o755),
            ROOT_DATA_BLOCK_ID as u64,
        )
    }

    pub fn kind(&self) -> Option<DiskInodeType> {
        DiskInodeType::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == Some(DiskInodeType::Directory)
    }

    pub fn is_file(&self) -> bool {
        self.kind() == Some(DiskInodeType::File)
    }

    pub fn permissions(&self) -> u32 {
        self.mode & S_IPERM
    }
}

// 作为一个文件而言, 它的内容在文件系统看来只是一个字节序列,
// 然而, 目录的内容却需要遵从一种特殊的格式: 它是一个目录项的序列,
// 每个目录项都是一个二元组, 首个元素是目录下面的一个文件 (或子目录) 的名字,
// 另一个元素则是文件(或子目录)所在的索引节点编号.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
/// 目录项
///
/// 它自身占据空间 64 字节, 每个数据块可以存储 64 个目录项
pub struct DirEntry {
    /// 最大允许保存长度为 55 的文件/目录名 (数组 name 中最末的一个字节留给 '\0')
    name: [u8; NAME_LENGTH_LIMIT + 1],
    inode_no: u64,
}

impl Debug for DirEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("DirEntry")
            .field("name", &self.name())
            .field("inode_no", &self.inode_no)
            .finish()
    }
}

impl DirEntry {
    /// 通过文件名和 inode 编号创建一个目录项, 名字需要先经过 [`validate_name`] 检查
    pub fn new(name: &str, inode_no: u64) -> Self {
        let mut name_bytes = [0; NAME_LENGTH_LIMIT + 1];
        name_bytes[..name.len()].copy_from_slice(name.as_bytes());
        Self {
            name: name_bytes,
            inode_no,
        }
    }

    /// 名字的原始字节, 不包含结尾的 '\0'
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(self.name.len());
        &self.name[..len]
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn inode_no(&self) -> u64 {
        self.inode_no
    }
}

/// 检查一个名字能否保存在目录项中
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c: char| c == '/' || c == '\0')
    {
        return Err(FsError::InvalidName(name.to_string()));
    }
    if name.len() > NAME_LENGTH_LIMIT {
        return Err(FsError::NameTooLong {
            name: name.to_string(),
            limit: NAME_LENGTH_LIMIT,
        });
    }
    Ok(())
}

const _: () = assert!(std::mem::size_of::<SuperBlock>() <= BLOCK_SIZE);
const _: () = assert!(std::mem::size_of::<DiskInode>() == INODE_SIZE);
const _: () = assert!(std::mem::size_of::<DirEntry>() == DIRENT_SIZE);
const _: () = assert!(MAX_OBJECTS * INODE_SIZE <= BLOCK_SIZE);
