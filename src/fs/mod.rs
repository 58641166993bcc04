mod bitmap;
mod block_cache;
mod block_dev;
mod dir;
mod error;
mod flat_fs;
mod inode_table;
mod layout;
mod super_block;
mod vfs;

extern crate log;

/// Use a block size of 4096 bytes
pub const BLOCK_SIZE: usize = 4096;
/// Magic number for sanity check
pub const FLAT_FS_MAGIC: u64 = 0x2020_0406;
/// 磁盘格式版本号
pub const FLAT_FS_VERSION: u64 = 1;
/// 文件系统中最多可以容纳的对象 (文件 + 目录, 包括根目录) 数量
///
/// inode 表只占一个块, 所以 MAX_OBJECTS * INODE_SIZE 不能超过 BLOCK_SIZE
pub const MAX_OBJECTS: usize = 128;
/// 超级块所在的块号
pub const SUPER_BLOCK_ID: usize = 0;
/// inode 表所在的块号
pub const INODE_TABLE_BLOCK_ID: usize = 1;
/// 根目录的数据块号, 由格式化程序分配
pub const ROOT_DATA_BLOCK_ID: usize = 2;
/// 块 0 和块 1 永远不能被分配
pub const RESERVED_BLOCKS: usize = 2;
/// 根目录的 inode 编号
pub const ROOT_INODE_ID: u64 = 1;
/// 位图覆盖的块数: 每个对象一个数据块, 再加上两个元数据块
pub const BLOCK_COUNT: usize = MAX_OBJECTS + RESERVED_BLOCKS;
/// 位图占用的 u64 个数
pub const BITMAP_WORDS: usize = (BLOCK_COUNT + 63) / 64;
/// DiskInode 的大小
pub const INODE_SIZE: usize = 32;
/// 目录项的大小
pub const DIRENT_SIZE: usize = 64;
/// The max length of a file name (the last byte of the name field is kept for '\0')
pub const NAME_LENGTH_LIMIT: usize = DIRENT_SIZE - 8 - 1;
/// 一个目录的数据块最多能放下的目录项数量
pub const DIRENTS_PER_BLOCK: usize = BLOCK_SIZE / DIRENT_SIZE;

pub use bitmap::Bitmap;
pub use block_cache::BlockCache;
pub use block_dev::BlockDevice;
pub use dir::DirEntries;
pub use error::{ErrorKind, FsError, FsResult};
pub use flat_fs::{FlatFileSystem, FsStat};
pub use layout::*;
pub use vfs::Inode;
