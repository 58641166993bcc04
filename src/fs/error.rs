//! 文件系统的错误类型
//!
//! 每个组件都直接把错误返回给调用者, 既不吞掉也不重试;
//! 重试策略以及面向用户的错误展示都交给上层 (vfs / 命令行) 处理.

use thiserror::Error;

/// 错误的大类, 上层根据它决定一个错误是否可以恢复
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 魔数或块大小不匹配, 挂载失败
    Format,
    /// 对象数量或空闲块耗尽, 可恢复
    Capacity,
    /// 非法的类型或文件名, 可恢复
    Validation,
    /// 查找不到, 属于正常结果
    NotFound,
    /// 目录项指向了 inode 表中不存在的 inode, 磁盘数据已损坏
    Inconsistent,
    /// 块设备读写失败
    Io,
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short transfer on block {block_id}: expected {expected} bytes, got {got}")]
    ShortTransfer {
        block_id: usize,
        expected: usize,
        got: usize,
    },

    /// 挂载时发现的磁盘格式错误 (魔数, 块大小, 根目录等)
    #[error("invalid on-disk format: {0}")]
    Format(String),

    #[error("no free data block left on device")]
    NoSpace,

    #[error("maximum number of objects ({0}) already reached")]
    TooManyObjects(usize),

    #[error("directory inode {0} has no free entry slot")]
    DirectoryFull(u64),

    #[error("mode {0:#o} is neither a regular file nor a directory")]
    InvalidKind(u32),

    #[error("file name is longer than {limit} bytes: {name:?}")]
    NameTooLong { name: String, limit: usize },

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("inode {0} is not a directory")]
    NotDirectory(u64),

    #[error("file exists: {0}")]
    Exists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("inconsistent metadata: {0}")]
    Inconsistent(String),
}

pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::Io(_) | FsError::ShortTransfer { .. } => ErrorKind::Io,
            FsError::Format(_) => ErrorKind::Format,
            FsError::NoSpace | FsError::TooManyObjects(_) | FsError::DirectoryFull(_) => {
                ErrorKind::Capacity
            }
            FsError::InvalidKind(_)
            | FsError::NameTooLong { .. }
            | FsError::InvalidName(_)
            | FsError::NotDirectory(_)
            | FsError::Exists(_) => ErrorKind::Validation,
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::Inconsistent(_) => ErrorKind::Inconsistent,
        }
    }

    /// Convert this error into a POSIX errno, the way a host VFS layer reports it.
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            FsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            FsError::ShortTransfer { .. } => libc::EIO,
            FsError::Format(_) => libc::EINVAL,
            FsError::NoSpace | FsError::TooManyObjects(_) | FsError::DirectoryFull(_) => {
                libc::ENOSPC
            }
            FsError::InvalidKind(_) | FsError::InvalidName(_) => libc::EINVAL,
            FsError::NameTooLong { .. } => libc::ENAMETOOLONG,
            FsError::NotDirectory(_) => libc::ENOTDIR,
            FsError::Exists(_) => libc::EEXIST,
            FsError::NotFound(_) => libc::ENOENT,
            FsError::Inconsistent(_) => libc::EIO,
        }
    }
}
