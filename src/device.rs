use crate::fs::{BlockDevice, FsError, FsResult, BLOCK_SIZE};
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom, Write},
    sync::Mutex,
};

pub struct BlockFile(pub Mutex<File>);

// std::file::File 由 Rust 标准库 std 提供，可以访问 Linux 上的一个文件。
// 我们将它包装成 BlockFile 类型来模拟一块磁盘，为它实现 BlockDevice 接口。
// 注意 File 本身仅通过 read/write 接口是不能实现随机读写的，
// 在访问一个特定的块的时候，我们必须先 seek 到这个块的开头位置

impl BlockFile {
    pub fn new(file: File) -> Self {
        Self(Mutex::new(file))
    }

    fn lock(&self) -> FsResult<std::sync::MutexGuard<'_, File>> {
        self.0
            .lock()
            .map_err(|_| {
                FsError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "block file lock poisoned",
                ))
            })
    }
}

impl BlockDevice for BlockFile {
    /// 读取一个块从文件
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> FsResult<()> {
        check_len(block_id, buf.len())?;
        let offset = block_offset(block_id)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// 写一个块到文件, 数据落盘之后才返回
    fn write_block(&self, block_id: usize, buf: &[u8]) -> FsResult<()> {
        check_len(block_id, buf.len())?;
        let offset = block_offset(block_id)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.sync_data()?;
        Ok(())
    }

    fn num_blocks(&self) -> usize {
        self.lock()
            .and_then(|file| Ok(file.metadata()?.len()))
            .map_or(0, |len| len as usize / BLOCK_SIZE)
    }
}

/// 内存中的虚拟磁盘, 用于测试
#[cfg(test)]
pub struct MemDisk {
    data: spin::Mutex<Vec<u8>>,
}

#[cfg(test)]
impl MemDisk {
    pub fn new(num_blocks: usize) -> Self {
        Self {
            data: spin::Mutex::new(vec![0u8; num_blocks * BLOCK_SIZE]),
        }
    }

    /// 整个磁盘的一份拷贝
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// 直接改写一个块, 用来构造损坏的磁盘
    pub fn poke(&self, block_id: usize, offset: usize, bytes: &[u8]) {
        let start = block_id * BLOCK_SIZE + offset;
        self.data.lock()[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn range(&self, block_id: usize, len: usize) -> FsResult<std::ops::Range<usize>> {
        check_len(block_id, len)?;
        if block_id >= self.num_blocks() {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("block {} is beyond the end of the disk", block_id),
            )));
        }
        Ok(block_id * BLOCK_SIZE..(block_id + 1) * BLOCK_SIZE)
    }
}

#[cfg(test)]
impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> FsResult<()> {
        let range = self.range(block_id, buf.len())?;
        buf.copy_from_slice(&self.data.lock()[range]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> FsResult<()> {
        let range = self.range(block_id, buf.len())?;
        self.data.lock()[range].copy_from_slice(buf);
        Ok(())
    }

    fn num_blocks(&self) -> usize {
        self.data.lock().len() / BLOCK_SIZE
    }
}

/// 块在镜像文件中的字节偏移, 溢出时报告为 I/O 错误
fn block_offset(block_id: usize) -> FsResult<u64> {
    block_id
        .checked_mul(BLOCK_SIZE)
        .and_then(|offset| u64::try_from(offset).ok())
        .ok_or_else(|| {
            FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("block {} is beyond any addressable offset", block_id),
            ))
        })
}

fn check_len(block_id: usize, len: usize) -> FsResult<()> {
    if len != BLOCK_SIZE {
        return Err(FsError::ShortTransfer {
            block_id,
            expected: BLOCK_SIZE,
            got: len,
        });
    }
    Ok(())
}
