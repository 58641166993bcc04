//! 块设备仅支持以块为单位进行随机读写, 需要由具体的块设备驱动来实现这些方法.
//! 块缓冲层 [`BlockCache`](super::BlockCache) 会调用这两个方法.
//! 泛用性: 可以访问实现了 BlockDevice Trait 的块设备驱动程序.
//!
//! 所有调用都是同步的: 只有设备确认之后才返回, 失败时不做任何重试.

use std::any::Any;

use super::FsResult;

pub trait BlockDevice: Send + Sync + Any {
    // read_block 将编号为 block_id 的块从磁盘读入内存中的缓冲区 buf ;
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> FsResult<()>;

    // write_block 将内存中的缓冲区 buf 中的数据写入磁盘编号为 block_id 的块,
    // 返回 Ok 时数据必须已经持久化.
    fn write_block(&self, block_id: usize, buf: &[u8]) -> FsResult<()>;

    /// 设备的总块数
    fn num_blocks(&self) -> usize;
}
