//! 块缓冲层: 把一个磁盘块读到内存中的缓冲区 [`BlockCache`] 里, 在缓冲区上按类型读写磁盘数据结构.
//!
//! 与全局缓存管理器不同, 这里的缓冲区只在一次操作中存在:
//! 由调用者 load, 在上面 read/modify, 最后显式 sync 写回.
//! 写回的错误直接返回给调用者, 所以不在 Drop 中做写回.
//!
//! 从缓冲区中读出的数据结构都以值的形式复制出来,
//! 调用者拿到的永远不是指向缓冲区的引用.

use std::sync::Arc;

use super::{BlockDevice, FsResult, BLOCK_SIZE};

/// 按 8 字节对齐的块缓冲区, 保证在上面解释 u64 字段时是对齐的
#[repr(C, align(8))]
struct AlignedBlock([u8; BLOCK_SIZE]);

/// A block loaded into memory
pub struct BlockCache {
    cache: Box<AlignedBlock>,
    /// block_id 记录了这个缓冲区来自于磁盘中的块的编号
    block_id: usize,
    block_device: Arc<dyn BlockDevice>,
    /// 载入之后有没有被修改过
    modified: bool,
}

impl BlockCache {
    /// 读取一个块, 这会触发一次 read_block
    pub fn load(block_id: usize, block_device: &Arc<dyn BlockDevice>) -> FsResult<Self> {
        let mut cache = Box::new(AlignedBlock([0u8; BLOCK_SIZE]));
        block_device.read_block(block_id, &mut cache.0)?;
        Ok(Self {
            cache,
            block_id,
            block_device: Arc::clone(block_device),
            modified: false,
        })
    }

    /// 得到一个全 0 的缓冲区, 不读磁盘 (格式化时用)
    pub fn zeroed(block_id: usize, block_device: &Arc<dyn BlockDevice>) -> Self {
        Self {
            cache: Box::new(AlignedBlock([0u8; BLOCK_SIZE])),
            block_id,
            block_device: Arc::clone(block_device),
            modified: true,
        }
    }

    /// 获取缓冲区中位于偏移量 offset 的一个类型为 T 的磁盘上数据结构的不可变引用.
    ///
    /// T 必须是 `#[repr(C)]` 的纯数据类型, 任意字节组合都是合法值,
    /// 且对齐要求不超过 8 字节.
    fn get_ref<T>(&self, offset: usize) -> &T
    where
        T: Sized,
    {
        let type_size = std::mem::size_of::<T>();
        // 确认 T 被整个包含在磁盘块及其缓冲区之内
        assert!(offset + type_size <= BLOCK_SIZE);
        assert_eq!(offset % std::mem::align_of::<T>(), 0);
        let addr = &self.cache.0[offset] as *const u8;
        unsafe { &*(addr as *const T) }
    }

    fn get_mut<T>(&mut self, offset: usize) -> &mut T
    where
        T: Sized,
    {
        let type_size = std::mem::size_of::<T>();
        assert!(offset + type_size <= BLOCK_SIZE);
        assert_eq!(offset % std::mem::align_of::<T>(), 0);
        self.modified = true;
        let addr = &mut self.cache.0[offset] as *mut u8;
        unsafe { &mut *(addr as *mut T) }
    }

    // read/modify 让传入的闭包绑定到缓冲区上执行, 返回值就是闭包的返回值.
    // 闭包的返回值不能借用缓冲区, 需要的数据都要在闭包里复制出来.

    pub fn read<T, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get_ref(offset))
    }

    pub fn modify<T, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }

    /// If modified, write back to disk. 返回 Ok 时数据已经落盘.
    pub fn sync(&mut self) -> FsResult<()> {
        if self.modified {
            self.block_device.write_block(self.block_id, &self.cache.0)?;
            self.modified = false;
        }
        Ok(())
    }
}
