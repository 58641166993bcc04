//! 文件系统引擎: 把超级块, 空闲块分配, inode 表和目录管理组织起来,
//! 实现 挂载 / 创建 / 查找 / 列目录.
//!
//! [`FlatFileSystem`] 就是一次挂载的会话: 它持有块设备和超级块在内存中唯一的副本,
//! 从 mount 开始到 unmount 结束. 每一次修改超级块或 inode 的操作都会立刻同步写回,
//! 所以 unmount 除了释放内存之外不需要做任何事情.
//!
//! 引擎本身不做任何互斥, 修改操作需要 `&mut self`;
//! 多线程共享时由 [`Inode`](super::Inode) 用一把全局锁把整个会话保护起来.

use std::sync::Arc;

use log::{debug, error, info, warn};

use super::{
    dir::check_room, super_block, validate_name, Bitmap, BlockCache, BlockDevice, DirEntries,
    DiskInode, DiskInodeType, FsError, FsResult, SuperBlock, BLOCK_COUNT, BLOCK_SIZE,
    INODE_TABLE_BLOCK_ID, MAX_OBJECTS, NAME_LENGTH_LIMIT, RESERVED_BLOCKS, ROOT_INODE_ID,
    SUPER_BLOCK_ID,
};

/// 数据块位图: 块 0 和块 1 不参与分配
const DATA_BITMAP: Bitmap = Bitmap::new(RESERVED_BLOCKS, BLOCK_COUNT);

/// 文件系统 (一次挂载的会话)
///
/// Blocks: Super Block(0) -> Inode Table(1) -> Data Blocks(2..)
pub struct FlatFileSystem {
    /// 保留块设备的一个指针 block_device,
    /// 在进行后续操作的时候, 该指针会被拷贝并传递给块缓冲区.
    pub(super) block_device: Arc<dyn BlockDevice>,
    /// 超级块在内存中的副本, 只有写回成功之后才会被修改
    pub(super) super_block: SuperBlock,
}

/// 文件系统的统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub block_size: usize,
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub objects: usize,
    pub max_objects: usize,
    pub name_limit: usize,
}

impl FlatFileSystem {
    /// 在块设备上创建并初始化一个文件系统, 只包含一个空的根目录
    pub fn format(block_device: Arc<dyn BlockDevice>) -> FsResult<()> {
        let device_blocks = block_device.num_blocks();
        if device_blocks < BLOCK_COUNT {
            error!(
                "device has {} blocks, at least {} are needed",
                device_blocks, BLOCK_COUNT
            );
            return Err(FsError::NoSpace);
        }

        // 既然是创建文件系统, 需要将块设备的前 BLOCK_COUNT 个块清零
        for block_id in 0..BLOCK_COUNT {
            BlockCache::zeroed(block_id, &block_device).sync()?;
        }

        let mut super_block = BlockCache::zeroed(SUPER_BLOCK_ID, &block_device);
        super_block.modify(0, |super_block: &mut SuperBlock| super_block.initialize());
        super_block.sync()?;

        // 根目录放在 inode 表的第 0 项, 它的数据块 (块 2) 已经被清零
        let mut inode_table = BlockCache::zeroed(INODE_TABLE_BLOCK_ID, &block_device);
        inode_table.modify(0, |disk_inode: &mut DiskInode| *disk_inode = DiskInode::root());
        inode_table.sync()?;

        info!(
            "formatted device: {} blocks of {} bytes, up to {} objects",
            BLOCK_COUNT, BLOCK_SIZE, MAX_OBJECTS
        );
        Ok(())
    }

    /// 从一个已写入了 fs 镜像的块设备上挂载 fs
    ///
    /// 先读取并检查超级块, 再找到根目录; 任何一步失败都不会得到会话.
    pub fn mount(block_device: Arc<dyn BlockDevice>) -> FsResult<Self> {
        let super_block = super_block::load(&block_device)?;
        let fs = Self {
            block_device,
            super_block,
        };

        let root = match fs.get_disk_inode(ROOT_INODE_ID) {
            Ok(root) => root,
            Err(FsError::NotFound(_)) => {
                error!("root inode {} is missing", ROOT_INODE_ID);
                return Err(FsError::Format(format!(
                    "root inode {} is not in the inode table",
                    ROOT_INODE_ID
                )));
            }
            Err(e) => return Err(e),
        };
        if !root.is_dir() {
            error!("root inode has mode {:#o}", root.mode);
            return Err(FsError::Format("root inode is not a directory".into()));
        }

        info!(
            "flat-fs version {} with a block size of {} detected, {} objects",
            super_block.version, super_block.block_size, super_block.inodes_count
        );
        Ok(fs)
    }

    /// 获取根目录 inode 的一份拷贝
    pub fn root_inode(&self) -> FsResult<DiskInode> {
        self.get_disk_inode(ROOT_INODE_ID)
    }

    #[cfg(test)]
    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    /// 分配一个空闲数据块
    ///
    /// 从块 2 开始找第一个空闲块, 保存超级块之后才返回块号.
    /// 没有空闲块或者写回失败时, 内存中的超级块保持不变.
    pub fn alloc_data(&mut self) -> FsResult<u64> {
        let mut super_block = self.super_block;
        let Some(block_id) = DATA_BITMAP.alloc(&mut super_block.free_blocks) else {
            error!("no more free blocks available");
            return Err(FsError::NoSpace);
        };
        super_block::save(&self.block_device, &super_block)?;
        self.super_block = super_block;
        debug!("allocated data block {}", block_id);
        Ok(block_id as u64)
    }

    /// 在目录 parent 下创建一个文件或目录
    ///
    /// 顺序是固定的: 检查 -> 分配编号 -> 分配数据块 -> 追加 inode -> 追加目录项.
    /// 分配数据块失败时磁盘上不会有任何改动.
    ///
    /// 类型, 名字和父目录的检查在对象数量检查之前, 同时不满足时返回的是前者的错误.
    pub fn create(&mut self, parent: &DiskInode, name: &str, mode: u32) -> FsResult<DiskInode> {
        let Some(kind) = DiskInodeType::from_mode(mode) else {
            warn!("creation request for neither a file nor a directory: {:#o}", mode);
            return Err(FsError::InvalidKind(mode));
        };
        validate_name(name)?;
        // 调用者手里的 parent 可能已经过时, 以 inode 表中的为准
        let mut parent = self.get_disk_inode(parent.inode_no)?;
        check_room(&parent)?;

        let count = self.super_block.inodes_count as usize;
        if count >= MAX_OBJECTS {
            warn!("maximum number of objects ({}) already reached", MAX_OBJECTS);
            return Err(FsError::TooManyObjects(MAX_OBJECTS));
        }
        let inode_no = count as u64 + 1;

        let data_block = self.alloc_data()?;
        let disk_inode = DiskInode::new(inode_no, mode, data_block);
        self.append_disk_inode(&disk_inode)?;
        self.append_dir_entry(&mut parent, name, inode_no)?;

        debug!(
            "created {:?} {:?} as inode {} in dir {}",
            kind, name, inode_no, parent.inode_no
        );
        Ok(disk_inode)
    }

    /// 在目录 parent 下按名字查找
    pub fn lookup(&self, parent: &DiskInode, name: &str) -> FsResult<DiskInode> {
        let parent = self.get_disk_inode(parent.inode_no)?;
        let inode_no = self.find_inode_id(&parent, name)?;
        self.resolve(parent.inode_no, inode_no)
    }

    /// 列出目录 parent 下的所有 (名字, inode), inode 在迭代时才去 inode 表中查找
    pub fn read_dir(&self, parent: &DiskInode) -> FsResult<ReadDir<'_>> {
        let parent = self.get_disk_inode(parent.inode_no)?;
        Ok(ReadDir {
            fs: self,
            parent: parent.inode_no,
            entries: self.dir_entries(&parent)?,
        })
    }

    pub fn statfs(&self) -> FsStat {
        FsStat {
            block_size: BLOCK_SIZE,
            total_blocks: BLOCK_COUNT,
            free_blocks: DATA_BITMAP.free_count(&self.super_block.free_blocks),
            objects: self.super_block.inodes_count as usize,
            max_objects: MAX_OBJECTS,
            name_limit: NAME_LENGTH_LIMIT,
        }
    }

    /// 卸载: 所有修改都已经同步写回, 只需要释放会话
    pub fn unmount(self) {
        info!(
            "unmounted, {} objects on disk",
            self.super_block.inodes_count
        );
    }

    /// 目录项指向的 inode 必须在 inode 表中
    fn resolve(&self, parent: u64, inode_no: u64) -> FsResult<DiskInode> {
        match self.get_disk_inode(inode_no) {
            Err(FsError::NotFound(_)) => {
                error!(
                    "dir {} has an entry for inode {} which does not exist",
                    parent, inode_no
                );
                Err(FsError::Inconsistent(format!(
                    "directory {} references missing inode {}",
                    parent, inode_no
                )))
            }
            other => other,
        }
    }
}

/// [`FlatFileSystem::read_dir`] 返回的迭代器
pub struct ReadDir<'a> {
    fs: &'a FlatFileSystem,
    parent: u64,
    entries: DirEntries,
}

impl Iterator for ReadDir<'_> {
    type Item = FsResult<(String, DiskInode)>;

    fn next(&mut self) -> Option<Self::Item> {
        let dir_entry = self.entries.next()?;
        Some(
            self.fs
                .resolve(self.parent, dir_entry.inode_no())
                .map(|disk_inode| (dir_entry.name(), disk_inode)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
