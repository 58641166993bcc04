//! inode 表: 位于块 1 的一个定长 [`DiskInode`] 数组
//!
//! 新的 inode 总是追加在下标为 inodes_count 的位置, 之后只会原地更新,
//! 既不删除也不移动, 所以在一次挂载期间 inode 的位置是固定的.
//! 查找返回的都是表项的副本.

use log::{debug, error};

use super::{
    super_block, BlockCache, DiskInode, FlatFileSystem, FsError, FsResult, INODE_SIZE,
    INODE_TABLE_BLOCK_ID, MAX_OBJECTS,
};

impl FlatFileSystem {
    /// 在 inode 表中追加一个 inode, 然后增加 inodes_count 并保存超级块
    ///
    /// 调用者需要事先检查对象数量是否已经达到上限.
    pub fn append_disk_inode(&mut self, disk_inode: &DiskInode) -> FsResult<()> {
        let slot = self.super_block.inodes_count as usize;
        debug_assert!(slot < MAX_OBJECTS);
        debug!("append inode {} at slot {}", disk_inode.inode_no, slot);

        let mut cache = BlockCache::load(INODE_TABLE_BLOCK_ID, &self.block_device)?;
        cache.modify(slot * INODE_SIZE, |slot: &mut DiskInode| *slot = *disk_inode);
        cache.sync()?;

        let mut super_block = self.super_block;
        super_block.inodes_count += 1;
        super_block::save(&self.block_device, &super_block)?;
        self.super_block = super_block;
        Ok(())
    }

    /// 在前 inodes_count 个表项中线性查找编号为 inode_no 的 inode
    pub fn get_disk_inode(&self, inode_no: u64) -> FsResult<DiskInode> {
        let cache = BlockCache::load(INODE_TABLE_BLOCK_ID, &self.block_device)?;
        self.find_slot(&cache, inode_no)
            .map(|slot| cache.read(slot * INODE_SIZE, |disk_inode: &DiskInode| *disk_inode))
            .ok_or_else(|| FsError::NotFound(format!("inode {}", inode_no)))
    }

    /// 原地更新一个已经存在的 inode
    pub fn update_disk_inode(&self, disk_inode: &DiskInode) -> FsResult<()> {
        let mut cache = BlockCache::load(INODE_TABLE_BLOCK_ID, &self.block_device)?;
        let Some(slot) = self.find_slot(&cache, disk_inode.inode_no) else {
            error!(
                "inode {} is missing from the inode table, update dropped",
                disk_inode.inode_no
            );
            return Err(FsError::Inconsistent(format!(
                "inode {} is not in the inode table",
                disk_inode.inode_no
            )));
        };
        cache.modify(slot * INODE_SIZE, |slot: &mut DiskInode| *slot = *disk_inode);
        cache.sync()
    }

    /// inode_no 所在的表项下标
    fn find_slot(&self, cache: &BlockCache, inode_no: u64) -> Option<usize> {
        let count = (self.super_block.inodes_count as usize).min(MAX_OBJECTS);
        (0..count).find(|&slot| {
            cache.read(slot * INODE_SIZE, |disk_inode: &DiskInode| {
                disk_inode.inode_no == inode_no
            })
        })
    }
}
