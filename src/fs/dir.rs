//! 目录管理: 每个目录独占一个数据块, 块中是一个 [`DirEntry`] 数组,
//! 前 dir_children_count 个目录项有效.
//!
//! 目录项只会追加在末尾, 查找是线性扫描, 第一个名字完全相同的目录项胜出.
//! 目录内名字的唯一性由上层保证, 这里不做检查.

use log::{debug, warn};

use super::{
    layout::validate_name, BlockCache, DirEntry, DiskInode, FlatFileSystem, FsError, FsResult,
    BLOCK_COUNT, DIRENTS_PER_BLOCK, DIRENT_SIZE, RESERVED_BLOCKS,
};

impl FlatFileSystem {
    /// 在目录 parent 的末尾添加一个目录项, 然后增加并保存 parent 的 dir_children_count
    ///
    /// 成功后 parent 会被更新为磁盘上的新值.
    pub fn append_dir_entry(
        &mut self,
        parent: &mut DiskInode,
        name: &str,
        inode_no: u64,
    ) -> FsResult<()> {
        // 任何写入之前先检查
        validate_name(name)?;
        check_room(parent)?;

        let file_count = parent.dir_children_count as usize;
        let mut cache = BlockCache::load(data_block_of(parent)?, &self.block_device)?;
        cache.modify(file_count * DIRENT_SIZE, |dir_entry: &mut DirEntry| {
            *dir_entry = DirEntry::new(name, inode_no)
        });
        cache.sync()?;

        let mut updated = *parent;
        updated.dir_children_count += 1;
        self.update_disk_inode(&updated)?;
        *parent = updated;
        debug!(
            "dir {}: added {:?} -> inode {} at slot {}",
            parent.inode_no, name, inode_no, file_count
        );
        Ok(())
    }

    /// 根据名称在目录 parent 下查找 inode 编号
    pub fn find_inode_id(&self, parent: &DiskInode, name: &str) -> FsResult<u64> {
        self.dir_entries(parent)?
            .find(|dir_entry| dir_entry.name_bytes() == name.as_bytes())
            .map(|dir_entry| dir_entry.inode_no())
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// 列出目录 parent 下的所有目录项
    ///
    /// 每次调用都会重新读取目录块, 从第一个目录项开始.
    pub fn dir_entries(&self, parent: &DiskInode) -> FsResult<DirEntries> {
        if !parent.is_dir() {
            return Err(FsError::NotDirectory(parent.inode_no));
        }
        let count = parent.dir_children_count as usize;
        if count > DIRENTS_PER_BLOCK {
            warn!(
                "dir {} claims {} children, more than a block can hold",
                parent.inode_no, count
            );
            return Err(FsError::Inconsistent(format!(
                "directory inode {} has {} children (limit {})",
                parent.inode_no, count, DIRENTS_PER_BLOCK
            )));
        }
        let cache = BlockCache::load(data_block_of(parent)?, &self.block_device)?;
        Ok(DirEntries {
            cache,
            next: 0,
            count,
        })
    }
}

/// parent 必须是目录, 数据块合法, 并且还有空位
pub(super) fn check_room(parent: &DiskInode) -> FsResult<()> {
    if !parent.is_dir() {
        return Err(FsError::NotDirectory(parent.inode_no));
    }
    data_block_of(parent)?;
    if parent.dir_children_count as usize >= DIRENTS_PER_BLOCK {
        return Err(FsError::DirectoryFull(parent.inode_no));
    }
    Ok(())
}

/// 目录的数据块号必须落在数据区之内, 否则 inode 已经损坏
fn data_block_of(dir: &DiskInode) -> FsResult<usize> {
    let block_id = dir.data_block_number;
    if block_id < RESERVED_BLOCKS as u64 || block_id >= BLOCK_COUNT as u64 {
        warn!(
            "dir {} points at data block {}, outside of the data area",
            dir.inode_no, block_id
        );
        return Err(FsError::Inconsistent(format!(
            "directory inode {} has data block {} (valid range {}..{})",
            dir.inode_no, block_id, RESERVED_BLOCKS, BLOCK_COUNT
        )));
    }
    Ok(block_id as usize)
}

/// 目录项迭代器, 持有目录块的一份拷贝, 按需复制出每个目录项
pub struct DirEntries {
    cache: BlockCache,
    next: usize,
    count: usize,
}

impl Iterator for DirEntries {
    type Item = DirEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let dir_entry = self
            .cache
            .read(self.next * DIRENT_SIZE, |dir_entry: &DirEntry| *dir_entry);
        self.next += 1;
        Some(dir_entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for DirEntries {}
