//! 超级块的读取与保存
//!
//! 挂载时读取块 0 并检查格式常量, 任何不匹配都直接拒绝 (fail closed).
//! 保存时整块覆盖块 0, 同步写回后才返回.

use std::sync::Arc;

use log::{debug, error};

use super::{BlockCache, BlockDevice, FsResult, SuperBlock, SUPER_BLOCK_ID};

pub fn load(block_device: &Arc<dyn BlockDevice>) -> FsResult<SuperBlock> {
    let cache = BlockCache::load(SUPER_BLOCK_ID, block_device)?;
    let super_block = cache.read(0, |super_block: &SuperBlock| *super_block);
    debug!("magic number found on disk: {:#x}", super_block.magic);
    if let Err(e) = super_block.validate() {
        error!("refusing to mount: {}", e);
        return Err(e);
    }
    Ok(super_block)
}

pub fn save(block_device: &Arc<dyn BlockDevice>, super_block: &SuperBlock) -> FsResult<()> {
    // 整块覆盖, 不需要先读出旧内容
    let mut cache = BlockCache::zeroed(SUPER_BLOCK_ID, block_device);
    cache.modify(0, |disk: &mut SuperBlock| *disk = *super_block);
    cache.sync()
}
