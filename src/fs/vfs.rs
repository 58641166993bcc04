//! FlatFileSystem 实现了磁盘布局并能够将磁盘块有效的管理起来。
//! 但是对于文件系统的使用者而言，他们往往不关心磁盘布局是如何实现的，而是更希望能够直接看到目录树结构中逻辑上的文件和目录。
//! 为此需要设计索引节点 Inode 暴露给文件系统的使用者，让他们能够直接对文件和目录进行操作。
//!
//! DiskInode 放在 inode 表中固定的位置，而 Inode 只是放在内存中的一个句柄: inode 编号 + 会话。
//!
//! 所有暴露给使用者的操作，全程均需持有 FlatFileSystem 的互斥锁 (一把全局锁)。
//! 引擎中的每一次 create 都是对超级块、inode 表和父目录块的 读-改-写，
//! 在同一把锁下它们被串行化，两个 create 不可能读到同一个 dir_children_count。

use std::sync::Arc;

use log::warn;
use spin::Mutex;

use super::{BlockDevice, DiskInode, DiskInodeType, FlatFileSystem, FsError, FsResult, FsStat};

pub struct Inode {
    inode_no: u64,
    fs: Arc<Mutex<FlatFileSystem>>,
}

impl Inode {
    pub fn new(inode_no: u64, fs: Arc<Mutex<FlatFileSystem>>) -> Self {
        Self { inode_no, fs }
    }

    /// 挂载块设备上的文件系统, 返回根目录
    pub fn mount(block_device: Arc<dyn BlockDevice>) -> FsResult<Self> {
        let fs = FlatFileSystem::mount(block_device)?;
        let root = fs.root_inode()?;
        Ok(Self::new(root.inode_no, Arc::new(Mutex::new(fs))))
    }

    pub fn inode_id(&self) -> u64 {
        self.inode_no
    }

    /// 从 inode 表中读出最新的 DiskInode
    pub fn stat(&self) -> FsResult<DiskInode> {
        let fs = self.fs.lock();
        fs.get_disk_inode(self.inode_no)
    }

    pub fn is_dir(&self) -> FsResult<bool> {
        Ok(self.stat()?.is_dir())
    }

    pub fn find(&self, name: &str) -> FsResult<Arc<Inode>> {
        let fs = self.fs.lock();
        let parent = fs.get_disk_inode(self.inode_no)?;
        let disk_inode = fs.lookup(&parent, name)?;
        Ok(Arc::new(Self::new(disk_inode.inode_no, self.fs.clone())))
    }

    /// 在目录下创建一个普通文件
    pub fn create(&self, name: &str, perm: u32) -> FsResult<Arc<Inode>> {
        self.create_kind(name, DiskInodeType::File, perm)
    }

    /// 在目录下创建一个子目录
    pub fn mkdir(&self, name: &str, perm: u32) -> FsResult<Arc<Inode>> {
        self.create_kind(name, DiskInodeType::Directory, perm)
    }

    /// 引擎不检查重名, 和操作系统的 VFS 一样在创建之前先查找一次
    pub fn create_kind(&self, name: &str, kind: DiskInodeType, perm: u32) -> FsResult<Arc<Inode>> {
        let mut fs = self.fs.lock();
        let parent = fs.get_disk_inode(self.inode_no)?;
        match fs.lookup(&parent, name) {
            Ok(_) => {
                warn!("file {} already exists", name);
                return Err(FsError::Exists(name.to_string()));
            }
            Err(FsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let disk_inode = fs.create(&parent, name, kind.mode(perm))?;
        Ok(Arc::new(Self::new(disk_inode.inode_no, self.fs.clone())))
    }

    /// 收集目录下所有目录项的 (名字, inode 编号)
    pub fn ls(&self) -> FsResult<Vec<(String, u64)>> {
        let fs = self.fs.lock();
        let parent = fs.get_disk_inode(self.inode_no)?;
        let entries = fs
            .read_dir(&parent)?
            .map(|entry| entry.map(|(name, disk_inode)| (name, disk_inode.inode_no)))
            .collect();
        entries
    }

    pub fn statfs(&self) -> FsStat {
        self.fs.lock().statfs()
    }

    /// 卸载文件系统; 其他句柄还在使用时只释放这一个句柄
    pub fn unmount(self) {
        if let Ok(fs) = Arc::try_unwrap(self.fs) {
            fs.into_inner().unmount();
        }
    }
}
