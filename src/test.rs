#![allow(unused)]
use super::device;
use super::fs;
use device::{BlockFile, MemDisk};
use fs::{
    BlockDevice, DiskInode, DiskInodeType, ErrorKind, FlatFileSystem, FsError, FsResult, Inode,
    BLOCK_COUNT, BLOCK_SIZE, DIRENTS_PER_BLOCK, DIRENT_SIZE, FLAT_FS_MAGIC, INODE_TABLE_BLOCK_ID,
    MAX_OBJECTS, NAME_LENGTH_LIMIT, ROOT_DATA_BLOCK_ID, ROOT_INODE_ID, SUPER_BLOCK_ID,
};
use rand::{distributions::Alphanumeric, Rng};
use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const FILE: u32 = 0o100644;
const DIR: u32 = 0o040755;

// 超级块中各字段的偏移
const MAGIC_OFFSET: usize = 0;
const BLOCK_SIZE_OFFSET: usize = 16;
const INODES_COUNT_OFFSET: usize = 24;
const FREE_BLOCKS_OFFSET: usize = 32;

/// 格式化一块内存磁盘并挂载
fn new_fs() -> (Arc<MemDisk>, FlatFileSystem) {
    let disk = Arc::new(MemDisk::new(BLOCK_COUNT));
    FlatFileSystem::format(disk.clone()).unwrap();
    let fs = FlatFileSystem::mount(disk.clone()).unwrap();
    (disk, fs)
}

/// 超级块和 inode 表的原始字节
fn metadata_bytes(disk: &MemDisk) -> Vec<u8> {
    disk.snapshot()[..2 * BLOCK_SIZE].to_vec()
}

fn names(fs: &FlatFileSystem, dir: &DiskInode) -> Vec<(String, u64)> {
    fs.read_dir(dir)
        .unwrap()
        .map(|entry| {
            let (name, disk_inode) = entry.unwrap();
            (name, disk_inode.inode_no)
        })
        .collect()
}

/// 可以让写操作失败的磁盘
struct FlakyDisk {
    inner: MemDisk,
    fail_writes: AtomicBool,
}

impl FlakyDisk {
    fn new() -> Self {
        Self {
            inner: MemDisk::new(BLOCK_COUNT),
            fail_writes: AtomicBool::new(false),
        }
    }
}

impl BlockDevice for FlakyDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> FsResult<()> {
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> FsResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        self.inner.write_block(block_id, buf)
    }

    fn num_blocks(&self) -> usize {
        self.inner.num_blocks()
    }
}

#[test]
fn create_lookup_and_list_walkthrough() {
    let (_disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    assert_eq!(root.inode_no, ROOT_INODE_ID);
    assert!(root.is_dir());

    let a = fs.create(&root, "a.txt", FILE).unwrap();
    assert_eq!(a.inode_no, 2);
    assert!(a.is_file());
    let docs = fs.create(&root, "docs", DIR).unwrap();
    assert_eq!(docs.inode_no, 3);
    assert!(docs.is_dir());

    assert_eq!(fs.lookup(&root, "a.txt").unwrap().inode_no, 2);
    assert_eq!(
        names(&fs, &root),
        vec![("a.txt".to_string(), 2), ("docs".to_string(), 3)]
    );
}

#[test]
fn mount_rejects_bad_magic() {
    let (disk, _fs) = new_fs();
    disk.poke(SUPER_BLOCK_ID, MAGIC_OFFSET, &0xdead_beef_u64.to_ne_bytes());
    match FlatFileSystem::mount(disk.clone()) {
        Err(e @ FsError::Format(_)) => assert_eq!(e.kind(), ErrorKind::Format),
        Err(e) => panic!("unexpected error {:?}", e),
        Ok(_) => panic!("mounted a filesystem with a bad magic number"),
    }
    assert!(Inode::mount(disk).is_err());
}

#[test]
fn mount_rejects_bad_block_size() {
    let (disk, _fs) = new_fs();
    disk.poke(SUPER_BLOCK_ID, BLOCK_SIZE_OFFSET, &512u64.to_ne_bytes());
    assert!(matches!(
        FlatFileSystem::mount(disk),
        Err(FsError::Format(_))
    ));
}

#[test]
fn mount_rejects_unformatted_device() {
    let disk = Arc::new(MemDisk::new(BLOCK_COUNT));
    assert!(matches!(
        FlatFileSystem::mount(disk),
        Err(FsError::Format(_))
    ));
}

#[test]
fn mount_rejects_corrupt_counts_and_reserved_bits() {
    let (disk, _fs) = new_fs();
    disk.poke(
        SUPER_BLOCK_ID,
        INODES_COUNT_OFFSET,
        &(MAX_OBJECTS as u64 + 1).to_ne_bytes(),
    );
    assert!(matches!(
        FlatFileSystem::mount(disk.clone()),
        Err(FsError::Format(_))
    ));

    let (disk, _fs) = new_fs();
    disk.poke(SUPER_BLOCK_ID, FREE_BLOCKS_OFFSET, &u64::MAX.to_ne_bytes());
    assert!(matches!(
        FlatFileSystem::mount(disk),
        Err(FsError::Format(_))
    ));
}

#[test]
fn mount_fails_without_root_inode() {
    let (disk, _fs) = new_fs();
    // 表中没有任何 inode, 根目录也就找不到了
    disk.poke(SUPER_BLOCK_ID, INODES_COUNT_OFFSET, &0u64.to_ne_bytes());
    assert!(matches!(
        FlatFileSystem::mount(disk),
        Err(FsError::Format(_))
    ));
}

#[test]
fn format_needs_enough_blocks() {
    let disk = Arc::new(MemDisk::new(BLOCK_COUNT - 1));
    let err = FlatFileSystem::format(disk).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);
}

#[test]
fn alloc_data_is_ascending_first_fit_until_no_space() {
    let (disk, mut fs) = new_fs();
    let mut last = ROOT_DATA_BLOCK_ID as u64;
    for _ in 0..BLOCK_COUNT - 3 {
        let block_id = fs.alloc_data().unwrap();
        assert!(block_id > last);
        last = block_id;
        // 分配结果在返回之前已经写回
        let remounted = FlatFileSystem::mount(disk.clone()).unwrap();
        assert_eq!(remounted.super_block(), fs.super_block());
    }
    assert_eq!(last, BLOCK_COUNT as u64 - 1);

    let before = disk.snapshot();
    assert!(matches!(fs.alloc_data(), Err(FsError::NoSpace)));
    assert!(matches!(fs.alloc_data(), Err(FsError::NoSpace)));
    assert_eq!(disk.snapshot(), before);
    assert_eq!(fs.statfs().free_blocks, 0);
}

#[test]
fn create_then_lookup_random_names() {
    let (_disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    let mut rng = rand::thread_rng();
    let mut created = Vec::new();
    for i in 0..40 {
        let len = rng.gen_range(1..=NAME_LENGTH_LIMIT - 3);
        let suffix: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        let name = format!("{:02}{}", i, suffix);
        let mode = if rng.gen_bool(0.5) { FILE } else { DIR };
        let disk_inode = fs.create(&root, &name, mode).unwrap();
        created.push((name, disk_inode));
    }
    for (name, disk_inode) in &created {
        assert_eq!(&fs.lookup(&root, name).unwrap(), disk_inode);
    }
    let listed: Vec<_> = names(&fs, &root);
    let expected: Vec<_> = created
        .iter()
        .map(|(name, disk_inode)| (name.clone(), disk_inode.inode_no))
        .collect();
    assert_eq!(listed, expected);
}

#[test]
fn read_dir_restarts_from_the_beginning() {
    let (_disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    for i in 0..5 {
        fs.create(&root, &format!("file{}", i), FILE).unwrap();
    }
    let mut first = fs.read_dir(&root).unwrap();
    assert_eq!(first.size_hint(), (5, Some(5)));
    let (name, _) = first.next().unwrap().unwrap();
    assert_eq!(name, "file0");
    drop(first);

    let all = names(&fs, &root);
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].0, "file0");
    assert_eq!(all[4], ("file4".to_string(), 6));
}

#[test]
fn lookup_miss_has_no_side_effects() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    fs.create(&root, "present", FILE).unwrap();
    let before = metadata_bytes(&disk);
    for _ in 0..3 {
        let err = fs.lookup(&root, "absent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    assert_eq!(metadata_bytes(&disk), before);
}

#[test]
fn object_limit_is_enforced() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    // 根目录只有 64 个目录项, 所以一部分对象放到子目录中
    let sub = fs.create(&root, "d", DIR).unwrap();
    let mut created = 1;
    for i in 0..DIRENTS_PER_BLOCK {
        fs.create(&sub, &format!("f{}", i), FILE).unwrap();
        created += 1;
    }
    while fs.super_block().inodes_count < MAX_OBJECTS as u64 {
        fs.create(&root, &format!("r{}", created), FILE).unwrap();
        created += 1;
    }
    assert_eq!(created, MAX_OBJECTS - 1);
    assert_eq!(fs.statfs().objects, MAX_OBJECTS);

    let before = metadata_bytes(&disk);
    let err = fs.create(&root, "one-too-many", FILE).unwrap_err();
    assert!(matches!(err, FsError::TooManyObjects(MAX_OBJECTS)));
    assert_eq!(err.kind(), ErrorKind::Capacity);
    assert_eq!(fs.super_block().inodes_count, MAX_OBJECTS as u64);
    // 名字的检查先于对象数量的检查
    let err = fs.create(&root, "bad/name", FILE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(metadata_bytes(&disk), before);
}

#[test]
fn full_directory_is_rejected_before_allocation() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    for i in 0..DIRENTS_PER_BLOCK {
        fs.create(&root, &format!("f{}", i), FILE).unwrap();
    }
    let before = disk.snapshot();
    let err = fs.create(&root, "overflow", FILE).unwrap_err();
    assert!(matches!(err, FsError::DirectoryFull(ROOT_INODE_ID)));
    assert_eq!(err.kind(), ErrorKind::Capacity);
    assert_eq!(disk.snapshot(), before);
}

#[test]
fn invalid_requests_change_nothing() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    let file = fs.create(&root, "plain", FILE).unwrap();
    let before = disk.snapshot();

    // 符号链接不是文件也不是目录
    let err = fs.create(&root, "link", 0o120777).unwrap_err();
    assert!(matches!(err, FsError::InvalidKind(0o120777)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let long = "n".repeat(NAME_LENGTH_LIMIT + 1);
    let err = fs.create(&root, &long, FILE).unwrap_err();
    assert!(matches!(err, FsError::NameTooLong { .. }));
    assert_eq!(err.to_errno(), libc::ENAMETOOLONG);

    assert!(matches!(
        fs.create(&root, "a/b", FILE),
        Err(FsError::InvalidName(_))
    ));
    assert!(matches!(
        fs.create(&file, "child", FILE),
        Err(FsError::NotDirectory(_))
    ));
    assert!(matches!(fs.read_dir(&file), Err(FsError::NotDirectory(_))));

    assert_eq!(disk.snapshot(), before);
}

#[test]
fn longest_name_fits() {
    let (_disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    let name = "x".repeat(NAME_LENGTH_LIMIT);
    let disk_inode = fs.create(&root, &name, FILE).unwrap();
    assert_eq!(fs.lookup(&root, &name).unwrap(), disk_inode);
    assert_eq!(names(&fs, &root), vec![(name, disk_inode.inode_no)]);
}

#[test]
fn nested_directories_have_their_own_entries() {
    let (_disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    let docs = fs.create(&root, "docs", DIR).unwrap();
    let readme = fs.create(&docs, "readme", FILE).unwrap();
    let inner = fs.create(&docs, "inner", DIR).unwrap();
    fs.create(&inner, "deep", FILE).unwrap();

    assert_eq!(names(&fs, &root), vec![("docs".to_string(), docs.inode_no)]);
    assert_eq!(
        names(&fs, &docs),
        vec![
            ("readme".to_string(), readme.inode_no),
            ("inner".to_string(), inner.inode_no)
        ]
    );
    assert!(matches!(
        fs.lookup(&root, "readme"),
        Err(FsError::NotFound(_))
    ));
    assert_eq!(fs.lookup(&docs, "readme").unwrap(), readme);

    // 每个对象独占一个数据块
    let blocks = [docs, readme, inner].map(|d| d.data_block_number);
    assert_eq!(blocks, [3, 4, 5]);
    assert_eq!(fs.get_disk_inode(docs.inode_no).unwrap().dir_children_count, 2);
}

#[test]
fn stale_parent_copy_does_not_overwrite_entries() {
    let (_disk, mut fs) = new_fs();
    let stale_root = fs.root_inode().unwrap();
    fs.create(&stale_root, "first", FILE).unwrap();
    fs.create(&stale_root, "second", FILE).unwrap();
    assert_eq!(stale_root.dir_children_count, 0);
    assert_eq!(
        names(&fs, &stale_root),
        vec![("first".to_string(), 2), ("second".to_string(), 3)]
    );
}

#[test]
fn engine_does_not_enforce_unique_names() {
    let (_disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    let first = fs.create(&root, "dup", FILE).unwrap();
    let second = fs.create(&root, "dup", DIR).unwrap();
    assert_ne!(first.inode_no, second.inode_no);
    // 第一个匹配的目录项胜出
    assert_eq!(fs.lookup(&root, "dup").unwrap(), first);
    assert_eq!(names(&fs, &root).len(), 2);
}

#[test]
fn everything_survives_remount() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    let docs = fs.create(&root, "docs", DIR).unwrap();
    fs.create(&docs, "notes", FILE).unwrap();
    let super_block = *fs.super_block();
    fs.unmount();

    let fs = FlatFileSystem::mount(disk).unwrap();
    assert_eq!(*fs.super_block(), super_block);
    let root = fs.root_inode().unwrap();
    assert_eq!(root.dir_children_count, 1);
    let docs = fs.lookup(&root, "docs").unwrap();
    assert_eq!(fs.lookup(&docs, "notes").unwrap().inode_no, 3);
}

#[test]
fn dangling_entry_is_inconsistent() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    fs.create(&root, "a.txt", FILE).unwrap();
    // 把目录项指向一个不存在的 inode
    disk.poke(ROOT_DATA_BLOCK_ID, DIRENT_SIZE - 8, &99u64.to_ne_bytes());

    let err = fs.lookup(&root, "a.txt").unwrap_err();
    assert!(matches!(err, FsError::Inconsistent(_)));
    assert_eq!(err.kind(), ErrorKind::Inconsistent);

    let mut entries = fs.read_dir(&root).unwrap();
    assert!(matches!(entries.next(), Some(Err(FsError::Inconsistent(_)))));
    assert!(entries.next().is_none());
}

#[test]
fn inode_table_find_and_update() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    let a = fs.create(&root, "a", FILE).unwrap();

    let mut changed = a;
    changed.file_size = 1234;
    fs.update_disk_inode(&changed).unwrap();
    assert_eq!(fs.get_disk_inode(a.inode_no).unwrap().file_size, 1234);

    let ghost = DiskInode::new(77, FILE, 9);
    assert!(matches!(
        fs.update_disk_inode(&ghost),
        Err(FsError::Inconsistent(_))
    ));
    assert!(matches!(fs.get_disk_inode(77), Err(FsError::NotFound(_))));

    // 新的 inode 放在下标为 inodes_count 的位置
    let before = fs.super_block().inodes_count;
    let appended = DiskInode::new(before + 1, FILE, 42);
    fs.append_disk_inode(&appended).unwrap();
    assert_eq!(fs.super_block().inodes_count, before + 1);
    let table = disk.snapshot();
    let slot = INODE_TABLE_BLOCK_ID * BLOCK_SIZE + before as usize * 32;
    assert_eq!(
        u64::from_ne_bytes(table[slot + 8..slot + 16].try_into().unwrap()),
        before + 1
    );
}

#[test]
fn failed_persist_leaves_mirror_unchanged() {
    let disk = Arc::new(FlakyDisk::new());
    FlatFileSystem::format(disk.clone()).unwrap();
    let mut fs = FlatFileSystem::mount(disk.clone()).unwrap();
    let root = fs.root_inode().unwrap();
    let super_block = *fs.super_block();

    disk.fail_writes.store(true, Ordering::SeqCst);
    let err = fs.alloc_data().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(*fs.super_block(), super_block);
    let err = fs.create(&root, "a.txt", FILE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(*fs.super_block(), super_block);

    disk.fail_writes.store(false, Ordering::SeqCst);
    let a = fs.create(&root, "a.txt", FILE).unwrap();
    assert_eq!(a.inode_no, 2);
    assert_eq!(a.data_block_number, 3);
}

#[test]
fn short_buffers_are_rejected() {
    let disk = MemDisk::new(4);
    let mut buf = [0u8; 16];
    assert!(matches!(
        disk.read_block(0, &mut buf),
        Err(FsError::ShortTransfer { got: 16, .. })
    ));
    let block = [0u8; BLOCK_SIZE];
    assert_eq!(disk.write_block(9, &block).unwrap_err().kind(), ErrorKind::Io);
}

#[test]
fn vfs_create_mkdir_find_ls() {
    let disk = Arc::new(MemDisk::new(BLOCK_COUNT));
    FlatFileSystem::format(disk.clone()).unwrap();
    let root = Inode::mount(disk).unwrap();
    assert_eq!(root.inode_id(), ROOT_INODE_ID);
    assert!(root.is_dir().unwrap());

    let filea = root.create("filea", 0o600).unwrap();
    let dir = root.mkdir("dir", 0o700).unwrap();
    assert_eq!(filea.stat().unwrap().permissions(), 0o600);
    assert!(!filea.is_dir().unwrap());
    assert!(dir.is_dir().unwrap());

    let fileb = dir.create("fileb", 0o644).unwrap();
    assert_eq!(dir.find("fileb").unwrap().inode_id(), fileb.inode_id());
    assert_eq!(
        root.ls().unwrap(),
        vec![("filea".to_string(), 2), ("dir".to_string(), 3)]
    );

    assert!(matches!(root.create("filea", 0o644), Err(FsError::Exists(_))));
    assert!(matches!(root.mkdir("dir", 0o755), Err(FsError::Exists(_))));
    assert!(matches!(root.find("nope"), Err(FsError::NotFound(_))));
    assert!(matches!(filea.ls(), Err(FsError::NotDirectory(_))));

    let stat = root.statfs();
    assert_eq!(stat.objects, 4);
    assert_eq!(stat.free_blocks, BLOCK_COUNT - 3 - 3);
    root.unmount();
}

#[test]
fn concurrent_creates_never_lose_entries() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 15;

    let disk = Arc::new(MemDisk::new(BLOCK_COUNT));
    FlatFileSystem::format(disk.clone()).unwrap();
    let root = Arc::new(Inode::mount(disk.clone()).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let root = Arc::clone(&root);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    root.create(&format!("t{}-{}", t, i), 0o644).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut listed = root.ls().unwrap();
    assert_eq!(listed.len(), THREADS * PER_THREAD);
    listed.sort_by_key(|(_, inode_id)| *inode_id);
    let ids: Vec<u64> = listed.iter().map(|(_, inode_id)| *inode_id).collect();
    assert_eq!(ids, (2..2 + (THREADS * PER_THREAD) as u64).collect::<Vec<_>>());
    for t in 0..THREADS {
        for i in 0..PER_THREAD {
            root.find(&format!("t{}-{}", t, i)).unwrap();
        }
    }

    let fs = FlatFileSystem::mount(disk).unwrap();
    assert_eq!(
        fs.super_block().inodes_count,
        1 + (THREADS * PER_THREAD) as u64
    );
}

#[test]
fn block_file_round_trip() -> FsResult<()> {
    let path = std::env::temp_dir().join(format!("flatfs-test-{}.img", std::process::id()));
    let open = || -> FsResult<Arc<BlockFile>> {
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        f.set_len((BLOCK_COUNT * BLOCK_SIZE) as u64)?;
        Ok(Arc::new(BlockFile::new(f)))
    };

    let block_file = open()?;
    assert_eq!(block_file.num_blocks(), BLOCK_COUNT);
    FlatFileSystem::format(block_file.clone())?;
    {
        let mut fs = FlatFileSystem::mount(block_file)?;
        let root = fs.root_inode()?;
        fs.create(&root, "filea", FILE)?;
        fs.create(&root, "fileb", FILE)?;
        fs.unmount();
    }

    let fs = FlatFileSystem::mount(open()?)?;
    let root = fs.root_inode()?;
    assert_eq!(fs.lookup(&root, "fileb")?.inode_no, 3);
    assert_eq!(names(&fs, &root).len(), 2);

    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn errors_map_to_errno() {
    assert_eq!(FsError::NoSpace.to_errno(), libc::ENOSPC);
    assert_eq!(FsError::TooManyObjects(MAX_OBJECTS).to_errno(), libc::ENOSPC);
    assert_eq!(FsError::NotFound("x".into()).to_errno(), libc::ENOENT);
    assert_eq!(FsError::Exists("x".into()).to_errno(), libc::EEXIST);
    assert_eq!(FsError::NotDirectory(2).to_errno(), libc::ENOTDIR);
    assert_eq!(FsError::InvalidKind(0).to_errno(), libc::EINVAL);
    assert_eq!(FsError::Format("bad".into()).kind(), ErrorKind::Format);
    assert_eq!(FsError::Inconsistent("bad".into()).to_errno(), libc::EIO);
}

#[test]
fn corrupt_directory_block_number_is_inconsistent() {
    let (disk, mut fs) = new_fs();
    let root = fs.root_inode().unwrap();
    fs.create(&root, "a.txt", FILE).unwrap();
    // 根目录 inode 的 data_block_number 指到设备之外
    disk.poke(INODE_TABLE_BLOCK_ID, 16, &u64::MAX.to_ne_bytes());
    let before = disk.snapshot();

    let root = fs.root_inode().unwrap();
    let err = fs.lookup(&root, "a.txt").unwrap_err();
    assert!(matches!(err, FsError::Inconsistent(_)));
    assert!(matches!(fs.read_dir(&root), Err(FsError::Inconsistent(_))));
    assert!(matches!(
        fs.create(&root, "b.txt", FILE),
        Err(FsError::Inconsistent(_))
    ));
    assert_eq!(disk.snapshot(), before);
    // 块 1 同样不属于数据区
    disk.poke(INODE_TABLE_BLOCK_ID, 16, &1u64.to_ne_bytes());
    assert!(matches!(
        fs.lookup(&root, "a.txt"),
        Err(FsError::Inconsistent(_))
    ));
    assert_eq!(fs.super_block().inodes_count, 2);
}

#[test]
fn block_file_rejects_unaddressable_blocks() {
    let path = std::env::temp_dir().join(format!("flatfs-far-{}.img", std::process::id()));
    let f = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    f.set_len(BLOCK_SIZE as u64).unwrap();
    let block_file = BlockFile::new(f);

    let mut buf = [0u8; BLOCK_SIZE];
    let err = block_file.read_block(usize::MAX, &mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    let err = block_file.write_block(usize::MAX / 2, &buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    block_file.read_block(0, &mut buf).unwrap();

    std::fs::remove_file(&path).unwrap();
}
