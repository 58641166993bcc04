use std::{
    fs::{read_dir, OpenOptions},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use clap::{value_parser, Arg, ArgMatches, Command};
use log::{info, warn};

use fs::{
    BlockDevice, DiskInode, ErrorKind, FlatFileSystem, FsError, FsResult, Inode, BLOCK_COUNT,
    BLOCK_SIZE,
};

mod device;
mod fs;
mod logging;
#[cfg(test)]
mod test;

use device::BlockFile;

fn main() -> ExitCode {
    logging::init();
    match run(cli().get_matches()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("flatfs: {}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn cli() -> Command {
    let image = Arg::new("image")
        .short('i')
        .long("image")
        .value_name("IMAGE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Filesystem image file");
    let path = |help: &'static str| Arg::new("path").value_name("PATH").help(help);
    let mode = |default: &'static str| {
        Arg::new("mode")
            .short('m')
            .long("mode")
            .default_value(default)
            .value_parser(parse_mode)
            .help("Permission bits, in octal")
    };

    Command::new("flatfs")
        .about("Create and inspect flat-fs images")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("mkfs")
                .about("Create (or reuse) an image file and format it")
                .arg(image.clone()),
        )
        .subcommand(
            Command::new("ls")
                .about("List a directory")
                .arg(image.clone())
                .arg(path("Directory to list, defaults to the root")),
        )
        .subcommand(
            Command::new("touch")
                .about("Create an empty regular file")
                .arg(image.clone())
                .arg(path("File to create").required(true))
                .arg(mode("644")),
        )
        .subcommand(
            Command::new("mkdir")
                .about("Create a directory")
                .arg(image.clone())
                .arg(path("Directory to create").required(true))
                .arg(mode("755")),
        )
        .subcommand(
            Command::new("stat")
                .about("Show an inode, or the filesystem summary without PATH")
                .arg(image.clone())
                .arg(path("Object to inspect")),
        )
        .subcommand(
            Command::new("pack")
                .about("Create one empty file per entry of a host directory")
                .arg(image)
                .arg(
                    Arg::new("source")
                        .short('s')
                        .long("source")
                        .value_name("DIR")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Host directory whose file names are copied"),
                ),
        )
}

fn parse_mode(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| format!("{:?} is not an octal permission mode", s))
}

fn run(matches: ArgMatches) -> FsResult<()> {
    let (name, sub) = match matches.subcommand() {
        Some(pair) => pair,
        None => return Ok(()),
    };
    let image = sub
        .get_one::<PathBuf>("image")
        .ok_or_else(|| FsError::InvalidName("missing --image".into()))?;

    match name {
        "mkfs" => mkfs(image),
        "ls" => with_root(image, |root| {
            let path = path_arg(sub).unwrap_or("/");
            let target = resolve(root, path)?;
            if !target.is_dir()? {
                println!("{:>4} {}", target.inode_id(), path);
                return Ok(());
            }
            for (name, inode_id) in target.ls()? {
                println!("{:>4} {}", inode_id, name);
            }
            Ok(())
        }),
        "touch" | "mkdir" => with_root(image, |root| {
            let mode = sub.get_one::<u32>("mode").copied().unwrap_or(0o644);
            let (parent, leaf) = split_parent(path_arg(sub).unwrap_or_default())?;
            let parent = resolve(root, parent)?;
            let inode = if name == "touch" {
                parent.create(leaf, mode)?
            } else {
                parent.mkdir(leaf, mode)?
            };
            println!("{}", inode.inode_id());
            Ok(())
        }),
        "stat" => with_root(image, |root| {
            match path_arg(sub) {
                Some(path) => print_stat(&resolve(root, path)?.stat()?),
                None => println!("{:#?}", root.statfs()),
            }
            Ok(())
        }),
        "pack" => {
            let source = sub
                .get_one::<PathBuf>("source")
                .ok_or_else(|| FsError::InvalidName("missing --source".into()))?;
            with_root(image, |root| pack(root, source))
        }
        _ => Ok(()),
    }
}

/// PATH 只在 ls / touch / mkdir / stat 中定义
fn path_arg(sub: &ArgMatches) -> Option<&str> {
    sub.get_one::<String>("path").map(String::as_str)
}

/// 进程退出码: 错误对应的 errno
fn exit_status(e: &FsError) -> u8 {
    e.to_errno().clamp(1, 255) as u8
}

fn open_image(image: &Path) -> FsResult<Arc<dyn BlockDevice>> {
    let file = OpenOptions::new().read(true).write(true).open(image)?;
    Ok(Arc::new(BlockFile::new(file)))
}

fn mount(image: &Path) -> FsResult<Arc<Inode>> {
    Ok(Arc::new(Inode::mount(open_image(image)?)?))
}

/// 挂载, 执行 f, 然后卸载; 在 f 中得到的句柄都已经释放
fn with_root<F>(image: &Path, f: F) -> FsResult<()>
where
    F: FnOnce(&Arc<Inode>) -> FsResult<()>,
{
    let root = mount(image)?;
    let result = f(&root);
    if let Ok(root) = Arc::try_unwrap(root) {
        root.unmount();
    }
    result
}

fn print_stat(disk_inode: &DiskInode) {
    let kind = if disk_inode.is_dir() {
        "directory"
    } else if disk_inode.is_file() {
        "regular file"
    } else {
        "unknown"
    };
    println!("  Inode: {}", disk_inode.inode_no);
    println!("   Type: {}", kind);
    println!("   Mode: {:04o}", disk_inode.permissions());
    println!("  Block: {}", disk_inode.data_block_number);
    if disk_inode.is_dir() {
        println!("Entries: {}", disk_inode.dir_children_count);
    } else {
        println!("   Size: {}", disk_inode.file_size);
    }
}

fn mkfs(image: &Path) -> FsResult<()> {
    // 创建虚拟块设备, 容量至少为 BLOCK_COUNT 个块
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(image)?;
    let size = (BLOCK_COUNT * BLOCK_SIZE) as u64;
    if file.metadata()?.len() < size {
        file.set_len(size)?;
    }
    FlatFileSystem::format(Arc::new(BlockFile::new(file)))?;
    info!("formatted {}", image.display());
    Ok(())
}

/// 逐级查找一个以 '/' 分隔的路径, 每一级都是一次目录内查找
fn resolve(root: &Arc<Inode>, path: &str) -> FsResult<Arc<Inode>> {
    let mut current = Arc::clone(root);
    for name in path.split('/').filter(|name| !name.is_empty()) {
        current = current.find(name)?;
    }
    Ok(current)
}

/// 把路径拆成 父目录 + 最后一级名字
fn split_parent(path: &str) -> FsResult<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (parent, leaf) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if leaf.is_empty() {
        return Err(FsError::InvalidName(path.to_string()));
    }
    Ok((parent, leaf))
}

/// 读取 host 目录下的所有文件名, 在根目录下各创建一个空文件
fn pack(root: &Inode, source: &Path) -> FsResult<()> {
    let mut names = read_dir(source)?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();

    for name in names {
        match root.create(&name, 0o644) {
            Ok(inode) => println!("{:>4} {}", inode.inode_id(), name),
            Err(e) if e.kind() == ErrorKind::Validation => warn!("skipping {}: {}", name, e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
