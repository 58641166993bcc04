//! 空闲块位图
//!
//! 位图保存在超级块的 free_blocks 字段中, 每个 bit 代表一个块的分配状态:
//! 1 意味着空闲, 0 意味着已经分配出去 (或者是永久保留的块 0 和块 1).
//!
//! 分配采用确定的首次适配: 从低位到高位找到第一个为 1 的 bit, 把它清零并返回它的位置.
//! 位图本身只在内存中修改, 由调用者负责把超级块持久化.

/// 位图描述的是 [start, end) 这段可分配的块编号
pub struct Bitmap {
    /// 第一个可分配的块
    start: usize,
    /// 最后一个可分配的块 + 1
    end: usize,
}

impl Bitmap {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// 在位图中分配一个空闲块
    ///
    /// 以 bit 组(每组 64 bits)为单位进行遍历,
    /// 屏蔽掉范围之外的 bit 之后找到第一个不为 0 的组,
    /// 再通过 u64::trailing_zeros 找到组内最低的一个 1 .
    ///
    /// 如果所有bit均已经被分配出去了, 则返回 None , 此时位图不会被修改.
    pub fn alloc(&self, bits: &mut [u64]) -> Option<usize> {
        let (bits64_pos, inner_pos) = bits
            .iter()
            .enumerate()
            .map(|(bits64_pos, bits64)| (bits64_pos, *bits64 & self.group_mask(bits64_pos)))
            .find(|(_, bits64)| *bits64 != 0)
            .map(|(bits64_pos, bits64)| (bits64_pos, bits64.trailing_zeros() as usize))?;
        bits[bits64_pos] &= !(1u64 << inner_pos);
        Some(bits64_pos * 64 + inner_pos)
    }

    /// 空闲块的数量
    pub fn free_count(&self, bits: &[u64]) -> usize {
        bits.iter()
            .enumerate()
            .map(|(pos, bits64)| (bits64 & self.group_mask(pos)).count_ones() as usize)
            .sum()
    }

    /// 第 bits64_pos 组中落在 [start, end) 内的 bit
    fn group_mask(&self, bits64_pos: usize) -> u64 {
        let lo = bits64_pos * 64;
        let hi = lo + 64;
        if self.end <= lo || self.start >= hi {
            return 0;
        }
        let from = self.start.max(lo) - lo;
        let to = self.end.min(hi) - lo;
        let upper = if to == 64 { u64::MAX } else { (1u64 << to) - 1 };
        upper & !((1u64 << from) - 1)
    }
}
