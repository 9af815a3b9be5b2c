//! Arena of fixed-size line blocks, reset once per frame
use crate::{Error, LineRecord, LineX16Y16, LineX32Y16};
use static_assertions::const_assert;
use std::{marker::PhantomData, mem::size_of};

/// Size of a single arena chunk in bytes
pub const ARENA_CHUNK_SIZE: usize = 32 * 1024;

/// Number of line records stored in a single block
pub const LINES_PER_BLOCK: usize = 32;

const_assert!(size_of::<LineBlock<LineX16Y16>>() <= 1024);
const_assert!(size_of::<LineBlock<LineX32Y16>>() <= 1024);

/// Index of a block inside of a `BlockArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

/// Fixed capacity block of line records linked to the next block of the list
#[derive(Debug, Clone, Copy)]
pub struct LineBlock<T> {
    lines: [T; LINES_PER_BLOCK],
    len: u32,
    next: Option<BlockId>,
}

impl<T: LineRecord> Default for LineBlock<T> {
    fn default() -> Self {
        Self {
            lines: [T::default(); LINES_PER_BLOCK],
            len: 0,
            next: None,
        }
    }
}

impl<T> LineBlock<T> {
    pub fn lines(&self) -> &[T] {
        &self.lines[..self.len as usize]
    }

    pub fn is_full(&self) -> bool {
        self.len as usize == LINES_PER_BLOCK
    }
}

/// Bump allocator of `LineBlock`s
///
/// Blocks are never freed individually, `clear` makes all chunks available
/// again while keeping their memory.
#[derive(Debug)]
pub struct BlockArena<T> {
    chunks: Vec<Vec<LineBlock<T>>>,
    /// Chunk currently used for allocation
    active: usize,
}

impl<T> Default for BlockArena<T> {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            active: 0,
        }
    }
}

impl<T: LineRecord> BlockArena<T> {
    /// Number of blocks that fit into a chunk
    pub const BLOCKS_PER_CHUNK: usize = {
        let count = ARENA_CHUNK_SIZE / size_of::<LineBlock<T>>();
        if count == 0 { 1 } else { count }
    };

    /// Allocate new empty block
    pub fn alloc(&mut self) -> Result<BlockId, Error> {
        loop {
            if let Some(chunk) = self.chunks.get_mut(self.active) {
                if chunk.len() < Self::BLOCKS_PER_CHUNK {
                    let id = self.active * Self::BLOCKS_PER_CHUNK + chunk.len();
                    chunk.push(LineBlock::default());
                    return Ok(BlockId(id as u32));
                }
                self.active += 1;
                continue;
            }
            let mut chunk = Vec::new();
            chunk.try_reserve_exact(Self::BLOCKS_PER_CHUNK)?;
            self.chunks.try_reserve(1)?;
            self.chunks.push(chunk);
            tracing::trace!(
                "[allocator] new chunk: chunks={} block_size={}",
                self.chunks.len(),
                size_of::<LineBlock<T>>()
            );
        }
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> &LineBlock<T> {
        let index = id.0 as usize;
        &self.chunks[index / Self::BLOCKS_PER_CHUNK][index % Self::BLOCKS_PER_CHUNK]
    }

    #[inline]
    pub fn get_mut(&mut self, id: BlockId) -> &mut LineBlock<T> {
        let index = id.0 as usize;
        &mut self.chunks[index / Self::BLOCKS_PER_CHUNK][index % Self::BLOCKS_PER_CHUNK]
    }

    /// Release all blocks, chunks are kept for the next frame
    pub fn clear(&mut self) {
        for chunk in self.chunks.iter_mut() {
            chunk.clear();
        }
        self.active = 0;
    }

    /// Number of chunks ever allocated by this arena
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of blocks currently allocated
    pub fn block_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len()).sum()
    }
}

/// Singly linked list of line blocks with O(1) append
#[derive(Debug)]
pub struct LineList<T> {
    first: Option<BlockId>,
    last: Option<BlockId>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for LineList<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LineList<T> {}

impl<T> Default for LineList<T> {
    fn default() -> Self {
        Self {
            first: None,
            last: None,
            _marker: PhantomData,
        }
    }
}

impl<T: LineRecord> LineList<T> {
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Append line to the end of the list
    pub fn push(&mut self, arena: &mut BlockArena<T>, line: T) -> Result<(), Error> {
        let block_id = match self.last {
            Some(last) if !arena.get(last).is_full() => last,
            last => {
                let block_id = arena.alloc()?;
                match last {
                    Some(last) => arena.get_mut(last).next = Some(block_id),
                    None => self.first = Some(block_id),
                }
                self.last = Some(block_id);
                block_id
            }
        };
        let block = arena.get_mut(block_id);
        block.lines[block.len as usize] = line;
        block.len += 1;
        Ok(())
    }

    /// Iterate over lines in the order they were appended
    pub fn iter<'a>(self, arena: &'a BlockArena<T>) -> impl Iterator<Item = &'a T> + 'a {
        let mut next = self.first;
        std::iter::from_fn(move || {
            let block = arena.get(next?);
            next = block.next;
            Some(block.lines())
        })
        .flatten()
    }
}

/// Line lists of a single record type together with their arena
#[derive(Debug)]
pub struct LineTable<T> {
    arena: BlockArena<T>,
    lists: Vec<LineList<T>>,
}

impl<T> Default for LineTable<T> {
    fn default() -> Self {
        Self {
            arena: BlockArena::default(),
            lists: Vec::new(),
        }
    }
}

impl<T: LineRecord> LineTable<T> {
    /// Drop all lines and prepare `count` empty lists
    pub fn reset(&mut self, count: usize) -> Result<(), Error> {
        self.arena.clear();
        self.lists.clear();
        self.lists.try_reserve(count)?;
        self.lists.resize(count, LineList::default());
        Ok(())
    }

    #[inline]
    pub fn push(&mut self, list: usize, line: T) -> Result<(), Error> {
        self.lists[list].push(&mut self.arena, line)
    }

    pub fn is_empty(&self, list: usize) -> bool {
        self.lists[list].is_empty()
    }

    pub fn lines(&self, list: usize) -> impl Iterator<Item = &T> + '_ {
        self.lists[list].iter(&self.arena)
    }

    pub fn arena(&self) -> &BlockArena<T> {
        &self.arena
    }

    /// Release lines and lists, keeps arena chunks
    pub fn clear(&mut self) {
        self.arena.clear();
        self.lists.clear();
    }
}

/// Per-thread storage for linearized lines of every record type
///
/// Allocation requires `&mut self`, so an allocator can only be filled by the
/// thread owning it, rasterizing workers only read it through `&self`.
#[derive(Debug, Default)]
pub struct LineBlockAllocator {
    pub(crate) x16y16: LineTable<LineX16Y16>,
    pub(crate) x32y16: LineTable<LineX32Y16>,
}

impl LineBlockAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table<T: LineRecord>(&self) -> &LineTable<T> {
        T::table(self)
    }

    pub fn table_mut<T: LineRecord>(&mut self) -> &mut LineTable<T> {
        T::table_mut(self)
    }

    /// Release everything allocated during the frame
    pub fn clear(&mut self) {
        self.x16y16.clear();
        self.x32y16.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_list() -> Result<(), Error> {
        let mut arena = BlockArena::<LineX32Y16>::default();
        let mut list = LineList::default();
        assert!(list.is_empty());
        let count = LINES_PER_BLOCK * 3 + 5;
        for index in 0..count {
            list.push(&mut arena, LineX32Y16::new(index as i32, 0, 0, 256))?;
        }
        assert_eq!(arena.block_count(), 4);
        let xs: Vec<i32> = list.iter(&arena).map(|line| line.x0).collect();
        assert_eq!(xs, (0..count as i32).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_interleaved_lists() -> Result<(), Error> {
        let mut table = LineTable::<LineX16Y16>::default();
        table.reset(3)?;
        for index in 0..100u16 {
            table.push((index % 3) as usize, LineX16Y16::new(index as i32, 0, 0, 1))?;
        }
        for list in 0..3 {
            let xs: Vec<u16> = table.lines(list).map(|line| line.x0).collect();
            let expected: Vec<u16> = (0..100).filter(|i| (i % 3) as usize == list).collect();
            assert_eq!(xs, expected);
        }
        Ok(())
    }

    #[test]
    fn test_arena_reuse() -> Result<(), Error> {
        let mut arena = BlockArena::<LineX16Y16>::default();
        let blocks = BlockArena::<LineX16Y16>::BLOCKS_PER_CHUNK * 2 + 1;
        for _ in 0..blocks {
            arena.alloc()?;
        }
        assert_eq!(arena.chunk_count(), 3);
        arena.clear();
        assert_eq!(arena.block_count(), 0);
        for _ in 0..blocks {
            arena.alloc()?;
        }
        // chunks from the previous frame are reused
        assert_eq!(arena.chunk_count(), 3);
        assert_eq!(arena.block_count(), blocks);
        Ok(())
    }
}
