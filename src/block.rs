//! Basic blocks, statements, and the arena that owns them.
//!
//! A [`Block`] is the unit the control-flow graph is built from: a start
//! address, an optional disambiguating index for lifted graphs that split one
//! address into several blocks, an opaque statement list, and a set of
//! [`BlockFlags`]. Blocks live in a [`BlockArena`] and are referenced through
//! copyable [`BlockId`] handles; supergraph construction merges blocks by
//! allocating a combined block rather than mutating either input, so handles
//! held by earlier analysis stages stay valid.
//!
//! # Identity
//!
//! Two blocks are equal when their addresses and statement lists are equal.
//! Flags and the optional index deliberately do not participate: entry/exit
//! markings change as graphs are rewritten, and equality must survive that.
//!
//! # Examples
//!
//! ```rust
//! use cfg_regions::{Block, BlockArena, Statement};
//!
//! let mut arena = BlockArena::new();
//! let mut block = Block::new(0x1000);
//! block.push_statement(Statement::new(0x1000, "mov", &["eax", "1"]));
//! let id = arena.add(block);
//! assert_eq!(arena.block(id).addr(), 0x1000);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;

/// A single lifted statement inside a [`Block`].
///
/// Statements are opaque to region identification: the structuring passes
/// never interpret operations or operands, they only carry statement lists
/// along when blocks are merged and compare them for block equality.
#[derive(Debug, Clone)]
pub struct Statement {
    /// Address of the statement.
    pub addr: u64,
    /// Operation mnemonic.
    pub op: String,
    /// Operand strings, uninterpreted.
    pub operands: Vec<String>,
}

impl Statement {
    /// Creates a new statement.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address of the statement
    /// * `op` - Operation mnemonic
    /// * `operands` - Operand strings
    #[must_use]
    pub fn new(addr: u64, op: &str, operands: &[&str]) -> Self {
        Statement {
            addr,
            op: op.to_string(),
            operands: operands.iter().map(ToString::to_string).collect(),
        }
    }
}

impl PartialEq for Statement {
    /// Statements compare by operation and operands; the address is carried
    /// for display and block lookup but does not define identity.
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.operands == other.operands
    }
}

impl Eq for Statement {}

impl Hash for Statement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        self.operands.hash(state);
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}: {}", self.addr, self.op)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " {operand}")?;
            } else {
                write!(f, ", {operand}")?;
            }
        }
        Ok(())
    }
}

bitflags! {
    /// Role markers for a [`Block`] within its function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BlockFlags: u8 {
        /// The block is the entry point of the function.
        const ENTRYPOINT = 1 << 0;
        /// The block has no outgoing flow inside the function.
        const EXITPOINT = 1 << 1;
        /// The block was produced by merging blocks during supergraph
        /// construction.
        const MERGED = 1 << 2;
    }
}

/// A strongly-typed handle to a [`Block`] stored in a [`BlockArena`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Returns the raw index of this handle.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A basic block of a lifted control-flow graph.
///
/// See the [module documentation](self) for the identity rules.
#[derive(Debug, Clone)]
pub struct Block {
    addr: u64,
    idx: Option<u32>,
    statements: Vec<Statement>,
    flags: BlockFlags,
}

impl Block {
    /// Creates an empty block at the given address.
    #[must_use]
    pub fn new(addr: u64) -> Self {
        Block {
            addr,
            idx: None,
            statements: Vec::new(),
            flags: BlockFlags::empty(),
        }
    }

    /// Creates an empty block at the given address with a disambiguating index.
    ///
    /// Lifters occasionally split one address into several blocks; the index
    /// tells them apart while [`addr`](Self::addr) stays the shared address.
    #[must_use]
    pub fn with_idx(addr: u64, idx: u32) -> Self {
        Block {
            addr,
            idx: Some(idx),
            statements: Vec::new(),
            flags: BlockFlags::empty(),
        }
    }

    /// Returns the start address of the block.
    #[must_use]
    #[inline]
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// Returns the disambiguating index, if any.
    #[must_use]
    #[inline]
    pub fn idx(&self) -> Option<u32> {
        self.idx
    }

    /// Returns the statements of the block.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Appends a statement to the block.
    pub fn push_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Returns the flags of the block.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> BlockFlags {
        self.flags
    }

    /// Sets or clears a flag.
    pub fn set_flag(&mut self, flag: BlockFlags, value: bool) {
        self.flags.set(flag, value);
    }

    /// Returns `true` if the block is marked as the function entry point.
    #[must_use]
    pub fn is_entrypoint(&self) -> bool {
        self.flags.contains(BlockFlags::ENTRYPOINT)
    }

    /// Returns `true` if the block is marked as a function exit point.
    #[must_use]
    pub fn is_exitpoint(&self) -> bool {
        self.flags.contains(BlockFlags::EXITPOINT)
    }

    /// Returns `true` if the block was produced by a supergraph merge.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.flags.contains(BlockFlags::MERGED)
    }

    /// Returns `true` if `addr` is the block address or the address of one of
    /// its statements.
    #[must_use]
    pub fn contains_addr(&self, addr: u64) -> bool {
        self.addr == addr || self.statements.iter().any(|stmt| stmt.addr == addr)
    }

    /// Merges this block with `successor`, producing a new block.
    ///
    /// The result starts at this block's address, concatenates both statement
    /// lists, and unions both flag sets plus [`BlockFlags::MERGED`].
    #[must_use]
    pub fn merge(&self, successor: &Block) -> Block {
        Block {
            addr: self.addr,
            idx: self.idx,
            statements: self
                .statements
                .iter()
                .chain(successor.statements.iter())
                .cloned()
                .collect(),
            flags: self.flags | successor.flags | BlockFlags::MERGED,
        }
    }

    /// Merges a run of blocks into one block starting at `start_addr`.
    ///
    /// The result takes the first block's index, concatenates every statement
    /// list in order, and unions all flag sets plus [`BlockFlags::MERGED`].
    /// Returns `None` for an empty run.
    #[must_use]
    pub fn merge_many(start_addr: u64, blocks: &[Block]) -> Option<Block> {
        let (first, rest) = blocks.split_first()?;
        let mut merged = rest.iter().fold(first.clone(), |acc, block| acc.merge(block));
        merged.addr = start_addr;
        merged.flags |= BlockFlags::MERGED;
        Some(merged)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.statements == other.statements
    }
}

impl Eq for Block {}

impl Hash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
        self.statements.hash(state);
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.idx {
            Some(idx) => write!(f, "block {:#x}.{}", self.addr, idx),
            None => write!(f, "block {:#x}", self.addr),
        }
    }
}

/// Owning storage for all [`Block`]s of an analysis.
///
/// Handles are never invalidated: merging during supergraph construction adds
/// a new combined block instead of touching the originals.
#[derive(Debug, Clone, Default)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        BlockArena { blocks: Vec::new() }
    }

    /// Adds a block and returns its handle.
    pub fn add(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(block);
        id
    }

    /// Returns the block behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this arena.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// Returns a mutable reference to the block behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this arena.
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Returns the number of blocks in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the arena holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Merges two blocks into a new arena entry and returns its handle.
    ///
    /// Neither input is modified.
    pub fn merge(&mut self, first: BlockId, second: BlockId) -> BlockId {
        let merged = self.block(first).merge(self.block(second));
        self.add(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_equality_ignores_addr() {
        let a = Statement::new(0x10, "add", &["r0", "r1"]);
        let b = Statement::new(0x20, "add", &["r0", "r1"]);
        let c = Statement::new(0x10, "sub", &["r0", "r1"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_statement_display() {
        let stmt = Statement::new(0x40, "cmp", &["eax", "0"]);
        assert_eq!(stmt.to_string(), "0x40: cmp eax, 0");
    }

    #[test]
    fn test_block_equality() {
        let mut a = Block::new(0x1000);
        a.push_statement(Statement::new(0x1000, "nop", &[]));
        let mut b = Block::new(0x1000);
        b.push_statement(Statement::new(0x1000, "nop", &[]));
        // flags do not affect identity
        b.set_flag(BlockFlags::ENTRYPOINT, true);
        assert_eq!(a, b);

        let c = Block::new(0x2000);
        assert_ne!(a, c);
    }

    #[test]
    fn test_block_flags() {
        let mut block = Block::new(0x1000);
        assert!(!block.is_entrypoint());
        block.set_flag(BlockFlags::ENTRYPOINT, true);
        assert!(block.is_entrypoint());
        block.set_flag(BlockFlags::ENTRYPOINT, false);
        assert!(!block.is_entrypoint());
    }

    #[test]
    fn test_block_contains_addr() {
        let mut block = Block::new(0x1000);
        block.push_statement(Statement::new(0x1004, "nop", &[]));
        assert!(block.contains_addr(0x1000));
        assert!(block.contains_addr(0x1004));
        assert!(!block.contains_addr(0x1008));
    }

    #[test]
    fn test_block_merge() {
        let mut first = Block::new(0x1000);
        first.push_statement(Statement::new(0x1000, "call", &["f"]));
        first.set_flag(BlockFlags::ENTRYPOINT, true);
        let mut second = Block::new(0x1010);
        second.push_statement(Statement::new(0x1010, "ret", &[]));
        second.set_flag(BlockFlags::EXITPOINT, true);

        let merged = first.merge(&second);
        assert_eq!(merged.addr(), 0x1000);
        assert_eq!(merged.statements().len(), 2);
        assert!(merged.is_merged());
        assert!(merged.is_entrypoint());
        assert!(merged.is_exitpoint());
    }

    #[test]
    fn test_block_merge_many() {
        let mut a = Block::new(0x1000);
        a.push_statement(Statement::new(0x1000, "cmp", &["eax", "0"]));
        let mut b = Block::new(0x1010);
        b.push_statement(Statement::new(0x1010, "jne", &["0x1020"]));
        let mut c = Block::new(0x1020);
        c.push_statement(Statement::new(0x1020, "ret", &[]));

        let merged = Block::merge_many(0x900, &[a, b, c]).unwrap();
        assert_eq!(merged.addr(), 0x900);
        assert_eq!(merged.statements().len(), 3);
        assert!(merged.is_merged());

        assert!(Block::merge_many(0x900, &[]).is_none());
    }

    #[test]
    fn test_arena_merge_preserves_inputs() {
        let mut arena = BlockArena::new();
        let a = arena.add(Block::new(0x1000));
        let b = arena.add(Block::new(0x1010));
        let merged = arena.merge(a, b);

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.block(a).addr(), 0x1000);
        assert_eq!(arena.block(b).addr(), 0x1010);
        assert_eq!(arena.block(merged).addr(), 0x1000);
        assert!(arena.block(merged).is_merged());
    }

    #[test]
    fn test_block_with_idx_display() {
        let block = Block::with_idx(0x1000, 1);
        assert_eq!(block.idx(), Some(1));
        assert_eq!(block.to_string(), "block 0x1000.1");
        assert_eq!(Block::new(0x1000).to_string(), "block 0x1000");
    }
}
