//! Basic-block view over a function's flat instruction list.
//!
//! Labels start a block and `br`/`jmp`/`ret` end one. Every instruction
//! lands in exactly one block and no block is empty.

use super::{Function, Instr};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'f> {
    /// The label the block starts with, if any
    pub label: Option<&'f str>,
    /// All instructions of the block, the leading label included
    pub instrs: &'f [Instr],
}

impl<'f> Block<'f> {
    pub fn terminator(&self) -> Option<&'f Instr> {
        self.instrs.last().filter(|i| i.is_terminator())
    }

    /// Instructions other than the leading label
    pub fn body(&self) -> &'f [Instr] {
        match self.instrs.first() {
            Some(Instr::Label { .. }) => &self.instrs[1..],
            _ => self.instrs,
        }
    }
}

pub fn form_blocks(func: &Function) -> Vec<Block<'_>> {
    let instrs = &func.instrs;
    let mut blocks = Vec::new();
    let mut start = 0;

    for (i, instr) in instrs.iter().enumerate() {
        match instr {
            Instr::Label { .. } => {
                if i > start {
                    blocks.push(make_block(&instrs[start..i]));
                }
                start = i;
            }
            _ if instr.is_terminator() => {
                blocks.push(make_block(&instrs[start..=i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < instrs.len() {
        blocks.push(make_block(&instrs[start..]));
    }
    blocks
}

fn make_block(instrs: &[Instr]) -> Block<'_> {
    Block {
        label: instrs.first().and_then(|i| i.label_name()),
        instrs,
    }
}
