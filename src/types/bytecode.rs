//! The byte-level form of a compiled program.
//!
//! Each instruction is a one byte opcode followed by its operands, each
//! encoded as a big-endian `u16`. Jump targets are byte addresses in the
//! encoded form and instruction indices in memory.

use std::fmt::Write;

use crate::types::program::{CompiledTemplate, Instr, OperandKind};
use crate::{Error, Result};

/// The size in bytes of an encoded operand.
pub const OPERAND_SIZE: usize = 2;

/// Encode a sequence of instructions to bytes.
pub fn encode(instrs: &[Instr]) -> Result<Vec<u8>> {
    // byte address of every instruction plus the end of the program
    let mut addrs = Vec::with_capacity(instrs.len() + 1);
    let mut addr = 0;
    for instr in instrs {
        addrs.push(addr);
        addr += 1 + instr.operands().len() * OPERAND_SIZE;
    }
    addrs.push(addr);

    let mut bytes = Vec::with_capacity(addr);
    for (i, instr) in instrs.iter().enumerate() {
        bytes.push(instr.opcode());
        for (kind, op) in instr.operands() {
            let op = match kind {
                OperandKind::Addr => *addrs.get(op).ok_or_else(|| {
                    Error::new(format!(
                        "jump target {op} of instruction {i} is out of range"
                    ))
                })?,
                _ => op,
            };
            let op = u16::try_from(op).map_err(|_| {
                Error::new(format!(
                    "operand {op} of instruction {i} does not fit in {OPERAND_SIZE} bytes"
                ))
            })?;
            bytes.extend_from_slice(&op.to_be_bytes());
        }
    }
    Ok(bytes)
}

/// Decode bytes produced by [`encode`] into instructions.
///
/// Fails on an unknown opcode, a truncated operand, or a jump that does not
/// land on an instruction boundary.
pub fn decode(bytes: &[u8]) -> Result<Vec<Instr>> {
    let mut instrs = Vec::new();
    let mut addrs = Vec::new();

    let mut i = 0;
    while let Some(&opcode) = bytes.get(i) {
        let arity = Instr::arity(opcode)
            .ok_or_else(|| Error::new(format!("invalid opcode {opcode} at byte {i}")))?;
        let mut ops = [0; 2];
        for (n, op) in ops.iter_mut().take(arity).enumerate() {
            let at = i + 1 + n * OPERAND_SIZE;
            let raw = bytes.get(at..at + OPERAND_SIZE).ok_or_else(|| {
                Error::new(format!(
                    "truncated operand for `{}` at byte {i}",
                    Instr::from_parts(opcode, &[]).map_or("?", |instr| instr.name())
                ))
            })?;
            *op = usize::from(u16::from_be_bytes([raw[0], raw[1]]));
        }
        let instr = Instr::from_parts(opcode, &ops[..arity])
            .ok_or_else(|| Error::new(format!("invalid opcode {opcode} at byte {i}")))?;
        addrs.push(i);
        instrs.push(instr);
        i += 1 + arity * OPERAND_SIZE;
    }
    addrs.push(i);

    // rewrite byte addresses to instruction indices
    for instr in &mut instrs {
        if let Some(target) = instr.target_mut() {
            *target = addrs.binary_search(target).map_err(|_| {
                Error::new(format!(
                    "jump to byte {target} is not on an instruction boundary"
                ))
            })?;
        }
    }
    Ok(instrs)
}

/// Produce a human readable listing of a compiled template.
pub fn disassemble(template: &CompiledTemplate) -> String {
    let mut buf = String::new();
    for (ip, instr) in template.instrs.iter().enumerate() {
        let _ = write!(buf, "{ip:04}:\t{:<14}", instr.name());
        for (n, (kind, op)) in instr.operands().into_iter().enumerate() {
            if n > 0 {
                buf.push_str(", ");
            }
            let _ = match kind {
                OperandKind::String => match template.strings.get(op) {
                    Some(s) => write!(buf, "#{op}:{s:?}"),
                    None => write!(buf, "#{op}:<bad string index>"),
                },
                OperandKind::Slot => match template.args.get(op) {
                    Some(arg) => write!(buf, "{op}:{}", arg.name),
                    None => write!(buf, "{op}:<bad slot>"),
                },
                _ => write!(buf, "{op}"),
            };
        }
        buf.truncate(buf.trim_end().len());
        buf.push('\n');
    }
    buf
}
