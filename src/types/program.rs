//! Defines a [`CompiledTemplate`] which is a sequence of [`Instr`] that can be
//! executed by the interpreter, along with its constant pool and formal
//! arguments.

use std::fmt;
use std::sync::Arc;

use crate::types::span::Span;
use crate::Value;

/// Placeholder for a jump target that has not been resolved yet.
pub const FIXME: usize = !0;

/// The names of the arguments every anonymous sub-template receives when it
/// is mapped over a sequence.
pub const IMPLICIT_INDEX_ARGS: [&str; 2] = ["i", "i0"];

/// The name of the implicit argument of a template without a formal
/// argument list.
pub const IMPLICIT_ARG: &str = "it";

/// A compiled template.
///
/// Compiled templates are immutable and shared through an [`Arc`] by every
/// [`Instance`][crate::Instance] created from them. Use a
/// [`TemplateBuilder`][crate::TemplateBuilder] to construct one.
#[derive(Clone)]
pub struct CompiledTemplate {
    pub(crate) name: String,
    pub(crate) instrs: Vec<Instr>,
    pub(crate) strings: Vec<String>,
    pub(crate) args: Vec<FormalArg>,
    pub(crate) has_formal_args: bool,
    pub(crate) anonymous: bool,
    pub(crate) region: bool,
    pub(crate) subtemplates: Vec<Arc<CompiledTemplate>>,
    pub(crate) source: Option<String>,
    pub(crate) source_map: Vec<Option<Span>>,
}

/// A formal argument of a compiled template.
#[derive(Debug, Clone)]
pub struct FormalArg {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) default: Option<DefaultValue>,
}

/// The default value of a formal argument.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// A literal value, cloned into the argument slot.
    Literal(Value),
    /// A template evaluated in the scope of the invoking frame.
    ///
    /// When `eager` is set the template is rendered to a string as soon as the
    /// frame starts, otherwise a new instance is stored in the slot.
    Template {
        template: Arc<CompiledTemplate>,
        eager: bool,
    },
}

/// A single bytecode instruction.
///
/// Operands naming strings (attribute, property and template names, literal
/// text, indentation) are indices into the template's string pool. Jump
/// targets are instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// Push a pooled string.
    LoadStr(usize),
    /// Push an attribute resolved through the scope chain.
    LoadAttr(usize),
    /// Push a local argument slot.
    LoadLocal(usize),
    /// Replace the value on top of the stack with one of its properties.
    LoadProp(usize),
    /// Pop a property key and replace the value beneath it with that property.
    LoadPropInd,
    /// Pop a value into the options array on top of the stack.
    StoreOption(usize),
    /// Pop a value into the named argument map on top of the stack.
    StoreArg(usize),
    /// Create a named template instance with `n` positional arguments.
    New(usize, usize),
    /// Create a template instance named by the value beneath `n` positional
    /// arguments.
    NewInd(usize),
    /// Pop a named argument map and create a named template instance.
    NewBoxArgs(usize),
    /// Create an instance of the imported version of a template.
    SuperNew(usize, usize),
    /// Named argument form of [`Instr::SuperNew`].
    SuperNewBoxArgs(usize),
    /// Pop and write a value.
    Write,
    /// Pop an options array and a value and write the value with the options.
    WriteOpt,
    /// Map a template over an attribute.
    Map,
    /// Map `n` templates round-robin over an attribute.
    RotMap(usize),
    /// Map a template over `n` attributes in parallel.
    ZipMap(usize),
    /// Jump to an instruction.
    Br(usize),
    /// Pop a value and jump to an instruction if it is false.
    Brf(usize),
    /// Push a fresh options array.
    Options,
    /// Push a fresh named argument map.
    Args,
    /// Fill the named argument map on top of the stack from scope.
    PassThru(usize),
    /// Push an empty list.
    List,
    /// Pop a value and add it to the list on top of the stack.
    Add,
    /// Render the value on top of the stack to a string.
    ToStr,
    First,
    Last,
    Rest,
    Trunc,
    Strip,
    Trim,
    Length,
    Strlen,
    Reverse,
    Not,
    Or,
    And,
    /// Push a pooled string onto the writer's indentation stack.
    Indent(usize),
    /// Pop the writer's indentation stack.
    Dedent,
    /// Write a newline unless it would produce a second blank line.
    Newline,
    Noop,
    Pop,
    Null,
    True,
    False,
    /// Write a pooled string.
    WriteStr(usize),
    /// Write a local argument slot.
    WriteLocal(usize),
}

/// The kind of an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperandKind {
    String,
    Slot,
    Count,
    Option,
    Addr,
}

impl CompiledTemplate {
    /// The name of the template.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The instructions of the template.
    #[inline]
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    /// The string constant pool of the template.
    #[inline]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// The formal arguments in slot order.
    #[inline]
    pub fn args(&self) -> &[FormalArg] {
        &self.args
    }

    /// Whether the template was defined with an explicit argument list.
    #[inline]
    pub fn has_formal_args(&self) -> bool {
        self.has_formal_args
    }

    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    #[inline]
    pub fn is_region(&self) -> bool {
        self.region
    }

    /// The template source, if one was attached.
    #[inline]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The anonymous sub-templates and regions defined by this template.
    #[inline]
    pub fn subtemplates(&self) -> &[Arc<CompiledTemplate>] {
        &self.subtemplates
    }

    /// Looks up a formal argument by name.
    pub fn arg(&self, name: &str) -> Option<&FormalArg> {
        self.args.iter().find(|arg| arg.name == name)
    }

    /// The number of arguments a caller supplies, not counting the implicit
    /// index arguments of anonymous sub-templates.
    pub(crate) fn num_declared_args(&self) -> usize {
        if self.anonymous {
            self.args
                .iter()
                .filter(|arg| !IMPLICIT_INDEX_ARGS.contains(&arg.name.as_str()))
                .count()
        } else {
            self.args.len()
        }
    }

    pub(crate) fn num_defaults(&self) -> usize {
        self.args.iter().filter(|arg| arg.default.is_some()).count()
    }

    pub(crate) fn is_implicit_index(&self, arg: &FormalArg) -> bool {
        self.anonymous && IMPLICIT_INDEX_ARGS.contains(&arg.name.as_str())
    }

    /// Declares a new formal argument and returns its slot.
    pub(crate) fn add_arg(&mut self, name: &str) -> usize {
        let index = self.args.len();
        self.args.push(FormalArg {
            name: name.to_owned(),
            index,
            default: None,
        });
        index
    }

    pub(crate) fn span(&self, ip: usize) -> Option<Span> {
        self.source_map.get(ip).copied().flatten()
    }

    /// A template that renders nothing, standing in for one that could not
    /// be found.
    pub(crate) fn empty(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            instrs: Vec::new(),
            strings: Vec::new(),
            args: Vec::new(),
            has_formal_args: false,
            anonymous: false,
            region: false,
            subtemplates: Vec::new(),
            source: None,
            source_map: Vec::new(),
        }
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.name)
            .field("args", &self.args.iter().map(|a| &a.name).collect::<Vec<_>>())
            .field("instrs", &self.instrs.len())
            .finish_non_exhaustive()
    }
}

impl FormalArg {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The slot of the argument in an instance's locals.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

impl Instr {
    /// The byte opcode of the instruction.
    pub fn opcode(&self) -> u8 {
        match self {
            Instr::LoadStr(_) => 1,
            Instr::LoadAttr(_) => 2,
            Instr::LoadLocal(_) => 3,
            Instr::LoadProp(_) => 4,
            Instr::LoadPropInd => 5,
            Instr::StoreOption(_) => 6,
            Instr::StoreArg(_) => 7,
            Instr::New(..) => 8,
            Instr::NewInd(_) => 9,
            Instr::NewBoxArgs(_) => 10,
            Instr::SuperNew(..) => 11,
            Instr::SuperNewBoxArgs(_) => 12,
            Instr::Write => 13,
            Instr::WriteOpt => 14,
            Instr::Map => 15,
            Instr::RotMap(_) => 16,
            Instr::ZipMap(_) => 17,
            Instr::Br(_) => 18,
            Instr::Brf(_) => 19,
            Instr::Options => 20,
            Instr::Args => 21,
            Instr::PassThru(_) => 22,
            Instr::List => 24,
            Instr::Add => 25,
            Instr::ToStr => 26,
            Instr::First => 27,
            Instr::Last => 28,
            Instr::Rest => 29,
            Instr::Trunc => 30,
            Instr::Strip => 31,
            Instr::Trim => 32,
            Instr::Length => 33,
            Instr::Strlen => 34,
            Instr::Reverse => 35,
            Instr::Not => 36,
            Instr::Or => 37,
            Instr::And => 38,
            Instr::Indent(_) => 39,
            Instr::Dedent => 40,
            Instr::Newline => 41,
            Instr::Noop => 42,
            Instr::Pop => 43,
            Instr::Null => 44,
            Instr::True => 45,
            Instr::False => 46,
            Instr::WriteStr(_) => 47,
            Instr::WriteLocal(_) => 48,
        }
    }

    /// The mnemonic used in disassembly.
    pub fn name(&self) -> &'static str {
        match self {
            Instr::LoadStr(_) => "load_str",
            Instr::LoadAttr(_) => "load_attr",
            Instr::LoadLocal(_) => "load_local",
            Instr::LoadProp(_) => "load_prop",
            Instr::LoadPropInd => "load_prop_ind",
            Instr::StoreOption(_) => "store_option",
            Instr::StoreArg(_) => "store_arg",
            Instr::New(..) => "new",
            Instr::NewInd(_) => "new_ind",
            Instr::NewBoxArgs(_) => "new_box_args",
            Instr::SuperNew(..) => "super_new",
            Instr::SuperNewBoxArgs(_) => "super_new_box_args",
            Instr::Write => "write",
            Instr::WriteOpt => "write_opt",
            Instr::Map => "map",
            Instr::RotMap(_) => "rot_map",
            Instr::ZipMap(_) => "zip_map",
            Instr::Br(_) => "br",
            Instr::Brf(_) => "brf",
            Instr::Options => "options",
            Instr::Args => "args",
            Instr::PassThru(_) => "passthru",
            Instr::List => "list",
            Instr::Add => "add",
            Instr::ToStr => "tostr",
            Instr::First => "first",
            Instr::Last => "last",
            Instr::Rest => "rest",
            Instr::Trunc => "trunc",
            Instr::Strip => "strip",
            Instr::Trim => "trim",
            Instr::Length => "length",
            Instr::Strlen => "strlen",
            Instr::Reverse => "reverse",
            Instr::Not => "not",
            Instr::Or => "or",
            Instr::And => "and",
            Instr::Indent(_) => "indent",
            Instr::Dedent => "dedent",
            Instr::Newline => "newline",
            Instr::Noop => "noop",
            Instr::Pop => "pop",
            Instr::Null => "null",
            Instr::True => "true",
            Instr::False => "false",
            Instr::WriteStr(_) => "write_str",
            Instr::WriteLocal(_) => "write_local",
        }
    }

    /// The operands of the instruction along with their kinds.
    pub(crate) fn operands(&self) -> Vec<(OperandKind, usize)> {
        use OperandKind as K;
        match *self {
            Instr::LoadStr(s)
            | Instr::LoadAttr(s)
            | Instr::LoadProp(s)
            | Instr::StoreArg(s)
            | Instr::NewBoxArgs(s)
            | Instr::SuperNewBoxArgs(s)
            | Instr::PassThru(s)
            | Instr::Indent(s)
            | Instr::WriteStr(s) => vec![(K::String, s)],
            Instr::LoadLocal(i) | Instr::WriteLocal(i) => vec![(K::Slot, i)],
            Instr::StoreOption(o) => vec![(K::Option, o)],
            Instr::New(s, n) | Instr::SuperNew(s, n) => vec![(K::String, s), (K::Count, n)],
            Instr::NewInd(n) | Instr::RotMap(n) | Instr::ZipMap(n) => vec![(K::Count, n)],
            Instr::Br(a) | Instr::Brf(a) => vec![(K::Addr, a)],
            _ => Vec::new(),
        }
    }

    /// Constructs an instruction from an opcode and its operands.
    pub(crate) fn from_parts(opcode: u8, ops: &[usize]) -> Option<Self> {
        let a = ops.first().copied().unwrap_or(0);
        let b = ops.get(1).copied().unwrap_or(0);
        let instr = match opcode {
            1 => Instr::LoadStr(a),
            2 => Instr::LoadAttr(a),
            3 => Instr::LoadLocal(a),
            4 => Instr::LoadProp(a),
            5 => Instr::LoadPropInd,
            6 => Instr::StoreOption(a),
            7 => Instr::StoreArg(a),
            8 => Instr::New(a, b),
            9 => Instr::NewInd(a),
            10 => Instr::NewBoxArgs(a),
            11 => Instr::SuperNew(a, b),
            12 => Instr::SuperNewBoxArgs(a),
            13 => Instr::Write,
            14 => Instr::WriteOpt,
            15 => Instr::Map,
            16 => Instr::RotMap(a),
            17 => Instr::ZipMap(a),
            18 => Instr::Br(a),
            19 => Instr::Brf(a),
            20 => Instr::Options,
            21 => Instr::Args,
            22 => Instr::PassThru(a),
            24 => Instr::List,
            25 => Instr::Add,
            26 => Instr::ToStr,
            27 => Instr::First,
            28 => Instr::Last,
            29 => Instr::Rest,
            30 => Instr::Trunc,
            31 => Instr::Strip,
            32 => Instr::Trim,
            33 => Instr::Length,
            34 => Instr::Strlen,
            35 => Instr::Reverse,
            36 => Instr::Not,
            37 => Instr::Or,
            38 => Instr::And,
            39 => Instr::Indent(a),
            40 => Instr::Dedent,
            41 => Instr::Newline,
            42 => Instr::Noop,
            43 => Instr::Pop,
            44 => Instr::Null,
            45 => Instr::True,
            46 => Instr::False,
            47 => Instr::WriteStr(a),
            48 => Instr::WriteLocal(a),
            _ => return None,
        };
        Some(instr)
    }

    /// The number of operands an opcode takes.
    pub(crate) fn arity(opcode: u8) -> Option<usize> {
        Instr::from_parts(opcode, &[0, 0]).map(|instr| instr.operands().len())
    }

    /// Returns a mutable reference to the jump target, if this is a jump.
    pub(crate) fn target_mut(&mut self) -> Option<&mut usize> {
        match self {
            Instr::Br(j) | Instr::Brf(j) => Some(j),
            _ => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        for (i, (_, op)) in self.operands().iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{op}")?;
        }
        Ok(())
    }
}
