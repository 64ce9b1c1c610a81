//! An assembler for [`CompiledTemplate`]s.

use std::sync::Arc;

use crate::options::{RenderOption, NUM_OPTIONS};
use crate::types::program::{
    CompiledTemplate, DefaultValue, FormalArg, Instr, OperandKind, FIXME, IMPLICIT_ARG,
    IMPLICIT_INDEX_ARGS,
};
use crate::types::span::Span;
use crate::{Error, Result, Value};

/// Assembles a [`CompiledTemplate`] instruction by instruction.
///
/// This is the boundary a template compiler plugs into: strings are interned
/// into the constant pool as instructions are emitted and forward jumps are
/// patched once their target is known.
///
/// # Examples
///
/// ```
/// use stencil::TemplateBuilder;
///
/// // greet(name) ::= "Hello <name>!"
/// let template = TemplateBuilder::new("greet")
///     .arg("name")
///     .text("Hello ")
///     .load_attr("name")
///     .write()
///     .text("!")
///     .build()?;
/// assert_eq!(template.args().len(), 1);
/// # Ok::<(), stencil::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    name: String,
    instrs: Vec<Instr>,
    strings: Vec<String>,
    args: Vec<FormalArg>,
    has_formal_args: bool,
    anonymous: bool,
    region: bool,
    subtemplates: Vec<Arc<CompiledTemplate>>,
    source: Option<String>,
    source_map: Vec<Option<Span>>,
    span: Option<Span>,
}

impl TemplateBuilder {
    /// Start a named template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrs: Vec::new(),
            strings: Vec::new(),
            args: Vec::new(),
            has_formal_args: false,
            anonymous: false,
            region: false,
            subtemplates: Vec::new(),
            source: None,
            source_map: Vec::new(),
            span: None,
        }
    }

    /// Start an anonymous sub-template.
    ///
    /// Anonymous sub-templates receive the implicit `i` and `i0` arguments
    /// when mapped over a sequence. If no arguments are declared they also
    /// receive an implicit `it` argument.
    pub fn anonymous(name: impl Into<String>) -> Self {
        let mut b = Self::new(name);
        b.anonymous = true;
        b
    }

    /// Start a region of the given enclosing template.
    pub fn region(enclosing: &str, name: &str) -> Self {
        let mut b = Self::new(region_name(enclosing, name));
        b.region = true;
        b
    }

    /// Declare a required formal argument.
    pub fn arg(&mut self, name: impl Into<String>) -> &mut Self {
        self.push_arg(name.into(), None)
    }

    /// Declare a formal argument with a literal default.
    pub fn arg_with_default(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push_arg(name.into(), Some(DefaultValue::Literal(value.into())))
    }

    /// Declare a formal argument whose default is a template evaluated in the
    /// scope of the invoking frame.
    ///
    /// When `eager` is set the default is rendered to a string before the
    /// template body runs.
    pub fn arg_with_template(
        &mut self,
        name: impl Into<String>,
        template: impl Into<Arc<CompiledTemplate>>,
        eager: bool,
    ) -> &mut Self {
        let default = DefaultValue::Template {
            template: template.into(),
            eager,
        };
        self.push_arg(name.into(), Some(default))
    }

    /// Mark the template as having an explicit, possibly empty, argument list.
    pub fn explicit_args(&mut self) -> &mut Self {
        self.has_formal_args = true;
        self
    }

    /// Attach the template source used to locate diagnostics.
    pub fn source(&mut self, source: impl Into<String>) -> &mut Self {
        self.source = Some(source.into());
        self
    }

    /// Set the source span recorded for subsequently emitted instructions.
    pub fn at(&mut self, span: impl Into<Span>) -> &mut Self {
        self.span = Some(span.into());
        self
    }

    /// Stop recording a source span for subsequently emitted instructions.
    pub fn clear_span(&mut self) -> &mut Self {
        self.span = None;
        self
    }

    /// Attach an anonymous sub-template or region defined by this template.
    pub fn subtemplate(&mut self, template: impl Into<Arc<CompiledTemplate>>) -> &mut Self {
        self.subtemplates.push(template.into());
        self
    }

    /// Replace the program with decoded instructions and their string pool.
    pub fn program(&mut self, instrs: Vec<Instr>, strings: Vec<String>) -> &mut Self {
        self.source_map = vec![None; instrs.len()];
        self.instrs = instrs;
        self.strings = strings;
        self
    }

    /// Intern a string into the constant pool and return its index.
    pub fn intern(&mut self, s: &str) -> usize {
        match self.strings.iter().position(|t| t == s) {
            Some(i) => i,
            None => {
                self.strings.push(s.to_owned());
                self.strings.len() - 1
            }
        }
    }

    /// Emit a raw instruction and return its index.
    pub fn push(&mut self, instr: Instr) -> usize {
        let i = self.instrs.len();
        self.instrs.push(instr);
        self.source_map.push(self.span);
        i
    }

    /// The index of the next instruction.
    pub fn label(&self) -> usize {
        self.instrs.len()
    }

    /// Emit a forward jump and return its index to patch later.
    pub fn br_forward(&mut self) -> usize {
        self.push(Instr::Br(FIXME))
    }

    /// Emit a forward conditional jump and return its index to patch later.
    pub fn brf_forward(&mut self) -> usize {
        self.push(Instr::Brf(FIXME))
    }

    /// Point the jump at `i` to the next instruction.
    pub fn update_jump(&mut self, i: usize) -> &mut Self {
        let n = self.instrs.len();
        if let Some(j) = self.instrs.get_mut(i).and_then(Instr::target_mut) {
            *j = n;
        }
        self
    }

    /// Emit a jump to an existing label.
    pub fn br(&mut self, label: usize) -> &mut Self {
        self.emit(Instr::Br(label))
    }

    /// Emit literal text.
    pub fn text(&mut self, s: &str) -> &mut Self {
        let i = self.intern(s);
        self.emit(Instr::WriteStr(i))
    }

    pub fn load_str(&mut self, s: &str) -> &mut Self {
        let i = self.intern(s);
        self.emit(Instr::LoadStr(i))
    }

    pub fn load_attr(&mut self, name: &str) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::LoadAttr(i))
    }

    pub fn load_local(&mut self, slot: usize) -> &mut Self {
        self.emit(Instr::LoadLocal(slot))
    }

    pub fn load_prop(&mut self, name: &str) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::LoadProp(i))
    }

    pub fn load_prop_ind(&mut self) -> &mut Self {
        self.emit(Instr::LoadPropInd)
    }

    pub fn store_option(&mut self, option: RenderOption) -> &mut Self {
        self.emit(Instr::StoreOption(option.index()))
    }

    pub fn store_arg(&mut self, name: &str) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::StoreArg(i))
    }

    /// Emit construction of a named template with `nargs` positional
    /// arguments already on the stack.
    pub fn new_instance(&mut self, name: &str, nargs: usize) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::New(i, nargs))
    }

    pub fn new_ind(&mut self, nargs: usize) -> &mut Self {
        self.emit(Instr::NewInd(nargs))
    }

    pub fn new_box_args(&mut self, name: &str) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::NewBoxArgs(i))
    }

    pub fn super_new(&mut self, name: &str, nargs: usize) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::SuperNew(i, nargs))
    }

    pub fn super_new_box_args(&mut self, name: &str) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::SuperNewBoxArgs(i))
    }

    pub fn write(&mut self) -> &mut Self {
        self.emit(Instr::Write)
    }

    pub fn write_opt(&mut self) -> &mut Self {
        self.emit(Instr::WriteOpt)
    }

    pub fn write_local(&mut self, slot: usize) -> &mut Self {
        self.emit(Instr::WriteLocal(slot))
    }

    pub fn map(&mut self) -> &mut Self {
        self.emit(Instr::Map)
    }

    pub fn rot_map(&mut self, n: usize) -> &mut Self {
        self.emit(Instr::RotMap(n))
    }

    pub fn zip_map(&mut self, n: usize) -> &mut Self {
        self.emit(Instr::ZipMap(n))
    }

    pub fn options(&mut self) -> &mut Self {
        self.emit(Instr::Options)
    }

    pub fn args(&mut self) -> &mut Self {
        self.emit(Instr::Args)
    }

    pub fn pass_thru(&mut self, name: &str) -> &mut Self {
        let i = self.intern(name);
        self.emit(Instr::PassThru(i))
    }

    pub fn list(&mut self) -> &mut Self {
        self.emit(Instr::List)
    }

    pub fn add(&mut self) -> &mut Self {
        self.emit(Instr::Add)
    }

    pub fn to_str(&mut self) -> &mut Self {
        self.emit(Instr::ToStr)
    }

    pub fn indent(&mut self, s: &str) -> &mut Self {
        let i = self.intern(s);
        self.emit(Instr::Indent(i))
    }

    pub fn dedent(&mut self) -> &mut Self {
        self.emit(Instr::Dedent)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.emit(Instr::Newline)
    }

    pub fn null(&mut self) -> &mut Self {
        self.emit(Instr::Null)
    }

    pub fn bool(&mut self, b: bool) -> &mut Self {
        self.emit(if b { Instr::True } else { Instr::False })
    }

    /// Emit an instruction that takes no operands, such as [`Instr::First`] or
    /// [`Instr::Not`].
    pub fn op(&mut self, instr: Instr) -> &mut Self {
        self.emit(instr)
    }

    /// Validate and finish the template.
    ///
    /// Fails if an argument name is not an identifier or is declared twice, or
    /// if an instruction refers to a string, slot, option or jump target that
    /// does not exist.
    pub fn build(&self) -> Result<CompiledTemplate> {
        let mut args = self.args.clone();
        if self.anonymous {
            if args.is_empty() {
                push_formal(&mut args, IMPLICIT_ARG, None);
            }
            for name in IMPLICIT_INDEX_ARGS {
                if !args.iter().any(|a| a.name == name) {
                    push_formal(&mut args, name, None);
                }
            }
        }

        for (i, arg) in args.iter().enumerate() {
            if !is_ident(&arg.name) {
                return Err(Error::new(format!(
                    "invalid argument name `{}` in template `{}`",
                    arg.name, self.name
                )));
            }
            if args[..i].iter().any(|a| a.name == arg.name) {
                return Err(Error::new(format!(
                    "argument `{}` declared twice in template `{}`",
                    arg.name, self.name
                )));
            }
        }

        for (ip, instr) in self.instrs.iter().enumerate() {
            for (kind, op) in instr.operands() {
                let ok = match kind {
                    OperandKind::String => op < self.strings.len(),
                    OperandKind::Slot => op < args.len(),
                    OperandKind::Option => op < NUM_OPTIONS,
                    OperandKind::Addr => op <= self.instrs.len(),
                    OperandKind::Count => true,
                };
                if !ok {
                    let msg = match kind {
                        OperandKind::Addr if op == FIXME => {
                            format!("unpatched jump `{}` at {ip}", instr.name())
                        }
                        _ => format!("operand {op} of `{}` at {ip} is out of range", instr.name()),
                    };
                    return Err(self.error(msg, ip));
                }
            }
        }

        Ok(CompiledTemplate {
            name: self.name.clone(),
            instrs: self.instrs.clone(),
            strings: self.strings.clone(),
            args,
            has_formal_args: self.has_formal_args,
            anonymous: self.anonymous,
            region: self.region,
            subtemplates: self.subtemplates.clone(),
            source: self.source.clone(),
            source_map: self.source_map.clone(),
        })
    }

    fn emit(&mut self, instr: Instr) -> &mut Self {
        self.push(instr);
        self
    }

    fn push_arg(&mut self, name: String, default: Option<DefaultValue>) -> &mut Self {
        self.has_formal_args = true;
        push_formal(&mut self.args, &name, default);
        self
    }

    fn error(&self, msg: String, ip: usize) -> Error {
        let span = self.source_map.get(ip).copied().flatten();
        match (&self.source, span) {
            (Some(source), Some(span)) if !source.is_empty() && span.n <= source.len() => {
                Error::span(msg, source, span)
            }
            _ => Error::new(msg),
        }
    }
}

fn push_formal(args: &mut Vec<FormalArg>, name: &str, default: Option<DefaultValue>) {
    args.push(FormalArg {
        name: name.to_owned(),
        index: args.len(),
        default,
    });
}

/// The name a region is registered under in a group.
pub fn region_name(enclosing: &str, name: &str) -> String {
    format!("region__{enclosing}__{name}")
}

#[cfg(feature = "unicode")]
fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || unicode_ident::is_xid_start(c) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

#[cfg(not(feature = "unicode"))]
fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
