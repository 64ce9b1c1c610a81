use std::sync::Arc;

use crate::adaptor;
use crate::fmt;
use crate::listener::{ErrorKind, ErrorListener, RenderMessage};
use crate::options::{self, OptionStrings, Options, RenderOption, NUM_OPTIONS};
use crate::render::frame::Frame;
use crate::render::iter::{self, Coerced};
use crate::render::stack::{Operand, Stack};
use crate::render::{EventKind, Fault, RenderEvent};
use crate::types::program::{CompiledTemplate, DefaultValue, Instr, IMPLICIT_ARG};
use crate::value::{List, Map};
use crate::write::TemplateWriter;
use crate::{Error, Instance, Result, Value};

/// Remaining native stack below which a nested template gets a new segment.
const RED_ZONE: usize = 64 * 1024;

/// Size of each native stack segment allocated for nested templates.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Executes compiled templates against a writer.
///
/// One interpreter is used for a whole render. Every template invocation gets
/// its own operand stack and [`Frame`], so a fault only abandons the template
/// it happened in.
pub struct Interpreter<'r> {
    pub(crate) listener: &'r dyn ErrorListener,
    pub(crate) locale: &'r str,
    pub(crate) max_depth: usize,
    pub(crate) events: Option<Vec<RenderEvent>>,
}

impl<'r> Interpreter<'r> {
    /// Execute the template of `frame`, returning the number of characters
    /// written.
    pub fn exec(&mut self, out: &mut dyn TemplateWriter, frame: &mut Frame<'_>) -> usize {
        self.set_defaults(out, frame);
        let frame = &*frame;
        let start = out.index();
        let mut stack = Stack::default();
        // nested templates recurse through `run` so grow the native stack
        // before it runs out
        let result = stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || {
            self.run(out, frame, &mut stack)
        });
        let n = match result {
            Ok(n) => n,
            Err(fault) => {
                tracing::debug!(
                    template = frame.instance.name(),
                    ip = frame.ip.get(),
                    "abandoned template: {fault}"
                );
                let msg = self.message(frame, ErrorKind::InternalError, vec![fault.to_string()]);
                self.listener.internal_error(&msg);
                0
            }
        };
        self.record(EventKind::Template, frame, start, out.index());
        n
    }

    fn run(
        &mut self,
        out: &mut dyn TemplateWriter,
        frame: &Frame<'_>,
        stack: &mut Stack,
    ) -> std::result::Result<usize, Fault> {
        let template = &frame.instance.template;
        let map_values = frame.instance.group.iterate_map_values();

        // characters written in total and since the last newline
        let mut n = 0;
        let mut nwline = 0;
        let mut prev: Option<&Instr> = None;
        let mut ip = 0;

        while let Some(instr) = template.instrs.get(ip) {
            frame.ip.set(ip);
            tracing::trace!(
                template = %template.name,
                ip,
                instr = %instr,
                depth = stack.len(),
                "dispatch"
            );
            let mut next = ip + 1;

            match *instr {
                Instr::LoadStr(s) => {
                    let s = string(template, s)?;
                    stack.push(Value::from(s));
                }

                Instr::LoadAttr(s) => {
                    let name = string(template, s)?;
                    let value = match self.lookup(frame, name) {
                        Some(value) => value,
                        None => {
                            self.report(frame, ErrorKind::NoSuchAttribute, vec![name.to_owned()]);
                            Value::None
                        }
                    };
                    stack.push(value);
                }

                Instr::LoadLocal(i) => {
                    stack.push(local(frame, i)?);
                }

                Instr::LoadProp(s) => {
                    let name = string(template, s)?;
                    let owner = stack.pop()?;
                    stack.push(self.property(frame, &owner, name));
                }

                Instr::LoadPropInd => {
                    let key = stack.pop()?;
                    let owner = stack.pop()?;
                    let name = fmt::display(&key);
                    stack.push(self.property(frame, &owner, &name));
                }

                Instr::StoreOption(o) => {
                    let value = stack.pop()?;
                    let opts = stack.top_options_mut()?;
                    if o < NUM_OPTIONS {
                        opts[o] = Some(value);
                    } else {
                        self.report(frame, ErrorKind::InvalidOptionValue, vec![o.to_string()]);
                    }
                }

                Instr::StoreArg(s) => {
                    let name = string(template, s)?;
                    let value = stack.pop()?;
                    stack.top_args_mut()?.insert(name.to_owned(), value);
                }

                Instr::New(s, nargs) => {
                    let name = string(template, s)?;
                    let args = stack.pop_n(nargs)?;
                    let st = match self.instance_of(frame, name) {
                        Some(mut st) => {
                            self.store_positional(frame, &mut st, args);
                            st
                        }
                        None => blank(frame, name),
                    };
                    stack.push(Value::Template(st));
                }

                Instr::NewInd(nargs) => {
                    let args = stack.pop_n(nargs)?;
                    let name = fmt::display(&stack.pop()?);
                    let st = match self.instance_of(frame, &name) {
                        Some(mut st) => {
                            self.store_positional(frame, &mut st, args);
                            st
                        }
                        None => blank(frame, &name),
                    };
                    stack.push(Value::Template(st));
                }

                Instr::NewBoxArgs(s) => {
                    let name = string(template, s)?;
                    let args = stack.pop_args()?;
                    let st = match self.instance_of(frame, name) {
                        Some(mut st) => {
                            self.store_named(frame, &mut st, args);
                            st
                        }
                        None => blank(frame, name),
                    };
                    stack.push(Value::Template(st));
                }

                Instr::SuperNew(s, nargs) => {
                    let name = string(template, s)?;
                    let args = stack.pop_n(nargs)?;
                    let st = match self.super_instance_of(frame, name) {
                        Some(mut st) => {
                            self.store_positional(frame, &mut st, args);
                            st
                        }
                        None => blank(frame, name),
                    };
                    stack.push(Value::Template(st));
                }

                Instr::SuperNewBoxArgs(s) => {
                    let name = string(template, s)?;
                    let args = stack.pop_args()?;
                    let st = match self.super_instance_of(frame, name) {
                        Some(mut st) => {
                            self.store_named(frame, &mut st, args);
                            st
                        }
                        None => blank(frame, name),
                    };
                    stack.push(Value::Template(st));
                }

                Instr::Write => {
                    let value = stack.pop()?;
                    let start = out.index();
                    let nw = self.write_object(out, frame, value, &OptionStrings::default());
                    self.record(EventKind::Expr, frame, start, out.index());
                    n += nw;
                    nwline += nw;
                }

                Instr::WriteOpt => {
                    let opts = stack.pop_options()?;
                    let value = stack.pop()?;
                    let start = out.index();
                    let nw = self.write_with_options(out, frame, value, &opts)?;
                    self.record(EventKind::Expr, frame, start, out.index());
                    n += nw;
                    nwline += nw;
                }

                Instr::Map => {
                    let proto = into_instance(stack.pop()?)?;
                    let attr = stack.pop()?;
                    let mapped = self.rot_map(frame, attr, &[proto], map_values);
                    stack.push(mapped);
                }

                Instr::RotMap(nprotos) => {
                    let protos = stack
                        .pop_n(nprotos)?
                        .into_iter()
                        .map(into_instance)
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    if protos.is_empty() {
                        return Err(Fault::new("rot_map requires at least one template"));
                    }
                    let attr = stack.pop()?;
                    let mapped = self.rot_map(frame, attr, &protos, map_values);
                    stack.push(mapped);
                }

                Instr::ZipMap(nexprs) => {
                    let proto = into_instance(stack.pop()?)?;
                    let exprs = stack.pop_n(nexprs)?;
                    let mapped = self.zip_map(frame, exprs, proto, map_values);
                    stack.push(mapped);
                }

                Instr::Br(j) => {
                    next = target(template, j)?;
                }

                Instr::Brf(j) => {
                    let j = target(template, j)?;
                    if !stack.pop()?.is_truthy() {
                        next = j;
                    }
                }

                Instr::Options => {
                    stack.push_operand(Operand::Options(Box::new(options::empty())));
                }

                Instr::Args => {
                    stack.push_operand(Operand::Args(Map::new()));
                }

                Instr::PassThru(s) => {
                    let name = string(template, s)?;
                    let args = stack.top_args_mut()?;
                    self.pass_thru(frame, name, args);
                }

                Instr::List => {
                    stack.push(Value::List(List::new()));
                }

                Instr::Add => {
                    let value = stack.pop()?;
                    iter::add_to_list(stack.top_list_mut()?, value, map_values);
                }

                Instr::ToStr => {
                    let value = match stack.pop()? {
                        value @ (Value::None | Value::String(_)) => value,
                        value => Value::String(self.to_text(out, frame, value)),
                    };
                    stack.push(value);
                }

                Instr::First => {
                    let value = stack.pop()?;
                    stack.push(iter::first(value, map_values));
                }

                Instr::Last => {
                    let value = stack.pop()?;
                    stack.push(iter::last(value, map_values));
                }

                Instr::Rest => {
                    let value = stack.pop()?;
                    stack.push(iter::rest(value, map_values));
                }

                Instr::Trunc => {
                    let value = stack.pop()?;
                    stack.push(iter::trunc(value, map_values));
                }

                Instr::Strip => {
                    let value = stack.pop()?;
                    stack.push(iter::strip(value, map_values));
                }

                Instr::Reverse => {
                    let value = stack.pop()?;
                    stack.push(iter::reverse(value, map_values));
                }

                Instr::Length => {
                    let value = stack.pop()?;
                    stack.push(Value::from(iter::length(&value)));
                }

                Instr::Strlen => {
                    let len = match stack.pop()? {
                        Value::None => 0,
                        Value::String(s) => s.chars().count(),
                        value => {
                            self.type_mismatch(frame, "strlen", &value);
                            0
                        }
                    };
                    stack.push(Value::from(len));
                }

                Instr::Trim => {
                    let value = match stack.pop()? {
                        Value::String(s) => Value::from(s.trim()),
                        Value::None => Value::None,
                        value => {
                            self.type_mismatch(frame, "trim", &value);
                            value
                        }
                    };
                    stack.push(value);
                }

                Instr::Not => {
                    let value = stack.pop()?;
                    stack.push(Value::Bool(!value.is_truthy()));
                }

                Instr::Or => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    stack.push(Value::Bool(a.is_truthy() || b.is_truthy()));
                }

                Instr::And => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    stack.push(Value::Bool(a.is_truthy() && b.is_truthy()));
                }

                Instr::Indent(s) => {
                    out.push_indentation(string(template, s)?);
                }

                Instr::Dedent => {
                    out.pop_indentation()?;
                }

                Instr::Newline => {
                    let after_newline = matches!(prev, Some(Instr::Newline | Instr::Indent(_)));
                    if after_newline || nwline > 0 {
                        n += self.emit(frame, out.write("\n"));
                    }
                    nwline = 0;
                }

                Instr::Noop => {}

                Instr::Pop => {
                    stack.pop()?;
                }

                Instr::Null => stack.push(Value::None),
                Instr::True => stack.push(Value::Bool(true)),
                Instr::False => stack.push(Value::Bool(false)),

                Instr::WriteStr(s) => {
                    let s = string(template, s)?;
                    let nw = self.emit(frame, out.write(s));
                    n += nw;
                    nwline += nw;
                }

                Instr::WriteLocal(i) => {
                    let value = local(frame, i)?;
                    let nw = self.write_object(out, frame, value, &OptionStrings::default());
                    n += nw;
                    nwline += nw;
                }
            }

            prev = Some(instr);
            ip = next;
        }

        Ok(n)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Writing values
    ////////////////////////////////////////////////////////////////////////////

    fn write_with_options(
        &mut self,
        out: &mut dyn TemplateWriter,
        frame: &Frame<'_>,
        value: Value,
        opts: &Options,
    ) -> std::result::Result<usize, Fault> {
        let mut strings = OptionStrings::default();
        for (s, opt) in strings.iter_mut().zip(opts.iter()) {
            *s = match opt {
                Some(v) => Some(self.to_text(out, frame, v.clone())),
                None => None,
            };
        }
        let anchor = strings[RenderOption::Anchor.index()].is_some();
        if anchor {
            out.push_anchor_point();
        }
        let n = self.write_object(out, frame, value, &strings);
        if anchor {
            out.pop_anchor_point()?;
        }
        Ok(n)
    }

    fn write_object(
        &mut self,
        out: &mut dyn TemplateWriter,
        frame: &Frame<'_>,
        value: Value,
        opts: &OptionStrings,
    ) -> usize {
        if value.is_none() {
            return match option(opts, RenderOption::Null) {
                Some(null) => self.write_scalar(out, frame, &Value::from(null), opts),
                None => 0,
            };
        }
        let group = &frame.instance.group;
        let value = match group.proxy(value.kind()) {
            Some(proxy) => proxy.proxy(&value),
            None => value,
        };
        match value {
            Value::Template(st) => {
                if self.overflows(frame) {
                    return 0;
                }
                let n = self.emit(frame, out.write_wrap(option(opts, RenderOption::Wrap)));
                let mut child = frame.child(st);
                n + self.exec(out, &mut child)
            }
            value @ (Value::List(_) | Value::Map(_)) => {
                let items = iter::to_seq(value, group.iterate_map_values());
                self.write_iterator(out, frame, items, opts)
            }
            value => self.write_scalar(out, frame, &value, opts),
        }
    }

    fn write_iterator(
        &mut self,
        out: &mut dyn TemplateWriter,
        frame: &Frame<'_>,
        items: List<Value>,
        opts: &OptionStrings,
    ) -> usize {
        let separator = option(opts, RenderOption::Separator);
        let null = option(opts, RenderOption::Null);
        let mut n = 0;
        let mut seen = false;
        for item in items {
            let item = match (item, null) {
                (Value::None, None) => continue,
                (Value::None, Some(null)) => Value::from(null),
                (item, _) => item,
            };
            if seen {
                if let Some(sep) = separator {
                    n += self.emit(frame, out.write_separator(sep));
                }
            }
            let nw = self.write_object(out, frame, item, opts);
            if nw > 0 {
                seen = true;
            }
            n += nw;
        }
        n
    }

    fn write_scalar(
        &self,
        out: &mut dyn TemplateWriter,
        frame: &Frame<'_>,
        value: &Value,
        opts: &OptionStrings,
    ) -> usize {
        let format = option(opts, RenderOption::Format);
        let text = match frame.instance.group.renderer(value.kind()) {
            Some(renderer) => renderer.render(value, format, self.locale),
            None => fmt::display(value),
        };
        let wrap = option(opts, RenderOption::Wrap);
        self.emit(frame, out.write_wrapped(&text, wrap))
    }

    /// Render a value to text using a fresh writer of the same kind.
    fn to_text(&self, out: &dyn TemplateWriter, frame: &Frame<'_>, value: Value) -> String {
        let mut buf = String::new();
        {
            let mut w = out.fork(&mut buf);
            let mut fork = self.fork();
            fork.write_object(&mut *w, frame, value, &OptionStrings::default());
        }
        buf
    }

    fn fork(&self) -> Interpreter<'r> {
        Interpreter {
            listener: self.listener,
            locale: self.locale,
            max_depth: self.max_depth,
            events: None,
        }
    }

    fn overflows(&self, frame: &Frame<'_>) -> bool {
        if frame.depth + 1 > self.max_depth {
            self.report(
                frame,
                ErrorKind::StackOverflow,
                vec![self.max_depth.to_string()],
            );
            return true;
        }
        false
    }

    /// Report a writer error, treating it as zero characters written.
    fn emit(&self, frame: &Frame<'_>, result: Result<usize>) -> usize {
        match result {
            Ok(n) => n,
            Err(err) => {
                let msg = self.message(frame, ErrorKind::IoError, vec![err.to_string()]);
                self.listener.io_error(&msg);
                0
            }
        }
    }

    fn record(&mut self, kind: EventKind, frame: &Frame<'_>, start: usize, stop: usize) {
        if let Some(events) = &mut self.events {
            events.push(RenderEvent {
                kind,
                template: frame.instance.name().to_owned(),
                start,
                stop,
            });
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Attributes and properties
    ////////////////////////////////////////////////////////////////////////////

    /// Resolve an attribute through the scope chain and then the group's
    /// dictionaries. Declared but unset attributes are `Value::None`.
    fn lookup(&self, frame: &Frame<'_>, name: &str) -> Option<Value> {
        match frame.resolve(name) {
            Some(value) => Some(value.cloned().unwrap_or_default()),
            None => frame
                .instance
                .group
                .find_dictionary(name)
                .map(|dict| Value::Map(dict.clone())),
        }
    }

    fn property(&self, frame: &Frame<'_>, owner: &Value, name: &str) -> Value {
        if owner.is_none() {
            self.report(frame, ErrorKind::NoSuchProperty, vec![format!("null.{name}")]);
            return Value::None;
        }
        let found = match frame.instance.group.adaptor(owner.kind()) {
            Some(adaptor) => adaptor.property(owner, name),
            None => adaptor::default_property(owner, name),
        };
        match found {
            Some(value) => value,
            None => {
                self.report(
                    frame,
                    ErrorKind::NoSuchProperty,
                    vec![format!("{}.{name}", owner.kind())],
                );
                Value::None
            }
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Instances and arguments
    ////////////////////////////////////////////////////////////////////////////

    fn instance_of(&self, frame: &Frame<'_>, name: &str) -> Option<Instance> {
        let st = frame.instance.group.instance_of(name);
        if st.is_none() {
            self.report(frame, ErrorKind::NoSuchTemplate, vec![name.to_owned()]);
        }
        st
    }

    /// Create an instance of `name` as defined by the imports of the group
    /// that defines the enclosing named template.
    fn super_instance_of(&self, frame: &Frame<'_>, name: &str) -> Option<Instance> {
        let group = &frame.instance.group;
        let enclosing = frame
            .ancestors()
            .map(|f| &f.instance.template)
            .find(|t| !t.anonymous)
            .unwrap_or(&frame.instance.template);
        let native = group
            .native_group_of(enclosing)
            .or_else(|| {
                // an instance that declared attributes on the fly owns a copy
                let t = group.lookup_template(&enclosing.name)?;
                group.native_group_of(&t)
            })
            .unwrap_or(group);
        match native.lookup_imported_template(name) {
            Some(t) => Some(native.create_instance(t)),
            None => {
                self.report(frame, ErrorKind::NoImportedTemplate, vec![name.to_owned()]);
                None
            }
        }
    }

    fn store_positional(&self, frame: &Frame<'_>, st: &mut Instance, args: Vec<Value>) {
        let declared = st.template.num_declared_args();
        let required = declared.saturating_sub(st.template.num_defaults());
        if args.len() < required || args.len() > declared {
            self.arg_count_mismatch(frame, st, args.len(), declared);
        }
        if st.template.args.is_empty() {
            return;
        }
        for (slot, value) in st.locals.iter_mut().zip(args).take(declared) {
            *slot = Some(value);
        }
    }

    fn store_named(&self, frame: &Frame<'_>, st: &mut Instance, args: Map<String, Value>) {
        if !st.template.has_formal_args {
            for (name, value) in args {
                st.declare_and_set(&name, value);
            }
            return;
        }

        let nargs = args.len();
        let mut reported = false;
        for (name, value) in args {
            if !st.raw_set(&name, value) {
                self.report(frame, ErrorKind::NoSuchAttribute, vec![name]);
                reported = true;
            }
        }

        let template = &st.template;
        let declared = template.num_declared_args();
        let missing = template.args.iter().any(|arg| {
            arg.default.is_none()
                && !template.is_implicit_index(arg)
                && st.locals.get(arg.index).map_or(true, Option::is_none)
        });
        if (missing || nargs > declared) && !reported {
            self.arg_count_mismatch(frame, st, nargs, declared);
        }
    }

    fn set_first_argument(&self, frame: &Frame<'_>, st: &mut Instance, value: Value) {
        if st.template.args.is_empty() {
            if st.template.has_formal_args {
                self.arg_count_mismatch(frame, st, 1, 0);
            } else {
                st.declare_and_set(IMPLICIT_ARG, value);
            }
            return;
        }
        st.locals[0] = Some(value);
    }

    fn arg_count_mismatch(&self, frame: &Frame<'_>, st: &Instance, n: usize, declared: usize) {
        self.report(
            frame,
            ErrorKind::ArgumentCountMismatch,
            vec![n.to_string(), st.name().to_owned(), declared.to_string()],
        );
    }

    /// Fill the argument map with the attributes in scope that `name` declares
    /// and the map does not already contain.
    fn pass_thru(&self, frame: &Frame<'_>, name: &str, args: &mut Map<String, Value>) {
        let template = match frame.instance.group.lookup_template(name) {
            Some(t) => t,
            None => return,
        };
        for arg in &template.args {
            if template.is_implicit_index(arg) || args.contains_key(&arg.name) {
                continue;
            }
            let has_default = arg.default.is_some();
            match frame.resolve(&arg.name) {
                Some(Some(value)) => {
                    args.insert(arg.name.clone(), value.clone());
                }
                Some(None) if !has_default => {
                    args.insert(arg.name.clone(), Value::None);
                }
                None if !has_default => {
                    self.report(
                        frame,
                        ErrorKind::NoSuchAttributePassThrough,
                        vec![arg.name.clone()],
                    );
                    args.insert(arg.name.clone(), Value::None);
                }
                _ => {}
            }
        }
    }

    /// Give every empty slot that has a default its default value.
    fn set_defaults(&mut self, out: &mut dyn TemplateWriter, frame: &mut Frame<'_>) {
        let template = Arc::clone(&frame.instance.template);
        for arg in &template.args {
            let default = match &arg.default {
                Some(default) => default,
                None => continue,
            };
            if !matches!(frame.instance.locals.get(arg.index), Some(None)) {
                continue;
            }
            let value = match default {
                DefaultValue::Literal(value) => value.clone(),
                DefaultValue::Template { template, eager } => {
                    let st = frame.instance.group.create_instance(Arc::clone(template));
                    if *eager {
                        Value::String(self.eval_eager(out, frame, st))
                    } else {
                        Value::Template(st)
                    }
                }
            };
            frame.instance.locals[arg.index] = Some(value);
        }
    }

    /// Render a default to text as a child of the frame being started.
    fn eval_eager(&self, out: &dyn TemplateWriter, frame: &Frame<'_>, st: Instance) -> String {
        let mut buf = String::new();
        if self.overflows(frame) {
            return buf;
        }
        {
            let mut w = out.fork(&mut buf);
            let mut fork = self.fork();
            let mut child = frame.child(st);
            fork.exec(&mut *w, &mut child);
        }
        buf
    }

    ////////////////////////////////////////////////////////////////////////////
    // Mapping
    ////////////////////////////////////////////////////////////////////////////

    /// Apply the prototypes round-robin to the elements of `attr`.
    fn rot_map(
        &self,
        frame: &Frame<'_>,
        attr: Value,
        protos: &[Instance],
        map_values: bool,
    ) -> Value {
        if attr.is_none() {
            return Value::None;
        }
        match iter::coerce(attr, map_values) {
            Coerced::Seq(items) => {
                let mut mapped = List::with_capacity(items.len());
                let mut k = 0;
                for item in items {
                    if item.is_none() {
                        mapped.push(Value::None);
                        continue;
                    }
                    let st = self.map_one(frame, &protos[k % protos.len()], item, k);
                    mapped.push(Value::Template(st));
                    k += 1;
                }
                Value::List(mapped)
            }
            Coerced::Scalar(value) => Value::Template(self.map_one(frame, &protos[0], value, 0)),
        }
    }

    fn map_one(&self, frame: &Frame<'_>, proto: &Instance, value: Value, k: usize) -> Instance {
        let mut st = proto.clone();
        self.set_first_argument(frame, &mut st, value);
        if st.template.anonymous {
            st.raw_set("i0", Value::from(k));
            st.raw_set("i", Value::from(k + 1));
        }
        st
    }

    /// Apply the prototype to the elements of several attributes in parallel.
    fn zip_map(
        &self,
        frame: &Frame<'_>,
        mut exprs: Vec<Value>,
        proto: Instance,
        map_values: bool,
    ) -> Value {
        if !proto.template.has_formal_args {
            self.report(frame, ErrorKind::MissingFormalArguments, Vec::new());
            return Value::None;
        }
        let mut names: Vec<String> = proto
            .template
            .args
            .iter()
            .filter(|arg| !proto.template.is_implicit_index(arg))
            .map(|arg| arg.name.clone())
            .collect();
        if names.len() != exprs.len() {
            self.report(
                frame,
                ErrorKind::MapArgumentCountMismatch,
                vec![exprs.len().to_string(), names.len().to_string()],
            );
            let len = names.len().min(exprs.len());
            names.truncate(len);
            exprs.truncate(len);
        }

        let mut streams: Vec<_> = exprs
            .into_iter()
            .map(|expr| iter::to_seq(expr, map_values).into_iter())
            .collect();

        let mut mapped = List::new();
        for i in 0_usize.. {
            let mut st = proto.clone();
            let mut exhausted = 0;
            for (name, stream) in names.iter().zip(&mut streams) {
                match stream.next() {
                    Some(value) => {
                        st.raw_set(name, value);
                    }
                    None => exhausted += 1,
                }
            }
            if exhausted == streams.len() {
                break;
            }
            st.raw_set("i0", Value::from(i));
            st.raw_set("i", Value::from(i + 1));
            mapped.push(Value::Template(st));
        }
        Value::List(mapped)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Reporting
    ////////////////////////////////////////////////////////////////////////////

    fn report(&self, frame: &Frame<'_>, kind: ErrorKind, args: Vec<String>) {
        let msg = self.message(frame, kind, args);
        self.listener.runtime_error(&msg);
    }

    fn type_mismatch(&self, frame: &Frame<'_>, function: &str, value: &Value) {
        self.report(
            frame,
            ErrorKind::TypeMismatch,
            vec![function.to_owned(), value.kind().to_string()],
        );
    }

    fn message(&self, frame: &Frame<'_>, kind: ErrorKind, args: Vec<String>) -> RenderMessage {
        let ip = frame.ip.get();
        let msg = RenderMessage::new(kind, args).with_call_stack(frame.call_stack(), ip);
        let template = &frame.instance.template;
        match (template.source(), template.span(ip)) {
            (Some(source), Some(span)) => msg.with_location(source, span),
            _ => msg,
        }
    }
}

fn string(template: &CompiledTemplate, i: usize) -> std::result::Result<&str, Fault> {
    template
        .strings
        .get(i)
        .map(String::as_str)
        .ok_or_else(|| Fault::new(format!("string {i} is out of range")))
}

fn local(frame: &Frame<'_>, i: usize) -> std::result::Result<Value, Fault> {
    match frame.instance.locals.get(i) {
        Some(slot) => Ok(slot.clone().unwrap_or_default()),
        None => Err(Fault::new(format!("slot {i} is out of range"))),
    }
}

fn target(template: &CompiledTemplate, j: usize) -> std::result::Result<usize, Fault> {
    if j > template.instrs.len() {
        return Err(Fault::new(format!("jump to {j} is out of range")));
    }
    Ok(j)
}

fn into_instance(value: Value) -> std::result::Result<Instance, Fault> {
    match value {
        Value::Template(st) => Ok(st),
        value => Err(Fault::new(format!("expected template, found {}", value.human()))),
    }
}

/// An instance that renders nothing, in place of a missing template.
fn blank(frame: &Frame<'_>, name: &str) -> Instance {
    frame
        .instance
        .group
        .create_instance(CompiledTemplate::empty(name))
}

fn option(opts: &OptionStrings, opt: RenderOption) -> Option<&str> {
    opts[opt.index()].as_deref()
}

impl From<Error> for Fault {
    fn from(err: Error) -> Self {
        Fault::new(err.message())
    }
}
