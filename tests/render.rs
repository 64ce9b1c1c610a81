mod helpers {
    pub mod writer;
}

use pretty_assertions::assert_eq;

use stencil::{
    CompiledTemplate, ErrorBuffer, ErrorKind, EventKind, Group, RenderEvent, RenderOption,
    TemplateBuilder, Value, ValueKind,
};

use crate::helpers::writer::Writer;

fn group(templates: Vec<CompiledTemplate>) -> (Group, ErrorBuffer) {
    let errors = ErrorBuffer::new();
    let mut builder = Group::builder();
    for t in templates {
        builder.template(t);
    }
    let group = builder.error_listener(errors.clone()).build().unwrap();
    (group, errors)
}

#[test]
fn render_text_and_attribute() {
    let t = TemplateBuilder::new("t")
        .arg("name")
        .text("Hello ")
        .load_attr("name")
        .write()
        .text("!")
        .build()
        .unwrap();
    let (group, errors) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("name", "World").unwrap();
    assert_eq!(st.render().to_string(), "Hello World!");
    assert!(errors.messages().is_empty());
}

#[test]
fn render_scalars() {
    let t = TemplateBuilder::new("t")
        .arg("b")
        .arg("i")
        .arg("f")
        .load_attr("b")
        .write()
        .text(" ")
        .load_attr("i")
        .write()
        .text(" ")
        .load_attr("f")
        .write()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("b", false).unwrap().add("i", -42).unwrap().add("f", 12.5).unwrap();
    assert_eq!(st.render().to_string(), "false -42 12.5");
}

#[test]
fn render_deterministic() {
    let t = TemplateBuilder::new("t")
        .arg("x")
        .load_attr("x")
        .write()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("x", "a").unwrap().add("x", "b").unwrap();
    let before = st.clone();
    let first = st.render().to_string();
    let second = st.render().to_string();
    assert_eq!(first, "ab");
    assert_eq!(first, second);
    assert_eq!(st, before);
}

#[test]
fn render_declared_but_unset_attribute() {
    let t = TemplateBuilder::new("t")
        .arg("x")
        .text("[")
        .load_attr("x")
        .write()
        .text("]")
        .build()
        .unwrap();
    let (group, errors) = group(vec![t]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "[]");
    assert!(errors.messages().is_empty());
}

#[test]
fn render_missing_attribute_reports() {
    let t = TemplateBuilder::new("t")
        .text("[")
        .load_attr("x")
        .write()
        .text("]")
        .build()
        .unwrap();
    let (group, errors) = group(vec![t]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "[]");
    assert_eq!(errors.kinds(), [ErrorKind::NoSuchAttribute]);
    assert_eq!(
        errors.to_strings(),
        ["context [t] attribute x isn't defined"]
    );
}

#[test]
fn render_missing_attribute_with_location() {
    let t = TemplateBuilder::new("t")
        .source("hello <x>")
        .at(6..9)
        .load_attr("x")
        .write()
        .build()
        .unwrap();
    let (group, errors) = group(vec![t]);
    group.instance_of("t").unwrap().render().to_string();
    let messages = errors.messages();
    let msg = &messages[0];
    assert_eq!(msg.line_col(), Some((1, 6)));
    assert_eq!(msg.ip(), Some(0));
    assert_eq!(msg.to_string(), "context [t] 1:6 attribute x isn't defined");
}

#[test]
fn render_dynamic_scope() {
    let outer = TemplateBuilder::new("outer")
        .arg("x")
        .new_instance("inner", 0)
        .write()
        .build()
        .unwrap();
    let inner = TemplateBuilder::new("inner")
        .text("<")
        .load_attr("x")
        .write()
        .text(">")
        .build()
        .unwrap();
    let (group, errors) = group(vec![outer, inner]);
    let mut st = group.instance_of("outer").unwrap();
    st.add("x", "hi").unwrap();
    assert_eq!(st.render().to_string(), "<hi>");
    assert!(errors.messages().is_empty());
}

#[test]
fn render_property() {
    let t = TemplateBuilder::new("t")
        .arg("user")
        .load_attr("user")
        .load_prop("name")
        .write()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("user", stencil::value! { name: "John" }).unwrap();
    assert_eq!(st.render().to_string(), "John");
}

#[test]
fn render_property_indirect() {
    let t = TemplateBuilder::new("t")
        .arg("m")
        .arg("k")
        .load_attr("m")
        .load_attr("k")
        .load_prop_ind()
        .write()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("m", stencil::value! { a: 1, b: 2 }).unwrap();
    st.add("k", "b").unwrap();
    assert_eq!(st.render().to_string(), "2");
}

#[test]
fn render_property_of_instance() {
    let t = TemplateBuilder::new("t")
        .arg("other")
        .load_attr("other")
        .load_prop("x")
        .write()
        .build()
        .unwrap();
    let other = TemplateBuilder::new("other").arg("x").build().unwrap();
    let (group, _) = group(vec![t, other]);
    let mut other = group.instance_of("other").unwrap();
    other.add("x", "inner value").unwrap();
    let mut st = group.instance_of("t").unwrap();
    st.add("other", other).unwrap();
    assert_eq!(st.render().to_string(), "inner value");
}

#[test]
fn render_no_such_property() {
    let t = TemplateBuilder::new("t")
        .arg("s")
        .arg("n")
        .load_attr("s")
        .load_prop("len")
        .write()
        .load_attr("n")
        .load_prop("len")
        .write()
        .build()
        .unwrap();
    let (group, errors) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("s", "abc").unwrap();
    assert_eq!(st.render().to_string(), "");
    let messages: Vec<_> = errors.messages().iter().map(|m| m.message()).collect();
    assert_eq!(
        messages,
        [
            "no such property or can't access: string.len",
            "no such property or can't access: null.len",
        ]
    );
}

#[test]
fn render_custom_adaptor() {
    let t = TemplateBuilder::new("t")
        .arg("s")
        .load_attr("s")
        .load_prop("len")
        .write()
        .build()
        .unwrap();
    let group = Group::builder()
        .template(t)
        .adaptor(ValueKind::String, |owner: &Value, name: &str| {
            match (owner, name) {
                (Value::String(s), "len") => Some(Value::from(s.len())),
                _ => None,
            }
        })
        .build()
        .unwrap();
    let mut st = group.instance_of("t").unwrap();
    st.add("s", "abcd").unwrap();
    assert_eq!(st.render().to_string(), "4");
}

#[test]
fn render_dictionary() {
    let t = TemplateBuilder::new("t")
        .load_attr("colors")
        .load_prop("red")
        .write()
        .text(",")
        .load_attr("colors")
        .load_prop("blue")
        .write()
        .text(",")
        .load_attr("colors")
        .load_prop("green")
        .write()
        .build()
        .unwrap();
    let errors = ErrorBuffer::new();
    let base = Group::builder()
        .dictionary(
            "colors",
            [("red", "#f00"), ("green", "key"), ("default", "key")],
        )
        .build()
        .unwrap();
    let group = Group::builder()
        .template(t)
        .import(&base)
        .error_listener(errors.clone())
        .build()
        .unwrap();
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "#f00,blue,green");
    assert!(errors.messages().is_empty());
}

#[test]
fn render_options_separator_and_null() {
    let t = TemplateBuilder::new("t")
        .arg("items")
        .load_attr("items")
        .options()
        .load_str(", ")
        .store_option(RenderOption::Separator)
        .write_opt()
        .text(" | ")
        .load_attr("items")
        .options()
        .load_str(", ")
        .store_option(RenderOption::Separator)
        .load_str("-")
        .store_option(RenderOption::Null)
        .write_opt()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add(
        "items",
        Value::from([Value::from(1), Value::None, Value::from(3)]),
    )
    .unwrap();
    assert_eq!(st.render().to_string(), "1, 3 | 1, -, 3");
}

#[test]
fn render_null_option_for_missing_value() {
    let t = TemplateBuilder::new("t")
        .arg("x")
        .load_attr("x")
        .options()
        .load_str("n/a")
        .store_option(RenderOption::Null)
        .write_opt()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "n/a");
}

#[test]
fn render_map_keys_or_values() {
    let t = TemplateBuilder::new("t")
        .arg("m")
        .load_attr("m")
        .write()
        .build()
        .unwrap();
    let keys = Group::builder().template(t.clone()).build().unwrap();
    let values = Group::builder()
        .template(t)
        .iterate_map_values(true)
        .build()
        .unwrap();
    for (group, expected) in [(keys, "ab"), (values, "12")] {
        let mut st = group.instance_of("t").unwrap();
        st.add("m", stencil::value! { a: 1, b: 2 }).unwrap();
        assert_eq!(st.render().to_string(), expected);
    }
}

#[cfg(feature = "builtins")]
#[test]
fn render_format_builtin_renderers() {
    use stencil::fmt::{NumberRenderer, StringRenderer};

    let t = TemplateBuilder::new("t")
        .arg("s")
        .arg("n")
        .load_attr("s")
        .options()
        .load_str("upper")
        .store_option(RenderOption::Format)
        .write_opt()
        .text(" ")
        .load_attr("n")
        .options()
        .load_str("%.2f")
        .store_option(RenderOption::Format)
        .write_opt()
        .build()
        .unwrap();
    let group = Group::builder()
        .template(t)
        .renderer(ValueKind::String, StringRenderer)
        .renderer(ValueKind::Float, NumberRenderer)
        .build()
        .unwrap();
    let mut st = group.instance_of("t").unwrap();
    st.add("s", "hello").unwrap().add("n", 1.23456).unwrap();
    assert_eq!(st.render().to_string(), "HELLO 1.23");
}

#[test]
fn render_renderer_receives_locale() {
    let t = TemplateBuilder::new("t")
        .arg("b")
        .load_attr("b")
        .write()
        .build()
        .unwrap();
    let group = Group::builder()
        .template(t)
        .renderer(
            ValueKind::Bool,
            |v: &Value, _: Option<&str>, locale: &str| match v {
                Value::Bool(true) => format!("{locale}:yes"),
                _ => format!("{locale}:no"),
            },
        )
        .build()
        .unwrap();
    let mut st = group.instance_of("t").unwrap();
    st.add("b", true).unwrap();
    assert_eq!(st.render().to_string(), "en:yes");
    assert_eq!(st.render().with_locale("fr").to_string(), "fr:yes");
}

#[test]
fn render_type_proxy() {
    let t = TemplateBuilder::new("t")
        .arg("n")
        .load_attr("n")
        .write()
        .build()
        .unwrap();
    let group = Group::builder()
        .template(t)
        .type_proxy(ValueKind::Integer, |v: &Value| match v {
            Value::Integer(n) => Value::from(format!("#{n}")),
            v => v.clone(),
        })
        .build()
        .unwrap();
    let mut st = group.instance_of("t").unwrap();
    st.add("n", 7).unwrap();
    assert_eq!(st.render().to_string(), "#7");
}

#[test]
fn render_newline_suppressed_after_empty_write() {
    let t = TemplateBuilder::new("t")
        .arg("x")
        .text("a")
        .newline()
        .load_attr("x")
        .write()
        .newline()
        .text("b")
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "a\nb");
    st.add("x", "x").unwrap();
    assert_eq!(st.render().to_string(), "a\nx\nb");
}

#[test]
fn render_consecutive_newlines() {
    let t = TemplateBuilder::new("t")
        .newline()
        .text("a")
        .newline()
        .newline()
        .text("b")
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "a\n\nb");
}

#[test]
fn render_leading_newline_suppressed() {
    let outer = TemplateBuilder::new("outer")
        .text("a")
        .new_instance("inner", 0)
        .write()
        .build()
        .unwrap();
    let inner = TemplateBuilder::new("inner")
        .newline()
        .text("b")
        .build()
        .unwrap();
    let (group, _) = group(vec![outer, inner]);
    let st = group.instance_of("outer").unwrap();
    assert_eq!(st.render().to_string(), "ab");
}

fn indented() -> CompiledTemplate {
    TemplateBuilder::new("t")
        .text("a")
        .newline()
        .indent("  ")
        .text("b")
        .newline()
        .text("c")
        .dedent()
        .newline()
        .text("d")
        .build()
        .unwrap()
}

#[test]
fn render_indent() {
    let (group, errors) = group(vec![indented()]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "a\n  b\n  c\nd");
    assert!(errors.messages().is_empty());
}

#[test]
fn render_without_indent() {
    let (group, _) = group(vec![indented()]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().with_indent(false).to_string(), "a\nb\nc\nd");
}

#[test]
fn render_custom_newline() {
    let (group, _) = group(vec![indented()]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(
        st.render().with_newline("\r\n").to_string(),
        "a\r\n  b\r\n  c\r\nd"
    );
}

#[test]
fn render_dedent_empty_stack_abandons_template() {
    let t = TemplateBuilder::new("t")
        .text("a")
        .dedent()
        .text("b")
        .build()
        .unwrap();
    let (group, errors) = group(vec![t]);
    let st = group.instance_of("t").unwrap();
    assert_eq!(st.render().to_string(), "a");
    assert_eq!(errors.kinds(), [ErrorKind::InternalError]);
    assert_eq!(
        errors.to_strings(),
        ["context [t] internal error: pop of empty indentation stack"]
    );
}

#[test]
fn render_fault_only_abandons_inner_template() {
    let outer = TemplateBuilder::new("outer")
        .text("<")
        .new_instance("inner", 0)
        .write()
        .text(">")
        .build()
        .unwrap();
    let inner = TemplateBuilder::new("inner")
        .text("x")
        .op(stencil::Instr::Pop)
        .text("y")
        .build()
        .unwrap();
    let (group, errors) = group(vec![outer, inner]);
    let st = group.instance_of("outer").unwrap();
    assert_eq!(st.render().to_string(), "<x>");
    assert_eq!(
        errors.to_strings(),
        ["context [outer inner] internal error: operand stack underflow"]
    );
}

#[test]
fn render_wrap() {
    let t = TemplateBuilder::new("t")
        .arg("items")
        .load_attr("items")
        .options()
        .load_str(",")
        .store_option(RenderOption::Separator)
        .load_str("\n")
        .store_option(RenderOption::Wrap)
        .write_opt()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("items", Value::from(["aaaa", "bbbb", "cccc", "dddd"]))
        .unwrap();
    assert_eq!(
        st.render().with_line_width(10).to_string(),
        "aaaa,bbbb,\ncccc,dddd"
    );
    assert_eq!(st.render().to_string(), "aaaa,bbbb,cccc,dddd");
}

#[test]
fn render_wrap_under_anchor() {
    let t = TemplateBuilder::new("t")
        .arg("items")
        .text("x: ")
        .load_attr("items")
        .options()
        .bool(true)
        .store_option(RenderOption::Anchor)
        .load_str(", ")
        .store_option(RenderOption::Separator)
        .load_str("\n")
        .store_option(RenderOption::Wrap)
        .write_opt()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("items", Value::from(["aa", "bb", "cc"])).unwrap();
    assert_eq!(
        st.render().with_line_width(8).to_string(),
        "x: aa, bb, \n   cc"
    );
}

#[test]
fn render_to_writer() {
    let t = TemplateBuilder::new("t")
        .arg("name")
        .text("Hello ")
        .load_attr("name")
        .write()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    let mut st = group.instance_of("t").unwrap();
    st.add("name", "World").unwrap();
    let mut w = Writer::new();
    st.render().to_writer(&mut w).unwrap();
    assert_eq!(w.into_string(), "Hello World");
}

#[test]
fn render_to_writer_err() {
    let t = TemplateBuilder::new("t").text("ab").build().unwrap();
    let (group, errors) = group(vec![t]);
    let st = group.instance_of("t").unwrap();
    let mut w = Writer::with_max(1);
    let err = st.render().to_writer(&mut w).unwrap_err();
    assert_eq!(err.to_string(), "io error: sink closed");
    assert_eq!(errors.kinds(), [ErrorKind::IoError]);
    assert_eq!(w.into_string(), "a");
}

#[test]
fn render_events() {
    let outer = TemplateBuilder::new("outer")
        .text("a")
        .new_instance("inner", 0)
        .write()
        .text("c")
        .build()
        .unwrap();
    let inner = TemplateBuilder::new("inner").text("b").build().unwrap();
    let (group, _) = group(vec![outer, inner]);
    let st = group.instance_of("outer").unwrap();
    let (s, events) = st.render().to_string_with_events();
    assert_eq!(s, "abc");
    let event = |kind, template: &str, start, stop| RenderEvent {
        kind,
        template: template.to_owned(),
        start,
        stop,
    };
    assert_eq!(
        events,
        [
            event(EventKind::Template, "inner", 1, 2),
            event(EventKind::Expr, "outer", 1, 2),
            event(EventKind::Template, "outer", 0, 3),
        ]
    );
}

#[test]
fn render_across_threads() {
    let t = TemplateBuilder::new("t")
        .arg("n")
        .load_attr("n")
        .write()
        .build()
        .unwrap();
    let (group, _) = group(vec![t]);
    std::thread::scope(|s| {
        for n in 0..4 {
            let group = &group;
            s.spawn(move || {
                let mut st = group.instance_of("t").unwrap();
                st.add("n", n).unwrap();
                assert_eq!(st.render().to_string(), n.to_string());
            });
        }
    });
}
