#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

// Any program that passes validation must render without panicking.
fuzz_target!(|data: (&[u8], Vec<String>, Value)| {
    let (bytes, strings, value) = data;
    let instrs = match stencil::bytecode::decode(bytes) {
        Ok(instrs) => instrs,
        Err(_) => return,
    };
    let template = match stencil::TemplateBuilder::new("fuzz")
        .arg("x")
        .program(instrs, strings)
        .build()
    {
        Ok(t) => t,
        Err(_) => return,
    };
    let group = stencil::Group::builder()
        .template(template)
        .error_listener(stencil::ErrorBuffer::new())
        .build()
        .unwrap();
    let mut st = group.instance_of("fuzz").unwrap();
    st.add("x", stencil::to_value(value).unwrap()).unwrap();
    let _ = st.render().with_line_width(20).to_string();
});
