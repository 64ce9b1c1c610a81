pub mod context;
#[cfg(test)]
mod tests;

use stencil::{CompiledTemplate, Group, Instance, RenderOption, TemplateBuilder};

/// page(title, users) ::= <<
/// <title>
///   <users:user(); separator="\n">
/// >>
pub fn page() -> CompiledTemplate {
    TemplateBuilder::new("page")
        .arg("title")
        .arg("users")
        .load_attr("title")
        .write()
        .newline()
        .indent("  ")
        .load_attr("users")
        .null()
        .new_instance("user", 1)
        .map()
        .options()
        .load_str("\n")
        .store_option(RenderOption::Separator)
        .write_opt()
        .dedent()
        .build()
        .unwrap()
}

/// user(u) ::= "<u.name> (<u.age>)<if(u.is_disabled)> disabled<endif>"
pub fn user() -> CompiledTemplate {
    let mut b = TemplateBuilder::new("user");
    b.arg("u")
        .load_attr("u")
        .load_prop("name")
        .write()
        .text(" (")
        .load_attr("u")
        .load_prop("age")
        .write()
        .text(")")
        .load_attr("u")
        .load_prop("is_disabled");
    let j = b.brf_forward();
    b.text(" disabled").update_jump(j);
    b.build().unwrap()
}

pub fn group() -> Group {
    Group::builder()
        .name("bench")
        .template(page())
        .template(user())
        .build()
        .unwrap()
}

/// Create a page instance for the given context.
pub fn instance(group: &Group, ctx: &context::Context) -> Instance {
    let mut st = group.instance_of("page").unwrap();
    st.add("title", ctx.title.as_str()).unwrap();
    st.add("users", stencil::to_value(&ctx.users).unwrap())
        .unwrap();
    st
}
