//! A template bytecode interpreter with an auto-indenting output writer.
//!
//! # Features
//!
//! ### Templates
//!
//! - Compiled templates are plain data: a bytecode program, a string pool and
//!   formal argument metadata, built with [`TemplateBuilder`] or decoded from
//!   bytes with [`bytecode::decode`]
//! - Templates are grouped in a [`Group`], which can import other groups and
//!   define named dictionaries
//! - Dynamically scoped attributes: a template sees the attributes of every
//!   template that invoked it
//! - Positional and named arguments, literal and template defaults, and
//!   pass-through of attributes in scope
//! - Mapping templates over multi-valued attributes, round-robin or zipped
//!
//! ### Rendering
//!
//! - Render to a [`String`] or any [`std::io::Write`] implementor
//! - Automatic indentation, anchors and line wrapping
//! - Pluggable attribute renderers, model adaptors and type proxies
//! - Rendering never fails: problems are reported to an [`ErrorListener`]
//! - Build attribute values from any [`serde`] serializable value
//! - Convenient macros for building values and adding attributes:
//!   `stencil::value!{ name: "John", age: 42 }` and
//!   `stencil::attrs!(st, name: "John", langs: ["rust", "go"])`
//!
//! # Getting started
//!
//! A template is assembled from instructions using a [`TemplateBuilder`].
//!
//! ```
//! use stencil::TemplateBuilder;
//!
//! let hello = TemplateBuilder::new("hello")
//!     .arg("name")
//!     .text("Hello ")
//!     .load_attr("name")
//!     .write()
//!     .text("!")
//!     .build()?;
//! # Ok::<(), stencil::Error>(())
//! ```
//!
//! Compiled templates are collected in a [`Group`].
//!
//! ```
//! # use stencil::TemplateBuilder;
//! # let hello = TemplateBuilder::new("hello").arg("name").build()?;
//! use stencil::Group;
//!
//! let group = Group::builder().template(hello).build()?;
//! # Ok::<(), stencil::Error>(())
//! ```
//!
//! Finally, an [`Instance`] of the template is created, its attributes are
//! set and it is rendered.
//!
//! ```
//! # use stencil::{Group, TemplateBuilder};
//! # let hello = TemplateBuilder::new("hello")
//! #     .arg("name")
//! #     .text("Hello ")
//! #     .load_attr("name")
//! #     .write()
//! #     .text("!")
//! #     .build()?;
//! # let group = Group::builder().template(hello).build()?;
//! let mut st = group.instance_of("hello").unwrap();
//! st.add("name", "John Smith")?;
//! assert_eq!(st.render().to_string(), "Hello John Smith!");
//! # Ok::<(), stencil::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Multi-valued attributes
//!
//! Adding to an attribute more than once makes it multi-valued. A
//! multi-valued attribute is written element by element, with the
//! `separator` option in between.
//!
//! ```
//! use stencil::{Group, RenderOption, TemplateBuilder};
//!
//! let list = TemplateBuilder::new("list")
//!     .arg("items")
//!     .load_attr("items")
//!     .options()
//!     .load_str(", ")
//!     .store_option(RenderOption::Separator)
//!     .write_opt()
//!     .build()?;
//! let group = Group::builder().template(list).build()?;
//!
//! let mut st = group.instance_of("list").unwrap();
//! st.add("items", 1)?.add("items", 2)?.add("items", 3)?;
//! assert_eq!(st.render().to_string(), "1, 2, 3");
//! # Ok::<(), stencil::Error>(())
//! ```
//!
//! ### Render using structured data
//!
//! With the `serde` feature any serializable value can be added as an
//! attribute.
//!
//! ```
//! # #[cfg(feature = "serde")]
//! # {
//! use stencil::{Group, TemplateBuilder};
//!
//! #[derive(serde::Serialize)]
//! struct User { name: String }
//!
//! let greet = TemplateBuilder::new("greet")
//!     .arg("user")
//!     .load_attr("user")
//!     .load_prop("name")
//!     .write()
//!     .build()?;
//! let group = Group::builder().template(greet).build()?;
//!
//! let user = stencil::to_value(User { name: "John Smith".into() })?;
//! let mut st = group.instance_of("greet").unwrap();
//! st.add("user", user)?;
//! assert_eq!(st.render().to_string(), "John Smith");
//! # }
//! # Ok::<(), stencil::Error>(())
//! ```
//!
//! ### Collecting render problems
//!
//! ```
//! use stencil::{ErrorBuffer, ErrorKind, Group, TemplateBuilder};
//!
//! let t = TemplateBuilder::new("t").load_attr("missing").write().build()?;
//! let errors = ErrorBuffer::new();
//! let group = Group::builder()
//!     .template(t)
//!     .error_listener(errors.clone())
//!     .build()?;
//!
//! let st = group.instance_of("t").unwrap();
//! assert_eq!(st.render().to_string(), "");
//! assert_eq!(errors.kinds(), [ErrorKind::NoSuchAttribute]);
//! # Ok::<(), stencil::Error>(())
//! ```

mod adaptor;
mod error;
pub mod fmt;
mod group;
mod instance;
mod listener;
mod macros;
mod options;
mod render;
mod types;
pub mod value;
mod write;

pub use crate::adaptor::{
    InstanceAdaptor, MapAdaptor, ModelAdaptor, TypeProxy, DEFAULT_KEY, DICT_KEY,
};
pub use crate::error::Error;
pub use crate::fmt::AttributeRenderer;
pub use crate::group::{Group, GroupBuilder, MAX_DEPTH};
pub use crate::instance::Instance;
pub use crate::listener::{ErrorBuffer, ErrorKind, ErrorListener, LogListener, RenderMessage};
pub use crate::options::{RenderOption, NUM_OPTIONS};
pub use crate::render::{EventKind, RenderEvent, Renderer};
pub use crate::types::builder::{region_name, TemplateBuilder};
pub use crate::types::bytecode;
pub use crate::types::program::{
    CompiledTemplate, DefaultValue, FormalArg, Instr, IMPLICIT_ARG, IMPLICIT_INDEX_ARGS,
};
pub use crate::types::span::Span;
#[cfg(feature = "serde")]
pub use crate::value::to_value;
pub use crate::value::{Value, ValueKind};
pub use crate::write::{AutoIndentWriter, NoIndentWriter, TemplateWriter};

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
