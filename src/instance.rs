use std::fmt;
use std::sync::Arc;

use crate::render::Renderer;
use crate::types::program::CompiledTemplate;
use crate::{Error, Group, Result, Value};

/// A compiled template bound to a set of attribute values.
///
/// Instances are created by a [`Group`] and hold one slot per formal argument
/// of their template. A slot is empty until an attribute is added; an empty
/// slot renders as nothing.
///
/// Cloning an instance copies its attribute values but shares the compiled
/// template.
#[derive(Clone)]
pub struct Instance {
    pub(crate) template: Arc<CompiledTemplate>,
    pub(crate) locals: Vec<Option<Value>>,
    pub(crate) group: Group,
}

impl Instance {
    pub(crate) fn new(template: Arc<CompiledTemplate>, group: Group) -> Self {
        let locals = vec![None; template.args.len()];
        Self {
            template,
            locals,
            group,
        }
    }

    /// The name of the template this is an instance of.
    #[inline]
    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// The compiled template this is an instance of.
    #[inline]
    pub fn template(&self) -> &CompiledTemplate {
        &self.template
    }

    /// The group this instance was created by.
    #[inline]
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Add an attribute value.
    ///
    /// Adding a value to an attribute that is already set turns it into a
    /// multi-valued attribute. If the template was defined without an explicit
    /// argument list then unknown names are declared on the fly, which gives
    /// this instance a private copy of the compiled template.
    ///
    /// # Errors
    ///
    /// Fails if the name contains a `.` or if the template declares an
    /// explicit argument list that does not contain the name.
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        if name.contains('.') {
            return Err(Error::new(format!(
                "cannot have '.' in attribute names: {name}"
            )));
        }
        let index = match self.template.arg(name) {
            Some(arg) => arg.index,
            None if self.template.has_formal_args => {
                return Err(Error::new(format!("no such attribute: {name}")));
            }
            None => self.declare(name),
        };
        let value = value.into();
        let slot = &mut self.locals[index];
        *slot = Some(match slot.take() {
            None => value,
            Some(Value::List(mut list)) => {
                list.push(value);
                Value::List(list)
            }
            Some(current) => Value::List(vec![current, value]),
        });
        Ok(self)
    }

    /// Add several attribute values in order.
    ///
    /// # Errors
    ///
    /// Stops at the first name [`add`][Instance::add] rejects.
    pub fn add_all<I, K, V>(&mut self, attrs: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in attrs {
            self.add(name.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Clear an attribute, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.template.arg(name)?.index;
        self.locals.get_mut(index)?.take()
    }

    /// Returns the value of an attribute if it is declared and set.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        let index = self.template.arg(name)?.index;
        self.locals.get(index)?.as_ref()
    }

    /// Iterate over the declared attributes and their values.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, Option<&Value>)> + '_ {
        self.template
            .args
            .iter()
            .map(move |arg| (arg.name(), self.locals.get(arg.index).and_then(Option::as_ref)))
    }

    /// Returns a renderer for this instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use stencil::{Group, TemplateBuilder};
    ///
    /// let hello = TemplateBuilder::new("hello")
    ///     .text("Hello ")
    ///     .load_attr("name")
    ///     .write()
    ///     .build()?;
    /// let group = Group::builder().template(hello).build()?;
    ///
    /// let mut st = group.instance_of("hello").unwrap();
    /// st.add("name", "World")?;
    /// assert_eq!(st.render().to_string(), "Hello World");
    /// # Ok::<(), stencil::Error>(())
    /// ```
    #[inline]
    pub fn render(&self) -> Renderer<'_> {
        Renderer::new(self)
    }

    /// Set a declared attribute, ignoring unknown names.
    pub(crate) fn raw_set(&mut self, name: &str, value: Value) -> bool {
        match self.template.arg(name).map(|arg| arg.index) {
            Some(index) => {
                self.locals[index] = Some(value);
                true
            }
            None => false,
        }
    }

    /// Set an attribute, declaring it first if the template does not.
    pub(crate) fn declare_and_set(&mut self, name: &str, value: Value) {
        let index = match self.template.arg(name) {
            Some(arg) => arg.index,
            None => self.declare(name),
        };
        self.locals[index] = Some(value);
    }

    fn declare(&mut self, name: &str) -> usize {
        let index = Arc::make_mut(&mut self.template).add_arg(name);
        self.locals.resize(index + 1, None);
        index
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.template, &other.template) && self.locals == other.locals
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Instance");
        d.field("name", &self.template.name);
        for (name, value) in self.attributes() {
            d.field(name, &value);
        }
        d.finish()
    }
}
