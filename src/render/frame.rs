use std::cell::Cell;

use crate::{Instance, Value};

/// One template invocation.
///
/// Frames form a chain through their parent links, from the template being
/// executed out to the root of the render. Attribute lookup walks this chain
/// so a template sees the attributes of every template that invoked it.
pub struct Frame<'a> {
    pub instance: Instance,
    pub parent: Option<&'a Frame<'a>>,
    pub depth: usize,
    pub ip: Cell<usize>,
}

impl<'a> Frame<'a> {
    pub fn root(instance: Instance) -> Self {
        Self {
            instance,
            parent: None,
            depth: 1,
            ip: Cell::new(0),
        }
    }

    pub fn child(&'a self, instance: Instance) -> Frame<'a> {
        Frame {
            instance,
            parent: Some(self),
            depth: self.depth + 1,
            ip: Cell::new(0),
        }
    }

    /// Iterate from this frame out to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Frame<'a>> {
        std::iter::successors(Some(self), |f| f.parent)
    }

    /// Resolve an attribute through the scope chain.
    ///
    /// Returns `None` if no frame declares the name and `Some(None)` if the
    /// nearest frame that declares it has not set it.
    pub fn resolve(&self, name: &str) -> Option<Option<&Value>> {
        self.ancestors().find_map(|frame| {
            let arg = frame.instance.template.arg(name)?;
            Some(frame.instance.locals.get(arg.index).and_then(Option::as_ref))
        })
    }

    /// The names of the templates from the root to this frame.
    pub fn call_stack(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .ancestors()
            .map(|f| f.instance.name().to_owned())
            .collect();
        names.reverse();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Group, TemplateBuilder};

    #[test]
    fn frame_resolve_dynamic_scope() {
        let outer = TemplateBuilder::new("outer").arg("x").arg("y").build().unwrap();
        let inner = TemplateBuilder::new("inner").arg("y").build().unwrap();
        let group = Group::builder().template(outer).template(inner).build().unwrap();

        let mut outer = group.instance_of("outer").unwrap();
        outer.add("x", 1).unwrap().add("y", 2).unwrap();
        let inner = group.instance_of("inner").unwrap();

        let root = Frame::root(outer);
        let child = root.child(inner);

        assert_eq!(child.depth, 2);
        assert_eq!(child.resolve("x"), Some(Some(&Value::from(1))));
        // declared but unset in the nearest frame shadows the outer value
        assert_eq!(child.resolve("y"), Some(None));
        assert_eq!(child.resolve("z"), None);
        assert_eq!(child.call_stack(), ["outer", "inner"]);
    }
}
