use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::adaptor::{ModelAdaptor, TypeProxy};
use crate::fmt::AttributeRenderer;
use crate::listener::{ErrorListener, LogListener};
use crate::types::program::CompiledTemplate;
use crate::value::Map;
use crate::{Error, Instance, Result, Value, ValueKind};

/// The default maximum depth of nested template invocations.
pub const MAX_DEPTH: usize = 200;

/// A catalog of named templates.
///
/// A group owns compiled templates, the groups it imports, named
/// dictionaries, and the collaborators used while rendering its instances:
/// attribute renderers, model adaptors, type proxies and the error listener.
/// Groups are immutable once built and cheap to clone.
///
/// Template lookup searches the group itself and then its imports, depth
/// first in import order.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

struct GroupInner {
    name: String,
    templates: BTreeMap<String, Arc<CompiledTemplate>>,
    imports: Vec<Group>,
    dictionaries: BTreeMap<String, Map<String, Value>>,
    renderers: BTreeMap<ValueKind, Box<dyn AttributeRenderer>>,
    adaptors: BTreeMap<ValueKind, Box<dyn ModelAdaptor>>,
    proxies: BTreeMap<ValueKind, Box<dyn TypeProxy>>,
    listener: Arc<dyn ErrorListener>,
    iterate_map_values: bool,
    max_depth: usize,
}

/// Configures and builds a [`Group`].
#[must_use = "must call `.build()` on the group builder"]
pub struct GroupBuilder {
    name: String,
    templates: Vec<Arc<CompiledTemplate>>,
    imports: Vec<Group>,
    dictionaries: BTreeMap<String, Map<String, Value>>,
    renderers: BTreeMap<ValueKind, Box<dyn AttributeRenderer>>,
    adaptors: BTreeMap<ValueKind, Box<dyn ModelAdaptor>>,
    proxies: BTreeMap<ValueKind, Box<dyn TypeProxy>>,
    listener: Option<Arc<dyn ErrorListener>>,
    iterate_map_values: bool,
    max_depth: usize,
}

impl Default for Group {
    fn default() -> Self {
        Self::builder().build_inner()
    }
}

impl Group {
    /// Returns a builder to configure a new group.
    pub fn builder() -> GroupBuilder {
        GroupBuilder {
            name: String::from("default"),
            templates: Vec::new(),
            imports: Vec::new(),
            dictionaries: BTreeMap::new(),
            renderers: BTreeMap::new(),
            adaptors: BTreeMap::new(),
            proxies: BTreeMap::new(),
            listener: None,
            iterate_map_values: false,
            max_depth: MAX_DEPTH,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the names of the templates defined directly in this group.
    pub fn template_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.templates.keys().map(String::as_str)
    }

    /// The groups imported by this group.
    #[inline]
    pub fn imports(&self) -> &[Group] {
        &self.inner.imports
    }

    /// Look up a template in this group or its imports.
    pub fn lookup_template(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        if let Some(t) = self.inner.templates.get(name) {
            return Some(t.clone());
        }
        self.lookup_imported_template(name)
    }

    /// Look up a template in the imports of this group only.
    pub fn lookup_imported_template(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        self.inner
            .imports
            .iter()
            .find_map(|g| g.lookup_template(name))
    }

    /// Whether a dictionary with this name is defined directly in this group.
    pub fn is_dictionary(&self, name: &str) -> bool {
        self.inner.dictionaries.contains_key(name)
    }

    /// Returns a dictionary defined directly in this group.
    pub fn dictionary(&self, name: &str) -> Option<&Map<String, Value>> {
        self.inner.dictionaries.get(name)
    }

    /// Returns a dictionary defined in this group or its imports.
    pub(crate) fn find_dictionary(&self, name: &str) -> Option<&Map<String, Value>> {
        self.dictionary(name)
            .or_else(|| self.inner.imports.iter().find_map(|g| g.find_dictionary(name)))
    }

    /// Create an instance of a compiled template bound to this group.
    pub fn create_instance(&self, template: impl Into<Arc<CompiledTemplate>>) -> Instance {
        Instance::new(template.into(), self.clone())
    }

    /// Create an instance of a named template.
    pub fn instance_of(&self, name: &str) -> Option<Instance> {
        self.lookup_template(name).map(|t| self.create_instance(t))
    }

    /// Returns the group that defines `template`, searching this group and
    /// then its imports.
    pub(crate) fn native_group_of(&self, template: &CompiledTemplate) -> Option<&Group> {
        if self.defines(template) {
            return Some(self);
        }
        self.inner
            .imports
            .iter()
            .find_map(|g| g.native_group_of(template))
    }

    fn defines(&self, template: &CompiledTemplate) -> bool {
        fn contains(t: &CompiledTemplate, needle: &CompiledTemplate) -> bool {
            std::ptr::eq(t, needle) || t.subtemplates.iter().any(|s| contains(s, needle))
        }
        self.inner.templates.values().any(|t| contains(t, template))
    }

    pub(crate) fn renderer(&self, kind: ValueKind) -> Option<&dyn AttributeRenderer> {
        self.inner.renderers.get(&kind).map(Box::as_ref)
    }

    pub(crate) fn adaptor(&self, kind: ValueKind) -> Option<&dyn ModelAdaptor> {
        self.inner.adaptors.get(&kind).map(Box::as_ref)
    }

    pub(crate) fn proxy(&self, kind: ValueKind) -> Option<&dyn TypeProxy> {
        self.inner.proxies.get(&kind).map(Box::as_ref)
    }

    pub(crate) fn listener(&self) -> &dyn ErrorListener {
        self.inner.listener.as_ref()
    }

    /// Whether maps iterate over their values instead of their keys.
    #[inline]
    pub fn iterate_map_values(&self) -> bool {
        self.inner.iterate_map_values
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.inner.max_depth
    }

    /// Whether two handles refer to the same group.
    #[inline]
    pub fn ptr_eq(&self, other: &Group) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.inner.name)
            .field("templates", &self.inner.templates.keys())
            .field("imports", &self.inner.imports)
            .field("dictionaries", &self.inner.dictionaries.keys())
            .finish_non_exhaustive()
    }
}

impl GroupBuilder {
    /// Set the name of the group, used in diagnostics.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Add a template.
    ///
    /// The anonymous sub-templates and regions the template defines are
    /// registered under their own names, unless a template with that name is
    /// added explicitly.
    pub fn template(&mut self, template: impl Into<Arc<CompiledTemplate>>) -> &mut Self {
        self.templates.push(template.into());
        self
    }

    /// Import another group.
    ///
    /// Templates and dictionaries that are not found in this group are looked
    /// up in its imports, in the order they were added.
    pub fn import(&mut self, group: &Group) -> &mut Self {
        self.imports.push(group.clone());
        self
    }

    /// Define a named dictionary.
    pub fn dictionary<K, V>(
        &mut self,
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.dictionaries.insert(name.into(), map);
        self
    }

    /// Register an attribute renderer for a kind of value.
    pub fn renderer<R>(&mut self, kind: ValueKind, renderer: R) -> &mut Self
    where
        R: AttributeRenderer + 'static,
    {
        self.renderers.insert(kind, Box::new(renderer));
        self
    }

    /// Register a model adaptor for a kind of value.
    pub fn adaptor<A>(&mut self, kind: ValueKind, adaptor: A) -> &mut Self
    where
        A: ModelAdaptor + 'static,
    {
        self.adaptors.insert(kind, Box::new(adaptor));
        self
    }

    /// Register a type proxy for a kind of value.
    pub fn type_proxy<P>(&mut self, kind: ValueKind, proxy: P) -> &mut Self
    where
        P: TypeProxy + 'static,
    {
        self.proxies.insert(kind, Box::new(proxy));
        self
    }

    /// Set the listener that receives rendering problems.
    ///
    /// Defaults to [`LogListener`].
    pub fn error_listener<L>(&mut self, listener: L) -> &mut Self
    where
        L: ErrorListener + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Iterate over map values instead of keys when a map is written or
    /// mapped over.
    pub fn iterate_map_values(&mut self, yes: bool) -> &mut Self {
        self.iterate_map_values = yes;
        self
    }

    /// Set the maximum depth of nested template invocations.
    ///
    /// Defaults to [`MAX_DEPTH`].
    pub fn max_depth(&mut self, depth: usize) -> &mut Self {
        self.max_depth = depth;
        self
    }

    /// Build the group.
    ///
    /// # Errors
    ///
    /// Fails if two templates are added with the same name.
    pub fn build(&mut self) -> Result<Group> {
        let mut seen = BTreeMap::new();
        for t in &self.templates {
            if seen.insert(t.name.as_str(), ()).is_some() {
                return Err(Error::new(format!(
                    "template `{}` is defined more than once in group `{}`",
                    t.name, self.name
                )));
            }
        }
        Ok(self.build_inner())
    }

    fn build_inner(&mut self) -> Group {
        let mut templates = BTreeMap::new();
        for t in &self.templates {
            templates.insert(t.name.clone(), t.clone());
        }
        for t in mem::take(&mut self.templates) {
            define_implicit(&mut templates, &t);
        }
        Group {
            inner: Arc::new(GroupInner {
                name: mem::take(&mut self.name),
                templates,
                imports: mem::take(&mut self.imports),
                dictionaries: mem::take(&mut self.dictionaries),
                renderers: mem::take(&mut self.renderers),
                adaptors: mem::take(&mut self.adaptors),
                proxies: mem::take(&mut self.proxies),
                listener: self
                    .listener
                    .take()
                    .unwrap_or_else(|| Arc::new(LogListener)),
                iterate_map_values: self.iterate_map_values,
                max_depth: self.max_depth,
            }),
        }
    }
}

/// Registers the sub-templates of `t` that are not already defined.
fn define_implicit(templates: &mut BTreeMap<String, Arc<CompiledTemplate>>, t: &CompiledTemplate) {
    for sub in &t.subtemplates {
        templates
            .entry(sub.name.clone())
            .or_insert_with(|| sub.clone());
        define_implicit(templates, sub);
    }
}
