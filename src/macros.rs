/// Construct a [`Value::Map`][crate::Value::Map] of attributes.
///
/// Each entry is `name: value` where the value is `None`, a nested list
/// `[...]`, a nested map `{...}`, or any expression that converts into a
/// [`Value`][crate::Value].
///
/// ```
/// let dict = stencil::value! {
///     red: "#f00",
///     sizes: [1, 2, None],
///     default: { fallback: true },
/// };
/// ```
#[macro_export]
macro_rules! value {
    ($($tt:tt)*) => {{
        #[allow(unused_mut)]
        let mut entries: $crate::value::List<(&'static str, $crate::Value)> =
            $crate::value::List::new();
        $crate::_value!(@entries entries $($tt)*);
        $crate::Value::Map(
            entries
                .into_iter()
                .map(|(name, value)| (::std::string::String::from(name), value))
                .collect(),
        )
    }};
}

/// Add attributes to an [`Instance`][crate::Instance] in order.
///
/// Takes the same entries as [`value!`] and calls
/// [`Instance::add_all`][crate::Instance::add_all] with them, so adding to an
/// attribute that is already set makes it multi-valued.
///
/// ```
/// # use stencil::{Group, TemplateBuilder};
/// # let t = TemplateBuilder::new("t").build()?;
/// # let group = Group::builder().template(t).build()?;
/// let mut st = group.instance_of("t").unwrap();
/// stencil::attrs!(st, name: "John", langs: ["rust", "go"])?;
/// # Ok::<(), stencil::Error>(())
/// ```
#[macro_export]
macro_rules! attrs {
    ($st:expr, $($tt:tt)*) => {{
        #[allow(unused_mut)]
        let mut entries: $crate::value::List<(&'static str, $crate::Value)> =
            $crate::value::List::new();
        $crate::_value!(@entries entries $($tt)*);
        $st.add_all(entries)
    }};
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value {
    // Entries `name: value` pushed to a list of pairs.
    (@entries $e:ident) => {};

    (@entries $e:ident $name:ident : None $(, $($rest:tt)*)?) => {
        $e.push((::std::stringify!($name), $crate::Value::None));
        $crate::_value!(@entries $e $($($rest)*)?);
    };

    (@entries $e:ident $name:ident : [$($list:tt)*] $(, $($rest:tt)*)?) => {
        $e.push((::std::stringify!($name), $crate::_value!(@list [$($list)*])));
        $crate::_value!(@entries $e $($($rest)*)?);
    };

    (@entries $e:ident $name:ident : {$($map:tt)*} $(, $($rest:tt)*)?) => {
        $e.push((::std::stringify!($name), $crate::value!($($map)*)));
        $crate::_value!(@entries $e $($($rest)*)?);
    };

    (@entries $e:ident $name:ident : $value:expr , $($rest:tt)*) => {
        $e.push((::std::stringify!($name), $crate::Value::from($value)));
        $crate::_value!(@entries $e $($rest)*);
    };

    (@entries $e:ident $name:ident : $value:expr) => {
        $e.push((::std::stringify!($name), $crate::Value::from($value)));
    };

    // A list literal.
    (@list [$($tt:tt)*]) => {{
        #[allow(unused_mut)]
        let mut items: $crate::value::List<$crate::Value> = $crate::value::List::new();
        $crate::_value!(@items items $($tt)*);
        $crate::Value::List(items)
    }};

    // Items of a list literal pushed to a list.
    (@items $l:ident) => {};

    (@items $l:ident None $(, $($rest:tt)*)?) => {
        $l.push($crate::Value::None);
        $crate::_value!(@items $l $($($rest)*)?);
    };

    (@items $l:ident [$($list:tt)*] $(, $($rest:tt)*)?) => {
        $l.push($crate::_value!(@list [$($list)*]));
        $crate::_value!(@items $l $($($rest)*)?);
    };

    (@items $l:ident {$($map:tt)*} $(, $($rest:tt)*)?) => {
        $l.push($crate::value!($($map)*));
        $crate::_value!(@items $l $($($rest)*)?);
    };

    (@items $l:ident $item:expr , $($rest:tt)*) => {
        $l.push($crate::Value::from($item));
        $crate::_value!(@items $l $($rest)*);
    };

    (@items $l:ident $item:expr) => {
        $l.push($crate::Value::from($item));
    };
}
