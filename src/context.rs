//! Per-test execution scope and named reference lookup.
//!
//! A [`TestContext`] is passed through every send and receive. It carries a
//! variable store scoped to one logical test run and, optionally, a
//! [`ReferenceResolver`] used to look up queues configured by name. Separate
//! contexts never share variables, so concurrent test runs do not interfere.

use std::{
    any::{Any, type_name},
    fmt,
    sync::Arc,
};

use dashmap::DashMap;
use thiserror::Error;

/// Errors raised while resolving named references.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A name had to be resolved but the context has no resolver.
    #[error("no reference resolver available to resolve '{name}'")]
    NoResolver { name: String },
    /// Nothing is bound under the name.
    #[error("unable to resolve reference '{name}'")]
    Unknown { name: String },
    /// A value is bound under the name but has a different type.
    #[error("reference '{name}' is not of type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },
}

/// Errors raised while expanding `${variable}` placeholders.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VariableError {
    #[error("unknown variable '{0}'")]
    Unknown(String),
    #[error("unterminated variable expression in '{0}'")]
    Unterminated(String),
}

/// Source of named objects such as shared queues.
pub trait ReferenceResolver: Send + Sync {
    /// Look up the object bound under `name`.
    fn lookup(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Returns `true` if something is bound under `name`.
    fn is_resolvable(&self, name: &str) -> bool { self.lookup(name).is_some() }
}

impl dyn ReferenceResolver {
    /// Resolve `name` to a value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unknown`] if nothing is bound under `name` and
    /// [`ResolveError::TypeMismatch`] if the bound value is not a `T`.
    pub fn resolve<T>(&self, name: &str) -> Result<T, ResolveError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = self.lookup(name).ok_or_else(|| ResolveError::Unknown {
            name: name.to_owned(),
        })?;
        value
            .downcast::<T>()
            .map(|typed| (*typed).clone())
            .map_err(|_| ResolveError::TypeMismatch {
                name: name.to_owned(),
                expected: type_name::<T>(),
            })
    }
}

/// Concurrent name registry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use agenix::{
///     context::{ReferenceResolver, SimpleReferenceResolver},
///     queue::MessageQueue,
/// };
///
/// let resolver = SimpleReferenceResolver::default();
/// resolver.bind("orders", MessageQueue::new("orders"));
/// let resolver: Arc<dyn ReferenceResolver> = Arc::new(resolver);
/// let queue = resolver.resolve::<MessageQueue>("orders").expect("bound");
/// assert_eq!(queue.name(), "orders");
/// ```
#[derive(Default)]
pub struct SimpleReferenceResolver {
    values: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl SimpleReferenceResolver {
    /// Bind `value` under `name`, replacing any previous binding.
    pub fn bind<T>(&self, name: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.values
            .insert(name.into(), Arc::new(value) as Arc<dyn Any + Send + Sync>);
    }

    /// Remove the binding for `name`, returning whether one existed.
    pub fn unbind(&self, name: &str) -> bool { self.values.remove(name).is_some() }

    /// Names of all current bindings in unspecified order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.values.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl ReferenceResolver for SimpleReferenceResolver {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.values.get(name).map(|entry| Arc::clone(entry.value()))
    }
}

impl fmt::Debug for SimpleReferenceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleReferenceResolver")
            .field("names", &self.names())
            .finish()
    }
}

/// Variable scope and reference resolver for one test execution.
///
/// Clones share the same variable store, so a context can be handed to
/// background tasks taking part in the same test.
#[derive(Clone, Default)]
pub struct TestContext {
    variables: Arc<DashMap<String, String>>,
    resolver: Option<Arc<dyn ReferenceResolver>>,
}

impl TestContext {
    /// Create an isolated context without a reference resolver.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Install a reference resolver, consuming and returning the context.
    #[must_use]
    pub fn with_reference_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn set_reference_resolver(&mut self, resolver: Arc<dyn ReferenceResolver>) {
        self.resolver = Some(resolver);
    }

    #[must_use]
    pub fn reference_resolver(&self) -> Option<&Arc<dyn ReferenceResolver>> {
        self.resolver.as_ref()
    }

    /// Resolve `name` through the installed resolver.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoResolver`] if no resolver is installed, or the
    /// resolver's own error otherwise.
    pub fn resolve<T>(&self, name: &str) -> Result<T, ResolveError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let resolver = self.resolver.as_ref().ok_or_else(|| ResolveError::NoResolver {
            name: name.to_owned(),
        })?;
        resolver.resolve::<T>(name)
    }

    pub fn set_variable(&self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).map(|entry| entry.value().clone())
    }

    pub fn remove_variable(&self, name: &str) -> Option<String> {
        self.variables.remove(name).map(|(_, value)| value)
    }

    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool { self.variables.contains_key(name) }

    /// Expand every `${name}` placeholder in `input`.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError::Unknown`] for placeholders without a value and
    /// [`VariableError::Unterminated`] when a `${` has no closing brace.
    pub fn replace_dynamic_content(&self, input: &str) -> Result<String, VariableError> {
        let mut output = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| VariableError::Unterminated(input.to_owned()))?;
            let name = after[..end].trim();
            let value = self
                .variable(name)
                .ok_or_else(|| VariableError::Unknown(name.to_owned()))?;
            output.push_str(&value);
            rest = &after[end + 1..];
        }
        output.push_str(rest);
        Ok(output)
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("variables", &self.variables.len())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn clones_share_variables() {
        let context = TestContext::new();
        let clone = context.clone();
        clone.set_variable("greeting", "hello");
        assert_eq!(context.variable("greeting").as_deref(), Some("hello"));
    }

    #[test]
    fn separate_contexts_are_isolated() {
        let first = TestContext::new();
        let second = TestContext::new();
        first.set_variable("k", "v");
        assert!(!second.has_variable("k"));
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("${op}", "sayHello")]
    #[case("Operation = '${op}' AND id = '${ id }'", "Operation = 'sayHello' AND id = '7'")]
    fn expands_placeholders(#[case] input: &str, #[case] expected: &str) {
        let context = TestContext::new();
        context.set_variable("op", "sayHello");
        context.set_variable("id", "7");
        assert_eq!(
            context.replace_dynamic_content(input).expect("expansion"),
            expected
        );
    }

    #[rstest]
    #[case("${missing}", VariableError::Unknown("missing".into()))]
    #[case("${open", VariableError::Unterminated("${open".into()))]
    fn expansion_errors(#[case] input: &str, #[case] expected: VariableError) {
        let err = TestContext::new()
            .replace_dynamic_content(input)
            .expect_err("expansion should fail");
        assert_eq!(err, expected);
    }

    #[test]
    fn resolve_reports_type_mismatch() {
        let resolver = SimpleReferenceResolver::default();
        resolver.bind("number", 5_u32);
        let context = TestContext::new().with_reference_resolver(Arc::new(resolver));
        let err = context
            .resolve::<String>("number")
            .expect_err("wrong type");
        assert!(matches!(err, ResolveError::TypeMismatch { .. }));
    }

    #[test]
    fn unbind_removes_binding() {
        let resolver = SimpleReferenceResolver::default();
        resolver.bind("a", 1_u8);
        assert!(resolver.is_resolvable("a"));
        assert!(resolver.unbind("a"));
        assert!(!resolver.is_resolvable("a"));
        assert!(!resolver.unbind("a"));
    }
}
