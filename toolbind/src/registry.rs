//! Name-keyed collection of adapted tools.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use toolbind_schema::FunctionSchema;
use tracing::{debug, warn};

use crate::adapter::Tool;
use crate::callable::{Callable, IntoCallable};
use crate::config::RegistryConfig;
use crate::docs::{DocProvider, FunctionDoc, InventoryDocs};
use crate::error::{InvokeError, InvokeResult, RegistrationError, RegistrationResult};
use crate::scope::Scope;

/// Owns every tool, dispatches calls by name and lists schemas.
///
/// Registration takes `&mut self`; once it is done the registry can be shared
/// behind an `Arc` and invoked concurrently.
pub struct ToolRegistry {
    config: RegistryConfig,
    scope: Arc<Scope<'static>>,
    docs: Arc<dyn DocProvider>,
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Creates an empty registry bound to `scope` with the default
    /// configuration.
    #[must_use]
    pub fn new(scope: Scope<'static>, docs: impl DocProvider + 'static) -> Self {
        Self {
            config: RegistryConfig::default(),
            scope: Arc::new(scope),
            docs: Arc::new(docs),
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates an empty registry that reads documentation submitted by
    /// `#[tool]` and `#[derive(ToolArg)]`.
    #[must_use]
    pub fn from_inventory(scope: Scope<'static>) -> Self {
        Self::new(scope, InventoryDocs::collect())
    }

    /// Replaces the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Config`] if the configuration is invalid.
    pub fn with_config(mut self, config: RegistryConfig) -> RegistrationResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Registers a function under the last path segment of `id`.
    ///
    /// `id` is the fully qualified identifier the documentation provider
    /// knows the function by; [`tool_id!`](crate::tool_id) builds it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if documentation is missing, the
    /// signature cannot be adapted, or the name is taken.
    pub fn add<Args>(&mut self, id: &str, f: impl IntoCallable<Args>) -> RegistrationResult<()> {
        self.add_callable(id, f.into_callable())
    }

    /// Registers a type-erased callable under the last path segment of `id`.
    ///
    /// # Errors
    ///
    /// See [`ToolRegistry::add`].
    pub fn add_callable(&mut self, id: &str, callable: Arc<dyn Callable>) -> RegistrationResult<()> {
        self.register_by_id("", id, callable)
    }

    /// Registers a function with explicitly supplied documentation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if the signature cannot be adapted or
    /// the name is taken.
    pub fn add_documented<Args>(
        &mut self,
        name: &str,
        doc: &FunctionDoc,
        f: impl IntoCallable<Args>,
    ) -> RegistrationResult<()> {
        self.register(name.to_owned(), doc, f.into_callable())
    }

    /// Returns a handle that registers tools under `prefix`.
    ///
    /// ```
    /// use toolbind::{FunctionDoc, Scope, StaticDocs, ToolRegistry};
    ///
    /// let mut registry = ToolRegistry::new(Scope::new(), StaticDocs::new());
    /// registry
    ///     .group("math")
    ///     .group("int")
    ///     .add_documented("neg", &FunctionDoc::new("Negates").param("n", ""), |n: i64| -n)
    ///     .unwrap();
    /// assert!(registry.contains("math.int.neg"));
    /// ```
    pub fn group(&mut self, prefix: &str) -> ToolGroup<'_> {
        ToolGroup {
            prefix: prefix.to_owned(),
            registry: self,
        }
    }

    fn qualify(&self, prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{prefix}{}{name}", self.config.group_separator())
        }
    }

    fn register_by_id(
        &mut self,
        prefix: &str,
        id: &str,
        callable: Arc<dyn Callable>,
    ) -> RegistrationResult<()> {
        let doc = self
            .docs
            .function(id)
            .ok_or_else(|| RegistrationError::MissingDocumentation { id: id.to_owned() })?;
        let short = id.rsplit("::").next().unwrap_or(id);
        let name = self.qualify(prefix, short);
        self.register(name, &doc, callable)
    }

    fn register(
        &mut self,
        name: String,
        doc: &FunctionDoc,
        callable: Arc<dyn Callable>,
    ) -> RegistrationResult<()> {
        let existing = self.index.get(&name).copied();
        if existing.is_some() && !self.config.allow_overwrite() {
            return Err(RegistrationError::DuplicateTool { name });
        }

        let tool = Tool::adapt(
            name.clone(),
            doc,
            callable,
            Arc::clone(&self.scope),
            self.docs.as_ref(),
        )?;
        debug!(
            tool = %name,
            injected = tool.invoker().injected_count(),
            params = ?tool.invoker().param_names(),
            "registered tool"
        );

        match existing {
            Some(position) => {
                warn!(tool = %name, "replacing registered tool");
                self.tools[position] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        Ok(())
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&position| &self.tools[position])
    }

    /// Returns `true` if a tool is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Invokes the tool registered under `name`.
    ///
    /// `scope` is layered over the registry scope for this call only.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::NotFound`] for unknown names and otherwise
    /// whatever the tool's invoker reports.
    pub fn invoke(
        &self,
        scope: Option<&Scope<'_>>,
        name: &str,
        args: Map<String, Value>,
    ) -> InvokeResult<Option<Value>> {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "tool not found");
            return Err(InvokeError::NotFound {
                name: name.to_owned(),
            });
        };

        match tool.invoke(scope, args) {
            Ok(output) => {
                debug!(tool = %name, "tool invoked");
                Ok(output)
            }
            Err(err) => {
                warn!(tool = %name, kind = ?err.kind(), error = %err, "tool invocation failed");
                Err(err)
            }
        }
    }

    /// Schemas of every tool in registration order.
    pub fn schemas(&self) -> impl Iterator<Item = &FunctionSchema> {
        self.tools.iter().map(Tool::schema)
    }

    /// Schemas of every tool in the function-calling wire shape.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error if serialization fails.
    pub fn schema_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.schemas().collect::<Vec<_>>())
    }

    /// The scope every tool is bound to.
    #[must_use]
    pub fn scope(&self) -> &Scope<'static> {
        &self.scope
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.tools.iter().map(Tool::name).collect();
        f.debug_struct("ToolRegistry")
            .field("config", &self.config)
            .field("scope", &self.scope)
            .field("registered", &names)
            .finish_non_exhaustive()
    }
}

/// Registers tools under a name prefix. Created by [`ToolRegistry::group`].
pub struct ToolGroup<'r> {
    registry: &'r mut ToolRegistry,
    prefix: String,
}

impl ToolGroup<'_> {
    /// Returns a handle for a nested prefix.
    pub fn group(&mut self, prefix: &str) -> ToolGroup<'_> {
        ToolGroup {
            prefix: self.registry.qualify(&self.prefix, prefix),
            registry: &mut *self.registry,
        }
    }

    /// Registers a function under `prefix` plus the last path segment of `id`.
    ///
    /// # Errors
    ///
    /// See [`ToolRegistry::add`].
    pub fn add<Args>(&mut self, id: &str, f: impl IntoCallable<Args>) -> RegistrationResult<()> {
        self.add_callable(id, f.into_callable())
    }

    /// Registers a type-erased callable under the group prefix.
    ///
    /// # Errors
    ///
    /// See [`ToolRegistry::add`].
    pub fn add_callable(&mut self, id: &str, callable: Arc<dyn Callable>) -> RegistrationResult<()> {
        self.registry.register_by_id(&self.prefix, id, callable)
    }

    /// Registers a function with explicit documentation under the group
    /// prefix.
    ///
    /// # Errors
    ///
    /// See [`ToolRegistry::add_documented`].
    pub fn add_documented<Args>(
        &mut self,
        name: &str,
        doc: &FunctionDoc,
        f: impl IntoCallable<Args>,
    ) -> RegistrationResult<()> {
        let name = self.registry.qualify(&self.prefix, name);
        self.registry.register(name, doc, f.into_callable())
    }

    /// Fully qualified prefix of this group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::StaticDocs;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn docs() -> StaticDocs {
        StaticDocs::new()
            .with_function(
                "app::add",
                FunctionDoc::new("Adds two numbers")
                    .param("a", "the first number")
                    .param("b", "the second number"),
            )
            .with_function("app::ping", FunctionDoc::new("Checks liveness"))
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn add(a: i64, b: i64) -> i64 {
        a + b
    }

    #[test]
    fn registers_under_the_short_name() {
        let mut registry = ToolRegistry::new(Scope::new(), docs());
        registry.add("app::add", add).unwrap();

        assert!(registry.contains("add"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.invoke(None, "add", args(json!({ "a": "3", "b": 4 }))).unwrap(),
            Some(json!(7))
        );
    }

    #[test]
    fn missing_documentation_fails() {
        let mut registry = ToolRegistry::new(Scope::new(), docs());
        let err = registry.add("app::sub", add).unwrap_err();
        assert!(matches!(err, RegistrationError::MissingDocumentation { ref id } if id == "app::sub"));
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_names_fail_unless_overwrite_is_allowed() {
        let mut registry = ToolRegistry::new(Scope::new(), docs());
        registry.add("app::ping", || "pong").unwrap();
        assert!(matches!(
            registry.add("app::ping", || "pong"),
            Err(RegistrationError::DuplicateTool { .. })
        ));

        let mut registry = ToolRegistry::new(Scope::new(), docs())
            .with_config(RegistryConfig::new().with_allow_overwrite(true))
            .unwrap();
        registry.add("app::add", add).unwrap();
        registry.add("app::ping", || "pong").unwrap();
        registry.add("app::ping", || "PONG").unwrap();

        let names: Vec<_> = registry.schemas().map(|schema| schema.name.as_str()).collect();
        assert_eq!(names, vec!["add", "ping"]);
        assert_eq!(
            registry.invoke(None, "ping", Map::new()).unwrap(),
            Some(json!("PONG"))
        );
    }

    #[test]
    fn unknown_tools_are_not_found() {
        let registry = ToolRegistry::new(Scope::new(), docs());
        let err = registry.invoke(None, "nope", Map::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "tool `nope` not found");
    }

    #[test]
    fn groups_prefix_names_with_the_configured_separator() {
        let mut registry = ToolRegistry::new(Scope::new(), docs())
            .with_config(RegistryConfig::new().with_group_separator("__"))
            .unwrap();
        {
            let mut math = registry.group("math");
            math.add("app::add", add).unwrap();
            let mut nested = math.group("fast");
            assert_eq!(nested.prefix(), "math__fast");
            nested.add("app::add", add).unwrap();
        }

        assert!(registry.contains("math__add"));
        assert!(registry.contains("math__fast__add"));
        assert!(!registry.contains("add"));
    }

    #[test]
    fn schema_json_lists_tools_in_registration_order() {
        let mut registry = ToolRegistry::new(Scope::new(), docs());
        registry.add("app::ping", || true).unwrap();
        registry.add("app::add", add).unwrap();

        let json = registry.schema_json().unwrap();
        assert_eq!(json[0]["function"]["name"], "ping");
        assert_eq!(json[0]["function"]["parameters"], json!({}));
        assert_eq!(
            json[1]["function"]["parameters"]["properties"]["a"],
            json!({ "type": "integer", "description": "the first number" })
        );
        assert_eq!(json[1]["function"]["parameters"]["required"], json!(["a", "b"]));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = ToolRegistry::new(Scope::new(), docs())
            .with_config(RegistryConfig::new().with_group_separator(""))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Config(_)));
    }
}
