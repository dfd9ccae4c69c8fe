//! Binds one callable to a schema entry and an invoker.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use toolbind_schema::{FunctionSchema, Property, SchemaDefinition, SchemaType};
use tracing::trace;

use crate::callable::{Callable, ParamSpec, ResultKind, Return};
use crate::convert::Converter;
use crate::describe::describe;
use crate::docs::{DocProvider, FunctionDoc};
use crate::error::{InvokeError, InvokeResult, RegistrationError, RegistrationResult};
use crate::scope::{Scope, resolve_layered};

struct UserParam {
    name: String,
    spec: ParamSpec,
    converter: Converter,
}

/// Validates arguments, resolves injected values and runs the callable.
///
/// Built once at registration and immutable afterwards.
pub struct Invoker {
    tool: String,
    callable: Arc<dyn Callable>,
    scope: Arc<Scope<'static>>,
    injected: Vec<ParamSpec>,
    params: Vec<UserParam>,
    results: Vec<ResultKind>,
}

/// A named, schema-described callable.
pub struct Tool {
    schema: FunctionSchema,
    invoker: Invoker,
}

impl Tool {
    /// Adapts `callable` under `name`.
    ///
    /// Leading parameters whose exact type `scope` can resolve are injected;
    /// the walk stops at the first parameter it cannot resolve. Every other
    /// parameter becomes a required schema property named by `doc`.
    ///
    /// `doc` must name either every parameter or only the non-injected ones.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if the callable is variadic, has an
    /// unsupported result layout, is documented with the wrong number of
    /// parameter names, or has a parameter type without a caller-facing
    /// representation.
    pub fn adapt(
        name: impl Into<String>,
        doc: &FunctionDoc,
        callable: Arc<dyn Callable>,
        scope: Arc<Scope<'static>>,
        docs: &dyn DocProvider,
    ) -> RegistrationResult<Self> {
        let name = name.into();
        let signature = callable.signature();

        if signature.is_variadic() {
            return Err(RegistrationError::Variadic { tool: name });
        }
        let results = signature.results().to_vec();
        match results.as_slice() {
            [] | [_] | [ResultKind::Value, ResultKind::Error] => {}
            [_, _] => return Err(RegistrationError::SecondResultNotError { tool: name }),
            _ => {
                return Err(RegistrationError::TooManyResults {
                    tool: name,
                    count: results.len(),
                });
            }
        }

        let declared = signature.params();
        let injected_count = declared
            .iter()
            .take_while(|param| scope.contains(ParamSpec::type_id(param)))
            .count();
        let user_count = declared.len() - injected_count;

        let names = doc.names();
        let user_names = if names.len() == declared.len() {
            &names[injected_count..]
        } else if names.len() == user_count {
            &names[..]
        } else {
            return Err(RegistrationError::ParameterNames {
                tool: name,
                expected: declared.len(),
                found: names.len(),
            });
        };
        let user_docs = &doc.params[doc.params.len() - user_count..];

        let mut parameters = SchemaDefinition::default();
        let mut params = Vec::with_capacity(user_count);
        let mut seen = HashSet::new();
        for ((spec, param_name), param_doc) in declared[injected_count..]
            .iter()
            .zip(user_names)
            .zip(user_docs)
        {
            if !seen.insert(*param_name) {
                return Err(RegistrationError::DuplicateField {
                    owner: name,
                    name: (*param_name).to_owned(),
                });
            }
            let definition = describe(spec.descriptor(), docs)
                .map_err(|err| err.for_parameter(&name, param_name))?
                .with_description(param_doc.description.clone());
            let converter = Converter::build(spec.descriptor())
                .map_err(|err| err.for_parameter(&name, param_name))?;

            parameters
                .properties
                .push(Property::new(*param_name, definition));
            parameters.required.push((*param_name).to_owned());
            params.push(UserParam {
                name: (*param_name).to_owned(),
                spec: spec.clone(),
                converter,
            });
        }
        if !params.is_empty() {
            parameters.schema_type = Some(SchemaType::Object);
        }

        Ok(Self {
            schema: FunctionSchema::new(&name, doc.description.clone(), parameters),
            invoker: Invoker {
                tool: name,
                callable,
                scope,
                injected: declared[..injected_count].to_vec(),
                params,
                results,
            },
        })
    }

    /// Discovery-facing description.
    #[must_use]
    pub fn schema(&self) -> &FunctionSchema {
        &self.schema
    }

    /// Dispatch name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// The tool's invoker.
    #[must_use]
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Invokes the tool. See [`Invoker::invoke`].
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] as described on [`Invoker::invoke`].
    pub fn invoke(
        &self,
        scope: Option<&Scope<'_>>,
        args: Map<String, Value>,
    ) -> InvokeResult<Option<Value>> {
        self.invoker.invoke(scope, args)
    }
}

impl Invoker {
    /// Binds `args` and runs the callable once.
    ///
    /// Injected parameters resolve from `scope` first and then from the scope
    /// bound at registration. Nothing runs unless every parameter binds.
    ///
    /// Returns `None` when the callable produces no value.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] for missing, unexpected or unconvertible
    /// arguments, unresolvable injected values, unencodable output, or the
    /// callable's own error.
    pub fn invoke(
        &self,
        scope: Option<&Scope<'_>>,
        mut args: Map<String, Value>,
    ) -> InvokeResult<Option<Value>> {
        let mut bound: Vec<Box<dyn Any + Send>> =
            Vec::with_capacity(self.injected.len() + self.params.len());

        for spec in &self.injected {
            trace!(tool = %self.tool, type_name = spec.type_name(), "injecting parameter");
            bound.push(resolve_layered(
                scope,
                &self.scope,
                spec.type_id(),
                spec.type_name(),
            )?);
        }

        for param in &self.params {
            let value = args
                .remove(&param.name)
                .ok_or_else(|| InvokeError::MissingArgument {
                    name: param.name.clone(),
                })?;
            let conversion = |source| InvokeError::Conversion {
                parameter: param.name.clone(),
                source,
            };
            let canonical = param.converter.convert(value).map_err(conversion)?;
            bound.push(param.spec.decode(canonical).map_err(conversion)?);
        }

        if let Some(name) = args.keys().next() {
            return Err(InvokeError::UnexpectedArgument { name: name.clone() });
        }

        let returns = self.callable.call(bound)?;
        self.map_returns(returns)
    }

    fn map_returns(&self, returns: Vec<Return>) -> InvokeResult<Option<Value>> {
        let mut returns = returns.into_iter();
        let outcome = match (self.results.as_slice(), returns.next(), returns.next()) {
            ([], None, None) => Ok(None),
            ([ResultKind::Error], Some(Return::Error(err)), None) => {
                err.map_or(Ok(None), |source| Err(InvokeError::Failed { source }))
            }
            ([ResultKind::Value], Some(Return::Value(value)), None) => Ok(Some(value)),
            (
                [ResultKind::Value, ResultKind::Error],
                Some(Return::Value(value)),
                Some(Return::Error(err)),
            ) => err.map_or(Ok(Some(value)), |source| Err(InvokeError::Failed { source })),
            _ => Err(InvokeError::internal(format!(
                "tool `{}` returned results that do not match its signature",
                self.tool
            ))),
        };
        if returns.next().is_some() {
            return Err(InvokeError::internal(format!(
                "tool `{}` returned too many results",
                self.tool
            )));
        }
        outcome
    }

    /// Number of leading parameters supplied by scopes.
    #[must_use]
    pub fn injected_count(&self) -> usize {
        self.injected.len()
    }

    /// Names of the caller-supplied parameters in declared order.
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|param| param.name.as_str()).collect()
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("tool", &self.tool)
            .field("injected", &self.injected)
            .field("params", &self.param_names())
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("schema", &self.schema)
            .field("invoker", &self.invoker)
            .finish()
    }
}
