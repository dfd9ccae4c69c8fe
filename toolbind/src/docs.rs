//! Human-readable documentation for tools and struct fields.
//!
//! `#[tool]` and `#[derive(ToolArg)]` submit entries at link time which
//! [`InventoryDocs`] collects. [`StaticDocs`] is a hand-built alternative.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static PARAM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([a-zA-Z_][a-zA-Z0-9_]*): (.+)$").unwrap_or_else(|err| {
        unreachable!("parameter line pattern is valid: {err}")
    })
});

/// Link-time documentation of a function, submitted by `#[tool]`.
#[derive(Debug)]
pub struct FunctionDocEntry {
    /// Fully qualified identifier, `module::path::name`.
    pub id: &'static str,
    /// Raw doc comment text.
    pub doc: &'static str,
    /// Formal parameter names in declaration order.
    pub params: &'static [&'static str],
}

impl FunctionDocEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(
        id: &'static str,
        doc: &'static str,
        params: &'static [&'static str],
    ) -> Self {
        Self { id, doc, params }
    }
}

/// Link-time documentation of struct fields, submitted by `#[derive(ToolArg)]`.
#[derive(Debug)]
pub struct StructDocEntry {
    /// Fully qualified identifier of the struct.
    pub owner: &'static str,
    /// `(field identifier, doc text)` pairs.
    pub fields: &'static [(&'static str, &'static str)],
}

impl StructDocEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(
        owner: &'static str,
        fields: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { owner, fields }
    }
}

inventory::collect!(FunctionDocEntry);
inventory::collect!(StructDocEntry);

/// Name and description of one parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamDoc {
    /// Formal parameter name, used as the argument key.
    pub name: String,
    /// Description shown in the schema.
    pub description: String,
}

/// Description of a function and its parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionDoc {
    /// What the function does.
    pub description: String,
    /// Parameters in declaration order.
    pub params: Vec<ParamDoc>,
}

impl FunctionDoc {
    /// Creates documentation with no parameters.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.params.push(ParamDoc {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// Parses a doc comment.
    ///
    /// Lines of the form `name: text` describe parameters. The description
    /// is everything before the first such line, trimmed; without any such
    /// line the whole comment is the description.
    ///
    /// ```
    /// use toolbind::FunctionDoc;
    ///
    /// let doc = FunctionDoc::parse("Adds two numbers\na: the first\nb: the second", &["a", "b"]);
    /// assert_eq!(doc.description, "Adds two numbers");
    /// assert_eq!(doc.params[1].description, "the second");
    /// ```
    #[must_use]
    pub fn parse(doc: &str, params: &[&str]) -> Self {
        let mut described: HashMap<&str, &str> = HashMap::new();
        for captures in PARAM_LINE.captures_iter(doc) {
            if let (Some(name), Some(text)) = (captures.get(1), captures.get(2)) {
                described.insert(name.as_str(), text.as_str());
            }
        }

        let description = PARAM_LINE
            .find(doc)
            .map_or(doc, |first| &doc[..first.start()])
            .trim();

        Self {
            description: description.to_owned(),
            params: params
                .iter()
                .map(|name| ParamDoc {
                    name: (*name).to_owned(),
                    description: described.get(name).copied().unwrap_or_default().to_owned(),
                })
                .collect(),
        }
    }

    /// Parameter names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|param| param.name.as_str()).collect()
    }
}

/// Source of documentation consulted at registration.
pub trait DocProvider: Send + Sync {
    /// Documentation of the function with the given fully qualified id.
    fn function(&self, id: &str) -> Option<FunctionDoc>;

    /// Description of a struct field.
    fn field(&self, owner: &str, field: &str) -> Option<String>;
}

/// Documentation gathered from `#[tool]` and `#[derive(ToolArg)]`.
#[derive(Debug, Default)]
pub struct InventoryDocs {
    functions: HashMap<&'static str, &'static FunctionDocEntry>,
    fields: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl InventoryDocs {
    /// Indexes every submitted entry.
    #[must_use]
    pub fn collect() -> Self {
        let functions = inventory::iter::<FunctionDocEntry>
            .into_iter()
            .map(|entry| (entry.id, entry))
            .collect();
        let mut fields: HashMap<_, HashMap<_, _>> = HashMap::new();
        for entry in inventory::iter::<StructDocEntry> {
            fields
                .entry(entry.owner)
                .or_default()
                .extend(entry.fields.iter().copied());
        }
        Self { functions, fields }
    }
}

impl DocProvider for InventoryDocs {
    fn function(&self, id: &str) -> Option<FunctionDoc> {
        self.functions
            .get(id)
            .map(|entry| FunctionDoc::parse(entry.doc, entry.params))
    }

    fn field(&self, owner: &str, field: &str) -> Option<String> {
        self.fields
            .get(owner)?
            .get(field)
            .map(|doc| (*doc).to_owned())
    }
}

/// Documentation assembled by hand.
///
/// ```
/// use toolbind::{DocProvider, FunctionDoc, StaticDocs};
///
/// let docs = StaticDocs::new()
///     .with_function("app::ping", FunctionDoc::new("Checks liveness"))
///     .with_field("app::Target", "host", "Host to ping");
/// assert!(docs.function("app::ping").is_some());
/// assert_eq!(docs.field("app::Target", "host").as_deref(), Some("Host to ping"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticDocs {
    functions: HashMap<String, FunctionDoc>,
    fields: HashMap<(String, String), String>,
}

impl StaticDocs {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents a function.
    #[must_use]
    pub fn with_function(mut self, id: impl Into<String>, doc: FunctionDoc) -> Self {
        self.functions.insert(id.into(), doc);
        self
    }

    /// Documents a struct field.
    #[must_use]
    pub fn with_field(
        mut self,
        owner: impl Into<String>,
        field: impl Into<String>,
        doc: impl Into<String>,
    ) -> Self {
        self.fields.insert((owner.into(), field.into()), doc.into());
        self
    }
}

impl DocProvider for StaticDocs {
    fn function(&self, id: &str) -> Option<FunctionDoc> {
        self.functions.get(id).cloned()
    }

    fn field(&self, owner: &str, field: &str) -> Option<String> {
        self.fields
            .get(&(owner.to_owned(), field.to_owned()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    inventory::submit! {
        FunctionDocEntry::new(
            "toolbind::docs::tests::lookup",
            "Looks up a record\nkey: record key\nfresh: bypass caches",
            &["key", "fresh"],
        )
    }

    inventory::submit! {
        StructDocEntry::new("toolbind::docs::tests::Record", &[("key", "record key")])
    }

    #[test]
    fn parse_splits_description_from_parameter_lines() {
        let doc = FunctionDoc::parse(
            "Resolves a domain\n  with extra detail\ndomain: name to check. e.g. example.com",
            &["domain", "timeout"],
        );
        assert_eq!(doc.description, "Resolves a domain\n  with extra detail");
        assert_eq!(doc.params[0].description, "name to check. e.g. example.com");
        assert_eq!(doc.params[1], ParamDoc {
            name: "timeout".into(),
            description: String::new(),
        });
    }

    #[test]
    fn parse_without_parameter_lines_keeps_the_whole_comment() {
        let doc = FunctionDoc::parse("Get the chat id", &["cid"]);
        assert_eq!(doc.description, "Get the chat id");
        assert_eq!(doc.names(), vec!["cid"]);
    }

    #[test]
    fn indented_lines_are_not_parameter_lines() {
        let doc = FunctionDoc::parse("Sums values\n  a: not a parameter", &["a"]);
        assert_eq!(doc.description, "Sums values\n  a: not a parameter");
        assert!(doc.params[0].description.is_empty());
    }

    #[test]
    fn inventory_docs_find_submitted_entries() {
        let docs = InventoryDocs::collect();
        let doc = docs.function("toolbind::docs::tests::lookup").unwrap();
        assert_eq!(doc.description, "Looks up a record");
        assert_eq!(doc.names(), vec!["key", "fresh"]);
        assert_eq!(doc.params[1].description, "bypass caches");

        assert_eq!(
            docs.field("toolbind::docs::tests::Record", "key").as_deref(),
            Some("record key")
        );
        assert!(docs.function("toolbind::docs::tests::missing").is_none());
    }
}
