use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reserved attribute names used to embed graph metadata in a document.
///
/// None of these may collide with an attribute field of a graph-tracked
/// class, and they must be distinct from one another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contract {
    /// Marks the first occurrence of an object with its token.
    pub identity: String,
    /// Marks a back-reference to an earlier token.
    pub reference: String,
    /// Names the runtime class when it differs from the declared one.
    pub label: String,
    /// Carries the length of an array so the reader can pre-allocate.
    pub length: String,
}

impl Default for Contract {
    fn default() -> Self {
        Contract {
            identity: "id".to_string(),
            reference: "reference".to_string(),
            label: "class".to_string(),
            length: "length".to_string(),
        }
    }
}

impl Contract {
    pub fn new(
        identity: impl Into<String>,
        reference: impl Into<String>,
        label: impl Into<String>,
        length: impl Into<String>,
    ) -> Self {
        Contract {
            identity: identity.into(),
            reference: reference.into(),
            label: label.into(),
            length: length.into(),
        }
    }

    /// Returns the four reserved names in a fixed order.
    pub fn names(&self) -> [&str; 4] {
        [&self.identity, &self.reference, &self.label, &self.length]
    }

    /// Returns true if `name` is one of the reserved attribute names.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    /// Rejects empty and duplicate names.
    pub fn validate(&self) -> Result<()> {
        let names = self.names();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::Config("reserved attribute names must not be empty".into()));
            }
            if names[..i].contains(name) {
                return Err(Error::Config(format!("reserved attribute {name} is used twice")));
            }
        }
        Ok(())
    }
}

/// Output mode for text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Escape the markup-reserved symbols.
    #[default]
    Escape,
    /// Wrap text in a CDATA section.
    Data,
    /// Use the mode of the enclosing element.
    Inherit,
}

/// Document-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Format {
    /// Indentation width; zero writes the whole document on one line.
    pub indent: usize,
    /// When set, a declaration line carrying this encoding is emitted.
    pub encoding: Option<String>,
    pub contract: Contract,
    /// Reject unknown elements and attributes on read.
    pub strict: bool,
    /// Default element name for array entries.
    pub entry: String,
    /// Text mode applied to the root element.
    pub mode: Mode,
}

impl Default for Format {
    fn default() -> Self {
        Format {
            indent: 3,
            encoding: None,
            contract: Contract::default(),
            strict: true,
            entry: "entry".to_string(),
            mode: Mode::Escape,
        }
    }
}

impl Format {
    pub fn new(indent: usize) -> Self {
        Format {
            indent,
            ..Format::default()
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_contract(mut self, contract: Contract) -> Self {
        self.contract = contract;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry.is_empty() {
            return Err(Error::Config("entry name must not be empty".into()));
        }
        if self.mode == Mode::Inherit {
            return Err(Error::Config("the root mode cannot inherit".into()));
        }
        self.contract.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_is_valid() {
        let contract = Contract::default();
        assert!(contract.validate().is_ok());
        assert!(contract.is_reserved("id"));
        assert!(contract.is_reserved("length"));
        assert!(!contract.is_reserved("name"));
    }

    #[test]
    fn duplicate_reserved_name_rejected() {
        let contract = Contract::new("id", "id", "class", "length");
        assert!(matches!(contract.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_reserved_name_rejected() {
        let contract = Contract::new("id", "ref", "", "length");
        assert!(matches!(contract.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn format_from_json_fills_defaults() {
        let format: Format =
            serde_json::from_str(r#"{"indent": 0, "contract": {"identity": "uid"}}"#).unwrap();
        assert_eq!(format.indent, 0);
        assert_eq!(format.contract.identity, "uid");
        assert_eq!(format.contract.reference, "reference");
        assert!(format.strict);
        assert_eq!(format.entry, "entry");
        assert!(format.validate().is_ok());
    }

    #[test]
    fn inherit_root_mode_rejected() {
        let format = Format::default().with_mode(Mode::Inherit);
        assert!(format.validate().is_err());
    }
}
