//! Library configuration loader
//!
//! Binds declarative descriptor lines onto symbol-table entries:
//!
//! ```text
//! <kind>,<library>,<description>,<name>,<symbol>[,<precedence>][,<notation>][,<config>]
//! ```
//!
//! - `LIBRARY` instantiates the collector registered as `<library>` and binds it
//!   under `<name>` in the library map and as a `<symbol>` library entry
//! - `OPERATOR`, `FUNCTION` and `VALUE` look up the library bound as
//!   `<library>`, call its `<name>` factory and register the result under
//!   `<symbol>`
//!
//! Each line is applied on its own. A failing line leaves earlier lines in
//! place.

use crate::library::{FactoryRequest, Library, LibraryRegistry, Product};
use crate::operation::{Arity, Operation};
use crate::symbols::{NamedSymbol, Notation, SymbolKind, SymbolTable};
use formix_types::{Domain, FormixError, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

const MIN_FIELDS: usize = 5;
const MAX_FIELDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Operator,
    Function,
    Value,
    Library,
}

impl DescriptorKind {
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "OPERATOR" => Ok(DescriptorKind::Operator),
            "FUNCTION" => Ok(DescriptorKind::Function),
            "VALUE" => Ok(DescriptorKind::Value),
            "LIBRARY" => Ok(DescriptorKind::Library),
            other => Err(FormixError::configuration(
                "kind",
                format!("unknown descriptor kind '{}'", other),
            )),
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DescriptorKind::Operator => "OPERATOR",
            DescriptorKind::Function => "FUNCTION",
            DescriptorKind::Value => "VALUE",
            DescriptorKind::Library => "LIBRARY",
        };
        write!(f, "{}", name)
    }
}

/// One parsed descriptor line
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryDescriptor {
    pub kind: DescriptorKind,
    pub library: String,
    pub description: String,
    pub name: String,
    pub symbol: String,
    pub precedence: Option<u32>,
    pub notation: Option<Notation>,
    /// Everything after the seventh comma, commas included
    pub config: String,
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(FormixError::configuration(field, "field must not be empty"))
    } else {
        Ok(value.to_string())
    }
}

impl LibraryDescriptor {
    /// Parse one line; blank lines and `#` comments yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let fields: Vec<&str> = line.splitn(MAX_FIELDS, ',').collect();
        if fields.len() < MIN_FIELDS {
            return Err(FormixError::configuration(
                line,
                format!(
                    "expected {} to {} comma-separated fields, got {}",
                    MIN_FIELDS,
                    MAX_FIELDS,
                    fields.len()
                ),
            ));
        }

        let optional = |index: usize| fields.get(index).map(|f| f.trim()).filter(|f| !f.is_empty());

        let precedence = optional(5)
            .map(|text| {
                text.parse::<u32>().map_err(|_| {
                    FormixError::configuration("precedence", format!("'{}' is not a non-negative integer", text))
                })
            })
            .transpose()?;

        let notation = optional(6)
            .map(|text| {
                Notation::parse(text)
                    .ok_or_else(|| FormixError::configuration("notation", format!("unknown notation '{}'", text)))
            })
            .transpose()?;

        Ok(Some(Self {
            kind: DescriptorKind::parse(fields[0])?,
            library: required("library", fields[1])?,
            description: fields[2].trim().to_string(),
            name: required("name", fields[3])?,
            symbol: required("symbol", fields[4])?,
            precedence,
            notation,
            config: optional(7).unwrap_or_default().to_string(),
        }))
    }
}

/// Applies descriptor lines to a session's table and library map
pub struct Loader<'a, D: Domain> {
    domain: &'a D,
    registry: &'a LibraryRegistry<D>,
    libraries: &'a mut HashMap<String, Box<dyn Library<D>>>,
    table: &'a mut SymbolTable<D>,
}

impl<'a, D: Domain> Loader<'a, D> {
    pub fn new(
        domain: &'a D,
        registry: &'a LibraryRegistry<D>,
        libraries: &'a mut HashMap<String, Box<dyn Library<D>>>,
        table: &'a mut SymbolTable<D>,
    ) -> Self {
        Self {
            domain,
            registry,
            libraries,
            table,
        }
    }

    /// Apply one line, returning the registered symbol name
    pub fn import_line(&mut self, line: &str) -> Result<Option<String>> {
        let result = LibraryDescriptor::parse(line).and_then(|descriptor| match descriptor {
            Some(descriptor) => self.import(&descriptor).map(Some),
            None => Ok(None),
        });
        if let Err(e) = &result {
            warn!("import of '{}' failed: {}", line.trim(), e);
        }
        result
    }

    /// Apply lines in order, stopping at the first failure
    pub fn import_all<I, S>(&mut self, lines: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut imported = 0;
        for line in lines {
            if self.import_line(line.as_ref())?.is_some() {
                imported += 1;
            }
        }
        Ok(imported)
    }

    pub fn import(&mut self, descriptor: &LibraryDescriptor) -> Result<String> {
        match descriptor.kind {
            DescriptorKind::Library => self.import_library(descriptor),
            DescriptorKind::Operator => self.import_operator(descriptor),
            DescriptorKind::Function => self.import_function(descriptor),
            DescriptorKind::Value => self.import_value(descriptor),
        }?;
        Ok(descriptor.symbol.clone())
    }

    fn import_library(&mut self, descriptor: &LibraryDescriptor) -> Result<()> {
        let library = self.registry.instantiate(&descriptor.library)?;
        info!(
            "library {} bound as '{}' ({} factories)",
            library.name(),
            descriptor.name,
            library.exposed().len()
        );
        self.libraries.insert(descriptor.name.clone(), library);
        self.table.add(
            NamedSymbol::library(&descriptor.symbol, &descriptor.name),
            &descriptor.description,
        );
        Ok(())
    }

    fn build(&self, descriptor: &LibraryDescriptor) -> Result<Product<D>> {
        let library = self.libraries.get(&descriptor.library).ok_or_else(|| {
            FormixError::configuration(&descriptor.library, "library has not been imported")
        })?;
        let factory = library.factory(&descriptor.name).ok_or_else(|| {
            FormixError::configuration(
                format!("{}.{}", descriptor.library, descriptor.name),
                "no factory with this name",
            )
        })?;
        let request = FactoryRequest {
            symbol: &descriptor.symbol,
            precedence: descriptor.precedence,
        };
        debug!("{} {}.{} -> '{}'", descriptor.kind, descriptor.library, descriptor.name, descriptor.symbol);
        factory(self.domain, &request)
    }

    fn build_operation(&self, descriptor: &LibraryDescriptor) -> Result<Rc<dyn Operation<D>>> {
        let mut operation = match self.build(descriptor)? {
            Product::Operation(op) => op,
            Product::Value(_) => {
                return Err(FormixError::configuration(
                    &descriptor.symbol,
                    format!("{} produced a value, not an operation", descriptor.name),
                ))
            }
        };
        operation.configure(&descriptor.config)?;
        Ok(Rc::from(operation))
    }

    fn import_operator(&mut self, descriptor: &LibraryDescriptor) -> Result<()> {
        let precedence = descriptor
            .precedence
            .ok_or_else(|| FormixError::configuration("precedence", "operators require a precedence"))?;
        let operation = self.build_operation(descriptor)?;

        let notation = match (operation.arity(), descriptor.notation) {
            (Arity::Unary, None) => Notation::Prefix,
            (Arity::Unary, Some(n @ (Notation::Prefix | Notation::Postfix))) => n,
            (Arity::Binary, None) => Notation::Infix,
            (Arity::Binary, Some(n @ (Notation::Infix | Notation::InfixRight))) => n,
            (Arity::Parameterized(range), _) => {
                return Err(FormixError::configuration(
                    &descriptor.symbol,
                    format!("operators must be unary or binary, {} takes {} arguments", descriptor.name, range),
                ))
            }
            (arity, Some(notation)) => {
                return Err(FormixError::configuration(
                    "notation",
                    format!("{:?} does not fit a {:?} operation", notation, arity),
                ))
            }
        };

        self.table.add(
            NamedSymbol::operator(&descriptor.symbol, operation, precedence, notation),
            &descriptor.description,
        );
        Ok(())
    }

    fn import_function(&mut self, descriptor: &LibraryDescriptor) -> Result<()> {
        let operation = self.build_operation(descriptor)?;
        self.table
            .add(NamedSymbol::function(&descriptor.symbol, operation), &descriptor.description);
        Ok(())
    }

    fn import_value(&mut self, descriptor: &LibraryDescriptor) -> Result<()> {
        if !descriptor.config.is_empty() {
            return Err(FormixError::configuration(
                &descriptor.symbol,
                format!("values do not accept configuration, got '{}'", descriptor.config),
            ));
        }
        let value = match self.build(descriptor)? {
            Product::Value(value) => value,
            Product::Operation(_) => {
                return Err(FormixError::configuration(
                    &descriptor.symbol,
                    format!("{} produced an operation, not a value", descriptor.name),
                ))
            }
        };
        self.table.add(
            NamedSymbol::value(&descriptor.symbol, SymbolKind::Constant, value),
            &descriptor.description,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let d = LibraryDescriptor::parse("FUNCTION,special,Bessel J0,besselj,J0,,,alpha=0")
            .unwrap()
            .unwrap();
        assert_eq!(d.kind, DescriptorKind::Function);
        assert_eq!(d.library, "special");
        assert_eq!(d.symbol, "J0");
        assert_eq!(d.precedence, None);
        assert_eq!(d.config, "alpha=0");
    }

    #[test]
    fn test_config_keeps_commas() {
        let d = LibraryDescriptor::parse("OPERATOR,calc,Tanh-Sinh,tanh_sinh_mark,TSQ5,90,prefix,levels=5, tolerance=1e-8")
            .unwrap()
            .unwrap();
        assert_eq!(d.precedence, Some(90));
        assert_eq!(d.notation, Some(Notation::Prefix));
        assert_eq!(d.config, "levels=5, tolerance=1e-8");
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(LibraryDescriptor::parse("   ").unwrap(), None);
        assert_eq!(LibraryDescriptor::parse("# operators").unwrap(), None);
    }

    #[test]
    fn test_errors_name_the_field() {
        let err = LibraryDescriptor::parse("OPERATOR,arith,Addition,add,+,four").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error in precedence"));

        let err = LibraryDescriptor::parse("MACRO,arith,x,y,z").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error in kind"));

        let err = LibraryDescriptor::parse("VALUE,const,Pi,,pi").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error in name"));

        let err = LibraryDescriptor::parse("OPERATOR,arith,Addition,add,+,4,diagonal").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error in notation"));
    }

    #[test]
    fn test_too_few_fields() {
        let err = LibraryDescriptor::parse("VALUE,const,Pi").unwrap_err();
        assert!(err.to_string().contains("expected 5 to 8 comma-separated fields, got 3"));
    }
}
