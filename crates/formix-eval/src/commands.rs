//! Keyword commands
//!
//! Statements of the form `!keyword arguments` bypass expression evaluation and
//! run one of these against the session. Keywords are case-insensitive.
//!
//! ## Commands
//! - init: initialize the domain's special functions
//! - import <descriptor>: apply one library descriptor line
//! - remove <name>: drop a symbol from the table
//! - symbols: list every symbol name

use crate::session::Session;
use crate::symbols::SymbolTable;
use formix_types::{Domain, FormixError, Result};

/// A command receives the session and the text after its keyword
pub type CommandFn<D> = fn(&mut Session<D>, &str) -> Result<String>;

pub fn register<D: Domain>(table: &mut SymbolTable<D>) {
    table.add_command("init", init::<D>);
    table.add_command("import", import::<D>);
    table.add_command("remove", remove::<D>);
    table.add_command("symbols", symbols::<D>);
}

fn no_arguments(command: &str, arguments: &str) -> Result<()> {
    if arguments.trim().is_empty() {
        Ok(())
    } else {
        Err(FormixError::Syntax(format!(
            "!{} takes no arguments, got '{}'",
            command,
            arguments.trim()
        )))
    }
}

fn init<D: Domain>(session: &mut Session<D>, arguments: &str) -> Result<String> {
    no_arguments("init", arguments)?;
    session.init_special_functions();
    Ok(format!("special functions initialized for the {} domain", session.domain().name()))
}

fn import<D: Domain>(session: &mut Session<D>, arguments: &str) -> Result<String> {
    match session.import(arguments.trim())? {
        Some(name) => Ok(format!("imported {}", name)),
        None => Ok(String::new()),
    }
}

fn remove<D: Domain>(session: &mut Session<D>, arguments: &str) -> Result<String> {
    let name = arguments.trim();
    if name.is_empty() {
        return Err(FormixError::Syntax("!remove expects a symbol name".to_string()));
    }
    session
        .table_mut()
        .remove(name)
        .map(|symbol| format!("removed {} {}", symbol.kind, symbol.name))
        .ok_or_else(|| FormixError::UndefinedSymbol(name.to_string()))
}

fn symbols<D: Domain>(session: &mut Session<D>, arguments: &str) -> Result<String> {
    no_arguments("symbols", arguments)?;
    Ok(session.table().names().join(" "))
}
