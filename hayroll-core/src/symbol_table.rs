//! Chained macro symbol table. Parent links are shared, immutable `Rc`
//! pointers -- unlike the include/premise trees this structure has no
//! cycles, so ordinary reference counting is the idiomatic fit. Each child
//! created while forking into a conditional branch is a cheap, independent
//! view layered over a shared parent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::program_point::ProgramPoint;
use crate::token::Token;

/// An object-like macro, e.g. `#define HAYROLL 1`. `body` is empty for a
/// macro defined with an empty replacement list. `def_site` is the program
/// point of the `#define` directive itself; it is `None` only for macros
/// synthesized outside any real source (e.g. in unit tests), and is what
/// lets the symbolic executor record, in a premise tree's macro-premise
/// map, *which* definition site is the one active at a given expansion.
#[derive(Debug, Clone)]
pub struct ObjectSymbol {
    pub name: String,
    pub body: Vec<Token>,
    pub def_site: Option<ProgramPoint>,
}

/// A function-like macro, e.g. `#define HAYROLL(x) x + 1`.
#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub params: Vec<String>,
    pub variadic: bool,
    pub body: Vec<Token>,
    pub def_site: Option<ProgramPoint>,
}

/// Recorded by `#undef`.
#[derive(Debug, Clone)]
pub struct UndefinedSymbol {
    pub name: String,
    pub def_site: Option<ProgramPoint>,
}

/// Marks a macro as already expanded on the current expansion path, to
/// block self-reference. Kept distinct from [`UndefinedSymbol`] because a
/// later, unrelated `#define` of the same name should still take effect
/// once the expansion that pushed this marker pops it back off.
#[derive(Debug, Clone)]
pub struct ExpandedSymbol {
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Object(ObjectSymbol),
    Function(FunctionSymbol),
    Undefined(UndefinedSymbol),
    Expanded(ExpandedSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Object(s) => &s.name,
            Symbol::Function(s) => &s.name,
            Symbol::Undefined(s) => &s.name,
            Symbol::Expanded(s) => &s.name,
        }
    }

    /// The program point of the `#define`/`#undef` that created this
    /// symbol, if any. `None` for a [`Symbol::Expanded`] marker, which has
    /// no definition site of its own.
    pub fn def_site(&self) -> Option<ProgramPoint> {
        match self {
            Symbol::Object(s) => s.def_site,
            Symbol::Function(s) => s.def_site,
            Symbol::Undefined(s) => s.def_site,
            Symbol::Expanded(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: RefCell<HashMap<String, Symbol>>,
    parent: Option<Rc<SymbolTable>>,
}

impl SymbolTable {
    pub fn new() -> Rc<SymbolTable> {
        Rc::new(SymbolTable::default())
    }

    pub fn make_child(self: &Rc<SymbolTable>) -> Rc<SymbolTable> {
        Rc::new(SymbolTable {
            symbols: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(self)),
        })
    }

    pub fn define(&self, symbol: Symbol) {
        self.symbols
            .borrow_mut()
            .insert(symbol.name().to_string(), symbol);
    }

    /// Looks up a name in this table, then its ancestors. `None` means an
    /// unknown symbol, which the macro expander treats as not a macro at
    /// all rather than as undefined.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        if let Some(sym) = self.symbols.borrow().get(name) {
            return Some(sym.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }
}

/// Layers a mutable push/pop stack of [`ExpandedSymbol`] markers over a
/// [`SymbolTable`] for the duration of one macro expansion, so a macro
/// cannot expand into itself through an argument or through a chain of
/// other macros. Not meant to be retained past that expansion or handed to
/// a child symbol table.
pub struct UndefStackSymbolTable<'a> {
    table: &'a SymbolTable,
    undef_stack: Vec<String>,
}

impl<'a> UndefStackSymbolTable<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self {
            table,
            undef_stack: Vec::new(),
        }
    }

    pub fn push_expanded(&mut self, name: impl Into<String>) {
        self.undef_stack.push(name.into());
    }

    pub fn pop(&mut self) {
        self.undef_stack.pop();
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        if self.undef_stack.iter().rev().any(|n| n == name) {
            return Some(Symbol::Expanded(ExpandedSymbol {
                name: name.to_string(),
            }));
        }
        self.table.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_sees_parent_defines_until_shadowed() {
        let root = SymbolTable::new();
        root.define(Symbol::Object(ObjectSymbol {
            name: "A".into(),
            body: vec![],
            def_site: None,
        }));
        let child = root.make_child();
        assert!(matches!(child.lookup("A"), Some(Symbol::Object(_))));

        child.define(Symbol::Undefined(UndefinedSymbol { name: "A".into(), def_site: None }));
        assert!(matches!(child.lookup("A"), Some(Symbol::Undefined(_))));
        assert!(matches!(root.lookup("A"), Some(Symbol::Object(_))));
    }

    #[test]
    fn undef_stack_blocks_self_reference_then_unblocks_on_pop() {
        let root = SymbolTable::new();
        root.define(Symbol::Object(ObjectSymbol {
            name: "A".into(),
            body: vec![],
            def_site: None,
        }));
        let mut stacked = UndefStackSymbolTable::new(&root);
        stacked.push_expanded("A");
        assert!(matches!(stacked.lookup("A"), Some(Symbol::Expanded(_))));
        stacked.pop();
        assert!(matches!(stacked.lookup("A"), Some(Symbol::Object(_))));
    }
}
