//! The scope forest.
//!
//! Scopes form a tree rooted at the global scope, held in a typed index
//! arena; import edges between module scopes are non-owning `ScopeId`
//! references, so the whole forest is reclaimed at once with its arena.
//! Lookup walks the parent chain, preserving shadowing; module-aware
//! lookup additionally walks each level's import list.

use lumen_common::arena::{Arena, Id};
use lumen_parser::ast::{StmtId, TypeId};

pub type ScopeId = Id<Scope>;

/// Reserved name prefix for the synthetic per-module marker symbols in the
/// global scope (used for duplicate detection during module registration).
pub const MODULE_SYMBOL_PREFIX: &str = "__module_";

/// A node in the scope forest.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub name: String,
    /// Root is 0; every child is parent + 1.
    pub depth: u32,
    pub symbols: Vec<Symbol>,
    pub children: Vec<ScopeId>,
    pub is_function_scope: bool,
    /// Back-link to the AST declaration that opened this scope (functions).
    pub decl: Option<StmtId>,
    pub is_module_scope: bool,
    pub module_name: Option<String>,
    pub imports: Vec<ModuleImport>,
}

/// A named binding in a scope.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: TypeId,
    pub is_public: bool,
    pub is_mutable: bool,
    pub scope_depth: u32,
}

/// A recorded `@use`: the imported module's name, the local alias it is
/// reachable under, and the imported module's scope.
#[derive(Debug, Clone)]
pub struct ModuleImport {
    pub module_name: String,
    pub alias: String,
    pub scope: ScopeId,
}

/// Owner of every scope for one pipeline run.
#[derive(Debug)]
pub struct Scopes {
    arena: Arena<Scope>,
    global: ScopeId,
}

impl Scopes {
    /// Create the forest with its global root scope.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let global = arena.push(Scope {
            parent: None,
            name: "global".to_string(),
            depth: 0,
            symbols: Vec::new(),
            children: Vec::new(),
            is_function_scope: false,
            decl: None,
            is_module_scope: false,
            module_name: None,
            imports: Vec::new(),
        });
        Self { arena, global }
    }

    /// The global root scope.
    pub fn global(&self) -> ScopeId {
        self.global
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.arena.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Allocate, initialise, and attach a child scope.
    pub fn create_child_scope(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        let depth = self.get(parent).depth + 1;
        let child = self.arena.push(Scope {
            parent: Some(parent),
            name: name.to_string(),
            depth,
            symbols: Vec::new(),
            children: Vec::new(),
            is_function_scope: false,
            decl: None,
            is_module_scope: false,
            module_name: None,
            imports: Vec::new(),
        });
        self.get_mut(parent).children.push(child);
        child
    }

    /// Insert a symbol, refusing duplicates in this scope only. Shadowing
    /// an outer-scope binding of the same name is allowed.
    pub fn add_symbol(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: TypeId,
        is_public: bool,
        is_mutable: bool,
    ) -> Result<(), ()> {
        if self.lookup_current_only(scope, name).is_some() {
            return Err(());
        }
        let depth = self.get(scope).depth;
        self.get_mut(scope).symbols.push(Symbol {
            name: name.to_string(),
            ty,
            is_public,
            is_mutable,
            scope_depth: depth,
        });
        Ok(())
    }

    /// Search this scope, then walk parents.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(sym) = self.lookup_current_only(id, name) {
                return Some(sym);
            }
            current = self.get(id).parent;
        }
        None
    }

    /// Search this scope only, without ascending.
    pub fn lookup_current_only(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.get(scope).symbols.iter().find(|s| s.name == name)
    }

    /// Find an import whose alias matches, walking this scope's parents.
    pub fn find_import(&self, scope: ScopeId, alias: &str) -> Option<&ModuleImport> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(import) = self.get(id).imports.iter().find(|i| i.alias == alias) {
                return Some(import);
            }
            current = self.get(id).parent;
        }
        None
    }

    /// Resolve `alias.name` through the import list: a current-only lookup
    /// in the imported module's scope, filtered by visibility. A private
    /// symbol resolves only when the requesting scope sits inside the same
    /// module.
    pub fn lookup_qualified(
        &self,
        scope: ScopeId,
        alias: &str,
        name: &str,
    ) -> Result<&Symbol, QualifiedLookupError> {
        let import = self
            .find_import(scope, alias)
            .ok_or(QualifiedLookupError::UnknownAlias)?;
        let sym = self
            .lookup_current_only(import.scope, name)
            .ok_or(QualifiedLookupError::UnknownSymbol)?;
        if sym.is_public || self.containing_module(scope) == Some(import.scope) {
            Ok(sym)
        } else {
            Err(QualifiedLookupError::NotPublic)
        }
    }

    /// The nearest enclosing function scope, if any.
    pub fn enclosing_function_scope(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.get(id).is_function_scope {
                return Some(id);
            }
            current = self.get(id).parent;
        }
        None
    }

    /// The nearest enclosing module scope, if any.
    pub fn containing_module(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.get(id).is_module_scope {
                return Some(id);
            }
            current = self.get(id).parent;
        }
        None
    }

    /// The module-flagged child of the global scope with the given name.
    pub fn find_module(&self, name: &str) -> Option<ScopeId> {
        self.get(self.global)
            .children
            .iter()
            .copied()
            .find(|&c| {
                let scope = self.get(c);
                scope.is_module_scope && scope.module_name.as_deref() == Some(name)
            })
    }

    /// Render the forest as an indented tree (debugging aid).
    pub fn debug_tree(&self) -> String {
        let mut out = String::new();
        self.debug_scope(self.global, &mut out);
        out
    }

    fn debug_scope(&self, id: ScopeId, out: &mut String) {
        let scope = self.get(id);
        for _ in 0..scope.depth {
            out.push_str("  ");
        }
        out.push_str(&scope.name);
        if scope.is_module_scope {
            out.push_str(" [module]");
        }
        if scope.is_function_scope {
            out.push_str(" [fn]");
        }
        out.push_str(&format!(" ({} symbols)\n", scope.symbols.len()));
        for &child in &scope.children {
            self.debug_scope(child, out);
        }
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a qualified lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifiedLookupError {
    /// No import with that alias is in scope.
    UnknownAlias,
    /// The imported module has no symbol with that name.
    UnknownSymbol,
    /// The symbol exists but is private to its module.
    NotPublic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_common::span::Span;
    use lumen_parser::ast::{Ast, BasicType, TypeKind};

    fn int_ty(ast: &mut Ast) -> TypeId {
        ast.new_type(TypeKind::Basic(BasicType::Int), Span::new(0, 0))
    }

    #[test]
    fn depth_increments_per_level() {
        let mut scopes = Scopes::new();
        let g = scopes.global();
        assert_eq!(scopes.get(g).depth, 0);
        let a = scopes.create_child_scope(g, "a");
        let b = scopes.create_child_scope(a, "b");
        assert_eq!(scopes.get(a).depth, 1);
        assert_eq!(scopes.get(b).depth, 2);
        assert_eq!(scopes.get(b).parent, Some(a));
    }

    #[test]
    fn duplicate_in_same_scope_refused_shadowing_allowed() {
        let mut ast = Ast::new();
        let ty = int_ty(&mut ast);
        let mut scopes = Scopes::new();
        let g = scopes.global();
        assert!(scopes.add_symbol(g, "x", ty, false, true).is_ok());
        assert!(scopes.add_symbol(g, "x", ty, false, true).is_err());

        let child = scopes.create_child_scope(g, "block");
        assert!(scopes.add_symbol(child, "x", ty, false, true).is_ok());
        // Inner lookup finds the shadowing binding.
        let found = scopes.lookup(child, "x").unwrap();
        assert_eq!(found.scope_depth, 1);
    }

    #[test]
    fn lookup_walks_parents_current_only_does_not() {
        let mut ast = Ast::new();
        let ty = int_ty(&mut ast);
        let mut scopes = Scopes::new();
        let g = scopes.global();
        scopes.add_symbol(g, "x", ty, false, true).unwrap();
        let child = scopes.create_child_scope(g, "inner");
        assert!(scopes.lookup(child, "x").is_some());
        assert!(scopes.lookup_current_only(child, "x").is_none());
    }

    #[test]
    fn symbol_depth_matches_scope_depth() {
        let mut ast = Ast::new();
        let ty = int_ty(&mut ast);
        let mut scopes = Scopes::new();
        let child = scopes.create_child_scope(scopes.global(), "f");
        scopes.add_symbol(child, "n", ty, false, true).unwrap();
        let sym = scopes.lookup_current_only(child, "n").unwrap();
        assert_eq!(sym.scope_depth, scopes.get(child).depth);
    }

    #[test]
    fn qualified_lookup_respects_visibility() {
        let mut ast = Ast::new();
        let ty = int_ty(&mut ast);
        let mut scopes = Scopes::new();
        let g = scopes.global();

        let util = scopes.create_child_scope(g, "util");
        {
            let s = scopes.get_mut(util);
            s.is_module_scope = true;
            s.module_name = Some("util".to_string());
        }
        scopes.add_symbol(util, "visible", ty, true, false).unwrap();
        scopes.add_symbol(util, "hidden", ty, false, false).unwrap();

        let main = scopes.create_child_scope(g, "main");
        {
            let s = scopes.get_mut(main);
            s.is_module_scope = true;
            s.module_name = Some("main".to_string());
        }
        scopes.get_mut(main).imports.push(ModuleImport {
            module_name: "util".to_string(),
            alias: "util".to_string(),
            scope: util,
        });

        assert!(scopes.lookup_qualified(main, "util", "visible").is_ok());
        assert_eq!(
            scopes.lookup_qualified(main, "util", "hidden"),
            Err(QualifiedLookupError::NotPublic)
        );
        assert_eq!(
            scopes.lookup_qualified(main, "util", "absent"),
            Err(QualifiedLookupError::UnknownSymbol)
        );
        assert_eq!(
            scopes.lookup_qualified(main, "nope", "visible"),
            Err(QualifiedLookupError::UnknownAlias)
        );

        // Inside the defining module, private symbols resolve through a
        // self-import.
        scopes.get_mut(util).imports.push(ModuleImport {
            module_name: "util".to_string(),
            alias: "self_alias".to_string(),
            scope: util,
        });
        let inner = scopes.create_child_scope(util, "fn");
        assert!(scopes.lookup_qualified(inner, "self_alias", "hidden").is_ok());
    }

    #[test]
    fn find_module_and_enclosing_walks() {
        let mut scopes = Scopes::new();
        let g = scopes.global();
        let m = scopes.create_child_scope(g, "m");
        {
            let s = scopes.get_mut(m);
            s.is_module_scope = true;
            s.module_name = Some("m".to_string());
        }
        let f = scopes.create_child_scope(m, "f");
        scopes.get_mut(f).is_function_scope = true;
        let block = scopes.create_child_scope(f, "block");

        assert_eq!(scopes.find_module("m"), Some(m));
        assert_eq!(scopes.find_module("other"), None);
        assert_eq!(scopes.enclosing_function_scope(block), Some(f));
        assert_eq!(scopes.containing_module(block), Some(m));
        assert_eq!(scopes.enclosing_function_scope(g), None);
    }
}
