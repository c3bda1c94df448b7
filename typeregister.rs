// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Registration of the built-in types

The primitive value types are inserted directly; the system classes
(`string` and the array template) are declared in AngelScript source below
and go through the regular parser and hoist pass, so they behave exactly
like user classes during resolution.
*/

use crate::analyzer::hoist;
use crate::analyzer::AnalyzeTask;
use crate::diagnostics::BuildDiagnostics;
use crate::symbols::{insert_symbol, ScopeRef, Symbol, SymbolScope, SymbolType, TypeSource};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::rc::Rc;

/// `(name, is_number_type)` of every primitive value type, plus the `?`
/// placeholder of variadic system functions
pub const PRIMITIVE_TYPES: &[(&str, bool)] = &[
    ("void", false),
    ("bool", false),
    ("int", true),
    ("int8", true),
    ("int16", true),
    ("int32", true),
    ("int64", true),
    ("uint", true),
    ("uint8", true),
    ("uint16", true),
    ("uint32", true),
    ("uint64", true),
    ("float", true),
    ("double", true),
    ("?", false),
];

/// Declarations of the system classes, analyzed with the normal pipeline
const SYSTEM_DECLARATIONS: &str = r#"
class string {
    uint length() const;
    bool isEmpty() const;
    string opAdd(const string &in other) const;
    string opAdd_r(const string &in other) const;
    bool opEquals(const string &in other) const;
    int opCmp(const string &in other) const;
    uint8 opIndex(uint index) const;
    string substr(uint start = 0, int count = -1) const;
    int findFirst(const string &in value, uint start = 0) const;
    int findLast(const string &in value, int start = -1) const;
}

class array<T> {
    uint length() const;
    bool isEmpty() const;
    void resize(uint length);
    void reserve(uint length);
    void insertAt(uint index, const T &in value);
    void insertLast(const T &in value);
    void removeAt(uint index);
    void removeLast();
    T &opIndex(uint index);
    bool opEquals(const array<T> &in other) const;
    int find(const T &in value) const;
    void sortAsc();
    void sortDesc();
}
"#;

/// The handles to the types the analyzer needs at hand for literals and
/// operator results
pub struct BuiltinTypes {
    pub void_type: Rc<SymbolType>,
    pub bool_type: Rc<SymbolType>,
    pub int_type: Rc<SymbolType>,
    pub float_type: Rc<SymbolType>,
    pub double_type: Rc<SymbolType>,
}

/// Build the global scope: primitives first, then the system classes, and
/// return the queue of their pending signature resolutions
pub fn builtin_global_scope() -> (ScopeRef, BuiltinTypes, Vec<AnalyzeTask>) {
    let global = SymbolScope::new_root();

    for (name, is_number) in PRIMITIVE_TYPES {
        let ty = Rc::new(SymbolType {
            name: SmolStr::from(*name),
            declared_at: None,
            source: TypeSource::Primitive,
            template_types: None,
            members_scope: RefCell::new(None),
            base_types: RefCell::new(Vec::new()),
            funcdef_signature: RefCell::new(None),
            is_system_type: true,
            is_number_type: *is_number,
        });
        let _ = insert_symbol(&global, Symbol::Type(ty));
    }

    // the system classes must parse cleanly; their diagnostics never reach
    // the user
    let mut diags = BuildDiagnostics::default();
    let (script, _highlights) = crate::parser::parse(SYSTEM_DECLARATIONS, None, &mut diags);
    debug_assert!(!diags.has_errors(), "system declarations: {:?}", diags.to_string_vec());
    let queue = hoist::hoist(&script, &global, true, &mut diags);

    let fetch = |name: &str| match global.borrow().find_symbol(name) {
        Some(Symbol::Type(ty)) => ty,
        _ => unreachable!("primitive '{name}' was just registered"),
    };
    let builtins = BuiltinTypes {
        void_type: fetch("void"),
        bool_type: fetch("bool"),
        int_type: fetch("int"),
        float_type: fetch("float"),
        double_type: fetch("double"),
    };
    (global, builtins, queue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_declarations_parse_cleanly() {
        let (global, builtins, queue) = builtin_global_scope();
        assert!(builtins.int_type.is_number_type);
        assert!(!builtins.bool_type.is_number_type);
        assert!(!queue.is_empty());

        let string_ty = match global.borrow().find_symbol("string") {
            Some(Symbol::Type(ty)) => ty,
            _ => panic!("string type missing"),
        };
        assert!(string_ty.is_system_type);
        assert!(string_ty.members_scope.borrow().is_some());

        let array_ty = match global.borrow().find_symbol("array") {
            Some(Symbol::Type(ty)) => ty,
            _ => panic!("array type missing"),
        };
        assert_eq!(array_ty.template_types.as_ref().map(|t| t.len()), Some(1));
    }
}
