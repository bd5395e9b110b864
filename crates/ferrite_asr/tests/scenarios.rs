//! End-to-end exercises of the symbol table, validation, pickling, and the
//! interface projection, the way the elaboration pass drives them.

use ferrite_asr::arena::{ScopeId, SymbolId};
use ferrite_asr::build::{constant_integer, function_call, var, UnitBuilder};
use ferrite_asr::compare::structurally_equal;
use ferrite_asr::interface::module_interface;
use ferrite_asr::nodes::{
    Abi, Access, Deftype, Intent, Presence, Stmt, StmtAssignment, StmtGoTo, StmtGoToTarget,
    StorageType, SymbolExternalSymbol, SymbolFunction, SymbolGenericProcedure, SymbolModule,
    SymbolProgram, SymbolVariable, Ttype,
};
use ferrite_asr::pickle::{pickle, pickle_expr};
use ferrite_asr::validate::{validate, ViolationKind};
use ferrite_asr::{Name, Symbol, TranslationUnit, UnitItem};

fn local_variable(scope: ScopeId, name: &str, intent: Intent) -> Symbol {
    Symbol::Variable(SymbolVariable {
        parent_symtab: scope,
        name: Name::new(name),
        intent,
        symbolic_value: None,
        storage: StorageType::Default,
        ttype: Ttype::integer(4),
        abi: Abi::Source,
        access: Access::Public,
        presence: Presence::Required,
    })
}

fn function(
    builder: &mut UnitBuilder,
    into: ScopeId,
    name: &str,
    access: Access,
    body: Vec<Stmt>,
) -> SymbolId {
    let fn_scope = builder.new_scope(into);
    let ret = builder
        .add_symbol(fn_scope, local_variable(fn_scope, "r", Intent::ReturnVar))
        .unwrap();
    builder
        .add_symbol(
            into,
            Symbol::Function(SymbolFunction {
                name: Name::new(name),
                symtab: fn_scope,
                args: vec![],
                body,
                return_var: ret,
                abi: Abi::Source,
                access,
                deftype: Deftype::Implementation,
                bindc_name: None,
            }),
        )
        .unwrap()
}

#[test]
fn goto_pairs_gate_validation() {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();
    let f = function(
        &mut builder,
        global,
        "f",
        Access::Public,
        vec![
            Stmt::GoTo(StmtGoTo { id: 7 }),
            Stmt::GoToTarget(StmtGoToTarget { id: 7 }),
            Stmt::Return,
        ],
    );
    builder.finish_procedure(f).unwrap();
    let unit = builder.finish();
    assert_eq!(validate(&unit), vec![]);

    // drop the target: exactly one violation, at the GoTo
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();
    let f = function(
        &mut builder,
        global,
        "f",
        Access::Public,
        vec![Stmt::GoTo(StmtGoTo { id: 7 }), Stmt::Return],
    );
    let violations = builder.finish_procedure(f).unwrap_err();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::GoTo);

    let unit = builder.finish();
    let violations = validate(&unit);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::GoTo);
}

/// Module `m` exports `f`; a program references it through an
/// `ExternalSymbol`, the single permitted cross-module handle.
fn unit_with_external() -> (TranslationUnit, SymbolId, SymbolId) {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();

    let mod_scope = builder.new_scope(global);
    let f = function(
        &mut builder,
        mod_scope,
        "f",
        Access::Public,
        vec![Stmt::Return],
    );
    builder
        .add_symbol(
            global,
            Symbol::Module(SymbolModule {
                name: Name::new("m"),
                symtab: mod_scope,
                dependencies: vec![],
                loaded_from_mod: false,
            }),
        )
        .unwrap();

    let prog_scope = builder.new_scope(global);
    let ext = builder
        .add_symbol(
            prog_scope,
            Symbol::ExternalSymbol(SymbolExternalSymbol {
                parent_symtab: prog_scope,
                name: Name::new("f"),
                external: f,
                module_name: Name::new("m"),
                scope_names: vec![],
                original_name: Name::new("f"),
                access: Access::Public,
            }),
        )
        .unwrap();
    let main = builder
        .add_symbol(
            global,
            Symbol::Program(SymbolProgram {
                name: Name::new("main"),
                symtab: prog_scope,
                dependencies: vec![Name::new("m")],
                body: vec![],
            }),
        )
        .unwrap();
    let mut unit = builder.finish();
    unit.items.push(UnitItem::Symbol(main));
    (unit, ext, f)
}

#[test]
fn externals_resolve_along_their_declared_path() {
    let (unit, ext, f) = unit_with_external();
    assert_eq!(validate(&unit), vec![]);

    let Symbol::Program(main) = unit
        .arena
        .symbol(unit.arena.lookup_local(unit.global_scope, "main").unwrap())
    else {
        panic!("no program");
    };

    // lookup from the program finds the external, not the module function
    assert_eq!(unit.arena.lookup(main.symtab, "f"), Some(ext));
    // the declared path locates the target function
    assert_eq!(
        unit.arena.resolve_external(unit.global_scope, ext).unwrap(),
        f
    );
    assert!(matches!(unit.arena.symbol(f), Symbol::Function(_)));
}

#[test]
fn resolve_external_reports_missing_paths() {
    let (mut unit, ext, _) = unit_with_external();
    // break the path
    let Symbol::ExternalSymbol(e) = unit.arena.symbol_mut(ext) else {
        panic!("not an external");
    };
    e.module_name = Name::new("nonexistent");

    assert!(unit
        .arena
        .resolve_external(unit.global_scope, ext)
        .is_err());
    assert!(validate(&unit)
        .iter()
        .any(|violation| violation.kind == ViolationKind::ExternalPath));
}

#[test]
fn generic_dispatch_records_both_names() {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();
    let prog_scope = builder.new_scope(global);

    let candidates: Vec<SymbolId> = ["f_i32", "f_i64", "f_r64"]
        .iter()
        .map(|name| {
            function(
                &mut builder,
                prog_scope,
                name,
                Access::Public,
                vec![Stmt::Return],
            )
        })
        .collect();
    let generic = builder
        .add_symbol(
            prog_scope,
            Symbol::GenericProcedure(SymbolGenericProcedure {
                parent_symtab: prog_scope,
                name: Name::new("f"),
                procs: candidates.clone(),
                access: Access::Public,
            }),
        )
        .unwrap();
    let x = builder
        .add_symbol(prog_scope, local_variable(prog_scope, "x", Intent::Local))
        .unwrap();

    // elaboration picked the first candidate and recorded the generic
    let call = function_call(
        builder.arena(),
        candidates[0],
        Some(generic),
        vec![constant_integer(1, 4)],
        Ttype::integer(4),
        None,
    )
    .unwrap();
    let assign = Stmt::Assignment(StmtAssignment {
        target: var(builder.arena(), x).unwrap(),
        value: call,
    });
    let main = builder
        .add_symbol(
            global,
            Symbol::Program(SymbolProgram {
                name: Name::new("main"),
                symtab: prog_scope,
                dependencies: vec![],
                body: vec![assign],
            }),
        )
        .unwrap();
    let mut unit = builder.finish();
    unit.items.push(UnitItem::Symbol(main));

    assert_eq!(validate(&unit), vec![]);

    // the pickle carries distinct ordinals for the resolved target and the
    // pre-resolution generic
    let Symbol::Program(main) = unit.arena.symbol(main) else {
        panic!("no program");
    };
    let Stmt::Assignment(assign) = &main.body[0] else {
        panic!("no assignment");
    };
    let rendered = pickle_expr(&unit.arena, &assign.value);
    assert!(rendered.starts_with("(FunctionCall 0 1 "), "{rendered}");
}

#[test]
fn interface_projection_keeps_the_public_surface() {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();
    let mod_scope = builder.new_scope(global);
    function(
        &mut builder,
        mod_scope,
        "pub_fn",
        Access::Public,
        vec![Stmt::Return],
    );
    function(
        &mut builder,
        mod_scope,
        "priv_fn",
        Access::Private,
        vec![Stmt::Return],
    );
    let module = builder
        .add_symbol(
            global,
            Symbol::Module(SymbolModule {
                name: Name::new("m"),
                symtab: mod_scope,
                dependencies: vec![],
                loaded_from_mod: false,
            }),
        )
        .unwrap();
    let mut unit = builder.finish();
    unit.items.push(UnitItem::Symbol(module));

    let projected = module_interface(&unit, module).unwrap();
    assert_eq!(validate(&projected), vec![]);

    let m = projected
        .arena
        .lookup_local(projected.global_scope, "m")
        .unwrap();
    let Symbol::Module(m_sym) = projected.arena.symbol(m) else {
        panic!("not a module");
    };
    assert_eq!(projected.arena.scope(m_sym.symtab).len(), 1);
    let Symbol::Function(f) = projected
        .arena
        .symbol(projected.arena.scope(m_sym.symtab).get("pub_fn").unwrap())
    else {
        panic!("not a function");
    };
    assert!(f.body.is_empty());
    assert_eq!(f.abi, Abi::LFortranModule);
    assert_eq!(f.deftype, Deftype::Interface);

    // re-applying the projection is a no-op
    let again = module_interface(&projected, m).unwrap();
    assert!(structurally_equal(&projected, &again));
    assert_eq!(pickle(&projected), pickle(&again));
}
