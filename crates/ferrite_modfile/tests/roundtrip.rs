//! Round-trip and framing exercises of the binary encoding and the
//! module-file layer.

use ferrite_asr::arena::ScopeId;
use ferrite_asr::build::{binop, constant_integer, var, UnitBuilder};
use ferrite_asr::compare::{structural_hash, structurally_equal};
use ferrite_asr::interface::module_interface;
use ferrite_asr::nodes::{
    Abi, Access, BinOp, Deftype, Intent, Presence, Stmt, StmtAssignment, StorageType,
    SymbolDerivedType, SymbolExternalSymbol, SymbolFunction, SymbolModule, SymbolProgram,
    SymbolVariable, Ttype, TtypeDerived, TtypePointer,
};
use ferrite_asr::pickle::pickle;
use ferrite_asr::validate::validate;
use ferrite_asr::{Name, Symbol, TranslationUnit, UnitItem};
use ferrite_modfile::marshal::DecodeError;
use ferrite_modfile::{decode, encode, ModuleCache, SCHEMA_VERSION};

fn variable(scope: ScopeId, name: &str, intent: Intent, ttype: Ttype) -> Symbol {
    Symbol::Variable(SymbolVariable {
        parent_symtab: scope,
        name: Name::new(name),
        intent,
        symbolic_value: None,
        storage: StorageType::Default,
        ttype,
        abi: Abi::Source,
        access: Access::Public,
        presence: Presence::Required,
    })
}

fn assert_canonical_roundtrip(unit: &TranslationUnit) -> TranslationUnit {
    assert_eq!(validate(unit), vec![]);
    let bytes = encode(unit);
    let decoded = decode(&bytes).unwrap();

    assert!(structurally_equal(unit, &decoded));
    assert_eq!(pickle(unit), pickle(&decoded));
    assert_eq!(structural_hash(unit), structural_hash(&decoded));
    assert_eq!(encode(&decoded), bytes, "re-encoding must be canonical");
    assert_eq!(validate(&decoded), vec![]);
    decoded
}

#[test]
fn folded_binop_roundtrips_bytewise() {
    let mut unit = TranslationUnit::new();
    let expr = binop(
        constant_integer(2, 4),
        BinOp::Add,
        constant_integer(3, 4),
        Ttype::integer(4),
        Some(constant_integer(5, 4)),
    )
    .unwrap();
    unit.items.push(UnitItem::Expr(expr));

    assert_canonical_roundtrip(&unit);
}

#[test]
fn recursive_function_roundtrips() {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();
    let fn_scope = builder.new_scope(global);
    let ret = builder
        .add_symbol(
            fn_scope,
            variable(fn_scope, "r", Intent::ReturnVar, Ttype::integer(4)),
        )
        .unwrap();
    let n = builder
        .add_symbol(
            fn_scope,
            variable(fn_scope, "n", Intent::In, Ttype::integer(4)),
        )
        .unwrap();

    // the body calls the function being defined: a cycle through the arena
    let fact = builder.arena_mut().reserve_symbol();
    let recursive_call = {
        // build the call after the slot exists so the reference is stable
        let arg = constant_integer(1, 4);
        ferrite_asr::nodes::Expr::FunctionCall(ferrite_asr::nodes::ExprFunctionCall {
            name: fact,
            original_name: None,
            args: vec![arg],
            ttype: Ttype::integer(4),
            value: None,
        })
    };
    let body = vec![
        Stmt::Assignment(StmtAssignment {
            target: var(builder.arena(), ret).unwrap(),
            value: recursive_call,
        }),
        Stmt::Return,
    ];
    builder.arena_mut().fill_symbol(
        fact,
        Symbol::Function(SymbolFunction {
            name: Name::new("fact"),
            symtab: fn_scope,
            args: vec![n],
            body,
            return_var: ret,
            abi: Abi::Source,
            access: Access::Public,
            deftype: Deftype::Implementation,
            bindc_name: None,
        }),
    );
    builder.arena_mut().insert(global, fact).unwrap();
    let mut unit = builder.finish();
    unit.items.push(UnitItem::Symbol(fact));

    let decoded = assert_canonical_roundtrip(&unit);

    // the decoded body still calls the decoded function itself
    let decoded_fact = decoded
        .arena
        .lookup_local(decoded.global_scope, "fact")
        .unwrap();
    let Symbol::Function(f) = decoded.arena.symbol(decoded_fact) else {
        panic!("not a function");
    };
    let Stmt::Assignment(assign) = &f.body[0] else {
        panic!("not an assignment");
    };
    let ferrite_asr::nodes::Expr::FunctionCall(call) = &assign.value else {
        panic!("not a call");
    };
    assert_eq!(call.name, decoded_fact);
}

#[test]
fn self_referential_derived_type_roundtrips() {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();
    let type_scope = builder.new_scope(global);

    let node = builder.arena_mut().reserve_symbol();
    let next_ty = Ttype::Pointer(TtypePointer {
        target: Box::new(Ttype::Derived(TtypeDerived {
            symbol: node,
            dims: vec![],
        })),
    });
    builder
        .add_symbol(type_scope, variable(type_scope, "next", Intent::Local, next_ty))
        .unwrap();
    builder
        .add_symbol(
            type_scope,
            variable(type_scope, "datum", Intent::Local, Ttype::real(8)),
        )
        .unwrap();
    builder.arena_mut().fill_symbol(
        node,
        Symbol::DerivedType(SymbolDerivedType {
            name: Name::new("node"),
            symtab: type_scope,
            members: vec![Name::new("next"), Name::new("datum")],
            abi: Abi::Source,
            access: Access::Public,
            parent: None,
        }),
    );
    builder.arena_mut().insert(global, node).unwrap();
    let mut unit = builder.finish();
    unit.items.push(UnitItem::Symbol(node));

    assert_canonical_roundtrip(&unit);
}

#[test]
fn externals_reresolve_on_decode() {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();

    let mod_scope = builder.new_scope(global);
    let fn_scope = builder.new_scope(mod_scope);
    let ret = builder
        .add_symbol(
            fn_scope,
            variable(fn_scope, "r", Intent::ReturnVar, Ttype::integer(4)),
        )
        .unwrap();
    let f = builder
        .add_symbol(
            mod_scope,
            Symbol::Function(SymbolFunction {
                name: Name::new("f"),
                symtab: fn_scope,
                args: vec![],
                body: vec![Stmt::Return],
                return_var: ret,
                abi: Abi::Source,
                access: Access::Public,
                deftype: Deftype::Implementation,
                bindc_name: None,
            }),
        )
        .unwrap();
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
    builder
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

    let decoded = assert_canonical_roundtrip(&unit);

    // the decoded external points at the decoded function
    let decoded_main = decoded
        .arena
        .lookup_local(decoded.global_scope, "main")
        .unwrap();
    let Symbol::Program(p) = decoded.arena.symbol(decoded_main) else {
        panic!("not a program");
    };
    let ext = decoded.arena.lookup_local(p.symtab, "f").unwrap();
    let Symbol::ExternalSymbol(e) = decoded.arena.symbol(ext) else {
        panic!("not an external");
    };
    assert!(matches!(
        decoded.arena.symbol(e.external),
        Symbol::Function(f) if f.name == "f"
    ));
}

#[test]
fn unknown_versions_are_refused() {
    let mut unit = TranslationUnit::new();
    unit.items.push(UnitItem::Expr(constant_integer(1, 4)));
    let mut bytes = encode(&unit);

    let future = (SCHEMA_VERSION + 1).to_le_bytes();
    bytes[4..6].copy_from_slice(&future);

    assert!(matches!(
        decode(&bytes).unwrap_err(),
        DecodeError::SchemaMismatch { found, supported }
            if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
    ));
}

#[test]
fn truncated_streams_are_malformed() {
    let mut unit = TranslationUnit::new();
    unit.items.push(UnitItem::Expr(constant_integer(7, 4)));
    let bytes = encode(&unit);

    let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(!matches!(err, DecodeError::SchemaMismatch { .. }), "{err}");
}

#[test]
fn trailing_bytes_are_rejected() {
    let unit = TranslationUnit::new();
    let mut bytes = encode(&unit);
    bytes.push(0);

    assert!(matches!(
        decode(&bytes).unwrap_err(),
        DecodeError::TrailingBytes(1)
    ));
}

#[test]
fn bad_magic_is_rejected() {
    let unit = TranslationUnit::new();
    let mut bytes = encode(&unit);
    bytes[0] = b'X';

    assert!(matches!(decode(&bytes).unwrap_err(), DecodeError::BadMagic));
}

fn interface_module_unit(name: &str) -> TranslationUnit {
    let mut builder = UnitBuilder::new();
    let global = builder.global_scope();
    let mod_scope = builder.new_scope(global);
    let fn_scope = builder.new_scope(mod_scope);
    let ret = builder
        .add_symbol(
            fn_scope,
            variable(fn_scope, "r", Intent::ReturnVar, Ttype::integer(4)),
        )
        .unwrap();
    builder
        .add_symbol(
            mod_scope,
            Symbol::Function(SymbolFunction {
                name: Name::new("area"),
                symtab: fn_scope,
                args: vec![],
                body: vec![Stmt::Return],
                return_var: ret,
                abi: Abi::Source,
                access: Access::Public,
                deftype: Deftype::Implementation,
                bindc_name: None,
            }),
        )
        .unwrap();
    let module = builder
        .add_symbol(
            global,
            Symbol::Module(SymbolModule {
                name: Name::new(name),
                symtab: mod_scope,
                dependencies: vec![],
                loaded_from_mod: false,
            }),
        )
        .unwrap();
    let mut unit = builder.finish();
    unit.items.push(UnitItem::Symbol(module));

    module_interface(&unit, module).unwrap()
}

#[test]
fn modfiles_roundtrip_through_disk() {
    let interface = interface_module_unit("geometry");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geometry.fmod");

    ferrite_modfile::write_modfile(&path, &interface).unwrap();
    let loaded = ferrite_modfile::read_modfile(&path).unwrap();

    assert!(structurally_equal(&interface, &loaded));
}

#[test]
fn cache_grafts_interfaces_once_per_unit() {
    let interface = interface_module_unit("geometry");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geometry.fmod");
    ferrite_modfile::write_modfile(&path, &interface).unwrap();

    let mut cache = ModuleCache::new(dir.path());
    let mut unit = TranslationUnit::new();

    let first = cache.import_into(&mut unit, "geometry").unwrap();
    let second = cache.import_into(&mut unit, "geometry").unwrap();
    assert_eq!(first, second);
    assert!(cache.is_loaded("geometry"));

    let Symbol::Module(m) = unit.arena.symbol(first) else {
        panic!("not a module");
    };
    assert!(m.loaded_from_mod);
    assert_eq!(
        unit.arena.lookup_local(unit.global_scope, "geometry"),
        Some(first)
    );
    assert_eq!(validate(&unit), vec![]);
}

#[test]
fn load_deserializes_once_per_cache() {
    let interface = interface_module_unit("geometry");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geometry.fmod");
    ferrite_modfile::write_modfile(&path, &interface).unwrap();

    let mut cache = ModuleCache::new(dir.path());
    let first = cache.load("geometry").unwrap();
    assert!(cache.is_loaded("geometry"));

    // the cache holds the decoded unit; a second load never goes back to
    // the file
    std::fs::remove_file(&path).unwrap();
    let second = cache.load("geometry").unwrap();

    assert!(structurally_equal(&first, &second));
    assert!(structurally_equal(&interface, &second));
}

#[test]
fn schema_mismatch_does_not_evict_other_units() {
    let geometry = interface_module_unit("geometry");
    let algebra = interface_module_unit("algebra");
    let dir = tempfile::tempdir().unwrap();
    ferrite_modfile::write_modfile(&dir.path().join("geometry.fmod"), &geometry).unwrap();

    let mut bad = ferrite_modfile::to_modfile_bytes(&algebra).unwrap();
    let future = (ferrite_modfile::MODFILE_VERSION + 1).to_le_bytes();
    bad[4..6].copy_from_slice(&future);
    std::fs::write(dir.path().join("algebra.fmod"), &bad).unwrap();

    let mut cache = ModuleCache::new(dir.path());
    cache.load("geometry").unwrap();

    assert!(matches!(
        cache.load("algebra").unwrap_err(),
        ferrite_modfile::ModfileError::Decode(DecodeError::SchemaMismatch { .. })
    ));
    // the failed load caches nothing and evicts nothing
    assert!(!cache.is_loaded("algebra"));
    assert!(cache.is_loaded("geometry"));
    assert!(cache.load("geometry").is_ok());
}

#[test]
fn missing_modfiles_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = ModuleCache::new(dir.path());
    let mut unit = TranslationUnit::new();

    assert!(matches!(
        cache.import_into(&mut unit, "absent").unwrap_err(),
        ferrite_modfile::ModfileError::Io(_)
    ));
}

#[test]
fn non_modules_cannot_be_written_as_modfiles() {
    let unit = TranslationUnit::new();
    assert!(matches!(
        ferrite_modfile::to_modfile_bytes(&unit).unwrap_err(),
        ferrite_modfile::ModfileError::NotAModule
    ));
}
