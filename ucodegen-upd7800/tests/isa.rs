use std::collections::BTreeSet;

use ucodegen::{Row, Value};
use ucodegen_upd7800::signals::{
    AddrSource, AddrTarget, AluOp, CarryIn, IdbSelect, LatchSelect, Reg, Sdg, SkipCond, Spr,
    StrEffect,
};
use ucodegen_upd7800::{compile, config, generate};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn int(row: &Row, field: &str) -> u64 {
    match row.get(field) {
        Some(Value::Int(value)) => *value,
        other => panic!("{} is not an integer in {:?}: {:?}", field, row, other),
    }
}

#[test]
fn instruction_set_compiles() {
    init();
    let (_, tables) = generate(&config()).unwrap();
    let ird = &tables.get("ird").unwrap().rows;
    let urom = &tables.get("urom").unwrap().rows;
    let nrom = &tables.get("nrom").unwrap().rows;

    assert_eq!(ird.len(), 848);
    assert_eq!(urom.len(), 1076);
    // IDLE plus one sequence per instruction.
    assert_eq!(
        urom.iter().filter(|row| row.contains_key("uaddr")).count(),
        200
    );
    assert_eq!(
        ird.iter()
            .filter(|row| row.get("m1_overlap") == Some(&Value::Int(1)))
            .count(),
        294
    );
    assert!(nrom.len() <= 256, "{} control words", nrom.len());

    let opcodes: BTreeSet<_> = ird.iter().map(|row| int(row, "at")).collect();
    assert_eq!(opcodes.len(), ird.len());
    for unassigned in [0x01, 0x06, 0x09, 0x40, 0x48, 0x4c, 0x105, 0x7ff] {
        assert!(!opcodes.contains(&unassigned), "{:#x}", unassigned);
    }
}

#[test]
fn preloads_take_the_first_addresses() {
    init();
    let (_, tables) = generate(&config()).unwrap();
    let nrom = &tables.get("nrom").unwrap().rows;
    let urom = &tables.get("urom").unwrap().rows;

    let fields = |row: &Row| -> Vec<String> {
        row.keys()
            .filter(|k| k.as_str() != "naddr")
            .cloned()
            .collect()
    };
    assert!(fields(&nrom[0]).is_empty());
    assert_eq!(fields(&nrom[1]), ["aout", "pc_inc"]);
    assert_eq!(fields(&nrom[2]), ["load"]);
    assert_eq!(fields(&nrom[3]), ["store"]);
    for (address, row) in nrom.iter().enumerate() {
        assert_eq!(int(row, "naddr"), address as u64);
    }

    assert_eq!(urom[0].get("uaddr"), Some(&Value::symbol("IDLE")));
    assert_eq!(int(&urom[0], "naddr"), 0);
    assert_eq!(urom[0].get("bm"), Some(&Value::symbol("END")));
}

#[test]
fn decode_rows_enter_their_sequences() {
    init();
    let (resolved, tables) = generate(&config()).unwrap();
    let e_uaddr = resolved.types().lookup("e_uaddr").unwrap();
    let urom = &tables.get("urom").unwrap().rows;

    for row in &tables.get("ird").unwrap().rows {
        let Some(Value::Symbol(entry)) = row.get("uaddr") else {
            panic!("decode row without an entry: {:?}", row);
        };
        let code = e_uaddr.symbols().code(entry).unwrap();
        assert_eq!(
            urom[code].get("uaddr"),
            Some(&Value::symbol(entry.as_str()))
        );
    }

    let entry = |opcode: u64| {
        tables
            .get("ird")
            .unwrap()
            .rows
            .iter()
            .find(|row| int(row, "at") == opcode)
            .and_then(|row| row.get("uaddr").cloned())
    };
    assert_eq!(entry(0x68), Some(Value::symbol("MOV_RF_IR210_IMM")));
    assert_eq!(entry(0x69), Some(Value::symbol("MOV_RF_IR210_IMM_L1")));
    assert_eq!(entry(0x6f), Some(Value::symbol("MOV_RF_IR210_IMM_L0")));
    assert_eq!(entry(0x4e), Some(Value::symbol("JRE_P")));
    assert_eq!(entry(0x4f), Some(Value::symbol("JRE_N")));
    assert_eq!(entry(0x7f8), Some(Value::symbol("CMPZ_A_WA")));
}

#[test]
fn sequence_names_spell_their_operands() {
    init();
    let (_, tables) = generate(&config()).unwrap();
    let ird = &tables.get("ird").unwrap().rows;
    let entry = |opcode: u64| {
        ird.iter()
            .find(|row| int(row, "at") == opcode)
            .and_then(|row| row.get("uaddr").cloned())
    };
    let expected = [
        (0x0a, "MOV_A_RF_IR210"),
        (0x1a, "MOV_RF_IR210_A"),
        (0x2c0, "MOV_A_SPR_IR3"),
        (0x41, "INCR_RF_IR210"),
        (0x420, "ADDNC_RF_IR210_A"),
        (0x4f8, "CMPZ_A_RF_IR210"),
        (0x5a0, "ADDNC_SPR_IR2_IMM"),
        (0x49, "STX_RF_W"),
        (0x668, "LD_IR210_ABS"),
        (0x130, "RLL_A_"),
        (0x137, "SLR_C_"),
    ];
    for (opcode, name) in expected {
        assert_eq!(entry(opcode), Some(Value::symbol(name)), "{:#x}", opcode);
    }

    let image = compile(&config()).unwrap();
    let types = &image.file("uc-types.svh").unwrap().contents;
    assert!(types.contains("UA_MOV_A_RF_IR210"));
    assert!(types.contains("UA_RLL_A_"));
}

#[test]
fn string_effects_are_decoded() {
    init();
    let (_, tables) = generate(&config()).unwrap();
    let sefm = |opcode: u64| {
        tables
            .get("ird")
            .unwrap()
            .rows
            .iter()
            .find(|row| int(row, "at") == opcode)
            .and_then(|row| row.get("sefm").cloned())
    };
    assert_eq!(sefm(0x69), Some(StrEffect::L1.into()));
    assert_eq!(sefm(0x6f), Some(StrEffect::L0.into()));
    assert_eq!(sefm(0x34), Some(StrEffect::L0.into()));
    assert_eq!(sefm(0x00), Some(StrEffect::None.into()));
}

#[test]
fn skips_are_latched_on_the_last_step() {
    init();
    let (_, tables) = generate(&config()).unwrap();
    let nrom = &tables.get("nrom").unwrap().rows;
    let mut skips = 0;
    for row in &tables.get("urom").unwrap().rows {
        let word = &nrom[int(row, "naddr") as usize];
        if word.contains_key(SkipCond::FIELD) {
            skips += 1;
            assert_eq!(row.get("bm"), Some(&Value::symbol("END")), "{:?}", row);
        }
    }
    assert!(skips > 0);
}

#[test]
fn signals_match_the_schema() {
    init();
    let (resolved, _) = generate(&config()).unwrap();
    let types = resolved.types();
    let check = |ty: &str, symbols: &[&str]| {
        let def = types.lookup(ty).unwrap();
        for symbol in symbols {
            assert!(
                def.symbols().code(symbol).is_some(),
                "{} has no {}",
                ty,
                symbol
            );
        }
    };
    let field_type = |table: &str, field: &str| -> String {
        resolved
            .layout(table)
            .unwrap()
            .field(field)
            .and_then(|f| f.ty.clone())
            .unwrap()
    };

    macro_rules! check_field {
        ($table:literal, $($signal:ty),*) => {
            $(
                let symbols: Vec<_> = <$signal>::ALL.iter().map(|s| s.symbol()).collect();
                check(&field_type($table, <$signal>::FIELD), &symbols);
            )*
        };
    }
    check_field!(
        "nrom",
        IdbSelect,
        LatchSelect,
        AddrSource,
        AddrTarget,
        AluOp,
        CarryIn,
        SkipCond
    );
    check_field!("ird", StrEffect);

    let symbols: Vec<_> = Reg::ALL.iter().map(|s| s.symbol()).collect();
    check(&field_type("nrom", "rfos"), &symbols);
    check(&field_type("nrom", "rfts"), &symbols);
    let symbols: Vec<_> = Spr::ALL.iter().map(|s| s.symbol()).collect();
    check(&field_type("nrom", "sprs"), &symbols);
    let symbols: Vec<_> = Sdg::ALL.iter().map(|s| s.symbol()).collect();
    check(&field_type("nrom", "sdgs"), &symbols);
}

#[test]
fn digit_rotate_stores_alu_result() {
    init();
    let (_, tables) = generate(&config()).unwrap();
    let nrom = &tables.get("nrom").unwrap().rows;
    let urom = &tables.get("urom").unwrap().rows;
    let start = urom
        .iter()
        .position(|row| row.get("uaddr") == Some(&Value::symbol("RLD")))
        .unwrap();
    let word = &nrom[int(&urom[start + 6], "naddr") as usize];
    assert_eq!(word.get("abs"), Some(&Value::symbol("HL")));
    assert_eq!(word.get("aout"), Some(&Value::Int(1)));
    assert_eq!(word.get("rfos"), Some(&Value::symbol("W")));
    assert_eq!(word.get("idbs"), Some(&Value::symbol("CO")));
    assert_eq!(word.get("lts"), Some(&Value::symbol("DOR")));
}

#[test]
fn compile_is_deterministic() {
    init();
    let first = compile(&config()).unwrap();
    let second = compile(&config()).unwrap();
    assert_eq!(first, second);
    for name in [
        "uc-types.svh",
        "uc-ird.svh",
        "ird.mem",
        "urom.mem",
        "nrom.mem",
    ] {
        assert!(first.file(name).is_some(), "missing {}", name);
    }
    assert_eq!(
        first.file("urom.mem").unwrap().contents.lines().count(),
        1076
    );
}

#[test]
fn strict_window_rejects_long_instructions() {
    init();
    let strict = ucodegen::CompilerConfig {
        overlap_window: 0,
        ..config()
    };
    assert!(matches!(
        generate(&strict),
        Err(ucodegen::CompileError::CycleBudgetExceeded { .. })
    ));
}
