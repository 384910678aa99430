use ucodegen::pack::{unpack_row, BitString};
use ucodegen::{
    compile, generate, pack, Assembler, CompileError, CompilerConfig, Fragment, InstructionDef,
    Opcodes, Result, RowRef, Schema, Sequence, TableSet, Value,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SCHEMA: &str = r#"{
    "types": [
        {"name": "e_uaddr", "type": "enum", "width": 5, "prefix": "UA_",
         "desc": "Entry address",
         "derive": {"table": "urom", "column": "uaddr", "fill_missing": true}},
        {"name": "e_bm", "type": "enum", "width": 1, "prefix": "BM_", "values": ["NEXT", "END"]},
        {"name": "e_aluop", "type": "enum", "width": 2, "prefix": "ALU_",
         "values": ["NOP", "SUM", "SUB", "AND"]},
        {"name": "e_abs", "type": "enum", "width": 2, "prefix": "AB_",
         "values": ["PC", "SP", "HL"]},
        {"name": "u_naddr", "type": "int", "width": 4}
    ],
    "tables": [
        {"name": "ird", "record": "s_ird", "columns": [
            {"name": "uaddr", "type": "e_uaddr"},
            {"name": "m1_overlap", "width": 1},
            {"name": "noper", "width": 2}
        ], "labels": ["at"]},
        {"name": "urom", "record": "s_uc", "columns": [
            {"name": "naddr", "type": "u_naddr"},
            {"name": "m1", "width": 1},
            {"name": "bm", "type": "e_bm"}
        ], "labels": ["uaddr"]},
        {"name": "nrom", "record": "s_nc", "columns": [
            {"name": "abs", "type": "e_abs"},
            {"name": "aout", "width": 1},
            {"name": "pc_inc", "width": 1},
            {"name": "load", "width": 1},
            {"name": "aluop", "type": "e_aluop"}
        ], "labels": ["naddr"]}
    ]
}"#;

fn pc_out_inc() -> Fragment {
    Fragment::set("abs", "PC")
        .with("aout", 1u64)
        .with("pc_inc", 1u64)
}

fn load() -> Fragment {
    Fragment::set("load", 1u64)
}

fn define(asm: &mut Assembler<'_>) -> Result<()> {
    asm.preload(Fragment::new())?;
    asm.preload(pc_out_inc())?;
    asm.routine(&Sequence::new("IDLE").then(Fragment::new()))?;
    asm.instruction(InstructionDef::new(
        0x41..=0x43,
        6,
        0,
        Sequence::new("INR")
            .then(Fragment::set("aluop", "SUM"))
            .then(load()),
    ))?;
    asm.instruction(InstructionDef::new(
        0x00,
        4,
        0,
        Sequence::new("NOP").then(Fragment::new()),
    ))?;
    asm.instruction(InstructionDef::new(
        Opcodes::range(0x68, 0x6b).except(0x69),
        7,
        1,
        Sequence::new("MVI")
            .then(pc_out_inc())
            .then(load())
            .then(Fragment::new()),
    ))?;
    asm.instruction(InstructionDef::new(
        0x69,
        7,
        1,
        Sequence::new("MVI_A")
            .then(pc_out_inc())
            .then(load())
            .then(Fragment::set("aluop", "NOP")),
    ))?;
    Ok(())
}

fn config() -> CompilerConfig {
    CompilerConfig {
        overlap_window: 1,
        ..Default::default()
    }
}

#[test]
fn compile_is_deterministic() {
    init();
    let schema = Schema::from_json(SCHEMA).unwrap();
    let first = compile(&schema, &config(), define).unwrap();
    let second = compile(&schema, &config(), define).unwrap();
    assert_eq!(first, second);
}

#[test]
fn ranges_share_an_entry() {
    init();
    let schema = Schema::from_json(SCHEMA).unwrap();
    let image = compile(&schema, &config(), define).unwrap();
    let lookup = &image.file("uc-ird.svh").unwrap().contents;
    for opcode in ["041", "042", "043"] {
        let line = format!("    ird_lut['h{}] = {{UA_INR, 1'd0, 2'd0}};", opcode);
        assert!(lookup.lines().any(|l| l == line), "missing {}", line);
    }
    assert!(lookup
        .lines()
        .any(|l| l == "    ird_lut['h069] = {UA_MVI_A, 1'd0, 2'd1};"));
    assert!(lookup
        .lines()
        .any(|l| l == "    ird_lut['h000] = {UA_NOP, 1'd1, 2'd0};"));
    assert_eq!(lookup.lines().filter(|l| l.contains("UA_MVI,")).count(), 3);
}

#[test]
fn entry_codes_are_sequence_rows() {
    init();
    let schema = Schema::from_json(SCHEMA).unwrap();
    let (resolved, tables) = generate(&schema, &config(), define).unwrap();
    let e_uaddr = resolved.types().lookup("e_uaddr").unwrap();
    let urom = &tables.get("urom").unwrap().rows;
    for (index, row) in urom.iter().enumerate() {
        let expected = match row.get("uaddr") {
            Some(Value::Symbol(name)) => name.clone(),
            _ => format!("_{:X}", index),
        };
        assert_eq!(e_uaddr.symbols().code(&expected), Some(index));
    }
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
}

#[test]
fn packed_rows_unpack_to_their_values() {
    init();
    let schema = Schema::from_json(SCHEMA).unwrap();
    let (resolved, tables) = generate(&schema, &config(), define).unwrap();
    let image = ucodegen::build_image(&resolved, &tables, &config()).unwrap();
    for name in ["urom", "nrom"] {
        let layout = resolved.layout(name).unwrap();
        let table = tables.get(name).unwrap();
        let lines: Vec<_> = image
            .file(&format!("{}.mem", name))
            .unwrap()
            .contents
            .lines()
            .collect();
        assert_eq!(lines.len(), table.rows.len());
        for (line, row) in lines.iter().zip(&table.rows) {
            let bits = BitString::parse(line).unwrap();
            let unpacked = unpack_row(layout, resolved.types(), &bits).unwrap();
            for field in layout.fields() {
                let actual = &unpacked[&field.name];
                let zero = match actual {
                    Value::Int(0) => true,
                    Value::Symbol(s) => {
                        let ty = field.ty.as_deref().unwrap();
                        let def = resolved.types().lookup(ty).unwrap();
                        def.symbols().code(s) == Some(0)
                    }
                    _ => false,
                };
                match row.get(&field.name) {
                    Some(value) => assert_eq!(actual, value, "{} {}", name, field.name),
                    None => assert!(zero, "{} {} should be zero", name, field.name),
                }
            }
        }
    }
}

#[test]
fn generated_tables_pack_identically() {
    init();
    let schema = Schema::from_json(SCHEMA).unwrap();
    let config = config();
    let (_, tables) = generate(&schema, &config, define).unwrap();
    let text = serde_json::to_string(&tables).unwrap();

    let mut merged = Schema::from_json(SCHEMA).unwrap();
    merged
        .merge_rows(TableSet::from_json(&text).unwrap())
        .unwrap();
    assert_eq!(
        pack(&merged, &config).unwrap(),
        compile(&schema, &config, define).unwrap()
    );
}

#[test]
fn conflicts_abort_the_build() {
    init();
    let schema = Schema::from_json(SCHEMA).unwrap();
    let result = compile(&schema, &config(), |asm| {
        define(asm)?;
        asm.instruction(InstructionDef::new(
            0x80,
            6,
            0,
            Sequence::new("ADDSUB")
                .then(load())
                .then(Fragment::set("aluop", "SUM") | Fragment::set("aluop", "SUB")),
        ))?;
        Ok(())
    });
    match result {
        Err(CompileError::ControlWordConflict { row, field, .. }) => {
            assert_eq!(row, RowRef::step("ADDSUB", 1));
            assert_eq!(field, "aluop");
        }
        other => panic!("expected a conflict, got {:?}", other),
    }
}

#[test]
fn bad_values_name_row_and_field() {
    init();
    let schema = Schema::from_json(SCHEMA).unwrap();
    let result = compile(&schema, &config(), |asm| {
        asm.instruction(InstructionDef::new(
            0x10,
            5,
            0,
            Sequence::new("MUL").then(Fragment::set("aluop", "MUL")),
        ))?;
        Ok(())
    });
    match result {
        Err(CompileError::UnresolvedSymbol {
            row,
            field,
            ty,
            symbol,
        }) => {
            assert_eq!(row, RowRef::step("MUL", 0));
            assert_eq!((field.as_str(), ty.as_str()), ("aluop", "e_aluop"));
            assert_eq!(symbol, "MUL");
        }
        other => panic!("expected an unresolved symbol, got {:?}", other),
    }

    // Too many operand bytes for the 2-bit field.
    let result = compile(&schema, &config(), |asm| {
        asm.instruction(InstructionDef::new(
            0x10,
            5,
            4,
            Sequence::new("WIDE").then(load()),
        ))?;
        Ok(())
    });
    assert!(matches!(
        result,
        Err(CompileError::ValueOutOfRange { field, value: 4, width: 2, .. }) if field == "noper"
    ));
}
