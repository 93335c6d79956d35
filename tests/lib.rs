use byteorder::{BigEndian, WriteBytesExt};
use pretty_assertions::assert_eq;
use std::io::Write;

use beam_code::chunk::{self, Chunk};
use beam_code::{
    Diagnostic, Error, ExportEntry, ImportEntry, Module, RawBeamFile, StandardBeamFile, Tag,
};

/// Assembles a BEAM container from `(id, data)` pairs.
fn beam(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (id, data) in chunks {
        body.write_all(&id[..]).unwrap();
        body.write_u32::<BigEndian>(data.len() as u32).unwrap();
        body.write_all(data).unwrap();
        for _ in 0..chunk::padding_size(data.len() as u32) {
            body.write_u8(0).unwrap();
        }
    }
    let mut buf = Vec::new();
    buf.write_all(b"FOR1").unwrap();
    buf.write_u32::<BigEndian>(body.len() as u32 + 4).unwrap();
    buf.write_all(b"BEAM").unwrap();
    buf.write_all(&body).unwrap();
    buf
}

fn atoms(names: &[&str]) -> Vec<u8> {
    let mut data = Vec::new();
    data.write_u32::<BigEndian>(names.len() as u32).unwrap();
    for name in names {
        data.write_u8(name.len() as u8).unwrap();
        data.write_all(name.as_bytes()).unwrap();
    }
    data
}

fn table(entries: &[[u32; 3]]) -> Vec<u8> {
    let mut data = Vec::new();
    data.write_u32::<BigEndian>(entries.len() as u32).unwrap();
    for entry in entries {
        for field in entry {
            data.write_u32::<BigEndian>(*field).unwrap();
        }
    }
    data
}

fn code(bytecode: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    for word in [16, 0, 178, 3, 1] {
        data.write_u32::<BigEndian>(word).unwrap();
    }
    data.write_all(bytecode).unwrap();
    data
}

/// `-module(demo). -export([hello/0]). hello() -> erlang:display(ok).`
fn demo() -> Vec<u8> {
    let bytecode = [
        1, 0x15, // label 1
        2, 0x12, 0x22, 0x00, // func_info demo hello 0
        1, 0x25, // label 2
        64, 0x42, 0x03, // move ok x0
        78, 0x10, 0x00, // call_ext_only 1 import#0
        3,    // int_code_end
    ];
    beam(&[
        (b"AtU8", atoms(&["demo", "hello", "erlang", "display", "ok"])),
        (b"Code", code(&bytecode)),
        (b"StrT", Vec::new()),
        (b"ImpT", table(&[[3, 4, 1]])),
        (b"ExpT", table(&[[2, 0, 2]])),
        (b"LocT", table(&[])),
        (b"Attr", b"\x83l\0\0\0\0j".to_vec()),
        (b"Line", vec![0, 0, 0, 0, 0]),
    ])
}

#[test]
fn raw_chunks() {
    let beam = RawBeamFile::from_bytes(&demo()).unwrap();
    assert_eq!(
        vec!["AtU8", "Code", "StrT", "ImpT", "ExpT", "LocT", "Attr", "Line"],
        collect_id(&beam.chunks)
    );
}

#[test]
fn standard_chunks() {
    let beam = StandardBeamFile::from_bytes(&demo()).unwrap();
    assert_eq!(
        vec!["AtU8", "Code", "StrT", "ImpT", "ExpT", "LocT", "Attr", "Line"],
        collect_id(&beam.chunks)
    );
}

#[test]
fn exact_consumption() {
    let bytes = demo();
    let beam = RawBeamFile::from_bytes(&bytes).unwrap();
    let consumed: usize = beam
        .chunks
        .iter()
        .map(|c| chunk::HEADER_SIZE + c.data.len() + c.padding())
        .sum();
    assert_eq!(bytes.len(), 12 + consumed);
}

#[test]
fn exports_resolve_against_atoms() {
    let bytes = beam(&[
        (b"Atom", atoms(&["foo", "bar"])),
        (b"ExpT", table(&[[1, 0, 2]])),
    ]);
    let module = Module::from_bytes(&bytes).unwrap();
    assert_eq!(
        vec![ExportEntry {
            function: "foo".to_string(),
            arity: 0,
            label: 2
        }],
        module.exports
    );
    assert!(module.instructions.is_empty());
    assert_eq!(None, module.code_header);
}

#[test]
fn decode_module() {
    let module = Module::from_bytes(&demo()).unwrap();

    assert_eq!(Some("demo"), module.module_name());
    assert_eq!(5, module.atoms.len());
    assert_eq!(Some("ok"), module.atom(5));
    assert_eq!(
        vec![ImportEntry {
            module: "erlang".to_string(),
            function: "display".to_string(),
            arity: 1
        }],
        module.imports
    );
    assert_eq!(
        vec![ExportEntry {
            function: "hello".to_string(),
            arity: 0,
            label: 2
        }],
        module.exports
    );
    assert_eq!(Some(178), module.code_header.map(|h| h.opcode_max));

    assert_eq!(
        vec!["label", "func_info", "label", "move", "call_ext_only", "int_code_end"],
        module
            .instructions
            .iter()
            .map(|i| i.opcode.name)
            .collect::<Vec<_>>()
    );
    let mov = &module.instructions[3];
    assert_eq!(
        vec![(Tag::Atom, Some(4)), (Tag::XRegister, Some(0))],
        mov.args.iter().map(|t| (t.tag, t.value)).collect::<Vec<_>>()
    );
    assert_eq!(0, module.diagnostics().count());

    assert_eq!(
        vec!["Attr", "Line", "LocT", "StrT"],
        module
            .opaque
            .keys()
            .map(|id| std::str::from_utf8(id).unwrap())
            .collect::<Vec<_>>()
    );
    assert_eq!(Some(&[0, 0, 0, 0, 0][..]), module.opaque_chunk(b"Line"));
    assert_eq!(Some(&b""[..]), module.opaque_chunk(b"StrT"));
}

#[test]
fn unknown_opcodes_are_diagnostics() {
    let bytes = beam(&[
        (b"AtU8", atoms(&["m"])),
        (b"Code", code(&[1, 0x15, 0xc8, 19, 3])),
    ]);
    let module = Module::from_bytes(&bytes).unwrap();
    assert_eq!(4, module.instructions.len());
    assert_eq!("unknown", module.instructions[1].opcode.name);
    assert_eq!(
        vec![&Diagnostic::UnknownOpcode { id: 0xc8, offset: 58 }],
        module.diagnostics().collect::<Vec<_>>()
    );
}

#[test]
fn structural_failures() {
    let bytes = beam(&[(b"AtU8", atoms(&["m"])), (b"ImpT", table(&[[1, 2, 0]]))]);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::BadAtomIndex { id, index: 2, atoms: 1, .. } if &id == b"ImpT"
    ));

    let bytes = beam(&[(b"ExpT", table(&[[1, 0, 0]]))]);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::BadAtomIndex { index: 1, atoms: 0, .. }));

    // move with a huge-integer operand
    let bytes = beam(&[(b"Code", code(&[64, 0xf9, 0x00, 0x03]))]);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedTermForm {
            id,
            offset: 41,
            byte: 0xf9
        } if &id == b"Code"
    ));

    let bytes = beam(&[(b"Code", code(&[64, 0x03]))]);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::TruncatedInstruction { id, offset: 42 } if &id == b"Code"
    ));

    let mut bytes = demo();
    bytes.truncate(bytes.len() - 4);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::TruncatedChunk { id, .. } if &id == b"Line"));
}

#[test]
fn error_messages_name_the_chunk() {
    let bytes = beam(&[(b"ExpT", table(&[[7, 0, 0]]))]);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert_eq!(
        r#"Error::BadAtomIndex: id - b"ExpT", offset - 24, index - 7, atoms - 0"#,
        err.to_string()
    );

    let bytes = beam(&[(b"Code", code(&[64, 0xf9, 0x00, 0x03]))]);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert_eq!(
        r#"Error::UnsupportedTermForm: id - b"Code", offset - 41, byte - 0xf9"#,
        err.to_string()
    );
}

#[cfg(feature = "serde")]
#[test]
fn module_renders_as_json() {
    let module = Module::from_bytes(&demo()).unwrap();
    let json = serde_json::to_value(&module).unwrap();

    assert_eq!(
        vec!["Attr", "Line", "LocT", "StrT"],
        json["opaque"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
    );
    assert_eq!("erlang", json["imports"][0]["module"]);
    assert_eq!("call_ext_only", json["instructions"][4]["opcode"]["name"]);
    assert_eq!(178, json["code_header"]["opcode_max"]);
}

fn collect_id<C: Chunk>(chunks: &[C]) -> Vec<String> {
    chunks
        .iter()
        .map(|c| std::str::from_utf8(c.id()).unwrap().to_string())
        .collect()
}
