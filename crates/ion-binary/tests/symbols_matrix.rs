use std::sync::Arc;

use ion_binary::{
    read_shared_symbol_table, write_shared_symbol_table, BinaryReader, BinaryWriter, IonError,
    IonType, ReaderOptions, SharedSymbolTable, SimpleCatalog, SliceSource, SymbolTable,
    WriterOptions,
};

fn fruits(version: u32) -> SharedSymbolTable {
    SharedSymbolTable::new("fruits", version, ["apple", "pear"])
}

fn write_with_import(symbols: &[&str]) -> Vec<u8> {
    let options = WriterOptions::new().with_import(Arc::new(fruits(1)));
    let mut writer = BinaryWriter::to_vec(options);
    for text in symbols {
        writer.write_symbol(text).unwrap();
    }
    writer.finish().unwrap();
    writer.into_inner()
}

/// `$ion_symbol_table::{imports:[{name:"t", version:1, max_id:N}]} 1`
fn stream_importing(max_id: u32) -> Vec<u8> {
    let mut bytes = vec![
        0xe0, 0x01, 0x00, 0xea, // version marker
        0xee, 0x93, 0x81, 0x83, // annotation wrapper
        0xde, 0x8f, 0x86, // struct, imports:
        0xbd, 0xdc, // list of one import struct
        0x84, 0x81, b't', // name: "t"
        0x85, 0x21, 0x01, // version: 1
        0x88, 0x24, // max_id: 4-byte int
    ];
    bytes.extend(max_id.to_be_bytes());
    bytes.extend([0x21, 0x01]);
    bytes
}

#[test]
fn system_table_matrix() {
    let table = SymbolTable::system();
    let expected = [
        (1, "$ion"),
        (2, "$ion_1_0"),
        (3, "$ion_symbol_table"),
        (4, "name"),
        (5, "version"),
        (6, "imports"),
        (7, "symbols"),
        (8, "max_id"),
        (9, "$ion_shared_symbol_table"),
    ];
    for (sid, text) in expected {
        assert_eq!(table.text(sid), Some(text), "sid {sid}");
        assert_eq!(table.sid(text), Some(sid), "text {text}");
    }
    assert_eq!(table.max_id(), 9);
    assert_eq!(table.text(0), None);
    assert_eq!(table.text(10), None);
}

#[test]
fn local_table_numbers_imports_then_locals() {
    let mut table = SymbolTable::local([Arc::new(fruits(1))]).unwrap();
    assert_eq!(table.import_max_id(), 11);
    assert_eq!(table.sid("pear"), Some(11));
    assert_eq!(table.intern("pear").unwrap(), (11, false));
    assert_eq!(table.intern("fig").unwrap(), (12, true));
    assert_eq!(table.intern("fig").unwrap(), (12, false));
    assert_eq!(table.add_symbol(None).unwrap(), 13);
    assert_eq!(table.text(13), None);
    assert_eq!(table.local_symbols(), &[Some("fig".to_owned()), None]);
}

#[test]
fn imported_symbols_resolve_through_catalog() {
    let bytes = write_with_import(&["pear", "fig"]);
    let options = ReaderOptions::new().with_catalog(SimpleCatalog::new().with_table(fruits(1)));
    let mut reader = BinaryReader::new(SliceSource::new(&bytes), options);
    assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
    assert_eq!(reader.read_symbol_id().unwrap(), 11);
    assert_eq!(reader.symbol_table().text(11), Some("pear"));
    assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
    assert_eq!(reader.read_symbol().unwrap().as_deref(), Some("fig"));
}

#[test]
fn missing_import_keeps_sids_without_text() {
    let bytes = write_with_import(&["pear", "fig"]);
    let mut reader = BinaryReader::from_slice(&bytes);
    assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
    assert_eq!(reader.read_symbol().unwrap(), None);
    assert!(reader.symbol_table().imports()[0].table.is_substitute());
    assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
    assert_eq!(reader.read_symbol().unwrap().as_deref(), Some("fig"));
}

#[test]
fn other_version_in_catalog_is_padded_to_declared_max_id() {
    let bytes = write_with_import(&["fig"]);
    let newer = SharedSymbolTable::new("fruits", 2, ["apple"]);
    let options = ReaderOptions::new().with_catalog(SimpleCatalog::new().with_table(newer));
    let mut reader = BinaryReader::new(SliceSource::new(&bytes), options);
    assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
    assert_eq!(reader.read_symbol().unwrap().as_deref(), Some("fig"));
    let table = reader.symbol_table();
    assert_eq!(table.text(10), Some("apple"));
    assert_eq!(table.text(11), None);
    assert_eq!(table.sid("fig"), Some(12));
}

#[test]
fn shared_table_round_trips() {
    let table = SharedSymbolTable::with_slots(
        "colors",
        3,
        vec![Some("red".to_owned()), None, Some("blue".to_owned())],
    );
    let mut writer = BinaryWriter::to_vec(WriterOptions::default());
    write_shared_symbol_table(&mut writer, &table).unwrap();
    writer.finish().unwrap();
    let bytes = writer.into_inner();

    let mut reader = BinaryReader::from_slice(&bytes);
    assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
    assert!(reader.has_annotation("$ion_shared_symbol_table"));
    let back = read_shared_symbol_table(&mut reader).unwrap();
    assert_eq!(back.name(), "colors");
    assert_eq!(back.version(), 3);
    assert!(back.slots().eq(table.slots()));
    assert_eq!(back.sid("blue"), Some(3));
    assert_eq!(reader.next().unwrap(), None);
}

#[test]
fn large_import_max_id_is_not_materialized() {
    let bytes = stream_importing(4_000_000_000);
    assert_eq!(bytes.len(), 27);
    let mut reader = BinaryReader::from_slice(&bytes);
    assert_eq!(reader.next().unwrap(), Some(IonType::Int));
    assert_eq!(reader.read_i64().unwrap(), 1);
    let table = reader.symbol_table();
    assert_eq!(table.max_id(), 4_000_000_009);
    assert_eq!(table.text(4_000_000_000), None);
    assert!(table.imports()[0].table.is_substitute());
}

#[test]
fn import_max_id_past_sid_space_is_a_format_error() {
    let bytes = stream_importing(u32::MAX);
    let mut reader = BinaryReader::from_slice(&bytes);
    assert!(matches!(reader.next(), Err(IonError::Format { .. })));
}

#[test]
fn small_import_max_id_still_reads() {
    let stream = stream_importing(5);
    let mut reader = BinaryReader::from_slice(&stream);
    assert_eq!(reader.next().unwrap(), Some(IonType::Int));
    assert_eq!(reader.symbol_table().max_id(), 14);
}
