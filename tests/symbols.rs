use ionbin::prelude::*;
use std::sync::Arc;

fn shared(name: &str, version: u32, symbols: &[&str]) -> Arc<SharedSymbolTable> {
    Arc::new(SharedSymbolTable::new(name, version, None, symbols.iter()).unwrap())
}

fn write_doc(w: &mut BinaryWriter) -> Vec<u8> {
    w.step_in(IonType::Struct).unwrap();
    w.set_field_name("b").unwrap();
    w.write_symbol("a").unwrap();
    w.set_field_name("a").unwrap();
    w.add_annotation("c").unwrap();
    w.write_symbol("b").unwrap();
    w.step_out().unwrap();
    let mut out = vec![];
    w.flush_to_vec(&mut out).unwrap();
    out
}

#[test]
fn output_is_deterministic() {
    let first = write_doc(&mut BinaryWriter::new());
    let second = write_doc(&mut BinaryWriter::new());
    assert_eq!(first, second);

    let mut reused = BinaryWriter::new();
    write_doc(&mut reused);
    assert_eq!(write_doc(&mut reused), first);
}

#[test]
fn symbols_are_numbered_in_first_use_order() {
    let mut w = BinaryWriter::new();
    write_doc(&mut w);
    let ids: Vec<_> = ["b", "a", "c"]
        .iter()
        .map(|t| w.intern(t).unwrap().sid)
        .collect();
    // the flush reset the table, so the order is that of this loop
    assert_eq!(ids, vec![Some(10), Some(11), Some(12)]);
}

#[test]
fn first_import_wins() {
    let one = shared("one", 1, &["shared", "only_one"]);
    let two = shared("two", 1, &["shared", "only_two"]);
    let mut w = BinaryWriter::with_imports(vec![one, two]).unwrap();
    assert_eq!(w.intern("shared").unwrap().sid, Some(10));
    assert_eq!(w.intern("only_two").unwrap().sid, Some(13));
    assert_eq!(w.intern("fresh").unwrap().sid, Some(14));
    assert_eq!(w.intern("version").unwrap().sid, Some(5));
    assert_eq!(w.symbol_table().max_id(), 14);
    assert_eq!(w.symbol_table().imported_max_id(), 13);
}

#[test]
fn system_table_cannot_be_imported() {
    match BinaryWriter::with_imports(vec![system_symbol_table()]) {
        Err(IonError::InvalidArgument(_)) => {}
        other => panic!("expected invalid argument, got {:?}", other),
    }
}

#[test]
fn symbol_states() {
    let mut w = BinaryWriter::with_imports(vec![shared("t", 1, &["x"])]).unwrap();
    assert_eq!(w.symbol_state(), SymbolState::SystemSymbols);
    w.write_symbol("name").unwrap();
    assert_eq!(w.symbol_state(), SymbolState::SystemSymbols);
    w.write_symbol("x").unwrap();
    assert_eq!(w.symbol_state(), SymbolState::LocalSymbolsWithImportsOnly);
    w.write_symbol("y").unwrap();
    assert_eq!(w.symbol_state(), SymbolState::LocalSymbols);
    let mut out = vec![];
    w.flush_to_vec(&mut out).unwrap();
    assert_eq!(w.symbol_state(), SymbolState::SystemSymbols);
}

#[test]
fn finish_is_idempotent() {
    let mut w = BinaryWriter::new();
    w.write_symbol("gone").unwrap();
    w.finish().unwrap();
    w.finish().unwrap();
    assert_eq!(w.symbol_state(), SymbolState::SystemSymbols);
    let mut out = vec![];
    assert_eq!(w.flush_to_vec(&mut out).unwrap(), FlushStatus::Flushed(4));
    assert_eq!(out, vec![0xe0, 0x01, 0x00, 0xea]);
}

#[test]
fn read_only_table_rejects_new_text() {
    let mut w = BinaryWriter::new();
    w.write_symbol("known").unwrap();
    w.symbol_table().make_read_only();
    w.write_symbol("known").unwrap();
    match w.write_symbol("unknown") {
        Err(IonError::InvalidState(_)) => {}
        other => panic!("expected invalid state, got {:?}", other),
    }
    w.write_symbol("symbols").unwrap();
}

#[test]
fn symbol_tokens_without_text() {
    let mut w = BinaryWriter::new();
    w.write_symbol_token(&SymbolToken::from_sid(42)).unwrap();
    w.step_in(IonType::Struct).unwrap();
    w.set_field_name_symbol(&SymbolToken::from_sid(4)).unwrap();
    w.add_annotation_symbol(&SymbolToken::from_text("tag")).unwrap();
    w.write_int(1).unwrap();
    w.step_out().unwrap();
    assert!(w.write_symbol_token(&SymbolToken::new(None, None)).is_err());
    let mut out = vec![];
    w.flush_to_vec(&mut out).unwrap();

    let mut r = ReaderBuilder::new()
        .process_symbol_tables(true)
        .build(buf_source(&out[..]));
    assert_eq!(r.next().unwrap(), Some(IonType::Symbol));
    let token = r.symbol_value().unwrap();
    assert_eq!((token.text, token.sid), (None, Some(42)));
    assert_eq!(r.next().unwrap(), Some(IonType::Struct));
    r.step_in().unwrap();
    r.next().unwrap();
    assert_eq!(r.field_name(), Some("name"));
    assert_eq!(r.annotations()[0].text.as_deref(), Some("tag"));
}

#[test]
fn skipped_containers_keep_the_reader_in_place() {
    let mut w = BinaryWriter::new();
    for i in 0..3 {
        w.step_in(IonType::List).unwrap();
        w.step_in(IonType::Struct).unwrap();
        w.set_field_name("inner").unwrap();
        w.write_int(i).unwrap();
        w.step_out().unwrap();
        w.step_out().unwrap();
    }
    w.write_string("last").unwrap();
    let mut out = vec![];
    w.flush_to_vec(&mut out).unwrap();

    let mut r = ReaderBuilder::new()
        .process_symbol_tables(true)
        .build(buf_source(&out[..]));
    assert_eq!(r.next().unwrap(), Some(IonType::List));
    assert_eq!(r.next().unwrap(), Some(IonType::List));
    r.step_in().unwrap();
    assert_eq!(r.next().unwrap(), Some(IonType::Struct));
    r.step_in().unwrap();
    r.next().unwrap();
    assert_eq!(r.field_name(), Some("inner"));
    assert_eq!(r.int_value().unwrap(), 1);
    r.step_out().unwrap();
    r.step_out().unwrap();
    assert_eq!(r.next().unwrap(), Some(IonType::List));
    assert_eq!(r.next().unwrap(), Some(IonType::String));
    assert_eq!(r.string_value().unwrap(), "last");
    assert_eq!(r.depth(), 0);
}

#[test]
fn shared_table_versions() {
    let v1 = SharedSymbolTable::new("colors", 1, None, vec!["red", "green"]).unwrap();
    let v2 = SharedSymbolTable::new("colors", 2, Some(&v1), vec!["blue"]).unwrap();
    let mut catalog = Catalog::new();
    catalog.put_table(Arc::new(v1));
    catalog.put_table(Arc::new(v2));
    assert_eq!(catalog.get_table("colors").unwrap().version(), 2);
    assert_eq!(catalog.get_table_version("colors", 1).unwrap().max_id(), 2);
    assert_eq!(catalog.get_table_version("colors", 7).unwrap().version(), 2);
    assert!(catalog.get_table("shapes").is_none());
}
