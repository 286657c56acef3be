use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;

use ion_binary::{
    BinaryReader, BinaryWriter, BufferConfiguration, ByteSource, IonError, IonType,
    LookaheadBuffer, LookaheadState, ReaderOptions, SliceSource, WriterOptions,
};
use proptest::prelude::*;

/// Input that yields only what has been pushed so far.
#[derive(Clone, Default)]
struct Feed(Rc<RefCell<VecDeque<u8>>>);

impl Feed {
    fn push(&self, bytes: &[u8]) {
        self.0.borrow_mut().extend(bytes);
    }
}

impl Read for Feed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut queue = self.0.borrow_mut();
        let n = buf.len().min(queue.len());
        for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

#[derive(Debug, Clone)]
enum Item {
    Int(i64),
    Text(String),
    Symbol(String),
    Padded(u8, i64),
    List(Vec<i64>),
}

fn item() -> impl Strategy<Value = Item> {
    prop_oneof![
        any::<i64>().prop_map(Item::Int),
        "[a-z]{0,40}".prop_map(Item::Text),
        "[a-z]{1,8}".prop_map(Item::Symbol),
        (0u8..12, any::<i64>()).prop_map(|(n, v)| Item::Padded(n, v)),
        proptest::collection::vec(any::<i64>(), 0..6).prop_map(Item::List),
    ]
}

/// Ints and strings, some of them too large for a 64-byte buffer.
fn small_or_oversized() -> impl Strategy<Value = Item> {
    prop_oneof![
        any::<i64>().prop_map(Item::Int),
        "[a-z]{0,30}".prop_map(Item::Text),
        (100usize..300).prop_map(|n| Item::Text("w".repeat(n))),
    ]
}

fn encode(items: &[Item]) -> Vec<u8> {
    let mut writer = BinaryWriter::to_vec(WriterOptions::default());
    for item in items {
        match item {
            Item::Int(v) => writer.write_i64(*v).unwrap(),
            Item::Text(s) => writer.write_string(s).unwrap(),
            Item::Symbol(s) => writer.write_symbol(s).unwrap(),
            Item::Padded(n, v) => {
                let mut pad = vec![*n];
                pad.extend(vec![0u8; *n as usize]);
                writer.write_raw_value(&pad).unwrap();
                writer.write_i64(*v).unwrap();
            }
            Item::List(values) => {
                writer.step_in(IonType::List).unwrap();
                for v in values {
                    writer.write_i64(*v).unwrap();
                }
                writer.step_out().unwrap();
            }
        }
    }
    writer.finish().unwrap();
    writer.into_inner()
}

fn describe<S: ByteSource>(reader: &mut BinaryReader<S>, ion_type: IonType) -> String {
    match ion_type {
        IonType::Int => reader.read_i64().unwrap().to_string(),
        IonType::String => reader.read_string().unwrap(),
        IonType::Symbol => reader.read_symbol().unwrap().unwrap_or_default(),
        IonType::List => {
            reader.step_in().unwrap();
            let mut parts = Vec::new();
            while let Some(child) = reader.next().unwrap() {
                parts.push(describe(reader, child));
            }
            reader.step_out().unwrap();
            parts.join(",")
        }
        other => panic!("unexpected {other}"),
    }
}

fn decode(bytes: &[u8]) -> Vec<String> {
    let mut reader = BinaryReader::from_slice(bytes);
    let mut values = Vec::new();
    while let Some(ion_type) = reader.next().unwrap() {
        values.push(describe(&mut reader, ion_type));
    }
    values
}

/// Decodes a chunk on its own, keeping symbol ids since the chunk may not
/// carry the table that defines them.
fn decode_chunk(chunk: &[u8]) -> Vec<String> {
    let mut reader = BinaryReader::new(
        SliceSource::new(chunk),
        ReaderOptions::new().with_system_values(true),
    );
    let mut values = Vec::new();
    while let Some(ion_type) = reader.next().unwrap() {
        if reader.depth() == 0 && ion_type == IonType::Struct {
            values.push("symbol table".to_owned());
            continue;
        }
        if ion_type == IonType::Symbol {
            values.push(format!("${}", reader.read_symbol_id().unwrap()));
            continue;
        }
        values.push(describe(&mut reader, ion_type));
    }
    values
}

/// Drains every complete value currently available, one chunk per fill.
fn drain(lookahead: &mut LookaheadBuffer<Feed>) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    loop {
        lookahead.fill_input().unwrap();
        if lookahead.more_data_required() {
            return chunks;
        }
        let mut chunk = vec![0u8; lookahead.available()];
        let n = lookahead.read_bytes(&mut chunk).unwrap();
        assert_eq!(n, chunk.len());
        chunks.push(chunk);
    }
}

fn chunks_all_at_once(data: &[u8]) -> Vec<Vec<u8>> {
    let feed = Feed::default();
    let mut lookahead = LookaheadBuffer::new(BufferConfiguration::default(), feed.clone()).unwrap();
    feed.push(data);
    drain(&mut lookahead)
}

fn chunks_byte_by_byte(data: &[u8]) -> Vec<Vec<u8>> {
    let feed = Feed::default();
    let mut lookahead = LookaheadBuffer::new(BufferConfiguration::default(), feed.clone()).unwrap();
    let mut chunks = Vec::new();
    for byte in data {
        feed.push(&[*byte]);
        chunks.extend(drain(&mut lookahead));
    }
    chunks
}

#[test]
fn one_chunk_per_top_level_value() {
    let data = encode(&[Item::Int(1), Item::Symbol("x".into()), Item::Padded(3, 2)]);
    let chunks = chunks_all_at_once(&data);
    assert_eq!(chunks.len(), 3);
    // version marker plus the first int
    assert_eq!(chunks[0], vec![0xe0, 0x01, 0x00, 0xea, 0x21, 0x01]);
    // the local symbol table travels with the symbol that needs it
    assert_eq!(chunks[1].last(), Some(&0x0a));
    assert_eq!(chunks[2], vec![0x03, 0x00, 0x00, 0x00, 0x21, 0x02]);
    assert_eq!(chunks.concat(), data);
}

#[test]
fn reader_follows_incremental_input() {
    let items: Vec<Item> = (0..20)
        .map(|i| match i % 3 {
            0 => Item::Int(i),
            1 => Item::Symbol(format!("s{}", i % 4)),
            _ => Item::List(vec![i, -i]),
        })
        .collect();
    let data = encode(&items);

    let feed = Feed::default();
    let lookahead = LookaheadBuffer::new(BufferConfiguration::default(), feed.clone()).unwrap();
    let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
    let mut seen = Vec::new();
    for piece in data.chunks(3) {
        feed.push(piece);
        loop {
            reader.source_mut().fill_input().unwrap();
            if reader.source().more_data_required() {
                break;
            }
            while let Some(ion_type) = reader.next().unwrap() {
                seen.push(describe(&mut reader, ion_type));
            }
        }
    }
    let expected: Vec<String> = (0..20)
        .map(|i: i64| match i % 3 {
            0 => i.to_string(),
            1 => format!("s{}", i % 4),
            _ => format!("{i},{}", -i),
        })
        .collect();
    assert_eq!(seen, expected);
}

#[test]
fn oversized_values_between_small_ones() {
    let big = "y".repeat(300);
    let data = encode(&[
        Item::Int(1),
        Item::Text(big.clone()),
        Item::Int(2),
        Item::Text(big),
        Item::Int(3),
    ]);
    let skipped = Rc::new(Cell::new(0));
    let counter = skipped.clone();
    let config = BufferConfiguration::new()
        .with_initial_buffer_size(64)
        .with_maximum_buffer_size(64)
        .on_oversized_value(move || counter.set(counter.get() + 1));
    let feed = Feed::default();
    let lookahead = LookaheadBuffer::new(config, feed.clone()).unwrap();
    let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
    let mut ints = Vec::new();
    for piece in data.chunks(16) {
        feed.push(piece);
        loop {
            reader.source_mut().fill_input().unwrap();
            if reader.source().more_data_required() {
                break;
            }
            while let Some(ion_type) = reader.next().unwrap() {
                assert_eq!(ion_type, IonType::Int);
                ints.push(reader.read_i64().unwrap());
            }
        }
    }
    assert_eq!(ints, vec![1, 2, 3]);
    assert_eq!(skipped.get(), 2);
}

/// Feeds `data` in pieces of `piece` bytes to a buffer growing from
/// `initial` to at most `max` bytes, reading values as they complete.
/// Returns the values and the number of oversized values reported.
fn read_in_pieces(data: &[u8], piece: usize, initial: usize, max: usize) -> (Vec<String>, usize) {
    let skipped = Rc::new(Cell::new(0));
    let counter = skipped.clone();
    let config = BufferConfiguration::new()
        .with_initial_buffer_size(initial)
        .with_maximum_buffer_size(max)
        .on_oversized_value(move || counter.set(counter.get() + 1));
    let feed = Feed::default();
    let lookahead = LookaheadBuffer::new(config, feed.clone()).unwrap();
    let mut reader = BinaryReader::new(lookahead, ReaderOptions::default());
    let mut values = Vec::new();
    for piece in data.chunks(piece) {
        feed.push(piece);
        loop {
            reader.source_mut().fill_input().unwrap();
            if reader.source().more_data_required() {
                break;
            }
            while let Some(ion_type) = reader.next().unwrap() {
                values.push(describe(&mut reader, ion_type));
            }
        }
    }
    (values, skipped.get())
}

#[test]
fn values_after_oversized_one_survive_any_piece_size() {
    // 1, a 102-byte string, 7, 8, 9
    let mut data = vec![0xe0, 0x01, 0x00, 0xea, 0x21, 0x01, 0x8e, 0xe4];
    data.extend(vec![b'q'; 100]);
    data.extend([0x21, 0x07, 0x21, 0x08, 0x21, 0x09]);
    for piece in 1..=data.len() {
        let (values, skipped) = read_in_pieces(&data, piece, 64, 64);
        assert_eq!(values, ["1", "7", "8", "9"], "pieces of {piece}");
        assert_eq!(skipped, 1, "pieces of {piece}");
    }
}

#[test]
fn values_after_padded_oversized_one_survive_any_piece_size() {
    // 1, 50 bytes of padding, a 102-byte string, 7, 8, 9
    let mut data = vec![0xe0, 0x01, 0x00, 0xea, 0x21, 0x01, 0x0e, 0xb0];
    data.extend([0u8; 48]);
    data.extend([0x8e, 0xe4]);
    data.extend(vec![b'q'; 100]);
    data.extend([0x21, 0x07, 0x21, 0x08, 0x21, 0x09]);
    for piece in 1..=data.len() {
        let (values, skipped) = read_in_pieces(&data, piece, 64, 64);
        assert_eq!(values, ["1", "7", "8", "9"], "pieces of {piece}");
        assert_eq!(skipped, 1, "pieces of {piece}");
    }
}

#[test]
fn configuration_is_validated() {
    let config = BufferConfiguration::new()
        .with_initial_buffer_size(128)
        .with_maximum_buffer_size(64);
    assert!(matches!(
        LookaheadBuffer::new(config, Feed::default()),
        Err(IonError::Usage(_))
    ));
}

#[test]
fn done_state_is_terminal() {
    // An annotated struct of 40 bytes does not fit in 32.
    let mut data = vec![0xe0, 0x01, 0x00, 0xea, 0xee, 0xac, 0x81, 0x83, 0xde, 0xa8, 0x87, 0xbe, 0xa5];
    data.push(0x8e);
    data.push(0xa3);
    data.extend(vec![b'z'; 35]);
    data.extend([0x21, 0x01]);
    let config = BufferConfiguration::new()
        .with_initial_buffer_size(32)
        .with_maximum_buffer_size(32)
        .on_oversized_symbol_table(|| {});
    let feed = Feed::default();
    feed.push(&data);
    let mut lookahead = LookaheadBuffer::new(config, feed).unwrap();
    lookahead.fill_input().unwrap();
    assert_eq!(lookahead.state(), LookaheadState::Done);
    lookahead.fill_input().unwrap();
    assert_eq!(lookahead.state(), LookaheadState::Done);
    assert!(lookahead.more_data_required());
}

proptest! {
    #[test]
    fn byte_by_byte_matches_all_at_once(items in proptest::collection::vec(item(), 1..16)) {
        let data = encode(&items);
        let whole = chunks_all_at_once(&data);
        let incremental = chunks_byte_by_byte(&data);
        prop_assert_eq!(whole.len(), items.len());
        prop_assert_eq!(incremental.len(), items.len());
        prop_assert_eq!(whole.concat(), data.clone());
        // Partially staged NOP pads are dropped, so compare what the chunks decode to.
        let expected = decode(&data);
        for (a, b) in whole.iter().zip(&incremental) {
            prop_assert_eq!(decode_chunk(a), decode_chunk(b));
        }
        prop_assert_eq!(decode(&incremental.concat()), expected);
    }

    #[test]
    fn oversized_values_are_skipped_for_any_piece_size(
        items in proptest::collection::vec(small_or_oversized(), 1..12),
        piece in 1usize..48,
        initial in 8usize..=64,
    ) {
        let data = encode(&items);
        let expected: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Item::Int(v) => Some(v.to_string()),
                Item::Text(s) if s.len() < 100 => Some(s.clone()),
                _ => None,
            })
            .collect();
        let oversized = items.len() - expected.len();
        let (values, skipped) = read_in_pieces(&data, piece, initial, 64);
        prop_assert_eq!(values, expected);
        prop_assert_eq!(skipped, oversized);
    }
}
