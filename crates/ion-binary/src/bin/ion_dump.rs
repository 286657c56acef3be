//! `ion-dump`: print binary Ion (file or stdin) as JSON lines (stdout).
//!
//! Usage:
//!   ion-dump [--system] [--annotations] [--max-value-size N] [FILE]
//!
//! With `--max-value-size` input is read incrementally and values larger
//! than N bytes are skipped with a note on stderr.

use std::fs::File;
use std::io::{self, Read, Write};

use ion_binary::{
    BinaryReader, BufferConfiguration, ByteSource, IonResult, IonType, LookaheadBuffer,
    ReaderOptions, SliceSource,
};
use serde_json::{Map, Number, Value};

struct Args {
    system: bool,
    annotations: bool,
    max_value_size: Option<usize>,
    path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        system: false,
        annotations: false,
        max_value_size: None,
        path: None,
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--system" => parsed.system = true,
            "--annotations" => parsed.annotations = true,
            "--max-value-size" => {
                i += 1;
                match args.get(i).and_then(|n| n.parse().ok()) {
                    Some(n) => parsed.max_value_size = Some(n),
                    None => {
                        eprintln!("--max-value-size needs a byte count");
                        std::process::exit(1);
                    }
                }
            }
            path => parsed.path = Some(path.to_owned()),
        }
        i += 1;
    }
    parsed
}

fn scalar<S: ByteSource>(reader: &mut BinaryReader<S>, ion_type: IonType) -> IonResult<Value> {
    Ok(match ion_type {
        IonType::Null => Value::Null,
        IonType::Bool => Value::Bool(reader.read_bool()?),
        IonType::Int => {
            let int = reader.read_int()?;
            match int.as_i64() {
                Some(n) => Value::Number(n.into()),
                None => Value::String(int.to_string()),
            }
        }
        IonType::Float => {
            let f = reader.read_f64()?;
            match Number::from_f64(f) {
                Some(n) => Value::Number(n),
                None => Value::String(f.to_string()),
            }
        }
        IonType::Decimal => Value::String(reader.read_decimal()?.to_text()),
        IonType::Timestamp => Value::String(reader.read_timestamp()?.to_text()),
        IonType::Symbol => {
            let sid = reader.read_symbol_id()?;
            match reader.symbol_table().text(sid) {
                Some(text) => Value::String(text.to_owned()),
                None => Value::String(format!("${sid}")),
            }
        }
        IonType::String => Value::String(reader.read_string()?),
        IonType::Clob => bytes(reader.read_clob()?),
        IonType::Blob => bytes(reader.read_blob()?),
        IonType::List | IonType::SExp | IonType::Struct => Value::Null,
    })
}

fn bytes(data: Vec<u8>) -> Value {
    Value::Array(data.into_iter().map(|b| Value::Number(b.into())).collect())
}

fn value<S: ByteSource>(
    reader: &mut BinaryReader<S>,
    ion_type: IonType,
    annotations: bool,
) -> IonResult<Value> {
    let labels: Vec<Value> = if annotations {
        let ids = reader.annotation_ids().to_vec();
        reader
            .annotations()?
            .into_iter()
            .zip(ids)
            .map(|(text, sid)| Value::String(text.map_or_else(|| format!("${sid}"), str::to_owned)))
            .collect()
    } else {
        Vec::new()
    };
    let content = if reader.is_null() {
        Value::Null
    } else {
        match ion_type {
            IonType::List | IonType::SExp => {
                reader.step_in()?;
                let mut items = Vec::new();
                while let Some(child) = reader.next()? {
                    items.push(value(reader, child, annotations)?);
                }
                reader.step_out()?;
                Value::Array(items)
            }
            IonType::Struct => {
                reader.step_in()?;
                let mut fields = Map::new();
                while let Some(child) = reader.next()? {
                    let name = match reader.field_name()? {
                        Some(text) => text.to_owned(),
                        None => format!("${}", reader.field_id().unwrap_or(0)),
                    };
                    fields.insert(name, value(reader, child, annotations)?);
                }
                reader.step_out()?;
                Value::Object(fields)
            }
            _ => scalar(reader, ion_type)?,
        }
    };
    if labels.is_empty() {
        return Ok(content);
    }
    let mut wrapped = Map::new();
    wrapped.insert("annotations".to_owned(), Value::Array(labels));
    wrapped.insert("value".to_owned(), content);
    Ok(Value::Object(wrapped))
}

fn dump_available<S: ByteSource>(
    reader: &mut BinaryReader<S>,
    annotations: bool,
    out: &mut impl Write,
) -> Result<(), String> {
    while let Some(ion_type) = reader.next().map_err(|e| e.to_string())? {
        let json = value(reader, ion_type, annotations).map_err(|e| e.to_string())?;
        writeln!(out, "{json}").map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), String> {
    let input: Box<dyn Read> = match &args.path {
        Some(path) => Box::new(File::open(path).map_err(|e| format!("{path}: {e}"))?),
        None => Box::new(io::stdin()),
    };
    let options = ReaderOptions::new().with_system_values(args.system);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.max_value_size {
        Some(max) => {
            let config = BufferConfiguration::new()
                .with_initial_buffer_size(max.min(32 * 1024))
                .with_maximum_buffer_size(max)
                .on_oversized_value(|| eprintln!("skipped an oversized value"))
                .on_oversized_symbol_table(|| eprintln!("symbol table too large; stopping"));
            let lookahead = LookaheadBuffer::new(config, input).map_err(|e| e.to_string())?;
            let mut reader = BinaryReader::new(lookahead, options);
            loop {
                reader.source_mut().fill_input().map_err(|e| e.to_string())?;
                if reader.source().more_data_required() {
                    break;
                }
                dump_available(&mut reader, args.annotations, &mut out)?;
            }
        }
        None => {
            let mut buf = Vec::new();
            let mut input = input;
            input.read_to_end(&mut buf).map_err(|e| e.to_string())?;
            let mut reader = BinaryReader::new(SliceSource::new(&buf), options);
            dump_available(&mut reader, args.annotations, &mut out)?;
        }
    }
    out.flush().map_err(|e| e.to_string())
}

fn main() {
    let args = parse_args();
    if let Err(e) = run(&args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
