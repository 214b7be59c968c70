//! Purpose: `platestream` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, runs commands.
//! Invariants: Command output goes to stdout; diagnostics and logs go to stderr.
//! Invariants: Non-interactive errors are emitted as a JSON envelope on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All decoding and encoding goes through `api::Reader` and `api::Writer`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use platestream::api::{
    Cursor, Delimiter, EntityRef, Error, ErrorKind, Format, Numeric, Plate, Reader,
    ReaderOptions, Record, RecordKind, Stack, Well, WellSet, Writer, WriterOptions, to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    to_exit_code(ErrorKind::Usage)
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `platestream --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing(cli.log_level);
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command)
        .map_err(add_io_hint)
        .map_err(add_input_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing(level: Option<LogLevel>) {
    let env_filter = match level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "platestream",
    version,
    about = "Convert and browse microplate wells, sets, plates, and stacks",
    long_about = None,
    after_help = r#"EXAMPLES
  $ platestream convert plates.json --to plate-map -o plates.txt
  $ platestream convert results.txt --from result-table --to xml --pretty
  $ platestream inspect stack.xml
  $ platestream browse plates.json --reverse

FORMATS
  json          concatenated JSON records (.json, .jsonl)
  xml           concatenated XML records (.xml)
  plate-map     delimited grid per plate, blank-line separated
  result-table  delimited index/value lines per well set"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        value_enum,
        global = true,
        help = "Log verbosity (default: RUST_LOG, else warn)"
    )]
    log_level: Option<LogLevel>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        global = true,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Re-encode a file in another format",
        after_help = r#"EXAMPLES
  $ platestream convert plates.json --to plate-map -o plates.txt
  $ platestream convert grid.csv --from plate-map --in-delimiter comma --to json
  $ cat stack.xml | platestream convert - --from xml --to json --pretty

NOTES
  - The record kind is detected from the input unless --kind is given
  - `-` reads from stdin; without -o the result goes to stdout"#
    )]
    Convert(ConvertArgs),
    #[command(
        arg_required_else_help = true,
        about = "Print a JSON summary of the records in a file"
    )]
    Inspect(InspectArgs),
    #[command(
        arg_required_else_help = true,
        about = "Walk the records of a file with a cursor, one line per record"
    )]
    Browse(BrowseArgs),
}

#[derive(Args)]
struct InputArgs {
    #[arg(help = "Input file path (use - for stdin)", value_hint = ValueHint::FilePath)]
    input: String,
    #[arg(long, value_enum, help = "Input format (inferred from .json/.xml extensions)")]
    from: Option<FormatArg>,
    #[arg(long, value_enum, help = "Record kind (detected from the first record)")]
    kind: Option<KindArg>,
    #[arg(
        long,
        help = "Read well values as 64-bit integers (default: floats, exact up to 2^53)"
    )]
    integers: bool,
}

#[derive(Args)]
struct ConvertArgs {
    #[command(flatten)]
    source: InputArgs,
    #[arg(long, value_enum, help = "Output format")]
    to: FormatArg,
    #[arg(
        short = 'o',
        long,
        help = "Output file path (default: stdout)",
        value_hint = ValueHint::FilePath
    )]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "tab", help = "Input field delimiter")]
    in_delimiter: DelimiterArg,
    #[arg(long, value_enum, default_value = "tab", help = "Output field delimiter")]
    out_delimiter: DelimiterArg,
    #[arg(long, help = "Pretty-print json and xml output")]
    pretty: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    source: InputArgs,
    #[arg(long, value_enum, default_value = "tab", help = "Field delimiter")]
    delimiter: DelimiterArg,
}

#[derive(Args)]
struct BrowseArgs {
    #[command(flatten)]
    source: InputArgs,
    #[arg(long, value_enum, default_value = "tab", help = "Field delimiter")]
    delimiter: DelimiterArg,
    #[arg(long, help = "After walking forward, walk back to the first record")]
    reverse: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Json,
    Xml,
    PlateMap,
    ResultTable,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Format::Json,
            FormatArg::Xml => Format::Xml,
            FormatArg::PlateMap => Format::PlateMap,
            FormatArg::ResultTable => Format::ResultTable,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DelimiterArg {
    Tab,
    Comma,
    Semicolon,
    Pipe,
    Space,
}

impl From<DelimiterArg> for Delimiter {
    fn from(value: DelimiterArg) -> Self {
        match value {
            DelimiterArg::Tab => Delimiter::Tab,
            DelimiterArg::Comma => Delimiter::Comma,
            DelimiterArg::Semicolon => Delimiter::Semicolon,
            DelimiterArg::Pipe => Delimiter::Pipe,
            DelimiterArg::Space => Delimiter::Space,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum KindArg {
    Well,
    Set,
    Plate,
    Stack,
}

impl From<KindArg> for RecordKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Well => RecordKind::Well,
            KindArg::Set => RecordKind::Set,
            KindArg::Plate => RecordKind::Plate,
            KindArg::Stack => RecordKind::Stack,
        }
    }
}

fn resolve_format(source: &InputArgs) -> Result<Format, Error> {
    if let Some(format) = source.from {
        return Ok(format.into());
    }
    Format::from_path(Path::new(&source.input)).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("cannot infer the format of '{}'", source.input))
            .with_hint("Pass --from json|xml|plate-map|result-table.")
    })
}

fn open_reader<N: Numeric>(
    source: &InputArgs,
    delimiter: Delimiter,
) -> Result<Reader<N>, Error> {
    let options = ReaderOptions::new(resolve_format(source)?).with_delimiter(delimiter);
    if source.input == "-" {
        return Reader::from_reader(io::stdin().lock(), options);
    }
    Reader::open(&source.input, options)
}

/// Kind from `--kind`, else the first record's kind; `None` means the input is empty.
fn resolve_kind<N: Numeric>(
    source: &InputArgs,
    reader: &Reader<N>,
) -> Result<Option<RecordKind>, Error> {
    match source.kind {
        Some(kind) => Ok(Some(kind.into())),
        None => reader.detect_kind(),
    }
}

fn convert_records<N: Numeric, K: Record<N>, W: Write>(
    reader: &Reader<N>,
    writer: &mut Writer<W>,
) -> Result<usize, Error> {
    let records = reader.decode::<K>()?;
    writer.write_all(records.all())?;
    Ok(records.len())
}

fn convert_into<N: Numeric, W: Write>(
    reader: &Reader<N>,
    kind: Option<RecordKind>,
    mut writer: Writer<W>,
) -> Result<usize, Error> {
    let count = match kind {
        None => 0,
        Some(RecordKind::Well) => convert_records::<N, Well<N>, W>(reader, &mut writer)?,
        Some(RecordKind::Set) => convert_records::<N, WellSet<N>, W>(reader, &mut writer)?,
        Some(RecordKind::Plate) => convert_records::<N, Plate<N>, W>(reader, &mut writer)?,
        Some(RecordKind::Stack) => convert_records::<N, Stack<N>, W>(reader, &mut writer)?,
    };
    writer.close()?;
    Ok(count)
}

fn decode_cursor<N: Numeric, K: Record<N>>(reader: &Reader<N>) -> Result<Cursor<K>, Error> {
    reader.decode::<K>()
}

fn record_summary<N: Numeric>(entity: EntityRef<'_, N>) -> Value {
    match entity {
        EntityRef::Well(well) => json!({
            "kind": "well",
            "index": well.index.to_string(),
            "values": well.values.len(),
        }),
        EntityRef::Set(set) => json!({
            "kind": "set",
            "label": set.label(),
            "wells": set.len(),
        }),
        EntityRef::Plate(plate) => json!({
            "kind": "plate",
            "label": plate.label(),
            "rows": plate.rows(),
            "columns": plate.columns(),
            "type": plate.plate_type().as_str(),
            "wells": plate.len(),
        }),
        EntityRef::Stack(stack) => json!({
            "kind": "stack",
            "label": stack.label(),
            "rows": stack.rows(),
            "columns": stack.columns(),
            "type": stack.plate_type().as_str(),
            "plates": stack.len(),
        }),
    }
}

fn summarize<N: Numeric, K: Record<N>>(reader: &Reader<N>) -> Result<Vec<Value>, Error> {
    let cursor = decode_cursor::<N, K>(reader)?;
    Ok(cursor
        .all()
        .iter()
        .map(|record| record_summary(record.as_entity()))
        .collect())
}

/// One browse line: the well index, or the record label.
fn browse_line<N: Numeric>(entity: EntityRef<'_, N>, position: usize) -> String {
    match entity {
        EntityRef::Well(well) => well.index.to_string(),
        other if other.label().is_empty() => format!("({} {position})", other.kind()),
        other => other.label().to_string(),
    }
}

fn browse<N: Numeric, K: Record<N>>(
    reader: &Reader<N>,
    reverse: bool,
) -> Result<Vec<String>, Error> {
    let mut cursor = decode_cursor::<N, K>(reader)?;
    let mut lines = Vec::with_capacity(cursor.len());
    while let Some(record) = cursor.next() {
        lines.push(browse_line(record.as_entity(), lines.len() + 1));
    }
    if reverse {
        let mut position = cursor.len();
        while let Some(record) = cursor.previous() {
            lines.push(browse_line(record.as_entity(), position));
            position -= 1;
        }
    }
    Ok(lines)
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() || err.kind() != ErrorKind::Io {
        return err;
    }
    err.with_hint("I/O error. Check the path, permissions, and disk space.")
}

fn add_input_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Malformed => err.with_hint(
            "Input does not match the format. Check --from, --kind, and the delimiter flags.",
        ),
        ErrorKind::DimensionMismatch => {
            err.with_hint("A well, plate, or type tag disagrees with the declared dimensions.")
        }
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint("Unexpected internal failure. Retry with --log-level debug if it persists.")
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\x1b[{code}m{label}\x1b[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Malformed => "malformed input".to_string(),
        ErrorKind::DimensionMismatch => "dimension mismatch".to_string(),
        ErrorKind::LabelCountMismatch => "label count mismatch".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    let position = match (err.line(), err.column(), err.offset()) {
        (Some(line), Some(column), _) => Some(format!("line {line}, column {column}")),
        (Some(line), None, _) => Some(format!("line {line}")),
        (None, _, Some(offset)) => Some(format!("byte offset {offset}")),
        (None, _, None) => None,
    };
    if let Some(position) = position {
        lines.push(format!(
            "{} {position}",
            colorize_label("at:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
