//! Purpose: Hold top-level CLI command dispatch for `platestream`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Commands decode through one `Reader` and encode through one `Writer`.
//! Invariants: `--integers` selects `i64` values; otherwise values are `f64`.
//! Invariants: Helpers in `main.rs` remain the source of command business logic.

use super::*;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Convert(args) if args.source.integers => convert::<i64>(&args),
        Command::Convert(args) => convert::<f64>(&args),
        Command::Inspect(args) if args.source.integers => inspect::<i64>(&args),
        Command::Inspect(args) => inspect::<f64>(&args),
        Command::Browse(args) if args.source.integers => browse_command::<i64>(&args),
        Command::Browse(args) => browse_command::<f64>(&args),
    }
}

fn convert<N: Numeric>(args: &ConvertArgs) -> Result<RunOutcome, Error> {
    let reader = open_reader::<N>(&args.source, args.in_delimiter.into())?;
    let kind = resolve_kind(&args.source, &reader)?;
    let options = WriterOptions::new(args.to.into())
        .with_delimiter(args.out_delimiter.into())
        .with_pretty(args.pretty);
    let count = match &args.output {
        Some(path) => convert_into(&reader, kind, Writer::create(path, options)?)?,
        None => convert_into(&reader, kind, Writer::new(io::stdout().lock(), options))?,
    };
    tracing::info!(
        from = %reader.format(),
        to = %options.format,
        values = N::NAME,
        records = count,
        "converted"
    );
    Ok(RunOutcome::ok())
}

fn inspect<N: Numeric>(args: &InspectArgs) -> Result<RunOutcome, Error> {
    let reader = open_reader::<N>(&args.source, args.delimiter.into())?;
    let kind = resolve_kind(&args.source, &reader)?;
    let records = match kind {
        None => Vec::new(),
        Some(RecordKind::Well) => summarize::<N, Well<N>>(&reader)?,
        Some(RecordKind::Set) => summarize::<N, WellSet<N>>(&reader)?,
        Some(RecordKind::Plate) => summarize::<N, Plate<N>>(&reader)?,
        Some(RecordKind::Stack) => summarize::<N, Stack<N>>(&reader)?,
    };
    let mut summary = json!({
        "format": reader.format().as_str(),
        "kind": kind.map(RecordKind::as_str),
        "count": records.len(),
        "records": records,
    });
    if let Some(path) = reader.path() {
        summary["path"] = json!(path.display().to_string());
    }
    emit_json(summary);
    Ok(RunOutcome::ok())
}

fn browse_command<N: Numeric>(args: &BrowseArgs) -> Result<RunOutcome, Error> {
    let reader = open_reader::<N>(&args.source, args.delimiter.into())?;
    let lines = match resolve_kind(&args.source, &reader)? {
        None => Vec::new(),
        Some(RecordKind::Well) => browse::<N, Well<N>>(&reader, args.reverse)?,
        Some(RecordKind::Set) => browse::<N, WellSet<N>>(&reader, args.reverse)?,
        Some(RecordKind::Plate) => browse::<N, Plate<N>>(&reader, args.reverse)?,
        Some(RecordKind::Stack) => browse::<N, Stack<N>>(&reader, args.reverse)?,
    };
    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}").map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write to stdout")
                .with_source(err)
        })?;
    }
    Ok(RunOutcome::ok())
}
