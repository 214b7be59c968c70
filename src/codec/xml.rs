// Tagged XML records: concatenated top-level elements sharing the JSON record schema.
//
//     <plate label="P1" rows="8" columns="12" type="96">
//       <well row="0" column="1"><value>0.5</value></well>
//     </plate>
//
// The reader is a small element-tree parser: attributes, nested elements, text,
// comments, processing instructions, CDATA, and the predefined/numeric entities.
use crate::core::entity::{Entity, EntityRef, RecordKind};
use crate::core::error::Error;
use crate::core::numeric::Numeric;
use crate::core::plate::{Plate, PlateType};
use crate::core::stack::Stack;
use crate::core::well::{Well, WellIndex};
use crate::core::well_set::WellSet;

/// Nesting cap; matches serde_json's recursion limit for the Json codec.
const MAX_DEPTH: usize = 128;

#[derive(Debug)]
struct Element {
    name: String,
    offset: usize,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn required<T: std::str::FromStr>(&self, name: &str) -> Result<T, Error> {
        let raw = self.attribute(name).ok_or_else(|| {
            self.malformed(format!("<{}> is missing attribute '{name}'", self.name))
        })?;
        raw.trim().parse().map_err(|_| {
            self.malformed(format!(
                "<{}> attribute '{name}' has invalid value '{raw}'",
                self.name
            ))
        })
    }

    fn label(&self) -> String {
        self.attribute("label").unwrap_or_default().to_string()
    }

    fn malformed(&self, reason: String) -> Error {
        Error::malformed(reason).with_offset(self.offset as u64)
    }

    fn reject_text(&self) -> Result<(), Error> {
        if self.text.trim().is_empty() {
            return Ok(());
        }
        Err(self.malformed(format!("unexpected text inside <{}>", self.name)))
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::malformed(reason).with_offset(self.pos as u64)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn expect(&mut self, token: &str) -> Result<(), Error> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}'")))
        }
    }

    fn skip_past(&mut self, terminator: &str, what: &str) -> Result<&'a str, Error> {
        let rest = self.rest();
        match rest.find(terminator) {
            Some(end) => {
                self.pos += end + terminator.len();
                Ok(&rest[..end])
            }
            None => Err(self.error(format!("unterminated {what}"))),
        }
    }

    /// Skips whitespace, comments, processing instructions, and doctype declarations.
    fn skip_misc(&mut self) -> Result<(), Error> {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.pos += 4;
                self.skip_past("-->", "comment")?;
            } else if rest.starts_with("<?") {
                self.pos += 2;
                self.skip_past("?>", "processing instruction")?;
            } else if rest.starts_with("<!DOCTYPE") {
                self.skip_past(">", "doctype")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, Error> {
        let rest = self.rest();
        let len = rest
            .find(|ch: char| !(ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn peek_name(&self) -> Result<&'a str, Error> {
        let mut probe = Parser {
            input: self.input,
            pos: self.pos,
        };
        probe.expect("<")?;
        probe.name()
    }

    fn element(&mut self, depth: usize) -> Result<Element, Error> {
        let offset = self.pos;
        if depth > MAX_DEPTH {
            return Err(self.error(format!(
                "elements nested more than {MAX_DEPTH} levels deep"
            )));
        }
        self.expect("<")?;
        let name = self.name()?.to_string();
        let mut element = Element {
            name,
            offset,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        };

        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break;
            }
            if self.at_end() {
                return Err(self.error(format!("unterminated start tag <{}>", element.name)));
            }
            let key = self.name()?.to_string();
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.quoted()?;
            if element.attribute(&key).is_some() {
                return Err(self.error(format!("duplicate attribute '{key}'")));
            }
            element.attributes.push((key, value));
        }

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(Error::malformed(format!("unterminated element <{}>", element.name))
                    .with_offset(offset as u64));
            }
            if rest.starts_with("</") {
                self.pos += 2;
                let close = self.name()?;
                if close != element.name {
                    return Err(self.error(format!(
                        "closing tag </{close}> does not match <{}>",
                        element.name
                    )));
                }
                self.skip_whitespace();
                self.expect(">")?;
                return Ok(element);
            }
            if rest.starts_with("<!--") {
                self.pos += 4;
                self.skip_past("-->", "comment")?;
            } else if rest.starts_with("<![CDATA[") {
                self.pos += 9;
                let data = self.skip_past("]]>", "CDATA section")?;
                element.text.push_str(data);
            } else if rest.starts_with("<?") {
                self.pos += 2;
                self.skip_past("?>", "processing instruction")?;
            } else if rest.starts_with('<') {
                let child = self.element(depth + 1)?;
                element.children.push(child);
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let start = self.pos;
                self.pos += end;
                element.text.push_str(&unescape(&rest[..end], start)?);
            }
        }
    }

    fn quoted(&mut self) -> Result<String, Error> {
        let quote = match self.rest().chars().next() {
            Some(ch @ ('"' | '\'')) => ch,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        self.pos += 1;
        let start = self.pos;
        let rest = self.rest();
        let end = rest
            .find(quote)
            .ok_or_else(|| self.error("unterminated attribute value"))?;
        let raw = &rest[..end];
        if raw.contains('<') {
            return Err(self.error("'<' is not allowed in attribute values"));
        }
        self.pos += end + 1;
        unescape(raw, start)
    }
}

fn unescape(raw: &str, base: usize) -> Result<String, Error> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let at = base + (raw.len() - rest.len()) + amp;
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| Error::malformed("unterminated entity reference").with_offset(at as u64))?;
        let entity = &after[..semi];
        let ch = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => numeric_reference(entity).ok_or_else(|| {
                Error::malformed(format!("unknown entity '&{entity};'")).with_offset(at as u64)
            })?,
        };
        out.push(ch);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn numeric_reference(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse().ok()?
    };
    char::from_u32(code)
}

fn escape(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
}

pub(super) fn decode_all<N: Numeric>(text: &str, kind: RecordKind) -> Result<Vec<Entity<N>>, Error> {
    let mut parser = Parser::new(text);
    let mut entities = Vec::new();
    loop {
        parser.skip_misc()?;
        if parser.at_end() {
            break;
        }
        if !parser.rest().starts_with('<') {
            return Err(parser.error("text outside of a record element"));
        }
        let element = parser.element(0)?;
        let found = record_kind(&element)?;
        if found != kind {
            return Err(element.malformed(format!("expected {kind} record, found {found}")));
        }
        entities.push(into_entity(&element)?);
    }
    Ok(entities)
}

pub(super) fn detect_kind(text: &str) -> Result<Option<RecordKind>, Error> {
    let mut parser = Parser::new(text);
    parser.skip_misc()?;
    if parser.at_end() {
        return Ok(None);
    }
    let name = parser.peek_name()?;
    RecordKind::from_tag(name)
        .map(Some)
        .ok_or_else(|| parser.error(format!("unknown record element <{name}>")))
}

fn record_kind(element: &Element) -> Result<RecordKind, Error> {
    RecordKind::from_tag(&element.name)
        .ok_or_else(|| element.malformed(format!("unknown record element <{}>", element.name)))
}

fn into_entity<N: Numeric>(element: &Element) -> Result<Entity<N>, Error> {
    let with_offset = |err: Error| {
        if err.offset().is_some() {
            err
        } else {
            err.with_offset(element.offset as u64)
        }
    };
    let entity = match record_kind(element)? {
        RecordKind::Well => Entity::Well(into_well(element)?),
        RecordKind::Set => {
            element.reject_text()?;
            let mut set = WellSet::new().with_label(element.label());
            for child in &element.children {
                set.insert_unique(expect_well(child, element)?)
                    .map_err(with_offset)?;
            }
            Entity::Set(set)
        }
        RecordKind::Plate => Entity::Plate(into_plate(element)?),
        RecordKind::Stack => {
            element.reject_text()?;
            let mut stack =
                Stack::new(element.required("rows")?, element.required("columns")?)
                    .map_err(with_offset)?
                    .with_label(element.label());
            for child in &element.children {
                if record_kind(child)? != RecordKind::Plate {
                    return Err(child.malformed(format!(
                        "<stack> children must be <plate> elements, found <{}>",
                        child.name
                    )));
                }
                let plate = into_plate(child)?;
                stack.push(plate).map_err(|err| err.with_offset(child.offset as u64))?;
            }
            Entity::Stack(stack)
        }
    };
    Ok(entity)
}

fn into_plate<N: Numeric>(element: &Element) -> Result<Plate<N>, Error> {
    element.reject_text()?;
    let at = |err: Error| err.with_offset(element.offset as u64);
    let mut plate = Plate::new(element.required("rows")?, element.required("columns")?)
        .map_err(at)?
        .with_label(element.label());
    if let Some(tag) = element.attribute("type") {
        let declared = tag.parse::<PlateType>().map_err(at)?;
        plate.check_declared_type(declared).map_err(at)?;
    }
    for child in &element.children {
        let well = expect_well(child, element)?;
        plate
            .insert_unique(well)
            .map_err(|err| err.with_offset(child.offset as u64))?;
    }
    Ok(plate)
}

fn expect_well<N: Numeric>(child: &Element, parent: &Element) -> Result<Well<N>, Error> {
    if child.name != "well" {
        return Err(child.malformed(format!(
            "<{}> children must be <well> elements, found <{}>",
            parent.name, child.name
        )));
    }
    into_well(child)
}

fn into_well<N: Numeric>(element: &Element) -> Result<Well<N>, Error> {
    element.reject_text()?;
    let row: u32 = element.required("row")?;
    let column: u32 = element.required("column")?;
    let index = WellIndex::new(row, column)
        .map_err(|_| element.malformed(format!("<well> at row {row} has column 0")))?;
    let mut values = Vec::with_capacity(element.children.len());
    for child in &element.children {
        if child.name != "value" || !child.children.is_empty() {
            return Err(child.malformed(format!(
                "<well> children must be plain <value> elements, found <{}>",
                child.name
            )));
        }
        let value = N::parse_value(&child.text).ok_or_else(|| {
            child.malformed(format!(
                "invalid {} value '{}' in well {index}",
                N::NAME,
                child.text.trim()
            ))
        })?;
        values.push(value);
    }
    Ok(Well::new(index, values))
}

struct XmlWriter {
    out: String,
    pretty: bool,
}

impl XmlWriter {
    fn indent(&mut self, depth: usize) {
        if self.pretty {
            for _ in 0..depth {
                self.out.push_str("  ");
            }
        }
    }

    fn newline(&mut self) {
        if self.pretty {
            self.out.push('\n');
        }
    }

    fn attribute(&mut self, key: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(key);
        self.out.push_str("=\"");
        escape(value, &mut self.out);
        self.out.push('"');
    }

    fn label(&mut self, label: &str) {
        if !label.is_empty() {
            self.attribute("label", label);
        }
    }

    /// Closes a start tag, or self-closes it when there are no children.
    fn finish_start(&mut self, empty: bool) {
        self.out.push_str(if empty { "/>" } else { ">" });
        self.newline();
    }

    fn end_tag(&mut self, name: &str, depth: usize) {
        self.indent(depth);
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
        self.newline();
    }

    fn well<N: Numeric>(&mut self, well: &Well<N>, depth: usize) {
        self.indent(depth);
        self.out.push_str("<well");
        self.attribute("row", &well.row().to_string());
        self.attribute("column", &well.column().to_string());
        if well.values.is_empty() {
            self.finish_start(true);
            return;
        }
        self.out.push('>');
        for value in &well.values {
            self.out.push_str("<value>");
            self.out.push_str(&value.to_string());
            self.out.push_str("</value>");
        }
        self.out.push_str("</well>");
        self.newline();
    }

    fn plate<N: Numeric>(&mut self, plate: &Plate<N>, depth: usize) {
        self.indent(depth);
        self.out.push_str("<plate");
        self.label(plate.label());
        self.attribute("rows", &plate.rows().to_string());
        self.attribute("columns", &plate.columns().to_string());
        self.attribute("type", plate.plate_type().as_str());
        self.finish_start(plate.is_empty());
        if plate.is_empty() {
            return;
        }
        for well in plate.wells() {
            self.well(well, depth + 1);
        }
        self.end_tag("plate", depth);
    }

    fn set<N: Numeric>(&mut self, set: &WellSet<N>, depth: usize) {
        self.indent(depth);
        self.out.push_str("<set");
        self.label(set.label());
        self.finish_start(set.is_empty());
        if set.is_empty() {
            return;
        }
        for well in set.wells() {
            self.well(well, depth + 1);
        }
        self.end_tag("set", depth);
    }

    fn stack<N: Numeric>(&mut self, stack: &Stack<N>, depth: usize) {
        self.indent(depth);
        self.out.push_str("<stack");
        self.label(stack.label());
        self.attribute("rows", &stack.rows().to_string());
        self.attribute("columns", &stack.columns().to_string());
        self.finish_start(stack.is_empty());
        if stack.is_empty() {
            return;
        }
        for plate in stack.plates() {
            self.plate(plate, depth + 1);
        }
        self.end_tag("stack", depth);
    }
}

pub(super) fn encode_many<N: Numeric>(entities: &[EntityRef<'_, N>], pretty: bool) -> String {
    let mut writer = XmlWriter {
        out: String::new(),
        pretty,
    };
    for entity in entities {
        match entity {
            EntityRef::Well(well) => writer.well(well, 0),
            EntityRef::Set(set) => writer.set(set, 0),
            EntityRef::Plate(plate) => writer.plate(plate, 0),
            EntityRef::Stack(stack) => writer.stack(stack, 0),
        }
        if !pretty {
            writer.out.push('\n');
        }
    }
    writer.out
}
