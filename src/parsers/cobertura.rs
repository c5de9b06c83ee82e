/// Parser for Cobertura XML coverage reports.
///
/// Cobertura XML structure:
///   <coverage line-rate="..." branch-rate="...">
///     <sources><source>...</source></sources>
///     <packages>
///       <package name="...">
///         <classes>
///           <class name="..." filename="..." line-rate="..." branch-rate="...">
///             <methods>
///               <method name="..." ...>
///                 <lines><line number="..." hits="..." .../></lines>
///               </method>
///             </methods>
///             <lines>
///               <line number="..." hits="..." branch="true|false"
///                     condition-coverage="50% (1/2)" />
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
use std::collections::HashMap;
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{CovdeltaError, Result};
use crate::model::*;
use crate::parsers::Parser;

pub struct CoberturaParser;

impl Parser for CoberturaParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageData> {
        parse_cobertura(input)
    }
}

fn parse_cobertura(input: &[u8]) -> Result<CoverageData> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut data = CoverageData::new();
    let mut buf = Vec::new();
    let mut seen_root = false;

    // Index into `data.files` of the class being read. Classes sharing a
    // filename feed the same entry.
    let mut current_file: Option<usize> = None;
    let mut file_index: HashMap<String, usize> = HashMap::new();
    // Per file: line number -> index into its `lines`.
    let mut line_index: Vec<HashMap<u32, usize>> = Vec::new();

    let mut in_source = false;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => {
                return Err(CovdeltaError::Xml {
                    position: reader.buffer_position(),
                    source: e,
                })
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"coverage" => {
                    let attrs = attr_map(e);
                    data.line_rate = required_rate(&attrs, "line-rate")?;
                    data.branch_rate = required_rate(&attrs, "branch-rate")?;
                    seen_root = true;
                }
                b"source" => {
                    // A self-closing <source/> has no text and no End event.
                    if is_start_event {
                        in_source = true;
                    }
                }
                b"class" => {
                    let attrs = attr_map(e);
                    let filename = attrs.get("filename").ok_or_else(|| {
                        CovdeltaError::MalformedReport(format!(
                            "class '{}' has no filename attribute",
                            attrs.get("name").map(String::as_str).unwrap_or("?")
                        ))
                    })?;
                    let idx = *file_index.entry(filename.clone()).or_insert_with(|| {
                        data.files.push(FileCoverage::new(filename.clone()));
                        line_index.push(HashMap::new());
                        data.files.len() - 1
                    });
                    current_file = Some(idx);
                }
                // Lines outside a <class> carry no file and are skipped.
                b"line" => {
                    if let Some(idx) = current_file {
                        let record = parse_line(&attr_map(e))?;
                        let file = &mut data.files[idx];
                        // Lines may appear both under <method><lines> and
                        // <class><lines>; keep one record per number.
                        match line_index[idx].get(&record.number) {
                            Some(&pos) => {
                                let existing = &mut file.lines[pos];
                                existing.hits = existing.hits.max(record.hits);
                                if existing.condition_coverage.is_none() {
                                    existing.condition_coverage = record.condition_coverage;
                                }
                            }
                            None => {
                                line_index[idx].insert(record.number, file.lines.len());
                                file.lines.push(record);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_source {
                    if let Ok(text) = e.unescape() {
                        data.sources.push(text.to_string());
                    }
                    in_source = false;
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"source" => in_source = false,
                b"class" => current_file = None,
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(CovdeltaError::MalformedReport(
            "missing <coverage> root element".to_string(),
        ));
    }

    for file in &mut data.files {
        file.lines.sort_by_key(|l| l.number);
    }

    Ok(data)
}

fn parse_line(attrs: &HashMap<String, String>) -> Result<LineRecord> {
    let number = attrs
        .get("number")
        .and_then(|n| n.trim().parse::<u32>().ok())
        .ok_or_else(|| malformed_line(attrs, "number"))?;
    let hits = attrs
        .get("hits")
        .and_then(|h| h.trim().parse::<u64>().ok())
        .ok_or_else(|| malformed_line(attrs, "hits"))?;
    Ok(LineRecord {
        number,
        hits,
        condition_coverage: attrs.get("condition-coverage").cloned(),
    })
}

fn malformed_line(attrs: &HashMap<String, String>, attr: &str) -> CovdeltaError {
    CovdeltaError::MalformedReport(format!(
        "<line> has missing or invalid '{}' (number={})",
        attr,
        attrs.get("number").map(String::as_str).unwrap_or("?")
    ))
}

fn required_rate(attrs: &HashMap<String, String>, name: &str) -> Result<f64> {
    attrs
        .get(name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(|| {
            CovdeltaError::MalformedReport(format!(
                "<coverage> has missing or invalid '{}'",
                name
            ))
        })
}

/// Extract attributes from an XML element into a HashMap.
fn attr_map(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|a| {
            let attr = a.ok()?;
            let key = str::from_utf8(attr.key.local_name().into_inner())
                .ok()?
                .to_string();
            let value = attr.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}
