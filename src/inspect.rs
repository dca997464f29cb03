// ABOUTME: PPTX inspection for the deckgen application
// ABOUTME: Reads a written package back into per-slide shape, chart and notes summaries

use crate::errors::{DeckError, Result};
use crate::pptx::{Frame, EMU_PER_UNIT};
use crate::utils::validate_file_exists;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectedChart {
    /// `bar`, `line`, `pie` or `scatter`.
    pub kind: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl InspectedChart {
    pub fn frame(&self) -> Frame {
        Frame::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectedSlide {
    pub number: usize,
    pub text_shapes: usize,
    pub charts: Vec<InspectedChart>,
    pub has_notes: bool,
    pub background: Option<String>,
    pub texts: Vec<String>,
}

impl InspectedSlide {
    pub fn shape_count(&self) -> usize {
        self.text_shapes + self.charts.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSummary {
    pub slides: Vec<InspectedSlide>,
}

impl PackageSummary {
    pub fn shape_count(&self) -> usize {
        self.slides.iter().map(InspectedSlide::shape_count).sum()
    }
}

pub fn inspect_file(path: &Path) -> Result<PackageSummary> {
    validate_file_exists(path)?;
    inspect_package(std::fs::File::open(path)?)
}

pub fn inspect_bytes(bytes: &[u8]) -> Result<PackageSummary> {
    inspect_package(std::io::Cursor::new(bytes))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn emu_attribute(element: &BytesStart<'_>, name: &str) -> Result<i64> {
    let raw = attribute(element, name)?.unwrap_or_default();
    let emu: i64 = raw
        .parse()
        .map_err(|_| DeckError::XmlError(format!("Invalid {} value: {}", name, raw)))?;
    Ok(emu / EMU_PER_UNIT)
}

/// Relationship id -> target, for one `.rels` part.
fn relationships(xml: &str) -> Result<HashMap<String, (String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(kind), Some(target)) = (
                    attribute(&e, "Id")?,
                    attribute(&e, "Type")?,
                    attribute(&e, "Target")?,
                ) {
                    rels.insert(id, (kind, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

fn chart_kind(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let kind = match e.name().as_ref() {
                    b"c:barChart" => Some("bar"),
                    b"c:lineChart" => Some("line"),
                    b"c:pieChart" => Some("pie"),
                    b"c:scatterChart" => Some("scatter"),
                    b"c:areaChart" => Some("area"),
                    _ => None,
                };
                if let Some(kind) = kind {
                    return Ok(kind.to_string());
                }
            }
            Event::Eof => return Ok("unknown".to_string()),
            _ => {}
        }
    }
}

/// Resolve a slide-relative target like `../charts/chart1.xml`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix("../") {
        Some(rest) => format!("ppt/{}", rest),
        None => format!("ppt/slides/{}", target),
    }
}

struct PendingFrame {
    frame: Option<Frame>,
    rel_id: Option<String>,
}

fn inspect_slide<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    number: usize,
    slide_xml: &str,
) -> Result<InspectedSlide> {
    let rels = match read_part(archive, &format!("ppt/slides/_rels/slide{}.xml.rels", number))? {
        Some(xml) => relationships(&xml)?,
        None => HashMap::new(),
    };
    let has_notes = rels
        .values()
        .any(|(kind, _)| kind.ends_with("/notesSlide"));

    let mut reader = Reader::from_str(slide_xml);
    let mut text_shapes = 0;
    let mut frames = Vec::new();
    let mut pending: Option<PendingFrame> = None;
    let mut in_background = false;
    let mut background = None;
    let mut in_text = false;
    let mut texts = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"p:sp" => text_shapes += 1,
                b"p:bg" => in_background = true,
                b"a:srgbClr" if in_background && background.is_none() => {
                    background = attribute(&e, "val")?;
                }
                b"p:graphicFrame" => {
                    pending = Some(PendingFrame {
                        frame: None,
                        rel_id: None,
                    })
                }
                b"a:off" => {
                    if let Some(current) = pending.as_mut() {
                        let x = emu_attribute(&e, "x")?;
                        let y = emu_attribute(&e, "y")?;
                        current.frame = Some(Frame::new(x, y, 0, 0));
                    }
                }
                b"a:ext" => {
                    if let Some(frame) = pending.as_mut().and_then(|p| p.frame.as_mut()) {
                        frame.width = emu_attribute(&e, "cx")?;
                        frame.height = emu_attribute(&e, "cy")?;
                    }
                }
                b"c:chart" => {
                    if let Some(current) = pending.as_mut() {
                        current.rel_id = attribute(&e, "r:id")?;
                    }
                }
                b"a:t" => in_text = true,
                _ => {}
            },
            Event::Text(t) if in_text => texts.push(t.unescape()?.into_owned()),
            Event::End(e) => match e.name().as_ref() {
                b"p:bg" => in_background = false,
                b"a:t" => in_text = false,
                b"p:graphicFrame" => {
                    if let Some(done) = pending.take() {
                        frames.push(done);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let mut charts = Vec::new();
    for done in frames {
        let target = done
            .rel_id
            .as_ref()
            .and_then(|id| rels.get(id))
            .map(|(_, target)| resolve_target(target));
        let kind = match target {
            Some(part) => match read_part(archive, &part)? {
                Some(xml) => chart_kind(&xml)?,
                None => "missing".to_string(),
            },
            None => "unknown".to_string(),
        };
        let frame = done.frame.unwrap_or(Frame::new(0, 0, 0, 0));
        charts.push(InspectedChart {
            kind,
            x: frame.x,
            y: frame.y,
            width: frame.width,
            height: frame.height,
        });
    }

    Ok(InspectedSlide {
        number,
        text_shapes,
        charts,
        has_notes,
        background,
        texts,
    })
}

/// Walk `ppt/slides/slide1.xml`, `slide2.xml`, ... until one is missing.
pub fn inspect_package<R: Read + Seek>(reader: R) -> Result<PackageSummary> {
    let mut archive = ZipArchive::new(reader)?;
    let mut slides = Vec::new();

    let mut number = 1;
    while let Some(slide_xml) = read_part(&mut archive, &format!("ppt/slides/slide{}.xml", number))? {
        slides.push(inspect_slide(&mut archive, number, &slide_xml)?);
        number += 1;
    }

    if slides.is_empty() && read_part(&mut archive, "ppt/presentation.xml")?.is_none() {
        return Err(DeckError::PptxError(
            "archive is not a presentation package".to_string(),
        ));
    }

    Ok(PackageSummary { slides })
}
