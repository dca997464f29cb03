// ABOUTME: PPTX generation module for the deckgen application
// ABOUTME: Lays out typed slides as shape trees and writes them into a PowerPoint package

use crate::errors::Result;
use crate::slide::{ChartKind, ChartSeries, ComparisonSide, SlideBody, SlideDocument, SlideUnit};
use crate::theme::ResolvedPalette;
use chrono::{DateTime, Utc};
use log::{debug, info};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::{write::FileOptions, ZipWriter};

/// 4:3 slide, in EMU.
pub const SLIDE_WIDTH_EMU: i64 = 9144000;
pub const SLIDE_HEIGHT_EMU: i64 = 6858000;

/// EMU per layout unit (one pixel at 96 dpi).
pub const EMU_PER_UNIT: i64 = 9525;

const BULLET_CHAR: &str = "\u{2022}";

/// Position and size of a shape, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Frame {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn xfrm(&self, tag: &str) -> String {
        format!(
            r#"<{tag}><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></{tag}>"#,
            self.x * EMU_PER_UNIT,
            self.y * EMU_PER_UNIT,
            self.width * EMU_PER_UNIT,
            self.height * EMU_PER_UNIT,
            tag = tag
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn attr(&self) -> &'static str {
        match self {
            Align::Left => "l",
            Align::Center => "ctr",
            Align::Right => "r",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bullet {
    /// Marker in the run's own color.
    Plain,
    /// Marker in the given hex color.
    Colored(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
    pub align: Align,
    pub bullet: Option<Bullet>,
    /// Space after the paragraph, in points.
    pub spacing_after: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub name: String,
    pub frame: Frame,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartShape {
    pub frame: Frame,
    /// Already narrowed to a drawable kind.
    pub kind: ChartKind,
    pub title: Option<String>,
    pub series: Option<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Text(TextBox),
    Chart(ChartShape),
}

/// Everything drawn on one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideLayout {
    pub background: String,
    pub shapes: Vec<Shape>,
    pub notes: Option<String>,
}

impl SlideLayout {
    pub fn text_boxes(&self) -> impl Iterator<Item = &TextBox> {
        self.shapes.iter().filter_map(|shape| match shape {
            Shape::Text(text) => Some(text),
            Shape::Chart(_) => None,
        })
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartShape> {
        self.shapes.iter().filter_map(|shape| match shape {
            Shape::Chart(chart) => Some(chart),
            Shape::Text(_) => None,
        })
    }
}

/// Document-level properties written into `docProps/core.xml`.
#[derive(Debug, Clone)]
pub struct PackageProperties<'a> {
    pub title: &'a str,
    pub created_at: DateTime<Utc>,
}

fn run(text: &str, size: u32, color: &str) -> TextRun {
    TextRun {
        text: text.to_string(),
        size,
        bold: false,
        italic: false,
        color: color.to_string(),
    }
}

fn paragraph(run: TextRun, align: Align) -> Paragraph {
    Paragraph {
        runs: vec![run],
        align,
        bullet: None,
        spacing_after: 0,
    }
}

fn single_line(name: &str, frame: Frame, paragraph: Paragraph) -> Shape {
    Shape::Text(TextBox {
        name: name.to_string(),
        frame,
        paragraphs: vec![paragraph],
    })
}

fn heading(title: &str, size: u32, palette: &ResolvedPalette) -> Shape {
    let mut title_run = run(title, size, &palette.primary);
    title_run.bold = true;
    single_line(
        "Title",
        Frame::new(50, 30, 900, 70),
        paragraph(title_run, Align::Left),
    )
}

struct BulletStyle<'a> {
    size: u32,
    color: &'a str,
    bold: bool,
    bullet: Bullet,
    spacing: u32,
}

fn bullet_paragraphs(items: &[String], style: &BulletStyle<'_>) -> Vec<Paragraph> {
    items
        .iter()
        .map(|item| {
            let mut item_run = run(item, style.size, style.color);
            item_run.bold = style.bold;
            Paragraph {
                runs: vec![item_run],
                align: Align::Left,
                bullet: Some(style.bullet.clone()),
                spacing_after: style.spacing,
            }
        })
        .collect()
}

fn bullet_box(name: &str, frame: Frame, items: &[String], style: &BulletStyle<'_>) -> Shape {
    Shape::Text(TextBox {
        name: name.to_string(),
        frame,
        paragraphs: bullet_paragraphs(items, style),
    })
}

fn comparison_column(
    name: &str,
    frame: Frame,
    side: &ComparisonSide,
    heading_color: &str,
    palette: &ResolvedPalette,
) -> Shape {
    let mut heading_run = run(&side.title, 24, heading_color);
    heading_run.bold = true;
    let mut paragraphs = vec![Paragraph {
        spacing_after: 10,
        ..paragraph(heading_run, Align::Left)
    }];
    paragraphs.extend(bullet_paragraphs(
        &side.points,
        &BulletStyle {
            size: 16,
            color: &palette.text,
            bold: false,
            bullet: Bullet::Plain,
            spacing: 8,
        },
    ));
    Shape::Text(TextBox {
        name: name.to_string(),
        frame,
        paragraphs,
    })
}

fn content_shapes(slide: &SlideUnit, content: &[String], palette: &ResolvedPalette) -> Vec<Shape> {
    let mut shapes = vec![heading(&slide.title, 32, palette)];
    if !content.is_empty() {
        shapes.push(bullet_box(
            "Content",
            Frame::new(75, 150, 850, 400),
            content,
            &BulletStyle {
                size: 20,
                color: &palette.text,
                bold: false,
                bullet: Bullet::Colored(palette.accent.clone()),
                spacing: 15,
            },
        ));
    }
    shapes
}

/// Lay out one slide. Geometry is fixed per slide type; unknown types use
/// the content layout.
pub fn layout_slide(slide: &SlideUnit, palette: &ResolvedPalette) -> SlideLayout {
    let shapes = match &slide.body {
        SlideBody::Title { subtitle } => {
            let mut title_run = run(&slide.title, 44, &palette.primary);
            title_run.bold = true;
            let mut shapes = vec![single_line(
                "Title",
                Frame::new(50, 200, 900, 150),
                paragraph(title_run, Align::Center),
            )];
            if let Some(subtitle) = subtitle {
                shapes.push(single_line(
                    "Subtitle",
                    Frame::new(50, 370, 900, 100),
                    paragraph(run(subtitle, 24, &palette.secondary), Align::Center),
                ));
            }
            shapes
        }
        SlideBody::Content { content, .. } | SlideBody::Other { content, .. } => {
            content_shapes(slide, content, palette)
        }
        SlideBody::Data { content, chart } => {
            let mut shapes = vec![heading(&slide.title, 32, palette)];
            if let Some(chart) = chart {
                shapes.push(Shape::Chart(ChartShape {
                    frame: Frame::new(100, 120, 450, 350),
                    kind: chart.kind.rendered(),
                    title: chart.title.clone(),
                    series: chart.data.clone(),
                }));
            }
            if !content.is_empty() {
                shapes.push(bullet_box(
                    "Content",
                    Frame::new(560, 120, 400, 350),
                    content,
                    &BulletStyle {
                        size: 18,
                        color: &palette.text,
                        bold: false,
                        bullet: Bullet::Colored(palette.accent.clone()),
                        spacing: 12,
                    },
                ));
            }
            shapes
        }
        SlideBody::Quote {
            quote,
            author,
            author_title,
        } => {
            let mut quote_run = run(&format!("\"{}\"", quote), 32, &palette.primary);
            quote_run.italic = true;
            let mut shapes = vec![single_line(
                "Quote",
                Frame::new(75, 150, 850, 300),
                paragraph(quote_run, Align::Center),
            )];
            if let Some(author) = author {
                let attribution = match author_title {
                    Some(title) => format!("\u{2014} {}, {}", author, title),
                    None => format!("\u{2014} {}", author),
                };
                shapes.push(single_line(
                    "Author",
                    Frame::new(75, 470, 850, 60),
                    paragraph(run(&attribution, 20, &palette.secondary), Align::Right),
                ));
            }
            shapes
        }
        SlideBody::Comparison { left, right } => {
            let mut shapes = vec![heading(&slide.title, 32, palette)];
            if let Some(left) = left {
                shapes.push(comparison_column(
                    "Left",
                    Frame::new(50, 120, 400, 400),
                    left,
                    &palette.primary,
                    palette,
                ));
            }
            if let Some(right) = right {
                shapes.push(comparison_column(
                    "Right",
                    Frame::new(520, 120, 400, 400),
                    right,
                    &palette.secondary,
                    palette,
                ));
            }
            shapes
        }
        SlideBody::Conclusion {
            content,
            call_to_action,
        } => {
            let mut shapes = vec![heading(&slide.title, 36, palette)];
            if !content.is_empty() {
                shapes.push(bullet_box(
                    "Content",
                    Frame::new(75, 130, 850, 300),
                    content,
                    &BulletStyle {
                        size: 22,
                        color: &palette.text,
                        bold: true,
                        bullet: Bullet::Colored(palette.accent.clone()),
                        spacing: 20,
                    },
                ));
            }
            if let Some(cta) = call_to_action {
                shapes.push(single_line(
                    "Call To Action",
                    Frame::new(75, 460, 850, 80),
                    paragraph(run(cta, 24, &palette.accent), Align::Center),
                ));
            }
            shapes
        }
    };

    let notes = Some(slide.speaker_notes.trim())
        .filter(|notes| !notes.is_empty())
        .map(str::to_string);

    SlideLayout {
        background: palette.background.clone(),
        shapes,
        notes,
    }
}

pub fn layout_document(document: &SlideDocument, palette: &ResolvedPalette) -> Vec<SlideLayout> {
    document
        .slides
        .iter()
        .map(|slide| layout_slide(slide, palette))
        .collect()
}

/// Render a deck straight to PPTX bytes.
pub fn render_pptx(
    document: &SlideDocument,
    palette: &ResolvedPalette,
    properties: &PackageProperties<'_>,
) -> Result<Vec<u8>> {
    write_package(&layout_document(document, palette), properties)
}

fn run_xml(text_run: &TextRun) -> String {
    format!(
        r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" i="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r>"#,
        text_run.size * 100,
        u8::from(text_run.bold),
        u8::from(text_run.italic),
        text_run.color,
        escape(text_run.text.as_str())
    )
}

fn paragraph_xml(para: &Paragraph) -> String {
    let indent = if para.bullet.is_some() {
        r#" marL="285750" indent="-285750""#
    } else {
        ""
    };
    let mut props = format!(r#"<a:pPr algn="{}"{}>"#, para.align.attr(), indent);
    if para.spacing_after > 0 {
        props.push_str(&format!(
            r#"<a:spcAft><a:spcPts val="{}"/></a:spcAft>"#,
            para.spacing_after * 100
        ));
    }
    match &para.bullet {
        Some(Bullet::Colored(color)) => props.push_str(&format!(
            r#"<a:buClr><a:srgbClr val="{}"/></a:buClr><a:buChar char="{}"/>"#,
            color, BULLET_CHAR
        )),
        Some(Bullet::Plain) => props.push_str(&format!(r#"<a:buChar char="{}"/>"#, BULLET_CHAR)),
        None => props.push_str("<a:buNone/>"),
    }
    props.push_str("</a:pPr>");

    let runs: String = para.runs.iter().map(run_xml).collect();
    format!("<a:p>{}{}</a:p>", props, runs)
}

fn text_box_xml(shape_id: usize, text_box: &TextBox) -> String {
    let paragraphs: String = text_box.paragraphs.iter().map(paragraph_xml).collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        id = shape_id,
        name = escape(text_box.name.as_str()),
        xfrm = text_box.frame.xfrm("a:xfrm"),
        paragraphs = paragraphs
    )
}

fn graphic_frame_xml(shape_id: usize, chart: &ChartShape, rel_id: &str) -> String {
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Chart {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>{xfrm}<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" r:id="{rel}"/></a:graphicData></a:graphic></p:graphicFrame>"#,
        id = shape_id,
        xfrm = chart.frame.xfrm("p:xfrm"),
        rel = rel_id
    )
}

fn series_labels(series: &ChartSeries) -> Vec<String> {
    (0..series.values.len())
        .map(|i| {
            series
                .labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| (i + 1).to_string())
        })
        .collect()
}

fn str_lit(values: &[String]) -> String {
    let points: String = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!(r#"<c:pt idx="{}"><c:v>{}</c:v></c:pt>"#, i, escape(v.as_str())))
        .collect();
    format!(
        r#"<c:strLit><c:ptCount val="{}"/>{}</c:strLit>"#,
        values.len(),
        points
    )
}

fn num_lit(values: &[f64]) -> String {
    let points: String = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!(r#"<c:pt idx="{}"><c:v>{}</c:v></c:pt>"#, i, v))
        .collect();
    format!(
        r#"<c:numLit><c:ptCount val="{}"/>{}</c:numLit>"#,
        values.len(),
        points
    )
}

fn chart_xml(chart: &ChartShape) -> String {
    let empty = ChartSeries {
        name: "Data".to_string(),
        values: Vec::new(),
        labels: Vec::new(),
    };
    let series = chart.series.as_ref().unwrap_or(&empty);
    let name = format!(
        r#"<c:tx><c:v>{}</c:v></c:tx>"#,
        escape(series.name.as_str())
    );
    let labels = str_lit(&series_labels(series));
    let values = num_lit(&series.values);

    let category_axes = r#"<c:catAx><c:axId val="111"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="b"/><c:crossAx val="222"/></c:catAx><c:valAx><c:axId val="222"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="l"/><c:crossAx val="111"/></c:valAx>"#;
    let value_axes = r#"<c:valAx><c:axId val="111"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="b"/><c:crossAx val="222"/></c:valAx><c:valAx><c:axId val="222"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="l"/><c:crossAx val="111"/></c:valAx>"#;
    let axis_ids = r#"<c:axId val="111"/><c:axId val="222"/>"#;

    let plot = match chart.kind {
        ChartKind::Line => format!(
            r#"<c:lineChart><c:grouping val="standard"/><c:varyColors val="0"/><c:ser><c:idx val="0"/><c:order val="0"/>{name}<c:cat>{labels}</c:cat><c:val>{values}</c:val></c:ser><c:marker val="1"/>{axis_ids}</c:lineChart>{axes}"#,
            name = name,
            labels = labels,
            values = values,
            axis_ids = axis_ids,
            axes = category_axes
        ),
        ChartKind::Pie => format!(
            r#"<c:pieChart><c:varyColors val="1"/><c:ser><c:idx val="0"/><c:order val="0"/>{name}<c:cat>{labels}</c:cat><c:val>{values}</c:val></c:ser><c:firstSliceAng val="0"/></c:pieChart>"#,
            name = name,
            labels = labels,
            values = values
        ),
        ChartKind::Scatter => {
            let xs: Vec<f64> = (1..=series.values.len()).map(|i| i as f64).collect();
            format!(
                r#"<c:scatterChart><c:scatterStyle val="lineMarker"/><c:varyColors val="0"/><c:ser><c:idx val="0"/><c:order val="0"/>{name}<c:xVal>{xs}</c:xVal><c:yVal>{values}</c:yVal></c:ser>{axis_ids}</c:scatterChart>{axes}"#,
                name = name,
                xs = num_lit(&xs),
                values = values,
                axis_ids = axis_ids,
                axes = value_axes
            )
        }
        ChartKind::Bar | ChartKind::Area => format!(
            r#"<c:barChart><c:barDir val="col"/><c:grouping val="clustered"/><c:varyColors val="0"/><c:ser><c:idx val="0"/><c:order val="0"/>{name}<c:cat>{labels}</c:cat><c:val>{values}</c:val></c:ser><c:gapWidth val="150"/>{axis_ids}</c:barChart>{axes}"#,
            name = name,
            labels = labels,
            values = values,
            axis_ids = axis_ids,
            axes = category_axes
        ),
    };

    let title = match &chart.title {
        Some(title) => format!(
            r#"<c:title><c:tx><c:rich><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></c:rich></c:tx><c:overlay val="0"/></c:title><c:autoTitleDeleted val="0"/>"#,
            escape(title.as_str())
        ),
        None => r#"<c:autoTitleDeleted val="1"/>"#.to_string(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><c:lang val="en-US"/><c:chart>{title}<c:plotArea><c:layout/>{plot}</c:plotArea><c:legend><c:legendPos val="b"/><c:overlay val="0"/></c:legend><c:plotVisOnly val="1"/></c:chart></c:chartSpace>"#,
        title = title,
        plot = plot
    )
}

fn notes_xml(notes: &str) -> String {
    let paragraphs: String = notes
        .lines()
        .map(|line| {
            format!(
                r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape(line)
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Notes Placeholder"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp></p:spTree></p:cSld></p:notes>"#,
        paragraphs
    )
}

const REL_CHART: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
const REL_NOTES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

fn relationships_xml(entries: &[(String, &str, String)]) -> String {
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for (id, kind, target) in entries {
        rels.push_str(&format!(
            r#"    <Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id, kind, target
        ));
        rels.push('\n');
    }
    rels.push_str("</Relationships>");
    rels
}

/// Parts belonging to one slide, with global chart numbering resolved.
struct SlideParts {
    slide_xml: String,
    rels: Vec<(String, &'static str, String)>,
    charts: Vec<(usize, String)>,
    notes: Option<String>,
}

fn slide_parts(layout: &SlideLayout, slide_num: usize, next_chart: &mut usize) -> SlideParts {
    let mut shapes = String::new();
    let mut rels = Vec::new();
    let mut charts = Vec::new();

    for (i, shape) in layout.shapes.iter().enumerate() {
        // id 1 is the group shape
        let shape_id = i + 2;
        match shape {
            Shape::Text(text_box) => shapes.push_str(&text_box_xml(shape_id, text_box)),
            Shape::Chart(chart) => {
                *next_chart += 1;
                let rel_id = format!("rId{}", rels.len() + 1);
                shapes.push_str(&graphic_frame_xml(shape_id, chart, &rel_id));
                rels.push((
                    rel_id,
                    REL_CHART,
                    format!("../charts/chart{}.xml", next_chart),
                ));
                charts.push((*next_chart, chart_xml(chart)));
            }
        }
    }

    if layout.notes.is_some() {
        rels.push((
            format!("rId{}", rels.len() + 1),
            REL_NOTES,
            format!("../notesSlides/notesSlide{}.xml", slide_num),
        ));
    }

    let slide_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{background}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        background = layout.background,
        shapes = shapes
    );

    SlideParts {
        slide_xml,
        rels,
        charts,
        notes: layout.notes.as_deref().map(notes_xml),
    }
}

/// Write laid-out slides into a PPTX package.
///
/// Output is byte-for-byte reproducible: every entry carries a fixed
/// timestamp and the only date in the package comes from `properties`.
pub fn write_package(layouts: &[SlideLayout], properties: &PackageProperties<'_>) -> Result<Vec<u8>> {
    info!("Creating PPTX package with {} slides", layouts.len());

    let options = FileOptions::default().last_modified_time(zip::DateTime::default());
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let mut next_chart = 0;
    let parts: Vec<SlideParts> = layouts
        .iter()
        .enumerate()
        .map(|(i, layout)| slide_parts(layout, i + 1, &mut next_chart))
        .collect();

    // [Content_Types].xml
    let mut overrides = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        overrides.push(format!(
            r#"    <Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            i + 1
        ));
        if part.notes.is_some() {
            overrides.push(format!(
                r#"    <Override PartName="/ppt/notesSlides/notesSlide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#,
                i + 1
            ));
        }
        for (chart_num, _) in &part.charts {
            overrides.push(format!(
                r#"    <Override PartName="/ppt/charts/chart{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawingml.chart+xml"/>"#,
                chart_num
            ));
        }
    }
    zip.start_file("[Content_Types].xml", options)?;
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
{}
</Types>"#,
        overrides.join("\n")
    );
    zip.write_all(content_types.as_bytes())?;

    // _rels/.rels
    zip.start_file("_rels/.rels", options)?;
    let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;
    zip.write_all(rels.as_bytes())?;

    // docProps/app.xml
    zip.start_file("docProps/app.xml", options)?;
    let app_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>deckgen</Application>
    <Slides>{}</Slides>
    <Notes>{}</Notes>
</Properties>"#,
        layouts.len(),
        parts.iter().filter(|part| part.notes.is_some()).count()
    );
    zip.write_all(app_xml.as_bytes())?;

    // docProps/core.xml
    zip.start_file("docProps/core.xml", options)?;
    let core_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>{}</dc:title>
    <dc:creator>deckgen</dc:creator>
    <dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
    <cp:revision>1</cp:revision>
</cp:coreProperties>"#,
        escape(properties.title),
        properties.created_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    zip.write_all(core_xml.as_bytes())?;

    // ppt/_rels/presentation.xml.rels
    zip.start_file("ppt/_rels/presentation.xml.rels", options)?;
    let slide_rels: Vec<(String, &str, String)> = (1..=parts.len())
        .map(|n| (format!("rId{}", n), REL_SLIDE, format!("slides/slide{}.xml", n)))
        .collect();
    zip.write_all(relationships_xml(&slide_rels).as_bytes())?;

    // ppt/presentation.xml
    zip.start_file("ppt/presentation.xml", options)?;
    let presentation_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
    <p:sldIdLst>
{slide_ids}
    </p:sldIdLst>
    <p:sldSz cx="{cx}" cy="{cy}" type="screen4x3"/>
    <p:notesSz cx="6858000" cy="9144000"/>
</p:presentation>"#,
        slide_ids = (0..parts.len())
            .map(|i| format!(r#"        <p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 1))
            .collect::<Vec<String>>()
            .join("\n"),
        cx = SLIDE_WIDTH_EMU,
        cy = SLIDE_HEIGHT_EMU
    );
    zip.write_all(presentation_xml.as_bytes())?;

    for (i, part) in parts.iter().enumerate() {
        let slide_num = i + 1;
        debug!("Writing slide {}", slide_num);

        zip.start_file(format!("ppt/slides/slide{}.xml", slide_num), options)?;
        zip.write_all(part.slide_xml.as_bytes())?;

        if !part.rels.is_empty() {
            zip.start_file(
                format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
                options,
            )?;
            zip.write_all(relationships_xml(&part.rels).as_bytes())?;
        }

        for (chart_num, xml) in &part.charts {
            zip.start_file(format!("ppt/charts/chart{}.xml", chart_num), options)?;
            zip.write_all(xml.as_bytes())?;
        }

        if let Some(notes) = &part.notes {
            zip.start_file(
                format!("ppt/notesSlides/notesSlide{}.xml", slide_num),
                options,
            )?;
            zip.write_all(notes.as_bytes())?;

            zip.start_file(
                format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", slide_num),
                options,
            )?;
            let back = vec![(
                "rId1".to_string(),
                REL_SLIDE,
                format!("../slides/slide{}.xml", slide_num),
            )];
            zip.write_all(relationships_xml(&back).as_bytes())?;
        }
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
