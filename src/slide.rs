// ABOUTME: Slide data model for the deckgen application
// ABOUTME: Typed slides, charts and the ordered deck produced by one generation

use serde::Serialize;
use serde_json::{json, Value};

/// Chart families a model may request. Unrecognized names become `Bar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
}

impl ChartKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "line" => ChartKind::Line,
            "pie" => ChartKind::Pie,
            "scatter" => ChartKind::Scatter,
            "area" => ChartKind::Area,
            _ => ChartKind::Bar,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "area",
        }
    }

    /// The chart shape actually drawn. There is no area renderer, so area
    /// charts are drawn as bars along with every other non line/pie/scatter kind.
    pub fn rendered(&self) -> ChartKind {
        match self {
            ChartKind::Line => ChartKind::Line,
            ChartKind::Pie => ChartKind::Pie,
            ChartKind::Scatter => ChartKind::Scatter,
            ChartKind::Bar | ChartKind::Area => ChartKind::Bar,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub data: Option<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualElement {
    pub kind: String,
    pub description: String,
    pub placement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonSide {
    pub title: String,
    pub points: Vec<String>,
}

/// Type-specific payload of a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideBody {
    Title {
        subtitle: Option<String>,
    },
    Content {
        content: Vec<String>,
        visual_elements: Vec<VisualElement>,
    },
    Data {
        content: Vec<String>,
        chart: Option<ChartSpec>,
    },
    Quote {
        quote: String,
        author: Option<String>,
        author_title: Option<String>,
    },
    Comparison {
        left: Option<ComparisonSide>,
        right: Option<ComparisonSide>,
    },
    Conclusion {
        content: Vec<String>,
        call_to_action: Option<String>,
    },
    /// A type the renderers do not know; laid out like `Content`.
    Other {
        kind: String,
        content: Vec<String>,
        visual_elements: Vec<VisualElement>,
    },
}

/// One slide of a deck.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideUnit {
    /// Zero-based position in the deck.
    pub id: usize,
    pub title: String,
    pub speaker_notes: String,
    pub layout_hint: String,
    pub transition_notes: String,
    pub design_notes: String,
    pub key_takeaway: Option<String>,
    pub body: SlideBody,
}

impl SlideUnit {
    /// The slide's type tag, preserved verbatim for unknown types.
    pub fn kind(&self) -> &str {
        match &self.body {
            SlideBody::Title { .. } => "title",
            SlideBody::Content { .. } => "content",
            SlideBody::Data { .. } => "data",
            SlideBody::Quote { .. } => "quote",
            SlideBody::Comparison { .. } => "comparison",
            SlideBody::Conclusion { .. } => "conclusion",
            SlideBody::Other { kind, .. } => kind.as_str(),
        }
    }

    /// Bullet points, for the slide types that carry them.
    pub fn bullets(&self) -> &[String] {
        match &self.body {
            SlideBody::Content { content, .. }
            | SlideBody::Data { content, .. }
            | SlideBody::Conclusion { content, .. }
            | SlideBody::Other { content, .. } => content,
            _ => &[],
        }
    }

    /// Serialize back into the generation schema (snake_case keys).
    pub fn to_json(&self) -> Value {
        let mut slide = json!({
            "id": self.id,
            "type": self.kind(),
            "title": self.title,
            "layout": self.layout_hint,
            "speaker_notes": self.speaker_notes,
            "transition_notes": self.transition_notes,
            "design_notes": self.design_notes,
            "key_takeaway": self.key_takeaway,
        });

        let extra = match &self.body {
            SlideBody::Title { subtitle } => json!({ "subtitle": subtitle }),
            SlideBody::Content {
                content,
                visual_elements,
            }
            | SlideBody::Other {
                content,
                visual_elements,
                ..
            } => json!({
                "content": content,
                "visual_elements": visual_elements.iter().map(visual_json).collect::<Vec<_>>(),
            }),
            SlideBody::Data { content, chart } => json!({
                "content": content,
                "chart": chart.as_ref().map(chart_json),
            }),
            SlideBody::Quote {
                quote,
                author,
                author_title,
            } => json!({
                "quote": quote,
                "author": author,
                "author_title": author_title,
            }),
            SlideBody::Comparison { left, right } => json!({
                "left_side": left.as_ref().map(side_json),
                "right_side": right.as_ref().map(side_json),
            }),
            SlideBody::Conclusion {
                content,
                call_to_action,
            } => json!({
                "content": content,
                "call_to_action": call_to_action,
            }),
        };

        if let (Some(slide_obj), Value::Object(extra_obj)) = (slide.as_object_mut(), extra) {
            slide_obj.extend(extra_obj);
        }
        slide
    }
}

fn visual_json(element: &VisualElement) -> Value {
    json!({
        "type": element.kind,
        "description": element.description,
        "placement": element.placement,
    })
}

fn chart_json(chart: &ChartSpec) -> Value {
    json!({
        "type": chart.kind.as_str(),
        "title": chart.title,
        "description": chart.description,
        "data": chart.data.as_ref().map(|series| json!({
            "name": series.name,
            "values": series.values,
            "labels": series.labels,
        })),
    })
}

fn side_json(side: &ComparisonSide) -> Value {
    json!({ "title": side.title, "points": side.points })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FontPairing {
    pub heading: String,
    pub body: String,
}

/// Descriptive metadata a model may attach to a deck. Not used by renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeckMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub color_scheme: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_pairing: Option<FontPairing>,
}

/// The validated result of one generation.
///
/// `theme` is always a key present in the theme catalog. Slide order is
/// presentation order and is never rearranged by a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideDocument {
    pub slides: Vec<SlideUnit>,
    pub theme: String,
    pub template: String,
    pub metadata: DeckMetadata,
}

impl SlideDocument {
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Slides serialized in the generation schema.
    pub fn slides_json(&self) -> Vec<Value> {
        self.slides.iter().map(SlideUnit::to_json).collect()
    }
}
