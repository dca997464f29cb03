// ABOUTME: Slide document parser for the deckgen application
// ABOUTME: Decodes model-authored JSON into a typed deck, defaulting every missing field

use crate::errors::{DeckError, Result};
use crate::slide::{
    ChartKind, ChartSeries, ChartSpec, ComparisonSide, DeckMetadata, FontPairing, SlideBody,
    SlideDocument, SlideUnit, VisualElement,
};
use crate::theme::ThemeCatalog;
use log::debug;
use serde_json::{Map, Value};

pub const UNTITLED_SLIDE: &str = "Untitled Slide";
pub const DEFAULT_SLIDE_TYPE: &str = "content";

type Object = Map<String, Value>;

/// Parse the fully accumulated model output.
///
/// Only two things are fatal: the text is not JSON, or it has no `slides`
/// array. Everything below that is optional and defaulted. Theme and template
/// come from `metadata` (or the top level), falling back to the caller's values.
pub fn parse_document(
    content: &str,
    catalog: &ThemeCatalog,
    fallback_theme: &str,
    fallback_template: &str,
) -> Result<SlideDocument> {
    let payload = strip_code_fence(content);
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| DeckError::MalformedGenerationOutput(format!("invalid JSON: {}", e)))?;
    parse_value(&value, catalog, fallback_theme, fallback_template)
}

/// Parse an already decoded JSON value. Used for stored decks as well.
pub fn parse_value(
    value: &Value,
    catalog: &ThemeCatalog,
    fallback_theme: &str,
    fallback_template: &str,
) -> Result<SlideDocument> {
    let root = value.as_object().ok_or_else(|| {
        DeckError::MalformedGenerationOutput("top level is not a JSON object".to_string())
    })?;

    let slides = match root.get("slides") {
        Some(Value::Array(slides)) => slides,
        Some(_) => {
            return Err(DeckError::MalformedGenerationOutput(
                "`slides` is not an array".to_string(),
            ))
        }
        None => {
            return Err(DeckError::MalformedGenerationOutput(
                "missing `slides` array".to_string(),
            ))
        }
    };

    let empty = Object::new();
    let metadata = match root.get("metadata") {
        Some(Value::Object(meta)) => meta,
        _ => &empty,
    };

    let theme = string_field(metadata, &["theme"])
        .or_else(|| string_field(root, &["theme"]))
        .unwrap_or_else(|| fallback_theme.to_string());
    let template = string_field(metadata, &["template"])
        .or_else(|| string_field(root, &["template"]))
        .unwrap_or_else(|| fallback_template.to_string());

    let slides: Vec<SlideUnit> = slides
        .iter()
        .enumerate()
        .map(|(index, slide)| match slide {
            Value::Object(obj) => parse_slide(index, obj),
            _ => parse_slide(index, &empty),
        })
        .collect();

    debug!("Parsed {} slides (theme={}, template={})", slides.len(), theme, template);

    Ok(SlideDocument {
        slides,
        theme: catalog.canonicalize(&theme),
        template,
        metadata: parse_metadata(metadata),
    })
}

fn parse_slide(index: usize, obj: &Object) -> SlideUnit {
    let kind = string_field(obj, &["type"]).unwrap_or_else(|| DEFAULT_SLIDE_TYPE.to_string());

    let body = match kind.trim().to_lowercase().as_str() {
        "title" => SlideBody::Title {
            subtitle: string_field(obj, &["subtitle"]),
        },
        "content" => SlideBody::Content {
            content: string_list(obj, &["content"]),
            visual_elements: visual_elements(obj),
        },
        "data" => SlideBody::Data {
            content: string_list(obj, &["content"]),
            chart: lookup(obj, &["chart"]).and_then(parse_chart),
        },
        "quote" => SlideBody::Quote {
            quote: string_field(obj, &["quote"]).unwrap_or_default(),
            author: string_field(obj, &["author"]),
            author_title: string_field(obj, &["author_title", "authorTitle"]),
        },
        "comparison" => SlideBody::Comparison {
            left: lookup(obj, &["left_side", "leftSide"]).and_then(parse_side),
            right: lookup(obj, &["right_side", "rightSide"]).and_then(parse_side),
        },
        "conclusion" => SlideBody::Conclusion {
            content: string_list(obj, &["content"]),
            call_to_action: string_field(obj, &["call_to_action", "callToAction"]),
        },
        _ => SlideBody::Other {
            kind,
            content: string_list(obj, &["content"]),
            visual_elements: visual_elements(obj),
        },
    };

    SlideUnit {
        id: index,
        title: string_field(obj, &["title"]).unwrap_or_else(|| UNTITLED_SLIDE.to_string()),
        speaker_notes: text_field(obj, &["speaker_notes", "speakerNotes"]),
        layout_hint: text_field(obj, &["layout", "layout_hint", "layoutHint"]),
        transition_notes: text_field(obj, &["transition_notes", "transitionNotes"]),
        design_notes: text_field(obj, &["design_notes", "designNotes"]),
        key_takeaway: string_field(obj, &["key_takeaway", "keyTakeaway"]),
        body,
    }
}

fn parse_chart(value: &Value) -> Option<ChartSpec> {
    let obj = non_empty_object(value)?;
    let kind = string_field(obj, &["type", "kind"])
        .map(|name| ChartKind::from_name(&name))
        .unwrap_or(ChartKind::Bar);

    let data = lookup(obj, &["data"])
        .and_then(Value::as_object)
        .map(|data| ChartSeries {
            name: string_field(data, &["name"]).unwrap_or_else(|| "Data".to_string()),
            values: number_list(data, &["values"]),
            labels: string_list(data, &["labels"]),
        });

    Some(ChartSpec {
        kind,
        title: string_field(obj, &["title"]),
        description: string_field(obj, &["description"]),
        data,
    })
}

fn parse_side(value: &Value) -> Option<ComparisonSide> {
    let obj = non_empty_object(value)?;
    Some(ComparisonSide {
        title: text_field(obj, &["title"]),
        points: string_list(obj, &["points"]),
    })
}

fn visual_elements(obj: &Object) -> Vec<VisualElement> {
    match lookup(obj, &["visual_elements", "visualElements"]) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| VisualElement {
                kind: text_field(item, &["type", "kind"]),
                description: text_field(item, &["description"]),
                placement: text_field(item, &["placement"]),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_metadata(meta: &Object) -> DeckMetadata {
    let font_pairing = lookup(meta, &["font_pairing", "fontPairing"])
        .and_then(non_empty_object)
        .map(|fonts| FontPairing {
            heading: text_field(fonts, &["heading"]),
            body: text_field(fonts, &["body"]),
        });

    DeckMetadata {
        estimated_duration_minutes: lookup(
            meta,
            &["estimated_duration_minutes", "estimatedDurationMinutes"],
        )
        .and_then(as_number)
        .filter(|minutes| *minutes >= 0.0)
        .map(|minutes| minutes.round() as u32),
        target_audience: string_field(meta, &["target_audience", "targetAudience"]),
        key_message: string_field(meta, &["key_message", "keyMessage"]),
        color_scheme: string_list(meta, &["color_scheme", "colorScheme"]),
        font_pairing,
    }
}

/// Remove a Markdown code fence wrapped around the payload, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// First non-null value among `keys`.
fn lookup<'a>(obj: &'a Object, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn non_empty_object(value: &Value) -> Option<&Object> {
    value.as_object().filter(|obj| !obj.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Optional text; blank strings count as absent.
fn string_field(obj: &Object, keys: &[&str]) -> Option<String> {
    lookup(obj, keys)
        .and_then(scalar_text)
        .filter(|s| !s.trim().is_empty())
}

fn text_field(obj: &Object, keys: &[&str]) -> String {
    lookup(obj, keys).and_then(scalar_text).unwrap_or_default()
}

fn string_list(obj: &Object, keys: &[&str]) -> Vec<String> {
    match lookup(obj, keys) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn number_list(obj: &Object, keys: &[&str]) -> Vec<f64> {
    match lookup(obj, keys) {
        Some(Value::Array(items)) => items.iter().filter_map(as_number).collect(),
        _ => Vec::new(),
    }
}
