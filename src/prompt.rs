// ABOUTME: Prompt composition for the deckgen application
// ABOUTME: Builds the system prompt and the per-request instruction sent to the model

/// System prompt describing the exact JSON schema the model must return.
pub const SYSTEM_PROMPT: &str = r##"You are an expert presentation designer with deep knowledge in visual communication, data visualization, and storytelling.

Your task is to create a comprehensive, professional presentation that:
1. Structures information logically with a clear narrative flow
2. Uses data visualization where appropriate (charts, graphs, diagrams)
3. Includes relevant visual elements
4. Provides detailed speaker notes for each slide
5. Maintains visual hierarchy and design best practices

PRESENTATION REQUIREMENTS:
- Each slide should have a clear purpose
- Use the Rule of Three for bullet points
- Include title slide, content slides, and conclusion slide
- Speaker notes should be comprehensive and helpful

OUTPUT FORMAT (STRICT JSON):
{
  "slides": [
    {"type": "title", "title": "Main Title", "subtitle": "Optional subtitle", "layout": "title_slide",
     "speaker_notes": "Introduction and overview", "design_notes": "Suggested colors, images, or style"},
    {"type": "content", "title": "Slide Title", "content": ["Point 1", "Point 2", "Point 3"],
     "layout": "title_and_content",
     "visual_elements": [{"type": "image", "description": "Description for image generation", "placement": "right"}],
     "speaker_notes": "Detailed explanation for the presenter", "transition_notes": "How this connects to next slide"},
    {"type": "data", "title": "Data-Driven Slide", "content": ["Key insight", "Supporting evidence"],
     "layout": "title_chart_and_content",
     "chart": {"type": "bar|line|pie|scatter", "data": {"name": "Series", "labels": ["Q1", "Q2"], "values": [100, 150]},
               "title": "Chart Title", "description": "What the data shows"},
     "speaker_notes": "How to explain the data", "key_takeaway": "Main message from this slide"},
    {"type": "quote", "title": "Expert Opinion", "quote": "Meaningful quote", "author": "Author Name",
     "author_title": "Author credentials", "layout": "quote_slide", "speaker_notes": "Context of the quote"},
    {"type": "comparison", "title": "Comparison Slide",
     "left_side": {"title": "Option A", "points": ["Pro 1", "Pro 2"]},
     "right_side": {"title": "Option B", "points": ["Pro 1", "Pro 2"]},
     "layout": "two_column", "speaker_notes": "How to discuss the comparison"},
    {"type": "conclusion", "title": "Key Takeaways", "content": ["Conclusion 1", "Conclusion 2"],
     "call_to_action": "What the audience should do next", "layout": "conclusion_slide",
     "speaker_notes": "How to close powerfully"}
  ],
  "metadata": {
    "theme": "professional|creative|minimal|dark|colorful",
    "template": "modern|classic|business|academic|startup",
    "color_scheme": ["#primary", "#secondary", "#accent"],
    "font_pairing": {"heading": "Font name", "body": "Font name"},
    "estimated_duration_minutes": 15,
    "target_audience": "Description of intended audience",
    "key_message": "The one thing audience should remember"
  }
}

IMPORTANT: Return ONLY valid JSON, no markdown code blocks or additional text."##;

/// Inputs for one user instruction.
#[derive(Debug, Clone)]
pub struct PromptParts<'a> {
    pub prompt: &'a str,
    pub theme: &'a str,
    pub template: &'a str,
    pub slide_count: u32,
    pub research: &'a str,
    pub include_images: bool,
    pub include_data_placeholders: bool,
}

/// Clamp a requested slide count to `1..=max_slides`.
pub fn clamp_slide_count(requested: Option<u32>, default: u32, max_slides: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, max_slides.max(1))
}

/// Build the user instruction for the model.
pub fn compose_instruction(parts: &PromptParts<'_>) -> String {
    let mut instruction = format!("Create a comprehensive presentation on: {}\n\n", parts.prompt);
    instruction.push_str(&format!("Number of slides: {}\n", parts.slide_count));
    instruction.push_str(&format!("Theme: {}\n", parts.theme));
    instruction.push_str(&format!("Template style: {}\n\n", parts.template));

    if !parts.research.is_empty() {
        instruction.push_str(parts.research);
        instruction.push_str("\n\n");
    }

    if parts.include_images {
        instruction
            .push_str("Include image suggestions with detailed descriptions for AI generation.\n");
    }

    if parts.include_data_placeholders {
        instruction.push_str(
            "Include data visualization placeholders where statistics would enhance the message.\n",
        );
    }

    instruction.push_str("\nCreate a professional, engaging presentation that tells a compelling story.");
    instruction
}
