// ABOUTME: HTML generation module for the deckgen application
// ABOUTME: Renders a deck as one self-contained page with keyboard navigation

use crate::slide::{SlideBody, SlideDocument, SlideUnit};
use crate::theme::ResolvedPalette;
use log::info;
use quick_xml::escape::escape;

const NAVIGATION_SCRIPT: &str = r#"<script>
        let currentSlide = 0;
        const slides = document.querySelectorAll('.slide');
        const totalSlides = slides.length;

        function showSlide(index) {
            slides.forEach(s => s.classList.remove('active'));
            slides[index].classList.add('active');
            document.getElementById('currentSlide').textContent = index + 1;
            document.getElementById('prevBtn').disabled = index === 0;
            document.getElementById('nextBtn').disabled = index === totalSlides - 1;
        }

        function nextSlide() {
            if (currentSlide < totalSlides - 1) {
                currentSlide++;
                showSlide(currentSlide);
            }
        }

        function previousSlide() {
            if (currentSlide > 0) {
                currentSlide--;
                showSlide(currentSlide);
            }
        }

        document.addEventListener('keydown', (e) => {
            if (e.key === 'ArrowRight' || e.key === ' ') {
                e.preventDefault();
                nextSlide();
            } else if (e.key === 'ArrowLeft') {
                e.preventDefault();
                previousSlide();
            }
        });

        if (totalSlides > 0) {
            showSlide(0);
        }
    </script>"#;

fn stylesheet(palette: &ResolvedPalette) -> String {
    format!(
        r#"<style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; overflow: hidden; }}
        .presentation {{ width: 100vw; height: 100vh; position: relative; }}
        .slide {{
            width: 100%;
            height: 100%;
            display: none;
            padding: 60px 80px;
            background: #{background};
            color: #{text};
        }}
        .slide.active {{ display: flex; flex-direction: column; }}
        .slide h1 {{ color: #{primary}; font-size: 3em; margin-bottom: 30px; }}
        .slide h2 {{ color: #{secondary}; font-size: 2em; margin-bottom: 20px; }}
        .slide ul {{ list-style: none; }}
        .slide li {{
            font-size: 1.5em;
            margin: 15px 0;
            padding-left: 30px;
            position: relative;
        }}
        .slide li:before {{
            content: '\2022';
            color: #{accent};
            font-weight: bold;
            position: absolute;
            left: 0;
        }}
        .navigation {{
            position: fixed;
            bottom: 30px;
            left: 50%;
            transform: translateX(-50%);
            display: flex;
            gap: 20px;
            z-index: 100;
        }}
        .nav-btn {{
            background: #{primary};
            color: white;
            border: none;
            padding: 10px 20px;
            border-radius: 5px;
            cursor: pointer;
            font-size: 16px;
        }}
        .nav-btn:hover {{ opacity: 0.8; }}
        .nav-btn:disabled {{ opacity: 0.3; cursor: not-allowed; }}
        .slide-counter {{
            position: fixed;
            bottom: 30px;
            right: 30px;
            color: #{secondary};
            font-size: 18px;
        }}
    </style>"#,
        background = palette.background,
        text = palette.text,
        primary = palette.primary,
        secondary = palette.secondary,
        accent = palette.accent
    )
}

/// One slide block. Only title and quote slides have their own markup;
/// everything else is a heading plus bullet list. Speaker notes are never
/// rendered here.
fn slide_html(slide: &SlideUnit, palette: &ResolvedPalette) -> String {
    let mut html = format!("<div class=\"slide\" data-index=\"{}\">\n", slide.id);

    match &slide.body {
        SlideBody::Title { subtitle } => {
            html.push_str("<div style=\"text-align: center; margin: auto;\">\n");
            html.push_str(&format!("<h1>{}</h1>\n", escape(slide.title.as_str())));
            if let Some(subtitle) = subtitle {
                html.push_str(&format!("<h2>{}</h2>\n", escape(subtitle.as_str())));
            }
            html.push_str("</div>\n");
        }
        SlideBody::Quote {
            quote,
            author,
            author_title,
        } => {
            html.push_str(
                "<div style=\"text-align: center; margin: auto; max-width: 800px;\">\n",
            );
            html.push_str(&format!(
                "<p style=\"font-size: 2em; font-style: italic; color: #{};\">\"{}\"</p>\n",
                palette.primary,
                escape(quote.as_str())
            ));
            if let Some(author) = author {
                let mut attribution = format!("\u{2014} {}", escape(author.as_str()));
                if let Some(title) = author_title {
                    attribution.push_str(&format!(", {}", escape(title.as_str())));
                }
                html.push_str(&format!(
                    "<p style=\"margin-top: 30px; font-size: 1.5em; color: #{};\">{}</p>\n",
                    palette.secondary, attribution
                ));
            }
            html.push_str("</div>\n");
        }
        _ => {
            html.push_str(&format!("<h1>{}</h1>\n", escape(slide.title.as_str())));
            let bullets = slide.bullets();
            if !bullets.is_empty() {
                html.push_str("<ul>\n");
                for point in bullets {
                    html.push_str(&format!("<li>{}</li>\n", escape(point.as_str())));
                }
                html.push_str("</ul>\n");
            }
        }
    }

    html.push_str("</div>\n");
    html
}

/// Generate a standalone HTML deck. All slides are in the DOM; the script
/// shows one at a time.
pub fn render_html(document: &SlideDocument, palette: &ResolvedPalette, title: &str) -> String {
    info!("Generating HTML deck with {} slides", document.len());

    let mut html_doc = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html_doc.push_str("<meta charset=\"UTF-8\">\n");
    html_doc.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html_doc.push_str(&format!("<title>{}</title>\n", escape(title)));
    html_doc.push_str(&stylesheet(palette));
    html_doc.push_str("\n</head>\n<body>\n");

    html_doc.push_str("<div class=\"presentation\">\n");
    for slide in &document.slides {
        html_doc.push_str(&slide_html(slide, palette));
    }
    html_doc.push_str("</div>\n");

    html_doc.push_str("<div class=\"navigation\">\n");
    html_doc.push_str(
        "<button class=\"nav-btn\" id=\"prevBtn\" onclick=\"previousSlide()\">\u{25C0} Previous</button>\n",
    );
    html_doc.push_str(
        "<button class=\"nav-btn\" id=\"nextBtn\" onclick=\"nextSlide()\">Next \u{25B6}</button>\n",
    );
    html_doc.push_str("</div>\n");

    html_doc.push_str(&format!(
        "<div class=\"slide-counter\"><span id=\"currentSlide\">1</span> / <span id=\"totalSlides\">{}</span></div>\n",
        document.len()
    ));

    html_doc.push_str(NAVIGATION_SCRIPT);
    html_doc.push_str("\n</body>\n</html>");

    html_doc
}
