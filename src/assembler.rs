//! Rendering a classified transcript into a .docx binary.
//!
//! Assembly is the last, purely mechanical stage of the pipeline: all
//! decisions were made upstream (categories by the classifier, formatting by
//! the style extractor). Point sizes, fonts, alignment and indentation are
//! copied verbatim from the profile — no interpolation, no scaling. There is
//! no partial-failure mode: the result is a complete document or an
//! `Assembly` error.

use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, Paragraph, Run, RunFonts, SpecialIndentType};

use crate::error::{Error, Result};
use crate::rules::categorize_line;
use crate::style::{Alignment, Category, Indent, StyleDescriptor, StyleProfile};
use crate::transcript::{ClassifiedParagraph, TranscriptDocument};

/// Render `doc` into a complete .docx file.
///
/// Layout: centered title styled by the `Title` descriptor, one blank
/// separator paragraph, then one paragraph per classified paragraph. Run
/// font and size come from the paragraph's inferred category; bold/italic
/// come from the run flags.
pub fn assemble(doc: &TranscriptDocument, styles: &StyleProfile) -> Result<Vec<u8>> {
    let mut docx = Docx::new();

    docx = docx.add_paragraph(title_paragraph(&doc.title, styles.descriptor(Category::Title)));
    docx = docx.add_paragraph(Paragraph::new());

    for paragraph in &doc.paragraphs {
        docx = docx.add_paragraph(body_paragraph(paragraph, styles));
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|err| Error::assembly(format!("failed to pack document container: {err}")))?;
    Ok(cursor.into_inner())
}

/// The title is always centered; an empty title still produces a (blank)
/// heading paragraph so the layout stays stable.
fn title_paragraph(title: &str, style: &StyleDescriptor) -> Paragraph {
    let mut paragraph = Paragraph::new().align(AlignmentType::Center);
    if !title.is_empty() {
        paragraph = paragraph.add_run(styled_run(title, style.bold, style.italic, style));
    }
    paragraph
}

fn body_paragraph(paragraph: &ClassifiedParagraph, styles: &StyleProfile) -> Paragraph {
    let category = categorize_line(&paragraph.text);
    let style = styles.descriptor(category);

    let mut out = Paragraph::new().align(alignment_type(style.alignment));
    out = apply_indent(out, style.indent);

    if paragraph.runs.is_empty() {
        // Never drop content: an unadorned paragraph renders as one run
        // carrying the full text with the category's own emphasis.
        return out.add_run(styled_run(&paragraph.text, style.bold, style.italic, style));
    }

    for run in &paragraph.runs {
        out = out.add_run(styled_run(&run.text, run.bold, run.italic, style));
    }
    out
}

fn styled_run(text: &str, bold: bool, italic: bool, style: &StyleDescriptor) -> Run {
    let mut run = Run::new()
        .add_text(text)
        .size((style.point_size * 2.0) as usize)
        .fonts(RunFonts::new().ascii(&style.font_family));
    if bold {
        run = run.bold();
    }
    if italic {
        run = run.italic();
    }
    run
}

fn alignment_type(alignment: Alignment) -> AlignmentType {
    match alignment {
        Alignment::Left => AlignmentType::Left,
        Alignment::Center => AlignmentType::Center,
        Alignment::Right => AlignmentType::Right,
        Alignment::Justified => AlignmentType::Both,
    }
}

fn apply_indent(paragraph: Paragraph, indent: Indent) -> Paragraph {
    match indent {
        Indent::None => paragraph,
        Indent::Start(twips) => paragraph.indent(Some(twips), None, None, None),
        Indent::FirstLine(twips) => {
            paragraph.indent(None, Some(SpecialIndentType::FirstLine(twips)), None, None)
        }
    }
}
