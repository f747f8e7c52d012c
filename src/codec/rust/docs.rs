use crate::codec::CodecError;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use pulldown_cmark_to_cmark::Options as CmarkOptions;

/// Reformat `docs` as `///` lines.
///
/// Code blocks without a language, and indented code blocks, are fenced and
/// tagged `text` so rustdoc does not compile them as Rust.
pub fn format_docs(id: &str, docs: &str) -> Result<Vec<String>, CodecError> {
    if docs.trim().is_empty() {
        return Ok(Vec::new());
    }
    let events: Vec<Event> = Parser::new_ext(docs, Options::empty())
        .map(|event| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)) => text_block(),
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) if lang.trim().is_empty() => {
                text_block()
            }
            other => other,
        })
        .collect();

    let mut options = CmarkOptions::default();
    options.code_block_token_count = 3;
    let mut output = String::new();
    pulldown_cmark_to_cmark::cmark_with_options(events.iter(), &mut output, options).map_err(
        |e| CodecError::Docs {
            id: id.to_string(),
            message: e.to_string(),
        },
    )?;

    Ok(output
        .trim_end()
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.is_empty() {
                "///".to_string()
            } else {
                format!("/// {line}")
            }
        })
        .collect())
}

fn text_block<'a>() -> Event<'a> {
    Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(CowStr::from("text"))))
}
