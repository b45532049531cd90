//! Corpus Flattener
//!
//! Turns the nested tips document into an ordered list of [`CorpusRecord`]s.
//! Order is document order, depth-first (category, tip, article), and ids are
//! `tip_0`, `tip_1`, ... scoped to a single call.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use super::types::{CorpusRecord, TipsDocument};
use crate::error::RetrievalError;

static TAG_RE: OnceLock<Regex> = OnceLock::new();
static WS_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("literal tag pattern"))
}

fn ws_re() -> &'static Regex {
    WS_RE.get_or_init(|| Regex::new(r"\s+").expect("literal whitespace pattern"))
}

/// Remove HTML tags without touching surrounding whitespace.
pub fn strip_tags(html: &str) -> String {
    tag_re().replace_all(html, "").into_owned()
}

/// Readable plain text for display: tags become spaces, whitespace runs
/// collapse, and the result is optionally cut to `max_chars` characters.
pub fn clean_html_text(text: &str, max_chars: Option<usize>) -> String {
    let spaced = tag_re().replace_all(text, " ");
    let collapsed = ws_re().replace_all(&spaced, " ");
    let trimmed = collapsed.trim();

    match max_chars {
        Some(limit) => trimmed.chars().take(limit).collect(),
        None => trimmed.to_string(),
    }
}

/// Flatten a tips document into searchable records.
///
/// Fails with [`RetrievalError::CorpusMalformed`] when a title or body is
/// missing, or a title is blank. The error names the offending node.
pub fn flatten(doc: &TipsDocument) -> Result<Vec<CorpusRecord>, RetrievalError> {
    let mut records = Vec::with_capacity(doc.article_count());
    let mut next_id = 0usize;

    for (ci, category) in doc.category.iter().enumerate() {
        let category_title = required_title(category.title.as_deref(), || {
            format!("category[{ci}].title")
        })?;
        let event_codes: BTreeSet<String> = category.event_codes.iter().cloned().collect();

        for (ti, tip) in category.tips.iter().enumerate() {
            let tip_title = required_title(tip.title.as_deref(), || {
                format!("category[{ci}].tips[{ti}].title")
            })?;

            for (ai, article) in tip.articles.iter().enumerate() {
                let article_title = required_title(article.title.as_deref(), || {
                    format!("category[{ci}].tips[{ti}].articles[{ai}].title")
                })?;
                let body_text = article.body_text.as_deref().ok_or_else(|| {
                    RetrievalError::CorpusMalformed(format!(
                        "missing category[{ci}].tips[{ti}].articles[{ai}].bodyText"
                    ))
                })?;

                let searchable_text = [
                    category_title,
                    tip_title,
                    article_title,
                    strip_tags(body_text).as_str(),
                ]
                .join(" ")
                .to_lowercase();

                records.push(CorpusRecord {
                    id: format!("tip_{next_id}"),
                    category_title: category_title.to_string(),
                    tip_title: tip_title.to_string(),
                    article_title: article_title.to_string(),
                    body_text: body_text.to_string(),
                    searchable_text,
                    event_codes: event_codes.clone(),
                    image: article.image.clone(),
                });
                next_id += 1;
            }
        }
    }

    Ok(records)
}

fn required_title<'a>(
    value: Option<&'a str>,
    path: impl FnOnce() -> String,
) -> Result<&'a str, RetrievalError> {
    match value {
        Some(title) if !title.trim().is_empty() => Ok(title),
        Some(_) => Err(RetrievalError::CorpusMalformed(format!("blank {}", path()))),
        None => Err(RetrievalError::CorpusMalformed(format!("missing {}", path()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::types::{Tip, TipArticle, TipCategory};

    fn article(title: &str, body: &str) -> TipArticle {
        TipArticle {
            title: Some(title.to_string()),
            body_text: Some(body.to_string()),
            ..Default::default()
        }
    }

    fn sample() -> TipsDocument {
        TipsDocument {
            category: vec![
                TipCategory {
                    title: Some("Feuer".into()),
                    event_codes: vec!["FIRE".into(), "SMOKE".into()],
                    tips: vec![Tip {
                        title: Some("Brandschutz".into()),
                        articles: vec![
                            article("Rauchmelder", "<b>Rauchmelder</b> testen"),
                            article("Fluchtwege", "Wege <i>frei</i> halten"),
                        ],
                    }],
                    ..Default::default()
                },
                TipCategory {
                    title: Some("Unwetter".into()),
                    tips: vec![Tip {
                        title: Some("Sturm".into()),
                        articles: vec![article("Vorbereitung", "Fenster schliessen")],
                    }],
                    ..Default::default()
                },
            ],
            last_modification_date: None,
        }
    }

    #[test]
    fn test_depth_first_order_and_ids() {
        let records = flatten(&sample()).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["tip_0", "tip_1", "tip_2"]);
        assert_eq!(records[0].article_title, "Rauchmelder");
        assert_eq!(records[1].article_title, "Fluchtwege");
        assert_eq!(records[2].tip_title, "Sturm");
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let doc = sample();
        let first = flatten(&doc).unwrap();
        let second = flatten(&doc).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_searchable_text_is_lowercase_and_tag_free() {
        let records = flatten(&sample()).unwrap();
        assert_eq!(
            records[0].searchable_text,
            "feuer brandschutz rauchmelder rauchmelder testen"
        );
        assert!(!records[1].searchable_text.contains('<'));
        // Raw body keeps its markup
        assert!(records[1].body_text.contains("<i>"));
    }

    #[test]
    fn test_event_codes_carried_per_category() {
        let records = flatten(&sample()).unwrap();
        assert!(records[0].event_codes.contains("FIRE"));
        assert!(records[2].event_codes.is_empty());
    }

    #[test]
    fn test_missing_body_is_malformed() {
        let mut doc = sample();
        doc.category[1].tips[0].articles[0].body_text = None;
        let err = flatten(&doc).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("category[1].tips[0].articles[0].bodyText"));
    }

    #[test]
    fn test_blank_tip_title_is_malformed() {
        let mut doc = sample();
        doc.category[0].tips[0].title = Some("   ".into());
        let err = flatten(&doc).unwrap_err();
        assert!(err.to_string().contains("blank category[0].tips[0].title"));
    }

    #[test]
    fn test_empty_document_flattens_to_nothing() {
        assert!(flatten(&TipsDocument::default()).unwrap().is_empty());
    }

    #[test]
    fn test_clean_html_text() {
        let text = "<p>Ruhe   bewahren</p><p>112\nanrufen</p>";
        assert_eq!(clean_html_text(text, None), "Ruhe bewahren 112 anrufen");
        assert_eq!(clean_html_text(text, Some(4)), "Ruhe");
        assert_eq!(clean_html_text("Übung", Some(2)), "Üb");
    }
}
