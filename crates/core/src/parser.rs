use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::capture::CaptureInput;
use crate::dates::{self, DuePhrase};
use crate::error::CaptureError;
use crate::model::{NewTask, ParsedTask};

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{4})-([0-9]{2})-([0-9]{2})").expect("valid regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\S+)").expect("valid regex"));

/// One pattern per phrase token, in priority then table order. ASCII tokens
/// only match whole words; the Japanese ones match anywhere.
static PHRASE_RES: Lazy<Vec<(DuePhrase, Regex)>> = Lazy::new(|| {
    DuePhrase::PRIORITY
        .into_iter()
        .flat_map(|phrase| {
            phrase
                .tokens()
                .iter()
                .map(move |token| (phrase, token_regex(token)))
        })
        .collect()
});

fn token_regex(token: &str) -> Regex {
    let escaped = regex::escape(token);
    let pattern = if token.is_ascii() {
        format!(r"\b{}\b", escaped)
    } else {
        escaped
    };
    Regex::new(&pattern).expect("valid regex")
}

/// Decompose one line of capture text into a title, an optional due date and tags.
///
/// Total over every input: an empty title is returned as-is and rejected later
/// by [`crate::operations::validate_title`]. `today` anchors relative phrases,
/// so the output is reproducible for a frozen date.
pub fn parse_task_text(input: &str, today: NaiveDate) -> ParsedTask {
    let (due_date, remaining) = extract_due_date(input, today);
    let (tags, remaining) = extract_tags(&remaining);

    ParsedTask {
        title: remaining.trim().to_string(),
        due_date,
        tags,
    }
}

/// Merge the parsed text with the explicit flags of a capture request.
pub fn prepare_new_task(input: &CaptureInput, today: NaiveDate) -> Result<NewTask, CaptureError> {
    input.require_text()?;
    let parsed = parse_task_text(&input.text.join(" "), today);

    let due_date = match input.due.as_deref() {
        Some(spec) => Some(
            dates::parse_due(spec, today)
                .ok_or_else(|| CaptureError::InvalidDue(spec.trim().to_string()))?,
        ),
        None => parsed.due_date,
    };

    let mut tags = parsed.tags;
    tags.extend(normalize_labels(&input.tags));

    Ok(NewTask {
        title: parsed.title,
        description: input
            .description
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        quadrant: input.quadrant,
        due_date,
        tags,
    })
}

fn extract_due_date(input: &str, today: NaiveDate) -> (Option<NaiveDate>, String) {
    if let Some((phrase, re)) = PHRASE_RES.iter().find(|(_, re)| re.is_match(input)) {
        let remaining = re.replace_all(input, "");
        return (Some(phrase.resolve(today)), remaining.trim().to_string());
    }

    for caps in ISO_DATE_RE.captures_iter(input) {
        let Some(date) = calendar_date(&caps[1], &caps[2], &caps[3]) else {
            continue;
        };
        let Some(found) = caps.get(0) else {
            continue;
        };
        let mut remaining = String::with_capacity(input.len());
        remaining.push_str(&input[..found.start()]);
        remaining.push_str(&input[found.end()..]);
        return (Some(date), remaining.trim().to_string());
    }

    (None, input.to_string())
}

fn calendar_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn extract_tags(input: &str) -> (Vec<String>, String) {
    let tags = TAG_RE
        .captures_iter(input)
        .map(|caps| caps[1].to_string())
        .collect();
    let remaining = TAG_RE.replace_all(input, "").trim().to_string();
    (tags, remaining)
}

/// Trim labels given as flags and drop a leading `#`; blanks are skipped.
pub fn normalize_labels(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().trim_start_matches('#').to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Quadrant;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    // A Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 11).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn plain_text_is_title_only() {
        let parsed = parse_task_text("  買い物に行く  ", today());
        assert_eq!(parsed.title, "買い物に行く");
        assert_eq!(parsed.due_date, None);
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn extracts_tomorrow_and_tag() {
        let parsed = parse_task_text("明日 買い物に行く #仕事", today());
        assert_eq!(
            parsed,
            ParsedTask {
                title: "買い物に行く".into(),
                due_date: Some(date(2026, 2, 12)),
                tags: vec!["仕事".into()],
            }
        );
    }

    #[test]
    fn leading_tags_are_collected_in_order() {
        let parsed = parse_task_text("#重要 #緊急 タスクを完了する", today());
        assert_eq!(parsed.title, "タスクを完了する");
        assert_eq!(parsed.tags, vec!["重要", "緊急"]);
        assert_eq!(parsed.due_date, None);
    }

    #[test]
    fn mixed_phrase_and_tags() {
        let parsed = parse_task_text("来週 #プロジェクト 新機能を実装する #優先度高", today());
        assert_eq!(parsed.title, "新機能を実装する");
        assert_eq!(parsed.due_date, Some(date(2026, 2, 16)));
        assert_eq!(parsed.tags, vec!["プロジェクト", "優先度高"]);
    }

    #[rstest]
    #[case("", "", None, 0)]
    #[case("#タグのみ", "", None, 1)]
    #[case("明日", "", Some(date(2026, 2, 12)), 0)]
    #[case("今週末 レポートを書く", "レポートを書く", Some(date(2026, 2, 14)), 0)]
    #[case("call mom tomorrow", "call mom", Some(date(2026, 2, 12)), 0)]
    #[case("plan trip this weekend #travel", "plan trip", Some(date(2026, 2, 14)), 1)]
    #[case("Book tomorrowland tickets", "Book tomorrowland tickets", None, 0)]
    #[case("tomorrows list", "tomorrows list", None, 0)]
    #[case("明日までに提出", "までに提出", Some(date(2026, 2, 12)), 0)]
    #[case("pay rent tomorrow, then relax", "pay rent , then relax", Some(date(2026, 2, 12)), 0)]
    fn edge_cases(
        #[case] input: &str,
        #[case] title: &str,
        #[case] due: Option<NaiveDate>,
        #[case] tag_count: usize,
    ) {
        let parsed = parse_task_text(input, today());
        assert_eq!(parsed.title, title);
        assert_eq!(parsed.due_date, due);
        assert_eq!(parsed.tags.len(), tag_count);
    }

    #[test]
    fn first_phrase_in_priority_wins_and_all_occurrences_are_removed() {
        let parsed = parse_task_text("来週 明日 review 明日", today());
        assert_eq!(parsed.due_date, Some(date(2026, 2, 12)));
        assert_eq!(parsed.title, "来週  review");
    }

    #[test]
    fn only_first_iso_date_is_removed() {
        let parsed = parse_task_text("ship 2026-03-01 then 2026-04-01", today());
        assert_eq!(parsed.due_date, Some(date(2026, 3, 1)));
        assert_eq!(parsed.title, "ship  then 2026-04-01");
    }

    #[test]
    fn impossible_iso_date_is_left_in_title() {
        let parsed = parse_task_text("fix 2026-13-40 bug", today());
        assert_eq!(parsed.due_date, None);
        assert_eq!(parsed.title, "fix 2026-13-40 bug");

        let parsed = parse_task_text("fix 2026-13-40 by 2026-02-20", today());
        assert_eq!(parsed.due_date, Some(date(2026, 2, 20)));
        assert_eq!(parsed.title, "fix 2026-13-40 by");
    }

    #[test]
    fn duplicate_tags_are_preserved() {
        let parsed = parse_task_text("#a write #a notes #b", today());
        assert_eq!(parsed.tags, vec!["a", "a", "b"]);
        assert_eq!(parsed.title, "write  notes");
    }

    #[test]
    fn bare_hash_is_not_a_tag() {
        let parsed = parse_task_text("issue # 42", today());
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.title, "issue # 42");
    }

    #[test]
    fn parsing_is_reentrant() {
        let first = parse_task_text("#x 明日 a", today());
        let second = parse_task_text("#x 明日 a", today());
        assert_eq!(first, second);
    }

    #[test]
    fn prepare_merges_explicit_fields() {
        let input = CaptureInput {
            text: vec!["明日".into(), "report".into(), "#work".into()],
            description: Some("  quarterly  ".into()),
            quadrant: Some(Quadrant::ImportantUrgent),
            tags: vec!["#finance".into(), " ".into()],
            due: None,
        };
        let task = prepare_new_task(&input, today()).unwrap();
        assert_eq!(task.title, "report");
        assert_eq!(task.description.as_deref(), Some("quarterly"));
        assert_eq!(task.quadrant, Some(Quadrant::ImportantUrgent));
        assert_eq!(task.due_date, Some(date(2026, 2, 12)));
        assert_eq!(task.tags, vec!["work", "finance"]);
    }

    #[test]
    fn explicit_due_overrides_parsed_phrase() {
        let input = CaptureInput {
            text: vec!["明日 report".into()],
            due: Some("2026-03-31".into()),
            ..CaptureInput::default()
        };
        let task = prepare_new_task(&input, today()).unwrap();
        assert_eq!(task.due_date, Some(date(2026, 3, 31)));
        assert_eq!(task.title, "report");
    }

    #[test]
    fn prepare_rejects_missing_text_and_bad_due() {
        assert_eq!(
            prepare_new_task(&CaptureInput::default(), today()),
            Err(CaptureError::EmptyText)
        );

        let input = CaptureInput {
            text: vec!["x".into()],
            due: Some("whenever".into()),
            ..CaptureInput::default()
        };
        assert_eq!(
            prepare_new_task(&input, today()),
            Err(CaptureError::InvalidDue("whenever".into()))
        );
    }
}
