use crate::archive::BuildEntry;
use crate::types::{known_weight, sanitize_price, AnswerTuple, Question};

const SEPARATOR: &str = " • ";

pub fn money(value: f64) -> String {
    format!("${:.2}", sanitize_price(value))
}

/// Prices of zero or less are not shown.
pub fn price_label(value: f64) -> String {
    if sanitize_price(value) > 0.0 {
        money(value)
    } else {
        String::new()
    }
}

pub fn grams(value: Option<f64>) -> String {
    known_weight(value).map(|w| format!("{w}g")).unwrap_or_default()
}

pub fn weight_label(value: Option<f64>) -> String {
    match known_weight(value) {
        Some(_) => grams(value),
        None => "Unknown".to_string(),
    }
}

pub fn breadcrumbs(answers: &AnswerTuple) -> String {
    Question::ALL
        .into_iter()
        .filter_map(|q| answers.get(q).map(|v| format!("{}: {v}", title(q))))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn title(question: Question) -> &'static str {
    match question {
        Question::Size => "Size",
        Question::Style => "Style",
        Question::Video => "Video",
    }
}

pub fn build_subtitle(build: &BuildEntry) -> String {
    let answer = |q| build.answers.get(q).unwrap_or_default();
    let mut out = [
        answer(Question::Size),
        answer(Question::Style),
        answer(Question::Video),
    ]
    .join(SEPARATOR);
    out.push_str(SEPARATOR);
    let price = price_label(build.totals.total_price);
    if !price.is_empty() {
        out.push_str(&price);
        out.push_str(SEPARATOR);
    }
    out.push_str(&weight_label(build.totals.total_weight));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Totals;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn build(total_price: f64, total_weight: Option<f64>) -> BuildEntry {
        BuildEntry {
            id: "b1".to_string(),
            name: "Test".to_string(),
            created_at: Utc::now(),
            answers: AnswerTuple::complete("5\"", "Freestyle", "Analog"),
            picks: BTreeMap::new(),
            totals: Totals {
                total_price,
                total_weight,
            },
        }
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(12.5), "$12.50");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(f64::NAN), "$0.00");
        assert_eq!(price_label(0.0), "");
        assert_eq!(price_label(79.99), "$79.99");
    }

    #[test]
    fn weights() {
        assert_eq!(grams(Some(106.0)), "106g");
        assert_eq!(grams(Some(7.5)), "7.5g");
        assert_eq!(grams(Some(0.0)), "");
        assert_eq!(grams(None), "");
        assert_eq!(weight_label(None), "Unknown");
        assert_eq!(weight_label(Some(300.0)), "300g");
    }

    #[test]
    fn subtitle_matches_saved_list_layout() {
        assert_eq!(
            build_subtitle(&build(123.0, Some(300.0))),
            "5\" • Freestyle • Analog • $123.00 • 300g"
        );
        assert_eq!(
            build_subtitle(&build(0.0, None)),
            "5\" • Freestyle • Analog • Unknown"
        );
    }

    #[test]
    fn breadcrumbs_skip_unanswered() {
        let answers = AnswerTuple::new(Some("3\"".to_string()), None, None);
        assert_eq!(breadcrumbs(&answers), "Size: 3\"");
        assert_eq!(breadcrumbs(&AnswerTuple::default()), "");
    }
}
