use crate::catalog::Catalog;
use crate::custom::{visible_options, CustomPartEntry};
use crate::types::{sanitize_price, AnswerTuple, Origin, PartOption};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct OptionResolver<'a> {
    catalog: &'a Catalog,
    custom: &'a [CustomPartEntry],
}

impl<'a> OptionResolver<'a> {
    pub fn new(catalog: &'a Catalog, custom: &'a [CustomPartEntry]) -> Self {
        Self { catalog, custom }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn catalog_options(&self, part: &str, answers: &AnswerTuple) -> Vec<PartOption> {
        self.catalog
            .rows_for(answers)
            .filter(|row| row.part == part)
            .flat_map(|row| row.options.iter())
            .map(|opt| PartOption {
                name: opt.name.clone(),
                price: opt.price,
                weight: opt.weight,
                link: opt.link.clone(),
                origin: Origin::Catalog,
                custom_id: None,
            })
            .collect()
    }

    /// Custom options first so they win name collisions, then a stable sort
    /// by price keeps custom ahead of catalog on equal prices.
    pub fn options_for(&self, part: &str, answers: &AnswerTuple) -> Vec<PartOption> {
        let custom = visible_options(self.custom, answers, part);
        let catalog = self.catalog_options(part, answers);

        let mut seen = HashSet::new();
        let mut merged: Vec<PartOption> = custom
            .into_iter()
            .chain(catalog)
            .filter(|opt| {
                let key = opt.key();
                !key.is_empty() && seen.insert(key)
            })
            .collect();

        merged.sort_by(|a, b| sanitize_price(a.price).total_cmp(&sanitize_price(b.price)));
        tracing::debug!(part, options = merged.len(), "options resolved");
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogOption, CatalogRow};
    use crate::custom::CustomPartDraft;
    use crate::rule::{Rule, RowRules};

    fn answers() -> AnswerTuple {
        AnswerTuple::complete("5\"", "Freestyle", "Analog")
    }

    fn opt(name: &str, price: f64) -> CatalogOption {
        CatalogOption {
            name: name.to_string(),
            price,
            link: String::new(),
            weight: None,
        }
    }

    fn any_row(part: &str, options: Vec<CatalogOption>) -> CatalogRow {
        CatalogRow::new(
            part,
            RowRules::new(Some(Rule::Any), Some(Rule::Any), Some(Rule::Any)),
            options,
        )
    }

    fn catalog(rows: Vec<CatalogRow>) -> Catalog {
        Catalog::new(Default::default(), rows)
    }

    fn custom(name: &str, price: &str) -> CustomPartEntry {
        CustomPartDraft::new("Frame", name)
            .price(price)
            .link("https://example.com/custom")
            .weight("99")
            .validate(&answers())
            .unwrap()
    }

    #[test]
    fn sorted_by_price_with_stable_ties() {
        let catalog = catalog(vec![any_row(
            "Frame",
            vec![opt("A", 80.0), opt("B", 29.0), opt("C", 0.0), opt("D", 80.0)],
        )]);
        let resolver = OptionResolver::new(&catalog, &[]);
        let names: Vec<String> = resolver
            .options_for("Frame", &answers())
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, vec!["C", "B", "A", "D"]);
    }

    #[test]
    fn custom_option_wins_name_collision() {
        let catalog = catalog(vec![any_row("Frame", vec![opt("Siren F5", 75.0)])]);
        let customs = vec![custom("  siren f5 ", "60")];
        let resolver = OptionResolver::new(&catalog, &customs);

        let options = resolver.options_for("Frame", &answers());
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].origin, Origin::Custom);
        assert_eq!(options[0].price, 60.0);
        assert_eq!(options[0].weight, Some(99.0));
        assert_eq!(options[0].link, "https://example.com/custom");
    }

    #[test]
    fn custom_precedes_catalog_on_equal_price() {
        let catalog = catalog(vec![any_row("Frame", vec![opt("Catalog", 50.0)])]);
        let customs = vec![custom("Mine", "50")];
        let resolver = OptionResolver::new(&catalog, &customs);
        let options = resolver.options_for("Frame", &answers());
        assert_eq!(options[0].name, "Mine");
        assert_eq!(options[1].name, "Catalog");
    }

    #[test]
    fn empty_names_are_dropped_and_keys_unique() {
        let catalog = catalog(vec![
            any_row("Frame", vec![opt("", 10.0), opt("  ", 5.0), opt("X", 1.0)]),
            any_row("Frame", vec![opt("x", 2.0), opt("Y", 3.0)]),
        ]);
        let resolver = OptionResolver::new(&catalog, &[]);
        let options = resolver.options_for("Frame", &answers());
        let keys: HashSet<_> = options.iter().map(PartOption::key).collect();
        assert_eq!(options.len(), 2);
        assert_eq!(keys.len(), options.len());
        assert_eq!(options[0].price, 1.0);
    }

    #[test]
    fn other_parts_and_inapplicable_rows_are_ignored() {
        let dji_only = CatalogRow::new(
            "Frame",
            RowRules::new(Some(Rule::Any), Some(Rule::Any), Some(Rule::exact("DJI"))),
            vec![opt("DJI frame", 1.0)],
        );
        let catalog = catalog(vec![dji_only, any_row("Motors", vec![opt("M", 1.0)])]);
        let resolver = OptionResolver::new(&catalog, &[]);
        assert!(resolver.options_for("Frame", &answers()).is_empty());
    }

    #[test]
    fn resolving_is_repeatable() {
        let catalog = Catalog::bundled().unwrap();
        let resolver = OptionResolver::new(&catalog, &[]);
        let first = resolver.options_for("Battery", &answers());
        let second = resolver.options_for("Battery", &answers());
        assert_eq!(first, second);
        assert_eq!(first[0].name, "Choose a Part:");
        assert_eq!(first[1].price, 55.0);
        let windows_sorted = first.windows(2).all(|w| w[0].price <= w[1].price);
        assert!(windows_sorted);
    }
}
