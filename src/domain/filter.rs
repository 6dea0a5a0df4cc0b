//! Conjunctive rule filter over a price series.
//!
//! The candidate set starts as every position and is intersected with the
//! positions where each rule holds. Comparisons involving `NaN` (indicator
//! warm-up) never hold, so warm-up positions are never candidates.

use crate::domain::column::technical_column;
use crate::domain::price_series::PriceSeries;
use crate::domain::rule::ComparisonRule;
use crate::domain::settings::EngineSettings;
use std::collections::BTreeSet;

/// Positions where the rule holds.
pub fn evaluate_rule(
    series: &PriceSeries,
    rule: &ComparisonRule,
    settings: &EngineSettings,
) -> BTreeSet<usize> {
    let left = technical_column(series, rule.left.element, rule.left.period, settings);
    let right = technical_column(series, rule.right.element, rule.right.period, settings);

    left.iter()
        .zip(right.iter())
        .enumerate()
        .filter(|(_, (l, r))| rule.relation.holds(**l, **r))
        .map(|(i, _)| i)
        .collect()
}

/// Candidate positions satisfying every rule, ascending.
///
/// An empty rule list matches every position.
pub fn filter_dataset(
    series: &PriceSeries,
    rules: &[ComparisonRule],
    settings: &EngineSettings,
) -> Vec<usize> {
    let mut candidates: BTreeSet<usize> = (0..series.len()).collect();

    for rule in rules {
        if candidates.is_empty() {
            break;
        }
        let matches = evaluate_rule(series, rule, settings);
        candidates = candidates.intersection(&matches).copied().collect();
        tracing::debug!(rule = %rule, remaining = candidates.len(), "applied filter rule");
    }

    candidates.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column::{Element, IndicatorKind};
    use crate::domain::price_series::{PriceBar, RawColumn};
    use crate::domain::rule::{ComparisonElement, Relation};
    use chrono::NaiveDate;

    fn make_series(bars: &[(f64, f64)]) -> PriceSeries {
        let bars = bars
            .iter()
            .enumerate()
            .map(|(i, &(open, close))| PriceBar {
                timestamp: NaiveDate::from_ymd_opt(2024, 5, (i + 1) as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    fn raw(column: RawColumn) -> ComparisonElement {
        ComparisonElement::new(Element::Raw(column))
    }

    fn rule(left: ComparisonElement, relation: Relation, right: ComparisonElement) -> ComparisonRule {
        ComparisonRule {
            left,
            right,
            relation,
        }
    }

    #[test]
    fn single_rule_selects_up_bars() {
        let series = make_series(&[(10.0, 11.0), (11.0, 10.0), (10.0, 12.0)]);
        let rules = [rule(raw(RawColumn::Close), Relation::Greater, raw(RawColumn::Open))];
        let result = filter_dataset(&series, &rules, &EngineSettings::default());
        assert_eq!(result, vec![0, 2]);
    }

    #[test]
    fn rules_are_conjunctive() {
        let series = make_series(&[(10.0, 11.0), (11.0, 10.0), (10.0, 12.0), (12.0, 15.0)]);
        let up = rule(raw(RawColumn::Close), Relation::Greater, raw(RawColumn::Open));
        let reflexive = rule(raw(RawColumn::Returns), Relation::GreaterEqual, raw(RawColumn::Returns));
        let higher_close = rule(raw(RawColumn::Close), Relation::GreaterEqual, raw(RawColumn::High));

        let result = filter_dataset(&series, &[up, reflexive, higher_close], &EngineSettings::default());
        assert_eq!(result, vec![0, 2, 3]);

        let rules = [up, rule(raw(RawColumn::Open), Relation::Less, raw(RawColumn::Low))];
        assert!(filter_dataset(&series, &rules, &EngineSettings::default()).is_empty());
    }

    #[test]
    fn empty_rule_list_matches_everything() {
        let series = make_series(&[(1.0, 2.0), (2.0, 1.0), (3.0, 3.0)]);
        assert_eq!(
            filter_dataset(&series, &[], &EngineSettings::default()),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn empty_series_has_no_candidates() {
        let series = PriceSeries::new(vec![]).unwrap();
        let rules = [rule(raw(RawColumn::Close), Relation::Greater, raw(RawColumn::Open))];
        assert!(filter_dataset(&series, &rules, &EngineSettings::default()).is_empty());
    }

    #[test]
    fn warm_up_never_matches() {
        let series = make_series(&[
            (1.0, 1.0),
            (1.0, 2.0),
            (1.0, 3.0),
            (1.0, 4.0),
            (1.0, 5.0),
        ]);
        let sma3 = ComparisonElement::with_period(Element::Indicator(IndicatorKind::Sma), 3);
        for relation in Relation::ALL {
            let matched = filter_dataset(
                &series,
                &[rule(sma3, relation, sma3)],
                &EngineSettings::default(),
            );
            assert!(
                matched.iter().all(|&i| i >= 2),
                "{relation} matched warm-up: {matched:?}"
            );
        }
    }

    #[test]
    fn indicator_against_close() {
        // closes 1..=5, SMA(2) = [NaN, 1.5, 2.5, 3.5, 4.5], close > SMA(2) from index 1
        let series = make_series(&[
            (1.0, 1.0),
            (1.0, 2.0),
            (1.0, 3.0),
            (1.0, 4.0),
            (1.0, 5.0),
        ]);
        let rules = [rule(
            raw(RawColumn::Close),
            Relation::Greater,
            ComparisonElement::with_period(Element::Indicator(IndicatorKind::Sma), 2),
        )];
        assert_eq!(
            filter_dataset(&series, &rules, &EngineSettings::default()),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn default_period_comes_from_settings() {
        let series = make_series(&[(1.0, 1.0), (1.0, 2.0), (1.0, 3.0)]);
        let settings = EngineSettings {
            moving_average_period: 3,
            ..EngineSettings::default()
        };
        let rules = [rule(
            raw(RawColumn::Close),
            Relation::Greater,
            ComparisonElement::new(Element::Indicator(IndicatorKind::Wma)),
        )];
        // WMA(3) at index 2 = (1*1 + 2*2 + 3*3) / 6
        assert_eq!(filter_dataset(&series, &rules, &settings), vec![2]);
    }
}
