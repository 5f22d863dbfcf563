// Grouping and rollups over the row store
//
// Every function here is a pure function of the dataset and the key/value
// accessors. Group order is always first-seen order.

use std::cmp::Ordering;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::data::{Dataset, Record};
use crate::ir::{StackBand, StackLayer, StackedSeries};
use crate::stats::mean;

/// Partition records by key. Every record lands in exactly one group.
pub fn group_by<'a, K, F>(dataset: &'a Dataset, mut key_fn: F) -> IndexMap<K, Vec<&'a Record>>
where
    K: Eq + Hash,
    F: FnMut(&Record) -> K,
{
    let mut groups: IndexMap<K, Vec<&'a Record>> = IndexMap::new();
    for record in dataset {
        groups.entry(key_fn(record)).or_default().push(record);
    }
    groups
}

/// Distinct keys in first-seen order.
pub fn distinct<K, F>(dataset: &Dataset, key_fn: F) -> Vec<K>
where
    K: Eq + Hash,
    F: FnMut(&Record) -> K,
{
    dataset.iter().map(key_fn).collect::<IndexSet<K>>().into_iter().collect()
}

fn group_mean<V>(records: &[&Record], value_fn: &V) -> Option<f64>
where
    V: Fn(&Record) -> Option<f64>,
{
    let values: Vec<f64> = records.iter().filter_map(|&r| value_fn(r)).collect();
    mean(&values)
}

/// Mean of `value_fn` per group. Groups whose values are all absent get
/// `None`.
pub fn rollup_mean<K, F, V>(dataset: &Dataset, key_fn: F, value_fn: V) -> Vec<(K, Option<f64>)>
where
    K: Eq + Hash,
    F: FnMut(&Record) -> K,
    V: Fn(&Record) -> Option<f64>,
{
    group_by(dataset, key_fn)
        .into_iter()
        .map(|(key, records)| {
            let m = group_mean(&records, &value_fn);
            (key, m)
        })
        .collect()
}

/// Two-level mean rollup: outer groups in first-seen order, inner groups in
/// first-seen order within their outer group.
pub fn rollup_mean_nested<K1, K2, F1, F2, V>(
    dataset: &Dataset,
    outer_fn: F1,
    mut inner_fn: F2,
    value_fn: V,
) -> Vec<(K1, Vec<(K2, Option<f64>)>)>
where
    K1: Eq + Hash,
    K2: Eq + Hash,
    F1: FnMut(&Record) -> K1,
    F2: FnMut(&Record) -> K2,
    V: Fn(&Record) -> Option<f64>,
{
    group_by(dataset, outer_fn)
        .into_iter()
        .map(|(outer, records)| {
            let mut inner: IndexMap<K2, Vec<&Record>> = IndexMap::new();
            for record in records {
                inner.entry(inner_fn(record)).or_default().push(record);
            }
            let leaves = inner
                .into_iter()
                .map(|(key, rs)| {
                    let m = group_mean(&rs, &value_fn);
                    (key, m)
                })
                .collect();
            (outer, leaves)
        })
        .collect()
}

/// Stack per-category means within each group.
///
/// Categories are stacked in the order given, which must be the same on every
/// call to keep layer colors stable. Records whose category is not listed are
/// ignored. A category with no values in a group gets a zero-height band.
pub fn stack_series<G, C, V>(
    dataset: &Dataset,
    categories: &[String],
    group_fn: G,
    mut category_fn: C,
    value_fn: V,
) -> StackedSeries
where
    G: FnMut(&Record) -> String,
    C: FnMut(&Record) -> String,
    V: Fn(&Record) -> Option<f64>,
{
    let grouped = group_by(dataset, group_fn);
    let groups: Vec<String> = grouped.keys().cloned().collect();

    let mut layers: Vec<StackLayer> = categories
        .iter()
        .map(|c| StackLayer {
            category: c.clone(),
            bands: Vec::with_capacity(groups.len()),
        })
        .collect();

    for (group, records) in &grouped {
        let mut by_category: IndexMap<String, Vec<f64>> = IndexMap::new();
        for &record in records {
            if let Some(v) = value_fn(record) {
                by_category.entry(category_fn(record)).or_default().push(v);
            }
        }

        let mut offset = 0.0;
        for layer in layers.iter_mut() {
            let value = by_category.get(&layer.category).and_then(|vs| mean(vs));
            let low = offset;
            let high = offset + value.unwrap_or(0.0);
            offset = high;
            layer.bands.push(StackBand {
                group: group.clone(),
                low,
                high,
                value,
            });
        }
    }

    StackedSeries { groups, layers }
}

/// Ascending order that compares numerically when both sides are numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl StackedSeries {
    /// Reorder groups ascending (numeric-aware), keeping every layer's bands
    /// aligned with `groups`. Stacking within a group is unaffected.
    pub fn sort_groups(&mut self) {
        let mut order: Vec<usize> = (0..self.groups.len()).collect();
        order.sort_by(|&a, &b| natural_cmp(&self.groups[a], &self.groups[b]));

        self.groups = order.iter().map(|&i| self.groups[i].clone()).collect();
        for layer in &mut self.layers {
            layer.bands = order.iter().map(|&i| layer.bands[i].clone()).collect();
        }
    }

    /// Top of the stack in each group.
    pub fn totals(&self) -> Vec<f64> {
        match self.layers.last() {
            Some(layer) => layer.bands.iter().map(|b| b.high).collect(),
            None => vec![0.0; self.groups.len()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::{as_category, as_number};
    use crate::data::CellValue;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn car(cyl: f64, origin: &str, hp: Option<f64>, year: f64, acc: f64) -> Record {
        [
            ("Cylinders", CellValue::Number(cyl)),
            ("Origin", CellValue::Text(origin.to_string())),
            ("Horsepower", hp.map(CellValue::Number).unwrap_or(CellValue::Empty)),
            ("Model Year", CellValue::Number(year)),
            ("Acceleration", CellValue::Number(acc)),
        ]
        .into_iter()
        .collect()
    }

    fn make_data() -> Dataset {
        Dataset::new(vec![
            car(8.0, "USA", Some(130.0), 71.0, 12.0),
            car(4.0, "Japan", Some(95.0), 70.0, 15.0),
            car(4.0, "USA", Some(100.0), 70.0, 14.0),
            car(4.0, "USA", Some(120.0), 71.0, 16.0),
            car(6.0, "Europe", None, 70.0, 17.0),
        ])
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let data = make_data();
        let groups = group_by(&data, |r| as_category(r, "Origin"));
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["USA", "Japan", "Europe"]);
        assert_eq!(groups["USA"].len(), 3);
    }

    #[test]
    fn test_distinct() {
        let data = make_data();
        assert_eq!(distinct(&data, |r| as_category(r, "Cylinders")), vec!["8", "4", "6"]);
    }

    #[test]
    fn test_rollup_mean_by_cylinders() {
        let data = Dataset::new(vec![
            car(4.0, "USA", Some(100.0), 70.0, 10.0),
            car(4.0, "USA", Some(120.0), 70.0, 10.0),
        ]);
        let rolled = rollup_mean(&data, |r| as_category(r, "Cylinders"), |r| as_number(r, "Horsepower"));
        assert_eq!(rolled, vec![("4".to_string(), Some(110.0))]);
    }

    #[test]
    fn test_rollup_mean_absent_group_is_none() {
        let data = make_data();
        let rolled = rollup_mean(&data, |r| as_category(r, "Origin"), |r| as_number(r, "Horsepower"));
        assert_eq!(rolled[2], ("Europe".to_string(), None));
    }

    #[test]
    fn test_rollup_mean_composite_key() {
        let data = make_data();
        let rolled = rollup_mean(
            &data,
            |r| (as_category(r, "Cylinders"), as_category(r, "Origin")),
            |r| as_number(r, "Horsepower"),
        );
        assert_eq!(rolled.len(), 4);
        assert_eq!(rolled[2], (("4".to_string(), "USA".to_string()), Some(110.0)));
    }

    #[test]
    fn test_rollup_mean_nested_order() {
        let data = make_data();
        let nested = rollup_mean_nested(
            &data,
            |r| as_category(r, "Model Year"),
            |r| as_category(r, "Origin"),
            |r| as_number(r, "Acceleration"),
        );
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].0, "71");
        assert_eq!(nested[0].1, vec![("USA".to_string(), Some(14.0))]);
        let inner: Vec<&str> = nested[1].1.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(inner, vec!["Japan", "USA", "Europe"]);
    }

    #[test]
    fn test_stack_series_cumulative() {
        let data = make_data();
        let categories = distinct(&data, |r| as_category(r, "Origin"));
        let stacked = stack_series(
            &data,
            &categories,
            |r| as_category(r, "Model Year"),
            |r| as_category(r, "Origin"),
            |r| as_number(r, "Acceleration"),
        );

        assert_eq!(stacked.groups, vec!["71", "70"]);
        assert_eq!(stacked.layers.len(), 3);

        // year 71: USA only (12 + 16) / 2 = 14
        let usa = &stacked.layers[0].bands[0];
        assert_eq!((usa.low, usa.high), (0.0, 14.0));
        let japan_71 = &stacked.layers[1].bands[0];
        assert_eq!(japan_71.value, None);
        assert_eq!(japan_71.low, japan_71.high);

        // year 70: USA 14, Japan 15, Europe 17
        let totals = stacked.totals();
        assert_relative_eq!(totals[1], 14.0 + 15.0 + 17.0);
        assert_relative_eq!(stacked.layers[2].bands[1].low, 29.0);
    }

    #[test]
    fn test_stack_series_sort_groups() {
        let data = make_data();
        let categories = vec!["USA".to_string()];
        let mut stacked = stack_series(
            &data,
            &categories,
            |r| as_category(r, "Model Year"),
            |r| as_category(r, "Origin"),
            |r| as_number(r, "Acceleration"),
        );
        stacked.sort_groups();
        assert_eq!(stacked.groups, vec!["70", "71"]);
        assert_eq!(stacked.layers[0].bands[0].group, "70");
        assert_eq!(stacked.layers[0].bands[0].value, Some(14.0));
    }

    #[test]
    fn test_stack_series_empty_dataset() {
        let stacked = stack_series(
            &Dataset::default(),
            &["USA".to_string()],
            |r| as_category(r, "Model Year"),
            |r| as_category(r, "Origin"),
            |r| as_number(r, "Acceleration"),
        );
        assert!(stacked.groups.is_empty());
        assert!(stacked.layers[0].bands.is_empty());
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("9", "10"), Ordering::Less);
        assert_eq!(natural_cmp("b", "a"), Ordering::Greater);
        assert_eq!(natural_cmp("3", "x"), Ordering::Less);
    }

    proptest! {
        #[test]
        fn prop_group_by_partitions(keys in prop::collection::vec(0u8..6, 0..100)) {
            let data = Dataset::new(
                keys.iter()
                    .enumerate()
                    .map(|(i, k)| {
                        [("id", CellValue::Number(i as f64)), ("k", CellValue::Number(*k as f64))]
                            .into_iter()
                            .collect()
                    })
                    .collect(),
            );
            let groups = group_by(&data, |r| as_category(r, "k"));
            let total: usize = groups.values().map(Vec::len).sum();
            prop_assert_eq!(total, data.len());

            let mut ids: Vec<f64> = groups
                .values()
                .flatten()
                .filter_map(|r| as_number(r, "id"))
                .collect();
            ids.sort_by(f64::total_cmp);
            let expected: Vec<f64> = (0..data.len()).map(|i| i as f64).collect();
            prop_assert_eq!(ids, expected);
        }
    }
}
