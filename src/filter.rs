//! Test selection filters (tag, suite, test case) and their combination.
use crate::tags::TestTags;
use crate::walker::SuiteFrame;
use std::collections::{BTreeMap, BTreeSet};

/// How the per-category selections are combined.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterOp {
    /// Intersection of all filters
    #[default]
    #[value(name = "AND")]
    And,
    /// Union of all filters
    #[value(name = "OR")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterCategory {
    Tag,
    Suite,
    TestCase,
}

impl FilterCategory {
    pub fn label(self) -> &'static str {
        match self {
            FilterCategory::Tag => "tag",
            FilterCategory::Suite => "test suite",
            FilterCategory::TestCase => "test case",
        }
    }
}

/// Accepted values per active category. A category is active only when it
/// has at least one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    categories: BTreeMap<FilterCategory, BTreeSet<String>>,
    pub op: FilterOp,
}

impl FilterSet {
    pub fn new(op: FilterOp) -> Self {
        Self {
            categories: BTreeMap::new(),
            op,
        }
    }

    pub fn with_values<I>(mut self, category: FilterCategory, values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let values: BTreeSet<String> = values.into_iter().collect();
        if !values.is_empty() {
            self.categories.entry(category).or_default().extend(values);
        }
        self
    }

    pub fn is_active(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn values(&self, category: FilterCategory) -> Option<&BTreeSet<String>> {
        self.categories.get(&category)
    }

    /// Compact description used in synthesized execution summaries,
    /// e.g. `tag_smoke_ui:test suite_Login`.
    pub fn describe(&self) -> String {
        self.categories
            .iter()
            .map(|(category, values)| {
                let mut entry = category.label().to_string();
                for value in values {
                    entry.push('_');
                    entry.push_str(value);
                }
                entry
            })
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// Ordinal of a test in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestId(pub usize);

/// Accumulates per-category qualifying tests while the report streams by.
pub struct FilterEngine<'a> {
    filters: &'a FilterSet,
    qualifying: BTreeMap<FilterCategory, BTreeSet<TestId>>,
    // Tests seen since the last named suite closed.
    pending_suite: Vec<TestId>,
    // Tests that can no longer be selected, not yet handed out.
    rejected: Vec<TestId>,
}

impl<'a> FilterEngine<'a> {
    pub fn new(filters: &'a FilterSet) -> Self {
        let qualifying = filters
            .categories
            .keys()
            .map(|category| (*category, BTreeSet::new()))
            .collect();
        Self {
            filters,
            qualifying,
            pending_suite: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn record_test(&mut self, id: TestId, name: &str, tags: &TestTags) {
        let filters = self.filters;
        if let Some(accepted) = filters.values(FilterCategory::Tag) {
            if tags.matches_any(accepted) {
                self.qualify(FilterCategory::Tag, [id]);
            }
        }
        if let Some(accepted) = filters.values(FilterCategory::TestCase) {
            if accepted.contains(name) {
                self.qualify(FilterCategory::TestCase, [id]);
            }
        }
        if filters.values(FilterCategory::Suite).is_none() {
            self.settle(id);
            return;
        }
        // Under AND a miss in a per-test category is final before the suite closes.
        let missed_per_test = self
            .qualifying
            .iter()
            .any(|(category, ids)| *category != FilterCategory::Suite && !ids.contains(&id));
        if filters.op == FilterOp::And && missed_per_test {
            self.rejected.push(id);
            return;
        }
        self.pending_suite.push(id);
    }

    /// Evaluate the ancestor chain of a closing suite; the closing suite is last.
    pub fn suite_closed(&mut self, suites: &[SuiteFrame]) {
        let closing_is_named = suites.last().is_some_and(|frame| frame.name.is_some());
        if !closing_is_named {
            return;
        }
        let pending = std::mem::take(&mut self.pending_suite);
        let filters = self.filters;
        let Some(accepted) = filters.values(FilterCategory::Suite) else {
            return;
        };
        let matched = suites
            .iter()
            .filter_map(|frame| frame.name.as_deref())
            .any(|name| accepted.contains(name));
        if matched {
            self.qualify(FilterCategory::Suite, pending.iter().copied());
        }
        for id in pending {
            self.settle(id);
        }
    }

    /// Tests found unselectable since the last call. Every category of a
    /// returned test is final, so it stays out of [`FilterEngine::finish`].
    pub fn take_rejected(&mut self) -> Vec<TestId> {
        std::mem::take(&mut self.rejected)
    }

    /// Record `id` as rejected when all of its categories are final and it missed.
    fn settle(&mut self, id: TestId) {
        let mut hits = self.qualifying.values().map(|ids| ids.contains(&id));
        let selected = match self.filters.op {
            FilterOp::And => hits.all(|hit| hit),
            FilterOp::Or => hits.any(|hit| hit),
        };
        if !selected {
            self.rejected.push(id);
        }
    }

    fn qualify<I>(&mut self, category: FilterCategory, ids: I)
    where
        I: IntoIterator<Item = TestId>,
    {
        if let Some(set) = self.qualifying.get_mut(&category) {
            set.extend(ids);
        }
    }

    pub fn finish(self) -> BTreeSet<TestId> {
        combine(self.filters.op, self.qualifying.into_values())
    }
}

/// Intersect (`AND`) or unite (`OR`) per-category selections.
pub fn combine<I>(op: FilterOp, sets: I) -> BTreeSet<TestId>
where
    I: IntoIterator<Item = BTreeSet<TestId>>,
{
    sets.into_iter()
        .reduce(|acc, set| match op {
            FilterOp::And => acc.intersection(&set).copied().collect(),
            FilterOp::Or => acc.union(&set).copied().collect(),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::extract_tags;

    fn ids(values: &[usize]) -> BTreeSet<TestId> {
        values.iter().map(|value| TestId(*value)).collect()
    }

    fn frames(names: &[Option<&str>]) -> Vec<SuiteFrame> {
        names
            .iter()
            .map(|name| SuiteFrame {
                name: name.map(str::to_string),
            })
            .collect()
    }

    fn values(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn and_intersects_or_unites() {
        let tag = ids(&[1, 2]);
        let suite = ids(&[2, 3]);
        assert_eq!(combine(FilterOp::And, [tag.clone(), suite.clone()]), ids(&[2]));
        assert_eq!(combine(FilterOp::Or, [tag, suite]), ids(&[1, 2, 3]));
        assert!(combine(FilterOp::And, Vec::new()).is_empty());
    }

    #[test]
    fn inactive_categories_are_dropped() {
        let filters = FilterSet::new(FilterOp::And)
            .with_values(FilterCategory::Tag, Vec::new())
            .with_values(FilterCategory::TestCase, values(&["Login"]));
        assert!(filters.is_active());
        assert!(filters.values(FilterCategory::Tag).is_none());
        assert_eq!(filters.describe(), "test case_Login");
        assert!(!FilterSet::default().is_active());
    }

    #[test]
    fn describe_lists_categories_in_fixed_order() {
        let filters = FilterSet::new(FilterOp::Or)
            .with_values(FilterCategory::Suite, values(&["Demo"]))
            .with_values(FilterCategory::Tag, values(&["ui", "smoke"]));
        assert_eq!(filters.describe(), "tag_smoke_ui:test suite_Demo");
    }

    #[test]
    fn suite_filter_bulk_includes_tests_of_matching_suite() {
        let filters =
            FilterSet::new(FilterOp::And).with_values(FilterCategory::Suite, values(&["Demo"]));
        let mut engine = FilterEngine::new(&filters);
        let untagged = extract_tags(Vec::<&str>::new());

        engine.record_test(TestId(0), "a", &untagged);
        engine.suite_closed(&frames(&[Some("Root"), Some("Other")]));
        engine.record_test(TestId(1), "b", &untagged);
        engine.record_test(TestId(2), "c", &untagged);
        engine.suite_closed(&frames(&[Some("Root"), Some("Demo")]));
        assert_eq!(engine.finish(), ids(&[1, 2]));
    }

    #[test]
    fn suite_filter_matches_any_ancestor() {
        let filters =
            FilterSet::new(FilterOp::And).with_values(FilterCategory::Suite, values(&["Root"]));
        let mut engine = FilterEngine::new(&filters);
        let untagged = extract_tags(Vec::<&str>::new());

        engine.record_test(TestId(0), "nested", &untagged);
        engine.suite_closed(&frames(&[Some("Root"), Some("Child")]));
        engine.record_test(TestId(1), "unnamed-suite", &untagged);
        engine.suite_closed(&frames(&[Some("Root"), None]));
        engine.record_test(TestId(2), "direct", &untagged);
        engine.suite_closed(&frames(&[Some("Root")]));
        assert_eq!(engine.finish(), ids(&[0, 1, 2]));
    }

    #[test]
    fn categories_combine_per_operator() {
        let tag_filters = values(&["smoke"]);
        let suite_filters = values(&["Demo"]);
        let run = |op: FilterOp| {
            let filters = FilterSet::new(op)
                .with_values(FilterCategory::Tag, tag_filters.clone())
                .with_values(FilterCategory::Suite, suite_filters.clone());
            let mut engine = FilterEngine::new(&filters);
            // A: tag only, B: tag and suite, C: suite only.
            engine.record_test(TestId(0), "A", &extract_tags(["kind:smoke"]));
            engine.suite_closed(&frames(&[Some("Other")]));
            engine.record_test(TestId(1), "B", &extract_tags(["kind:smoke"]));
            engine.record_test(TestId(2), "C", &extract_tags(["kind:slow"]));
            engine.suite_closed(&frames(&[Some("Demo")]));
            engine.finish()
        };
        assert_eq!(run(FilterOp::And), ids(&[1]));
        assert_eq!(run(FilterOp::Or), ids(&[0, 1, 2]));
    }

    #[test]
    fn misses_are_released_once_final() {
        let filters = FilterSet::new(FilterOp::And)
            .with_values(FilterCategory::TestCase, values(&["wanted"]));
        let mut engine = FilterEngine::new(&filters);
        let untagged = extract_tags(Vec::<&str>::new());
        engine.record_test(TestId(0), "other", &untagged);
        engine.record_test(TestId(1), "wanted", &untagged);
        assert_eq!(engine.take_rejected(), vec![TestId(0)]);
        assert!(engine.take_rejected().is_empty());
        assert_eq!(engine.finish(), ids(&[1]));
    }

    #[test]
    fn suite_category_defers_release_until_suite_closes() {
        let run = |op: FilterOp| {
            let filters = FilterSet::new(op)
                .with_values(FilterCategory::Tag, values(&["smoke"]))
                .with_values(FilterCategory::Suite, values(&["Demo"]));
            let mut engine = FilterEngine::new(&filters);
            engine.record_test(TestId(0), "A", &extract_tags(["kind:slow"]));
            engine.record_test(TestId(1), "B", &extract_tags(["kind:smoke"]));
            let early = engine.take_rejected();
            engine.suite_closed(&frames(&[Some("Other")]));
            (early, engine.take_rejected(), engine.finish())
        };
        // AND: the tag miss is final at once; B fails the suite at close.
        assert_eq!(run(FilterOp::And), (vec![TestId(0)], vec![TestId(1)], ids(&[])));
        // OR: nothing is final until the suite closes; B keeps its tag hit.
        assert_eq!(run(FilterOp::Or), (vec![], vec![TestId(0)], ids(&[1])));
    }

    #[test]
    fn test_case_filter_requires_exact_name() {
        let filters = FilterSet::new(FilterOp::And)
            .with_values(FilterCategory::TestCase, values(&["Valid Login"]));
        let mut engine = FilterEngine::new(&filters);
        let untagged = extract_tags(Vec::<&str>::new());
        engine.record_test(TestId(0), "Valid Login", &untagged);
        engine.record_test(TestId(1), "Valid Login 2", &untagged);
        assert_eq!(engine.finish(), ids(&[0]));
    }
}
