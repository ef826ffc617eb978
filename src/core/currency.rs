//! Currency reference entries and the per-source worklists built from them.

use std::fmt::Display;

/// A national bank publishing exchange rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Source {
    /// Central Bank of Russia, keyed by `currency_identificator_cbr`.
    Cbr,
    /// National Bank of Ukraine, keyed by `currency_num_code`.
    Nbu,
}

impl Source {
    /// Sources in the order a run processes them.
    pub const ALL: [Source; 2] = [Source::Cbr, Source::Nbu];

    /// The value stored in the `source` column of the rates table.
    pub fn code(&self) -> &'static str {
        match self {
            Source::Cbr => "CBR",
            Source::Nbu => "NBU",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One row of the reference table.
///
/// A currency carries both bank identifiers and both enablement flags; the
/// identifier used for a fetch is picked per source by [`CurrencyRef::lookup_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyRef {
    pub currency_id: i32,
    pub code: String,
    pub name: Option<String>,
    pub currency_identificator_cbr: Option<String>,
    pub currency_num_code: Option<String>,
    pub download_from_cbr: bool,
    pub download_from_nbu: bool,
}

impl CurrencyRef {
    pub fn is_enabled_for(&self, source: Source) -> bool {
        match source {
            Source::Cbr => self.download_from_cbr,
            Source::Nbu => self.download_from_nbu,
        }
    }

    /// The bank-specific identifier for `source`, if one is set.
    pub fn lookup_key(&self, source: Source) -> Option<&str> {
        let key = match source {
            Source::Cbr => self.currency_identificator_cbr.as_deref(),
            Source::Nbu => self.currency_num_code.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

/// A currency scheduled for download from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub currency_id: i32,
    pub code: String,
    pub key: String,
}

/// The items to fetch from one source, plus the enabled currencies that
/// cannot be fetched because their identifier for that source is blank.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Worklist {
    pub items: Vec<WorkItem>,
    pub missing_key: Vec<CurrencyRef>,
}

/// Maps reference entries onto the worklist for `source`.
///
/// Entries whose flag for `source` is off are skipped, so callers may pass
/// either the pre-filtered query result or the whole table.
pub fn worklist(source: Source, refs: &[CurrencyRef]) -> Worklist {
    let mut list = Worklist::default();
    for entry in refs.iter().filter(|r| r.is_enabled_for(source)) {
        match entry.lookup_key(source) {
            Some(key) => list.items.push(WorkItem {
                currency_id: entry.currency_id,
                code: entry.code.clone(),
                key: key.to_string(),
            }),
            None => list.missing_key.push(entry.clone()),
        }
    }
    list
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn currency(
        id: i32,
        code: &str,
        cbr: Option<&str>,
        num: Option<&str>,
        from_cbr: bool,
        from_nbu: bool,
    ) -> CurrencyRef {
        CurrencyRef {
            currency_id: id,
            code: code.to_string(),
            name: None,
            currency_identificator_cbr: cbr.map(str::to_string),
            currency_num_code: num.map(str::to_string),
            download_from_cbr: from_cbr,
            download_from_nbu: from_nbu,
        }
    }

    fn keys(list: &Worklist) -> Vec<&str> {
        list.items.iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn test_worklist_uses_source_specific_identifier() {
        let refs = vec![
            currency(1, "USD", Some("R01235"), Some("840"), true, true),
            currency(2, "EUR", Some("R01239"), Some("978"), true, false),
            currency(3, "PLN", Some("R01565"), Some("985"), false, true),
            currency(4, "JPY", Some("R01820"), Some("392"), false, false),
        ];

        let cbr = worklist(Source::Cbr, &refs);
        assert_eq!(keys(&cbr), vec!["R01235", "R01239"]);

        let nbu = worklist(Source::Nbu, &refs);
        assert_eq!(keys(&nbu), vec!["840", "985"]);
    }

    #[test]
    fn test_worklist_flags_are_independent() {
        // every flag combination, each currency checked against both lists
        let refs: Vec<CurrencyRef> = (0..4)
            .map(|i| {
                currency(
                    i,
                    &format!("C{i}"),
                    Some(&format!("R{i}")),
                    Some(&format!("{}", 100 + i)),
                    i & 1 == 1,
                    i & 2 == 2,
                )
            })
            .collect();

        let cbr = worklist(Source::Cbr, &refs);
        let nbu = worklist(Source::Nbu, &refs);
        for r in &refs {
            let in_cbr = cbr.items.iter().any(|i| i.currency_id == r.currency_id);
            let in_nbu = nbu.items.iter().any(|i| i.currency_id == r.currency_id);
            assert_eq!(in_cbr, r.download_from_cbr, "{}", r.code);
            assert_eq!(in_nbu, r.download_from_nbu, "{}", r.code);
        }
    }

    #[test]
    fn test_worklist_reports_blank_identifiers() {
        let refs = vec![
            currency(1, "USD", None, Some("840"), true, true),
            currency(2, "EUR", Some("  "), Some("978"), true, false),
        ];

        let cbr = worklist(Source::Cbr, &refs);
        assert!(cbr.items.is_empty());
        assert_eq!(cbr.missing_key.len(), 2);

        let nbu = worklist(Source::Nbu, &refs);
        assert_eq!(keys(&nbu), vec!["840"]);
        assert!(nbu.missing_key.is_empty());
    }

    #[test]
    fn test_lookup_key_trims_whitespace() {
        let usd = currency(1, "USD", Some(" R01235 "), Some("840 "), true, true);
        assert_eq!(usd.lookup_key(Source::Cbr), Some("R01235"));
        assert_eq!(usd.lookup_key(Source::Nbu), Some("840"));
    }

    #[test]
    fn test_source_codes_match_the_rates_table() {
        assert_eq!(Source::ALL, [Source::Cbr, Source::Nbu]);
        assert_eq!(Source::Cbr.code(), "CBR");
        assert_eq!(Source::Nbu.to_string(), "NBU");
    }
}
