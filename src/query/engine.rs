//! Query engine implementation
//!
//! Reads business/symptom links with optional filters:
//! - by business id
//! - by diagnostic flag
//!
//! Filters combine with AND. Results are ordered by business id, then symptom code.

use crate::{Error, Result};
use crate::business::{BusinessSymptomRecord, parse_flag};
use crate::storage::SqliteStore;

/// Optional filters for a link query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymptomFilter {
    pub business_id: Option<i64>,
    pub diagnostic: Option<bool>,
}

impl SymptomFilter {
    /// Match every link
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_business(mut self, business_id: i64) -> Self {
        self.business_id = Some(business_id);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: bool) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }

    /// Build a filter from raw query-string values.
    ///
    /// Blank values count as absent.
    pub fn from_params(business_id: Option<&str>, diagnostic: Option<&str>) -> Result<Self> {
        let business_id = match business_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                Error::InvalidFilter(format!("business_id '{}' is not an integer", raw))
            })?),
            None => None,
        };

        let diagnostic = match diagnostic.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_flag(raw).ok_or_else(|| {
                Error::InvalidFilter(format!("diagnostic '{}' is not a boolean", raw))
            })?),
            None => None,
        };

        Ok(Self { business_id, diagnostic })
    }
}

/// Query engine over a store
pub struct QueryEngine<'a> {
    store: &'a SqliteStore,
}

impl<'a> QueryEngine<'a> {
    /// Create a new query engine
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Links matching every field set in `filter`
    ///
    /// An unmatched filter yields an empty list, not an error.
    pub fn business_symptoms(&self, filter: &SymptomFilter) -> Result<Vec<BusinessSymptomRecord>> {
        let records = self
            .store
            .find_business_symptoms(filter.business_id, filter.diagnostic)?;
        tracing::debug!(?filter, count = records.len(), "Queried business symptoms");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::Importer;

    fn seeded_store() -> SqliteStore {
        let csv = "Business ID,Business Name,Symptom Code,Symptom Name,Symptom Diagnostic\n\
                   1,Clinic A,S1,Fever,true\n\
                   1,Clinic A,S2,Cough,false\n\
                   2,Clinic B,S1,Fever,false\n";
        let mut store = SqliteStore::open_in_memory().unwrap();
        Importer::new(&mut store).import_bytes(csv.as_bytes()).unwrap();
        store
    }

    #[test]
    fn test_no_filter_returns_all_in_order() {
        let store = seeded_store();
        let engine = QueryEngine::new(&store);
        let records = engine.business_symptoms(&SymptomFilter::all()).unwrap();
        let keys: Vec<(i64, String)> = records.into_iter().map(|r| (r.business_id, r.symptom_code)).collect();
        assert_eq!(
            keys,
            vec![(1, "S1".to_string()), (1, "S2".to_string()), (2, "S1".to_string())]
        );
    }

    #[test]
    fn test_filters_combine() {
        let store = seeded_store();
        let engine = QueryEngine::new(&store);

        let by_business = engine.business_symptoms(&SymptomFilter::all().with_business(1)).unwrap();
        assert_eq!(by_business.len(), 2);

        let diagnostic = engine.business_symptoms(&SymptomFilter::all().with_diagnostic(false)).unwrap();
        assert_eq!(diagnostic.len(), 2);

        let both = engine
            .business_symptoms(&SymptomFilter::all().with_business(1).with_diagnostic(true))
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].symptom_name, "Fever");
    }

    #[test]
    fn test_unknown_business_is_empty() {
        let store = seeded_store();
        let engine = QueryEngine::new(&store);
        assert!(engine.business_symptoms(&SymptomFilter::all().with_business(404)).unwrap().is_empty());
    }

    #[test]
    fn test_from_params() {
        assert_eq!(SymptomFilter::from_params(None, None).unwrap(), SymptomFilter::all());
        assert_eq!(
            SymptomFilter::from_params(Some("12"), Some("false")).unwrap(),
            SymptomFilter::all().with_business(12).with_diagnostic(false)
        );
        assert_eq!(SymptomFilter::from_params(Some(""), Some(" ")).unwrap(), SymptomFilter::all());
        assert!(matches!(
            SymptomFilter::from_params(None, Some("maybe")),
            Err(Error::InvalidFilter(_))
        ));
        assert!(matches!(
            SymptomFilter::from_params(Some("x1"), None),
            Err(Error::InvalidFilter(_))
        ));
    }
}
