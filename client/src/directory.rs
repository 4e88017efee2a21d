//! Nonprofit directory search client.
//!
//! The remote API is read-only and paginated, and takes at most one state
//! and one category filter per request; multi-select filtering happens
//! client-side over the fetched page via [`filter_organizations`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub state: Option<String>,
    pub category: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub organizations: Vec<Organization>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

pub struct DirectoryClient {
    client: Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch one page of organizations matching `query`.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        state: Option<&str>,
        category: Option<&str>,
    ) -> Result<SearchResults> {
        let mut request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("page", &page.to_string())]);
        if let Some(state) = state {
            request = request.query(&[("state", state)]);
        }
        if let Some(category) = category {
            request = request.query(&[("category", category)]);
        }

        let results: SearchResults = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(
            "Directory search {query:?} page {page}: {} of {} organizations",
            results.organizations.len(),
            results.total_results
        );
        Ok(results)
    }
}

/// Narrow a fetched page by multiple states/categories at once. Empty filter
/// lists match everything.
pub fn filter_organizations(
    organizations: &[Organization],
    states: &[String],
    categories: &[String],
) -> Vec<Organization> {
    organizations
        .iter()
        .filter(|org| {
            let state_ok = states.is_empty()
                || org
                    .state
                    .as_ref()
                    .is_some_and(|s| states.iter().any(|want| want == s));
            let category_ok = categories.is_empty()
                || org
                    .category
                    .as_ref()
                    .is_some_and(|c| categories.iter().any(|want| want == c));
            state_ok && category_ok
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(name: &str, state: &str, category: &str) -> Organization {
        Organization {
            id: name.to_lowercase(),
            name: name.to_string(),
            description: String::new(),
            location: String::new(),
            state: Some(state.to_string()),
            category: Some(category.to_string()),
            logo_url: None,
        }
    }

    #[test]
    fn search_results_deserialize_from_api_shape() {
        let raw = r#"{
            "organizations": [
                {"id": "amnesty", "name": "Amnesty International USA INC",
                 "description": "Global movement", "location": "New York, NY",
                 "state": "NY", "category": "Human Rights", "logoUrl": null}
            ],
            "currentPage": 1,
            "totalPages": 12,
            "totalResults": 234
        }"#;
        let results: SearchResults = serde_json::from_str(raw).unwrap();
        assert_eq!(results.organizations.len(), 1);
        assert_eq!(results.organizations[0].state.as_deref(), Some("NY"));
        assert_eq!(results.current_page, 1);
        assert_eq!(results.total_results, 234);
    }

    #[test]
    fn multi_select_filter_is_client_side() {
        let orgs = vec![
            org("A", "NY", "Health"),
            org("B", "CA", "Education"),
            org("C", "NY", "Education"),
        ];

        let filtered = filter_organizations(&orgs, &["NY".to_string()], &[]);
        assert_eq!(filtered.len(), 2);

        let filtered = filter_organizations(
            &orgs,
            &["NY".to_string(), "CA".to_string()],
            &["Education".to_string()],
        );
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|o| o.category.as_deref() == Some("Education")));

        let filtered = filter_organizations(&orgs, &[], &[]);
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn organizations_without_state_drop_out_of_state_filters() {
        let mut no_state = org("D", "NY", "Health");
        no_state.state = None;
        let filtered = filter_organizations(&[no_state], &["NY".to_string()], &[]);
        assert!(filtered.is_empty());
    }
}
