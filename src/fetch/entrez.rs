//! PubMed fetcher backed by the NCBI E-utilities API.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use nonzero_ext::nonzero;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use crate::config::EntrezConfig;
use crate::fetch::{FetchError, PaperFetcher};
use crate::models::PaperRecord;
use crate::utils::{api_retry_config, with_retry, HttpClient};

/// PubMed fetcher
///
/// Resolves a query to an ordered PMID list via `esearch.fcgi` (the upstream
/// determines relevance ordering), then retrieves full records via
/// `efetch.fcgi` in one batch request. Every request carries the `tool` and
/// `email` identification parameters required by the NCBI usage policy.
#[derive(Debug, Clone)]
pub struct EntrezFetcher {
    client: Arc<HttpClient>,
    base_url: String,
    tool: String,
    email: String,
    api_key: Option<String>,
}

impl EntrezFetcher {
    /// Create a new fetcher from configuration.
    ///
    /// The request rate stays under the NCBI policy: 3 requests per second
    /// anonymously, 10 with an API key.
    pub fn new(config: &EntrezConfig, timeout: Duration) -> Result<Self, FetchError> {
        let requests_per_second = if config.api_key.is_some() {
            nonzero!(10u32)
        } else {
            nonzero!(3u32)
        };
        let client = HttpClient::with_rate_limit(timeout, requests_per_second)?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tool: config.tool.clone(),
            email: config.email.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Build the E-utilities search URL
    fn esearch_url(&self, query: &str, max_results: usize) -> String {
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("term".to_string(), query.to_string()),
            ("retmax".to_string(), max_results.to_string()),
            ("retmode".to_string(), "xml".to_string()),
        ];
        params.extend(self.ident_params());

        format!("{}/esearch.fcgi?{}", self.base_url, encode_params(&params))
    }

    /// Build the E-utilities fetch URL for specific PMIDs
    fn efetch_url(&self, ids: &[String]) -> String {
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("id".to_string(), ids.join(",")),
            ("retmode".to_string(), "xml".to_string()),
        ];
        params.extend(self.ident_params());

        format!("{}/efetch.fcgi?{}", self.base_url, encode_params(&params))
    }

    // tool/email identify the client per the E-utilities usage policy
    fn ident_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("tool".to_string(), self.tool.clone())];
        if !self.email.is_empty() {
            params.push(("email".to_string(), self.email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }
        params
    }

    /// Parse the esearch response XML into a PMID list
    fn parse_search_response(xml: &str) -> Result<Vec<String>, FetchError> {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct ESearchResult {
            IdList: IdList,
        }

        #[derive(Debug, Deserialize)]
        struct IdList {
            #[serde(rename = "Id", default)]
            ids: Vec<String>,
        }

        let result: ESearchResult = from_str(xml)
            .map_err(|e| FetchError::Parse(format!("Failed to parse PubMed search XML: {}", e)))?;

        Ok(result.IdList.ids)
    }

    /// Parse the efetch response XML into paper records
    fn parse_fetch_response(xml: &str) -> Result<Vec<PaperRecord>, FetchError> {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedArticleSet {
            #[serde(rename = "PubmedArticle", default)]
            articles: Vec<PubmedArticle>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedArticle {
            MedlineCitation: Option<MedlineCitation>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct MedlineCitation {
            PMID: Option<Pmid>,
            Article: Option<Article>,
        }

        #[derive(Debug, Deserialize)]
        struct Pmid {
            #[serde(rename = "$text")]
            id: String,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Article {
            Journal: Option<Journal>,
            ArticleTitle: Option<ArticleTitle>,
            AuthorList: Option<AuthorList>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Journal {
            Title: Option<JournalTitle>,
            JournalIssue: Option<JournalIssue>,
        }

        #[derive(Debug, Deserialize)]
        struct JournalTitle {
            #[serde(rename = "$text")]
            title: String,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct JournalIssue {
            PubDate: Option<PubDate>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubDate {
            Year: Option<String>,
            Month: Option<String>,
            Day: Option<String>,
            #[serde(rename = "MedlineDate")]
            medline_date: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct ArticleTitle {
            #[serde(rename = "$text")]
            title: String,
        }

        #[derive(Debug, Deserialize)]
        struct AuthorList {
            #[serde(rename = "Author", default)]
            authors: Vec<Author>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Author {
            LastName: Option<NameText>,
            ForeName: Option<NameText>,
            Initials: Option<NameText>,
            CollectiveName: Option<NameText>,
        }

        #[derive(Debug, Deserialize)]
        struct NameText {
            #[serde(rename = "$text")]
            text: String,
        }

        let result: PubmedArticleSet = from_str(xml)
            .map_err(|e| FetchError::Parse(format!("Failed to parse PubMed fetch XML: {}", e)))?;

        let mut papers = Vec::new();

        for article in result.articles {
            let citation = article.MedlineCitation.as_ref();

            let pmid = citation
                .and_then(|m| m.PMID.as_ref())
                .map(|p| p.id.clone())
                .unwrap_or_default();

            let title = citation
                .and_then(|m| m.Article.as_ref())
                .and_then(|a| a.ArticleTitle.as_ref())
                .map(|t| t.title.clone())
                .unwrap_or_default();

            let authors = citation
                .and_then(|m| m.Article.as_ref())
                .and_then(|a| a.AuthorList.as_ref())
                .map(|al| {
                    al.authors
                        .iter()
                        .map(|author| {
                            if let Some(collective) = &author.CollectiveName {
                                collective.text.clone()
                            } else {
                                let first = author
                                    .ForeName
                                    .as_ref()
                                    .map(|f| f.text.as_str())
                                    .unwrap_or("");
                                let last = author
                                    .LastName
                                    .as_ref()
                                    .map(|l| l.text.as_str())
                                    .unwrap_or("");
                                let initials = author
                                    .Initials
                                    .as_ref()
                                    .map(|i| i.text.as_str())
                                    .unwrap_or("");
                                format!("{} {} {}", first, last, initials)
                                    .trim()
                                    .to_string()
                            }
                        })
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default();

            let journal = citation
                .and_then(|m| m.Article.as_ref())
                .and_then(|a| a.Journal.as_ref())
                .and_then(|j| j.Title.as_ref())
                .map(|t| t.title.clone())
                .unwrap_or_default();

            let publication_date = citation
                .and_then(|m| m.Article.as_ref())
                .and_then(|a| a.Journal.as_ref())
                .and_then(|j| j.JournalIssue.as_ref())
                .and_then(|ji| ji.PubDate.as_ref())
                .map(|pd| {
                    normalize_pub_date(
                        pd.Year.as_deref(),
                        pd.Month.as_deref(),
                        pd.Day.as_deref(),
                        pd.medline_date.as_deref(),
                    )
                })
                .unwrap_or_default();

            papers.push(PaperRecord {
                id: pmid,
                title,
                authors,
                journal,
                publication_date,
            });
        }

        Ok(papers)
    }

    async fn get_with_retry(&self, url: &str, what: &str) -> Result<String, FetchError> {
        let client = Arc::clone(&self.client);
        let url_for_retry = url.to_string();
        let what = what.to_string();

        with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url_for_retry.clone();
            let what = what.clone();
            async move {
                let response = client
                    .get(&url)
                    .await
                    .map_err(|e| FetchError::Network(format!("Failed to {}: {}", what, e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        return Err(FetchError::RateLimit);
                    }
                    return Err(FetchError::Api(format!(
                        "PubMed API returned status: {}",
                        status
                    )));
                }

                response
                    .text()
                    .await
                    .map_err(|e| FetchError::Network(format!("Failed to read response: {}", e)))
            }
        })
        .await
    }

    async fn try_fetch(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperRecord>, FetchError> {
        let search_url = self.esearch_url(query, max_results);

        let xml = match self.get_with_retry(&search_url, "search PubMed").await {
            Ok(xml) => xml,
            Err(FetchError::RateLimit) => {
                tracing::debug!("PubMed rate-limited - returning empty results");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let ids = Self::parse_search_response(&xml)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let fetch_url = self.efetch_url(&ids);
        let xml = self
            .get_with_retry(&fetch_url, "fetch PubMed records")
            .await?;

        let mut papers = Self::parse_fetch_response(&xml)?;

        // Ids are unique within one result set; first occurrence wins.
        let mut seen = HashSet::new();
        papers.retain(|p| seen.insert(p.id.clone()));

        Ok(papers)
    }
}

#[async_trait]
impl PaperFetcher for EntrezFetcher {
    async fn fetch(&self, query: &str, max_results: usize) -> Vec<PaperRecord> {
        match self.try_fetch(query, max_results).await {
            Ok(papers) => {
                tracing::info!(count = papers.len(), query, "fetched papers");
                papers
            }
            Err(error) => {
                tracing::warn!(%error, query, "paper fetch failed, returning empty result set");
                Vec::new()
            }
        }
    }
}

fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Normalize an Entrez publication date toward `YYYY-MM-DD`.
///
/// Missing month/day default to `01`. Free-form `MedlineDate` values like
/// "2000 Nov-Dec" keep whatever prefix is recognizable; an unrecognizable
/// value passes through verbatim.
fn normalize_pub_date(
    year: Option<&str>,
    month: Option<&str>,
    day: Option<&str>,
    medline_date: Option<&str>,
) -> String {
    if let Some(year) = year {
        let month = month.and_then(month_number).unwrap_or(1);
        let day = day.and_then(|d| d.parse::<u32>().ok()).unwrap_or(1);
        return format_ymd(year, month, day);
    }

    if let Some(medline) = medline_date {
        static MEDLINE_DATE: OnceLock<Regex> = OnceLock::new();
        let re = MEDLINE_DATE.get_or_init(|| {
            Regex::new(r"^(\d{4})(?:\s+([A-Za-z]+))?(?:\s+(\d{1,2}))?").expect("valid regex")
        });

        if let Some(caps) = re.captures(medline) {
            let year = &caps[1];
            let month = caps
                .get(2)
                .map(|m| m.as_str())
                .and_then(month_number)
                .unwrap_or(1);
            let day = caps
                .get(3)
                .and_then(|d| d.as_str().parse::<u32>().ok())
                .unwrap_or(1);
            return format_ymd(year, month, day);
        }

        return medline.to_string();
    }

    String::new()
}

fn format_ymd(year: &str, month: u32, day: u32) -> String {
    let parsed_year = year.parse::<i32>().unwrap_or(0);
    match NaiveDate::from_ymd_opt(parsed_year, month, day) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        // An out-of-range month/day combination falls back to January 1st
        None => format!("{}-01-01", year),
    }
}

fn month_number(month: &str) -> Option<u32> {
    if let Ok(n) = month.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }

    let lower = month.to_ascii_lowercase();
    let number = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<eSearchResult>
    <Count>2</Count>
    <RetMax>2</RetMax>
    <RetStart>0</RetStart>
    <IdList>
        <Id>40064631</Id>
        <Id>40064632</Id>
    </IdList>
</eSearchResult>"#;

    const FETCH_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<PubmedArticleSet>
    <PubmedArticle>
        <MedlineCitation>
            <PMID Version="1">40064631</PMID>
            <Article>
                <Journal>
                    <Title>Journal of Testing</Title>
                    <JournalIssue>
                        <PubDate>
                            <Year>2025</Year>
                            <Month>Mar</Month>
                            <Day>1</Day>
                        </PubDate>
                    </JournalIssue>
                </Journal>
                <ArticleTitle>Advances in test-driven oncology</ArticleTitle>
                <AuthorList>
                    <Author>
                        <LastName>Doe</LastName>
                        <ForeName>Jane</ForeName>
                        <Initials>J</Initials>
                    </Author>
                    <Author>
                        <CollectiveName>Testing Consortium</CollectiveName>
                    </Author>
                </AuthorList>
            </Article>
        </MedlineCitation>
    </PubmedArticle>
    <PubmedArticle>
        <MedlineCitation>
            <PMID Version="1">40064632</PMID>
            <Article>
                <Journal>
                    <Title>Annals of Examples</Title>
                    <JournalIssue>
                        <PubDate>
                            <MedlineDate>2000 Nov-Dec</MedlineDate>
                        </PubDate>
                    </JournalIssue>
                </Journal>
                <ArticleTitle>A second sample article</ArticleTitle>
            </Article>
        </MedlineCitation>
    </PubmedArticle>
</PubmedArticleSet>"#;

    fn test_config(base_url: &str) -> EntrezConfig {
        EntrezConfig {
            base_url: base_url.to_string(),
            email: "dev@example.com".to_string(),
            api_key: None,
            tool: "pubmed-fetcher".to_string(),
        }
    }

    fn test_fetcher(base_url: &str) -> EntrezFetcher {
        EntrezFetcher::new(&test_config(base_url), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_esearch_url() {
        let fetcher = test_fetcher("https://eutils.example.com/entrez/eutils");
        let url = fetcher.esearch_url("machine learning", 10);

        assert!(url.starts_with("https://eutils.example.com/entrez/eutils/esearch.fcgi?"));
        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=machine%20learning"));
        assert!(url.contains("retmax=10"));
        assert!(url.contains("retmode=xml"));
        assert!(url.contains("tool=pubmed-fetcher"));
        assert!(url.contains("email=dev%40example.com"));
    }

    #[test]
    fn test_efetch_url() {
        let fetcher = test_fetcher("https://eutils.example.com/entrez/eutils/");
        let ids = vec!["1".to_string(), "2".to_string()];
        let url = fetcher.efetch_url(&ids);

        assert!(url.starts_with("https://eutils.example.com/entrez/eutils/efetch.fcgi?"));
        assert!(url.contains("id=1%2C2"));
    }

    #[test]
    fn test_api_key_raises_rate_and_is_sent() {
        let mut config = test_config("https://eutils.example.com");
        config.api_key = Some("secret".to_string());
        let fetcher = EntrezFetcher::new(&config, Duration::from_secs(5)).unwrap();

        assert!(fetcher.esearch_url("x", 1).contains("api_key=secret"));
    }

    #[test]
    fn test_parse_search_response() {
        let ids = EntrezFetcher::parse_search_response(SEARCH_XML).unwrap();
        assert_eq!(ids, vec!["40064631", "40064632"]);
    }

    #[test]
    fn test_parse_search_response_empty() {
        let xml = r#"<eSearchResult><Count>0</Count><IdList></IdList></eSearchResult>"#;
        let ids = EntrezFetcher::parse_search_response(xml).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_parse_fetch_response() {
        let papers = EntrezFetcher::parse_fetch_response(FETCH_XML).unwrap();
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].id, "40064631");
        assert_eq!(papers[0].title, "Advances in test-driven oncology");
        assert_eq!(papers[0].authors, "Jane Doe J; Testing Consortium");
        assert_eq!(papers[0].journal, "Journal of Testing");
        assert_eq!(papers[0].publication_date, "2025-03-01");

        assert_eq!(papers[1].id, "40064632");
        assert_eq!(papers[1].authors, "");
        assert_eq!(papers[1].publication_date, "2000-11-01");
    }

    #[test]
    fn test_normalize_pub_date() {
        assert_eq!(
            normalize_pub_date(Some("2025"), Some("Mar"), Some("1"), None),
            "2025-03-01"
        );
        assert_eq!(
            normalize_pub_date(Some("2025"), Some("03"), Some("15"), None),
            "2025-03-15"
        );
        assert_eq!(normalize_pub_date(Some("2025"), None, None, None), "2025-01-01");
        assert_eq!(
            normalize_pub_date(None, None, None, Some("2000 Nov-Dec")),
            "2000-11-01"
        );
        assert_eq!(
            normalize_pub_date(None, None, None, Some("2001 Spring")),
            "2001-01-01"
        );
        // Unrecognizable values pass through
        assert_eq!(
            normalize_pub_date(None, None, None, Some("Winter 1999")),
            "Winter 1999"
        );
        assert_eq!(normalize_pub_date(None, None, None, None), "");
        // Invalid day combinations fall back rather than fabricating a date
        assert_eq!(
            normalize_pub_date(Some("2023"), Some("Feb"), Some("31"), None),
            "2023-01-01"
        );
    }

    #[tokio::test]
    async fn test_fetch_parses_real_records() {
        let mut server = mockito::Server::new_async().await;

        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_body(SEARCH_XML)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_body(FETCH_XML)
            .create_async()
            .await;

        let fetcher = test_fetcher(&server.url());
        let papers = fetcher.fetch("cancer", 10).await;

        esearch.assert_async().await;
        efetch.assert_async().await;

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].id, "40064631");
        assert_eq!(papers[0].journal, "Journal of Testing");
    }

    #[tokio::test]
    async fn test_fetch_empty_id_list_skips_efetch() {
        let mut server = mockito::Server::new_async().await;

        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"<eSearchResult><Count>0</Count><IdList></IdList></eSearchResult>"#)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let fetcher = test_fetcher(&server.url());
        let papers = fetcher.fetch("no hits", 10).await;

        esearch.assert_async().await;
        efetch.assert_async().await;
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_swallows_upstream_failure() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .create_async()
            .await;

        let fetcher = test_fetcher(&server.url());
        let papers = fetcher.fetch("cancer", 10).await;

        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_swallows_malformed_response() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_body("this is not xml")
            .create_async()
            .await;

        let fetcher = test_fetcher(&server.url());
        let papers = fetcher.fetch("cancer", 10).await;

        assert!(papers.is_empty());
    }
}
