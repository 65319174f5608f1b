use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::formats::RawRecord;

static ITEM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("li.searchResultItem"));
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".resultTitle"));
static AUTHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".bookauthor"));
static DETAILS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".resultDetails"));
static RATING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[itemprop="ratingValue"]"#));
static WANT_TO_READ_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[itemprop="reviewCount"]"#));
static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));

static AUTHOR_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*by\s+"));
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(18|19|20)\d{2}\b"));
static RATING_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+(\.\d+)?"));
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+(,\d+)*"));
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|err| panic!("invalid built-in selector {css}: {err}"))
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid built-in regex {pattern}: {err}"))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("listing item has no {0} element")]
    MissingElement(&'static str),

    #[error("no {field} found in {text:?}")]
    NoMatch { field: &'static str, text: String },

    #[error("invalid {field} value {text:?}")]
    InvalidNumber { field: &'static str, text: String },
}

/// Trimmed text of each field element located in one listing item.
///
/// Locating happens up front for the whole page; pattern matching is
/// deferred to [`ListingItem::extract`] so callers can stop mid-page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingItem {
    pub title: Option<String>,
    pub author: Option<String>,
    pub details: Option<String>,
    pub rating: Option<String>,
    pub want_to_read: Option<String>,
    pub editions: Option<String>,
}

pub fn listing_items(html: &str) -> Vec<ListingItem> {
    let document = Html::parse_document(html);
    document
        .select(&ITEM_SELECTOR)
        .map(|item| ListingItem {
            title: first_text(&item, &TITLE_SELECTOR),
            author: first_text(&item, &AUTHOR_SELECTOR),
            details: first_text(&item, &DETAILS_SELECTOR),
            rating: first_text(&item, &RATING_SELECTOR),
            want_to_read: first_text(&item, &WANT_TO_READ_SELECTOR),
            editions: item
                .select(&LINK_SELECTOR)
                .map(|link| element_text(&link))
                .find(|text| text.contains("editions")),
        })
        .collect()
}

fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(|el| element_text(&el))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_owned()
}

impl ListingItem {
    pub fn extract(&self) -> Result<RawRecord, ExtractError> {
        let title = required(&self.title, "title")?.to_owned();
        let author = AUTHOR_PREFIX_RE
            .replace(required(&self.author, "author")?, "")
            .trim()
            .to_owned();

        let details = required(&self.details, "details")?;
        let publish_year = parse_number(
            first_match(&YEAR_RE, details, "publish year")?,
            "publish year",
        )?;

        let rating_text = required(&self.rating, "rating")?;
        let rating_match = first_match(&RATING_RE, rating_text, "rating")?;
        let rating = rating_match
            .parse::<f64>()
            .map_err(|_| ExtractError::InvalidNumber {
                field: "rating",
                text: rating_match.to_owned(),
            })?;

        let want_to_read = self.want_to_read.as_deref().and_then(parse_count);

        let edition_count = match self.editions.as_deref() {
            Some(text) => Some(parse_number(
                first_match(&DIGITS_RE, text, "edition count")?,
                "edition count",
            )?),
            None => None,
        };

        Ok(RawRecord {
            title,
            author,
            publish_year,
            rating,
            want_to_read,
            edition_count,
        })
    }
}

fn required<'a>(text: &'a Option<String>, field: &'static str) -> Result<&'a str, ExtractError> {
    text.as_deref().ok_or(ExtractError::MissingElement(field))
}

fn first_match<'a>(
    re: &Regex,
    text: &'a str,
    field: &'static str,
) -> Result<&'a str, ExtractError> {
    re.find(text)
        .map(|m| m.as_str())
        .ok_or_else(|| ExtractError::NoMatch {
            field,
            text: text.to_owned(),
        })
}

fn parse_number(text: &str, field: &'static str) -> Result<i64, ExtractError> {
    text.parse().map_err(|_| ExtractError::InvalidNumber {
        field,
        text: text.to_owned(),
    })
}

fn parse_count(text: &str) -> Option<i64> {
    COUNT_RE.find(text)?.as_str().replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(body: &str) -> String {
        format!("<html><body><ul class=\"list-books\">{body}</ul></body></html>")
    }

    const DUNE: &str = r#"
        <li class="searchResultItem">
          <div class="resultTitle"><h3 class="booktitle"><a href="/works/OL1">Dune</a></h3></div>
          <span class="bookauthor">by <a href="/authors/OL2">Frank Herbert</a></span>
          <span class="resultDetails"><span>First published in 1965</span> - 48 pages</span>
          <span itemprop="ratingValue">4.34 out of 5</span>
          <span itemprop="reviewCount">12,345 want to read</span>
          <a href="/works/OL1/editions">120 editions</a>
        </li>
    "#;

    #[test]
    fn extracts_all_fields_from_a_listing_item() {
        let items = listing_items(&listing(DUNE));
        assert_eq!(items.len(), 1);

        let record = items[0].extract().expect("extract dune");
        assert_eq!(
            record,
            RawRecord {
                title: "Dune".to_owned(),
                author: "Frank Herbert".to_owned(),
                publish_year: 1965,
                rating: 4.34,
                want_to_read: Some(12345),
                edition_count: Some(120),
            }
        );
    }

    #[test]
    fn author_prefix_is_stripped_case_insensitively() {
        let item = ListingItem {
            title: Some("Solaris".to_owned()),
            author: Some("BY  Stanisław Lem".to_owned()),
            details: Some("1961".to_owned()),
            rating: Some("4".to_owned()),
            ..ListingItem::default()
        };
        let record = item.extract().expect("extract");
        assert_eq!(record.author, "Stanisław Lem");
        assert_eq!(record.rating, 4.0);
    }

    #[test]
    fn year_must_be_a_standalone_four_digit_year() {
        let item = ListingItem {
            title: Some("Title".to_owned()),
            author: Some("by Someone".to_owned()),
            details: Some("Page 12019 of 3, ISBN 9781234".to_owned()),
            rating: Some("3.1".to_owned()),
            ..ListingItem::default()
        };
        assert!(matches!(
            item.extract(),
            Err(ExtractError::NoMatch { field: "publish year", .. })
        ));

        let item = ListingItem {
            details: Some("Page 3 - first published in 2001".to_owned()),
            ..item
        };
        assert_eq!(item.extract().expect("extract").publish_year, 2001);
    }

    #[test]
    fn missing_required_element_is_an_error() {
        let html = listing(
            r#"<li class="searchResultItem">
                 <div class="resultTitle">Untitled</div>
                 <span class="resultDetails">1999</span>
                 <span itemprop="ratingValue">3.0</span>
               </li>"#,
        );
        let items = listing_items(&html);
        assert_eq!(
            items[0].extract(),
            Err(ExtractError::MissingElement("author"))
        );
    }

    #[test]
    fn each_required_element_is_checked() {
        let cases = [
            (
                r#"<div class="resultTitle"><h3 class="booktitle"><a href="/works/OL1">Dune</a></h3></div>"#,
                "title",
            ),
            (
                r#"<span class="bookauthor">by <a href="/authors/OL2">Frank Herbert</a></span>"#,
                "author",
            ),
            (
                r#"<span class="resultDetails"><span>First published in 1965</span> - 48 pages</span>"#,
                "details",
            ),
            (r#"<span itemprop="ratingValue">4.34 out of 5</span>"#, "rating"),
        ];
        for (element, field) in cases {
            assert!(DUNE.contains(element), "fixture lacks {field}");
            let html = listing(&DUNE.replace(element, ""));
            let items = listing_items(&html);
            assert_eq!(items.len(), 1);
            assert_eq!(
                items[0].extract(),
                Err(ExtractError::MissingElement(field)),
                "without {field}"
            );
        }
    }

    #[test]
    fn zero_want_to_read_is_kept() {
        let item = ListingItem {
            title: Some("Quiet Book".to_owned()),
            author: Some("by Nobody".to_owned()),
            details: Some("1950".to_owned()),
            rating: Some("2.5 out of 5".to_owned()),
            want_to_read: Some("0 want to read".to_owned()),
            editions: None,
        };
        let record = item.extract().expect("extract");
        assert_eq!(record.want_to_read, Some(0));
        assert_eq!(record.edition_count, None);
    }

    #[test]
    fn unparseable_want_to_read_is_absent() {
        let item = ListingItem {
            title: Some("Book".to_owned()),
            author: Some("by A".to_owned()),
            details: Some("1850".to_owned()),
            rating: Some("5".to_owned()),
            want_to_read: Some("want to read".to_owned()),
            editions: None,
        };
        assert_eq!(item.extract().expect("extract").want_to_read, None);
    }

    #[test]
    fn large_want_to_read_counts_drop_every_separator() {
        assert_eq!(parse_count("1,234,567 want to read"), Some(1_234_567));
    }

    #[test]
    fn editions_link_is_found_among_other_links() {
        let html = listing(
            r#"<li class="searchResultItem">
                 <div class="resultTitle">Neuromancer</div>
                 <span class="bookauthor">by William Gibson</span>
                 <span class="resultDetails">1984</span>
                 <span itemprop="ratingValue">3.9</span>
                 <a href="/borrow">Borrow</a>
                 <a href="/editions">in 7 editions</a>
               </li>"#,
        );
        let items = listing_items(&html);
        assert_eq!(items[0].editions.as_deref(), Some("in 7 editions"));
        assert_eq!(items[0].extract().expect("extract").edition_count, Some(7));
    }
}
