//! Row extraction for the people ranking listing.
//!
//! The parser only turns markup into per-row results. Deciding what to keep
//! and whether the page was empty is the collector's job.

use scraper::{ElementRef, Html, Selector};

use crate::errors::RowParseError;

/// Fields extracted from one ranking row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub person_id: String,
    pub mal_link: String,
    pub image_link: String,
    pub english_name: String,
    pub japanese_name: String,
    pub favorites: i32,
}

/// Turns one page of raw content into per-row extraction results,
/// in listing order.
pub trait PageParser: Send + Sync {
    fn parse(&self, content: &str) -> Vec<Result<ParsedRow, RowParseError>>;
}

/// Parser for the `people.php` ranking table.
pub struct MalPeopleParser {
    row: Selector,
    detail_link: Selector,
    image: Selector,
    english_name: Selector,
    japanese_name: Selector,
    favorites: Selector,
}

impl Default for MalPeopleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MalPeopleParser {
    pub fn new() -> Self {
        Self {
            row: selector("tr.ranking-list"),
            detail_link: selector("a.fl-l, a.ml12, a.mr8"),
            image: selector("img"),
            english_name: selector("a.fs14, a.fw-b"),
            japanese_name: selector("span.fs12, span.fn-grey6"),
            favorites: selector("td.favorites"),
        }
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Result<ParsedRow, RowParseError> {
        let link_element = row
            .select(&self.detail_link)
            .next()
            .ok_or(RowParseError::MissingElement("detail link"))?;
        let mal_link = link_element
            .value()
            .attr("href")
            .ok_or(RowParseError::MissingAttribute {
                element: "detail link",
                attribute: "href",
            })?
            .to_string();
        let person_id = person_id_from_link(&mal_link)?;

        let image_element = row
            .select(&self.image)
            .next()
            .ok_or(RowParseError::MissingElement("image"))?;
        let image_link = image_element
            .value()
            .attr("data-src")
            .or_else(|| image_element.value().attr("src"))
            .unwrap_or_default()
            .to_string();

        let english_name = row
            .select(&self.english_name)
            .next()
            .map(element_text)
            .ok_or(RowParseError::MissingElement("english name"))?;

        let japanese_name = row
            .select(&self.japanese_name)
            .next()
            .map(|e| element_text(e).replace(['(', ')'], ""))
            .unwrap_or_default();

        let favorites = row
            .select(&self.favorites)
            .next()
            .map(element_text)
            .ok_or(RowParseError::MissingElement("favorites"))?;
        let favorites = parse_favorites(&favorites)?;

        Ok(ParsedRow {
            person_id,
            mal_link,
            image_link,
            english_name,
            japanese_name,
            favorites,
        })
    }
}

impl PageParser for MalPeopleParser {
    fn parse(&self, content: &str) -> Vec<Result<ParsedRow, RowParseError>> {
        let document = Html::parse_document(content);
        document
            .select(&self.row)
            .map(|row| self.parse_row(row))
            .collect()
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must be valid CSS")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// `https://myanimelist.net/people/1870/Hiroshi_Kamiya` -> `1870`
fn person_id_from_link(link: &str) -> Result<String, RowParseError> {
    link.split('/')
        .nth(4)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RowParseError::BadLink(link.to_string()))
}

/// Accepts thousands separators: `"12,345"` -> `12345`.
fn parse_favorites(raw: &str) -> Result<i32, RowParseError> {
    let digits = raw.trim().replace(',', "");
    digits
        .parse::<u32>()
        .ok()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| RowParseError::BadMetric(raw.to_string()))
}
