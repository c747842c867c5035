//! Japanese weather portal: listing table and per-event detail pages.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::{error::ParseError, timestamp};

use super::{parse_magnitude, Intensity};

// Cell positions inside the detail table.
const CELL_OBSERVED: usize = 1;
const CELL_EPICENTER: usize = 3;
const CELL_INTENSITY: usize = 5;
const CELL_MAGNITUDE: usize = 7;
const CELL_COORDINATES: usize = 11;

/// One row of the JP warehouse table, and of the column store.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct JpQuake {
    pub date: Option<String>,
    pub time: Option<String>,
    pub epicenter: Option<String>,
    pub magnitude: Option<f64>,
    pub intensity: Intensity,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl JpQuake {
    /// Row stored for an event whose details could not be read.
    pub fn placeholder() -> Self {
        JpQuake::default()
    }

    pub fn is_located(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// Result of reading one detail page.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Parsed(JpQuake),
    Unavailable { url: Option<String>, reason: String },
}

impl DetailOutcome {
    pub fn unavailable(url: Option<String>, reason: impl ToString) -> Self {
        DetailOutcome::Unavailable {
            url,
            reason: reason.to_string(),
        }
    }

    /// Collapses to a storable row; unavailable events become the placeholder.
    pub fn into_record(self) -> JpQuake {
        match self {
            DetailOutcome::Parsed(quake) => quake,
            DetailOutcome::Unavailable { .. } => JpQuake::placeholder(),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, DetailOutcome::Parsed(_))
    }
}

/// Raw cells of one listing row.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub observed: String,
    pub epicenter: String,
    pub magnitude: String,
    pub intensity: String,
    pub detail_href: Option<String>,
}

impl ListingRow {
    fn from_row(row: ElementRef) -> Option<Self> {
        let cells: Vec<ElementRef> = row.select(td_selector()).collect();
        if cells.len() < 4 {
            return None;
        }

        let detail_href = cells[0]
            .select(link_selector())
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);

        Some(ListingRow {
            observed: cell_text(cells[0]),
            epicenter: cell_text(cells[1]),
            magnitude: cell_text(cells[2]),
            intensity: cell_text(cells[3]),
            detail_href,
        })
    }

    /// Normalises the four plain-text columns.
    pub fn to_quake(&self) -> JpQuake {
        let normalized = timestamp::normalize_jp_timestamp(&self.observed);
        let (date, time) = timestamp::split_normalized(&normalized).unzip();

        JpQuake {
            date,
            time,
            epicenter: non_empty(&self.epicenter),
            magnitude: parse_magnitude(&self.magnitude),
            intensity: Intensity::from_cell(&self.intensity),
            lat: None,
            lon: None,
        }
    }
}

/// Reads the listing table, dropping its header row.
pub fn parse_listing(html: &str) -> Result<Vec<ListingRow>, ParseError> {
    let document = Html::parse_document(html);
    let table = document
        .select(listing_table_selector())
        .next()
        .ok_or(ParseError::MissingListingTable)?;

    let mut rows = Vec::new();
    for (index, row) in table.select(tr_selector()).enumerate().skip(1) {
        match ListingRow::from_row(row) {
            Some(r) => rows.push(r),
            None => tracing::warn!(index, "listing row has fewer than four cells"),
        }
    }

    Ok(rows)
}

/// Extracts one event from its detail page.
pub fn parse_detail(html: &str) -> Result<JpQuake, ParseError> {
    let document = Html::parse_document(html);
    let table = document
        .select(detail_table_selector())
        .next()
        .ok_or(ParseError::MissingDetailTable)?;

    let cells: Vec<String> = table.select(td_selector()).map(cell_text).collect();
    let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");

    let (lat, lon) = parse_coordinates(cell(CELL_COORDINATES))
        .or_else(|| cells.iter().find_map(|c| parse_coordinates(c)))
        .ok_or(ParseError::MissingCoordinates)?;

    let normalized = timestamp::normalize_jp_timestamp(cell(CELL_OBSERVED));
    let (date, time) = timestamp::split_normalized(&normalized).unzip();

    Ok(JpQuake {
        date,
        time,
        epicenter: non_empty(cell(CELL_EPICENTER)),
        magnitude: magnitude_regex()
            .find(cell(CELL_MAGNITUDE))
            .and_then(|m| parse_magnitude(m.as_str())),
        intensity: parse_intensity(cell(CELL_INTENSITY)),
        lat: Some(lat),
        lon: Some(lon),
    })
}

/// Reads `北緯35.7度/東経139.8度`; southern and western hemispheres are negated.
pub fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let caps = coordinates_regex().captures(text)?;

    let mut lat: f64 = caps.get(2)?.as_str().parse().ok()?;
    let mut lon: f64 = caps.get(4)?.as_str().parse().ok()?;
    if caps.get(1)?.as_str() == "南緯" {
        lat = -lat;
    }
    if caps.get(3)?.as_str() == "西経" {
        lon = -lon;
    }

    Some((lat, lon))
}

/// Reads a shindo token such as `3`, `5弱` or `6 強`; anything else is not reported.
pub fn parse_intensity(text: &str) -> Intensity {
    intensity_regex()
        .captures(text)
        .map(|caps| {
            let level = caps.get(1).map_or("", |m| m.as_str());
            let modifier = caps.get(2).map_or("", |m| m.as_str());
            Intensity::Reported(format!("{level}{modifier}"))
        })
        .unwrap_or(Intensity::NotReported)
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty() && text != super::NOT_REPORTED).then(|| text.to_string())
}

fn selector(css: &'static str, cell: &'static OnceLock<Selector>) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector"))
}

fn listing_table_selector() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector("table.yjw_table, #eqhist table", &S)
}

fn detail_table_selector() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector("#eqinfdtl table", &S)
}

fn tr_selector() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector("tr", &S)
}

fn td_selector() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector("td", &S)
}

fn link_selector() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    selector("a[href]", &S)
}

fn coordinates_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(北緯|南緯)([0-9.]+)度\s*/\s*(東経|西経)([0-9.]+)度").expect("static regex")
    })
}

fn magnitude_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9.]+").expect("static regex"))
}

fn intensity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)(?:\s*([強弱]))?").expect("static regex"))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub fn listing_fixture() -> String {
        r#"<html><body><div id="eqhist">
        <table class="yjw_table" width="100%">
          <tr><td>発生時刻</td><td>震源地</td><td>マグニチュード</td><td>最大震度</td></tr>
          <tr>
            <td><a href="/weather/jp/earthquake/20240305143000.html">2024年3月5日 14時30分ごろ</a></td>
            <td>千葉県東方沖</td><td>4.9</td><td>4</td>
          </tr>
          <tr>
            <td><a href="/weather/jp/earthquake/20240305120500.html">2024年3月5日 12時05分ごろ</a></td>
            <td>能登半島沖</td><td>---</td><td>---</td>
          </tr>
        </table></div></body></html>"#
            .to_string()
    }

    pub fn detail_fixture(coordinates: &str) -> String {
        format!(
            r#"<html><body><div id="eqinfdtl">
            <table class="yjw_table boderset">
              <tr><td>発生時刻</td><td>2024年3月5日 14時30分ごろ</td></tr>
              <tr><td>震源地</td><td>千葉県東方沖</td></tr>
              <tr><td>最大震度</td><td>震度5弱</td></tr>
              <tr><td>マグニチュード</td><td>M4.9</td></tr>
              <tr><td>深さ</td><td>約30km</td></tr>
              <tr><td>緯度/経度</td><td>{coordinates}</td></tr>
            </table></div></body></html>"#
        )
    }

    #[test]
    fn should_parse_listing_and_drop_header() {
        let rows = parse_listing(&listing_fixture()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].observed, "2024年3月5日 14時30分ごろ");
        assert_eq!(rows[0].epicenter, "千葉県東方沖");
        assert_eq!(
            rows[0].detail_href.as_deref(),
            Some("/weather/jp/earthquake/20240305143000.html")
        );
    }

    #[test]
    fn should_normalise_listing_row() {
        let rows = parse_listing(&listing_fixture()).unwrap();

        let q = rows[0].to_quake();
        assert_eq!(q.date.as_deref(), Some("2024-03-05"));
        assert_eq!(q.time.as_deref(), Some("14:30:00"));
        assert_eq!(q.magnitude, Some(4.9));
        assert_eq!(q.intensity, Intensity::Reported("4".to_string()));

        let q = rows[1].to_quake();
        assert_eq!(q.magnitude, None);
        assert_eq!(q.intensity, Intensity::NotReported);
    }

    #[test]
    fn should_fail_without_listing_table() {
        let err = parse_listing("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, ParseError::MissingListingTable));
    }

    #[test]
    fn should_parse_detail_page() {
        let q = parse_detail(&detail_fixture("北緯35.7度/東経140.8度")).unwrap();

        assert_eq!(q.date.as_deref(), Some("2024-03-05"));
        assert_eq!(q.time.as_deref(), Some("14:30:00"));
        assert_eq!(q.epicenter.as_deref(), Some("千葉県東方沖"));
        assert_eq!(q.magnitude, Some(4.9));
        assert_eq!(q.intensity, Intensity::Reported("5弱".to_string()));
        assert_eq!(q.lat, Some(35.7));
        assert_eq!(q.lon, Some(140.8));
    }

    #[test]
    fn should_report_missing_coordinates() {
        let err = parse_detail(&detail_fixture("不明")).unwrap_err();
        assert!(matches!(err, ParseError::MissingCoordinates));

        let record = DetailOutcome::unavailable(None, err).into_record();
        assert_eq!(record.lat, None);
        assert_eq!(record.lon, None);
        assert_eq!(record.intensity.as_str(), "---");
    }

    #[test]
    fn should_find_coordinates_outside_fixed_cell() {
        let html = r#"<div id="eqinfdtl"><table>
            <tr><td>位置</td><td>北緯 / 東経: 北緯42.1度/東経143.2度</td></tr>
        </table></div>"#;
        let q = parse_detail(html).unwrap();

        assert_eq!(q.lat, Some(42.1));
        assert_eq!(q.date, None);
        assert_eq!(q.intensity, Intensity::NotReported);
    }

    #[test]
    fn should_parse_intensity_tokens() {
        assert_eq!(parse_intensity("震度3"), Intensity::Reported("3".to_string()));
        assert_eq!(parse_intensity("6 強"), Intensity::Reported("6強".to_string()));
        assert_eq!(parse_intensity("---"), Intensity::NotReported);
    }

    #[test]
    fn should_negate_southern_and_western_coordinates() {
        assert_eq!(parse_coordinates("南緯10.5度/西経70.25度"), Some((-10.5, -70.25)));
    }
}
